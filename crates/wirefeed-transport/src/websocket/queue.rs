use std::collections::VecDeque;

use super::envelope::Envelope;

/// FIFO buffer for envelopes sent while the link is down.
#[derive(Debug, Default)]
pub(crate) struct OutboundQueue {
    items: VecDeque<Envelope>,
}

impl OutboundQueue {
    pub(crate) fn push(&mut self, envelope: Envelope) {
        self.items.push_back(envelope);
    }

    /// Take everything queued so far, oldest first.
    pub(crate) fn drain_all(&mut self) -> Vec<Envelope> {
        self.items.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
