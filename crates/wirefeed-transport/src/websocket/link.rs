//! Transport adapter: one open duplex text link to the endpoint.
//!
//! The connection actor only ever sees a [`Link`]; how it was opened is the
//! business of a [`Connector`]. Every reconnect asks the connector for a fresh
//! link and drops the previous one.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};

use crate::error::{TransportError, TransportResult};

type BoxSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
type BoxStream = Pin<Box<dyn Stream<Item = TransportResult<String>> + Send>>;

/// An open text-frame link.
///
/// The stream ending, or yielding an error, means the link is gone.
pub struct Link {
    sink: BoxSink,
    stream: BoxStream,
}

impl Link {
    pub fn new<Si, St>(sink: Si, stream: St) -> Self
    where
        Si: Sink<String, Error = TransportError> + Send + 'static,
        St: Stream<Item = TransportResult<String>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    pub(crate) async fn send(&mut self, text: String) -> TransportResult<()> {
        self.sink.send(text).await
    }

    pub(crate) async fn next(&mut self) -> Option<TransportResult<String>> {
        self.stream.next().await
    }

    pub(crate) async fn close(&mut self) -> TransportResult<()> {
        self.sink.close().await
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

/// Opens links to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> TransportResult<Link>;
}

#[cfg(feature = "tungstenite")]
pub use self::tungstenite::TungsteniteConnector;

#[cfg(feature = "tungstenite")]
mod tungstenite {
    use async_trait::async_trait;
    use futures_util::{SinkExt, StreamExt, future};
    use tokio_tungstenite::{connect_async, tungstenite::Message};
    use tracing::{debug, warn};

    use super::{Connector, Link};
    use crate::error::{TransportError, TransportResult};

    /// [`Connector`] backed by `tokio-tungstenite`.
    ///
    /// Ping/pong frames are answered by tungstenite itself and never reach the
    /// actor. Binary frames are accepted if they hold valid UTF-8.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct TungsteniteConnector;

    #[async_trait]
    impl Connector for TungsteniteConnector {
        async fn connect(&self, url: &str) -> TransportResult<Link> {
            let (ws, _response) = connect_async(url).await?;
            let (write, read) = ws.split();

            let sink = write
                .sink_map_err(TransportError::from)
                .with(|text: String| future::ok::<_, TransportError>(Message::Text(text.into())));

            let stream = read.filter_map(|frame| {
                future::ready(match frame {
                    Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => Some(Ok(text)),
                        Err(err) => {
                            warn!(error = %err, "Dropping binary frame with invalid UTF-8");
                            None
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "Close frame received");
                        None
                    }
                    Ok(_) => None,
                    Err(err) => Some(Err(err.into())),
                })
            });

            Ok(Link::new(sink, stream))
        }
    }
}
