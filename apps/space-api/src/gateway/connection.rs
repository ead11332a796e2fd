//! Connection records and their outbound transport handle.

use std::sync::Arc;

use pomohub_common::id::prefix;
use pomohub_common::PrefixedId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Why a frame could not be handed to a connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue is full")]
    Full,
    #[error("connection is closed")]
    Closed,
}

/// Write half of a connection: a bounded queue drained by the session's
/// writer task.
///
/// Dropping the sink closes the connection. The writer flushes whatever is
/// still queued and then sends a close frame.
#[derive(Debug)]
pub struct ConnectionSink {
    tx: mpsc::Sender<Arc<str>>,
}

impl ConnectionSink {
    /// Create a sink and the receiving end for the writer task.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a frame without waiting.
    pub fn deliver(&self, frame: &Arc<str>) -> Result<(), DeliveryError> {
        self.tx.try_send(Arc::clone(frame)).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Identifies one registered connection.
///
/// Registry entries are keyed by `(space_id, user_id)`; `connection_id`
/// tells a user's successive connections apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub space_id: String,
    pub user_id: String,
    pub connection_id: String,
}

/// One live connection of an authenticated user to a space.
#[derive(Debug)]
pub struct ConnectionRecord {
    key: ConnectionKey,
    sink: ConnectionSink,
}

impl ConnectionRecord {
    pub fn new(space_id: String, user_id: String, sink: ConnectionSink) -> Self {
        Self {
            key: ConnectionKey {
                space_id,
                user_id,
                connection_id: Self::generate(),
            },
            sink,
        }
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn space_id(&self) -> &str {
        &self.key.space_id
    }

    pub fn user_id(&self) -> &str {
        &self.key.user_id
    }

    pub fn deliver(&self, frame: &Arc<str>) -> Result<(), DeliveryError> {
        self.sink.deliver(frame)
    }
}

impl PrefixedId for ConnectionRecord {
    const PREFIX: &'static str = prefix::CONNECTION;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliver_queues_frame() {
        let (sink, mut rx) = ConnectionSink::channel(4);
        let frame: Arc<str> = Arc::from("{}");
        sink.deliver(&frame).unwrap();
        assert_eq!(rx.try_recv().unwrap().as_ref(), "{}");
    }

    #[test]
    fn full_queue_is_reported() {
        let (sink, _rx) = ConnectionSink::channel(1);
        let frame: Arc<str> = Arc::from("{}");
        sink.deliver(&frame).unwrap();
        assert_eq!(sink.deliver(&frame), Err(DeliveryError::Full));
    }

    #[test]
    fn dropped_receiver_is_reported_as_closed() {
        let (sink, rx) = ConnectionSink::channel(4);
        drop(rx);
        assert_eq!(sink.deliver(&Arc::from("{}")), Err(DeliveryError::Closed));
    }

    #[test]
    fn dropping_record_closes_writer_side() {
        let (sink, mut rx) = ConnectionSink::channel(4);
        let record = ConnectionRecord::new("spc_1".into(), "usr_1".into(), sink);
        assert!(record.key().connection_id.starts_with("conn_"));
        drop(record);
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
