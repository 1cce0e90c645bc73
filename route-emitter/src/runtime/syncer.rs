//! Channel contract with the external periodic scheduler.

use tokio::sync::mpsc;

/// Receiving side of the scheduler's two tick channels. A unit on `sync`
/// requests a full resynchronization; a unit on `emit` requests a full
/// re-emit of current state.
#[derive(Debug)]
pub struct SyncEvents {
    pub sync: mpsc::Receiver<()>,
    pub emit: mpsc::Receiver<()>,
}

/// Sending side handed to the scheduler (or to tests standing in for it).
#[derive(Clone, Debug)]
pub struct SyncEventsHandle {
    pub sync: mpsc::Sender<()>,
    pub emit: mpsc::Sender<()>,
}

impl SyncEvents {
    /// Builds a connected handle/receiver pair. The channels are bounded;
    /// the scheduler ticks far slower than the watcher drains.
    pub fn channel(capacity: usize) -> (SyncEventsHandle, SyncEvents) {
        let (sync_tx, sync_rx) = mpsc::channel(capacity);
        let (emit_tx, emit_rx) = mpsc::channel(capacity);

        (
            SyncEventsHandle {
                sync: sync_tx,
                emit: emit_tx,
            },
            SyncEvents {
                sync: sync_rx,
                emit: emit_rx,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::SyncEvents;

    #[tokio::test]
    async fn handle_ticks_reach_the_receivers() {
        let (handle, mut events) = SyncEvents::channel(1);

        handle.sync.send(()).await.expect("sync tick accepted");
        handle.emit.send(()).await.expect("emit tick accepted");

        assert!(events.sync.recv().await.is_some());
        assert!(events.emit.recv().await.is_some());
    }
}
