pub mod notice;
pub mod types;

use tokio::sync::broadcast;

pub use notice::NoticeBoard;
pub use types::{Notice, NoticeLevel, PanelEvent};

/// Fan-out of [`PanelEvent`]s to every attached front-end.
///
/// Receivers that fall more than `capacity` events behind see
/// `RecvError::Lagged` and skip ahead.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PanelEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many receivers got the event; zero when running headless.
    pub fn publish(&self, event: PanelEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!(kind, "panel event dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.sender.subscribe()
    }
}
