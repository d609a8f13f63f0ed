//! Session lifecycle notifications
//!
//! The coordinator publishes `LoggedOut` after tearing a session down; the
//! surrounding application subscribes and routes the user to the login view.

use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials and tenant were cleared; the user must log in again.
    LoggedOut { reason: String },
}

#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of subscribers that will see the event. Publishing
    /// with nobody listening is not an error.
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_logout() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();
        let delivered = events.publish(SessionEvent::LoggedOut {
            reason: "refresh rejected".into(),
        });
        assert_eq!(delivered, 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::LoggedOut {
                reason: "refresh rejected".into()
            }
        );
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let events = SessionEvents::new(0);
        assert_eq!(
            events.publish(SessionEvent::LoggedOut {
                reason: "none listening".into()
            }),
            0
        );
    }
}
