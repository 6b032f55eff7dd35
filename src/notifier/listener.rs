//! Forwards status-store events to subscribed viewers.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SubscriptionRegistry;
use crate::models::StatusChanged;

#[derive(Debug)]
pub struct NotificationListener {
    registry: Arc<SubscriptionRegistry>,
}

impl NotificationListener {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Fan out every received event until the channel closes
    pub fn spawn(self, mut events: broadcast::Receiver<StatusChanged>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("📡 Notification listener started");
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let report = self.registry.broadcast(&event).await;
                        debug!(
                            subject_id = %event.subject_id,
                            status = %event.status,
                            delivered = report.delivered,
                            failed = report.failed,
                            "Status update fanned out"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification listener lagged, events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            info!("Notification listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiagnosisStatus;
    use crate::notifier::{ChannelSink, ServerMessage};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_events_reach_subscribed_sink() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let (tx, mut rx) = mpsc::channel(8);
        registry
            .subscribe("12", Uuid::new_v4(), Arc::new(ChannelSink::new(tx)))
            .await;

        let (events, receiver) = broadcast::channel(8);
        let handle = NotificationListener::new(registry).spawn(receiver);

        events
            .send(StatusChanged {
                subject_id: "12".to_string(),
                text: "Ready".to_string(),
                status: DiagnosisStatus::Ready,
            })
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let ServerMessage::StatusUpdate { subject_id, .. } = received;
        assert_eq!(subject_id, "12");

        drop(events);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
