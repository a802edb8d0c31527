//! Live notification fan-out over a broadcast channel.
//!
//! Handlers publish through [`Notifier::notify`], which persists the row
//! best-effort and then broadcasts to connected SSE clients. Delivery is
//! lossy; the persisted row is the source of truth.

use axum::response::sse::Event;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::database::Database;

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub user_id: Uuid,
    pub message: String,
    pub link_url: Option<String>,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<NotificationEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Persist and broadcast a notification for one user. A failed insert
    /// must never fail the operation that raised the notification.
    pub async fn notify(&self, db: &Database, user_id: Uuid, message: &str, link_url: Option<&str>) {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, message, link_url) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(message)
        .bind(link_url)
        .execute(db)
        .await;

        if let Err(err) = result {
            tracing::warn!("failed to persist notification for {user_id}: {err}");
        }

        // Lossy: nobody listening is fine.
        let _ = self.tx.send(NotificationEvent {
            user_id,
            message: message.to_string(),
            link_url: link_url.map(str::to_string),
        });
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// SSE stream of this user's notifications. Events for other users are
    /// filtered out; lagged receivers drop events and keep going.
    pub fn subscribe_stream(
        &self,
        user_id: Uuid,
    ) -> impl Stream<Item = Result<Event, Infallible>> {
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx);

        stream.filter_map(move |result| async move {
            match result {
                Ok(event) if event.user_id == user_id => Event::default()
                    .event("notification")
                    .json_data(&event)
                    .ok()
                    .map(Ok),
                Ok(_) => None,
                Err(err) => {
                    tracing::warn!("notification subscriber lagged: {err:?}");
                    None
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_subscriber() {
        let notifier = Notifier::new(16);
        let mut rx = notifier.tx.subscribe();

        notifier
            .tx
            .send(NotificationEvent {
                user_id: Uuid::new_v4(),
                message: "dispatch created".to_string(),
                link_url: None,
            })
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.message, "dispatch created");
    }

    #[tokio::test]
    async fn send_without_subscribers_is_lossy_not_fatal() {
        let notifier = Notifier::new(16);
        assert_eq!(notifier.client_count(), 0);
        // No receiver: send fails, which notify() ignores.
        assert!(notifier
            .tx
            .send(NotificationEvent {
                user_id: Uuid::new_v4(),
                message: "noop".to_string(),
                link_url: None,
            })
            .is_err());
    }
}
