//! Short-lived, per-user notifications kept in process memory.
//!
//! Entries expire after their duration and are lost on restart.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::i18n::{Locale, Message};

pub const DEFAULT_DURATION_MS: i64 = 5_000;
pub const MAX_PER_USER: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: Message,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::milliseconds(self.duration_ms)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }
}

/// Rendered form returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NotificationView {
    pub fn render(n: &Notification, locale: Locale) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            title: n.message.title(locale).to_string(),
            message: n.message.body(locale),
            duration_ms: n.duration_ms,
            created_at: n.created_at,
            expires_at: n.expires_at(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    inner: Arc<RwLock<HashMap<Uuid, Vec<Notification>>>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        message: Message,
        duration_ms: Option<i64>,
    ) -> Uuid {
        self.push_at(user_id, kind, message, duration_ms, Utc::now())
            .await
    }

    pub async fn push_at(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        message: Message,
        duration_ms: Option<i64>,
        now: DateTime<Utc>,
    ) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            message,
            duration_ms: duration_ms.filter(|d| *d > 0).unwrap_or(DEFAULT_DURATION_MS),
            created_at: now,
        };
        let id = notification.id;

        let mut guard = self.inner.write().await;
        guard.retain(|_, queue| {
            queue.retain(|n| !n.is_expired(now));
            !queue.is_empty()
        });
        let queue = guard.entry(user_id).or_default();
        queue.push(notification);
        if queue.len() > MAX_PER_USER {
            let overflow = queue.len() - MAX_PER_USER;
            queue.drain(..overflow);
        }
        id
    }

    /// Live notifications for a user, oldest first. Expired ones are dropped.
    pub async fn active(&self, user_id: Uuid, now: DateTime<Utc>) -> Vec<Notification> {
        let mut guard = self.inner.write().await;
        let Some(queue) = guard.get_mut(&user_id) else {
            return Vec::new();
        };
        queue.retain(|n| !n.is_expired(now));
        let live = queue.clone();
        if queue.is_empty() {
            guard.remove(&user_id);
        }
        live
    }

    pub async fn dismiss(&self, user_id: Uuid, id: Uuid) -> bool {
        self.dismiss_at(user_id, id, Utc::now()).await
    }

    /// Remove a live notification. Expired entries count as already gone.
    pub async fn dismiss_at(&self, user_id: Uuid, id: Uuid, now: DateTime<Utc>) -> bool {
        let mut guard = self.inner.write().await;
        let Some(queue) = guard.get_mut(&user_id) else {
            return false;
        };
        queue.retain(|n| !n.is_expired(now));
        let before = queue.len();
        queue.retain(|n| n.id != id);
        let removed = before != queue.len();
        if queue.is_empty() {
            guard.remove(&user_id);
        }
        removed
    }

    #[cfg(test)]
    async fn user_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> Message {
        Message::PointsEarned { points: 10 }
    }

    #[tokio::test]
    async fn expired_notifications_are_pruned() {
        let center = NotificationCenter::new();
        let user = Uuid::new_v4();
        let t0 = Utc::now();
        center
            .push_at(user, NotificationKind::Info, msg(), Some(1_000), t0)
            .await;
        center
            .push_at(user, NotificationKind::Success, msg(), None, t0)
            .await;

        assert_eq!(center.active(user, t0).await.len(), 2);
        let later = t0 + Duration::milliseconds(1_500);
        let live = center.active(user, later).await;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].kind, NotificationKind::Success);
        assert!(center.active(user, t0 + Duration::seconds(10)).await.is_empty());
    }

    #[tokio::test]
    async fn queue_is_capped_per_user() {
        let center = NotificationCenter::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut ids = Vec::new();
        for _ in 0..(MAX_PER_USER + 5) {
            ids.push(
                center
                    .push_at(user, NotificationKind::Info, msg(), Some(60_000), now)
                    .await,
            );
        }
        let live = center.active(user, now).await;
        assert_eq!(live.len(), MAX_PER_USER);
        assert_eq!(live[0].id, ids[5]);
    }

    #[tokio::test]
    async fn dismiss_only_touches_owner() {
        let center = NotificationCenter::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let id = center.push(alice, NotificationKind::Warning, msg(), None).await;
        assert!(!center.dismiss(bob, id).await);
        assert!(center.dismiss(alice, id).await);
        assert!(!center.dismiss(alice, id).await);
    }

    #[tokio::test]
    async fn expired_notifications_cannot_be_dismissed() {
        let center = NotificationCenter::new();
        let user = Uuid::new_v4();
        let t0 = Utc::now();
        let id = center
            .push_at(user, NotificationKind::Info, msg(), Some(1_000), t0)
            .await;
        let later = t0 + Duration::milliseconds(2_000);
        assert!(!center.dismiss_at(user, id, later).await);
        assert_eq!(center.user_count().await, 0);
    }

    #[tokio::test]
    async fn pushing_drops_idle_users_with_nothing_live() {
        let center = NotificationCenter::new();
        let (idle, active) = (Uuid::new_v4(), Uuid::new_v4());
        let t0 = Utc::now();
        center
            .push_at(idle, NotificationKind::Info, msg(), Some(1_000), t0)
            .await;
        assert_eq!(center.user_count().await, 1);

        let later = t0 + Duration::seconds(5);
        center
            .push_at(active, NotificationKind::Info, msg(), None, later)
            .await;
        assert_eq!(center.user_count().await, 1);
        assert!(center.active(idle, later).await.is_empty());
        assert_eq!(center.active(active, later).await.len(), 1);
    }

    #[test]
    fn view_renders_in_locale() {
        let n = Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Success,
            message: msg(),
            duration_ms: DEFAULT_DURATION_MS,
            created_at: Utc::now(),
        };
        let view = NotificationView::render(&n, Locale::En);
        assert_eq!(view.title, "Points earned");
        assert_eq!(view.message, "You earned 10 loyalty points.");
    }
}
