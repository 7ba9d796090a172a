//! Outbound notifications triggered by admin actions, and the signed-in
//! user's notification inbox.
//!
//! Delivery is fire-and-forget: a failed send is logged and never rolls back
//! the action that triggered it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::model::{
    CrisisReport, Notification, NotificationChannel, NotificationId, RawNotification, User, UserId,
};

/// Body of `POST /notifications`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub user_id: UserId,
    pub message: String,
    pub channel: NotificationChannel,
}

impl NotificationRequest {
    fn email(user_id: UserId, message: String) -> Self {
        Self {
            user_id,
            message,
            channel: NotificationChannel::Email,
        }
    }
}

/// Sent to the reporter when an admin resolves their report. Anonymous
/// reports have nobody to notify.
#[must_use]
pub fn report_resolved(report: &CrisisReport) -> Option<NotificationRequest> {
    let reporter = report.reporter_id?;
    Some(NotificationRequest::email(
        reporter,
        format!("Your crisis report '{}' has been resolved.", report.title),
    ))
}

#[must_use]
pub fn report_deleted(report: &CrisisReport) -> Option<NotificationRequest> {
    let reporter = report.reporter_id?;
    Some(NotificationRequest::email(
        reporter,
        format!(
            "Your crisis report '{}' has been deleted by an admin.",
            report.title
        ),
    ))
}

/// `user` is the account after the toggle.
#[must_use]
pub fn account_toggled(user: &User) -> NotificationRequest {
    let state = if user.active { "activated" } else { "deactivated" };
    NotificationRequest::email(
        user.id,
        format!("Your account has been {state} by an administrator."),
    )
}

/// Completion handler for a dispatched notification.
pub fn delivery_finished(user_id: UserId, result: &Result<(), ApiError>) {
    match result {
        Ok(()) => debug!(user_id = %user_id, "notification delivered"),
        Err(e) => warn!(user_id = %user_id, error = %e, "notification delivery failed"),
    }
}

/// Unread count as the backend reports it: a bare number or `{"count": n}`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum UnreadCount {
    Bare(u64),
    Wrapped { count: u64 },
}

impl UnreadCount {
    #[must_use]
    pub const fn get(self) -> u64 {
        match self {
            Self::Bare(n) | Self::Wrapped { count: n } => n,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationInbox {
    items: Vec<Notification>,
    unread: u64,
}

impl NotificationInbox {
    #[must_use]
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    #[must_use]
    pub const fn unread(&self) -> u64 {
        self.unread
    }

    pub fn set_unread(&mut self, count: u64) {
        self.unread = count;
    }

    /// Replaces the list with valid records, newest first, and recounts.
    pub fn replace(&mut self, raw: Vec<RawNotification>) {
        let mut items: Vec<Notification> = raw
            .into_iter()
            .filter_map(|r| match Notification::from_raw(r) {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(error = %e, "dropping invalid notification");
                    None
                }
            })
            .collect();
        items.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then_with(|| b.id.cmp(&a.id)));
        self.unread = items.iter().filter(|n| !n.is_read).count() as u64;
        self.items = items;
    }

    pub fn mark_read(&mut self, id: NotificationId) {
        if let Some(n) = self.items.iter_mut().find(|n| n.id == id) {
            if !n.is_read {
                n.is_read = true;
                self.unread = self.unread.saturating_sub(1);
            }
        }
    }

    pub fn remove(&mut self, id: NotificationId) {
        if let Some(index) = self.items.iter().position(|n| n.id == id) {
            let removed = self.items.remove(index);
            if !removed.is_read {
                self.unread = self.unread.saturating_sub(1);
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::report;
    use crate::model::{Role, WireId};

    mod trigger_tests {
        use super::*;

        #[test]
        fn test_resolve_message() {
            let req = report_resolved(&report(1)).unwrap();
            assert_eq!(req.user_id, UserId(100));
            assert_eq!(req.message, "Your crisis report 'Report 1' has been resolved.");
            assert_eq!(req.channel, NotificationChannel::Email);
        }

        #[test]
        fn test_anonymous_reports_are_not_notified() {
            let mut r = report(1);
            r.reporter_id = None;
            assert!(report_resolved(&r).is_none());
            assert!(report_deleted(&r).is_none());
        }

        #[test]
        fn test_account_toggle_message() {
            let user = User {
                id: UserId(5),
                name: "Sam".into(),
                email: "sam@example.org".into(),
                role: Role::Citizen,
                active: false,
                created_at: None,
            };
            assert_eq!(
                account_toggled(&user).message,
                "Your account has been deactivated by an administrator."
            );
        }

        #[test]
        fn test_request_wire_shape() {
            let json = serde_json::to_value(report_deleted(&report(2)).unwrap()).unwrap();
            assert_eq!(json["userId"], 100);
            assert_eq!(json["channel"], "EMAIL");
        }
    }

    mod inbox_tests {
        use super::*;

        fn raw(id: u64, read: bool) -> RawNotification {
            RawNotification {
                id: Some(WireId::Number(id)),
                user_id: Some(WireId::Number(100)),
                message: Some(format!("message {id}")),
                channel: Some("EMAIL".into()),
                is_read: Some(read),
                sent_at: None,
            }
        }

        #[test]
        fn test_replace_counts_unread() {
            let mut inbox = NotificationInbox::default();
            inbox.replace(vec![raw(1, false), raw(2, true), raw(3, false)]);
            assert_eq!(inbox.unread(), 2);
            assert_eq!(inbox.items()[0].id, NotificationId(3));
        }

        #[test]
        fn test_mark_read_and_remove() {
            let mut inbox = NotificationInbox::default();
            inbox.replace(vec![raw(1, false), raw(2, false)]);
            inbox.mark_read(NotificationId(1));
            inbox.mark_read(NotificationId(1));
            assert_eq!(inbox.unread(), 1);
            inbox.remove(NotificationId(2));
            assert_eq!(inbox.unread(), 0);
            assert_eq!(inbox.items().len(), 1);
        }

        #[test]
        fn test_unread_count_shapes() {
            let bare: UnreadCount = serde_json::from_str("4").unwrap();
            let wrapped: UnreadCount = serde_json::from_str(r#"{"count": 4}"#).unwrap();
            assert_eq!(bare.get(), 4);
            assert_eq!(wrapped.get(), 4);
        }
    }
}
