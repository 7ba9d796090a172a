//! Backend endpoint table and request bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ApiBase;
use crate::model::{NotificationId, ReportId, ReportStatus, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    ListReports { status: Option<ReportStatus> },
    CreateReport,
    UpdateStatus(ReportId),
    Assign { report: ReportId, responder: UserId },
    Respond(ReportId),
    DeleteReport(ReportId),
    ResponderReports(UserId),
    ListUsers,
    ToggleUser(UserId),
    SendNotification,
    UserNotifications(UserId),
    /// `None` counts across all users (admin view).
    UnreadCount(Option<UserId>),
    MarkNotificationRead(NotificationId),
    DeleteNotification(NotificationId),
}

impl Endpoint {
    #[must_use]
    pub const fn method(self) -> HttpMethod {
        match self {
            Self::ListReports { .. }
            | Self::ResponderReports(_)
            | Self::ListUsers
            | Self::UserNotifications(_)
            | Self::UnreadCount(_) => HttpMethod::Get,
            Self::CreateReport | Self::Respond(_) | Self::SendNotification => HttpMethod::Post,
            Self::UpdateStatus(_)
            | Self::Assign { .. }
            | Self::ToggleUser(_)
            | Self::MarkNotificationRead(_) => HttpMethod::Patch,
            Self::DeleteReport(_) | Self::DeleteNotification(_) => HttpMethod::Delete,
        }
    }

    #[must_use]
    pub fn path(self) -> String {
        match self {
            Self::ListReports { status: None } | Self::CreateReport => "/crisis-reports".into(),
            Self::ListReports {
                status: Some(status),
            } => format!("/crisis-reports?status={}", status.as_str()),
            Self::UpdateStatus(id) => format!("/crisis-reports/{id}/status"),
            Self::Assign { report, responder } => {
                format!("/crisis-reports/{report}/assign/{responder}")
            }
            Self::Respond(id) => format!("/crisis-reports/{id}/respond"),
            Self::DeleteReport(id) => format!("/crisis-reports/{id}"),
            Self::ResponderReports(id) => format!("/crisis-reports/responder/{id}"),
            Self::ListUsers => "/users".into(),
            Self::ToggleUser(id) => format!("/users/{id}/status"),
            Self::SendNotification => "/notifications".into(),
            Self::UserNotifications(id) => format!("/notifications/user/{id}"),
            Self::UnreadCount(None) => "/notifications/unread-count".into(),
            Self::UnreadCount(Some(id)) => format!("/notifications/unread-count/user/{id}"),
            Self::MarkNotificationRead(id) => format!("/notifications/{id}/mark-as-read"),
            Self::DeleteNotification(id) => format!("/notifications/{id}"),
        }
    }

    #[must_use]
    pub fn url(self, base: &ApiBase) -> String {
        base.join(&self.path())
    }

    #[must_use]
    pub const fn report_id(self) -> Option<ReportId> {
        match self {
            Self::UpdateStatus(id) | Self::Respond(id) | Self::DeleteReport(id) => Some(id),
            Self::Assign { report, .. } => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

/// Body of `PATCH /crisis-reports/{id}/status`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: ReportStatus,
}
