use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;
use crate::error::ApiError;
use crate::model::{
    Actor, NewReport, NotificationId, RawNotification, RawReport, RawUser, ReportId, ReportStatus,
    UserId,
};
use crate::notify::UnreadCount;
use crate::projection::{Action, ReportFilter};

/// Bearer token as handed over by the shell. Never printed.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Which query a fetched report list answers.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchScope {
    All,
    WithStatus(ReportStatus),
    AssignedTo(UserId),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // --- Lifecycle ---
    AppStarted { config: Config },
    SessionStarted { token: BearerToken, actor: Actor },
    LoggedOut,

    // --- Dashboard ---
    DashboardOpened,
    RefreshRequested,
    FilterChanged { filter: ReportFilter },
    ReportSelected { id: Option<ReportId> },

    // --- Report actions ---
    CreateReport { draft: NewReport },
    RespondRequested { id: ReportId },
    /// `responder_id` defaults to the requesting user. Only admins may name someone else.
    AssignRequested { id: ReportId, responder_id: Option<UserId> },
    StartRequested { id: ReportId },
    ResolveRequested { id: ReportId },
    ForceResolveRequested { id: ReportId },
    DeleteRequested { id: ReportId },

    // --- Admin ---
    ToggleUserRequested { id: UserId },

    // --- Inbox ---
    NotificationsOpened,
    MarkNotificationRead { id: NotificationId },
    DeleteNotification { id: NotificationId },

    // --- UI ---
    DismissError,
    DismissToast,

    // --- Capability responses ---
    CacheLoaded { result: Result<Option<Vec<u8>>, String> },
    CachePersisted { result: Result<(), String> },
    ReportsFetched { scope: FetchScope, result: Result<Vec<RawReport>, ApiError> },
    ReportCreated { result: Result<RawReport, ApiError> },
    MutationCompleted {
        id: ReportId,
        mutation_id: String,
        action: Action,
        result: Result<RawReport, ApiError>,
    },
    ReportDeleted {
        id: ReportId,
        mutation_id: String,
        result: Result<(), ApiError>,
    },
    UsersFetched { result: Result<Vec<RawUser>, ApiError> },
    UserToggled { id: UserId, result: Result<RawUser, ApiError> },
    NotificationSent { user_id: UserId, result: Result<(), ApiError> },
    NotificationsFetched { result: Result<Vec<RawNotification>, ApiError> },
    UnreadCountFetched { result: Result<UnreadCount, ApiError> },
    NotificationMarkedRead { id: NotificationId, result: Result<(), ApiError> },
    NotificationDeleted { id: NotificationId, result: Result<(), ApiError> },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted { .. } => "app_started",
            Self::SessionStarted { .. } => "session_started",
            Self::LoggedOut => "logged_out",
            Self::DashboardOpened => "dashboard_opened",
            Self::RefreshRequested => "refresh_requested",
            Self::FilterChanged { .. } => "filter_changed",
            Self::ReportSelected { .. } => "report_selected",
            Self::CreateReport { .. } => "create_report",
            Self::RespondRequested { .. } => "respond_requested",
            Self::AssignRequested { .. } => "assign_requested",
            Self::StartRequested { .. } => "start_requested",
            Self::ResolveRequested { .. } => "resolve_requested",
            Self::ForceResolveRequested { .. } => "force_resolve_requested",
            Self::DeleteRequested { .. } => "delete_requested",
            Self::ToggleUserRequested { .. } => "toggle_user_requested",
            Self::NotificationsOpened => "notifications_opened",
            Self::MarkNotificationRead { .. } => "mark_notification_read",
            Self::DeleteNotification { .. } => "delete_notification",
            Self::DismissError => "dismiss_error",
            Self::DismissToast => "dismiss_toast",
            Self::CacheLoaded { .. } => "cache_loaded",
            Self::CachePersisted { .. } => "cache_persisted",
            Self::ReportsFetched { .. } => "reports_fetched",
            Self::ReportCreated { .. } => "report_created",
            Self::MutationCompleted { .. } => "mutation_completed",
            Self::ReportDeleted { .. } => "report_deleted",
            Self::UsersFetched { .. } => "users_fetched",
            Self::UserToggled { .. } => "user_toggled",
            Self::NotificationSent { .. } => "notification_sent",
            Self::NotificationsFetched { .. } => "notifications_fetched",
            Self::UnreadCountFetched { .. } => "unread_count_fetched",
            Self::NotificationMarkedRead { .. } => "notification_marked_read",
            Self::NotificationDeleted { .. } => "notification_deleted",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::CacheLoaded { .. }
                | Self::CachePersisted { .. }
                | Self::ReportsFetched { .. }
                | Self::ReportCreated { .. }
                | Self::MutationCompleted { .. }
                | Self::ReportDeleted { .. }
                | Self::UsersFetched { .. }
                | Self::UserToggled { .. }
                | Self::NotificationSent { .. }
                | Self::NotificationsFetched { .. }
                | Self::UnreadCountFetched { .. }
                | Self::NotificationMarkedRead { .. }
                | Self::NotificationDeleted { .. }
        )
    }
}
