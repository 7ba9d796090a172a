use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, info_span, warn};

use crux_http::Http;

use crate::api::{Endpoint, StatusUpdate};
use crate::capabilities::{Backend, CacheKey, Capabilities};
use crate::config::{ApiBase, Config};
use crate::error::{ApiError, CoreError, CoreResult, UserFacingError};
use crate::event::{BearerToken, Event, FetchScope};
use crate::get_current_time_ms;
use crate::lifecycle::{self, LifecycleEvent};
use crate::map;
use crate::model::{
    Actor, CrisisReport, NewReport, NotificationId, RawReport, ReportId, ReportStatus, Role, User,
    UserId,
};
use crate::notify::{self, NotificationInbox, NotificationRequest};
use crate::offline_store::OfflineStore;
use crate::projection::{self, Action, ReportCard, ReportFilter, RoleView, Snapshot};
use crate::reconcile::{reconcile, MutationLedger, ServerResponse, SyncStatus};

// --- Model ---

pub struct Session {
    pub actor: Actor,
    token: SecretString,
}

impl Session {
    #[must_use]
    pub fn new(actor: Actor, token: BearerToken) -> Self {
        Self {
            actor,
            token: SecretString::new(token.into_inner()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub created_at_ms: u64,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at_ms: get_current_time_ms(),
            duration_ms: kind.default_duration_ms(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub config: Config,
    pub api_base: Option<ApiBase>,
    pub cache_key: Option<CacheKey>,
    pub cache_loaded: bool,
    pub session: Option<Session>,
    pub cache: OfflineStore,
    pub ledger: MutationLedger,
    pub users: Vec<User>,
    pub toggling_users: HashSet<UserId>,
    pub inbox: NotificationInbox,
    pub filter: ReportFilter,
    pub selected: Option<ReportId>,
    pub sync: SyncStatus,
    pub creating: bool,
    pub active_error: Option<CoreError>,
    pub active_toast: Option<ToastMessage>,
}

impl Model {
    #[must_use]
    pub fn actor(&self) -> Option<&Actor> {
        self.session.as_ref().map(|s| &s.actor)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn set_error(&mut self, error: CoreError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind));
    }

    fn backend<'a>(&'a self, http: &'a Http<Event>) -> CoreResult<Backend<'a>> {
        let base = self
            .api_base
            .as_ref()
            .ok_or_else(|| CoreError::Internal("backend is not configured".into()))?;
        Ok(Backend::new(http, base, self.session.as_ref().map(|s| &s.token)))
    }

    fn reset_session_state(&mut self) {
        self.ledger.clear();
        self.users.clear();
        self.toggling_users.clear();
        self.inbox.clear();
        self.selected = None;
        self.filter = ReportFilter::default();
        self.sync = SyncStatus::Idle;
        self.creating = false;
        self.active_error = None;
        self.active_toast = None;
    }
}

// --- ViewModel ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionView {
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReportDetail {
    pub card: ReportCard,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub is_mine: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncBanner {
    pub status: SyncStatus,
    pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationItem {
    pub id: NotificationId,
    pub message: String,
    pub is_read: bool,
    pub sent_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&ToastMessage> for ToastView {
    fn from(t: &ToastMessage) -> Self {
        Self {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: t.duration_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub session: Option<SessionView>,
    /// `None` while signed out.
    pub dashboard: Option<RoleView>,
    pub selected: Option<ReportDetail>,
    pub map_geojson: String,
    pub filter: ReportFilter,
    pub sync: SyncBanner,
    pub is_creating: bool,
    pub notifications: Vec<NotificationItem>,
    pub unread_notifications: u64,
    pub error: Option<UserFacingError>,
    pub toast: Option<ToastView>,
}

// --- App ---

#[derive(Default)]
pub struct App;

impl App {
    fn persist_if_dirty(model: &mut Model, caps: &Capabilities) {
        if !model.cache_loaded || !model.cache.is_dirty() {
            return;
        }
        let Some(key) = &model.cache_key else {
            return;
        };
        let result = model
            .cache
            .to_bytes()
            .map_err(CoreError::from)
            .and_then(|bytes| {
                key.persist(&caps.kv, bytes)
                    .map_err(|e| CoreError::Storage(e.to_string()))
            });
        match result {
            Ok(()) => model.cache.mark_persisted(),
            Err(e) => warn!(error = %e, "report cache not persisted"),
        }
    }

    fn refresh(model: &mut Model, caps: &Capabilities) {
        let Some(actor) = model.actor().cloned() else {
            model.set_error(CoreError::Unauthorized);
            return;
        };
        let backend = match model.backend(&caps.http) {
            Ok(backend) => backend,
            Err(e) => {
                model.set_error(e);
                return;
            }
        };

        backend.call_json(Endpoint::ListReports { status: None }, |result| {
            Event::ReportsFetched {
                scope: FetchScope::All,
                result,
            }
        });
        if actor.is_admin() {
            backend.call_json(Endpoint::ListUsers, |result| Event::UsersFetched { result });
        }
        let unread_scope = (!actor.is_admin()).then_some(actor.id);
        backend.call_json(Endpoint::UnreadCount(unread_scope), |result| {
            Event::UnreadCountFetched { result }
        });

        model.sync = SyncStatus::Syncing;
    }

    fn fetch_assigned(model: &mut Model, caps: &Capabilities, responder: UserId) {
        match model.backend(&caps.http) {
            Ok(backend) => backend.call_json(Endpoint::ResponderReports(responder), move |result| {
                Event::ReportsFetched {
                    scope: FetchScope::AssignedTo(responder),
                    result,
                }
            }),
            Err(e) => model.set_error(e),
        }
    }

    fn fetch_with_status(model: &mut Model, caps: &Capabilities, status: ReportStatus) {
        match model.backend(&caps.http) {
            Ok(backend) => backend.call_json(
                Endpoint::ListReports {
                    status: Some(status),
                },
                move |result| Event::ReportsFetched {
                    scope: FetchScope::WithStatus(status),
                    result,
                },
            ),
            Err(e) => model.set_error(e),
        }
    }

    fn dispatch_notification(model: &Model, caps: &Capabilities, request: Option<NotificationRequest>) {
        let Some(request) = request else {
            debug!("no recipient for notification");
            return;
        };
        let user_id = request.user_id;
        let sent = model.backend(&caps.http).and_then(|backend| {
            backend
                .send_and_forget(Endpoint::SendNotification, &request, move |result| {
                    Event::NotificationSent { user_id, result }
                })
                .map_err(|e| CoreError::Internal(e.to_string()))
        });
        if let Err(e) = sent {
            warn!(user_id = %user_id, error = %e, "notification not dispatched");
        }
    }

    fn create_report(model: &mut Model, caps: &Capabilities, draft: NewReport) -> CoreResult<()> {
        if let Some(actor) = model.actor() {
            projection::authorize(actor, Action::Create, None)?;
        }
        if model.creating {
            debug!("report submission already in flight");
            return Ok(());
        }
        let payload = draft.into_payload(model.actor())?;
        model
            .backend(&caps.http)?
            .send_json(Endpoint::CreateReport, &payload, |result| Event::ReportCreated {
                result,
            })
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        model.creating = true;
        Ok(())
    }

    fn mutate(model: &mut Model, caps: &Capabilities, id: ReportId, action: Action, assignee: Option<UserId>) {
        if let Err(e) = Self::request_mutation(model, caps, id, action, assignee) {
            warn!(report_id = %id, action = %action, error = %e, "mutation refused");
            if e.kind().requires_resync() && model.is_authenticated() {
                Self::refresh(model, caps);
            }
            model.set_error(e);
        }
    }

    /// Gate, validate, write optimistically, then send.
    fn request_mutation(
        model: &mut Model,
        caps: &Capabilities,
        id: ReportId,
        action: Action,
        assignee: Option<UserId>,
    ) -> CoreResult<()> {
        let actor = model.actor().cloned().ok_or(CoreError::Unauthorized)?;
        let report = model.cache.find(id).cloned().ok_or(CoreError::NotFound(id))?;
        if model.ledger.is_busy(id) {
            debug!(report_id = %id, action = %action, "ignored while a mutation is in flight");
            return Ok(());
        }
        projection::authorize(&actor, action, Some(&report))?;

        let event = match action {
            Action::Respond => None,
            Action::Assign => Some(LifecycleEvent::Assign {
                responder_id: assignee.unwrap_or(actor.id),
            }),
            other => Some(other.lifecycle_event(&actor).ok_or_else(|| {
                CoreError::Internal(format!("{other} is not a report mutation"))
            })?),
        };
        let (endpoint, optimistic) = match event {
            None => (Endpoint::Respond(id), Some(lifecycle::respond(&report))),
            Some(event) => {
                let next = lifecycle::apply(&report, event, &actor)?;
                let endpoint = match event {
                    LifecycleEvent::Assign { responder_id } => Endpoint::Assign {
                        report: id,
                        responder: responder_id,
                    },
                    LifecycleEvent::AdminDelete => Endpoint::DeleteReport(id),
                    LifecycleEvent::Start
                    | LifecycleEvent::Resolve
                    | LifecycleEvent::AdminForceResolve => Endpoint::UpdateStatus(id),
                };
                (endpoint, next.report().cloned())
            }
        };
        if model.api_base.is_none() {
            return Err(CoreError::Internal("backend is not configured".into()));
        }

        let status_update = optimistic.as_ref().map(|r| StatusUpdate { status: r.status });
        let Some(mutation_id) =
            model
                .ledger
                .begin(&mut model.cache, report, action, optimistic, get_current_time_ms())
        else {
            return Ok(());
        };
        info!(report_id = %id, action = %action, %mutation_id, "mutation started");

        let backend = model.backend(&caps.http)?;
        let sent = match (endpoint, status_update) {
            (endpoint @ Endpoint::DeleteReport(_), _) => {
                backend.call_empty(endpoint, move |result| Event::ReportDeleted {
                    id,
                    mutation_id,
                    result,
                });
                Ok(())
            }
            (endpoint @ Endpoint::UpdateStatus(_), Some(body)) => {
                let completion_id = mutation_id.clone();
                backend
                    .send_json(endpoint, &body, move |result| Event::MutationCompleted {
                        id,
                        mutation_id: completion_id,
                        action,
                        result,
                    })
                    .map_err(|e| (mutation_id, e))
            }
            (endpoint, _) => {
                backend.call_json(endpoint, move |result| Event::MutationCompleted {
                    id,
                    mutation_id,
                    action,
                    result,
                });
                Ok(())
            }
        };

        if let Err((mutation_id, e)) = sent {
            model.ledger.rollback(&mutation_id, &mut model.cache);
            return Err(CoreError::Internal(e.to_string()));
        }
        Ok(())
    }

    fn reports_fetched(
        model: &mut Model,
        caps: &Capabilities,
        scope: FetchScope,
        result: Result<Vec<RawReport>, ApiError>,
    ) {
        let Some(actor) = model.actor().cloned() else {
            debug!("dropping report list after logout");
            return;
        };
        let response = match (scope, result) {
            (_, Err(e)) => {
                if matches!(CoreError::from_api(&e, None, false), CoreError::Unauthorized) {
                    model.set_error(CoreError::Unauthorized);
                }
                ServerResponse::Failed(e)
            }
            (FetchScope::All, Ok(raw)) => ServerResponse::FullList(raw),
            (FetchScope::WithStatus(_), Ok(raw)) => ServerResponse::PartialList(raw),
            (FetchScope::AssignedTo(responder_id), Ok(raw)) => ServerResponse::AssignedList {
                responder_id,
                reports: raw,
            },
        };
        let full_list = matches!(response, ServerResponse::FullList(_));
        let view = reconcile(response, &mut model.cache, get_current_time_ms());
        model.sync = view.sync;

        // assignments are merged after the full list so they are not overwritten
        if full_list && actor.role == Role::Responder {
            Self::fetch_assigned(model, caps, actor.id);
        }
    }

    fn mutation_succeeded(
        model: &mut Model,
        caps: &Capabilities,
        id: ReportId,
        mutation_id: &str,
        action: Action,
        raw: RawReport,
    ) {
        let known = model.ledger.confirm(mutation_id).is_some();
        if !known && !model.is_authenticated() {
            debug!(mutation_id, "dropping mutation response after logout");
            return;
        }
        let view = reconcile(ServerResponse::Single(raw), &mut model.cache, get_current_time_ms());
        model.sync = view.sync;

        let message = match action {
            Action::Respond => "Thank you for responding!".to_string(),
            Action::Assign => "Crisis assigned successfully!".to_string(),
            _ => model
                .cache
                .find(id)
                .map_or_else(|| "Status updated".to_string(), |r| format!("Status updated to {}", r.status)),
        };
        model.show_toast(message, ToastKind::Success);

        let admin_resolved = matches!(action, Action::Resolve | Action::ForceResolve)
            && model.actor().is_some_and(Actor::is_admin);
        if admin_resolved {
            let request = model.cache.find(id).and_then(notify::report_resolved);
            Self::dispatch_notification(model, caps, request);
        }

        Self::refresh(model, caps);
    }

    fn mutation_failed(
        model: &mut Model,
        caps: &Capabilities,
        id: ReportId,
        mutation_id: &str,
        lifecycle_endpoint: bool,
        error: &ApiError,
    ) {
        let err = CoreError::from_api(error, Some(id), lifecycle_endpoint);
        warn!(report_id = %id, error = %error, kind = err.kind().code(), "mutation rejected");
        model.ledger.rollback(mutation_id, &mut model.cache);

        if err.kind().requires_resync() && model.is_authenticated() {
            Self::refresh(model, caps);
        }
        if let CoreError::Network(reason) = &err {
            model.sync = SyncStatus::Degraded {
                reason: reason.clone(),
            };
        }
        model.set_error(err);
    }

    fn toggle_user(model: &mut Model, caps: &Capabilities, id: UserId) -> CoreResult<()> {
        let actor = model.actor().ok_or(CoreError::Unauthorized)?;
        projection::authorize(actor, Action::ToggleUser, None)?;
        if id == actor.id {
            return Err(CoreError::Forbidden {
                role: actor.role,
                action: Action::ToggleUser,
            });
        }
        if model.toggling_users.contains(&id) {
            return Ok(());
        }
        model
            .backend(&caps.http)?
            .call_json(Endpoint::ToggleUser(id), move |result| Event::UserToggled { id, result });
        model.toggling_users.insert(id);
        Ok(())
    }

    fn fetch_notifications(model: &mut Model, caps: &Capabilities) -> CoreResult<()> {
        let user_id = model.actor().ok_or(CoreError::Unauthorized)?.id;
        let backend = model.backend(&caps.http)?;
        backend.call_json(Endpoint::UserNotifications(user_id), |result| {
            Event::NotificationsFetched { result }
        });
        backend.call_json(Endpoint::UnreadCount(Some(user_id)), |result| {
            Event::UnreadCountFetched { result }
        });
        Ok(())
    }

    fn selected_detail(model: &Model, actor: &Actor, busy: &HashSet<ReportId>) -> Option<ReportDetail> {
        let report: &CrisisReport = model.cache.find(model.selected?)?;
        Some(ReportDetail {
            card: ReportCard::new(report, actor, busy.contains(&report.id)),
            description: report.description.clone(),
            latitude: report.latitude,
            longitude: report.longitude,
            address: report.address.clone(),
            is_mine: report.is_reported_by(actor.id) || report.is_assigned_to(actor.id),
        })
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let span = info_span!("update", event = event.name());
        let _entered = span.enter();
        if event.is_user_initiated() {
            debug!("user action");
        }

        match event {
            Event::AppStarted { config } => {
                info!(
                    api = %config.api_base_url,
                    timeout = ?config.request_timeout(),
                    "core starting"
                );
                if let Err(e) = config.validate() {
                    warn!(error = %e, "invalid configuration");
                    model.set_error(e.into());
                }
                model.api_base = config.api_base().ok();
                match CacheKey::new(config.cache_key.clone()) {
                    Ok(key) => {
                        key.load(&caps.kv);
                        model.cache_key = Some(key);
                    }
                    Err(e) => model.set_error(CoreError::Storage(e.to_string())),
                }
                model.config = config;
            }

            Event::CacheLoaded { result } => {
                model.cache_loaded = true;
                match result {
                    Ok(Some(bytes)) if model.cache.revision() == 0 => {
                        model.cache = OfflineStore::from_bytes(&bytes);
                        info!(count = model.cache.len(), "report cache hydrated");
                    }
                    Ok(Some(_)) => debug!("server data arrived first, stored copy ignored"),
                    Ok(None) => debug!("no cached reports"),
                    Err(e) => warn!(error = %e, "report cache could not be read"),
                }
            }

            Event::CachePersisted { result } => {
                if let Err(e) = result {
                    warn!(error = %e, "report cache write failed");
                }
            }

            Event::SessionStarted { token, actor } => {
                info!(user_id = %actor.id, role = %actor.role, "session started");
                if model.actor().is_some_and(|a| a.id != actor.id) {
                    model.reset_session_state();
                }
                model.session = Some(Session::new(actor, token));
                model.clear_error();
            }

            Event::LoggedOut => {
                info!("session ended, clearing local state");
                model.session = None;
                model.reset_session_state();
                model.cache.clear();
                model.cache.mark_persisted();
                if let Some(key) = &model.cache_key {
                    key.clear(&caps.kv);
                }
            }

            Event::DashboardOpened | Event::RefreshRequested => Self::refresh(model, caps),

            Event::FilterChanged { filter } => {
                if let (Some(status), true) = (filter.status, model.is_authenticated()) {
                    Self::fetch_with_status(model, caps, status);
                }
                model.filter = filter;
            }

            Event::ReportSelected { id } => model.selected = id,

            Event::CreateReport { draft } => {
                if let Err(e) = Self::create_report(model, caps, draft) {
                    warn!(error = %e, "report not submitted");
                    model.set_error(e);
                }
            }

            Event::RespondRequested { id } => Self::mutate(model, caps, id, Action::Respond, None),
            Event::AssignRequested { id, responder_id } => {
                Self::mutate(model, caps, id, Action::Assign, responder_id);
            }
            Event::StartRequested { id } => Self::mutate(model, caps, id, Action::Start, None),
            Event::ResolveRequested { id } => Self::mutate(model, caps, id, Action::Resolve, None),
            Event::ForceResolveRequested { id } => {
                Self::mutate(model, caps, id, Action::ForceResolve, None);
            }
            Event::DeleteRequested { id } => Self::mutate(model, caps, id, Action::Delete, None),

            Event::ToggleUserRequested { id } => {
                if let Err(e) = Self::toggle_user(model, caps, id) {
                    model.set_error(e);
                }
            }

            Event::NotificationsOpened => {
                if let Err(e) = Self::fetch_notifications(model, caps) {
                    model.set_error(e);
                }
            }

            Event::MarkNotificationRead { id } => match model.backend(&caps.http) {
                Ok(backend) => backend.call_empty(Endpoint::MarkNotificationRead(id), move |result| {
                    Event::NotificationMarkedRead { id, result }
                }),
                Err(e) => model.set_error(e),
            },

            Event::DeleteNotification { id } => match model.backend(&caps.http) {
                Ok(backend) => backend.call_empty(Endpoint::DeleteNotification(id), move |result| {
                    Event::NotificationDeleted { id, result }
                }),
                Err(e) => model.set_error(e),
            },

            Event::DismissError => model.clear_error(),

            Event::DismissToast => model.active_toast = None,

            Event::ReportsFetched { scope, result } => Self::reports_fetched(model, caps, scope, result),

            Event::ReportCreated { result } => {
                model.creating = false;
                match result {
                    Ok(raw) => {
                        let view = reconcile(ServerResponse::Single(raw), &mut model.cache, get_current_time_ms());
                        model.sync = view.sync;
                        model.show_toast("Crisis report submitted successfully!", ToastKind::Success);
                        if model.is_authenticated() {
                            Self::refresh(model, caps);
                        }
                    }
                    Err(e) => {
                        let err = CoreError::from_api(&e, None, false);
                        warn!(error = %e, "report submission failed");
                        model.set_error(err);
                    }
                }
            }

            Event::MutationCompleted {
                id,
                mutation_id,
                action,
                result,
            } => match result {
                Ok(raw) => Self::mutation_succeeded(model, caps, id, &mutation_id, action, raw),
                Err(e) => Self::mutation_failed(
                    model,
                    caps,
                    id,
                    &mutation_id,
                    action.is_lifecycle(),
                    &e,
                ),
            },

            Event::ReportDeleted {
                id,
                mutation_id,
                result,
            } => match result {
                Ok(()) => {
                    let snapshot = model
                        .ledger
                        .confirm(&mutation_id)
                        .map(|m| m.snapshot)
                        .or_else(|| model.cache.find(id).cloned());
                    model.sync =
                        reconcile(ServerResponse::Deleted(id), &mut model.cache, get_current_time_ms()).sync;
                    if model.selected == Some(id) {
                        model.selected = None;
                    }
                    model.show_toast("Crisis report deleted", ToastKind::Success);
                    Self::dispatch_notification(
                        model,
                        caps,
                        snapshot.as_ref().and_then(notify::report_deleted),
                    );
                    if model.is_authenticated() {
                        Self::refresh(model, caps);
                    }
                }
                Err(e) => Self::mutation_failed(model, caps, id, &mutation_id, false, &e),
            },

            Event::UsersFetched { result } => match result {
                Ok(raw) => {
                    let mut users: Vec<User> = raw
                        .into_iter()
                        .filter_map(|u| match User::from_raw(u) {
                            Ok(user) => Some(user),
                            Err(e) => {
                                warn!(error = %e, "dropping invalid user record");
                                None
                            }
                        })
                        .collect();
                    users.sort_by_key(|u| u.id);
                    model.users = users;
                }
                Err(e) => {
                    warn!(error = %e, "user list unavailable");
                    model.set_error(CoreError::from_api(&e, None, false));
                }
            },

            Event::UserToggled { id, result } => {
                model.toggling_users.remove(&id);
                match result.map_err(|e| CoreError::from_api(&e, None, false)).and_then(|raw| {
                    User::from_raw(raw).map_err(CoreError::from)
                }) {
                    Ok(user) => {
                        let state = if user.active { "activated" } else { "deactivated" };
                        model.show_toast(format!("{} {state}", user.name), ToastKind::Success);
                        Self::dispatch_notification(model, caps, Some(notify::account_toggled(&user)));
                        match model.users.iter_mut().find(|u| u.id == user.id) {
                            Some(existing) => *existing = user,
                            None => model.users.push(user),
                        }
                    }
                    Err(e) => {
                        warn!(user_id = %id, error = %e, "user toggle failed");
                        model.set_error(e);
                    }
                }
            }

            Event::NotificationSent { user_id, result } => {
                notify::delivery_finished(user_id, &result);
            }

            Event::NotificationsFetched { result } => match result {
                Ok(raw) => model.inbox.replace(raw),
                Err(e) => model.set_error(CoreError::from_api(&e, None, false)),
            },

            Event::UnreadCountFetched { result } => match result {
                Ok(count) => model.inbox.set_unread(count.get()),
                Err(e) => debug!(error = %e, "unread count unavailable"),
            },

            Event::NotificationMarkedRead { id, result } => match result {
                Ok(()) => model.inbox.mark_read(id),
                Err(e) => model.set_error(CoreError::from_api(&e, None, false)),
            },

            Event::NotificationDeleted { id, result } => match result {
                Ok(()) => model.inbox.remove(id),
                Err(e) => model.set_error(CoreError::from_api(&e, None, false)),
            },
        }

        Self::persist_if_dirty(model, caps);
        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        let busy_reports = model.ledger.busy_reports();
        let actor = model.actor();

        let dashboard = actor.map(|actor| {
            let snapshot = Snapshot {
                reports: model.cache.get(),
                users: &model.users,
                busy_reports: &busy_reports,
                busy_users: &model.toggling_users,
            };
            projection::project(actor, &snapshot, &model.filter)
        });

        let map_geojson = match actor {
            Some(actor) => map::to_geojson_string(projection::visible_reports(
                actor,
                model.cache.get(),
                &model.filter,
            )),
            None => map::to_geojson_string(model.cache.get().iter().filter(|r| model.filter.matches(r))),
        };

        let sync_message = match &model.sync {
            SyncStatus::Degraded { .. } => {
                Some("Offline: showing the last known reports.".to_string())
            }
            SyncStatus::Syncing => Some("Refreshing reports...".to_string()),
            SyncStatus::Idle | SyncStatus::Fresh { .. } => None,
        };

        ViewModel {
            session: actor.map(|a| SessionView {
                user_id: a.id,
                name: a.name.clone(),
                role: a.role,
            }),
            dashboard,
            selected: actor.and_then(|a| Self::selected_detail(model, a, &busy_reports)),
            map_geojson,
            filter: model.filter.clone(),
            sync: SyncBanner {
                status: model.sync.clone(),
                message: sync_message,
            },
            is_creating: model.creating,
            notifications: model
                .inbox
                .items()
                .iter()
                .map(|n| NotificationItem {
                    id: n.id,
                    message: n.message.clone(),
                    is_read: n.is_read,
                    sent_at: n.sent_at.map(|t| t.to_rfc3339()),
                })
                .collect(),
            unread_notifications: model.inbox.unread(),
            error: model.active_error.as_ref().map(UserFacingError::from),
            toast: model.active_toast.as_ref().map(ToastView::from),
        }
    }
}
