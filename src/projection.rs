//! Role projection: which reports each role sees and which actions it may
//! take. Every permission decision in the core goes through [`authorize`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::CoreError;
use crate::lifecycle::{self, LifecycleEvent};
use crate::model::{
    Actor, Category, CrisisReport, ReportId, ReportStatus, Role, Severity, User, UserId,
};
use crate::DESCRIPTION_PREVIEW_LENGTH;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Respond,
    Assign,
    Start,
    Resolve,
    ForceResolve,
    Delete,
    ToggleUser,
}

impl Action {
    pub const REPORT_ACTIONS: [Self; 6] = [
        Self::Respond,
        Self::Assign,
        Self::Start,
        Self::Resolve,
        Self::ForceResolve,
        Self::Delete,
    ];

    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Respond => "respond to",
            Self::Assign => "assign",
            Self::Start => "start",
            Self::Resolve => "resolve",
            Self::ForceResolve => "force-resolve",
            Self::Delete => "delete",
            Self::ToggleUser => "toggle",
        }
    }

    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Respond => "responded to",
            Self::Assign => "assigned",
            Self::Start => "started",
            Self::Resolve => "resolved",
            Self::ForceResolve => "force-resolved",
            Self::Delete => "deleted",
            Self::ToggleUser => "toggled",
        }
    }

    /// Actions sent to the assign and status endpoints, where a rejected
    /// request means another client moved the report first.
    #[must_use]
    pub const fn is_lifecycle(self) -> bool {
        matches!(
            self,
            Self::Assign | Self::Start | Self::Resolve | Self::ForceResolve
        )
    }

    /// Lifecycle event an actor would trigger with this action, if any.
    #[must_use]
    pub const fn lifecycle_event(self, actor: &Actor) -> Option<LifecycleEvent> {
        match self {
            Self::Assign => Some(LifecycleEvent::Assign {
                responder_id: actor.id,
            }),
            Self::Start => Some(LifecycleEvent::Start),
            Self::Resolve => Some(LifecycleEvent::Resolve),
            Self::ForceResolve => Some(LifecycleEvent::AdminForceResolve),
            Self::Delete => Some(LifecycleEvent::AdminDelete),
            Self::Create | Self::Respond | Self::ToggleUser => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[must_use]
pub const fn role_capabilities(role: Role) -> &'static [Action] {
    match role {
        Role::Citizen => &[Action::Create, Action::Respond],
        Role::Responder => &[
            Action::Create,
            Action::Respond,
            Action::Assign,
            Action::Start,
            Action::Resolve,
        ],
        Role::Admin => &[
            Action::Create,
            Action::Respond,
            Action::Assign,
            Action::Start,
            Action::Resolve,
            Action::ForceResolve,
            Action::Delete,
            Action::ToggleUser,
        ],
    }
}

/// Role gate. Responders may only move reports assigned to them.
pub fn authorize(
    actor: &Actor,
    action: Action,
    report: Option<&CrisisReport>,
) -> Result<(), CoreError> {
    let forbidden = CoreError::Forbidden {
        role: actor.role,
        action,
    };
    if !role_capabilities(actor.role).contains(&action) {
        return Err(forbidden);
    }
    if actor.role == Role::Responder && matches!(action, Action::Start | Action::Resolve) {
        if let Some(report) = report {
            if !report.is_assigned_to(actor.id) {
                return Err(forbidden);
            }
        }
    }
    Ok(())
}

/// Actions that would currently succeed for `actor` on `report`.
#[must_use]
pub fn allowed_actions(actor: &Actor, report: &CrisisReport) -> Vec<Action> {
    Action::REPORT_ACTIONS
        .iter()
        .copied()
        .filter(|&action| authorize(actor, action, Some(report)).is_ok())
        .filter(|&action| match action.lifecycle_event(actor) {
            Some(event) => lifecycle::check(report, event, actor).is_ok(),
            None => !report.status.is_terminal(),
        })
        .collect()
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<Category>,
}

impl ReportFilter {
    #[must_use]
    pub fn matches(&self, report: &CrisisReport) -> bool {
        self.status.map_or(true, |s| report.status == s)
            && self.category.map_or(true, |c| report.category == c)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.category.is_none()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReportCard {
    pub id: ReportId,
    pub title: String,
    pub description_preview: String,
    pub category: Category,
    pub status: ReportStatus,
    pub severity: Severity,
    pub location: String,
    pub reporter_name: String,
    pub responder_id: Option<UserId>,
    pub responders: u32,
    pub report_time: Option<String>,
    pub allowed_actions: Vec<Action>,
    pub busy: bool,
}

impl ReportCard {
    #[must_use]
    pub fn new(report: &CrisisReport, actor: &Actor, busy: bool) -> Self {
        Self {
            id: report.id,
            title: report.title.clone(),
            description_preview: report.description_preview(DESCRIPTION_PREVIEW_LENGTH),
            category: report.category,
            status: report.status,
            severity: report.severity,
            location: report.display_location(),
            reporter_name: report.reporter_name.clone(),
            responder_id: report.responder_id,
            responders: report.responders,
            report_time: report.report_time.map(|t| t.to_rfc3339()),
            allowed_actions: allowed_actions(actor, report),
            busy,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub can_toggle: bool,
    pub busy: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportStats {
    pub total: usize,
    pub pending: usize,
    pub assigned: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub high_severity: usize,
}

impl ReportStats {
    fn collect<'a>(reports: impl IntoIterator<Item = &'a CrisisReport>) -> Self {
        reports.into_iter().fold(Self::default(), |mut stats, r| {
            stats.total += 1;
            match r.status {
                ReportStatus::Pending => stats.pending += 1,
                ReportStatus::Assigned => stats.assigned += 1,
                ReportStatus::InProgress => stats.in_progress += 1,
                ReportStatus::Resolved => stats.resolved += 1,
            }
            if r.severity == Severity::High {
                stats.high_severity += 1;
            }
            stats
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CitizenDashboard {
    pub reports: Vec<ReportCard>,
    pub can_create: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResponderDashboard {
    pub available: Vec<ReportCard>,
    pub assigned: Vec<ReportCard>,
    pub stats: ReportStats,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AdminDashboard {
    pub reports: Vec<ReportCard>,
    pub users: Vec<UserRow>,
    pub stats: ReportStats,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum RoleView {
    Citizen(CitizenDashboard),
    Responder(ResponderDashboard),
    Admin(AdminDashboard),
}

/// Borrowed state a projection is computed from.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub reports: &'a [CrisisReport],
    pub users: &'a [User],
    pub busy_reports: &'a HashSet<ReportId>,
    pub busy_users: &'a HashSet<UserId>,
}

/// Responders see unresolved reports nobody else holds. An `ASSIGNED` report
/// whose responder is unknown to this client still counts as available.
#[must_use]
pub fn is_available_to(report: &CrisisReport, responder: UserId) -> bool {
    !report.status.is_terminal() && report.responder_id.map_or(true, |r| r == responder)
}

fn newest_first(a: &&CrisisReport, b: &&CrisisReport) -> std::cmp::Ordering {
    b.report_time
        .cmp(&a.report_time)
        .then_with(|| b.id.cmp(&a.id))
}

/// Reports visible to `actor` under `filter`, newest first.
#[must_use]
pub fn visible_reports<'a>(
    actor: &Actor,
    reports: &'a [CrisisReport],
    filter: &ReportFilter,
) -> Vec<&'a CrisisReport> {
    let mut visible: Vec<&CrisisReport> = reports
        .iter()
        .filter(|r| filter.matches(r))
        .filter(|r| match actor.role {
            Role::Responder => is_available_to(r, actor.id) || r.is_assigned_to(actor.id),
            Role::Citizen | Role::Admin => true,
        })
        .collect();
    visible.sort_by(newest_first);
    visible
}

#[must_use]
pub fn project(actor: &Actor, snapshot: &Snapshot<'_>, filter: &ReportFilter) -> RoleView {
    let card = |r: &CrisisReport| ReportCard::new(r, actor, snapshot.busy_reports.contains(&r.id));
    let visible = visible_reports(actor, snapshot.reports, filter);

    match actor.role {
        Role::Citizen => RoleView::Citizen(CitizenDashboard {
            reports: visible.into_iter().map(card).collect(),
            can_create: authorize(actor, Action::Create, None).is_ok(),
        }),
        Role::Responder => {
            let (assigned, available): (Vec<&CrisisReport>, Vec<&CrisisReport>) =
                visible.into_iter().partition(|r| r.is_assigned_to(actor.id));
            RoleView::Responder(ResponderDashboard {
                stats: ReportStats::collect(assigned.iter().copied()),
                available: available.into_iter().map(card).collect(),
                assigned: assigned.into_iter().map(card).collect(),
            })
        }
        Role::Admin => RoleView::Admin(AdminDashboard {
            stats: ReportStats::collect(snapshot.reports),
            reports: visible.into_iter().map(card).collect(),
            users: snapshot
                .users
                .iter()
                .map(|u| UserRow {
                    id: u.id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    role: u.role,
                    active: u.active,
                    can_toggle: u.id != actor.id,
                    busy: snapshot.busy_users.contains(&u.id),
                })
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{admin, assigned_report, citizen, report, responder};

    fn snapshot<'a>(
        reports: &'a [CrisisReport],
        users: &'a [User],
        busy: &'a HashSet<ReportId>,
        busy_users: &'a HashSet<UserId>,
    ) -> Snapshot<'a> {
        Snapshot {
            reports,
            users,
            busy_reports: busy,
            busy_users,
        }
    }

    mod authorize_tests {
        use super::*;

        #[test]
        fn test_citizen_capabilities() {
            let c = citizen();
            assert!(authorize(&c, Action::Create, None).is_ok());
            assert!(authorize(&c, Action::Respond, None).is_ok());
            for action in [Action::Assign, Action::Start, Action::Delete, Action::ToggleUser] {
                assert!(matches!(
                    authorize(&c, action, Some(&report(1))),
                    Err(CoreError::Forbidden { .. })
                ));
            }
        }

        #[test]
        fn test_responder_moves_only_own_reports() {
            let r = responder(10);
            assert!(authorize(&r, Action::Start, Some(&assigned_report(1, 10))).is_ok());
            assert!(authorize(&r, Action::Resolve, Some(&assigned_report(1, 11))).is_err());
            assert!(authorize(&r, Action::Delete, Some(&assigned_report(1, 10))).is_err());
        }

        #[test]
        fn test_admin_allows_everything() {
            let a = admin();
            for action in role_capabilities(Role::Admin) {
                assert!(authorize(&a, *action, Some(&assigned_report(1, 10))).is_ok());
            }
        }
    }

    mod allowed_actions_tests {
        use super::*;

        #[test]
        fn test_citizen_never_sees_assign() {
            let actions = allowed_actions(&citizen(), &report(1));
            assert_eq!(actions, vec![Action::Respond]);
        }

        #[test]
        fn test_responder_actions_follow_status() {
            let r = responder(10);
            assert_eq!(
                allowed_actions(&r, &report(1)),
                vec![Action::Respond, Action::Assign]
            );
            assert_eq!(
                allowed_actions(&r, &assigned_report(1, 10)),
                vec![Action::Respond, Action::Start, Action::Resolve]
            );
            assert_eq!(allowed_actions(&r, &assigned_report(1, 11)), vec![Action::Respond]);
        }

        #[test]
        fn test_resolved_report_only_admin_actions() {
            let mut r = assigned_report(1, 10);
            r.status = ReportStatus::Resolved;
            assert!(allowed_actions(&responder(10), &r).is_empty());
            assert_eq!(
                allowed_actions(&admin(), &r),
                vec![Action::ForceResolve, Action::Delete]
            );
        }

        #[test]
        fn test_lifecycle_actions() {
            assert!(Action::Assign.is_lifecycle());
            assert!(Action::ForceResolve.is_lifecycle());
            assert!(!Action::Respond.is_lifecycle());
            assert!(!Action::Delete.is_lifecycle());
        }
    }

    mod projection_tests {
        use super::*;
        use crate::model::User;

        fn user(id: u64, role: Role) -> User {
            User {
                id: UserId(id),
                name: format!("User {id}"),
                email: format!("u{id}@example.org"),
                role,
                active: true,
                created_at: None,
            }
        }

        #[test]
        fn test_responder_lists() {
            let mut resolved = assigned_report(4, 10);
            resolved.status = ReportStatus::Resolved;
            let mut unknown_holder = report(5);
            unknown_holder.status = ReportStatus::Assigned;
            let reports = vec![
                report(1),
                assigned_report(2, 10),
                assigned_report(3, 11),
                resolved,
                unknown_holder,
            ];
            let busy = HashSet::from([ReportId(2)]);
            let none = HashSet::new();
            let view = project(
                &responder(10),
                &snapshot(&reports, &[], &busy, &none),
                &ReportFilter::default(),
            );
            let RoleView::Responder(dash) = view else {
                panic!("expected responder dashboard");
            };
            let available: Vec<_> = dash.available.iter().map(|c| c.id).collect();
            let assigned: Vec<_> = dash.assigned.iter().map(|c| c.id).collect();
            assert_eq!(available, vec![ReportId(5), ReportId(1)]);
            assert_eq!(assigned, vec![ReportId(4), ReportId(2)]);
            assert!(dash.assigned.iter().find(|c| c.id == ReportId(2)).unwrap().busy);
            assert_eq!(dash.stats.resolved, 1);
        }

        #[test]
        fn test_filter_applies() {
            let mut flood = report(2);
            flood.category = Category::Flood;
            let reports = vec![report(1), flood];
            let none = HashSet::new();
            let filter = ReportFilter {
                status: None,
                category: Some(Category::Flood),
            };
            let RoleView::Citizen(dash) =
                project(&citizen(), &snapshot(&reports, &[], &none, &HashSet::new()), &filter)
            else {
                panic!("expected citizen dashboard");
            };
            assert_eq!(dash.reports.len(), 1);
            assert_eq!(dash.reports[0].category, Category::Flood);
            assert!(dash.can_create);
        }

        #[test]
        fn test_admin_cannot_toggle_self() {
            let users = vec![user(1, Role::Admin), user(2, Role::Citizen)];
            let none = HashSet::new();
            let RoleView::Admin(dash) = project(
                &admin(),
                &snapshot(&[], &users, &none, &HashSet::new()),
                &ReportFilter::default(),
            ) else {
                panic!("expected admin dashboard");
            };
            assert!(!dash.users[0].can_toggle);
            assert!(dash.users[1].can_toggle);
        }
    }
}
