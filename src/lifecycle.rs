//! Report lifecycle state machine.
//!
//! ```text
//! PENDING --assign--> ASSIGNED --start--> IN_PROGRESS --resolve--> RESOLVED
//!    |                   |                                            ^
//!    +-------------------+-----------------resolve--------------------+
//! any --admin force-resolve--> RESOLVED      any --admin delete--> (gone)
//! ```
//!
//! Status only moves forward. Deletion is terminal and leaves no tombstone.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Actor, CrisisReport, ReportId, ReportStatus, UserId};
use crate::projection::Action;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Assign { responder_id: UserId },
    Start,
    Resolve,
    AdminForceResolve,
    AdminDelete,
}

impl LifecycleEvent {
    #[must_use]
    pub const fn action(self) -> Action {
        match self {
            Self::Assign { .. } => Action::Assign,
            Self::Start => Action::Start,
            Self::Resolve => Action::Resolve,
            Self::AdminForceResolve => Action::ForceResolve,
            Self::AdminDelete => Action::Delete,
        }
    }

    /// Status the backend is asked to record, for status-change events.
    #[must_use]
    pub const fn target_status(self) -> Option<ReportStatus> {
        match self {
            Self::Assign { .. } => Some(ReportStatus::Assigned),
            Self::Start => Some(ReportStatus::InProgress),
            Self::Resolve | Self::AdminForceResolve => Some(ReportStatus::Resolved),
            Self::AdminDelete => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Updated(CrisisReport),
    Deleted(ReportId),
}

impl Transition {
    #[must_use]
    pub fn report(&self) -> Option<&CrisisReport> {
        match self {
            Self::Updated(report) => Some(report),
            Self::Deleted(_) => None,
        }
    }
}

#[must_use]
pub const fn status_rank(status: ReportStatus) -> u8 {
    match status {
        ReportStatus::Pending => 0,
        ReportStatus::Assigned => 1,
        ReportStatus::InProgress => 2,
        ReportStatus::Resolved => 3,
    }
}

/// Checks the state and actor guards for `event` without producing a result.
pub fn check(report: &CrisisReport, event: LifecycleEvent, actor: &Actor) -> Result<(), CoreError> {
    let action = event.action();
    let invalid = || CoreError::InvalidTransition {
        from: report.status,
        action,
    };
    let forbidden = || CoreError::Forbidden {
        role: actor.role,
        action,
    };
    let assignee_or_admin = actor.is_admin() || report.is_assigned_to(actor.id);

    match event {
        LifecycleEvent::Assign { responder_id } => {
            if let Some(current) = report.responder_id {
                if current != responder_id {
                    return Err(CoreError::conflict(
                        report.id,
                        format!("already assigned to responder {current}"),
                    ));
                }
            }
            if report.status != ReportStatus::Pending {
                return Err(invalid());
            }
            if !actor.is_admin() && actor.id != responder_id {
                return Err(forbidden());
            }
        }
        LifecycleEvent::Start => {
            if report.status != ReportStatus::Assigned {
                return Err(invalid());
            }
            if !assignee_or_admin {
                return Err(forbidden());
            }
        }
        LifecycleEvent::Resolve => {
            if report.status.is_terminal() {
                return Err(invalid());
            }
            if !assignee_or_admin {
                return Err(forbidden());
            }
        }
        LifecycleEvent::AdminForceResolve | LifecycleEvent::AdminDelete => {
            if !actor.is_admin() {
                return Err(forbidden());
            }
        }
    }
    Ok(())
}

/// Computes the report that results from `event`, or why it cannot happen.
pub fn apply(
    report: &CrisisReport,
    event: LifecycleEvent,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    check(report, event, actor)?;

    let mut next = report.clone();
    match event {
        LifecycleEvent::Assign { responder_id } => {
            next.status = ReportStatus::Assigned;
            next.responder_id = Some(responder_id);
        }
        LifecycleEvent::Start => next.status = ReportStatus::InProgress,
        LifecycleEvent::Resolve | LifecycleEvent::AdminForceResolve => {
            next.status = ReportStatus::Resolved;
        }
        LifecycleEvent::AdminDelete => return Ok(Transition::Deleted(report.id)),
    }
    debug!(
        report_id = %report.id,
        from = report.status.as_str(),
        to = next.status.as_str(),
        "lifecycle transition"
    );
    Ok(Transition::Updated(next))
}

/// "I'm responding" increments the counter. Repeated responses by the same
/// user are counted again.
#[must_use]
pub fn respond(report: &CrisisReport) -> CrisisReport {
    let mut next = report.clone();
    next.responders = next.responders.saturating_add(1);
    next
}
