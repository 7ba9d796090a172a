//! Merges backend responses into the local cache and tracks optimistic
//! mutations until the backend confirms or rejects them.
//!
//! The server always wins: any server-supplied report overwrites the cached
//! one, including a value written optimistically.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::{normalize, CrisisReport, RawReport, ReportId, UserId};
use crate::offline_store::OfflineStore;
use crate::projection::Action;

#[derive(Clone, Debug, PartialEq)]
pub enum ServerResponse {
    /// Authoritative list of every report.
    FullList(Vec<RawReport>),
    /// Some reports (a filtered query); entries not present are left alone.
    PartialList(Vec<RawReport>),
    /// The reports assigned to one responder. The backend may omit the
    /// responder field, in which case the query itself implies it.
    AssignedList {
        responder_id: UserId,
        reports: Vec<RawReport>,
    },
    Single(RawReport),
    Deleted(ReportId),
    Failed(ApiError),
}

impl ServerResponse {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FullList(_) => "full_list",
            Self::PartialList(_) => "partial_list",
            Self::AssignedList { .. } => "assigned_list",
            Self::Single(_) => "single",
            Self::Deleted(_) => "deleted",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Fresh {
        at_ms: u64,
    },
    /// Serving cached data because the backend could not be reached.
    Degraded {
        reason: String,
    },
}

impl SyncStatus {
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

#[derive(Debug, PartialEq)]
pub struct MergedView<'a> {
    pub reports: &'a [CrisisReport],
    pub sync: SyncStatus,
    /// Server records dropped because they failed validation.
    pub rejected: usize,
}

fn normalize_all(raw: Vec<RawReport>) -> (Vec<CrisisReport>, usize) {
    let total = raw.len();
    let reports: Vec<CrisisReport> = raw
        .into_iter()
        .filter_map(|r| match normalize(r) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "dropping invalid report from server");
                None
            }
        })
        .collect();
    let rejected = total - reports.len();
    (reports, rejected)
}

/// Records that omit the responder keep the one already cached, as long as
/// their status still admits one.
fn upsert_keeping_responder(cache: &mut OfflineStore, mut report: CrisisReport) {
    if report.responder_id.is_none() && report.status.allows_responder() {
        report.responder_id = cache.find(report.id).and_then(|cached| cached.responder_id);
    }
    cache.upsert(report);
}

#[instrument(skip_all, fields(response = response.kind()))]
pub fn reconcile(response: ServerResponse, cache: &mut OfflineStore, now_ms: u64) -> MergedView<'_> {
    let fresh = SyncStatus::Fresh { at_ms: now_ms };
    let (sync, rejected) = match response {
        ServerResponse::FullList(raw) => {
            let (reports, rejected) = normalize_all(raw);
            info!(count = reports.len(), rejected, "replacing cached reports");
            cache.put(reports);
            (fresh, rejected)
        }
        ServerResponse::PartialList(raw) => {
            let (reports, rejected) = normalize_all(raw);
            debug!(count = reports.len(), rejected, "merging partial report list");
            for report in reports {
                upsert_keeping_responder(cache, report);
            }
            (fresh, rejected)
        }
        ServerResponse::AssignedList {
            responder_id,
            reports: raw,
        } => {
            let (reports, rejected) = normalize_all(raw);
            for mut report in reports {
                if report.responder_id.is_none() && report.status.allows_responder() {
                    report.responder_id = Some(responder_id);
                }
                cache.upsert(report);
            }
            (fresh, rejected)
        }
        ServerResponse::Single(raw) => match normalize(raw) {
            Ok(report) => {
                upsert_keeping_responder(cache, report);
                (fresh, 0)
            }
            Err(e) => {
                warn!(error = %e, "server returned an invalid report");
                (
                    SyncStatus::Degraded {
                        reason: format!("invalid report from server: {e}"),
                    },
                    1,
                )
            }
        },
        ServerResponse::Deleted(id) => {
            if cache.remove(id).is_none() {
                debug!(report_id = %id, "deleted report was not cached");
            }
            (fresh, 0)
        }
        ServerResponse::Failed(error) => {
            warn!(error = %error, cached = cache.len(), "backend unreachable, serving cache");
            (
                SyncStatus::Degraded {
                    reason: error.to_string(),
                },
                0,
            )
        }
    };

    MergedView {
        reports: cache.get(),
        sync,
        rejected,
    }
}

/// A mutation sent to the backend and not yet answered.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingMutation {
    pub mutation_id: String,
    pub report_id: ReportId,
    pub action: Action,
    /// Cached value before the mutation, used for rollback.
    pub snapshot: CrisisReport,
    /// Value written to the cache ahead of confirmation. `None` for
    /// mutations that wait for the backend (deletes).
    pub optimistic: Option<CrisisReport>,
    pub started_at_ms: u64,
}

/// At most one mutation per report is in flight.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationLedger {
    pending: HashMap<ReportId, PendingMutation>,
}

impl MutationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_busy(&self, id: ReportId) -> bool {
        self.pending.contains_key(&id)
    }

    #[must_use]
    pub fn pending(&self, id: ReportId) -> Option<&PendingMutation> {
        self.pending.get(&id)
    }

    #[must_use]
    pub fn busy_reports(&self) -> HashSet<ReportId> {
        self.pending.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Registers a mutation and writes the optimistic value, if any. Returns
    /// `None` when the report already has a mutation in flight.
    pub fn begin(
        &mut self,
        cache: &mut OfflineStore,
        snapshot: CrisisReport,
        action: Action,
        optimistic: Option<CrisisReport>,
        now_ms: u64,
    ) -> Option<String> {
        let report_id = snapshot.id;
        if self.is_busy(report_id) {
            debug!(report_id = %report_id, action = %action, "mutation already in flight");
            return None;
        }
        let mutation_id = Uuid::new_v4().to_string();
        if let Some(value) = &optimistic {
            cache.upsert(value.clone());
        }
        self.pending.insert(
            report_id,
            PendingMutation {
                mutation_id: mutation_id.clone(),
                report_id,
                action,
                snapshot,
                optimistic,
                started_at_ms: now_ms,
            },
        );
        Some(mutation_id)
    }

    fn take(&mut self, mutation_id: &str) -> Option<PendingMutation> {
        let report_id = self
            .pending
            .values()
            .find(|m| m.mutation_id == mutation_id)
            .map(|m| m.report_id)?;
        self.pending.remove(&report_id)
    }

    /// The backend accepted the mutation. The caller merges its response.
    pub fn confirm(&mut self, mutation_id: &str) -> Option<PendingMutation> {
        let entry = self.take(mutation_id);
        if entry.is_none() {
            debug!(mutation_id, "confirmation for unknown mutation");
        }
        entry
    }

    /// The backend rejected the mutation. Restores the snapshot unless the
    /// cached entry has moved on since the optimistic write.
    pub fn rollback(&mut self, mutation_id: &str, cache: &mut OfflineStore) -> Option<PendingMutation> {
        let entry = self.take(mutation_id)?;
        if let Some(optimistic) = &entry.optimistic {
            if cache.find(entry.report_id) == Some(optimistic) {
                cache.upsert(entry.snapshot.clone());
                info!(report_id = %entry.report_id, action = %entry.action, "rolled back optimistic update");
            } else {
                debug!(report_id = %entry.report_id, "cache changed since optimistic write, keeping it");
            }
        }
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
