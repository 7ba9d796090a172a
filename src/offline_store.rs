//! Local report cache: the last known list of reports, persisted under a
//! single key as a JSON array so older clients can read the same entry.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{normalize, CrisisReport, RawReport, ReportId, ReportStatus, UserId};

pub const DEFAULT_CACHE_KEY: &str = "crisisReports";
const MAX_STORE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store too large: {size} bytes, max {max}")]
    StoreTooLarge { size: usize, max: usize },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Partial update applied to a cached report. Absent fields are left alone.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
    pub responder_id: Option<UserId>,
    pub responders: Option<u32>,
}

impl ReportPatch {
    #[must_use]
    pub fn status(status: ReportStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn apply(&self, report: &mut CrisisReport) {
        if let Some(status) = self.status {
            report.status = status;
        }
        if let Some(responder) = self.responder_id {
            report.responder_id = Some(responder);
        }
        if let Some(responders) = self.responders {
            report.responders = responders;
        }
    }
}

/// In-memory mirror of the cached report list.
///
/// Every mutation bumps `revision`; the app persists whenever the revision is
/// ahead of the last persisted one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfflineStore {
    reports: Vec<CrisisReport>,
    revision: u64,
    persisted_revision: u64,
}

impl OfflineStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never fails; an empty or unreadable cache is an empty list.
    #[must_use]
    pub fn get(&self) -> &[CrisisReport] {
        &self.reports
    }

    #[must_use]
    pub fn find(&self, id: ReportId) -> Option<&CrisisReport> {
        self.reports.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn put(&mut self, reports: Vec<CrisisReport>) {
        let mut deduped: Vec<CrisisReport> = Vec::with_capacity(reports.len());
        for report in reports {
            match deduped.iter_mut().find(|r| r.id == report.id) {
                Some(existing) => *existing = report,
                None => deduped.push(report),
            }
        }
        self.reports = deduped;
        self.touch();
    }

    /// Applies `patch` to the report with `id`. Unknown ids are a no-op.
    pub fn patch(&mut self, id: ReportId, patch: &ReportPatch) -> bool {
        let Some(report) = self.reports.iter_mut().find(|r| r.id == id) else {
            debug!(report_id = %id, "patch skipped, report not cached");
            return false;
        };
        patch.apply(report);
        self.touch();
        true
    }

    /// Replaces the entry with the same id in place. Unknown reports go first.
    pub fn upsert(&mut self, report: CrisisReport) {
        match self.reports.iter_mut().find(|r| r.id == report.id) {
            Some(existing) => *existing = report,
            None => self.reports.insert(0, report),
        }
        self.touch();
    }

    pub fn remove(&mut self, id: ReportId) -> Option<CrisisReport> {
        let index = self.reports.iter().position(|r| r.id == id)?;
        self.touch();
        Some(self.reports.remove(index))
    }

    pub fn clear(&mut self) {
        self.reports.clear();
        self.touch();
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.revision != self.persisted_revision
    }

    pub fn mark_persisted(&mut self) {
        self.persisted_revision = self.revision;
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let bytes = serde_json::to_vec(&self.reports)?;
        if bytes.len() > MAX_STORE_BYTES {
            return Err(StoreError::StoreTooLarge {
                size: bytes.len(),
                max: MAX_STORE_BYTES,
            });
        }
        Ok(bytes)
    }

    /// Hydrates from a persisted entry. Corrupt entries yield an empty store;
    /// individual records that fail validation are dropped.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::default();
        }
        if bytes.len() > MAX_STORE_BYTES {
            warn!(size = bytes.len(), "cached reports exceed size limit, ignoring");
            return Self::default();
        }
        let raw: Vec<RawReport> = match serde_json::from_slice(bytes) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "cached reports unreadable, starting empty");
                return Self::default();
            }
        };

        let total = raw.len();
        let reports: Vec<CrisisReport> = raw
            .into_iter()
            .filter_map(|r| match normalize(r) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(error = %e, "dropping invalid cached report");
                    None
                }
            })
            .collect();
        debug!(loaded = reports.len(), total, "hydrated report cache");

        let mut store = Self::default();
        store.put(reports);
        store.mark_persisted();
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{assigned_report, report};

    mod store_tests {
        use super::*;

        #[test]
        fn test_empty_store() {
            let store = OfflineStore::new();
            assert!(store.get().is_empty());
            assert!(!store.is_dirty());
        }

        #[test]
        fn test_put_dedupes_by_id() {
            let mut store = OfflineStore::new();
            let mut second = report(1);
            second.title = "Updated".into();
            store.put(vec![report(1), report(2), second]);
            assert_eq!(store.len(), 2);
            assert_eq!(store.find(ReportId(1)).unwrap().title, "Updated");
        }

        #[test]
        fn test_patch_and_missing_patch() {
            let mut store = OfflineStore::new();
            store.put(vec![report(1)]);
            let revision = store.revision();

            assert!(store.patch(
                ReportId(1),
                &ReportPatch {
                    status: Some(ReportStatus::Assigned),
                    responder_id: Some(UserId(7)),
                    responders: None,
                }
            ));
            let r = store.find(ReportId(1)).unwrap();
            assert_eq!(r.status, ReportStatus::Assigned);
            assert_eq!(r.responder_id, Some(UserId(7)));
            assert!(store.revision() > revision);

            let revision = store.revision();
            assert!(!store.patch(ReportId(99), &ReportPatch::status(ReportStatus::Resolved)));
            assert_eq!(store.revision(), revision);
        }

        #[test]
        fn test_upsert_and_remove() {
            let mut store = OfflineStore::new();
            store.upsert(report(1));
            store.upsert(assigned_report(1, 5));
            assert_eq!(store.len(), 1);
            assert_eq!(store.find(ReportId(1)).unwrap().responder_id, Some(UserId(5)));

            store.upsert(report(2));
            assert_eq!(store.get()[0].id, ReportId(2));

            assert!(store.remove(ReportId(1)).is_some());
            assert!(store.remove(ReportId(1)).is_none());
            assert_eq!(store.len(), 1);
        }

        #[test]
        fn test_dirty_tracking() {
            let mut store = OfflineStore::new();
            store.upsert(report(1));
            assert!(store.is_dirty());
            store.mark_persisted();
            assert!(!store.is_dirty());
        }
    }

    mod persistence_tests {
        use super::*;

        #[test]
        fn test_bytes_round_trip() {
            let mut store = OfflineStore::new();
            store.put(vec![report(1), assigned_report(2, 8)]);
            let bytes = store.to_bytes().unwrap();
            let restored = OfflineStore::from_bytes(&bytes);
            assert_eq!(restored.get(), store.get());
            assert!(!restored.is_dirty());
        }

        #[test]
        fn test_corrupt_bytes_yield_empty() {
            assert!(OfflineStore::from_bytes(b"{not json").is_empty());
            assert!(OfflineStore::from_bytes(b"").is_empty());
        }

        #[test]
        fn test_legacy_entries_are_normalized() {
            let json = br#"[
                {"id": 1, "title": "Flood", "description": "water rising", "category": "FLOOD",
                 "status": "ACTIVE", "address": "River Rd"},
                {"id": 2, "title": "", "description": "x", "category": "FIRE", "address": "A"}
            ]"#;
            let store = OfflineStore::from_bytes(json);
            assert_eq!(store.len(), 1);
            assert_eq!(store.get()[0].status, ReportStatus::Pending);
        }
    }
}
