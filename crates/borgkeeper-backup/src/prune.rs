//! Retention of platform snapshots

use borgkeeper_core::{Error, Result};
use borgkeeper_supervisor::{BackupRecord, SnapshotApi};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one pruning pass
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Slugs that were deleted
    pub removed: Vec<String>,
    /// Deletions that failed; never fatal
    pub failures: Vec<Error>,
}

/// Snapshots to delete so that only the newest `keep` remain, oldest first
pub fn select_for_removal(mut records: Vec<BackupRecord>, keep: usize) -> Vec<BackupRecord> {
    records.sort_by(|a, b| a.date.cmp(&b.date));
    let excess = records.len().saturating_sub(keep);
    records.truncate(excess);
    records
}

/// Deletes platform snapshots beyond the retention count
pub struct RetentionPruner {
    platform: Arc<dyn SnapshotApi>,
    keep: usize,
}

impl RetentionPruner {
    pub fn new(platform: Arc<dyn SnapshotApi>, keep: u32) -> Self {
        Self {
            platform,
            keep: keep as usize,
        }
    }

    /// Delete the oldest snapshots
    ///
    /// Fails only when the listing cannot be fetched; individual deletions are
    /// logged and collected in the report.
    pub async fn prune(&self) -> Result<PruneReport> {
        let records = self.platform.list().await?;
        let total = records.len();
        let doomed = select_for_removal(records, self.keep);
        info!(
            "Keeping {} of {} platform snapshots, removing {}",
            total - doomed.len(),
            total,
            doomed.len()
        );

        let mut report = PruneReport::default();
        for record in doomed {
            info!("Removing old snapshot: {} ({})", record.name, record.slug);
            match self.platform.delete(&record.slug).await {
                Ok(()) => report.removed.push(record.slug),
                Err(e) => {
                    let failure = Error::prune_entry(&record.slug, e.to_string());
                    warn!("{}", failure);
                    report.failures.push(failure);
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    fn record(slug: &str, day: u32) -> BackupRecord {
        BackupRecord {
            slug: slug.to_string(),
            name: format!("borg-{}", slug),
            date: Utc.with_ymd_and_hms(2024, 5, day, 2, 0, 0).unwrap(),
            size: None,
        }
    }

    fn slugs(records: &[BackupRecord]) -> Vec<&str> {
        records.iter().map(|r| r.slug.as_str()).collect()
    }

    #[test]
    fn test_removes_oldest_beyond_keep() {
        let records = vec![record("d3", 3), record("d1", 1), record("d5", 5), record("d2", 2), record("d4", 4)];
        assert_eq!(slugs(&select_for_removal(records, 2)), ["d1", "d2", "d3"]);
    }

    #[test]
    fn test_removal_count_is_max_of_zero_and_excess() {
        for n in 0..8u32 {
            for keep in 1..6usize {
                let records: Vec<_> = (1..=n).map(|d| record(&format!("s{}", d), d)).collect();
                let removed = select_for_removal(records, keep);
                assert_eq!(removed.len(), (n as usize).saturating_sub(keep));
                // the oldest are chosen
                for (i, r) in removed.iter().enumerate() {
                    assert_eq!(r.slug, format!("s{}", i + 1));
                }
            }
        }
    }

    struct FakePlatform {
        records: Vec<BackupRecord>,
        broken: &'static str,
        deleted: Mutex<Vec<String>>,
        listable: bool,
    }

    #[async_trait]
    impl SnapshotApi for FakePlatform {
        async fn create_full(&self, _name: &str) -> Result<String> {
            unreachable!()
        }

        async fn list(&self) -> Result<Vec<BackupRecord>> {
            if !self.listable {
                return Err(Error::api_call("list snapshots", "status 500"));
            }
            Ok(self.records.clone())
        }

        async fn delete(&self, slug: &str) -> Result<()> {
            if slug == self.broken {
                return Err(Error::api_call("delete snapshot", "status 500"));
            }
            self.deleted.lock().unwrap().push(slug.to_string());
            Ok(())
        }

        async fn restore_full(&self, _slug: &str) -> Result<()> {
            unreachable!()
        }
    }

    fn platform(count: u32, broken: &'static str, listable: bool) -> Arc<FakePlatform> {
        Arc::new(FakePlatform {
            records: (1..=count).rev().map(|d| record(&format!("s{}", d), d)).collect(),
            broken,
            deleted: Mutex::new(Vec::new()),
            listable,
        })
    }

    #[tokio::test]
    async fn test_failed_deletion_does_not_stop_pruning() {
        let fake = platform(8, "s2", true);
        let report = RetentionPruner::new(fake.clone(), 5).prune().await.unwrap();

        assert_eq!(report.removed, ["s1", "s3"]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(&report.failures[0], Error::PruneEntry { slug, .. } if slug == "s2"));
        assert_eq!(*fake.deleted.lock().unwrap(), ["s1", "s3"]);
    }

    #[tokio::test]
    async fn test_list_failure_fails_pruning() {
        let fake = platform(8, "", false);
        let err = RetentionPruner::new(fake.clone(), 5).prune().await.unwrap_err();

        assert!(matches!(err, Error::ApiCall { .. }));
        assert!(fake.deleted.lock().unwrap().is_empty());
    }
}
