//! Taxonomy cache
//!
//! The sector/sub-sector lists back every feed-filter dropdown and every
//! name-to-id resolution, change rarely, and are small. This cache holds
//! one immutable snapshot behind a TTL and refetches lazily on the first
//! read after expiry. Writes that touch taxonomy call [`TaxonomyCache::invalidate`]
//! instead of waiting out the TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bson::{doc, oid::ObjectId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::collections::Collections;
use crate::db::schemas::{SectorDoc, SubSectorDoc};
use crate::types::Result;

/// Immutable point-in-time copy of the sector/sub-sector taxonomy
#[derive(Debug, Clone, Default)]
pub struct TaxonomySnapshot {
    pub sectors: Vec<SectorDoc>,
    pub sub_sectors: Vec<SubSectorDoc>,
}

impl TaxonomySnapshot {
    /// Resolve a sector display name to its id, case-insensitively.
    pub fn sector_id_by_name(&self, name: &str) -> Option<ObjectId> {
        self.sectors
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .and_then(|s| s._id)
    }

    /// Resolve a sub-sector display name to its id, case-insensitively.
    pub fn sub_sector_id_by_name(&self, name: &str) -> Option<ObjectId> {
        self.sub_sectors
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .and_then(|s| s._id)
    }

    pub fn sector_name(&self, id: &ObjectId) -> Option<&str> {
        self.sectors
            .iter()
            .find(|s| s._id.as_ref() == Some(id))
            .map(|s| s.name.as_str())
    }

    pub fn sub_sector_name(&self, id: &ObjectId) -> Option<&str> {
        self.sub_sectors
            .iter()
            .find(|s| s._id.as_ref() == Some(id))
            .map(|s| s.name.as_str())
    }

    /// Sub-sectors belonging to the given sector, in stored order.
    pub fn children_of(&self, sector_id: &ObjectId) -> Vec<&SubSectorDoc> {
        self.sub_sectors
            .iter()
            .filter(|s| s.sector_id == *sector_id)
            .collect()
    }
}

struct CachedSnapshot {
    snapshot: Arc<TaxonomySnapshot>,
    fetched_at: Instant,
}

/// TTL cache over the taxonomy snapshot.
///
/// Constructed once at startup and shared through app state. Reads go
/// through [`snapshot`](Self::snapshot), which refetches when the cached
/// copy is older than the TTL.
pub struct TaxonomyCache {
    ttl: Duration,
    slot: RwLock<Option<CachedSnapshot>>,
}

impl TaxonomyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Current snapshot, refetched from Mongo if missing or expired.
    pub async fn snapshot(&self, collections: &Collections) -> Result<Arc<TaxonomySnapshot>> {
        if let Some(snapshot) = self.peek().await {
            return Ok(snapshot);
        }

        let mut guard = self.slot.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.snapshot));
            }
        }

        let sectors = collections.sectors.find_many(doc! {}).await?;
        let sub_sectors = collections.sub_sectors.find_many(doc! {}).await?;
        debug!(
            sectors = sectors.len(),
            sub_sectors = sub_sectors.len(),
            "refreshed taxonomy cache"
        );

        let snapshot = Arc::new(TaxonomySnapshot {
            sectors,
            sub_sectors,
        });
        *guard = Some(CachedSnapshot {
            snapshot: Arc::clone(&snapshot),
            fetched_at: Instant::now(),
        });

        Ok(snapshot)
    }

    /// Cached snapshot if present and fresh; never touches the database.
    pub async fn peek(&self) -> Option<Arc<TaxonomySnapshot>> {
        let guard = self.slot.read().await;
        guard.as_ref().and_then(|cached| {
            (cached.fetched_at.elapsed() < self.ttl).then(|| Arc::clone(&cached.snapshot))
        })
    }

    /// Drop the cached snapshot so the next read refetches.
    pub async fn invalidate(&self) {
        let mut guard = self.slot.write().await;
        *guard = None;
    }

    /// Store a snapshot directly, stamping it fresh.
    pub async fn store(&self, snapshot: Arc<TaxonomySnapshot>) {
        let mut guard = self.slot.write().await;
        *guard = Some(CachedSnapshot {
            snapshot,
            fetched_at: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Metadata;

    fn sample_snapshot() -> TaxonomySnapshot {
        let retail = ObjectId::new();
        let fintech = ObjectId::new();
        let bnpl = ObjectId::new();
        TaxonomySnapshot {
            sectors: vec![
                SectorDoc {
                    _id: Some(retail),
                    metadata: Metadata::default(),
                    name: "Retail".to_string(),
                },
                SectorDoc {
                    _id: Some(fintech),
                    metadata: Metadata::default(),
                    name: "Fintech".to_string(),
                },
            ],
            sub_sectors: vec![SubSectorDoc {
                _id: Some(bnpl),
                metadata: Metadata::default(),
                name: "BNPL".to_string(),
                sector_id: fintech,
            }],
        }
    }

    #[test]
    fn test_name_lookup_is_case_insensitive() {
        let snapshot = sample_snapshot();
        assert!(snapshot.sector_id_by_name("fintech").is_some());
        assert!(snapshot.sector_id_by_name("FINTECH").is_some());
        assert!(snapshot.sector_id_by_name("nope").is_none());
        assert!(snapshot.sub_sector_id_by_name("bnpl").is_some());
    }

    #[test]
    fn test_children_grouped_by_parent() {
        let snapshot = sample_snapshot();
        let fintech = snapshot.sector_id_by_name("Fintech").unwrap();
        let retail = snapshot.sector_id_by_name("Retail").unwrap();
        assert_eq!(snapshot.children_of(&fintech).len(), 1);
        assert!(snapshot.children_of(&retail).is_empty());
    }

    #[tokio::test]
    async fn test_peek_respects_ttl_and_invalidate() {
        let cache = TaxonomyCache::new(Duration::from_secs(300));
        assert!(cache.peek().await.is_none());

        cache.store(Arc::new(sample_snapshot())).await;
        assert!(cache.peek().await.is_some());

        cache.invalidate().await;
        assert!(cache.peek().await.is_none());

        // Zero TTL means every stored snapshot is already stale
        let cache = TaxonomyCache::new(Duration::ZERO);
        cache.store(Arc::new(sample_snapshot())).await;
        assert!(cache.peek().await.is_none());
    }
}
