//! Chronological feed paginator
//!
//! One page of the feed is one distinct calendar day, not a fixed record
//! count: a day with 200 eligible contexts and a day with 1 are both
//! exactly one page. Page N is the Nth most recent distinct day among
//! eligible contexts after filters apply.
//!
//! Resolution runs in two queries: a projection-only scan of eligible
//! publish dates ranks the distinct days, then the chosen day's exact
//! window is re-queried for full documents. Day grouping is UTC.

use bson::{doc, DateTime};
use chrono::NaiveDate;
use futures_util::StreamExt;
use mongodb::options::FindOptions;
use tracing::warn;

use super::dedup_contexts;
use super::filters::FeedFilter;
use super::resolution::{EmptyReason, Resolution};
use crate::db::collections::Collections;
use crate::db::schemas::{ContextDoc, CONTEXT_COLLECTION};
use crate::db::MongoClient;
use crate::types::{Result, VeeriveError};

/// Inclusive end offset of a UTC day window: 23:59:59.999
const DAY_END_OFFSET_MILLIS: i64 = 24 * 60 * 60 * 1000 - 1;

/// One resolved feed page: a single day's contexts plus paging state
#[derive(Debug, Clone)]
pub struct DayPage {
    /// The calendar day this page covers
    pub day: NaiveDate,
    /// Window start, 00:00:00.000 UTC
    pub start: DateTime,
    /// Window end, 23:59:59.999 UTC
    pub end: DateTime,
    /// The day's contexts, display order first, then recency
    pub contexts: Vec<ContextDoc>,
    /// Whether older days exist past this page
    pub has_more: bool,
    /// Total distinct eligible days under the active filter
    pub total_days: usize,
}

/// UTC calendar day of a stored timestamp.
pub fn day_of(ts: DateTime) -> NaiveDate {
    ts.to_chrono().date_naive()
}

/// Distinct days among the given timestamps, most recent first.
pub fn rank_days(timestamps: &[DateTime]) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = timestamps.iter().map(|ts| day_of(*ts)).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();
    days
}

/// Inclusive window [00:00:00.000, 23:59:59.999] of a UTC day.
pub fn day_bounds(day: NaiveDate) -> (DateTime, DateTime) {
    let start_millis = day
        .and_time(chrono::NaiveTime::MIN)
        .and_utc()
        .timestamp_millis();
    (
        DateTime::from_millis(start_millis),
        DateTime::from_millis(start_millis + DAY_END_OFFSET_MILLIS),
    )
}

/// Day at rank `page` (1-based, 1 = most recent), if in range.
pub fn page_day(days: &[NaiveDate], page: u32) -> Option<NaiveDate> {
    let index = (page as usize).checked_sub(1)?;
    days.get(index).copied()
}

/// Whether pages exist past `page`.
pub fn has_more(total_days: usize, page: u32) -> bool {
    (page as usize) < total_days
}

/// Resolve page `page` of the feed under `filter`.
///
/// A page past the last distinct day is a soft miss, not an error; only
/// `page == 0` is rejected as invalid input.
pub async fn resolve_page(
    client: &MongoClient,
    collections: &Collections,
    filter: &FeedFilter,
    page: u32,
) -> Result<Resolution<DayPage>> {
    if page == 0 {
        return Err(VeeriveError::Validation(
            "page must be 1 or greater".to_string(),
        ));
    }

    let timestamps = eligible_publish_dates(client, filter).await?;
    let days = rank_days(&timestamps);

    let Some(day) = page_day(&days, page) else {
        return Ok(Resolution::Empty(EmptyReason::PageOutOfRange));
    };

    let (start, end) = day_bounds(day);
    let options = FindOptions::builder()
        .sort(doc! { "display_order": 1, "publish_date": -1 })
        // PDF bytes stay in the database until the download route
        .projection(doc! { "pdf.data": 0 })
        .build();
    let contexts = collections
        .contexts
        .find_many_with_options(filter.to_day_filter(start, end), Some(options))
        .await?;

    Ok(Resolution::Found(DayPage {
        day,
        start,
        end,
        contexts: dedup_contexts(contexts),
        has_more: has_more(days.len(), page),
        total_days: days.len(),
    }))
}

/// Projection-only scan of eligible publish dates, most recent first.
async fn eligible_publish_dates(client: &MongoClient, filter: &FeedFilter) -> Result<Vec<DateTime>> {
    let mut scan_filter = filter.to_filter();
    // Raw collection access skips the typed layer's soft-delete guard
    scan_filter.insert("metadata.is_deleted", doc! { "$ne": true });

    let options = FindOptions::builder()
        .projection(doc! { "publish_date": 1 })
        .sort(doc! { "publish_date": -1 })
        .build();

    let cursor = client
        .raw_collection(CONTEXT_COLLECTION)
        .find(scan_filter)
        .with_options(options)
        .await
        .map_err(|e| VeeriveError::Database(format!("Publish date scan failed: {}", e)))?;

    let timestamps: Vec<DateTime> = cursor
        .filter_map(|doc| async {
            match doc {
                Ok(d) => d.get_datetime("publish_date").copied().ok(),
                Err(e) => {
                    warn!("Error reading publish date: {}", e);
                    None
                }
            }
        })
        .collect()
        .await;

    Ok(timestamps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime {
        DateTime::from_chrono(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
    }

    #[test]
    fn test_rank_days_distinct_descending() {
        let stamps = vec![
            ts(2026, 3, 10, 9),
            ts(2026, 3, 12, 1),
            ts(2026, 3, 10, 23),
            ts(2026, 3, 11, 12),
            ts(2026, 3, 12, 18),
        ];
        let days = rank_days(&stamps);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2026, 3, 12).unwrap());
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2026, 3, 11).unwrap());
        assert_eq!(days[2], NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
    }

    #[test]
    fn test_day_bounds_cover_whole_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        let (start, end) = day_bounds(day);

        assert_eq!(end.timestamp_millis() - start.timestamp_millis(), 86_399_999);
        assert_eq!(day_of(start), day);
        assert_eq!(day_of(end), day);
        // One millisecond past the window lands on the next day
        assert_eq!(
            day_of(DateTime::from_millis(end.timestamp_millis() + 1)),
            NaiveDate::from_ymd_opt(2026, 3, 13).unwrap()
        );
    }

    #[test]
    fn test_page_day_is_one_based() {
        let days = vec![
            NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
        ];
        assert_eq!(page_day(&days, 1), Some(days[0]));
        assert_eq!(page_day(&days, 2), Some(days[1]));
        assert_eq!(page_day(&days, 3), None);
        assert_eq!(page_day(&days, 0), None);
    }

    #[test]
    fn test_has_more_counts_pages() {
        assert!(has_more(3, 1));
        assert!(has_more(3, 2));
        assert!(!has_more(3, 3));
        assert!(!has_more(3, 4));
        assert!(!has_more(0, 1));
    }

    #[test]
    fn test_midnight_boundary_groups_by_utc_day() {
        // 23:59 and next day 00:00 are distinct pages
        let stamps = vec![
            DateTime::from_chrono(Utc.with_ymd_and_hms(2026, 3, 11, 23, 59, 59).unwrap()),
            DateTime::from_chrono(Utc.with_ymd_and_hms(2026, 3, 12, 0, 0, 0).unwrap()),
        ];
        let days = rank_days(&stamps);
        assert_eq!(days.len(), 2);
    }
}
