use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::db::record_store::{RangeScan, RecordStore};
use crate::errors::QueryError;
use crate::models::granularity::Granularity;
use crate::models::metric_point::Page;
use crate::services::metrics::MetricsReporter;

/// A validated request for one page of a range read.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub participant_ids: Vec<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularity: Granularity,
    pub cursor: Option<DateTime<Utc>>,
    pub limit: u32,
}

impl PageQuery {
    pub fn new(
        participant_ids: Vec<i32>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        granularity: Granularity,
        cursor: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Self, QueryError> {
        if participant_ids.is_empty() {
            return Err(QueryError::invalid("At least one participant id is required."));
        }
        if start_date > end_date {
            return Err(QueryError::invalid("start_date must be before or equal to end_date."));
        }
        if limit == 0 {
            return Err(QueryError::invalid("limit must be a positive integer."));
        }
        Ok(Self {
            participant_ids,
            start_date,
            end_date,
            granularity,
            cursor,
            limit,
        })
    }
}

/// Fetch one page of records and the cursor to resume from.
///
/// One extra row is requested beyond `limit`; if it arrives, its time value
/// becomes `next_cursor` and the page stops before that instant. A page never
/// splits the rows sharing one instant, so resuming from `next_cursor`
/// (inclusive) neither repeats nor skips a row. The exception is more than
/// `limit` rows on one instant: the page then holds the first `limit` of them
/// and the cursor moves one microsecond past, dropping the rest.
#[tracing::instrument(
    name = "Fetch range page",
    skip(store, query, metrics),
    fields(
        granularity = %query.granularity,
        participants = query.participant_ids.len(),
        limit = query.limit,
        cursor = ?query.cursor
    )
)]
pub async fn fetch_page<S>(
    store: &S,
    query: &PageQuery,
    metrics: &dyn MetricsReporter,
) -> Result<Page, QueryError>
where
    S: RecordStore + ?Sized,
{
    let limit = query.limit as usize;
    let scan = RangeScan {
        granularity: query.granularity,
        participant_ids: query.participant_ids.clone(),
        start_date: query.start_date,
        end_date: query.end_date,
        from: query.cursor,
        max_rows: i64::from(query.limit) + 1,
    };

    let mut records = store.scan(&scan).await.map_err(|e| {
        tracing::error!(backend = store.backend_type(), error = %e, "Range scan failed");
        QueryError::StoreUnavailable(e)
    })?;

    let next_cursor = if records.len() > limit {
        let boundary = records[limit].time();
        let keep = records[..limit]
            .iter()
            .position(|record| record.time() == boundary)
            .unwrap_or(limit);
        if keep == 0 {
            tracing::warn!(
                at = %boundary,
                limit,
                "More rows share one instant than fit in a page, skipping the excess"
            );
            records.truncate(limit);
            Some(boundary + Duration::microseconds(1))
        } else {
            records.truncate(keep);
            Some(boundary)
        }
    } else {
        None
    };

    let records: Vec<_> = records
        .into_iter()
        .map(|record| record.with_level(query.granularity))
        .collect();

    metrics.page_served(query.granularity, records.len());
    tracing::debug!(points = records.len(), next_cursor = ?next_cursor, "Range page fetched");

    Ok(Page {
        records,
        next_cursor,
    })
}
