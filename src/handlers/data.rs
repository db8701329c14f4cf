use std::collections::BTreeMap;

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;

use crate::config::settings::PaginationSettings;
use crate::db::record_store::RecordStore;
use crate::errors::QueryError;
use crate::handlers::finish;
use crate::handlers::query_params::QueryParams;
use crate::models::granularity::Granularity;
use crate::models::metric_point::{DataPoint, HEART_RATE_METRIC};
use crate::services::aggregation_selector::{select_granularity, span_days};
use crate::services::metrics::MetricsReporter;
use crate::services::range_query::{fetch_page, PageQuery};

const MINUTES_PER_DAY: i64 = 1_440;

#[derive(Debug, Serialize)]
pub struct DataMetadata {
    pub aggregation_level: Granularity,
    pub query_span_days: i64,
    pub total_points: usize,
    pub participant_ids: Vec<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub next_cursor: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: Vec<DataPoint>,
    pub metadata: DataMetadata,
}

pub(crate) fn date_range(params: &QueryParams) -> Result<(NaiveDate, NaiveDate), QueryError> {
    let start_date = params.required_date("start_date")?;
    let end_date = params.required_date("end_date")?;
    if start_date > end_date {
        return Err(QueryError::invalid("start_date must be before or equal to end_date."));
    }
    Ok((start_date, end_date))
}

#[tracing::instrument(
    name = "Get heart rate data",
    skip(req, store, metrics, pagination),
    fields(query = %req.query_string())
)]
pub async fn get_data(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
    pagination: web::Data<PaginationSettings>,
) -> HttpResponse {
    let params = QueryParams::from_request(&req);
    let result = query_data(&params, store.get_ref(), metrics.get_ref(), pagination.get_ref()).await;
    finish("data", result, metrics.get_ref())
}

async fn query_data(
    params: &QueryParams,
    store: &dyn RecordStore,
    metrics: &dyn MetricsReporter,
    pagination: &PaginationSettings,
) -> Result<HttpResponse, QueryError> {
    let metric = params.get("metric").unwrap_or(HEART_RATE_METRIC);
    if metric != HEART_RATE_METRIC {
        return Err(QueryError::invalid(
            "Unsupported metric type. Only 'heart_rate' is supported.",
        ));
    }

    let (start_date, end_date) = date_range(params)?;
    let participant_ids = params.participant_ids(&["user_ids", "user_id", "participant_ids"])?;
    let granularity = select_granularity(start_date, end_date, params.aggregation()?);
    let cursor = params.cursor()?;
    let limit = params.limit(pagination.default_limit, pagination.max_limit)?;

    let query = PageQuery::new(
        participant_ids.clone(),
        start_date,
        end_date,
        granularity,
        cursor,
        limit,
    )?;
    let page = fetch_page(store, &query, metrics).await?;

    tracing::info!(
        aggregation_level = %granularity,
        points = page.records.len(),
        has_more = page.next_cursor.is_some(),
        "Served heart rate page"
    );

    let metadata = DataMetadata {
        aggregation_level: granularity,
        query_span_days: span_days(start_date, end_date),
        total_points: page.records.len(),
        participant_ids,
        start_date,
        end_date,
        next_cursor: page.next_cursor,
    };

    Ok(HttpResponse::Ok().json(DataResponse {
        data: page.records,
        metadata,
    }))
}

#[tracing::instrument(
    name = "Get data stats",
    skip(req, store, metrics),
    fields(query = %req.query_string())
)]
pub async fn get_data_stats(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    let params = QueryParams::from_request(&req);
    let result = data_stats(&params, store.get_ref()).await;
    finish("data_stats", result, metrics.get_ref())
}

async fn data_stats(
    params: &QueryParams,
    store: &dyn RecordStore,
) -> Result<HttpResponse, QueryError> {
    let (start_date, end_date) = date_range(params)?;
    let participant_ids = params.participant_ids(&["participant_ids", "user_ids"])?;

    let mut data_counts = BTreeMap::new();
    for granularity in Granularity::ALL {
        let counts = store
            .count_records(granularity, &participant_ids, start_date, end_date)
            .await?;
        data_counts.insert(granularity.as_str(), counts.iter().map(|c| c.count).sum::<i64>());
    }

    Ok(HttpResponse::Ok().json(json!({
        "query_span_days": span_days(start_date, end_date),
        "recommended_aggregation": select_granularity(start_date, end_date, None),
        "data_counts": data_counts,
        "participant_ids": participant_ids,
        "start_date": start_date,
        "end_date": end_date,
    })))
}

#[derive(Debug, Serialize)]
pub struct MissingSlots {
    pub participant_id: i32,
    pub observed_points: i64,
    pub missing_slots: i64,
}

/// Counts missing minute slots per participant. No values are filled in.
#[tracing::instrument(
    name = "Count missing heart rate slots",
    skip(req, store, metrics),
    fields(query = %req.query_string())
)]
pub async fn impute_data(
    req: HttpRequest,
    store: web::Data<dyn RecordStore>,
    metrics: web::Data<dyn MetricsReporter>,
) -> HttpResponse {
    let params = QueryParams::from_request(&req);
    let result = missing_slots(&params, store.get_ref()).await;
    finish("data_impute", result, metrics.get_ref())
}

async fn missing_slots(
    params: &QueryParams,
    store: &dyn RecordStore,
) -> Result<HttpResponse, QueryError> {
    let (start_date, end_date) = date_range(params)?;
    let participant_ids = params.participant_ids(&["user_ids", "user_id", "participant_ids"])?;
    let expected_slots = (span_days(start_date, end_date) + 1) * MINUTES_PER_DAY;

    let counts = store
        .count_records(Granularity::Raw, &participant_ids, start_date, end_date)
        .await?;

    let participants: Vec<MissingSlots> = participant_ids
        .iter()
        .map(|&participant_id| {
            let observed_points = counts
                .iter()
                .find(|c| c.participant_id == participant_id)
                .map(|c| c.count)
                .unwrap_or(0);
            MissingSlots {
                participant_id,
                observed_points,
                missing_slots: (expected_slots - observed_points).max(0),
            }
        })
        .collect();

    let total_missing_slots: i64 = participants.iter().map(|p| p.missing_slots).sum();

    Ok(HttpResponse::Ok().json(json!({
        "method": "none",
        "start_date": start_date,
        "end_date": end_date,
        "expected_slots_per_participant": expected_slots,
        "participants": participants,
        "total_missing_slots": total_missing_slots,
    })))
}
