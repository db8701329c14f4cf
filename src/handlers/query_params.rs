//! Query-string parsing shared by the data endpoints.
//!
//! Participant ids arrive as repeated keys (`user_ids=1&user_ids=2`), which
//! `web::Query` cannot collect into a `Vec`, so the raw pairs are kept.

use actix_web::HttpRequest;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::errors::QueryError;
use crate::models::granularity::Granularity;

#[derive(Debug, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn from_request(req: &HttpRequest) -> Self {
        Self::parse(req.query_string())
    }

    pub fn parse(query_string: &str) -> Self {
        let pairs = url::form_urlencoded::parse(query_string.as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    /// First non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .filter(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.trim())
            .next()
    }

    pub fn required_date(&self, key: &str) -> Result<NaiveDate, QueryError> {
        let raw = self
            .get(key)
            .ok_or_else(|| QueryError::invalid(format!("Missing required parameter '{}'.", key)))?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            QueryError::invalid(format!("'{}' must be a date in YYYY-MM-DD format.", key))
        })
    }

    /// Participant ids from any of `keys`, repeated or comma separated,
    /// deduplicated in first-seen order.
    pub fn participant_ids(&self, keys: &[&str]) -> Result<Vec<i32>, QueryError> {
        let mut ids = Vec::new();
        for (_, value) in self.pairs.iter().filter(|(k, _)| keys.contains(&k.as_str())) {
            for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let id: i32 = part.parse().map_err(|_| {
                    QueryError::invalid(format!("Invalid participant id '{}'.", part))
                })?;
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        if ids.is_empty() {
            return Err(QueryError::invalid("At least one participant id is required."));
        }
        Ok(ids)
    }

    /// Explicit aggregation override; empty means automatic selection.
    pub fn aggregation(&self) -> Result<Option<Granularity>, QueryError> {
        self.get("aggregation").map(str::parse::<Granularity>).transpose()
    }

    pub fn cursor(&self) -> Result<Option<DateTime<Utc>>, QueryError> {
        self.get("cursor").map(parse_cursor).transpose()
    }

    /// Reference instant for recency checks, now when omitted.
    pub fn as_of(&self) -> Result<DateTime<Utc>, QueryError> {
        match self.get("as_of") {
            None => Ok(Utc::now()),
            Some(raw) => parse_cursor(raw)
                .map_err(|_| QueryError::invalid(format!("Invalid as_of '{}'.", raw))),
        }
    }

    /// Values above `max` are clamped to it.
    pub fn limit(&self, default: u32, max: u32) -> Result<u32, QueryError> {
        match self.get("limit") {
            None => Ok(default),
            Some(raw) => match raw.parse::<u32>() {
                Ok(0) | Err(_) => Err(QueryError::invalid("limit must be a positive integer.")),
                Ok(limit) => Ok(limit.min(max)),
            },
        }
    }
}

/// Cursors are RFC 3339 instants; naive timestamps are read as UTC.
pub fn parse_cursor(raw: &str) -> Result<DateTime<Utc>, QueryError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| QueryError::invalid(format!("Invalid cursor '{}'.", raw)))
}
