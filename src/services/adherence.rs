//! Wear-time adherence per participant and the dashboard roll-up built on it.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::participant::Participant;
use crate::models::summary::{DataOverview, ParticipantActivity};

pub const WINDOW_DAYS: i64 = 7;
pub const NO_DATA_HOURS: i64 = 48;
const LOW_SLEEP_PERCENT: f64 = 50.0;
const LOW_ADHERENCE_PERCENT: f64 = 70.0;
const MINUTES_PER_DAY: f64 = 1_440.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdherenceStatus {
    #[serde(rename = "no_token")]
    NoToken,
    #[serde(rename = "no_data_48h")]
    NoData48h,
    #[serde(rename = "low_sleep")]
    LowSleep,
    #[serde(rename = "low_adherence")]
    LowAdherence,
    #[serde(rename = "good")]
    Good,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdherenceItem {
    pub participant_id: i32,
    pub name: String,
    pub status: AdherenceStatus,
    pub last_data_timestamp: Option<DateTime<Utc>>,
    pub adherence_percentage: f64,
    pub sleep_upload_percentage: f64,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdherenceReport {
    pub participants: Vec<AdherenceItem>,
    pub total_participants: usize,
    pub issues_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub total_participants: usize,
    pub active_participants: usize,
    pub total_data_points: i64,
    pub data_date_range: Option<DateRange>,
    pub system_status: &'static str,
}

/// Start of the look-back window ending at `as_of`.
pub fn window_start(as_of: DateTime<Utc>) -> DateTime<Utc> {
    as_of - Duration::days(WINDOW_DAYS)
}

fn percentage(part: f64, whole: f64) -> f64 {
    let value = (part / whole * 100.0).min(100.0);
    (value * 10.0).round() / 10.0
}

fn has_recent_data(activity: Option<&ParticipantActivity>, as_of: DateTime<Utc>) -> bool {
    activity
        .and_then(|a| a.last_data_timestamp)
        .is_some_and(|last| as_of - last <= Duration::hours(NO_DATA_HOURS))
}

/// Status checks run in order; the first one that fails decides.
pub fn assess(
    participant: &Participant,
    activity: Option<&ParticipantActivity>,
    as_of: DateTime<Utc>,
) -> AdherenceItem {
    let last_data_timestamp = activity.and_then(|a| a.last_data_timestamp);
    let window_minutes = activity.map_or(0, |a| a.window_minutes) as f64;
    let nights = activity.map_or(0, |a| a.nights_with_data);

    let adherence_percentage = percentage(window_minutes, WINDOW_DAYS as f64 * MINUTES_PER_DAY);
    let sleep_upload_percentage = percentage(nights as f64, WINDOW_DAYS as f64);

    let (status, details) = if participant.token.is_none() {
        (AdherenceStatus::NoToken, "No device token registered".to_string())
    } else if !has_recent_data(activity, as_of) {
        let details = match last_data_timestamp {
            Some(last) => format!(
                "Last data received {} hours ago",
                (as_of - last).num_hours()
            ),
            None => "No heart rate data received".to_string(),
        };
        (AdherenceStatus::NoData48h, details)
    } else if sleep_upload_percentage < LOW_SLEEP_PERCENT {
        (
            AdherenceStatus::LowSleep,
            format!("Night-time data on {} of the last {} nights", nights, WINDOW_DAYS),
        )
    } else if adherence_percentage < LOW_ADHERENCE_PERCENT {
        (
            AdherenceStatus::LowAdherence,
            format!("Wear time {:.1}% over the last {} days", adherence_percentage, WINDOW_DAYS),
        )
    } else {
        (
            AdherenceStatus::Good,
            format!("Wear time {:.1}% over the last {} days", adherence_percentage, WINDOW_DAYS),
        )
    };

    AdherenceItem {
        participant_id: participant.participant_id,
        name: participant.name.clone(),
        status,
        last_data_timestamp,
        adherence_percentage,
        sleep_upload_percentage,
        details,
    }
}

fn activity_of(activity: &[ParticipantActivity], participant_id: i32) -> Option<&ParticipantActivity> {
    activity.iter().find(|a| a.participant_id == participant_id)
}

pub fn adherence_report(
    participants: &[Participant],
    activity: &[ParticipantActivity],
    as_of: DateTime<Utc>,
) -> AdherenceReport {
    let items: Vec<AdherenceItem> = participants
        .iter()
        .map(|p| assess(p, activity_of(activity, p.participant_id), as_of))
        .collect();
    let issues_count = items.iter().filter(|i| i.status != AdherenceStatus::Good).count();

    AdherenceReport {
        total_participants: items.len(),
        issues_count,
        participants: items,
    }
}

pub fn dashboard_summary(
    participants: &[Participant],
    activity: &[ParticipantActivity],
    overview: &DataOverview,
    as_of: DateTime<Utc>,
) -> DashboardSummary {
    let active_participants = participants
        .iter()
        .filter(|p| has_recent_data(activity_of(activity, p.participant_id), as_of))
        .count();

    let data_date_range = match (overview.first_date, overview.last_date) {
        (Some(start_date), Some(end_date)) => Some(DateRange { start_date, end_date }),
        _ => None,
    };

    DashboardSummary {
        total_participants: participants.len(),
        active_participants,
        total_data_points: overview.total_data_points,
        data_date_range,
        system_status: "healthy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    fn participant(id: i32, with_token: bool) -> Participant {
        Participant {
            participant_id: id,
            name: format!("Participant {}", id),
            token: with_token.then(uuid::Uuid::new_v4),
        }
    }

    fn activity(id: i32, hours_ago: Option<i64>, window_minutes: i64, nights: i64) -> ParticipantActivity {
        ParticipantActivity {
            participant_id: id,
            last_data_timestamp: hours_ago.map(|h| as_of() - Duration::hours(h)),
            window_minutes,
            nights_with_data: nights,
        }
    }

    #[test]
    fn test_missing_token_wins_over_everything() {
        let item = assess(&participant(1, false), Some(&activity(1, Some(1), 10_080, 7)), as_of());
        assert_eq!(item.status, AdherenceStatus::NoToken);
        assert_eq!(item.adherence_percentage, 100.0);
    }

    #[test]
    fn test_stale_or_missing_data_is_flagged() {
        let stale = assess(&participant(1, true), Some(&activity(1, Some(49), 10_080, 7)), as_of());
        assert_eq!(stale.status, AdherenceStatus::NoData48h);
        assert_eq!(stale.details, "Last data received 49 hours ago");

        let never = assess(&participant(1, true), None, as_of());
        assert_eq!(never.status, AdherenceStatus::NoData48h);
        assert_eq!(never.adherence_percentage, 0.0);
        assert_eq!(never.last_data_timestamp, None);

        let boundary = assess(&participant(1, true), Some(&activity(1, Some(48), 10_080, 7)), as_of());
        assert_eq!(boundary.status, AdherenceStatus::Good);
    }

    #[test]
    fn test_sleep_is_checked_before_wear_time() {
        let item = assess(&participant(1, true), Some(&activity(1, Some(1), 1_000, 3)), as_of());
        assert_eq!(item.status, AdherenceStatus::LowSleep);
        assert_eq!(item.sleep_upload_percentage, 42.9);

        let item = assess(&participant(1, true), Some(&activity(1, Some(1), 5_040, 7)), as_of());
        assert_eq!(item.status, AdherenceStatus::LowAdherence);
        assert_eq!(item.adherence_percentage, 50.0);
    }

    #[test]
    fn test_report_counts_issues() {
        let participants = vec![participant(1, true), participant(2, false), participant(3, true)];
        let activity = vec![activity(1, Some(2), 9_000, 7), activity(3, None, 0, 0)];

        let report = adherence_report(&participants, &activity, as_of());

        assert_eq!(report.total_participants, 3);
        assert_eq!(report.issues_count, 2);
        assert_eq!(report.participants[0].status, AdherenceStatus::Good);
        assert_eq!(
            serde_json::to_value(report.participants[2].status).unwrap(),
            serde_json::json!("no_data_48h")
        );
    }

    #[test]
    fn test_dashboard_counts_recently_active_participants() {
        let participants = vec![participant(1, true), participant(2, true)];
        let activity = vec![activity(1, Some(5), 100, 1), activity(2, Some(72), 100, 1)];
        let overview = DataOverview {
            total_data_points: 200,
            first_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            last_date: NaiveDate::from_ymd_opt(2024, 1, 10),
        };

        let summary = dashboard_summary(&participants, &activity, &overview, as_of());

        assert_eq!(summary.total_participants, 2);
        assert_eq!(summary.active_participants, 1);
        assert_eq!(summary.total_data_points, 200);
        assert_eq!(
            summary.data_date_range.map(|r| r.end_date),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );

        let empty = DataOverview {
            total_data_points: 0,
            first_date: None,
            last_date: None,
        };
        assert_eq!(dashboard_summary(&[], &[], &empty, as_of()).data_date_range, None);
    }
}
