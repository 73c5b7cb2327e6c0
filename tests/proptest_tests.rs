//! Property-based tests using proptest
//!
//! These check the pure aggregation and classification functions over
//! arbitrary inputs.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use workpulse::common::{format_timestamp, parse_timestamp};
use workpulse::idle::{classify, IdleThresholds, IdleVerdict};
use workpulse::models::{ActivityLog, ActivityType};
use workpulse::overtime::worked_hours;
use workpulse::summary::{app_usage, productivity_score};

fn arbitrary_log() -> impl Strategy<Value = ActivityLog> {
    (
        prop::bool::ANY,
        1i64..=3600,
        prop::option::of(prop::sample::select(vec!["editor", "browser", "terminal", ""])),
        0i64..600,
    )
        .prop_map(|(active, duration, app, offset)| ActivityLog {
            id: format!("log-{}", offset),
            session_id: "s".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
                - Duration::seconds(offset),
            activity_type: if active {
                ActivityType::Active
            } else {
                ActivityType::Idle
            },
            duration_seconds: duration,
            url: app.map(str::to_string),
            client_activity_id: None,
        })
}

fn thresholds() -> IdleThresholds {
    IdleThresholds {
        idle_threshold: Duration::seconds(300),
        idle_window: Duration::seconds(600),
        inactivity_timeout: Duration::seconds(1800),
    }
}

proptest! {
    #[test]
    fn test_productivity_score_stays_in_range(active in 0i64..10_000_000, idle in 0i64..10_000_000) {
        let score = productivity_score(active, idle);
        prop_assert!((0.0..=100.0).contains(&score));
        if idle == 0 && active > 0 {
            prop_assert_eq!(score, 100.0);
        }
    }
}

proptest! {
    #[test]
    fn test_app_usage_conserves_time(logs in prop::collection::vec(arbitrary_log(), 0..60)) {
        let usage = app_usage(&logs);

        let logged: i64 = logs.iter().map(|l| l.duration_seconds).sum();
        let grouped: i64 = usage.iter().map(|u| u.total_seconds).sum();
        prop_assert_eq!(logged, grouped);

        for u in &usage {
            prop_assert_eq!(u.total_seconds, u.active_seconds + u.idle_seconds);
            prop_assert!(!u.app.is_empty());
        }
        prop_assert!(usage.windows(2).all(|w| w[0].total_seconds >= w[1].total_seconds));
    }
}

proptest! {
    #[test]
    fn test_any_active_log_prevents_idle_verdict(
        mut logs in prop::collection::vec(arbitrary_log(), 1..20),
        pick in any::<prop::sample::Index>()
    ) {
        let i = pick.index(logs.len());
        logs[i].activity_type = ActivityType::Active;
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let last_seen = now - Duration::hours(5);
        prop_assert_eq!(classify(&logs, last_seen, now, &thresholds()), None);
    }
}

proptest! {
    #[test]
    fn test_all_idle_logs_alert_at_threshold(durations in prop::collection::vec(1i64..400, 1..10)) {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let logs: Vec<_> = durations
            .iter()
            .enumerate()
            .map(|(i, d)| ActivityLog {
                id: i.to_string(),
                session_id: "s".into(),
                timestamp: now - Duration::seconds(i as i64),
                activity_type: ActivityType::Idle,
                duration_seconds: *d,
                url: None,
                client_activity_id: None,
            })
            .collect();
        let total: i64 = durations.iter().sum();

        let verdict = classify(&logs, now, now, &thresholds());
        if total >= 300 {
            prop_assert_eq!(verdict, Some(IdleVerdict::Idle { idle_seconds: total }));
        } else {
            prop_assert_eq!(verdict, None);
        }
    }
}

proptest! {
    #[test]
    fn test_worked_hours_is_close_and_monotonic(a in 0i64..1_000_000, b in 0i64..1_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(worked_hours(lo) <= worked_hours(hi));
        prop_assert!((worked_hours(a) - a as f64 / 3600.0).abs() <= 0.05 + 1e-9);
    }
}

proptest! {
    #[test]
    fn test_timestamps_survive_storage_format(secs in 0i64..4_000_000_000, millis in 0u32..1000) {
        let ts = Utc.timestamp_opt(secs, millis * 1_000_000).unwrap();
        prop_assert_eq!(parse_timestamp(&format_timestamp(&ts)), Some(ts));
    }
}
