//! Job runner and scheduler wiring.


use chrono::{Duration, Utc};
use std::time::{Duration as StdDuration, Instant};
use test_support::{user, TestEngine};
use workpulse::config::SchedulerConfig;
use workpulse::events::EventKind;
use workpulse::models::{ActivityType, ActivityUpdate, AlertType};
use workpulse::{JobKind, JobOutcome, Scheduler};

#[test]
fn test_runner_dispatches_each_job_kind() {
    let env = TestEngine::new();
    let alice = user("alice");
    let session = env.insert_session(&alice, Utc::now() - Duration::hours(2));
    let runner = env.engine.job_runner();

    match runner.run(JobKind::IdleDetection).unwrap() {
        JobOutcome::IdleDetection(run) => {
            assert_eq!(run.inspected, 1);
            assert_eq!(run.alerts_created, 1);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    match runner.run(JobKind::OvertimeChecker).unwrap() {
        JobOutcome::OvertimeChecker(run) => assert_eq!(run.alerts_created, 0),
        other => panic!("unexpected outcome: {:?}", other),
    }

    env.engine
        .activity
        .log_activity(
            &session.id,
            &alice,
            ActivityUpdate {
                activity_type: ActivityType::Active,
                duration_seconds: 120,
                url: Some("editor".into()),
                timestamp: Some(Utc::now() - Duration::minutes(1)),
            },
        )
        .unwrap();

    let date = session.start_time.date_naive();
    match runner.run(JobKind::DailySummary(date)).unwrap() {
        JobOutcome::DailySummary(run) => {
            assert_eq!(run.processed, 1);
            assert_eq!(run.date, date);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    let summary = env.engine.db.get_daily_summary("alice", date).unwrap().unwrap();
    assert_eq!(summary.active_seconds, 120);
}

#[test]
fn test_job_names_from_command_line() {
    assert_eq!("idle-detection".parse::<JobKind>().unwrap(), JobKind::IdleDetection);
    assert_eq!(
        "overtime-checker".parse::<JobKind>().unwrap(),
        JobKind::OvertimeChecker
    );
    assert!(matches!(
        "daily-summary".parse::<JobKind>().unwrap(),
        JobKind::DailySummary(date) if date == Utc::now().date_naive()
    ));
    assert!("weekly-report".parse::<JobKind>().is_err());
}

#[test]
fn test_scheduler_runs_immediately_and_stops_promptly() {
    let env = TestEngine::new();
    let alice = user("alice");
    env.insert_session(&alice, Utc::now() - Duration::hours(2));

    let scheduler = Scheduler::new(
        env.engine.job_runner(),
        SchedulerConfig {
            idle_detection_interval_seconds: 3600,
            overtime_check_interval_seconds: 3600,
            daily_summary_interval_seconds: 3600,
        },
    );
    let handles = scheduler.start();

    // The first tick of every loop runs straight away
    let deadline = Instant::now() + StdDuration::from_secs(5);
    while env.engine.db.count_alerts("alice", AlertType::Idle).unwrap() == 0
        && Instant::now() < deadline
    {
        std::thread::sleep(StdDuration::from_millis(20));
    }
    assert_eq!(env.engine.db.count_alerts("alice", AlertType::Idle).unwrap(), 1);

    let stopping = Instant::now();
    scheduler.stop();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(stopping.elapsed() < StdDuration::from_secs(5));
    assert_eq!(env.events.named(EventKind::InactiveAlert).len(), 1);
}
