use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tamr_toolbox::monitor_job;
use tamr_toolbox::JobHandle;
use tamr_toolbox::JobMonitor;
use tamr_toolbox::JobPollError;
use tamr_toolbox::JobState::*;
use tamr_toolbox::MonitorEvent;
use tamr_toolbox::MonitorExit;
use tamr_toolbox::MonitorOptions;
use tamr_toolbox::NotificationDispatcher;
use tokio_util::sync::CancellationToken;

use crate::common::fast_retry;
use crate::common::RecordingNotifier;
use crate::common::ScriptedJobClient;
use crate::common::HOST;
use crate::enable_logger;

fn options() -> MonitorOptions {
    MonitorOptions::default()
        .with_poll_interval(Duration::from_secs(1))
        .with_timeout(None)
        .with_retry(fast_retry(3))
}

#[tokio::test(start_paused = true)]
async fn test_monitor_job_notifies_each_filtered_transition_once() {
    enable_logger();
    let client = Arc::new(ScriptedJobClient::new([Pending, Pending, Running, Succeeded]));
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = NotificationDispatcher::new(notifier.clone(), HOST, fast_retry(3));

    let report = monitor_job(
        client.clone(),
        &dispatcher,
        JobHandle::from(42u64),
        options().with_notify_states([Running, Succeeded]),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(notifier.titles(), vec!["Job 42: RUNNING", "Job 42: SUCCEEDED"]);
    assert_eq!(
        notifier.bodies()[1],
        "Host: http://tamr.local:9100 \n Job: 42 \n Description: Update unified dataset \n Status: SUCCEEDED "
    );
    assert_eq!(client.polls(), 4);
    assert_eq!(report.exit.last_state(), Some(Succeeded));
}

#[tokio::test(start_paused = true)]
async fn test_monitor_job_survives_flaky_notification_channel() {
    enable_logger();
    let client = Arc::new(ScriptedJobClient::new([Running, Failed]));
    // first delivery needs one retry, the second is fine
    let notifier = Arc::new(RecordingNotifier::flaky(1));
    let dispatcher = NotificationDispatcher::new(notifier.clone(), HOST, fast_retry(3));

    let report = monitor_job(
        client,
        &dispatcher,
        JobHandle::from("7"),
        options(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(notifier.titles(), vec!["Job 7: RUNNING", "Job 7: RUNNING", "Job 7: FAILED"]);
    assert_eq!(report.failed_deliveries().count(), 0);
    assert_eq!(report.exit.last_state(), Some(Failed));
}

#[tokio::test(start_paused = true)]
async fn test_monitor_times_out_without_polling_past_the_deadline() {
    enable_logger();
    let client = Arc::new(ScriptedJobClient::new([Running]));
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = NotificationDispatcher::new(notifier.clone(), HOST, fast_retry(1));

    let report = monitor_job(
        client.clone(),
        &dispatcher,
        JobHandle::from("9"),
        options().with_timeout(Some(Duration::from_millis(2_500))),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(matches!(report.exit, MonitorExit::Timeout { .. }));
    assert_eq!(client.polls(), 3);
    assert_eq!(notifier.titles(), vec!["Job 9: RUNNING", "Job 9: Timeout"]);
    assert_eq!(
        notifier.bodies()[1],
        "The job 9: Update unified dataset took longer than 2.5 seconds to resolve."
    );
}

#[tokio::test(start_paused = true)]
async fn test_watch_surfaces_exhausted_poll_retries() {
    let client = Arc::new(ScriptedJobClient::with_results([Err(JobPollError::Transient(
        "502 Bad Gateway".to_string(),
    ))]));
    let monitor = JobMonitor::new(client.clone(), options());

    let items: Vec<_> = monitor
        .watch(JobHandle::from("1"), CancellationToken::new())
        .collect()
        .await;

    assert!(matches!(
        items.as_slice(),
        [Err(JobPollError::Exhausted { attempts: 3, .. })]
    ));
    assert_eq!(client.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_independent_monitors_run_concurrently() {
    let fast = Arc::new(ScriptedJobClient::new([Running, Running, Succeeded]));
    let slow = Arc::new(ScriptedJobClient::new([Pending, Running, Running, Running, Canceled]));

    let a = tokio::spawn({
        let monitor = JobMonitor::new(fast.clone(), options());
        async move {
            monitor
                .watch(JobHandle::from("a"), CancellationToken::new())
                .collect::<Vec<_>>()
                .await
        }
    });
    let b = tokio::spawn({
        let monitor = JobMonitor::new(slow.clone(), options());
        async move {
            monitor
                .watch(JobHandle::from("b"), CancellationToken::new())
                .collect::<Vec<_>>()
                .await
        }
    });

    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(matches!(
        a.last(),
        Some(Ok(MonitorEvent::Exit(MonitorExit::Terminal { status }))) if status.state == Succeeded
    ));
    assert!(matches!(
        b.last(),
        Some(Ok(MonitorEvent::Exit(MonitorExit::Terminal { status }))) if status.state == Canceled
    ));
    assert_eq!(fast.polls(), 3);
    assert_eq!(slow.polls(), 5);
}
