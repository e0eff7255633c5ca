// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving the full stack the way the daemon does:
//! trigger, queue, worker-side execution, terminal session state.

use jobpilot_config::model::PlansConfig;
use jobpilot_core::types::{SendFailure, SessionStatus};
use jobpilot_core::JobpilotError;
use jobpilot_test_utils::TestHarness;

#[tokio::test]
async fn run_with_no_candidates_completes_empty() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.seed_profile("u1", "free").await.unwrap();

    let session_id = harness.run_to_completion("u1").await.unwrap();

    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.jobs_found, 0);
    assert_eq!(session.applications_sent, 0);
    assert_eq!(harness.mailer.attempt_count(), 0);
}

#[tokio::test]
async fn second_trigger_is_rejected_while_first_is_open() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.seed_profile("u1", "free").await.unwrap();

    harness.orchestrator.trigger_run("u1", None, None).await.unwrap();
    let err = harness
        .orchestrator
        .trigger_run("u1", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, JobpilotError::AlreadyRunning { .. }));

    // Once the first run reaches a terminal state, triggering works again.
    harness.drain_queue().await.unwrap();
    harness.run_to_completion("u1").await.unwrap();
}

#[tokio::test]
async fn daily_quota_is_never_exceeded() {
    let harness = TestHarness::builder()
        .with_plans(PlansConfig {
            free: 3,
            ..PlansConfig::default()
        })
        .build()
        .await
        .unwrap();
    harness.seed_profile("u1", "free").await.unwrap();
    for (i, company) in ["Acme", "Globex", "Initech", "Umbrella", "Hooli"]
        .iter()
        .enumerate()
    {
        harness
            .seed_job(
                &format!("j{i}"),
                company,
                &format!("2026-03-0{}T00:00:00.000Z", i + 1),
            )
            .await
            .unwrap();
    }

    let session_id = harness.run_to_completion("u1").await.unwrap();

    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.applications_sent, 3);

    // Quota is exhausted for the day; a second run sends nothing.
    let session_id = harness.run_to_completion("u1").await.unwrap();
    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.applications_sent, 0);
    assert_eq!(harness.mailer.attempt_count(), 3);
}

#[tokio::test]
async fn quota_bounds_selection_to_the_newest_postings() {
    let harness = TestHarness::builder()
        .with_plans(PlansConfig {
            free: 2,
            ..PlansConfig::default()
        })
        .build()
        .await
        .unwrap();
    harness.seed_profile("u1", "free").await.unwrap();
    harness
        .seed_job("old", "Oldco", "2026-01-01T00:00:00.000Z")
        .await
        .unwrap();
    harness
        .seed_job("mid", "Midco", "2026-02-01T00:00:00.000Z")
        .await
        .unwrap();
    harness
        .seed_job("new", "Newco", "2026-03-01T00:00:00.000Z")
        .await
        .unwrap();

    let session_id = harness.run_to_completion("u1").await.unwrap();

    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.jobs_found, 2);
    assert_eq!(session.applications_sent, 2);

    let recipients: Vec<String> = harness
        .mailer
        .sent_emails()
        .into_iter()
        .map(|e| e.to)
        .collect();
    assert_eq!(
        recipients,
        vec!["jobs@newco.example.com", "jobs@midco.example.com"]
    );
}

#[tokio::test]
async fn a_job_is_never_applied_to_twice() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.seed_profile("u1", "free").await.unwrap();
    harness
        .seed_job("j1", "Acme", "2026-03-01T00:00:00.000Z")
        .await
        .unwrap();

    harness.run_to_completion("u1").await.unwrap();
    assert_eq!(harness.mailer.attempt_count(), 1);

    // Same catalog next run: the job is excluded, nothing is sent.
    let session_id = harness.run_to_completion("u1").await.unwrap();
    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.jobs_found, 0);
    assert_eq!(harness.mailer.attempt_count(), 1);

    let records = harness.orchestrator.list_applied("u1", 10).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn one_application_per_company_per_day() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.seed_profile("u1", "free").await.unwrap();
    harness
        .seed_job("j1", "Acme", "2026-03-02T00:00:00.000Z")
        .await
        .unwrap();
    harness
        .seed_job("j2", "Acme", "2026-03-01T00:00:00.000Z")
        .await
        .unwrap();

    let session_id = harness.run_to_completion("u1").await.unwrap();

    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.jobs_found, 2);
    assert_eq!(session.applications_sent, 1);
    assert_eq!(harness.mailer.attempt_count(), 1);
}

#[tokio::test]
async fn retry_exhaustion_yields_partial() {
    // Three candidates, newest first. The middle one fails transiently on
    // every attempt and burns the 3-attempt retry budget; the run continues
    // past it.
    let harness = TestHarness::builder()
        .with_mailer_script(vec![
            Ok(()),
            Err(SendFailure::Transient("451 greylisted".into())),
            Err(SendFailure::Transient("451 greylisted".into())),
            Err(SendFailure::Transient("451 greylisted".into())),
            Ok(()),
        ])
        .build()
        .await
        .unwrap();
    harness.seed_profile("u1", "free").await.unwrap();
    harness
        .seed_job("j1", "Acme", "2026-03-03T00:00:00.000Z")
        .await
        .unwrap();
    harness
        .seed_job("j2", "Globex", "2026-03-02T00:00:00.000Z")
        .await
        .unwrap();
    harness
        .seed_job("j3", "Initech", "2026-03-01T00:00:00.000Z")
        .await
        .unwrap();

    let session_id = harness.run_to_completion("u1").await.unwrap();

    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Partial);
    assert_eq!(session.applications_sent, 2);
    assert_eq!(session.applications_failed, 1);
    // 1 for j1, 3 retried attempts for j2, 1 for j3.
    assert_eq!(harness.mailer.attempt_count(), 5);
}

#[tokio::test]
async fn permanent_failure_aborts_remaining_candidates() {
    let harness = TestHarness::builder()
        .with_mailer_script(vec![Err(SendFailure::Permanent(
            "550 mailbox unavailable".into(),
        ))])
        .build()
        .await
        .unwrap();
    harness.seed_profile("u1", "free").await.unwrap();
    harness
        .seed_job("j1", "Acme", "2026-03-03T00:00:00.000Z")
        .await
        .unwrap();
    harness
        .seed_job("j2", "Globex", "2026-03-02T00:00:00.000Z")
        .await
        .unwrap();
    harness
        .seed_job("j3", "Initech", "2026-03-01T00:00:00.000Z")
        .await
        .unwrap();

    let session_id = harness.run_to_completion("u1").await.unwrap();

    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.error.as_deref(), Some("550 mailbox unavailable"));
    assert_eq!(session.applications_sent, 0);
    assert_eq!(session.applications_failed, 1);
    // Only the first candidate was ever attempted, and only once: permanent
    // failures are not retried.
    assert_eq!(harness.mailer.attempt_count(), 1);
    let records = harness.orchestrator.list_applied("u1", 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].job_id, "j1");
}

#[tokio::test]
async fn users_have_independent_quotas_and_histories() {
    let harness = TestHarness::builder()
        .with_plans(PlansConfig {
            free: 1,
            ..PlansConfig::default()
        })
        .build()
        .await
        .unwrap();
    harness.seed_profile("alice", "free").await.unwrap();
    harness.seed_profile("bob", "free").await.unwrap();
    harness
        .seed_job("j1", "Acme", "2026-03-02T00:00:00.000Z")
        .await
        .unwrap();
    harness
        .seed_job("j2", "Globex", "2026-03-01T00:00:00.000Z")
        .await
        .unwrap();

    let a = harness.run_to_completion("alice").await.unwrap();
    let b = harness.run_to_completion("bob").await.unwrap();

    let a = harness.orchestrator.get_session(&a).await.unwrap();
    let b = harness.orchestrator.get_session(&b).await.unwrap();
    assert_eq!(a.applications_sent, 1);
    assert_eq!(b.applications_sent, 1);

    let alice_records = harness.orchestrator.list_applied("alice", 10).await.unwrap();
    let bob_records = harness.orchestrator.list_applied("bob", 10).await.unwrap();
    assert_eq!(alice_records.len(), 1);
    assert_eq!(bob_records.len(), 1);
}

#[tokio::test]
async fn plan_tier_raises_the_daily_limit() {
    let harness = TestHarness::builder()
        .with_plans(PlansConfig {
            free: 1,
            pro: 4,
            ..PlansConfig::default()
        })
        .build()
        .await
        .unwrap();
    harness.seed_profile("u1", "pro").await.unwrap();
    for (i, company) in ["Acme", "Globex", "Initech", "Umbrella", "Hooli"]
        .iter()
        .enumerate()
    {
        harness
            .seed_job(
                &format!("j{i}"),
                company,
                &format!("2026-03-0{}T00:00:00.000Z", i + 1),
            )
            .await
            .unwrap();
    }

    let session_id = harness.run_to_completion("u1").await.unwrap();

    let session = harness.orchestrator.get_session(&session_id).await.unwrap();
    assert_eq!(session.applications_sent, 4);
}
