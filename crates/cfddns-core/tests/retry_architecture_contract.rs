//! Contract Test: Resolver-Owned Retry
//!
//! Constraints verified:
//! - The resolver performs exactly `max_attempts` lookups against a failing source
//! - Exhaustion is reported as a resolution failure, never as an address
//! - A lookup that succeeds part-way stops retrying immediately
//! - Invalid discovery bodies count as failed attempts
//! - A resolution failure skips the record fetch entirely
//! - Provider errors are not retried by the reconciler

mod common;

use cfddns_core::error::Error;
use cfddns_core::traits::{AddressFamily, RecordType};
use cfddns_core::{AddressResolver, FailureStage, ReconcileOutcome};
use common::*;
use std::time::Duration;

#[tokio::test]
async fn failing_source_gets_exactly_n_attempts() {
    for attempts in [1usize, 3, 5] {
        let source = StubAddressSource::new().failing(AddressFamily::V4);
        let resolver =
            AddressResolver::with_policy(Box::new(source.clone()), attempts, Duration::ZERO);

        let result = resolver.resolve(AddressFamily::V4).await;

        assert_eq!(source.calls(AddressFamily::V4), attempts);
        match result {
            Err(Error::Resolution {
                family,
                attempts: reported,
                last_error,
            }) => {
                assert_eq!(family, AddressFamily::V4);
                assert_eq!(reported, attempts);
                assert!(last_error.contains("503"), "last error kept: {}", last_error);
            }
            other => panic!("expected resolution failure, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn success_stops_retrying() {
    let source = FlakyAddressSource::new(2, "198.51.100.7\n");
    let resolver = AddressResolver::with_policy(Box::new(source.clone()), 5, Duration::ZERO);

    let address = resolver.resolve(AddressFamily::V4).await.unwrap();

    assert_eq!(address.as_str(), "198.51.100.7");
    assert_eq!(source.calls(), 3, "two failures then one success");
}

#[tokio::test]
async fn invalid_body_counts_as_failed_attempt() {
    let source = StubAddressSource::new().answering(AddressFamily::V4, "<html>502 Bad Gateway</html>");
    let resolver = AddressResolver::with_policy(Box::new(source.clone()), 3, Duration::ZERO);

    let result = resolver.resolve(AddressFamily::V4).await;

    assert!(matches!(result, Err(Error::Resolution { .. })));
    assert_eq!(source.calls(AddressFamily::V4), 3);
}

#[tokio::test]
async fn wrong_family_body_counts_as_failed_attempt() {
    let source = StubAddressSource::new().answering(AddressFamily::V6, "203.0.113.5");
    let resolver = AddressResolver::with_policy(Box::new(source.clone()), 2, Duration::ZERO);

    assert!(resolver.resolve(AddressFamily::V6).await.is_err());
    assert_eq!(source.calls(AddressFamily::V6), 2);
}

#[tokio::test(start_paused = true)]
async fn delay_separates_attempts_only() {
    let source = StubAddressSource::new().failing(AddressFamily::V4);
    let resolver =
        AddressResolver::with_policy(Box::new(source.clone()), 3, Duration::from_secs(2));

    let started = tokio::time::Instant::now();
    let _ = resolver.resolve(AddressFamily::V4).await;

    // Two gaps between three attempts, no sleep after the last one
    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

#[tokio::test]
async fn resolution_failure_skips_fetch_and_mutation() {
    let source = StubAddressSource::new().failing(AddressFamily::V4);
    let store = MockRecordStore::new().with_record(RecordType::A, "203.0.113.4");
    let notifier = RecordingNotifier::new();

    let engine = reconciler(
        source.clone(),
        store.clone(),
        notifier.clone(),
        settings(&[AddressFamily::V4], true),
    );

    let report = engine.run_pass().await;

    assert!(matches!(
        report.outcome(AddressFamily::V4),
        Some(ReconcileOutcome::Failed {
            stage: FailureStage::Resolve,
            ..
        })
    ));
    assert_eq!(source.calls(AddressFamily::V4), 3);
    assert_eq!(store.fetch_count(), 0, "fetch must be bypassed");
    assert!(store.mutations().is_empty());
    assert_eq!(notifier.messages().len(), 1, "exhaustion is notified");
    assert!(notifier.messages()[0].contains("3 attempt(s)"));
}

#[tokio::test]
async fn provider_failures_are_not_retried() {
    let source = StubAddressSource::new().answering(AddressFamily::V4, "203.0.113.5");
    let store = MockRecordStore::new()
        .with_record(RecordType::A, "203.0.113.4")
        .with_failing_mutations();

    let engine = reconciler(
        source,
        store.clone(),
        RecordingNotifier::new(),
        settings(&[AddressFamily::V4], true),
    );

    let report = engine.run_pass().await;

    assert!(matches!(
        report.outcome(AddressFamily::V4),
        Some(ReconcileOutcome::Failed {
            stage: FailureStage::Update,
            ..
        })
    ));
    assert_eq!(store.fetch_count(), 1);
    assert_eq!(store.update_count(), 1, "one update attempt, no retry");
}
