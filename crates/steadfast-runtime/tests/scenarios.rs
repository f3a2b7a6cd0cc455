//! End-to-end scenarios for the resilience facade.
//!
//! All tests run on tokio's paused clock: sleeps advance virtual time, so the
//! timing assertions are exact and nothing waits in real time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use steadfast_runtime::{
    CircuitConfig, CircuitState, OperationFailure, Resilience, ResilienceConfig, ResilienceError,
    RetryConfig,
};
use tokio::time::{advance, sleep, Instant};

fn circuit(threshold: u32, reset_ms: u64) -> CircuitConfig {
    CircuitConfig {
        failure_threshold: threshold,
        reset_timeout: Duration::from_millis(reset_ms),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_after_two_failures() {
    let resilience = Resilience::default();
    let retry = RetryConfig {
        max_retries: 2,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(1000),
        exponential_base: 2.0,
        jitter_max: Duration::ZERO,
    };
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result = resilience
        .with_retry(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(OperationFailure::from_message("connection timeout"))
                } else {
                    Ok("payload")
                }
            },
            Some(&retry),
        )
        .await;

    assert_eq!(result.unwrap(), "payload");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_retry_default_attempt_budget() {
    let resilience = Resilience::default();
    let calls = AtomicU32::new(0);

    let result: Result<(), OperationFailure> = resilience
        .with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(OperationFailure::http(503, "service unavailable"))
            },
            None,
        )
        .await;

    assert_eq!(result.unwrap_err().http_status, Some(503));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_breaker_trips_then_admits_after_reset_timeout() {
    let resilience = Resilience::default();
    let config = circuit(2, 500);
    let calls = AtomicU32::new(0);

    for _ in 0..2 {
        let result = resilience
            .with_circuit_breaker(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(OperationFailure::http(500, "internal error"))
                },
                "orders",
                Some(&config),
            )
            .await;
        assert!(matches!(result, Err(ResilienceError::Operation(_))));
    }
    assert_eq!(resilience.circuit_breaker_status()["orders"].state, CircuitState::Open);

    advance(Duration::from_millis(100)).await;
    let rejected = resilience
        .with_circuit_breaker(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, OperationFailure>(())
            },
            "orders",
            Some(&config),
        )
        .await;
    assert!(matches!(rejected, Err(ResilienceError::CircuitOpen(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    advance(Duration::from_millis(500)).await;
    let admitted = resilience
        .with_circuit_breaker(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, OperationFailure>("recovered")
            },
            "orders",
            Some(&config),
        )
        .await;
    assert_eq!(admitted.unwrap(), "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let status = resilience.circuit_breaker_status();
    assert_eq!(status["orders"].state, CircuitState::Closed);
    assert_eq!(status["orders"].failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_full_resilience_counts_one_failure_per_outer_call() {
    let resilience = Resilience::default();
    let retry = RetryConfig {
        max_retries: 1,
        ..Default::default()
    };
    let config = circuit(3, 60_000);
    let calls = AtomicU32::new(0);
    let mut outcomes = Vec::new();

    for _ in 0..5 {
        let result: Result<(), _> = resilience
            .with_full_resilience(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(OperationFailure::from_message("ECONNRESET"))
                },
                "catalog",
                Some(&retry),
                Some(&config),
            )
            .await;
        outcomes.push(result);

        let failures = resilience.circuit_breaker_status()["catalog"].failures;
        assert!(failures <= 3);
    }

    assert!(outcomes[..3]
        .iter()
        .all(|r| matches!(r, Err(ResilienceError::Operation(_)))));
    assert!(outcomes[3..]
        .iter()
        .all(|r| matches!(r, Err(ResilienceError::CircuitOpen(_)))));
    // Three outer calls, two attempts each; the last two never reach the operation
    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert_eq!(resilience.circuit_breaker_status()["catalog"].state, CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_probe() {
    let resilience = Resilience::default();
    let config = circuit(1, 1000);
    let probes = Arc::new(AtomicU32::new(0));

    let _ = resilience
        .with_circuit_breaker(
            || async { Err::<(), _>(OperationFailure::transient("connection refused")) },
            "ledger",
            Some(&config),
        )
        .await;
    advance(Duration::from_millis(1000)).await;

    let calls = (0..5).map(|_| {
        let resilience = resilience.clone();
        let probes = Arc::clone(&probes);
        let config = config.clone();
        async move {
            resilience
                .with_circuit_breaker(
                    || async move {
                        probes.fetch_add(1, Ordering::SeqCst);
                        sleep(Duration::from_millis(50)).await;
                        Ok::<_, OperationFailure>(())
                    },
                    "ledger",
                    Some(&config),
                )
                .await
        }
    });
    let results = join_all(calls).await;

    assert_eq!(probes.load(Ordering::SeqCst), 1);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(ResilienceError::CircuitOpen(_))))
            .count(),
        4
    );
    assert_eq!(resilience.circuit_breaker_status()["ledger"].state, CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_status_serializes_for_monitoring() {
    let resilience = Resilience::new(ResilienceConfig {
        circuit: circuit(1, 30_000),
        ..Default::default()
    });

    let _ = resilience
        .with_circuit_breaker(
            || async { Err::<(), _>(OperationFailure::http(504, "gateway timeout")) },
            "pricing",
            None,
        )
        .await;

    let json = serde_json::to_value(resilience.circuit_breaker_status()).unwrap();
    assert_eq!(json["pricing"]["state"], "OPEN");
    assert_eq!(json["pricing"]["failures"], 1);
    assert!(json["pricing"]["next_attempt"].is_string());
}
