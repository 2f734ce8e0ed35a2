//! Bounded, order-preserving per-entity fetches with isolated failures.

use std::future::Future;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::config::ConcurrencyLimit;
use crate::error::EntityFetchError;

/// Settled results of a fan-out, one slot per input.
#[derive(Debug)]
pub struct FanOut<T> {
    /// `results[i]` belongs to `inputs[i]`; failed inputs hold an empty vector.
    pub results: Vec<Vec<T>>,
    /// Failures in input order.
    pub failures: Vec<EntityFetchError>,
}

/// Run `op` for every input with at most `limit` invocations in flight.
///
/// Results come back in input order regardless of completion order. A failed
/// invocation is logged and degrades to an empty result; it never stops the
/// others. Returns only after every invocation has settled.
pub async fn fan_out<I, T, F, Fut>(inputs: I, limit: ConcurrencyLimit, op: F) -> FanOut<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<Vec<T>, EntityFetchError>>,
{
    let settled: Vec<Result<Vec<T>, EntityFetchError>> = stream::iter(inputs)
        .map(op)
        .buffered(limit.get())
        .collect()
        .await;

    let mut outcome = FanOut {
        results: Vec::with_capacity(settled.len()),
        failures: Vec::new(),
    };
    for result in settled {
        match result {
            Ok(items) => outcome.results.push(items),
            Err(err) => {
                warn!(
                    entity = %err.entity_id,
                    error = %err.source,
                    "entity fetch failed, continuing with an empty result"
                );
                outcome.results.push(Vec::new());
                outcome.failures.push(err);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use progress_core::model::EntityId;

    use crate::error::FetchError;

    fn limit(n: usize) -> ConcurrencyLimit {
        ConcurrencyLimit::new(n).unwrap()
    }

    #[tokio::test]
    async fn preserves_input_order_despite_completion_order() {
        let inputs: Vec<u64> = (0..10).collect();

        let outcome = fan_out(inputs, limit(4), |n| async move {
            // Later inputs finish first.
            tokio::time::sleep(Duration::from_millis(20 - 2 * n)).await;
            Ok::<_, EntityFetchError>(vec![n * 10])
        })
        .await;

        let flat: Vec<u64> = outcome.results.into_iter().flatten().collect();
        assert_eq!(flat, (0..10).map(|n| n * 10).collect::<Vec<_>>());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn never_exceeds_the_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let inputs: Vec<u64> = (0..25).collect();

        let outcome = fan_out(inputs, limit(3), |n| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, EntityFetchError>(vec![n])
            }
        })
        .await;

        assert_eq!(outcome.results.len(), 25);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_degrades_to_empty_slot() {
        let inputs: Vec<u64> = vec![1, 2, 3];

        let outcome = fan_out(inputs, limit(2), |n| async move {
            if n == 2 {
                return Err(EntityFetchError {
                    entity_id: EntityId::from(n),
                    display_name: "Dos".into(),
                    source: FetchError::Status {
                        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                        body: "boom".into(),
                    },
                });
            }
            Ok::<_, EntityFetchError>(vec![n, n])
        })
        .await;

        assert_eq!(outcome.results, vec![vec![1, 1], vec![], vec![3, 3]]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].entity_id, EntityId::from(2));
    }

    #[tokio::test]
    async fn empty_input_settles_immediately() {
        let inputs: Vec<u64> = Vec::new();
        let outcome =
            fan_out(inputs, limit(8), |n| async move { Ok::<_, EntityFetchError>(vec![n]) }).await;
        assert!(outcome.results.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
