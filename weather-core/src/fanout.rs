//! Running one fetch per city and collecting every outcome in input order.

use std::future::Future;

use futures::{StreamExt, stream};

/// How the cities of one run are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One city at a time.
    Sequential,
    /// Up to `limit` cities in flight at once (at least one).
    Concurrent { limit: usize },
}

impl FetchMode {
    pub fn concurrent(limit: usize) -> Self {
        FetchMode::Concurrent { limit: limit.max(1) }
    }
}

/// Success/failure counts of a finished fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanOutSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl FanOutSummary {
    pub fn of<T, E>(results: &[Result<T, E>]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        Self { succeeded, failed: results.len() - succeeded }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Run `fetch_one` for every city and return the outcomes.
///
/// `result[i]` always belongs to `cities[i]`, whatever order the fetches finish in.
/// A failing city only fills its own slot; siblings keep running and nothing
/// is cancelled. Both modes yield the same outcomes and differ only in timing.
pub async fn fetch_all<T, E, F, Fut>(
    cities: &[String],
    mode: FetchMode,
    fetch_one: F,
) -> Vec<Result<T, E>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match mode {
        FetchMode::Sequential => {
            let mut results = Vec::with_capacity(cities.len());
            for city in cities {
                results.push(fetch_one(city.clone()).await);
            }
            results
        }
        FetchMode::Concurrent { limit } => {
            // A finished fetch frees its slot at once; results are put back by input index.
            let mut slots: Vec<Option<Result<T, E>>> =
                std::iter::repeat_with(|| None).take(cities.len()).collect();

            let mut finished = stream::iter(cities.iter().cloned().enumerate())
                .map(|(idx, city)| {
                    let fetch = fetch_one(city);
                    async move { (idx, fetch.await) }
                })
                .buffer_unordered(limit.max(1));

            while let Some((idx, result)) = finished.next().await {
                slots[idx] = Some(result);
            }

            slots.into_iter().flatten().collect()
        }
    }
}
