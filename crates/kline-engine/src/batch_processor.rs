/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Bounded-concurrency fan-out shared by `archive_fetcher` (one task per
//! day) and `rest_fetcher` (one task per chunk), capping in-flight
//! requests at a caller-supplied limit (50 by default); both fetchers
//! build on this rather than spawning unbounded tasks.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

/// Every item either succeeds with an `O` or fails with an `E`; failures
/// don't abort the run, since a partial day-range result is still useful
/// to the Orchestrator.
#[derive(Debug, Clone)]
pub struct BatchResult<O, E> {
    pub successes: Vec<O>,
    pub failures: Vec<(usize, E)>,
}

impl<O, E> BatchResult<O, E> {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Runs `processor` over `items` with at most `max_concurrency` futures
/// in flight at once. Order of the input is not preserved in `successes`;
/// callers that need to reassemble ordered output (e.g. REST chunks by
/// time) should sort by a field carried inside `O`.
pub async fn run_bounded<T, O, E, F>(
    items: Vec<T>,
    max_concurrency: usize,
    processor: F,
) -> BatchResult<O, E>
where
    T: Send + 'static,
    O: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: Fn(T) -> BoxFuture<'static, Result<O, E>> + Send + Sync + Clone + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

    let outcomes = stream::iter(items.into_iter().enumerate())
        .map(move |(idx, item)| {
            let processor = processor.clone();
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closes mid-run");
                (idx, processor(item).await)
            }
        })
        .buffer_unordered(max_concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut result = BatchResult { successes: Vec::new(), failures: Vec::new() };
    for (idx, outcome) in outcomes {
        match outcome {
            Ok(value) => result.successes.push(value),
            Err(err) => {
                warn!(index = idx, error = %err, "batch item failed");
                result.failures.push((idx, err));
            }
        }
    }
    result
}
