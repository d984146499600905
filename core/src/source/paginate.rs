//! Generic "prime page, fan out 2..N, merge in arrival order" pagination
//! helper shared by every source/target reader (design note on
//! the fan-out pattern). One failing page aborts the whole list; partial
//! pages are never returned.

use futures::future::join_all;
use std::future::Future;

use crate::engine_config::{retry_async, RetryPolicy};
use crate::error::{EngineError, Result};

/// One page of results plus the total item count the *first* page reports,
/// from which the caller computes `total_pages`.
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

/// Fetch all pages of a paginated list endpoint.
///
/// `fetch_page(page, page_size)` must be safe to call concurrently for
/// distinct pages; this only calls it with `page >= 1`. Page 1 is awaited
/// first to learn `total_count`; pages `2..=total_pages` are then fetched
/// concurrently via `futures::future::join_all`. Each page fetch is wrapped
/// in `retry_policy` — a transient (retryable) failure on any one page is
/// retried in place rather than aborting the whole list. Results are merged
/// in page-arrival order — callers must not depend on item order.
pub async fn fetch_all<T, F, Fut>(page_size: usize, retry_policy: &RetryPolicy, fetch_page: F) -> Result<Vec<T>>
where
    F: Fn(usize, usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    assert!(page_size > 0, "page_size must be positive");

    let first = retry_async(retry_policy, EngineError::is_retryable, || fetch_page(1, page_size)).await?;
    let total_pages = total_pages(first.total_count, page_size);

    let mut items = first.items;
    if total_pages <= 1 {
        return Ok(items);
    }

    let remaining =
        (2..=total_pages).map(|page| {
            let fetch_page = &fetch_page;
            retry_async(retry_policy, EngineError::is_retryable, move || fetch_page(page, page_size))
        });
    let results = join_all(remaining).await;

    for result in results {
        items.extend(result?.items);
    }

    Ok(items)
}

fn total_pages(total_count: usize, page_size: usize) -> usize {
    if total_count == 0 {
        0
    } else {
        (total_count + page_size - 1) / page_size
    }
}

/// Convenience for mapping a transport-layer failure from a concrete
/// provider implementation into an [`EngineError::Transport`].
pub fn transport_error(provider: impl Into<String>, source: reqwest::Error) -> EngineError {
    EngineError::Transport {
        provider: provider.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn merges_pages_in_full() {
        let calls = AtomicUsize::new(0);
        let result = fetch_all(2, &RetryPolicy::no_retry(), |page, page_size| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let total_count = 5;
                let start = (page - 1) * page_size;
                let items: Vec<i32> = (start..(start + page_size).min(total_count))
                    .map(|i| i as i32)
                    .collect();
                Ok(Page { items, total_count })
            }
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 3); // pages 1,2,3 for 5 items at size 2
    }

    #[tokio::test]
    async fn single_page_short_circuits() {
        let result = fetch_all(20, &RetryPolicy::no_retry(), |_page, _size| async {
            Ok(Page {
                items: vec![1, 2, 3],
                total_count: 3,
            })
        })
        .await
        .unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_list_returns_empty() {
        let result = fetch_all::<i32, _, _>(20, &RetryPolicy::no_retry(), |_page, _size| async {
            Ok(Page {
                items: vec![],
                total_count: 0,
            })
        })
        .await
        .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn first_error_aborts_whole_list() {
        let result = fetch_all::<i32, _, _>(2, &RetryPolicy::no_retry(), |page, _size| async move {
            if page == 2 {
                Err(EngineError::Validation {
                    message: "boom".into(),
                })
            } else {
                Ok(Page {
                    items: vec![1, 2],
                    total_count: 6,
                })
            }
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn transient_page_failure_is_retried_until_it_succeeds() {
        let attempts = AtomicUsize::new(0);
        let policy = RetryPolicy {
            base_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(2),
            ..RetryPolicy::default()
        };
        let result = fetch_all(2, &policy, |page, _size| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if page == 1 && attempt == 0 {
                    Err(EngineError::Remote {
                        provider: "gitlab".into(),
                        status: 503,
                        body: "unavailable".into(),
                    })
                } else {
                    Ok(Page {
                        items: vec![1, 2],
                        total_count: 2,
                    })
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, vec![1, 2]);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_page_failure_aborts_without_retrying() {
        let attempts = AtomicUsize::new(0);
        let result = fetch_all::<i32, _, _>(2, &RetryPolicy::default(), |_page, _size| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(EngineError::Validation {
                    message: "boom".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
