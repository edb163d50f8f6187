// SPDX-License-Identifier: MIT

//! Exhaustive paginated retrieval.
//!
//! The catalog API exposes unbounded collections through `(offset, limit)`
//! page requests that each report the collection's `total`. [`fetch_all`]
//! turns one such operation into a complete in-memory sequence, issuing
//! exactly `ceil(total / page_size)` sequential requests.
//!
//! The fetch is read-only and restartable: a failing page request aborts
//! the whole call with that page's error, and pages retrieved before the
//! failure are discarded. Retry/backoff is a caller concern.

use crate::error::AppError;
use std::future::Future;

/// Page size used for all catalog collections.
pub const PAGE_SIZE: u32 = 50;

/// One page of a remote collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total item count for the whole collection, as reported by the remote.
    pub total: u32,
}

/// Fetch a complete remote collection through repeated page requests.
///
/// `fetch(offset, limit)` retrieves one page. The first request runs at
/// offset 0; its `total` decides how many further requests are needed.
/// Items are concatenated in response order.
pub async fn fetch_all<T, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>, AppError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, AppError>>,
{
    let first = fetch(0, page_size).await?;
    let total = first.total as usize;
    let mut items = first.items;

    while items.len() < total {
        let offset = items.len() as u32;
        let page = fetch(offset, page_size).await?;

        if page.items.is_empty() {
            // The remote declared more items than it delivers; bail rather
            // than loop forever on an inconsistent listing.
            return Err(AppError::Fetch(format!(
                "empty page at offset {} with {} of {} items retrieved",
                offset,
                items.len(),
                total
            )));
        }

        items.extend(page.items);
    }

    // An overfull final page would make the sequence longer than the remote
    // declared; trim to the declared total.
    items.truncate(total);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Build a fake collection of `total` numbered items.
    fn remote(total: u32) -> Vec<u32> {
        (0..total).collect()
    }

    /// Page-fetch closure over a fake collection, counting calls and
    /// recording requested offsets.
    fn paged_fetch(
        data: Vec<u32>,
        calls: Arc<AtomicU32>,
        offsets: Arc<std::sync::Mutex<Vec<u32>>>,
    ) -> impl FnMut(u32, u32) -> std::future::Ready<Result<Page<u32>, AppError>> {
        move |offset, limit| {
            calls.fetch_add(1, Ordering::SeqCst);
            offsets.lock().unwrap().push(offset);
            let total = data.len() as u32;
            let start = (offset as usize).min(data.len());
            let end = (start + limit as usize).min(data.len());
            std::future::ready(Ok(Page {
                items: data[start..end].to_vec(),
                total,
            }))
        }
    }

    #[tokio::test]
    async fn single_page_collection_issues_one_request() {
        let calls = Arc::new(AtomicU32::new(0));
        let offsets = Arc::new(std::sync::Mutex::new(Vec::new()));
        let fetch = paged_fetch(remote(30), calls.clone(), offsets.clone());

        let items = fetch_all(50, fetch).await.unwrap();

        assert_eq!(items.len(), 30);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*offsets.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn total_120_page_size_50_issues_three_requests_in_order() {
        let calls = Arc::new(AtomicU32::new(0));
        let offsets = Arc::new(std::sync::Mutex::new(Vec::new()));
        let fetch = paged_fetch(remote(120), calls.clone(), offsets.clone());

        let items = fetch_all(50, fetch).await.unwrap();

        assert_eq!(items.len(), 120);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*offsets.lock().unwrap(), vec![0, 50, 100]);
        // Concatenated in page order
        assert_eq!(items, remote(120));
    }

    #[tokio::test]
    async fn exact_multiple_issues_ceil_requests() {
        let calls = Arc::new(AtomicU32::new(0));
        let offsets = Arc::new(std::sync::Mutex::new(Vec::new()));
        let fetch = paged_fetch(remote(100), calls.clone(), offsets.clone());

        let items = fetch_all(50, fetch).await.unwrap();

        assert_eq!(items.len(), 100);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_collection_returns_empty() {
        let calls = Arc::new(AtomicU32::new(0));
        let offsets = Arc::new(std::sync::Mutex::new(Vec::new()));
        let fetch = paged_fetch(remote(0), calls.clone(), offsets.clone());

        let items = fetch_all(50, fetch).await.unwrap();

        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mid_fetch_failure_discards_earlier_pages() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_fetch = calls.clone();

        // Page at offset 50 fails; pages 1's data must not leak out.
        let fetch = move |offset: u32, limit: u32| {
            calls_in_fetch.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if offset == 0 {
                Ok(Page {
                    items: (0..limit).collect(),
                    total: 120,
                })
            } else {
                Err(AppError::provider(502, "upstream blew up"))
            })
        };

        let err = fetch_all(50, fetch).await.unwrap_err();

        assert!(matches!(err, AppError::Provider { status: 502, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn under_delivering_remote_aborts_instead_of_looping() {
        // Remote declares 100 items but serves an empty second page.
        let fetch = |offset: u32, limit: u32| {
            std::future::ready(Ok(Page {
                items: if offset == 0 {
                    (0..limit).collect()
                } else {
                    vec![]
                },
                total: 100,
            }))
        };

        let err = fetch_all(50, fetch).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }

    #[tokio::test]
    async fn trims_to_declared_total() {
        // Remote declares 60 but the second page overfills.
        let fetch = |offset: u32, _limit: u32| {
            std::future::ready(Ok(Page {
                items: if offset == 0 {
                    (0..50).collect()
                } else {
                    (50..120).collect()
                },
                total: 60,
            }))
        };

        let items = fetch_all(50, fetch).await.unwrap();
        assert_eq!(items.len(), 60);
    }
}
