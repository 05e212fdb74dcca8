//! Response storage consulted by the [`CacheInterceptor`](crate::chain::CacheInterceptor).

use std::fmt::Debug;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use url::Url;

use crate::{Request, Response};

/// Stores responses keyed by request URL.
///
/// Implementations decide on freshness themselves: [`ResponseCache::get`]
/// must only return responses that may be served without revalidation.
pub trait ResponseCache: Send + Sync + Debug {
    /// A fresh response for `request`, if any
    fn get(&self, request: &Request) -> Option<Response>;

    /// Remember `response` for later requests to the same URL
    fn put(&self, response: &Response);

    /// Forget whatever is stored for the URL of `request`
    fn remove(&self, request: &Request);
}

/// An in-memory [`ResponseCache`] with a fixed maximum age per entry.
///
/// Stale entries are dropped lazily when they are looked up.
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<Url, (Instant, Response)>,
    max_age: Duration,
}

impl MemoryCache {
    /// Create an empty cache serving entries for at most `max_age`
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_age,
        }
    }

    /// Number of stored entries, stale ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, request: &Request) -> Option<Response> {
        let url = request.url();
        if let Some(entry) = self.entries.get(url) {
            let (stored, response) = entry.value();
            if stored.elapsed() <= self.max_age {
                return Some(response.clone());
            }
        }
        // Only remove once the read guard above is released.
        self.entries
            .remove_if(url, |_, (stored, _)| stored.elapsed() > self.max_age);
        None
    }

    fn put(&self, response: &Response) {
        self.entries.insert(
            response.request().url().clone(),
            (Instant::now(), response.clone()),
        );
    }

    fn remove(&self, request: &Request) {
        self.entries.remove(request.url());
    }
}
