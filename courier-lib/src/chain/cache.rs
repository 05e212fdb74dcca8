use std::sync::Arc;

use async_trait::async_trait;
use http::Method;

use super::{Chain, Interceptor};
use crate::cache::ResponseCache;
use crate::types::Result;
use crate::{Response, ResponseSource};

/// Serves `GET` requests from a [`ResponseCache`] and keeps it up to date.
///
/// A hit short-circuits the chain, so neither the connection nor network
/// interceptors run. Successful `GET` responses are stored; any other method
/// invalidates the entry for its URL once the server has answered.
/// Without a cache this stage only delegates.
#[derive(Debug, Clone, Default)]
pub struct CacheInterceptor {
    cache: Option<Arc<dyn ResponseCache>>,
}

impl CacheInterceptor {
    /// Use `cache`, if any
    #[must_use]
    pub const fn new(cache: Option<Arc<dyn ResponseCache>>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Interceptor for CacheInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        let request = chain.request().clone();
        let Some(cache) = &self.cache else {
            return chain.proceed(request).await;
        };

        if request.method() != Method::GET {
            let response = chain.proceed(request).await?;
            cache.remove(response.request());
            return Ok(response);
        }

        if let Some(cached) = cache.get(&request) {
            log::trace!("Cache hit for {request}");
            return Ok(cached.with_source(ResponseSource::Cache));
        }

        let response = chain.proceed(request).await?;
        if response.is_success() {
            cache.put(&response);
        }
        Ok(response)
    }
}
