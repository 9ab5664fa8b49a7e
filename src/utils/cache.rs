use moka::future::Cache as MokaCache;
use std::time::Duration;

use crate::models::{AuthorizationDecision, SubscriptionQuery};

#[derive(Clone)]
pub struct Cache {
    pub decision_cache: MokaCache<SubscriptionQuery, AuthorizationDecision>,
}

impl Cache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            decision_cache: MokaCache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }
}
