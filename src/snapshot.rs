//! Dataset retrieval from the asset store.
//!
//! Every dataset is published under an alias name pointing at the newest
//! snapshot, and most are also published once a day under a dated name.
//! The fetcher tries the alias, then walks back through the dated names,
//! and settles for an empty dataset when nothing answers.

use std::sync::Arc;

use chrono::Days;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, date_stamp};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestOptions};
use crate::normalize::is_truthy;
use crate::schedule::WeeklySchedule;

/// Dated snapshots probed after the alias, today included
pub const MAX_DATED_ATTEMPTS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Trending,
    Latest,
    Tv,
    Variety,
}

impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Trending => "trending",
            MediaCategory::Latest => "latest",
            MediaCategory::Tv => "tv",
            MediaCategory::Variety => "variety",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Weekly anime broadcast schedule
    Schedule,
    /// Trending anime list
    AnimeTrending,
    /// Movie / TV / variety lists
    Media(MediaCategory),
}

impl ResourceKind {
    pub fn alias_name(&self) -> String {
        match self {
            ResourceKind::Schedule => "latest.json".to_string(),
            ResourceKind::AnimeTrending => "latest_bangumi_trending.json".to_string(),
            ResourceKind::Media(c) => format!("latest_{}.json", c.as_str()),
        }
    }

    /// `None` for datasets only published under their alias
    pub fn dated_name(&self, stamp: &str) -> Option<String> {
        match self {
            ResourceKind::Schedule => Some(format!("bangumi_enriched_{}.json", stamp)),
            ResourceKind::AnimeTrending => None,
            ResourceKind::Media(c) => {
                Some(format!("trending_{}_enriched_{}.json", c.as_str(), stamp))
            }
        }
    }

    pub fn empty(&self) -> Dataset {
        match self {
            ResourceKind::Schedule => Dataset::Schedule(WeeklySchedule::empty()),
            ResourceKind::AnimeTrending | ResourceKind::Media(_) => Dataset::Records(Vec::new()),
        }
    }

    fn parse(&self, payload: Value) -> Result<Dataset> {
        match self {
            ResourceKind::Schedule => Ok(Dataset::Schedule(serde_json::from_value(payload)?)),
            ResourceKind::AnimeTrending | ResourceKind::Media(_) => {
                Ok(Dataset::Records(serde_json::from_value(payload)?))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Schedule(WeeklySchedule),
    Records(Vec<Value>),
}

impl Dataset {
    pub fn into_schedule(self) -> WeeklySchedule {
        match self {
            Dataset::Schedule(schedule) => schedule,
            Dataset::Records(_) => WeeklySchedule::empty(),
        }
    }

    pub fn into_records(self) -> Vec<Value> {
        match self {
            Dataset::Records(records) => records,
            Dataset::Schedule(_) => Vec::new(),
        }
    }
}

pub struct SnapshotFetcher {
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl SnapshotFetcher {
    pub fn new(http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>, base_url: &str) -> Self {
        Self {
            http,
            clock,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Alias first, then each dated snapshot back to a week ago.
    /// Never fails: exhaustion yields the kind's empty dataset.
    pub async fn fetch(&self, kind: ResourceKind) -> Dataset {
        let alias_url = self.url(&kind.alias_name());
        debug!(url = %alias_url, "Fetching latest snapshot");

        match self.try_fetch(kind, &alias_url).await {
            Ok(dataset) => {
                info!(url = %alias_url, "Fetched latest snapshot");
                return dataset;
            }
            Err(e) => warn!(url = %alias_url, "Latest snapshot unavailable: {}", e),
        }

        let today = self.clock.today();
        for i in 0..MAX_DATED_ATTEMPTS {
            let Some(date) = today.checked_sub_days(Days::new(i)) else {
                break;
            };
            let stamp = date_stamp(date);
            let Some(name) = kind.dated_name(&stamp) else {
                break;
            };

            let url = self.url(&name);
            debug!(url = %url, attempt = i + 1, "Fetching dated snapshot");

            match self.try_fetch(kind, &url).await {
                Ok(dataset) => {
                    info!(url = %url, date = %stamp, "Fetched dated snapshot");
                    return dataset;
                }
                Err(e) => warn!(url = %url, "Dated snapshot unavailable: {}", e),
            }
        }

        warn!(?kind, "No snapshot available, returning empty dataset");
        kind.empty()
    }

    async fn try_fetch(&self, kind: ResourceKind, url: &str) -> Result<Dataset> {
        let payload = self
            .http
            .get(url, &RequestOptions::default())
            .await?
            .filter(is_truthy)
            .ok_or_else(|| Error::EmptyPayload(url.to_string()))?;

        kind.parse(payload)
    }
}
