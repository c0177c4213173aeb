use std::sync::Arc;

use crate::error::Result;
use crate::normalize::{self, MEDIA, MediaItem};
use crate::snapshot::{MediaCategory, ResourceKind, SnapshotFetcher};

use super::{
    AUTHOR, ModuleSpec, Params, SITE, Widget, WidgetMetadata, WidgetOutput, unknown_function,
};

const MODULES: [(&str, &str, MediaCategory); 4] = [
    ("trendingMovies", "热门电影", MediaCategory::Trending),
    ("latestMovies", "最新电影", MediaCategory::Latest),
    ("trendingTV", "热门电视剧", MediaCategory::Tv),
    ("trendingVariety", "热门综艺", MediaCategory::Variety),
];

/// Trending movies, TV and variety shows
pub struct MediaWidget {
    metadata: WidgetMetadata,
    fetcher: Arc<SnapshotFetcher>,
}

impl MediaWidget {
    pub fn new(fetcher: Arc<SnapshotFetcher>) -> Self {
        let metadata = WidgetMetadata {
            id: "forward.trendingmedia",
            title: "影视数据",
            version: "1.0.0",
            required_version: "0.0.1",
            description: "获取时下热门电影、电视剧和综艺数据",
            author: AUTHOR,
            site: SITE,
            global_params: Vec::new(),
            modules: MODULES
                .iter()
                .map(|&(name, title, _)| ModuleSpec {
                    id: name,
                    title,
                    function_name: name,
                    module_type: None,
                    params: Vec::new(),
                })
                .collect(),
        };

        Self { metadata, fetcher }
    }

    pub async fn list(&self, category: MediaCategory) -> Vec<MediaItem> {
        let records = self
            .fetcher
            .fetch(ResourceKind::Media(category))
            .await
            .into_records();
        normalize::normalize(&MEDIA, &records)
    }
}

#[async_trait::async_trait]
impl Widget for MediaWidget {
    fn metadata(&self) -> &WidgetMetadata {
        &self.metadata
    }

    async fn call(&self, function_name: &str, _params: &Params) -> Result<WidgetOutput> {
        let category = MODULES
            .iter()
            .find(|(name, _, _)| *name == function_name)
            .map(|(_, _, category)| *category)
            .ok_or_else(|| unknown_function(&self.metadata, function_name))?;

        Ok(WidgetOutput::Items(self.list(category).await))
    }
}
