use std::sync::Arc;

use crate::clock::Clock;
use crate::error::Result;
use crate::normalize::{self, ANIME, ANIME_TRENDING, MediaItem};
use crate::schedule::{self, DaySelector, WEEKDAY_LABELS};
use crate::snapshot::{ResourceKind, SnapshotFetcher};

use super::{
    AUTHOR, EnumOption, ModuleSpec, ParamSpec, ParamType, Params, SITE, Widget, WidgetMetadata,
    WidgetOutput, unknown_function,
};

/// Daily broadcast schedule and trending anime
pub struct BangumiWidget {
    metadata: WidgetMetadata,
    fetcher: Arc<SnapshotFetcher>,
    clock: Arc<dyn Clock>,
    default_max_items: usize,
}

fn metadata() -> WidgetMetadata {
    let mut day_options = vec![EnumOption {
        title: "今天",
        value: "today",
    }];
    // Listed Monday first, Sunday last
    day_options.extend(
        WEEKDAY_LABELS[1..]
            .iter()
            .chain(WEEKDAY_LABELS[..1].iter())
            .copied()
            .map(|label| EnumOption {
                title: label,
                value: label,
            }),
    );

    WidgetMetadata {
        id: "forward.bangumi",
        title: "动漫数据",
        version: "1.0.0",
        required_version: "0.0.1",
        description: "获取时下热门动漫数据和播出日历",
        author: AUTHOR,
        site: SITE,
        global_params: Vec::new(),
        modules: vec![
            ModuleSpec {
                id: "dailySchedule",
                title: "每日播出",
                function_name: "dailySchedule",
                module_type: None,
                params: vec![ParamSpec {
                    name: "day",
                    title: "星期",
                    param_type: ParamType::Enumeration,
                    enum_options: day_options,
                    placeholders: Vec::new(),
                }],
            },
            ModuleSpec {
                id: "trending",
                title: "近期注目",
                function_name: "trending",
                module_type: None,
                params: Vec::new(),
            },
        ],
    }
}

impl BangumiWidget {
    pub fn new(fetcher: Arc<SnapshotFetcher>, clock: Arc<dyn Clock>, default_max_items: usize) -> Self {
        Self {
            metadata: metadata(),
            fetcher,
            clock,
            default_max_items,
        }
    }

    /// `day` is a weekday label or `today`; `maxItems` caps the list (0 means default)
    pub async fn daily_schedule(&self, params: &Params) -> Result<Vec<MediaItem>> {
        let day = DaySelector::parse(params.get("day").unwrap_or("today"));
        let max_items = params
            .get_usize("maxItems")?
            .filter(|n| *n > 0)
            .unwrap_or(self.default_max_items);

        let schedule = self.fetcher.fetch(ResourceKind::Schedule).await.into_schedule();
        let records = schedule::select(&schedule, &day, max_items, self.clock.as_ref());
        Ok(normalize::normalize(&ANIME, &records))
    }

    pub async fn trending(&self) -> Vec<MediaItem> {
        let records = self
            .fetcher
            .fetch(ResourceKind::AnimeTrending)
            .await
            .into_records();
        normalize::normalize(&ANIME_TRENDING, &records)
    }
}

#[async_trait::async_trait]
impl Widget for BangumiWidget {
    fn metadata(&self) -> &WidgetMetadata {
        &self.metadata
    }

    async fn call(&self, function_name: &str, params: &Params) -> Result<WidgetOutput> {
        match function_name {
            "dailySchedule" => Ok(WidgetOutput::Items(self.daily_schedule(params).await?)),
            "trending" => Ok(WidgetOutput::Items(self.trending().await)),
            _ => Err(unknown_function(&self.metadata, function_name)),
        }
    }
}
