use crate::danmu::{self, SegmentResolver};
use crate::error::Result;

use super::{
    AUTHOR, EnumOption, ModuleSpec, ParamSpec, ParamType, Params, SITE, Widget, WidgetMetadata,
    WidgetOutput, unknown_function,
};

/// Danmu search and time-segmented comment retrieval.
///
/// Host parameters: `server` (falls back to the configured server),
/// `commentId`, `tmdbId` (memo key), `segmentTime` (seconds, default 0) and
/// `title` for search.
pub struct DanmuWidget {
    metadata: WidgetMetadata,
    resolver: SegmentResolver,
    default_server: String,
}

fn danmu_module(id: &'static str, title: &'static str, function_name: &'static str) -> ModuleSpec {
    ModuleSpec {
        id,
        title,
        function_name,
        module_type: Some("danmu"),
        params: Vec::new(),
    }
}

impl DanmuWidget {
    pub fn new(resolver: SegmentResolver, default_server: String) -> Self {
        let metadata = WidgetMetadata {
            id: "forward.danmu.example",
            title: "自定义弹幕示例",
            version: "1.0.0",
            required_version: "0.0.2",
            description: "从指定服务器获取弹幕示例",
            author: AUTHOR,
            site: SITE,
            global_params: vec![ParamSpec {
                name: "server",
                title: "自定义服务器",
                param_type: ParamType::Input,
                enum_options: Vec::new(),
                placeholders: vec![EnumOption {
                    title: "弹弹play",
                    value: "https://api.dandanplay.net",
                }],
            }],
            modules: vec![
                danmu_module("searchDanmu", "搜索弹幕", "searchDanmu"),
                danmu_module("getComments", "获取弹幕", "getCommentsById"),
                danmu_module(
                    "getDanmuWithSegmentTime",
                    "获取指定时刻弹幕",
                    "getDanmuWithSegmentTime",
                ),
            ],
        };

        Self {
            metadata,
            resolver,
            default_server,
        }
    }

    fn segment_time(params: &Params) -> Result<f64> {
        Ok(params.get_f64("segmentTime")?.unwrap_or(0.0))
    }

    pub async fn comments_by_id(&self, params: &Params) -> Result<WidgetOutput> {
        let time = Self::segment_time(params)?;
        let tmdb_id = params.get("tmdbId");
        let server = params.get("server").unwrap_or(self.default_server.as_str());

        let payload = match params.get("commentId") {
            Some(comment_id) => self.resolver.resolve(tmdb_id, time, server, comment_id).await,
            // Nothing to ask the server for; only a memo can answer
            None => self.resolver.resolve_memoized(tmdb_id, time).await,
        };
        Ok(WidgetOutput::Comments(payload))
    }

    pub async fn comments_at(&self, params: &Params) -> Result<WidgetOutput> {
        let time = Self::segment_time(params)?;
        let payload = self
            .resolver
            .resolve_memoized(params.get("tmdbId"), time)
            .await;
        Ok(WidgetOutput::Comments(payload))
    }
}

#[async_trait::async_trait]
impl Widget for DanmuWidget {
    fn metadata(&self) -> &WidgetMetadata {
        &self.metadata
    }

    async fn call(&self, function_name: &str, params: &Params) -> Result<WidgetOutput> {
        match function_name {
            "searchDanmu" => Ok(WidgetOutput::Search(danmu::search(
                params.get("title").unwrap_or_default(),
            ))),
            "getCommentsById" => self.comments_by_id(params).await,
            "getDanmuWithSegmentTime" => self.comments_at(params).await,
            _ => Err(unknown_function(&self.metadata, function_name)),
        }
    }
}
