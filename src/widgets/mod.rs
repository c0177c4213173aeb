//! Widget metadata, host invocation and the registry that ties them together.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::Config;
use crate::danmu::{SearchResult, SegmentResolver};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::normalize::MediaItem;
use crate::snapshot::SnapshotFetcher;
use crate::storage::KeyValueStore;

pub mod bangumi;
pub mod danmu;
pub mod media;

pub use bangumi::BangumiWidget;
pub use danmu::DanmuWidget;
pub use media::MediaWidget;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetMetadata {
    pub id: &'static str,
    pub title: &'static str,
    pub version: &'static str,
    pub required_version: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub site: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub global_params: Vec<ParamSpec>,
    pub modules: Vec<ModuleSpec>,
}

impl WidgetMetadata {
    pub fn module(&self, function_name: &str) -> Option<&ModuleSpec> {
        self.modules
            .iter()
            .find(|m| m.function_name == function_name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub function_name: &'static str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub module_type: Option<&'static str>,
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: &'static str,
    pub title: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_options: Vec<EnumOption>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub placeholders: Vec<EnumOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Input,
    Enumeration,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumOption {
    pub title: &'static str,
    pub value: &'static str,
}

pub(crate) const AUTHOR: &str = "Forward";
pub(crate) const SITE: &str = "https://github.com/InchStudio/ForwardWidgets";

/// Parameters handed over by the host for one invocation
#[derive(Debug, Clone, Default)]
pub struct Params(HashMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Non-blank value of `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_f64(&self, name: &str) -> Result<Option<f64>> {
        self.get(name)
            .map(|v| {
                v.parse::<f64>().map_err(|e| Error::InvalidParam {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn get_usize(&self, name: &str) -> Result<Option<usize>> {
        self.get(name)
            .map(|v| {
                v.parse::<usize>().map_err(|e| Error::InvalidParam {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// What a widget function hands back to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WidgetOutput {
    Items(Vec<MediaItem>),
    Search(SearchResult),
    Comments(Option<Value>),
}

#[async_trait::async_trait]
pub trait Widget: Send + Sync {
    fn metadata(&self) -> &WidgetMetadata;

    async fn call(&self, function_name: &str, params: &Params) -> Result<WidgetOutput>;
}

pub(crate) fn unknown_function(widget: &WidgetMetadata, function_name: &str) -> Error {
    Error::UnknownFunction {
        widget: widget.id.to_string(),
        function: function_name.to_string(),
    }
}

/// Shared collaborators handed to the built-in widgets
#[derive(Clone)]
pub struct Services {
    pub http: Arc<dyn HttpClient>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Default)]
pub struct Registry {
    widgets: Vec<Box<dyn Widget>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the bangumi, media and danmu widgets
    pub fn builtin(config: &Config, services: Services) -> Self {
        let fetcher = Arc::new(SnapshotFetcher::new(
            services.http.clone(),
            services.clock.clone(),
            &config.assets.base_url,
        ));
        let resolver = SegmentResolver::new(
            services.http.clone(),
            services.store.clone(),
            config.danmu.user_agent.clone(),
        )
        .with_zlib_segments(config.danmu.zlib_segments);

        let mut registry = Self::new();
        registry.register(Box::new(BangumiWidget::new(
            fetcher.clone(),
            services.clock.clone(),
            config.schedule.max_items,
        )));
        registry.register(Box::new(MediaWidget::new(fetcher)));
        registry.register(Box::new(DanmuWidget::new(
            resolver,
            config.danmu.server.clone(),
        )));
        registry
    }

    pub fn register(&mut self, widget: Box<dyn Widget>) {
        info!(id = widget.metadata().id, "Registered widget");
        self.widgets.push(widget);
    }

    pub fn metadata(&self) -> Vec<&WidgetMetadata> {
        self.widgets.iter().map(|w| w.metadata()).collect()
    }

    /// Widgets answer to their full id (`forward.danmu.example`) or to any
    /// part of it after the vendor prefix (`danmu`)
    pub fn find(&self, widget_id: &str) -> Option<&dyn Widget> {
        self.widgets
            .iter()
            .find(|w| {
                let id = w.metadata().id;
                id == widget_id || id.split('.').skip(1).any(|part| part == widget_id)
            })
            .map(|w| &**w)
    }

    pub async fn invoke(
        &self,
        widget_id: &str,
        function_name: &str,
        params: &Params,
    ) -> Result<WidgetOutput> {
        let widget = self
            .find(widget_id)
            .ok_or_else(|| Error::UnknownWidget(widget_id.to_string()))?;

        let metadata = widget.metadata();
        if metadata.module(function_name).is_none() {
            return Err(unknown_function(metadata, function_name));
        }

        debug!(widget = metadata.id, function = function_name, ?params, "Invoking");
        widget.call(function_name, params).await
    }
}
