//! Data functions behind the bangumi, trending media and danmu widgets.
//!
//! Datasets come from a remote asset store as JSON snapshots and are
//! normalized into [`MediaItem`]s; danmu comments are looked up by time
//! segment with the segment index memoized in host storage.

pub mod clock;
pub mod compression;
pub mod config;
pub mod danmu;
pub mod error;
pub mod http;
pub mod normalize;
pub mod schedule;
pub mod snapshot;
pub mod storage;
pub mod widgets;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use normalize::MediaItem;
pub use widgets::{Params, Registry, Services, WidgetOutput};
