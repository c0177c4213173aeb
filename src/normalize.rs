//! Raw dataset records → `MediaItem`.
//!
//! The anime schedule, anime trending and media lists share one mapping.
//! Each output field is an ordered list of [`Source`]s; the first source
//! holding a truthy value wins, otherwise the field takes its default.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Key of the enriched detail object carried by every upstream record
pub const DETAIL_KEY: &str = "tmdb_info";

const RANDOM_ID_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
    /// Any other upstream media type, passed through as-is
    #[serde(untagged)]
    Other(String),
}

impl MediaKind {
    fn from_value(value: &Value) -> Option<Self> {
        match value.as_str()? {
            "movie" => Some(MediaKind::Movie),
            "tv" => Some(MediaKind::Tv),
            other => {
                debug!(media_type = other, "Passing through unrecognized media type");
                Some(MediaKind::Other(other.to_string()))
            }
        }
    }
}

/// Normalized, host-facing item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub original_title: String,
    pub description: String,
    pub release_date: String,
    pub backdrop_path: String,
    pub poster_path: String,
    pub rating: f64,
    pub popularity: f64,
    pub vote_count: f64,
    pub media_type: MediaKind,
    pub genre_title: String,
    pub tmdb_info: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bangumi_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_tmdb: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bangumi_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bangumi_rank: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directors: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<String>,
}

/// Where a field value may come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Detail(&'static str),
    Raw(&'static str),
    /// Raw list of strings joined with ", "
    RawJoined(&'static str),
    /// Raw boolean mapped to one of two literals
    RawFlag {
        key: &'static str,
        yes: &'static str,
        no: &'static str,
    },
    /// Last path segment of a raw URL
    RawUrlSlug(&'static str),
    Literal(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extras {
    Anime,
    AnimeTrending,
    Media,
}

/// Field mapping for one record family
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub type_tag: &'static str,
    pub title_key: &'static str,
    /// Required source URL field, when the family has one
    pub source_url_key: Option<&'static str>,
    pub id: &'static [Source],
    pub original_title: &'static [Source],
    pub description: &'static [Source],
    pub release_date: &'static [Source],
    pub backdrop_path: &'static [Source],
    pub poster_path: &'static [Source],
    pub rating: &'static [Source],
    pub popularity: &'static [Source],
    pub vote_count: &'static [Source],
    pub media_type: &'static [Source],
    pub genre_title: &'static [Source],
    pub extras: Extras,
}

pub const ANIME: Schema = Schema {
    type_tag: "bangumi",
    title_key: "bangumi_name",
    source_url_key: Some("bangumi_url"),
    id: &[Source::Detail("id"), Source::RawUrlSlug("bangumi_url")],
    original_title: &[Source::Detail("originalTitle")],
    description: &[Source::Detail("description")],
    release_date: &[Source::Detail("releaseDate")],
    backdrop_path: &[Source::Detail("backdropPath")],
    poster_path: &[Source::Detail("posterPath")],
    rating: &[Source::Detail("rating")],
    popularity: &[Source::Detail("popularity")],
    vote_count: &[Source::Detail("voteCount")],
    media_type: &[Source::Detail("mediaType"), Source::Literal("tv")],
    genre_title: &[Source::Detail("genreTitle")],
    extras: Extras::Anime,
};

pub const ANIME_TRENDING: Schema = Schema {
    extras: Extras::AnimeTrending,
    ..ANIME
};

pub const MEDIA: Schema = Schema {
    type_tag: "tmdb",
    title_key: "title",
    source_url_key: None,
    id: &[Source::Detail("id"), Source::Raw("id")],
    original_title: &[Source::Detail("originalTitle"), Source::Raw("original_title")],
    description: &[Source::Detail("description"), Source::Raw("summary")],
    release_date: &[Source::Detail("releaseDate"), Source::Raw("release_date")],
    backdrop_path: &[Source::Detail("backdropPath")],
    poster_path: &[Source::Detail("posterPath"), Source::Raw("poster_url")],
    rating: &[Source::Detail("rating"), Source::Raw("rating")],
    popularity: &[Source::Detail("popularity")],
    vote_count: &[Source::Detail("voteCount")],
    media_type: &[
        Source::Detail("mediaType"),
        Source::RawFlag {
            key: "is_tv",
            yes: "tv",
            no: "movie",
        },
    ],
    genre_title: &[Source::Detail("genreTitle"), Source::RawJoined("genres")],
    extras: Extras::Media,
};

/// Upstream truthiness: null, false, 0, NaN and "" count as absent
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy_field<'a>(object: &'a Value, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| is_truthy(v))
}

fn url_slug(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|s| !s.is_empty())
}

/// Look a single source up against a record and its detail object
pub fn lookup(source: &Source, raw: &Value, detail: &Value) -> Option<Value> {
    match *source {
        Source::Detail(key) => truthy_field(detail, key).cloned(),
        Source::Raw(key) => truthy_field(raw, key).cloned(),
        Source::RawJoined(key) => {
            let items = truthy_field(raw, key)?.as_array()?;
            let joined = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(", ");
            Some(Value::String(joined))
        }
        Source::RawFlag { key, yes, no } => {
            let set = raw.get(key).is_some_and(is_truthy);
            Some(Value::String(if set { yes } else { no }.to_string()))
        }
        Source::RawUrlSlug(key) => {
            let url = truthy_field(raw, key)?.as_str()?;
            url_slug(url).map(|s| Value::String(s.to_string()))
        }
        Source::Literal(value) => Some(Value::String(value.to_string())),
    }
}

/// First source whose value is truthy and converts
pub fn first_of<T>(
    chain: &[Source],
    raw: &Value,
    detail: &Value,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    chain
        .iter()
        .filter_map(|source| lookup(source, raw, detail))
        .filter(is_truthy)
        .find_map(|value| convert(&value))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(chain: &[Source], raw: &Value, detail: &Value) -> String {
    first_of(chain, raw, detail, as_text).unwrap_or_default()
}

fn number(chain: &[Source], raw: &Value, detail: &Value) -> f64 {
    first_of(chain, raw, detail, as_number).unwrap_or(0.0)
}

fn random_id() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(RANDOM_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

fn raw_list(raw: &Value, key: &str) -> Vec<Value> {
    raw.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn raw_flag(raw: &Value, key: &str) -> bool {
    raw.get(key).is_some_and(is_truthy)
}

impl Schema {
    /// Whether a raw record carries enough to become an item
    pub fn accepts(&self, raw: &Value) -> bool {
        if !raw.is_object() || truthy_field(raw, self.title_key).is_none() {
            return false;
        }

        let has_detail_id = truthy_field(raw, DETAIL_KEY)
            .and_then(|detail| truthy_field(detail, "id"))
            .is_some();
        let has_source_url = self
            .source_url_key
            .is_none_or(|key| truthy_field(raw, key).is_some());

        has_detail_id && has_source_url
    }

    /// Map an accepted record. Callers filter with [`Schema::accepts`] first.
    pub fn map(&self, raw: &Value) -> MediaItem {
        let detail = raw.get(DETAIL_KEY).cloned().unwrap_or(Value::Null);
        let title_chain = [Source::Raw(self.title_key)];

        let mut item = MediaItem {
            id: first_of(self.id, raw, &detail, as_text).unwrap_or_else(random_id),
            item_type: self.type_tag.to_string(),
            title: text(&title_chain, raw, &detail),
            original_title: text(self.original_title, raw, &detail),
            description: text(self.description, raw, &detail),
            release_date: text(self.release_date, raw, &detail),
            backdrop_path: text(self.backdrop_path, raw, &detail),
            poster_path: text(self.poster_path, raw, &detail),
            rating: number(self.rating, raw, &detail),
            popularity: number(self.popularity, raw, &detail),
            vote_count: number(self.vote_count, raw, &detail),
            media_type: first_of(self.media_type, raw, &detail, MediaKind::from_value)
                .unwrap_or(MediaKind::Tv),
            genre_title: text(self.genre_title, raw, &detail),
            tmdb_info: detail.clone(),
            bangumi_url: None,
            has_tmdb: None,
            season_info: None,
            bangumi_rating: None,
            bangumi_rank: None,
            year: None,
            countries: None,
            directors: None,
            actors: None,
            is_new: None,
            playable: None,
            episode_count: None,
        };

        match self.extras {
            Extras::Anime | Extras::AnimeTrending => {
                item.bangumi_url = self
                    .source_url_key
                    .and_then(|key| raw.get(key))
                    .and_then(as_text);
                item.has_tmdb = Some(is_truthy(&detail));
                item.season_info = Some(text(&[Source::Detail("seasonInfo")], raw, &detail));
                if self.extras == Extras::AnimeTrending {
                    item.bangumi_rating = Some(number(&[Source::Raw("bangumi_rating")], raw, &detail));
                    item.bangumi_rank = Some(number(&[Source::Raw("bangumi_rank")], raw, &detail));
                }
            }
            Extras::Media => {
                item.year = Some(text(&[Source::Raw("year")], raw, &detail));
                item.countries = Some(raw_list(raw, "countries"));
                item.directors = Some(raw_list(raw, "directors"));
                item.actors = Some(raw_list(raw, "actors"));
                item.is_new = Some(raw_flag(raw, "is_new"));
                item.playable = Some(raw_flag(raw, "playable"));
                item.episode_count = Some(text(&[Source::Raw("episode_count")], raw, &detail));
            }
        }

        item
    }
}

/// Drop records that can't be identified and map the rest
pub fn normalize(schema: &Schema, records: &[Value]) -> Vec<MediaItem> {
    let items: Vec<MediaItem> = records
        .iter()
        .filter(|raw| schema.accepts(raw))
        .map(|raw| schema.map(raw))
        .collect();

    debug!(
        kind = schema.type_tag,
        before = records.len(),
        after = items.len(),
        "Normalized records"
    );

    items
}
