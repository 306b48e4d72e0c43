use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ScraperError;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetSize {
    Original,
    #[default]
    Large,
}

impl AssetSize {
    pub fn from_original_flag(original: bool) -> Self {
        if original {
            AssetSize::Original
        } else {
            AssetSize::Large
        }
    }

    pub fn url_field(self) -> &'static str {
        match self {
            AssetSize::Original => "url_o",
            AssetSize::Large => "url_l",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = ScraperError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ScraperError::GroupNotFound(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    raw: [String; 4],
}

impl BoundingBox {
    /// Anything other than exactly four floats yields `None`; components keep
    /// the text as typed for the request and the folder name.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let raw = value
            .split(',')
            .map(|part| part.trim().to_string())
            .collect::<Vec<_>>();
        let parsed = raw
            .iter()
            .map(|part| part.parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        match (parsed.as_slice(), <[String; 4]>::try_from(raw)) {
            ([min_lon, min_lat, max_lon, max_lat], Ok(raw)) => Some(Self {
                min_lon: *min_lon,
                min_lat: *min_lat,
                max_lon: *max_lon,
                max_lat: *max_lat,
                raw,
            }),
            _ => None,
        }
    }

    pub fn to_param(&self) -> String {
        self.raw.join(",")
    }

    fn folder_suffix(&self) -> String {
        self.raw.join("_")
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_param())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    Search(String),
    GroupUrl(String),
}

impl QueryTarget {
    // Blank values count as absent; search text wins when both are given.
    pub fn from_args(search: Option<&str>, group: Option<&str>) -> Result<Self, ScraperError> {
        let search = search.map(str::trim).filter(|value| !value.is_empty());
        let group = group.map(str::trim).filter(|value| !value.is_empty());
        match (search, group) {
            (Some(text), _) => Ok(QueryTarget::Search(text.to_string())),
            (None, Some(url)) => Ok(QueryTarget::GroupUrl(url.to_string())),
            (None, None) => Err(ScraperError::MissingQuery),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    Search(String),
    Group(GroupId),
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Search(text) => write!(f, "{text}"),
            QueryMode::Group(id) => write!(f, "group {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub mode: QueryMode,
    pub bbox: Option<BoundingBox>,
    pub asset: AssetSize,
    pub max_pages: Option<u32>,
}

impl Query {
    pub fn search(text: impl Into<String>) -> Self {
        Self::new(QueryMode::Search(text.into()))
    }

    pub fn group(id: GroupId) -> Self {
        Self::new(QueryMode::Group(id))
    }

    pub fn new(mode: QueryMode) -> Self {
        Self {
            mode,
            bbox: None,
            asset: AssetSize::default(),
            max_pages: None,
        }
    }

    pub fn with_bbox(mut self, bbox: Option<BoundingBox>) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_asset(mut self, asset: AssetSize) -> Self {
        self.asset = asset;
        self
    }

    // A cap of 0 means no cap.
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages.filter(|max| *max > 0);
        self
    }

    pub fn folder_name(&self) -> String {
        let base = match &self.mode {
            QueryMode::Search(text) => text.clone(),
            QueryMode::Group(id) => format!("group_{id}"),
        };
        let mut name = NON_WORD.replace_all(&base, "_").into_owned();
        if let Some(bbox) = &self.bbox {
            name.push_str(&bbox.folder_suffix());
        }
        name
    }
}

/// Fields not named here are kept in `extra` so cached metadata matches the
/// API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetaken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_o: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_l: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PhotoRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: None,
            title: None,
            tags: None,
            datetaken: None,
            media: None,
            url_o: None,
            url_l: None,
            extra: Map::new(),
        }
    }

    pub fn asset_url(&self, asset: AssetSize) -> Option<&str> {
        match asset {
            AssetSize::Original => self.url_o.as_deref(),
            AssetSize::Large => self.url_l.as_deref(),
        }
    }

    pub fn file_name(&self, asset: AssetSize) -> Result<String, ScraperError> {
        let url = self
            .asset_url(asset)
            .ok_or_else(|| ScraperError::MissingAssetUrl(self.id.clone()))?;
        let ext =
            url_extension(url).ok_or_else(|| ScraperError::MissingAssetUrl(self.id.clone()))?;
        Ok(format!("{}.{}", self.id, ext))
    }
}

pub fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() { None } else { Some(ext) }
}
