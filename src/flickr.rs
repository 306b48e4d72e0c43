use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Credentials;
use crate::domain::{GroupId, PhotoRecord, Query, QueryMode};
use crate::error::ScraperError;

pub const DEFAULT_BASE_URL: &str = "https://api.flickr.com/services/rest";
pub const PER_PAGE: u32 = 500;

const EXTRAS_BEFORE_URL: &str = "media,realname";
const EXTRAS_AFTER_URL: &str = "o_dims,geo,tags,machine_tags,date_taken";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhotoPage {
    #[serde(deserialize_with = "lenient_u32")]
    pub pages: u32,
    #[serde(default)]
    pub photo: Vec<PhotoRecord>,
}

pub trait PhotoApi {
    fn resolve_group(&self, url: &str) -> Result<GroupId, ScraperError>;
    fn fetch_page(&self, query: &Query, page: u32) -> Result<PhotoPage, ScraperError>;
}

pub trait ImageSource {
    fn download(&self, url: &str) -> Result<Vec<u8>, ScraperError>;
}

#[derive(Clone)]
pub struct FlickrHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FlickrHttpClient {
    pub fn new(credentials: &Credentials) -> Result<Self, ScraperError> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL, Duration::from_secs(60))
    }

    pub fn with_base_url(
        credentials: &Credentials,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("flickr-scraper/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ScraperError::ApiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| ScraperError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
        })
    }

    fn call<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<T, ScraperError> {
        let method = params
            .iter()
            .find(|(name, _)| *name == "method")
            .map(|(_, value)| value.as_str())
            .unwrap_or("unknown");
        tracing::debug!(method, "flickr.request");
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .map_err(|err| ScraperError::ApiHttp(err.to_string()))?;
        let response = handle_status(response, |status, message| ScraperError::ApiStatus {
            status,
            message,
        })?;
        let body: Value = response
            .json()
            .map_err(|err| ScraperError::ApiDecode(err.to_string()))?;
        tracing::debug!(
            method,
            latency_ms = start.elapsed().as_millis() as u64,
            "flickr.response"
        );
        decode_envelope(body)
    }
}

impl PhotoApi for FlickrHttpClient {
    fn resolve_group(&self, url: &str) -> Result<GroupId, ScraperError> {
        let params = lookup_group_params(&self.api_key, url);
        let response: LookupGroupResponse = self.call(&params)?;
        response
            .group
            .map(|group| group.id)
            .ok_or_else(|| ScraperError::GroupNotFound(url.to_string()))
    }

    fn fetch_page(&self, query: &Query, page: u32) -> Result<PhotoPage, ScraperError> {
        let params = page_params(&self.api_key, query, page);
        let response: PhotosResponse = self.call(&params)?;
        Ok(response.photos)
    }
}

impl ImageSource for FlickrHttpClient {
    fn download(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ScraperError::ImageHttp(err.to_string()))?;
        let response = handle_status(response, |status, message| ScraperError::ImageStatus {
            status,
            message,
        })?;
        let bytes = response
            .bytes()
            .map_err(|err| ScraperError::ImageHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

pub fn lookup_group_params(api_key: &str, url: &str) -> Vec<(&'static str, String)> {
    vec![
        ("method", "flickr.urls.lookupGroup".to_string()),
        ("url", url.to_string()),
        ("api_key", api_key.to_string()),
        ("format", "json".to_string()),
        ("nojsoncallback", "1".to_string()),
    ]
}

pub fn page_params(api_key: &str, query: &Query, page: u32) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("content_type", "7".to_string()),
        ("per_page", PER_PAGE.to_string()),
        ("media", "photos".to_string()),
        ("format", "json".to_string()),
        ("advanced", "1".to_string()),
        ("nojsoncallback", "1".to_string()),
        ("extras", extras(query)),
        ("page", page.to_string()),
        ("api_key", api_key.to_string()),
    ];

    match &query.mode {
        QueryMode::Search(text) => {
            params.push(("method", "flickr.photos.search".to_string()));
            params.push(("text", text.clone()));
        }
        QueryMode::Group(id) => {
            params.push(("method", "flickr.groups.pools.getPhotos".to_string()));
            params.push(("group_id", id.as_str().to_string()));
        }
    }

    if let Some(bbox) = &query.bbox {
        params.push(("bbox", bbox.to_param()));
    }
    params
}

fn extras(query: &Query) -> String {
    format!(
        "{EXTRAS_BEFORE_URL},{},{EXTRAS_AFTER_URL}",
        query.asset.url_field()
    )
}

#[derive(Debug, Deserialize)]
struct LookupGroupResponse {
    group: Option<GroupRef>,
}

#[derive(Debug, Deserialize)]
struct GroupRef {
    id: GroupId,
}

#[derive(Debug, Deserialize)]
struct PhotosResponse {
    photos: PhotoPage,
}

pub fn decode_envelope<T: DeserializeOwned>(body: Value) -> Result<T, ScraperError> {
    if body.get("stat").and_then(Value::as_str) == Some("fail") {
        let code = body.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(ScraperError::ApiFailure { code, message });
    }
    serde_json::from_value(body).map_err(|err| ScraperError::ApiDecode(err.to_string()))
}

fn handle_status<F>(response: Response, to_error: F) -> Result<Response, ScraperError>
where
    F: FnOnce(u16, String) -> ScraperError,
{
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "request failed".to_string());
    Err(to_error(status, message))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
