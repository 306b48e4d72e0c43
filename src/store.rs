use std::fs;
use std::io::Write;
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{PhotoRecord, Query};
use crate::error::ScraperError;
use crate::flickr::PhotoApi;

pub const DEFAULT_ROOT: &str = "images";
pub const RESULTS_FILE: &str = "results.json";
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);
pub const RESULTS_TEMP_PREFIX: &str = ".results";
pub const IMAGE_TEMP_PREFIX: &str = ".partial";

#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct CachedResults {
    pub path: Utf8PathBuf,
    pub photos: Vec<PhotoRecord>,
    pub reused: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl Store {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn folder_for(&self, query: &Query) -> Utf8PathBuf {
        self.root.join(query.folder_name())
    }

    pub fn results_path(&self, query: &Query) -> Utf8PathBuf {
        self.folder_for(query).join(RESULTS_FILE)
    }

    pub fn image_path(&self, query: &Query, file_name: &str) -> Utf8PathBuf {
        self.folder_for(query).join(file_name)
    }

    pub fn ensure_folder(&self, query: &Query) -> Result<Utf8PathBuf, ScraperError> {
        let folder = self.folder_for(query);
        fs::create_dir_all(folder.as_std_path())
            .map_err(|err| ScraperError::Filesystem(format!("create {folder}: {err}")))?;
        sweep_partial_writes(&folder)?;
        Ok(folder)
    }

    pub fn load_or_fetch_all<A>(
        &self,
        api: &A,
        query: &Query,
        page_delay: Duration,
        sink: &dyn ProgressSink,
    ) -> Result<CachedResults, ScraperError>
    where
        A: PhotoApi + ?Sized,
    {
        let path = self.results_path(query);
        if path.as_std_path().exists() {
            let photos = Self::read_results(&path)?;
            tracing::debug!(%path, photos = photos.len(), "metadata cache hit");
            sink.event(ProgressEvent::MetadataCacheHit {
                path: path.to_string(),
                photos: photos.len(),
            });
            return Ok(CachedResults {
                path,
                photos,
                reused: true,
            });
        }

        let photos = fetch_all_pages(api, query, page_delay, sink)?;
        Self::write_results(&path, &photos)?;
        sink.event(ProgressEvent::MetadataSaved {
            path: path.to_string(),
            photos: photos.len(),
        });
        Ok(CachedResults {
            path,
            photos,
            reused: false,
        })
    }

    pub fn read_results(path: &Utf8Path) -> Result<Vec<PhotoRecord>, ScraperError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ScraperError::Filesystem(format!("read {path}: {err}")))?;
        serde_json::from_str(&content)
            .map_err(|err| ScraperError::Filesystem(format!("parse {path}: {err}")))
    }

    /// Writes through a temp file in the same directory so the cache file is
    /// either absent or complete.
    pub fn write_results(path: &Utf8Path, photos: &[PhotoRecord]) -> Result<(), ScraperError> {
        let parent = path
            .parent()
            .ok_or_else(|| ScraperError::Filesystem(format!("invalid cache path {path}")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        let content =
            serde_json::to_vec(photos).map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(RESULTS_TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

pub fn fetch_all_pages<A>(
    api: &A,
    query: &Query,
    page_delay: Duration,
    sink: &dyn ProgressSink,
) -> Result<Vec<PhotoRecord>, ScraperError>
where
    A: PhotoApi + ?Sized,
{
    let first = api.fetch_page(query, 1)?;
    let total_pages = match query.max_pages {
        Some(max) => first.pages.min(max),
        None => first.pages,
    }
    .max(1);
    tracing::info!(
        reported = first.pages,
        fetching = total_pages,
        "paginating metadata"
    );

    let mut photos = first.photo;
    sink.event(ProgressEvent::MetadataPage {
        page: 1,
        total: total_pages,
    });

    for page in 2..=total_pages {
        if !page_delay.is_zero() {
            thread::sleep(page_delay);
        }
        let next = api.fetch_page(query, page)?;
        photos.extend(next.photo);
        sink.event(ProgressEvent::MetadataPage {
            page,
            total: total_pages,
        });
    }
    Ok(photos)
}

// Temp files left behind by a run that was killed before persisting them.
fn sweep_partial_writes(folder: &Utf8Path) -> Result<(), ScraperError> {
    let entries = fs::read_dir(folder.as_std_path())
        .map_err(|err| ScraperError::Filesystem(format!("read {folder}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let stale = name.starts_with(IMAGE_TEMP_PREFIX)
            || (name.starts_with(RESULTS_TEMP_PREFIX) && name.ends_with(".tmp"));
        if stale && entry.path().is_file() {
            tracing::debug!(file = name, "removing partial write");
            fs::remove_file(entry.path())
                .map_err(|err| ScraperError::Filesystem(err.to_string()))?;
        }
    }
    Ok(())
}
