use std::time::Duration;

use crate::domain::{PhotoRecord, Query, QueryMode, QueryTarget};
use crate::error::ScraperError;
use crate::flickr::{ImageSource, PhotoApi};
use crate::image_fetch::{ImageOutcome, SizePolicy, fetch_and_maybe_resize};
use crate::store::{DEFAULT_PAGE_DELAY, Store};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub size_policy: SizePolicy,
    pub page_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            size_policy: SizePolicy::default(),
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Downloaded { path: String },
    AlreadyPresent { path: String },
    Rejected { width: u32, height: u32 },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct ItemResult {
    pub photo_id: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub folder: String,
    pub cache_path: String,
    pub cache_reused: bool,
    pub items: Vec<ItemResult>,
}

impl RunReport {
    pub fn downloaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Downloaded { .. }))
    }

    pub fn already_present(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::AlreadyPresent { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Rejected { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items
            .iter()
            .filter(|item| predicate(&item.outcome))
            .count()
    }
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    MetadataCacheHit { path: String, photos: usize },
    MetadataPage { page: u32, total: u32 },
    MetadataSaved { path: String, photos: usize },
    ImagesStarted { total: usize },
    ImageProcessed { photo_id: String, outcome: ItemOutcome },
    ImagesFinished,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<A: PhotoApi, S: ImageSource> {
    store: Store,
    api: A,
    images: S,
}

impl<A: PhotoApi, S: ImageSource> App<A, S> {
    pub fn new(store: Store, api: A, images: S) -> Self {
        Self { store, api, images }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn images(&self) -> &S {
        &self.images
    }

    pub fn resolve_mode(&self, target: &QueryTarget) -> Result<QueryMode, ScraperError> {
        match target {
            QueryTarget::Search(text) => Ok(QueryMode::Search(text.clone())),
            QueryTarget::GroupUrl(url) => {
                let id = self.api.resolve_group(url)?;
                tracing::info!(%url, group_id = %id, "resolved group");
                Ok(QueryMode::Group(id))
            }
        }
    }

    pub fn run(
        &self,
        query: &Query,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, ScraperError> {
        let folder = self.store.ensure_folder(query)?;
        let cached = self
            .store
            .load_or_fetch_all(&self.api, query, options.page_delay, sink)?;

        sink.event(ProgressEvent::ImagesStarted {
            total: cached.photos.len(),
        });
        let mut items = Vec::with_capacity(cached.photos.len());
        for photo in &cached.photos {
            let outcome = match self.fetch_photo(query, photo, &options.size_policy) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(photo_id = %photo.id, error = %err, "skipping photo");
                    ItemOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            sink.event(ProgressEvent::ImageProcessed {
                photo_id: photo.id.clone(),
                outcome: outcome.clone(),
            });
            items.push(ItemResult {
                photo_id: photo.id.clone(),
                outcome,
            });
        }
        sink.event(ProgressEvent::ImagesFinished);

        Ok(RunReport {
            folder: folder.to_string(),
            cache_path: cached.path.to_string(),
            cache_reused: cached.reused,
            items,
        })
    }

    fn fetch_photo(
        &self,
        query: &Query,
        photo: &PhotoRecord,
        policy: &SizePolicy,
    ) -> Result<ItemOutcome, ScraperError> {
        let file_name = photo.file_name(query.asset)?;
        let path = self.store.image_path(query, &file_name);
        if path.as_std_path().exists() {
            return Ok(ItemOutcome::AlreadyPresent {
                path: path.to_string(),
            });
        }

        let url = photo
            .asset_url(query.asset)
            .ok_or_else(|| ScraperError::MissingAssetUrl(photo.id.clone()))?;
        let outcome = match fetch_and_maybe_resize(&self.images, url, &path, policy)? {
            ImageOutcome::Saved { path, .. } => ItemOutcome::Downloaded {
                path: path.to_string(),
            },
            ImageOutcome::Rejected { width, height } => {
                tracing::debug!(photo_id = %photo.id, width, height, "below minimum dimension");
                ItemOutcome::Rejected { width, height }
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use camino::Utf8PathBuf;

    use super::*;
    use crate::domain::GroupId;
    use crate::flickr::PhotoPage;

    struct NoopSink;

    impl ProgressSink for NoopSink {
        fn event(&self, _event: ProgressEvent) {}
    }

    #[derive(Default)]
    struct MockApi {
        lookups: Cell<usize>,
    }

    impl PhotoApi for MockApi {
        fn resolve_group(&self, _url: &str) -> Result<GroupId, ScraperError> {
            self.lookups.set(self.lookups.get() + 1);
            "99@N01".parse()
        }

        fn fetch_page(&self, _query: &Query, _page: u32) -> Result<PhotoPage, ScraperError> {
            Ok(PhotoPage {
                pages: 1,
                photo: vec![PhotoRecord::new("1")],
            })
        }
    }

    struct FailingImages;

    impl ImageSource for FailingImages {
        fn download(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
            Err(ScraperError::ImageHttp(format!("unreachable {url}")))
        }
    }

    #[test]
    fn resolve_mode_only_looks_up_groups() {
        let app = App::new(Store::default(), MockApi::default(), FailingImages);

        let mode = app
            .resolve_mode(&QueryTarget::Search("cats".to_string()))
            .unwrap();
        assert_eq!(mode, QueryMode::Search("cats".to_string()));
        assert_eq!(app.api.lookups.get(), 0);

        let mode = app
            .resolve_mode(&QueryTarget::GroupUrl("https://flickr.com/groups/x".to_string()))
            .unwrap();
        assert_eq!(mode, QueryMode::Group("99@N01".parse().unwrap()));
        assert_eq!(app.api.lookups.get(), 1);
    }

    #[test]
    fn photo_without_url_is_recorded_as_failed() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let app = App::new(Store::new(root), MockApi::default(), FailingImages);

        let report = app
            .run(&Query::search("cats"), &FetchOptions::default(), &NoopSink)
            .unwrap();
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.cache_reused);
    }
}
