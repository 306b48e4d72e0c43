use std::cell::RefCell;
use std::time::Duration;

use camino::Utf8PathBuf;

use flickr_scraper::app::{ProgressEvent, ProgressSink};
use flickr_scraper::domain::{BoundingBox, GroupId, PhotoRecord, Query};
use flickr_scraper::error::ScraperError;
use flickr_scraper::flickr::{PhotoApi, PhotoPage};
use flickr_scraper::store::{RESULTS_FILE, Store, fetch_all_pages};

#[derive(Default)]
struct RecordingSink {
    pages: RefCell<Vec<(u32, u32)>>,
    saved: RefCell<usize>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::MetadataPage { page, total } => self.pages.borrow_mut().push((page, total)),
            ProgressEvent::MetadataSaved { .. } => *self.saved.borrow_mut() += 1,
            _ => {}
        }
    }
}

struct FixedPages {
    reported: u32,
    calls: RefCell<u32>,
}

impl PhotoApi for FixedPages {
    fn resolve_group(&self, url: &str) -> Result<GroupId, ScraperError> {
        Err(ScraperError::GroupNotFound(url.to_string()))
    }

    fn fetch_page(&self, _query: &Query, page: u32) -> Result<PhotoPage, ScraperError> {
        *self.calls.borrow_mut() += 1;
        Ok(PhotoPage {
            pages: self.reported,
            photo: vec![PhotoRecord::new(page.to_string())],
        })
    }
}

struct BrokenSecondPage;

impl PhotoApi for BrokenSecondPage {
    fn resolve_group(&self, url: &str) -> Result<GroupId, ScraperError> {
        Err(ScraperError::GroupNotFound(url.to_string()))
    }

    fn fetch_page(&self, _query: &Query, page: u32) -> Result<PhotoPage, ScraperError> {
        if page > 1 {
            return Err(ScraperError::ApiDecode("missing photos".to_string()));
        }
        Ok(PhotoPage {
            pages: 3,
            photo: vec![PhotoRecord::new("1")],
        })
    }
}

#[test]
fn zero_reported_pages_fetches_first_page_only() {
    let api = FixedPages {
        reported: 0,
        calls: RefCell::new(0),
    };
    let sink = RecordingSink::default();

    let photos = fetch_all_pages(&api, &Query::search("x"), Duration::ZERO, &sink).unwrap();

    assert_eq!(*api.calls.borrow(), 1);
    assert_eq!(photos.len(), 1);
    assert_eq!(*sink.pages.borrow(), vec![(1, 1)]);
}

#[test]
fn page_events_report_clamped_total() {
    let api = FixedPages {
        reported: 8,
        calls: RefCell::new(0),
    };
    let sink = RecordingSink::default();
    let query = Query::search("x").with_max_pages(Some(3));

    let photos = fetch_all_pages(&api, &query, Duration::ZERO, &sink).unwrap();

    let ids: Vec<_> = photos.iter().map(|photo| photo.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(*sink.pages.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[test]
fn failed_pagination_leaves_no_cache_file() {
    let temp = tempfile::tempdir().unwrap();
    let store = Store::new(Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap());
    let query = Query::search("broken");
    store.ensure_folder(&query).unwrap();
    let sink = RecordingSink::default();

    let err = store
        .load_or_fetch_all(&BrokenSecondPage, &query, Duration::ZERO, &sink)
        .unwrap_err();

    assert!(matches!(err, ScraperError::ApiDecode(_)));
    assert!(!store.results_path(&query).as_std_path().exists());
    assert_eq!(*sink.saved.borrow(), 0);
}

#[test]
fn cache_file_lives_in_query_folder() {
    let temp = tempfile::tempdir().unwrap();
    let store = Store::new(Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap());
    let query = Query::search("golden gate").with_bbox(BoundingBox::parse_lenient(
        "-122.6,37.7,-122.3,37.9",
    ));
    let api = FixedPages {
        reported: 1,
        calls: RefCell::new(0),
    };
    let sink = RecordingSink::default();

    let cached = store
        .load_or_fetch_all(&api, &query, Duration::ZERO, &sink)
        .unwrap();

    assert!(!cached.reused);
    assert!(
        cached
            .path
            .ends_with(format!("golden_gate-122.6_37.7_-122.3_37.9/{RESULTS_FILE}"))
    );
    assert_eq!(*sink.saved.borrow(), 1);

    let again = store
        .load_or_fetch_all(&api, &query, Duration::ZERO, &sink)
        .unwrap();
    assert!(again.reused);
    assert_eq!(again.photos, cached.photos);
    assert_eq!(*api.calls.borrow(), 1);
}
