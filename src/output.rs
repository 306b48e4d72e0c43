use std::cell::OnceCell;

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::{ItemOutcome, ProgressEvent, ProgressSink, RunReport};

#[derive(Default)]
pub struct ConsoleOutput {
    bar: OnceCell<ProgressBar>,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_summary(report: &RunReport) {
        let green = "\x1b[32m";
        let yellow = "\x1b[33m";
        let cyan = "\x1b[36m";
        let red = "\x1b[31m";
        let reset = "\x1b[0m";

        println!("{cyan}Folder: {}{reset}", report.folder);
        let cache = if report.cache_reused {
            "reused"
        } else {
            "fetched"
        };
        println!("{cyan}Metadata: {} ({cache}){reset}", report.cache_path);
        println!("{green}Downloaded: {}{reset}", report.downloaded());
        println!("{green}Already present: {}{reset}", report.already_present());
        println!("{yellow}Rejected (too small): {}{reset}", report.rejected());
        println!("{red}Failed: {}{reset}", report.failed());
    }

    fn bar(&self, total: usize) -> &ProgressBar {
        self.bar.get_or_init(|| {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        })
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::MetadataCacheHit { path, photos } => {
                println!("Using cached metadata {path} ({photos} photos)");
            }
            ProgressEvent::MetadataPage { page, total } => {
                println!("downloading metadata, page {page} of {total}");
            }
            ProgressEvent::MetadataSaved { path, photos } => {
                println!("Saved metadata for {photos} photos to {path}");
            }
            ProgressEvent::ImagesStarted { total } => {
                println!("Downloading images");
                self.bar(total);
            }
            ProgressEvent::ImageProcessed { photo_id, outcome } => {
                let bar = self.bar(0);
                if let ItemOutcome::Downloaded { .. } = outcome {
                    bar.set_message(photo_id);
                }
                bar.inc(1);
            }
            ProgressEvent::ImagesFinished => {
                if let Some(bar) = self.bar.get() {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

pub struct QuietOutput;

impl ProgressSink for QuietOutput {
    fn event(&self, _event: ProgressEvent) {}
}
