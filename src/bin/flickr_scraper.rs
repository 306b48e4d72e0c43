use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flickr_scraper::app::{App, FetchOptions};
use flickr_scraper::config::ConfigLoader;
use flickr_scraper::domain::{AssetSize, BoundingBox, Query, QueryTarget};
use flickr_scraper::error::ScraperError;
use flickr_scraper::flickr::FlickrHttpClient;
use flickr_scraper::image_fetch::SizePolicy;
use flickr_scraper::output::{ConsoleOutput, QuietOutput};
use flickr_scraper::store::{DEFAULT_ROOT, Store};

#[derive(Parser)]
#[command(name = "flickr-scraper")]
#[command(about = "Download images from Flickr")]
#[command(version)]
struct Cli {
    #[arg(short, long, conflicts_with = "group", help = "Search term")]
    search: Option<String>,

    #[arg(
        short,
        long,
        help = "Group url, e.g. https://www.flickr.com/groups/scenery/"
    )]
    group: Option<String>,

    #[arg(
        short,
        long,
        help = "Download original sized photos instead of large (1024px) ones"
    )]
    original: bool,

    #[arg(short, long, help = "Max pages of metadata to fetch (0 for no cap)")]
    max_pages: Option<u32>,

    #[arg(
        short,
        long,
        help = "Bounding box to search in: min_longitude,min_latitude,max_longitude,max_latitude"
    )]
    bbox: Option<String>,

    #[arg(short = 'd', long, help = "Reject images whose width or height is below this")]
    min_dim: Option<u32>,

    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..), help = "Resize images so their smallest dimension is this")]
    resize_to: Option<u32>,

    #[arg(short, long, help = "Credentials file (default: ./credentials.json)")]
    credentials: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_ROOT, help = "Directory holding one folder per query")]
    output_dir: String,

    #[arg(long, default_value_t = 500, help = "Delay between metadata page requests")]
    page_delay_ms: u64,

    #[arg(short, long, help = "Suppress progress output and the summary")]
    quiet: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ScraperError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ScraperError) -> u8 {
    match error {
        ScraperError::MissingQuery
        | ScraperError::MissingCredentials(_)
        | ScraperError::CredentialsRead(_)
        | ScraperError::CredentialsParse(_) => 2,
        ScraperError::ApiHttp(_)
        | ScraperError::ApiStatus { .. }
        | ScraperError::ApiFailure { .. }
        | ScraperError::ApiDecode(_)
        | ScraperError::GroupNotFound(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let target = QueryTarget::from_args(cli.search.as_deref(), cli.group.as_deref())?;
    let bbox = cli.bbox.as_deref().and_then(BoundingBox::parse_lenient);
    if cli.bbox.is_some() && bbox.is_none() {
        tracing::debug!("ignoring malformed bounding box");
    }

    let credentials = ConfigLoader::resolve(cli.credentials.as_deref())?;
    let client = FlickrHttpClient::new(&credentials)?;
    let app = App::new(Store::new(cli.output_dir), client.clone(), client);

    let mode = app.resolve_mode(&target)?;
    let query = Query::new(mode)
        .with_bbox(bbox)
        .with_asset(AssetSize::from_original_flag(cli.original))
        .with_max_pages(cli.max_pages);

    let options = FetchOptions {
        size_policy: SizePolicy {
            min_dim: cli.min_dim,
            resize_to: cli.resize_to,
        },
        page_delay: Duration::from_millis(cli.page_delay_ms),
    };

    if cli.quiet {
        app.run(&query, &options, &QuietOutput)?;
        return Ok(());
    }

    println!("Searching for {}", query.mode);
    if let Some(bbox) = &query.bbox {
        println!("Within {bbox}");
    }
    let report = app.run(&query, &options, &ConsoleOutput::new())?;
    ConsoleOutput::print_summary(&report);
    Ok(())
}
