use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ScraperError {
    #[error("must specify a search term or a group url")]
    #[diagnostic(help("pass --search <TEXT> or --group <URL>"))]
    MissingQuery,

    #[error("no credentials file found (looked in {0})")]
    #[diagnostic(help("create credentials.json with KEY and SECRET fields, or set FLICKR_API_KEY"))]
    MissingCredentials(String),

    #[error("failed to read credentials file at {0}")]
    CredentialsRead(PathBuf),

    #[error("failed to parse credentials file: {0}")]
    CredentialsParse(String),

    #[error("Flickr request failed: {0}")]
    ApiHttp(String),

    #[error("Flickr returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("Flickr API error {code}: {message}")]
    ApiFailure { code: i64, message: String },

    #[error("unexpected Flickr response: {0}")]
    ApiDecode(String),

    #[error("no group found for url: {0}")]
    GroupNotFound(String),

    #[error("image request failed: {0}")]
    ImageHttp(String),

    #[error("image server returned status {status}: {message}")]
    ImageStatus { status: u16, message: String },

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("failed to encode image: {0}")]
    ImageEncode(String),

    #[error("photo {0} has no url for the requested size")]
    MissingAssetUrl(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
