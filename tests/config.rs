use std::fs;

use assert_matches::assert_matches;

use flickr_scraper::config::{ConfigLoader, Credentials};
use flickr_scraper::error::ScraperError;

#[test]
fn explicit_path_wins_over_candidates() {
    let temp = tempfile::tempdir().unwrap();
    let explicit = temp.path().join("mine.json");
    let fallback = temp.path().join("credentials.json");
    fs::write(&explicit, r#"{"KEY": "explicit", "SECRET": "s1"}"#).unwrap();
    fs::write(&fallback, r#"{"KEY": "fallback", "SECRET": "s2"}"#).unwrap();

    let creds = ConfigLoader::resolve_with(Some(&explicit), &[fallback], None).unwrap();
    assert_eq!(
        creds,
        Credentials {
            api_key: "explicit".to_string(),
            api_secret: Some("s1".to_string()),
        }
    );
}

#[test]
fn first_existing_candidate_is_used() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("nope.json");
    let present = temp.path().join("credentials.json");
    fs::write(&present, r#"{"KEY": "k", "SECRET": "s"}"#).unwrap();

    let creds = ConfigLoader::resolve_with(None, &[missing, present], None).unwrap();
    assert_eq!(creds.api_key, "k");
}

#[test]
fn env_key_overrides_file_key() {
    let temp = tempfile::tempdir().unwrap();
    let present = temp.path().join("credentials.json");
    fs::write(&present, r#"{"KEY": "file", "SECRET": "s"}"#).unwrap();

    let creds =
        ConfigLoader::resolve_with(None, &[present], Some("from-env".to_string())).unwrap();
    assert_eq!(creds.api_key, "from-env");
    assert_eq!(creds.api_secret.as_deref(), Some("s"));
}

#[test]
fn env_key_alone_is_enough() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("credentials.json");

    let creds = ConfigLoader::resolve_with(None, &[missing], Some("k".to_string())).unwrap();
    assert_eq!(creds.api_key, "k");
    assert!(creds.api_secret.is_none());
}

#[test]
fn nothing_found_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("credentials.json");

    let err = ConfigLoader::resolve_with(None, &[missing], None).unwrap_err();
    assert_matches!(err, ScraperError::MissingCredentials(_));
}

#[test]
fn unreadable_explicit_path_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("missing.json");

    let err = ConfigLoader::resolve_with(Some(&missing), &[], None).unwrap_err();
    assert_matches!(err, ScraperError::CredentialsRead(_));
}
