use std::process::Command;

fn scraper() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_flickr-scraper"));
    cmd.env_remove("FLICKR_API_KEY");
    cmd
}

#[test]
fn missing_query_exits_with_usage_error() {
    let temp = tempfile::tempdir().unwrap();
    let output = scraper()
        .current_dir(temp.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("search term"));
    assert!(!temp.path().join("images").exists());
}

#[test]
fn search_and_group_are_mutually_exclusive() {
    let temp = tempfile::tempdir().unwrap();
    let output = scraper()
        .current_dir(temp.path())
        .args(["--search", "cats", "--group", "https://www.flickr.com/groups/cats/"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(!temp.path().join("images").exists());
}
