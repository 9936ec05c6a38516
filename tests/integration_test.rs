//! Integration tests for the review-qa CLI

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const REVIEWS: &str = "\
Review,Anime Title,Overall Rating
\"This is a beautiful, positive experience. The music is great.\",Mushishi,9
\"The pacing is slow. I did not enjoy this one.\",Monster,5
\"Fights are fun. This show is positive and loud.\",Naruto,7
";

/// Run the binary inside `dir` with an isolated config directory
fn run_in(dir: &Path, args: &[&str]) -> Output {
    run_with_log(dir, args, None)
}

fn run_with_log(dir: &Path, args: &[&str], rust_log: Option<&str>) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_review-qa"));
    command
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("HOME", dir)
        .env_remove("RUST_LOG");
    if let Some(filter) = rust_log {
        command.env("RUST_LOG", filter);
    }
    command.args(args).output().expect("Failed to run command")
}

fn offline(args: &[&str]) -> Vec<String> {
    let mut all: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    all.extend(
        ["--embedding-mode", "simulated", "--reader", "lexical", "--no-gpu"]
            .iter()
            .map(|s| s.to_string()),
    );
    all
}

fn workspace() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("reviews.csv");
    std::fs::write(&csv, REVIEWS).unwrap();
    (dir, csv)
}

fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_cli_help() {
    let (dir, _) = workspace();
    let output = run_in(dir.path(), &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--zip-path"));
    assert!(stdout.contains("--metadata-column"));
    assert!(stdout.contains("--query"));
    assert!(stdout.contains("--no-gpu"));
    assert!(stdout.contains("--output"));
    assert!(stdout.contains("--debug"));
}

#[test]
fn test_cli_version() {
    let (dir, _) = workspace();
    let output = run_in(dir.path(), &["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("review-qa"));
}

#[test]
fn test_rejects_without_metadata_or_queries() {
    let (dir, csv) = workspace();
    let args = offline(&["Review", csv.to_str().unwrap()]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = run_in(dir.path(), &args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No metadata columns or queries"));
    assert!(!dir.path().join("output.csv").exists());
}

#[test]
fn test_rejects_zero_top_k() {
    let (dir, csv) = workspace();
    let args = offline(&["Review", csv.to_str().unwrap(), "-q", "How is the music?", "--top-k", "0"]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = run_in(dir.path(), &args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("top_k must be at least 1"));
    assert!(!dir.path().join("output.csv").exists());
}

#[test]
fn test_debug_flag_overrides_rust_log() {
    let (dir, csv) = workspace();
    let args = offline(&["Review", csv.to_str().unwrap(), "-m", "Anime Title", "--debug"]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = run_with_log(dir.path(), &args, Some("warn"));
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DataFrameConverter produced"), "stdout: {}", stdout);

    let args = offline(&["Review", csv.to_str().unwrap(), "-m", "Anime Title"]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_with_log(dir.path(), &args, Some("warn"));
    assert_success(&output);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("produced"));
}

#[test]
fn test_metadata_only() {
    let (dir, csv) = workspace();
    let args = offline(&[
        "Review",
        csv.to_str().unwrap(),
        "-m",
        "Anime Title",
        "-m",
        "Overall Rating",
    ]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = run_in(dir.path(), &args);
    assert_success(&output);

    let (header, rows) = read_output(&dir.path().join("output.csv"));
    assert_eq!(header, vec!["Anime Title", "Overall Rating", "index"]);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["Mushishi", "9", "0"]);
    let indexes: Vec<&str> = rows.iter().map(|r| r[2].as_str()).collect();
    assert_eq!(indexes, vec!["0", "1", "2"]);
}

#[test]
fn test_metadata_and_query() {
    let (dir, csv) = workspace();
    let args = offline(&[
        "Review",
        csv.to_str().unwrap(),
        "-m",
        "Anime Title",
        "-m",
        "Overall Rating",
        "-q",
        "Is this positive?",
        "--output",
        "answers.csv",
    ]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = run_in(dir.path(), &args);
    assert_success(&output);

    let (header, rows) = read_output(&dir.path().join("answers.csv"));
    assert_eq!(
        header,
        vec![
            "Anime Title",
            "Overall Rating",
            "index",
            "Q1",
            "Q1 answer",
            "Q1 score",
            "Q1 context",
        ]
    );
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row[3], "Is this positive?");
        assert!(!row[4].is_empty(), "answer missing in {:?}", row);
        let score: f64 = row[5].parse().unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!(row[6].contains(&row[4]));
    }
    // Each answer comes from its own review
    assert!(REVIEWS.lines().nth(1).unwrap().contains(&rows[0][4]));
    assert!(REVIEWS.lines().nth(2).unwrap().contains(&rows[1][4]));
}

#[test]
fn test_query_only_uses_index_metadata() {
    let (dir, csv) = workspace();
    let args = offline(&["Review", csv.to_str().unwrap(), "-q", "How is the music?"]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = run_in(dir.path(), &args);
    assert_success(&output);

    let (header, rows) = read_output(&dir.path().join("output.csv"));
    assert_eq!(header[0], "index");
    assert_eq!(rows[0][2], "The music is great.");
}

#[test]
fn test_zip_input() {
    let (dir, _) = workspace();
    let archive = dir.path().join("reviews.zip");
    {
        let mut writer = zip::ZipWriter::new(std::fs::File::create(&archive).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("skip.csv", options).unwrap();
        writer.write_all(b"Review,Anime Title\nIgnored,Nope\n").unwrap();
        writer.start_file("reviews.csv", options).unwrap();
        writer.write_all(REVIEWS.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    let args = offline(&[
        "Review",
        "reviews.csv",
        "-z",
        archive.to_str().unwrap(),
        "-m",
        "Anime Title",
    ]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = run_in(dir.path(), &args);
    assert_success(&output);

    let (header, rows) = read_output(&dir.path().join("output.csv"));
    assert_eq!(header, vec!["Anime Title", "index"]);
    let titles: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(titles, vec!["Mushishi", "Monster", "Naruto"]);
}

#[test]
fn test_missing_column_fails() {
    let (dir, csv) = workspace();
    let args = offline(&["Review", csv.to_str().unwrap(), "-m", "Studio"]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = run_in(dir.path(), &args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Studio"));
    assert!(!dir.path().join("output.csv").exists());
}
