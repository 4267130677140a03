//! Tests for archive testing: decoding and verification without output.

mod common;

use std::fs;

use common::{ZipBuilder, ZipEntry, payload, payload_offset};
use zunpack::{ExtractOptions, ExtractOutcome, ZipArchive};

fn sample(dir: &std::path::Path) -> std::path::PathBuf {
    ZipBuilder::new()
        .entry(ZipEntry::dir("d"))
        .file("d/a.txt", b"alpha".to_vec())
        .entry(ZipEntry::file("d/b.bin", payload(40_000, 31)).deflated())
        .entry(ZipEntry::file("c.txt", b"gamma".to_vec()).zipcrypto("pw"))
        .write(dir, "sample.zip")
}

#[test]
fn test_clean_archive_passes() {
    let dir = tempfile::tempdir().unwrap();
    let archive = sample(dir.path());

    let result = zunpack::test_archive(&archive, "*.*", ExtractOptions::new().password("pw"))
        .unwrap();

    assert!(result.all_files_ok(), "{:?}", result.failures);
    assert_eq!(result.entries_tested, 4);
    assert_eq!(result.entries_passed, 4);
}

#[test]
fn test_mode_writes_nothing_and_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let archive = sample(dir.path());
    let before: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();

    let mut zip = ZipArchive::open_path(&archive).unwrap();
    let first = zip.test("*.*", ExtractOptions::new().password("pw"));
    let second = zip.test("*.*", ExtractOptions::new().password("pw"));

    assert!(first.all_files_ok());
    assert_eq!(first.entries_passed, second.entries_passed);
    assert_eq!(first.failures, second.failures);
    let after: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_detects_single_flipped_byte() {
    let dir = tempfile::tempdir().unwrap();
    let data = payload(30_000, 32);
    let clean = ZipBuilder::new()
        .entry(ZipEntry::file("x.bin", data).deflated())
        .build();
    let start = payload_offset(&clean, 0);
    let end = start + 200;

    let mut detected = 0;
    for at in (start..end).step_by(20) {
        let mut bytes = clean.clone();
        bytes[at] ^= 0x10;
        let archive = dir.path().join(format!("flip{at}.zip"));
        fs::write(&archive, &bytes).unwrap();

        let result = zunpack::test_archive(&archive, "", ExtractOptions::new()).unwrap();
        assert!(matches!(result.outcome, ExtractOutcome::Success));
        if !result.all_files_ok() {
            detected += 1;
        }
    }
    assert_eq!(detected, 10);
}

#[test]
fn test_mask_limits_tested_entries() {
    let dir = tempfile::tempdir().unwrap();
    let archive = sample(dir.path());

    let result = zunpack::test_archive(&archive, "*.txt", ExtractOptions::new()).unwrap();

    // c.txt has no password available
    assert_eq!(result.entries_tested, 2);
    assert_eq!(result.entries_passed, 1);
    assert_eq!(result.entries_failed, 1);
    assert_eq!(result.failures[0].0, "c.txt");
}

#[test]
fn test_long_names_allowed_up_to_test_limit() {
    let dir = tempfile::tempdir().unwrap();
    let name = format!("{}.txt", "n".repeat(600));
    let archive = ZipBuilder::new()
        .file(&name, b"long".to_vec())
        .write(dir.path(), "long.zip");

    let result = zunpack::test_archive(&archive, "*.*", ExtractOptions::new()).unwrap();
    assert!(result.all_files_ok(), "{:?}", result.failures);

    let out = dir.path().join("out");
    let extracted = zunpack::extract(
        &archive,
        "",
        &out,
        &zunpack::Selection::All,
        ExtractOptions::new(),
    )
    .unwrap();
    assert_eq!(extracted.entries_failed, 1);
}
