//! Extraction of archives using the pre-deflate PKZIP methods.
//!
//! The shrink and implode archives in `tests/data/legacy` were checked
//! against Info-ZIP unzip 6.0. Info-ZIP cannot unreduce, so the reduce
//! archives were only checked with a separate decoder written from the
//! format description.

use std::fs;
use std::path::{Path, PathBuf};

use zunpack::{ExtractOptions, Selection, ZipArchive};

const WORDS_CRC: u32 = 0x00f4_68a2;
const LETTERS_CRC: u32 = 0xe674_1675;
const REDUCE_CRC: u32 = 0x3d50_7a0d;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/legacy")
}

/// Extracts the single entry of `archive` and checks it byte for byte
/// against `expected`.
fn check_fixture(archive: &str, expected: &str, method: u16, general_flags: u16, crc: u32) {
    let path = data_dir().join(archive);
    let want = fs::read(data_dir().join(expected)).unwrap();
    assert_eq!(crc32fast::hash(&want), crc);

    let zip = ZipArchive::open_path(&path).unwrap();
    assert_eq!(zip.len(), 1);
    let entry = &zip.entries()[0];
    assert_eq!(entry.name, expected);
    assert_eq!(entry.method, method);
    assert_eq!(entry.flags & 0x06, general_flags);
    assert_eq!(entry.crc32, crc);
    assert_eq!(entry.size, want.len() as u64);

    let dir = tempfile::tempdir().unwrap();
    let result = zunpack::extract(&path, "", dir.path(), &Selection::All, ExtractOptions::new())
        .unwrap();
    assert!(result.is_ok(), "{}: {:?}", archive, result.failures);
    assert_eq!(result.entries_extracted, 1);
    let got = fs::read(dir.path().join(expected)).unwrap();
    assert!(got == want, "{}: output differs", archive);
    assert_eq!(crc32fast::hash(&got), crc);

    let tested = zunpack::test_archive(&path, "*", ExtractOptions::new()).unwrap();
    assert!(tested.all_files_ok(), "{}: {:?}", archive, tested.failures);
}

// =============================================================================
// Shrink
// =============================================================================

#[test]
fn test_shrink_with_code_growth() {
    // codes widen from 9 to 13 bits, the table never fills
    check_fixture("shrink_words.zip", "words.txt", 1, 0, WORDS_CRC);
}

#[test]
fn test_shrink_with_partial_clears() {
    // the table fills twice; both times the last code read is itself freed
    check_fixture("shrink_letters.zip", "letters.txt", 1, 0, LETTERS_CRC);
}

// =============================================================================
// Reduce
// =============================================================================

#[test]
fn test_reduce_factor_one() {
    check_fixture("reduce1.zip", "reduce.txt", 2, 0, REDUCE_CRC);
}

#[test]
fn test_reduce_factor_two() {
    check_fixture("reduce2.zip", "reduce.txt", 3, 0, REDUCE_CRC);
}

#[test]
fn test_reduce_factor_three() {
    check_fixture("reduce3.zip", "reduce.txt", 4, 0, REDUCE_CRC);
}

#[test]
fn test_reduce_factor_four() {
    check_fixture("reduce4.zip", "reduce.txt", 5, 0, REDUCE_CRC);
}

// =============================================================================
// Implode
// =============================================================================

#[test]
fn test_implode_4k_without_literal_tree() {
    check_fixture("implode_4k_raw.zip", "words.txt", 6, 0, WORDS_CRC);
}

#[test]
fn test_implode_4k_with_literal_tree() {
    check_fixture("implode_4k_lit.zip", "words.txt", 6, 0x04, WORDS_CRC);
}

#[test]
fn test_implode_8k_without_literal_tree() {
    check_fixture("implode_8k_raw.zip", "words.txt", 6, 0x02, WORDS_CRC);
}

#[test]
fn test_implode_8k_with_literal_tree() {
    check_fixture("implode_8k_lit.zip", "words.txt", 6, 0x06, WORDS_CRC);
}
