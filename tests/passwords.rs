//! Tests for encrypted entries: the traditional cipher, WinZip AES and the
//! password prompt protocol.

mod common;

use std::fs;
use std::sync::{Arc, Mutex};

use common::{ZipBuilder, ZipEntry, payload, payload_offset, rejected_password};
use zunpack::{ErrorCategory, ExtractOptions, PasswordReply, Resolution, Selection};

/// Password prompt answering from a script and logging the entry names.
fn scripted_prompt(
    replies: Vec<PasswordReply>,
    asked: Arc<Mutex<Vec<String>>>,
) -> impl FnMut(&str) -> PasswordReply {
    let mut replies = replies.into_iter();
    move |entry| {
        asked.lock().unwrap().push(entry.to_string());
        replies.next().unwrap_or(PasswordReply::Cancel)
    }
}

// =============================================================================
// Traditional encryption
// =============================================================================

#[test]
fn test_zipcrypto_with_supplied_password() {
    let dir = tempfile::tempdir().unwrap();
    let data = payload(8_000, 11);
    let archive = ZipBuilder::new()
        .entry(ZipEntry::file("secret.txt", data.clone()).deflated().zipcrypto("hunter2"))
        .write(dir.path(), "zc.zip");
    let out = dir.path().join("out");

    let result = zunpack::extract(
        &archive,
        "",
        &out,
        &Selection::All,
        ExtractOptions::new().password("hunter2"),
    )
    .unwrap();

    assert!(result.is_ok(), "{:?}", result.failures);
    assert_eq!(fs::read(out.join("secret.txt")).unwrap(), data);
}

#[test]
fn test_zipcrypto_data_descriptor_check_byte() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ZipBuilder::new()
        .entry(
            ZipEntry::file("dd.txt", b"checked against the time".to_vec())
                .zipcrypto("pw")
                .data_descriptor(),
        )
        .write(dir.path(), "zcdd.zip");
    let out = dir.path().join("out");

    let result = zunpack::extract(
        &archive,
        "",
        &out,
        &Selection::All,
        ExtractOptions::new().password("pw"),
    )
    .unwrap();

    assert!(result.is_ok(), "{:?}", result.failures);
    assert_eq!(fs::read(out.join("dd.txt")).unwrap(), b"checked against the time");
}

#[test]
fn test_prompt_asked_once_for_shared_password() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ZipBuilder::new()
        .entry(ZipEntry::file("one.txt", b"first".to_vec()).zipcrypto("shared"))
        .entry(ZipEntry::file("two.txt", b"second".to_vec()).zipcrypto("shared"))
        .write(dir.path(), "shared.zip");
    let out = dir.path().join("out");
    let asked = Arc::new(Mutex::new(Vec::new()));

    let prompt = scripted_prompt(vec![PasswordReply::Password("shared".into())], asked.clone());
    let result = zunpack::extract(
        &archive,
        "",
        &out,
        &Selection::All,
        ExtractOptions::new().password_prompt(prompt),
    )
    .unwrap();

    assert!(result.is_ok(), "{:?}", result.failures);
    assert_eq!(*asked.lock().unwrap(), vec!["one.txt".to_string()]);
    assert_eq!(fs::read(out.join("two.txt")).unwrap(), b"second");
}

#[test]
fn test_wrong_password_prompts_again() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"try again".to_vec();
    let wrong = rejected_password("right", &data);
    let archive = ZipBuilder::new()
        .entry(ZipEntry::file("f.txt", data.clone()).zipcrypto("right"))
        .write(dir.path(), "retry.zip");
    let out = dir.path().join("out");
    let asked = Arc::new(Mutex::new(Vec::new()));

    let prompt = scripted_prompt(
        vec![
            PasswordReply::Password(wrong.as_str().into()),
            PasswordReply::Password("right".into()),
        ],
        asked.clone(),
    );
    let result = zunpack::extract(
        &archive,
        "",
        &out,
        &Selection::All,
        ExtractOptions::new().password_prompt(prompt),
    )
    .unwrap();

    assert!(result.is_ok(), "{:?}", result.failures);
    assert_eq!(asked.lock().unwrap().len(), 2);
    assert_eq!(fs::read(out.join("f.txt")).unwrap(), data);
}

#[test]
fn test_wrong_password_then_skip_reports_wrong_password() {
    let dir = tempfile::tempdir().unwrap();
    let data = b"locked".to_vec();
    let wrong = rejected_password("right", &data);
    let archive = ZipBuilder::new()
        .entry(ZipEntry::file("f.txt", data.clone()).zipcrypto("right"))
        .write(dir.path(), "wrong.zip");
    let out = dir.path().join("out");

    let result = zunpack::extract(
        &archive,
        "",
        &out,
        &Selection::All,
        ExtractOptions::new().password(wrong.as_str()),
    )
    .unwrap();

    assert_eq!(result.entries_failed, 1);
    assert!(result.failures[0].1.contains("Wrong password"));
    assert!(!out.join("f.txt").exists());
}

#[test]
fn test_missing_password_is_password_required() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ZipBuilder::new()
        .entry(ZipEntry::file("f.txt", b"x".to_vec()).zipcrypto("pw"))
        .file("open.txt", b"open".to_vec())
        .write(dir.path(), "req.zip");
    let out = dir.path().join("out");

    let result =
        zunpack::extract(&archive, "", &out, &Selection::All, ExtractOptions::new()).unwrap();

    assert_eq!(result.entries_failed, 1);
    assert_eq!(result.entries_extracted, 1);
    assert!(result.failures[0].1.contains("Password required"));
}

#[test]
fn test_skip_all_stops_prompting() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ZipBuilder::new()
        .entry(ZipEntry::file("a.txt", b"a".to_vec()).zipcrypto("pw"))
        .entry(ZipEntry::file("b.txt", b"b".to_vec()).zipcrypto("pw"))
        .entry(ZipEntry::file("c.txt", b"c".to_vec()).zipcrypto("pw"))
        .file("plain.txt", b"plain".to_vec())
        .write(dir.path(), "skipall.zip");
    let out = dir.path().join("out");
    let asked = Arc::new(Mutex::new(Vec::new()));

    let prompt = scripted_prompt(vec![PasswordReply::SkipAll], asked.clone());
    let result = zunpack::extract(
        &archive,
        "",
        &out,
        &Selection::All,
        ExtractOptions::new().password_prompt(prompt),
    )
    .unwrap();

    assert_eq!(asked.lock().unwrap().len(), 1);
    assert_eq!(result.entries_failed, 1);
    assert_eq!(result.entries_skipped, 2);
    assert_eq!(result.entries_extracted, 1);
}

#[test]
fn test_cancel_reply_declines_only_that_entry() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ZipBuilder::new()
        .entry(ZipEntry::file("a.txt", b"a".to_vec()).zipcrypto("pw"))
        .file("plain.txt", b"plain".to_vec())
        .write(dir.path(), "cancelpw.zip");
    let out = dir.path().join("out");

    let prompt = |_: &str| PasswordReply::Cancel;
    let result = zunpack::extract(
        &archive,
        "",
        &out,
        &Selection::All,
        ExtractOptions::new().password_prompt(prompt),
    )
    .unwrap();

    assert!(!result.is_cancelled());
    assert!(result.is_ok(), "{:?}", result.failures);
    assert_eq!(result.entries_failed, 0);
    assert_eq!(result.entries_declined, 1);
    assert!(result.failures.is_empty());
    assert!(!out.join("a.txt").exists());
    assert!(out.join("plain.txt").is_file());
}

#[test]
fn test_encryption_header_longer_than_entry_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    // method 0 with a 4-byte payload cannot hold a 12-byte header
    let archive = ZipBuilder::new()
        .entry(ZipEntry::file("short.txt", b"abcd".to_vec()).flags(0x0001))
        .write(dir.path(), "short.zip");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    let options = ExtractOptions::new().password("pw").error_handler(
        move |category: ErrorCategory, _: &str, _: &str, _: bool| {
            recorder.lock().unwrap().push(category);
            Resolution::Skip
        },
    );
    let result = zunpack::extract(&archive, "", dir.path().join("out"), &Selection::All, options)
        .unwrap();

    assert_eq!(result.entries_failed, 1);
    assert_eq!(*seen.lock().unwrap(), vec![ErrorCategory::Data]);
}

// =============================================================================
// WinZip AES
// =============================================================================

#[cfg(feature = "aes")]
mod aes {
    use super::*;
    use zunpack::format::extra::AesStrength;

    #[test]
    fn test_aes_strengths_and_versions() {
        let dir = tempfile::tempdir().unwrap();
        let data = payload(12_000, 12);
        let archive = ZipBuilder::new()
            .entry(
                ZipEntry::file("ae1_128.bin", data.clone())
                    .deflated()
                    .aes("pw", AesStrength::Aes128, 1),
            )
            .entry(ZipEntry::file("ae2_192.bin", data.clone()).aes("pw", AesStrength::Aes192, 2))
            .entry(
                ZipEntry::file("ae2_256.bin", data.clone())
                    .deflated()
                    .aes("pw", AesStrength::Aes256, 2),
            )
            .write(dir.path(), "aes.zip");
        let out = dir.path().join("out");

        let result = zunpack::extract(
            &archive,
            "",
            &out,
            &Selection::All,
            ExtractOptions::new().password("pw"),
        )
        .unwrap();

        assert!(result.is_ok(), "{:?}", result.failures);
        for name in ["ae1_128.bin", "ae2_192.bin", "ae2_256.bin"] {
            assert_eq!(fs::read(out.join(name)).unwrap(), data, "{name}");
        }
    }

    #[test]
    fn test_aes_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ZipBuilder::new()
            .entry(ZipEntry::file("a.bin", b"data".to_vec()).aes("right", AesStrength::Aes256, 2))
            .write(dir.path(), "aeswrong.zip");

        let result = zunpack::extract(
            &archive,
            "",
            dir.path().join("out"),
            &Selection::All,
            ExtractOptions::new().password("wrong"),
        )
        .unwrap();

        assert_eq!(result.entries_failed, 1);
        assert!(result.failures[0].1.contains("Wrong password"));
    }

    #[test]
    fn test_aes_tampered_ciphertext_fails_authentication() {
        let dir = tempfile::tempdir().unwrap();
        let data = b"authenticated payload ".repeat(200);
        let mut bytes = ZipBuilder::new()
            .entry(ZipEntry::file("a.bin", data).aes("pw", AesStrength::Aes128, 2))
            .build();
        // past the 8-byte salt and 2-byte verifier
        let at = payload_offset(&bytes, 0) + 10 + 500;
        bytes[at] ^= 0x40;
        let archive = dir.path().join("tampered.zip");
        fs::write(&archive, &bytes).unwrap();
        let out = dir.path().join("out");

        let result = zunpack::extract(
            &archive,
            "",
            &out,
            &Selection::All,
            ExtractOptions::new().password("pw"),
        )
        .unwrap();

        assert_eq!(result.entries_failed, 1);
        assert!(
            result.failures[0].1.contains("Authentication code mismatch"),
            "{:?}",
            result.failures
        );
        assert!(!out.join("a.bin").exists());
    }

    #[test]
    fn test_aes_bad_metadata_is_not_a_password_error() {
        let dir = tempfile::tempdir().unwrap();
        // strength byte 7 in the local AES extra field
        let bad_extra = common::extra_field(0x9901, &[2, 0, b'A', b'E', 7, 0, 0]);
        let archive = ZipBuilder::new()
            .entry(
                ZipEntry::file("a.bin", b"data".to_vec())
                    .aes("pw", AesStrength::Aes256, 2)
                    .local_extra(bad_extra),
            )
            .write(dir.path(), "badmeta.zip");
        let asked = Arc::new(Mutex::new(Vec::new()));

        let prompt = scripted_prompt(Vec::new(), asked.clone());
        let result = zunpack::extract(
            &archive,
            "",
            dir.path().join("out"),
            &Selection::All,
            ExtractOptions::new().password_prompt(prompt),
        )
        .unwrap();

        assert_eq!(result.entries_failed, 1);
        assert!(result.failures[0].1.contains("Bad AES metadata"));
        assert!(asked.lock().unwrap().is_empty());
    }

    #[test]
    fn test_aes_and_zipcrypto_share_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ZipBuilder::new()
            .entry(ZipEntry::file("zc.txt", b"zc".to_vec()).zipcrypto("same"))
            .entry(ZipEntry::file("aes.txt", b"aes".to_vec()).aes("same", AesStrength::Aes256, 1))
            .write(dir.path(), "mixed.zip");
        let out = dir.path().join("out");
        let asked = Arc::new(Mutex::new(Vec::new()));

        let prompt = scripted_prompt(vec![PasswordReply::Password("same".into())], asked.clone());
        let result = zunpack::extract(
            &archive,
            "",
            &out,
            &Selection::All,
            ExtractOptions::new().password_prompt(prompt),
        )
        .unwrap();

        assert!(result.is_ok(), "{:?}", result.failures);
        assert_eq!(asked.lock().unwrap().len(), 1);
        assert_eq!(fs::read(out.join("aes.txt")).unwrap(), b"aes");
    }
}
