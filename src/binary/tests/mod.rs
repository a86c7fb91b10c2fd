use std::io::Read;

use crate::digest::DigestAlgo;

use super::BinaryStore;

#[test]
fn persist_then_read_back_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = BinaryStore::open(dir.path(), DigestAlgo::Sha1).unwrap();

    let persisted = store.persist(&b"hello world"[..]).unwrap();
    assert!(!persisted.deduplicated);
    assert_eq!(persisted.size, 11);

    let mut file = store.open_read(&persisted.digest_hex).unwrap();
    let mut contents = Vec::new();
    file.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, b"hello world");
}

#[test]
fn persisting_same_bytes_twice_deduplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = BinaryStore::open(dir.path(), DigestAlgo::Sha1).unwrap();

    let first = store.persist(&b"payload"[..]).unwrap();
    let second = store.persist(&b"payload"[..]).unwrap();
    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert_eq!(first.digest_hex, second.digest_hex);
}

#[test]
fn fixity_check_passes_for_untouched_payload() {
    let dir = tempfile::tempdir().unwrap();
    let store = BinaryStore::open(dir.path(), DigestAlgo::Sha1).unwrap();

    let persisted = store.persist(&b"check me"[..]).unwrap();
    store.fixity_check(&persisted.digest_hex).unwrap();
}

#[test]
fn fixity_check_fails_after_tampering() {
    let dir = tempfile::tempdir().unwrap();
    let store = BinaryStore::open(dir.path(), DigestAlgo::Sha1).unwrap();

    let persisted = store.persist(&b"original"[..]).unwrap();

    let tampered_path = {
        let mut p = store.root().to_path_buf();
        let hex = &persisted.digest_hex;
        for chunk in hex.as_bytes().chunks(2).take(4) {
            p.push(std::str::from_utf8(chunk).unwrap());
        }
        p.push(hex);
        p
    };
    std::fs::write(&tampered_path, "tampered bytes").unwrap();

    let result = store.fixity_check(&persisted.digest_hex);
    assert!(result.is_err());
}

#[test]
fn delete_removes_payload_and_reports_not_found_after() {
    let dir = tempfile::tempdir().unwrap();
    let store = BinaryStore::open(dir.path(), DigestAlgo::Sha1).unwrap();

    let persisted = store.persist(&b"to be deleted"[..]).unwrap();
    store.delete(&persisted.digest_hex).unwrap();
    assert!(store.open_read(&persisted.digest_hex).is_err());
}

#[test]
fn missing_digest_returns_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = BinaryStore::open(dir.path(), DigestAlgo::Sha1).unwrap();
    assert!(store.open_read("0000000000000000000000000000000000000000").is_err());
}
