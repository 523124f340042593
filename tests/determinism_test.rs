//! Reproducibility guarantees: byte-identical rebuilds, ordering as a pure
//! function of the entry name set, and the policies that protect them.

mod common;

use capsule::{
    build, ArchiveBuilder, InputDescriptor, CANONICAL_MTIME, METADATA_ENTRY_NAME,
};
use common::{entry_names, find, read_capsule};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn populate_sources(dir: &TempDir) -> PathBuf {
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("nested/deeper")).unwrap();
    fs::write(src.join("zz.bin"), b"last name, first content").unwrap();
    fs::write(src.join("aa.bin"), vec![0u8; 9000]).unwrap();
    fs::write(src.join("nested/mid.bin"), b"mid").unwrap();
    fs::write(src.join("nested/deeper/leaf.bin"), b"leaf").unwrap();
    src
}

#[test]
fn test_rebuild_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let src = populate_sources(&dir);

    let first = dir.path().join("first.cap");
    let second = dir.path().join("second.cap");

    build(
        &first,
        None,
        Some("App"),
        true,
        true,
        vec![InputDescriptor::DirectoryTree { root: src.clone() }],
    )
    .unwrap();

    // A later wall-clock time and touched source mtimes must not show up
    // in the output
    thread::sleep(Duration::from_millis(1100));
    let touched = fs::read(src.join("zz.bin")).unwrap();
    fs::write(src.join("zz.bin"), touched).unwrap();

    build(
        &second,
        None,
        Some("App"),
        true,
        true,
        vec![InputDescriptor::DirectoryTree { root: src }],
    )
    .unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_registration_order_does_not_change_output() {
    let dir = TempDir::new().unwrap();
    let files = ["c.bin", "a.bin", "b.bin"];
    for name in files {
        fs::write(dir.path().join(name), name.as_bytes()).unwrap();
    }

    let forward = dir.path().join("forward.cap");
    let mut builder = ArchiveBuilder::new();
    for name in files {
        builder.register(InputDescriptor::SingleFile {
            name: name.to_string(),
            path: dir.path().join(name),
        });
    }
    builder.build(&forward).unwrap();

    let reverse = dir.path().join("reverse.cap");
    let mut builder = ArchiveBuilder::new();
    for name in files.iter().rev() {
        builder.register(InputDescriptor::SingleFile {
            name: name.to_string(),
            path: dir.path().join(name),
        });
    }
    builder.build(&reverse).unwrap();

    assert_eq!(fs::read(&forward).unwrap(), fs::read(&reverse).unwrap());

    let entries = read_capsule(&forward);
    assert_eq!(
        entry_names(&entries),
        vec![METADATA_ENTRY_NAME, "a.bin", "b.bin", "c.bin"]
    );
}

#[test]
fn test_normalized_timestamps_are_canonical() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.bin"), b"data").unwrap();

    let output = dir.path().join("out.cap");
    let mut builder = ArchiveBuilder::new();
    builder.register(InputDescriptor::SingleFile {
        name: "a.bin".to_string(),
        path: dir.path().join("a.bin"),
    });
    builder.build(&output).unwrap();

    for entry in read_capsule(&output) {
        assert_eq!(entry.info.modified_time, CANONICAL_MTIME);
    }
}

#[test]
fn test_source_timestamps_kept_when_not_normalizing() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.bin"), b"data").unwrap();

    let output = dir.path().join("out.cap");
    let mut builder = ArchiveBuilder::new();
    builder.register(InputDescriptor::SingleFile {
        name: "a.bin".to_string(),
        path: dir.path().join("a.bin"),
    });
    builder.normalize_timestamps(false);
    builder.build(&output).unwrap();

    let entries = read_capsule(&output);
    let entry = find(&entries, "a.bin");
    assert_ne!(entry.info.modified_time, CANONICAL_MTIME);
    assert!(entry.info.modified_time > CANONICAL_MTIME);
}

#[test]
fn test_last_write_wins_content() {
    let dir = TempDir::new().unwrap();
    let file_a = dir.path().join("file_a");
    let file_b = dir.path().join("file_b");
    fs::write(&file_a, b"from A").unwrap();
    fs::write(&file_b, b"from B").unwrap();

    let output = dir.path().join("out.cap");
    let mut builder = ArchiveBuilder::new();
    builder.register(InputDescriptor::SingleFile {
        name: "x".to_string(),
        path: file_a,
    });
    builder.register(InputDescriptor::SingleFile {
        name: "x".to_string(),
        path: file_b,
    });
    builder.build(&output).unwrap();

    let entries = read_capsule(&output);
    assert_eq!(entry_names(&entries), vec![METADATA_ENTRY_NAME, "x"]);
    assert_eq!(find(&entries, "x").data, b"from B");
}

#[test]
fn test_trust_metadata_never_shipped() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("META.RSA"), b"stale signature").unwrap();
    fs::write(src.join("META.DSA"), b"stale signature").unwrap();
    fs::write(src.join("app.bin"), b"payload").unwrap();

    let output = dir.path().join("out.cap");

    // Registered both via the tree walk and explicitly: excluded either way
    let mut builder = ArchiveBuilder::new();
    builder.register(InputDescriptor::DirectoryTree { root: src.clone() });
    builder.register(InputDescriptor::SingleFile {
        name: "sig/EXTRA.RSA".to_string(),
        path: src.join("META.RSA"),
    });
    builder.build(&output).unwrap();

    let entries = read_capsule(&output);
    assert_eq!(
        entry_names(&entries),
        vec![METADATA_ENTRY_NAME, "app.bin"]
    );
}

#[test]
fn test_metadata_name_cannot_be_shadowed() {
    let dir = TempDir::new().unwrap();
    let impostor = dir.path().join("impostor.json");
    fs::write(&impostor, b"{\"created-by\": \"evil\"}").unwrap();

    let output = dir.path().join("out.cap");
    let mut builder = ArchiveBuilder::new();
    builder.register(InputDescriptor::SingleFile {
        name: METADATA_ENTRY_NAME.to_string(),
        path: impostor,
    });
    builder.build(&output).unwrap();

    let entries = read_capsule(&output);
    assert_eq!(entry_names(&entries), vec![METADATA_ENTRY_NAME]);
    // The synthesized block, not the registered impostor
    assert!(String::from_utf8(entries[0].data.clone())
        .unwrap()
        .contains("capsule-pack"));
}
