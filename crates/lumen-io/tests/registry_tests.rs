//! File-level tests for the format registry.

use std::fs;

use lumen_core::RawImage;
use lumen_io::{FormatRegistry, IoError, WriteParams};

fn checker() -> RawImage {
    let mut image = RawImage::new(4, 4, 16).unwrap();
    for y in 0..4 {
        for x in 0..4 {
            let v = if (x + y) % 2 == 0 { 65535 } else { 1000 };
            image.set_pixel(x, y, [v, v / 2, 0, 40000]);
        }
    }
    image
}

#[test]
fn png_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checker.png");
    let registry = FormatRegistry::builtin();
    let icc = vec![7u8; 300];

    registry
        .write(&path, "png", &checker(), Some(&icc), &WriteParams::default())
        .unwrap();
    let (decoded, format) = registry.read(&path).unwrap();

    assert_eq!(format, "png");
    assert_eq!(decoded.image, checker());
    assert_eq!(decoded.icc, Some(icc));
}

#[test]
fn signature_wins_over_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("actually_png.jpg");
    let registry = FormatRegistry::builtin();
    let bytes = registry
        .encode("png", &checker(), None, &WriteParams::default())
        .unwrap();
    fs::write(&path, bytes).unwrap();

    let (_, format) = registry.read(&path).unwrap();
    assert_eq!(format, "png");
}

#[test]
fn unknown_content_and_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mystery.bin");
    fs::write(&path, b"nothing recognizable").unwrap();

    let err = FormatRegistry::builtin().read(&path).unwrap_err();
    assert!(matches!(err, IoError::UnsupportedFormat(_)));
}

#[test]
fn failed_encode_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.jpg");
    let registry = FormatRegistry::builtin();

    // 16-bit data cannot be stored as JPEG
    let err = registry
        .write(&path, "jpg", &checker(), None, &WriteParams::default())
        .unwrap_err();
    assert!(matches!(err, IoError::UnsupportedBitDepth(_)));
    assert!(!path.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn overwrite_replaces_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.icc");
    fs::write(&path, b"old").unwrap();

    let registry = FormatRegistry::builtin();
    let image = RawImage::new(1, 1, 8).unwrap();
    registry
        .write(&path, "icc", &image, Some(b"new profile"), &WriteParams::default())
        .unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"new profile");
}

#[test]
fn missing_file_is_io_error() {
    let err = FormatRegistry::builtin()
        .read(std::path::Path::new("/definitely/not/here.png"))
        .unwrap_err();
    assert_eq!(err.kind(), lumen_core::ErrorKind::Io);
}
