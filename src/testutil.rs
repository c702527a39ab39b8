//! Fixtures for tests: minimal JPEG files carrying EXIF date tags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_EXIF_POINTER: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;

/// Build a JPEG (SOI, APP1 Exif, EOI) with the given `DateTimeOriginal` and
/// `DateTime` values, encoded big-endian.
pub fn jpeg_with_exif(original: Option<&str>, datetime: Option<&str>) -> Vec<u8> {
    let ifd0_count = datetime.is_some() as u16 + original.is_some() as u16;
    let ifd0_len = 2 + 12 * ifd0_count as u32 + 4;
    let exif_ifd_offset = 8 + ifd0_len;
    let exif_ifd_len = if original.is_some() { 2 + 12 + 4 } else { 0 };
    let mut data_offset = exif_ifd_offset + exif_ifd_len;

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\0\x2a");
    tiff.extend_from_slice(&8u32.to_be_bytes());

    let mut data = Vec::new();
    let datetime_entry = datetime.map(|v| ascii(v, &mut data_offset, &mut data));
    let original_entry = original.map(|v| ascii(v, &mut data_offset, &mut data));

    tiff.extend_from_slice(&ifd0_count.to_be_bytes());
    if let Some((count, offset)) = datetime_entry {
        push_entry(&mut tiff, TAG_DATE_TIME, TYPE_ASCII, count, offset);
    }
    if original.is_some() {
        push_entry(&mut tiff, TAG_EXIF_POINTER, TYPE_LONG, 1, exif_ifd_offset);
    }
    tiff.extend_from_slice(&0u32.to_be_bytes());

    if let Some((count, offset)) = original_entry {
        tiff.extend_from_slice(&1u16.to_be_bytes());
        push_entry(&mut tiff, TAG_DATE_TIME_ORIGINAL, TYPE_ASCII, count, offset);
        tiff.extend_from_slice(&0u32.to_be_bytes());
    }
    tiff.extend_from_slice(&data);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    let app1_len = (2 + 6 + tiff.len()) as u16;
    jpeg.extend_from_slice(&app1_len.to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// Append a NUL-terminated string to the data area, returning (count, offset).
fn ascii(value: &str, data_offset: &mut u32, data: &mut Vec<u8>) -> (u32, u32) {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);
    let entry = (bytes.len() as u32, *data_offset);
    *data_offset += bytes.len() as u32;
    data.extend_from_slice(&bytes);
    entry
}

fn push_entry(buf: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: u32) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&typ.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn write_jpeg(
    dir: &Path,
    name: &str,
    original: Option<&str>,
    datetime: Option<&str>,
) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, jpeg_with_exif(original, datetime)).unwrap();
    path
}

/// A JPEG with no APP1 segment at all.
pub fn write_plain_jpeg(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
    path
}

/// Write a file and pin its modification time to `unix_secs`.
pub fn write_with_mtime(dir: &Path, name: &str, unix_secs: u64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"not really media").unwrap();
    let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(unix_secs))
        .unwrap();
    path
}
