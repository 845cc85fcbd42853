use std::io::Cursor;

use byteorder::{LittleEndian, WriteBytesExt};
use gge_secure::wdf_hash;

use crate::wdf::reader::WdfArchive;
use crate::wdf::structs::WDF_MAGIC;
use crate::wdf::WdfError;

/// A minimal PS sprite container: empty DTS, zero palette, one group with
/// one frame of a single transparent row.
fn mock_tcp_blob() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u16::<LittleEndian>(0x5053).unwrap(); // 'PS'
    buf.write_u16::<LittleEndian>(12).unwrap(); // header_len, no DTS
    buf.write_u16::<LittleEndian>(1).unwrap(); // groups
    buf.write_u16::<LittleEndian>(1).unwrap(); // frames
    buf.write_u16::<LittleEndian>(1).unwrap(); // width
    buf.write_u16::<LittleEndian>(1).unwrap(); // height
    buf.write_i16::<LittleEndian>(0).unwrap();
    buf.write_i16::<LittleEndian>(0).unwrap();
    buf.extend_from_slice(&[0u8; 512]); // palette

    // One frame right after the offset table, stored relative to
    // header_len + 4.
    let frame_pos = (buf.len() + 4) as u32;
    buf.write_u32::<LittleEndian>(frame_pos - 16).unwrap();

    buf.write_i32::<LittleEndian>(0).unwrap(); // x
    buf.write_i32::<LittleEndian>(0).unwrap(); // y
    buf.write_u32::<LittleEndian>(1).unwrap(); // w
    buf.write_u32::<LittleEndian>(1).unwrap(); // h
    buf.write_u32::<LittleEndian>(20).unwrap(); // line offset
    buf.push(0x00); // transparent row
    buf
}

/// Blobs first, index last, with the header's index_offset pointing at it.
fn mock_archive(blobs: &[(u32, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_u32::<LittleEndian>(WDF_MAGIC).unwrap();
    buf.write_u32::<LittleEndian>(blobs.len() as u32).unwrap();
    let index_offset_at = buf.len();
    buf.write_u32::<LittleEndian>(0).unwrap();

    let mut positions = Vec::new();
    for (_, data) in blobs {
        positions.push(buf.len() as u32);
        buf.extend_from_slice(data);
    }

    let index_at = buf.len() as u32;
    for ((hash, data), pos) in blobs.iter().zip(&positions) {
        buf.write_u32::<LittleEndian>(*hash).unwrap();
        buf.write_u32::<LittleEndian>(*pos).unwrap();
        buf.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();
    }
    buf[index_offset_at..index_offset_at + 4].copy_from_slice(&index_at.to_le_bytes());
    buf
}

#[test]
fn opens_and_lists_entries() {
    let h1 = wdf_hash("a/b.txt");
    let h2 = wdf_hash("c/d.txt");
    let bytes = mock_archive(&[(h1, b"alpha"), (h2, b"beta!")]);

    let archive = WdfArchive::open(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.entry_count(), 2);
    assert_eq!(archive.entries()[0].hash, h1);
    assert_eq!(archive.entries()[1].size, 5);
    assert!(archive.entry(2).is_err());
}

#[test]
fn rejects_a_bad_magic() {
    let mut bytes = mock_archive(&[(1, b"x")]);
    bytes[0] ^= 0xFF;
    assert!(matches!(
        WdfArchive::open(Cursor::new(bytes)),
        Err(WdfError::UnrecognizedFormat)
    ));
}

#[test]
fn rejects_an_index_past_the_file_end() {
    let mut bytes = mock_archive(&[(1, b"x")]);
    // Point the index one entry past the end of the file.
    let bogus = (bytes.len() as u32).to_le_bytes();
    bytes[8..12].copy_from_slice(&bogus);
    assert!(matches!(
        WdfArchive::open(Cursor::new(bytes)),
        Err(WdfError::Corrupt(_))
    ));
}

#[test]
fn reads_blobs_by_index_and_hash() {
    let h1 = wdf_hash("a/b.txt");
    let h2 = wdf_hash("c/d.txt");
    let bytes = mock_archive(&[(h1, b"alpha"), (h2, b"beta!")]);

    let mut archive = WdfArchive::open(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.read_by_index(0).unwrap(), b"alpha");
    assert_eq!(archive.read_by_index(1).unwrap(), b"beta!");
    assert!(matches!(
        archive.read_by_index(9),
        Err(WdfError::EntryIndex(9))
    ));

    assert_eq!(archive.find_by_hash(h1), Some(0));
    assert_eq!(archive.find_by_hash(h2), Some(1));
    assert_eq!(archive.find_by_hash(0), None);

    assert_eq!(archive.read_by_hash(h2).unwrap().unwrap(), b"beta!");
    assert!(archive.read_by_hash(0).unwrap().is_none());
}

#[test]
fn header_peek_clamps_to_the_blob_size() {
    let bytes = mock_archive(&[(7, b"abcdef")]);
    let mut archive = WdfArchive::open(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.read_header(0, 4).unwrap(), b"abcd");
    assert_eq!(archive.read_header(0, 100).unwrap(), b"abcdef");
}

#[test]
fn sprite_blobs_compose_with_the_tcp_decoder() {
    let h_sprite = wdf_hash("sprite/hero.tcp");
    let tcp = mock_tcp_blob();
    let bytes = mock_archive(&[(h_sprite, tcp.as_slice()), (99, b"not a sprite")]);

    let mut archive = WdfArchive::open(Cursor::new(bytes)).unwrap();
    let sprite = archive.tcp_by_hash(h_sprite).unwrap().unwrap();
    assert_eq!(sprite.total_frames(), 1);
    assert_eq!(sprite.size(), (1, 1));

    // A non-sprite blob propagates the decoder's failure.
    assert!(matches!(
        archive.tcp_by_index(1),
        Err(WdfError::Asset(_))
    ));
    // A missing hash is not an error.
    assert!(archive.tcp_by_hash(0).unwrap().is_none());
}

#[test]
fn hash_lookup_matches_the_legacy_folding() {
    // The archive hash folds case and slash direction, so lookups work
    // with either spelling.
    let bytes = mock_archive(&[(wdf_hash("Data\\UI\\Login.TCP"), b"blob")]);
    let archive = WdfArchive::open(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.find_by_hash(wdf_hash("data/ui/login.tcp")), Some(0));
}
