//! End-to-end tests over handcrafted rres archives written to disk.

use aes::cipher::{KeyIvInit, StreamCipher};
use chacha20poly1305::aead::AeadInPlace;
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use std::fs;
use tempfile::NamedTempFile;

use rres::archive::ResourceArchive;
use rres::chunk::{CipherType, CompressionType};
use rres::compute_crc32;
use rres::crypto::derive_key;
use rres::error::Error;
use rres::password::{CipherContext, DEFAULT_PASSWORD};
use rres::unpack::{unpack_chunk, UnpackError};

// ── fixture assembly ─────────────────────────────────────────────────────────

fn file_header(chunk_count: u16, cd_offset: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    buf.extend_from_slice(b"rres");
    buf.extend_from_slice(&100u16.to_le_bytes());
    buf.extend_from_slice(&chunk_count.to_le_bytes());
    buf.extend_from_slice(&cd_offset.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf
}

#[allow(clippy::too_many_arguments)]
fn record(
    type_tag: &[u8; 4],
    id: u32,
    comp: u8,
    cipher: u8,
    packed_size: u32,
    base_size: u32,
    next_offset: u32,
    crc32: u32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32);
    buf.extend_from_slice(type_tag);
    buf.extend_from_slice(&id.to_le_bytes());
    buf.push(comp);
    buf.push(cipher);
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&packed_size.to_le_bytes());
    buf.extend_from_slice(&base_size.to_le_bytes());
    buf.extend_from_slice(&next_offset.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&crc32.to_le_bytes());
    buf
}

/// Canonical decoded payload: propCount + props + raw.
fn plain_payload(props: &[u32], raw: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(props.len() as u32).to_le_bytes());
    for p in props {
        buf.extend_from_slice(&p.to_le_bytes());
    }
    buf.extend_from_slice(raw);
    buf
}

/// A plain (no comp, no cipher) chunk: record + payload with valid CRC.
fn plain_chunk(type_tag: &[u8; 4], id: u32, props: &[u32], raw: &[u8]) -> Vec<u8> {
    let payload = plain_payload(props, raw);
    let mut chunk = record(
        type_tag,
        id,
        0,
        0,
        payload.len() as u32,
        payload.len() as u32,
        0,
        compute_crc32(&payload),
    );
    chunk.extend_from_slice(&payload);
    chunk
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), bytes).unwrap();
    file
}

fn default_password_buffer() -> [u8; 16] {
    let mut buf = [0u8; 16];
    buf[..DEFAULT_PASSWORD.len()].copy_from_slice(DEFAULT_PASSWORD.as_bytes());
    buf
}

// ── header validation ────────────────────────────────────────────────────────

#[test]
fn open_rejects_wrong_magic() {
    let mut bytes = file_header(0, 0);
    bytes[0] = b'x';
    let file = write_temp(&bytes);
    assert!(matches!(
        ResourceArchive::open(file.path()),
        Err(Error::InvalidSignature(_))
    ));
}

#[test]
fn open_rejects_wrong_version() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"rres");
    bytes.extend_from_slice(&99u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    let file = write_temp(&bytes);
    assert!(matches!(
        ResourceArchive::open(file.path()),
        Err(Error::UnsupportedVersion(99))
    ));
}

#[test]
fn open_rejects_truncated_header() {
    let file = write_temp(b"rres\x64");
    assert!(ResourceArchive::open(file.path()).is_err());
}

// ── single-chunk loading ─────────────────────────────────────────────────────

#[test]
fn end_to_end_minimal_text_chunk() {
    // One TEXT chunk, no compression, no cipher:
    // payload = [propCount=0][5 raw bytes], packedSize = baseSize = 9.
    let raw = b"hi...";
    let mut bytes = file_header(1, 0);
    bytes.extend_from_slice(&plain_chunk(b"TEXT", 1, &[], raw));
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let chunk = archive.load_chunk(1).unwrap();
    assert_eq!(chunk.info.packed_size, 9);
    assert_eq!(chunk.info.base_size, 9);
    assert!(chunk.data.props.is_empty());
    assert_eq!(chunk.data.raw, raw);
}

#[test]
fn scan_skips_non_matching_records_by_packed_size() {
    let mut bytes = file_header(3, 0);
    bytes.extend_from_slice(&plain_chunk(b"RAWD", 1, &[6], b"first!"));
    bytes.extend_from_slice(&plain_chunk(b"RAWD", 2, &[3], b"mid"));
    bytes.extend_from_slice(&plain_chunk(b"TEXT", 3, &[4], b"last"));
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let chunk = archive.load_chunk(3).unwrap();
    assert_eq!(chunk.info.type_tag, *b"TEXT");
    assert_eq!(chunk.data.props, vec![4]);
    assert_eq!(chunk.data.raw, b"last");
}

#[test]
fn missing_id_is_a_lookup_miss() {
    let mut bytes = file_header(1, 0);
    bytes.extend_from_slice(&plain_chunk(b"RAWD", 1, &[2], b"ab"));
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    assert!(matches!(
        archive.load_chunk(99),
        Err(Error::ResourceNotFound(99))
    ));
}

#[test]
fn crc_mismatch_is_advisory() {
    let payload = plain_payload(&[3], b"abc");
    let mut bytes = file_header(1, 0);
    bytes.extend_from_slice(&record(
        b"RAWD",
        1,
        0,
        0,
        payload.len() as u32,
        payload.len() as u32,
        0,
        0xDEAD_BEEF, // deliberately wrong
    ));
    bytes.extend_from_slice(&payload);
    let file = write_temp(&bytes);

    // Data is still returned; the mismatch is only logged.
    let archive = ResourceArchive::open(file.path()).unwrap();
    let chunk = archive.load_chunk(1).unwrap();
    assert_eq!(chunk.data.raw, b"abc");
}

// ── linked resources ─────────────────────────────────────────────────────────

/// Three records of id 7 chained via nextOffset, with an unrelated
/// record wedged between the second and the third.
fn linked_archive() -> Vec<u8> {
    let payloads: Vec<Vec<u8>> = vec![
        plain_payload(&[3], b"one"),
        plain_payload(&[3], b"two"),
        plain_payload(&[5], b"three"),
    ];
    let other = plain_payload(&[5], b"other");

    // Layout: header | c0 | c1 | other | c2
    let off_c0 = 16u32;
    let off_c1 = off_c0 + 32 + payloads[0].len() as u32;
    let off_other = off_c1 + 32 + payloads[1].len() as u32;
    let off_c2 = off_other + 32 + other.len() as u32;

    let mut bytes = file_header(4, 0);
    let crc = |p: &[u8]| compute_crc32(p);
    bytes.extend_from_slice(&record(
        b"IMGE", 7, 0, 0,
        payloads[0].len() as u32, payloads[0].len() as u32, off_c1, crc(&payloads[0]),
    ));
    bytes.extend_from_slice(&payloads[0]);
    bytes.extend_from_slice(&record(
        b"IMGE", 7, 0, 0,
        payloads[1].len() as u32, payloads[1].len() as u32, off_c2, crc(&payloads[1]),
    ));
    bytes.extend_from_slice(&payloads[1]);
    bytes.extend_from_slice(&record(
        b"RAWD", 5, 0, 0,
        other.len() as u32, other.len() as u32, 0, crc(&other),
    ));
    bytes.extend_from_slice(&other);
    bytes.extend_from_slice(&record(
        b"IMGE", 7, 0, 0,
        payloads[2].len() as u32, payloads[2].len() as u32, 0, crc(&payloads[2]),
    ));
    bytes.extend_from_slice(&payloads[2]);
    bytes
}

#[test]
fn load_multi_returns_chain_in_order() {
    let file = write_temp(&linked_archive());
    let archive = ResourceArchive::open(file.path()).unwrap();

    let chunks = archive.load_multi(7).unwrap();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].data.raw, b"one");
    assert_eq!(chunks[1].data.raw, b"two");
    assert_eq!(chunks[2].data.raw, b"three");
    assert!(chunks.iter().all(|c| c.info.id == 7));
}

#[test]
fn load_chunk_returns_only_the_head_of_a_chain() {
    let file = write_temp(&linked_archive());
    let archive = ResourceArchive::open(file.path()).unwrap();

    let chunk = archive.load_chunk(7).unwrap();
    assert_eq!(chunk.data.raw, b"one");
}

#[test]
fn broken_chain_is_rejected() {
    let mut bytes = linked_archive();
    // Corrupt the id of the terminal record (layout per linked_archive).
    let off_c2 = {
        let p0 = plain_payload(&[3], b"one").len() as u32;
        let p1 = plain_payload(&[3], b"two").len() as u32;
        let other = plain_payload(&[5], b"other").len() as u32;
        16 + 32 + p0 + 32 + p1 + 32 + other
    };
    let id_pos = off_c2 as usize + 4;
    bytes[id_pos..id_pos + 4].copy_from_slice(&42u32.to_le_bytes());
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    assert!(matches!(
        archive.load_multi(7),
        Err(Error::BrokenChain { found: 42, .. })
    ));
}

#[test]
fn chunk_info_all_enumerates_every_record_without_following_chains() {
    let file = write_temp(&linked_archive());
    let archive = ResourceArchive::open(file.path()).unwrap();

    let infos = archive.chunk_info_all().unwrap();
    assert_eq!(infos.len(), 4);
    assert_eq!(
        infos.iter().map(|i| i.id).collect::<Vec<_>>(),
        vec![7, 7, 5, 7]
    );
    // nextOffset values are reported as stored
    assert_ne!(infos[0].next_offset, 0);
    assert_eq!(infos[3].next_offset, 0);
}

// ── central directory ────────────────────────────────────────────────────────

#[test]
fn directory_resolves_names_to_ids() {
    let dir_entries = {
        let mut raw = Vec::new();
        for (id, name) in [
            (0xCAFEu32, b"player.png\0\0".as_slice()),
            (0xF00D, b"theme.ogg\0\0\0".as_slice()),
        ] {
            raw.extend_from_slice(&id.to_le_bytes());
            raw.extend_from_slice(&0u32.to_le_bytes()); // offset
            raw.extend_from_slice(&0u32.to_le_bytes()); // reserved
            raw.extend_from_slice(&(name.len() as u32).to_le_bytes());
            raw.extend_from_slice(name);
        }
        raw
    };

    let first = plain_chunk(b"RAWD", 0xCAFE, &[2], b"px");
    let cd_offset = 16 + first.len() as u32;

    let mut bytes = file_header(2, cd_offset);
    bytes.extend_from_slice(&first);
    bytes.extend_from_slice(&plain_chunk(b"CDIR", 0, &[2], &dir_entries));
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let dir = archive.central_directory().unwrap();
    assert_eq!(dir.len(), 2);
    assert_eq!(dir.resource_id("player.png"), 0xCAFE);
    assert_eq!(dir.resource_id("theme.ogg"), 0xF00D);
    assert_eq!(dir.resource_id("absent.txt"), 0);

    // and the resolved id loads
    let chunk = archive.load_chunk(dir.resource_id("player.png")).unwrap();
    assert_eq!(chunk.data.raw, b"px");
}

#[test]
fn absent_directory_is_empty_not_an_error() {
    let mut bytes = file_header(1, 0);
    bytes.extend_from_slice(&plain_chunk(b"RAWD", 1, &[1], b"x"));
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let dir = archive.central_directory().unwrap();
    assert!(dir.is_empty());
    assert_eq!(dir.resource_id("anything"), 0);
}

#[test]
fn directory_offset_pointing_at_non_cdir_chunk_is_rejected() {
    let mut bytes = file_header(1, 16);
    bytes.extend_from_slice(&plain_chunk(b"RAWD", 1, &[1], b"x"));
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    assert!(matches!(
        archive.central_directory(),
        Err(Error::WrongChunkType { .. })
    ));
}

// ── unpack pipeline: compression ─────────────────────────────────────────────

#[test]
fn lz4_chunk_unpacks_and_repopulates_properties() {
    let decoded = plain_payload(&[2, 4], b"compressible compressible compressible");
    let compressed = lz4_flex::compress(&decoded);

    let mut bytes = file_header(1, 0);
    bytes.extend_from_slice(&record(
        b"RAWD",
        9,
        20, // LZ4
        0,
        compressed.len() as u32,
        decoded.len() as u32,
        0,
        compute_crc32(&compressed),
    ));
    bytes.extend_from_slice(&compressed);
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(9).unwrap();
    assert!(chunk.info.is_packed());
    assert!(chunk.data.props.is_empty()); // opaque until unpacked

    unpack_chunk(&mut chunk, &CipherContext::new()).unwrap();
    assert_eq!(chunk.info.comp_type, CompressionType::None);
    assert_eq!(chunk.info.packed_size, decoded.len() as u32);
    assert_eq!(chunk.data.props, vec![2, 4]);
    assert_eq!(chunk.data.raw, b"compressible compressible compressible");
}

#[test]
fn unsupported_compression_code_yields_code_3() {
    let mut bytes = file_header(1, 0);
    let payload = b"anything";
    bytes.extend_from_slice(&record(
        b"RAWD", 9, 10 /* deflate */, 0,
        payload.len() as u32, payload.len() as u32, 0, compute_crc32(payload),
    ));
    bytes.extend_from_slice(payload);
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(9).unwrap();
    let err = unpack_chunk(&mut chunk, &CipherContext::new()).unwrap_err();
    assert_eq!(err.code(), 3);
}

#[test]
fn unsupported_cipher_code_yields_code_1() {
    let mut bytes = file_header(1, 0);
    let payload = b"anything";
    bytes.extend_from_slice(&record(
        b"RAWD", 9, 0, 1 /* xor */,
        payload.len() as u32, payload.len() as u32, 0, compute_crc32(payload),
    ));
    bytes.extend_from_slice(payload);
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(9).unwrap();
    let err = unpack_chunk(&mut chunk, &CipherContext::new()).unwrap_err();
    assert_eq!(err.code(), 1);
}

// ── unpack pipeline: encryption ──────────────────────────────────────────────

/// Packed payload for an AES-256-CTR chunk: ciphertext + salt + MD5.
fn aes_packed_payload(decoded: &[u8], salt: [u8; 16]) -> Vec<u8> {
    let key = derive_key(&default_password_buffer(), &salt).unwrap();
    let mut ciphertext = decoded.to_vec();
    let mut ctr_cipher =
        ctr::Ctr128BE::<aes::Aes256>::new_from_slices(&key[..], &[0u8; 16]).unwrap();
    ctr_cipher.apply_keystream(&mut ciphertext);

    let digest = md5::compute(decoded);
    let mut packed = ciphertext;
    packed.extend_from_slice(&salt);
    packed.extend_from_slice(&digest.0);
    packed
}

fn aes_archive(decoded: &[u8], salt: [u8; 16]) -> Vec<u8> {
    let packed = aes_packed_payload(decoded, salt);
    let mut bytes = file_header(1, 0);
    bytes.extend_from_slice(&record(
        b"TEXT",
        3,
        0,
        30, // AES
        packed.len() as u32,
        decoded.len() as u32,
        0,
        compute_crc32(&packed),
    ));
    bytes.extend_from_slice(&packed);
    bytes
}

#[test]
fn aes_chunk_decrypts_with_default_password() {
    let decoded = plain_payload(&[5, 1], b"hello");
    let file = write_temp(&aes_archive(&decoded, [9u8; 16]));

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(3).unwrap();
    unpack_chunk(&mut chunk, &CipherContext::new()).unwrap();

    assert_eq!(chunk.info.cipher_type, CipherType::None);
    assert_eq!(chunk.info.packed_size, decoded.len() as u32);
    assert_eq!(chunk.data.props, vec![5, 1]);
    assert_eq!(chunk.data.raw, b"hello");
}

#[test]
fn flipped_digest_bit_yields_code_2() {
    let decoded = plain_payload(&[5, 1], b"hello");
    let mut bytes = aes_archive(&decoded, [9u8; 16]);
    let last = bytes.len() - 1; // final digest byte
    bytes[last] ^= 0x01;
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(3).unwrap();
    let err = unpack_chunk(&mut chunk, &CipherContext::new()).unwrap_err();
    assert_eq!(err, UnpackError::WrongPassword);
    assert_eq!(err.code(), 2);
}

#[test]
fn wrong_password_yields_code_2() {
    let decoded = plain_payload(&[5, 1], b"hello");
    let file = write_temp(&aes_archive(&decoded, [9u8; 16]));

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(3).unwrap();
    let ctx = CipherContext::with_password("not-the-one");
    assert_eq!(unpack_chunk(&mut chunk, &ctx).unwrap_err().code(), 2);
}

/// Packed payload for an XChaCha20-Poly1305 chunk:
/// ciphertext + salt + nonce + tag.
fn xchacha_archive(decoded: &[u8], salt: [u8; 16], nonce: [u8; 24]) -> Vec<u8> {
    let key = derive_key(&default_password_buffer(), &salt).unwrap();
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let mut ciphertext = decoded.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(XNonce::from_slice(&nonce), b"", &mut ciphertext)
        .unwrap();

    let mut packed = ciphertext;
    packed.extend_from_slice(&salt);
    packed.extend_from_slice(&nonce);
    packed.extend_from_slice(tag.as_slice());

    let mut bytes = file_header(1, 0);
    bytes.extend_from_slice(&record(
        b"RAWD",
        4,
        0,
        73, // XChaCha20-Poly1305
        packed.len() as u32,
        decoded.len() as u32,
        0,
        compute_crc32(&packed),
    ));
    bytes.extend_from_slice(&packed);
    bytes
}

#[test]
fn xchacha20_chunk_decrypts_and_reparses() {
    let decoded = plain_payload(&[4], b"data");
    let file = write_temp(&xchacha_archive(&decoded, [3u8; 16], [7u8; 24]));

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(4).unwrap();
    unpack_chunk(&mut chunk, &CipherContext::new()).unwrap();

    assert_eq!(chunk.info.cipher_type, CipherType::None);
    assert_eq!(chunk.info.packed_size, decoded.len() as u32);
    assert_eq!(chunk.data.props, vec![4]);
    assert_eq!(chunk.data.raw, b"data");
}

#[test]
fn flipped_tag_bit_yields_code_2() {
    let decoded = plain_payload(&[4], b"data");
    let mut bytes = xchacha_archive(&decoded, [3u8; 16], [7u8; 24]);
    let last = bytes.len() - 1; // final tag byte
    bytes[last] ^= 0x80;
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(4).unwrap();
    let err = unpack_chunk(&mut chunk, &CipherContext::new()).unwrap_err();
    assert_eq!(err.code(), 2);
}

// ── encrypted + compressed chaining ──────────────────────────────────────────

#[test]
fn decrypt_then_decompress_chain() {
    let decoded = plain_payload(&[2], b"chained stages chained stages chained stages");
    let compressed = lz4_flex::compress(&decoded);
    let salt = [5u8; 16];
    let packed = aes_packed_payload(&compressed, salt);

    let mut bytes = file_header(1, 0);
    bytes.extend_from_slice(&record(
        b"RAWD",
        6,
        20, // LZ4
        30, // AES
        packed.len() as u32,
        decoded.len() as u32,
        0,
        compute_crc32(&packed),
    ));
    bytes.extend_from_slice(&packed);
    let file = write_temp(&bytes);

    let archive = ResourceArchive::open(file.path()).unwrap();
    let mut chunk = archive.load_chunk(6).unwrap();
    unpack_chunk(&mut chunk, &CipherContext::new()).unwrap();

    assert_eq!(chunk.info.cipher_type, CipherType::None);
    assert_eq!(chunk.info.comp_type, CompressionType::None);
    assert_eq!(chunk.info.packed_size, decoded.len() as u32);
    assert_eq!(chunk.data.props, vec![2]);
    assert_eq!(chunk.data.raw, b"chained stages chained stages chained stages");
}
