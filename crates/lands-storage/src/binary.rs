//! Length-prefixed binary manifest file
//!
//! Layout (big-endian, whole stream gzip compressed):
//!
//! ```text
//! magic:u32  version:u16  timestamp:i64  hash_len:u32  hash:[u8]
//! region_count:u32
//!   id, name, description, owner, contact, world   (str_len:u16 + UTF-8 each)
//!   chunk_count:u32  chunks:[u64]
//! ```
//!
//! The reader accepts any version up to [`FORMAT_VERSION`] and rejects newer ones.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use lands_core::{Region, RegionManifest, TileKey};
use tracing::warn;

use crate::atomic::{read_if_exists, write_atomic};
use crate::backend::{DecodedManifest, ManifestBackend};
use crate::error::StoreError;

/// "LAND"
pub const MAGIC: u32 = 0x4C41_4E44;

/// Newest format this build reads and the one it writes
pub const FORMAT_VERSION: u16 = 1;

/// Largest decompressed manifest the reader accepts
pub const MAX_DECOMPRESSED_BYTES: u64 = 64 * 1024 * 1024;

/// Encode a manifest into the compressed binary format
pub fn encode_manifest_binary(manifest: &RegionManifest) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::with_capacity(64 + manifest.regions.len() * 128);

    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
    out.extend_from_slice(&manifest.timestamp.to_be_bytes());

    let hash = manifest.hash.as_bytes();
    let hash_len = u32::try_from(hash.len())
        .map_err(|_| StoreError::encode("manifest hash too long"))?;
    out.extend_from_slice(&hash_len.to_be_bytes());
    out.extend_from_slice(hash);

    let region_count = u32::try_from(manifest.regions.len())
        .map_err(|_| StoreError::encode("too many regions"))?;
    out.extend_from_slice(&region_count.to_be_bytes());

    for region in &manifest.regions {
        encode_region(&mut out, region)?;
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&out)?;
    Ok(encoder.finish()?)
}

fn encode_region(out: &mut Vec<u8>, region: &Region) -> Result<(), StoreError> {
    for field in [
        &region.id,
        &region.name,
        &region.description,
        &region.owner,
        &region.contact,
        &region.world,
    ] {
        let len = u16::try_from(field.len()).map_err(|_| {
            StoreError::encode(format!(
                "field of region '{}' exceeds {} bytes",
                region.id,
                u16::MAX
            ))
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(field.as_bytes());
    }

    let chunk_count = u32::try_from(region.chunks.len())
        .map_err(|_| StoreError::encode(format!("region '{}' has too many chunks", region.id)))?;
    out.extend_from_slice(&chunk_count.to_be_bytes());
    for key in &region.chunks {
        out.extend_from_slice(&key.raw().to_be_bytes());
    }

    Ok(())
}

/// Decode the compressed binary format
///
/// A corrupt envelope (bad magic, newer version, truncated stream, more than
/// [`MAX_DECOMPRESSED_BYTES`] once inflated) is a [`StoreError::Decode`]. A
/// region whose text fields are not valid UTF-8 is skipped and counted as
/// malformed.
pub fn decode_manifest_binary(compressed: &[u8]) -> Result<DecodedManifest, StoreError> {
    let bytes = inflate(compressed, MAX_DECOMPRESSED_BYTES)?;
    let mut reader = ByteReader::new(&bytes);

    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(StoreError::decode(format!(
            "invalid file format: magic number {magic:#010x}"
        )));
    }

    let version = reader.u16()?;
    if version > FORMAT_VERSION {
        return Err(StoreError::decode(format!(
            "unsupported format version {version} (max supported: {FORMAT_VERSION})"
        )));
    }

    let timestamp = reader.i64()?;
    let hash_len = reader.u32()? as usize;
    let hash = String::from_utf8(reader.take(hash_len)?.to_vec())
        .map_err(|_| StoreError::decode("manifest hash is not valid UTF-8"))?;

    let region_count = reader.u32()?;
    let mut regions = Vec::new();
    let mut malformed = 0;

    for index in 0..region_count {
        match decode_region(&mut reader)? {
            Ok(region) => regions.push(region),
            Err(reason) => {
                warn!(index, reason = %reason, "Skipping malformed region");
                malformed += 1;
            }
        }
    }

    if !reader.is_empty() {
        warn!(trailing = reader.remaining(), "Trailing bytes after manifest");
    }

    Ok(DecodedManifest {
        manifest: RegionManifest::new(hash, timestamp, regions),
        malformed,
    })
}

fn inflate(compressed: &[u8], limit: u64) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    GzDecoder::new(compressed)
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| StoreError::decode(format!("decompression failed: {e}")))?;

    if bytes.len() as u64 > limit {
        return Err(StoreError::decode(format!(
            "decompressed manifest exceeds {limit} bytes"
        )));
    }
    Ok(bytes)
}

/// Outer error: the stream is structurally broken. Inner error: this region only.
fn decode_region(reader: &mut ByteReader<'_>) -> Result<Result<Region, String>, StoreError> {
    let mut fields: [Option<String>; 6] = Default::default();
    let mut bad_field = None;

    for (slot, name) in fields
        .iter_mut()
        .zip(["id", "name", "description", "owner", "contact", "world"])
    {
        let len = reader.u16()? as usize;
        match std::str::from_utf8(reader.take(len)?) {
            Ok(text) => *slot = Some(text.to_string()),
            Err(_) => bad_field = bad_field.or(Some(name)),
        }
    }

    let chunk_count = reader.u32()? as usize;
    let mut chunks = Vec::with_capacity(chunk_count.min(reader.remaining() / 8));
    for _ in 0..chunk_count {
        chunks.push(TileKey(reader.u64()?));
    }

    if let Some(name) = bad_field {
        return Ok(Err(format!("field '{name}' is not valid UTF-8")));
    }

    let [id, name, description, owner, contact, world] = fields.map(Option::unwrap_or_default);
    Ok(Ok(Region {
        id,
        name,
        description,
        owner,
        contact,
        world,
        chunks,
    }))
}

/// Cursor over a decoded byte stream
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StoreError> {
        if len > self.remaining() {
            return Err(StoreError::decode(format!(
                "unexpected end of data at offset {} (wanted {len} bytes, {} left)",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], StoreError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16, StoreError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, StoreError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, StoreError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, StoreError> {
        Ok(i64::from_be_bytes(self.array()?))
    }
}

/// Manifest stored as one gzip-compressed binary file
#[derive(Debug, Clone)]
pub struct BinaryFileBackend {
    path: PathBuf,
}

impl BinaryFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ManifestBackend for BinaryFileBackend {
    fn describe(&self) -> String {
        format!("binary file {}", self.path.display())
    }

    async fn read(&self) -> Result<Option<DecodedManifest>, StoreError> {
        match read_if_exists(&self.path).await? {
            Some(bytes) => decode_manifest_binary(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, manifest: &RegionManifest) -> Result<u64, StoreError> {
        let bytes = encode_manifest_binary(manifest)?;
        write_atomic(&self.path, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RegionManifest {
        RegionManifest::new(
            "remote-hash",
            1_700_000_000_000,
            vec![
                Region::new("spawn", "Spawn Town", "admin", "world")
                    .with_description("Zentrum – 中心")
                    .with_tiles([(0, 0), (16, 0), (i32::MIN, i32::MAX)]),
                Region::new("nether-hub", "Nether Hub", "admin", "world_nether")
                    .with_contact("admin@example.com")
                    .with_tiles([(-32, -32)]),
            ],
        )
    }

    fn raw_stream(manifest_bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(manifest_bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn decompress(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_round_trip() {
        let manifest = sample();
        let decoded = decode_manifest_binary(&encode_manifest_binary(&manifest).unwrap()).unwrap();
        assert_eq!(decoded.manifest, manifest);
        assert_eq!(decoded.malformed, 0);
    }

    #[test]
    fn test_output_is_gzip() {
        let bytes = encode_manifest_binary(&sample()).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_rejects_unknown_magic() {
        let mut raw = decompress(&encode_manifest_binary(&sample()).unwrap());
        raw[0] = b'X';

        let err = decode_manifest_binary(&raw_stream(&raw)).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_rejects_newer_version_accepts_older() {
        let mut raw = decompress(&encode_manifest_binary(&sample()).unwrap());

        raw[4..6].copy_from_slice(&(FORMAT_VERSION + 1).to_be_bytes());
        let err = decode_manifest_binary(&raw_stream(&raw)).unwrap_err();
        assert!(err.to_string().contains("unsupported format version"));

        raw[4..6].copy_from_slice(&0u16.to_be_bytes());
        assert!(decode_manifest_binary(&raw_stream(&raw)).is_ok());
    }

    #[test]
    fn test_truncated_stream_is_decode_error() {
        let raw = decompress(&encode_manifest_binary(&sample()).unwrap());
        let truncated = &raw[..raw.len() - 5];

        let err = decode_manifest_binary(&raw_stream(truncated)).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn test_not_gzip_is_decode_error() {
        let err = decode_manifest_binary(b"plain bytes").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn test_invalid_utf8_region_is_skipped() {
        let mut manifest = sample();
        manifest.regions[0].name = "AAAA".to_string();
        let mut raw = decompress(&encode_manifest_binary(&manifest).unwrap());

        let needle = b"AAAA";
        let at = raw.windows(4).position(|w| w == needle).unwrap();
        raw[at] = 0xFF;

        let decoded = decode_manifest_binary(&raw_stream(&raw)).unwrap();
        assert_eq!(decoded.malformed, 1);
        assert_eq!(decoded.manifest.regions.len(), 1);
        assert_eq!(decoded.manifest.regions[0].id, "nether-hub");
    }

    #[test]
    fn test_oversized_field_fails_encode() {
        let mut manifest = sample();
        manifest.regions[0].description = "x".repeat(u16::MAX as usize + 1);
        assert!(matches!(
            encode_manifest_binary(&manifest),
            Err(StoreError::Encode(_))
        ));
    }

    #[test]
    fn test_inflate_enforces_limit() {
        let stream = raw_stream(&[0u8; 4096]);

        assert_eq!(inflate(&stream, 4096).unwrap().len(), 4096);
        let err = inflate(&stream, 4095).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        assert!(err.to_string().contains("exceeds 4095 bytes"));
    }

    #[test]
    fn test_oversized_stream_is_decode_error() {
        let zeros = vec![0u8; 1024 * 1024];
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        for _ in 0..=(MAX_DECOMPRESSED_BYTES / zeros.len() as u64) {
            encoder.write_all(&zeros).unwrap();
        }
        let bomb = encoder.finish().unwrap();

        let err = decode_manifest_binary(&bomb).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        assert!(err.to_string().contains("exceeds"));
    }
}
