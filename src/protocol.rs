//! Record batch encoding and decoding.
//!
//! # RecordBatch Layout
//!
//! ```text
//! Offset  Size  Field
//! 0       8     base_offset
//! 8       4     batch_length (bytes following this field)
//! 12      4     partition_leader_epoch (-1)
//! 16      1     magic (2)
//! 17      4     crc (CRC-32C over bytes 21..end)
//! 21      2     attributes (bits 0-2: compression codec)
//! 23      4     last_offset_delta
//! 27      8     first_timestamp
//! 35      8     max_timestamp
//! 43      8     producer_id (-1)
//! 51      2     producer_epoch (-1)
//! 53      4     base_sequence (-1)
//! 57      4     record_count
//! 61      ...   records, or one compressed block holding them
//! ```
//!
//! Records use a fixed-width envelope:
//!
//! ```text
//! length          i32   bytes following this field
//! attributes      i8
//! timestamp_delta i32
//! offset_delta    i32
//! key_length      i32   -1 = no key
//! key             bytes
//! value_length    i32   -1 = null value
//! value           bytes
//! header_count    i32
//! headers         (i32 length + key, i32 length + value) * header_count
//! ```

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use nom::{
    IResult,
    bytes::complete::take,
    number::complete::{be_i8, be_i32},
};
use nombytes::NomBytes;

use crate::constants::{
    BATCH_CRC_DATA_START, BATCH_CRC_OFFSET, BATCH_HEADER_SIZE, BATCH_LOG_OVERHEAD,
    BATCH_MAGIC_OFFSET, COMPRESSION_CODEC_MASK, MAX_DECOMPRESSED_SIZE, RECORD_BATCH_MAGIC,
    RECORD_FIXED_OVERHEAD,
};
use crate::error::{Error, Result};

// CRC-32C polynomial (Castagnoli), reflected
const CRC32C_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0x82F63B78;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Compute a CRC-32C checksum.
pub fn crc32c(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32C_TABLE[index];
    }
    !crc
}

/// Result of CRC validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcValidationResult {
    /// CRC is valid.
    Valid,
    /// CRC is invalid.
    Invalid { expected: u32, actual: u32 },
    /// Batch is too small to contain CRC.
    TooSmall,
}

/// Validate the CRC-32C checksum of a record batch.
///
/// The stored CRC is at bytes 17-20 (big-endian) and covers bytes 21 to the
/// end of the batch.
///
/// # Example
/// ```
/// use minnow::protocol::{validate_batch_crc, CrcValidationResult};
///
/// let batch = vec![0u8; 10];
/// assert_eq!(validate_batch_crc(&batch), CrcValidationResult::TooSmall);
/// ```
pub fn validate_batch_crc(batch: &[u8]) -> CrcValidationResult {
    if batch.len() < BATCH_CRC_DATA_START {
        return CrcValidationResult::TooSmall;
    }

    let stored_crc = u32::from_be_bytes([
        batch[BATCH_CRC_OFFSET],
        batch[BATCH_CRC_OFFSET + 1],
        batch[BATCH_CRC_OFFSET + 2],
        batch[BATCH_CRC_OFFSET + 3],
    ]);
    let computed_crc = crc32c(&batch[BATCH_CRC_DATA_START..]);

    if stored_crc == computed_crc {
        CrcValidationResult::Valid
    } else {
        CrcValidationResult::Invalid {
            expected: stored_crc,
            actual: computed_crc,
        }
    }
}

/// Compression codec stored in bits 0-2 of the batch attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    /// Extract the codec from record batch attributes.
    pub fn from_attributes(attributes: i16) -> Result<Self> {
        match attributes & COMPRESSION_CODEC_MASK {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Snappy),
            3 => Ok(Compression::Lz4),
            4 => Ok(Compression::Zstd),
            other => Err(Error::CorruptBatch(format!(
                "unknown compression codec {}",
                other
            ))),
        }
    }

    pub fn codec_id(&self) -> i16 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Snappy => 2,
            Compression::Lz4 => 3,
            Compression::Zstd => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(data)
                    .map_err(|e| Error::Compression(format!("gzip compress: {e}")))?;
                encoder
                    .finish()
                    .map_err(|e| Error::Compression(format!("gzip compress: {e}")))
            }
            Compression::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
            Compression::Snappy | Compression::Zstd => Err(self.unsupported()),
        }
    }

    /// Inflate a compressed record block, refusing output larger than
    /// [`MAX_DECOMPRESSED_SIZE`].
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decompress_with_limit(data, MAX_DECOMPRESSED_SIZE)
    }

    pub(crate) fn decompress_with_limit(&self, data: &[u8], limit: usize) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Gzip => {
                let mut decoder = flate2::read::GzDecoder::new(data).take(limit as u64 + 1);
                let mut decompressed = Vec::new();
                decoder
                    .read_to_end(&mut decompressed)
                    .map_err(|e| Error::Compression(format!("gzip decompress: {e}")))?;
                if decompressed.len() > limit {
                    return Err(Self::too_large(limit));
                }
                Ok(decompressed)
            }
            Compression::Lz4 => {
                // Size prefix is a little-endian u32 written by the producer
                let declared = match data.get(..4) {
                    Some(prefix) => {
                        u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]])
                    }
                    None => {
                        return Err(Error::Compression(
                            "lz4 decompress: missing size prefix".to_string(),
                        ));
                    }
                };
                if declared as usize > limit {
                    return Err(Self::too_large(limit));
                }
                lz4_flex::decompress_size_prepended(data)
                    .map_err(|e| Error::Compression(format!("lz4 decompress: {e}")))
            }
            Compression::Snappy | Compression::Zstd => Err(self.unsupported()),
        }
    }

    fn too_large(limit: usize) -> Error {
        Error::Compression(format!("decompressed block exceeds {limit} bytes"))
    }

    fn unsupported(&self) -> Error {
        Error::Compression(format!("{} codec is not supported", self.as_str()))
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the codecs this broker can produce are accepted by name.
impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "lz4" => Ok(Compression::Lz4),
            other => Err(Error::Config(format!(
                "unknown compression codec '{}'. Supported: none, gzip, lz4",
                other
            ))),
        }
    }
}

/// A decoded record batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    pub base_offset: i64,
    pub compression: Compression,
    pub first_timestamp: i64,
    pub max_timestamp: i64,
    /// Record values in offset order. A null value decodes as empty.
    pub payloads: Vec<Bytes>,
}

impl RecordBatch {
    /// Encode `payloads` as one batch stamped with the current wall clock.
    ///
    /// An empty payload list encodes to an empty record set.
    pub fn encode<P: AsRef<[u8]>>(
        base_offset: i64,
        payloads: &[P],
        compression: Compression,
    ) -> Result<Bytes> {
        let now = chrono::Utc::now().timestamp_millis();
        Self::encode_with_timestamp(base_offset, payloads, compression, now)
    }

    pub fn encode_with_timestamp<P: AsRef<[u8]>>(
        base_offset: i64,
        payloads: &[P],
        compression: Compression,
        timestamp: i64,
    ) -> Result<Bytes> {
        if payloads.is_empty() {
            return Ok(Bytes::new());
        }

        let mut records = BytesMut::new();
        for (delta, payload) in payloads.iter().enumerate() {
            encode_record(&mut records, delta as i32, payload.as_ref());
        }
        let records = compression.compress(&records)?;

        let record_count = payloads.len() as i32;
        let mut batch = BytesMut::with_capacity(BATCH_HEADER_SIZE + records.len());
        batch.put_i64(base_offset);
        batch.put_i32((BATCH_HEADER_SIZE - BATCH_LOG_OVERHEAD + records.len()) as i32);
        batch.put_i32(-1); // partition leader epoch
        batch.put_i8(RECORD_BATCH_MAGIC);
        batch.put_u32(0); // crc, patched below
        batch.put_i16(compression.codec_id());
        batch.put_i32(record_count - 1);
        batch.put_i64(timestamp);
        batch.put_i64(timestamp);
        batch.put_i64(-1); // producer id
        batch.put_i16(-1); // producer epoch
        batch.put_i32(-1); // base sequence
        batch.put_i32(record_count);
        batch.put_slice(&records);

        let crc = crc32c(&batch[BATCH_CRC_DATA_START..]);
        batch[BATCH_CRC_OFFSET..BATCH_CRC_DATA_START].copy_from_slice(&crc.to_be_bytes());

        Ok(batch.freeze())
    }

    /// Decode exactly one batch occupying all of `batch`.
    pub fn decode(batch: &[u8]) -> Result<Self> {
        if batch.len() < BATCH_HEADER_SIZE {
            return Err(Error::CorruptBatch(format!(
                "batch of {} bytes is shorter than the {} byte header",
                batch.len(),
                BATCH_HEADER_SIZE
            )));
        }

        let batch_length = read_i32(batch, 8);
        if batch_length < 0 || batch_length as usize != batch.len() - BATCH_LOG_OVERHEAD {
            return Err(Error::CorruptBatch(format!(
                "batch length {} does not match {} available bytes",
                batch_length,
                batch.len() - BATCH_LOG_OVERHEAD
            )));
        }

        let magic = batch[BATCH_MAGIC_OFFSET] as i8;
        if magic != RECORD_BATCH_MAGIC {
            return Err(Error::CorruptBatch(format!("unsupported magic {}", magic)));
        }

        if let CrcValidationResult::Invalid { expected, actual } = validate_batch_crc(batch) {
            return Err(Error::CorruptBatch(format!(
                "crc mismatch: stored {:#010x}, computed {:#010x}",
                expected, actual
            )));
        }

        let base_offset = read_i64(batch, 0);
        let attributes = i16::from_be_bytes([batch[21], batch[22]]);
        let compression = Compression::from_attributes(attributes)?;
        let first_timestamp = read_i64(batch, 27);
        let max_timestamp = read_i64(batch, 35);
        let record_count = read_i32(batch, 57);
        if record_count < 0 {
            return Err(Error::CorruptBatch(format!(
                "negative record count {}",
                record_count
            )));
        }

        let records = compression.decompress(&batch[BATCH_HEADER_SIZE..])?;
        let payloads = decode_records(Bytes::from(records), record_count as usize)?;

        Ok(RecordBatch {
            base_offset,
            compression,
            first_timestamp,
            max_timestamp,
            payloads,
        })
    }

    /// Decode a record set holding zero or more concatenated batches.
    pub fn decode_all(data: &[u8]) -> Result<Vec<Self>> {
        let mut batches = Vec::new();
        let mut rest = data;

        while !rest.is_empty() {
            if rest.len() < BATCH_LOG_OVERHEAD {
                return Err(Error::CorruptBatch(format!(
                    "{} trailing bytes after last batch",
                    rest.len()
                )));
            }
            let batch_length = read_i32(rest, 8);
            let total = BATCH_LOG_OVERHEAD as i64 + batch_length as i64;
            if batch_length < 0 || total > rest.len() as i64 {
                return Err(Error::CorruptBatch(format!(
                    "batch length {} exceeds {} remaining bytes",
                    batch_length,
                    rest.len() - BATCH_LOG_OVERHEAD
                )));
            }
            let (head, tail) = rest.split_at(total as usize);
            batches.push(Self::decode(head)?);
            rest = tail;
        }

        Ok(batches)
    }

    pub fn record_count(&self) -> usize {
        self.payloads.len()
    }
}

fn read_i32(data: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_i64(data: &[u8], at: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[at..at + 8]);
    i64::from_be_bytes(raw)
}

fn encode_record(buffer: &mut BytesMut, offset_delta: i32, value: &[u8]) {
    buffer.put_i32((RECORD_FIXED_OVERHEAD + value.len()) as i32);
    buffer.put_i8(0); // attributes
    buffer.put_i32(0); // timestamp delta
    buffer.put_i32(offset_delta);
    buffer.put_i32(-1); // no key
    buffer.put_i32(value.len() as i32);
    buffer.put_slice(value);
    buffer.put_i32(0); // no headers
}

fn decode_records(records: Bytes, count: usize) -> Result<Vec<Bytes>> {
    let mut input = NomBytes::new(records);
    let mut payloads = Vec::with_capacity(count.min(crate::constants::MAX_PROTOCOL_ARRAY_SIZE));

    for index in 0..count {
        let (rest, value) = parse_record(input).map_err(|_| {
            Error::CorruptBatch(format!("record {} of {} is malformed", index, count))
        })?;
        payloads.push(value);
        input = rest;
    }

    let trailing = input.into_bytes().len();
    if trailing != 0 {
        return Err(Error::CorruptBatch(format!(
            "{} bytes follow the declared {} records",
            trailing, count
        )));
    }

    Ok(payloads)
}

/// Parse a length-delimited blob where a negative length means absent.
fn parse_optional_blob(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, length) = be_i32(s)?;
    if length < 0 {
        return Ok((s, Bytes::new()));
    }
    let (s, blob) = take(length as usize)(s)?;
    Ok((s, blob.into_bytes()))
}

fn parse_record(s: NomBytes) -> IResult<NomBytes, Bytes> {
    let (s, length) = be_i32(s)?;
    if length < 0 {
        return Err(nom::Err::Failure(nom::error::Error::new(
            s,
            nom::error::ErrorKind::LengthValue,
        )));
    }
    let (rest, body) = take(length as usize)(s)?;

    let (body, _attributes) = be_i8(body)?;
    let (body, _timestamp_delta) = be_i32(body)?;
    let (body, _offset_delta) = be_i32(body)?;
    let (body, _key) = parse_optional_blob(body)?;
    let (body, value) = parse_optional_blob(body)?;
    let (mut body, header_count) = be_i32(body)?;
    for _ in 0..header_count.max(0) {
        let (b, _header_key) = parse_optional_blob(body)?;
        let (b, _header_value) = parse_optional_blob(b)?;
        body = b;
    }

    Ok((rest, value))
}
