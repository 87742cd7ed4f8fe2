//! Protocol, network and persistence constants.
//!
//! # Categories
//!
//! - **Protocol Constants**: wire sizes, limits and record batch field offsets
//! - **Network Constants**: framing limits and timeouts
//! - **Persistence Constants**: snapshot file names

// =============================================================================
// Protocol Constants
// =============================================================================

/// Size of a record batch header, from `base_offset` through `record_count`.
///
/// - baseOffset (8 bytes)
/// - batchLength (4 bytes)
/// - partitionLeaderEpoch (4 bytes)
/// - magic (1 byte)
/// - crc (4 bytes)
/// - attributes (2 bytes)
/// - lastOffsetDelta (4 bytes)
/// - firstTimestamp (8 bytes)
/// - maxTimestamp (8 bytes)
/// - producerId (8 bytes)
/// - producerEpoch (2 bytes)
/// - baseSequence (4 bytes)
/// - recordCount (4 bytes)
///
/// Total: 61 bytes
pub const BATCH_HEADER_SIZE: usize = 61;

/// Bytes preceding the `batch_length` payload (base offset + length field).
pub const BATCH_LOG_OVERHEAD: usize = 12;

// -----------------------------------------------------------------------------
// RecordBatch Header Field Offsets
// -----------------------------------------------------------------------------

/// Offset of the magic byte.
pub const BATCH_MAGIC_OFFSET: usize = 16;

/// Offset of the CRC field (4 bytes, u32 big-endian).
pub const BATCH_CRC_OFFSET: usize = 17;

/// Start of the CRC-covered region (attributes field).
/// CRC is computed over bytes [21..end] of the batch.
pub const BATCH_CRC_DATA_START: usize = 21;

/// The only record batch format this broker reads or writes.
pub const RECORD_BATCH_MAGIC: i8 = 2;

/// Mask selecting the compression codec from the batch attributes.
pub const COMPRESSION_CODEC_MASK: i16 = 0x07;

/// Fixed part of a record following its length field:
/// attributes (1) + timestamp delta (4) + offset delta (4) + key length (4)
/// + value length (4) + header count (4).
pub const RECORD_FIXED_OVERHEAD: usize = 21;

/// Maximum allowed array size in protocol parsing.
///
/// Rejects requests that claim billions of elements before allocating.
pub const MAX_PROTOCOL_ARRAY_SIZE: usize = 100_000;

/// An unsigned varint encoding a `u32` spans at most five bytes.
pub const MAX_VARINT_BYTES: u32 = 5;

/// Size of the opaque topic id in Metadata responses.
pub const TOPIC_ID_SIZE: usize = 16;

// =============================================================================
// Network Constants
// =============================================================================

/// Maximum frame size accepted from a client (100 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Upper bound on the inflated size of one compressed record block.
///
/// A compressed batch may not expand beyond what an uncompressed frame could
/// carry.
pub const MAX_DECOMPRESSED_SIZE: usize = DEFAULT_MAX_MESSAGE_SIZE;

/// Default port for the broker listener.
pub const DEFAULT_PORT: u16 = 9092;

/// Default limit on the time between the first byte of a frame and its last.
pub const DEFAULT_FRAME_READ_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Persistence Constants
// =============================================================================

/// Snapshot of every partition log.
pub const PARTITION_LOGS_FILE: &str = "partition_logs.json";

/// Snapshot of every committed consumer offset.
pub const CONSUMER_OFFSETS_FILE: &str = "consumer_offsets.json";
