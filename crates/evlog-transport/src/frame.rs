//! Frame layout
//!
//! ```text
//! 0       4       8
//! +-------+-------+------------------+---------+
//! | type  | length| payload ...      | padding |
//! +-------+-------+------------------+---------+
//! ```
//!
//! `type` is written last with release ordering and is the commit marker:
//! `0` means the frame is claimed but not yet visible, [`PADDING_TYPE_ID`]
//! marks space to skip. `length` is the payload length. Frames start on
//! [`FRAME_ALIGNMENT`] boundaries so both header words can be accessed
//! atomically.

/// Bytes occupied by the frame header
pub const HEADER_LENGTH: usize = 8;

/// Alignment of every frame start
pub const FRAME_ALIGNMENT: usize = 8;

/// Offset of the type id within the header
pub const TYPE_OFFSET: usize = 0;

/// Offset of the payload length within the header
pub const LENGTH_OFFSET: usize = 4;

/// Type id of padding frames, skipped by the reader
pub const PADDING_TYPE_ID: i32 = -1;

/// Round `value` up to the next multiple of `alignment` (a power of two)
#[inline]
pub const fn align(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Total aligned size of a frame carrying `payload_length` bytes
#[inline]
pub const fn frame_length(payload_length: usize) -> usize {
    align(HEADER_LENGTH + payload_length, FRAME_ALIGNMENT)
}
