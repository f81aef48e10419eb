//! # Evlog Transport
//!
//! Lock-free many-producer, single-reader ring buffer carrying event frames
//! from instrumented threads to the drain agent.
//!
//! ## Features
//!
//! - Wait-free claim for producers; a full buffer reports `Ok(None)`
//! - Claim / commit / abort so payloads are encoded in place
//! - Batched reads bounded by a frame limit
//! - Consumed space is zeroed and reclaimed only after handlers return
//!
//! ## Example
//!
//! ```rust
//! use evlog_transport::RingBuffer;
//!
//! let ring = RingBuffer::new(1024, 256).unwrap();
//!
//! let mut handle = ring.try_claim(7, 5).unwrap().expect("space available");
//! handle.buffer_mut().copy_from_slice(b"hello");
//! handle.commit();
//!
//! let read = ring.read(|type_id, payload| {
//!     assert_eq!(type_id, 7);
//!     assert_eq!(payload, b"hello");
//! }, 10);
//! assert_eq!(read, 1);
//! ```

pub mod error;
pub mod frame;
pub mod ring;

// Re-export main types
pub use error::RingBufferError;
pub use frame::{HEADER_LENGTH, PADDING_TYPE_ID, frame_length};
pub use ring::{MIN_CAPACITY, RingBuffer, WriteHandle};
