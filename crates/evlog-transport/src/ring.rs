//! Many-to-one ring buffer
//!
//! Producers reserve space by advancing the tail with a compare-and-swap,
//! write their payload into the reserved region and then publish it by
//! storing the frame type with release ordering. The single reader walks
//! forward from the head, stops at the first frame that is not yet
//! published, and only advances the head (after zeroing the consumed bytes)
//! once the handlers for those frames have returned.
//!
//! Producers never wait: if the free space between tail and head is too
//! small, [`RingBuffer::try_claim`] returns `Ok(None)` and the caller decides
//! what to do with the event.
//!
//! A producer that claims and then stalls before committing holds the reader
//! at that frame until it commits or aborts. Frames claimed after it are not
//! lost, only delayed.

use std::cell::UnsafeCell;
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::error::RingBufferError;
use crate::frame::{
    FRAME_ALIGNMENT, HEADER_LENGTH, LENGTH_OFFSET, PADDING_TYPE_ID, TYPE_OFFSET, frame_length,
};

/// Smallest accepted capacity: room for two empty frames
pub const MIN_CAPACITY: usize = 2 * HEADER_LENGTH;

/// Fixed-capacity, lock-free, many-producer single-reader frame buffer
pub struct RingBuffer {
    /// 8-byte words so every frame header is naturally aligned
    buffer: Box<[UnsafeCell<u64>]>,
    capacity: usize,
    mask: usize,
    max_payload_length: usize,
    /// Producer position: bytes ever claimed
    tail: CachePadded<AtomicUsize>,
    /// Consumer position: bytes ever consumed
    head: CachePadded<AtomicUsize>,
    reading: CachePadded<AtomicBool>,
}

// SAFETY: the byte buffer is only written through regions a producer owns
// exclusively between a successful tail CAS and publishing the frame type,
// and only read (then zeroed) by the single reader after an acquire load of
// that type. Head and tail are atomics, so the happens-before edges cover
// every non-atomic access.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Create a ring buffer
    ///
    /// `capacity` must be a power of two no smaller than [`MIN_CAPACITY`], and
    /// a frame carrying `max_payload_length` bytes must fit in half of it.
    /// A larger frame would not fit on either side of the wrap point of an
    /// empty buffer whose tail sits mid-way.
    pub fn new(capacity: usize, max_payload_length: usize) -> Result<Self, RingBufferError> {
        if capacity < MIN_CAPACITY || !capacity.is_power_of_two() {
            return Err(RingBufferError::InvalidCapacity {
                capacity,
                min: MIN_CAPACITY,
            });
        }
        if max_payload_length > i32::MAX as usize
            || frame_length(max_payload_length) > capacity / 2
        {
            return Err(RingBufferError::InvalidMaxPayloadLength {
                max_payload_length,
                capacity,
            });
        }

        let buffer = (0..capacity / FRAME_ALIGNMENT)
            .map(|_| UnsafeCell::new(0u64))
            .collect();

        Ok(Self {
            buffer,
            capacity,
            mask: capacity - 1,
            max_payload_length,
            tail: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(AtomicUsize::new(0)),
            reading: CachePadded::new(AtomicBool::new(false)),
        })
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest payload a single frame may carry
    pub fn max_payload_length(&self) -> usize {
        self.max_payload_length
    }

    /// Total bytes claimed by producers so far
    pub fn producer_position(&self) -> usize {
        self.tail.load(Ordering::Acquire)
    }

    /// Total bytes consumed by the reader so far
    pub fn consumer_position(&self) -> usize {
        self.head.load(Ordering::Acquire)
    }

    /// Bytes currently claimed but not yet consumed
    pub fn size(&self) -> usize {
        loop {
            let head_before = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            let head_after = self.head.load(Ordering::Acquire);
            if head_before == head_after {
                return tail.wrapping_sub(head_after);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Reserve a frame for `length` payload bytes
    ///
    /// Returns `Ok(None)` when there is not enough free space; this never
    /// waits. The returned handle must be committed or aborted; dropping it
    /// aborts.
    pub fn try_claim(
        &self,
        type_id: i32,
        length: usize,
    ) -> Result<Option<WriteHandle<'_>>, RingBufferError> {
        if type_id <= 0 {
            return Err(RingBufferError::InvalidMessageType(type_id));
        }
        if length > self.max_payload_length {
            return Err(RingBufferError::MessageTooLarge {
                size: length,
                max: self.max_payload_length,
            });
        }

        let Some(index) = self.claim_capacity(frame_length(length)) else {
            return Ok(None);
        };
        self.length_at(index).store(length as i32, Ordering::Relaxed);

        Ok(Some(WriteHandle {
            ring: self,
            index,
            type_id,
            length,
            published: false,
        }))
    }

    /// Claim, copy and commit in one step
    ///
    /// Returns `Ok(false)` when the buffer is full.
    pub fn write(&self, type_id: i32, payload: &[u8]) -> Result<bool, RingBufferError> {
        match self.try_claim(type_id, payload.len())? {
            Some(mut handle) => {
                handle.buffer_mut().copy_from_slice(payload);
                handle.commit();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Read up to `frame_limit` published frames
    ///
    /// Padding frames are skipped and not counted. The head advances past
    /// every frame visited, including one whose handler panicked. Only one
    /// read runs at a time; a concurrent call returns 0 without reading.
    pub fn read<F>(&self, mut handler: F, frame_limit: usize) -> usize
    where
        F: FnMut(i32, &[u8]),
    {
        if self
            .reading
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return 0;
        }

        let mut progress = ReadProgress {
            ring: self,
            head: self.head.load(Ordering::Relaxed),
            bytes_read: 0,
        };
        let mut frames = 0;

        while frames < frame_limit && progress.bytes_read < self.capacity {
            let index = progress.head.wrapping_add(progress.bytes_read) & self.mask;
            let type_id = self.type_at(index).load(Ordering::Acquire);
            if type_id == 0 {
                break;
            }

            let length = self.length_at(index).load(Ordering::Relaxed) as usize;
            progress.bytes_read += frame_length(length);
            if type_id == PADDING_TYPE_ID {
                continue;
            }

            frames += 1;
            // SAFETY: the frame was published (acquire load above) and the
            // head has not moved past it, so no producer can touch it.
            let payload =
                unsafe { slice::from_raw_parts(self.base().add(index + HEADER_LENGTH), length) };
            handler(type_id, payload);
        }

        frames
    }

    /// Advance the tail by `required` bytes, returning the frame index
    fn claim_capacity(&self, required: usize) -> Option<usize> {
        loop {
            // Head first: the tail read after it can never be behind it
            let head = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            // A span wider than the buffer means the reader moved on between
            // the two loads; take a fresh snapshot.
            let Some(available) = self.capacity.checked_sub(tail.wrapping_sub(head)) else {
                std::hint::spin_loop();
                continue;
            };
            if required > available {
                return None;
            }

            let tail_index = tail & self.mask;
            let to_end = self.capacity - tail_index;
            let mut padding = 0;
            if required > to_end {
                // The frame goes to the start of the buffer, which must
                // already be consumed up to the head.
                if required > head & self.mask {
                    return None;
                }
                padding = to_end;
            }

            if self
                .tail
                .compare_exchange_weak(
                    tail,
                    tail.wrapping_add(required + padding),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                if padding == 0 {
                    return Some(tail_index);
                }
                self.length_at(tail_index)
                    .store((padding - HEADER_LENGTH) as i32, Ordering::Relaxed);
                self.type_at(tail_index)
                    .store(PADDING_TYPE_ID, Ordering::Release);
                return Some(0);
            }
        }
    }

    #[inline]
    fn base(&self) -> *mut u8 {
        self.buffer.as_ptr() as *mut u8
    }

    #[inline]
    fn type_at(&self, index: usize) -> &AtomicI32 {
        self.header_word(index + TYPE_OFFSET)
    }

    #[inline]
    fn length_at(&self, index: usize) -> &AtomicI32 {
        self.header_word(index + LENGTH_OFFSET)
    }

    #[inline]
    fn header_word(&self, offset: usize) -> &AtomicI32 {
        debug_assert!(offset % 4 == 0 && offset + 4 <= self.capacity);
        // SAFETY: offset is 4-byte aligned and in bounds, and the memory sits
        // in an UnsafeCell owned by self.
        unsafe { AtomicI32::from_ptr(self.base().add(offset) as *mut i32) }
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("max_payload_length", &self.max_payload_length)
            .field("producer_position", &self.producer_position())
            .field("consumer_position", &self.consumer_position())
            .finish()
    }
}

/// Zeroes consumed bytes and advances the head when a read ends
struct ReadProgress<'a> {
    ring: &'a RingBuffer,
    head: usize,
    bytes_read: usize,
}

impl Drop for ReadProgress<'_> {
    fn drop(&mut self) {
        let ring = self.ring;
        if self.bytes_read > 0 {
            let start = self.head & ring.mask;
            let first = self.bytes_read.min(ring.capacity - start);
            // SAFETY: these bytes belong to frames the reader just consumed;
            // producers cannot claim them until the head store below.
            unsafe {
                ptr::write_bytes(ring.base().add(start), 0, first);
                if self.bytes_read > first {
                    ptr::write_bytes(ring.base(), 0, self.bytes_read - first);
                }
            }
            ring.head
                .store(self.head.wrapping_add(self.bytes_read), Ordering::Release);
        }
        ring.reading.store(false, Ordering::Release);
    }
}

/// A claimed, not yet published frame
///
/// Exclusively owned by the claiming producer. Dropping it without calling
/// [`commit`](Self::commit) aborts the frame so the reader skips it.
#[must_use = "a claimed frame must be committed or aborted"]
pub struct WriteHandle<'a> {
    ring: &'a RingBuffer,
    index: usize,
    type_id: i32,
    length: usize,
    published: bool,
}

impl WriteHandle<'_> {
    /// Type id the frame will be published with
    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    /// Payload length reserved
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The reserved payload region
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        // SAFETY: the region was reserved by the tail CAS and is not visible
        // to the reader until published.
        unsafe {
            slice::from_raw_parts_mut(
                self.ring.base().add(self.index + HEADER_LENGTH),
                self.length,
            )
        }
    }

    /// Publish the frame to the reader
    pub fn commit(mut self) {
        self.publish(self.type_id);
    }

    /// Turn the frame into padding the reader skips
    pub fn abort(mut self) {
        self.publish(PADDING_TYPE_ID);
    }

    fn publish(&mut self, type_id: i32) {
        self.ring.type_at(self.index).store(type_id, Ordering::Release);
        self.published = true;
    }
}

impl Drop for WriteHandle<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.publish(PADDING_TYPE_ID);
        }
    }
}
