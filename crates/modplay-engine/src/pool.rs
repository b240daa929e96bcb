//! Fixed set of reusable PCM buffers.
//!
//! Buffers are moved, never shared: whoever holds a [`PcmBuffer`] owns it,
//! so a buffer queued on the device cannot be written by the engine until the
//! device hands it back.

use crate::error::DeviceError;
use tracing::warn;

/// One fixed-capacity PCM slot.
#[derive(Debug)]
pub struct PcmBuffer {
    data: Box<[u8]>,
    len: usize,
    index: usize,
}

impl PcmBuffer {
    /// Slot number within its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes of valid audio.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no audio.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid audio bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Iterate the valid audio as native-endian 16-bit samples.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes()
            .chunks_exact(2)
            .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
    }

    /// Replace the contents with `pcm`, truncating to capacity.
    ///
    /// Returns the number of bytes dropped.
    pub fn write(&mut self, pcm: &[u8]) -> usize {
        let len = pcm.len().min(self.data.len());
        self.data[..len].copy_from_slice(&pcm[..len]);
        self.len = len;
        pcm.len() - len
    }

    /// Mark the buffer empty.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Free list of engine-owned buffers.
#[derive(Debug, Default)]
pub struct BufferPool {
    free: Vec<PcmBuffer>,
    size: usize,
    capacity: usize,
}

impl BufferPool {
    /// Allocate `count` buffers of `capacity` bytes each.
    pub fn allocate(count: usize, capacity: usize) -> Result<Self, DeviceError> {
        let mut free = Vec::new();
        free.try_reserve_exact(count)
            .map_err(|e| DeviceError::Allocation(e.to_string()))?;
        for index in 0..count {
            let mut data = Vec::new();
            data.try_reserve_exact(capacity)
                .map_err(|e| DeviceError::Allocation(format!("buffer {index}: {e}")))?;
            data.resize(capacity, 0u8);
            free.push(PcmBuffer {
                data: data.into_boxed_slice(),
                len: 0,
                index,
            });
        }
        Ok(BufferPool {
            free,
            size: count,
            capacity,
        })
    }

    /// Number of buffers the pool was created with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Capacity of each buffer in bytes.
    pub fn buffer_capacity(&self) -> usize {
        self.capacity
    }

    /// Buffers currently owned by the engine.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Take a free buffer.
    pub fn acquire(&mut self) -> Option<PcmBuffer> {
        self.free.pop()
    }

    /// Return a buffer to the free list.
    pub fn release(&mut self, mut buffer: PcmBuffer) {
        if self.free.len() >= self.size {
            warn!(index = buffer.index, "buffer returned to a full pool");
            return;
        }
        buffer.clear();
        self.free.push(buffer);
    }
}
