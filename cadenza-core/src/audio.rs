// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `audio` module provides the mono sample buffer that glues segments together, and the
//! descriptor for foreign channel memory the codec segments translate.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::errors::{invalid_value_error, out_of_memory_error, Result};
use crate::sample::SampleFormat;

/// The default buffer capacity in samples. Sized for the largest batch a mixer is expected to
/// drive; processing more samples than a wired buffer can hold in a single batch is a caller
/// error.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// A fixed-capacity store of single-precision samples. Mono by convention; a multi-channel
/// signal is carried as one buffer per channel. A buffer is plain data and holds no processing
/// state.
pub struct SampleBuffer {
    data: Vec<f32>,
}

impl SampleBuffer {
    /// Allocates a zero-filled buffer of `capacity` samples.
    pub fn new(capacity: usize) -> Result<SampleBuffer> {
        let mut data = Vec::new();
        if data.try_reserve_exact(capacity).is_err() {
            return out_of_memory_error();
        }
        data.resize(capacity, 0.0);
        Ok(SampleBuffer { data })
    }

    /// The buffer capacity in samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gets an immutable slice of all samples.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Gets a mutable slice of all samples.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Copies as many samples into `dst` as the smaller of the two buffers holds.
    pub fn copy_to(&self, dst: &mut SampleBuffer) {
        let n = self.data.len().min(dst.data.len());
        dst.data[..n].copy_from_slice(&self.data[..n]);
    }

    /// Zero-fills the buffer.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}

/// A shared handle to a sample buffer. The pipeline runs on one thread; segments hold non-owning
/// clones of the handle and the caller retains ownership.
pub type BufferRef = Rc<RefCell<SampleBuffer>>;

/// Allocates a buffer of `capacity` samples and wraps it into a shared handle.
pub fn make_buffer(capacity: usize) -> Result<BufferRef> {
    Ok(Rc::new(RefCell::new(SampleBuffer::new(capacity)?)))
}

/// Borrows the buffer behind a handle for reading. Fails with `InvalidValue` instead of
/// panicking when the buffer is already borrowed for writing, which happens when one buffer is
/// wired into conflicting slots of a segment.
pub fn read_buffer(buffer: &BufferRef) -> Result<Ref<'_, SampleBuffer>> {
    match buffer.try_borrow() {
        Ok(guard) => Ok(guard),
        Err(_) => invalid_value_error(),
    }
}

/// Borrows the buffer behind a handle for writing. Fails with `InvalidValue` instead of
/// panicking on conflicting wiring.
pub fn write_buffer(buffer: &BufferRef) -> Result<RefMut<'_, SampleBuffer>> {
    match buffer.try_borrow_mut() {
        Ok(guard) => Ok(guard),
        Err(_) => invalid_value_error(),
    }
}

/// The packing order of channels within a blob of encoded frames.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Channels alternate within a frame: the sample of channel `c` in frame `i` lives at
    /// element `i * channels + c`.
    Interleaved,
    /// Channels are stored one after the other: the sample of channel `c` in frame `i` lives at
    /// element `c * frames + i`.
    Planar,
}

/// `ChannelDesc` describes a region of foreign sample memory: its encoding, channel count,
/// packing order, and sample rate. The codec segments translate it; they never resize it. The
/// byte region is shared so that the caller can refill it between batches while the segments
/// hold a handle to it. All multi-byte encodings are little-endian.
#[derive(Clone)]
pub struct ChannelDesc {
    /// The shared byte region holding the encoded frames.
    pub data: Rc<RefCell<Vec<u8>>>,
    /// The wire encoding of each sample.
    pub format: SampleFormat,
    /// The number of channels in each frame. Must be at least one.
    pub channels: usize,
    /// How channels are packed into the region.
    pub layout: ChannelLayout,
    /// The sampling rate of the signal in hertz (Hz).
    pub rate: u32,
}

impl ChannelDesc {
    pub fn new(
        data: Rc<RefCell<Vec<u8>>>,
        format: SampleFormat,
        channels: usize,
        layout: ChannelLayout,
        rate: u32,
    ) -> ChannelDesc {
        ChannelDesc { data, format, channels, layout, rate }
    }

    /// The number of whole frames the byte region can hold.
    pub fn frames(&self) -> usize {
        self.data.borrow().len() / (self.format.size_of() * self.channels.max(1))
    }
}
