// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `mixer` module drives an ordered set of segments in fixed-size batches.
//!
//! The mixer is not a scheduler: segments run in insertion order, each seeing the buffer
//! contents its predecessors wrote in the same batch. Correct wiring is the caller's contract;
//! the mixer validates only structural invariants.

use log::{debug, warn};

use crate::errors::{invalid_index_error, not_initialized_error, Error, Result};
use crate::segment::{same_segment, SegmentRef};

/// An ordered collection of segments sharing one sample rate. The mixer owns nothing but
/// handles; dropping it leaves buffers and segments alive.
pub struct Mixer {
    segments: Vec<SegmentRef>,
    rate: u32,
    started: bool,
}

impl Mixer {
    /// Creates an empty mixer operating at the given sample rate.
    pub fn new(rate: u32) -> Mixer {
        Mixer { segments: Vec::new(), rate, started: false }
    }

    /// The sample rate every segment is driven at.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// The number of segments in the mixer.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the mixer holds no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments in insertion order.
    pub fn segments(&self) -> &[SegmentRef] {
        &self.segments
    }

    /// Appends a segment. A segment may appear in the mixer at most once; adding it again fails
    /// with `InvalidIndex` and leaves the mixer untouched.
    pub fn add(&mut self, segment: &SegmentRef) -> Result<()> {
        if self.segments.iter().any(|s| same_segment(s, segment)) {
            return invalid_index_error();
        }
        self.segments.push(segment.clone());
        Ok(())
    }

    /// Removes a segment, preserving the relative order of the survivors. Fails with
    /// `InvalidIndex` if the segment is not present.
    pub fn remove(&mut self, segment: &SegmentRef) -> Result<()> {
        match self.segments.iter().position(|s| same_segment(s, segment)) {
            Some(at) => {
                self.segments.remove(at);
                Ok(())
            }
            None => invalid_index_error(),
        }
    }

    /// Starts every segment in insertion order. If a segment fails to start, every segment that
    /// did start is ended again in reverse order and the originating error is surfaced.
    pub fn start(&mut self) -> Result<()> {
        for (at, segment) in self.segments.iter().enumerate() {
            match segment.borrow_mut().start() {
                Ok(()) | Err(Error::NotImplemented) => (),
                Err(err) => {
                    debug!("mixer start failed at segment {}, unwinding: {}", at, err);
                    for started in self.segments[..at].iter().rev() {
                        match started.borrow_mut().end() {
                            Ok(()) | Err(Error::NotImplemented) => (),
                            Err(end_err) => warn!("segment failed to end while unwinding: {}", end_err),
                        }
                    }
                    return Err(err);
                }
            }
        }
        self.started = true;
        Ok(())
    }

    /// Runs one batch of `samples` samples through every segment in insertion order. The first
    /// failure aborts the batch; downstream buffers are left with partially processed samples
    /// and the caller must assume the batch is lost.
    pub fn mix(&mut self, samples: usize) -> Result<()> {
        if !self.started {
            return not_initialized_error();
        }
        for segment in &self.segments {
            segment.borrow_mut().mix(samples, self.rate)?;
        }
        Ok(())
    }

    /// Ends every segment in insertion order. Failures are logged and aggregated so that `end`
    /// runs for every segment; the first real error is surfaced afterwards.
    pub fn end(&mut self) -> Result<()> {
        let mut first_err = None;
        for segment in &self.segments {
            match segment.borrow_mut().end() {
                Ok(()) | Err(Error::NotImplemented) => (),
                Err(err) => {
                    warn!("segment failed to end: {}", err);
                    first_err.get_or_insert(err);
                }
            }
        }
        self.started = false;
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
