// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `segment` module defines the contract every processing node of the pipeline implements,
//! along with the introspection structures a node describes itself with.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::audio::BufferRef;
use crate::errors::{invalid_value_error, not_implemented_error, Result};

/// The outcome of a successful mix call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MixStatus {
    /// The segment processed the batch and remains active.
    Ongoing,
    /// The segment has produced everything it ever will. Container segments use this to advance
    /// past it; it is distinct from both success and failure.
    Finished,
}

/// Addresses one of a segment's buffer slots. Locations are zero-based and dense up to the input
/// and output counts the segment reports in its [`SegmentInfo`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Port {
    Input(usize),
    Output(usize),
}

bitflags! {
    /// Direction and access qualifiers of an introspectable field.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct FieldFlags: u32 {
        /// The field pertains to an input slot.
        const IN = 0x01;
        /// The field pertains to an output slot.
        const OUT = 0x02;
        /// The field pertains to the segment as a whole.
        const SEGMENT = 0x04;
        /// The field may be read.
        const GET = 0x08;
        /// The field may be written.
        const SET = 0x10;
    }
}

/// Well-known field identifiers a caller can get or set on a segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    /// An indexed input or output buffer slot.
    Buffer,
    /// Whether the segment copies input to output without processing.
    Bypass,
    /// The sample rate the segment operates at.
    SampleRate,
    /// The pitch ratio of a pitch segment.
    PitchShift,
    /// A linear gain factor.
    Volume,
    /// A stereo panning factor in [-1, 1].
    Pan,
    /// The listener position of a spatialised segment.
    ListenerLocation,
    /// The source position of a spatialised segment.
    SourceLocation,
    /// The number of input slots a container segment exposes.
    InCount,
    /// The number of output slots a container segment exposes.
    OutCount,
    /// The child segment a container is currently running. Read-only.
    CurrentSegment,
}

/// The kind tag of a [`FieldValue`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    UInt,
    Float,
    Vector,
    Segment,
}

/// A dynamically typed field value.
#[derive(Clone)]
pub enum FieldValue {
    Bool(bool),
    UInt(usize),
    Float(f32),
    Vector([f32; 3]),
    Segment(Option<SegmentRef>),
}

impl FieldValue {
    /// The kind tag of the value.
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Bool(_) => ValueKind::Bool,
            FieldValue::UInt(_) => ValueKind::UInt,
            FieldValue::Float(_) => ValueKind::Float,
            FieldValue::Vector(_) => ValueKind::Vector,
            FieldValue::Segment(_) => ValueKind::Segment,
        }
    }

    /// Reads the value as a boolean, or fails with `InvalidValue`.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            FieldValue::Bool(v) => Ok(*v),
            _ => invalid_value_error(),
        }
    }

    /// Reads the value as an unsigned integer, or fails with `InvalidValue`.
    pub fn as_uint(&self) -> Result<usize> {
        match self {
            FieldValue::UInt(v) => Ok(*v),
            _ => invalid_value_error(),
        }
    }

    /// Reads the value as a float, or fails with `InvalidValue`.
    pub fn as_float(&self) -> Result<f32> {
        match self {
            FieldValue::Float(v) => Ok(*v),
            _ => invalid_value_error(),
        }
    }

    /// Reads the value as a 3-component vector, or fails with `InvalidValue`.
    pub fn as_vector(&self) -> Result<[f32; 3]> {
        match self {
            FieldValue::Vector(v) => Ok(*v),
            _ => invalid_value_error(),
        }
    }
}

/// Describes one introspectable field of a segment.
#[derive(Clone)]
pub struct FieldInfo {
    /// The field identifier.
    pub field: Field,
    /// The kind of value the field carries.
    pub kind: ValueKind,
    /// The number of elements of `kind` the field carries.
    pub count: usize,
    /// Direction and access qualifiers.
    pub flags: FieldFlags,
    /// A human-readable description of the field.
    pub description: &'static str,
}

/// An immutable descriptor of a segment: its display name, its input range and output count, and
/// the fields it exposes.
#[derive(Clone)]
pub struct SegmentInfo {
    /// A short display name.
    pub name: &'static str,
    /// A human-readable description of the segment's purpose.
    pub description: &'static str,
    /// The minimum number of inputs that must be wired before mixing.
    pub min_inputs: usize,
    /// The maximum number of inputs the segment can use. Never less than `min_inputs`.
    pub max_inputs: usize,
    /// The fixed number of outputs the segment produces.
    pub outputs: usize,
    /// The fields the segment exposes.
    pub fields: Vec<FieldInfo>,
}

/// The contract every processing node implements.
///
/// Lifecycle: `start` readies the segment, `mix` is called once per batch and is only valid
/// between `start` and `end`. A `mix` with zero samples must leave all state unchanged.
///
/// Operations a segment legitimately does not supply keep their default body and surface
/// [`NotImplemented`](crate::errors::Error::NotImplemented); callers must tolerate that on
/// `start`, `end`, `get` and `set`.
pub trait Segment {
    /// Describes the segment.
    fn info(&self) -> SegmentInfo;

    /// Readies the segment for a run of batches.
    fn start(&mut self) -> Result<()> {
        not_implemented_error()
    }

    /// Processes one batch of `samples` samples at the given rate.
    fn mix(&mut self, samples: usize, rate: u32) -> Result<MixStatus>;

    /// Finishes a run of batches.
    fn end(&mut self) -> Result<()> {
        not_implemented_error()
    }

    /// Wires a buffer into a slot, or unwires it when `buffer` is `None`.
    fn set_buffer(&mut self, _port: Port, _buffer: Option<BufferRef>) -> Result<()> {
        not_implemented_error()
    }

    /// Reads back the buffer wired into a slot.
    fn get_buffer(&self, _port: Port) -> Result<Option<BufferRef>> {
        not_implemented_error()
    }

    /// Reads a whole-segment field.
    fn get(&self, _field: Field) -> Result<FieldValue> {
        not_implemented_error()
    }

    /// Writes a whole-segment field. Structural failures leave the segment untouched.
    fn set(&mut self, _field: Field, _value: &FieldValue) -> Result<()> {
        not_implemented_error()
    }
}

/// A shared handle to a segment. Mixers and container segments hold non-owning clones; the
/// caller retains ownership. Two handles denote the same segment exactly when they point at the
/// same allocation.
pub type SegmentRef = Rc<RefCell<dyn Segment>>;

/// Wraps a segment into a shared handle.
pub fn make_segment<S: Segment + 'static>(segment: S) -> SegmentRef {
    Rc::new(RefCell::new(segment))
}

/// Returns `true` if both handles refer to the same segment.
pub fn same_segment(a: &SegmentRef, b: &SegmentRef) -> bool {
    Rc::ptr_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    struct Inert;

    impl Segment for Inert {
        fn info(&self) -> SegmentInfo {
            SegmentInfo {
                name: "inert",
                description: "Does nothing.",
                min_inputs: 0,
                max_inputs: 0,
                outputs: 0,
                fields: Vec::new(),
            }
        }

        fn mix(&mut self, _samples: usize, _rate: u32) -> Result<MixStatus> {
            Ok(MixStatus::Ongoing)
        }
    }

    #[test]
    fn verify_default_operations_surface_not_implemented() {
        let mut seg = Inert;
        assert_eq!(seg.start(), Err(Error::NotImplemented));
        assert_eq!(seg.end(), Err(Error::NotImplemented));
        assert!(matches!(seg.get(Field::Volume), Err(Error::NotImplemented)));
        assert_eq!(seg.set(Field::Volume, &FieldValue::Float(1.0)), Err(Error::NotImplemented));
        assert_eq!(seg.set_buffer(Port::Input(0), None), Err(Error::NotImplemented));
        assert!(matches!(seg.get_buffer(Port::Input(0)), Err(Error::NotImplemented)));
    }

    #[test]
    fn verify_value_accessors() {
        assert_eq!(FieldValue::Bool(true).as_bool(), Ok(true));
        assert_eq!(FieldValue::UInt(7).as_uint(), Ok(7));
        assert_eq!(FieldValue::Float(0.5).as_float(), Ok(0.5));
        assert_eq!(FieldValue::Vector([1.0, 2.0, 3.0]).as_vector(), Ok([1.0, 2.0, 3.0]));
        assert_eq!(FieldValue::Bool(true).as_float(), Err(Error::InvalidValue));
        assert_eq!(FieldValue::Float(0.5).kind(), ValueKind::Float);
    }

    #[test]
    fn verify_segment_identity() {
        let a = make_segment(Inert);
        let b = make_segment(Inert);
        assert!(same_segment(&a, &a.clone()));
        assert!(!same_segment(&a, &b));
    }
}
