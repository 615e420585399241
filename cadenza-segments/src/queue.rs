// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `queue` module provides a segment that runs child segments one after the other: the head
//! child processes every batch until it signals completion, at which point it is unlinked and
//! the next child takes over within the same batch. An empty queue passes its inputs through.
//!
//! Wiring invariant: a buffer installed at queue location `L` is wired at location `L` of every
//! child currently in the queue.

use log::debug;

use cadenza_core::audio::{read_buffer, write_buffer, BufferRef};
use cadenza_core::errors::{
    invalid_field_error, invalid_index_error, invalid_location_error, invalid_value_error,
    Error, Result,
};
use cadenza_core::segment::{
    same_segment, Field, FieldFlags, FieldInfo, FieldValue, MixStatus, Port, Segment,
    SegmentInfo, SegmentRef, ValueKind,
};

/// The number of input and output slots a queue exposes by default.
pub const DEFAULT_SLOTS: usize = 8;

/// A sequential sub-graph of segments sharing the queue's buffer slots.
pub struct QueueSegment {
    children: Vec<SegmentRef>,
    ins: Vec<Option<BufferRef>>,
    outs: Vec<Option<BufferRef>>,
    bypass: bool,
}

impl QueueSegment {
    pub fn new() -> QueueSegment {
        QueueSegment {
            children: Vec::new(),
            ins: vec![None; DEFAULT_SLOTS],
            outs: vec![None; DEFAULT_SLOTS],
            bypass: false,
        }
    }

    /// Appends a child and wires the queue's buffers into it, location by location, up to what
    /// the child can accept. Children that do not take buffers are tolerated.
    pub fn add(&mut self, child: &SegmentRef) -> Result<()> {
        let info = child.borrow().info();
        self.children.push(child.clone());

        let ins = self.ins.len().min(info.max_inputs);
        for at in 0..ins {
            let _ = child.borrow_mut().set_buffer(Port::Input(at), self.ins[at].clone());
        }
        let outs = self.outs.len().min(info.outputs);
        for at in 0..outs {
            let _ = child.borrow_mut().set_buffer(Port::Output(at), self.outs[at].clone());
        }
        Ok(())
    }

    /// Unlinks a child and null-wires its ports in reverse location order. Fails with
    /// `InvalidIndex` if the child is not queued.
    pub fn remove(&mut self, child: &SegmentRef) -> Result<()> {
        let at = match self.children.iter().position(|c| same_segment(c, child)) {
            Some(at) => at,
            None => return invalid_index_error(),
        };
        self.children.remove(at);

        let info = child.borrow().info();
        for port in (0..info.outputs).rev() {
            let _ = child.borrow_mut().set_buffer(Port::Output(port), None);
        }
        for port in (0..info.max_inputs).rev() {
            let _ = child.borrow_mut().set_buffer(Port::Input(port), None);
        }
        Ok(())
    }

    /// Unlinks every child.
    pub fn clear(&mut self) {
        while let Some(child) = self.children.last().cloned() {
            let _ = self.remove(&child);
        }
    }

    /// The number of queued children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if no children are queued.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Copies each input to the same-indexed output and silences outputs with no matching
    /// input. Slots without a wired output are skipped.
    fn bypass_copy(&self) -> Result<()> {
        for (at, out) in self.outs.iter().enumerate() {
            let out = match out {
                Some(out) => out,
                None => continue,
            };
            match self.ins.get(at).and_then(|i| i.as_ref()) {
                Some(input) if same_segment_buffer(input, out) => (),
                Some(input) => read_buffer(input)?.copy_to(&mut *write_buffer(out)?),
                None => write_buffer(out)?.clear(),
            }
        }
        Ok(())
    }
}

/// Whether two buffer handles alias the same buffer.
fn same_segment_buffer(a: &BufferRef, b: &BufferRef) -> bool {
    std::rc::Rc::ptr_eq(a, b)
}

impl Default for QueueSegment {
    fn default() -> Self {
        Self::new()
    }
}

impl Segment for QueueSegment {
    fn info(&self) -> SegmentInfo {
        let mut info = SegmentInfo {
            name: "queue",
            description: "Queue multiple segments one after the other.",
            min_inputs: self.ins.len(),
            max_inputs: self.ins.len(),
            outputs: self.outs.len(),
            fields: vec![
                FieldInfo {
                    field: Field::Bypass,
                    kind: ValueKind::Bool,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "Bypass the segment's processing.",
                },
                FieldInfo {
                    field: Field::CurrentSegment,
                    kind: ValueKind::Segment,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET,
                    description: "The currently playing segment, if any.",
                },
                FieldInfo {
                    field: Field::InCount,
                    kind: ValueKind::UInt,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "The number of available input buffer slots.",
                },
                FieldInfo {
                    field: Field::OutCount,
                    kind: ValueKind::UInt,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "The number of available output buffer slots.",
                },
            ],
        };

        // A non-empty queue takes the I/O shape of the child it is currently running.
        if let Some(head) = self.children.first() {
            let inner = head.borrow().info();
            info.min_inputs = inner.min_inputs;
            info.max_inputs = inner.max_inputs;
            info.outputs = inner.outputs;
        }

        info
    }

    fn start(&mut self) -> Result<()> {
        for child in &self.children {
            match child.borrow_mut().start() {
                Ok(()) | Err(Error::NotImplemented) => (),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        for child in &self.children {
            match child.borrow_mut().end() {
                Ok(()) | Err(Error::NotImplemented) => (),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn mix(&mut self, samples: usize, rate: u32) -> Result<MixStatus> {
        if self.bypass {
            self.bypass_copy()?;
            return Ok(MixStatus::Ongoing);
        }

        loop {
            let head = match self.children.first() {
                Some(head) => head.clone(),
                None => {
                    self.bypass_copy()?;
                    return Ok(MixStatus::Ongoing);
                }
            };

            let status = head.borrow_mut().mix(samples, rate)?;
            match status {
                MixStatus::Ongoing => return Ok(MixStatus::Ongoing),
                MixStatus::Finished => {
                    debug!("queued segment finished, advancing to the next");
                    let _ = self.remove(&head);
                }
            }
        }
    }

    fn set_buffer(&mut self, port: Port, buffer: Option<BufferRef>) -> Result<()> {
        match port {
            Port::Input(at) if at < self.ins.len() => {
                self.ins[at] = buffer.clone();
            }
            Port::Output(at) if at < self.outs.len() => {
                self.outs[at] = buffer.clone();
            }
            _ => return invalid_location_error(),
        }
        // Keep every queued child wired identically.
        for child in &self.children {
            let _ = child.borrow_mut().set_buffer(port, buffer.clone());
        }
        Ok(())
    }

    fn get_buffer(&self, port: Port) -> Result<Option<BufferRef>> {
        match port {
            Port::Input(at) if at < self.ins.len() => Ok(self.ins[at].clone()),
            Port::Output(at) if at < self.outs.len() => Ok(self.outs[at].clone()),
            _ => invalid_location_error(),
        }
    }

    fn get(&self, field: Field) -> Result<FieldValue> {
        match field {
            Field::Bypass => Ok(FieldValue::Bool(self.bypass)),
            Field::CurrentSegment => Ok(FieldValue::Segment(self.children.first().cloned())),
            Field::InCount => Ok(FieldValue::UInt(self.ins.len())),
            Field::OutCount => Ok(FieldValue::UInt(self.outs.len())),
            _ => invalid_field_error(),
        }
    }

    fn set(&mut self, field: Field, value: &FieldValue) -> Result<()> {
        match field {
            Field::Bypass => self.bypass = value.as_bool()?,
            Field::InCount => {
                let count = value.as_uint()?;
                if self.ins[count.min(self.ins.len())..].iter().any(Option::is_some) {
                    return invalid_value_error();
                }
                self.ins.resize(count, None);
            }
            Field::OutCount => {
                let count = value.as_uint()?;
                if self.outs[count.min(self.outs.len())..].iter().any(Option::is_some) {
                    return invalid_value_error();
                }
                self.outs.resize(count, None);
            }
            _ => return invalid_field_error(),
        }
        Ok(())
    }
}
