// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `mixdown` module provides the linear summing segment: any number of wired input buffers
//! are added sample-wise into a single output buffer.

use cadenza_core::audio::{read_buffer, write_buffer, BufferRef};
use cadenza_core::errors::{
    invalid_field_error, invalid_location_error, invalid_value_error, not_initialized_error,
    Result,
};
use cadenza_core::segment::{
    Field, FieldFlags, FieldInfo, FieldValue, MixStatus, Port, Segment, SegmentInfo, ValueKind,
};

/// The number of input slots a mixdown segment exposes.
pub const MIXDOWN_INPUTS: usize = 32;

/// Linear N-to-1 mixdown. Unwired slots are skipped; with no wired inputs the output is
/// silence.
pub struct MixdownSegment {
    volume: f32,
    inputs: Vec<Option<BufferRef>>,
    output: Option<BufferRef>,
}

impl MixdownSegment {
    pub fn new() -> MixdownSegment {
        MixdownSegment { volume: 1.0, inputs: vec![None; MIXDOWN_INPUTS], output: None }
    }
}

impl Default for MixdownSegment {
    fn default() -> Self {
        Self::new()
    }
}

impl Segment for MixdownSegment {
    fn info(&self) -> SegmentInfo {
        SegmentInfo {
            name: "mixdown",
            description: "Sum any number of signals into one.",
            min_inputs: 0,
            max_inputs: MIXDOWN_INPUTS,
            outputs: 1,
            fields: vec![
                FieldInfo {
                    field: Field::Buffer,
                    kind: ValueKind::Segment,
                    count: 1,
                    flags: FieldFlags::IN | FieldFlags::OUT | FieldFlags::GET | FieldFlags::SET,
                    description: "The buffer for audio data attached to the location.",
                },
                FieldInfo {
                    field: Field::Volume,
                    kind: ValueKind::Float,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "The linear gain applied to the summed signal.",
                },
            ],
        }
    }

    fn mix(&mut self, samples: usize, _rate: u32) -> Result<MixStatus> {
        let output = match &self.output {
            Some(output) => output,
            None => return not_initialized_error(),
        };
        let mut output = write_buffer(output)?;
        if samples > output.len() {
            return invalid_value_error();
        }

        output.samples_mut()[..samples].fill(0.0);

        for input in self.inputs.iter().flatten() {
            let input = read_buffer(input)?;
            if samples > input.len() {
                return invalid_value_error();
            }
            for (y, x) in output.samples_mut()[..samples].iter_mut().zip(input.samples()) {
                *y += x;
            }
        }

        if self.volume != 1.0 {
            for y in output.samples_mut()[..samples].iter_mut() {
                *y *= self.volume;
            }
        }

        Ok(MixStatus::Ongoing)
    }

    fn set_buffer(&mut self, port: Port, buffer: Option<BufferRef>) -> Result<()> {
        match port {
            Port::Input(at) if at < self.inputs.len() => {
                self.inputs[at] = buffer;
                Ok(())
            }
            Port::Output(0) => {
                self.output = buffer;
                Ok(())
            }
            _ => invalid_location_error(),
        }
    }

    fn get_buffer(&self, port: Port) -> Result<Option<BufferRef>> {
        match port {
            Port::Input(at) if at < self.inputs.len() => Ok(self.inputs[at].clone()),
            Port::Output(0) => Ok(self.output.clone()),
            _ => invalid_location_error(),
        }
    }

    fn get(&self, field: Field) -> Result<FieldValue> {
        match field {
            Field::Volume => Ok(FieldValue::Float(self.volume)),
            _ => invalid_field_error(),
        }
    }

    fn set(&mut self, field: Field, value: &FieldValue) -> Result<()> {
        match field {
            Field::Volume => {
                let volume = value.as_float()?;
                if volume < 0.0 {
                    return invalid_value_error();
                }
                self.volume = volume;
            }
            _ => return invalid_field_error(),
        }
        Ok(())
    }
}
