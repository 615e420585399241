// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `general` module provides the stereo volume and panning segment.

use cadenza_core::audio::{read_buffer, write_buffer, BufferRef};
use cadenza_core::errors::{
    invalid_field_error, invalid_location_error, invalid_value_error, not_initialized_error,
    Result,
};
use cadenza_core::segment::{
    Field, FieldFlags, FieldInfo, FieldValue, MixStatus, Port, Segment, SegmentInfo, ValueKind,
};

/// A two-channel gain and pan stage. A pan of -1.0 plays only the left channel, +1.0 only the
/// right, 0.0 both at full level; volume is a linear factor applied to both.
pub struct GeneralSegment {
    volume: f32,
    pan: f32,
    bypass: bool,
    inputs: [Option<BufferRef>; 2],
    outputs: [Option<BufferRef>; 2],
}

impl GeneralSegment {
    /// Creates the segment with an initial volume in [0, inf) and pan in [-1, 1].
    pub fn try_new(volume: f32, pan: f32) -> Result<GeneralSegment> {
        if volume < 0.0 || !(-1.0..=1.0).contains(&pan) {
            return invalid_value_error();
        }
        Ok(GeneralSegment {
            volume,
            pan,
            bypass: false,
            inputs: [None, None],
            outputs: [None, None],
        })
    }

    /// The gain of one side for the current volume and pan.
    fn side_gain(&self, right: bool) -> f32 {
        let lean = if right { self.pan } else { -self.pan };
        self.volume * (1.0 + lean).min(1.0)
    }
}

impl Segment for GeneralSegment {
    fn info(&self) -> SegmentInfo {
        SegmentInfo {
            name: "general",
            description: "Adjust volume and pan of a stereo signal.",
            min_inputs: 2,
            max_inputs: 2,
            outputs: 2,
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
                    description: "The linear gain applied to both channels.",
                },
                FieldInfo {
                    field: Field::Pan,
                    kind: ValueKind::Float,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "The left/right balance in [-1, 1].",
                },
                FieldInfo {
                    field: Field::Bypass,
                    kind: ValueKind::Bool,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "Bypass the segment's processing.",
                },
            ],
        }
    }

    fn mix(&mut self, samples: usize, _rate: u32) -> Result<MixStatus> {
        for side in 0..2 {
            let input = match &self.inputs[side] {
                Some(input) => input,
                None => return not_initialized_error(),
            };
            let output = match &self.outputs[side] {
                Some(output) => output,
                None => return not_initialized_error(),
            };

            if self.bypass {
                // Degenerate to a copy. Copying a buffer onto itself is a no-op.
                if !std::rc::Rc::ptr_eq(input, output) {
                    read_buffer(input)?.copy_to(&mut *write_buffer(output)?);
                }
                continue;
            }

            let gain = self.side_gain(side == 1);
            let input = read_buffer(input)?;
            let mut output = write_buffer(output)?;

            if samples > input.len() || samples > output.len() {
                return invalid_value_error();
            }

            for (y, x) in output.samples_mut()[..samples].iter_mut().zip(input.samples()) {
                *y = x * gain;
            }
        }

        Ok(MixStatus::Ongoing)
    }

    fn set_buffer(&mut self, port: Port, buffer: Option<BufferRef>) -> Result<()> {
        match port {
            Port::Input(at) if at < 2 => {
                self.inputs[at] = buffer;
                Ok(())
            }
            Port::Output(at) if at < 2 => {
                self.outputs[at] = buffer;
                Ok(())
            }
            _ => invalid_location_error(),
        }
    }

    fn get_buffer(&self, port: Port) -> Result<Option<BufferRef>> {
        match port {
            Port::Input(at) if at < 2 => Ok(self.inputs[at].clone()),
            Port::Output(at) if at < 2 => Ok(self.outputs[at].clone()),
            _ => invalid_location_error(),
        }
    }

    fn get(&self, field: Field) -> Result<FieldValue> {
        match field {
            Field::Volume => Ok(FieldValue::Float(self.volume)),
            Field::Pan => Ok(FieldValue::Float(self.pan)),
            Field::Bypass => Ok(FieldValue::Bool(self.bypass)),
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
            Field::Pan => {
                let pan = value.as_float()?;
                if !(-1.0..=1.0).contains(&pan) {
                    return invalid_value_error();
                }
                self.pan = pan;
            }
            Field::Bypass => self.bypass = value.as_bool()?,
            _ => return invalid_field_error(),
        }
        Ok(())
    }
}
