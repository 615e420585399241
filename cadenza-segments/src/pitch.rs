// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `pitch` module provides the pitch-shift segment, a thin wrapper around the phase
//! vocoder in [`cadenza_core::dsp::vocoder`].

use cadenza_core::audio::{read_buffer, write_buffer, BufferRef};
use cadenza_core::dsp::vocoder::PitchShifter;
use cadenza_core::errors::{
    invalid_field_error, invalid_location_error, invalid_value_error, not_initialized_error,
    Result,
};
use cadenza_core::segment::{
    Field, FieldFlags, FieldInfo, FieldValue, MixStatus, Port, Segment, SegmentInfo, ValueKind,
};

/// The default analysis frame size in samples.
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// The default oversampling factor.
pub const DEFAULT_OVERSAMPLING: usize = 4;

/// A segment that shifts the pitch of a mono signal by a configurable ratio. A ratio of 1.0
/// degenerates to a plain copy, as does engaging the bypass field.
pub struct PitchSegment {
    shifter: PitchShifter,
    pitch: f32,
    bypass: bool,
    input: Option<BufferRef>,
    output: Option<BufferRef>,
}

impl PitchSegment {
    /// Creates a pitch segment with the default frame size and oversampling.
    pub fn try_new(pitch: f32, rate: u32) -> Result<PitchSegment> {
        PitchSegment::try_new_with_frame(pitch, rate, DEFAULT_FRAME_SIZE, DEFAULT_OVERSAMPLING)
    }

    /// Creates a pitch segment with an explicit analysis frame size and oversampling factor.
    /// Both are fixed for the lifetime of the segment.
    pub fn try_new_with_frame(
        pitch: f32,
        rate: u32,
        frame_size: usize,
        oversampling: usize,
    ) -> Result<PitchSegment> {
        if pitch <= 0.0 {
            return invalid_value_error();
        }
        let shifter = PitchShifter::try_new(frame_size, oversampling, rate)?;
        Ok(PitchSegment { shifter, pitch, bypass: false, input: None, output: None })
    }

    /// The number of samples of delay the shifting path introduces.
    pub fn latency(&self) -> usize {
        self.shifter.latency()
    }
}

impl Segment for PitchSegment {
    fn info(&self) -> SegmentInfo {
        SegmentInfo {
            name: "pitch",
            description: "Shift the pitch of the audio.",
            min_inputs: 1,
            max_inputs: 1,
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
                    field: Field::PitchShift,
                    kind: ValueKind::Float,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "The ratio the pitch is shifted by.",
                },
                FieldInfo {
                    field: Field::SampleRate,
                    kind: ValueKind::UInt,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "The samplerate at which the segment operates.",
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

    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        Ok(())
    }

    fn mix(&mut self, samples: usize, _rate: u32) -> Result<MixStatus> {
        let input = match &self.input {
            Some(input) => input,
            None => return not_initialized_error(),
        };
        let output = match &self.output {
            Some(output) => output,
            None => return not_initialized_error(),
        };

        if self.bypass || self.pitch == 1.0 {
            // Degenerate to a copy. Copying a buffer onto itself is a no-op.
            if !std::rc::Rc::ptr_eq(input, output) {
                read_buffer(input)?.copy_to(&mut *write_buffer(output)?);
            }
            return Ok(MixStatus::Ongoing);
        }

        let input = read_buffer(input)?;
        let mut output = write_buffer(output)?;
        if samples > input.len() || samples > output.len() {
            return invalid_value_error();
        }

        self.shifter.process(
            self.pitch,
            &input.samples()[..samples],
            &mut output.samples_mut()[..samples],
        );

        Ok(MixStatus::Ongoing)
    }

    fn set_buffer(&mut self, port: Port, buffer: Option<BufferRef>) -> Result<()> {
        match port {
            Port::Input(0) => {
                self.input = buffer;
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
            Port::Input(0) => Ok(self.input.clone()),
            Port::Output(0) => Ok(self.output.clone()),
            _ => invalid_location_error(),
        }
    }

    fn get(&self, field: Field) -> Result<FieldValue> {
        match field {
            Field::PitchShift => Ok(FieldValue::Float(self.pitch)),
            Field::SampleRate => Ok(FieldValue::UInt(self.shifter.rate() as usize)),
            Field::Bypass => Ok(FieldValue::Bool(self.bypass)),
            _ => invalid_field_error(),
        }
    }

    fn set(&mut self, field: Field, value: &FieldValue) -> Result<()> {
        match field {
            Field::PitchShift => {
                let pitch = value.as_float()?;
                if pitch <= 0.0 {
                    return invalid_value_error();
                }
                self.pitch = pitch;
            }
            Field::SampleRate => {
                let rate = value.as_uint()?;
                if rate == 0 || rate > u32::MAX as usize {
                    return invalid_value_error();
                }
                // A new rate invalidates the analysis state; rebuild the shifter with the same
                // frame parameters.
                self.shifter = PitchShifter::try_new(
                    self.shifter.frame_size(),
                    self.shifter.oversampling(),
                    rate as u32,
                )?;
            }
            Field::Bypass => self.bypass = value.as_bool()?,
            _ => return invalid_field_error(),
        }
        Ok(())
    }
}
