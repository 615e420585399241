// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `space` module provides the 3D spatialisation segment: a mono source rendered into a
//! stereo pair with per-ear distance attenuation and an interaural time difference.
//!
//! The model is deliberately plain: the listener's ears sit on the local x axis, each ear
//! attenuates with its distance to the source, and the farther ear hears the signal a few
//! samples late. Positions are read once per batch.

use cadenza_core::audio::{read_buffer, write_buffer, BufferRef};
use cadenza_core::errors::{
    invalid_field_error, invalid_location_error, invalid_value_error, not_initialized_error,
    Result,
};
use cadenza_core::segment::{
    Field, FieldFlags, FieldInfo, FieldValue, MixStatus, Port, Segment, SegmentInfo, ValueKind,
};

/// Distance between the listener's ears in metres.
const EAR_SPACING: f32 = 0.18;

/// Speed of sound in metres per second.
const SPEED_OF_SOUND: f32 = 343.0;

/// Ring capacity of the per-ear delay lines. Must exceed the largest interaural delay: the ear
/// spacing above is under 30 samples at 192 kHz.
const DELAY_RING: usize = 128;

/// A fixed-capacity delay line over the recent input history.
struct DelayLine {
    ring: [f32; DELAY_RING],
    head: usize,
}

impl DelayLine {
    fn new() -> DelayLine {
        DelayLine { ring: [0.0; DELAY_RING], head: 0 }
    }

    fn clear(&mut self) {
        self.ring.fill(0.0);
        self.head = 0;
    }

    /// Records `sample` and returns the sample heard `delay` steps ago.
    fn tap(&mut self, sample: f32, delay: usize) -> f32 {
        self.ring[self.head] = sample;
        let at = (self.head + DELAY_RING - delay) % DELAY_RING;
        self.head = (self.head + 1) % DELAY_RING;
        self.ring[at]
    }
}

/// A mono-to-stereo spatialisation stage positioned through the source and listener location
/// fields.
pub struct SpaceSegment {
    source: [f32; 3],
    listener: [f32; 3],
    input: Option<BufferRef>,
    outputs: [Option<BufferRef>; 2],
    delays: [DelayLine; 2],
}

impl SpaceSegment {
    pub fn new() -> SpaceSegment {
        SpaceSegment {
            source: [0.0; 3],
            listener: [0.0; 3],
            input: None,
            outputs: [None, None],
            delays: [DelayLine::new(), DelayLine::new()],
        }
    }

    /// Distance from the source to the given ear of the listener.
    fn ear_distance(&self, right: bool) -> f32 {
        let offset = if right { EAR_SPACING / 2.0 } else { -EAR_SPACING / 2.0 };
        let dx = self.source[0] - (self.listener[0] + offset);
        let dy = self.source[1] - self.listener[1];
        let dz = self.source[2] - self.listener[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Default for SpaceSegment {
    fn default() -> Self {
        Self::new()
    }
}

impl Segment for SpaceSegment {
    fn info(&self) -> SegmentInfo {
        SegmentInfo {
            name: "space",
            description: "Render a mono source into stereo 3D space.",
            min_inputs: 1,
            max_inputs: 1,
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
                    field: Field::SourceLocation,
                    kind: ValueKind::Vector,
                    count: 3,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "The position of the sound source in space.",
                },
                FieldInfo {
                    field: Field::ListenerLocation,
                    kind: ValueKind::Vector,
                    count: 3,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET | FieldFlags::SET,
                    description: "The position of the listener in space.",
                },
            ],
        }
    }

    fn start(&mut self) -> Result<()> {
        for delay in &mut self.delays {
            delay.clear();
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        Ok(())
    }

    fn mix(&mut self, samples: usize, rate: u32) -> Result<MixStatus> {
        let input = match &self.input {
            Some(input) => input,
            None => return not_initialized_error(),
        };

        let near = self.ear_distance(false).min(self.ear_distance(true));

        for side in 0..2 {
            let output = match &self.outputs[side] {
                Some(output) => output,
                None => return not_initialized_error(),
            };

            let distance = self.ear_distance(side == 1);
            let gain = 1.0 / (1.0 + distance);
            // The far ear hears the wavefront late by the extra travel time.
            let lag = (((distance - near) / SPEED_OF_SOUND) * rate as f32).round() as usize;
            let lag = lag.min(DELAY_RING - 1);

            let input = read_buffer(input)?;
            let mut output = write_buffer(output)?;
            if samples > input.len() || samples > output.len() {
                return invalid_value_error();
            }

            let line = &mut self.delays[side];
            for (y, x) in output.samples_mut()[..samples].iter_mut().zip(input.samples()) {
                *y = line.tap(*x, lag) * gain;
            }
        }

        Ok(MixStatus::Ongoing)
    }

    fn set_buffer(&mut self, port: Port, buffer: Option<BufferRef>) -> Result<()> {
        match port {
            Port::Input(0) => {
                self.input = buffer;
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
            Port::Input(0) => Ok(self.input.clone()),
            Port::Output(at) if at < 2 => Ok(self.outputs[at].clone()),
            _ => invalid_location_error(),
        }
    }

    fn get(&self, field: Field) -> Result<FieldValue> {
        match field {
            Field::SourceLocation => Ok(FieldValue::Vector(self.source)),
            Field::ListenerLocation => Ok(FieldValue::Vector(self.listener)),
            _ => invalid_field_error(),
        }
    }

    fn set(&mut self, field: Field, value: &FieldValue) -> Result<()> {
        match field {
            Field::SourceLocation => self.source = value.as_vector()?,
            Field::ListenerLocation => self.listener = value.as_vector()?,
            _ => return invalid_field_error(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::audio::make_buffer;
    use cadenza_core::errors::Error;

    fn wired() -> (SpaceSegment, BufferRef, [BufferRef; 2]) {
        let input = make_buffer(64).unwrap();
        let outs = [make_buffer(64).unwrap(), make_buffer(64).unwrap()];

        let mut seg = SpaceSegment::new();
        seg.set_buffer(Port::Input(0), Some(input.clone())).unwrap();
        seg.set_buffer(Port::Output(0), Some(outs[0].clone())).unwrap();
        seg.set_buffer(Port::Output(1), Some(outs[1].clone())).unwrap();
        (seg, input, outs)
    }

    #[test]
    fn verify_centred_source_is_symmetric() {
        let (mut seg, input, outs) = wired();
        seg.set(Field::SourceLocation, &FieldValue::Vector([0.0, 0.0, 1.0])).unwrap();

        for (i, x) in input.borrow_mut().samples_mut().iter_mut().enumerate() {
            *x = (i as f32 * 0.37).sin();
        }

        seg.start().unwrap();
        seg.mix(64, 44_100).unwrap();

        assert_eq!(outs[0].borrow().samples(), outs[1].borrow().samples());
        // Attenuated with distance, never amplified.
        let peak_in: f32 =
            input.borrow().samples().iter().fold(0.0, |acc, x| acc.max(x.abs()));
        let peak_out: f32 =
            outs[0].borrow().samples().iter().fold(0.0, |acc, x| acc.max(x.abs()));
        assert!(peak_out < peak_in);
    }

    #[test]
    fn verify_side_source_favours_the_near_ear() {
        let (mut seg, input, outs) = wired();
        // Two metres to the left of the listener.
        seg.set(Field::SourceLocation, &FieldValue::Vector([-2.0, 0.0, 0.0])).unwrap();

        input.borrow_mut().samples_mut().fill(0.5);
        seg.start().unwrap();
        seg.mix(64, 44_100).unwrap();

        let left = outs[0].borrow().samples().to_vec();
        let right = outs[1].borrow().samples().to_vec();
        // Steady state: the near (left) ear is louder.
        assert!(left[63] > right[63]);
        // The far ear's wavefront arrives late: its first samples are still silent while the
        // near ear already hears the signal.
        assert!(left[0] > 0.0);
        assert_eq!(right[0], 0.0);
    }

    #[test]
    fn verify_start_clears_the_delay_lines() {
        let (mut seg, input, outs) = wired();
        seg.set(Field::SourceLocation, &FieldValue::Vector([-2.0, 0.0, 0.0])).unwrap();
        input.borrow_mut().samples_mut().fill(0.5);

        seg.start().unwrap();
        seg.mix(64, 44_100).unwrap();
        let first = outs[1].borrow().samples().to_vec();

        // Restarting forgets the buffered history, reproducing the first batch.
        seg.start().unwrap();
        seg.mix(64, 44_100).unwrap();
        assert_eq!(outs[1].borrow().samples(), &first[..]);
    }

    #[test]
    fn verify_field_and_wiring_errors() {
        let mut seg = SpaceSegment::new();
        assert_eq!(seg.mix(4, 44_100).err(), Some(Error::NotInitialized));
        assert_eq!(seg.set_buffer(Port::Input(1), None).err(), Some(Error::InvalidLocation));
        assert_eq!(
            seg.set(Field::Volume, &FieldValue::Float(1.0)).err(),
            Some(Error::InvalidField)
        );
        assert_eq!(
            seg.set(Field::SourceLocation, &FieldValue::Float(1.0)).err(),
            Some(Error::InvalidValue)
        );
    }
}
