// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `pcm` module provides the two channel-codec segments: a source that decodes a foreign
//! channel blob into one float buffer per channel, and a drain that encodes float buffers back
//! into a blob. Both share one translation engine and are bit-exact inverses of each other for
//! integer encodings of 24 bits or less.

use cadenza_core::audio::{read_buffer, write_buffer, BufferRef, ChannelDesc, ChannelLayout};
use cadenza_core::conv::{FromSample, IntoSample};
use cadenza_core::errors::{
    invalid_field_error, invalid_location_error, invalid_value_error, not_initialized_error,
    Result,
};
use cadenza_core::sample::{i24, u24, SampleFormat};
use cadenza_core::segment::{
    Field, FieldFlags, FieldInfo, FieldValue, MixStatus, Port, Segment, SegmentInfo, ValueKind,
};

/// Element index of frame `i`, channel `c` within a blob of `frames` frames. Planar blobs
/// stride by the batch's frame count; each plane is packed tight against the previous one.
#[inline]
fn element_index(layout: ChannelLayout, channels: usize, frames: usize, i: usize, c: usize) -> usize {
    match layout {
        ChannelLayout::Interleaved => i * channels + c,
        ChannelLayout::Planar => c * frames + i,
    }
}

/// Decodes the sample at byte offset `at`.
#[inline]
fn decode_sample(bytes: &[u8], at: usize, format: SampleFormat) -> f32 {
    match format {
        SampleFormat::S8 => f32::from_sample(bytes[at] as i8),
        SampleFormat::U8 => f32::from_sample(bytes[at]),
        SampleFormat::S16 => f32::from_sample(i16::from_le_bytes([bytes[at], bytes[at + 1]])),
        SampleFormat::U16 => f32::from_sample(u16::from_le_bytes([bytes[at], bytes[at + 1]])),
        SampleFormat::S24 => {
            f32::from_sample(i24::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2]]))
        }
        SampleFormat::U24 => {
            f32::from_sample(u24::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2]]))
        }
        SampleFormat::S32 => f32::from_sample(i32::from_le_bytes([
            bytes[at],
            bytes[at + 1],
            bytes[at + 2],
            bytes[at + 3],
        ])),
        SampleFormat::U32 => f32::from_sample(u32::from_le_bytes([
            bytes[at],
            bytes[at + 1],
            bytes[at + 2],
            bytes[at + 3],
        ])),
        SampleFormat::F32 => f32::from_le_bytes([
            bytes[at],
            bytes[at + 1],
            bytes[at + 2],
            bytes[at + 3],
        ]),
        SampleFormat::F64 => f32::from_sample(f64::from_le_bytes([
            bytes[at],
            bytes[at + 1],
            bytes[at + 2],
            bytes[at + 3],
            bytes[at + 4],
            bytes[at + 5],
            bytes[at + 6],
            bytes[at + 7],
        ])),
    }
}

/// Encodes `value` at byte offset `at`. Out-of-range values saturate.
#[inline]
fn encode_sample(value: f32, bytes: &mut [u8], at: usize, format: SampleFormat) {
    match format {
        SampleFormat::S8 => bytes[at] = i8::from_sample(value) as u8,
        SampleFormat::U8 => bytes[at] = u8::from_sample(value),
        SampleFormat::S16 => {
            bytes[at..at + 2].copy_from_slice(&i16::from_sample(value).to_le_bytes())
        }
        SampleFormat::U16 => {
            bytes[at..at + 2].copy_from_slice(&u16::from_sample(value).to_le_bytes())
        }
        SampleFormat::S24 => {
            let sample: i24 = value.into_sample();
            bytes[at..at + 3].copy_from_slice(&sample.to_le_bytes());
        }
        SampleFormat::U24 => {
            let sample: u24 = value.into_sample();
            bytes[at..at + 3].copy_from_slice(&sample.to_le_bytes());
        }
        SampleFormat::S32 => {
            bytes[at..at + 4].copy_from_slice(&i32::from_sample(value).to_le_bytes())
        }
        SampleFormat::U32 => {
            bytes[at..at + 4].copy_from_slice(&u32::from_sample(value).to_le_bytes())
        }
        SampleFormat::F32 => bytes[at..at + 4].copy_from_slice(&value.to_le_bytes()),
        SampleFormat::F64 => {
            bytes[at..at + 8].copy_from_slice(&f64::from_sample(value).to_le_bytes())
        }
    }
}

/// Checks that a batch of `samples` frames fits the blob and every wired buffer.
fn check_batch(channel: &ChannelDesc, samples: usize, buffers: &[Option<BufferRef>]) -> Result<()> {
    let bytes = channel.data.borrow().len();
    if samples * channel.channels * channel.format.size_of() > bytes {
        return invalid_value_error();
    }
    for buffer in buffers.iter().flatten() {
        if buffer.borrow().len() < samples {
            return invalid_value_error();
        }
    }
    Ok(())
}

/// A segment that decodes a foreign channel blob into one mono float buffer per channel.
pub struct SourceSegment {
    channel: ChannelDesc,
    outputs: Vec<Option<BufferRef>>,
}

impl SourceSegment {
    /// Creates a source over the described channel memory.
    pub fn try_new(channel: ChannelDesc) -> Result<SourceSegment> {
        if channel.channels == 0 {
            return invalid_value_error();
        }
        let outputs = vec![None; channel.channels];
        Ok(SourceSegment { channel, outputs })
    }
}

impl Segment for SourceSegment {
    fn info(&self) -> SegmentInfo {
        SegmentInfo {
            name: "source",
            description: "Decode external channel data into the pipeline.",
            min_inputs: 0,
            max_inputs: 0,
            outputs: self.channel.channels,
            fields: vec![
                FieldInfo {
                    field: Field::Buffer,
                    kind: ValueKind::Segment,
                    count: 1,
                    flags: FieldFlags::OUT | FieldFlags::GET | FieldFlags::SET,
                    description: "The buffer receiving the decoded samples of a channel.",
                },
                FieldInfo {
                    field: Field::SampleRate,
                    kind: ValueKind::UInt,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET,
                    description: "The samplerate of the external channel data.",
                },
            ],
        }
    }

    fn mix(&mut self, samples: usize, _rate: u32) -> Result<MixStatus> {
        if samples == 0 {
            return Ok(MixStatus::Ongoing);
        }

        check_batch(&self.channel, samples, &self.outputs)?;

        let data = self.channel.data.borrow();
        let size = self.channel.format.size_of();
        let channels = self.channel.channels;

        for (c, output) in self.outputs.iter().enumerate() {
            let output = match output {
                Some(output) => output,
                None => return not_initialized_error(),
            };
            let mut output = write_buffer(output)?;
            let plane = output.samples_mut();

            for (i, sample) in plane[..samples].iter_mut().enumerate() {
                let at = element_index(self.channel.layout, channels, samples, i, c) * size;
                *sample = decode_sample(&data, at, self.channel.format);
            }
        }

        Ok(MixStatus::Ongoing)
    }

    fn set_buffer(&mut self, port: Port, buffer: Option<BufferRef>) -> Result<()> {
        match port {
            Port::Output(at) if at < self.outputs.len() => {
                self.outputs[at] = buffer;
                Ok(())
            }
            _ => invalid_location_error(),
        }
    }

    fn get_buffer(&self, port: Port) -> Result<Option<BufferRef>> {
        match port {
            Port::Output(at) if at < self.outputs.len() => Ok(self.outputs[at].clone()),
            _ => invalid_location_error(),
        }
    }

    fn get(&self, field: Field) -> Result<FieldValue> {
        match field {
            Field::SampleRate => Ok(FieldValue::UInt(self.channel.rate as usize)),
            _ => invalid_field_error(),
        }
    }
}

/// A segment that encodes mono float buffers back into a foreign channel blob.
pub struct DrainSegment {
    channel: ChannelDesc,
    inputs: Vec<Option<BufferRef>>,
}

impl DrainSegment {
    /// Creates a drain over the described channel memory.
    pub fn try_new(channel: ChannelDesc) -> Result<DrainSegment> {
        if channel.channels == 0 {
            return invalid_value_error();
        }
        let inputs = vec![None; channel.channels];
        Ok(DrainSegment { channel, inputs })
    }
}

impl Segment for DrainSegment {
    fn info(&self) -> SegmentInfo {
        SegmentInfo {
            name: "drain",
            description: "Encode the pipeline's buffers into external channel data.",
            min_inputs: self.channel.channels,
            max_inputs: self.channel.channels,
            outputs: 0,
            fields: vec![
                FieldInfo {
                    field: Field::Buffer,
                    kind: ValueKind::Segment,
                    count: 1,
                    flags: FieldFlags::IN | FieldFlags::GET | FieldFlags::SET,
                    description: "The buffer providing the samples of a channel to encode.",
                },
                FieldInfo {
                    field: Field::SampleRate,
                    kind: ValueKind::UInt,
                    count: 1,
                    flags: FieldFlags::SEGMENT | FieldFlags::GET,
                    description: "The samplerate of the external channel data.",
                },
            ],
        }
    }

    fn mix(&mut self, samples: usize, _rate: u32) -> Result<MixStatus> {
        if samples == 0 {
            return Ok(MixStatus::Ongoing);
        }

        check_batch(&self.channel, samples, &self.inputs)?;

        let mut data = self.channel.data.borrow_mut();
        let size = self.channel.format.size_of();
        let channels = self.channel.channels;

        for (c, input) in self.inputs.iter().enumerate() {
            let input = match input {
                Some(input) => input,
                None => return not_initialized_error(),
            };
            let input = read_buffer(input)?;
            let plane = input.samples();

            for (i, sample) in plane[..samples].iter().enumerate() {
                let at = element_index(self.channel.layout, channels, samples, i, c) * size;
                encode_sample(*sample, &mut data, at, self.channel.format);
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
            _ => invalid_location_error(),
        }
    }

    fn get_buffer(&self, port: Port) -> Result<Option<BufferRef>> {
        match port {
            Port::Input(at) if at < self.inputs.len() => Ok(self.inputs[at].clone()),
            _ => invalid_location_error(),
        }
    }

    fn get(&self, field: Field) -> Result<FieldValue> {
        match field {
            Field::SampleRate => Ok(FieldValue::UInt(self.channel.rate as usize)),
            _ => invalid_field_error(),
        }
    }
}
