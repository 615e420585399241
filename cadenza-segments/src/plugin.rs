// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `plugin` module wraps an external processing unit behind the segment interface. The unit
//! itself — typically produced by a native plugin loader — only has to describe its port counts
//! and process planar sample slices; the wrapper supplies the buffer wiring and lifecycle.

use cadenza_core::audio::{read_buffer, write_buffer, BufferRef};
use cadenza_core::errors::{
    invalid_location_error, invalid_value_error, mixing_failed_error, not_initialized_error,
    Result,
};
use cadenza_core::segment::{
    Field, FieldFlags, FieldInfo, MixStatus, Port, Segment, SegmentInfo, ValueKind,
};

/// An external processing unit. Implementations declare how many mono input and output ports
/// they consume and produce, and process one batch at a time.
pub trait PluginProcessor {
    /// A short display name for the unit.
    fn name(&self) -> &'static str;

    /// The number of mono input ports.
    fn inputs(&self) -> usize;

    /// The number of mono output ports.
    fn outputs(&self) -> usize;

    /// Called once before the first batch of a run.
    fn activate(&mut self) {}

    /// Processes `samples` samples from the input planes into the output planes. Returning an
    /// error aborts the batch.
    fn run(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [Vec<f32>],
        samples: usize,
    ) -> std::result::Result<(), ()>;

    /// Called once after the last batch of a run.
    fn deactivate(&mut self) {}
}

/// A segment delegating its processing to a boxed [`PluginProcessor`].
pub struct PluginSegment {
    plugin: Box<dyn PluginProcessor>,
    inputs: Vec<Option<BufferRef>>,
    outputs: Vec<Option<BufferRef>>,
    /// Staging planes handed to the plugin; the wrapper copies them into the wired buffers.
    staging: Vec<Vec<f32>>,
}

impl PluginSegment {
    pub fn new(plugin: Box<dyn PluginProcessor>) -> PluginSegment {
        let inputs = vec![None; plugin.inputs()];
        let outputs = vec![None; plugin.outputs()];
        let staging = vec![Vec::new(); plugin.outputs()];
        PluginSegment { plugin, inputs, outputs, staging }
    }
}

impl Segment for PluginSegment {
    fn info(&self) -> SegmentInfo {
        SegmentInfo {
            name: self.plugin.name(),
            description: "Process audio through an externally loaded unit.",
            min_inputs: self.inputs.len(),
            max_inputs: self.inputs.len(),
            outputs: self.outputs.len(),
            fields: vec![FieldInfo {
                field: Field::Buffer,
                kind: ValueKind::Segment,
                count: 1,
                flags: FieldFlags::IN | FieldFlags::OUT | FieldFlags::GET | FieldFlags::SET,
                description: "The buffer for audio data attached to the location.",
            }],
        }
    }

    fn start(&mut self) -> Result<()> {
        self.plugin.activate();
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.plugin.deactivate();
        Ok(())
    }

    fn mix(&mut self, samples: usize, _rate: u32) -> Result<MixStatus> {
        let mut guards = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            match input {
                Some(input) => guards.push(read_buffer(input)?),
                None => return not_initialized_error(),
            }
        }
        for guard in &guards {
            if samples > guard.len() {
                return invalid_value_error();
            }
        }

        let planes: Vec<&[f32]> = guards.iter().map(|g| &g.samples()[..samples]).collect();

        for plane in self.staging.iter_mut() {
            plane.clear();
            plane.resize(samples, 0.0);
        }

        if self.plugin.run(&planes, &mut self.staging, samples).is_err() {
            return mixing_failed_error();
        }

        drop(planes);
        drop(guards);

        for (plane, output) in self.staging.iter().zip(self.outputs.iter()) {
            let output = match output {
                Some(output) => output,
                None => return not_initialized_error(),
            };
            let mut output = write_buffer(output)?;
            if samples > output.len() {
                return invalid_value_error();
            }
            output.samples_mut()[..samples].copy_from_slice(&plane[..samples]);
        }

        Ok(MixStatus::Ongoing)
    }

    fn set_buffer(&mut self, port: Port, buffer: Option<BufferRef>) -> Result<()> {
        match port {
            Port::Input(at) if at < self.inputs.len() => {
                self.inputs[at] = buffer;
                Ok(())
            }
            Port::Output(at) if at < self.outputs.len() => {
                self.outputs[at] = buffer;
                Ok(())
            }
            _ => invalid_location_error(),
        }
    }

    fn get_buffer(&self, port: Port) -> Result<Option<BufferRef>> {
        match port {
            Port::Input(at) if at < self.inputs.len() => Ok(self.inputs[at].clone()),
            Port::Output(at) if at < self.outputs.len() => Ok(self.outputs[at].clone()),
            _ => invalid_location_error(),
        }
    }
}
