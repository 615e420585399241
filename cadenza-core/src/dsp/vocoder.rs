// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `vocoder` module implements a streaming phase-vocoder pitch shifter over an overlap-add
//! short-time Fourier transform.
//!
//! Input samples trickle into a FIFO one at a time. Whenever a full analysis frame has been
//! collected, the frame is Hann-windowed and transformed, each bin's magnitude and true
//! frequency are estimated from the phase advance since the previous frame, the bins are
//! remapped by the pitch ratio, and the spectrum is resynthesised and overlap-added into an
//! output accumulator. One output sample leaves the FIFO per input sample, delayed by exactly
//! one frame.

use std::f64::consts::PI;

use crate::dsp::complex::Complex;
use crate::dsp::fft::Fft;
use crate::dsp::window;
use crate::errors::{invalid_value_error, out_of_memory_error, Result};

/// The smallest supported analysis frame.
pub const MIN_FRAME_SIZE: usize = 64;

/// The largest supported analysis frame.
pub const MAX_FRAME_SIZE: usize = Fft::MAX_SIZE;

/// Allocates a zero-initialised sample array, surfacing allocation failure as `OutOfMemory`
/// instead of aborting. Arrays allocated earlier by the caller unwind automatically when this
/// fails.
fn alloc_samples<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    if buf.try_reserve_exact(len).is_err() {
        return out_of_memory_error();
    }
    buf.resize(len, T::default());
    Ok(buf)
}

/// A streaming pitch shifter. All analysis state persists across `process` calls, so a signal
/// may be fed in batches of any size.
pub struct PitchShifter {
    frame_size: usize,
    oversampling: usize,
    rate: u32,
    /// Write offset into the input FIFO. Equals `frame_size - step` at frame boundaries.
    overlap: usize,
    in_fifo: Vec<f32>,
    out_fifo: Vec<f32>,
    workspace: Vec<Complex>,
    last_phase: Vec<f64>,
    phase_sum: Vec<f64>,
    accumulator: Vec<f32>,
    analyzed_magnitude: Vec<f32>,
    analyzed_frequency: Vec<f32>,
    synthesized_magnitude: Vec<f32>,
    synthesized_frequency: Vec<f32>,
    window: Vec<f32>,
    fft: Fft,
}

impl PitchShifter {
    /// Creates a shifter with the given analysis frame size (a power of two in
    /// [`MIN_FRAME_SIZE`, `MAX_FRAME_SIZE`]), oversampling factor (at least 2, dividing the
    /// frame size), and sample rate.
    pub fn try_new(frame_size: usize, oversampling: usize, rate: u32) -> Result<PitchShifter> {
        if !frame_size.is_power_of_two()
            || frame_size < MIN_FRAME_SIZE
            || frame_size > MAX_FRAME_SIZE
        {
            return invalid_value_error();
        }
        if oversampling < 2 || frame_size % oversampling != 0 {
            return invalid_value_error();
        }
        if rate == 0 {
            return invalid_value_error();
        }

        let half = frame_size / 2;
        let step = frame_size / oversampling;

        let in_fifo = alloc_samples(frame_size)?;
        let out_fifo = alloc_samples(frame_size)?;
        let workspace = alloc_samples(frame_size)?;
        let last_phase = alloc_samples(half + 1)?;
        let phase_sum = alloc_samples(half + 1)?;
        let accumulator = alloc_samples(2 * frame_size)?;
        let analyzed_magnitude = alloc_samples(half + 1)?;
        let analyzed_frequency = alloc_samples(half + 1)?;
        let synthesized_magnitude = alloc_samples(half + 1)?;
        let synthesized_frequency = alloc_samples(half + 1)?;

        Ok(PitchShifter {
            frame_size,
            oversampling,
            rate,
            overlap: frame_size - step,
            in_fifo,
            out_fifo,
            workspace,
            last_phase,
            phase_sum,
            accumulator,
            analyzed_magnitude,
            analyzed_frequency,
            synthesized_magnitude,
            synthesized_frequency,
            window: window::hann(frame_size),
            fft: Fft::new(frame_size),
        })
    }

    /// The analysis frame size in samples.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// The oversampling factor: the number of analysis frames overlapping any one sample.
    pub fn oversampling(&self) -> usize {
        self.oversampling
    }

    /// The sample rate the shifter was built for.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// The number of samples between a sample entering the shifter and the matching sample
    /// leaving it: exactly one analysis frame.
    pub fn latency(&self) -> usize {
        self.frame_size
    }

    /// The hop between successive analysis frames.
    fn step(&self) -> usize {
        self.frame_size / self.oversampling
    }

    /// Clears the accumulated stream state, keeping the analysis plan. The next `process` call
    /// behaves as if the shifter were freshly constructed.
    pub fn reset(&mut self) {
        self.in_fifo.fill(0.0);
        self.out_fifo.fill(0.0);
        self.last_phase.fill(0.0);
        self.phase_sum.fill(0.0);
        self.accumulator.fill(0.0);
        self.overlap = self.frame_size - self.step();
    }

    /// Shifts `input` by the ratio `pitch`, writing one output sample per input sample. A ratio
    /// above 1.0 raises the pitch, below 1.0 lowers it. The ratio must be positive.
    pub fn process(&mut self, pitch: f32, input: &[f32], output: &mut [f32]) {
        assert_eq!(input.len(), output.len());
        debug_assert!(pitch > 0.0);

        let prime = self.frame_size - self.step();

        for (x, y) in input.iter().zip(output.iter_mut()) {
            self.in_fifo[self.overlap] = *x;
            *y = self.out_fifo[self.overlap - prime];
            self.overlap += 1;

            if self.overlap >= self.frame_size {
                self.overlap = prime;
                self.process_frame(pitch);
            }
        }
    }

    /// Runs one analysis/synthesis cycle over the frame sitting in the input FIFO.
    fn process_frame(&mut self, pitch: f32) {
        let frame = self.frame_size;
        let half = frame / 2;
        let step = self.step();

        // Width of one bin in hertz, and the expected per-hop phase advance of bin k per unit k.
        let bin_width = f64::from(self.rate) / frame as f64;
        let expected = 2.0 * PI * step as f64 / frame as f64;

        // Window the frame and lift it into the complex workspace.
        for k in 0..frame {
            self.workspace[k] = Complex::new(self.in_fifo[k] * self.window[k], 0.0);
        }

        self.fft.fft_inplace(&mut self.workspace);

        // Analysis: estimate each bin's magnitude and true frequency from the phase advance
        // since the previous frame.
        for k in 0..=half {
            let re = f64::from(self.workspace[k].re);
            let im = f64::from(self.workspace[k].im);

            let magnitude = 2.0 * (re * re + im * im).sqrt();
            let phase = im.atan2(re);

            let mut delta = phase - self.last_phase[k];
            self.last_phase[k] = phase;

            // Subtract the expected advance, then wrap into ±π. Forcing the wrap multiple to
            // the nearest even integer keeps the subtraction a whole number of turns.
            delta -= k as f64 * expected;

            let mut wraps = (delta / PI) as i64;
            if wraps >= 0 {
                wraps += wraps & 1;
            }
            else {
                wraps -= wraps & 1;
            }
            delta -= PI * wraps as f64;

            // Deviation from the bin centre in bins, then the bin's true frequency.
            let deviation = self.oversampling as f64 * delta / (2.0 * PI);
            let frequency = (k as f64 + deviation) * bin_width;

            self.analyzed_magnitude[k] = magnitude as f32;
            self.analyzed_frequency[k] = frequency as f32;
        }

        // Remap bins by the pitch ratio. Magnitudes landing on the same target accumulate;
        // frequencies overwrite, last writer wins. Targets above Nyquist are discarded.
        self.synthesized_magnitude.fill(0.0);
        self.synthesized_frequency.fill(0.0);

        for k in 0..=half {
            let target = (k as f32 * pitch) as usize;
            if target <= half {
                self.synthesized_magnitude[target] += self.analyzed_magnitude[k];
                self.synthesized_frequency[target] = self.analyzed_frequency[k] * pitch;
            }
        }

        // Synthesis: turn each bin's frequency back into a per-hop phase advance and
        // accumulate it into the bin's running phase.
        for k in 0..=half {
            let magnitude = f64::from(self.synthesized_magnitude[k]);
            let frequency = f64::from(self.synthesized_frequency[k]);

            let deviation = frequency / bin_width - k as f64;
            let delta = 2.0 * PI * deviation / self.oversampling as f64 + k as f64 * expected;

            self.phase_sum[k] += delta;
            let phase = self.phase_sum[k];

            self.workspace[k] =
                Complex::new((magnitude * phase.cos()) as f32, (magnitude * phase.sin()) as f32);
        }

        // Zero the negative-frequency bins; the doubled positive-bin magnitudes stand in for
        // them after the real part is taken below.
        for bin in self.workspace[half + 1..].iter_mut() {
            *bin = Complex::default();
        }

        self.fft.ifft_inplace(&mut self.workspace);

        // Window again and overlap-add. Squared Hann windows at this hop sum to 3O/8 and the
        // inverse transform is already 1/N-scaled, so a gain of 8/(3O) lands the resynthesis
        // at unity.
        let gain = 8.0 / (3.0 * self.oversampling as f32);

        for k in 0..frame {
            self.accumulator[k] += gain * self.window[k] * self.workspace[k].re;
        }

        self.out_fifo[..step].copy_from_slice(&self.accumulator[..step]);

        // Slide the accumulator and the input FIFO forward by one hop.
        self.accumulator.copy_within(step..step + frame, 0);
        self.accumulator[frame..].fill(0.0);
        self.in_fifo.copy_within(step.., 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    fn sine(freq: f64, rate: f64, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|t| amplitude * (2.0 * PI * freq * t as f64 / rate).sin() as f32)
            .collect()
    }

    #[test]
    fn verify_parameter_validation() {
        assert_eq!(PitchShifter::try_new(1000, 4, 44_100).err(), Some(Error::InvalidValue));
        assert_eq!(PitchShifter::try_new(32, 4, 44_100).err(), Some(Error::InvalidValue));
        assert_eq!(PitchShifter::try_new(1024, 0, 44_100).err(), Some(Error::InvalidValue));
        assert_eq!(PitchShifter::try_new(1024, 1, 44_100).err(), Some(Error::InvalidValue));
        assert_eq!(PitchShifter::try_new(1024, 4, 0).err(), Some(Error::InvalidValue));
        assert!(PitchShifter::try_new(1024, 4, 44_100).is_ok());
    }

    #[test]
    fn verify_allocation_seam_surfaces_out_of_memory() {
        // A reservation no allocator can satisfy must report failure, not abort.
        let huge: Result<Vec<f32>> = alloc_samples(usize::MAX / 2);
        assert_eq!(huge.err(), Some(Error::OutOfMemory));
    }

    #[test]
    fn verify_unity_ratio_is_a_pure_delay() {
        let mut shifter = PitchShifter::try_new(1024, 4, 44_100).unwrap();
        assert_eq!(shifter.latency(), 1024);

        let n = 6144;
        let input = sine(1000.0, 44_100.0, 0.8, n);
        let mut output = vec![0.0f32; n];
        shifter.process(1.0, &input, &mut output);

        // Once the pipeline is warm the output is the input delayed by one frame.
        let delay = shifter.latency();
        for i in 4 * 1024..n {
            assert!(
                (output[i] - input[i - delay]).abs() < 1e-4,
                "sample {} deviates: {} vs {}",
                i,
                output[i],
                input[i - delay]
            );
        }
    }

    #[test]
    fn verify_batched_processing_matches_one_shot() {
        let n = 4096;
        let input = sine(440.0, 44_100.0, 0.5, n);

        let mut one_shot = PitchShifter::try_new(512, 4, 44_100).unwrap();
        let mut expected = vec![0.0f32; n];
        one_shot.process(1.5, &input, &mut expected);

        // Feeding the same signal in uneven batches must be seamless.
        let mut batched = PitchShifter::try_new(512, 4, 44_100).unwrap();
        let mut actual = vec![0.0f32; n];
        let mut at = 0;
        for chunk in [100, 1, 511, 1024, 64, 2396] {
            batched.process(1.5, &input[at..at + chunk], &mut actual[at..at + chunk]);
            at += chunk;
        }
        assert_eq!(at, n);

        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-6);
        }
    }

    #[test]
    fn verify_reset_restores_initial_state() {
        let n = 2048;
        let input = sine(660.0, 44_100.0, 0.7, n);

        let mut shifter = PitchShifter::try_new(512, 4, 44_100).unwrap();
        let mut first = vec![0.0f32; n];
        shifter.process(2.0, &input, &mut first);

        shifter.reset();

        let mut second = vec![0.0f32; n];
        shifter.process(2.0, &input, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn verify_zero_samples_leave_state_unchanged() {
        let mut shifter = PitchShifter::try_new(512, 4, 44_100).unwrap();
        let input = sine(440.0, 44_100.0, 0.5, 1000);
        let mut output = vec![0.0f32; 1000];
        shifter.process(1.0, &input, &mut output);

        let overlap_before = shifter.overlap;
        shifter.process(1.0, &[], &mut []);
        assert_eq!(shifter.overlap, overlap_before);
    }
}
