// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end pipeline scenarios: full mixer graphs built from sources, effects, and drains,
//! driven batch by batch the way an application would.

use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use cadenza_core::audio::{make_buffer, BufferRef, ChannelDesc, ChannelLayout, SampleBuffer};
use cadenza_core::dsp::complex::Complex;
use cadenza_core::dsp::fft::Fft;
use cadenza_core::dsp::window;
use cadenza_core::errors::{last_error, take_last_error, Error, Result};
use cadenza_core::mixer::Mixer;
use cadenza_core::sample::SampleFormat;
use cadenza_core::segment::{
    make_segment, Field, FieldValue, MixStatus, Port, Segment, SegmentInfo, SegmentRef,
};
use cadenza_segments::general::GeneralSegment;
use cadenza_segments::pcm::{DrainSegment, SourceSegment};
use cadenza_segments::pitch::PitchSegment;
use cadenza_segments::queue::QueueSegment;

const RATE: u32 = 44_100;

/// Runs a wrapped segment for a fixed number of batches, then reports completion.
struct OneShot {
    inner: SegmentRef,
    batches: usize,
}

impl OneShot {
    fn new(inner: SegmentRef, batches: usize) -> OneShot {
        OneShot { inner, batches }
    }
}

impl Segment for OneShot {
    fn info(&self) -> SegmentInfo {
        self.inner.borrow().info()
    }

    fn mix(&mut self, samples: usize, rate: u32) -> Result<MixStatus> {
        if self.batches == 0 {
            return Ok(MixStatus::Finished);
        }
        self.batches -= 1;
        self.inner.borrow_mut().mix(samples, rate)
    }

    fn set_buffer(&mut self, port: Port, buffer: Option<BufferRef>) -> Result<()> {
        self.inner.borrow_mut().set_buffer(port, buffer)
    }

    fn get_buffer(&self, port: Port) -> Result<Option<BufferRef>> {
        self.inner.borrow().get_buffer(port)
    }
}

fn sine_sample(freq: f64, t: usize) -> f64 {
    (2.0 * PI * freq * t as f64 / f64::from(RATE)).sin()
}

/// The frequency of the strongest spectral peak of `signal`, in hertz.
fn dominant_frequency(signal: &[f32]) -> f64 {
    let n = signal.len();
    let hann = window::hann(n);

    let mut spectrum: Vec<Complex> =
        signal.iter().zip(hann.iter()).map(|(x, w)| Complex::new(x * w, 0.0)).collect();
    Fft::new(n).fft_inplace(&mut spectrum);

    let mut peak = 0;
    let mut peak_power = 0.0f32;
    for (k, bin) in spectrum[..n / 2].iter().enumerate() {
        let power = bin.re * bin.re + bin.im * bin.im;
        if power > peak_power {
            peak_power = power;
            peak = k;
        }
    }
    peak as f64 * f64::from(RATE) / n as f64
}

#[test]
fn verify_source_to_drain_round_trip_through_a_mixer() {
    // The two stereo frames of the reference blob: [0x0000, 0x7fff], [0x8000, 0xffff].
    let blob = vec![0x00u8, 0x00, 0xff, 0x7f, 0x00, 0x80, 0xff, 0xff];
    let shared = Rc::new(RefCell::new(blob.clone()));
    let channel = ChannelDesc::new(
        shared.clone(),
        SampleFormat::S16,
        2,
        ChannelLayout::Interleaved,
        RATE,
    );

    let left = make_buffer(2).unwrap();
    let right = make_buffer(2).unwrap();

    let source = make_segment(SourceSegment::try_new(channel.clone()).unwrap());
    let drain = make_segment(DrainSegment::try_new(channel).unwrap());
    source.borrow_mut().set_buffer(Port::Output(0), Some(left.clone())).unwrap();
    source.borrow_mut().set_buffer(Port::Output(1), Some(right.clone())).unwrap();
    drain.borrow_mut().set_buffer(Port::Input(0), Some(left.clone())).unwrap();
    drain.borrow_mut().set_buffer(Port::Input(1), Some(right.clone())).unwrap();

    let mut mixer = Mixer::new(RATE);
    mixer.add(&source).unwrap();
    mixer.add(&drain).unwrap();

    mixer.start().unwrap();
    mixer.mix(2).unwrap();
    mixer.end().unwrap();

    // The decoded float buffers carry the reference values...
    let tolerance = 1.0 / 32_768.0;
    assert_eq!(left.borrow().samples()[0], 0.0);
    assert!((left.borrow().samples()[1] + 1.0).abs() <= tolerance);
    assert!((right.borrow().samples()[0] - 1.0).abs() <= tolerance);
    assert!((right.borrow().samples()[1] + 0.000_031).abs() <= tolerance);

    // ...and the re-encoded blob is byte-for-byte identical.
    assert_eq!(*shared.borrow(), blob);
}

#[test]
fn verify_pitch_pipeline_doubles_a_tone() {
    let batch = 512;
    let batches = 16;

    let shared = Rc::new(RefCell::new(vec![0u8; batch * 2]));
    let channel =
        ChannelDesc::new(shared.clone(), SampleFormat::S16, 1, ChannelLayout::Interleaved, RATE);

    let decoded = make_buffer(batch).unwrap();
    let shifted = make_buffer(batch).unwrap();

    let source = make_segment(SourceSegment::try_new(channel.clone()).unwrap());
    let pitch = make_segment(PitchSegment::try_new(2.0, RATE).unwrap());
    let drain = make_segment(DrainSegment::try_new(channel).unwrap());

    source.borrow_mut().set_buffer(Port::Output(0), Some(decoded.clone())).unwrap();
    pitch.borrow_mut().set_buffer(Port::Input(0), Some(decoded)).unwrap();
    pitch.borrow_mut().set_buffer(Port::Output(0), Some(shifted.clone())).unwrap();
    drain.borrow_mut().set_buffer(Port::Input(0), Some(shifted)).unwrap();

    let mut mixer = Mixer::new(RATE);
    mixer.add(&source).unwrap();
    mixer.add(&pitch).unwrap();
    mixer.add(&drain).unwrap();

    mixer.start().unwrap();

    // Feed a 440 Hz sine through the pipeline batch by batch, collecting what the drain
    // encodes back into the blob.
    let mut played = Vec::with_capacity(batch * batches);
    for b in 0..batches {
        {
            let mut bytes = shared.borrow_mut();
            for i in 0..batch {
                let value = (sine_sample(440.0, b * batch + i) * 16_000.0) as i16;
                bytes[2 * i..2 * i + 2].copy_from_slice(&value.to_le_bytes());
            }
        }
        mixer.mix(batch).unwrap();
        let bytes = shared.borrow();
        for i in 0..batch {
            played.push(f32::from(i16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]])));
        }
    }
    mixer.end().unwrap();

    // After the shifter settles, the output's dominant tone sits an octave up, within one
    // analysis bin of 880 Hz.
    let tail = &played[played.len() - 4096..];
    let peak = dominant_frequency(tail);
    assert!((peak - 880.0).abs() < 22.0, "peak at {} Hz", peak);
}

#[test]
fn verify_queue_drains_child_by_child() {
    let batch = 512;

    let ins = [make_buffer(batch).unwrap(), make_buffer(batch).unwrap()];
    let outs = [make_buffer(batch).unwrap(), make_buffer(batch).unwrap()];
    for buffer in &ins {
        for (i, x) in buffer.borrow_mut().samples_mut().iter_mut().enumerate() {
            *x = (i as f32 * 0.05).sin() * 0.5;
        }
    }

    let mut queue = QueueSegment::new();
    for (at, buffer) in ins.iter().enumerate() {
        queue.set_buffer(Port::Input(at), Some(buffer.clone())).unwrap();
    }
    for (at, buffer) in outs.iter().enumerate() {
        queue.set_buffer(Port::Output(at), Some(buffer.clone())).unwrap();
    }

    let muted = make_segment(GeneralSegment::try_new(0.0, 0.0).unwrap());
    let unity = make_segment(GeneralSegment::try_new(1.0, 0.0).unwrap());
    queue.add(&make_segment(OneShot::new(muted, 1))).unwrap();
    queue.add(&make_segment(OneShot::new(unity, 1))).unwrap();

    let queue = make_segment(queue);
    let mut mixer = Mixer::new(RATE);
    mixer.add(&queue).unwrap();
    mixer.start().unwrap();

    // Batch 1: the muted child zeroes the outputs.
    mixer.mix(batch).unwrap();
    assert_eq!(outs[0].borrow().samples(), &vec![0.0; batch][..]);

    // Batch 2: the muted child reports completion; the unity child copies in-batch.
    mixer.mix(batch).unwrap();
    assert_eq!(outs[0].borrow().samples(), ins[0].borrow().samples());
    assert_eq!(outs[1].borrow().samples(), ins[1].borrow().samples());

    // Batch 3: the queue is empty and passes its inputs straight through.
    mixer.mix(batch).unwrap();
    assert_eq!(outs[0].borrow().samples(), ins[0].borrow().samples());
    match queue.borrow().get(Field::CurrentSegment).unwrap() {
        FieldValue::Segment(None) => (),
        _ => panic!("expected the queue to be drained"),
    }

    mixer.end().unwrap();
}

#[test]
fn verify_zero_sample_batches_change_nothing() {
    let blob = vec![0x34u8, 0x12, 0xcd, 0xab];
    let shared = Rc::new(RefCell::new(blob.clone()));
    let channel =
        ChannelDesc::new(shared.clone(), SampleFormat::S16, 1, ChannelLayout::Interleaved, RATE);

    let decoded = make_buffer(256).unwrap();
    let shifted = make_buffer(256).unwrap();

    let source = make_segment(SourceSegment::try_new(channel.clone()).unwrap());
    let pitch = make_segment(PitchSegment::try_new(1.5, RATE).unwrap());
    let drain = make_segment(DrainSegment::try_new(channel).unwrap());
    source.borrow_mut().set_buffer(Port::Output(0), Some(decoded.clone())).unwrap();
    pitch.borrow_mut().set_buffer(Port::Input(0), Some(decoded)).unwrap();
    pitch.borrow_mut().set_buffer(Port::Output(0), Some(shifted.clone())).unwrap();
    drain.borrow_mut().set_buffer(Port::Input(0), Some(shifted.clone())).unwrap();

    let mut mixer = Mixer::new(RATE);
    mixer.add(&source).unwrap();
    mixer.add(&pitch).unwrap();
    mixer.add(&drain).unwrap();

    mixer.start().unwrap();
    for _ in 0..8 {
        mixer.mix(0).unwrap();
    }
    mixer.end().unwrap();

    // Neither the blob nor the float buffers moved.
    assert_eq!(*shared.borrow(), blob);
    assert_eq!(shifted.borrow().samples(), &[0.0; 256][..]);
}

#[test]
fn verify_allocation_failure_surfaces_through_the_register() {
    take_last_error();

    // A buffer no allocator can satisfy: the factory must report the failure, roll its partial
    // work back, and record the code in the last-error register.
    let result = SampleBuffer::new(usize::MAX / 8);
    assert_eq!(result.err(), Some(Error::OutOfMemory));
    assert_eq!(last_error(), Some(Error::OutOfMemory));
    assert_eq!(take_last_error(), Some(Error::OutOfMemory));
    assert_eq!(last_error(), None);
}
