// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `fft` module implements the Fast Fourier Transform (FFT).
//!
//! The complex (I)FFT in this module supports a size up-to 65536. The FFT is implemented using
//! the radix-2 Cooley-Tukey algorithm: a precomputed bit-reversal permutation followed by
//! in-place butterfly passes over precomputed twiddle factors. The forward transform is
//! unscaled; the inverse transform is scaled by `1/N`.

use std::f64;

use super::complex::Complex;

/// The complex Fast Fourier Transform (FFT).
pub struct Fft {
    perm: Box<[u16]>,
    twiddle: Box<[Complex]>,
}

impl Fft {
    /// The maximum FFT size.
    pub const MAX_SIZE: usize = 1 << 16;

    /// Creates a transform plan for FFTs of size `n`. The size must be a power of two between 2
    /// and `MAX_SIZE`.
    pub fn new(n: usize) -> Self {
        assert!(n.is_power_of_two());
        // The permutation table uses 16-bit indicies, limiting the absolute maximum FFT size
        // to 2^16.
        assert!(2 <= n && n <= Fft::MAX_SIZE);

        // Calculate the bit-reversal permutation table.
        let bits = n.trailing_zeros();
        let perm = (0..n).map(|i| (i as u16).reverse_bits() >> (16 - bits)).collect();

        // Precompute the forward twiddle factors e^(-2πjk/n) for k < n/2. Each butterfly pass
        // strides this table, so one table serves every pass.
        let theta = -2.0 * f64::consts::PI / n as f64;

        let twiddle = (0..n / 2)
            .map(|k| {
                let angle = theta * k as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();

        Self { perm, twiddle }
    }

    /// Get the size of the FFT.
    pub fn size(&self) -> usize {
        self.perm.len()
    }

    /// Calculate the forward FFT in-place.
    pub fn fft_inplace(&self, x: &mut [Complex]) {
        let n = x.len();
        assert_eq!(n, self.perm.len());

        // Bit reversal using the precomputed permutation table.
        for (i, &j) in self.perm.iter().enumerate() {
            let j = usize::from(j);

            if i < j {
                x.swap(i, j);
            }
        }

        // Butterfly passes, doubling the sub-transform length each pass.
        let mut len = 2;

        while len <= n {
            let half = len / 2;
            let stride = n / len;

            for group in x.chunks_exact_mut(len) {
                let (even, odd) = group.split_at_mut(half);

                for (k, (e, o)) in even.iter_mut().zip(odd.iter_mut()).enumerate() {
                    let w = self.twiddle[k * stride];

                    let p = *e;
                    let q = *o * w;

                    *e = p + q;
                    *o = p - q;
                }
            }

            len <<= 1;
        }
    }

    /// Calculate the inverse FFT in-place. The output is scaled by `1/N`.
    pub fn ifft_inplace(&self, x: &mut [Complex]) {
        let n = x.len();
        assert_eq!(n, self.perm.len());

        // The inverse transform is the forward transform with real and imaginary components
        // swapped on the way in and out.
        for v in x.iter_mut() {
            *v = Complex { re: v.im, im: v.re };
        }

        self.fft_inplace(x);

        let c = 1.0 / n as f32;

        for v in x.iter_mut() {
            *v = Complex { re: c * v.im, im: c * v.re };
        }
    }
}
