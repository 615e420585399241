// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `window` module provides analysis window functions for block-based processing.

use std::f64;

/// Builds a periodic Hann window of the given size: `w[k] = 0.5 - 0.5 * cos(2πk / size)`.
///
/// The periodic form sums to a constant when overlapped at any hop that divides the size into
/// three or more parts, which makes it suitable for overlap-add resynthesis.
pub fn hann(size: usize) -> Vec<f32> {
    let step = 2.0 * f64::consts::PI / size as f64;
    (0..size).map(|k| (0.5 - 0.5 * (step * k as f64).cos()) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_hann() {
        let w = hann(8);
        assert_eq!(w.len(), 8);
        // Endpoint, peak, and symmetry of the periodic form.
        assert!(w[0].abs() < 1e-7);
        assert!((w[4] - 1.0).abs() < 1e-7);
        assert!((w[1] - w[7]).abs() < 1e-7);
        assert!((w[2] - 0.5).abs() < 1e-7);
    }

    #[test]
    fn verify_hann_overlap_adds_to_a_constant() {
        // Squared Hann windows at 75% overlap must sum to 3/2 everywhere.
        let size = 64;
        let hop = size / 4;
        let w = hann(size);

        for n in 0..hop {
            let mut sum = 0.0f64;
            for m in 0..4 {
                let k = n + m * hop;
                sum += f64::from(w[k]) * f64::from(w[k]);
            }
            assert!((sum - 1.5).abs() < 1e-6);
        }
    }
}
