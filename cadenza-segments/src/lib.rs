// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The processing segments of Project Cadenza.
//!
//! Each module provides one node for the mixing pipeline: the `pcm` codecs move audio across
//! the library boundary, `mixdown`, `general` and `space` shape it, `pitch` runs the phase
//! vocoder, `queue` sequences sub-graphs, and `plugin` adapts externally loaded processors.

pub mod general;
pub mod mixdown;
pub mod pcm;
pub mod pitch;
pub mod plugin;
pub mod queue;
pub mod space;
