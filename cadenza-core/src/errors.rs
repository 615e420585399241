// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type and the last-error register.

use std::cell::Cell;
use std::fmt;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by Cadenza.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An allocation could not be satisfied.
    OutOfMemory,
    /// A channel descriptor names a sample encoding the codec does not know.
    UnknownEncoding,
    /// A channel descriptor names a channel layout the codec does not know.
    UnknownLayout,
    /// An external processing unit failed while mixing a batch.
    MixingFailed,
    /// The segment does not supply the requested operation.
    NotImplemented,
    /// The operation requires state that has not been set up, such as unwired
    /// buffers or a mixer that was never started.
    NotInitialized,
    /// The segment is already present in, or absent from, the mixer.
    InvalidIndex,
    /// The buffer location lies outside the segment's port range.
    InvalidLocation,
    /// The segment does not expose the requested field.
    InvalidField,
    /// The supplied value is of the wrong kind or outside the field's domain.
    InvalidValue,
}

impl Error {
    /// The register code of the error. Code 0 is reserved for "no error".
    pub fn code(self) -> u32 {
        match self {
            Error::OutOfMemory => 1,
            Error::UnknownEncoding => 2,
            Error::UnknownLayout => 3,
            Error::MixingFailed => 4,
            Error::NotImplemented => 5,
            Error::NotInitialized => 6,
            Error::InvalidIndex => 7,
            Error::InvalidLocation => 8,
            Error::InvalidField => 9,
            Error::InvalidValue => 10,
        }
    }

    /// Maps a register code back to an `Error`. Code 0, and any code outside
    /// the taxonomy, maps to `None`.
    pub fn from_code(code: u32) -> Option<Error> {
        match code {
            1 => Some(Error::OutOfMemory),
            2 => Some(Error::UnknownEncoding),
            3 => Some(Error::UnknownLayout),
            4 => Some(Error::MixingFailed),
            5 => Some(Error::NotImplemented),
            6 => Some(Error::NotInitialized),
            7 => Some(Error::InvalidIndex),
            8 => Some(Error::InvalidLocation),
            9 => Some(Error::InvalidField),
            10 => Some(Error::InvalidValue),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Error::OutOfMemory => "an allocation could not be satisfied",
            Error::UnknownEncoding => "unknown sample encoding",
            Error::UnknownLayout => "unknown channel layout",
            Error::MixingFailed => "an external processing unit failed to mix",
            Error::NotImplemented => "the operation is not supplied by this segment",
            Error::NotInitialized => "required state has not been set up",
            Error::InvalidIndex => "the segment is already present or absent",
            Error::InvalidLocation => "buffer location out of range",
            Error::InvalidField => "the field is not exposed by this segment",
            Error::InvalidValue => "the value is of the wrong kind or out of range",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

thread_local! {
    /// The most recently recorded error code. Code 0 means no error was
    /// recorded. The pipeline runs on the calling thread, so the register is
    /// kept per thread.
    static LAST_ERROR: Cell<u32> = const { Cell::new(0) };
}

/// Records `error` in the last-error register and returns it. The register is
/// a compatibility layer; rich `Result`s are the primary channel.
pub fn record(error: Error) -> Error {
    LAST_ERROR.with(|last| last.set(error.code()));
    error
}

/// Reads the most recently recorded error without clearing it.
pub fn last_error() -> Option<Error> {
    Error::from_code(LAST_ERROR.with(|last| last.get()))
}

/// Reads and clears the most recently recorded error.
pub fn take_last_error() -> Option<Error> {
    Error::from_code(LAST_ERROR.with(|last| last.replace(0)))
}

/// Convenience function to create an out-of-memory error.
pub fn out_of_memory_error<T>() -> Result<T> {
    Err(record(Error::OutOfMemory))
}

/// Convenience function to create an unknown-encoding error.
pub fn unknown_encoding_error<T>() -> Result<T> {
    Err(record(Error::UnknownEncoding))
}

/// Convenience function to create an unknown-layout error.
pub fn unknown_layout_error<T>() -> Result<T> {
    Err(record(Error::UnknownLayout))
}

/// Convenience function to create a mixing-failed error.
pub fn mixing_failed_error<T>() -> Result<T> {
    Err(record(Error::MixingFailed))
}

/// Convenience function to create a not-implemented error.
pub fn not_implemented_error<T>() -> Result<T> {
    Err(record(Error::NotImplemented))
}

/// Convenience function to create a not-initialized error.
pub fn not_initialized_error<T>() -> Result<T> {
    Err(record(Error::NotInitialized))
}

/// Convenience function to create an invalid-index error.
pub fn invalid_index_error<T>() -> Result<T> {
    Err(record(Error::InvalidIndex))
}

/// Convenience function to create an invalid-location error.
pub fn invalid_location_error<T>() -> Result<T> {
    Err(record(Error::InvalidLocation))
}

/// Convenience function to create an invalid-field error.
pub fn invalid_field_error<T>() -> Result<T> {
    Err(record(Error::InvalidField))
}

/// Convenience function to create an invalid-value error.
pub fn invalid_value_error<T>() -> Result<T> {
    Err(record(Error::InvalidValue))
}
