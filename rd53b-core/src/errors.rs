// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type returned by the decoder.
//!
//! Every error is fatal: a malformed stream is reported to the caller, never silently repaired.
//! Protocol-level variants carry enough context (core column, quarter-row, tag, cursor position)
//! to support offline forensic analysis of a bad capture.

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// Enumerates every way decoding can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The first block of a stream did not have its NS bit set.
    MalformedHeader,
    /// A stream's header `CH` field did not match the channel it was filed under.
    ChannelMismatch { expected: u8, found: u8 },
    /// A block carried a `CH` value outside the set of channels the framer was configured for.
    UnexpectedChannel { channel: u8 },
    /// The total number of `u32` words fed to the framer was odd.
    OddWordCount,
    /// A normal-path hit record decoded a hit map with zero population (no ToT data follows).
    NoTot { ccol: u16, qrow: u8, hitmap: u16 },
    /// A projected pixel coordinate fell outside the 400x384 array.
    OutOfBounds { col: u16, row: u16 },
    /// The bit cursor was advanced past the end of the stream's blocks.
    CursorOverflow,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MalformedHeader => {
                write!(f, "stream header missing NS bit")
            }
            DecodeError::ChannelMismatch { expected, found } => {
                write!(f, "stream header CH={found} does not match filed channel CH={expected}")
            }
            DecodeError::UnexpectedChannel { channel } => {
                write!(f, "block carries unexpected channel CH={channel}")
            }
            DecodeError::OddWordCount => {
                write!(f, "odd number of 32-bit words, cannot pair into 64-bit blocks")
            }
            DecodeError::NoTot { ccol, qrow, hitmap } => {
                write!(
                    f,
                    "no-ToT fragment: ccol={ccol} qrow={qrow} hitmap={hitmap:#06x} has zero population"
                )
            }
            DecodeError::OutOfBounds { col, row } => {
                write!(f, "projected pixel (col={col}, row={row}) is outside the 400x384 array")
            }
            DecodeError::CursorOverflow => {
                write!(f, "read past the end of the stream's blocks")
            }
        }
    }
}

impl StdError for DecodeError {}

/// Result type returned throughout the decoder.
pub type Result<T> = result::Result<T, DecodeError>;

/// Convenience constructor for a malformed-header error.
pub fn malformed_header_error<T>() -> Result<T> {
    Err(DecodeError::MalformedHeader)
}

/// Convenience constructor for a channel-mismatch error.
pub fn channel_mismatch_error<T>(expected: u8, found: u8) -> Result<T> {
    Err(DecodeError::ChannelMismatch { expected, found })
}

/// Convenience constructor for an odd-word-count error.
pub fn odd_word_count_error<T>() -> Result<T> {
    Err(DecodeError::OddWordCount)
}

/// Convenience constructor for an unexpected-channel error.
pub fn unexpected_channel_error<T>(channel: u8) -> Result<T> {
    Err(DecodeError::UnexpectedChannel { channel })
}

/// Convenience constructor for a no-ToT error.
pub fn no_tot_error<T>(ccol: u16, qrow: u8, hitmap: u16) -> Result<T> {
    Err(DecodeError::NoTot { ccol, qrow, hitmap })
}

/// Convenience constructor for an out-of-bounds projection error.
pub fn out_of_bounds_error<T>(col: u16, row: u16) -> Result<T> {
    Err(DecodeError::OutOfBounds { col, row })
}

/// Convenience constructor for a cursor-overflow error.
pub fn cursor_overflow_error<T>() -> Result<T> {
    Err(DecodeError::CursorOverflow)
}
