// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bit-packed event-stream decoder for the ITkPix / RD53B pixel readout chip.
//!
//! A capture is a flat sequence of 32-bit words. [`framer::Framer`] reassembles them into
//! per-channel [`model::Stream`]s; [`decoder::decode_stream`] walks a stream's bit sequence and
//! produces the [`model::Event`]/[`model::Hit`] lists a caller actually wants. Everything in
//! between -- the [`bitstream::BitCursor`], the [`hitmap`] resolver, and the static [`tables`] --
//! exists to make that walk exact down to the bit.

pub mod bitstream;
pub mod decoder;
pub mod errors;
pub mod framer;
pub mod hitmap;
pub mod model;
pub mod tables;

pub use decoder::decode_stream;
pub use errors::{DecodeError, Result};
pub use framer::Framer;
pub use model::{ChannelId, DecoderConfig, Event, Hit, Stream};
