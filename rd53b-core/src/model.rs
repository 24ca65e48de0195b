// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `model` module defines the value types that flow between the framer and the decoder:
//! blocks, streams, events, hits, and the channel identifier used to key the framer's buffers.

/// The 2-bit channel identifier carried in bits 62..61 of every block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub(crate) u8);

impl ChannelId {
    /// Constructs a `ChannelId` from its 2-bit value. Returns `None` if `raw > 3`.
    pub fn new(raw: u8) -> Option<Self> {
        if raw <= 0b11 {
            Some(ChannelId(raw))
        }
        else {
            None
        }
    }

    /// Returns the raw 2-bit channel value.
    pub fn value(self) -> u8 {
        self.0
    }
}

/// An ordered sequence of 64-bit blocks sharing a common channel, delimited by NS bits.
///
/// The first block's NS bit is set; no other block in the stream has NS set. `blocks` is
/// consumed by exactly one decoder invocation.
#[derive(Debug, Clone)]
pub struct Stream {
    pub channel: ChannelId,
    pub blocks: Vec<u64>,
}

impl Stream {
    pub(crate) fn new(channel: ChannelId, blocks: Vec<u64>) -> Self {
        Stream { channel, blocks }
    }

    /// Number of 64-bit blocks in this stream.
    pub fn len_blocks(&self) -> usize {
        self.blocks.len()
    }
}

/// A single pixel hit.
///
/// Normal-path hits carry `tot` with `ptot`/`ptoa` left at `0`; precision-path hits (qrow >= 196)
/// carry `ptot`/`ptoa` with `tot` left at `0`. The two are distinguished by which fields the
/// producing code path fills in, not by a tag, mirroring the original protocol's reuse of one
/// hit record shape for both ToT modes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Hit {
    pub col: u16,
    pub row: u16,
    pub tot: u8,
    pub ptot: u16,
    pub ptoa: u8,
}

impl Hit {
    pub(crate) fn normal(col: u16, row: u16, tot: u8) -> Self {
        Hit { col, row, tot, ptot: 0, ptoa: 0 }
    }

    pub(crate) fn precision(col: u16, row: u16, ptot: u16, ptoa: u8) -> Self {
        Hit { col, row, tot: 0, ptot, ptoa }
    }
}

/// One event: a tag plus the hits recorded against it, in protocol order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub tag: u16,
    pub hits: Vec<Hit>,
}

impl Event {
    pub(crate) fn new(tag: u16) -> Self {
        Event { tag, hits: Vec::new() }
    }
}

/// Decoder configuration: the handful of booleans the chip's register state determines and that
/// the decoder must be told explicitly rather than guess.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Mirrors the chip's `DataEnRaw` register bit: `true` selects the compressed hit-map path
    /// in every hit record, `false` selects the raw 16-bit path. There is no implicit default;
    /// callers must set this from the chip configuration they loaded.
    pub do_compressed_hitmap: bool,
    /// Gates the qrow >= 196 precision-ToT/ToA path. The original firmware's `step` counter for
    /// this path is hard-coded to zero and never incremented; this implementation preserves that
    /// behavior exactly, so the path is off by default until the upstream chip specification
    /// clarifies the intended `step` progression.
    pub enable_precision_tot: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig { do_compressed_hitmap: false, enable_precision_tot: false }
    }
}
