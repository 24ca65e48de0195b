// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `framer` module reassembles per-channel [`Stream`]s from interleaved 32-bit words.
//!
//! Pushing is push-only and single-threaded: a [`Framer`] accumulates blocks into one buffer per
//! channel and hands a buffer over as a completed `Stream` the moment it sees the next NS=1 block
//! for that channel. Memory use is bounded by the size of in-flight streams, never more.

use std::collections::HashMap;

use log::warn;

use crate::errors::{odd_word_count_error, unexpected_channel_error, Result};
use crate::model::{ChannelId, Stream};

/// Reassembles blocks into per-channel streams.
pub struct Framer {
    expected_channels: Vec<ChannelId>,
    strict_channels: bool,
    buffers: HashMap<ChannelId, Vec<u64>>,
    completed: Vec<Stream>,
}

impl Framer {
    /// Creates a framer that accepts only the given channels; blocks tagged with any other
    /// channel are dropped with a warning (see `push_words`' doc comment for the rationale).
    pub fn new(expected_channels: Vec<ChannelId>) -> Self {
        Framer {
            expected_channels,
            strict_channels: false,
            buffers: HashMap::new(),
            completed: Vec::new(),
        }
    }

    /// Switches this framer to strict-channel mode: a block carrying a `CH` outside the
    /// configured channel set becomes a fatal `DecodeError::UnexpectedChannel` from
    /// `push_words` instead of a dropped, `warn!`-logged block. Off by default, matching the
    /// lenient "warn or drop; caller decides" behavior `push_words` otherwise documents.
    pub fn with_strict_channels(mut self, strict: bool) -> Self {
        self.strict_channels = strict;
        self
    }

    /// Pairs `words` into 64-bit blocks (`word0` is the MS half) and ingests each in order.
    ///
    /// `words.len()` must be even; an odd count is a fatal framing error rather than a truncated
    /// trailing block, since a lone half-block cannot be meaningfully paired.
    ///
    /// A block whose `CH` is not in the configured channel set is dropped with a `warn!` log
    /// line rather than propagated as an error, unless this framer was built with
    /// [`Framer::with_strict_channels`], in which case it aborts the whole call with
    /// `DecodeError::UnexpectedChannel`.
    pub fn push_words(&mut self, words: &[u32]) -> Result<()> {
        if words.len() % 2 != 0 {
            return odd_word_count_error();
        }

        for pair in words.chunks(2) {
            let block = ((pair[0] as u64) << 32) | (pair[1] as u64);
            self.push_block(block)?;
        }

        Ok(())
    }

    fn push_block(&mut self, block: u64) -> Result<()> {
        let ns = (block >> 63) & 1 != 0;
        let ch_raw = ((block >> 61) & 0b11) as u8;

        let channel = match ChannelId::new(ch_raw) {
            Some(ch) if self.expected_channels.contains(&ch) => ch,
            _ if self.strict_channels => return unexpected_channel_error(ch_raw),
            _ => {
                warn!("dropping block with unexpected channel CH={ch_raw}");
                return Ok(());
            }
        };

        if ns {
            if let Some(buf) = self.buffers.get_mut(&channel) {
                if !buf.is_empty() {
                    let finished = std::mem::take(buf);
                    self.completed.push(Stream::new(channel, finished));
                }
            }
        }

        self.buffers.entry(channel).or_default().push(block);
        Ok(())
    }

    /// Drains and returns every stream completed so far for `channel`, in the order they were
    /// closed. Streams still open (awaiting their closing NS=1 block) are left buffered.
    pub fn streams_for(&mut self, channel: ChannelId) -> Vec<Stream> {
        let (matching, rest) = self.completed.drain(..).partition(|s| s.channel == channel);
        self.completed = rest;
        matching
    }

    /// Flushes every channel's open buffer as a completed stream, regardless of whether its
    /// closing NS=1 block has been seen. Intended for end-of-capture cleanup.
    pub fn flush(&mut self) {
        for (channel, buf) in self.buffers.iter_mut() {
            if !buf.is_empty() {
                let finished = std::mem::take(buf);
                self.completed.push(Stream::new(*channel, finished));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(ns: u64, ch: u64) -> u64 {
        (ns << 63) | (ch << 61)
    }

    fn words_for(blocks: &[u64]) -> Vec<u32> {
        let mut words = Vec::new();
        for b in blocks {
            words.push((b >> 32) as u32);
            words.push((*b & 0xFFFF_FFFF) as u32);
        }
        words
    }

    #[test]
    fn odd_word_count_is_rejected() {
        let mut framer = Framer::new(vec![ChannelId::new(0).unwrap()]);
        assert!(framer.push_words(&[1]).is_err());
    }

    #[test]
    fn scenario_s5_framer_reassembly() {
        let ch0 = ChannelId::new(0).unwrap();
        let ch1 = ChannelId::new(1).unwrap();

        let blocks = [
            block(1, 0), // NS=1, CH=0 -- opens stream A on ch0
            block(0, 0), // NS=0, CH=0 -- continues stream A
            block(1, 1), // NS=1, CH=1 -- opens (and, being alone, stays open) stream on ch1
            block(1, 0), // NS=1, CH=0 -- closes stream A (2 blocks), opens stream B
        ];
        let words = words_for(&blocks);

        let mut framer = Framer::new(vec![ch0, ch1]);
        framer.push_words(&words).unwrap();
        framer.flush();

        let streams0 = framer.streams_for(ch0);
        assert_eq!(streams0.len(), 2);
        assert_eq!(streams0[0].len_blocks(), 2);
        assert_eq!(streams0[1].len_blocks(), 1);

        let streams1 = framer.streams_for(ch1);
        assert_eq!(streams1.len(), 1);
        assert_eq!(streams1[0].len_blocks(), 1);
    }

    #[test]
    fn unexpected_channel_is_dropped_not_fatal() {
        let ch0 = ChannelId::new(0).unwrap();
        let mut framer = Framer::new(vec![ch0]);
        let words = words_for(&[block(1, 2)]);
        assert!(framer.push_words(&words).is_ok());
        framer.flush();
        assert!(framer.streams_for(ch0).is_empty());
    }

    #[test]
    fn strict_channels_makes_unexpected_channel_fatal() {
        use crate::errors::DecodeError;

        let ch0 = ChannelId::new(0).unwrap();
        let mut framer = Framer::new(vec![ch0]).with_strict_channels(true);
        let words = words_for(&[block(1, 2)]);
        assert_eq!(framer.push_words(&words), Err(DecodeError::UnexpectedChannel { channel: 2 }));
    }
}
