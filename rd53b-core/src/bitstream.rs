// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `bitstream` module implements the MSB-first, frame-aware bit cursor the decoder walks a
//! [`Stream`](crate::model::Stream)'s blocks with.
//!
//! Bits are numbered from the start of block 0, bit 63 first. Each 64-bit block contributes 61
//! logical bits of payload: bits 63..61 (NS + CH) of every block *after* the first are framing,
//! not protocol data, and are skipped whenever a read crosses into that block. Reads that land
//! entirely within one block never see this; only cross-block reads need the 3-bit correction.
//!
//! The cursor is rewindable: the hit-map resolver (`hitmap::resolve`) walks it backwards to
//! realign after a variable-length compressed code.

use crate::errors::{cursor_overflow_error, Result};

/// A rewindable, frame-aware bit cursor over a stream's 64-bit blocks.
pub struct BitCursor<'a> {
    blocks: &'a [u64],
    /// Absolute bit position, measured from the start of block 0 in its raw 64-bit layout (i.e.
    /// including the 3 framing bits of every block). This is *not* the logical bit count; use
    /// `logical_position` for that.
    position: usize,
}

impl<'a> BitCursor<'a> {
    /// Creates a cursor positioned at the very start of `blocks`.
    pub fn new(blocks: &'a [u64]) -> Self {
        BitCursor { blocks, position: 0 }
    }

    /// Current cursor position expressed as a logical bit count (0 at the very first bit of
    /// block 0, increasing by 1 per bit read, regardless of which block it falls in).
    pub fn logical_position(&self) -> usize {
        let block_idx = self.position / 64;
        let bit_in_block = self.position % 64;
        block_idx * 61 + bit_in_block.min(61)
    }

    /// Reads `n` bits (1 <= n <= 32), MSB-first, advancing the cursor. Mirrors the reference
    /// `retrieve(pos, length, data)` routine bit-for-bit, including the cross-block 3-bit
    /// framing-prefix skip.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n >= 1 && n <= 32);

        let start_pos = self.position;
        let end_pos = start_pos + n as usize;

        if end_pos > self.total_logical_bits_raw() {
            return cursor_overflow_error();
        }

        let start_block = start_pos / 64;
        let end_block = (end_pos - 1) / 64;

        let value = if start_block == end_block {
            let pos_in_block_end = end_pos - start_block * 64;
            let shift = 64 - pos_in_block_end;
            let mask: u64 = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
            (self.blocks[start_block] >> shift) & mask
        }
        else {
            // Cross-block read: skip the 3-bit NS+CH framing prefix of the second block.
            let n_over = end_pos % 64;
            let length_first = n as usize - n_over;
            let mask_first: u64 = if length_first == 64 { u64::MAX } else { (1u64 << length_first) - 1 };
            let mask_second: u64 = if n_over == 64 { u64::MAX } else { (1u64 << n_over) - 1 };

            let value0 = self.blocks[start_block] & mask_first;
            let value1 = (self.blocks[end_block] >> ((63 - 3) - (n_over - 1))) & mask_second;
            (value0 << n_over) | value1
        };

        self.position = end_pos;
        Ok(value as u32)
    }

    /// Rewinds the cursor by `n` bits. Used by the hit-map resolver's roll-back mechanic.
    pub fn rewind(&mut self, n: u32) {
        debug_assert!(n as usize <= self.position);
        self.position -= n as usize;
    }

    /// Raw bit capacity (64 bits per block, including framing bits); only used to bound reads.
    fn total_logical_bits_raw(&self) -> usize {
        self.blocks.len() * 64
    }
}

/// A minimal MSB-first bit writer, the mirror image of [`BitCursor`], used by tests to synthesize
/// streams byte-exactly from the protocol grammar instead of hand-assembling `u64` block literals.
#[cfg(test)]
pub(crate) struct BitWriter {
    bits: Vec<bool>,
}

#[cfg(test)]
impl BitWriter {
    pub(crate) fn new() -> Self {
        BitWriter { bits: Vec::new() }
    }

    pub(crate) fn push_bits(&mut self, value: u64, n: u32) {
        for i in (0..n).rev() {
            self.bits.push((value >> i) & 1 != 0);
        }
    }

    /// Packs the written bits into 64-bit blocks, padding the final block with zeros.
    pub(crate) fn into_blocks(self) -> Vec<u64> {
        let mut blocks = Vec::new();
        let mut chunks = self.bits.chunks(64);
        for chunk in &mut chunks {
            let mut block: u64 = 0;
            for (i, bit) in chunk.iter().enumerate() {
                if *bit {
                    block |= 1u64 << (63 - i);
                }
            }
            blocks.push(block);
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_within_single_block() {
        // NS=1, CH=0b10, tag=0xAB, rest zero.
        let block: u64 = (1u64 << 63) | (0b10u64 << 61) | (0xABu64 << (61 - 8));
        let mut cursor = BitCursor::new(&[block]);
        assert_eq!(cursor.read_bits(1).unwrap(), 1);
        assert_eq!(cursor.read_bits(2).unwrap(), 0b10);
        assert_eq!(cursor.read_bits(8).unwrap(), 0xAB);
    }

    #[test]
    fn rewind_then_reread() {
        let block: u64 = 0b1010_0000u64 << 56;
        let mut cursor = BitCursor::new(&[block]);
        assert_eq!(cursor.read_bits(4).unwrap(), 0b1010);
        cursor.rewind(4);
        assert_eq!(cursor.read_bits(4).unwrap(), 0b1010);
    }

    #[test]
    fn cross_block_skips_framing_prefix() {
        // Second block's top 3 bits (NS+CH) must not leak into the logical stream.
        let block0: u64 = 0b101u64; // low 3 bits of block0 = 0b101 (part of a CCOL field)
        let block1: u64 = 0b010u64 << 61; // NS=0, CH=0b10, then payload starts
        let mut cursor = BitCursor::new(&[block0, block1]);
        cursor.rewind(0);
        // Position cursor at bit 61 of block0 (i.e. 3 bits before the block boundary).
        let mut c2 = BitCursor { blocks: &[block0, block1], position: 61 };
        let ccol = c2.read_bits(6).unwrap();
        assert_eq!(ccol, 0b101_000);
    }
}
