// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolves a single hit-map field: either the raw 16-bit form, or the two-level compressed form
//! with its roll-back mechanic.

use crate::bitstream::BitCursor;
use crate::errors::Result;
use crate::tables::{BINARY_TREE_HIT_MAP, BINARY_TREE_ROW_HMAP};

/// Reads one hit-map field from `cursor`.
///
/// When `compressed` is `false` this is just a 16-bit read. When `true`, the blind 16-bit read
/// is first looked up in `BinaryTreeHitMap`; depending on its roll-back byte, the cursor is
/// rewound either just past the low byte (`rollback_bits == 0`), or all the way back to the
/// point where a 14-bit row-map field follows (`rollback_bits != 0`, including the `0xFF`
/// escape, which skips the initial rewind but still consults the row-map).
pub fn resolve(cursor: &mut BitCursor<'_>, compressed: bool) -> Result<u16> {
    let h = cursor.read_bits(16)?;

    if !compressed {
        return Ok(h as u16);
    }

    let e = BINARY_TREE_HIT_MAP[h as usize];
    let hitmap_low = e & 0xFFFF;
    let rollback_bits = (e >> 24) & 0xFF;
    let advance_cost = (e >> 16) & 0xFF;

    if rollback_bits > 0 {
        if rollback_bits != 0xFF {
            cursor.rewind(rollback_bits);
        }
        let rowmap = cursor.read_bits(14)?;
        let r = BINARY_TREE_ROW_HMAP[rowmap as usize];
        let hitmap = (hitmap_low as u32) | ((r & 0xFF) << 8);
        cursor.rewind((r >> 8) & 0xFF);
        Ok(hitmap as u16)
    }
    else {
        cursor.rewind(advance_cost);
        Ok(hitmap_low as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::BitWriter;

    #[test]
    fn raw_path_is_a_plain_16_bit_read() {
        let mut w = BitWriter::new();
        w.push_bits(0xBEEF, 16);
        w.push_bits(0, 48); // pad the block out
        let blocks = w.into_blocks();
        let mut cursor = BitCursor::new(&blocks);
        assert_eq!(resolve(&mut cursor, false).unwrap(), 0xBEEF);
        assert_eq!(cursor.logical_position(), 16);
    }

    #[test]
    fn compressed_zero_rollback_leaves_cursor_correctly_placed() {
        // Choose H with bit15 clear so BinaryTreeHitMap reports rollback_bits == 0,
        // advance_cost == 7: cursor should end up 7 bits before the next field, i.e. 9 bits
        // past the start of H (16 - 7 = 9).
        let h: u16 = 0b0_1010_1010_0000000;
        let mut w = BitWriter::new();
        w.push_bits(h as u64, 16);
        w.push_bits(0, 48);
        let blocks = w.into_blocks();
        let mut cursor = BitCursor::new(&blocks);
        let hitmap = resolve(&mut cursor, true).unwrap();
        assert_eq!(hitmap, (h >> 7) & 0xFF);
        assert_eq!(cursor.logical_position(), 9);
    }

    #[test]
    fn compressed_escape_rollback_still_reads_rowmap() {
        let h: u16 = 0xFFFF;
        let rowmap: u64 = 0x3FC0; // hi byte = 0xFF when (rowmap >> 6) & 0xFF
        let mut w = BitWriter::new();
        w.push_bits(h as u64, 16);
        w.push_bits(rowmap, 14);
        w.push_bits(0, 34);
        let blocks = w.into_blocks();
        let mut cursor = BitCursor::new(&blocks);
        let hitmap = resolve(&mut cursor, true).unwrap();
        assert_eq!(hitmap, 0xFFFF);
    }
}
