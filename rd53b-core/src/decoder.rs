// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Walks a single [`Stream`]'s bit sequence and materializes its [`Event`] list.
//!
//! This is the state machine at the center of the decoder: stream header, then a loop over
//! events delimited by the CCOL sentinel, each holding a loop over hit records for the CCOL
//! currently open.

use log::trace;

use crate::bitstream::BitCursor;
use crate::errors::{
    channel_mismatch_error, malformed_header_error, no_tot_error, out_of_bounds_error, Result,
};
use crate::hitmap;
use crate::model::{DecoderConfig, Event, Hit, Stream};
use crate::tables::{PLAIN_HMAP_TO_COLROW, PLAIN_HMAP_TO_COLROW_ARR_SIZE, PTOT_MASK_STAGING};

const ARRAY_COLS: u16 = 400;
const ARRAY_ROWS: u16 = 384;
const PRECISION_QROW_THRESHOLD: u16 = 196;

/// Decodes every event carried by `stream`, under `config`.
///
/// The stream's header is validated (`NS` must be set, `CH` must match the channel the stream
/// was filed under) before any event is read. A malformed header aborts before any `Event` is
/// produced; a protocol or projection error partway through returns the events decoded so far
/// alongside the error, so callers can still inspect whatever was recovered. On a successful
/// decode, a stream that produced zero hits across all of its events is reported as an empty
/// list rather than a list of hit-less events, so callers can filter empty streams with a plain
/// `is_empty()` check.
pub fn decode_stream(stream: &Stream, config: &DecoderConfig) -> (Vec<Event>, Result<()>) {
    let mut cursor = BitCursor::new(&stream.blocks);
    let mut events = Vec::new();

    match decode_header(&mut cursor, stream) {
        Ok(tag) => {
            let outcome = run(&mut cursor, tag, config, &mut events);
            if outcome.is_ok() && events.iter().map(|e| e.hits.len()).sum::<usize>() == 0 {
                events.clear();
            }
            (events, outcome)
        }
        Err(e) => (events, Err(e)),
    }
}

fn decode_header(cursor: &mut BitCursor<'_>, stream: &Stream) -> Result<u16> {
    let ns = cursor.read_bits(1)?;
    if ns != 1 {
        return malformed_header_error();
    }

    let ch = cursor.read_bits(2)? as u8;
    if ch != stream.channel.value() {
        return channel_mismatch_error(stream.channel.value(), ch);
    }

    let tag = cursor.read_bits(8)?;
    Ok(tag as u16)
}

fn run(
    cursor: &mut BitCursor<'_>,
    initial_tag: u16,
    config: &DecoderConfig,
    events: &mut Vec<Event>,
) -> Result<()> {
    let mut current = Event::new(initial_tag);

    loop {
        let ccol = cursor.read_bits(6)? as u16;

        if ccol == 0 {
            events.push(current);
            return Ok(());
        }

        if ccol >= 56 {
            events.push(current);
            let r = cursor.read_bits(5)? as u16;
            let tag = (ccol << 5) | r;
            current = Event::new(tag);
            continue;
        }

        decode_hit_records(cursor, ccol, config, &mut current)?;
    }
}

/// Decodes every hit record for one open CCOL, i.e. until a record with `IS_LAST == 1` is seen.
fn decode_hit_records(
    cursor: &mut BitCursor<'_>,
    ccol: u16,
    config: &DecoderConfig,
    event: &mut Event,
) -> Result<()> {
    let mut qrow: u16 = 0;
    // The firmware this protocol mirrors never advances this counter; it stays 0 for every
    // precision-path record. Preserved as-is rather than guessing an increment rule.
    let step: u32 = 0;

    loop {
        let is_last = cursor.read_bits(1)?;
        let is_neighbor = cursor.read_bits(1)?;

        if is_neighbor == 1 {
            qrow += 1;
        }
        else {
            qrow = cursor.read_bits(8)? as u16;
        }

        let hitmap = hitmap::resolve(cursor, config.do_compressed_hitmap)?;

        if qrow >= PRECISION_QROW_THRESHOLD {
            decode_precision_record(cursor, ccol, step, hitmap, config, event)?;
        }
        else {
            decode_normal_record(cursor, ccol, qrow, hitmap, event)?;
        }

        trace!("ccol={ccol} qrow={qrow} hitmap={hitmap:#06x} is_last={is_last}");

        if is_last == 1 {
            return Ok(());
        }
    }
}

fn decode_normal_record(
    cursor: &mut BitCursor<'_>,
    ccol: u16,
    qrow: u16,
    hitmap: u16,
    event: &mut Event,
) -> Result<()> {
    let n = PLAIN_HMAP_TO_COLROW_ARR_SIZE[hitmap as usize] as usize;
    if n == 0 {
        return no_tot_error(ccol, qrow as u8, hitmap);
    }

    let tot_field = read_wide(cursor, 4 * n as u32)?;
    let nibbles = &PLAIN_HMAP_TO_COLROW[hitmap as usize];

    for ihit in 0..n {
        let tot_val = ((tot_field >> (ihit * 4)) & 0xF) as u8;
        if tot_val == 0 {
            continue;
        }

        let nibble = nibbles[ihit];
        let col_offset = (nibble >> 4) as u16;
        let row_offset = (nibble & 0xF) as u16;
        let col = (ccol - 1) * 8 + col_offset;
        let row = qrow * 2 + row_offset;

        if col >= ARRAY_COLS || row >= ARRAY_ROWS {
            return out_of_bounds_error(col, row);
        }

        event.hits.push(Hit::normal(col, row, tot_val));
    }

    Ok(())
}

fn decode_precision_record(
    cursor: &mut BitCursor<'_>,
    ccol: u16,
    step: u32,
    hitmap: u16,
    config: &DecoderConfig,
    event: &mut Event,
) -> Result<()> {
    for ibus in 0..4u32 {
        let hitbus = (hitmap >> (ibus * 4)) & 0xF;
        if hitbus == 0 {
            continue;
        }

        let mut buf: u16 = 0xFFFF;
        for iread in 0..4u32 {
            if hitbus & (1 << iread) == 0 {
                continue;
            }
            let nibble = cursor.read_bits(4)? as u16;
            let inverted = (!nibble) & 0xF;
            buf &= !(0xFu16 << (iread * 4));
            buf |= inverted << (iread * 4);
        }

        if !config.enable_precision_tot {
            continue;
        }

        let ptot = buf & 0x7FF;
        let ptoa = (buf >> 11) as u8;
        let col = (ccol - 1) * 8 + PTOT_MASK_STAGING[(step % 4) as usize][ibus as usize] as u16 + 1;
        let row = (step / 2) as u16 + 1;

        if col > ARRAY_COLS || row > ARRAY_ROWS {
            return out_of_bounds_error(col, row);
        }

        event.hits.push(Hit::precision(col, row, ptot, ptoa));
    }

    Ok(())
}

/// Reads `n` bits (possibly more than the 32-bit single-read limit) as one big-endian value,
/// splitting into at most two `read_bits` calls. `n` must be at most 64.
fn read_wide(cursor: &mut BitCursor<'_>, n: u32) -> Result<u64> {
    if n <= 32 {
        return Ok(cursor.read_bits(n)? as u64);
    }

    let high_len = n - 32;
    let high = cursor.read_bits(high_len)? as u64;
    let low = cursor.read_bits(32)? as u64;
    Ok((high << 32) | low)
}
