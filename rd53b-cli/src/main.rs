// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Command line front-end for the decoder core.
//!
//! The real hardware controller and chip configuration layer are out of scope for this
//! repository (see `rd53b-core`'s crate docs); this binary's job is narrower than its flag list
//! suggests. `--hw`/`--chip`/`-p`/`-s`/`-t` are accepted and parsed as JSON for completeness and
//! threaded through to nowhere in particular -- there is no chip register model here to apply
//! them to. The one flag that does something is the capture path: a text file of hex `u32` words,
//! one per line, standing in for the real hardware link.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};
use serde_json::Value;

use rd53b_core::{ChannelId, DecoderConfig, Framer};

mod word_source;

use word_source::{FileWordSource, WordSource};

#[derive(Parser, Debug)]
#[command(name = "rd53b-cli", version, about = "ITkPix / RD53B event-stream decoder CLI")]
struct Cli {
    /// Capture file: one hex-encoded u32 word per line.
    capture: PathBuf,

    /// Hardware config path (accepted, not applied -- out of scope).
    #[arg(long = "hw", value_name = "JSON")]
    hw_config: Option<PathBuf>,

    /// Chip config path (accepted, not applied -- out of scope).
    #[arg(long = "chip", value_name = "JSON")]
    chip_config: Option<PathBuf>,

    /// Primary chip config path.
    #[arg(short = 'p', long = "primary", value_name = "JSON")]
    primary_config: Option<PathBuf>,

    /// Secondary chip config path.
    #[arg(short = 's', long = "secondary", value_name = "JSON")]
    secondary_config: Option<PathBuf>,

    /// Trigger config path (accepted, not applied -- out of scope).
    #[arg(short = 't', long = "trigger", value_name = "JSON")]
    trigger_config: Option<PathBuf>,

    /// Expected chip id; the capture is not validated against it (no chip link here), recorded
    /// only for parity with the original tool's flag surface.
    #[arg(short = 'i', long = "chip-id")]
    chip_id: Option<u32>,

    /// Enable debug-level logging.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Skip the config-file-existence checks.
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Stop after framing; report per-channel stream counts and skip decoding.
    #[arg(short = 'x', long = "no-decode")]
    no_decode: bool,

    /// Decode the compressed hit-map path (mirrors the chip's DataEnRaw register bit).
    #[arg(long = "compressed-hitmap")]
    compressed_hitmap: bool,

    /// Decode the provisional precision-ToT/ToA path for qrow >= 196.
    #[arg(long = "precision-tot")]
    precision_tot: bool,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    if cli.debug {
        info!("debug logging requested via -d/--debug");
    }

    if !cli.force {
        for (label, path) in [
            ("--hw", &cli.hw_config),
            ("--chip", &cli.chip_config),
            ("-p/--primary", &cli.primary_config),
            ("-s/--secondary", &cli.secondary_config),
            ("-t/--trigger", &cli.trigger_config),
        ] {
            if let Some(path) = path {
                check_config_exists(label, path)?;
            }
        }
    }

    if let Some(id) = cli.chip_id {
        info!("expected chip id {id} (not checked against the capture: no chip link in scope)");
    }

    let source = FileWordSource::open(&cli.capture)
        .map_err(|e| format!("failed to read capture {}: {e}", cli.capture.display()))?;
    let words = source.read_all().map_err(|e| format!("failed to read words: {e}"))?;

    let channels: Vec<ChannelId> = (0u8..4).filter_map(ChannelId::new).collect();
    let mut framer = Framer::new(channels.clone());
    framer.push_words(&words).map_err(|e| format!("framing error: {e}"))?;
    framer.flush();

    if cli.no_decode {
        for channel in channels {
            let streams = framer.streams_for(channel);
            println!("channel {}: {} stream(s)", channel.value(), streams.len());
        }
        return Ok(());
    }

    let config = DecoderConfig {
        do_compressed_hitmap: cli.compressed_hitmap,
        enable_precision_tot: cli.precision_tot,
    };

    let mut had_error = false;
    for channel in channels {
        for stream in framer.streams_for(channel) {
            let (events, outcome) = rd53b_core::decode_stream(&stream, &config);
            for event in &events {
                println!(
                    "channel {} tag {:#06x}: {} hit(s)",
                    channel.value(),
                    event.tag,
                    event.hits.len()
                );
                for hit in &event.hits {
                    println!("    {hit:?}");
                }
            }
            if let Err(e) = outcome {
                warn!("stream on channel {} ended with a decoding error: {e}", channel.value());
                had_error = true;
            }
        }
    }

    if had_error {
        return Err("one or more streams failed to decode".to_string());
    }

    Ok(())
}

fn check_config_exists(label: &str, path: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("{label} config {} not found: {e}", path.display()))?;
    let _: Value = serde_json::from_str(&contents)
        .map_err(|e| format!("{label} config {} is not valid JSON: {e}", path.display()))?;
    Ok(())
}
