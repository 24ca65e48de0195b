// ITkPix RD53B event-stream decoder
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stand-in for the hardware controller link that produces raw readout words: a source of `u32`
//! words, lazily. This implementation reads them from a capture file instead of a live chip --
//! the only concrete `WordSource` this repository needs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A source of raw 32-bit words pulled from the readout link.
///
/// The real hardware controller is out of scope for this repository; this trait exists so the
/// CLI's wiring (`words -> framer -> decoder`) does not depend on any one concrete source.
pub trait WordSource {
    fn read_all(&self) -> io::Result<Vec<u32>>;
}

/// Reads one hex-encoded `u32` per non-empty, non-comment line of a text file.
pub struct FileWordSource {
    path: PathBuf,
}

impl FileWordSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("capture file {} does not exist", path.display()),
            ));
        }
        Ok(FileWordSource { path: path.to_path_buf() })
    }
}

impl WordSource for FileWordSource {
    fn read_all(&self) -> io::Result<Vec<u32>> {
        let text = fs::read_to_string(&self.path)?;
        let mut words = Vec::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let stripped = line.strip_prefix("0x").unwrap_or(line);
            let word = u32::from_str_radix(stripped, 16).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line {}: invalid hex word {line:?}: {e}", lineno + 1),
                )
            })?;
            words.push(word);
        }

        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_hex_words_skipping_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "# header\n0x80000000\n\nFFFFFFFF\n").unwrap();

        let source = FileWordSource::open(file.path()).unwrap();
        let words = source.read_all().unwrap();
        assert_eq!(words, vec![0x80000000, 0xFFFFFFFF]);
    }

    #[test]
    fn missing_capture_file_is_an_error() {
        let missing = Path::new("/nonexistent/rd53b-capture.txt");
        assert!(FileWordSource::open(missing).is_err());
    }
}
