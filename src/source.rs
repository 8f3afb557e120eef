// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/source.rs - Line source for CNAB files.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::fs::File;
use std::io::BufReader;
use std::io::prelude::*;
use std::path::Path;

use flate2::read::{GzDecoder, ZlibDecoder};
use tracing::debug;

use crate::error::{Error, Result};

/// The record lines of a file, without line terminators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLines {
    lines: Vec<String>,
}

impl RawLines {
    /// Reads a file from disk. Gzip and zlib compressed files are inflated
    /// transparently.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |source| Error::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unavailable)?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            Error::Io(source) => unavailable(source),
            other => other,
        })
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;

        let bytes = inflate(buffer)?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!("input is not UTF-8, reading as ISO-8859-1");
                e.into_bytes().iter().map(|&b| b as char).collect()
            }
        };

        Ok(Self::from_text(&text))
    }

    /// Splits text on `\n` or `\r\n` and drops trailing blank lines.
    pub fn from_text(text: &str) -> Self {
        let mut lines: Vec<String> = text
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.lines
    }
}

impl From<Vec<String>> for RawLines {
    fn from(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

fn inflate(data: Vec<u8>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    if data.starts_with(&[0x1f, 0x8b]) {
        GzDecoder::new(data.as_slice()).read_to_end(&mut buffer)?;
        debug!(compressed = data.len(), inflated = buffer.len(), "inflated gzip input");
        return Ok(buffer);
    }

    // No CNAB record starts with 'x', so a valid zlib header is unambiguous.
    if data.len() >= 2 && data[0] == 0x78 && u16::from_be_bytes([data[0], data[1]]) % 31 == 0 {
        ZlibDecoder::new(data.as_slice()).read_to_end(&mut buffer)?;
        debug!(compressed = data.len(), inflated = buffer.len(), "inflated zlib input");
        return Ok(buffer);
    }

    Ok(data)
}
