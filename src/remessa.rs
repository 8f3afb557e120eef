// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/remessa.rs - Decoder for CNAB sending ("remessa") files.
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

/*!
 * # `remessa` Module
 *
 * Decodes a sending file, the one a client hands to its bank, using the
 * sending half of a [Layout].
 *
 * ## Usage Example
 *
 * ```no_run
 * use std::fs::File;
 *
 * use cnabparser::layout::{Direction, Format, LayoutBuilder};
 * use cnabparser::remessa::RemessaFile;
 * use cnabparser::source::RawLines;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let layout = LayoutBuilder::new(Format::Cnab400)
 *         .segment_bounds(Direction::Sending, "1", "1")
 *         .load_csv(File::open("cnab400.csv")?)?
 *         .build()?;
 *
 *     let lines = RawLines::from_path("CB010100.REM")?;
 *     let document = RemessaFile::new(&layout, &lines).generate()?;
 *
 *     println!("{} title(s)", document.total_titles());
 *
 *     Ok(())
 * }
 * ```
 */

use tracing::debug;

use crate::builder::decode_document;
use crate::error::Result;
use crate::layout::{Direction, Layout};
use crate::model::Document;
use crate::picture::CodecOptions;
use crate::source::RawLines;

/// A sending file ready to be decoded.
#[derive(Debug)]
pub struct RemessaFile<'a> {
    layout: &'a Layout,
    lines: &'a RawLines,
    options: CodecOptions,
}

impl<'a> RemessaFile<'a> {
    pub fn new(layout: &'a Layout, lines: &'a RawLines) -> Self {
        Self {
            layout,
            lines,
            options: CodecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    /// Sending files always hold a single batch.
    pub fn total_batches(&self) -> usize {
        1
    }

    /// Decodes the file header, the file trailer and every title.
    pub fn generate(&self) -> Result<Document> {
        debug!(format = %self.layout.format(), lines = self.lines.len(), "decoding remessa");
        decode_document(
            self.layout,
            Direction::Sending,
            self.lines.lines(),
            self.options,
        )
    }
}
