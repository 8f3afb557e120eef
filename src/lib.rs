// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/lib.rs - Decoder and encoder library for CNAB banking files.
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
 * # `cnabparser` Crate
 *
 * A library for decoding and encoding CNAB files, the fixed-width batch
 * transfer files Brazilian banks exchange with their clients (200, 240 and
 * 400 columns per record).
 *
 * The pipeline has these stages:
 *
 * 1. [source]: Reads a file into record lines, inflating it if compressed.
 * 2. [layout]: Describes the fields of every record of a bank's layout.
 * 3. [picture] and [line]: Convert between raw columns and typed values.
 * 4. [builder]: Groups the lines into batches, titles and segments.
 * 5. [remessa] and [retorno]: Decode sending/returning files into a
 *    [model::Document], and encode returning files back into lines.
 *
 * ## Usage Example
 *
 * ```no_run
 * use std::fs::File;
 *
 * use cnabparser::layout::{Direction, Format, LayoutBuilder};
 * use cnabparser::retorno::RetornoFile;
 * use cnabparser::source::RawLines;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     // Load the bank's layout
 *     let layout = LayoutBuilder::new(Format::Cnab400)
 *         .segment_bounds(Direction::Returning, "1", "1")
 *         .load_csv(File::open("cnab400.csv")?)?
 *         .build()?;
 *
 *     // Read and decode the returning file
 *     let lines = RawLines::from_path("CB010100.RET")?;
 *     let document = RetornoFile::new(&layout, &lines).generate()?;
 *
 *     for batch in &document.batches {
 *         for title in &batch.titles {
 *             for (code, segment) in title.segments() {
 *                 println!("Segment {}: {} field(s)", code, segment.len());
 *             }
 *         }
 *     }
 *
 *     Ok(())
 * }
 * ```
 */

pub mod builder;
pub mod error;
pub mod layout;
pub mod line;
pub mod model;
pub mod picture;
pub mod remessa;
pub mod retorno;
pub mod source;

pub use error::{Error, Result};
