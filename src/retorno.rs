// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/retorno.rs - Decoder and encoder for CNAB returning ("retorno") files.
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
 * # `retorno` Module
 *
 * Returning files are what a bank sends back after processing a sending
 * file. [RetornoFile] decodes them; [RetornoWriter] renders a [Document]
 * back into fixed-width lines.
 *
 * ## Usage Example
 *
 * ```no_run
 * use std::fs::File;
 * use std::io::BufWriter;
 *
 * use cnabparser::layout::{Direction, Format, LayoutBuilder};
 * use cnabparser::retorno::{RetornoFile, RetornoWriter};
 * use cnabparser::source::RawLines;
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let layout = LayoutBuilder::new(Format::Cnab240)
 *         .segment_bounds(Direction::Returning, "T", "U")
 *         .load_csv(File::open("cnab240.csv")?)?
 *         .build()?;
 *
 *     let lines = RawLines::from_path("CN010100.RET")?;
 *     let retorno = RetornoFile::new(&layout, &lines);
 *     println!("{} batch(es) declared", retorno.total_batches()?);
 *
 *     let document = retorno.generate()?;
 *     let output = BufWriter::new(File::create("copy.RET")?);
 *     RetornoWriter::new(&layout).write(&document, output)?;
 *
 *     Ok(())
 * }
 * ```
 */

use std::io::Write;

use tracing::debug;

use crate::builder::decode_document;
use crate::error::{Error, Result};
use crate::layout::{Direction, Layout, RecordRole};
use crate::line::{Line, encode_record};
use crate::model::{Document, SegmentData};
use crate::picture::CodecOptions;
use crate::source::RawLines;

/// A returning file ready to be decoded.
#[derive(Debug)]
pub struct RetornoFile<'a> {
    layout: &'a Layout,
    lines: &'a RawLines,
    options: CodecOptions,
}

impl<'a> RetornoFile<'a> {
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

    /// The batch count declared by the file trailer. Only CNAB240 records
    /// it; other formats always hold a single batch.
    pub fn total_batches(&self) -> Result<usize> {
        let Some(field) = self.layout.format().batch_count_field() else {
            return Ok(1);
        };
        let trailer = self.lines.lines().last().ok_or(Error::EmptyFile { lines: 0 })?;
        let value = Line::new(trailer, self.lines.len(), self.layout, Direction::Returning)
            .with_options(self.options)
            .field_value(&field)?;
        Ok(value.as_integer().unwrap_or(0) as usize)
    }

    /// Decodes the file header, the file trailer and every batch.
    pub fn generate(&self) -> Result<Document> {
        debug!(format = %self.layout.format(), lines = self.lines.len(), "decoding retorno");
        decode_document(
            self.layout,
            Direction::Returning,
            self.lines.lines(),
            self.options,
        )
    }
}

/// Renders returning-file documents as fixed-width lines.
#[derive(Debug)]
pub struct RetornoWriter<'a> {
    layout: &'a Layout,
    options: CodecOptions,
}

impl<'a> RetornoWriter<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self {
            layout,
            options: CodecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    /// Flattens the document into lines, each exactly as wide as the
    /// format's records.
    pub fn encode(&self, document: &Document) -> Result<Vec<String>> {
        let retorno = self.layout.direction(Direction::Returning)?;
        let width = self.layout.format().record_width();
        let mut lines = Vec::new();

        let encode_role = |role: RecordRole, data: &SegmentData| {
            encode_record(retorno.require(&role)?, data, width, &self.options)
        };

        lines.push(encode_role(RecordRole::HeaderArquivo, &document.header_arquivo)?);

        for batch in &document.batches {
            if let Some(header) = &batch.header {
                lines.push(encode_role(RecordRole::HeaderLote, header)?);
            }
            for title in &batch.titles {
                for (code, data) in title.segments() {
                    let record = retorno.segment(code).map_err(|e| match e {
                        Error::UnrecognizedSegment { key, .. } => Error::UnrecognizedSegment {
                            key,
                            line: lines.len() + 1,
                        },
                        other => other,
                    })?;
                    lines.push(encode_record(record, data, width, &self.options)?);
                }
            }
            if let Some(trailer) = &batch.trailer {
                lines.push(encode_role(RecordRole::TrailerLote, trailer)?);
            }
        }

        lines.push(encode_role(RecordRole::TrailerArquivo, &document.trailer_arquivo)?);

        debug!(
            lines = lines.len(),
            batches = document.total_batches(),
            titles = document.total_titles(),
            "encoded retorno"
        );

        Ok(lines)
    }

    /// Encodes the document and writes it with CRLF line endings.
    pub fn write<W: Write>(&self, document: &Document, mut writer: W) -> Result<()> {
        for line in self.encode(document)? {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\r\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
