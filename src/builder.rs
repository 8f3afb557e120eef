// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/builder.rs - Batch/title/segment grouping of CNAB record lines.
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
 * # `builder` Module
 *
 * CNAB files carry no title lengths or counts, so titles are recovered from
 * the segment codes alone. The [HierarchyBuilder] walks the lines once,
 * peeking one line ahead, and closes the title being accumulated when
 * either:
 *
 * * the next line starts with the layout's "first" segment code, or
 * * the current line carries the layout's "last" segment code.
 *
 * In CNAB240, batch header and trailer records additionally open and close
 * batches. CNAB200 and CNAB400 files hold a single implicit batch.
 *
 * ## Usage Example
 *
 * ```no_run
 * use cnabparser::builder::HierarchyBuilder;
 * use cnabparser::layout::{Direction, Layout};
 *
 * fn count_titles(layout: &Layout, lines: &[String]) -> Result<usize, cnabparser::error::Error> {
 *     let batches = HierarchyBuilder::new(layout, Direction::Returning, lines).run()?;
 *     Ok(batches.iter().map(|b| b.titles.len()).sum())
 * }
 * ```
 */

use std::mem;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::layout::{Direction, Layout, RecordKind, RecordRole};
use crate::line::Line;
use crate::model::{Batch, Document, SegmentData, Title};
use crate::picture::CodecOptions;

/// Where the scan stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Reading lines into the current title.
    AccumulatingTitle,
    /// A batch trailer or the file trailer was read; the batch is emitted
    /// on the next step.
    ClosingBatch,
    /// The file trailer has been processed.
    Done,
}

/// Folds a flat sequence of record lines into batches of titles.
#[derive(Debug)]
pub struct HierarchyBuilder<'a, S> {
    layout: &'a Layout,
    direction: Direction,
    options: CodecOptions,
    lines: &'a [S],
    cursor: usize,
    state: ScanState,
    reached_trailer: bool,
    batch_open: bool,
    current: Title,
    titles: Vec<Title>,
    batch_header: Option<SegmentData>,
    batch_trailer: Option<SegmentData>,
    batches: Vec<Batch>,
    stray_headers: usize,
}

impl<'a, S: AsRef<str>> HierarchyBuilder<'a, S> {
    pub fn new(layout: &'a Layout, direction: Direction, lines: &'a [S]) -> Self {
        Self {
            layout,
            direction,
            options: CodecOptions::default(),
            lines,
            cursor: 0,
            state: ScanState::AccumulatingTitle,
            reached_trailer: false,
            batch_open: false,
            current: Title::new(),
            titles: Vec::new(),
            batch_header: None,
            batch_trailer: None,
            batches: Vec::new(),
            stray_headers: 0,
        }
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Titles closed so far in the batch being built.
    pub fn closed_titles(&self) -> &[Title] {
        &self.titles
    }

    /// Batches emitted so far.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// File-header records found after the first line. Blank or garbled
    /// lines decode as record type 0 under the coercing numeric policy and
    /// land here.
    pub fn stray_headers(&self) -> usize {
        self.stray_headers
    }

    /// Advances the scan by one transition and returns the new state.
    pub fn step(&mut self) -> Result<ScanState> {
        match self.state {
            ScanState::Done => {}
            ScanState::ClosingBatch => {
                self.close_batch();
                self.state = if self.reached_trailer {
                    ScanState::Done
                } else {
                    ScanState::AccumulatingTitle
                };
            }
            ScanState::AccumulatingTitle => {
                let index = self.cursor;
                let lines = self.lines;
                let text = lines.get(index).ok_or(Error::UnterminatedFile)?.as_ref();
                self.cursor += 1;
                self.state = self.accumulate(index, text)?;
            }
        }
        Ok(self.state)
    }

    /// Runs the scan to completion and returns the batches.
    pub fn run(mut self) -> Result<Vec<Batch>> {
        debug!(lines = self.lines.len(), direction = %self.direction, "grouping records");
        while self.step()? != ScanState::Done {}
        debug!(
            batches = self.batches.len(),
            lines_scanned = self.cursor,
            "grouping finished"
        );
        Ok(self.batches)
    }

    fn line(&self, index: usize, text: &'a str) -> Line<'a> {
        Line::new(text, index + 1, self.layout, self.direction).with_options(self.options)
    }

    fn accumulate(&mut self, index: usize, text: &'a str) -> Result<ScanState> {
        let layout = self.layout;
        let line = self.line(index, text);
        let format = layout.format();

        match format.classify(line.record_type()?) {
            RecordKind::FileHeader if index > 0 => {
                debug!(line = index + 1, "file header record inside the file, skipping");
                self.stray_headers += 1;
                Ok(ScanState::AccumulatingTitle)
            }
            RecordKind::FileHeader => {
                trace!(line = index + 1, "skipping file header");
                Ok(ScanState::AccumulatingTitle)
            }
            RecordKind::FileTrailer => {
                self.close_title(index, "file trailer");
                self.reached_trailer = true;
                if self.batch_open || !self.titles.is_empty() || !format.has_batch_records() {
                    Ok(ScanState::ClosingBatch)
                } else {
                    Ok(ScanState::Done)
                }
            }
            RecordKind::BatchHeader => {
                self.close_title(index, "batch header");
                if self.batch_open {
                    debug!(line = index + 1, "batch header without trailer, closing batch");
                    self.close_batch();
                }
                self.batch_header = Some(line.role_data(&RecordRole::HeaderLote)?);
                self.batch_open = true;
                debug!(line = index + 1, "batch opened");
                Ok(ScanState::AccumulatingTitle)
            }
            RecordKind::BatchTrailer => {
                self.close_title(index, "batch trailer");
                self.batch_trailer = Some(line.role_data(&RecordRole::TrailerLote)?);
                Ok(ScanState::ClosingBatch)
            }
            RecordKind::Detail => {
                let code = line.segment_code()?;
                let data = line.segment_data(&code)?;
                self.current.insert(&code, data);
                self.batch_open = true;

                let bounds = layout.direction(self.direction)?;
                let next_opens = self
                    .peek_segment_code(index + 1)
                    .is_some_and(|next| bounds.is_first_segment(&next));
                if next_opens {
                    self.close_title(index, "next segment opens a title");
                } else if bounds.is_last_segment(&code) {
                    self.close_title(index, "last segment of title");
                }
                Ok(ScanState::AccumulatingTitle)
            }
        }
    }

    /// Segment code of the line at `index`, if there is such a line and the
    /// code can be read.
    fn peek_segment_code(&self, index: usize) -> Option<String> {
        let lines = self.lines;
        let text = lines.get(index)?.as_ref();
        self.line(index, text).segment_code().ok()
    }

    fn close_title(&mut self, index: usize, reason: &str) {
        if self.current.is_empty() {
            return;
        }
        trace!(
            line = index + 1,
            segments = self.current.len(),
            reason,
            "title closed"
        );
        self.titles.push(mem::take(&mut self.current));
    }

    fn close_batch(&mut self) {
        self.close_title(self.cursor.saturating_sub(1), "batch closed");
        let batch = Batch {
            header: self.batch_header.take(),
            titles: mem::take(&mut self.titles),
            trailer: self.batch_trailer.take(),
        };
        debug!(titles = batch.titles.len(), "batch closed");
        self.batches.push(batch);
        self.batch_open = false;
    }
}

/// Decodes a whole file: header from the first line, trailer from the last
/// line, batches from the scan in between.
pub(crate) fn decode_document<S: AsRef<str>>(
    layout: &Layout,
    direction: Direction,
    lines: &[S],
    options: CodecOptions,
) -> Result<Document> {
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return Err(Error::EmptyFile { lines: 0 });
    };
    if lines.len() < 2 {
        return Err(Error::EmptyFile { lines: lines.len() });
    }

    let header_arquivo = Line::new(first.as_ref(), 1, layout, direction)
        .with_options(options)
        .role_data(&RecordRole::HeaderArquivo)?;
    let trailer_arquivo = Line::new(last.as_ref(), lines.len(), layout, direction)
        .with_options(options)
        .role_data(&RecordRole::TrailerArquivo)?;

    let batches = HierarchyBuilder::new(layout, direction, lines)
        .with_options(options)
        .run()?;

    Ok(Document {
        header_arquivo,
        trailer_arquivo,
        batches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FieldDef, Format, LayoutBuilder};
    use crate::picture::Value;

    fn field(name: &str, start: usize, end: usize, picture: &str) -> FieldDef {
        FieldDef::parse(name, start, end, picture).unwrap()
    }

    /// CNAB200-style layout: two-column record type doubling as segment
    /// code, titles opened by "01" and closed by "05".
    fn layout_200() -> Layout {
        let mut builder = LayoutBuilder::new(Format::Cnab200)
            .segment_bounds(Direction::Sending, "01", "05")
            .field(
                Direction::Sending,
                RecordRole::HeaderArquivo,
                field("tipo_registro", 1, 2, "9(2)"),
            )
            .field(
                Direction::Sending,
                RecordRole::HeaderArquivo,
                field("empresa", 3, 12, "X(10)"),
            )
            .field(
                Direction::Sending,
                RecordRole::TrailerArquivo,
                field("tipo_registro", 1, 2, "9(2)"),
            )
            .field(
                Direction::Sending,
                RecordRole::TrailerArquivo,
                field("quantidade", 3, 8, "9(6)"),
            );
        for code in ["01", "02", "05"] {
            builder = builder
                .field(
                    Direction::Sending,
                    RecordRole::segment(code),
                    field("codigo", 1, 2, "X(2)"),
                )
                .field(
                    Direction::Sending,
                    RecordRole::segment(code),
                    field("valor", 3, 7, "9(5)"),
                );
        }
        builder.build().unwrap()
    }

    fn line(prefix: &str) -> String {
        format!("{:<200}", prefix)
    }

    fn codes(title: &Title) -> Vec<&str> {
        title.segments().map(|(c, _)| c).collect()
    }

    #[test]
    fn test_boundary_rule() {
        let layout = layout_200();
        let lines = [
            line("00ACME"),
            line("0100001"),
            line("0200002"),
            line("0100003"),
            line("0200004"),
            line("0500005"),
            line("09000007"),
        ];

        let batches = HierarchyBuilder::new(&layout, Direction::Sending, &lines)
            .run()
            .unwrap();
        assert_eq!(batches.len(), 1);
        let titles = &batches[0].titles;
        assert_eq!(titles.len(), 2);
        assert_eq!(codes(&titles[0]), ["01", "02"]);
        assert_eq!(codes(&titles[1]), ["01", "02", "05"]);
        assert_eq!(
            titles[1].segment("05").unwrap().get("valor"),
            Some(&Value::Integer(5))
        );
    }

    #[test]
    fn test_blank_line_counts_as_stray_header() {
        let layout = layout_200();
        let lines = [
            line("00"),
            line("0100001"),
            line(""),
            line("0500002"),
            line("09"),
        ];
        let mut builder = HierarchyBuilder::new(&layout, Direction::Sending, &lines);
        while builder.step().unwrap() != ScanState::Done {}
        assert_eq!(builder.stray_headers(), 1);
        assert_eq!(builder.batches()[0].titles.len(), 1);
        assert_eq!(codes(&builder.batches()[0].titles[0]), ["01", "05"]);
    }

    #[test]
    fn test_title_without_last_segment_closes_at_trailer() {
        let layout = layout_200();
        let lines = [
            line("00"),
            line("0100001"),
            line("0200002"),
            line("09"),
        ];
        let batches = HierarchyBuilder::new(&layout, Direction::Sending, &lines)
            .run()
            .unwrap();
        assert_eq!(batches[0].titles.len(), 1);
        assert_eq!(codes(&batches[0].titles[0]), ["01", "02"]);
    }

    #[test]
    fn test_repeated_code_overwrites_within_title() {
        let layout = layout_200();
        let lines = [
            line("00"),
            line("0100001"),
            line("0200002"),
            line("0200003"),
            line("09"),
        ];
        let batches = HierarchyBuilder::new(&layout, Direction::Sending, &lines)
            .run()
            .unwrap();
        let title = &batches[0].titles[0];
        assert_eq!(title.len(), 2);
        assert_eq!(
            title.segment("02").unwrap().get("valor"),
            Some(&Value::Integer(3))
        );
    }

    #[test]
    fn test_state_transitions() {
        let layout = layout_200();
        let lines = [line("00"), line("0100001"), line("0500002"), line("09")];
        let mut builder = HierarchyBuilder::new(&layout, Direction::Sending, &lines);

        assert_eq!(builder.state(), ScanState::AccumulatingTitle);
        assert_eq!(builder.step().unwrap(), ScanState::AccumulatingTitle);
        assert_eq!(builder.step().unwrap(), ScanState::AccumulatingTitle);
        assert!(builder.closed_titles().is_empty());
        assert_eq!(builder.step().unwrap(), ScanState::AccumulatingTitle);
        assert_eq!(builder.closed_titles().len(), 1);
        assert_eq!(builder.step().unwrap(), ScanState::ClosingBatch);
        assert!(builder.batches().is_empty());
        assert_eq!(builder.step().unwrap(), ScanState::Done);
        assert_eq!(builder.batches().len(), 1);
        assert_eq!(builder.step().unwrap(), ScanState::Done);
    }

    #[test]
    fn test_scan_stops_at_trailer() {
        let layout = layout_200();
        let lines = [line("00"), line("0100001"), line("09"), line("0100002")];
        let batches = HierarchyBuilder::new(&layout, Direction::Sending, &lines)
            .run()
            .unwrap();
        assert_eq!(batches[0].titles.len(), 1);
    }

    #[test]
    fn test_unterminated_file() {
        let layout = layout_200();
        let lines = [line("00"), line("0100001")];
        assert!(matches!(
            HierarchyBuilder::new(&layout, Direction::Sending, &lines).run(),
            Err(Error::UnterminatedFile)
        ));
    }

    #[test]
    fn test_unrecognized_segment() {
        let layout = layout_200();
        let lines = [line("00"), line("0100001"), line("0300002"), line("09")];
        assert!(matches!(
            HierarchyBuilder::new(&layout, Direction::Sending, &lines).run(),
            Err(Error::UnrecognizedSegment { key, line: 3 }) if key == "segmento_03"
        ));
    }

    #[test]
    fn test_header_and_trailer_only() {
        let layout = layout_200();
        let lines = [line("00ACME"), line("09000000")];
        let document =
            decode_document(&layout, Direction::Sending, &lines, CodecOptions::default()).unwrap();
        assert_eq!(document.total_batches(), 1);
        assert_eq!(document.total_titles(), 0);
        assert_eq!(
            document.header_arquivo.get("empresa"),
            Some(&Value::from("ACME"))
        );
        assert_eq!(
            document.trailer_arquivo.get("tipo_registro"),
            Some(&Value::Integer(9))
        );
    }

    #[test]
    fn test_empty_file() {
        let layout = layout_200();
        let lines = [line("00")];
        assert!(matches!(
            decode_document(&layout, Direction::Sending, &lines, CodecOptions::default()),
            Err(Error::EmptyFile { lines: 1 })
        ));
        let none: [String; 0] = [];
        assert!(matches!(
            decode_document(&layout, Direction::Sending, &none, CodecOptions::default()),
            Err(Error::EmptyFile { lines: 0 })
        ));
    }
}
