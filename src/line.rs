// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/line.rs - Field access on fixed-width CNAB record lines.
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
 * # `line` Module
 *
 * A [Line] reads typed values out of one raw record line, using the field
 * definitions of either the sending or the returning layout.
 * [encode_record] goes the other way.
 */

use crate::error::{Error, Result};
use crate::layout::{Direction, FieldDef, Layout, RecordLayout, RecordRole};
use crate::model::SegmentData;
use crate::picture::{CodecOptions, Value};

/// One raw record line, bound to a layout and a direction.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    text: &'a str,
    number: usize,
    layout: &'a Layout,
    direction: Direction,
    options: CodecOptions,
}

impl<'a> Line<'a> {
    /// `number` is the 1-based line number used in error messages.
    pub fn new(text: &'a str, number: usize, layout: &'a Layout, direction: Direction) -> Self {
        Self {
            text,
            number,
            layout,
            direction,
            options: CodecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Decodes the columns covered by `field`.
    pub fn field_value(&self, field: &FieldDef) -> Result<Value> {
        let raw = slice_columns(self.text, field.start, field.end).ok_or_else(|| {
            Error::LineTooShort {
                line: self.number,
                needed: field.end,
                actual: self.text.chars().count(),
            }
        })?;
        field.picture.decode(raw, &field.name, &self.options)
    }

    /// Decodes every field of a record layout.
    pub fn record_data(&self, record: &RecordLayout) -> Result<SegmentData> {
        let mut data = SegmentData::new();
        for field in record.fields() {
            data.set(&field.name, self.field_value(field)?);
        }
        Ok(data)
    }

    /// Decodes the line as a file or batch header/trailer.
    pub fn role_data(&self, role: &RecordRole) -> Result<SegmentData> {
        let record = self.layout.direction(self.direction)?.require(role)?;
        self.record_data(record)
    }

    /// Decodes the line as the segment with the given code.
    pub fn segment_data(&self, code: &str) -> Result<SegmentData> {
        let record = self
            .layout
            .direction(self.direction)?
            .segment(code)
            .map_err(|e| match e {
                Error::UnrecognizedSegment { key, .. } => Error::UnrecognizedSegment {
                    key,
                    line: self.number,
                },
                other => other,
            })?;
        self.record_data(record)
    }

    /// The numeric record-type discriminator.
    pub fn record_type(&self) -> Result<u128> {
        let field = self.layout.format().record_type_field();
        Ok(self.field_value(&field)?.as_integer().unwrap_or(0))
    }

    pub fn segment_code(&self) -> Result<String> {
        let field = self.layout.format().segment_code_field();
        Ok(self.field_value(&field)?.to_string().trim().to_string())
    }
}

/// Renders a record as one line of `width` columns. Fields missing from
/// `data` use their layout default, or zeros/spaces when there is none.
/// Columns no field covers are left blank.
pub fn encode_record(
    record: &RecordLayout,
    data: &SegmentData,
    width: usize,
    options: &CodecOptions,
) -> Result<String> {
    let mut columns = vec![' '; width];
    let blank = Value::blank();

    for field in record.fields() {
        let value = data
            .get(&field.name)
            .or(field.default.as_ref())
            .unwrap_or(&blank);
        let encoded = field.picture.encode(value, &field.name, options)?;
        for (offset, c) in encoded.chars().enumerate() {
            if let Some(slot) = columns.get_mut(field.start - 1 + offset) {
                *slot = c;
            }
        }
    }

    Ok(columns.into_iter().collect())
}

/// Returns columns `start..=end` (1-based, counted in characters), or `None`
/// when the text is too short.
fn slice_columns(text: &str, start: usize, end: usize) -> Option<&str> {
    let mut offsets = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    let from = offsets.nth(start.checked_sub(1)?)?;
    let to = offsets.nth(end.checked_sub(start)?)?;
    Some(&text[from..to])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Format, LayoutBuilder};
    use crate::picture::NumericDecodePolicy;

    fn layout() -> Layout {
        let field = |name: &str, start, end, picture: &str| {
            FieldDef::parse(name, start, end, picture).unwrap()
        };
        LayoutBuilder::new(Format::Cnab400)
            .field(
                Direction::Sending,
                RecordRole::HeaderArquivo,
                field("tipo_registro", 1, 1, "9(1)"),
            )
            .field(
                Direction::Sending,
                RecordRole::TrailerArquivo,
                field("tipo_registro", 1, 1, "9(1)"),
            )
            .field(
                Direction::Sending,
                RecordRole::segment("1"),
                field("tipo_registro", 1, 1, "9(1)"),
            )
            .field(
                Direction::Sending,
                RecordRole::segment("1"),
                field("nome", 2, 6, "X(5)"),
            )
            .field(
                Direction::Sending,
                RecordRole::segment("1"),
                field("valor", 8, 12, "9(3)V9(2)").with_default(Value::Integer(1)),
            )
            .field(
                Direction::Returning,
                RecordRole::HeaderArquivo,
                field("tipo_registro", 1, 1, "9(1)"),
            )
            .field(
                Direction::Returning,
                RecordRole::TrailerArquivo,
                field("tipo_registro", 1, 1, "9(1)"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_slice_columns() {
        assert_eq!(slice_columns("ABCDE", 2, 3), Some("BC"));
        assert_eq!(slice_columns("ABCDE", 1, 5), Some("ABCDE"));
        assert_eq!(slice_columns("ABCDE", 5, 6), None);
        assert_eq!(slice_columns("ÇÃOXY", 2, 4), Some("ÃOX"));
    }

    #[test]
    fn test_field_value() {
        let layout = layout();
        let line = Line::new("1ACME  01234", 2, &layout, Direction::Sending);
        let field = FieldDef::parse("valor", 8, 12, "9(3)V9(2)").unwrap();
        assert_eq!(line.field_value(&field).unwrap().to_string(), "12.34");
        assert_eq!(line.record_type().unwrap(), 1);
        assert_eq!(line.segment_code().unwrap(), "1");
    }

    #[test]
    fn test_line_too_short() {
        let layout = layout();
        let line = Line::new("1ACME", 7, &layout, Direction::Sending);
        assert!(matches!(
            line.segment_data("1"),
            Err(Error::LineTooShort {
                line: 7,
                needed: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_segment_data_by_direction() {
        let layout = layout();
        let text = "1ACME  01234";

        let sending = Line::new(text, 3, &layout, Direction::Sending);
        let data = sending.segment_data("1").unwrap();
        assert_eq!(data.get("nome"), Some(&Value::from("ACME")));
        assert_eq!(data.len(), 3);

        let returning = Line::new(text, 3, &layout, Direction::Returning);
        assert!(matches!(
            returning.segment_data("1"),
            Err(Error::UnrecognizedSegment { key, line: 3 }) if key == "segmento_1"
        ));
    }

    #[test]
    fn test_strict_record_type() {
        let layout = layout();
        let line = Line::new("A", 1, &layout, Direction::Sending);
        assert_eq!(line.record_type().unwrap(), 0);
        let strict = line.with_options(CodecOptions {
            numeric: NumericDecodePolicy::Strict,
            ..CodecOptions::default()
        });
        assert!(matches!(
            strict.record_type(),
            Err(Error::NonNumeric { .. })
        ));
    }

    #[test]
    fn test_encode_record_uses_defaults_and_blanks() {
        let layout = layout();
        let record = layout
            .direction(Direction::Sending)
            .unwrap()
            .segment("1")
            .unwrap();

        let mut data = SegmentData::new();
        data.set("tipo_registro", 1u32);
        data.set("nome", "ACME CORP");

        let line = encode_record(record, &data, 400, &CodecOptions::default()).unwrap();
        assert_eq!(line.chars().count(), 400);
        assert_eq!(&line[..12], "1ACME  00100");
        assert!(line[12..].chars().all(|c| c == ' '));
    }
}
