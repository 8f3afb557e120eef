// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/layout.rs - Record layouts for CNAB 200/240/400 files.
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
 * # `layout` Module
 *
 * A [Layout] describes one bank's flavor of a CNAB file: for each direction
 * (sending/"remessa" and returning/"retorno") it lists the fields of every
 * record role, and names the segment codes that open and close a title.
 *
 * Layouts are assembled with a [LayoutBuilder], either field by field or
 * from a CSV schema, and are validated once when built. A built layout is
 * immutable and can be shared by any number of decode and encode calls.
 *
 * ## CSV Schema
 *
 * ```text
 * direction,record,field,start,end,picture,default
 * # file header
 * retorno,header_arquivo,codigo_banco,1,3,9(3),341
 * retorno,segmento_t,valor_titulo,82,96,9(13)V9(2),
 * ```
 *
 * ## Usage Example
 *
 * ```no_run
 * use std::fs::File;
 *
 * use cnabparser::layout::{Direction, Format, LayoutBuilder};
 *
 * fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let layout = LayoutBuilder::new(Format::Cnab240)
 *         .segment_bounds(Direction::Returning, "T", "U")
 *         .load_csv(File::open("itau_cnab240.csv")?)?
 *         .build()?;
 *
 *     println!("{:?}", layout.format());
 *
 *     Ok(())
 * }
 * ```
 */

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Error, Result};
use crate::picture::{Picture, Value};

/// The CNAB format variant, named after its record width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Cnab200,
    Cnab240,
    Cnab400,
}

/// The structural role of a line, as told by its record-type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    FileHeader,
    BatchHeader,
    Detail,
    BatchTrailer,
    FileTrailer,
}

// CNAB240 (FEBRABAN) record types. CNAB200 and CNAB400 only use the file
// header and trailer codes.
const REGISTRO_HEADER_ARQUIVO: u128 = 0;
const REGISTRO_HEADER_LOTE: u128 = 1;
const REGISTRO_TRAILER_LOTE: u128 = 5;
const REGISTRO_TRAILER_ARQUIVO: u128 = 9;

impl Format {
    /// Length of every record line.
    pub fn record_width(&self) -> usize {
        match self {
            Format::Cnab200 => 200,
            Format::Cnab240 => 240,
            Format::Cnab400 => 400,
        }
    }

    /// Whether the format has explicit batch header/trailer records.
    pub fn has_batch_records(&self) -> bool {
        matches!(self, Format::Cnab240)
    }

    /// Where the record-type discriminator lives.
    pub fn record_type_field(&self) -> FieldDef {
        match self {
            Format::Cnab200 => FieldDef::numeric("tipo_registro", 1, 2),
            Format::Cnab240 => FieldDef::numeric("tipo_registro", 8, 8),
            Format::Cnab400 => FieldDef::numeric("tipo_registro", 1, 1),
        }
    }

    /// Where the segment code of a detail line lives. In CNAB200 and CNAB400
    /// the record type doubles as the segment code.
    pub fn segment_code_field(&self) -> FieldDef {
        match self {
            Format::Cnab200 => FieldDef::alphanumeric("codigo_segmento", 1, 2),
            Format::Cnab240 => FieldDef::alphanumeric("codigo_segmento", 14, 14),
            Format::Cnab400 => FieldDef::numeric("codigo_segmento", 1, 1),
        }
    }

    /// Where a CNAB240 file trailer stores the number of batches.
    pub fn batch_count_field(&self) -> Option<FieldDef> {
        match self {
            Format::Cnab240 => Some(FieldDef::numeric("quantidade_lotes", 18, 23)),
            _ => None,
        }
    }

    pub fn classify(&self, record_type: u128) -> RecordKind {
        match record_type {
            REGISTRO_HEADER_ARQUIVO => RecordKind::FileHeader,
            REGISTRO_TRAILER_ARQUIVO => RecordKind::FileTrailer,
            REGISTRO_HEADER_LOTE if self.has_batch_records() => RecordKind::BatchHeader,
            REGISTRO_TRAILER_LOTE if self.has_batch_records() => RecordKind::BatchTrailer,
            _ => RecordKind::Detail,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cnab{}", self.record_width())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cnab200" => Ok(Format::Cnab200),
            "cnab240" => Ok(Format::Cnab240),
            "cnab400" => Ok(Format::Cnab400),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

/// Which side of the exchange produced the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// "Remessa": client to bank.
    Sending,
    /// "Retorno": bank to client.
    Returning,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sending => f.write_str("remessa"),
            Direction::Returning => f.write_str("retorno"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remessa" | "sending" => Ok(Direction::Sending),
            "retorno" | "returning" => Ok(Direction::Returning),
            _ => Err(format!("unknown direction {:?}", s)),
        }
    }
}

/// The role a record plays in the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordRole {
    HeaderArquivo,
    HeaderLote,
    /// A detail segment, keyed by its lowercase segment code.
    Segment(String),
    TrailerLote,
    TrailerArquivo,
}

impl RecordRole {
    pub fn segment(code: &str) -> Self {
        RecordRole::Segment(code.trim().to_lowercase())
    }
}

impl fmt::Display for RecordRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRole::HeaderArquivo => f.write_str("header_arquivo"),
            RecordRole::HeaderLote => f.write_str("header_lote"),
            RecordRole::Segment(code) => write!(f, "segmento_{}", code),
            RecordRole::TrailerLote => f.write_str("trailer_lote"),
            RecordRole::TrailerArquivo => f.write_str("trailer_arquivo"),
        }
    }
}

impl FromStr for RecordRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        let key = s.trim().to_lowercase();
        match key.as_str() {
            "header_arquivo" => Ok(RecordRole::HeaderArquivo),
            "header_lote" => Ok(RecordRole::HeaderLote),
            "trailer_lote" => Ok(RecordRole::TrailerLote),
            "trailer_arquivo" => Ok(RecordRole::TrailerArquivo),
            _ => match key.strip_prefix("segmento_") {
                Some(code) if !code.is_empty() => Ok(RecordRole::segment(code)),
                _ => Err(format!("unknown record {:?}", s)),
            },
        }
    }
}

/// One field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    /// First column, 1-based.
    pub start: usize,
    /// Last column, 1-based and inclusive.
    pub end: usize,
    pub picture: Picture,
    /// Value used when encoding a record that does not set this field.
    pub default: Option<Value>,
}

impl FieldDef {
    /// Creates a field definition, checking that the column range matches the
    /// picture.
    pub fn new(name: &str, start: usize, end: usize, picture: Picture) -> Result<Self> {
        let field = Self {
            name: name.to_string(),
            start,
            end,
            picture,
            default: None,
        };
        field.validate()?;
        Ok(field)
    }

    /// Like [FieldDef::new], parsing the picture from text.
    pub fn parse(name: &str, start: usize, end: usize, picture: &str) -> Result<Self> {
        Self::new(name, start, end, picture.parse()?)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn width(&self) -> usize {
        self.end + 1 - self.start
    }

    fn numeric(name: &str, start: usize, end: usize) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
            picture: Picture::Numeric {
                digits: end + 1 - start,
                decimals: 0,
            },
            default: None,
        }
    }

    fn alphanumeric(name: &str, start: usize, end: usize) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
            picture: Picture::Alphanumeric {
                width: end + 1 - start,
            },
            default: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.start < 1 || self.start > self.end {
            return Err(Error::InvalidRange {
                field: self.name.clone(),
                start: self.start,
                end: self.end,
            });
        }
        self.picture.validate()?;
        if self.width() != self.picture.width() {
            return Err(Error::WidthMismatch {
                field: self.name.clone(),
                declared: self.width(),
                picture: self.picture.width(),
            });
        }
        Ok(())
    }
}

/// The ordered fields of one record role.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLayout {
    fields: Vec<FieldDef>,
}

impl RecordLayout {
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The last column any field of this record reads.
    pub fn max_end(&self) -> usize {
        self.fields.iter().map(|f| f.end).max().unwrap_or(0)
    }
}

/// All record layouts of one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionLayout {
    direction: Direction,
    records: BTreeMap<RecordRole, RecordLayout>,
    first_segment: Option<String>,
    last_segment: Option<String>,
}

impl DirectionLayout {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn record(&self, role: &RecordRole) -> Option<&RecordLayout> {
        self.records.get(role)
    }

    /// Like [DirectionLayout::record], failing when the role is not declared.
    pub fn require(&self, role: &RecordRole) -> Result<&RecordLayout> {
        self.records
            .get(role)
            .ok_or_else(|| Error::MissingRecordLayout {
                direction: self.direction,
                role: role.to_string(),
            })
    }

    /// Field definitions for the segment with the given code.
    pub fn segment(&self, code: &str) -> Result<&RecordLayout> {
        let role = RecordRole::segment(code);
        self.records
            .get(&role)
            .ok_or_else(|| Error::UnrecognizedSegment {
                key: role.to_string(),
                line: 0,
            })
    }

    /// Segment code that always opens a title.
    pub fn first_segment(&self) -> Option<&str> {
        self.first_segment.as_deref()
    }

    /// Segment code that always closes a title.
    pub fn last_segment(&self) -> Option<&str> {
        self.last_segment.as_deref()
    }

    pub fn is_first_segment(&self, code: &str) -> bool {
        self.first_segment
            .as_deref()
            .is_some_and(|first| first.eq_ignore_ascii_case(code.trim()))
    }

    pub fn is_last_segment(&self, code: &str) -> bool {
        self.last_segment
            .as_deref()
            .is_some_and(|last| last.eq_ignore_ascii_case(code.trim()))
    }
}

/// A validated, immutable file layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    format: Format,
    remessa: Option<DirectionLayout>,
    retorno: Option<DirectionLayout>,
}

impl Layout {
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn direction(&self, direction: Direction) -> Result<&DirectionLayout> {
        match direction {
            Direction::Sending => self.remessa.as_ref(),
            Direction::Returning => self.retorno.as_ref(),
        }
        .ok_or(Error::MissingDirection(direction))
    }
}

#[derive(Debug, Default)]
struct PendingDirection {
    records: BTreeMap<RecordRole, Vec<FieldDef>>,
    first_segment: Option<String>,
    last_segment: Option<String>,
}

/// Collects field definitions and validates them into a [Layout].
#[derive(Debug)]
pub struct LayoutBuilder {
    format: Format,
    remessa: Option<PendingDirection>,
    retorno: Option<PendingDirection>,
}

impl LayoutBuilder {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            remessa: None,
            retorno: None,
        }
    }

    fn pending(&mut self, direction: Direction) -> &mut PendingDirection {
        match direction {
            Direction::Sending => self.remessa.get_or_insert_with(Default::default),
            Direction::Returning => self.retorno.get_or_insert_with(Default::default),
        }
    }

    /// Appends a field to a record. Fields are kept in insertion order.
    pub fn field(mut self, direction: Direction, role: RecordRole, field: FieldDef) -> Self {
        self.pending(direction)
            .records
            .entry(role)
            .or_default()
            .push(field);
        self
    }

    /// Names the segment codes that open and close a title.
    pub fn segment_bounds(mut self, direction: Direction, first: &str, last: &str) -> Self {
        let pending = self.pending(direction);
        pending.first_segment = Some(first.trim().to_string());
        pending.last_segment = Some(last.trim().to_string());
        self
    }

    /// Appends every field listed in a CSV schema.
    pub fn load_csv<R: io::Read>(mut self, reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut loaded = 0usize;
        for result in reader.records() {
            let record = result?;
            let row = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let bad_row = |reason: String| Error::InvalidLayoutRow { row, reason };

            if record.len() < 6 {
                return Err(bad_row(format!("expected at least 6 columns, got {}", record.len())));
            }

            let direction: Direction = record[0].parse().map_err(bad_row)?;
            let role: RecordRole = record[1].parse().map_err(bad_row)?;
            let name = &record[2];
            let start: usize = record[3]
                .parse()
                .map_err(|_| bad_row(format!("bad start column {:?}", &record[3])))?;
            let end: usize = record[4]
                .parse()
                .map_err(|_| bad_row(format!("bad end column {:?}", &record[4])))?;
            let picture: Picture = record[5].parse()?;

            let mut field = FieldDef::new(name, start, end, picture)?;
            if let Some(default) = record.get(6).filter(|d| !d.is_empty()) {
                field.default = Some(parse_default(&picture, default).map_err(bad_row)?);
            }

            self = self.field(direction, role, field);
            loaded += 1;
        }

        debug!(fields = loaded, format = %self.format, "loaded layout schema");

        Ok(self)
    }

    /// Validates every field and freezes the layout.
    pub fn build(self) -> Result<Layout> {
        let format = self.format;
        let remessa = self
            .remessa
            .map(|p| finish_direction(format, Direction::Sending, p))
            .transpose()?;
        let retorno = self
            .retorno
            .map(|p| finish_direction(format, Direction::Returning, p))
            .transpose()?;

        Ok(Layout {
            format,
            remessa,
            retorno,
        })
    }
}

fn finish_direction(
    format: Format,
    direction: Direction,
    pending: PendingDirection,
) -> Result<DirectionLayout> {
    for role in [RecordRole::HeaderArquivo, RecordRole::TrailerArquivo] {
        if !pending.records.contains_key(&role) {
            return Err(Error::MissingRecordLayout {
                direction,
                role: role.to_string(),
            });
        }
    }

    let width = format.record_width();
    let mut records = BTreeMap::new();

    for (role, fields) in pending.records {
        for field in &fields {
            field.validate()?;
            if field.end > width {
                return Err(Error::FieldOutOfRecord {
                    field: field.name.clone(),
                    end: field.end,
                    width,
                });
            }
        }

        let mut by_start: Vec<&FieldDef> = fields.iter().collect();
        by_start.sort_by_key(|f| f.start);
        for pair in by_start.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(Error::OverlappingFields {
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }

        records.insert(role, RecordLayout { fields });
    }

    Ok(DirectionLayout {
        direction,
        records,
        first_segment: pending.first_segment,
        last_segment: pending.last_segment,
    })
}

fn parse_default(picture: &Picture, text: &str) -> std::result::Result<Value, String> {
    match picture {
        Picture::Alphanumeric { .. } => Ok(Value::Text(text.to_string())),
        Picture::Numeric { decimals: 0, .. } => text
            .parse::<u128>()
            .map(Value::Integer)
            .map_err(|_| format!("bad numeric default {:?}", text)),
        Picture::Numeric { .. } => Decimal::from_str(text.replace(',', ".").as_str())
            .map(Value::Decimal)
            .map_err(|_| format!("bad decimal default {:?}", text)),
    }
}
