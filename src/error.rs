// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/error.rs - Error types for the CNAB codec.
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

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::layout::Direction;

/// Result type alias using the crate's [Error].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building a layout or decoding and
/// encoding a file.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file could not be opened or read.
    #[error("failed to read lines from {path:?}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O failure on an already-open reader.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not even hold a header and a trailer.
    #[error("file has {lines} line(s), at least a header and a trailer are required")]
    EmptyFile { lines: usize },

    /// The scan ran off the end of the file without meeting a file trailer.
    #[error("no file trailer record found")]
    UnterminatedFile,

    /// A content line names a segment the active layout does not declare.
    #[error("line {line}: unrecognized segment {key:?}")]
    UnrecognizedSegment { key: String, line: usize },

    /// A record role needed by the decode/encode path is not declared.
    #[error("layout for {direction} has no {role} record")]
    MissingRecordLayout { direction: Direction, role: String },

    #[error("unknown CNAB format {0:?}")]
    UnknownFormat(String),

    /// The layout has no sub-tree for the requested direction.
    #[error("layout has no {0} definition")]
    MissingDirection(Direction),

    #[error("line {line}: {actual} column(s) long, field ends at column {needed}")]
    LineTooShort {
        line: usize,
        needed: usize,
        actual: usize,
    },

    #[error("invalid picture {picture:?}: {reason}")]
    InvalidPicture { picture: String, reason: String },

    /// The column range of a field disagrees with its picture.
    #[error("field {field:?} spans {declared} column(s) but its picture is {picture} wide")]
    WidthMismatch {
        field: String,
        declared: usize,
        picture: usize,
    },

    #[error("field {field:?} has invalid column range {start}..={end}")]
    InvalidRange {
        field: String,
        start: usize,
        end: usize,
    },

    #[error("field {field:?} ends at column {end}, past the {width}-column record")]
    FieldOutOfRecord {
        field: String,
        end: usize,
        width: usize,
    },

    #[error("fields {first:?} and {second:?} overlap")]
    OverlappingFields { first: String, second: String },

    /// Non-digit content in a numeric slot under the strict policy.
    #[error("field {field:?}: {raw:?} is not numeric")]
    NonNumeric { field: String, raw: String },

    #[error("field {field:?}: {value:?} does not fit in {width} column(s)")]
    ValueTooWide {
        field: String,
        width: usize,
        value: String,
    },

    #[error("field {field:?}: cannot encode {value:?}")]
    InvalidValue { field: String, value: String },

    #[error("layout CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("layout row {row}: {reason}")]
    InvalidLayoutRow { row: usize, reason: String },
}
