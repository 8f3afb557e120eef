// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/model.rs - Record tree for decoded CNAB files.
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
 * # `model` Module
 *
 * The decoded form of a CNAB file: a [Document] owns its [Batch]es, each
 * batch owns its [Title]s, and each title holds one [SegmentData] per
 * segment code, in the order the segments appeared in the file.
 */

use crate::error::Result;
use crate::layout::{Direction, Layout, RecordLayout, RecordRole};
use crate::picture::Value;

/// The named field values of one record line, in layout order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentData {
    fields: Vec<(String, Value)>,
}

impl SegmentData {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with every field set to its layout default, or blank when
    /// the layout declares none.
    pub fn from_defaults(record: &RecordLayout) -> Self {
        record
            .fields()
            .iter()
            .map(|f| (f.name.clone(), f.default.clone().unwrap_or_else(Value::blank)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Sets a field, replacing any previous value in place.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for SegmentData {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let mut data = SegmentData::new();
        for (name, value) in iter {
            data.set(&name.into(), value);
        }
        data
    }
}

/// One payable or receivable item ("titulo"), made of one or more segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Title {
    segments: Vec<(String, SegmentData)>,
}

impl Title {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a segment. A code already present in the title is overwritten
    /// in place.
    pub fn insert(&mut self, code: &str, data: SegmentData) {
        match self
            .segments
            .iter_mut()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
        {
            Some((_, slot)) => *slot = data,
            None => self.segments.push((code.to_string(), data)),
        }
    }

    pub fn segment(&self, code: &str) -> Option<&SegmentData> {
        self.segments
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, d)| d)
    }

    /// Segments in file order.
    pub fn segments(&self) -> impl Iterator<Item = (&str, &SegmentData)> {
        self.segments.iter().map(|(c, d)| (c.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// A batch ("lote") of titles. Header and trailer are only present in
/// formats with explicit batch records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub header: Option<SegmentData>,
    pub titles: Vec<Title>,
    pub trailer: Option<SegmentData>,
}

/// Batch records number their batch in this field.
const BATCH_SEQUENCE_FIELD: &str = "lote_servico";

/// A whole decoded file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub header_arquivo: SegmentData,
    pub trailer_arquivo: SegmentData,
    pub batches: Vec<Batch>,
}

impl Document {
    /// An empty returning file with header and trailer pre-filled from the
    /// layout defaults.
    pub fn new(layout: &Layout) -> Result<Self> {
        let retorno = layout.direction(Direction::Returning)?;
        Ok(Self {
            header_arquivo: SegmentData::from_defaults(retorno.require(&RecordRole::HeaderArquivo)?),
            trailer_arquivo: SegmentData::from_defaults(
                retorno.require(&RecordRole::TrailerArquivo)?,
            ),
            batches: Vec::new(),
        })
    }

    /// A new returning-file batch. Its header and trailer carry the layout
    /// defaults when the layout declares batch records, with `lote_servico`
    /// set to `sequence` where that field exists.
    pub fn new_batch(&self, layout: &Layout, sequence: u32) -> Result<Batch> {
        let retorno = layout.direction(Direction::Returning)?;
        let control = |role: RecordRole| {
            retorno.record(&role).map(|record| {
                let mut data = SegmentData::from_defaults(record);
                if record.field(BATCH_SEQUENCE_FIELD).is_some() {
                    data.set(BATCH_SEQUENCE_FIELD, sequence);
                }
                data
            })
        };
        Ok(Batch {
            header: control(RecordRole::HeaderLote),
            titles: Vec::new(),
            trailer: control(RecordRole::TrailerLote),
        })
    }

    pub fn total_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn total_titles(&self) -> usize {
        self.batches.iter().map(|b| b.titles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FieldDef, Format, LayoutBuilder};

    fn layout() -> Layout {
        LayoutBuilder::new(Format::Cnab240)
            .field(
                Direction::Returning,
                RecordRole::HeaderArquivo,
                FieldDef::parse("codigo_banco", 1, 3, "9(3)")
                    .unwrap()
                    .with_default(341u32),
            )
            .field(
                Direction::Returning,
                RecordRole::HeaderArquivo,
                FieldDef::parse("nome_empresa", 4, 13, "X(10)").unwrap(),
            )
            .field(
                Direction::Returning,
                RecordRole::TrailerArquivo,
                FieldDef::parse("codigo_banco", 1, 3, "9(3)").unwrap(),
            )
            .field(
                Direction::Returning,
                RecordRole::HeaderLote,
                FieldDef::parse("lote", 4, 7, "9(4)").unwrap().with_default(1u32),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_segment_data_set_replaces_in_place() {
        let mut data = SegmentData::new();
        data.set("a", 1u32);
        data.set("b", "x");
        data.set("a", 2u32);
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("a"), Some(&Value::Integer(2)));
        let names: Vec<&str> = data.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_title_insert_overwrites_same_code() {
        let mut title = Title::new();
        let first: SegmentData = [("v", Value::Integer(1))].into_iter().collect();
        let second: SegmentData = [("v", Value::Integer(2))].into_iter().collect();
        title.insert("P", first);
        title.insert("Q", SegmentData::new());
        title.insert("p", second.clone());
        assert_eq!(title.len(), 2);
        assert_eq!(title.segment("P"), Some(&second));
        let codes: Vec<&str> = title.segments().map(|(c, _)| c).collect();
        assert_eq!(codes, ["P", "Q"]);
    }

    #[test]
    fn test_document_defaults() {
        let layout = layout();
        let mut document = Document::new(&layout).unwrap();
        assert_eq!(
            document.header_arquivo.get("codigo_banco"),
            Some(&Value::Integer(341))
        );
        assert_eq!(
            document.header_arquivo.get("nome_empresa"),
            Some(&Value::blank())
        );

        let mut batch = document.new_batch(&layout, 3).unwrap();
        assert_eq!(
            batch.header.as_ref().and_then(|h| h.get("lote")),
            Some(&Value::Integer(1))
        );
        assert_eq!(
            batch.header.as_ref().and_then(|h| h.get("lote_servico")),
            None
        );
        assert_eq!(batch.trailer, None);

        batch.titles.push(Title::new());
        batch.titles.push(Title::new());
        document.batches.push(batch);
        document.batches.push(Batch::default());
        assert_eq!(document.total_batches(), 2);
        assert_eq!(document.total_titles(), 2);
    }

    #[test]
    fn test_new_batch_sets_sequence() {
        let field = |name: &str, start, end, picture: &str| {
            FieldDef::parse(name, start, end, picture).unwrap()
        };
        let layout = LayoutBuilder::new(Format::Cnab240)
            .field(
                Direction::Returning,
                RecordRole::HeaderArquivo,
                field("tipo_registro", 8, 8, "9(1)"),
            )
            .field(
                Direction::Returning,
                RecordRole::TrailerArquivo,
                field("tipo_registro", 8, 8, "9(1)"),
            )
            .field(
                Direction::Returning,
                RecordRole::HeaderLote,
                field("lote_servico", 4, 7, "9(4)"),
            )
            .field(
                Direction::Returning,
                RecordRole::TrailerLote,
                field("lote_servico", 4, 7, "9(4)"),
            )
            .field(
                Direction::Returning,
                RecordRole::TrailerLote,
                field("quantidade_registros", 18, 23, "9(6)").with_default(2u32),
            )
            .build()
            .unwrap();

        let document = Document::new(&layout).unwrap();
        let batch = document.new_batch(&layout, 7).unwrap();
        let header = batch.header.unwrap();
        let trailer = batch.trailer.unwrap();
        assert_eq!(header.get("lote_servico"), Some(&Value::Integer(7)));
        assert_eq!(trailer.get("lote_servico"), Some(&Value::Integer(7)));
        assert_eq!(
            trailer.get("quantidade_registros"),
            Some(&Value::Integer(2))
        );
        let names: Vec<&str> = trailer.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["lote_servico", "quantidade_registros"]);
    }
}
