// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  retgen.rs - Returning file generator demo for CNAB files.
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
use std::io::BufWriter;
use std::path::Path;

use clap::Parser;

use cnabparser::layout::*;
use cnabparser::model::*;
use cnabparser::remessa::*;
use cnabparser::retorno::*;
use cnabparser::source::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The CSV layout schema, with both remessa and retorno records.
    layout: String,
    /// The sending file to answer.
    file: String,
    /// Format variant (cnab200, cnab240 or cnab400).
    #[arg(long, default_value = "cnab400")]
    format: Format,
    /// Segment code that opens a title.
    #[arg(long)]
    first: String,
    /// Segment code that closes a title.
    #[arg(long)]
    last: String,
}

/// Copies every field the returning record shares with the sending one.
fn echo(record: &RecordLayout, sent: &SegmentData) -> SegmentData {
    let mut data = SegmentData::from_defaults(record);
    for (name, value) in sent.iter() {
        if record.field(name).is_some() {
            data.set(name, value.clone());
        }
    }
    data
}

fn main() {
    let args = Args::parse();

    let schema = match File::open(&args.layout) {
        Ok(f) => f,
        Err(error) => {
            eprintln!("Error opening layout {:?}: {:?}", &args.layout, error);
            return;
        }
    };

    let layout = match LayoutBuilder::new(args.format)
        .segment_bounds(Direction::Sending, &args.first, &args.last)
        .segment_bounds(Direction::Returning, &args.first, &args.last)
        .load_csv(schema)
        .and_then(LayoutBuilder::build)
    {
        Ok(layout) => layout,
        Err(error) => {
            eprintln!("Error loading layout {:?}: {}", &args.layout, error);
            return;
        }
    };

    let lines = match RawLines::from_path(&args.file) {
        Ok(lines) => lines,
        Err(error) => {
            eprintln!("Error opening file {:?}: {}", &args.file, error);
            return;
        }
    };

    let remessa = match RemessaFile::new(&layout, &lines).generate() {
        Ok(document) => document,
        Err(error) => {
            eprintln!("Error decoding file {:?}: {}", &args.file, error);
            return;
        }
    };

    let retorno_layout = match layout.direction(Direction::Returning) {
        Ok(l) => l,
        Err(error) => {
            eprintln!("Layout {:?} cannot build returning files: {}", &args.layout, error);
            return;
        }
    };

    let mut retorno = match Document::new(&layout) {
        Ok(document) => document,
        Err(error) => {
            eprintln!("Layout {:?} cannot build returning files: {}", &args.layout, error);
            return;
        }
    };

    let today = chrono::Local::now().format("%d%m%y").to_string();
    retorno.header_arquivo.set("data_gravacao", today.as_str());

    for (sequence, sent_batch) in (1u32..).zip(&remessa.batches) {
        let mut batch = match retorno.new_batch(&layout, sequence) {
            Ok(batch) => batch,
            Err(error) => {
                eprintln!("Failed to create batch: {}", error);
                return;
            }
        };

        for sent_title in &sent_batch.titles {
            let mut title = Title::new();
            for (code, sent) in sent_title.segments() {
                match retorno_layout.segment(code) {
                    Ok(record) => title.insert(code, echo(record, sent)),
                    Err(_) => eprintln!("Skipping segment {:?} with no returning layout", code),
                }
            }
            if !title.is_empty() {
                batch.titles.push(title);
            }
        }

        retorno.batches.push(batch);
    }

    // Write next to the input file, swapping the extension
    let output_path = Path::new(&args.file).with_extension("RET");
    let output = match File::create(&output_path) {
        Ok(f) => BufWriter::new(f),
        Err(e) => {
            eprintln!("Failed to create {}: {}", output_path.display(), e);
            return;
        }
    };

    if let Err(e) = RetornoWriter::new(&layout).write(&retorno, output) {
        eprintln!("Failed to write {}: {}", output_path.display(), e);
        return;
    }

    println!(
        "Wrote {} title(s) in {} batch(es) to {}",
        retorno.total_titles(),
        retorno.total_batches(),
        output_path.display()
    );
}
