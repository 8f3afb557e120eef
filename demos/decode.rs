// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  decode.rs - Decoder demo for CNAB files.
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

use clap::Parser;

use cnabparser::layout::*;
use cnabparser::remessa::*;
use cnabparser::retorno::*;
use cnabparser::source::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The CSV layout schema.
    layout: String,
    /// The file to read.
    file: String,
    /// Format variant (cnab200, cnab240 or cnab400).
    #[arg(long, default_value = "cnab240")]
    format: Format,
    /// Decode as a sending ("remessa") file instead of a returning one.
    #[arg(long)]
    remessa: bool,
    /// Segment code that opens a title.
    #[arg(long)]
    first: String,
    /// Segment code that closes a title.
    #[arg(long)]
    last: String,
}

fn main() {
    let args = Args::parse();

    let direction = if args.remessa {
        Direction::Sending
    } else {
        Direction::Returning
    };

    let schema = match File::open(&args.layout) {
        Ok(f) => f,
        Err(error) => {
            eprintln!("Error opening layout {:?}: {:?}", &args.layout, error);
            return;
        }
    };

    let layout = match LayoutBuilder::new(args.format)
        .segment_bounds(direction, &args.first, &args.last)
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

    let decoded = match direction {
        Direction::Sending => RemessaFile::new(&layout, &lines).generate(),
        Direction::Returning => RetornoFile::new(&layout, &lines).generate(),
    };

    match decoded {
        Ok(document) => println!("{:#?}", document),
        Err(error) => eprintln!("Error decoding file {:?}: {}", &args.file, error),
    }
}
