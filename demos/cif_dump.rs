//! Reads a single mmCIF or BinaryCIF file and prints every category and
//! keyword name it encounters. Registers no categories of its own, so the
//! unknown-category and unknown-keyword handlers see everything, exercising
//! the reader the way a caller who knows nothing about the file's schema
//! would.

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::process;

use cif_reader::Reader;

fn main() {
    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: cif_dump <path.cif|path.bcif>");
            process::exit(1);
        }
    };
    if let Err(e) = run(&path) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(path: &str) -> Result<(), cif_reader::Error> {
    let source = BufReader::new(File::open(path)?);
    let is_binary = path.ends_with(".bcif");

    let mut reader = if is_binary {
        Reader::binary(source)
    } else {
        Reader::text(source)
    };
    reader.on_unknown_category(|name| println!("{name}"));
    reader.on_unknown_keyword(|category, keyword| println!("  {category}.{keyword}"));

    let mut blocks = 0;
    loop {
        let more = reader.read_block()?;
        blocks += 1;
        if !more {
            break;
        }
    }
    eprintln!("read {blocks} block(s)");
    Ok(())
}
