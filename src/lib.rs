//! A selective, streaming reader for mmCIF and BinaryCIF, the textual and
//! binary dictionary formats used to distribute macromolecular structural
//! data.
//!
//! Callers register only the categories and keywords they care about;
//! everything else in the file is parsed just far enough to be skipped. Rows
//! are delivered one at a time via callbacks registered on a [`Category`].
//!
//! ```no_run
//! use cif_reader::{Category, Reader};
//!
//! let input = "data_B\n_entry.id 1YTI\n";
//! let mut reader = Reader::text(input.as_bytes());
//! reader.register(Box::new(Category::new("_entry", ["id"], (), |_, row| {
//!     println!("entry id: {:?}", row.get(0).as_str());
//!     Ok(())
//! })));
//! while reader.read_block()? {}
//! # Ok::<(), cif_reader::Error>(())
//! ```

mod binary;
mod error;
mod reader;
mod registry;
mod source;
mod text;
mod value;

pub use error::{Error, FileFormatError, ValueError};
pub use reader::Reader;
pub use registry::{Category, CategoryHandler, Registry};
pub use source::ByteSource;
pub use value::{Field, Row};
