use crate::binary::BinaryReader;
use crate::error::Error;
use crate::registry::{CategoryHandler, Registry};
use crate::source::ByteSource;
use crate::text::TextReader;

enum Format<S> {
    Text(TextReader<S>),
    Binary(BinaryReader<S>),
}

/// Reads mmCIF or BinaryCIF from a [`ByteSource`], dispatching registered
/// categories one row at a time.
///
/// Construct with [`Reader::text`] or [`Reader::binary`], register
/// categories, then call [`Reader::read_block`] until it returns `false`.
/// Between blocks, categories may be registered or removed by going through
/// [`Reader::registry_mut`].
pub struct Reader<S> {
    format: Format<S>,
    registry: Registry,
    on_unknown_category: Option<Box<dyn FnMut(&str)>>,
    on_unknown_keyword: Option<Box<dyn FnMut(&str, &str)>>,
}

impl<S: ByteSource> Reader<S> {
    pub fn text(source: S) -> Self {
        Reader {
            format: Format::Text(TextReader::new(source)),
            registry: Registry::new(),
            on_unknown_category: None,
            on_unknown_keyword: None,
        }
    }

    pub fn binary(source: S) -> Self {
        Reader {
            format: Format::Binary(BinaryReader::new(source)),
            registry: Registry::new(),
            on_unknown_category: None,
            on_unknown_keyword: None,
        }
    }

    pub fn register(&mut self, category: Box<dyn CategoryHandler>) -> &mut Self {
        self.registry.register(category);
        self
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Sets the handler invoked once per occurrence of a category name found
    /// in the file with no matching registration.
    pub fn on_unknown_category(&mut self, f: impl FnMut(&str) + 'static) -> &mut Self {
        self.on_unknown_category = Some(Box::new(f));
        self
    }

    /// Sets the handler invoked once per occurrence of a keyword name found
    /// under a registered category with no matching registration.
    pub fn on_unknown_keyword(&mut self, f: impl FnMut(&str, &str) + 'static) -> &mut Self {
        self.on_unknown_keyword = Some(Box::new(f));
        self
    }

    /// Reads one data block, firing row, save-frame-end, and finalize
    /// callbacks on registered categories as it goes. Returns whether
    /// another block follows.
    pub fn read_block(&mut self) -> Result<bool, Error> {
        match &mut self.format {
            Format::Text(r) => r.read_block(
                &mut self.registry,
                &mut self.on_unknown_category,
                &mut self.on_unknown_keyword,
            ),
            Format::Binary(r) => r.read_block(
                &mut self.registry,
                &mut self.on_unknown_category,
                &mut self.on_unknown_keyword,
            ),
        }
    }
}
