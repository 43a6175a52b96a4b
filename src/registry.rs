use crate::error::Error;
use crate::value::Row;

/// Called once per occurrence of a category name in the file that has no
/// matching registered [`CategoryHandler`].
pub(crate) type UnknownCategoryFn = dyn FnMut(&str);

/// Called once per occurrence of a keyword name that has no match within its
/// (registered) category.
pub(crate) type UnknownKeywordFn = dyn FnMut(&str, &str);

/// A category registered with a [`Reader`](crate::Reader): a name, an ordered
/// list of keyword names, and the callbacks invoked as rows, save frames, and
/// blocks are read.
///
/// In the original C API a category carries an opaque `void *data` payload
/// and a matching destructor function pointer (`ihm_category_new`). Here the
/// payload is simply owned by the `Category`, typically inside the closures,
/// and is dropped the ordinary way when the `Category` is dropped.
pub trait CategoryHandler {
    /// The category's name, e.g. `"_atom_site"`. Matched case-insensitively.
    fn name(&self) -> &str;

    /// The number of keywords registered under this category.
    fn keyword_count(&self) -> usize;

    /// The name of the keyword at `index`, e.g. `"id"` for `_atom_site.id`.
    fn keyword_name(&self, index: usize) -> &str;

    /// Looks up a keyword by name, matched case-insensitively. Returns its
    /// registration index, used to build a [`Row`].
    fn find_keyword(&self, name: &[u8]) -> Option<usize> {
        (0..self.keyword_count())
            .find(|&i| self.keyword_name(i).as_bytes().eq_ignore_ascii_case(name))
    }

    /// Invoked once per row: once per loop row, or once per block for a
    /// category whose keywords were set outside of a loop.
    fn on_row(&mut self, row: &Row<'_>) -> Result<(), Error>;

    /// Invoked when a `save_` frame containing this category's data closes.
    fn on_save_frame_end(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Invoked exactly once after all of a block's data has been processed.
    fn on_finalize(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// A ready-made [`CategoryHandler`] built from a list of keyword names and a
/// row callback, covering the common case without requiring a caller to
/// implement the trait by hand.
pub struct Category<T> {
    name: String,
    keywords: Vec<String>,
    payload: T,
    on_row: Box<dyn FnMut(&mut T, &Row<'_>) -> Result<(), Error>>,
    on_save_frame_end: Option<Box<dyn FnMut(&mut T) -> Result<(), Error>>>,
    on_finalize: Option<Box<dyn FnMut(&mut T) -> Result<(), Error>>>,
}

impl<T> Category<T> {
    pub fn new(
        name: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
        payload: T,
        on_row: impl FnMut(&mut T, &Row<'_>) -> Result<(), Error> + 'static,
    ) -> Self {
        Category {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            payload,
            on_row: Box::new(on_row),
            on_save_frame_end: None,
            on_finalize: None,
        }
    }

    pub fn on_save_frame_end(
        mut self,
        f: impl FnMut(&mut T) -> Result<(), Error> + 'static,
    ) -> Self {
        self.on_save_frame_end = Some(Box::new(f));
        self
    }

    pub fn on_finalize(mut self, f: impl FnMut(&mut T) -> Result<(), Error> + 'static) -> Self {
        self.on_finalize = Some(Box::new(f));
        self
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }
}

impl<T> CategoryHandler for Category<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    fn keyword_name(&self, index: usize) -> &str {
        &self.keywords[index]
    }

    fn on_row(&mut self, row: &Row<'_>) -> Result<(), Error> {
        (self.on_row)(&mut self.payload, row)
    }

    fn on_save_frame_end(&mut self) -> Result<(), Error> {
        match &mut self.on_save_frame_end {
            Some(f) => f(&mut self.payload),
            None => Ok(()),
        }
    }

    fn on_finalize(&mut self) -> Result<(), Error> {
        match &mut self.on_finalize {
            Some(f) => f(&mut self.payload),
            None => Ok(()),
        }
    }
}

/// The set of categories a [`Reader`](crate::Reader) was told to care about.
///
/// Categories are kept in a sorted array and found by case-insensitive binary
/// search rather than a hash map: per-category working sets are small (a
/// handful of keywords, rarely more than a few dozen categories), so a short
/// binary search beats hashing in both cache behavior and code size.
#[derive(Default)]
pub struct Registry {
    categories: Vec<Box<dyn CategoryHandler>>,
    sorted: bool,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn register(&mut self, category: Box<dyn CategoryHandler>) {
        self.categories.push(category);
        self.sorted = false;
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn CategoryHandler>> {
        self.categories.iter_mut()
    }

    /// Sorts categories by name if a registration has happened since the last
    /// sort. Called automatically by `find_index`, but also exposed so a
    /// reader can fix category indices before building per-category state
    /// (e.g. singleton-value layers) ahead of any lookup.
    pub(crate) fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.categories
                .sort_by(|a, b| ascii_ci_cmp(a.name().as_bytes(), b.name().as_bytes()));
            self.sorted = true;
        }
    }

    /// Finds a registered category by name, matched case-insensitively.
    pub fn find_mut(&mut self, name: &[u8]) -> Option<&mut Box<dyn CategoryHandler>> {
        let index = self.find_index(name)?;
        Some(&mut self.categories[index])
    }

    /// Finds a registered category's stable index by name. The index is
    /// stable for the lifetime of a `Registry` once sorting has happened,
    /// which this also triggers (lazily, on first lookup of a read).
    pub fn find_index(&mut self, name: &[u8]) -> Option<usize> {
        self.ensure_sorted();
        self.categories
            .binary_search_by(|probe| ascii_ci_cmp(probe.name().as_bytes(), name))
            .ok()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn get(&self, index: usize) -> &dyn CategoryHandler {
        self.categories[index].as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Box<dyn CategoryHandler> {
        &mut self.categories[index]
    }
}

fn ascii_ci_cmp(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}
