use bstr::{BStr, ByteSlice};
use std::fmt::{self, Debug, Formatter};

/// A single keyword's value for one row.
///
/// Exactly one of [`Field::Omitted`], [`Field::Unknown`], or [`Field::Data`]
/// is observed whenever the keyword was named for the current row; otherwise
/// the keyword is [`Field::Absent`] for that row.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    /// The keyword was not named for this row.
    Absent,
    /// The value was the literal `.`.
    Omitted,
    /// The value was the literal `?`.
    Unknown,
    /// A plain value, borrowed either from the line currently being read or
    /// from scratch storage that is valid only until the row callback
    /// returns.
    Data(&'a [u8]),
}

impl<'a> Field<'a> {
    #[inline]
    pub fn in_file(&self) -> bool {
        !matches!(self, Field::Absent)
    }

    #[inline]
    pub fn is_omitted(&self) -> bool {
        matches!(self, Field::Omitted)
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Field::Unknown)
    }

    #[inline]
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Field::Data(data) => Some(data),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bstr(&self) -> Option<&'a BStr> {
        self.as_bytes().map(ByteSlice::as_bstr)
    }

    #[inline]
    pub fn as_str(&self) -> Option<&'a str> {
        self.as_bytes().and_then(|data| std::str::from_utf8(data).ok())
    }
}

impl Debug for Field<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Field::Absent => write!(f, "Absent"),
            Field::Omitted => write!(f, "Omitted"),
            Field::Unknown => write!(f, "Unknown"),
            Field::Data(data) => write!(f, "Data({:?})", data.as_bstr()),
        }
    }
}

/// The keyword values for a single row of a category, in the order the
/// category's keywords were registered.
pub struct Row<'a> {
    fields: &'a [Field<'a>],
}

impl<'a> Row<'a> {
    #[inline]
    pub(crate) fn new(fields: &'a [Field<'a>]) -> Self {
        Row { fields }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field for the keyword at `index`, the position it was
    /// registered at within its category.
    #[inline]
    pub fn get(&self, index: usize) -> Field<'a> {
        self.fields[index]
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Field<'a>> + '_ {
        self.fields.iter().copied()
    }
}
