use std::fmt::Write as _;

use crate::binary::encoding::{as_u8_mask, decode_column, ColumnValue, Encoding, TypedBuffer};
use crate::binary::msgpack::MsgpackReader;
use crate::error::{Error, FileFormatError};
use crate::registry::{CategoryHandler, Registry, UnknownCategoryFn, UnknownKeywordFn};
use crate::source::ByteSource;
use crate::value::{Field, Row};

struct ColumnData {
    /// `None` when the column's name didn't match any keyword registered
    /// under its category. Such a column is still decoded (see
    /// `read_column`) so its length establishes the category's row count
    /// even when no column ends up dispatched.
    keyword_index: Option<usize>,
    name: Vec<u8>,
    values: TypedBuffer,
    mask: Option<Vec<u8>>,
    scratch: String,
}

/// Walks a BinaryCIF document (`dataBlocks -> categories -> columns`) and
/// decodes each column's encoding chain, dispatching to the same
/// [`Registry`] contract the textual reader uses.
///
/// Both the top-level document map and each category's map are assumed to
/// write their recognized key (`dataBlocks`, `name`) before any other key —
/// true of every real BinaryCIF encoder — since a single-pass pull decoder
/// can't look ahead without buffering the whole document.
pub(crate) struct BinaryReader<S> {
    msgpack: MsgpackReader<S>,
    blocks_remaining: Option<usize>,
}

impl<S: ByteSource> BinaryReader<S> {
    pub(crate) fn new(source: S) -> Self {
        BinaryReader {
            msgpack: MsgpackReader::new(source),
            blocks_remaining: None,
        }
    }

    pub(crate) fn read_block(
        &mut self,
        registry: &mut Registry,
        on_unknown_category: &mut Option<Box<UnknownCategoryFn>>,
        on_unknown_keyword: &mut Option<Box<UnknownKeywordFn>>,
    ) -> Result<bool, Error> {
        registry.ensure_sorted();
        if self.blocks_remaining.is_none() {
            self.read_header()?;
        }
        let remaining = self.blocks_remaining.unwrap_or(0);
        if remaining == 0 {
            return Ok(false);
        }
        self.read_one_block(registry, on_unknown_category, on_unknown_keyword)?;
        self.blocks_remaining = Some(remaining - 1);
        Ok(remaining - 1 > 0)
    }

    fn read_header(&mut self) -> Result<(), Error> {
        let top_len = self.msgpack.read_map_len()?;
        let mut blocks_len = 0usize;
        for _ in 0..top_len {
            let key = self.msgpack.read_str()?;
            if key == b"dataBlocks" {
                blocks_len = self.msgpack.read_array_len()?;
                self.blocks_remaining = Some(blocks_len);
                return Ok(());
            }
            self.msgpack.skip_value()?;
        }
        self.blocks_remaining = Some(0);
        Ok(())
    }

    fn read_one_block(
        &mut self,
        registry: &mut Registry,
        on_unknown_category: &mut Option<Box<UnknownCategoryFn>>,
        on_unknown_keyword: &mut Option<Box<UnknownKeywordFn>>,
    ) -> Result<(), Error> {
        let len = self.msgpack.read_map_len()?;
        for _ in 0..len {
            let key = self.msgpack.read_str()?;
            if key == b"categories" {
                let cat_count = self.msgpack.read_array_len()?;
                for _ in 0..cat_count {
                    self.read_category(registry, on_unknown_category, on_unknown_keyword)?;
                }
            } else {
                self.msgpack.skip_value()?;
            }
        }
        for i in 0..registry.len() {
            registry.get_mut(i).on_finalize()?;
        }
        Ok(())
    }

    fn read_category(
        &mut self,
        registry: &mut Registry,
        on_unknown_category: &mut Option<Box<UnknownCategoryFn>>,
        on_unknown_keyword: &mut Option<Box<UnknownKeywordFn>>,
    ) -> Result<(), Error> {
        let len = self.msgpack.read_map_len()?;
        let mut cat_idx: Option<usize> = None;
        let mut category_name: Vec<u8> = Vec::new();

        for _ in 0..len {
            let key = self.msgpack.read_str()?;
            match key.as_slice() {
                b"name" => {
                    category_name = self.msgpack.read_str()?;
                    cat_idx = registry.find_index(&category_name);
                    if cat_idx.is_none() {
                        if let Some(cb) = on_unknown_category {
                            cb(&String::from_utf8_lossy(&category_name));
                        }
                    }
                }
                b"columns" => {
                    let col_count = self.msgpack.read_array_len()?;
                    let mut columns: Vec<ColumnData> = Vec::new();
                    for _ in 0..col_count {
                        if let Some((keyword_index, name, values, mask)) =
                            self.read_column(cat_idx, registry, on_unknown_keyword, &category_name)?
                        {
                            columns.push(ColumnData {
                                keyword_index,
                                name,
                                values,
                                mask,
                                scratch: String::new(),
                            });
                        }
                    }
                    if let Some(idx) = cat_idx {
                        self.dispatch_rows(registry, idx, &mut columns)?;
                    }
                }
                _ => self.msgpack.skip_value()?,
            }
        }
        Ok(())
    }

    /// Returns `None` only when the whole category is unregistered, in which
    /// case `data`/`mask` are skipped without decoding. A column whose own
    /// name doesn't match a keyword under a *registered* category is still
    /// decoded: its length is needed to establish the category's row count
    /// even when no column ends up dispatched (the all-columns-unmatched
    /// case), mirroring the text reader firing `on_row` with an all-`Absent`
    /// row whenever its category is known.
    #[allow(clippy::type_complexity)]
    fn read_column(
        &mut self,
        cat_idx: Option<usize>,
        registry: &mut Registry,
        on_unknown_keyword: &mut Option<Box<UnknownKeywordFn>>,
        category_name: &[u8],
    ) -> Result<Option<(Option<usize>, Vec<u8>, TypedBuffer, Option<Vec<u8>>)>, Error> {
        let len = self.msgpack.read_map_len()?;
        let mut name: Vec<u8> = Vec::new();
        let mut keyword_index: Option<usize> = None;
        let mut seen_name = false;
        let mut data: Option<TypedBuffer> = None;
        let mut mask: Option<Vec<u8>> = None;

        for _ in 0..len {
            let key = self.msgpack.read_str()?;
            match key.as_slice() {
                b"name" => {
                    name = self.msgpack.read_str()?;
                    seen_name = true;
                    if let Some(idx) = cat_idx {
                        keyword_index = registry.get(idx).find_keyword(&name);
                        if keyword_index.is_none() {
                            if let Some(cb) = on_unknown_keyword {
                                cb(
                                    &String::from_utf8_lossy(category_name),
                                    &String::from_utf8_lossy(&name),
                                );
                            }
                        }
                    }
                }
                b"data" => {
                    if cat_idx.is_none() {
                        self.msgpack.skip_value()?;
                    } else {
                        data = Some(self.read_typed_stream()?);
                    }
                }
                b"mask" => {
                    if cat_idx.is_none() || (seen_name && keyword_index.is_none()) {
                        self.msgpack.skip_value()?;
                    } else {
                        mask = match self.read_typed_stream_or_nil()? {
                            None => None,
                            Some(buf) => Some(as_u8_mask(buf)?),
                        };
                    }
                }
                _ => self.msgpack.skip_value()?,
            }
        }

        match cat_idx {
            Some(_) => {
                let data = data.ok_or(FileFormatError::MsgpackEof)?;
                Ok(Some((keyword_index, name, data, mask)))
            }
            None => Ok(None),
        }
    }

    fn read_typed_stream(&mut self) -> Result<TypedBuffer, Error> {
        let len = self.msgpack.read_map_len()?;
        self.read_typed_stream_body(len)
    }

    fn read_typed_stream_or_nil(&mut self) -> Result<Option<TypedBuffer>, Error> {
        match self.msgpack.read_map_len_or_nil()? {
            None => Ok(None),
            Some(len) => Ok(Some(self.read_typed_stream_body(len)?)),
        }
    }

    fn read_typed_stream_body(&mut self, len: usize) -> Result<TypedBuffer, Error> {
        let mut raw: Option<Vec<u8>> = None;
        let mut encodings: Option<Vec<Encoding>> = None;
        for _ in 0..len {
            let key = self.msgpack.read_str()?;
            match key.as_slice() {
                b"data" => raw = Some(self.msgpack.read_str_or_bin()?),
                b"encoding" => encodings = Some(self.read_encoding_array()?),
                _ => self.msgpack.skip_value()?,
            }
        }
        decode_column(raw.unwrap_or_default(), &encodings.unwrap_or_default())
    }

    fn read_encoding_array(&mut self) -> Result<Vec<Encoding>, Error> {
        let len = self.msgpack.read_array_len()?;
        (0..len).map(|_| self.read_encoding()).collect()
    }

    fn read_encoding(&mut self) -> Result<Encoding, Error> {
        let len = self.msgpack.read_map_len()?;
        let mut kind: Option<Vec<u8>> = None;
        let mut element_type: Option<i64> = None;
        let mut origin: Option<i32> = None;
        let mut factor: Option<f64> = None;
        let mut data_encoding: Option<Vec<Encoding>> = None;
        let mut offset_encoding: Option<Vec<Encoding>> = None;
        let mut string_data: Option<Vec<u8>> = None;
        let mut offsets_raw: Option<Vec<u8>> = None;

        for _ in 0..len {
            let key = self.msgpack.read_str()?;
            match key.as_slice() {
                b"kind" => kind = Some(self.msgpack.read_str()?),
                b"type" => element_type = Some(self.msgpack.read_int()?),
                b"origin" => origin = Some(self.msgpack.read_int()? as i32),
                b"factor" => factor = Some(self.msgpack.read_f64()?),
                b"dataEncoding" => data_encoding = Some(self.read_encoding_array()?),
                b"offsetEncoding" => offset_encoding = Some(self.read_encoding_array()?),
                b"stringData" => string_data = Some(self.msgpack.read_str_or_bin()?),
                b"offsets" => offsets_raw = Some(self.msgpack.read_bin()?),
                _ => self.msgpack.skip_value()?,
            }
        }

        let kind = kind.unwrap_or_default();
        match kind.as_slice() {
            b"ByteArray" => Ok(Encoding::ByteArray {
                element_type: element_type.unwrap_or(4),
            }),
            b"IntegerPacking" => Ok(Encoding::IntegerPacking),
            b"Delta" => Ok(Encoding::Delta {
                origin: origin.unwrap_or(0),
            }),
            b"RunLength" => Ok(Encoding::RunLength),
            b"FixedPoint" => Ok(Encoding::FixedPoint {
                factor: factor.unwrap_or(1.0),
            }),
            b"StringArray" => Ok(Encoding::StringArray {
                data_encoding: data_encoding.unwrap_or_default(),
                offset_encoding: offset_encoding.unwrap_or_default(),
                string_data: string_data.unwrap_or_default(),
                offsets_raw: offsets_raw.unwrap_or_default(),
            }),
            _ => Err(FileFormatError::UnknownEncodingKind(String::from_utf8_lossy(&kind).into_owned()).into()),
        }
    }

    fn dispatch_rows(
        &mut self,
        registry: &mut Registry,
        cat_idx: usize,
        columns: &mut [ColumnData],
    ) -> Result<(), Error> {
        let keyword_count = registry.get(cat_idx).keyword_count();
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for col in columns.iter() {
            if col.values.len() != row_count {
                return Err(FileFormatError::ColumnLengthMismatch {
                    name: String::from_utf8_lossy(&col.name).into_owned(),
                    got: col.values.len(),
                    expected: row_count,
                }
                .into());
            }
            if let Some(mask) = &col.mask {
                if mask.len() != row_count {
                    return Err(FileFormatError::ColumnLengthMismatch {
                        name: String::from_utf8_lossy(&col.name).into_owned(),
                        got: mask.len(),
                        expected: row_count,
                    }
                    .into());
                }
            }
        }

        for i in 0..row_count {
            let mut fields = vec![Field::Absent; keyword_count];
            for col in columns.iter_mut() {
                let Some(ki) = col.keyword_index else {
                    continue;
                };
                let masked = col.mask.as_ref().map(|m| m[i]).unwrap_or(0);
                fields[ki] = match masked {
                    1 => Field::Omitted,
                    2 => Field::Unknown,
                    _ => match col.values.get(i)? {
                        ColumnValue::Str(bytes) => Field::Data(bytes),
                        ColumnValue::Int(v) => {
                            col.scratch.clear();
                            write!(col.scratch, "{v}").expect("writing to a String cannot fail");
                            Field::Data(col.scratch.as_bytes())
                        }
                        ColumnValue::Float(v) => {
                            col.scratch.clear();
                            write!(col.scratch, "{v}").expect("writing to a String cannot fail");
                            Field::Data(col.scratch.as_bytes())
                        }
                    },
                };
            }
            let row = Row::new(&fields);
            registry.get_mut(cat_idx).on_row(&row)?;
        }
        Ok(())
    }
}

/// End-to-end exercises against small, hand-built MessagePack documents:
/// multi-block iteration, a StringArray-encoded column, and mask-driven
/// omitted/unknown sentinels.
#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::reader::Reader;
    use crate::registry::Category;

    fn push_fixmap(out: &mut Vec<u8>, n: usize) {
        out.push(0x80 | n as u8);
    }
    fn push_fixarray(out: &mut Vec<u8>, n: usize) {
        out.push(0x90 | n as u8);
    }
    fn push_fixstr(out: &mut Vec<u8>, s: &[u8]) {
        out.push(0xa0 | s.len() as u8);
        out.extend_from_slice(s);
    }
    fn push_bin8(out: &mut Vec<u8>, bytes: &[u8]) {
        out.push(0xc4);
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
    }

    /// Builds a minimal one-block, one-category, one-column document with a
    /// single ByteArray(i32) encoding and no mask.
    fn build_document(name_col_values: &[i32]) -> Vec<u8> {
        let mut raw = Vec::new();
        for v in name_col_values {
            raw.extend_from_slice(&v.to_le_bytes());
        }

        let mut encoding = Vec::new();
        push_fixmap(&mut encoding, 2);
        push_fixstr(&mut encoding, b"kind");
        push_fixstr(&mut encoding, b"ByteArray");
        push_fixstr(&mut encoding, b"type");
        encoding.push(0x03); // positive fixint 3 = i32

        let mut data_submap = Vec::new();
        push_fixmap(&mut data_submap, 2);
        push_fixstr(&mut data_submap, b"data");
        push_bin8(&mut data_submap, &raw);
        push_fixstr(&mut data_submap, b"encoding");
        push_fixarray(&mut data_submap, 1);
        data_submap.extend_from_slice(&encoding);

        let mut column = Vec::new();
        push_fixmap(&mut column, 2);
        push_fixstr(&mut column, b"name");
        push_fixstr(&mut column, b"id");
        push_fixstr(&mut column, b"data");
        column.extend_from_slice(&data_submap);

        let mut category = Vec::new();
        push_fixmap(&mut category, 2);
        push_fixstr(&mut category, b"name");
        push_fixstr(&mut category, b"_entry");
        push_fixstr(&mut category, b"columns");
        push_fixarray(&mut category, 1);
        category.extend_from_slice(&column);

        let mut block = Vec::new();
        push_fixmap(&mut block, 1);
        push_fixstr(&mut block, b"categories");
        push_fixarray(&mut block, 1);
        block.extend_from_slice(&category);

        let mut doc = Vec::new();
        push_fixmap(&mut doc, 1);
        push_fixstr(&mut doc, b"dataBlocks");
        push_fixarray(&mut doc, 1);
        doc.extend_from_slice(&block);
        doc
    }

    #[test]
    fn reads_single_block_single_column() {
        let doc = build_document(&[1, 2, 3]);
        let mut registry = Registry::new();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        registry.register(Box::new(Category::new("_entry", ["id"], (), move |_, row| {
            let v = row.get(0).as_str().unwrap().to_string();
            seen2.borrow_mut().push(v);
            Ok(())
        })));

        let mut reader = BinaryReader::new(&doc[..]);
        let mut on_cat: Option<Box<UnknownCategoryFn>> = None;
        let mut on_kw: Option<Box<UnknownKeywordFn>> = None;
        let more = reader.read_block(&mut registry, &mut on_cat, &mut on_kw).unwrap();
        assert!(!more);
        assert_eq!(*seen.borrow(), vec!["1", "2", "3"]);
    }

    fn push_byte_array_encoding(out: &mut Vec<u8>, element_type: u8) {
        push_fixmap(out, 2);
        push_fixstr(out, b"kind");
        push_fixstr(out, b"ByteArray");
        push_fixstr(out, b"type");
        out.push(element_type);
    }
    fn le_i32s(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// A single-column `_entry.id` block encoded as a plain ByteArray(i32).
    fn block_entry(values: &[i32]) -> Vec<u8> {
        let mut data_submap = Vec::new();
        push_fixmap(&mut data_submap, 2);
        push_fixstr(&mut data_submap, b"data");
        push_bin8(&mut data_submap, &le_i32s(values));
        push_fixstr(&mut data_submap, b"encoding");
        push_fixarray(&mut data_submap, 1);
        push_byte_array_encoding(&mut data_submap, 3);

        let mut column = Vec::new();
        push_fixmap(&mut column, 2);
        push_fixstr(&mut column, b"name");
        push_fixstr(&mut column, b"id");
        push_fixstr(&mut column, b"data");
        column.extend_from_slice(&data_submap);

        let mut category = Vec::new();
        push_fixmap(&mut category, 2);
        push_fixstr(&mut category, b"name");
        push_fixstr(&mut category, b"_entry");
        push_fixstr(&mut category, b"columns");
        push_fixarray(&mut category, 1);
        category.extend_from_slice(&column);

        let mut block = Vec::new();
        push_fixmap(&mut block, 1);
        push_fixstr(&mut block, b"categories");
        push_fixarray(&mut block, 1);
        block.extend_from_slice(&category);
        block
    }

    /// A two-column `_atom` block: `symbol` via StringArray over a two-entry
    /// blob, `charge` via ByteArray(i32) with a mask marking one omitted and
    /// one unknown row.
    fn block_atom() -> Vec<u8> {
        let indices_raw = le_i32s(&[0, 1, 0]); // "C", "N", "C"
        let offsets_raw = le_i32s(&[0, 1, 2]);
        let string_data = b"CN".to_vec();

        let mut string_array_encoding = Vec::new();
        push_fixmap(&mut string_array_encoding, 5);
        push_fixstr(&mut string_array_encoding, b"kind");
        push_fixstr(&mut string_array_encoding, b"StringArray");
        push_fixstr(&mut string_array_encoding, b"dataEncoding");
        push_fixarray(&mut string_array_encoding, 1);
        push_byte_array_encoding(&mut string_array_encoding, 3);
        push_fixstr(&mut string_array_encoding, b"offsetEncoding");
        push_fixarray(&mut string_array_encoding, 1);
        push_byte_array_encoding(&mut string_array_encoding, 3);
        push_fixstr(&mut string_array_encoding, b"stringData");
        push_bin8(&mut string_array_encoding, &string_data);
        push_fixstr(&mut string_array_encoding, b"offsets");
        push_bin8(&mut string_array_encoding, &offsets_raw);

        let mut symbol_data_submap = Vec::new();
        push_fixmap(&mut symbol_data_submap, 2);
        push_fixstr(&mut symbol_data_submap, b"data");
        push_bin8(&mut symbol_data_submap, &indices_raw);
        push_fixstr(&mut symbol_data_submap, b"encoding");
        push_fixarray(&mut symbol_data_submap, 1);
        symbol_data_submap.extend_from_slice(&string_array_encoding);

        let mut symbol_column = Vec::new();
        push_fixmap(&mut symbol_column, 2);
        push_fixstr(&mut symbol_column, b"name");
        push_fixstr(&mut symbol_column, b"symbol");
        push_fixstr(&mut symbol_column, b"data");
        symbol_column.extend_from_slice(&symbol_data_submap);

        let charge_raw = le_i32s(&[1, 0, 0]);
        let mut charge_data_submap = Vec::new();
        push_fixmap(&mut charge_data_submap, 2);
        push_fixstr(&mut charge_data_submap, b"data");
        push_bin8(&mut charge_data_submap, &charge_raw);
        push_fixstr(&mut charge_data_submap, b"encoding");
        push_fixarray(&mut charge_data_submap, 1);
        push_byte_array_encoding(&mut charge_data_submap, 3);

        let mask_bytes = vec![0u8, 1, 2]; // present, omitted, unknown
        let mut mask_submap = Vec::new();
        push_fixmap(&mut mask_submap, 2);
        push_fixstr(&mut mask_submap, b"data");
        push_bin8(&mut mask_submap, &mask_bytes);
        push_fixstr(&mut mask_submap, b"encoding");
        push_fixarray(&mut mask_submap, 1);
        push_byte_array_encoding(&mut mask_submap, 4);

        let mut charge_column = Vec::new();
        push_fixmap(&mut charge_column, 3);
        push_fixstr(&mut charge_column, b"name");
        push_fixstr(&mut charge_column, b"charge");
        push_fixstr(&mut charge_column, b"data");
        charge_column.extend_from_slice(&charge_data_submap);
        push_fixstr(&mut charge_column, b"mask");
        charge_column.extend_from_slice(&mask_submap);

        let mut category = Vec::new();
        push_fixmap(&mut category, 2);
        push_fixstr(&mut category, b"name");
        push_fixstr(&mut category, b"_atom");
        push_fixstr(&mut category, b"columns");
        push_fixarray(&mut category, 2);
        category.extend_from_slice(&symbol_column);
        category.extend_from_slice(&charge_column);

        let mut block = Vec::new();
        push_fixmap(&mut block, 1);
        push_fixstr(&mut block, b"categories");
        push_fixarray(&mut block, 1);
        block.extend_from_slice(&category);
        block
    }

    fn document(blocks: &[Vec<u8>]) -> Vec<u8> {
        let mut doc = Vec::new();
        push_fixmap(&mut doc, 1);
        push_fixstr(&mut doc, b"dataBlocks");
        push_fixarray(&mut doc, blocks.len());
        for b in blocks {
            doc.extend_from_slice(b);
        }
        doc
    }

    #[test]
    fn iterates_two_blocks_with_mixed_categories() {
        let doc = document(&[block_entry(&[10, 20]), block_atom()]);
        let mut reader = Reader::binary(&doc[..]);

        let entries = Rc::new(RefCell::new(Vec::new()));
        let entries_in_cb = entries.clone();
        reader.register(Box::new(Category::new(
            "_entry",
            ["id"],
            (),
            move |_, row| {
                entries_in_cb
                    .borrow_mut()
                    .push(row.get(0).as_str().unwrap().to_string());
                Ok(())
            },
        )));

        let atoms = Rc::new(RefCell::new(Vec::new()));
        let atoms_in_cb = atoms.clone();
        reader.register(Box::new(Category::new(
            "_atom",
            ["symbol", "charge"],
            (),
            move |_, row| {
                let symbol = row.get(0).as_str().unwrap().to_string();
                let charge = row.get(1);
                let charge = if charge.is_omitted() {
                    "omitted".to_string()
                } else if charge.is_unknown() {
                    "unknown".to_string()
                } else {
                    charge.as_str().unwrap().to_string()
                };
                atoms_in_cb.borrow_mut().push((symbol, charge));
                Ok(())
            },
        )));

        assert!(reader.read_block().unwrap());
        assert!(!reader.read_block().unwrap());

        assert_eq!(*entries.borrow(), vec!["10", "20"]);
        assert_eq!(
            *atoms.borrow(),
            vec![
                ("C".to_string(), "1".to_string()),
                ("N".to_string(), "omitted".to_string()),
                ("C".to_string(), "unknown".to_string()),
            ]
        );
    }

    #[test]
    fn unregistered_category_is_reported_and_skipped() {
        let doc = document(&[block_entry(&[1])]);
        let mut reader = Reader::binary(&doc[..]);

        let unknown = Rc::new(RefCell::new(Vec::new()));
        let unknown_in_cb = unknown.clone();
        reader.on_unknown_category(move |name| unknown_in_cb.borrow_mut().push(name.to_string()));

        assert!(!reader.read_block().unwrap());
        assert_eq!(*unknown.borrow(), vec!["_entry"]);
    }

    #[test]
    fn registered_category_with_no_matching_columns_still_fires_on_row() {
        // `_entry` is registered under a keyword ("missing") that never
        // appears in the file's single "id" column: every column goes
        // unmatched, but the category itself is present with 3 rows.
        let doc = document(&[block_entry(&[1, 2, 3])]);
        let mut reader = Reader::binary(&doc[..]);

        let row_count = Rc::new(RefCell::new(0));
        let row_count_in_cb = row_count.clone();
        reader.register(Box::new(Category::new(
            "_entry",
            ["missing"],
            (),
            move |_, row| {
                assert!(!row.get(0).in_file());
                *row_count_in_cb.borrow_mut() += 1;
                Ok(())
            },
        )));

        assert!(!reader.read_block().unwrap());
        assert_eq!(*row_count.borrow(), 3);
    }
}
