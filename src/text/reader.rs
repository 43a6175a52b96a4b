use crate::error::{Error, FileFormatError};
use crate::registry::{CategoryHandler, Registry, UnknownCategoryFn, UnknownKeywordFn};
use crate::source::ByteSource;
use crate::text::line_buffer::LineBuffer;
use crate::text::token::{split_category_keyword, tokenize_line, Span, Token, TokenKind};
use crate::value::{Field, Row};

#[derive(Clone)]
enum SingletonValue {
    Omitted,
    Unknown,
    Data(Vec<u8>),
}

/// One nesting level of pending singleton (`_cat.key value`) assignments,
/// indexed `[category index][keyword index]`. A new level is pushed on
/// entering a `save_` frame and flushed and popped on leaving it, so that
/// assignments made inside a frame don't leak into the surrounding block.
type Layer = Vec<Vec<Option<SingletonValue>>>;

fn new_layer(registry: &Registry) -> Layer {
    (0..registry.len())
        .map(|i| vec![None; registry.get(i).keyword_count()])
        .collect()
}

fn flush_layer(registry: &mut Registry, layer: &Layer) -> Result<(), Error> {
    for (idx, cat_layer) in layer.iter().enumerate() {
        if cat_layer.iter().any(Option::is_some) {
            let fields: Vec<Field<'_>> = cat_layer
                .iter()
                .map(|v| match v {
                    None => Field::Absent,
                    Some(SingletonValue::Omitted) => Field::Omitted,
                    Some(SingletonValue::Unknown) => Field::Unknown,
                    Some(SingletonValue::Data(bytes)) => Field::Data(bytes.as_slice()),
                })
                .collect();
            let row = Row::new(&fields);
            registry.get_mut(idx).on_row(&row)?;
        }
    }
    Ok(())
}

/// Drives the mmCIF tokenizer and block/loop/save-frame state machine
/// described in `ihm_format.c`'s `ihm_read_file` and its helpers, reworked as
/// an explicit per-call state machine rather than one long C function.
pub(crate) struct TextReader<S> {
    lines: LineBuffer<S>,
    cur_line: Vec<u8>,
    cur_tokens: Vec<Token>,
    token_pos: usize,
    cur_line_no: u64,
}

impl<S: ByteSource> TextReader<S> {
    pub(crate) fn new(source: S) -> Self {
        TextReader {
            lines: LineBuffer::new(source),
            cur_line: Vec::new(),
            cur_tokens: Vec::new(),
            token_pos: 0,
            cur_line_no: 0,
        }
    }

    /// Reads one data block, dispatching rows to `registry` as they're
    /// encountered. Returns whether another block follows.
    pub(crate) fn read_block(
        &mut self,
        registry: &mut Registry,
        on_unknown_category: &mut Option<Box<UnknownCategoryFn>>,
        on_unknown_keyword: &mut Option<Box<UnknownKeywordFn>>,
    ) -> Result<bool, Error> {
        registry.ensure_sorted();

        loop {
            match self.peek_token()? {
                None => return Ok(false),
                Some(tok) if tok.kind == TokenKind::Data => {
                    self.bump();
                    break;
                }
                Some(_) => self.bump(),
            }
        }

        let mut stack: Vec<Layer> = vec![new_layer(registry)];
        let mut more = false;

        loop {
            let tok = match self.peek_token()? {
                None => break,
                Some(tok) => tok,
            };
            match tok.kind {
                TokenKind::Data => {
                    more = true;
                    break;
                }
                TokenKind::Loop => {
                    self.parse_loop(registry, on_unknown_category, on_unknown_keyword)?
                }
                TokenKind::Variable => self.parse_singleton(
                    registry,
                    on_unknown_category,
                    on_unknown_keyword,
                    stack.last_mut().expect("base layer always present"),
                )?,
                TokenKind::Save => {
                    self.handle_save(registry, &mut stack)?;
                }
                TokenKind::Value | TokenKind::Omitted | TokenKind::Unknown => {
                    return Err(FileFormatError::ExpectedValue {
                        line: self.cur_line_no,
                    }
                    .into());
                }
            }
        }

        if stack.len() != 1 {
            return Err(FileFormatError::UnmatchedSaveFrame {
                line: self.cur_line_no,
            }
            .into());
        }
        let base = stack.pop().expect("base layer always present");
        flush_layer(registry, &base)?;
        for i in 0..registry.len() {
            registry.get_mut(i).on_finalize()?;
        }
        Ok(more)
    }

    /// Save frames are a flat *Top*/*InSave* toggle, not arbitrary nesting: a
    /// named `save_foo` opens one from *Top*, and a bare `save_` closes it
    /// back to *Top*. Either token seen in the wrong state is a structural
    /// error rather than silently opening or closing the wrong thing.
    fn handle_save(&mut self, registry: &mut Registry, stack: &mut Vec<Layer>) -> Result<(), Error> {
        let tok = self.peek_token()?.expect("caller verified a Save token");
        self.bump();
        let text = tok.span.slice(&self.cur_line);
        let name_is_empty = text.len() <= "save_".len();
        let in_save = stack.len() > 1;

        match (name_is_empty, in_save) {
            (false, false) => stack.push(new_layer(registry)),
            (true, true) => {
                let layer = stack.pop().expect("checked in_save");
                flush_layer(registry, &layer)?;
                for i in 0..registry.len() {
                    registry.get_mut(i).on_save_frame_end()?;
                }
            }
            (false, true) | (true, false) => {
                return Err(FileFormatError::UnmatchedSaveFrame {
                    line: self.cur_line_no,
                }
                .into())
            }
        }
        Ok(())
    }

    fn parse_singleton(
        &mut self,
        registry: &mut Registry,
        on_unknown_category: &mut Option<Box<UnknownCategoryFn>>,
        on_unknown_keyword: &mut Option<Box<UnknownKeywordFn>>,
        layer: &mut [Vec<Option<SingletonValue>>],
    ) -> Result<(), Error> {
        let tok = self.peek_token()?.expect("caller verified a Variable token");
        self.bump();
        let text = tok.span.slice(&self.cur_line).to_vec();
        let (cat, key) = split_category_keyword(&text, self.cur_line_no)?;

        let value_tok = match self.peek_token()? {
            Some(t) if matches!(t.kind, TokenKind::Value | TokenKind::Omitted | TokenKind::Unknown) => {
                t
            }
            _ => {
                return Err(FileFormatError::ExpectedValue {
                    line: self.cur_line_no,
                }
                .into())
            }
        };
        self.bump();
        let value = match value_tok.kind {
            TokenKind::Omitted => SingletonValue::Omitted,
            TokenKind::Unknown => SingletonValue::Unknown,
            _ => SingletonValue::Data(value_tok.span.slice(&self.cur_line).to_vec()),
        };

        match registry.find_index(cat) {
            None => {
                if let Some(cb) = on_unknown_category {
                    cb(&String::from_utf8_lossy(cat));
                }
            }
            Some(idx) => match registry.get(idx).find_keyword(key) {
                None => {
                    if let Some(cb) = on_unknown_keyword {
                        cb(&String::from_utf8_lossy(cat), &String::from_utf8_lossy(key));
                    }
                }
                Some(ki) => {
                    // Last write wins on duplicate assignment, matching
                    // `set_value` in `ihm_format.c`.
                    layer[idx][ki] = Some(value);
                }
            },
        }
        Ok(())
    }

    fn parse_loop(
        &mut self,
        registry: &mut Registry,
        on_unknown_category: &mut Option<Box<UnknownCategoryFn>>,
        on_unknown_keyword: &mut Option<Box<UnknownKeywordFn>>,
    ) -> Result<(), Error> {
        self.bump(); // consume `loop_`

        let mut category_name: Option<Vec<u8>> = None;
        let mut keyword_names: Vec<Vec<u8>> = Vec::new();
        loop {
            match self.peek_token()? {
                Some(tok) if tok.kind == TokenKind::Variable => {
                    self.bump();
                    let text = tok.span.slice(&self.cur_line).to_vec();
                    let (cat, key) = split_category_keyword(&text, self.cur_line_no)?;
                    match &category_name {
                        None => category_name = Some(cat.to_vec()),
                        Some(existing) if existing.eq_ignore_ascii_case(cat) => {}
                        Some(existing) => {
                            return Err(FileFormatError::MixedLoopCategories {
                                line: self.cur_line_no,
                                first: String::from_utf8_lossy(existing).into_owned(),
                                second: String::from_utf8_lossy(cat).into_owned(),
                            }
                            .into())
                        }
                    }
                    keyword_names.push(key.to_vec());
                }
                _ => break,
            }
        }
        let Some(category_name) = category_name else {
            return Ok(()); // `loop_` with no header; nothing to do
        };
        let column_count = keyword_names.len();

        let cat_idx = registry.find_index(&category_name);
        let mapping: Option<Vec<Option<usize>>> = match cat_idx {
            None => {
                if let Some(cb) = on_unknown_category {
                    cb(&String::from_utf8_lossy(&category_name));
                }
                None
            }
            Some(idx) => {
                let mut m = Vec::with_capacity(column_count);
                for key in &keyword_names {
                    match registry.get(idx).find_keyword(key) {
                        Some(ki) => m.push(Some(ki)),
                        None => {
                            if let Some(cb) = on_unknown_keyword {
                                cb(
                                    &String::from_utf8_lossy(&category_name),
                                    &String::from_utf8_lossy(key),
                                );
                            }
                            m.push(None);
                        }
                    }
                }
                Some(m)
            }
        };

        loop {
            match self.peek_token()? {
                Some(tok) if matches!(tok.kind, TokenKind::Value | TokenKind::Omitted | TokenKind::Unknown) => {
                    self.parse_loop_row(registry, cat_idx, &mapping, column_count)?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn parse_loop_row(
        &mut self,
        registry: &mut Registry,
        cat_idx: Option<usize>,
        mapping: &Option<Vec<Option<usize>>>,
        column_count: usize,
    ) -> Result<(), Error> {
        #[derive(Clone, Copy)]
        enum RowValue {
            Omitted,
            Unknown,
            Span(Span),
            Owned(usize),
        }

        let mut captures: Vec<RowValue> = Vec::with_capacity(column_count);
        let mut owned: Vec<Vec<u8>> = Vec::new();

        for i in 0..column_count {
            if self.token_pos >= self.cur_tokens.len() {
                // The next token requires reading a new physical line, which
                // will overwrite `self.cur_line`. Freeze every capture so far
                // into owned storage while it's still valid.
                for cap in captures.iter_mut() {
                    if let RowValue::Span(span) = *cap {
                        let bytes = span.slice(&self.cur_line).to_vec();
                        owned.push(bytes);
                        *cap = RowValue::Owned(owned.len() - 1);
                    }
                }
            }
            let tok = match self.peek_token()? {
                Some(t) => t,
                None => {
                    return Err(FileFormatError::LoopArityMismatch {
                        line: self.cur_line_no,
                        got: i,
                        expected: column_count,
                    }
                    .into())
                }
            };
            match tok.kind {
                TokenKind::Value => {
                    self.bump();
                    captures.push(RowValue::Span(tok.span));
                }
                TokenKind::Omitted => {
                    self.bump();
                    captures.push(RowValue::Omitted);
                }
                TokenKind::Unknown => {
                    self.bump();
                    captures.push(RowValue::Unknown);
                }
                _ => {
                    return Err(FileFormatError::LoopArityMismatch {
                        line: self.cur_line_no,
                        got: i,
                        expected: column_count,
                    }
                    .into())
                }
            }
        }

        if let (Some(idx), Some(m)) = (cat_idx, mapping) {
            let keyword_count = registry.get(idx).keyword_count();
            let mut fields = vec![Field::Absent; keyword_count];
            for (col, value) in captures.iter().enumerate() {
                if let Some(ki) = m[col] {
                    fields[ki] = match *value {
                        RowValue::Omitted => Field::Omitted,
                        RowValue::Unknown => Field::Unknown,
                        RowValue::Span(span) => Field::Data(span.slice(&self.cur_line)),
                        RowValue::Owned(oi) => Field::Data(&owned[oi]),
                    };
                }
            }
            let row = Row::new(&fields);
            registry.get_mut(idx).on_row(&row)?;
        }
        Ok(())
    }

    fn fetch_next_tokens(&mut self) -> Result<bool, Error> {
        loop {
            match self.lines.next_line()? {
                None => return Ok(false),
                Some(line) => {
                    if line.first() == Some(&b';') {
                        let mut body = line[1..].to_vec();
                        let start_line_no = self.lines.line_no;
                        loop {
                            match self.lines.next_line()? {
                                None => {
                                    return Err(FileFormatError::UnterminatedMultiline {
                                        line: start_line_no,
                                    }
                                    .into())
                                }
                                Some(next) => {
                                    if next.first() == Some(&b';') {
                                        break;
                                    }
                                    body.push(b'\n');
                                    body.extend_from_slice(next);
                                }
                            }
                        }
                        self.cur_line_no = start_line_no;
                        let len = body.len();
                        self.cur_line = body;
                        self.cur_tokens = vec![Token {
                            kind: TokenKind::Value,
                            span: Span { start: 0, end: len },
                        }];
                        self.token_pos = 0;
                        return Ok(true);
                    }

                    let owned_line = line.to_vec();
                    let line_no = self.lines.line_no;
                    self.cur_line = owned_line;
                    self.cur_line_no = line_no;
                    let tokens = tokenize_line(&self.cur_line, self.cur_line_no)?;
                    if tokens.is_empty() {
                        continue;
                    }
                    self.cur_tokens = tokens;
                    self.token_pos = 0;
                    return Ok(true);
                }
            }
        }
    }

    fn peek_token(&mut self) -> Result<Option<Token>, Error> {
        if self.token_pos < self.cur_tokens.len() {
            return Ok(Some(self.cur_tokens[self.token_pos]));
        }
        if self.fetch_next_tokens()? {
            Ok(Some(self.cur_tokens[self.token_pos]))
        } else {
            Ok(None)
        }
    }

    fn bump(&mut self) {
        self.token_pos += 1;
    }
}

/// End-to-end exercises against small, hand-written documents: multi-block
/// iteration, loops, sentinel values, and multi-line semicolon values.
#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::registry::Category;
    use crate::reader::Reader;

    #[test]
    fn iterates_two_blocks_of_single_value_entries() {
        let input = b"data_A\n_entry.id 1YTI\ndata_B\n_entry.id 2XYZ\n";
        let mut reader = Reader::text(&input[..]);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_cb = seen.clone();
        reader.register(Box::new(Category::new(
            "_entry",
            ["id"],
            (),
            move |_, row| {
                seen_in_cb
                    .borrow_mut()
                    .push(row.get(0).as_str().unwrap().to_string());
                Ok(())
            },
        )));

        assert!(reader.read_block().unwrap());
        assert!(!reader.read_block().unwrap());
        assert_eq!(*seen.borrow(), vec!["1YTI", "2XYZ"]);
    }

    #[test]
    fn loop_rows_carry_omitted_and_unknown_sentinels() {
        let input = b"data_B\nloop_\n_atom.id\n_atom.symbol\n_atom.charge\n1 C .\n2 N ?\n3 O 1\n";
        let mut reader = Reader::text(&input[..]);

        let charges = Rc::new(RefCell::new(Vec::new()));
        let charges_in_cb = charges.clone();
        reader.register(Box::new(Category::new(
            "_atom",
            ["id", "symbol", "charge"],
            (),
            move |_, row| {
                let charge = row.get(2);
                charges_in_cb.borrow_mut().push(if charge.is_omitted() {
                    "omitted".to_string()
                } else if charge.is_unknown() {
                    "unknown".to_string()
                } else {
                    charge.as_str().unwrap().to_string()
                });
                Ok(())
            },
        )));

        assert!(!reader.read_block().unwrap());
        assert_eq!(*charges.borrow(), vec!["omitted", "unknown", "1"]);
    }

    #[test]
    fn multiline_semicolon_value_joins_lines_with_newline() {
        let input = b"data_B\nloop_\n_note.text\n;alpha\nbeta\n;\n";
        let mut reader = Reader::text(&input[..]);

        let text = Rc::new(RefCell::new(String::new()));
        let text_in_cb = text.clone();
        reader.register(Box::new(Category::new(
            "_note",
            ["text"],
            (),
            move |_, row| {
                *text_in_cb.borrow_mut() = row.get(0).as_str().unwrap().to_string();
                Ok(())
            },
        )));

        assert!(!reader.read_block().unwrap());
        assert_eq!(*text.borrow(), "alpha\nbeta");
    }

    #[test]
    fn unregistered_category_and_keyword_are_reported() {
        let input = b"data_A\n_entry.id X\n_other.foo bar\n";
        let mut reader = Reader::text(&input[..]);

        let unknown_categories = Rc::new(RefCell::new(Vec::new()));
        let unknown_categories_in_cb = unknown_categories.clone();
        reader.on_unknown_category(move |name| {
            unknown_categories_in_cb.borrow_mut().push(name.to_string())
        });

        let unknown_keywords = Rc::new(RefCell::new(Vec::new()));
        let unknown_keywords_in_cb = unknown_keywords.clone();
        reader.on_unknown_keyword(move |category, keyword| {
            unknown_keywords_in_cb
                .borrow_mut()
                .push(format!("{category}.{keyword}"))
        });

        reader.register(Box::new(Category::new("_entry", ["missing"], (), |_, _| {
            Ok(())
        })));

        assert!(!reader.read_block().unwrap());
        assert_eq!(*unknown_categories.borrow(), vec!["_other"]);
        assert_eq!(*unknown_keywords.borrow(), vec!["_entry.id"]);
    }

    #[test]
    fn save_frame_scopes_a_singleton_away_from_the_enclosing_block() {
        let input = b"data_A\nsave_frame1\n_entry.id INSIDE\nsave_\n_entry.id OUTSIDE\n";
        let mut reader = Reader::text(&input[..]);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_cb = seen.clone();
        reader.register(Box::new(Category::new(
            "_entry",
            ["id"],
            (),
            move |_, row| {
                seen_in_cb
                    .borrow_mut()
                    .push(row.get(0).as_str().unwrap().to_string());
                Ok(())
            },
        )));

        assert!(!reader.read_block().unwrap());
        assert_eq!(*seen.borrow(), vec!["INSIDE", "OUTSIDE"]);
    }

    #[test]
    fn nested_save_frames_are_rejected() {
        let input = b"data_A\nsave_frame1\nsave_frame2\n_entry.id X\nsave_\nsave_\n";
        let mut reader = Reader::text(&input[..]);
        reader.register(Box::new(Category::new("_entry", ["id"], (), |_, _| Ok(()))));
        assert!(reader.read_block().is_err());
    }

    #[test]
    fn closing_a_save_frame_with_none_open_is_rejected() {
        let input = b"data_A\nsave_\n";
        let mut reader = Reader::text(&input[..]);
        reader.register(Box::new(Category::new("_entry", ["id"], (), |_, _| Ok(()))));
        assert!(reader.read_block().is_err());
    }

    #[test]
    fn finalize_fires_once_per_block_even_when_untouched() {
        let input = b"data_A\n_entry.id X\ndata_B\n_entry.id Y\n";
        let mut reader = Reader::text(&input[..]);

        let finalize_count = Rc::new(RefCell::new(0));
        let finalize_count_in_cb = finalize_count.clone();
        reader.register(Box::new(
            Category::new("_untouched", ["id"], (), |_, _| Ok(()))
                .on_finalize(move |_| {
                    *finalize_count_in_cb.borrow_mut() += 1;
                    Ok(())
                }),
        ));

        assert!(reader.read_block().unwrap());
        assert!(!reader.read_block().unwrap());
        assert_eq!(*finalize_count.borrow(), 2);
    }
}
