use crate::error::{Error, FileFormatError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Value,
    Omitted,
    Unknown,
    Loop,
    Data,
    Save,
    Variable,
}

/// A byte range within the line currently being tokenized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Span {
    #[inline]
    pub(crate) fn slice<'a>(&self, line: &'a [u8]) -> &'a [u8] {
        &line[self.start..self.end]
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) span: Span,
}

/// Splits one physical line into tokens.
///
/// Corresponds to `get_next_token` and `handle_quoted_token` in
/// `ihm_format.c`. A leading `#` (possibly after whitespace) makes the whole
/// line a comment, yielding no tokens.
pub(crate) fn tokenize_line(line: &[u8], line_no: u64) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut i = 0;
    let len = line.len();
    while i < len {
        while i < len && matches!(line[i], b' ' | b'\t') {
            i += 1;
        }
        if i >= len || line[i] == b'#' {
            break;
        }
        if line[i] == b'"' || line[i] == b'\'' {
            let quote = line[i];
            let start = i + 1;
            let mut j = start;
            loop {
                match line[j..].iter().position(|&b| b == quote) {
                    None => {
                        return Err(FileFormatError::UnterminatedQuote { line: line_no }.into())
                    }
                    Some(rel) => {
                        let end_quote = j + rel;
                        let followed_by_ws = line
                            .get(end_quote + 1)
                            .map_or(true, |&b| matches!(b, b' ' | b'\t'));
                        if followed_by_ws {
                            tokens.push(Token {
                                kind: TokenKind::Value,
                                span: Span {
                                    start,
                                    end: end_quote,
                                },
                            });
                            i = end_quote + 1;
                            break;
                        } else {
                            j = end_quote + 1;
                        }
                    }
                }
            }
            continue;
        }

        let start = i;
        while i < len && !matches!(line[i], b' ' | b'\t' | b'#') {
            i += 1;
        }
        let span = Span { start, end: i };
        let word = span.slice(line);
        let kind = classify_word(word);
        tokens.push(Token { kind, span });
    }
    Ok(tokens)
}

/// Case-sensitive, matching `strcmp`/`strncmp` in `get_next_token` in
/// `ihm_format.c`: reserved words are recognized only in their canonical
/// lowercase spelling, unlike category.keyword names elsewhere.
fn classify_word(word: &[u8]) -> TokenKind {
    if word == b"loop_" {
        TokenKind::Loop
    } else if word.starts_with(b"data_") {
        TokenKind::Data
    } else if word.starts_with(b"save_") {
        TokenKind::Save
    } else if word.first() == Some(&b'_') {
        TokenKind::Variable
    } else if word == b"." {
        TokenKind::Omitted
    } else if word == b"?" {
        TokenKind::Unknown
    } else {
        TokenKind::Value
    }
}

/// Splits a `Variable` token's text at the first `.` into category and
/// keyword. Corresponds to `parse_category_keyword` in `ihm_format.c`.
pub(crate) fn split_category_keyword(
    text: &[u8],
    line_no: u64,
) -> Result<(&[u8], &[u8]), Error> {
    match text.iter().position(|&b| b == b'.') {
        Some(dot) => Ok((&text[..dot], &text[dot + 1..])),
        None => Err(FileFormatError::MissingPeriod {
            line: line_no,
            name: String::from_utf8_lossy(text).into_owned(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &[u8]) -> Vec<TokenKind> {
        tokenize_line(line, 1).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn comment_line_yields_no_tokens() {
        assert!(tokenize_line(b"# a comment", 1).unwrap().is_empty());
    }

    #[test]
    fn recognizes_reserved_words() {
        assert_eq!(
            kinds(b"loop_ data_B save_frame1 _cat.key . ? plain"),
            [
                TokenKind::Loop,
                TokenKind::Data,
                TokenKind::Save,
                TokenKind::Variable,
                TokenKind::Omitted,
                TokenKind::Unknown,
                TokenKind::Value,
            ]
        );
    }

    #[test]
    fn reserved_words_are_case_sensitive() {
        assert_eq!(
            kinds(b"Loop_ Data_B Save_frame1"),
            [TokenKind::Value, TokenKind::Value, TokenKind::Value]
        );
    }

    #[test]
    fn quoted_value_with_embedded_quote_not_followed_by_space() {
        let tokens = tokenize_line(br#"'it's fine' rest"#, 1).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Value);
        assert_eq!(tokens[0].span.slice(br#"'it's fine' rest"#), b"it's fine");
    }

    #[test]
    fn quoted_value_containing_other_quote_char() {
        let line = br#""has 'single' inside""#;
        let tokens = tokenize_line(line, 1).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span.slice(line), b"has 'single' inside");
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(tokenize_line(b"\"unterminated", 1).is_err());
    }

    #[test]
    fn quoted_sentinel_is_a_literal_value() {
        let line = br#"".""#;
        let tokens = tokenize_line(line, 1).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Value);
        assert_eq!(tokens[0].span.slice(line), b".");
    }

    #[test]
    fn split_category_keyword_splits_at_first_dot() {
        let (cat, key) = split_category_keyword(b"_atom_site.Cartn_x", 1).unwrap();
        assert_eq!(cat, b"_atom_site");
        assert_eq!(key, b"Cartn_x");
    }

    #[test]
    fn split_category_keyword_without_dot_is_an_error() {
        assert!(split_category_keyword(b"_nodot", 1).is_err());
    }
}
