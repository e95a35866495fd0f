//! Tokenizer over a [`Source`].
//!
//! Comments are only recognised at the start of a token, so `/usr/bin` and
//! `a#b` read as single words.

use crate::{Error, source::Source};

/// Kinds of token produced by [`next_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// An unquoted run of characters.
    Word(String),
    /// The unescaped body of a double-quoted string.
    Quoted(String),
    /// `=`
    Equals,
    /// `{`
    Open,
    /// `}`
    Close,
    /// `;`
    Separator,
    /// The current source is exhausted.
    End,
}

/// A token together with the line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What was read.
    pub kind: TokenKind,
    /// 1-based line of the first character.
    pub line: usize,
}

/// True for characters that end an unquoted word.
fn ends_word(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '=' | ';' | '"')
}

/// Skip spaces and tabs, returning the first other character consumed.
pub fn skip_blank(src: &mut Source) -> Option<char> {
    loop {
        match src.next_char()? {
            ' ' | '\t' | '\r' => continue,
            c => return Some(c),
        }
    }
}

/// Consume the rest of a `#` comment, stopping after the newline.
pub fn skip_line_comment(src: &mut Source) {
    while let Some(c) = src.next_char() {
        if c == '\n' {
            break;
        }
    }
}

/// Consume a `/* */` comment whose opening `/*` has been read.
pub fn skip_block_comment(src: &mut Source, start_line: usize) -> Result<(), Error> {
    let mut star = false;
    while let Some(c) = src.next_char() {
        if star && c == '/' {
            return Ok(());
        }
        star = c == '*';
    }
    Err(Error::Lex {
        source_name: src.name().to_string(),
        line: start_line,
        message: "unterminated block comment".to_string(),
    })
}

/// Skip whitespace, newlines and comments, leaving the next significant
/// character unread.
fn skip_insignificant(src: &mut Source) -> Result<(), Error> {
    loop {
        let line = src.line();
        match src.next_char() {
            None => return Ok(()),
            Some(c) if c.is_whitespace() => {}
            Some('#') => skip_line_comment(src),
            Some('/') if src.peek() == Some('*') => {
                src.next_char();
                skip_block_comment(src, line)?;
            }
            Some(_) => {
                src.unget();
                return Ok(());
            }
        }
    }
}

/// Read the body of a quoted string whose opening `"` has been read.
///
/// Only `\"` and backslash-newline are resolved here. Every other backslash
/// pair, `\\` and `\$` included, is left for variable expansion.
fn read_quoted(src: &mut Source, start_line: usize) -> Result<String, Error> {
    let mut out = String::new();
    loop {
        let Some(c) = src.next_char() else {
            return Err(Error::Lex {
                source_name: src.name().to_string(),
                line: start_line,
                message: "unterminated quoted string".to_string(),
            });
        };
        match c {
            '"' => return Ok(out),
            '\\' => match src.next_char() {
                Some('"') => out.push('"'),
                Some('\n') => {}
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
}

/// Read an unquoted word, leaving the terminating character unread.
///
/// Inside a `$(...)` substitution nothing but the end of input ends the
/// word, so `k = $(echo a b)` reads as one value.
fn read_word(src: &mut Source) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    while let Some(c) = src.next_char() {
        if depth > 0 {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        } else if c == '$' && src.peek() == Some('(') {
            depth = 1;
            out.push(c);
            out.extend(src.next_char());
            continue;
        } else if ends_word(c) {
            src.unget();
            break;
        }
        out.push(c);
    }
    out
}

/// Read the next token from `src`.
pub fn next_token(src: &mut Source) -> Result<Token, Error> {
    skip_insignificant(src)?;
    let line = src.line();
    let Some(c) = skip_blank(src) else {
        return Ok(Token {
            kind: TokenKind::End,
            line,
        });
    };
    let kind = match c {
        '=' => TokenKind::Equals,
        '{' => TokenKind::Open,
        '}' => TokenKind::Close,
        ';' => TokenKind::Separator,
        '"' => TokenKind::Quoted(read_quoted(src, line)?),
        _ => {
            src.unget();
            TokenKind::Word(read_word(src))
        }
    };
    Ok(Token { kind, line })
}

/// After a value: consume a following `{` if one comes next.
///
/// Whitespace, newlines and comments before the brace are skipped, so a
/// section body may open on the next line.
pub fn section_follows(src: &mut Source) -> Result<bool, Error> {
    skip_insignificant(src)?;
    if src.peek() == Some('{') {
        src.next_char();
        return Ok(true);
    }
    Ok(false)
}
