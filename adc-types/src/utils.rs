//! Byte-class indicators and the ADC text escape.

use std::borrow::Cow;

use thiserror::Error;

pub mod indicators {
    /// `simple_alpha ::= [A-Z]`
    pub fn is_simple_alpha(byte: u8) -> bool {
        byte.is_ascii_uppercase()
    }

    /// `simple_alphanum ::= [A-Z0-9]`
    pub fn is_simple_alphanum(byte: u8) -> bool {
        byte.is_ascii_uppercase() || byte.is_ascii_digit()
    }

    /// `base32_character ::= simple_alpha | [2-7]`
    pub fn is_base32_char(byte: u8) -> bool {
        byte.is_ascii_uppercase() || matches!(byte, b'2'..=b'7')
    }

    /// The unescaped alternative of `escaped_letter ::= [^ \n] | '\s' | '\n' | '\\'`.
    ///
    /// The backslash is excluded here because it always introduces an escape
    /// sequence on the wire.
    pub fn is_plain_letter(byte: u8) -> bool {
        !matches!(byte, b' ' | b'\n' | b'\\')
    }
}

/// Escapes a parameter value for the wire.
///
/// A space becomes `\s`, a newline `\n`, and a backslash `\\`. Only allocates
/// when the input actually contains one of the three.
pub fn escape_param(unescaped: &str) -> Cow<str> {
    if !unescaped
        .bytes()
        .any(|b| matches!(b, b' ' | b'\n' | b'\\'))
    {
        return Cow::Borrowed(unescaped);
    }

    let mut escaped = String::with_capacity(unescaped.len() + 4);

    for c in unescaped.chars() {
        match c {
            ' ' => escaped.push_str("\\s"),
            '\n' => escaped.push_str("\\n"),
            '\\' => escaped.push_str("\\\\"),
            c => escaped.push(c),
        }
    }

    Cow::Owned(escaped)
}

/// Reverses [`escape_param`].
///
/// Fails on a dangling backslash or an unknown escape sequence.
pub fn unescape_param(escaped: &str) -> Result<Cow<str>, EscapeError> {
    if !escaped.as_bytes().contains(&b'\\') {
        return Ok(Cow::Borrowed(escaped));
    }

    let mut unescaped = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }

        match chars.next() {
            Some('s') => unescaped.push(' '),
            Some('n') => unescaped.push('\n'),
            Some('\\') => unescaped.push('\\'),
            Some(other) => return Err(EscapeError::UnknownEscape(other)),
            None => return Err(EscapeError::DanglingEscape),
        }
    }

    Ok(Cow::Owned(unescaped))
}

#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum EscapeError {
    #[error("Unknown escape sequence `\\{0}`")]
    UnknownEscape(char),
    #[error("Dangling escape at end of input")]
    DanglingEscape,
}
