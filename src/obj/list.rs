//! List parsing and the canonical list string form.

use super::Obj;
use crate::parser::{Parser, TokenKind, unescape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    Simple,
    Brace,
    Quote,
}

fn is_special(b: u8) -> bool {
    matches!(b, b' ' | b'$' | b'"' | b'[' | b']' | b';' | b'\\' | b'\r' | b'\n' | b'\t' | b'\x0c' | b'\x0b')
}

fn quoting_for(s: &str) -> Quoting {
    let b = s.as_bytes();
    if b.is_empty() {
        return Quoting::Brace;
    }
    let try_simple = if b[0] == b'"' || b[0] == b'{' {
        false
    } else {
        match b.iter().position(|&c| is_special(c) || c == b'{' || c == b'}') {
            None => return Quoting::Simple,
            Some(i) => !is_special(b[i]),
        }
    };
    // Braces work only if they balance and the text doesn't end in a
    // backslash or hide a backslash-newline.
    if b[b.len() - 1] == b'\\' {
        return Quoting::Quote;
    }
    let mut level = 0i32;
    let mut blevel = 0i32;
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'{' => level += 1,
            b'}' => {
                level -= 1;
                if level < 0 {
                    return Quoting::Quote;
                }
            }
            b'[' => blevel += 1,
            b']' => blevel -= 1,
            b'\\' => {
                if b.get(i + 1) == Some(&b'\n') {
                    return Quoting::Quote;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    if blevel < 0 || level != 0 {
        return Quoting::Quote;
    }
    if !try_simple || b.iter().any(|&c| matches!(c, b' ' | b'\r' | b'\n' | b'\t' | b'\x0c' | b'\x0b')) {
        return Quoting::Brace;
    }
    Quoting::Simple
}

fn backslash_quote(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            ' ' | '$' | '"' | '[' | ']' | '{' | '}' | ';' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0c' => out.push_str("\\f"),
            '\x0b' => out.push_str("\\v"),
            _ => out.push(c),
        }
    }
}

/// Appends `s` to `out` quoted so that parsing it as a list yields exactly
/// one element equal to `s`. The first element of a list is also braced
/// when it starts with `#`, so the list is safe to evaluate as a command.
pub fn quote_element(s: &str, first: bool, out: &mut String) {
    let mut quoting = quoting_for(s);
    if first && quoting == Quoting::Simple && s.starts_with('#') {
        quoting = Quoting::Brace;
    }
    match quoting {
        Quoting::Simple => out.push_str(s),
        Quoting::Brace => {
            out.push('{');
            out.push_str(s);
            out.push('}');
        }
        Quoting::Quote => backslash_quote(s, out),
    }
}

pub fn to_string(items: &[Obj]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        quote_element(item.as_str(), i == 0, &mut out);
    }
    out
}

/// Splits a string into list elements. Unbalanced braces or quotes are
/// tolerated: the open element runs to the end of the string.
pub fn parse(s: &str) -> Vec<Obj> {
    let mut parser = Parser::new(s, 1);
    let mut items = Vec::new();
    loop {
        let tok = parser.next_list_token();
        match tok.kind {
            TokenKind::Eof => break,
            TokenKind::Str => items.push(Obj::from(tok.text)),
            TokenKind::Esc => items.push(Obj::new(unescape(tok.text))),
            _ => {}
        }
    }
    items
}
