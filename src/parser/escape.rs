//! Backslash escape decoding.

fn hex_val(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}

fn oct_val(b: u8) -> Option<u32> {
    (b as char).to_digit(8)
}

fn push_code_point(out: &mut String, val: u32) {
    out.push(char::from_u32(val).unwrap_or(char::REPLACEMENT_CHARACTER));
}

/// Decodes backslash sequences in `s`. Unknown escapes yield the escaped
/// character itself; a backslash-newline and any following blanks collapse
/// to a single space.
pub fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let at = |i: usize| bytes.get(i).copied().unwrap_or(0);
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    // Start of the current run of literal bytes, copied in one piece so
    // multi-byte characters stay intact.
    let mut literal = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        out.push_str(&s[literal..i]);
        let c = at(i + 1);
        match c {
            b'a' => out.push('\x07'),
            b'b' => out.push('\x08'),
            b'f' => out.push('\x0c'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'v' => out.push('\x0b'),
            b'x' | b'u' | b'U' => {
                let (mut start, max_digits) = match c {
                    b'x' => (i + 2, 2),
                    b'U' => (i + 2, 8),
                    _ if at(i + 2) == b'{' => (i + 3, 6),
                    _ => (i + 2, 4),
                };
                let braced = c == b'u' && at(i + 2) == b'{';
                let mut val = 0u32;
                let mut k = 0;
                while k < max_digits {
                    match hex_val(at(start + k)) {
                        Some(d) => val = (val << 4) | d,
                        None => break,
                    }
                    k += 1;
                }
                if braced && (k == 0 || val > 0x1F_FFFF || at(start + k) != b'}') {
                    // Not a valid \u{...}: the `u` is taken literally.
                    out.push('u');
                    i += 2;
                    literal = i;
                    continue;
                }
                if k == 0 {
                    out.push(c as char);
                    i += 2;
                    literal = i;
                    continue;
                }
                if c == b'x' {
                    push_code_point(&mut out, val & 0xFF);
                } else {
                    push_code_point(&mut out, val);
                }
                if braced {
                    k += 1;
                }
                start += k;
                i = start;
                literal = i;
                continue;
            }
            b'\n' => {
                out.push(' ');
                let mut j = i + 2;
                while matches!(at(j), b' ' | b'\t') {
                    j += 1;
                }
                i = j;
                literal = i;
                continue;
            }
            b'0'..=b'7' => {
                let mut val = 0u32;
                let mut j = i + 1;
                while j < i + 4 {
                    match oct_val(at(j)) {
                        Some(d) => val = val * 8 + d,
                        None => break,
                    }
                    j += 1;
                }
                push_code_point(&mut out, val & 0xFF);
                i = j;
                literal = i;
                continue;
            }
            0 if i + 1 >= bytes.len() => {
                out.push('\\');
                i += 1;
                literal = i;
                continue;
            }
            _ => {
                // Unknown escape: keep the escaped character, which may be
                // multi-byte.
                literal = i + 1;
                i += 2;
                while i < bytes.len() && !s.is_char_boundary(i) {
                    i += 1;
                }
                continue;
            }
        }
        i += 2;
        literal = i;
    }
    out.push_str(&s[literal..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_escapes() {
        assert_eq!(unescape(r"a\tb\nc"), "a\tb\nc");
        assert_eq!(unescape(r"\a\b\f\r\v"), "\x07\x08\x0c\r\x0b");
        assert_eq!(unescape(r"no escapes"), "no escapes");
    }

    #[test]
    fn unknown_escapes_pass_through() {
        assert_eq!(unescape(r"\$x \[y\] \{ \q"), "$x [y] { q");
        assert_eq!(unescape("\\é"), "é");
    }

    #[test]
    fn hex_and_unicode() {
        assert_eq!(unescape(r"\x41\x4a"), "AJ");
        assert_eq!(unescape(r"\x414"), "A4");
        assert_eq!(unescape(r"\u00e9"), "é");
        assert_eq!(unescape(r"\u{1F600}"), "\u{1F600}");
        assert_eq!(unescape(r"\U0001F600"), "\u{1F600}");
        assert_eq!(unescape(r"\xg"), "xg");
        assert_eq!(unescape(r"\u{zz}"), "u{zz}");
    }

    #[test]
    fn octal() {
        assert_eq!(unescape(r"\101"), "A");
        assert_eq!(unescape(r"\0"), "\0");
        assert_eq!(unescape(r"\1011"), "A1");
        assert_eq!(unescape(r"\12x"), "\nx");
    }

    #[test]
    fn backslash_newline_collapses() {
        assert_eq!(unescape("a\\\n    b"), "a b");
        assert_eq!(unescape("a\\\n\t\tb"), "a b");
    }

    #[test]
    fn trailing_backslash_is_literal() {
        assert_eq!(unescape("abc\\"), "abc\\");
    }
}
