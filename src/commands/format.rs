//! `format` and `scan`.
//!
//! Both accept C-style conversion specifiers, including XPG3 positional
//! `%n$` forms. A parsed `scan` format is kept on the format value as
//! [`ScanFormat`] so a loop scanning with the same format parses it once.

use super::{Builtin, check_args};
use crate::interp::{EvalResult, Exception, Interp};
use crate::obj::Obj;
use crate::obj::number::{format_e, format_g};

pub(super) const COMMANDS: &[(&str, Builtin)] = &[("format", format), ("scan", scan)];

fn format(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "formatString ?arg ...?")?;
    Ok(Obj::new(format_values(argv[1].as_str(), &argv[2..])?))
}

/// Widths and precisions above this are refused rather than padded out.
const MAX_FIELD: usize = 1 << 20;

#[derive(Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
}

/// Reads an unsigned decimal number at `*i`, if there is one.
fn digits(chars: &[char], i: &mut usize) -> Option<usize> {
    let start = *i;
    let mut n: usize = 0;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(d as usize);
        *i += 1;
    }
    (*i > start).then_some(n)
}

/// Hands out arguments either in order or by `%n$` position, refusing to
/// mix the two styles.
struct Args<'a> {
    args: &'a [Obj],
    next: usize,
    positional: Option<bool>,
}

impl<'a> Args<'a> {
    fn style(&mut self, positional: bool) -> EvalResult<()> {
        match self.positional {
            Some(p) if p != positional => {
                Err(Exception::error("cannot mix \"%\" and \"%n$\" conversion specifiers"))
            }
            _ => {
                self.positional = Some(positional);
                Ok(())
            }
        }
    }

    fn take(&mut self) -> EvalResult<&'a Obj> {
        let arg = self.args.get(self.next).ok_or_else(|| {
            let msg = if self.positional == Some(true) {
                "\"%n$\" argument index out of range"
            } else {
                "not enough arguments for all format specifiers"
            };
            Exception::error(msg)
        })?;
        self.next += 1;
        Ok(arg)
    }
}

pub(crate) fn format_values(fmt: &str, args: &[Obj]) -> EvalResult<String> {
    let chars: Vec<char> = fmt.chars().collect();
    let mut out = String::with_capacity(fmt.len());
    let mut args = Args { args, next: 0, positional: None };
    let unfinished = || Exception::error("format string ended in middle of field specifier");
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.get(i) == Some(&'%') {
            out.push('%');
            i += 1;
            continue;
        }

        let mark = i;
        match digits(&chars, &mut i) {
            Some(n) if chars.get(i) == Some(&'$') => {
                i += 1;
                args.style(true)?;
                if n == 0 {
                    return Err(Exception::error("\"%n$\" argument index out of range"));
                }
                args.next = n - 1;
            }
            _ => {
                i = mark;
                args.style(false)?;
            }
        }

        let mut spec = Spec::default();
        while let Some(&f) = chars.get(i) {
            match f {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '0' => spec.zero = true,
                '#' => spec.alt = true,
                _ => break,
            }
            i += 1;
        }
        if chars.get(i) == Some(&'*') {
            i += 1;
            let w = args.take()?.get_int()?;
            if w < 0 {
                spec.left = true;
            }
            spec.width = w.unsigned_abs() as usize;
        } else if let Some(w) = digits(&chars, &mut i) {
            spec.width = w;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            if chars.get(i) == Some(&'*') {
                i += 1;
                spec.precision = Some(args.take()?.get_int()?.max(0) as usize);
            } else {
                spec.precision = Some(digits(&chars, &mut i).unwrap_or(0));
            }
        }
        if spec.width > MAX_FIELD {
            return Err(Exception::error("field width too large"));
        }
        if spec.precision.is_some_and(|p| p > MAX_FIELD) {
            return Err(Exception::error("precision too large"));
        }
        while matches!(chars.get(i), Some('h' | 'l' | 'L' | 'j' | 'z' | 't')) {
            i += 1;
        }
        let conv = *chars.get(i).ok_or_else(unfinished)?;
        i += 1;

        let (prefix, body) = match conv {
            's' => {
                let s = args.take()?.as_str();
                let body = match spec.precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s.to_string(),
                };
                (String::new(), body)
            }
            'c' => {
                let code = args.take()?.get_int()?;
                let ch = u32::try_from(code).ok().and_then(char::from_u32).unwrap_or(char::REPLACEMENT_CHARACTER);
                (String::new(), ch.to_string())
            }
            'd' | 'i' => {
                let v = args.take()?.get_int()?;
                let sign = sign_prefix(v < 0, &spec);
                (sign, min_digits(v.unsigned_abs().to_string(), spec.precision))
            }
            'u' | 'o' | 'x' | 'X' | 'b' => {
                let v = args.take()?.get_int()? as u64;
                let (digits, alt) = match conv {
                    'u' => (v.to_string(), ""),
                    'o' => (format!("{v:o}"), "0"),
                    'x' => (format!("{v:x}"), "0x"),
                    'X' => (format!("{v:X}"), "0X"),
                    _ => (format!("{v:b}"), "0b"),
                };
                let prefix = if spec.alt && v != 0 { alt.to_string() } else { String::new() };
                (prefix, min_digits(digits, spec.precision))
            }
            'f' | 'e' | 'E' | 'g' | 'G' => {
                let d = args.take()?.get_double()?;
                let sign = sign_prefix(d.is_sign_negative() && !d.is_nan(), &spec);
                let a = d.abs();
                let precision = spec.precision.unwrap_or(6);
                let body = match conv {
                    'f' if !a.is_finite() => {
                        if a.is_nan() { "nan".to_string() } else { "inf".to_string() }
                    }
                    'f' => {
                        let mut s = format!("{a:.precision$}");
                        if spec.alt && precision == 0 {
                            s.push('.');
                        }
                        s
                    }
                    'e' | 'E' => {
                        let mut s = format_e(a, precision, conv == 'E');
                        if spec.alt && precision == 0 && a.is_finite() {
                            if let Some(pos) = s.find(['e', 'E']) {
                                s.insert(pos, '.');
                            }
                        }
                        s
                    }
                    _ => format_g(a, precision, spec.alt, conv == 'G'),
                };
                (sign, body)
            }
            other => return Err(Exception::error(format!("bad field specifier \"{other}\""))),
        };

        let numeric = !matches!(conv, 's' | 'c');
        let zero_pad = spec.zero && !spec.left && numeric && !(spec.precision.is_some() && "diuoxXb".contains(conv));
        pad(&mut out, &prefix, &body, &spec, zero_pad);
    }
    Ok(out)
}

fn sign_prefix(negative: bool, spec: &Spec) -> String {
    if negative {
        "-".to_string()
    } else if spec.plus {
        "+".to_string()
    } else if spec.space {
        " ".to_string()
    } else {
        String::new()
    }
}

/// Integer precision: the minimum number of digits.
fn min_digits(digits: String, precision: Option<usize>) -> String {
    match precision {
        Some(p) if p > digits.len() => format!("{}{digits}", "0".repeat(p - digits.len())),
        _ => digits,
    }
}

fn pad(out: &mut String, prefix: &str, body: &str, spec: &Spec, zero_pad: bool) {
    let len = prefix.chars().count() + body.chars().count();
    let fill = spec.width.saturating_sub(len);
    if spec.left {
        out.push_str(prefix);
        out.push_str(body);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if zero_pad {
        out.push_str(prefix);
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(body);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(prefix);
        out.push_str(body);
    }
}

// ---- scan ----

#[derive(Debug, Clone, PartialEq)]
enum ScanItem {
    /// Literal text; whitespace in it matches any run of input whitespace.
    Literal(String),
    Conv {
        /// Result slot, or `None` for `%*` suppressed conversions.
        slot: Option<usize>,
        width: Option<usize>,
        kind: char,
        /// `[...]` set: negated, and the ranges it contains.
        set: Option<(bool, Vec<(char, char)>)>,
    },
}

/// A parsed `scan` format.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFormat {
    items: Vec<ScanItem>,
    /// Number of result slots (the highest `%n$` or the conversion count).
    slots: usize,
}

impl ScanFormat {
    pub fn parse(fmt: &str) -> EvalResult<ScanFormat> {
        let chars: Vec<char> = fmt.chars().collect();
        let mut items = Vec::new();
        let mut literal = String::new();
        let mut positional = None;
        let mut next_slot = 0;
        let mut used = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            i += 1;
            if c != '%' || chars.get(i) == Some(&'%') {
                if c == '%' {
                    i += 1;
                }
                literal.push(c);
                continue;
            }
            if !literal.is_empty() {
                items.push(ScanItem::Literal(std::mem::take(&mut literal)));
            }

            let mut suppress = false;
            if chars.get(i) == Some(&'*') {
                suppress = true;
                i += 1;
            }
            let mark = i;
            let mut slot = None;
            match digits(&chars, &mut i) {
                Some(n) if chars.get(i) == Some(&'$') && !suppress => {
                    i += 1;
                    if positional == Some(false) {
                        return Err(Exception::error("cannot mix \"%\" and \"%n$\" conversion specifiers"));
                    }
                    positional = Some(true);
                    if n == 0 {
                        return Err(Exception::error("\"%n$\" argument index out of range"));
                    }
                    slot = Some(n - 1);
                }
                _ => {
                    i = mark;
                    if positional == Some(true) && !suppress {
                        return Err(Exception::error("cannot mix \"%\" and \"%n$\" conversion specifiers"));
                    }
                }
            }
            let width = digits(&chars, &mut i);
            while matches!(chars.get(i), Some('h' | 'l' | 'L')) {
                i += 1;
            }
            let kind = *chars
                .get(i)
                .ok_or_else(|| Exception::error("format string ended in middle of field specifier"))?;
            i += 1;

            let set = if kind == '[' { Some(parse_set(&chars, &mut i)?) } else { None };
            if !matches!(kind, 'd' | 'i' | 'u' | 'o' | 'x' | 'X' | 'b' | 'c' | 's' | 'f' | 'e' | 'E' | 'g' | 'G' | '[' | 'n')
            {
                return Err(Exception::error(format!("bad scan conversion character \"{kind}\"")));
            }
            if kind == 'c' && width.is_some() {
                return Err(Exception::error("field width may not be specified in %c conversion"));
            }

            let slot = if suppress {
                None
            } else if positional == Some(true) {
                slot
            } else {
                positional = Some(false);
                next_slot += 1;
                Some(next_slot - 1)
            };
            if let Some(s) = slot {
                if used.contains(&s) {
                    return Err(Exception::error("variable is assigned by multiple \"%n$\" conversion specifiers"));
                }
                used.push(s);
            }
            items.push(ScanItem::Conv { slot, width, kind, set });
        }
        if !literal.is_empty() {
            items.push(ScanItem::Literal(literal));
        }
        let slots = used.iter().map(|s| s + 1).max().unwrap_or(0);
        Ok(ScanFormat { items, slots })
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Scans `input`. `None` when the input ran out before the first
    /// conversion; otherwise one entry per slot, `None` where nothing was
    /// converted.
    pub fn scan(&self, input: &str) -> Option<Vec<Option<Obj>>> {
        let input: Vec<char> = input.chars().collect();
        let mut results = vec![None; self.slots];
        let mut pos = 0;
        let mut converted = false;
        'items: for item in &self.items {
            match item {
                ScanItem::Literal(text) => {
                    for c in text.chars() {
                        if c.is_whitespace() {
                            while input.get(pos).is_some_and(|c| c.is_whitespace()) {
                                pos += 1;
                            }
                        } else if input.get(pos) == Some(&c) {
                            pos += 1;
                        } else {
                            break 'items;
                        }
                    }
                }
                ScanItem::Conv { slot, width, kind, set } => {
                    if !matches!(kind, 'c' | '[' | 'n') {
                        while input.get(pos).is_some_and(|c| c.is_whitespace()) {
                            pos += 1;
                        }
                    }
                    if pos >= input.len() && *kind != 'n' {
                        if !converted {
                            return None;
                        }
                        break;
                    }
                    let limit = width.map_or(input.len(), |w| (pos + w).min(input.len()));
                    let value = match kind {
                        'n' => Some((Obj::from_int(pos as i64), pos)),
                        'c' => Some((Obj::from_int(input[pos] as i64), pos + 1)),
                        's' => {
                            let end = (pos..limit).find(|&j| input[j].is_whitespace()).unwrap_or(limit);
                            Some((Obj::new(input[pos..end].iter().collect::<String>()), end))
                        }
                        '[' => {
                            let (negate, ranges) = set.as_ref().map_or((false, &[][..]), |(n, r)| (*n, r.as_slice()));
                            let inside = |c: char| ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) != negate;
                            let end = (pos..limit).find(|&j| !inside(input[j])).unwrap_or(limit);
                            (end > pos).then(|| (Obj::new(input[pos..end].iter().collect::<String>()), end))
                        }
                        'f' | 'e' | 'E' | 'g' | 'G' => scan_float(&input, pos, limit).map(|(d, e)| (Obj::from_double(d), e)),
                        _ => scan_int(&input, pos, limit, *kind).map(|(v, e)| (Obj::from_int(v), e)),
                    };
                    let Some((value, end)) = value else {
                        break;
                    };
                    pos = end;
                    if *kind != 'n' {
                        converted = true;
                    }
                    if let Some(s) = slot {
                        results[*s] = Some(value);
                    }
                }
            }
        }
        Some(results)
    }
}

/// Parses a `[...]` set whose opening bracket was just consumed.
fn parse_set(chars: &[char], i: &mut usize) -> EvalResult<(bool, Vec<(char, char)>)> {
    let mut negate = false;
    if chars.get(*i) == Some(&'^') {
        negate = true;
        *i += 1;
    }
    let mut ranges = Vec::new();
    // A leading `]` is part of the set.
    if chars.get(*i) == Some(&']') {
        ranges.push((']', ']'));
        *i += 1;
    }
    loop {
        let Some(&c) = chars.get(*i) else {
            return Err(Exception::error("unmatched [ in format string"));
        };
        *i += 1;
        if c == ']' {
            return Ok((negate, ranges));
        }
        match (chars.get(*i), chars.get(*i + 1)) {
            (Some('-'), Some(&hi)) if hi != ']' => {
                *i += 2;
                ranges.push((c.min(hi), c.max(hi)));
            }
            _ => ranges.push((c, c)),
        }
    }
}

fn scan_int(input: &[char], start: usize, limit: usize, kind: char) -> Option<(i64, usize)> {
    let mut i = start;
    let mut negative = false;
    if i < limit && matches!(input[i], '+' | '-') {
        negative = input[i] == '-';
        i += 1;
    }
    let at = |j: usize| if j < limit { input.get(j).copied() } else { None };
    let mut base = match kind {
        'o' => 8,
        'x' | 'X' => 16,
        'b' => 2,
        _ => 10,
    };
    if kind == 'i' && at(i) == Some('0') {
        match at(i + 1) {
            Some('x' | 'X') => {
                base = 16;
                i += 2;
            }
            Some('b' | 'B') => {
                base = 2;
                i += 2;
            }
            Some('o' | 'O') => {
                base = 8;
                i += 2;
            }
            _ => base = 8,
        }
    } else if matches!(kind, 'x' | 'X') && at(i) == Some('0') && matches!(at(i + 1), Some('x' | 'X')) {
        i += 2;
    }
    let first = i;
    let mut value: u64 = 0;
    while let Some(d) = at(i).and_then(|c| c.to_digit(base)) {
        value = value.wrapping_mul(base as u64).wrapping_add(d as u64);
        i += 1;
    }
    if i == first {
        return None;
    }
    let v = value as i64;
    Some((if negative { v.wrapping_neg() } else { v }, i))
}

fn scan_float(input: &[char], start: usize, limit: usize) -> Option<(f64, usize)> {
    let at = |j: usize| if j < limit { input.get(j).copied() } else { None };
    let mut i = start;
    if matches!(at(i), Some('+' | '-')) {
        i += 1;
    }
    let mut mantissa_digits = 0;
    while at(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
        mantissa_digits += 1;
    }
    if at(i) == Some('.') {
        i += 1;
        while at(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if matches!(at(i), Some('e' | 'E')) {
        let mut j = i + 1;
        if matches!(at(j), Some('+' | '-')) {
            j += 1;
        }
        if at(j).is_some_and(|c| c.is_ascii_digit()) {
            while at(j).is_some_and(|c| c.is_ascii_digit()) {
                j += 1;
            }
            i = j;
        }
    }
    let text: String = input[start..i].iter().collect();
    text.parse().ok().map(|d| (d, i))
}

fn scan(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 3, usize::MAX, "string format ?varName varName ...?")?;
    let fmt = argv[2].scan_format()?;
    let vars = &argv[3..];
    if !vars.is_empty() && vars.len() != fmt.slots() {
        return Err(Exception::error("different numbers of variable names and field specifiers"));
    }
    let Some(results) = fmt.scan(argv[1].as_str()) else {
        return Ok(Obj::from_int(-1));
    };
    if vars.is_empty() {
        return Ok(Obj::from_list(results.into_iter().map(Option::unwrap_or_default).collect()));
    }
    let mut assigned = 0;
    for (var, value) in vars.iter().zip(results) {
        if let Some(value) = value {
            interp.set_var_obj(var, value)?;
            assigned += 1;
        }
    }
    Ok(Obj::from_int(assigned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(f: &str, args: &[&str]) -> String {
        let args: Vec<Obj> = args.iter().map(|a| Obj::from(*a)).collect();
        format_values(f, &args).unwrap_or_else(|e| panic!("{f}: {e}"))
    }

    fn fmt_err(f: &str, args: &[&str]) -> String {
        let args: Vec<Obj> = args.iter().map(|a| Obj::from(*a)).collect();
        format_values(f, &args).unwrap_err().value.to_string()
    }

    #[test]
    fn integers() {
        assert_eq!(fmt("%d|%5d|%-5d|%05d", &["1", "2", "3", "-4"]), "1|    2|3    |-0004");
        assert_eq!(fmt("%+d % d", &["5", "5"]), "+5  5");
        assert_eq!(fmt("%x %X %o %b", &["255", "255", "8", "5"]), "ff FF 10 101");
        assert_eq!(fmt("%#x %#o %#b", &["255", "8", "5"]), "0xff 010 0b101");
        assert_eq!(fmt("%.3d", &["7"]), "007");
        assert_eq!(fmt("%u", &["-1"]), "18446744073709551615");
        assert_eq!(fmt("%ld %lld", &["1", "2"]), "1 2");
    }

    #[test]
    fn floats() {
        assert_eq!(fmt("%f", &["1.5"]), "1.500000");
        assert_eq!(fmt("%.2f", &["3.14159"]), "3.14");
        assert_eq!(fmt("%8.3f|", &["-2.5"]), "  -2.500|");
        assert_eq!(fmt("%e", &["12345.678"]), "1.234568e+04");
        assert_eq!(fmt("%g %g", &["0.0001", "1e20"]), "0.0001 1e+20");
        assert_eq!(fmt("%G", &["1e-10"]), "1E-10");
        assert_eq!(fmt("%.0f", &["2"]), "2");
    }

    #[test]
    fn strings_and_chars() {
        assert_eq!(fmt("%s-%s", &["a", "b"]), "a-b");
        assert_eq!(fmt("%5s|%-5s|", &["ab", "cd"]), "   ab|cd   |");
        assert_eq!(fmt("%.2s", &["abcdef"]), "ab");
        assert_eq!(fmt("%c%c", &["72", "105"]), "Hi");
        assert_eq!(fmt("100%%", &[]), "100%");
    }

    #[test]
    fn star_and_positional() {
        assert_eq!(fmt("%*d|", &["4", "7"]), "   7|");
        assert_eq!(fmt("%.*f", &["1", "2.26"]), "2.3");
        assert_eq!(fmt("%2$s %1$s", &["a", "b"]), "b a");
        assert_eq!(fmt_err("%1$s %s", &["a", "b"]), "cannot mix \"%\" and \"%n$\" conversion specifiers");
        assert_eq!(fmt_err("%3$s", &["a"]), "\"%n$\" argument index out of range");
    }

    #[test]
    fn format_errors() {
        assert_eq!(fmt_err("%d", &[]), "not enough arguments for all format specifiers");
        assert_eq!(fmt_err("%d", &["x"]), "expected integer but got \"x\"");
        assert_eq!(fmt_err("%q", &["1"]), "bad field specifier \"q\"");
        assert_eq!(fmt_err("abc%", &[]), "format string ended in middle of field specifier");
    }

    #[test]
    fn oversized_fields_are_refused() {
        assert_eq!(fmt_err("%999999999999d", &["1"]), "field width too large");
        assert_eq!(fmt_err("%*s", &["-9223372036854775808", "x"]), "field width too large");
        assert_eq!(fmt_err("%.99999999999999999999f", &["1.5"]), "precision too large");
        assert_eq!(fmt_err("%.*f", &["4000000000", "1.5"]), "precision too large");
        assert_eq!(fmt("%8d|%.3f", &["1", "1"]), "       1|1.000");
    }

    fn scan_list(input: &str, f: &str) -> Option<Vec<String>> {
        let format = ScanFormat::parse(f).unwrap();
        format.scan(input).map(|r| r.into_iter().map(|v| v.map(|o| o.to_string()).unwrap_or_default()).collect())
    }

    #[test]
    fn scanning_basics() {
        assert_eq!(scan_list("12 abc 3.5", "%d %s %f").unwrap(), ["12", "abc", "3.5"]);
        assert_eq!(scan_list("ff 17 101", "%x %o %b").unwrap(), ["255", "15", "5"]);
        assert_eq!(scan_list("0x1f 010", "%i %i").unwrap(), ["31", "8"]);
        assert_eq!(scan_list("A", "%c").unwrap(), ["65"]);
        assert_eq!(scan_list("12345", "%2d%3d").unwrap(), ["12", "345"]);
        assert_eq!(scan_list("abc123", "%[a-z]%d").unwrap(), ["abc", "123"]);
        assert_eq!(scan_list("key=value", "%[^=]=%s").unwrap(), ["key", "value"]);
        assert_eq!(scan_list("1 2", "%*d %d").unwrap(), ["2"]);
        assert_eq!(scan_list("abc", "%s%n").unwrap(), ["abc", "3"]);
    }

    #[test]
    fn scanning_stops_on_mismatch() {
        assert_eq!(scan_list("12 x", "%d %d").unwrap(), ["12", ""]);
        assert_eq!(scan_list("", "%d"), None);
        assert_eq!(scan_list("a:1", "a-%d").unwrap(), [""]);
    }

    #[test]
    fn scan_format_errors() {
        let msg = |f: &str| ScanFormat::parse(f).unwrap_err().value.to_string();
        assert_eq!(msg("%q"), "bad scan conversion character \"q\"");
        assert_eq!(msg("%[abc"), "unmatched [ in format string");
        assert_eq!(msg("%1$d %d"), "cannot mix \"%\" and \"%n$\" conversion specifiers");
        assert_eq!(msg("%1$d %1$d"), "variable is assigned by multiple \"%n$\" conversion specifiers");
        assert_eq!(msg("%3c"), "field width may not be specified in %c conversion");
    }

    #[test]
    fn scan_command_sets_variables() {
        let mut interp = Interp::new();
        let n = interp.eval("scan {10 20} {%d %d} a b").unwrap();
        assert_eq!(n.as_str(), "2");
        assert_eq!(interp.eval("expr {$a + $b}").unwrap().as_str(), "30");
        assert_eq!(interp.eval("scan {} %d x").unwrap().as_str(), "-1");
        let e = interp.eval("scan 1 %d a b").unwrap_err();
        assert_eq!(e.value.as_str(), "different numbers of variable names and field specifiers");
        assert_eq!(interp.eval("scan {7 8} {%2$d %1$d}").unwrap().as_str(), "8 7");
    }

    #[test]
    fn format_command() {
        let mut interp = Interp::new();
        assert_eq!(interp.eval("format {%s=%d} x 5").unwrap().as_str(), "x=5");
    }
}
