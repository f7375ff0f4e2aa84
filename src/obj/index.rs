//! List/string index expressions: `N`, `end`, `end±N`, `N±M`.

use super::number::parse_int;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    /// Counted from the start; may be negative (out of range).
    Start(i64),
    /// `end` plus an offset: `End(0)` is the last element, `End(-1)` the one
    /// before it.
    End(i64),
}

impl Index {
    pub fn parse(s: &str) -> Option<Index> {
        let t = s.trim();
        if let Some(rest) = t.strip_prefix("end") {
            if rest.is_empty() {
                return Some(Index::End(0));
            }
            let offset = parse_offset(rest)?;
            return Some(Index::End(offset));
        }
        if let Some(i) = parse_int(t) {
            return Some(Index::Start(i));
        }
        // N+M / N-M: split at the first sign after the leading number.
        let bytes = t.as_bytes();
        let split = (1..bytes.len()).find(|&i| matches!(bytes[i], b'+' | b'-'))?;
        let base = parse_int(&t[..split])?;
        let offset = parse_offset(&t[split..])?;
        Some(Index::Start(base.saturating_add(offset)))
    }

    /// Absolute position against a sequence of length `len`. The result may
    /// be negative or past the end; callers decide what out-of-range means.
    pub fn resolve(self, len: usize) -> i64 {
        match self {
            Index::Start(i) => i,
            Index::End(off) => (len as i64 - 1).saturating_add(off),
        }
    }

    pub fn error_message(s: &str) -> String {
        format!("bad index \"{s}\": must be intexpr or end?[+-]intexpr")
    }
}

fn parse_offset(s: &str) -> Option<i64> {
    match s.as_bytes().first()? {
        b'+' | b'-' => {
            let n = parse_int(&s[1..])?;
            if s.starts_with('-') { Some(n.saturating_neg()) } else { Some(n) }
        }
        _ => None,
    }
}

impl std::fmt::Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Index::Start(i) => write!(f, "{i}"),
            Index::End(0) => f.write_str("end"),
            Index::End(off) if off > 0 => write!(f, "end+{off}"),
            Index::End(off) => write!(f, "end{off}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forms() {
        assert_eq!(Index::parse("3"), Some(Index::Start(3)));
        assert_eq!(Index::parse("-1"), Some(Index::Start(-1)));
        assert_eq!(Index::parse("end"), Some(Index::End(0)));
        assert_eq!(Index::parse("end-1"), Some(Index::End(-1)));
        assert_eq!(Index::parse("end+2"), Some(Index::End(2)));
        assert_eq!(Index::parse("2+3"), Some(Index::Start(5)));
        assert_eq!(Index::parse("10-4"), Some(Index::Start(6)));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "end-", "endx", "e", "1+", "abc", "end--1x"] {
            assert_eq!(Index::parse(bad), None, "{bad}");
        }
    }

    #[test]
    fn resolves_against_length() {
        assert_eq!(Index::End(0).resolve(5), 4);
        assert_eq!(Index::End(-1).resolve(5), 3);
        assert_eq!(Index::Start(2).resolve(5), 2);
        assert_eq!(Index::End(0).resolve(0), -1);
        assert_eq!(Index::End(i64::MAX).resolve(3), i64::MAX);
        assert_eq!(Index::End(i64::MIN).resolve(0), i64::MIN);
    }

    #[test]
    fn extreme_offsets_saturate() {
        assert_eq!(Index::parse("9223372036854775807+1"), Some(Index::Start(i64::MAX)));
        assert_eq!(Index::parse("-9223372036854775807-9"), Some(Index::Start(i64::MIN)));
    }

    #[test]
    fn display_round_trips() {
        for s in ["end", "end-3", "end+1", "7"] {
            assert_eq!(Index::parse(s).map(|i| i.to_string()).as_deref(), Some(s));
        }
    }
}
