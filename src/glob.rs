//! Glob-style pattern matching: `*`, `?`, `[chars]`, `[a-z]`, `[^...]` and
//! backslash quoting.

fn fold(c: char, nocase: bool) -> char {
    if nocase { c.to_lowercase().next().unwrap_or(c) } else { c }
}

/// Matches `c` against the set starting just after `[`. Returns the index
/// of the closing `]` (or the pattern length when it is missing) on a match.
fn charset_match(p: &[char], c: char, nocase: bool) -> Option<usize> {
    let c = fold(c, nocase);
    let mut i = 0;
    let mut negate = false;
    let mut matched = false;
    if p.first() == Some(&'^') {
        negate = true;
        i += 1;
    }
    // A `]` right after the opening bracket is literal.
    if p.get(i) == Some(&']') {
        matched |= c == ']';
        i += 1;
    }
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            i += 1;
            matched |= fold(p[i], nocase) == c;
            i += 1;
            continue;
        }
        let start = fold(p[i], nocase);
        i += 1;
        if p.get(i) == Some(&'-') && i + 1 < p.len() && p[i + 1] != ']' {
            let end = fold(p[i + 1], nocase);
            i += 2;
            let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
            matched |= (lo..=hi).contains(&c);
            continue;
        }
        matched |= start == c;
    }
    if negate {
        matched = !matched;
    }
    matched.then_some(i)
}

fn match_chars(p: &[char], s: &[char], nocase: bool) -> bool {
    let mut pi = 0;
    let mut si = 0;
    while pi < p.len() {
        match p[pi] {
            '*' => {
                while p.get(pi + 1) == Some(&'*') {
                    pi += 1;
                }
                pi += 1;
                if pi == p.len() {
                    return true;
                }
                return (si..s.len()).any(|start| match_chars(&p[pi..], &s[start..], nocase));
            }
            '?' => {
                if si >= s.len() {
                    return false;
                }
                si += 1;
            }
            '[' => {
                let Some(&c) = s.get(si) else { return false };
                si += 1;
                match charset_match(&p[pi + 1..], c, nocase) {
                    Some(close) => pi += 1 + close,
                    None => return false,
                }
            }
            ch => {
                let lit = if ch == '\\' && pi + 1 < p.len() {
                    pi += 1;
                    p[pi]
                } else {
                    ch
                };
                match s.get(si) {
                    Some(&c) if fold(c, nocase) == fold(lit, nocase) => si += 1,
                    _ => return false,
                }
            }
        }
        pi += 1;
        if si == s.len() {
            while p.get(pi) == Some(&'*') {
                pi += 1;
            }
            break;
        }
    }
    pi >= p.len() && si == s.len()
}

pub fn glob_match(pattern: &str, s: &str, nocase: bool) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = s.chars().collect();
    match_chars(&p, &s, nocase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_and_questions() {
        assert!(glob_match("*", "", false));
        assert!(glob_match("*", "anything", false));
        assert!(glob_match("a*c", "abbbc", false));
        assert!(glob_match("a?c", "abc", false));
        assert!(!glob_match("a?c", "ac", false));
        assert!(glob_match("a**", "a", false));
        assert!(!glob_match("a*d", "abc", false));
        assert!(glob_match("", "", false));
        assert!(!glob_match("", "a", false));
    }

    #[test]
    fn character_sets() {
        assert!(glob_match("[abc]x", "bx", false));
        assert!(!glob_match("[abc]x", "dx", false));
        assert!(glob_match("[a-c]", "b", false));
        assert!(glob_match("[c-a]", "b", false));
        assert!(glob_match("[^a-c]", "d", false));
        assert!(!glob_match("[^a-c]", "b", false));
        assert!(glob_match("[]]", "]", false));
        assert!(glob_match("[a-]", "-", false));
    }

    #[test]
    fn escapes_and_case() {
        assert!(glob_match("a\\*", "a*", false));
        assert!(!glob_match("a\\*", "ab", false));
        assert!(glob_match("ABC", "abc", true));
        assert!(!glob_match("ABC", "abc", false));
        assert!(glob_match("[A-Z]x", "qX", true));
    }

    #[test]
    fn unicode() {
        assert!(glob_match("h?llo", "héllo", false));
        assert!(glob_match("*é", "café", false));
    }
}
