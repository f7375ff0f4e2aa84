//! The tokeniser shared by scripts, lists, `subst` and expressions.
//!
//! A single [`Parser`] walks a borrowed source string and hands out
//! [`Token`]s whose text is a slice of that source. Which method is called
//! decides the mode: [`Parser::next_script_token`], [`Parser::next_list_token`]
//! or [`Parser::next_subst_token`]. The expression tokeniser borrows the
//! brace, bracket, quote and variable sub-parsers through the `*_at` methods.
//!
//! Unterminated constructs never fail the parse; instead the opening
//! character is recorded in [`Parser::missing`] so callers can report an
//! error or answer `info complete`.

pub mod escape;

pub use escape::unescape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text, no escapes to process (braced words).
    Str,
    /// Text that still needs backslash decoding.
    Esc,
    /// `$name` or `${name}`; the text is the name.
    Var,
    /// `$name(key)`; the text is `name(key)`.
    DictSugar,
    /// `$(expr)`; the text is `(expr)`.
    ExprSugar,
    /// `[script]`; the text is the script.
    Cmd,
    Sep,
    Eol,
    Eof,
}

/// The opening character of a construct left unterminated at end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    None,
    Brace,
    Bracket,
    Quote,
    Backslash,
}

impl Missing {
    pub fn as_char(self) -> char {
        match self {
            Missing::None => ' ',
            Missing::Brace => '{',
            Missing::Bracket => '[',
            Missing::Quote => '"',
            Missing::Backslash => '\\',
        }
    }

    /// The message used when evaluating a script with this construct open.
    pub fn message(self) -> Option<&'static str> {
        match self {
            Missing::None | Missing::Backslash => None,
            Missing::Brace => Some("missing close-brace"),
            Missing::Bracket => Some("unmatched \"[\""),
            Missing::Quote => Some("missing quote"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub line: u32,
}

/// Which substitutions `subst` performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstFlags {
    pub no_backslashes: bool,
    pub no_commands: bool,
    pub no_variables: bool,
}

pub fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

pub struct Parser<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    /// Kind of the previously returned token; decides word boundaries.
    kind: TokenKind,
    in_quote: bool,
    comment: bool,
    missing: Missing,
    missing_line: u32,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, line: u32) -> Self {
        Parser {
            src,
            pos: 0,
            line,
            kind: TokenKind::Eol,
            in_quote: false,
            comment: true,
            missing: Missing::None,
            missing_line: line,
        }
    }

    pub fn missing(&self) -> Missing {
        self.missing
    }

    pub fn missing_line(&self) -> u32 {
        self.missing_line
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    fn byte(&self, i: usize) -> u8 {
        self.src.as_bytes().get(i).copied().unwrap_or(0)
    }

    fn peek(&self) -> u8 {
        self.byte(self.pos)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn remaining(&self) -> usize {
        self.src.len().saturating_sub(self.pos)
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize, line: u32) -> Token<'a> {
        self.kind = kind;
        Token { kind, text: &self.src[start..end], line }
    }

    fn eof(&mut self) -> Token<'a> {
        let end = self.src.len();
        self.emit(TokenKind::Eof, end, end, self.line)
    }

    /// Steps over a backslash and the byte it escapes, counting newlines.
    fn skip_escape(&mut self) {
        if self.remaining() > 1 {
            self.pos += 1;
            if self.peek() == b'\n' {
                self.line += 1;
            }
        }
    }

    // ---- Script mode ----

    pub fn next_script_token(&mut self) -> Token<'a> {
        loop {
            if self.at_end() {
                return self.eof();
            }
            match self.peek() {
                b'\\' => {
                    if self.byte(self.pos + 1) == b'\n' && !self.in_quote {
                        return self.parse_sep();
                    }
                    self.comment = false;
                    return self.parse_str();
                }
                b' ' | b'\t' | b'\r' | b'\x0c' | b'\x0b' => {
                    if !self.in_quote {
                        return self.parse_sep();
                    }
                    self.comment = false;
                    return self.parse_str();
                }
                b'\n' | b';' => {
                    self.comment = true;
                    if !self.in_quote {
                        return self.parse_eol();
                    }
                    return self.parse_str();
                }
                b'[' => {
                    self.comment = false;
                    return self.parse_cmd();
                }
                b'$' => {
                    self.comment = false;
                    if let Some(tok) = self.parse_var() {
                        return tok;
                    }
                    // An orphan `$` is plain text.
                    let start = self.pos;
                    self.pos += 1;
                    return self.emit(TokenKind::Esc, start, self.pos, self.line);
                }
                b'#' if self.comment => {
                    self.parse_comment();
                }
                _ => {
                    self.comment = false;
                    return self.parse_str();
                }
            }
        }
    }

    fn parse_sep(&mut self) -> Token<'a> {
        let start = self.pos;
        let line = self.line;
        while !self.at_end() {
            let c = self.peek();
            if c == b'\\' && self.byte(self.pos + 1) == b'\n' {
                self.pos += 2;
                self.line += 1;
            } else if matches!(c, b' ' | b'\t' | b'\r' | b'\x0c' | b'\x0b') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.emit(TokenKind::Sep, start, self.pos, line)
    }

    fn parse_eol(&mut self) -> Token<'a> {
        let start = self.pos;
        let line = self.line;
        while !self.at_end() && (is_space(self.peek()) || self.peek() == b';') {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        self.emit(TokenKind::Eol, start, self.pos, line)
    }

    fn parse_comment(&mut self) {
        while !self.at_end() {
            match self.peek() {
                b'\\' => {
                    self.pos += 1;
                    if self.at_end() {
                        self.missing = Missing::Backslash;
                        self.missing_line = self.line;
                        return;
                    }
                    if self.peek() == b'\n' {
                        self.line += 1;
                    }
                }
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    return;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn parse_str(&mut self) -> Token<'a> {
        if matches!(self.kind, TokenKind::Sep | TokenKind::Eol | TokenKind::Str) {
            if self.peek() == b'{' {
                return self.parse_brace();
            }
            if self.peek() == b'"' {
                self.in_quote = true;
                self.pos += 1;
                self.missing_line = self.line;
            }
        }
        let start = self.pos;
        let line = self.line;
        loop {
            if self.at_end() {
                if self.in_quote {
                    self.missing = Missing::Quote;
                }
                return self.emit(TokenKind::Esc, start, self.pos, line);
            }
            match self.peek() {
                b'\\' => {
                    if !self.in_quote && self.byte(self.pos + 1) == b'\n' {
                        return self.emit(TokenKind::Esc, start, self.pos, line);
                    }
                    if self.remaining() >= 2 {
                        if self.byte(self.pos + 1) == b'\n' {
                            self.line += 1;
                        }
                        self.pos += 1;
                    } else {
                        self.missing = Missing::Backslash;
                        self.missing_line = self.line;
                    }
                }
                b'(' if self.remaining() > 1 && self.byte(self.pos + 1) != b'$' => {}
                b'(' => {
                    if self.pos == start {
                        self.pos += 1;
                    }
                    return self.emit(TokenKind::Esc, start, self.pos, line);
                }
                b')' if self.kind == TokenKind::Var => {
                    if self.pos == start {
                        self.pos += 1;
                    }
                    return self.emit(TokenKind::Esc, start, self.pos, line);
                }
                b'$' | b'[' => return self.emit(TokenKind::Esc, start, self.pos, line),
                b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'\x0b' | b';' => {
                    if !self.in_quote {
                        return self.emit(TokenKind::Esc, start, self.pos, line);
                    }
                    if self.peek() == b'\n' {
                        self.line += 1;
                    }
                }
                b'"' if self.in_quote => {
                    let tok = self.emit(TokenKind::Esc, start, self.pos, line);
                    self.pos += 1;
                    self.in_quote = false;
                    return tok;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// A braced word: the text between the outer braces, taken literally.
    fn parse_brace(&mut self) -> Token<'a> {
        let open_line = self.line;
        self.pos += 1;
        let start = self.pos;
        let mut level = 1;
        while !self.at_end() {
            match self.peek() {
                b'\\' => self.skip_escape(),
                b'{' => level += 1,
                b'}' => {
                    level -= 1;
                    if level == 0 {
                        let tok = self.emit(TokenKind::Str, start, self.pos, open_line);
                        self.pos += 1;
                        return tok;
                    }
                }
                b'\n' => self.line += 1,
                _ => {}
            }
            self.pos += 1;
        }
        self.missing = Missing::Brace;
        self.missing_line = open_line;
        self.emit(TokenKind::Str, start, self.pos, open_line)
    }

    fn parse_cmd(&mut self) -> Token<'a> {
        let open_line = self.line;
        self.pos += 1;
        let start = self.pos;
        let mut level = 1;
        let mut start_of_word = true;
        while !self.at_end() {
            match self.peek() {
                b'\\' => self.skip_escape(),
                b'[' => level += 1,
                b']' => {
                    level -= 1;
                    if level == 0 {
                        let tok = self.emit(TokenKind::Cmd, start, self.pos, open_line);
                        self.pos += 1;
                        return tok;
                    }
                }
                b'"' if start_of_word => {
                    self.parse_sub_quote();
                    continue;
                }
                b'{' => {
                    self.parse_sub_brace();
                    start_of_word = false;
                    continue;
                }
                b'\n' => self.line += 1,
                _ => {}
            }
            start_of_word = is_space(self.peek());
            self.pos += 1;
        }
        self.missing = Missing::Bracket;
        self.missing_line = open_line;
        self.emit(TokenKind::Cmd, start, self.pos, open_line)
    }

    fn parse_sub_brace(&mut self) {
        let open_line = self.line;
        let mut level = 1;
        self.pos += 1;
        while !self.at_end() {
            match self.peek() {
                b'\\' => self.skip_escape(),
                b'{' => level += 1,
                b'}' => {
                    level -= 1;
                    if level == 0 {
                        self.pos += 1;
                        return;
                    }
                }
                b'\n' => self.line += 1,
                _ => {}
            }
            self.pos += 1;
        }
        self.missing = Missing::Brace;
        self.missing_line = open_line;
    }

    fn parse_sub_quote(&mut self) {
        let open_line = self.line;
        self.pos += 1;
        while !self.at_end() {
            match self.peek() {
                b'\\' => self.skip_escape(),
                b'"' => {
                    self.pos += 1;
                    return;
                }
                b'[' => {
                    self.parse_sub_cmd();
                    continue;
                }
                b'\n' => self.line += 1,
                _ => {}
            }
            self.pos += 1;
        }
        self.missing = Missing::Quote;
        self.missing_line = open_line;
    }

    fn parse_sub_cmd(&mut self) {
        let open_line = self.line;
        let mut level = 1;
        let mut start_of_word = true;
        self.pos += 1;
        while !self.at_end() {
            match self.peek() {
                b'\\' => self.skip_escape(),
                b'[' => level += 1,
                b']' => {
                    level -= 1;
                    if level == 0 {
                        self.pos += 1;
                        return;
                    }
                }
                b'"' if start_of_word => {
                    self.parse_sub_quote();
                    continue;
                }
                b'{' => {
                    self.parse_sub_brace();
                    start_of_word = false;
                    continue;
                }
                b'\n' => self.line += 1,
                _ => {}
            }
            start_of_word = is_space(self.peek());
            self.pos += 1;
        }
        self.missing = Missing::Bracket;
        self.missing_line = open_line;
    }

    /// Parses a `$` reference at the current position. Returns `None`, with
    /// the position left on the `$`, when no variable name follows.
    fn parse_var(&mut self) -> Option<Token<'a>> {
        let dollar = self.pos;
        let line = self.line;
        self.pos += 1;
        let start;
        let end;
        let mut kind = TokenKind::Var;
        if self.peek() == b'{' && !self.at_end() {
            self.pos += 1;
            start = self.pos;
            while !self.at_end() && self.peek() != b'}' {
                if self.peek() == b'\n' {
                    self.line += 1;
                }
                self.pos += 1;
            }
            end = self.pos;
            if !self.at_end() {
                self.pos += 1;
            }
        } else {
            start = self.pos;
            loop {
                if self.peek() == b':' && self.byte(self.pos + 1) == b':' {
                    while self.peek() == b':' {
                        self.pos += 1;
                    }
                    continue;
                }
                let c = self.peek();
                if !self.at_end() && (c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80) {
                    self.pos += 1;
                    continue;
                }
                break;
            }
            if self.peek() == b'(' && !self.at_end() {
                kind = TokenKind::DictSugar;
                let mut depth = 1;
                let mut close = None;
                while depth > 0 && !self.at_end() {
                    self.pos += 1;
                    if self.at_end() {
                        break;
                    }
                    match self.peek() {
                        b'\\' => self.pos += 1,
                        b'(' => depth += 1,
                        b')' => {
                            close = Some(self.pos);
                            depth -= 1;
                        }
                        _ => {}
                    }
                }
                if depth == 0 {
                    self.pos += 1;
                } else if let Some(close) = close {
                    // No balancing paren: stop after the last `)` seen.
                    self.pos = close + 1;
                }
                self.pos = self.pos.min(self.src.len());
                if self.byte(start) == b'(' {
                    kind = TokenKind::ExprSugar;
                }
            }
            end = self.pos;
        }
        if self.pos == start {
            self.pos = dollar;
            self.line = line;
            return None;
        }
        Some(self.emit(kind, start, end, line))
    }

    // ---- List mode ----

    /// List elements: whitespace separated, braces group literally, quotes
    /// group with escapes. Never fails; a missing close is tolerated.
    pub fn next_list_token(&mut self) -> Token<'a> {
        if self.at_end() {
            return self.eof();
        }
        match self.peek() {
            c if is_space(c) => {
                let start = self.pos;
                let line = self.line;
                while !self.at_end() && is_space(self.peek()) {
                    if self.peek() == b'\n' {
                        self.line += 1;
                    }
                    self.pos += 1;
                }
                self.emit(TokenKind::Sep, start, self.pos, line)
            }
            b'"' => self.parse_list_quote(),
            b'{' => self.parse_brace(),
            _ => self.parse_list_str(),
        }
    }

    fn parse_list_quote(&mut self) -> Token<'a> {
        let line = self.line;
        self.pos += 1;
        let start = self.pos;
        let mut kind = TokenKind::Str;
        while !self.at_end() {
            match self.peek() {
                b'\\' => {
                    kind = TokenKind::Esc;
                    self.skip_escape();
                }
                b'\n' => self.line += 1,
                b'"' => {
                    let tok = self.emit(kind, start, self.pos, line);
                    self.pos += 1;
                    return tok;
                }
                _ => {}
            }
            self.pos += 1;
        }
        self.missing = Missing::Quote;
        self.missing_line = line;
        self.emit(kind, start, self.pos, line)
    }

    fn parse_list_str(&mut self) -> Token<'a> {
        let start = self.pos;
        let line = self.line;
        let mut kind = TokenKind::Str;
        while !self.at_end() {
            let c = self.peek();
            if is_space(c) {
                break;
            }
            if c == b'\\' {
                kind = TokenKind::Esc;
                self.skip_escape();
            }
            self.pos += 1;
        }
        let end = self.pos.min(self.src.len());
        self.pos = end;
        self.emit(kind, start, end, line)
    }

    // ---- Substitution mode ----

    pub fn next_subst_token(&mut self, flags: SubstFlags) -> Token<'a> {
        if self.at_end() {
            return self.eof();
        }
        let c = self.peek();
        if c == b'[' && !flags.no_commands {
            return self.parse_cmd();
        }
        let start = self.pos;
        let line = self.line;
        let mut no_variables = flags.no_variables;
        if c == b'$' && !no_variables {
            if let Some(tok) = self.parse_var() {
                return tok;
            }
            self.pos += 1;
            no_variables = true;
        }
        while !self.at_end() {
            let c = self.peek();
            if (c == b'$' && !no_variables) || (c == b'[' && !flags.no_commands) {
                break;
            }
            if c == b'\\' {
                self.skip_escape();
            } else if c == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        let end = self.pos.min(self.src.len());
        self.pos = end;
        let kind = if flags.no_backslashes { TokenKind::Str } else { TokenKind::Esc };
        self.emit(kind, start, end, line)
    }

    // ---- Sub-parsers for the expression tokeniser ----

    /// `$...` at `pos`.
    pub fn var_at(&mut self, pos: usize) -> Option<Token<'a>> {
        self.pos = pos;
        self.parse_var()
    }

    /// `[...]` at `pos`.
    pub fn cmd_at(&mut self, pos: usize) -> Token<'a> {
        self.pos = pos;
        self.parse_cmd()
    }

    /// `{...}` at `pos`.
    pub fn brace_at(&mut self, pos: usize) -> Token<'a> {
        self.pos = pos;
        self.parse_brace()
    }

    /// `"..."` at `pos`; the text is the raw content, still subject to
    /// substitution.
    pub fn quote_at(&mut self, pos: usize) -> Token<'a> {
        let line = self.line;
        self.pos = pos;
        let start = pos + 1;
        self.parse_sub_quote();
        let end = if self.missing == Missing::Quote { self.pos } else { self.pos - 1 };
        self.emit(TokenKind::Esc, start, end.max(start), line)
    }
}

/// Runs the script parser over `src` and reports whether every brace,
/// bracket and quote is closed.
pub fn script_missing(src: &str) -> (Missing, u32) {
    let mut parser = Parser::new(src, 1);
    while parser.next_script_token().kind != TokenKind::Eof {}
    (parser.missing(), parser.missing_line())
}

/// Like [`script_missing`] for list syntax, as checked by `string is list`.
pub fn list_missing(src: &str) -> Missing {
    let mut parser = Parser::new(src, 1);
    while parser.next_list_token().kind != TokenKind::Eof {}
    parser.missing()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script_tokens(src: &str) -> Vec<(TokenKind, String)> {
        let mut p = Parser::new(src, 1);
        let mut out = Vec::new();
        loop {
            let t = p.next_script_token();
            if t.kind == TokenKind::Eof {
                break;
            }
            out.push((t.kind, t.text.to_string()));
        }
        out
    }

    fn words(src: &str) -> Vec<(TokenKind, String)> {
        script_tokens(src).into_iter().filter(|(k, _)| *k != TokenKind::Sep && *k != TokenKind::Eol).collect()
    }

    use TokenKind::*;

    #[test]
    fn simple_command() {
        assert_eq!(
            script_tokens("set x 1"),
            vec![(Esc, "set".into()), (Sep, " ".into()), (Esc, "x".into()), (Sep, " ".into()), (Esc, "1".into())]
        );
    }

    #[test]
    fn braces_are_literal() {
        assert_eq!(words("puts {a $b [c]}"), vec![(Esc, "puts".into()), (Str, "a $b [c]".into())]);
    }

    #[test]
    fn nested_braces() {
        assert_eq!(words("x {a {b c} d}"), vec![(Esc, "x".into()), (Str, "a {b c} d".into())]);
    }

    #[test]
    fn quoted_word_with_substitutions() {
        assert_eq!(
            words("puts \"a $b [c] d\""),
            vec![
                (Esc, "puts".into()),
                (Esc, "a ".into()),
                (Var, "b".into()),
                (Esc, " ".into()),
                (Cmd, "c".into()),
                (Esc, " d".into()),
            ]
        );
    }

    #[test]
    fn variable_forms() {
        assert_eq!(words("$a ${b c} $::g"), vec![(Var, "a".into()), (Var, "b c".into()), (Var, "::g".into())]);
        assert_eq!(words("$a(k)"), vec![(DictSugar, "a(k)".into())]);
        assert_eq!(words("$(1+2)"), vec![(ExprSugar, "(1+2)".into())]);
    }

    #[test]
    fn orphan_dollar_is_text() {
        assert_eq!(words("$ x"), vec![(Esc, "$".into()), (Esc, "x".into())]);
        assert_eq!(words("a$"), vec![(Esc, "a".into()), (Esc, "$".into())]);
    }

    #[test]
    fn paren_before_variable_splits() {
        assert_eq!(
            words("a($b)"),
            vec![(Esc, "a".into()), (Esc, "(".into()), (Var, "b".into()), (Esc, ")".into())]
        );
        assert_eq!(words("f(x)"), vec![(Esc, "f(x)".into())]);
    }

    #[test]
    fn comments_only_at_command_start() {
        assert_eq!(words("# c1\nset x 1 ;# c2\n"), vec![(Esc, "set".into()), (Esc, "x".into()), (Esc, "1".into())]);
        assert_eq!(words("puts #notcomment"), vec![(Esc, "puts".into()), (Esc, "#notcomment".into())]);
    }

    #[test]
    fn commands_nest() {
        assert_eq!(words("[a [b] {]} \"]\"]"), vec![(Cmd, "a [b] {]} \"]\"".into())]);
    }

    #[test]
    fn line_numbers() {
        let mut p = Parser::new("a\nb\n\nc", 1);
        let mut lines = Vec::new();
        loop {
            let t = p.next_script_token();
            if t.kind == Eof {
                break;
            }
            if t.kind == Esc {
                lines.push(t.line);
            }
        }
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn missing_constructs() {
        assert_eq!(script_missing("set x {a").0, Missing::Brace);
        assert_eq!(script_missing("set x [a").0, Missing::Bracket);
        assert_eq!(script_missing("set x \"a").0, Missing::Quote);
        assert_eq!(script_missing("set x a\\").0, Missing::Backslash);
        assert_eq!(script_missing("set x {a} [b] \"c\"").0, Missing::None);
    }

    #[test]
    fn missing_line_points_at_opener() {
        assert_eq!(script_missing("a\nb {\nc"), (Missing::Brace, 2));
    }

    #[test]
    fn list_mode() {
        let mut p = Parser::new("a {b c} \"d e\" f\\ g", 1);
        let mut elems = Vec::new();
        loop {
            let t = p.next_list_token();
            match t.kind {
                Eof => break,
                Sep => continue,
                _ => elems.push((t.kind, t.text.to_string())),
            }
        }
        assert_eq!(
            elems,
            vec![(Str, "a".into()), (Str, "b c".into()), (Str, "d e".into()), (Esc, "f\\ g".into())]
        );
    }

    #[test]
    fn subst_mode_honours_flags() {
        let collect = |src: &str, flags: SubstFlags| {
            let mut p = Parser::new(src, 1);
            let mut out = Vec::new();
            loop {
                let t = p.next_subst_token(flags);
                if t.kind == Eof {
                    break;
                }
                out.push((t.kind, t.text.to_string()));
            }
            out
        };
        assert_eq!(
            collect("a $b [c]", SubstFlags::default()),
            vec![(Esc, "a ".into()), (Var, "b".into()), (Esc, " ".into()), (Cmd, "c".into())]
        );
        let flags = SubstFlags { no_variables: true, no_commands: true, no_backslashes: true };
        assert_eq!(collect("a $b [c]", flags), vec![(Str, "a $b [c]".into())]);
    }

    #[test]
    fn backslash_newline_separates_words() {
        assert_eq!(words("a \\\n  b"), vec![(Esc, "a".into()), (Esc, "b".into())]);
    }
}
