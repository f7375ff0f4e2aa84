//! Compiled scripts: the token stream the evaluator walks.
//!
//! A script is a flat array. Each command starts with a [`ScriptToken::Line`]
//! giving its word count and source line. A word made of one plain part is
//! just that part; a word with several parts (or marked for `{*}`
//! expansion) is introduced by a [`ScriptToken::Word`] giving the number of
//! parts that follow.

use crate::obj::Obj;
use crate::parser::{Missing, Parser, SubstFlags, Token, TokenKind, unescape};

/// The kind of one part of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    /// Literal text, escapes already decoded.
    Str,
    Var,
    DictSugar,
    ExprSugar,
    Cmd,
}

#[derive(Debug, Clone)]
pub enum ScriptToken {
    Line { argc: usize, line: u32 },
    Word { count: usize, expand: bool },
    Part(Part, Obj),
}

#[derive(Debug)]
pub struct Script {
    pub tokens: Vec<ScriptToken>,
    pub file: Obj,
    pub first_line: u32,
    pub missing: Missing,
    pub missing_line: u32,
}

fn part_for(tok: &Token<'_>) -> Option<(Part, Obj)> {
    let part = match tok.kind {
        TokenKind::Str => (Part::Str, Obj::from(tok.text)),
        TokenKind::Esc => (Part::Str, Obj::new(unescape(tok.text))),
        TokenKind::Var => (Part::Var, Obj::from(tok.text)),
        TokenKind::DictSugar => (Part::DictSugar, Obj::from(tok.text)),
        TokenKind::ExprSugar => (Part::ExprSugar, Obj::from(tok.text)),
        TokenKind::Cmd => (Part::Cmd, Obj::from(tok.text)),
        TokenKind::Sep | TokenKind::Eol | TokenKind::Eof => return None,
    };
    Some(part)
}

fn is_expand_prefix(tok: &Token<'_>) -> bool {
    tok.kind == TokenKind::Str && (tok.text == "*" || tok.text == "expand")
}

impl Script {
    pub fn compile(src: &str, file: Obj, first_line: u32) -> Script {
        let mut parser = Parser::new(src, first_line);
        let mut tokens = Vec::new();
        // Parts of the word being collected and the words of the command.
        let mut word: Vec<Token<'_>> = Vec::new();
        let mut command: Vec<ScriptToken> = Vec::new();
        let mut argc = 0usize;
        let mut line = first_line;

        loop {
            let tok = parser.next_script_token();
            match tok.kind {
                TokenKind::Sep | TokenKind::Eol | TokenKind::Eof => {
                    if !word.is_empty() {
                        if argc == 0 {
                            line = word[0].line;
                        }
                        argc += 1;
                        push_word(&mut command, &mut word, &file);
                    }
                    if tok.kind != TokenKind::Sep && argc > 0 {
                        tokens.push(ScriptToken::Line { argc, line });
                        tokens.append(&mut command);
                        argc = 0;
                    }
                    if tok.kind == TokenKind::Eof {
                        break;
                    }
                }
                _ => word.push(tok),
            }
        }

        tracing::debug!(tokens = tokens.len(), file = %file, line = first_line, "compiled script");
        Script { tokens, file, first_line, missing: parser.missing(), missing_line: parser.missing_line() }
    }

    /// Number of commands in the script.
    pub fn commands(&self) -> usize {
        self.tokens.iter().filter(|t| matches!(t, ScriptToken::Line { .. })).count()
    }
}

fn push_word(out: &mut Vec<ScriptToken>, word: &mut Vec<Token<'_>>, file: &Obj) {
    let mut parts = std::mem::take(word);
    let expand = parts.len() > 1 && is_expand_prefix(&parts[0]);
    if expand {
        parts.remove(0);
    }
    if parts.len() > 1 {
        parts.retain(|t| !(t.kind == TokenKind::Esc && t.text.is_empty()));
    }
    if parts.len() != 1 || expand {
        out.push(ScriptToken::Word { count: parts.len(), expand });
    }
    for tok in &parts {
        if let Some((kind, obj)) = part_for(tok) {
            if matches!(kind, Part::Str | Part::Cmd) {
                obj.set_source(file.clone(), tok.line);
            }
            out.push(ScriptToken::Part(kind, obj));
        }
    }
}

/// A string compiled for `subst`: a flat list of parts.
#[derive(Debug)]
pub struct SubstScript {
    pub parts: Vec<(Part, Obj)>,
}

impl SubstScript {
    pub fn compile(src: &str, flags: SubstFlags) -> SubstScript {
        let mut parser = Parser::new(src, 1);
        let mut parts = Vec::new();
        loop {
            let tok = parser.next_subst_token(flags);
            if tok.kind == TokenKind::Eof {
                break;
            }
            if let Some(part) = part_for(&tok) {
                parts.push(part);
            }
        }
        SubstScript { parts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> Script {
        Script::compile(src, Obj::from("test.tcl"), 1)
    }

    fn shape(script: &Script) -> Vec<String> {
        script
            .tokens
            .iter()
            .map(|t| match t {
                ScriptToken::Line { argc, line } => format!("LINE {argc}@{line}"),
                ScriptToken::Word { count, expand } => format!("WORD {count}{}", if *expand { "*" } else { "" }),
                ScriptToken::Part(kind, obj) => format!("{kind:?} {obj}"),
            })
            .collect()
    }

    #[test]
    fn simple_commands() {
        let s = compile("set x 1\nputs $x");
        assert_eq!(
            shape(&s),
            vec!["LINE 3@1", "Str set", "Str x", "Str 1", "LINE 2@2", "Str puts", "Var x"]
        );
        assert_eq!(s.commands(), 2);
    }

    #[test]
    fn multi_part_words() {
        let s = compile("puts \"a $b\\tc\"");
        assert_eq!(shape(&s), vec!["LINE 2@1", "Str puts", "WORD 3", "Str a ", "Var b", "Str \tc"]);
    }

    #[test]
    fn empty_escape_parts_dropped() {
        let s = compile("puts \"$a\"");
        assert_eq!(shape(&s), vec!["LINE 2@1", "Str puts", "Var a"]);
    }

    #[test]
    fn expansion_prefix() {
        let s = compile("list {*}$a {expand}[b] {*}");
        assert_eq!(
            shape(&s),
            vec!["LINE 4@1", "Str list", "WORD 1*", "Var a", "WORD 1*", "Cmd b", "Str *"]
        );
    }

    #[test]
    fn blank_lines_and_comments_skipped() {
        let s = compile("\n\n  # note\n  a ; b\n");
        assert_eq!(shape(&s), vec!["LINE 1@4", "Str a", "LINE 1@4", "Str b"]);
    }

    #[test]
    fn parts_carry_source_lines() {
        let s = compile("a\nb {x\ny}");
        let loc = s.tokens.iter().rev().find_map(|t| match t {
            ScriptToken::Part(_, o) => o.source_location(),
            _ => None,
        });
        let (file, line) = loc.unwrap();
        assert_eq!(file.as_str(), "test.tcl");
        assert_eq!(line, 2);
    }

    #[test]
    fn records_missing() {
        assert_eq!(compile("a {b").missing, Missing::Brace);
        assert_eq!(compile("a {b}").missing, Missing::None);
    }

    #[test]
    fn subst_parts() {
        let flags = SubstFlags::default();
        let s = SubstScript::compile("a $b [c] \\n", flags);
        let kinds: Vec<Part> = s.parts.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![Part::Str, Part::Var, Part::Str, Part::Cmd, Part::Str]);
        assert_eq!(s.parts[4].1.as_str(), " \n");

        let none = SubstFlags { no_backslashes: true, no_commands: true, no_variables: true };
        let s = SubstScript::compile("a $b [c] \\n", none);
        assert_eq!(s.parts.len(), 1);
        assert_eq!(s.parts[0].1.as_str(), "a $b [c] \\n");
    }
}
