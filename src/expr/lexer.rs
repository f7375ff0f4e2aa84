use logos::Logos;

use crate::obj::Obj;
use crate::obj::number::{parse_double, parse_int};
use crate::parser::{Missing, Parser, TokenKind, is_space};

/// Operators, numbers and barewords. Substitutions (`$`, `[`, `{`, `"`)
/// are handed to the script parser before this lexer sees them.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f\x0B]+")]
pub(crate) enum Lexeme {
    #[token("**")]
    Pow,
    #[token("*")]
    Mul,
    #[token("/")]
    Div,
    #[token("%")]
    Mod,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("<<<")]
    Rotl,
    #[token(">>>")]
    Rotr,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("==")]
    NumEq,
    #[token("!=")]
    NumNe,
    #[token("eq")]
    StrEq,
    #[token("ne")]
    StrNe,
    #[token("in")]
    In,
    #[token("ni")]
    Ni,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("&")]
    BitAnd,
    #[token("^")]
    BitXor,
    #[token("|")]
    BitOr,
    #[token("!")]
    Not,
    #[token("~")]
    BitNot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    #[regex(r"0[xX][0-9a-fA-F]+|0[oO][0-7]+|0[bB][01]+|[0-9]+")]
    Int,
    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+")]
    Float,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExprToken {
    Op(Lexeme),
    Int(i64),
    Double(f64),
    Word(String),
    Var(Obj),
    DictSugar(Obj),
    ExprSugar(Obj),
    Cmd(Obj),
    Braced(Obj),
    Quoted(Obj),
}

/// Splits an expression into tokens. The error is a short reason; the
/// caller wraps it with the expression text.
pub(crate) fn tokenize(src: &str) -> Result<Vec<ExprToken>, String> {
    let bytes = src.as_bytes();
    let mut parser = Parser::new(src, 1);
    let mut tokens = Vec::new();
    let mut pos = 0;
    loop {
        while pos < bytes.len() && is_space(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Ok(tokens);
        }
        let tok = match bytes[pos] {
            b'$' => {
                let Some(t) = parser.var_at(pos) else {
                    return Err("variable name expected after \"$\"".to_string());
                };
                match t.kind {
                    TokenKind::DictSugar => ExprToken::DictSugar(Obj::from(t.text)),
                    TokenKind::ExprSugar => ExprToken::ExprSugar(Obj::from(t.text)),
                    _ => ExprToken::Var(Obj::from(t.text)),
                }
            }
            b'[' => ExprToken::Cmd(Obj::from(parser.cmd_at(pos).text)),
            b'{' => ExprToken::Braced(Obj::from(parser.brace_at(pos).text)),
            b'"' => ExprToken::Quoted(Obj::from(parser.quote_at(pos).text)),
            _ => {
                let rest = &src[pos..];
                let mut lex = Lexeme::lexer(rest);
                let lexeme = match lex.next() {
                    Some(Ok(l)) => l,
                    _ => {
                        let bad: String = rest.chars().take(1).collect();
                        return Err(format!("unexpected character \"{bad}\""));
                    }
                };
                let text = lex.slice();
                pos += lex.span().end;
                tokens.push(match lexeme {
                    Lexeme::Int => match parse_int(text) {
                        Some(i) => ExprToken::Int(i),
                        None => ExprToken::Double(parse_double(text).ok_or_else(|| format!("bad number \"{text}\""))?),
                    },
                    Lexeme::Float => {
                        ExprToken::Double(parse_double(text).ok_or_else(|| format!("bad number \"{text}\""))?)
                    }
                    Lexeme::Word => ExprToken::Word(text.to_string()),
                    op => ExprToken::Op(op),
                });
                continue;
            }
        };
        if parser.missing() != Missing::None {
            return Err(match parser.missing() {
                Missing::Bracket => "missing close-bracket".to_string(),
                Missing::Brace => "missing close-brace".to_string(),
                _ => "missing quote".to_string(),
            });
        }
        pos = parser.pos();
        tokens.push(tok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_longest_match() {
        let toks = tokenize("1<<<2 ** 3 <= 4").unwrap();
        assert_eq!(
            toks,
            vec![
                ExprToken::Int(1),
                ExprToken::Op(Lexeme::Rotl),
                ExprToken::Int(2),
                ExprToken::Op(Lexeme::Pow),
                ExprToken::Int(3),
                ExprToken::Op(Lexeme::Le),
                ExprToken::Int(4),
            ]
        );
    }

    #[test]
    fn numbers() {
        let toks = tokenize("0x1F 0b101 0o17 1.5 .5 2e3 10").unwrap();
        assert_eq!(
            toks,
            vec![
                ExprToken::Int(31),
                ExprToken::Int(5),
                ExprToken::Int(15),
                ExprToken::Double(1.5),
                ExprToken::Double(0.5),
                ExprToken::Double(2000.0),
                ExprToken::Int(10),
            ]
        );
    }

    #[test]
    fn substitutions() {
        let toks = tokenize("$a + [f x] eq {b c} ne \"q $d\" + $e(k)").unwrap();
        assert_eq!(toks[0], ExprToken::Var(Obj::from("a")));
        assert_eq!(toks[2], ExprToken::Cmd(Obj::from("f x")));
        assert_eq!(toks[3], ExprToken::Op(Lexeme::StrEq));
        assert_eq!(toks[4], ExprToken::Braced(Obj::from("b c")));
        assert_eq!(toks[6], ExprToken::Quoted(Obj::from("q $d")));
        assert_eq!(toks[8], ExprToken::DictSugar(Obj::from("e(k)")));
    }

    #[test]
    fn words_and_keywords() {
        let toks = tokenize("in index sin(").unwrap();
        assert_eq!(toks[0], ExprToken::Op(Lexeme::In));
        assert_eq!(toks[1], ExprToken::Word("index".to_string()));
        assert_eq!(toks[2], ExprToken::Word("sin".to_string()));
        assert_eq!(toks[3], ExprToken::Op(Lexeme::LParen));
    }

    #[test]
    fn unterminated() {
        assert!(tokenize("[a").is_err());
        assert!(tokenize("{a").is_err());
        assert!(tokenize("\"a").is_err());
        assert!(tokenize("1 @ 2").is_err());
    }
}
