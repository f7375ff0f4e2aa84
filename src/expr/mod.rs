//! Infix expressions: tokenising, tree building and evaluation.
//!
//! An expression is compiled once into an [`ExprTree`] (a node arena) and
//! cached on the value it came from. Evaluation lives in [`eval`] because
//! it needs the interpreter for variables and command substitution.

pub mod eval;
mod lexer;

use lexer::{ExprToken, Lexeme, tokenize};

use crate::interp::{EvalResult, Exception};
use crate::obj::Obj;
use crate::obj::number::parse_bool;

/// Nesting deeper than this is rejected rather than risking the stack.
const MAX_DEPTH: usize = 200;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Neg,
    Plus,
    Not,
    BitNot,
    Pow,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Rotl,
    Rotr,
    Lt,
    Gt,
    Le,
    Ge,
    NumEq,
    NumNe,
    StrEq,
    StrNe,
    In,
    Ni,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Neg | Op::Sub => "-",
            Op::Plus | Op::Add => "+",
            Op::Not => "!",
            Op::BitNot => "~",
            Op::Pow => "**",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Rotl => "<<<",
            Op::Rotr => ">>>",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::NumEq => "==",
            Op::NumNe => "!=",
            Op::StrEq => "eq",
            Op::StrNe => "ne",
            Op::In => "in",
            Op::Ni => "ni",
            Op::BitAnd => "&",
            Op::BitXor => "^",
            Op::BitOr => "|",
            Op::And => "&&",
            Op::Or => "||",
        }
    }

    fn binary(lexeme: Lexeme) -> Option<Op> {
        Some(match lexeme {
            Lexeme::Pow => Op::Pow,
            Lexeme::Mul => Op::Mul,
            Lexeme::Div => Op::Div,
            Lexeme::Mod => Op::Mod,
            Lexeme::Plus => Op::Add,
            Lexeme::Minus => Op::Sub,
            Lexeme::Shl => Op::Shl,
            Lexeme::Shr => Op::Shr,
            Lexeme::Rotl => Op::Rotl,
            Lexeme::Rotr => Op::Rotr,
            Lexeme::Lt => Op::Lt,
            Lexeme::Gt => Op::Gt,
            Lexeme::Le => Op::Le,
            Lexeme::Ge => Op::Ge,
            Lexeme::NumEq => Op::NumEq,
            Lexeme::NumNe => Op::NumNe,
            Lexeme::StrEq => Op::StrEq,
            Lexeme::StrNe => Op::StrNe,
            Lexeme::In => Op::In,
            Lexeme::Ni => Op::Ni,
            Lexeme::BitAnd => Op::BitAnd,
            Lexeme::BitXor => Op::BitXor,
            Lexeme::BitOr => Op::BitOr,
            Lexeme::And => Op::And,
            Lexeme::Or => Op::Or,
            _ => return None,
        })
    }

    /// Binding strength; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            Op::Neg | Op::Plus | Op::Not | Op::BitNot => 150,
            Op::Pow => 120,
            Op::Mul | Op::Div | Op::Mod => 110,
            Op::Add | Op::Sub => 100,
            Op::Shl | Op::Shr | Op::Rotl | Op::Rotr => 90,
            Op::Lt | Op::Gt | Op::Le | Op::Ge => 80,
            Op::NumEq | Op::NumNe => 70,
            Op::StrEq | Op::StrNe => 60,
            Op::In | Op::Ni => 55,
            Op::BitAnd => 50,
            Op::BitXor => 49,
            Op::BitOr => 48,
            Op::And => 10,
            Op::Or => 9,
        }
    }

    fn right_assoc(self) -> bool {
        self == Op::Pow
    }
}

const TERNARY_PRECEDENCE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Int,
    Wide,
    Abs,
    Double,
    Round,
    Rand,
    Srand,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Ceil,
    Floor,
    Exp,
    Log,
    Log10,
    Sqrt,
    Pow,
    Hypot,
    Fmod,
}

const FUNCS: &[(&str, Func, usize)] = &[
    ("int", Func::Int, 1),
    ("wide", Func::Wide, 1),
    ("abs", Func::Abs, 1),
    ("double", Func::Double, 1),
    ("round", Func::Round, 1),
    ("rand", Func::Rand, 0),
    ("srand", Func::Srand, 1),
    ("sin", Func::Sin, 1),
    ("cos", Func::Cos, 1),
    ("tan", Func::Tan, 1),
    ("asin", Func::Asin, 1),
    ("acos", Func::Acos, 1),
    ("atan", Func::Atan, 1),
    ("atan2", Func::Atan2, 2),
    ("sinh", Func::Sinh, 1),
    ("cosh", Func::Cosh, 1),
    ("tanh", Func::Tanh, 1),
    ("ceil", Func::Ceil, 1),
    ("floor", Func::Floor, 1),
    ("exp", Func::Exp, 1),
    ("log", Func::Log, 1),
    ("log10", Func::Log10, 1),
    ("sqrt", Func::Sqrt, 1),
    ("pow", Func::Pow, 2),
    ("hypot", Func::Hypot, 2),
    ("fmod", Func::Fmod, 2),
];

impl Func {
    fn lookup(name: &str) -> Option<(Func, usize)> {
        FUNCS.iter().find(|(n, _, _)| *n == name).map(|(_, f, arity)| (*f, *arity))
    }

    pub fn name(self) -> &'static str {
        FUNCS.iter().find(|(_, f, _)| *f == self).map(|(n, _, _)| *n).unwrap_or("?")
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    /// A literal with its value already materialised.
    Literal(Obj),
    Var(Obj),
    DictSugar(Obj),
    /// `$(...)`: a nested expression.
    Sub(Obj),
    Cmd(Obj),
    /// `"..."`: substituted at evaluation time.
    Quoted(Obj),
    Unary(Op, NodeId),
    Binary(Op, NodeId, NodeId),
    Ternary(NodeId, NodeId, NodeId),
    Func(Func, Vec<NodeId>),
}

#[derive(Debug)]
pub struct ExprTree {
    pub nodes: Vec<Node>,
    pub root: NodeId,
}

impl ExprTree {
    pub fn compile(src: &str) -> EvalResult<ExprTree> {
        let syntax_error = |reason: &str| {
            Exception::error(format!("syntax error in expression: \"{src}\": {reason}"))
        };
        let tokens = tokenize(src).map_err(|e| syntax_error(&e))?;
        if tokens.is_empty() {
            return Err(Exception::error("empty expression"));
        }
        let mut builder = Builder { tokens: &tokens, pos: 0, nodes: Vec::new(), depth: 0 };
        let root = builder.expr(0).map_err(|e| match e {
            BuildError::TooDeep => Exception::error("Expressions are too complex"),
            BuildError::Bareword(w) => Exception::error(format!("invalid bareword \"{w}\"")),
            BuildError::Syntax(reason) => syntax_error(&reason),
        })?;
        if builder.pos < tokens.len() {
            return Err(syntax_error("extra tokens at end of expression"));
        }
        Ok(ExprTree { nodes: builder.nodes, root })
    }
}

enum BuildError {
    TooDeep,
    Bareword(String),
    Syntax(String),
}

struct Builder<'t> {
    tokens: &'t [ExprToken],
    pos: usize,
    nodes: Vec<Node>,
    depth: usize,
}

impl Builder<'_> {
    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn peek_op(&self) -> Option<Lexeme> {
        match self.peek() {
            Some(ExprToken::Op(l)) => Some(*l),
            _ => None,
        }
    }

    fn expect(&mut self, want: Lexeme, what: &str) -> Result<(), BuildError> {
        if self.peek_op() == Some(want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(BuildError::Syntax(format!("expected {what}")))
        }
    }

    fn enter(&mut self) -> Result<(), BuildError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH { Err(BuildError::TooDeep) } else { Ok(()) }
    }

    /// Precedence climbing: parses operators binding at least `min_prec`.
    fn expr(&mut self, min_prec: u8) -> Result<NodeId, BuildError> {
        self.enter()?;
        let mut lhs = self.unary()?;
        loop {
            let Some(lexeme) = self.peek_op() else { break };
            if lexeme == Lexeme::Question {
                if TERNARY_PRECEDENCE < min_prec {
                    break;
                }
                self.pos += 1;
                let then = self.expr(0)?;
                self.expect(Lexeme::Colon, "\":\" in ternary")?;
                let otherwise = self.expr(TERNARY_PRECEDENCE)?;
                lhs = self.push(Node::Ternary(lhs, then, otherwise));
                continue;
            }
            let Some(op) = Op::binary(lexeme) else { break };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let next_min = if op.right_assoc() { prec } else { prec + 1 };
            let rhs = self.expr(next_min)?;
            lhs = self.push(Node::Binary(op, lhs, rhs));
        }
        self.depth -= 1;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<NodeId, BuildError> {
        let Some(tok) = self.peek().cloned() else {
            return Err(BuildError::Syntax("premature end of expression".to_string()));
        };
        self.pos += 1;
        let node = match tok {
            ExprToken::Op(l @ (Lexeme::Minus | Lexeme::Plus | Lexeme::Not | Lexeme::BitNot)) => {
                let op = match l {
                    Lexeme::Minus => Op::Neg,
                    Lexeme::Plus => Op::Plus,
                    Lexeme::Not => Op::Not,
                    _ => Op::BitNot,
                };
                self.enter()?;
                let operand = self.unary()?;
                self.depth -= 1;
                Node::Unary(op, operand)
            }
            ExprToken::Op(Lexeme::LParen) => {
                let inner = self.expr(0)?;
                self.expect(Lexeme::RParen, "\")\"")?;
                return Ok(inner);
            }
            ExprToken::Op(l) => {
                return Err(BuildError::Syntax(format!("unexpected operator {l:?}").to_lowercase()));
            }
            ExprToken::Int(i) => Node::Literal(Obj::from_int(i)),
            ExprToken::Double(d) => Node::Literal(Obj::from_double(d)),
            ExprToken::Braced(o) => Node::Literal(o),
            ExprToken::Var(o) => Node::Var(o),
            ExprToken::DictSugar(o) => Node::DictSugar(o),
            ExprToken::ExprSugar(o) => Node::Sub(o),
            ExprToken::Cmd(o) => Node::Cmd(o),
            ExprToken::Quoted(o) => Node::Quoted(o),
            ExprToken::Word(w) => return self.word(w),
        };
        Ok(self.push(node))
    }

    fn word(&mut self, w: String) -> Result<NodeId, BuildError> {
        if self.peek_op() == Some(Lexeme::LParen) {
            let Some((func, arity)) = Func::lookup(&w) else {
                return Err(BuildError::Syntax(format!("unknown math function \"{w}\"")));
            };
            self.pos += 1;
            let mut args = Vec::new();
            if self.peek_op() == Some(Lexeme::RParen) {
                self.pos += 1;
            } else {
                loop {
                    args.push(self.expr(0)?);
                    match self.peek_op() {
                        Some(Lexeme::Comma) => self.pos += 1,
                        Some(Lexeme::RParen) => {
                            self.pos += 1;
                            break;
                        }
                        _ => return Err(BuildError::Syntax("expected \",\" or \")\"".to_string())),
                    }
                }
            }
            if args.len() != arity {
                let reason = if args.len() < arity { "too few" } else { "too many" };
                return Err(BuildError::Syntax(format!("{reason} arguments for math function \"{w}\"")));
            }
            return Ok(self.push(Node::Func(func, args)));
        }
        let literal = if parse_bool(&w).is_some() {
            Obj::from(w)
        } else if w.eq_ignore_ascii_case("inf") {
            Obj::from_double(f64::INFINITY)
        } else if w.eq_ignore_ascii_case("nan") {
            Obj::from_double(f64::NAN)
        } else {
            return Err(BuildError::Bareword(w));
        };
        Ok(self.push(Node::Literal(literal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(tree: &ExprTree, id: NodeId) -> String {
        match &tree.nodes[id] {
            Node::Literal(o) => o.to_string(),
            Node::Var(o) => format!("${o}"),
            Node::DictSugar(o) => format!("${o}"),
            Node::Sub(o) => format!("$({o})"),
            Node::Cmd(o) => format!("[{o}]"),
            Node::Quoted(o) => format!("\"{o}\""),
            Node::Unary(op, a) => format!("({}{})", op.symbol(), shape(tree, *a)),
            Node::Binary(op, a, b) => format!("({} {} {})", shape(tree, *a), op.symbol(), shape(tree, *b)),
            Node::Ternary(c, a, b) => format!("({} ? {} : {})", shape(tree, *c), shape(tree, *a), shape(tree, *b)),
            Node::Func(f, args) => {
                let args: Vec<String> = args.iter().map(|a| shape(tree, *a)).collect();
                format!("{}({})", f.name(), args.join(","))
            }
        }
    }

    fn parse(src: &str) -> String {
        let tree = ExprTree::compile(src).unwrap_or_else(|e| panic!("{src}: {}", e.value));
        shape(&tree, tree.root)
    }

    fn error(src: &str) -> String {
        ExprTree::compile(src).unwrap_err().value.to_string()
    }

    #[test]
    fn precedence() {
        assert_eq!(parse("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(parse("(1 + 2) * 3"), "((1 + 2) * 3)");
        assert_eq!(parse("1 - 2 - 3"), "((1 - 2) - 3)");
        assert_eq!(parse("1 < 2 && 3 == 3 || 0"), "(((1 < 2) && (3 == 3)) || 0)");
        assert_eq!(parse("1 | 2 ^ 3 & 4"), "(1 | (2 ^ (3 & 4)))");
    }

    #[test]
    fn right_associative() {
        assert_eq!(parse("2 ** 3 ** 2"), "(2 ** (3 ** 2))");
        assert_eq!(parse("$a ? 1 : $b ? 2 : 3"), "($a ? 1 : ($b ? 2 : 3))");
    }

    #[test]
    fn unary_binds_tightest() {
        assert_eq!(parse("-2 ** 2"), "((-2) ** 2)");
        assert_eq!(parse("!$x || ~1"), "((!$x) || (~1))");
        assert_eq!(parse("1 - -1"), "(1 - (-1))");
    }

    #[test]
    fn functions() {
        assert_eq!(parse("sin(0) + atan2(1, 2)"), "(sin(0) + atan2(1,2))");
        assert_eq!(parse("rand()"), "rand()");
        assert!(error("atan2(1)").contains("too few arguments"));
        assert!(error("nosuch(1)").contains("unknown math function"));
    }

    #[test]
    fn literals() {
        assert_eq!(parse("true"), "true");
        assert_eq!(parse("Inf"), "Inf");
        assert_eq!(parse("{a b} eq \"c\""), "(a b eq \"c\")");
    }

    #[test]
    fn errors() {
        assert_eq!(error("foo"), "invalid bareword \"foo\"");
        assert!(error("1 +").starts_with("syntax error in expression: \"1 +\""));
        assert!(error("(1").contains("expected \")\""));
        assert!(error("1 2").contains("extra tokens"));
        assert_eq!(error(""), "empty expression");
    }

    #[test]
    fn depth_limit() {
        let deep = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(error(&deep), "Expressions are too complex");
        let ok = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(parse(&ok), "1");
    }
}
