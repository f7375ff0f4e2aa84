//! Expression evaluation over a compiled [`ExprTree`].

use std::cmp::Ordering;

use super::{ExprTree, Func, Node, NodeId, Op};
use crate::interp::{EvalResult, Exception, Interp, ensure_sufficient_stack};
use crate::obj::{Number, Obj};
use crate::parser::SubstFlags;

impl Interp {
    /// `expr`: evaluates `expr` as an expression.
    pub fn eval_expr(&mut self, expr: &Obj) -> EvalResult {
        let tree = expr.expr_tree()?;
        if let Some(result) = self.fast_path(&tree) {
            return result;
        }
        self.eval_node(&tree, tree.root)
    }

    /// Evaluates a condition for `if`, `while` and `for`.
    pub fn eval_expr_bool(&mut self, expr: &Obj) -> EvalResult<bool> {
        let value = self.eval_expr(expr)?;
        truth(&value)
    }

    /// Shapes common in loop conditions that need no recursion: a single
    /// operand, `!operand`, and comparing two integer operands.
    fn fast_path(&mut self, tree: &ExprTree) -> Option<EvalResult> {
        match &tree.nodes[tree.root] {
            Node::Literal(v) => Some(Ok(v.clone())),
            Node::Var(name) => Some(self.get_var_obj(name)),
            Node::Unary(Op::Not, a) if is_leaf(&tree.nodes[*a]) => Some(
                self.eval_node(tree, *a).and_then(|v| truth(&v)).map(|b| Obj::from_bool(!b)),
            ),
            Node::Binary(op @ (Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::NumEq | Op::NumNe), a, b)
                if is_leaf(&tree.nodes[*a]) && is_leaf(&tree.nodes[*b]) =>
            {
                let lhs = match self.eval_node(tree, *a) {
                    Ok(v) => v,
                    Err(e) => return Some(Err(e)),
                };
                let rhs = match self.eval_node(tree, *b) {
                    Ok(v) => v,
                    Err(e) => return Some(Err(e)),
                };
                let (x, y) = (lhs.as_int()?, rhs.as_int()?);
                Some(Ok(Obj::from_bool(ordering_matches(*op, Some(x.cmp(&y))))))
            }
            _ => None,
        }
    }

    /// Left-leaning chains such as `1+1+...+1` recurse once per operator,
    /// so every level may need more stack.
    fn eval_node(&mut self, tree: &ExprTree, id: NodeId) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_tree_node(tree, id))
    }

    fn eval_tree_node(&mut self, tree: &ExprTree, id: NodeId) -> EvalResult {
        match &tree.nodes[id] {
            Node::Literal(v) => Ok(v.clone()),
            Node::Var(name) => self.get_var_obj(name),
            Node::DictSugar(token) => self.expand_dict_sugar(token),
            Node::Sub(src) => self.eval_expr(src),
            Node::Cmd(script) => self.eval_obj(script),
            Node::Quoted(text) => self.subst_obj(text, SubstFlags::default()),
            Node::Unary(op, a) => {
                let v = self.eval_node(tree, *a)?;
                unary(*op, &v)
            }
            Node::Binary(Op::And, a, b) => {
                let lhs = self.eval_node(tree, *a)?;
                if !truth(&lhs)? {
                    return Ok(Obj::from_bool(false));
                }
                let rhs = self.eval_node(tree, *b)?;
                Ok(Obj::from_bool(truth(&rhs)?))
            }
            Node::Binary(Op::Or, a, b) => {
                let lhs = self.eval_node(tree, *a)?;
                if truth(&lhs)? {
                    return Ok(Obj::from_bool(true));
                }
                let rhs = self.eval_node(tree, *b)?;
                Ok(Obj::from_bool(truth(&rhs)?))
            }
            Node::Binary(op, a, b) => {
                let lhs = self.eval_node(tree, *a)?;
                let rhs = self.eval_node(tree, *b)?;
                binary(*op, &lhs, &rhs)
            }
            Node::Ternary(cond, then, otherwise) => {
                let c = self.eval_node(tree, *cond)?;
                let branch = if truth(&c)? { *then } else { *otherwise };
                self.eval_node(tree, branch)
            }
            Node::Func(func, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_node(tree, *arg)?);
                }
                self.call_func(*func, &values)
            }
        }
    }

    fn call_func(&mut self, func: Func, args: &[Obj]) -> EvalResult {
        let result = match func {
            Func::Int | Func::Wide => match number(func, &args[0])? {
                Number::Int(i) => Number::Int(i),
                Number::Double(d) => Number::Int(d.trunc() as i64),
            },
            Func::Abs => match number(func, &args[0])? {
                Number::Int(i) => Number::Int(i.wrapping_abs()),
                Number::Double(d) => Number::Double(d.abs()),
            },
            Func::Double => Number::Double(to_f64(number(func, &args[0])?)),
            Func::Round => match number(func, &args[0])? {
                Number::Int(i) => Number::Int(i),
                Number::Double(d) if d.round().abs() < i64::MAX as f64 => Number::Int(d.round() as i64),
                Number::Double(d) => Number::Double(d.round()),
            },
            Func::Rand => Number::Double(self.prng().next_double()),
            Func::Srand => {
                let seed = args[0].get_int()?;
                self.reseed(seed as u64);
                Number::Double(self.prng().next_double())
            }
            Func::Atan2 | Func::Pow | Func::Hypot | Func::Fmod => {
                let (x, y) = (args[0].get_double()?, args[1].get_double()?);
                Number::Double(match func {
                    Func::Atan2 => x.atan2(y),
                    Func::Pow => x.powf(y),
                    Func::Hypot => x.hypot(y),
                    _ => x % y,
                })
            }
            _ => {
                let x = args[0].get_double()?;
                Number::Double(match func {
                    Func::Sin => x.sin(),
                    Func::Cos => x.cos(),
                    Func::Tan => x.tan(),
                    Func::Asin => x.asin(),
                    Func::Acos => x.acos(),
                    Func::Atan => x.atan(),
                    Func::Sinh => x.sinh(),
                    Func::Cosh => x.cosh(),
                    Func::Tanh => x.tanh(),
                    Func::Ceil => x.ceil(),
                    Func::Floor => x.floor(),
                    Func::Exp => x.exp(),
                    Func::Log => x.ln(),
                    Func::Log10 => x.log10(),
                    _ => x.sqrt(),
                })
            }
        };
        Ok(Obj::from_number(result))
    }
}

fn is_leaf(node: &Node) -> bool {
    matches!(node, Node::Literal(_) | Node::Var(_))
}

/// The truth value of an operand: non-zero numbers and true booleans.
pub fn truth(v: &Obj) -> EvalResult<bool> {
    match v.as_number() {
        Some(Number::Int(i)) => Ok(i != 0),
        Some(Number::Double(d)) => Ok(d != 0.0),
        None => v.get_bool(),
    }
}

fn to_f64(n: Number) -> f64 {
    match n {
        Number::Int(i) => i as f64,
        Number::Double(d) => d,
    }
}

fn number(func: Func, v: &Obj) -> EvalResult<Number> {
    v.as_number().ok_or_else(|| {
        Exception::error(format!("expected number but got \"{v}\" as argument of {}()", func.name()))
    })
}

fn num_operand(op: Op, v: &Obj) -> EvalResult<Number> {
    v.as_number().ok_or_else(|| {
        let what = if v.is_empty() { "empty string" } else { "non-numeric string" };
        Exception::error(format!("can't use {what} as operand of \"{}\"", op.symbol()))
    })
}

fn int_operand(op: Op, v: &Obj) -> EvalResult<i64> {
    match num_operand(op, v)? {
        Number::Int(i) => Ok(i),
        Number::Double(_) => {
            Err(Exception::error(format!("can't use floating-point value as operand of \"{}\"", op.symbol())))
        }
    }
}

fn divide_by_zero() -> Exception {
    Exception::error("Division by zero").with_error_code("ARITH DIVZERO {divide by zero}")
}

fn unary(op: Op, v: &Obj) -> EvalResult {
    Ok(match op {
        Op::Neg => Obj::from_number(match num_operand(op, v)? {
            Number::Int(i) => Number::Int(i.wrapping_neg()),
            Number::Double(d) => Number::Double(-d),
        }),
        Op::Plus => Obj::from_number(num_operand(op, v)?),
        Op::Not => Obj::from_bool(!truth(v)?),
        _ => Obj::from_int(!int_operand(op, v)?),
    })
}

fn binary(op: Op, a: &Obj, b: &Obj) -> EvalResult {
    match op {
        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow => {
            let (x, y) = (num_operand(op, a)?, num_operand(op, b)?);
            Ok(Obj::from_number(arith(op, x, y)?))
        }
        Op::Mod | Op::Shl | Op::Shr | Op::Rotl | Op::Rotr | Op::BitAnd | Op::BitXor | Op::BitOr => {
            let (x, y) = (int_operand(op, a)?, int_operand(op, b)?);
            Ok(Obj::from_int(int_binary(op, x, y)?))
        }
        Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::NumEq | Op::NumNe => {
            Ok(Obj::from_bool(ordering_matches(op, compare(a, b))))
        }
        Op::StrEq => Ok(Obj::from_bool(a.as_str() == b.as_str())),
        Op::StrNe => Ok(Obj::from_bool(a.as_str() != b.as_str())),
        Op::In | Op::Ni => {
            let found = b.list().iter().any(|e| e.as_str() == a.as_str());
            Ok(Obj::from_bool(found == (op == Op::In)))
        }
        Op::And => Ok(Obj::from_bool(truth(a)? && truth(b)?)),
        Op::Or => Ok(Obj::from_bool(truth(a)? || truth(b)?)),
        Op::Neg | Op::Plus | Op::Not | Op::BitNot => unary(op, b),
    }
}

/// Numeric when both sides are numbers, string comparison otherwise.
/// `None` for comparisons involving NaN.
fn compare(a: &Obj, b: &Obj) -> Option<Ordering> {
    match (a.as_number(), b.as_number()) {
        (Some(Number::Int(x)), Some(Number::Int(y))) => Some(x.cmp(&y)),
        (Some(x), Some(y)) => to_f64(x).partial_cmp(&to_f64(y)),
        _ => Some(a.as_str().cmp(b.as_str())),
    }
}

fn ordering_matches(op: Op, ord: Option<Ordering>) -> bool {
    match op {
        Op::Lt => ord == Some(Ordering::Less),
        Op::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        Op::Gt => ord == Some(Ordering::Greater),
        Op::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        Op::NumEq => ord == Some(Ordering::Equal),
        _ => ord != Some(Ordering::Equal),
    }
}

/// `+ - * / **`; integer when both operands are integers.
pub(crate) fn arith(op: Op, x: Number, y: Number) -> EvalResult<Number> {
    let result = match (x, y) {
        (Number::Int(a), Number::Int(b)) => Number::Int(match op {
            Op::Add => a.wrapping_add(b),
            Op::Sub => a.wrapping_sub(b),
            Op::Mul => a.wrapping_mul(b),
            Op::Div => int_div(a, b)?,
            _ => int_pow(a, b)?,
        }),
        _ => {
            let (a, b) = (to_f64(x), to_f64(y));
            Number::Double(match op {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                Op::Div => a / b,
                _ => a.powf(b),
            })
        }
    };
    Ok(result)
}

/// Division rounding towards negative infinity.
fn int_div(a: i64, b: i64) -> EvalResult<i64> {
    if b == 0 {
        return Err(divide_by_zero());
    }
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) { Ok(q - 1) } else { Ok(q) }
}

/// Remainder with the sign of the divisor.
fn int_mod(a: i64, b: i64) -> EvalResult<i64> {
    if b == 0 {
        return Err(divide_by_zero());
    }
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) { Ok(r + b) } else { Ok(r) }
}

fn int_pow(base: i64, exp: i64) -> EvalResult<i64> {
    if exp < 0 {
        return match base {
            0 => Err(Exception::error("exponentiation of zero by negative power")),
            1 => Ok(1),
            -1 => Ok(if exp % 2 == 0 { 1 } else { -1 }),
            _ => Ok(0),
        };
    }
    let (mut result, mut b, mut e) = (1i64, base, exp as u64);
    while e > 0 {
        if e & 1 == 1 {
            result = result.wrapping_mul(b);
        }
        b = b.wrapping_mul(b);
        e >>= 1;
    }
    Ok(result)
}

fn int_binary(op: Op, a: i64, b: i64) -> EvalResult<i64> {
    if matches!(op, Op::Shl | Op::Shr) && b < 0 {
        return Err(Exception::error("negative shift argument"));
    }
    Ok(match op {
        Op::Mod => int_mod(a, b)?,
        Op::Shl if b >= 64 => 0,
        Op::Shl => a << b,
        Op::Shr if b >= 64 => {
            if a < 0 {
                -1
            } else {
                0
            }
        }
        Op::Shr => a >> b,
        Op::Rotl => a.rotate_left(b.rem_euclid(64) as u32),
        Op::Rotr => a.rotate_right(b.rem_euclid(64) as u32),
        Op::BitAnd => a & b,
        Op::BitXor => a ^ b,
        _ => a | b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Config;

    fn expr(src: &str) -> String {
        let mut interp = Interp::new();
        match interp.eval_expr(&Obj::from(src)) {
            Ok(v) => v.to_string(),
            Err(e) => format!("error: {}", e.value),
        }
    }

    #[test]
    fn arithmetic() {
        assert_eq!(expr("1 + 2 * 3"), "7");
        assert_eq!(expr("(1 + 2) * 3"), "9");
        assert_eq!(expr("7 / 2"), "3");
        assert_eq!(expr("-7 / 2"), "-4");
        assert_eq!(expr("-7 % 2"), "1");
        assert_eq!(expr("7 % -2"), "-1");
        assert_eq!(expr("7.0 / 2"), "3.5");
        assert_eq!(expr("1 / 0.0"), "Inf");
        assert_eq!(expr("0x10 + 0b11"), "19");
    }

    #[test]
    fn long_operator_chains() {
        let sum = format!("{}1", "1+".repeat(5000));
        assert_eq!(expr(&sum), "5001");
        let mut interp = Interp::new();
        let r = interp.eval(&format!("expr {{{sum}}}")).unwrap();
        assert_eq!(r.as_str(), "5001");
        let ands = format!("{}1", "1 && ".repeat(3000));
        assert_eq!(expr(&ands), "1");
    }

    #[test]
    fn division_by_zero() {
        let mut interp = Interp::new();
        let e = interp.eval_expr(&Obj::from("1 / 0")).unwrap_err();
        assert_eq!(e.value.as_str(), "Division by zero");
        assert_eq!(e.error_code.unwrap().as_str(), "ARITH DIVZERO {divide by zero}");
        assert_eq!(expr("5 % 0"), "error: Division by zero");
    }

    #[test]
    fn powers() {
        assert_eq!(expr("2 ** 10"), "1024");
        assert_eq!(expr("2 ** -1"), "0");
        assert_eq!(expr("-1 ** -3"), "-1");
        assert_eq!(expr("0 ** -1"), "error: exponentiation of zero by negative power");
        assert_eq!(expr("2.0 ** 2"), "4.0");
    }

    #[test]
    fn shifts() {
        assert_eq!(expr("1 << 4"), "16");
        assert_eq!(expr("-16 >> 2"), "-4");
        assert_eq!(expr("1 << 64"), "0");
        assert_eq!(expr("-1 >> 70"), "-1");
        assert_eq!(expr("1 << -1"), "error: negative shift argument");
        assert_eq!(expr("1 <<< 65"), "2");
    }

    #[test]
    fn comparisons_fall_back_to_strings() {
        assert_eq!(expr("\"abc\" < \"abd\""), "1");
        assert_eq!(expr("10 < 9"), "0");
        assert_eq!(expr("\"10\" < \"9\""), "0");
        assert_eq!(expr("1.5 == 1.5"), "1");
        assert_eq!(expr("{a} == {a}"), "1");
        assert_eq!(expr("\"a\" eq \"a\""), "1");
        assert_eq!(expr("2 in {1 2 3}"), "1");
        assert_eq!(expr("4 ni {1 2 3}"), "1");
    }

    #[test]
    fn operand_errors() {
        assert_eq!(expr("\"x\" + 1"), "error: can't use non-numeric string as operand of \"+\"");
        assert_eq!(expr("{} + 1"), "error: can't use empty string as operand of \"+\"");
        assert_eq!(expr("1.5 % 1"), "error: can't use floating-point value as operand of \"%\"");
    }

    #[test]
    fn logic_short_circuits() {
        let mut interp = Interp::new();
        let r = interp.eval_expr(&Obj::from("0 && [error boom]")).unwrap();
        assert_eq!(r.as_str(), "0");
        let r = interp.eval_expr(&Obj::from("1 || [error boom]")).unwrap();
        assert_eq!(r.as_str(), "1");
        assert_eq!(expr("true && yes"), "1");
        assert_eq!(expr("!0"), "1");
        assert_eq!(expr("1 ? \"a\" : \"b\""), "a");
    }

    #[test]
    fn functions() {
        assert_eq!(expr("int(3.7)"), "3");
        assert_eq!(expr("int(-3.7)"), "-3");
        assert_eq!(expr("round(2.5)"), "3");
        assert_eq!(expr("round(-2.5)"), "-3");
        assert_eq!(expr("abs(-4)"), "4");
        assert_eq!(expr("double(2)"), "2.0");
        assert_eq!(expr("floor(2.5)"), "2.0");
        assert_eq!(expr("fmod(7, 3)"), "1.0");
    }

    #[test]
    fn seeded_rand_is_repeatable() {
        let mut a = Interp::with_config(Config::default().rand_seed(9));
        let mut b = Interp::with_config(Config::default().rand_seed(9));
        let x = a.eval_expr(&Obj::from("rand()")).unwrap();
        let y = b.eval_expr(&Obj::from("rand()")).unwrap();
        assert_eq!(x, y);
        let s1 = a.eval_expr(&Obj::from("srand(5)")).unwrap();
        let s2 = b.eval_expr(&Obj::from("srand(5)")).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn variables_and_commands() {
        let mut interp = Interp::new();
        interp.set_var("x", "4").unwrap();
        let r = interp.eval_expr(&Obj::from("$x * [set x]")).unwrap();
        assert_eq!(r.as_str(), "16");
        let r = interp.eval_expr(&Obj::from("$x < 5")).unwrap();
        assert_eq!(r.as_str(), "1");
        let r = interp.eval_expr(&Obj::from("\"v=$x\"")).unwrap();
        assert_eq!(r.as_str(), "v=4");
    }
}
