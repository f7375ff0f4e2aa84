//! Variables, evaluation, procedures and completion codes.

use std::rc::Rc;
use std::time::Instant;

use super::{Builtin, check_args, concat, get_enum};
use crate::expr::Op;
use crate::expr::eval::arith;
use crate::interp::command::{CommandKind, Proc};
use crate::interp::{Code, EvalResult, Exception, Interp};
use crate::obj::{Number, Obj};
use crate::parser::SubstFlags;

pub(super) const COMMANDS: &[(&str, Builtin)] = &[
    ("set", set),
    ("unset", unset),
    ("incr", incr),
    ("append", append),
    ("concat", concat_cmd),
    ("eval", eval),
    ("uplevel", uplevel),
    ("upvar", upvar),
    ("global", global),
    ("apply", apply),
    ("proc", proc),
    ("rename", rename),
    ("return", return_cmd),
    ("break", break_cmd),
    ("continue", continue_cmd),
    ("tailcall", tailcall),
    ("local", local),
    ("upcall", upcall),
    ("error", error),
    ("catch", catch),
    ("exit", exit),
    ("time", time),
    ("subst", subst),
    ("exists", exists),
    ("expr", expr),
    ("alias", alias),
    ("source", source),
    ("env", env),
    ("rand", rand),
    ("defer", defer),
    ("+", add),
    ("*", mul),
    ("-", sub),
    ("/", div),
];

fn set(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 3, "varName ?newValue?")?;
    if argv.len() == 2 {
        return interp.get_var_obj(&argv[1]);
    }
    interp.set_var_obj(&argv[1], argv[2].clone())?;
    Ok(argv[2].clone())
}

fn unset(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let mut i = 1;
    let mut complain = true;
    while i < argv.len() {
        match argv[i].as_str() {
            "--" => {
                i += 1;
                break;
            }
            "-nocomplain" => {
                complain = false;
                i += 1;
            }
            _ => break,
        }
    }
    for name in &argv[i..] {
        if let Err(e) = interp.unset_var_obj(name) {
            if complain {
                return Err(e);
            }
        }
    }
    Ok(Obj::empty())
}

fn incr(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 3, "varName ?increment?")?;
    let by = match argv.get(2) {
        Some(v) => v.get_int()?,
        None => 1,
    };
    interp.incr_var(&argv[1], by)
}

fn append(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "varName ?value ...?")?;
    if argv.len() == 2 {
        return interp.get_var_obj(&argv[1]);
    }
    interp.modify_var(&argv[1], |value| {
        for piece in &argv[2..] {
            value.append_str(piece.as_str());
        }
        Ok(value.clone())
    })
}

fn concat_cmd(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    Ok(concat(&argv[1..]))
}

/// One argument is evaluated as is; several are joined with `concat`.
fn script_arg(args: &[Obj]) -> Obj {
    if args.len() == 1 { args[0].clone() } else { concat(args) }
}

fn eval(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "arg ?arg ...?")?;
    interp.eval_obj(&script_arg(&argv[1..]))
}

fn uplevel(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let mut rest = &argv[1..];
    let explicit = rest.first().filter(|a| a.as_str().starts_with(|c: char| c.is_ascii_digit() || c == '#'));
    let frame = match explicit {
        Some(level) => {
            let frame = interp.frame_by_level(Some(level))?;
            rest = &rest[1..];
            frame
        }
        None => interp.frame_by_level(None)?,
    };
    if rest.is_empty() {
        return Err(Exception::wrong_args(&argv[..1], "?level? command ?arg ...?"));
    }
    interp.eval_in_frame(frame, &script_arg(rest))
}

fn upvar(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let mut rest = &argv[1..];
    let frame = if argv.len() > 3 && argv.len() % 2 == 0 {
        let frame = interp.frame_by_level(Some(&argv[1]))?;
        rest = &rest[1..];
        frame
    } else {
        interp.frame_by_level(None)?
    };
    if rest.len() < 2 {
        return Err(Exception::wrong_args(&argv[..1], "?level? otherVar localVar ?otherVar localVar ...?"));
    }
    for pair in rest.chunks(2) {
        if let [other, local] = pair {
            interp.link_var_in(local, other, Rc::clone(&frame))?;
        }
    }
    Ok(Obj::empty())
}

fn global(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "varName ?varName ...?")?;
    if interp.frame.is_top() {
        return Ok(Obj::empty());
    }
    let top = interp.top_frame();
    for name in &argv[1..] {
        if !name.as_str().starts_with("::") {
            interp.link_var_in(name, name, Rc::clone(&top))?;
        }
    }
    Ok(Obj::empty())
}

fn apply(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "lambdaExpr ?arg ...?")?;
    let lambda = argv[1].list();
    if lambda.len() != 2 && lambda.len() != 3 {
        return Err(Exception::error(format!("can't interpret \"{}\" as a lambda expression", argv[1])));
    }
    let proc = Rc::new(Proc::new(interp, lambda[0].clone(), None, lambda[1].clone())?);
    let mut words = Vec::with_capacity(argv.len() - 1);
    words.push(Obj::from("apply lambdaExpr"));
    words.extend_from_slice(&argv[2..]);
    interp.call_proc(&proc, &words)
}

fn proc(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 4, 5, "name arglist ?statics? body")?;
    let (statics, body) = match argv.len() {
        4 => (None, &argv[3]),
        _ => (Some(&argv[3]), &argv[4]),
    };
    let proc = Proc::new(interp, argv[2].clone(), statics, body.clone())?;
    interp.create_proc(&argv[1], proc);
    Ok(argv[1].clone())
}

fn rename(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 3, 3, "oldName newName")?;
    interp.rename_command(argv[1].as_str(), argv[2].as_str())?;
    Ok(Obj::empty())
}

fn return_cmd(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let mut code = Code::Ok;
    let mut level = 1i64;
    let mut error_info = None;
    let mut error_code = None;
    let mut i = 1;
    while i + 1 < argv.len() {
        match argv[i].as_str() {
            "-code" => code = argv[i + 1].get_code()?,
            "-errorinfo" => error_info = Some(argv[i + 1].clone()),
            "-errorcode" => error_code = Some(argv[i + 1].clone()),
            "-level" => {
                level = argv[i + 1]
                    .as_int()
                    .filter(|l| *l >= 0)
                    .ok_or_else(|| Exception::error(format!("bad level \"{}\"", argv[i + 1])))?;
            }
            _ => break,
        }
        i += 2;
    }
    if i + 1 != argv.len() && i != argv.len() {
        return Err(Exception::wrong_args(
            &argv[..1],
            "?-code code? ?-errorinfo stacktrace? ?-level level? ?result?",
        ));
    }
    if code == Code::Error {
        if let Some(trace) = &error_info {
            interp.set_stack_trace(trace);
        }
        if let Some(ec) = &error_code {
            interp.set_global_var("errorCode", ec.clone())?;
        }
    }
    let value = argv.get(i).cloned().unwrap_or_default();
    if level == 0 {
        return match code {
            Code::Ok => Ok(value),
            _ => Err(Exception { error_code, ..Exception::new(code, value) }),
        };
    }
    Err(Exception {
        level: level as i32,
        return_code: code,
        error_code,
        ..Exception::new(Code::Return, value)
    })
}

fn break_cmd(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 1, 1, "")?;
    Err(Exception::brk())
}

fn continue_cmd(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 1, 1, "")?;
    Err(Exception::cont())
}

fn tailcall(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    interp.request_tailcall(&argv[1..])
}

fn local(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "cmd ?args ...?")?;
    interp.eval_local(&argv[1..])
}

fn upcall(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "cmd ?args ...?")?;
    interp.eval_upcall(&argv[1..])
}

fn error(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 3, "message ?stacktrace?")?;
    if let Some(trace) = argv.get(2) {
        interp.set_stack_trace(trace);
    }
    Err(Exception::error(argv[1].clone()))
}

fn catch(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let usage = "?-?no?code ... --? script ?resultVarName? ?optionVarName?";
    let bit = |code: Code| 1u64.checked_shl(code.as_i32() as u32).unwrap_or(0);
    let mut pass_through = bit(Code::Exit) | bit(Code::Eval) | bit(Code::Signal);
    let mut i = 1;
    while i < argv.len().saturating_sub(1) {
        let arg = argv[i].as_str();
        if arg == "--" {
            i += 1;
            break;
        }
        let Some(opt) = arg.strip_prefix('-') else { break };
        let (ignore, name) = match opt.strip_prefix("no") {
            Some(rest) => (true, rest),
            None => (false, opt),
        };
        let code = Code::parse(&Obj::from(name))
            .filter(|c| (0..64).contains(&c.as_i32()))
            .ok_or_else(|| Exception::wrong_args(&argv[..1], usage))?;
        if ignore {
            pass_through |= bit(code);
        } else {
            pass_through &= !bit(code);
        }
        i += 1;
    }
    let rest = &argv[i..];
    if rest.is_empty() || rest.len() > 3 {
        return Err(Exception::wrong_args(&argv[..1], usage));
    }

    interp.set_global_var("errorCode", "NONE")?;
    let outcome = interp.eval_obj(&rest[0]);
    interp.error_flag = false;

    let (code, value, exception) = match outcome {
        Ok(v) => (Code::Ok, v, None),
        Err(e) => (e.code, e.value.clone(), Some(e)),
    };
    if let Some(e) = &exception {
        if bit(code) & pass_through != 0 {
            return Err(e.clone());
        }
        if let (Code::Error, Some(ec)) = (code, &e.error_code) {
            interp.set_global_var("errorCode", ec.clone())?;
        }
    }

    if let Some(var) = rest.get(1) {
        interp.set_var_obj(var, value)?;
    }
    if let Some(var) = rest.get(2) {
        let (reported, level) = match &exception {
            Some(e) if e.code == Code::Return => (e.return_code, e.level),
            _ => (code, 0),
        };
        let mut opts = vec![
            Obj::from("-code"),
            Obj::from_int(reported.as_i32() as i64),
            Obj::from("-level"),
            Obj::from_int(level as i64),
        ];
        if code == Code::Error {
            opts.push(Obj::from("-errorinfo"));
            opts.push(interp.stack_trace_obj());
            if let Ok(ec) = interp.get_global_var("errorCode") {
                opts.push(Obj::from("-errorcode"));
                opts.push(ec);
            }
        }
        interp.set_var_obj(var, Obj::from_list(opts))?;
    }
    Ok(Obj::from_int(code.as_i32() as i64))
}

fn exit(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 1, 2, "?exitCode?")?;
    let code = match argv.get(1) {
        Some(c) => c.get_int()?,
        None => 0,
    };
    interp.exit_code = code as i32;
    Err(Exception::new(Code::Exit, Obj::from_int(code)))
}

fn time(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 3, "script ?count?")?;
    let count = match argv.get(2) {
        Some(c) => c.get_int()?,
        None => 1,
    };
    if count < 1 {
        return Ok(Obj::empty());
    }
    let start = Instant::now();
    for _ in 0..count {
        interp.eval_obj(&argv[1])?;
    }
    let per = start.elapsed().as_micros() / count as u128;
    Ok(Obj::new(format!("{per} microseconds per iteration")))
}

fn subst(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "?options? string")?;
    let mut flags = SubstFlags::default();
    for opt in &argv[1..argv.len() - 1] {
        match get_enum(opt, &["-nobackslashes", "-nocommands", "-novariables"], "option")? {
            0 => flags.no_backslashes = true,
            1 => flags.no_commands = true,
            _ => flags.no_variables = true,
        }
    }
    interp.subst_obj(&argv[argv.len() - 1], flags)
}

fn exists(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 3, "?option? name")?;
    let (option, name) = match argv.len() {
        2 => (3, &argv[1]),
        _ => (get_enum(&argv[1], &["-command", "-proc", "-alias", "-var"], "option")?, &argv[2]),
    };
    let found = match option {
        3 => interp.var_exists(name),
        _ => match interp.get_command(name.as_str()) {
            None => false,
            Some(cmd) => match option {
                0 => true,
                1 => cmd.is_proc(),
                _ => matches!(cmd.kind, CommandKind::Alias(_)),
            },
        },
    };
    Ok(Obj::from_bool(found))
}

fn expr(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "expression ?...?")?;
    interp.eval_expr(&script_arg(&argv[1..]))
}

fn alias(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 3, usize::MAX, "newname command ?args ...?")?;
    interp.create_alias(&argv[1], Obj::from_list(argv[2..].to_vec()));
    Ok(argv[1].clone())
}

fn source(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 2, "fileName")?;
    interp.eval_file(argv[1].as_str())
}

fn env(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 1, 3, "varName ?default?")?;
    let Some(name) = argv.get(1) else {
        let mut pairs = Vec::new();
        for (k, v) in std::env::vars() {
            pairs.push(Obj::from(k));
            pairs.push(Obj::from(v));
        }
        return Ok(Obj::from_list(pairs));
    };
    match std::env::var(name.as_str()) {
        Ok(v) => Ok(Obj::from(v)),
        Err(_) => argv
            .get(2)
            .cloned()
            .ok_or_else(|| Exception::error(format!("environment variable \"{name}\" does not exist"))),
    }
}

fn rand(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 1, 3, "?min? max")?;
    let (min, max) = match argv.len() {
        1 => (0, i64::MAX),
        2 => (0, argv[1].get_int()?),
        _ => (argv[1].get_int()?, argv[2].get_int()?),
    };
    if max < min {
        return Err(Exception::error("Invalid arguments (max < min)"));
    }
    Ok(Obj::from_int(interp.prng().range(min, max)))
}

fn defer(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 2, "script")?;
    let script = argv[1].clone();
    interp.modify_var(&Obj::from(crate::interp::DEFER_VAR), |list| {
        list.modify_list(|items| items.push(script));
        Ok(Obj::empty())
    })
}

fn number_arg(v: &Obj) -> EvalResult<Number> {
    v.as_number().ok_or_else(|| Exception::error(format!("expected number but got \"{v}\"")))
}

/// `+` and `*`: integer while every argument is an integer.
fn fold(argv: &[Obj], op: Op, start: i64) -> EvalResult {
    let mut acc = Number::Int(start);
    for arg in &argv[1..] {
        acc = arith(op, acc, number_arg(arg)?)?;
    }
    Ok(Obj::from_number(acc))
}

fn add(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    fold(argv, Op::Add, 0)
}

fn mul(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    fold(argv, Op::Mul, 1)
}

/// `-` and `/`: with one argument, negation and reciprocal.
fn sub_div(argv: &[Obj], op: Op) -> EvalResult {
    check_args(argv, 2, usize::MAX, "number ?number ... number?")?;
    let first = number_arg(&argv[1])?;
    if argv.len() == 2 {
        return Ok(Obj::from_number(match (op, first) {
            (Op::Sub, _) => arith(Op::Sub, Number::Int(0), first)?,
            (_, Number::Int(i)) => Number::Double(1.0 / i as f64),
            (_, Number::Double(d)) => Number::Double(1.0 / d),
        }));
    }
    let mut acc = first;
    for arg in &argv[2..] {
        let n = number_arg(arg)?;
        acc = match (op, acc, n) {
            (Op::Div, Number::Int(a), Number::Int(b)) => {
                if b == 0 {
                    return Err(Exception::error("Division by zero"));
                }
                Number::Int(a.wrapping_div(b))
            }
            _ => arith(op, acc, n)?,
        };
    }
    Ok(Obj::from_number(acc))
}

fn sub(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_div(argv, Op::Sub)
}

fn div(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_div(argv, Op::Div)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Result<String, String> {
        let mut interp = Interp::new();
        interp.eval(src).map(|v| v.to_string()).map_err(|e| e.value.to_string())
    }

    fn ok(src: &str) -> String {
        run(src).unwrap_or_else(|e| panic!("{src}: {e}"))
    }

    #[test]
    fn set_append_incr() {
        assert_eq!(ok("set a 1; append a 2 3; set a"), "123");
        assert_eq!(ok("incr b; incr b 5"), "6");
        assert_eq!(run("set nope").unwrap_err(), "can't read \"nope\": no such variable");
        assert_eq!(run("set").unwrap_err(), "wrong # args: should be \"set varName ?newValue?\"");
        assert_eq!(ok("unset -nocomplain nope; set ok 1"), "1");
    }

    #[test]
    fn catch_codes_and_options() {
        assert_eq!(ok("catch {error boom} msg"), "1");
        assert_eq!(ok("catch {error boom} msg; set msg"), "boom");
        assert_eq!(ok("catch {break}"), "3");
        assert_eq!(ok("catch {return -code 5 x} r o; dict get $o -code"), "5");
        assert_eq!(ok("catch {expr {1/0}} m o; dict get $o -errorcode"), "ARITH DIVZERO {divide by zero}");
        assert_eq!(ok("catch {error x} m o; dict get $o -level"), "0");
        assert!(run("catch {exit 3}").is_err());
        assert_eq!(ok("catch -exit {exit 3}"), "6");
        assert_eq!(ok("catch -nobreak {set x 1}"), "0");
        assert_eq!(run("catch -nobreak {break}").unwrap_err(), "");
    }

    #[test]
    fn return_options() {
        assert_eq!(ok("proc p {} {return -code break}; catch p"), "3");
        assert_eq!(ok("proc p {} {return -level 2 x}; proc q {} {p; return y}; q"), "x");
        assert_eq!(ok("proc p {} {return -code error -errorcode {MY CODE} oops}; catch p m o; list $m $::errorCode"), "oops {MY CODE}");
        assert_eq!(run("return -level -1 x").unwrap_err(), "bad level \"-1\"");
    }

    #[test]
    fn uplevel_upvar_global() {
        assert_eq!(ok("proc setter {} {uplevel 1 {set v 5}}; setter; set v"), "5");
        assert_eq!(ok("proc ref {name} {upvar $name x; set x 7}; ref w; set w"), "7");
        assert_eq!(ok("set g 1; proc bump {} {global g; incr g}; bump; set g"), "2");
        assert_eq!(ok("global anything"), "");
    }

    #[test]
    fn apply_and_alias() {
        assert_eq!(ok("apply {{a b} {expr {$a + $b}}} 2 3"), "5");
        assert_eq!(run("apply {x}").unwrap_err(), "can't interpret \"x\" as a lambda expression");
        assert_eq!(ok("alias add3 + 3; add3 4"), "7");
        assert_eq!(ok("alias l list a; exists -alias l"), "1");
    }

    #[test]
    fn exists_options() {
        assert_eq!(ok("set a 1; exists a"), "1");
        assert_eq!(ok("exists nope"), "0");
        assert_eq!(ok("proc p {} {}; list [exists -proc p] [exists -command set] [exists -proc set]"), "1 1 0");
    }

    #[test]
    fn math_commands() {
        assert_eq!(ok("+ 1 2 3"), "6");
        assert_eq!(ok("+"), "0");
        assert_eq!(ok("* 2 2.5"), "5.0");
        assert_eq!(ok("- 5"), "-5");
        assert_eq!(ok("- 10 1 2"), "7");
        assert_eq!(ok("/ 2"), "0.5");
        assert_eq!(ok("/ 7 2"), "3");
        assert_eq!(run("/ 1 0").unwrap_err(), "Division by zero");
        assert_eq!(run("+ 1 x").unwrap_err(), "expected number but got \"x\"");
    }

    #[test]
    fn subst_options() {
        assert_eq!(ok("set x 1; subst -novariables {$x [set x]}"), "$x 1");
        assert!(run("subst -bogus x").unwrap_err().starts_with("bad option \"-bogus\""));
    }

    #[test]
    fn rand_ranges() {
        let mut interp = Interp::with_config(crate::interp::Config::default().rand_seed(1));
        for _ in 0..50 {
            let v = interp.eval("rand 3 6").unwrap().as_int().unwrap();
            assert!((3..6).contains(&v));
        }
        assert_eq!(run("rand 5 1").unwrap_err(), "Invalid arguments (max < min)");
    }

    #[test]
    fn env_lookup() {
        assert_eq!(ok("env JIM_SURELY_UNSET_VARIABLE fallback"), "fallback");
        assert!(run("env JIM_SURELY_UNSET_VARIABLE").is_err());
    }

    #[test]
    fn time_reports_microseconds() {
        assert!(ok("time {set x 1} 10").ends_with("microseconds per iteration"));
    }
}
