//! Conditionals and loops.

use super::{Builtin, check_args, get_enum};
use crate::glob::glob_match;
use crate::interp::{Code, EvalResult, Exception, Interp};
use crate::obj::Obj;

pub(super) const COMMANDS: &[(&str, Builtin)] = &[
    ("if", if_cmd),
    ("while", while_cmd),
    ("for", for_cmd),
    ("foreach", foreach),
    ("lmap", lmap),
    ("loop", loop_cmd),
    ("switch", switch),
];

/// What a loop does after one evaluation of its body.
enum Flow {
    Next,
    Break,
}

/// Runs a loop body, absorbing `break` and `continue`.
fn run_body(interp: &mut Interp, body: &Obj) -> EvalResult<Flow> {
    match interp.eval_obj(body) {
        Ok(_) => Ok(Flow::Next),
        Err(e) => match e.code {
            Code::Break => Ok(Flow::Break),
            Code::Continue => Ok(Flow::Next),
            _ => Err(e),
        },
    }
}

fn if_cmd(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let wrong = || Exception::wrong_args(&argv[..1], "condition ?then? trueBody ?elseif ...? ?else? falseBody");
    let mut i = 1;
    loop {
        let cond = argv.get(i).ok_or_else(wrong)?;
        i += 1;
        if argv.get(i).is_some_and(|w| w.as_str() == "then") {
            i += 1;
        }
        let body = argv.get(i).ok_or_else(wrong)?;
        i += 1;
        if interp.eval_expr_bool(cond)? {
            return interp.eval_obj(body);
        }
        let Some(word) = argv.get(i) else {
            return Ok(Obj::empty());
        };
        match word.as_str() {
            "elseif" => i += 1,
            "else" => {
                if i + 2 != argv.len() {
                    return Err(wrong());
                }
                return interp.eval_obj(&argv[i + 1]);
            }
            _ => {
                if i + 1 != argv.len() {
                    return Err(wrong());
                }
                return interp.eval_obj(word);
            }
        }
    }
}

fn while_cmd(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 3, 3, "condition body")?;
    while interp.eval_expr_bool(&argv[1])? {
        if let Flow::Break = run_body(interp, &argv[2])? {
            break;
        }
    }
    Ok(Obj::empty())
}

fn for_cmd(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 5, 5, "start test next body")?;
    interp.eval_obj(&argv[1])?;
    while interp.eval_expr_bool(&argv[2])? {
        if let Flow::Break = run_body(interp, &argv[4])? {
            break;
        }
        if let Flow::Break = run_body(interp, &argv[3])? {
            break;
        }
    }
    Ok(Obj::empty())
}

/// Shared by `foreach` and `lmap`: assigns each round of values and runs
/// the body, handing successful results to `collect`.
fn each(interp: &mut Interp, argv: &[Obj], mut collect: impl FnMut(Obj)) -> EvalResult<()> {
    if argv.len() < 4 || argv.len() % 2 != 0 {
        return Err(Exception::wrong_args(&argv[..1], "varList list ?varList list ...? script"));
    }
    let body = &argv[argv.len() - 1];
    let mut groups = Vec::new();
    for pair in argv[1..argv.len() - 1].chunks_exact(2) {
        let vars = pair[0].list();
        if vars.is_empty() {
            return Err(Exception::error(format!("{} varlist is empty", argv[0])));
        }
        groups.push((vars, pair[1].list()));
    }
    let rounds = groups.iter().map(|(vars, values)| values.len().div_ceil(vars.len())).max().unwrap_or(0);

    for round in 0..rounds {
        for (vars, values) in &groups {
            for (j, var) in vars.iter().enumerate() {
                let value = values.get(round * vars.len() + j).cloned().unwrap_or_default();
                interp.set_var_obj(var, value)?;
            }
        }
        match interp.eval_obj(body) {
            Ok(v) => collect(v),
            Err(e) => match e.code {
                Code::Break => break,
                Code::Continue => {}
                _ => return Err(e),
            },
        }
    }
    Ok(())
}

fn foreach(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    each(interp, argv, |_| {})?;
    Ok(Obj::empty())
}

fn lmap(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let mut out = Vec::new();
    each(interp, argv, |v| out.push(v))?;
    Ok(Obj::from_list(out))
}

fn loop_cmd(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 4, 6, "var ?first? limit ?incr? body")?;
    let (first, limit, step) = match argv.len() {
        4 => (0, argv[2].get_int()?, 1),
        5 => (argv[2].get_int()?, argv[3].get_int()?, 1),
        _ => (argv[2].get_int()?, argv[3].get_int()?, argv[4].get_int()?),
    };
    let var = &argv[1];
    let body = &argv[argv.len() - 1];
    let mut i = first;
    interp.set_var_obj(var, Obj::from_int(i))?;
    while (step > 0 && i < limit) || (step < 0 && i > limit) {
        if let Flow::Break = run_body(interp, body)? {
            break;
        }
        i = i.wrapping_add(step);
        interp.set_var_obj(var, Obj::from_int(i))?;
    }
    Ok(Obj::empty())
}

#[derive(Clone, Copy)]
enum Mode {
    Exact,
    Glob,
    Regexp,
}

fn switch(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let usage = "?options? string pattern body ... ?default body?   or   {pattern body ?pattern body ...?}";
    let mut mode = Mode::Exact;
    let mut command: Option<&Obj> = None;
    let mut i = 1;
    while i < argv.len() {
        let opt = argv[i].as_str();
        if !opt.starts_with('-') {
            break;
        }
        i += 1;
        match opt {
            "--" => break,
            "-command" => {
                command = Some(argv.get(i).ok_or_else(|| Exception::wrong_args(&argv[..1], usage))?);
                i += 1;
            }
            _ => {
                mode = match get_enum(&argv[i - 1], &["-exact", "-glob", "-regexp", "-command"], "option")? {
                    0 => Mode::Exact,
                    1 => Mode::Glob,
                    _ => Mode::Regexp,
                };
            }
        }
    }
    let Some(subject) = argv.get(i) else {
        return Err(Exception::wrong_args(&argv[..1], usage));
    };
    let arms: Vec<Obj> = match &argv[i + 1..] {
        [single] => single.list().to_vec(),
        rest => rest.to_vec(),
    };
    if arms.is_empty() || arms.len() % 2 != 0 {
        return Err(Exception::wrong_args(&argv[..1], usage));
    }

    let last = arms.len() - 2;
    for (n, arm) in arms.chunks_exact(2).enumerate() {
        let pattern = &arm[0];
        let matched = if n * 2 == last && pattern.as_str() == "default" {
            true
        } else if let Some(cmd) = command {
            let mut words = cmd.list().to_vec();
            words.push(pattern.clone());
            words.push(subject.clone());
            interp.eval_list(&words)?.get_int()? != 0
        } else {
            match mode {
                Mode::Exact => pattern.as_str() == subject.as_str(),
                Mode::Glob => glob_match(pattern.as_str(), subject.as_str(), false),
                Mode::Regexp => pattern.regex(false)?.is_match(subject.as_str()),
            }
        };
        if !matched {
            continue;
        }
        // `-` falls through to the next body.
        let body = arms[n * 2 + 1..].iter().step_by(2).find(|b| b.as_str() != "-");
        return match body {
            Some(body) => interp.eval_obj(body),
            None => Err(Exception::error(format!("no body specified for pattern \"{pattern}\""))),
        };
    }
    Ok(Obj::empty())
}
