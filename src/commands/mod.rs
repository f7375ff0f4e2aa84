//! Built-in commands.
//!
//! Each submodule exposes a `COMMANDS` table of `(name, function)` pairs
//! that [`register`] installs into a fresh interpreter.

mod base;
mod control;
mod dict;
pub mod format;
mod info;
mod list;
mod string;

use crate::interp::{EvalResult, Exception, Interp};
use crate::obj::Obj;

pub(crate) type Builtin = fn(&mut Interp, &[Obj]) -> EvalResult;

pub(crate) fn register(interp: &mut Interp) {
    let tables: [&[(&str, Builtin)]; 7] = [
        base::COMMANDS,
        control::COMMANDS,
        list::COMMANDS,
        dict::COMMANDS,
        string::COMMANDS,
        format::COMMANDS,
        info::COMMANDS,
    ];
    for table in tables {
        for &(name, f) in table {
            interp.create_command(name, f);
        }
    }
}

/// Fails with the usage message unless `min <= argv.len() <= max`.
pub(crate) fn check_args(argv: &[Obj], min: usize, max: usize, usage: &str) -> EvalResult<()> {
    if argv.len() < min || argv.len() > max {
        return Err(Exception::wrong_args(&argv[..1], usage));
    }
    Ok(())
}

/// Matches `obj` against `names`, accepting a unique prefix.
pub(crate) fn get_enum(obj: &Obj, names: &[&str], what: &str) -> EvalResult<usize> {
    let s = obj.as_str();
    if let Some(i) = names.iter().position(|n| *n == s) {
        return Ok(i);
    }
    let mut matches = names.iter().enumerate().filter(|(_, n)| !s.is_empty() && n.starts_with(s));
    let first = matches.next();
    let ambiguous = matches.next().is_some();
    match first {
        Some((i, _)) if !ambiguous => Ok(i),
        _ => {
            let kind = if ambiguous { "ambiguous" } else { "bad" };
            Err(Exception::error(format!("{kind} {what} \"{s}\": must be {}", join_choices(names))))
        }
    }
}

/// `a, b, or c`.
pub(crate) fn join_choices(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [one] => (*one).to_string(),
        [rest @ .., last] => format!("{}, or {last}", rest.join(", ")),
    }
}

/// Joins the arguments with single spaces after trimming each, skipping
/// the empty ones.
pub(crate) fn concat(args: &[Obj]) -> Obj {
    let mut out = String::new();
    for arg in args {
        let s = arg.as_str().trim_matches(crate::obj::number::is_space);
        if s.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(s);
    }
    Obj::new(out)
}
