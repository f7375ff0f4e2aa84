//! The `info` ensemble: introspection of commands, procedures, variables
//! and the call stack.

use std::rc::Rc;

use super::{Builtin, get_enum};
use crate::glob::glob_match;
use crate::interp::command::{Command, CommandKind, Proc};
use crate::interp::frame::{CallFrame, Var};
use crate::interp::{Code, EvalResult, Exception, Interp, VERSION};
use crate::obj::Obj;
use crate::parser::{Missing, script_missing};

pub(super) const COMMANDS: &[(&str, Builtin)] = &[("info", info)];

const SUBCOMMANDS: &[(&str, Builtin)] = &[
    ("alias", alias),
    ("args", args),
    ("body", body),
    ("cmdtype", cmdtype),
    ("commands", commands),
    ("complete", complete),
    ("exists", exists),
    ("frame", frame),
    ("globals", globals),
    ("level", level),
    ("locals", locals),
    ("patchlevel", version),
    ("procs", procs),
    ("returncodes", returncodes),
    ("script", script),
    ("source", source),
    ("stacktrace", stacktrace),
    ("statics", statics),
    ("vars", vars),
    ("version", version),
];

fn info(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    if argv.len() < 2 {
        return Err(Exception::wrong_args(&argv[..1], "subcommand ?arg ...?"));
    }
    let names: Vec<&str> = SUBCOMMANDS.iter().map(|(name, _)| *name).collect();
    let which = get_enum(&argv[1], &names, "subcommand")?;
    (SUBCOMMANDS[which].1)(interp, argv)
}

fn sub_args(argv: &[Obj], min: usize, max: usize, usage: &str) -> EvalResult<()> {
    if argv.len() < min || argv.len() > max {
        return Err(Exception::wrong_args(&argv[..2], usage));
    }
    Ok(())
}

fn command(interp: &Interp, name: &Obj) -> EvalResult<Rc<Command>> {
    interp
        .get_command(name.as_str())
        .ok_or_else(|| Exception::error(format!("invalid command name \"{name}\"")))
}

fn procedure(interp: &Interp, name: &Obj) -> EvalResult<Rc<Proc>> {
    command(interp, name)?
        .as_proc()
        .cloned()
        .ok_or_else(|| Exception::error(format!("command \"{name}\" is not a procedure")))
}

fn filtered(names: impl IntoIterator<Item = Obj>, pattern: Option<&Obj>) -> Obj {
    let mut out: Vec<Obj> = names
        .into_iter()
        .filter(|n| pattern.is_none_or(|p| glob_match(p.as_str(), n.as_str(), false)))
        .collect();
    out.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    Obj::from_list(out)
}

fn alias(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "command")?;
    match &command(interp, &argv[2])?.kind {
        CommandKind::Alias(target) => Ok(target.clone()),
        _ => Err(Exception::error(format!("command \"{}\" is not an alias", argv[2]))),
    }
}

fn args(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "procname")?;
    Ok(procedure(interp, &argv[2])?.arg_list.clone())
}

fn body(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "procname")?;
    Ok(procedure(interp, &argv[2])?.body.clone())
}

fn statics(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "procname")?;
    let proc = procedure(interp, &argv[2])?;
    let mut out = Vec::new();
    if let Some(table) = &proc.statics {
        for (name, slot) in table.borrow().iter() {
            if let Var::Value(v) = &*slot.borrow() {
                out.push(Obj::from(&**name));
                out.push(v.clone());
            }
        }
    }
    Ok(Obj::from_list(out))
}

fn cmdtype(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "command")?;
    Ok(Obj::from(command(interp, &argv[2])?.type_name()))
}

fn commands(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 2, 3, "?pattern?")?;
    let names = interp.command_names().into_iter().map(|(name, _)| name);
    Ok(filtered(names, argv.get(2)))
}

fn procs(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 2, 3, "?pattern?")?;
    let names = interp.command_names().into_iter().filter(|(_, cmd)| cmd.is_proc()).map(|(name, _)| name);
    Ok(filtered(names, argv.get(2)))
}

fn complete(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 4, "script ?missing?")?;
    let (missing, _) = script_missing(argv[2].as_str());
    if let Some(var) = argv.get(3) {
        interp.set_var_obj(var, Obj::new(missing.as_char().to_string()))?;
    }
    Ok(Obj::from_bool(missing == Missing::None))
}

fn exists(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "varName")?;
    Ok(Obj::from_bool(interp.var_exists(&argv[2])))
}

fn frame_at(interp: &Interp, level: &Obj) -> EvalResult<Rc<CallFrame>> {
    let n = level.get_int()?;
    interp.frame_by_integer(n).ok_or_else(|| Exception::error(format!("bad level \"{level}\"")))
}

fn level(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 2, 3, "?levelNum?")?;
    match argv.get(2) {
        None => Ok(Obj::from_int(interp.frame.level as i64)),
        Some(n) => Ok(Obj::from_list(frame_at(interp, n)?.argv.clone())),
    }
}

/// `info frame n`: a dict describing the frame and the call that made it.
fn frame(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 2, 3, "?levelNum?")?;
    let Some(n) = argv.get(2) else {
        return Ok(Obj::from_int(interp.frame.level as i64));
    };
    let frame = frame_at(interp, n)?;
    let (file, line) = if frame.is_top() {
        (interp.current_file.clone(), interp.current_line)
    } else {
        (frame.file.clone(), frame.line)
    };
    let proc_name = frame.argv.first().cloned().unwrap_or_default();
    let entries = vec![
        Obj::from("cmd"),
        Obj::from_list(frame.argv.clone()),
        Obj::from("proc"),
        proc_name,
        Obj::from("file"),
        file,
        Obj::from("line"),
        Obj::from_int(line as i64),
        Obj::from("level"),
        Obj::from_int(frame.level as i64),
    ];
    Ok(Obj::from_list(entries))
}

fn var_list(interp: &mut Interp, argv: &[Obj], frame: Rc<CallFrame>, locals_only: bool) -> EvalResult {
    sub_args(argv, 2, 3, "?pattern?")?;
    let names = interp.var_names(&frame, locals_only);
    Ok(filtered(names, argv.get(2)))
}

fn globals(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let top = interp.top_frame();
    var_list(interp, argv, top, false)
}

fn locals(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let frame = Rc::clone(&interp.frame);
    var_list(interp, argv, frame, true)
}

fn vars(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let frame = Rc::clone(&interp.frame);
    var_list(interp, argv, frame, false)
}

fn version(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 2, 2, "")?;
    Ok(Obj::from(VERSION))
}

fn returncodes(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 2, 3, "?code?")?;
    if let Some(code) = argv.get(2) {
        let n = code.get_int()?;
        let name = Code::from_i32(n as i32).name().unwrap_or_default();
        return Ok(Obj::from(name));
    }
    let mut out = Vec::new();
    for (name, code) in Code::all() {
        out.push(Obj::from_int(code.as_i32() as i64));
        out.push(Obj::from(name));
    }
    Ok(Obj::from_list(out))
}

fn script(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 2, 2, "")?;
    Ok(interp.current_file.clone())
}

/// `info source value`: where the value was parsed from. With a file and
/// line, returns a copy of the value stamped with that location.
fn source(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    match argv.len() {
        3 => Ok(match argv[2].source_location() {
            Some((file, line)) => Obj::from_list(vec![file, Obj::from_int(line as i64)]),
            None => Obj::from_list(Vec::new()),
        }),
        5 => {
            let line = argv[4].get_int()?;
            let copy = Obj::new(argv[2].as_str());
            copy.set_source(argv[3].clone(), u32::try_from(line).unwrap_or(0));
            Ok(copy)
        }
        _ => Err(Exception::wrong_args(&argv[..2], "source ?filename line?")),
    }
}

fn stacktrace(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 2, 2, "")?;
    Ok(interp.stack_trace_obj())
}
