//! The command registry's entries: native commands and procedures.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::frame::{Var, VarTable};
use super::{EvalResult, Exception, Interp};
use crate::obj::Obj;

/// Signature of a native command. `argv[0]` is the command name as invoked.
pub type NativeFn = dyn Fn(&mut Interp, &[Obj]) -> EvalResult;

pub enum CommandKind {
    Native(Rc<NativeFn>),
    Proc(Rc<Proc>),
    /// `alias`: the words prepended to the arguments.
    Alias(Obj),
}

pub struct Command {
    pub kind: CommandKind,
    /// The command this one replaced while `local` was in force.
    pub(crate) prev: RefCell<Option<Rc<Command>>>,
    /// While non-zero, name lookups skip this procedure in favour of `prev`.
    pub(crate) upcall: Cell<u32>,
    on_delete: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Command {
    pub fn native(f: Rc<NativeFn>) -> Command {
        Command::new(CommandKind::Native(f))
    }

    pub fn proc(p: Proc) -> Command {
        Command::new(CommandKind::Proc(Rc::new(p)))
    }

    pub(crate) fn new(kind: CommandKind) -> Command {
        Command { kind, prev: RefCell::new(None), upcall: Cell::new(0), on_delete: RefCell::new(None) }
    }

    pub fn with_delete(self, on_delete: impl FnOnce() + 'static) -> Command {
        *self.on_delete.borrow_mut() = Some(Box::new(on_delete));
        self
    }

    pub fn as_proc(&self) -> Option<&Rc<Proc>> {
        match &self.kind {
            CommandKind::Proc(p) => Some(p),
            CommandKind::Native(_) | CommandKind::Alias(_) => None,
        }
    }

    pub fn is_proc(&self) -> bool {
        self.as_proc().is_some()
    }

    /// `native`, `proc` or `alias`.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            CommandKind::Native(_) => "native",
            CommandKind::Proc(_) => "proc",
            CommandKind::Alias(_) => "alias",
        }
    }
}

/// The delete callback runs once nothing refers to the command any more,
/// which may be after it was removed from the registry if it was running.
impl Drop for Command {
    fn drop(&mut self) {
        if let Some(cb) = self.on_delete.get_mut().take() {
            cb();
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Obj,
    /// Default value; for the rest parameter, its custom variable name.
    pub default: Option<Obj>,
}

pub struct Proc {
    pub arg_list: Obj,
    pub body: Obj,
    pub params: Vec<Param>,
    pub required: usize,
    pub optional: usize,
    /// Position of `args` in `params`.
    pub rest: Option<usize>,
    pub statics: Option<Rc<RefCell<VarTable>>>,
}

impl Proc {
    /// Parses a formal argument list. `statics` values come from the
    /// caller's frame when only a name is given.
    pub fn new(interp: &mut Interp, arg_list: Obj, statics: Option<&Obj>, body: Obj) -> EvalResult<Proc> {
        let mut params = Vec::new();
        let mut required = 0;
        let mut optional = 0;
        let mut rest = None;
        for (i, spec) in arg_list.list().iter().enumerate() {
            let fields = spec.list();
            let (name, default) = match fields.len() {
                0 => return Err(Exception::error("argument with no name")),
                1 => (spec.clone(), None),
                2 => (fields[0].clone(), Some(fields[1].clone())),
                _ => {
                    return Err(Exception::error(format!("too many fields in argument specifier \"{spec}\"")));
                }
            };
            if name.as_str() == "args" {
                if rest.is_some() {
                    return Err(Exception::error("'args' specified more than once"));
                }
                rest = Some(i);
            } else if default.is_some() {
                optional += 1;
            } else {
                required += 1;
            }
            params.push(Param { name, default });
        }

        let statics = match statics {
            Some(list) if !list.is_empty() => Some(Rc::new(RefCell::new(Self::create_statics(interp, list)?))),
            _ => None,
        };
        Ok(Proc { arg_list, body, params, required, optional, rest, statics })
    }

    fn create_statics(interp: &mut Interp, list: &Obj) -> EvalResult<VarTable> {
        let mut table = VarTable::new();
        for spec in list.list().iter() {
            let fields = spec.list();
            let (name, value) = match fields.len() {
                1 => {
                    let value = interp.find_var_value(&fields[0]).ok_or_else(|| {
                        Exception::error(format!(
                            "variable for initialization of static \"{spec}\" not found in the local context"
                        ))
                    })?;
                    (fields[0].clone(), value)
                }
                2 => (fields[0].clone(), fields[1].clone()),
                _ => return Err(Exception::error(format!("too many fields in static specifier \"{spec}\""))),
            };
            let slot = Rc::new(RefCell::new(Var::Value(value)));
            if !table.add(name.as_str().into(), slot) {
                return Err(Exception::error(format!("static variable name \"{name}\" duplicated in statics list")));
            }
        }
        Ok(table)
    }

    /// `wrong # args` message naming each formal parameter.
    pub fn wrong_args(&self, name: &Obj) -> Exception {
        let mut msg = format!("wrong # args: should be \"{name}");
        for (i, p) in self.params.iter().enumerate() {
            msg.push(' ');
            if Some(i) == self.rest {
                match &p.default {
                    Some(custom) => {
                        msg.push('?');
                        msg.push_str(custom.as_str());
                        msg.push_str(" ...?");
                    }
                    None => msg.push_str("?arg ...?"),
                }
            } else if p.default.is_some() {
                msg.push('?');
                msg.push_str(p.name.as_str());
                msg.push('?');
            } else {
                msg.push_str(p.name.as_str().strip_prefix('&').unwrap_or(p.name.as_str()));
            }
        }
        msg.push('"');
        Exception::error(msg)
    }

    /// `info args`: parameter names in order.
    pub fn arg_names(&self) -> Vec<Obj> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn proc_with(args: &str) -> EvalResult<Proc> {
        let mut interp = Interp::new();
        Proc::new(&mut interp, Obj::from(args), None, Obj::from("body"))
    }

    #[test]
    fn arity_counts() {
        let p = proc_with("a {b 1} args c").unwrap();
        assert_eq!(p.required, 2);
        assert_eq!(p.optional, 1);
        assert_eq!(p.rest, Some(2));
    }

    #[test]
    fn bad_specs() {
        assert_eq!(proc_with("{}").err().unwrap().value.as_str(), "argument with no name");
        assert!(proc_with("{a b c}").err().unwrap().value.as_str().starts_with("too many fields"));
        assert_eq!(proc_with("args args").err().unwrap().value.as_str(), "'args' specified more than once");
    }

    #[test]
    fn wrong_args_message() {
        let p = proc_with("&v a {b 1} {args rest}").unwrap();
        assert_eq!(
            p.wrong_args(&Obj::from("f")).value.as_str(),
            "wrong # args: should be \"f v a ?b? ?rest ...?\""
        );
        let p = proc_with("x args").unwrap();
        assert_eq!(p.wrong_args(&Obj::from("g")).value.as_str(), "wrong # args: should be \"g x ?arg ...?\"");
    }

    #[test]
    fn delete_callback_runs_on_last_drop() {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let cmd = Rc::new(Command::native(Rc::new(|_: &mut Interp, _: &[Obj]| -> EvalResult { Ok(Obj::empty()) })).with_delete(move || {
            h.set(h.get() + 1)
        }));
        let held = Rc::clone(&cmd);
        drop(cmd);
        assert_eq!(hits.get(), 0);
        drop(held);
        assert_eq!(hits.get(), 1);
    }
}
