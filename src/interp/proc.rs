//! Procedure calls: argument binding, `defer`, tail calls and the frame
//! lookups used by `uplevel`, `upvar` and `info level`.

use std::rc::Rc;

use super::command::Proc;
use super::eval::finish_return;
use super::frame::{CallFrame, Var};
use super::{Code, EvalResult, Exception, Interp};
use crate::obj::Obj;

/// Frame variable holding the scripts registered by `defer`.
pub(crate) const DEFER_VAR: &str = "jim::defer";

impl Interp {
    pub(crate) fn call_proc(&mut self, proc: &Rc<Proc>, argv: &[Obj]) -> EvalResult {
        let given = argv.len() - 1;
        if given < proc.required || (proc.rest.is_none() && given > proc.required + proc.optional) {
            return Err(proc.wrong_args(&argv[0]));
        }
        if proc.body.is_empty() {
            return Ok(Obj::empty());
        }
        if self.frame.level >= self.config.max_call_depth {
            return Err(Exception::error("Too many nested calls. Infinite recursion?"));
        }

        let id = self.next_frame_id();
        let frame = CallFrame {
            statics: proc.statics.clone(),
            proc_args: Some(proc.arg_list.clone()),
            proc_body: Some(proc.body.clone()),
            file: self.current_file.clone(),
            line: self.current_line,
            ..CallFrame::child(&self.frame, id, argv.to_vec())
        };
        let caller = std::mem::replace(&mut self.frame, Rc::new(frame));

        let mut result = self.bind_args(proc, argv).and_then(|()| self.eval_obj(&proc.body));
        result = self.run_defers(result);

        let frame = std::mem::replace(&mut self.frame, caller);
        self.delete_local_commands(&frame);
        drop(frame);

        let result = self.replay_tailcalls(result);
        match result {
            Err(e) if e.code == Code::Return => finish_return(Err(e)),
            Err(e) if e.code == Code::Error => {
                self.add_stack_trace += 1;
                self.error_proc = argv[0].clone();
                Err(e)
            }
            other => other,
        }
    }

    fn bind_args(&mut self, proc: &Proc, argv: &[Obj]) -> EvalResult<()> {
        let given = argv.len() - 1;
        let mut optional_left = given as isize - proc.required as isize;
        let mut i = 1;
        for (pos, param) in proc.params.iter().enumerate() {
            if Some(pos) == proc.rest {
                let extra = given.saturating_sub(proc.required + proc.optional);
                let name = param.default.as_ref().unwrap_or(&param.name);
                self.set_var_obj(name, Obj::from_list(argv[i..i + extra].to_vec()))?;
                i += extra;
                continue;
            }
            let take = match &param.default {
                None => true,
                Some(_) => {
                    optional_left -= 1;
                    optional_left >= 0
                }
            };
            if take {
                self.bind_one(&param.name, &argv[i])?;
                i += 1;
            } else if let Some(default) = &param.default {
                self.set_var_obj(&param.name, default.clone())?;
            }
        }
        Ok(())
    }

    /// `&name` parameters link to the caller's variable named by the
    /// argument.
    fn bind_one(&mut self, name: &Obj, value: &Obj) -> EvalResult<()> {
        match name.as_str().strip_prefix('&') {
            Some(local) => {
                let parent = self.frame.parent.clone().unwrap_or_else(|| self.top_frame());
                self.link_var_in(&Obj::from(local), value, parent)
            }
            None => self.set_var_obj(name, value.clone()),
        }
    }

    /// Runs the frame's deferred scripts, newest first, stopping at the
    /// first failure. A failing script replaces the body's completion
    /// unless the body itself failed with an error.
    fn run_defers(&mut self, result: EvalResult) -> EvalResult {
        let slot = self.frame.vars.borrow_mut().remove(DEFER_VAR);
        let Some(slot) = slot else {
            return result;
        };
        let scripts = match &*slot.borrow() {
            Var::Value(v) => v.clone(),
            Var::Link { .. } => return result,
        };
        let mut failure = None;
        for script in scripts.list().iter().rev() {
            if let Err(e) = self.eval_obj(script) {
                failure = Some(e);
                break;
            }
        }
        match failure {
            Some(e) if !matches!(&result, Err(r) if r.code == Code::Error) => Err(e),
            _ => result,
        }
    }

    /// Runs commands `tailcall` stashed on the current frame. Only the
    /// outermost call per frame loops; nested ones hand their request up.
    fn replay_tailcalls(&mut self, mut result: EvalResult) -> EvalResult {
        let frame = Rc::clone(&self.frame);
        if frame.tailcall.borrow().is_none() || frame.tailcall_active.get() > 0 {
            return result;
        }
        frame.tailcall_active.set(1);
        loop {
            let Some(next) = frame.tailcall.borrow_mut().take() else { break };
            if !matches!(&result, Err(e) if e.code == Code::Eval) {
                continue;
            }
            tracing::debug!(cmd = %next.argv[0], "tailcall");
            result = self.invoke_command(next.cmd, &next.argv);
            // `tailcall return x` returns from the caller.
            if let Err(e) = &mut result {
                if e.code == Code::Return {
                    e.level += 1;
                }
            }
        }
        frame.tailcall_active.set(0);
        result
    }

    /// Frame for `uplevel`/`upvar` levels: `#n` is absolute, `n` counts up
    /// from the current frame. `None` means one level up.
    pub(crate) fn frame_by_level(&self, level: Option<&Obj>) -> EvalResult<Rc<CallFrame>> {
        let target = match level {
            None => self.frame.level.checked_sub(1),
            Some(obj) => {
                let s = obj.as_str();
                match s.strip_prefix('#') {
                    Some(abs) => crate::obj::number::parse_int(abs).and_then(|n| usize::try_from(n).ok()),
                    None => obj
                        .as_int()
                        .and_then(|n| usize::try_from(n).ok())
                        .and_then(|n| self.frame.level.checked_sub(n)),
                }
            }
        };
        target.and_then(|l| self.frame.ancestor(l)).ok_or_else(|| {
            let shown = level.map(|o| o.to_string()).unwrap_or_else(|| "1".to_string());
            Exception::error(format!("bad level \"{shown}\""))
        })
    }

    /// Frame for `info level`/`info frame`: positive is absolute, zero or
    /// negative counts up from the current frame.
    pub(crate) fn frame_by_integer(&self, n: i64) -> Option<Rc<CallFrame>> {
        let level = if n > 0 { n } else { self.frame.level as i64 + n };
        let level = usize::try_from(level).ok()?;
        self.frame.ancestor(level)
    }

    /// `uplevel`: evaluates in `frame`, keeping the caller's current line.
    pub(crate) fn eval_in_frame(&mut self, frame: Rc<CallFrame>, script: &Obj) -> EvalResult {
        self.in_frame(frame, |interp| interp.eval_obj(script))
    }

    /// `local`: commands created while running `argv` are pushed over the
    /// existing definition and popped when the current frame exits.
    pub(crate) fn eval_local(&mut self, argv: &[Obj]) -> EvalResult {
        self.local_depth += 1;
        let result = self.eval_list(argv);
        self.local_depth -= 1;
        let name = result?;
        if !self.command_exists(name.as_str()) {
            return Err(Exception::error(format!("invalid command name \"{name}\"")));
        }
        self.frame.local_commands.borrow_mut().push(name.clone());
        Ok(name)
    }

    /// `upcall`: runs the definition `local` replaced.
    pub(crate) fn eval_upcall(&mut self, argv: &[Obj]) -> EvalResult {
        let cmd = self.get_command(argv[0].as_str()).filter(|c| c.is_proc() && c.prev.borrow().is_some());
        let Some(cmd) = cmd else {
            return Err(Exception::error(format!("no previous command: \"{}\"", argv[0])));
        };
        cmd.upcall.set(cmd.upcall.get() + 1);
        let result = self.eval_list(argv);
        cmd.upcall.set(cmd.upcall.get() - 1);
        result
    }

    /// `tailcall`: stashes the command on the caller's frame.
    pub(crate) fn request_tailcall(&mut self, argv: &[Obj]) -> EvalResult {
        let Some(parent) = self.frame.parent.clone() else {
            return Err(Exception::error("tailcall can only be called from a proc or lambda"));
        };
        if argv.is_empty() {
            return Ok(Obj::empty());
        }
        let cmd = self
            .resolve_command(&argv[0])
            .ok_or_else(|| Exception::error(format!("invalid command name \"{}\"", argv[0])))?;
        *parent.tailcall.borrow_mut() = Some(super::frame::TailCall { argv: argv.to_vec(), cmd });
        Err(Exception::new(Code::Eval, Obj::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Config;

    fn ok(interp: &mut Interp, src: &str) -> String {
        match interp.eval(src) {
            Ok(v) => v.to_string(),
            Err(e) => panic!("{src}: {}", e.value),
        }
    }

    #[test]
    fn defaults_and_rest() {
        let mut interp = Interp::new();
        ok(&mut interp, "proc p {a {b 10} args} {list $a $b $args}");
        assert_eq!(ok(&mut interp, "p 1"), "1 10 {}");
        assert_eq!(ok(&mut interp, "p 1 2 3 4 5"), "1 2 {3 4 5}");
        let e = interp.eval("p").unwrap_err();
        assert_eq!(e.value.as_str(), "wrong # args: should be \"p a ?b? ?arg ...?\"");
    }

    #[test]
    fn rest_in_the_middle_and_custom_name() {
        let mut interp = Interp::new();
        ok(&mut interp, "proc q {a {args more} z} {list $a $more $z}");
        assert_eq!(ok(&mut interp, "q 1 2"), "1 {} 2");
        assert_eq!(ok(&mut interp, "q 1 2 3 4"), "1 {2 3} 4");
    }

    #[test]
    fn reference_parameters() {
        let mut interp = Interp::new();
        ok(&mut interp, "proc bump {&v} {incr v}; set n 4; bump n");
        assert_eq!(ok(&mut interp, "set n"), "5");
    }

    #[test]
    fn statics_persist_between_calls() {
        let mut interp = Interp::new();
        ok(&mut interp, "proc counter {} {{n 0}} {incr n}");
        ok(&mut interp, "counter; counter");
        assert_eq!(ok(&mut interp, "counter"), "3");
    }

    #[test]
    fn recursion_limit() {
        let mut interp = Interp::with_config(Config::default().max_call_depth(50));
        ok(&mut interp, "set depth 0; proc r {} {incr ::depth; r}");
        let e = interp.eval("r").unwrap_err();
        assert_eq!(e.value.as_str(), "Too many nested calls. Infinite recursion?");
        assert_eq!(ok(&mut interp, "set depth"), "50");
    }

    #[test]
    fn tailcall_runs_in_constant_frames() {
        let mut interp = Interp::with_config(Config::default().max_call_depth(20));
        ok(&mut interp, "proc loop {n} { if {$n == 0} {return done}; tailcall loop [expr {$n - 1}] }");
        assert_eq!(ok(&mut interp, "loop 1000"), "done");
        let e = interp.eval("tailcall foo").unwrap_err();
        assert_eq!(e.value.as_str(), "tailcall can only be called from a proc or lambda");
    }

    #[test]
    fn defer_runs_in_reverse() {
        let mut interp = Interp::new();
        ok(&mut interp, "set log {}; proc d {} { defer {lappend ::log a}; defer {lappend ::log b}; return x }");
        assert_eq!(ok(&mut interp, "d"), "x");
        assert_eq!(ok(&mut interp, "set log"), "b a");
    }

    #[test]
    fn local_and_upcall() {
        let mut interp = Interp::new();
        ok(&mut interp, "proc greet {} {return hello}");
        ok(&mut interp, "proc wrap {} { local proc greet {} {return \"<[upcall greet]>\"}; greet }");
        assert_eq!(ok(&mut interp, "wrap"), "<hello>");
        assert_eq!(ok(&mut interp, "greet"), "hello");
    }

    #[test]
    fn uplevel_levels() {
        let mut interp = Interp::new();
        ok(&mut interp, "proc a {} {set x a; b}; proc b {} {set x b; list [uplevel 1 {set x}] [uplevel #0 {info level}]}");
        assert_eq!(ok(&mut interp, "set x top; a"), "a 0");
        let e = interp.eval("uplevel 5 {set x}").unwrap_err();
        assert_eq!(e.value.as_str(), "bad level \"5\"");
    }
}
