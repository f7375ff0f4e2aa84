//! Script evaluation and command dispatch.

use std::rc::Rc;

use super::command::{Command, CommandKind};
use super::{Code, EvalResult, Exception, Interp, ensure_sufficient_stack};
use crate::obj::Obj;
use crate::script::{Part, Script, ScriptToken};

/// Nested `unknown` invocations allowed before giving up.
const MAX_UNKNOWN_DEPTH: usize = 50;

impl Interp {
    /// Evaluates a script at the current level and records the result.
    pub fn eval(&mut self, script: &str) -> EvalResult {
        let result = self.eval_obj(&Obj::from(script));
        self.set_result(&result);
        result
    }

    /// Evaluates a value as a script. A list with no string form is run as
    /// a single command without parsing.
    pub fn eval_obj(&mut self, obj: &Obj) -> EvalResult {
        if obj.is_pure_list() {
            let words = obj.list();
            return self.eval_list(&words);
        }
        let script = obj.script();
        self.eval_script(&script)
    }

    /// Evaluates a script in the global frame.
    pub fn eval_global(&mut self, script: &str) -> EvalResult {
        let top = self.top_frame();
        let result = self.in_frame(top, |interp| interp.eval_obj(&Obj::from(script)));
        self.set_result(&result);
        result
    }

    /// Invokes an already-split command.
    pub fn eval_list(&mut self, words: &[Obj]) -> EvalResult {
        if words.is_empty() {
            return Ok(Obj::empty());
        }
        self.invoke(words)
    }

    /// Invokes `prefix` as the command word with `args` following it.
    pub fn eval_prefix(&mut self, prefix: &Obj, args: &[Obj]) -> EvalResult {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(prefix.clone());
        words.extend_from_slice(args);
        self.invoke(&words)
    }

    /// Reads and evaluates a file. A `return` at the file's top level ends
    /// it like a procedure return.
    pub fn eval_file(&mut self, path: &str) -> EvalResult {
        tracing::debug!(path, "source");
        let text = std::fs::read_to_string(path)
            .map_err(|e| Exception::error(format!("couldn't read file \"{path}\": {e}")))?;
        let script = Obj::new(text);
        script.set_source(Obj::from(path), 1);
        let result = self.eval_obj(&script);
        let result = finish_return(result);
        self.set_result(&result);
        result
    }

    pub(crate) fn eval_script(&mut self, script: &Rc<Script>) -> EvalResult {
        if let Some(msg) = script.missing.message() {
            let err = Exception::error(msg);
            self.error_flag = false;
            self.add_error_to_stack(&script.file, script.missing_line);
            return Err(err);
        }
        if script.tokens.is_empty() {
            return Ok(Obj::empty());
        }
        self.error_flag = false;
        let saved_file = std::mem::replace(&mut self.current_file, script.file.clone());
        let saved_line = self.current_line;
        let result = self.run_commands(script);
        self.current_file = saved_file;
        self.current_line = saved_line;
        result
    }

    fn run_commands(&mut self, script: &Script) -> EvalResult {
        let tokens = &script.tokens;
        let mut result = Obj::empty();
        let mut i = 0;
        while i < tokens.len() {
            let (argc, line) = match tokens[i] {
                ScriptToken::Line { argc, line } => (argc, line),
                _ => {
                    i += 1;
                    continue;
                }
            };
            i += 1;
            self.current_line = line;

            let mut argv: Vec<Obj> = Vec::with_capacity(argc);
            let mut outcome = Ok(());
            for _ in 0..argc {
                let (count, expand) = match tokens.get(i) {
                    Some(ScriptToken::Word { count, expand }) => {
                        i += 1;
                        (*count, *expand)
                    }
                    _ => (1, false),
                };
                let word = if count == 1 {
                    match tokens.get(i) {
                        Some(ScriptToken::Part(kind, obj)) => self.eval_part(*kind, obj),
                        _ => Ok(Obj::empty()),
                    }
                } else {
                    let parts = tokens[i..i + count].iter().filter_map(|t| match t {
                        ScriptToken::Part(kind, obj) => Some((*kind, obj)),
                        _ => None,
                    });
                    self.interpolate(parts, false)
                };
                i += count;
                match word {
                    Ok(w) if expand => argv.extend(w.list().iter().cloned()),
                    Ok(w) => argv.push(w),
                    Err(e) => {
                        outcome = Err(e);
                        break;
                    }
                }
            }

            let completed = match outcome {
                Err(e) => Err(e),
                // `{*}` of an empty list leaves no command to run.
                Ok(()) if argv.is_empty() => Ok(result.clone()),
                Ok(()) => self.invoke(&argv),
            };
            match completed {
                Ok(v) => result = v,
                Err(e) => {
                    if e.code == Code::Error {
                        self.add_error_to_stack(&script.file, line);
                    }
                    return Err(e);
                }
            }
            let signals = self.take_signals();
            if signals != 0 {
                return Err(Exception::new(Code::Signal, Obj::from_int(signals as i64)));
            }
        }
        Ok(result)
    }

    pub(crate) fn eval_part(&mut self, kind: Part, obj: &Obj) -> EvalResult {
        match kind {
            Part::Str => Ok(obj.clone()),
            Part::Var => self.get_var_obj(obj),
            Part::DictSugar => self.expand_dict_sugar(obj),
            Part::ExprSugar => self.eval_expr(obj),
            Part::Cmd => self.eval_obj(obj),
        }
    }

    /// Looks a command up by name, following `upcall` redirections.
    pub(crate) fn resolve_command(&mut self, name: &Obj) -> Option<Rc<Command>> {
        let mut cmd = match name.cached_command(self.proc_epoch) {
            Some(c) => c,
            None => {
                let c = self.get_command(name.as_str())?;
                name.cache_command(self.proc_epoch, &c);
                c
            }
        };
        while cmd.upcall.get() > 0 {
            let prev = cmd.prev.borrow().clone();
            cmd = prev?;
        }
        Some(cmd)
    }

    /// Dispatches `argv[0]`, falling back to the `unknown` handler.
    pub(crate) fn invoke(&mut self, argv: &[Obj]) -> EvalResult {
        match self.resolve_command(&argv[0]) {
            Some(cmd) => self.invoke_command(cmd, argv),
            None => self.unknown(argv),
        }
    }

    pub(crate) fn invoke_command(&mut self, cmd: Rc<Command>, argv: &[Obj]) -> EvalResult {
        if self.eval_depth >= self.config.max_eval_depth {
            return Err(Exception::error("Infinite eval recursion"));
        }
        let _span = tracing::trace_span!("command", name = %argv[0]).entered();
        self.eval_depth += 1;
        let result = ensure_sufficient_stack(|| match &cmd.kind {
            CommandKind::Native(f) => f(self, argv),
            CommandKind::Proc(p) => self.call_proc(p, argv),
            CommandKind::Alias(target) => {
                let mut words: Vec<Obj> = target.list().to_vec();
                words.extend_from_slice(&argv[1..]);
                self.eval_list(&words)
            }
        });
        self.eval_depth -= 1;
        result
    }

    fn unknown(&mut self, argv: &[Obj]) -> EvalResult {
        let not_found = || Exception::error(format!("invalid command name \"{}\"", argv[0]));
        if self.unknown_depth > MAX_UNKNOWN_DEPTH {
            return Err(not_found());
        }
        let name = self.unknown.clone();
        let Some(handler) = self.resolve_command(&name) else {
            return Err(not_found());
        };
        let mut words = Vec::with_capacity(argv.len() + 1);
        words.push(name);
        words.extend_from_slice(argv);
        self.unknown_depth += 1;
        let result = self.invoke_command(handler, &words);
        self.unknown_depth -= 1;
        result
    }

    /// Records one level of an error's propagation in the stack trace.
    pub(crate) fn add_error_to_stack(&mut self, file: &Obj, line: u32) {
        if !self.error_flag {
            self.error_flag = true;
            self.error_file = file.clone();
            self.error_line = line;
            self.stack_trace.clear();
            self.add_stack_trace += 1;
        }
        if self.add_stack_trace > 0 {
            let proc = std::mem::take(&mut self.error_proc);
            self.append_stack_trace(&proc, file, line);
            if !file.is_empty() {
                self.add_stack_trace = 0;
            }
        }
    }

    fn append_stack_trace(&mut self, proc: &Obj, file: &Obj, line: u32) {
        let proc = if proc.as_str() == "unknown" { Obj::empty() } else { proc.clone() };
        if proc.is_empty() && file.is_empty() {
            return;
        }
        let n = self.stack_trace.len();
        // A frame that named only the procedure gets the location filled in.
        if n >= 3 && !self.stack_trace[n - 3].is_empty() && self.stack_trace[n - 2].is_empty() && !file.is_empty()
        {
            self.stack_trace[n - 2] = file.clone();
            self.stack_trace[n - 1] = Obj::from_int(line as i64);
            return;
        }
        self.stack_trace.push(proc);
        self.stack_trace.push(file.clone());
        self.stack_trace.push(Obj::from_int(line as i64));
    }

    /// Replaces the stack trace, as `error msg trace` and
    /// `return -errorinfo` do.
    pub(crate) fn set_stack_trace(&mut self, trace: &Obj) {
        self.stack_trace = trace.list().to_vec();
        self.error_flag = true;
        let n = self.stack_trace.len();
        if n >= 3 && self.stack_trace[n - 2].is_empty() {
            self.add_stack_trace = 1;
        }
    }
}

/// Turns a `return` whose level is used up into its target completion.
pub(crate) fn finish_return(result: EvalResult) -> EvalResult {
    match result {
        Err(mut e) if e.code == Code::Return => {
            e.level -= 1;
            if e.level > 0 {
                return Err(e);
            }
            match e.return_code {
                Code::Ok => Ok(e.value),
                code => {
                    e.code = code;
                    e.level = 0;
                    e.return_code = Code::Ok;
                    Err(e)
                }
            }
        }
        other => other,
    }
}
