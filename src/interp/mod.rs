//! The interpreter: command registry, call frames and the embedding API.
//!
//! Evaluation lives in [`eval`], variables in [`vars`], procedure calls in
//! [`proc`] and `subst` in [`subst`]. Every evaluation returns
//! [`EvalResult`]; only `Ok` is the `ok` completion.

pub mod command;
pub mod frame;

mod eval;
mod exception;
mod prng;
mod proc;
mod stack;
mod subst;
mod vars;

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use exception::{Code, EvalResult, Exception};
pub(crate) use proc::DEFER_VAR;
pub(crate) use stack::ensure_sufficient_stack;

use crate::hashtable::HashTable;
use crate::obj::Obj;
use command::{Command, CommandKind, NativeFn, Proc};
use frame::CallFrame;
use prng::Prng;

pub const VERSION: &str = "0.80";

/// Interpreter limits and seeding.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_call_depth: usize,
    pub max_eval_depth: usize,
    /// Fixed PRNG seed; `None` seeds from the system on first use.
    pub rand_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config { max_call_depth: 1000, max_eval_depth: 2000, rand_seed: None }
    }
}

impl Config {
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn max_eval_depth(mut self, depth: usize) -> Self {
        self.max_eval_depth = depth;
        self
    }

    pub fn rand_seed(mut self, seed: u64) -> Self {
        self.rand_seed = Some(seed);
        self
    }
}

struct AssocEntry {
    data: Rc<dyn Any>,
    on_delete: Option<Box<dyn FnOnce()>>,
}

impl Drop for AssocEntry {
    fn drop(&mut self) {
        if let Some(cb) = self.on_delete.take() {
            cb();
        }
    }
}

pub struct Interp {
    config: Config,
    commands: HashTable<Box<str>, Rc<Command>>,
    /// Bumped whenever a command is created over, renamed or deleted;
    /// command caches inside values compare against it.
    proc_epoch: u64,
    next_frame_id: u64,
    top: Rc<CallFrame>,
    pub(crate) frame: Rc<CallFrame>,
    eval_depth: usize,
    unknown: Obj,
    unknown_depth: usize,
    /// Non-zero while `local` is creating a command.
    pub(crate) local_depth: u32,
    // Stack trace bookkeeping for the error being propagated.
    pub(crate) error_flag: bool,
    pub(crate) add_stack_trace: u32,
    pub(crate) error_proc: Obj,
    error_file: Obj,
    error_line: u32,
    pub(crate) stack_trace: Vec<Obj>,
    /// Script and line of the command being run.
    pub(crate) current_file: Obj,
    pub(crate) current_line: u32,
    result: Obj,
    pub(crate) exit_code: i32,
    signals: Arc<AtomicU64>,
    prng: Option<Prng>,
    assoc: HashTable<Box<str>, AssocEntry>,
    packages: HashTable<Box<str>, Obj>,
}

impl Default for Interp {
    fn default() -> Self {
        Interp::new()
    }
}

impl Interp {
    pub fn new() -> Interp {
        Interp::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Interp {
        let top = Rc::new(CallFrame::top(1));
        let mut interp = Interp {
            config,
            commands: HashTable::new(),
            proc_epoch: 0,
            next_frame_id: 2,
            frame: Rc::clone(&top),
            top,
            eval_depth: 0,
            unknown: Obj::from("unknown"),
            unknown_depth: 0,
            local_depth: 0,
            error_flag: false,
            add_stack_trace: 0,
            error_proc: Obj::empty(),
            error_file: Obj::empty(),
            error_line: 0,
            stack_trace: Vec::new(),
            current_file: Obj::empty(),
            current_line: 0,
            result: Obj::empty(),
            exit_code: 0,
            signals: Arc::new(AtomicU64::new(0)),
            prng: None,
            assoc: HashTable::new(),
            packages: HashTable::new(),
        };
        crate::commands::register(&mut interp);
        // Scripts expect these globals to exist from the start.
        for (name, value) in [("errorCode", "NONE"), ("tcl_platform", "platform unix engine Jim")] {
            interp.top.vars.borrow_mut().add(
                name.into(),
                Rc::new(RefCell::new(frame::Var::Value(Obj::from(value)))),
            );
        }
        interp
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn next_frame_id(&mut self) -> u64 {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        id
    }

    pub(crate) fn top_frame(&self) -> Rc<CallFrame> {
        Rc::clone(&self.top)
    }

    // ---- Results ----

    /// The result of the last top-level evaluation.
    pub fn result(&self) -> &Obj {
        &self.result
    }

    pub(crate) fn set_result(&mut self, result: &EvalResult) {
        self.result = match result {
            Ok(v) => v.clone(),
            Err(e) => e.value.clone(),
        };
    }

    /// Code passed to `exit`.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// The stack trace of the last error as `(proc, file, line)` triples.
    pub fn stack_trace(&self) -> Vec<(String, String, u32)> {
        self.stack_trace
            .chunks(3)
            .filter(|t| t.len() == 3)
            .map(|t| (t[0].to_string(), t[1].to_string(), t[2].as_int().unwrap_or(0) as u32))
            .collect()
    }

    pub(crate) fn stack_trace_obj(&self) -> Obj {
        Obj::from_list(self.stack_trace.clone())
    }

    /// File and line where the last error was raised.
    pub fn error_location(&self) -> (Obj, u32) {
        (self.error_file.clone(), self.error_line)
    }

    // ---- Signals ----

    /// A mask the embedder may set from any thread; the evaluator checks it
    /// between commands and stops with a `signal` completion.
    pub fn signal_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.signals)
    }

    pub(crate) fn take_signals(&mut self) -> u64 {
        if self.signals.load(Ordering::Relaxed) == 0 {
            return 0;
        }
        self.signals.swap(0, Ordering::SeqCst)
    }

    // ---- Random numbers ----

    pub(crate) fn prng(&mut self) -> &mut Prng {
        let seed = self.config.rand_seed;
        self.prng.get_or_insert_with(|| match seed {
            Some(s) => Prng::from_u64(s),
            None => Prng::from_u64(fastrand::u64(..)),
        })
    }

    pub(crate) fn reseed(&mut self, seed: u64) {
        self.prng = Some(Prng::from_u64(seed));
    }

    // ---- Commands ----

    /// Registers a native command. Captured state plays the role of
    /// private data.
    pub fn create_command<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut Interp, &[Obj]) -> EvalResult + 'static,
    {
        let f: Rc<NativeFn> = Rc::new(f);
        self.add_command(name, Command::native(f));
    }

    /// Like [`Interp::create_command`]; `on_delete` runs once the command is
    /// deleted or replaced and no invocation still holds it.
    pub fn create_command_with_delete<F, D>(&mut self, name: &str, f: F, on_delete: D)
    where
        F: Fn(&mut Interp, &[Obj]) -> EvalResult + 'static,
        D: FnOnce() + 'static,
    {
        let f: Rc<NativeFn> = Rc::new(f);
        self.add_command(name, Command::native(f).with_delete(on_delete));
    }

    pub(crate) fn create_proc(&mut self, name: &Obj, proc: Proc) {
        tracing::debug!(name = %name, "proc created");
        self.add_command(name.as_str(), Command::proc(proc));
    }

    pub(crate) fn create_alias(&mut self, name: &Obj, target: Obj) {
        self.add_command(name.as_str(), Command::new(CommandKind::Alias(target)));
    }

    /// Inserts a command. Under `local`, the previous definition is kept
    /// underneath the new one.
    pub(crate) fn add_command(&mut self, name: &str, cmd: Command) {
        let key = name.strip_prefix("::").unwrap_or(name);
        let old = self.commands.remove(key);
        if old.is_some() {
            self.proc_epoch += 1;
        }
        if self.local_depth > 0 {
            *cmd.prev.borrow_mut() = old;
        }
        self.commands.add(key.into(), Rc::new(cmd));
    }

    pub fn delete_command(&mut self, name: &str) -> EvalResult<()> {
        let key = name.strip_prefix("::").unwrap_or(name);
        match self.commands.remove(key) {
            Some(_) => {
                tracing::debug!(name, "command deleted");
                self.proc_epoch += 1;
                Ok(())
            }
            None => Err(Exception::error(format!("can't delete \"{name}\": command doesn't exist"))),
        }
    }

    /// Renames a command; an empty new name deletes it.
    pub fn rename_command(&mut self, old: &str, new: &str) -> EvalResult<()> {
        if new.is_empty() {
            return self.delete_command(old);
        }
        let old_key = old.strip_prefix("::").unwrap_or(old);
        let new_key = new.strip_prefix("::").unwrap_or(new);
        if !self.commands.contains_key(old_key) {
            return Err(Exception::error(format!("can't rename \"{old}\": command doesn't exist")));
        }
        if self.commands.contains_key(new_key) {
            return Err(Exception::error(format!("can't rename to \"{new}\": command already exists")));
        }
        if let Some(cmd) = self.commands.remove(old_key) {
            self.commands.add(new_key.into(), cmd);
        }
        self.proc_epoch += 1;
        Ok(())
    }

    pub fn command_exists(&self, name: &str) -> bool {
        self.commands.contains_key(name.strip_prefix("::").unwrap_or(name))
    }

    pub(crate) fn get_command(&self, name: &str) -> Option<Rc<Command>> {
        self.commands.get(name.strip_prefix("::").unwrap_or(name)).cloned()
    }

    pub(crate) fn command_names(&self) -> Vec<(Obj, Rc<Command>)> {
        self.commands.iter().map(|(k, v)| (Obj::from(&**k), Rc::clone(v))).collect()
    }

    /// Name of the command run when a command is not found. It receives the
    /// original words as its arguments.
    pub fn set_unknown_handler(&mut self, name: &str) {
        self.unknown = Obj::from(name);
    }

    /// Restores the definitions a frame's `local` commands replaced.
    pub(crate) fn delete_local_commands(&mut self, frame: &CallFrame) {
        let names = std::mem::take(&mut *frame.local_commands.borrow_mut());
        if names.is_empty() {
            return;
        }
        for name in names.iter().rev() {
            let key = name.as_str().strip_prefix("::").unwrap_or(name.as_str());
            let Some(cmd) = self.commands.remove(key) else { continue };
            let prev = cmd.prev.borrow_mut().take();
            if let Some(prev) = prev {
                self.commands.add(key.into(), prev);
            }
        }
        self.proc_epoch += 1;
    }

    // ---- Associated data ----

    /// Attaches embedder data to the interpreter. `on_delete` runs when the
    /// entry is removed, replaced or the interpreter is dropped.
    pub fn set_assoc_data(&mut self, key: &str, data: Rc<dyn Any>, on_delete: Option<Box<dyn FnOnce()>>) {
        self.assoc.replace(key.into(), AssocEntry { data, on_delete });
    }

    pub fn assoc_data(&self, key: &str) -> Option<Rc<dyn Any>> {
        self.assoc.get(key).map(|e| Rc::clone(&e.data))
    }

    pub fn delete_assoc_data(&mut self, key: &str) -> bool {
        self.assoc.remove(key).is_some()
    }

    // ---- Packages ----

    pub fn package_provide(&mut self, name: &str, version: &str) {
        self.packages.replace(name.into(), Obj::from(version));
    }

    /// The version of a provided package.
    pub fn package_require(&self, name: &str) -> EvalResult {
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| Exception::error(format!("can't find package {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn config_builder() {
        let c = Config::default().max_call_depth(10).max_eval_depth(20).rand_seed(3);
        assert_eq!(c.max_call_depth, 10);
        assert_eq!(c.max_eval_depth, 20);
        assert_eq!(c.rand_seed, Some(3));
    }

    #[test]
    fn native_commands_capture_state() {
        let mut interp = Interp::new();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        interp.create_command("hit", move |_, argv| {
            c.set(c.get() + 1);
            Ok(Obj::from_int(argv.len() as i64))
        });
        assert_eq!(interp.eval("hit a b").unwrap().as_str(), "3");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn delete_and_rename() {
        let mut interp = Interp::new();
        let deleted = Rc::new(Cell::new(false));
        let d = Rc::clone(&deleted);
        interp.create_command_with_delete("tmp", |_, _| Ok(Obj::from("x")), move || d.set(true));
        interp.rename_command("tmp", "tmp2").unwrap();
        assert!(!interp.command_exists("tmp"));
        assert_eq!(interp.eval("tmp2").unwrap().as_str(), "x");
        interp.delete_command("tmp2").unwrap();
        assert!(deleted.get());
        assert!(interp.delete_command("tmp2").is_err());
    }

    #[test]
    fn assoc_data_delete_callbacks() {
        let dropped = Rc::new(Cell::new(0));
        {
            let mut interp = Interp::new();
            let d1 = Rc::clone(&dropped);
            interp.set_assoc_data("a", Rc::new(5i32), Some(Box::new(move || d1.set(d1.get() + 1))));
            let v = interp.assoc_data("a").unwrap();
            assert_eq!(v.downcast_ref::<i32>(), Some(&5));
            assert!(interp.delete_assoc_data("a"));
            assert_eq!(dropped.get(), 1);
            let d2 = Rc::clone(&dropped);
            interp.set_assoc_data("b", Rc::new(()), Some(Box::new(move || d2.set(d2.get() + 1))));
        }
        assert_eq!(dropped.get(), 2);
    }

    #[test]
    fn packages() {
        let mut interp = Interp::new();
        assert!(interp.package_require("json").is_err());
        interp.package_provide("json", "1.0");
        assert_eq!(interp.package_require("json").unwrap().as_str(), "1.0");
    }

    #[test]
    fn signals_stop_evaluation() {
        let mut interp = Interp::new();
        let handle = interp.signal_handle();
        interp.create_command("raise", move |_, _| {
            handle.store(1 << 2, Ordering::SeqCst);
            Ok(Obj::empty())
        });
        let err = interp.eval("set x 1; raise; set x 2").unwrap_err();
        assert_eq!(err.code, Code::Signal);
        assert_eq!(interp.get_var("x").unwrap().as_str(), "1");
    }
}
