//! Values with a lazily generated string form and a cached internal form.
//!
//! An [`Obj`] is a cheap, reference-counted handle. Every value has a
//! string form; it may additionally carry an internal representation (an
//! integer, a parsed list, a compiled script, ...) computed on demand by
//! the typed accessors. Converting between internal forms ("shimmering")
//! never changes the string form: before an internal form is replaced, the
//! string is generated from it if it was missing.
//!
//! Values are immutable through shared handles. The `modify_*` methods and
//! [`Obj::append_str`] take `&mut self` and copy the underlying value first
//! if any other handle shares it.

pub mod dict;
pub mod index;
pub mod list;
pub mod number;

use std::cell::{OnceCell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::commands::format::ScanFormat;
use crate::expr::ExprTree;
use crate::interp::command::Command;
use crate::interp::frame::Var;
use crate::interp::{Code, EvalResult, Exception};
use crate::parser::SubstFlags;
use crate::script::{Script, SubstScript};

pub use dict::Dict;
pub use index::Index;

#[derive(Clone)]
pub struct Obj(Rc<ObjInner>);

#[derive(Clone)]
struct ObjInner {
    string: OnceCell<String>,
    rep: RefCell<Rep>,
}

/// `name(key)` split out of a variable name or a `$name(key)` word.
#[derive(Debug, Clone)]
pub struct SugarRef {
    pub var: Obj,
    pub key: Obj,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Double(f64),
}

#[derive(Clone, Default)]
pub(crate) enum Rep {
    #[default]
    None,
    Int(i64),
    Double(f64),
    Index(Index),
    ReturnCode(Code),
    List(Rc<Vec<Obj>>),
    Dict(Rc<Dict>),
    Script(Rc<Script>),
    Subst { flags: SubstFlags, script: Rc<SubstScript> },
    Expr(Rc<ExprTree>),
    /// Resolved command, valid while the interpreter's procedure epoch
    /// matches.
    Command { epoch: u64, cmd: Weak<Command> },
    /// Resolved variable, valid while the frame id matches.
    Variable { frame_id: u64, var: Weak<RefCell<Var>> },
    DictSugar(Rc<SugarRef>),
    /// A word built as `prefix$name(key)`: remembers the dict-sugar parts.
    Interpolated(Rc<SugarRef>),
    ScanFormat(Rc<ScanFormat>),
    Regex { nocase: bool, re: Rc<regex::Regex> },
    /// Where this value appeared in a script.
    Source { file: Obj, line: u32 },
}

impl Rep {
    fn generate_string(&self) -> String {
        match self {
            Rep::Int(i) => i.to_string(),
            Rep::Double(d) => number::format_double(*d),
            Rep::Index(ix) => ix.to_string(),
            Rep::ReturnCode(c) => c.to_string(),
            Rep::List(items) => list::to_string(items),
            Rep::Dict(d) => dict::to_string(d),
            _ => String::new(),
        }
    }
}

impl Obj {
    fn from_rep(rep: Rep) -> Obj {
        Obj(Rc::new(ObjInner { string: OnceCell::new(), rep: RefCell::new(rep) }))
    }

    pub fn new(s: impl Into<String>) -> Obj {
        Obj(Rc::new(ObjInner { string: OnceCell::from(s.into()), rep: RefCell::new(Rep::None) }))
    }

    pub fn empty() -> Obj {
        Obj::new(String::new())
    }

    pub fn from_int(i: i64) -> Obj {
        Obj::from_rep(Rep::Int(i))
    }

    pub fn from_double(d: f64) -> Obj {
        Obj::from_rep(Rep::Double(d))
    }

    pub fn from_bool(b: bool) -> Obj {
        Obj::from_int(b as i64)
    }

    pub fn from_number(n: Number) -> Obj {
        match n {
            Number::Int(i) => Obj::from_int(i),
            Number::Double(d) => Obj::from_double(d),
        }
    }

    pub fn from_list(items: Vec<Obj>) -> Obj {
        Obj::from_rep(Rep::List(Rc::new(items)))
    }

    pub fn from_dict(dict: Dict) -> Obj {
        Obj::from_rep(Rep::Dict(Rc::new(dict)))
    }

    pub fn as_str(&self) -> &str {
        self.0.string.get_or_init(|| self.0.rep.borrow().generate_string())
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    /// True when another handle refers to the same value.
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.0) > 1
    }

    pub fn ptr_eq(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A list with no string form yet: evaluating it needs no parsing.
    pub fn is_pure_list(&self) -> bool {
        self.0.string.get().is_none() && matches!(*self.0.rep.borrow(), Rep::List(_))
    }

    pub(crate) fn rep(&self) -> Ref<'_, Rep> {
        self.0.rep.borrow()
    }

    /// Replaces the internal form, keeping the string form.
    pub(crate) fn set_rep(&self, rep: Rep) {
        self.as_str();
        let old = self.0.rep.replace(rep);
        drop(old);
    }

    // ---- Numbers ----

    pub fn as_int(&self) -> Option<i64> {
        match *self.rep() {
            Rep::Int(i) => return Some(i),
            Rep::Index(Index::Start(i)) => return Some(i),
            _ => {}
        }
        let i = number::parse_int(self.as_str())?;
        self.set_rep(Rep::Int(i));
        Some(i)
    }

    /// Stores an integer, in place when no other handle shares the value.
    pub fn set_int(&mut self, i: i64) {
        match Rc::get_mut(&mut self.0) {
            Some(inner) => {
                inner.string = OnceCell::new();
                *inner.rep.get_mut() = Rep::Int(i);
            }
            None => *self = Obj::from_int(i),
        }
    }

    pub fn get_int(&self) -> EvalResult<i64> {
        self.as_int().ok_or_else(|| Exception::error(format!("expected integer but got \"{self}\"")))
    }

    pub fn as_number(&self) -> Option<Number> {
        match *self.rep() {
            Rep::Int(i) => return Some(Number::Int(i)),
            Rep::Double(d) => return Some(Number::Double(d)),
            _ => {}
        }
        if let Some(i) = number::parse_int(self.as_str()) {
            self.set_rep(Rep::Int(i));
            return Some(Number::Int(i));
        }
        let d = number::parse_double(self.as_str())?;
        self.set_rep(Rep::Double(d));
        Some(Number::Double(d))
    }

    pub fn as_double(&self) -> Option<f64> {
        self.as_number().map(|n| match n {
            Number::Int(i) => i as f64,
            Number::Double(d) => d,
        })
    }

    pub fn get_double(&self) -> EvalResult<f64> {
        self.as_double()
            .ok_or_else(|| Exception::error(format!("expected floating-point number but got \"{self}\"")))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self.rep() {
            Rep::Int(i) => return Some(i != 0),
            Rep::Double(d) => return Some(d != 0.0),
            _ => {}
        }
        number::parse_bool(self.as_str())
    }

    pub fn get_bool(&self) -> EvalResult<bool> {
        self.as_bool().ok_or_else(|| Exception::error(format!("expected boolean but got \"{self}\"")))
    }

    pub fn get_index(&self) -> EvalResult<Index> {
        match *self.rep() {
            Rep::Index(ix) => return Ok(ix),
            Rep::Int(i) => return Ok(Index::Start(i)),
            _ => {}
        }
        match Index::parse(self.as_str()) {
            Some(ix) => {
                self.set_rep(Rep::Index(ix));
                Ok(ix)
            }
            None => Err(Exception::error(Index::error_message(self.as_str()))),
        }
    }

    pub fn get_code(&self) -> EvalResult<Code> {
        if let Rep::ReturnCode(c) = *self.rep() {
            return Ok(c);
        }
        match Code::parse(self) {
            Some(c) => {
                self.set_rep(Rep::ReturnCode(c));
                Ok(c)
            }
            None => Err(Exception::error(format!(
                "bad completion code \"{self}\": must be ok, error, return, break, continue, signal, exit, eval, or an integer"
            ))),
        }
    }

    // ---- Lists ----

    /// The value as a list. Parsing never fails: an unbalanced brace or
    /// quote runs to the end of the string.
    pub fn list(&self) -> Rc<Vec<Obj>> {
        let from_dict = match &*self.rep() {
            Rep::List(items) => return Rc::clone(items),
            Rep::Dict(d) => Some(dict::pairs(d)),
            _ => None,
        };
        let items = Rc::new(from_dict.unwrap_or_else(|| list::parse(self.as_str())));
        self.set_rep(Rep::List(Rc::clone(&items)));
        items
    }

    pub fn list_len(&self) -> usize {
        self.list().len()
    }

    /// Runs `f` on the list elements in place, copying them first if the
    /// element vector is shared. The string form is discarded.
    pub fn modify_list<R>(&mut self, f: impl FnOnce(&mut Vec<Obj>) -> R) -> R {
        let mut items = self.list();
        let inner = Rc::make_mut(&mut self.0);
        inner.string = OnceCell::new();
        *inner.rep.get_mut() = Rep::None;
        let result = f(Rc::make_mut(&mut items));
        *inner.rep.get_mut() = Rep::List(items);
        result
    }

    // ---- Dicts ----

    pub fn get_dict(&self) -> EvalResult<Rc<Dict>> {
        if let Rep::Dict(d) = &*self.rep() {
            return Ok(Rc::clone(d));
        }
        let items = self.list();
        let d = Rc::new(dict::from_list(&items)?);
        self.set_rep(Rep::Dict(Rc::clone(&d)));
        Ok(d)
    }

    pub fn modify_dict<R>(&mut self, f: impl FnOnce(&mut Dict) -> EvalResult<R>) -> EvalResult<R> {
        let mut d = self.get_dict()?;
        let inner = Rc::make_mut(&mut self.0);
        inner.string = OnceCell::new();
        *inner.rep.get_mut() = Rep::None;
        let result = f(Rc::make_mut(&mut d));
        *inner.rep.get_mut() = Rep::Dict(d);
        result
    }

    // ---- Strings ----

    pub fn append_str(&mut self, s: &str) {
        self.as_str();
        let inner = Rc::make_mut(&mut self.0);
        let mut string = inner.string.take().unwrap_or_default();
        string.push_str(s);
        inner.string = OnceCell::from(string);
        *inner.rep.get_mut() = Rep::None;
    }

    pub fn char_len(&self) -> usize {
        self.as_str().chars().count()
    }

    // ---- Compiled forms ----

    /// The value compiled as a script; cached until the value shimmers.
    pub fn script(&self) -> Rc<Script> {
        let source = match &*self.rep() {
            Rep::Script(s) => return Rc::clone(s),
            Rep::Source { file, line } => Some((file.clone(), *line)),
            _ => None,
        };
        let (file, line) = source.unwrap_or_else(|| (Obj::empty(), 1));
        let script = Rc::new(Script::compile(self.as_str(), file, line));
        self.set_rep(Rep::Script(Rc::clone(&script)));
        script
    }

    pub(crate) fn subst_script(&self, flags: SubstFlags) -> Rc<SubstScript> {
        if let Rep::Subst { flags: f, script } = &*self.rep() {
            if *f == flags {
                return Rc::clone(script);
            }
        }
        let script = Rc::new(SubstScript::compile(self.as_str(), flags));
        self.set_rep(Rep::Subst { flags, script: Rc::clone(&script) });
        script
    }

    pub fn expr_tree(&self) -> EvalResult<Rc<ExprTree>> {
        if let Rep::Expr(tree) = &*self.rep() {
            return Ok(Rc::clone(tree));
        }
        let tree = Rc::new(ExprTree::compile(self.as_str())?);
        self.set_rep(Rep::Expr(Rc::clone(&tree)));
        Ok(tree)
    }

    pub(crate) fn regex(&self, nocase: bool) -> EvalResult<Rc<regex::Regex>> {
        if let Rep::Regex { nocase: n, re } = &*self.rep() {
            if *n == nocase {
                return Ok(Rc::clone(re));
            }
        }
        let re = regex::RegexBuilder::new(self.as_str())
            .case_insensitive(nocase)
            .build()
            .map_err(|e| Exception::error(format!("couldn't compile regular expression pattern: {e}")))?;
        let re = Rc::new(re);
        self.set_rep(Rep::Regex { nocase, re: Rc::clone(&re) });
        Ok(re)
    }

    // ---- Source locations ----

    /// File and line this value was read from, when known.
    pub fn source_location(&self) -> Option<(Obj, u32)> {
        match &*self.rep() {
            Rep::Source { file, line } => Some((file.clone(), *line)),
            Rep::Script(s) => Some((s.file.clone(), s.first_line)),
            _ => None,
        }
    }

    pub(crate) fn set_source(&self, file: Obj, line: u32) {
        self.set_rep(Rep::Source { file, line });
    }

    // ---- Resolution caches ----

    pub(crate) fn cached_command(&self, epoch: u64) -> Option<Rc<Command>> {
        match &*self.rep() {
            Rep::Command { epoch: e, cmd } if *e == epoch => cmd.upgrade(),
            _ => None,
        }
    }

    pub(crate) fn cache_command(&self, epoch: u64, cmd: &Rc<Command>) {
        if matches!(*self.rep(), Rep::Script(_) | Rep::Expr(_)) {
            return;
        }
        self.set_rep(Rep::Command { epoch, cmd: Rc::downgrade(cmd) });
    }

    pub(crate) fn cached_var(&self, frame_id: u64) -> Option<Rc<RefCell<Var>>> {
        match &*self.rep() {
            Rep::Variable { frame_id: id, var } if *id == frame_id => var.upgrade(),
            _ => None,
        }
    }

    pub(crate) fn cache_var(&self, frame_id: u64, var: &Rc<RefCell<Var>>) {
        self.set_rep(Rep::Variable { frame_id, var: Rc::downgrade(var) });
    }

    /// Splits `name(key)` when the value has that shape.
    pub fn dict_sugar(&self) -> Option<Rc<SugarRef>> {
        match &*self.rep() {
            Rep::DictSugar(s) | Rep::Interpolated(s) => return Some(Rc::clone(s)),
            _ => {}
        }
        let s = self.as_str();
        if !s.ends_with(')') {
            return None;
        }
        let open = s.find('(')?;
        let sugar = Rc::new(SugarRef { var: Obj::from(&s[..open]), key: Obj::from(&s[open + 1..s.len() - 1]) });
        self.set_rep(Rep::DictSugar(Rc::clone(&sugar)));
        Some(sugar)
    }

    pub(crate) fn set_interpolated(&self, sugar: SugarRef) {
        self.set_rep(Rep::Interpolated(Rc::new(sugar)));
    }

    pub(crate) fn scan_format(&self) -> EvalResult<Rc<ScanFormat>> {
        if let Rep::ScanFormat(f) = &*self.rep() {
            return Ok(Rc::clone(f));
        }
        let fmt = Rc::new(ScanFormat::parse(self.as_str())?);
        self.set_rep(Rep::ScanFormat(Rc::clone(&fmt)));
        Ok(fmt)
    }
}

impl Default for Obj {
    fn default() -> Self {
        Obj::empty()
    }
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obj({:?})", self.as_str())
    }
}

/// Values compare by string form.
impl PartialEq for Obj {
    fn eq(&self, other: &Obj) -> bool {
        self.ptr_eq(other) || self.as_str() == other.as_str()
    }
}

impl Eq for Obj {}

impl From<&str> for Obj {
    fn from(s: &str) -> Obj {
        Obj::new(s)
    }
}

impl From<String> for Obj {
    fn from(s: String) -> Obj {
        Obj::new(s)
    }
}

impl From<&String> for Obj {
    fn from(s: &String) -> Obj {
        Obj::new(s.as_str())
    }
}

impl From<i64> for Obj {
    fn from(i: i64) -> Obj {
        Obj::from_int(i)
    }
}

impl From<f64> for Obj {
    fn from(d: f64) -> Obj {
        Obj::from_double(d)
    }
}

impl From<bool> for Obj {
    fn from(b: bool) -> Obj {
        Obj::from_bool(b)
    }
}

impl From<Vec<Obj>> for Obj {
    fn from(items: Vec<Obj>) -> Obj {
        Obj::from_list(items)
    }
}
