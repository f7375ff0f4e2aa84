//! Call frames and variable slots.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::command::Command;
use crate::hashtable::HashTable;
use crate::obj::Obj;

pub type VarTable = HashTable<Box<str>, Rc<RefCell<Var>>>;

#[derive(Debug, Clone)]
pub enum Var {
    Value(Obj),
    /// `upvar`/`global`: the variable called `name` in `frame`.
    Link { frame: Weak<CallFrame>, name: Obj },
}

/// The command a `tailcall` asked its caller's frame to run next.
pub struct TailCall {
    pub argv: Vec<Obj>,
    pub cmd: Rc<Command>,
}

pub struct CallFrame {
    pub id: u64,
    pub level: usize,
    pub parent: Option<Rc<CallFrame>>,
    pub vars: RefCell<VarTable>,
    /// Static variables of the running procedure, shared across its calls.
    pub statics: Option<Rc<RefCell<VarTable>>>,
    /// The words the frame's procedure was invoked with.
    pub argv: Vec<Obj>,
    /// Formal argument list and body of the running procedure.
    pub proc_args: Option<Obj>,
    pub proc_body: Option<Obj>,
    /// Where the procedure was called from.
    pub file: Obj,
    pub line: u32,
    /// Names of commands created by `local`, removed on frame exit.
    pub local_commands: RefCell<Vec<Obj>>,
    pub tailcall: RefCell<Option<TailCall>>,
    /// Non-zero while a procedure is replaying this frame's tail calls.
    pub tailcall_active: Cell<u32>,
}

impl CallFrame {
    pub fn top(id: u64) -> CallFrame {
        CallFrame {
            id,
            level: 0,
            parent: None,
            vars: RefCell::new(VarTable::new()),
            statics: None,
            argv: Vec::new(),
            proc_args: None,
            proc_body: None,
            file: Obj::empty(),
            line: 0,
            local_commands: RefCell::new(Vec::new()),
            tailcall: RefCell::new(None),
            tailcall_active: Cell::new(0),
        }
    }

    pub fn child(parent: &Rc<CallFrame>, id: u64, argv: Vec<Obj>) -> CallFrame {
        CallFrame { level: parent.level + 1, parent: Some(Rc::clone(parent)), argv, ..CallFrame::top(id) }
    }

    /// Looks up a slot in this frame, then in the procedure's statics.
    pub fn find_var(&self, name: &str) -> Option<Rc<RefCell<Var>>> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(Rc::clone(v));
        }
        self.statics.as_ref().and_then(|s| s.borrow().get(name).cloned())
    }

    pub fn is_top(&self) -> bool {
        self.parent.is_none()
    }

    /// Walks up from this frame to the one at `level`.
    pub fn ancestor(self: &Rc<Self>, level: usize) -> Option<Rc<CallFrame>> {
        let mut cur = Rc::clone(self);
        loop {
            if cur.level == level {
                return Some(cur);
            }
            cur = Rc::clone(cur.parent.as_ref()?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_chain_to_top() {
        let top = Rc::new(CallFrame::top(1));
        let a = Rc::new(CallFrame::child(&top, 2, vec![Obj::from("p")]));
        let b = Rc::new(CallFrame::child(&a, 3, Vec::new()));
        assert_eq!(b.level, 2);
        assert_eq!(b.ancestor(0).map(|f| f.id), Some(1));
        assert_eq!(b.ancestor(1).map(|f| f.id), Some(2));
        assert!(b.ancestor(5).is_none());
        assert!(top.is_top());
    }

    #[test]
    fn statics_are_a_fallback() {
        let top = Rc::new(CallFrame::top(1));
        let mut statics = VarTable::new();
        statics.add("s".into(), Rc::new(RefCell::new(Var::Value(Obj::from("1")))));
        let frame = CallFrame { statics: Some(Rc::new(RefCell::new(statics))), ..CallFrame::child(&top, 2, Vec::new()) };
        assert!(frame.find_var("s").is_some());
        frame.vars.borrow_mut().add("s".into(), Rc::new(RefCell::new(Var::Value(Obj::from("local")))));
        let v = frame.find_var("s").unwrap();
        assert!(matches!(&*v.borrow(), Var::Value(o) if o.as_str() == "local"));
    }
}
