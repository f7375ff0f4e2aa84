//! Variable lookup, links and `name(key)` dict sugar.

use std::cell::RefCell;
use std::rc::Rc;

use super::frame::{CallFrame, Var};
use super::{EvalResult, Exception, Interp};
use crate::obj::{Obj, SugarRef, dict};
use crate::parser::SubstFlags;

/// Link hops followed before a name is treated as missing.
const MAX_LINK_DEPTH: usize = 1000;

/// Where a variable name leads.
enum Found {
    /// A slot holding a value.
    Slot(Rc<RefCell<Var>>),
    /// No such variable; `key` in `frame` is where it would be created.
    Missing { frame: Rc<CallFrame>, key: String },
    /// `name(key)` to be applied in `frame`.
    Sugar { frame: Rc<CallFrame>, sugar: Rc<SugarRef> },
}

/// `::name` lives in the global frame.
fn split_global<'a>(frame: &Rc<CallFrame>, top: &Rc<CallFrame>, name: &'a str) -> (Rc<CallFrame>, &'a str) {
    match name.strip_prefix("::") {
        Some(rest) => (Rc::clone(top), rest),
        None => (Rc::clone(frame), name),
    }
}

impl Interp {
    fn locate(&self, name: &Obj) -> Found {
        if let Some(slot) = name.cached_var(self.frame.id) {
            return self.follow(slot, name);
        }
        if let Some(sugar) = name.dict_sugar() {
            return Found::Sugar { frame: Rc::clone(&self.frame), sugar };
        }
        let (frame, key) = split_global(&self.frame, &self.top, name.as_str());
        match frame.find_var(key) {
            Some(slot) => {
                if Rc::ptr_eq(&frame, &self.frame) {
                    name.cache_var(frame.id, &slot);
                }
                self.follow(slot, name)
            }
            None => Found::Missing { frame, key: key.to_string() },
        }
    }

    /// Resolves a chain of links starting at `slot`.
    fn follow(&self, mut slot: Rc<RefCell<Var>>, name: &Obj) -> Found {
        for _ in 0..MAX_LINK_DEPTH {
            let link = match &*slot.borrow() {
                Var::Value(_) => None,
                Var::Link { frame, name } => Some((frame.upgrade(), name.clone())),
            };
            let (frame, target) = match link {
                None => return Found::Slot(slot),
                Some((Some(frame), target)) => (frame, target),
                Some((None, _)) => break,
            };
            if let Some(sugar) = target.dict_sugar() {
                return Found::Sugar { frame, sugar };
            }
            match frame.find_var(target.as_str()) {
                Some(next) => slot = next,
                None => return Found::Missing { frame, key: target.to_string() },
            }
        }
        Found::Missing { frame: Rc::clone(&self.frame), key: name.to_string() }
    }

    /// Runs `f` with `frame` as the current frame.
    pub(crate) fn in_frame<R>(&mut self, frame: Rc<CallFrame>, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.frame, frame);
        let result = f(self);
        self.frame = saved;
        result
    }

    // ---- Public API ----

    pub fn get_var(&mut self, name: impl Into<Obj>) -> EvalResult {
        self.get_var_obj(&name.into())
    }

    pub fn set_var(&mut self, name: impl Into<Obj>, value: impl Into<Obj>) -> EvalResult<()> {
        self.set_var_obj(&name.into(), value.into())
    }

    pub fn unset_var(&mut self, name: impl Into<Obj>) -> EvalResult<()> {
        self.unset_var_obj(&name.into())
    }

    pub fn get_global_var(&mut self, name: impl Into<Obj>) -> EvalResult {
        let name = name.into();
        let top = self.top_frame();
        self.in_frame(top, |interp| interp.get_var_obj(&name))
    }

    pub fn set_global_var(&mut self, name: impl Into<Obj>, value: impl Into<Obj>) -> EvalResult<()> {
        let (name, value) = (name.into(), value.into());
        let top = self.top_frame();
        self.in_frame(top, |interp| interp.set_var_obj(&name, value))
    }

    /// Makes `name` in the current frame refer to `target` in the frame at
    /// absolute `level`.
    pub fn link_var(&mut self, name: impl Into<Obj>, target: impl Into<Obj>, level: usize) -> EvalResult<()> {
        let (name, target) = (name.into(), target.into());
        let frame = self
            .frame
            .ancestor(level)
            .ok_or_else(|| Exception::error(format!("bad level \"#{level}\"")))?;
        self.link_var_in(&name, &target, frame)
    }

    // ---- Core operations ----

    pub(crate) fn get_var_obj(&mut self, name: &Obj) -> EvalResult {
        match self.locate(name) {
            Found::Slot(slot) => match &*slot.borrow() {
                Var::Value(v) => Ok(v.clone()),
                Var::Link { .. } => Err(no_such_var("read", name)),
            },
            Found::Missing { .. } => Err(no_such_var("read", name)),
            Found::Sugar { frame, sugar } => self.in_frame(frame, |interp| interp.dict_sugar_get(&sugar.var, &sugar.key)),
        }
    }

    /// The variable's value, or `None` if it does not exist.
    pub(crate) fn find_var_value(&mut self, name: &Obj) -> Option<Obj> {
        self.get_var_obj(name).ok()
    }

    pub(crate) fn var_exists(&mut self, name: &Obj) -> bool {
        self.get_var_obj(name).is_ok()
    }

    pub(crate) fn set_var_obj(&mut self, name: &Obj, value: Obj) -> EvalResult<()> {
        match self.locate(name) {
            Found::Slot(slot) => {
                *slot.borrow_mut() = Var::Value(value);
                Ok(())
            }
            Found::Missing { frame, key } => {
                let slot = Rc::new(RefCell::new(Var::Value(value)));
                frame.vars.borrow_mut().add(key.into(), slot);
                Ok(())
            }
            Found::Sugar { frame, sugar } => self.in_frame(frame, |interp| interp.dict_sugar_set(&sugar, Some(value))),
        }
    }

    /// Removes a variable. Unsetting a link removes only the link.
    pub(crate) fn unset_var_obj(&mut self, name: &Obj) -> EvalResult<()> {
        if let Some(sugar) = name.dict_sugar() {
            return self.dict_sugar_set(&sugar, None);
        }
        let (frame, key) = split_global(&self.frame, &self.top, name.as_str());
        if frame.vars.borrow_mut().remove(key).is_some() {
            return Ok(());
        }
        if let Some(statics) = &frame.statics {
            if statics.borrow_mut().remove(key).is_some() {
                return Ok(());
            }
        }
        Err(no_such_var("unset", name))
    }

    /// Applies `f` to the variable's value in place, creating the variable
    /// as an empty string first if needed.
    pub(crate) fn modify_var<R>(&mut self, name: &Obj, f: impl FnOnce(&mut Obj) -> EvalResult<R>) -> EvalResult<R> {
        match self.locate(name) {
            Found::Slot(slot) => {
                let mut value = match &mut *slot.borrow_mut() {
                    Var::Value(v) => std::mem::take(v),
                    Var::Link { .. } => Obj::empty(),
                };
                let result = f(&mut value);
                *slot.borrow_mut() = Var::Value(value);
                result
            }
            Found::Missing { frame, key } => {
                let mut value = Obj::empty();
                let result = f(&mut value)?;
                frame.vars.borrow_mut().add(key.into(), Rc::new(RefCell::new(Var::Value(value))));
                Ok(result)
            }
            Found::Sugar { frame, sugar } => self.in_frame(frame, |interp| {
                let mut value = interp.dict_sugar_get(&sugar.var, &sugar.key).unwrap_or_default();
                let result = f(&mut value)?;
                interp.dict_sugar_set(&sugar, Some(value))?;
                Ok(result)
            }),
        }
    }

    /// `incr`: adds to an integer variable, in place when the value is not
    /// shared. A missing variable counts as zero.
    pub(crate) fn incr_var(&mut self, name: &Obj, by: i64) -> EvalResult {
        if let Found::Slot(slot) = self.locate(name) {
            if let Var::Value(v) = &mut *slot.borrow_mut() {
                let n = v.get_int()?.wrapping_add(by);
                v.set_int(n);
                return Ok(v.clone());
            }
        }
        let current = match self.get_var_obj(name) {
            Ok(v) => v.get_int()?,
            Err(_) => 0,
        };
        let value = Obj::from_int(current.wrapping_add(by));
        self.set_var_obj(name, value.clone())?;
        Ok(value)
    }

    /// Makes `name` in the current frame a link to `target` in `target_frame`.
    pub(crate) fn link_var_in(&mut self, name: &Obj, target: &Obj, target_frame: Rc<CallFrame>) -> EvalResult<()> {
        let (local_frame, local_key) = split_global(&self.frame, &self.top, name.as_str());
        let (target_frame, target_key) = split_global(&target_frame, &self.top, target.as_str());

        let existing = local_frame.vars.borrow().get(local_key).cloned();
        if let Some(slot) = existing {
            if matches!(&*slot.borrow(), Var::Value(_)) {
                return Err(Exception::error(format!("variable \"{name}\" already exists")));
            }
        }

        if Rc::ptr_eq(&local_frame, &target_frame) {
            let mut key = target_key.to_string();
            for _ in 0..MAX_LINK_DEPTH {
                if key == local_key {
                    return Err(Exception::error("can't upvar from variable to itself"));
                }
                let next = match target_frame.vars.borrow().get(key.as_str()).map(|s| s.borrow().clone()) {
                    Some(Var::Link { frame, name }) if frame.upgrade().is_some_and(|f| Rc::ptr_eq(&f, &target_frame)) => {
                        name.to_string()
                    }
                    _ => break,
                };
                key = next;
            }
        }

        let link = Var::Link { frame: Rc::downgrade(&target_frame), name: Obj::from(target_key) };
        local_frame.vars.borrow_mut().replace(local_key.into(), Rc::new(RefCell::new(link)));
        Ok(())
    }

    // ---- Dict sugar ----

    /// `$name(key)`: the key is substituted before the lookup.
    pub(crate) fn expand_dict_sugar(&mut self, token: &Obj) -> EvalResult {
        let Some(sugar) = token.dict_sugar() else {
            return self.get_var_obj(token);
        };
        let key = self.subst_obj(&sugar.key, SubstFlags::default())?;
        self.dict_sugar_get(&sugar.var, &key)
    }

    fn dict_sugar_get(&mut self, var: &Obj, key: &Obj) -> EvalResult {
        let value = self.get_var_obj(var)?;
        let fail = |what: &str| Exception::error(format!("can't read \"{var}({key})\": {what}"));
        let d = value.get_dict().map_err(|_| fail("variable isn't array"))?;
        d.get(key).cloned().ok_or_else(|| fail("no such element in array"))
    }

    /// Sets or (with `None`) removes one key of a dict variable.
    fn dict_sugar_set(&mut self, sugar: &SugarRef, value: Option<Obj>) -> EvalResult<()> {
        let SugarRef { var, key } = sugar;
        let exists = self.var_exists(var);
        let removing = value.is_none();
        let result = if removing && !exists {
            Err(Exception::error(""))
        } else {
            self.modify_var(var, |obj| dict::set_path(obj, std::slice::from_ref(key), value, true))
        };
        result.map_err(|_| {
            if removing && exists {
                Exception::error(format!("can't unset \"{var}({key})\": no such element in array"))
            } else {
                let verb = if removing { "unset" } else { "set" };
                Exception::error(format!("can't {verb} \"{var}({key})\": variable isn't array"))
            }
        })
    }

    // ---- Introspection ----

    /// Names of the variables visible in `frame`, statics included.
    pub(crate) fn var_names(&self, frame: &CallFrame, locals_only: bool) -> Vec<Obj> {
        let mut names = Vec::new();
        for (name, slot) in frame.vars.borrow().iter() {
            if locals_only && !matches!(&*slot.borrow(), Var::Value(_)) {
                continue;
            }
            names.push(Obj::from(&**name));
        }
        if !locals_only {
            if let Some(statics) = &frame.statics {
                names.extend(statics.borrow().keys().map(|k| Obj::from(&**k)));
            }
        }
        names
    }
}

fn no_such_var(verb: &str, name: &Obj) -> Exception {
    Exception::error(format!("can't {verb} \"{name}\": no such variable"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(interp: &mut Interp, src: &str) -> String {
        interp.eval(src).unwrap().to_string()
    }

    #[test]
    fn set_get_unset() {
        let mut interp = Interp::new();
        interp.set_var("a", "1").unwrap();
        assert_eq!(interp.get_var("a").unwrap().as_str(), "1");
        interp.unset_var("a").unwrap();
        assert_eq!(interp.get_var("a").unwrap_err().value.as_str(), "can't read \"a\": no such variable");
        assert_eq!(interp.unset_var("a").unwrap_err().value.as_str(), "can't unset \"a\": no such variable");
    }

    #[test]
    fn globals_from_procs() {
        let mut interp = Interp::new();
        ok(&mut interp, "set g 5; proc p {} {set ::g 6; return $::g}");
        assert_eq!(ok(&mut interp, "p"), "6");
        assert_eq!(interp.get_global_var("g").unwrap().as_str(), "6");
    }

    #[test]
    fn dict_sugar() {
        let mut interp = Interp::new();
        assert_eq!(ok(&mut interp, "set a(x) 1; set a(y) 2; set a(x)"), "1");
        assert_eq!(ok(&mut interp, "set k y; set a($k)"), "2");
        assert_eq!(ok(&mut interp, "unset a(x); dict size $a"), "1");
        let e = interp.eval("set a(nope)").unwrap_err();
        assert_eq!(e.value.as_str(), "can't read \"a(nope)\": no such element in array");
        let e = interp.eval("unset a(nope)").unwrap_err();
        assert_eq!(e.value.as_str(), "can't unset \"a(nope)\": no such element in array");
        let e = interp.eval("set s {1 2 3}; set s(1) x").unwrap_err();
        assert_eq!(e.value.as_str(), "can't set \"s(1)\": variable isn't array");
    }

    #[test]
    fn links() {
        let mut interp = Interp::new();
        ok(&mut interp, "set t 1");
        interp.link_var("alias", "t", 0).unwrap();
        ok(&mut interp, "set alias 9");
        assert_eq!(ok(&mut interp, "set t"), "9");
        let e = interp.eval("upvar 0 x x").unwrap_err();
        assert_eq!(e.value.as_str(), "can't upvar from variable to itself");
        let e = interp.eval("upvar 0 t t2; upvar 0 t2 t").unwrap_err();
        assert_eq!(e.value.as_str(), "variable \"t\" already exists");
        ok(&mut interp, "unset alias");
        assert_eq!(ok(&mut interp, "set t"), "9");
    }

    #[test]
    fn incr_in_place_keeps_sharing_safe() {
        let mut interp = Interp::new();
        assert_eq!(ok(&mut interp, "set i 1; set j $i; incr i; list $i $j"), "2 1");
        assert_eq!(ok(&mut interp, "incr fresh 3"), "3");
        assert!(interp.eval("set s abc; incr s").is_err());
    }
}
