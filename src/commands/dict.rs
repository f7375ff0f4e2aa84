//! The `dict` ensemble.

use super::{Builtin, get_enum};
use crate::glob::glob_match;
use crate::interp::{Code, EvalResult, Exception, Interp};
use crate::obj::dict::{self as dicts, Dict, key_not_known, set_path};
use crate::obj::Obj;

pub(super) const COMMANDS: &[(&str, Builtin)] = &[("dict", dict)];

const SUBCOMMANDS: &[(&str, Builtin)] = &[
    ("create", create),
    ("get", get),
    ("getdef", getdef),
    ("getwithdefault", getdef),
    ("set", set),
    ("unset", unset),
    ("exists", exists),
    ("keys", keys),
    ("values", values),
    ("size", size),
    ("info", info),
    ("merge", merge),
    ("with", with),
    ("update", update),
    ("append", append),
    ("lappend", lappend),
    ("incr", incr),
    ("replace", replace),
    ("remove", remove),
    ("for", for_cmd),
    ("map", map),
    ("filter", filter),
];

fn dict(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    if argv.len() < 2 {
        return Err(Exception::wrong_args(&argv[..1], "subcommand ?arg ...?"));
    }
    let names: Vec<&str> = SUBCOMMANDS.iter().map(|(name, _)| *name).collect();
    let which = get_enum(&argv[1], &names, "subcommand")?;
    (SUBCOMMANDS[which].1)(interp, argv)
}

/// Arity check for `dict <sub>`: counts include the two command words.
fn sub_args(argv: &[Obj], min: usize, max: usize, usage: &str) -> EvalResult<()> {
    if argv.len() < min || argv.len() > max {
        return Err(Exception::wrong_args(&argv[..2], usage));
    }
    Ok(())
}

/// Follows `keys` down nested dicts. `Ok(None)` when a key is missing.
fn lookup(dict: &Obj, keys: &[Obj]) -> EvalResult<Option<Obj>> {
    let mut current = dict.clone();
    for key in keys {
        let d = current.get_dict()?;
        match d.get(key) {
            Some(v) => {
                let next = v.clone();
                current = next;
            }
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

fn create(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    if argv.len() % 2 != 0 {
        return Err(Exception::wrong_args(&argv[..2], "?key value ...?"));
    }
    Ok(Obj::from_dict(dicts::from_list(&argv[2..])?))
}

fn get(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, usize::MAX, "dictionary ?key ...?")?;
    let mut current = argv[2].clone();
    for key in &argv[3..] {
        let d = current.get_dict()?;
        let next = d.get(key).cloned().ok_or_else(|| key_not_known(key))?;
        current = next;
    }
    Ok(current)
}

fn getdef(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 5, usize::MAX, "dictionary ?key ...? key default")?;
    let default = &argv[argv.len() - 1];
    Ok(lookup(&argv[2], &argv[3..argv.len() - 1])?.unwrap_or_else(|| default.clone()))
}

fn set(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 5, usize::MAX, "varName key ?key ...? value")?;
    let value = argv[argv.len() - 1].clone();
    let keys = &argv[3..argv.len() - 1];
    interp.modify_var(&argv[2], |d| {
        set_path(d, keys, Some(value), false)?;
        Ok(d.clone())
    })
}

fn unset(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, usize::MAX, "varName key ?key ...?")?;
    interp.get_var_obj(&argv[2])?;
    interp.modify_var(&argv[2], |d| {
        set_path(d, &argv[3..], None, false)?;
        Ok(d.clone())
    })
}

fn exists(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, usize::MAX, "dictionary key ?key ...?")?;
    let found = lookup(&argv[2], &argv[3..]).ok().flatten().is_some();
    Ok(Obj::from_bool(found))
}

/// `dict keys` and `dict values`: entries whose chosen side matches the
/// optional glob pattern.
fn matching(argv: &[Obj], want_keys: bool) -> EvalResult {
    sub_args(argv, 3, 4, "dictionary ?pattern?")?;
    let d = argv[2].get_dict()?;
    let pattern = argv.get(3).map(|p| p.as_str());
    let mut out = Vec::new();
    for (k, v) in d.iter() {
        let item = if want_keys { k } else { v };
        if pattern.is_none_or(|p| glob_match(p, item.as_str(), false)) {
            out.push(item.clone());
        }
    }
    Ok(Obj::from_list(out))
}

fn keys(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    matching(argv, true)
}

fn values(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    matching(argv, false)
}

fn size(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "dictionary")?;
    Ok(Obj::from_int(argv[2].get_dict()?.len() as i64))
}

fn info(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "dictionary")?;
    Ok(Obj::new(argv[2].get_dict()?.stats()))
}

fn merge(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let mut out = Dict::new();
    for d in &argv[2..] {
        for (k, v) in d.get_dict()?.iter() {
            out.replace(k.clone(), v.clone());
        }
    }
    Ok(Obj::from_dict(out))
}

fn replace(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    if argv.len() < 3 || argv.len() % 2 == 0 {
        return Err(Exception::wrong_args(&argv[..2], "dictionary ?key value ...?"));
    }
    let mut d = argv[2].clone();
    d.modify_dict(|table| {
        for pair in argv[3..].chunks_exact(2) {
            table.replace(pair[0].clone(), pair[1].clone());
        }
        Ok(())
    })?;
    Ok(d)
}

fn remove(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, usize::MAX, "dictionary ?key ...?")?;
    let mut d = argv[2].clone();
    d.modify_dict(|table| {
        for key in &argv[3..] {
            table.remove(key);
        }
        Ok(())
    })?;
    Ok(d)
}

/// Applies `f` to the value stored under `key` in the dict variable,
/// starting from an empty value when the key is missing.
fn update_entry(interp: &mut Interp, argv: &[Obj], f: impl FnOnce(&mut Obj) -> EvalResult<()>) -> EvalResult {
    let key = &argv[3];
    interp.modify_var(&argv[2], |d| {
        let mut entry = d.get_dict()?.get(key).cloned().unwrap_or_default();
        f(&mut entry)?;
        d.modify_dict(|table| {
            table.replace(key.clone(), entry);
            Ok(())
        })?;
        Ok(d.clone())
    })
}

fn append(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, usize::MAX, "varName key ?value ...?")?;
    update_entry(interp, argv, |entry| {
        for piece in &argv[4..] {
            entry.append_str(piece.as_str());
        }
        Ok(())
    })
}

fn lappend(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, usize::MAX, "varName key ?value ...?")?;
    update_entry(interp, argv, |entry| {
        entry.modify_list(|items| items.extend_from_slice(&argv[4..]));
        Ok(())
    })
}

fn incr(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, 5, "varName key ?increment?")?;
    let by = match argv.get(4) {
        Some(v) => v.get_int()?,
        None => 1,
    };
    update_entry(interp, argv, |entry| {
        let current = if entry.is_empty() { 0 } else { entry.get_int()? };
        *entry = Obj::from_int(current.wrapping_add(by));
        Ok(())
    })
}

/// Writes `names` back into the dict at `path` inside variable `var`:
/// each name that is still a variable sets its key, the others are removed.
fn write_back(interp: &mut Interp, var: &Obj, path: &[Obj], names: &[(Obj, Obj)]) -> EvalResult<()> {
    let Some(mut outer) = interp.find_var_value(var) else {
        return Ok(());
    };
    let mut inner = if path.is_empty() { outer.clone() } else { lookup(&outer, path)?.unwrap_or_default() };
    for (key, name) in names {
        let value = interp.find_var_value(name);
        inner.modify_dict(|table| {
            match value {
                Some(v) => {
                    table.replace(key.clone(), v);
                }
                None => {
                    table.remove(key);
                }
            }
            Ok(())
        })?;
    }
    if path.is_empty() {
        outer = inner;
    } else {
        set_path(&mut outer, path, Some(inner), false)?;
    }
    interp.set_var_obj(var, outer)
}

fn with(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, usize::MAX, "dictVar ?key ...? script")?;
    let var = &argv[2];
    let path = &argv[3..argv.len() - 1];
    let script = &argv[argv.len() - 1];
    let outer = interp.get_var_obj(var)?;
    let mut inner = outer.clone();
    for key in path {
        let next = inner.get_dict()?.get(key).cloned().ok_or_else(|| key_not_known(key))?;
        inner = next;
    }
    let mut names = Vec::new();
    for (k, v) in inner.get_dict()?.iter() {
        interp.set_var_obj(k, v.clone())?;
        names.push((k.clone(), k.clone()));
    }
    let result = interp.eval_obj(script);
    write_back(interp, var, path, &names)?;
    result
}

fn update(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    if argv.len() < 6 || argv.len() % 2 != 0 {
        return Err(Exception::wrong_args(&argv[..2], "varName key varName ?key varName ...? script"));
    }
    let var = &argv[2];
    let script = &argv[argv.len() - 1];
    let d = interp.get_var_obj(var)?.get_dict()?;
    let mut names = Vec::new();
    for pair in argv[3..argv.len() - 1].chunks_exact(2) {
        let (key, name) = (&pair[0], &pair[1]);
        match d.get(key) {
            Some(v) => interp.set_var_obj(name, v.clone())?,
            None => {
                let _ = interp.unset_var_obj(name);
            }
        }
        names.push((key.clone(), name.clone()));
    }
    let result = interp.eval_obj(script);
    write_back(interp, var, &[], &names)?;
    result
}

/// Parses the `{keyVar valueVar}` of `dict for`, `map` and `filter script`.
fn pair_vars(argv: &[Obj], vars: &Obj) -> EvalResult<(Obj, Obj)> {
    match vars.list().as_slice() {
        [k, v] => Ok((k.clone(), v.clone())),
        _ => Err(Exception::error(format!("must have exactly two variable names in \"{} {}\"", argv[0], argv[1]))),
    }
}

/// Runs `script` for each entry; `visit` sees the entry and the body's
/// result. Stops early on `break`, skips on `continue`.
fn each_entry(
    interp: &mut Interp,
    argv: &[Obj],
    mut visit: impl FnMut(&mut Interp, &Obj, &Obj, Obj) -> EvalResult<()>,
) -> EvalResult<()> {
    let (kvar, vvar) = pair_vars(argv, &argv[2])?;
    let d = argv[3].get_dict()?;
    let script = &argv[4];
    for (k, v) in d.iter() {
        interp.set_var_obj(&kvar, k.clone())?;
        interp.set_var_obj(&vvar, v.clone())?;
        match interp.eval_obj(script) {
            Ok(r) => visit(interp, k, v, r)?,
            Err(e) => match e.code {
                Code::Break => break,
                Code::Continue => {}
                _ => return Err(e),
            },
        }
    }
    Ok(())
}

fn for_cmd(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 5, 5, "vars dictionary script")?;
    each_entry(interp, argv, |_, _, _, _| Ok(()))?;
    Ok(Obj::empty())
}

fn map(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 5, 5, "vars dictionary script")?;
    let (kvar, _) = pair_vars(argv, &argv[2])?;
    let mut out = Dict::new();
    each_entry(interp, argv, |interp, _, _, r| {
        let key = interp.get_var_obj(&kvar)?;
        out.replace(key, r);
        Ok(())
    })?;
    Ok(Obj::from_dict(out))
}

fn filter(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, usize::MAX, "dictionary filterType ...")?;
    let kind = get_enum(&argv[3], &["key", "value", "script"], "filter type")?;
    let d = argv[2].get_dict()?;
    let mut out = Dict::new();
    if kind == 2 {
        if argv.len() != 6 {
            return Err(Exception::wrong_args(&argv[..2], "dictionary script {keyVar valueVar} filterScript"));
        }
        let (kvar, vvar) = pair_vars(argv, &argv[4])?;
        for (k, v) in d.iter() {
            interp.set_var_obj(&kvar, k.clone())?;
            interp.set_var_obj(&vvar, v.clone())?;
            match interp.eval_obj(&argv[5]) {
                Ok(r) => {
                    if r.get_bool()? {
                        out.replace(k.clone(), v.clone());
                    }
                }
                Err(e) => match e.code {
                    Code::Break => break,
                    Code::Continue => {}
                    _ => return Err(e),
                },
            }
        }
        return Ok(Obj::from_dict(out));
    }
    let patterns = &argv[4..];
    for (k, v) in d.iter() {
        let subject = if kind == 0 { k } else { v };
        if patterns.iter().any(|p| glob_match(p.as_str(), subject.as_str(), false)) {
            out.replace(k.clone(), v.clone());
        }
    }
    Ok(Obj::from_dict(out))
}

#[cfg(test)]
mod tests {
    use crate::interp::Interp;

    fn run(src: &str) -> Result<String, String> {
        Interp::new().eval(src).map(|v| v.to_string()).map_err(|e| e.value.to_string())
    }

    fn ok(src: &str) -> String {
        run(src).unwrap_or_else(|e| panic!("{src}: {e}"))
    }

    #[test]
    fn create_and_get() {
        assert_eq!(ok("set D [dict create x 1 y 2]; dict get $D y"), "2");
        assert_eq!(ok("dict size [dict create a 1 b 2]"), "2");
        assert_eq!(ok("dict get {a {b {c 5}}} a b c"), "5");
        assert_eq!(run("dict get {a 1} z").unwrap_err(), "key \"z\" not known in dictionary");
        assert_eq!(run("dict create a").unwrap_err(), "wrong # args: should be \"dict create ?key value ...?\"");
        assert!(run("dict bogus").unwrap_err().starts_with("bad subcommand \"bogus\""));
    }

    #[test]
    fn defaults_and_exists() {
        assert_eq!(ok("dict getdef {a 1} b 9"), "9");
        assert_eq!(ok("dict getwithdefault {a {b 2}} a b 9"), "2");
        assert_eq!(ok("dict exists {a {b 2}} a b"), "1");
        assert_eq!(ok("dict exists {a {b 2}} a c"), "0");
        assert_eq!(ok("dict exists {a 1} a b"), "0");
    }

    #[test]
    fn set_unset_nested() {
        assert_eq!(ok("dict set d a b 1; dict get $d a b"), "1");
        assert_eq!(ok("set d {a 1 b 2}; dict unset d a; dict keys $d"), "b");
        assert_eq!(ok("set d {a 1}; dict unset d zz; dict size $d"), "1");
        assert!(run("dict unset nosuch a").is_err());
    }

    #[test]
    fn keys_values_patterns() {
        assert_eq!(ok("lsort [dict keys [dict create a 1 b 2 c 3] *]"), "a b c");
        assert_eq!(ok("dict keys {ab 1 cd 2} a*"), "ab");
        assert_eq!(ok("dict values {a x1 b y2} x*"), "x1");
    }

    #[test]
    fn merge_replace_remove() {
        assert_eq!(ok("dict get [dict merge {a 1 b 2} {b 3}] b"), "3");
        assert_eq!(ok("dict get [dict replace {a 1} a 2 c 3] a"), "2");
        assert_eq!(ok("dict size [dict remove {a 1 b 2} a zz]"), "1");
    }

    #[test]
    fn entry_updates() {
        assert_eq!(ok("dict append d k ab cd; dict get $d k"), "abcd");
        assert_eq!(ok("dict lappend d k x; dict lappend d k y; dict get $d k"), "x y");
        assert_eq!(ok("dict incr d n; dict incr d n 4; dict get $d n"), "5");
    }

    #[test]
    fn with_and_update() {
        assert_eq!(ok("set d {a 1 b 2}; dict with d {set a 10; unset b}; list [dict get $d a] [dict exists $d b]"), "10 0");
        assert_eq!(ok("set d {p {x 1}}; dict with d p {incr x}; dict get $d p x"), "2");
        assert_eq!(ok("set d {a 1}; dict update d a va b vb {incr va; set vb new}; list [dict get $d a] [dict get $d b]"), "2 new");
    }

    #[test]
    fn iteration() {
        assert_eq!(ok("set s 0; dict for {k v} {a 1 b 2 c 3} {incr s $v}; set s"), "6");
        assert_eq!(ok("dict get [dict map {k v} {a 1 b 2} {expr {$v * 10}}] b"), "20");
        assert_eq!(ok("dict keys [dict filter {a 1 bb 2} key b*]"), "bb");
        assert_eq!(ok("dict keys [dict filter {a 1 b 2} value 1]"), "a");
        assert_eq!(ok("dict keys [dict filter {a 1 b 5} script {k v} {expr {$v > 2}}]"), "b");
        assert_eq!(run("dict for {k} {a 1} {}").unwrap_err(), "must have exactly two variable names in \"dict for\"");
    }

    #[test]
    fn dict_info_reports_entries() {
        assert!(ok("dict info {a 1 b 2}").starts_with("2 entries in table"));
    }
}
