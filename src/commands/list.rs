//! List commands.

use std::cmp::Ordering;

use super::{Builtin, check_args, get_enum};
use crate::glob::glob_match;
use crate::interp::{EvalResult, Exception, Interp};
use crate::obj::{Index, Obj};

pub(super) const COMMANDS: &[(&str, Builtin)] = &[
    ("list", list),
    ("llength", llength),
    ("lindex", lindex),
    ("lset", lset),
    ("lappend", lappend),
    ("linsert", linsert),
    ("lreplace", lreplace),
    ("lrange", lrange),
    ("lrepeat", lrepeat),
    ("lreverse", lreverse),
    ("lsearch", lsearch),
    ("lsort", lsort),
    ("lassign", lassign),
    ("range", range),
    ("join", join),
    ("split", split),
];

fn list(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    Ok(Obj::from_list(argv[1..].to_vec()))
}

fn llength(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 2, "list")?;
    Ok(Obj::from_int(argv[1].list_len() as i64))
}

/// Position of `idx` in a sequence of `len`, if it is in range.
fn position(idx: &Obj, len: usize) -> EvalResult<Option<usize>> {
    let pos = idx.get_index()?.resolve(len);
    Ok(usize::try_from(pos).ok().filter(|p| *p < len))
}

/// A single index argument may itself be a list of indices.
fn index_path(args: &[Obj]) -> Vec<Obj> {
    match args {
        [one] => one.list().to_vec(),
        many => many.to_vec(),
    }
}

fn lindex(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "list ?index ...?")?;
    let mut current = argv[1].clone();
    for idx in index_path(&argv[2..]) {
        let items = current.list();
        match position(&idx, items.len())? {
            Some(p) => current = items[p].clone(),
            None => return Ok(Obj::empty()),
        }
    }
    Ok(current)
}

fn set_nested(list: &mut Obj, path: &[Obj], value: Obj) -> EvalResult<()> {
    let Some((first, rest)) = path.split_first() else {
        *list = value;
        return Ok(());
    };
    let pos = position(first, list.list_len())?.ok_or_else(|| Exception::error("list index out of range"))?;
    list.modify_list(|items| set_nested(&mut items[pos], rest, value))
}

fn lset(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 3, usize::MAX, "listVar ?index ...? value")?;
    let value = argv[argv.len() - 1].clone();
    let path = index_path(&argv[2..argv.len() - 1]);
    if path.is_empty() {
        interp.set_var_obj(&argv[1], value.clone())?;
        return Ok(value);
    }
    let mut list = interp.get_var_obj(&argv[1])?;
    set_nested(&mut list, &path, value)?;
    interp.set_var_obj(&argv[1], list.clone())?;
    Ok(list)
}

fn lappend(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "varName ?value value ...?")?;
    interp.modify_var(&argv[1], |var| {
        var.modify_list(|items| items.extend_from_slice(&argv[2..]));
        Ok(var.clone())
    })
}

fn linsert(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 3, usize::MAX, "list index ?element ...?")?;
    let mut list = argv[1].clone();
    let len = list.list_len();
    // `end` inserts after the last element.
    let pos = match argv[2].get_index()? {
        Index::Start(i) => i,
        Index::End(off) => (len as i64).saturating_add(off),
    };
    let pos = pos.clamp(0, len as i64) as usize;
    list.modify_list(|items| {
        items.splice(pos..pos, argv[3..].iter().cloned());
    });
    Ok(list)
}

/// Clamped `first..=last` bounds as a half-open range.
fn span(first: &Obj, last: &Obj, len: usize) -> EvalResult<(usize, usize)> {
    let first = first.get_index()?.resolve(len).clamp(0, len as i64) as usize;
    let last = last.get_index()?.resolve(len).min(len as i64 - 1);
    let end = if last < first as i64 { first } else { last as usize + 1 };
    Ok((first, end))
}

fn lreplace(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 4, usize::MAX, "list first last ?element ...?")?;
    let mut list = argv[1].clone();
    let (start, end) = span(&argv[2], &argv[3], list.list_len())?;
    list.modify_list(|items| {
        items.splice(start..end, argv[4..].iter().cloned());
    });
    Ok(list)
}

fn lrange(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 4, 4, "list first last")?;
    let items = argv[1].list();
    let (start, end) = span(&argv[2], &argv[3], items.len())?;
    Ok(Obj::from_list(items[start..end].to_vec()))
}

fn lrepeat(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "count ?value ...?")?;
    let count = argv[1].get_int()?;
    if count < 0 {
        return Err(Exception::error(format!("bad count \"{}\": must be integer >= 0", argv[1])));
    }
    let values = &argv[2..];
    let mut out = Vec::with_capacity(values.len() * count as usize);
    for _ in 0..count {
        out.extend_from_slice(values);
    }
    Ok(Obj::from_list(out))
}

fn lreverse(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 2, "list")?;
    let mut items = argv[1].list().to_vec();
    items.reverse();
    Ok(Obj::from_list(items))
}

const SEARCH_OPTIONS: &[&str] =
    &["-exact", "-glob", "-regexp", "-all", "-inline", "-bool", "-not", "-nocase", "-command"];

fn lsearch(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let usage = "?-exact|-glob|-regexp|-command 'command'? ?-bool|-inline? ?-not? ?-nocase? ?-all? list value";
    if argv.len() < 3 {
        return Err(Exception::wrong_args(&argv[..1], usage));
    }
    let (mut mode, mut all, mut inline, mut boolean, mut negate, mut nocase) = (1, false, false, false, false, false);
    let mut command = None;
    let mut i = 1;
    while i < argv.len() - 2 {
        match get_enum(&argv[i], SEARCH_OPTIONS, "option")? {
            m @ 0..=2 => mode = m,
            3 => all = true,
            4 => inline = true,
            5 => boolean = true,
            6 => negate = true,
            7 => nocase = true,
            _ => {
                i += 1;
                if i >= argv.len() - 2 {
                    return Err(Exception::wrong_args(&argv[..1], usage));
                }
                command = Some(argv[i].clone());
            }
        }
        i += 1;
    }
    let items = argv[argv.len() - 2].list();
    let pattern = &argv[argv.len() - 1];
    let regex = if mode == 2 && command.is_none() { Some(pattern.regex(nocase)?) } else { None };

    let mut found = Vec::new();
    for (pos, item) in items.iter().enumerate() {
        let hit = if let Some(cmd) = &command {
            let mut words = cmd.list().to_vec();
            words.push(pattern.clone());
            words.push(item.clone());
            interp.eval_list(&words)?.get_bool()?
        } else if let Some(re) = &regex {
            re.is_match(item.as_str())
        } else if mode == 0 {
            if nocase {
                item.as_str().to_lowercase() == pattern.as_str().to_lowercase()
            } else {
                item.as_str() == pattern.as_str()
            }
        } else {
            glob_match(pattern.as_str(), item.as_str(), nocase)
        };
        let hit = hit != negate;
        if all && boolean {
            found.push(Obj::from_bool(hit));
        } else if hit {
            found.push(if inline { item.clone() } else { Obj::from_int(pos as i64) });
            if !all {
                break;
            }
        }
    }

    if all {
        return Ok(Obj::from_list(found));
    }
    if boolean {
        return Ok(Obj::from_bool(!found.is_empty()));
    }
    Ok(found.into_iter().next().unwrap_or_else(|| if inline { Obj::empty() } else { Obj::from_int(-1) }))
}

#[derive(Clone, Copy)]
enum SortKind {
    Ascii,
    NoCase,
    Integer,
    Real,
    Command,
}

const SORT_OPTIONS: &[&str] =
    &["-ascii", "-nocase", "-integer", "-real", "-command", "-increasing", "-decreasing", "-index", "-unique"];

fn lsort(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let usage = "?options? list";
    check_args(argv, 2, usize::MAX, usage)?;
    let mut kind = SortKind::Ascii;
    let mut command = None;
    let mut decreasing = false;
    let mut index = None;
    let mut unique = false;
    let mut i = 1;
    let operand = |i: usize| {
        argv.get(i).filter(|_| i < argv.len() - 1).ok_or_else(|| Exception::wrong_args(&argv[..1], usage))
    };
    while i < argv.len() - 1 {
        match get_enum(&argv[i], SORT_OPTIONS, "option")? {
            0 => kind = SortKind::Ascii,
            1 => kind = SortKind::NoCase,
            2 => kind = SortKind::Integer,
            3 => kind = SortKind::Real,
            4 => {
                i += 1;
                command = Some(operand(i)?.clone());
                kind = SortKind::Command;
            }
            5 => decreasing = false,
            6 => decreasing = true,
            7 => {
                i += 1;
                index = Some(operand(i)?.get_index()?);
            }
            _ => unique = true,
        }
        i += 1;
    }

    let items = argv[argv.len() - 1].list();
    let mut keyed = Vec::with_capacity(items.len());
    for item in items.iter() {
        let key = match index {
            None => item.clone(),
            Some(ix) => {
                let sub = item.list();
                let pos = ix.resolve(sub.len());
                usize::try_from(pos).ok().and_then(|p| sub.get(p)).cloned().ok_or_else(|| {
                    Exception::error(format!("element {ix} missing from sublist \"{item}\""))
                })?
            }
        };
        keyed.push((key, item.clone()));
    }

    let mut failure = None;
    let mut compare = |a: &Obj, b: &Obj| -> Ordering {
        if failure.is_some() {
            return Ordering::Equal;
        }
        let ord = compare_keys(interp, kind, command.as_ref(), a, b);
        match ord {
            Ok(o) => if decreasing { o.reverse() } else { o },
            Err(e) => {
                failure = Some(e);
                Ordering::Equal
            }
        }
    };
    keyed.sort_by(|(a, _), (b, _)| compare(a, b));
    let mut sorted: Vec<(Obj, Obj)> = Vec::with_capacity(keyed.len());
    for entry in keyed {
        // Later duplicates replace earlier ones.
        if unique && sorted.last().is_some_and(|(prev, _)| compare(prev, &entry.0) == Ordering::Equal) {
            sorted.pop();
        }
        sorted.push(entry);
    }
    if let Some(e) = failure {
        return Err(e);
    }
    Ok(Obj::from_list(sorted.into_iter().map(|(_, item)| item).collect()))
}

fn compare_keys(interp: &mut Interp, kind: SortKind, command: Option<&Obj>, a: &Obj, b: &Obj) -> EvalResult<Ordering> {
    Ok(match kind {
        SortKind::Ascii => a.as_str().cmp(b.as_str()),
        SortKind::NoCase => a.as_str().to_lowercase().cmp(&b.as_str().to_lowercase()),
        SortKind::Integer => a.get_int()?.cmp(&b.get_int()?),
        SortKind::Real => a.get_double()?.total_cmp(&b.get_double()?),
        SortKind::Command => {
            let mut words = command.map(|c| c.list().to_vec()).unwrap_or_default();
            words.push(a.clone());
            words.push(b.clone());
            interp.eval_list(&words)?.get_int()?.cmp(&0)
        }
    })
}

fn lassign(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, usize::MAX, "list ?varName ...?")?;
    let items = argv[1].list();
    for (i, var) in argv[2..].iter().enumerate() {
        interp.set_var_obj(var, items.get(i).cloned().unwrap_or_default())?;
    }
    let used = (argv.len() - 2).min(items.len());
    Ok(Obj::from_list(items[used..].to_vec()))
}

fn range(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 4, "?start? end ?step?")?;
    let (start, end, step) = match argv.len() {
        2 => (0, argv[1].get_int()?, 1),
        3 => (argv[1].get_int()?, argv[2].get_int()?, 1),
        _ => (argv[1].get_int()?, argv[2].get_int()?, argv[3].get_int()?),
    };
    let invalid = || Exception::error("Invalid (infinite?) range specified");
    if step == 0 || (step > 0 && start > end) || (step < 0 && end > start) {
        return Err(invalid());
    }
    let span = end.abs_diff(start);
    let count = if span == 0 { 0 } else { 1 + (span - 1) / step.unsigned_abs() };
    let mut out = Vec::with_capacity(count as usize);
    let mut v = start;
    for _ in 0..count {
        out.push(Obj::from_int(v));
        v = v.wrapping_add(step);
    }
    Ok(Obj::from_list(out))
}

fn join(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 3, "list ?joinString?")?;
    let sep = argv.get(2).map_or(" ", |s| s.as_str());
    let items = argv[1].list();
    let parts: Vec<&str> = items.iter().map(|i| i.as_str()).collect();
    Ok(Obj::new(parts.join(sep)))
}

fn split(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    check_args(argv, 2, 3, "string ?splitChars?")?;
    let s = argv[1].as_str();
    let seps = argv.get(2).map_or(" \t\n\r", |s| s.as_str());
    if s.is_empty() {
        return Ok(Obj::from_list(Vec::new()));
    }
    let out = if seps.is_empty() {
        s.chars().map(|c| Obj::new(c.to_string())).collect()
    } else {
        s.split(|c| seps.contains(c)).map(Obj::from).collect()
    };
    Ok(Obj::from_list(out))
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
    fn lindex_forms() {
        assert_eq!(ok("lindex {1 2 3 4 5} end-1"), "4");
        assert_eq!(ok("lindex {a b c} 5"), "");
        assert_eq!(ok("lindex {a b c} -1"), "");
        assert_eq!(ok("lindex {{a b} {c d}} 1 0"), "c");
        assert_eq!(ok("lindex {{a b} {c d}} {1 1}"), "d");
        assert_eq!(ok("lindex {a b}"), "a b");
        assert!(run("lindex {a} x").unwrap_err().starts_with("bad index \"x\""));
    }

    #[test]
    fn lset_nested() {
        assert_eq!(ok("set l {a {b c}}; lset l 1 0 X; set l"), "a {X c}");
        assert_eq!(ok("set l {a b}; lset l new"), "new");
        assert_eq!(run("set l {a b}; lset l 5 x").unwrap_err(), "list index out of range");
    }

    #[test]
    fn lappend_does_not_touch_copies() {
        assert_eq!(ok("set a {1 2}; set b $a; lappend b 3; list $a $b"), "{1 2} {1 2 3}");
        assert_eq!(ok("lappend fresh x y"), "x y");
    }

    #[test]
    fn insert_replace_range() {
        assert_eq!(ok("linsert {a b c} 1 X Y"), "a X Y b c");
        assert_eq!(ok("linsert {a b} end X"), "a b X");
        assert_eq!(ok("linsert {a b} end-1 X"), "a X b");
        assert_eq!(ok("lreplace {a b c d} 1 2 X"), "a X d");
        assert_eq!(ok("lreplace {a b c} 1 0 X"), "a X b c");
        assert_eq!(ok("lrange {a b c d} 1 end"), "b c d");
        assert_eq!(ok("lrange {a b c} 2 1"), "");
    }

    #[test]
    fn repeat_reverse_range() {
        assert_eq!(ok("lrepeat 2 a b"), "a b a b");
        assert_eq!(ok("lreverse {1 2 3}"), "3 2 1");
        assert_eq!(ok("range 4"), "0 1 2 3");
        assert_eq!(ok("range 1 10 3"), "1 4 7");
        assert_eq!(ok("range 5 0 -2"), "5 3 1");
        assert_eq!(run("range 1 5 0").unwrap_err(), "Invalid (infinite?) range specified");
    }

    #[test]
    fn searching() {
        assert_eq!(ok("lsearch {apple banana cherry} b*"), "1");
        assert_eq!(ok("lsearch -exact {a b c} d"), "-1");
        assert_eq!(ok("lsearch -all -inline {a1 b2 a3} a*"), "a1 a3");
        assert_eq!(ok("lsearch -not -exact {a a b} a"), "2");
        assert_eq!(ok("lsearch -bool {x y} y"), "1");
        assert_eq!(ok("lsearch -all -bool {x y x} x"), "1 0 1");
        assert_eq!(ok("lsearch -regexp {abc xyz} {^x}"), "1");
        assert_eq!(ok("lsearch -exact -nocase {A B} b"), "1");
    }

    #[test]
    fn sorting() {
        assert_eq!(ok("lsort {c a b}"), "a b c");
        assert_eq!(ok("lsort -integer {10 9 100}"), "9 10 100");
        assert_eq!(ok("lsort -decreasing -real {1.5 3 2}"), "3 2 1.5");
        assert_eq!(ok("lsort -nocase {b A c}"), "A b c");
        assert_eq!(ok("lsort -unique {b a b c a}"), "a b c");
        assert_eq!(ok("lsort -index 1 {{x 3} {y 1} {z 2}}"), "{y 1} {z 2} {x 3}");
        assert_eq!(ok("proc cmp {a b} {expr {[string length $a] - [string length $b]}}; lsort -command cmp {ccc a bb}"), "a bb ccc");
        assert_eq!(run("lsort -integer {1 x}").unwrap_err(), "expected integer but got \"x\"");
    }

    #[test]
    fn assign_join_split() {
        assert_eq!(ok("lassign {1 2 3} a b; list $a $b"), "1 2");
        assert_eq!(ok("lassign {1 2 3} a"), "2 3");
        assert_eq!(ok("lassign {1} a b; set b"), "");
        assert_eq!(ok("join {a b c} ,"), "a,b,c");
        assert_eq!(ok("split a,b,,c ,"), "a b {} c");
        assert_eq!(ok("split abc {}"), "a b c");
        assert_eq!(ok("llength [split {a  b}]"), "3");
    }

    #[test]
    fn extreme_end_offsets_clamp() {
        assert_eq!(ok("lrange {a b c} end-9223372036854775807 end+9223372036854775807"), "a b c");
        assert_eq!(ok("lindex {a b c} end+9223372036854775807"), "");
        assert_eq!(ok("linsert {a b} end+9223372036854775807 x"), "a b x");
        assert_eq!(ok("linsert {a b} end-9223372036854775807 x"), "x a b");
        assert_eq!(ok("lreplace {a b c} 9223372036854775807+1 end x"), "a b c x");
    }
}
