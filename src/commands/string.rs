//! The `string` ensemble. Indices count characters, not bytes.

use std::cmp::Ordering;

use super::{Builtin, get_enum};
use crate::glob::glob_match;
use crate::interp::{EvalResult, Exception, Interp};
use crate::obj::Obj;
use crate::obj::number::parse_bool;
use crate::parser::{Missing, list_missing};

pub(super) const COMMANDS: &[(&str, Builtin)] = &[("string", string)];

const SUBCOMMANDS: &[(&str, Builtin)] = &[
    ("bytelength", bytelength),
    ("cat", cat),
    ("compare", compare),
    ("equal", equal),
    ("first", first),
    ("index", index),
    ("is", is),
    ("last", last),
    ("length", length),
    ("map", map),
    ("match", match_cmd),
    ("range", range),
    ("repeat", repeat),
    ("replace", replace),
    ("reverse", reverse),
    ("tolower", tolower),
    ("toupper", toupper),
    ("totitle", totitle),
    ("trim", trim),
    ("trimleft", trimleft),
    ("trimright", trimright),
];

fn string(interp: &mut Interp, argv: &[Obj]) -> EvalResult {
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

fn chars(obj: &Obj) -> Vec<char> {
    obj.as_str().chars().collect()
}

fn length(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "string")?;
    Ok(Obj::from_int(argv[2].char_len() as i64))
}

fn bytelength(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "string")?;
    Ok(Obj::from_int(argv[2].as_str().len() as i64))
}

fn cat(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let mut out = String::new();
    for piece in &argv[2..] {
        out.push_str(piece.as_str());
    }
    Ok(Obj::new(out))
}

/// Options shared by `compare` and `equal`.
fn compare_strings(argv: &[Obj]) -> EvalResult<Ordering> {
    let usage = "?-nocase? ?-length int? string1 string2";
    let mut nocase = false;
    let mut limit = None;
    let mut i = 2;
    while i + 2 < argv.len() {
        match get_enum(&argv[i], &["-nocase", "-length"], "option")? {
            0 => nocase = true,
            _ => {
                i += 1;
                if i + 2 >= argv.len() {
                    return Err(Exception::wrong_args(&argv[..2], usage));
                }
                limit = Some(argv[i].get_int()?);
            }
        }
        i += 1;
    }
    if argv.len() - i != 2 {
        return Err(Exception::wrong_args(&argv[..2], usage));
    }
    let prepare = |o: &Obj| {
        let s = if nocase { o.as_str().to_lowercase() } else { o.as_str().to_string() };
        match limit {
            Some(n) if n >= 0 => s.chars().take(n as usize).collect(),
            _ => s,
        }
    };
    Ok(prepare(&argv[i]).cmp(&prepare(&argv[i + 1])))
}

fn compare(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let n = match compare_strings(argv)? {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    Ok(Obj::from_int(n))
}

fn equal(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    Ok(Obj::from_bool(compare_strings(argv)? == Ordering::Equal))
}

fn find(needle: &[char], hay: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > hay.len() {
        return None;
    }
    (from..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()] == *needle)
}

fn first(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, 5, "subString string ?index?")?;
    let hay = chars(&argv[3]);
    let from = match argv.get(4) {
        Some(ix) => ix.get_index()?.resolve(hay.len()).max(0) as usize,
        None => 0,
    };
    let pos = find(&chars(&argv[2]), &hay, from).map_or(-1, |p| p as i64);
    Ok(Obj::from_int(pos))
}

fn last(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, 5, "subString string ?index?")?;
    let needle = chars(&argv[2]);
    let hay = chars(&argv[3]);
    let upto = match argv.get(4) {
        Some(ix) => ix.get_index()?.resolve(hay.len()),
        None => hay.len() as i64,
    };
    if needle.is_empty() || upto < 0 || needle.len() > hay.len() {
        return Ok(Obj::from_int(-1));
    }
    let start = (upto as usize).min(hay.len() - needle.len());
    let pos = (0..=start).rev().find(|&i| hay[i..i + needle.len()] == *needle);
    Ok(Obj::from_int(pos.map_or(-1, |p| p as i64)))
}

fn index(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, 4, "string index")?;
    let s = chars(&argv[2]);
    let pos = argv[3].get_index()?.resolve(s.len());
    let c = usize::try_from(pos).ok().and_then(|p| s.get(p));
    Ok(c.map_or_else(Obj::empty, |c| Obj::new(c.to_string())))
}

const CLASSES: &[&str] = &[
    "alnum", "alpha", "ascii", "boolean", "control", "digit", "double", "false", "graph", "integer", "list", "lower",
    "print", "punct", "space", "true", "upper", "wordchar", "xdigit",
];

fn is(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, 5, "class ?-strict? str")?;
    let class = get_enum(&argv[2], CLASSES, "class")?;
    let strict = match argv.len() {
        5 => {
            get_enum(&argv[3], &["-strict"], "option")?;
            true
        }
        _ => false,
    };
    let value = &argv[argv.len() - 1];
    let s = value.as_str();
    if s.is_empty() {
        return Ok(Obj::from_bool(!strict));
    }
    let every = |f: fn(char) -> bool| s.chars().all(f);
    let result = match CLASSES[class] {
        "alnum" => every(char::is_alphanumeric),
        "alpha" => every(char::is_alphabetic),
        "ascii" => every(|c| c.is_ascii()),
        "boolean" => parse_bool(s).is_some(),
        "control" => every(char::is_control),
        "digit" => every(|c| c.is_ascii_digit()),
        "double" => value.as_double().is_some(),
        "false" => parse_bool(s) == Some(false),
        "graph" => every(|c| !c.is_whitespace() && !c.is_control()),
        "integer" => value.as_int().is_some(),
        "list" => list_missing(s) == Missing::None,
        "lower" => every(char::is_lowercase),
        "print" => every(|c| !c.is_control()),
        "punct" => every(|c| c.is_ascii_punctuation()),
        "space" => every(char::is_whitespace),
        "true" => parse_bool(s) == Some(true),
        "upper" => every(char::is_uppercase),
        "wordchar" => every(|c| c.is_alphanumeric() || c == '_'),
        _ => every(|c| c.is_ascii_hexdigit()),
    };
    Ok(Obj::from_bool(result))
}

fn map(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, 5, "?-nocase? mapList string")?;
    let nocase = match argv.len() {
        5 => {
            get_enum(&argv[2], &["-nocase"], "option")?;
            true
        }
        _ => false,
    };
    let mapping = argv[argv.len() - 2].list();
    if mapping.len() % 2 != 0 {
        return Err(Exception::error("list must contain an even number of elements"));
    }
    let fold = |s: &str| if nocase { s.to_lowercase() } else { s.to_string() };
    let pairs: Vec<(Vec<char>, &str)> = mapping
        .chunks_exact(2)
        .filter(|p| !p[0].is_empty())
        .map(|p| (fold(p[0].as_str()).chars().collect(), p[1].as_str()))
        .collect();
    let source = chars(&argv[argv.len() - 1]);
    let folded: Vec<char> = if nocase { fold(&source.iter().collect::<String>()).chars().collect() } else { source.clone() };
    let mut out = String::new();
    let mut i = 0;
    'outer: while i < source.len() {
        for (key, replacement) in &pairs {
            if folded.len() == source.len() && folded[i..].starts_with(key) {
                out.push_str(replacement);
                i += key.len();
                continue 'outer;
            }
        }
        out.push(source[i]);
        i += 1;
    }
    Ok(Obj::new(out))
}

fn match_cmd(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, 5, "?-nocase? pattern string")?;
    let nocase = match argv.len() {
        5 => {
            get_enum(&argv[2], &["-nocase"], "option")?;
            true
        }
        _ => false,
    };
    let n = argv.len();
    Ok(Obj::from_bool(glob_match(argv[n - 2].as_str(), argv[n - 1].as_str(), nocase)))
}

fn range(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 5, 5, "string first last")?;
    let s = chars(&argv[2]);
    let len = s.len() as i64;
    let first = argv[3].get_index()?.resolve(s.len()).max(0);
    let last = argv[4].get_index()?.resolve(s.len()).min(len - 1);
    if first > last {
        return Ok(Obj::empty());
    }
    Ok(Obj::new(s[first as usize..=last as usize].iter().collect::<String>()))
}

fn repeat(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 4, 4, "string count")?;
    let n = argv[3].get_int()?;
    Ok(Obj::new(argv[2].as_str().repeat(n.max(0) as usize)))
}

fn replace(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 5, 6, "string first last ?string?")?;
    let s = chars(&argv[2]);
    let len = s.len() as i64;
    let first = argv[3].get_index()?.resolve(s.len());
    let last = argv[4].get_index()?.resolve(s.len());
    if last < first || first >= len || last < 0 {
        return Ok(argv[2].clone());
    }
    let first = first.max(0) as usize;
    let last = last.min(len - 1) as usize;
    let mut out: String = s[..first].iter().collect();
    if let Some(new) = argv.get(5) {
        out.push_str(new.as_str());
    }
    out.extend(&s[last + 1..]);
    Ok(Obj::new(out))
}

fn reverse(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "string")?;
    Ok(Obj::new(argv[2].as_str().chars().rev().collect::<String>()))
}

fn tolower(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "string")?;
    Ok(Obj::new(argv[2].as_str().to_lowercase()))
}

fn toupper(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "string")?;
    Ok(Obj::new(argv[2].as_str().to_uppercase()))
}

fn totitle(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    sub_args(argv, 3, 3, "string")?;
    let mut it = argv[2].as_str().chars();
    let out = match it.next() {
        Some(c) => c.to_uppercase().chain(it.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    };
    Ok(Obj::new(out))
}

const DEFAULT_TRIM: &str = " \t\n\r";

fn trim_with(argv: &[Obj], f: fn(&str, &[char]) -> String) -> EvalResult {
    sub_args(argv, 3, 4, "string ?trimchars?")?;
    let set: Vec<char> = argv.get(3).map_or(DEFAULT_TRIM, |c| c.as_str()).chars().collect();
    Ok(Obj::new(f(argv[2].as_str(), &set)))
}

fn trim(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    trim_with(argv, |s, set| s.trim_matches(set).to_string())
}

fn trimleft(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    trim_with(argv, |s, set| s.trim_start_matches(set).to_string())
}

fn trimright(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    trim_with(argv, |s, set| s.trim_end_matches(set).to_string())
}
