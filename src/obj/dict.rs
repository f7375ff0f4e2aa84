//! Dicts: hash tables keyed by a value's string form.

use super::{Obj, list};
use crate::hashtable::{HashKey, HashTable};
use crate::interp::{EvalResult, Exception};

pub type Dict = HashTable<Obj, Obj>;

impl HashKey for Obj {
    fn key_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }
}

/// Builds a dict from alternating keys and values; later duplicates win.
pub fn from_list(items: &[Obj]) -> EvalResult<Dict> {
    if items.len() % 2 != 0 {
        return Err(Exception::error("missing value to go with key"));
    }
    let mut dict = Dict::new();
    for pair in items.chunks_exact(2) {
        dict.replace(pair[0].clone(), pair[1].clone());
    }
    Ok(dict)
}

/// Keys and values flattened in table iteration order.
pub fn pairs(dict: &Dict) -> Vec<Obj> {
    let mut out = Vec::with_capacity(dict.len() * 2);
    for (k, v) in dict {
        out.push(k.clone());
        out.push(v.clone());
    }
    out
}

/// Sets (or with `None`, removes) the value at a path of keys, creating
/// intermediate dicts when setting. Removing a missing last key is an
/// error only when `must_exist` is set; a missing intermediate key always
/// is.
pub fn set_path(obj: &mut Obj, keys: &[Obj], value: Option<Obj>, must_exist: bool) -> EvalResult<()> {
    let Some((first, rest)) = keys.split_first() else {
        return Ok(());
    };
    obj.modify_dict(|d| {
        if rest.is_empty() {
            match value {
                Some(v) => {
                    d.replace(first.clone(), v);
                }
                None => {
                    if d.remove(first).is_none() && must_exist {
                        return Err(key_not_known(first));
                    }
                }
            }
            return Ok(());
        }
        if d.get(first).is_none() {
            if value.is_none() {
                return Err(key_not_known(first));
            }
            d.add(first.clone(), Obj::from_dict(Dict::new()));
        }
        match d.get_mut(first) {
            Some(child) => set_path(child, rest, value, must_exist),
            None => Err(key_not_known(first)),
        }
    })
}

pub fn key_not_known(key: &Obj) -> Exception {
    Exception::error(format!("key \"{key}\" not known in dictionary"))
}

pub fn to_string(dict: &Dict) -> String {
    let mut out = String::new();
    for (i, (k, v)) in dict.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        list::quote_element(k.as_str(), i == 0, &mut out);
        out.push(' ');
        list::quote_element(v.as_str(), false, &mut out);
    }
    out
}
