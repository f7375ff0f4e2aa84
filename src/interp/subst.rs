//! Joining word parts: multi-part words in scripts and `subst`.

use super::{Code, EvalResult, Interp};
use crate::obj::{Obj, SugarRef};
use crate::parser::SubstFlags;
use crate::script::Part;

impl Interp {
    /// `subst`: substitutes variables, commands and escapes in `obj`.
    pub fn subst_obj(&mut self, obj: &Obj, flags: SubstFlags) -> EvalResult {
        let script = obj.subst_script(flags);
        self.interpolate(script.parts.iter().map(|(kind, part)| (*kind, part)), true)
    }

    /// Evaluates each part and concatenates the results.
    ///
    /// In `subst` mode a `break` from a command part ends the result there,
    /// `continue` drops that part, and `return` contributes its value.
    /// Otherwise any non-`ok` completion propagates.
    pub(crate) fn interpolate<'a>(
        &mut self,
        parts: impl Iterator<Item = (Part, &'a Obj)>,
        in_subst: bool,
    ) -> EvalResult {
        let mut values: Vec<(Part, &'a Obj, Obj)> = Vec::new();
        for (kind, part) in parts {
            let value = match self.eval_part(kind, part) {
                Ok(v) => v,
                Err(e) if in_subst && kind == Part::Cmd => match e.code {
                    Code::Break => break,
                    Code::Continue => continue,
                    Code::Return => e.value,
                    _ => return Err(e),
                },
                Err(e) => return Err(e),
            };
            values.push((kind, part, value));
        }

        let len = values.iter().map(|(_, _, v)| v.as_str().len()).sum();
        let mut out = String::with_capacity(len);
        for (_, _, v) in &values {
            out.push_str(v.as_str());
        }
        let result = Obj::new(out);

        // `name($key)` remembers its parts so it can be used as a
        // dict-sugar variable name without reparsing.
        if let [(Part::Str, var, _), (Part::Str, open, _), (Part::Var, _, key), (Part::Str, close, _)] = values.as_slice()
        {
            if open.as_str() == "(" && close.as_str() == ")" {
                result.set_interpolated(SugarRef { var: (*var).clone(), key: key.clone() });
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subst(interp: &mut Interp, src: &str) -> EvalResult {
        interp.subst_obj(&Obj::from(src), SubstFlags::default())
    }

    #[test]
    fn substitutes_everything_by_default() {
        let mut interp = Interp::new();
        interp.set_var("v", "1").unwrap();
        assert_eq!(subst(&mut interp, "a$v [set v]\\tb").unwrap().as_str(), "a1 1\tb");
    }

    #[test]
    fn flags_disable_kinds() {
        let mut interp = Interp::new();
        interp.set_var("v", "1").unwrap();
        let flags = SubstFlags { no_commands: true, no_variables: true, no_backslashes: true };
        let r = interp.subst_obj(&Obj::from("$v [x] \\n"), flags).unwrap();
        assert_eq!(r.as_str(), "$v [x] \\n");
    }

    #[test]
    fn break_continue_return_in_commands() {
        let mut interp = Interp::new();
        assert_eq!(subst(&mut interp, "a[break]b").unwrap().as_str(), "a");
        assert_eq!(subst(&mut interp, "a[continue]b").unwrap().as_str(), "ab");
        assert_eq!(subst(&mut interp, "a[return x]b").unwrap().as_str(), "axb");
        assert!(subst(&mut interp, "a[error no]b").is_err());
    }

    #[test]
    fn interpolated_array_names() {
        let mut interp = Interp::new();
        assert_eq!(interp.eval("set k x; set a(x) 5; set n a($k); set $n").unwrap().as_str(), "5");
    }
}
