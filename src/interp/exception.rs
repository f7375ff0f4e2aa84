//! Completion codes and the non-`ok` completion value.
//!
//! Evaluation returns `Result<Obj, Exception>`. `Ok` is the `ok` completion;
//! every other code (including `break`, `continue` and `return`) travels as
//! an `Exception` and is unwrapped by whichever command owns that code.

use crate::obj::Obj;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Error,
    Return,
    Break,
    Continue,
    Signal,
    Exit,
    /// Request from `tailcall`: replay the stashed command after the frame
    /// is torn down.
    Eval,
    Other(i32),
}

const CODE_NAMES: [(&str, Code); 8] = [
    ("ok", Code::Ok),
    ("error", Code::Error),
    ("return", Code::Return),
    ("break", Code::Break),
    ("continue", Code::Continue),
    ("signal", Code::Signal),
    ("exit", Code::Exit),
    ("eval", Code::Eval),
];

impl Code {
    pub fn as_i32(self) -> i32 {
        match self {
            Code::Ok => 0,
            Code::Error => 1,
            Code::Return => 2,
            Code::Break => 3,
            Code::Continue => 4,
            Code::Signal => 5,
            Code::Exit => 6,
            Code::Eval => 7,
            Code::Other(n) => n,
        }
    }

    pub fn from_i32(n: i32) -> Code {
        CODE_NAMES.get(n as usize).filter(|_| n >= 0).map(|(_, c)| *c).unwrap_or(Code::Other(n))
    }

    /// The textual name, or `None` for codes outside the reserved set.
    pub fn name(self) -> Option<&'static str> {
        CODE_NAMES.iter().find(|(_, c)| *c == self).map(|(n, _)| *n)
    }

    pub fn from_name(name: &str) -> Option<Code> {
        CODE_NAMES.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
    }

    /// Accepts either a code name or an integer.
    pub fn parse(obj: &Obj) -> Option<Code> {
        Code::from_name(obj.as_str()).or_else(|| {
            crate::obj::number::parse_int(obj.as_str())
                .and_then(|n| i32::try_from(n).ok())
                .map(Code::from_i32)
        })
    }

    pub fn all() -> impl Iterator<Item = (&'static str, Code)> {
        CODE_NAMES.iter().copied()
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.as_i32()),
        }
    }
}

/// A non-`ok` completion.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{value}")]
pub struct Exception {
    pub code: Code,
    pub value: Obj,
    /// Remaining `-level` for a `return` completion.
    pub level: i32,
    /// The code a `return` turns into once its level reaches zero.
    pub return_code: Code,
    /// Machine-readable error code (`::errorCode`), when one was supplied.
    pub error_code: Option<Obj>,
}

pub type EvalResult<T = Obj> = std::result::Result<T, Exception>;

impl Exception {
    pub fn new(code: Code, value: Obj) -> Self {
        Exception { code, value, level: 0, return_code: Code::Ok, error_code: None }
    }

    pub fn error(message: impl Into<Obj>) -> Self {
        Exception::new(Code::Error, message.into())
    }

    pub fn with_error_code(mut self, code: impl Into<Obj>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn brk() -> Self {
        Exception::new(Code::Break, Obj::empty())
    }

    pub fn cont() -> Self {
        Exception::new(Code::Continue, Obj::empty())
    }

    /// `wrong # args: should be "cmd usage"`, naming as many leading words
    /// of `argv` as identify the (sub)command.
    pub fn wrong_args(words: &[Obj], usage: &str) -> Self {
        let mut msg = String::from("wrong # args: should be \"");
        for (i, w) in words.iter().enumerate() {
            if i > 0 {
                msg.push(' ');
            }
            msg.push_str(w.as_str());
        }
        if !usage.is_empty() {
            if !words.is_empty() {
                msg.push(' ');
            }
            msg.push_str(usage);
        }
        msg.push('"');
        Exception::error(msg)
    }

    pub fn is_error(&self) -> bool {
        self.code == Code::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_names_round_trip() {
        for (name, code) in Code::all() {
            assert_eq!(Code::from_name(name), Some(code));
            assert_eq!(code.name(), Some(name));
            assert_eq!(Code::from_i32(code.as_i32()), code);
        }
    }

    #[test]
    fn custom_codes_print_as_numbers() {
        assert_eq!(Code::from_i32(42), Code::Other(42));
        assert_eq!(Code::Other(42).to_string(), "42");
        assert_eq!(Code::from_i32(-1), Code::Other(-1));
    }

    #[test]
    fn parse_accepts_names_and_numbers() {
        assert_eq!(Code::parse(&Obj::from("break")), Some(Code::Break));
        assert_eq!(Code::parse(&Obj::from("3")), Some(Code::Break));
        assert_eq!(Code::parse(&Obj::from("bogus")), None);
    }

    #[test]
    fn wrong_args_message() {
        let argv = [Obj::from("set")];
        let e = Exception::wrong_args(&argv, "varName ?newValue?");
        assert_eq!(e.value.as_str(), "wrong # args: should be \"set varName ?newValue?\"");
        assert!(e.is_error());
    }
}
