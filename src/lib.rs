//! An embeddable interpreter for a small Tcl-family command language.
//!
//! ```
//! let mut interp = jim::Interp::new();
//! interp.eval("proc sq {x} {expr {$x * $x}}").unwrap();
//! assert_eq!(interp.eval("sq 7").unwrap().as_str(), "49");
//! ```

pub mod commands;
pub mod diagnostic;
pub mod expr;
pub mod glob;
pub mod hashtable;
pub mod interp;
pub mod obj;
pub mod parser;
pub mod script;

pub use interp::{Code, Config, EvalResult, Exception, Interp};
pub use obj::Obj;
