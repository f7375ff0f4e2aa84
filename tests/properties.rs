use jim::{Interp, Obj};
use proptest::prelude::*;

const OPS: [&str; 8] = ["eq", "ne", "<", "<=", ">", ">=", "==", "!="];

fn compare(op: &str, x: &Obj, y: &Obj) -> String {
    let mut interp = Interp::new();
    interp.set_var("x", x.clone()).unwrap();
    interp.set_var("y", y.clone()).unwrap();
    interp.eval(&format!("expr {{$x {op} $y}}")).unwrap().to_string()
}

fn expected<T: PartialOrd>(op: &str, x: T, y: T, same_text: bool) -> &'static str {
    let holds = match op {
        "eq" => same_text,
        "ne" => !same_text,
        "<" => x < y,
        "<=" => x <= y,
        ">" => x > y,
        ">=" => x >= y,
        "==" => x == y,
        _ => x != y,
    };
    if holds { "1" } else { "0" }
}

/// List elements built from characters the quoting rules care about.
fn element() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just('a'),
            Just('z'),
            Just(' '),
            Just('{'),
            Just('}'),
            Just('['),
            Just(']'),
            Just('"'),
            Just('\\'),
            Just('$'),
            Just(';'),
            Just('#'),
            Just('\n'),
            Just('\t'),
        ],
        0..8,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn integer_comparison_agrees(x in -1_000_000_000_000i64..1_000_000_000_000, y in -1_000_000_000_000i64..1_000_000_000_000, op in 0..OPS.len()) {
        let op = OPS[op];
        let got = compare(op, &Obj::from(x.to_string()), &Obj::from(y.to_string()));
        prop_assert_eq!(got, expected(op, x, y, x == y));
    }

    #[test]
    fn double_comparison_agrees(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6, op in 2..OPS.len()) {
        let op = OPS[op];
        let got = compare(op, &Obj::from(x.to_string()), &Obj::from(y.to_string()));
        prop_assert_eq!(got, expected(op, x, y, false));
    }

    #[test]
    fn mixed_comparison_agrees(x in -1_000_000i64..1_000_000, y in -1.0e6f64..1.0e6, op in 2..OPS.len()) {
        let op = OPS[op];
        let got = compare(op, &Obj::from(x.to_string()), &Obj::from(y.to_string()));
        prop_assert_eq!(got, expected(op, x as f64, y, false));
    }

    #[test]
    fn integers_survive_their_string_form(n in any::<i64>()) {
        let reparsed = Obj::new(Obj::from_int(n).to_string());
        prop_assert_eq!(reparsed.as_int(), Some(n));
    }

    #[test]
    fn doubles_survive_to_display_precision(d in -1.0e12f64..1.0e12) {
        let reparsed = Obj::new(Obj::from_double(d).to_string());
        let back = reparsed.as_double().unwrap();
        prop_assert!((back - d).abs() <= d.abs() * 1e-11 + 1e-300);
    }

    #[test]
    fn lists_survive_their_string_form(items in proptest::collection::vec(element(), 0..6)) {
        let list = Obj::from_list(items.iter().map(Obj::from).collect());
        let reparsed = Obj::new(list.to_string());
        let back: Vec<String> = reparsed.list().iter().map(|o| o.to_string()).collect();
        prop_assert_eq!(back, items);
    }

    #[test]
    fn list_commands_see_every_element(items in proptest::collection::vec(element(), 1..6)) {
        let mut interp = Interp::new();
        interp.set_var("l", Obj::from_list(items.iter().map(Obj::from).collect())).unwrap();
        let len = interp.eval("llength $l").unwrap();
        prop_assert_eq!(len.as_int(), Some(items.len() as i64));
        let last = interp.eval("lindex $l end").unwrap();
        prop_assert_eq!(last.as_str(), items[items.len() - 1].as_str());
    }

    #[test]
    fn dict_get_returns_what_create_stored(entries in proptest::collection::hash_map("[a-z]{1,6}", "[a-z0-9 ]{0,6}", 1..8)) {
        let mut interp = Interp::new();
        let mut words = vec![Obj::from("dict"), Obj::from("create")];
        for (k, v) in &entries {
            words.push(Obj::from(k.as_str()));
            words.push(Obj::from(v.as_str()));
        }
        let d = interp.eval_list(&words).unwrap();
        interp.set_var("d", d).unwrap();
        let size = interp.eval("dict size $d").unwrap();
        prop_assert_eq!(size.as_int(), Some(entries.len() as i64));
        for (k, v) in &entries {
            interp.set_var("k", k.as_str()).unwrap();
            let got = interp.eval("dict get $d $k").unwrap();
            prop_assert_eq!(got.as_str(), v.as_str());
        }
    }

    #[test]
    fn shared_lists_are_not_mutated_through_copies(items in proptest::collection::vec("[a-z]{1,4}", 0..6)) {
        let mut interp = Interp::new();
        let original = Obj::from_list(items.iter().map(Obj::from).collect());
        interp.set_var("a", original.clone()).unwrap();
        interp.eval("set b $a; lappend b extra; lset a end x").ok();
        prop_assert_eq!(original.list().len(), items.len());
        let b = interp.get_var("b").unwrap();
        prop_assert_eq!(b.list().len(), items.len() + 1);
    }
}
