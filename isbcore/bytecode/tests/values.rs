use isb_bytecode::Value;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

fn num(s: &str) -> Value {
    Value::Num(Decimal::from_str(s).unwrap())
}

#[test]
fn numeric_views() {
    assert_eq!(num("3.14").to_text(), "3.14");
    assert_eq!(num("3.140").to_text(), "3.14");
    assert_eq!(Value::Str("  42 ".into()).to_number(), Decimal::from(42));
    assert_eq!(Value::Str("nope".into()).to_number(), Decimal::ZERO);
    assert_eq!(Value::empty().to_number(), Decimal::ZERO);
}

#[test]
fn boolean_views() {
    assert!(num("1").to_bool());
    assert!(!num("0").to_bool());
    assert!(!Value::Str(String::new()).to_bool());
    assert!(!Value::Str("false".into()).to_bool());
    assert!(!Value::Str("FALSE".into()).to_bool());
    // any other non-empty string is true, including "0"
    assert!(Value::Str("0".into()).to_bool());
    assert!(Value::Array(Default::default()).to_bool());
}

#[test]
fn exact_decimal_keys_match() {
    let a = Decimal::from_str("0.1").unwrap() + Decimal::from_str("0.2").unwrap();
    assert_eq!(Value::Num(a).to_key(), "0.3");
    assert_eq!(num("0.3").to_key(), "0.3");
    assert_eq!(num("20").to_key(), "20");
}

#[test]
fn ordering_numeric_when_both_coerce() {
    assert_eq!(num("10").compare(&Value::Str("9".into())), Ordering::Greater);
    assert_eq!(Value::Str("9".into()).compare(&num("10")), Ordering::Less);
    // "abc" has no numeric view, so the comparison is lexicographic
    assert_eq!(Value::Str("abc".into()).compare(&num("5")), Ordering::Greater);
    assert!(num("2.0").loose_eq(&num("2")));
    assert!(num("2").loose_eq(&Value::Str("2".into())));
}

#[test]
fn array_path_roundtrip() {
    let mut root = Value::empty();
    root.set_path(&["1".into(), "x".into()], num("7"));
    assert_eq!(root.get_path(&["1".into(), "x".into()]), num("7"));
    // unset paths read as the empty string
    assert_eq!(root.get_path(&["1".into(), "y".into()]), Value::empty());
    assert_eq!(root.get_path(&["2".into()]), Value::empty());
}

#[test]
fn scalar_slots_promote_on_nested_write() {
    let mut root = Value::empty();
    root.set_path(&["a".into()], num("5"));
    // writing through the scalar at "a" replaces it with an array
    root.set_path(&["a".into(), "b".into()], num("6"));
    assert_eq!(root.get_path(&["a".into(), "b".into()]), num("6"));
}

#[test]
fn reading_through_scalar_yields_empty() {
    let mut root = Value::empty();
    root.set_path(&["a".into()], num("5"));
    assert_eq!(root.get_path(&["a".into(), "b".into()]), Value::empty());
}

#[test]
fn heterogeneous_keys_coexist() {
    let mut root = Value::empty();
    root.set_path(&["0".into()], num("1"));
    root.set_path(&["x".into()], Value::Str("s".into()));
    assert_eq!(root.get_path(&["0".into()]), num("1"));
    assert_eq!(root.get_path(&["x".into()]), Value::Str("s".into()));
}
