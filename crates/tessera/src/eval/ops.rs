//! Operator semantics on dynamic values.

use std::cmp::Ordering;

use crate::program::BinaryOp;
use crate::value::Value;

/// Applies a non-short-circuit binary operator to two evaluated operands.
///
/// `&&` and `||` are handled by the evaluator; given here they pick the deciding
/// operand like the evaluator does.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(equals(left, right)),
        BinaryOp::Ne => Value::Bool(!equals(left, right)),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::And => {
            if left.is_truthy() {
                right.clone()
            } else {
                left.clone()
            }
        }
        BinaryOp::Or => {
            if left.is_truthy() {
                left.clone()
            } else {
                right.clone()
            }
        }
    }
}

/// `+`: text concatenation when either side is a string, numeric addition otherwise.
pub fn add(left: &Value, right: &Value) -> Value {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        let mut text = left.to_text();
        text.push_str(&right.to_text());
        return Value::string(text);
    }
    Value::Number(left.to_number() + right.to_number())
}

/// Equality used by `==`/`!=`: structural, except that `null` and `undefined` are
/// equal to each other.
pub fn equals(left: &Value, right: &Value) -> bool {
    if left.is_nullish() && right.is_nullish() {
        return true;
    }
    left.same(right)
}

/// Ordering used by the relational operators: lexicographic for two strings,
/// numeric otherwise. `None` when the operands are unordered (NaN involved).
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

/// Dynamic property access: `base[key]`.
pub fn index(base: &Value, key: &Value) -> Value {
    if base.is_nullish() || key.is_nullish() {
        return Value::Undefined;
    }
    base.get(&key.to_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_concatenates_when_a_string_is_involved() {
        assert_eq!(add(&Value::from("a"), &Value::from(1)), Value::from("a1"));
        assert_eq!(add(&Value::from(2), &Value::from("px")), Value::from("2px"));
        assert_eq!(add(&Value::from(2), &Value::from(3)), Value::from(5));
        assert_eq!(add(&Value::Bool(true), &Value::from(1)), Value::from(2));
    }

    #[test]
    fn relational_operators() {
        let two = Value::from(2);
        let ten = Value::from("10");
        assert_eq!(binary(BinaryOp::Lt, &two, &ten), Value::Bool(true));
        assert_eq!(
            binary(BinaryOp::Lt, &Value::from("b"), &Value::from("a")),
            Value::Bool(false)
        );
        assert_eq!(
            binary(BinaryOp::Ge, &Value::Number(f64::NAN), &two),
            Value::Bool(false)
        );
    }

    #[test]
    fn equality_is_structural() {
        let a = Value::list([Value::from(1), Value::from("x")]);
        let b = Value::list([Value::from(1), Value::from("x")]);
        assert!(equals(&a, &b));
        assert!(equals(&Value::Null, &Value::Undefined));
        assert!(!equals(&Value::from(1), &Value::from("1")));
    }

    #[test]
    fn index_by_dynamic_key() {
        let list = Value::list([Value::from("a"), Value::from("b")]);
        assert_eq!(index(&list, &Value::from(1)), Value::from("b"));
        assert_eq!(index(&Value::Null, &Value::from(0)), Value::Undefined);
    }
}
