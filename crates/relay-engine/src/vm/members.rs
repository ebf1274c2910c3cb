//! Built-in members of lists, strings and dicts
//!
//! `length` is a plain property; every other member resolves to a bound
//! method whose receiver is passed as the first positional argument.

use std::sync::Arc;

use crate::vm::builtins::{expect_int, expect_str, positional, Builtin};
use crate::vm::object::{BoundMethod, MethodTarget};
use crate::vm::{CallArgs, Interpreter, Value, VmError};

static LIST_MEMBERS: &[Builtin] = &[
    Builtin { name: "push", func: list_push },
    Builtin { name: "pop", func: list_pop },
    Builtin { name: "contains", func: list_contains },
    Builtin { name: "join", func: list_join },
    Builtin { name: "slice", func: list_slice },
];

static STR_MEMBERS: &[Builtin] = &[
    Builtin { name: "upper", func: str_upper },
    Builtin { name: "lower", func: str_lower },
    Builtin { name: "trim", func: str_trim },
    Builtin { name: "split", func: str_split },
    Builtin { name: "contains", func: str_contains },
    Builtin { name: "startsWith", func: str_starts_with },
    Builtin { name: "endsWith", func: str_ends_with },
];

static DICT_MEMBERS: &[Builtin] = &[
    Builtin { name: "keys", func: dict_keys },
    Builtin { name: "values", func: dict_values },
    Builtin { name: "has", func: dict_has },
    Builtin { name: "get", func: dict_get },
    Builtin { name: "remove", func: dict_remove },
];

fn table(receiver: &Value) -> Option<&'static [Builtin]> {
    match receiver {
        Value::List(_) => Some(LIST_MEMBERS),
        Value::Str(_) => Some(STR_MEMBERS),
        Value::Dict(_) => Some(DICT_MEMBERS),
        _ => None,
    }
}

/// Resolve `receiver.name` against the built-in members of its type.
pub fn lookup(receiver: &Value, name: &str) -> Option<Value> {
    if name == "length" {
        let length = match receiver {
            Value::List(items) => items.read().len(),
            Value::Str(s) => s.chars().count(),
            Value::Dict(entries) => entries.read().len(),
            _ => return None,
        };
        return Some(Value::Int(length as i64));
    }

    let member = table(receiver)?.iter().find(|b| b.name == name)?;
    Some(Value::BoundMethod(Arc::new(BoundMethod {
        receiver: receiver.clone(),
        target: MethodTarget::Builtin(member),
    })))
}

/// Whether `receiver` has a built-in member called `name`.
pub fn has_member(receiver: &Value, name: &str) -> bool {
    table(receiver).is_some_and(|members| {
        name == "length" || members.iter().any(|b| b.name == name)
    })
}

/// Split member arguments into receiver and the rest.
fn receiver_and_args(
    name: &str,
    args: CallArgs,
    min: usize,
    max: usize,
) -> Result<(Value, Vec<Value>), VmError> {
    let mut values = positional(name, args, min + 1, max.saturating_add(1))?;
    let receiver = values.remove(0);
    Ok((receiver, values))
}

fn resolve_index(index: i64, len: usize) -> usize {
    if index < 0 {
        (len as i64 + index).max(0) as usize
    } else {
        (index as usize).min(len)
    }
}

// ============================================================================
// List
// ============================================================================

fn list_push(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args("push", args, 1, usize::MAX)?;
    let Value::List(items) = receiver else {
        return Err(VmError::Internal("push on non-list".into()));
    };
    let mut items = items.write();
    items.extend(values);
    Ok(Value::Int(items.len() as i64))
}

fn list_pop(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, _) = receiver_and_args("pop", args, 0, 0)?;
    let Value::List(items) = receiver else {
        return Err(VmError::Internal("pop on non-list".into()));
    };
    let popped = items.write().pop();
    popped.ok_or_else(|| VmError::IndexError("pop from empty list".into()))
}

fn list_contains(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args("contains", args, 1, 1)?;
    let Value::List(items) = receiver else {
        return Err(VmError::Internal("contains on non-list".into()));
    };
    let snapshot = items.read().clone();
    Ok(Value::Bool(snapshot.iter().any(|v| v.equals(&values[0]))))
}

fn list_join(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args("join", args, 0, 1)?;
    let Value::List(items) = receiver else {
        return Err(VmError::Internal("join on non-list".into()));
    };
    let separator = match values.first() {
        Some(sep) => expect_str("join", sep)?.to_string(),
        None => String::new(),
    };
    let snapshot = items.read().clone();
    let joined = snapshot
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::str(joined))
}

fn list_slice(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args("slice", args, 0, 2)?;
    let Value::List(items) = receiver else {
        return Err(VmError::Internal("slice on non-list".into()));
    };
    let snapshot = items.read().clone();
    let len = snapshot.len();
    let start = match values.first() {
        Some(v) => resolve_index(expect_int("slice", v)?, len),
        None => 0,
    };
    let end = match values.get(1) {
        Some(v) => resolve_index(expect_int("slice", v)?, len),
        None => len,
    };
    let slice = if start < end {
        snapshot[start..end].to_vec()
    } else {
        Vec::new()
    };
    Ok(Value::list(slice))
}

// ============================================================================
// Str
// ============================================================================

fn receiver_str(name: &str, receiver: &Value) -> Result<Arc<str>, VmError> {
    match receiver {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(VmError::Internal(format!("{} on non-str", name))),
    }
}

fn str_upper(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, _) = receiver_and_args("upper", args, 0, 0)?;
    Ok(Value::str(receiver_str("upper", &receiver)?.to_uppercase()))
}

fn str_lower(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, _) = receiver_and_args("lower", args, 0, 0)?;
    Ok(Value::str(receiver_str("lower", &receiver)?.to_lowercase()))
}

fn str_trim(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, _) = receiver_and_args("trim", args, 0, 0)?;
    Ok(Value::str(receiver_str("trim", &receiver)?.trim()))
}

fn str_split(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args("split", args, 0, 1)?;
    let text = receiver_str("split", &receiver)?;
    let parts: Vec<Value> = match values.first() {
        None => text.split_whitespace().map(Value::from).collect(),
        Some(sep) => {
            let sep = expect_str("split", sep)?;
            if sep.is_empty() {
                return Err(VmError::argument_error("split() separator must not be empty"));
            }
            text.split(sep).map(Value::from).collect()
        }
    };
    Ok(Value::list(parts))
}

fn str_test(
    name: &str,
    args: CallArgs,
    test: fn(&str, &str) -> bool,
) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args(name, args, 1, 1)?;
    let text = receiver_str(name, &receiver)?;
    let needle = expect_str(name, &values[0])?;
    Ok(Value::Bool(test(&text, needle)))
}

fn str_contains(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    str_test("contains", args, |text, needle| text.contains(needle))
}

fn str_starts_with(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    str_test("startsWith", args, |text, needle| text.starts_with(needle))
}

fn str_ends_with(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    str_test("endsWith", args, |text, needle| text.ends_with(needle))
}

// ============================================================================
// Dict
// ============================================================================

fn receiver_dict(name: &str, receiver: &Value) -> Result<crate::vm::value::DictRef, VmError> {
    match receiver {
        Value::Dict(entries) => Ok(entries.clone()),
        _ => Err(VmError::Internal(format!("{} on non-dict", name))),
    }
}

fn dict_keys(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, _) = receiver_and_args("keys", args, 0, 0)?;
    let entries = receiver_dict("keys", &receiver)?;
    let keys = entries.read().keys().map(|k| Value::str(k.as_str())).collect();
    Ok(Value::list(keys))
}

fn dict_values(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, _) = receiver_and_args("values", args, 0, 0)?;
    let entries = receiver_dict("values", &receiver)?;
    let values = entries.read().values().cloned().collect();
    Ok(Value::list(values))
}

fn dict_has(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args("has", args, 1, 1)?;
    let entries = receiver_dict("has", &receiver)?;
    let key = expect_str("has", &values[0])?;
    let found = entries.read().contains_key(key);
    Ok(Value::Bool(found))
}

fn dict_get(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args("get", args, 1, 2)?;
    let entries = receiver_dict("get", &receiver)?;
    let key = expect_str("get", &values[0])?;
    let found = entries.read().get(key).cloned();
    Ok(found.or_else(|| values.get(1).cloned()).unwrap_or(Value::Null))
}

fn dict_remove(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let (receiver, values) = receiver_and_args("remove", args, 1, 1)?;
    let entries = receiver_dict("remove", &receiver)?;
    let key = expect_str("remove", &values[0])?;
    let removed = entries.write().shift_remove(key);
    Ok(removed.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoke(receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, VmError> {
        let Some(Value::BoundMethod(method)) = lookup(receiver, name) else {
            panic!("no member {}", name);
        };
        let MethodTarget::Builtin(builtin) = &method.target else {
            panic!("expected builtin member");
        };
        let mut positional = vec![method.receiver.clone()];
        positional.extend(args);
        (builtin.func)(&mut Interpreter::new(), CallArgs::positional(positional))
    }

    #[test]
    fn test_list_push_is_visible_through_aliases() {
        let list = Value::list(vec![Value::Int(1)]);
        let alias = list.clone();
        assert_eq!(invoke(&list, "push", vec![Value::Int(2)]).unwrap(), Value::Int(2));
        assert_eq!(lookup(&alias, "length"), Some(Value::Int(2)));
    }

    #[test]
    fn test_slice_with_negative_bounds() {
        let list = Value::list((0..5).map(Value::Int).collect());
        let sliced = invoke(&list, "slice", vec![Value::Int(1), Value::Int(-1)]).unwrap();
        assert_eq!(sliced.to_string(), "[1, 2, 3]");
    }

    #[test]
    fn test_str_members() {
        let s = Value::str("  Hello World ");
        assert_eq!(invoke(&s, "trim", vec![]).unwrap(), Value::str("Hello World"));
        assert_eq!(invoke(&s, "split", vec![]).unwrap().to_string(), r#"["Hello", "World"]"#);
        assert_eq!(
            invoke(&s, "contains", vec![Value::str("World")]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_member_presence() {
        assert!(has_member(&Value::list(vec![]), "length"));
        assert!(has_member(&Value::str(""), "startsWith"));
        assert!(!has_member(&Value::Int(1), "length"));
        assert!(lookup(&Value::Int(1), "length").is_none());
    }
}
