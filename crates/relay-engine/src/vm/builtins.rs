//! Prelude: the intrinsic functions visible from every module
//!
//! Prelude names are the last step of name resolution, so a module binding
//! or a registry identifier with the same name shadows them.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::vm::{CallArgs, Interpreter, Value, VmError};

/// Signature shared by prelude functions and built-in members.
pub type BuiltinFn = fn(&mut Interpreter, CallArgs) -> Result<Value, VmError>;

/// A natively implemented function.
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

/// Largest list `range` will build.
const MAX_RANGE_LEN: i64 = 10_000_000;

static PRELUDE: &[Builtin] = &[
    Builtin { name: "print", func: print },
    Builtin { name: "len", func: len },
    Builtin { name: "str", func: to_str },
    Builtin { name: "int", func: to_int },
    Builtin { name: "float", func: to_float },
    Builtin { name: "bool", func: to_bool },
    Builtin { name: "type", func: type_of },
    Builtin { name: "range", func: range },
    Builtin { name: "abs", func: abs },
    Builtin { name: "min", func: min },
    Builtin { name: "max", func: max },
    Builtin { name: "round", func: round },
    Builtin { name: "now", func: now },
    Builtin { name: "hasattr", func: hasattr },
    Builtin { name: "getattr", func: getattr },
    Builtin { name: "setattr", func: setattr },
    Builtin { name: "isinstance", func: isinstance },
    Builtin { name: "keys", func: keys },
    Builtin { name: "values", func: values },
    Builtin { name: "error", func: error },
];

static PRELUDE_INDEX: Lazy<FxHashMap<&'static str, &'static Builtin>> =
    Lazy::new(|| PRELUDE.iter().map(|b| (b.name, b)).collect());

/// Look up a prelude function by name.
pub fn prelude(name: &str) -> Option<Value> {
    PRELUDE_INDEX.get(name).map(|&b| Value::Builtin(b))
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Check arity and reject named arguments; returns the positional values.
pub(crate) fn positional(
    name: &str,
    args: CallArgs,
    min: usize,
    max: usize,
) -> Result<Vec<Value>, VmError> {
    if let Some((label, _)) = args.named.first() {
        return Err(VmError::argument_error(format!(
            "{}() got an unexpected keyword argument '{}'",
            name, label
        )));
    }
    let count = args.positional.len();
    if count < min || count > max {
        let expected = if min == max {
            format!("{}", min)
        } else if max == usize::MAX {
            format!("at least {}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(VmError::argument_error(format!(
            "{}() takes {} arguments ({} given)",
            name, expected, count
        )));
    }
    Ok(args.positional)
}

pub(crate) fn expect_int(name: &str, value: &Value) -> Result<i64, VmError> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Bool(b) => Ok(*b as i64),
        other => Err(VmError::type_error(format!(
            "{}() expected int, got {}",
            name,
            other.type_name()
        ))),
    }
}

pub(crate) fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, VmError> {
    value.as_str().ok_or_else(|| {
        VmError::type_error(format!("{}() expected str, got {}", name, value.type_name()))
    })
}

// ============================================================================
// Prelude functions
// ============================================================================

fn print(interp: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("print", args, 0, usize::MAX)?;
    let line = values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    interp.write_output(&line);
    Ok(Value::Null)
}

fn len(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("len", args, 1, 1)?;
    let n = match &values[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.read().len(),
        Value::Dict(entries) => entries.read().len(),
        other => {
            return Err(VmError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

fn to_str(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("str", args, 0, 1)?;
    Ok(Value::str(
        values.first().map(Value::to_string).unwrap_or_default(),
    ))
}

fn to_int(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("int", args, 1, 1)?;
    match &values[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => float_to_int(*f),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| VmError::type_error(format!("invalid literal for int(): {:?}", s))),
        other => Err(VmError::type_error(format!(
            "int() argument must be a number or str, not '{}'",
            other.type_name()
        ))),
    }
}

pub(crate) fn float_to_int(f: f64) -> Result<Value, VmError> {
    if !f.is_finite() || f.trunc() < i64::MIN as f64 || f.trunc() >= i64::MAX as f64 {
        return Err(VmError::Overflow(format!("conversion of {} to int", f)));
    }
    Ok(Value::Int(f.trunc() as i64))
}

fn to_float(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("float", args, 1, 1)?;
    match &values[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => {
            let text = s.trim();
            let parsed = match text {
                "NaN" | "nan" => Some(f64::NAN),
                "inf" | "Infinity" => Some(f64::INFINITY),
                "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
                _ => text.parse::<f64>().ok(),
            };
            parsed
                .map(Value::Float)
                .ok_or_else(|| VmError::type_error(format!("could not convert {:?} to float", s)))
        }
        other => Err(VmError::type_error(format!(
            "float() argument must be a number or str, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_bool(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("bool", args, 0, 1)?;
    Ok(Value::Bool(values.first().is_some_and(Value::is_truthy)))
}

fn type_of(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("type", args, 1, 1)?;
    Ok(Value::str(values[0].type_name()))
}

fn range(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("range", args, 1, 3)?;
    let ints = values
        .iter()
        .map(|v| expect_int("range", v))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => unreachable!("arity checked"),
    };
    if step == 0 {
        return Err(VmError::argument_error("range() step must not be zero"));
    }

    let span = if step > 0 {
        (stop as i128 - start as i128).max(0)
    } else {
        (start as i128 - stop as i128).max(0)
    };
    let count = (span + step.unsigned_abs() as i128 - 1) / step.unsigned_abs() as i128;
    if count > MAX_RANGE_LEN as i128 {
        return Err(VmError::argument_error(format!(
            "range() would produce {} items (limit {})",
            count, MAX_RANGE_LEN
        )));
    }

    let items = (0..count as i64)
        .map(|i| Value::Int(start + i * step))
        .collect();
    Ok(Value::list(items))
}

fn abs(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("abs", args, 1, 1)?;
    match &values[0] {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| VmError::Overflow("abs()".into())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(VmError::type_error(format!(
            "bad operand type for abs(): '{}'",
            other.type_name()
        ))),
    }
}

fn extremum(name: &str, args: CallArgs, want: std::cmp::Ordering) -> Result<Value, VmError> {
    let values = positional(name, args, 1, usize::MAX)?;
    let candidates = match values.as_slice() {
        [Value::List(items)] => items.read().clone(),
        [single] => {
            return Err(VmError::type_error(format!(
                "{}() expected a list or several arguments, got {}",
                name,
                single.type_name()
            )))
        }
        _ => values,
    };

    let mut iter = candidates.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| VmError::argument_error(format!("{}() of an empty list", name)))?;
    for candidate in iter {
        let ordering = candidate.compare(&best).ok_or_else(|| {
            VmError::type_error(format!(
                "'{}' not supported between '{}' and '{}'",
                name,
                candidate.type_name(),
                best.type_name()
            ))
        })?;
        if ordering == want {
            best = candidate;
        }
    }
    Ok(best)
}

fn min(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    extremum("min", args, std::cmp::Ordering::Less)
}

fn max(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    extremum("max", args, std::cmp::Ordering::Greater)
}

fn round(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("round", args, 1, 2)?;
    let digits = values.get(1).map(|v| expect_int("round", v)).transpose()?;
    match (&values[0], digits) {
        (Value::Int(n), _) => Ok(Value::Int(*n)),
        (Value::Float(f), None) => float_to_int(f.round()),
        (Value::Float(f), Some(d)) => {
            let factor = 10f64.powi(d.clamp(-308, 308) as i32);
            Ok(Value::Float((f * factor).round() / factor))
        }
        (other, _) => Err(VmError::type_error(format!(
            "round() expected a number, got {}",
            other.type_name()
        ))),
    }
}

fn now(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    positional("now", args, 0, 0)?;
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| VmError::Internal(e.to_string()))?;
    Ok(Value::Float(elapsed.as_secs_f64()))
}

fn hasattr(interp: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("hasattr", args, 2, 2)?;
    let name = expect_str("hasattr", &values[1])?;
    Ok(Value::Bool(interp.has_attr(&values[0], name)))
}

fn getattr(interp: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("getattr", args, 2, 3)?;
    let name = expect_str("getattr", &values[1])?;
    match interp.get_attr(&values[0], name) {
        Err(VmError::AttributeError { .. }) if values.len() == 3 => Ok(values[2].clone()),
        other => other,
    }
}

fn setattr(interp: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("setattr", args, 3, 3)?;
    let name = expect_str("setattr", &values[1])?;
    interp.set_attr(&values[0], name, values[2].clone())?;
    Ok(Value::Null)
}

fn isinstance(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("isinstance", args, 2, 2)?;
    let result = match (&values[0], &values[1]) {
        (Value::Instance(instance), Value::Class(class)) => instance.class.is_subclass_of(class),
        (_, Value::Class(_)) => false,
        (value, Value::Str(type_name)) => value.type_name() == &**type_name,
        (_, other) => {
            return Err(VmError::type_error(format!(
                "isinstance() arg 2 must be a class or type name, not '{}'",
                other.type_name()
            )))
        }
    };
    Ok(Value::Bool(result))
}

fn entries_of(name: &str, value: &Value) -> Result<IndexMap<String, Value>, VmError> {
    match value {
        Value::Dict(entries) => Ok(entries.read().clone()),
        Value::Instance(instance) => Ok(instance.fields.read().clone()),
        Value::Module(module) => Ok(module.namespace.entries().into_iter().collect()),
        other => Err(VmError::type_error(format!(
            "{}() expected a dict, instance or module, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn keys(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("keys", args, 1, 1)?;
    let entries = entries_of("keys", &values[0])?;
    Ok(Value::list(entries.into_keys().map(Value::str).collect()))
}

fn values(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("values", args, 1, 1)?;
    let entries = entries_of("values", &values[0])?;
    Ok(Value::list(entries.into_values().collect()))
}

fn error(_: &mut Interpreter, args: CallArgs) -> Result<Value, VmError> {
    let values = positional("error", args, 0, 1)?;
    let message = values
        .into_iter()
        .next()
        .unwrap_or_else(|| Value::str("error"));
    Err(VmError::Thrown(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, positional: Vec<Value>) -> Result<Value, VmError> {
        let mut interp = Interpreter::new();
        let Some(Value::Builtin(builtin)) = prelude(name) else {
            panic!("missing builtin {}", name);
        };
        (builtin.func)(&mut interp, CallArgs::positional(positional))
    }

    #[test]
    fn test_range_forms() {
        assert_eq!(call("range", vec![Value::Int(3)]).unwrap().to_string(), "[0, 1, 2]");
        assert_eq!(
            call("range", vec![Value::Int(5), Value::Int(0), Value::Int(-2)])
                .unwrap()
                .to_string(),
            "[5, 3, 1]"
        );
        assert!(call("range", vec![Value::Int(0), Value::Int(1), Value::Int(0)]).is_err());
        assert!(call("range", vec![Value::Int(i64::MAX)]).is_err());
    }

    #[test]
    fn test_int_conversion() {
        assert_eq!(call("int", vec![Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert_eq!(call("int", vec![Value::str(" 42 ")]).unwrap(), Value::Int(42));
        assert!(call("int", vec![Value::str("4x")]).is_err());
        assert!(call("int", vec![Value::Float(f64::NAN)]).is_err());
    }

    #[test]
    fn test_min_max() {
        let list = Value::list(vec![Value::Int(3), Value::Float(1.5), Value::Int(2)]);
        assert_eq!(call("min", vec![list.clone()]).unwrap(), Value::Float(1.5));
        assert_eq!(call("max", vec![list]).unwrap(), Value::Int(3));
        assert!(call("max", vec![Value::list(vec![])]).is_err());
    }

    #[test]
    fn test_error_raises_its_argument() {
        match call("error", vec![Value::str("boom")]) {
            Err(VmError::Thrown(value)) => assert_eq!(value, Value::str("boom")),
            other => panic!("expected thrown value, got {:?}", other),
        }
    }

    #[test]
    fn test_named_arguments_rejected() {
        let mut interp = Interpreter::new();
        let args = CallArgs {
            positional: vec![Value::Int(1)],
            named: vec![("x".to_string(), Value::Int(2))],
        };
        assert!(matches!(
            abs(&mut interp, args),
            Err(VmError::ArgumentError(_))
        ));
    }
}
