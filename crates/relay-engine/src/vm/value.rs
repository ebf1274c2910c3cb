//! Runtime values
//!
//! Scalars are stored inline. Lists and dicts are shared, mutable containers
//! (`Arc<RwLock<..>>`) so that aliases observe each other's mutations, the way
//! script programmers expect. Everything is `Send + Sync`; the bridge hands
//! values between worker threads.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::vm::builtins::Builtin;
use crate::vm::object::{BoundMethod, Class, Function, Instance, Module};

/// Shared list storage
pub type ListRef = Arc<RwLock<Vec<Value>>>;

/// Shared dict storage (insertion ordered, string keys)
pub type DictRef = Arc<RwLock<IndexMap<String, Value>>>;

/// Nesting depth after which display and comparison stop descending.
pub const MAX_VALUE_DEPTH: usize = 64;

/// Containers a single display or conversion may expand.
pub const MAX_VALUE_NODES: usize = 100_000;

/// A Relay script value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(ListRef),
    Dict(DictRef),
    Function(Arc<Function>),
    Builtin(&'static Builtin),
    Class(Arc<Class>),
    Instance(Arc<Instance>),
    BoundMethod(Arc<BoundMethod>),
    Module(Arc<Module>),
}

impl Value {
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(RwLock::new(items)))
    }

    pub fn dict(entries: IndexMap<String, Value>) -> Self {
        Value::Dict(Arc::new(RwLock::new(entries)))
    }

    /// Runtime type name; instances report their class name.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Class(_) => "class",
            Value::Instance(instance) => &instance.class.name,
            Value::BoundMethod(_) => "method",
            Value::Module(_) => "module",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.read().is_empty(),
            Value::Dict(entries) => !entries.read().is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Builtin(_) | Value::Class(_) | Value::BoundMethod(_)
        )
    }

    /// Numeric view used by arithmetic and comparison.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering for numbers (int and float mix) and for strings.
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }

    /// Structural equality for data, identity for objects.
    pub fn equals(&self, other: &Value) -> bool {
        self.equals_at(other, &mut Comparison::new())
    }

    fn equals_at(&self, other: &Value, cmp: &mut Comparison) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                if let Some(settled) = cmp.enter((identity(a), identity(b))) {
                    return settled;
                }
                let (a, b) = (a.read().clone(), b.read().clone());
                let same = a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.equals_at(y, cmp));
                cmp.leave();
                same
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                if let Some(settled) = cmp.enter((identity(a), identity(b))) {
                    return settled;
                }
                let (a, b) = (a.read().clone(), b.read().clone());
                let same = a.len() == b.len()
                    && a.iter().all(|(k, x)| b.get(k).is_some_and(|y| x.equals_at(y, cmp)));
                cmp.leave();
                same
            }
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Class(a), Value::Class(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => Arc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Text used inside containers: strings are quoted.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        let _ = self.write_text(&mut out, true, &mut ValueWalk::new());
        out
    }

    /// Address of the shared storage behind a container or instance.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(identity(items)),
            Value::Dict(entries) => Some(identity(entries)),
            Value::Instance(instance) => Some(identity(instance)),
            _ => None,
        }
    }

    fn write_text(&self, out: &mut impl fmt::Write, quoted: bool, walk: &mut ValueWalk) -> fmt::Result {
        if matches!(self, Value::List(_) | Value::Dict(_)) && !walk.enter(self) {
            return out.write_str("...");
        }
        let written = self.write_contents(out, quoted, walk);
        if matches!(self, Value::List(_) | Value::Dict(_)) {
            walk.leave();
        }
        written
    }

    fn write_contents(&self, out: &mut impl fmt::Write, quoted: bool, walk: &mut ValueWalk) -> fmt::Result {
        match self {
            Value::Null => out.write_str("null"),
            Value::Bool(b) => write!(out, "{}", b),
            Value::Int(n) => write!(out, "{}", n),
            Value::Float(n) => out.write_str(&format_float(*n)),
            Value::Str(s) if quoted => write!(out, "{:?}", s),
            Value::Str(s) => out.write_str(s),
            Value::List(items) => {
                let items = items.read().clone();
                out.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    item.write_text(out, true, walk)?;
                }
                out.write_char(']')
            }
            Value::Dict(entries) => {
                let entries = entries.read().clone();
                out.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    write!(out, "{:?}: ", key)?;
                    value.write_text(out, true, walk)?;
                }
                out.write_char('}')
            }
            Value::Function(func) => write!(out, "<function {}>", func.name()),
            Value::Builtin(builtin) => write!(out, "<builtin {}>", builtin.name),
            Value::Class(class) => write!(out, "<class {}>", class.name),
            Value::Instance(instance) => write!(out, "<{} instance>", instance.class.name),
            Value::BoundMethod(method) => write!(
                out,
                "<bound method {}.{}>",
                method.receiver.type_name(),
                method.name()
            ),
            Value::Module(module) => write!(out, "<module {}>", module.name),
        }
    }
}

fn identity<T: ?Sized>(shared: &Arc<T>) -> usize {
    Arc::as_ptr(shared) as *const () as usize
}

/// Container pairs under comparison.
struct Comparison {
    pending: Vec<(usize, usize)>,
    remaining: usize,
}

impl Comparison {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
            remaining: MAX_VALUE_NODES,
        }
    }

    /// `Some` when the pair is already decided: a pair met again inside
    /// itself agrees so far, one too deep or past the budget does not.
    fn enter(&mut self, pair: (usize, usize)) -> Option<bool> {
        if self.pending.contains(&pair) {
            return Some(true);
        }
        if self.remaining == 0 || self.pending.len() >= MAX_VALUE_DEPTH {
            return Some(false);
        }
        self.remaining -= 1;
        self.pending.push(pair);
        None
    }

    fn leave(&mut self) {
        self.pending.pop();
    }
}

/// Guard for a recursive walk over shared values.
///
/// Refuses a container that is already being expanded. Nesting is capped at
/// [`MAX_VALUE_DEPTH`] and a whole walk at [`MAX_VALUE_NODES`] containers.
#[derive(Debug)]
pub struct ValueWalk {
    ancestors: Vec<usize>,
    remaining: usize,
}

impl ValueWalk {
    pub fn new() -> Self {
        Self {
            ancestors: Vec::new(),
            remaining: MAX_VALUE_NODES,
        }
    }

    /// Start expanding `value`. Returns false when it must be elided; only
    /// a successful `enter` is paired with [`ValueWalk::leave`].
    pub fn enter(&mut self, value: &Value) -> bool {
        let Some(id) = value.identity() else {
            return true;
        };
        if self.remaining == 0
            || self.ancestors.len() >= MAX_VALUE_DEPTH
            || self.ancestors.contains(&id)
        {
            return false;
        }
        self.remaining -= 1;
        self.ancestors.push(id);
        true
    }

    pub fn leave(&mut self) {
        self.ancestors.pop();
    }
}

impl Default for ValueWalk {
    fn default() -> Self {
        Self::new()
    }
}

/// Floats always show a fractional part or a non-finite marker.
pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f, false, &mut ValueWalk::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f, true, &mut ValueWalk::new())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
    }

    #[test]
    fn test_numeric_equality_crosses_int_and_float() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::str("2"));
    }

    #[test]
    fn test_display_quotes_nested_strings_only() {
        let list = Value::list(vec![Value::str("a"), Value::Int(1), Value::Float(2.0)]);
        assert_eq!(list.to_string(), r#"["a", 1, 2.0]"#);
        assert_eq!(Value::str("a").to_string(), "a");
    }

    #[test]
    fn test_cyclic_list_display_terminates() {
        let list = Value::list(vec![]);
        if let Value::List(items) = &list {
            items.write().push(list.clone());
        }
        assert_eq!(list.to_string(), "[...]");
    }

    #[test]
    fn test_shared_back_references_stay_linear() {
        let dict = Value::dict(IndexMap::new());
        if let Value::Dict(entries) = &dict {
            let mut entries = entries.write();
            entries.insert("a".to_string(), dict.clone());
            entries.insert("b".to_string(), dict.clone());
        }
        assert_eq!(dict.to_string(), r#"{"a": ..., "b": ...}"#);
    }

    #[test]
    fn test_cyclic_equality_terminates() {
        let make = || {
            let dict = Value::dict(IndexMap::new());
            if let Value::Dict(entries) = &dict {
                let mut entries = entries.write();
                entries.insert("a".to_string(), dict.clone());
                entries.insert("b".to_string(), dict.clone());
            }
            dict
        };
        assert_eq!(make(), make());
    }
}
