//! Expression evaluation

use std::sync::Arc;

use indexmap::IndexMap;

use super::{CallArgs, Frame, FrameKind, Interpreter};
use crate::parser::ast::{Argument, BinaryOp, Expression, LogicalOp, UnaryOp};
use crate::vm::builtins::prelude;
use crate::vm::members;
use crate::vm::object::{BoundMethod, MethodTarget};
use crate::vm::{Value, VmError};

/// Longest string or list `*` will build.
const MAX_REPEAT_LEN: usize = 10_000_000;

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expression, frame: &Frame) -> Result<Value, VmError> {
        match expr {
            Expression::Null(_) => Ok(Value::Null),
            Expression::Bool(b, _) => Ok(Value::Bool(*b)),
            Expression::Int(n, _) => Ok(Value::Int(*n)),
            Expression::Float(n, _) => Ok(Value::Float(*n)),
            Expression::Str(s, _) => Ok(Value::str(s.as_str())),
            Expression::List(items, _) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_expr(item, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }
            Expression::Dict(entries, _) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.eval_expr(value, frame)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::dict(map))
            }
            Expression::Identifier(name, _) => self.lookup(name, frame),
            Expression::This(_) => frame
                .this
                .clone()
                .ok_or_else(|| VmError::type_error("'this' used outside of a method")),
            Expression::Unary { op, operand, .. } => {
                let value = self.eval_expr(operand, frame)?;
                unary(*op, value)
            }
            Expression::Binary { op, left, right, .. } => {
                let left = self.eval_expr(left, frame)?;
                let right = self.eval_expr(right, frame)?;
                binary(*op, &left, &right)
            }
            Expression::Logical { op, left, right, .. } => {
                let left = self.eval_expr(left, frame)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Coalesce => !left.is_null(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval_expr(right, frame)
                }
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.eval_expr(test, frame)?.is_truthy() {
                    self.eval_expr(consequent, frame)
                } else {
                    self.eval_expr(alternate, frame)
                }
            }
            Expression::Assign {
                target, op, value, ..
            } => self.eval_assign(target, *op, value, frame),
            Expression::Call { callee, args, .. } => {
                let callee = self.eval_expr(callee, frame)?;
                let args = self.eval_args(args, frame)?;
                self.call(&callee, args)
            }
            Expression::New { class, args, .. } => {
                let class = match self.eval_expr(class, frame)? {
                    Value::Class(class) => class,
                    other => {
                        return Err(VmError::type_error(format!(
                            "'{}' is not a class",
                            other.type_name()
                        )))
                    }
                };
                let args = self.eval_args(args, frame)?;
                self.construct(&class, args)
            }
            Expression::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(object, frame)?;
                self.get_attr(&object, property)
            }
            Expression::Index { object, index, .. } => {
                let object = self.eval_expr(object, frame)?;
                let index = self.eval_expr(index, frame)?;
                get_index(&object, &index)
            }
            Expression::Function(decl) => Ok(Value::Function(self.make_function(decl, frame, None))),
            Expression::SuperCall { args, .. } => {
                let (home, this) = super_context(frame)?;
                let args = self.eval_args(args, frame)?;
                self.call_super_constructor(&home, this, args)?;
                Ok(Value::Null)
            }
            Expression::SuperMember { property, .. } => {
                let (home, this) = super_context(frame)?;
                let method = home
                    .parent
                    .as_ref()
                    .and_then(|parent| parent.find_method(property))
                    .ok_or_else(|| VmError::AttributeError {
                        type_name: format!("super({})", home.name),
                        attr: property.clone(),
                    })?;
                Ok(Value::BoundMethod(Arc::new(BoundMethod {
                    receiver: this,
                    target: MethodTarget::Script(method),
                })))
            }
        }
    }

    fn eval_args(&mut self, args: &[Argument], frame: &Frame) -> Result<CallArgs, VmError> {
        let mut call_args = CallArgs::new();
        for arg in args {
            let value = self.eval_expr(&arg.value, frame)?;
            match &arg.name {
                None => call_args.positional.push(value),
                Some(name) => {
                    if call_args.named.iter().any(|(n, _)| n == name) {
                        return Err(VmError::argument_error(format!(
                            "keyword argument '{}' repeated",
                            name
                        )));
                    }
                    call_args.named.push((name.clone(), value));
                }
            }
        }
        Ok(call_args)
    }

    // ========================================================================
    // Names
    // ========================================================================

    fn lookup(&self, name: &str, frame: &Frame) -> Result<Value, VmError> {
        if let Some(value) = frame.env.as_ref().and_then(|env| env.lookup(name)) {
            return Ok(value);
        }
        if let Some(value) = frame.globals.get(name) {
            return Ok(value);
        }
        prelude(name).ok_or_else(|| VmError::UndefinedVariable(name.to_string()))
    }

    fn assign_name(&self, name: &str, value: Value, frame: &Frame) -> Result<(), VmError> {
        if let Some(env) = &frame.env {
            if env.assign(name, value.clone())? {
                return Ok(());
            }
        }
        match &frame.kind {
            FrameKind::Eval(root) => root.declare(name, value, false),
            FrameKind::Module => {
                if !frame.globals.assign(name, value.clone())? {
                    frame.globals.define(name, value, false)?;
                }
                Ok(())
            }
            FrameKind::Function => {
                if frame.globals.assign(name, value)? {
                    Ok(())
                } else {
                    Err(VmError::UndefinedVariable(name.to_string()))
                }
            }
        }
    }

    fn eval_assign(
        &mut self,
        target: &Expression,
        op: Option<BinaryOp>,
        value: &Expression,
        frame: &Frame,
    ) -> Result<Value, VmError> {
        match target {
            Expression::Identifier(name, _) => {
                let mut new_value = self.eval_expr(value, frame)?;
                if let Some(op) = op {
                    let current = self.lookup(name, frame)?;
                    new_value = binary(op, &current, &new_value)?;
                }
                self.assign_name(name, new_value.clone(), frame)?;
                Ok(new_value)
            }
            Expression::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(object, frame)?;
                let mut new_value = self.eval_expr(value, frame)?;
                if let Some(op) = op {
                    let current = self.get_attr(&object, property)?;
                    new_value = binary(op, &current, &new_value)?;
                }
                self.set_attr(&object, property, new_value.clone())?;
                Ok(new_value)
            }
            Expression::Index { object, index, .. } => {
                let object = self.eval_expr(object, frame)?;
                let index = self.eval_expr(index, frame)?;
                let mut new_value = self.eval_expr(value, frame)?;
                if let Some(op) = op {
                    let current = get_index(&object, &index)?;
                    new_value = binary(op, &current, &new_value)?;
                }
                set_index(&object, &index, new_value.clone())?;
                Ok(new_value)
            }
            other => Err(VmError::type_error(format!(
                "cannot assign to expression at {}",
                other.span()
            ))),
        }
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// `object.name`
    pub fn get_attr(&mut self, object: &Value, name: &str) -> Result<Value, VmError> {
        match object {
            Value::Instance(instance) => {
                if let Some(value) = instance.get_field(name) {
                    return Ok(value);
                }
                if let Some(method) = instance.class.find_method(name) {
                    return Ok(Value::BoundMethod(Arc::new(BoundMethod {
                        receiver: object.clone(),
                        target: MethodTarget::Script(method),
                    })));
                }
                instance
                    .class
                    .find_static(name)
                    .ok_or_else(|| VmError::no_attribute(object, name))
            }
            Value::Class(class) => {
                if name == "name" {
                    return Ok(Value::str(class.name.as_str()));
                }
                class
                    .find_static(name)
                    .ok_or_else(|| VmError::no_attribute(object, name))
            }
            Value::Module(module) => module
                .namespace
                .get(name)
                .ok_or_else(|| VmError::no_attribute(object, name)),
            Value::Dict(entries) => {
                if let Some(member) = members::lookup(object, name) {
                    return Ok(member);
                }
                let found = entries.read().get(name).cloned();
                found.ok_or_else(|| VmError::KeyError(format!("{:?}", name)))
            }
            _ => members::lookup(object, name).ok_or_else(|| VmError::no_attribute(object, name)),
        }
    }

    /// `object.name = value`
    pub fn set_attr(&mut self, object: &Value, name: &str, value: Value) -> Result<(), VmError> {
        match object {
            Value::Instance(instance) => {
                instance.set_field(name, value);
                Ok(())
            }
            Value::Class(class) => {
                let owner = class.static_owner(name).unwrap_or(class);
                owner.statics.write().insert(name.to_string(), value);
                Ok(())
            }
            Value::Dict(entries) => {
                entries.write().insert(name.to_string(), value);
                Ok(())
            }
            Value::Module(module) => {
                if !module.namespace.assign(name, value.clone())? {
                    module.namespace.define(name, value, false)?;
                }
                Ok(())
            }
            other => Err(VmError::type_error(format!(
                "cannot set attribute '{}' on '{}' object",
                name,
                other.type_name()
            ))),
        }
    }

    /// Whether `object.name` would resolve. Never runs script code.
    pub fn has_attr(&self, object: &Value, name: &str) -> bool {
        match object {
            Value::Instance(instance) => instance.has_attr(name),
            Value::Class(class) => name == "name" || class.find_static(name).is_some(),
            Value::Module(module) => module.namespace.contains(name),
            Value::Dict(entries) => {
                members::has_member(object, name) || entries.read().contains_key(name)
            }
            other => members::has_member(other, name),
        }
    }
}

fn super_context(frame: &Frame) -> Result<(Arc<crate::vm::Class>, Value), VmError> {
    match (&frame.home, &frame.this) {
        (Some(home), Some(this)) => Ok((home.clone(), this.clone())),
        _ => Err(VmError::type_error("'super' used outside of a method")),
    }
}

// ============================================================================
// Indexing
// ============================================================================

fn list_index(index: &Value, len: usize) -> Result<usize, VmError> {
    let Value::Int(i) = index else {
        return Err(VmError::type_error(format!(
            "indices must be integers, not '{}'",
            index.type_name()
        )));
    };
    let resolved = if *i < 0 { len as i64 + *i } else { *i };
    if resolved < 0 || resolved >= len as i64 {
        return Err(VmError::IndexError(format!("index {} out of range", i)));
    }
    Ok(resolved as usize)
}

fn dict_key(index: &Value) -> Result<&str, VmError> {
    index.as_str().ok_or_else(|| {
        VmError::type_error(format!("dict keys must be str, not '{}'", index.type_name()))
    })
}

pub(crate) fn get_index(object: &Value, index: &Value) -> Result<Value, VmError> {
    match object {
        Value::List(items) => {
            let items = items.read();
            let i = list_index(index, items.len())?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = list_index(index, chars.len())?;
            Ok(Value::str(chars[i].to_string()))
        }
        Value::Dict(entries) => {
            let key = dict_key(index)?;
            let found = entries.read().get(key).cloned();
            found.ok_or_else(|| VmError::KeyError(format!("{:?}", key)))
        }
        other => Err(VmError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

pub(crate) fn set_index(object: &Value, index: &Value, value: Value) -> Result<(), VmError> {
    match object {
        Value::List(items) => {
            let mut items = items.write();
            let i = list_index(index, items.len())?;
            items[i] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            let key = dict_key(index)?;
            entries.write().insert(key.to_string(), value);
            Ok(())
        }
        other => Err(VmError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

// ============================================================================
// Operators
// ============================================================================

fn unary(op: UnaryOp, value: Value) -> Result<Value, VmError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Typeof => Ok(Value::str(value.type_name())),
        UnaryOp::Negate => match value {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| VmError::Overflow("negation".into())),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(VmError::type_error(format!(
                "bad operand type for unary -: '{}'",
                other.type_name()
            ))),
        },
    }
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> VmError {
    VmError::type_error(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, VmError> {
    use BinaryOp::*;

    match op {
        Equal => return Ok(Value::Bool(left.equals(right))),
        NotEqual => return Ok(Value::Bool(!left.equals(right))),
        Less | LessEqual | Greater | GreaterEqual => {
            let ordering = left
                .compare(right)
                .ok_or_else(|| unsupported(op, left, right))?;
            let result = match op {
                Less => ordering.is_lt(),
                LessEqual => ordering.is_le(),
                Greater => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            return Ok(Value::Bool(result));
        }
        _ => {}
    }

    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (left.as_f64().unwrap_or_default(), right.as_f64().unwrap_or_default());
            float_arith(op, a, b)
        }
        (Value::Str(a), Value::Str(b)) if op == Add => Ok(Value::str(format!("{}{}", a, b))),
        (Value::Str(a), other) | (other, Value::Str(a)) if op == Add => {
            if matches!(left, Value::Str(_)) {
                Ok(Value::str(format!("{}{}", a, other)))
            } else {
                Ok(Value::str(format!("{}{}", other, a)))
            }
        }
        (Value::List(a), Value::List(b)) if op == Add => {
            let mut items = a.read().clone();
            items.extend(b.read().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) if op == Multiply => {
            let count = repeat_count(*n, s.len())?;
            Ok(Value::str(s.repeat(count)))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items))
            if op == Multiply =>
        {
            let items = items.read().clone();
            let count = repeat_count(*n, items.len())?;
            let mut repeated = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::list(repeated))
        }
        _ => Err(unsupported(op, left, right)),
    }
}

/// Copies to make when repeating `unit` elements `n` times. Empty units
/// repeat zero times so the result stays empty without looping.
fn repeat_count(n: i64, unit: usize) -> Result<usize, VmError> {
    if unit == 0 {
        return Ok(0);
    }
    let count = n.max(0) as usize;
    if unit.saturating_mul(count) > MAX_REPEAT_LEN {
        return Err(VmError::Overflow("repetition".into()));
    }
    Ok(count)
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value, VmError> {
    let overflow = || VmError::Overflow(format!("{} {} {}", a, op.symbol(), b));
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Subtract => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Multiply => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Divide => {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::Modulo => {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            // Result takes the sign of the divisor
            let r = a.checked_rem(b).ok_or_else(overflow)?;
            Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
        }
        BinaryOp::Power => {
            if b < 0 {
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            let exp = u32::try_from(b).map_err(|_| overflow())?;
            a.checked_pow(exp).map(Value::Int).ok_or_else(overflow)
        }
        _ => Err(VmError::Internal(format!("'{}' is not arithmetic", op.symbol()))),
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Result<Value, VmError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => {
            if b == 0.0 {
                return Err(VmError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::Modulo => {
            if b == 0.0 {
                return Err(VmError::DivisionByZero);
            }
            a - b * (a / b).floor()
        }
        BinaryOp::Power => a.powf(b),
        _ => return Err(VmError::Internal(format!("'{}' is not arithmetic", op.symbol()))),
    };
    Ok(Value::Float(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(binary(BinaryOp::Modulo, &Value::Int(-7), &Value::Int(3)).unwrap(), Value::Int(2));
        assert_eq!(binary(BinaryOp::Modulo, &Value::Int(7), &Value::Int(-3)).unwrap(), Value::Int(-2));
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        assert!(matches!(
            binary(BinaryOp::Add, &Value::Int(i64::MAX), &Value::Int(1)),
            Err(VmError::Overflow(_))
        ));
        assert!(matches!(
            binary(BinaryOp::Power, &Value::Int(2), &Value::Int(64)),
            Err(VmError::Overflow(_))
        ));
    }

    #[test]
    fn test_division_yields_float() {
        assert_eq!(binary(BinaryOp::Divide, &Value::Int(7), &Value::Int(2)).unwrap(), Value::Float(3.5));
        assert!(matches!(
            binary(BinaryOp::Divide, &Value::Int(1), &Value::Int(0)),
            Err(VmError::DivisionByZero)
        ));
    }

    #[test]
    fn test_string_concatenation_with_other_types() {
        assert_eq!(
            binary(BinaryOp::Add, &Value::str("n="), &Value::Int(3)).unwrap(),
            Value::str("n=3")
        );
        assert_eq!(
            binary(BinaryOp::Add, &Value::Int(3), &Value::str("x")).unwrap(),
            Value::str("3x")
        );
    }

    #[test]
    fn test_repeating_empty_values_ignores_count() {
        let empty = binary(BinaryOp::Multiply, &Value::list(vec![]), &Value::Int(i64::MAX)).unwrap();
        assert_eq!(empty, Value::list(vec![]));
        let text = binary(BinaryOp::Multiply, &Value::Int(i64::MAX), &Value::str("")).unwrap();
        assert_eq!(text, Value::str(""));
        assert!(matches!(
            binary(BinaryOp::Multiply, &Value::list(vec![Value::Null]), &Value::Int(i64::MAX)),
            Err(VmError::Overflow(_))
        ));
    }

    #[test]
    fn test_negative_index() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(get_index(&list, &Value::Int(-1)).unwrap(), Value::Int(2));
        assert!(get_index(&list, &Value::Int(2)).is_err());
    }
}
