//! Name bindings
//!
//! A [`Namespace`] holds the top-level bindings of one module in declaration
//! order. An [`Env`] is a chain of local scopes (function bodies, blocks, and
//! the bridge's object registry) that closures capture by reference.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::vm::{Value, VmError};

/// A bound value and whether it may be reassigned.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub constant: bool,
}

impl Binding {
    pub fn new(value: Value, constant: bool) -> Self {
        Self { value, constant }
    }
}

// ============================================================================
// Namespace
// ============================================================================

/// Module-level bindings.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    bindings: RwLock<IndexMap<String, Binding>>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: RwLock::new(IndexMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.read().get(name).map(|b| b.value.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Bind `name`, replacing any non-constant binding.
    pub fn define(&self, name: &str, value: Value, constant: bool) -> Result<(), VmError> {
        let mut bindings = self.bindings.write();
        if bindings.get(name).is_some_and(|b| b.constant) {
            return Err(VmError::ConstAssignment(name.to_string()));
        }
        bindings.insert(name.to_string(), Binding::new(value, constant));
        Ok(())
    }

    /// Update an existing binding. Returns `Ok(false)` when `name` is unbound.
    pub fn assign(&self, name: &str, value: Value) -> Result<bool, VmError> {
        let mut bindings = self.bindings.write();
        match bindings.get_mut(name) {
            Some(binding) if binding.constant => Err(VmError::ConstAssignment(name.to_string())),
            Some(binding) => {
                binding.value = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Bindings in declaration order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.bindings
            .read()
            .iter()
            .map(|(k, b)| (k.clone(), b.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

// ============================================================================
// Env
// ============================================================================

#[derive(Debug)]
struct Frame {
    vars: RwLock<FxHashMap<String, Binding>>,
    parent: Option<Env>,
}

/// A local scope and its enclosing scopes. Cloning shares the scope.
#[derive(Debug, Clone)]
pub struct Env(Arc<Frame>);

impl Env {
    /// A scope with no parent.
    pub fn new() -> Self {
        Env(Arc::new(Frame {
            vars: RwLock::new(FxHashMap::default()),
            parent: None,
        }))
    }

    /// A fresh scope nested inside `self`.
    pub fn child(&self) -> Self {
        Env(Arc::new(Frame {
            vars: RwLock::new(FxHashMap::default()),
            parent: Some(self.clone()),
        }))
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(binding) = env.0.vars.read().get(name) {
                return Some(binding.value.clone());
            }
            scope = env.0.parent.as_ref();
        }
        None
    }

    /// Bind `name` in this scope, shadowing outer scopes.
    pub fn declare(&self, name: &str, value: Value, constant: bool) -> Result<(), VmError> {
        let mut vars = self.0.vars.write();
        if vars.get(name).is_some_and(|b| b.constant) {
            return Err(VmError::ConstAssignment(name.to_string()));
        }
        vars.insert(name.to_string(), Binding::new(value, constant));
        Ok(())
    }

    /// Bind `name` in this scope regardless of any existing binding.
    pub fn set_local(&self, name: &str, value: Value) {
        self.0
            .vars
            .write()
            .insert(name.to_string(), Binding::new(value, false));
    }

    /// Update the nearest binding of `name`. Returns `Ok(false)` when unbound.
    pub fn assign(&self, name: &str, value: Value) -> Result<bool, VmError> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            let mut vars = env.0.vars.write();
            if let Some(binding) = vars.get_mut(name) {
                if binding.constant {
                    return Err(VmError::ConstAssignment(name.to_string()));
                }
                binding.value = value;
                return Ok(true);
            }
            drop(vars);
            scope = env.0.parent.as_ref();
        }
        Ok(false)
    }

    /// Value bound directly in this scope (parents are not consulted).
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.0.vars.read().get(name).map(|b| b.value.clone())
    }

    /// Names bound directly in this scope, sorted.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.vars.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every binding in this scope.
    pub fn clear(&self) {
        self.0.vars.write().clear();
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_assign_walks_to_outer_scope() {
        let root = Env::new();
        root.declare("x", Value::Int(1), false).unwrap();
        let inner = root.child();
        assert!(inner.assign("x", Value::Int(2)).unwrap());
        assert_eq!(root.lookup("x"), Some(Value::Int(2)));
        assert!(!inner.assign("y", Value::Int(3)).unwrap());
    }

    #[test]
    fn test_constants_reject_reassignment() {
        let ns = Namespace::new("m");
        ns.define("PI", Value::Float(2.5), true).unwrap();
        assert!(matches!(
            ns.assign("PI", Value::Int(3)),
            Err(VmError::ConstAssignment(_))
        ));

        let env = Env::new();
        env.declare("k", Value::Int(1), true).unwrap();
        assert!(env.declare("k", Value::Int(2), false).is_err());
        env.set_local("k", Value::Int(2));
        assert_eq!(env.get_local("k"), Some(Value::Int(2)));
    }

    #[test]
    fn test_namespace_keeps_declaration_order() {
        let ns = Namespace::new("m");
        ns.define("b", Value::Int(1), false).unwrap();
        ns.define("a", Value::Int(2), false).unwrap();
        let names: Vec<_> = ns.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
