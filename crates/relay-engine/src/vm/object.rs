//! Object model: functions, classes, instances, bound methods, modules
//!
//! Functions refer back to the namespace and class that define them through
//! `Weak` pointers; the namespace (or class) already owns the function, so a
//! strong pointer would form a cycle that outlives a component reload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::parser::ast::{ClassDecl, FunctionDecl};
use crate::vm::builtins::Builtin;
use crate::vm::scope::{Env, Namespace};
use crate::vm::{Value, VmError};

// ============================================================================
// Function
// ============================================================================

/// A script function or method.
#[derive(Debug)]
pub struct Function {
    pub decl: Arc<FunctionDecl>,
    /// Namespace of the defining module
    pub globals: Weak<Namespace>,
    /// Enclosing local scope, for functions defined inside another body
    pub closure: Option<Env>,
    /// Class whose body defines this method; target of `super`
    pub home: Option<Weak<Class>>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn globals(&self) -> Result<Arc<Namespace>, VmError> {
        self.globals.upgrade().ok_or_else(|| {
            VmError::Internal(format!("module defining '{}' was unloaded", self.name()))
        })
    }

    pub fn home(&self) -> Option<Arc<Class>> {
        self.home.as_ref().and_then(Weak::upgrade)
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.decl.params.iter().map(|p| p.name.as_str()).collect()
    }
}

// ============================================================================
// Class
// ============================================================================

/// A class value.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub parent: Option<Arc<Class>>,
    pub decl: Arc<ClassDecl>,
    pub constructor: Option<Arc<Function>>,
    pub methods: IndexMap<String, Arc<Function>>,
    pub static_methods: IndexMap<String, Arc<Function>>,
    /// Static fields; mutable through `Class.field = value`
    pub statics: RwLock<IndexMap<String, Value>>,
    pub globals: Weak<Namespace>,
    pub closure: Option<Env>,
}

impl Class {
    /// Instance method lookup along the inheritance chain.
    pub fn find_method(&self, name: &str) -> Option<Arc<Function>> {
        let mut class = Some(self);
        while let Some(c) = class {
            if let Some(method) = c.methods.get(name) {
                return Some(method.clone());
            }
            class = c.parent.as_deref();
        }
        None
    }

    /// Static field or static method lookup along the inheritance chain.
    pub fn find_static(&self, name: &str) -> Option<Value> {
        let mut class = Some(self);
        while let Some(c) = class {
            if let Some(value) = c.statics.read().get(name) {
                return Some(value.clone());
            }
            if let Some(method) = c.static_methods.get(name) {
                return Some(Value::Function(method.clone()));
            }
            class = c.parent.as_deref();
        }
        None
    }

    /// The class in the chain (starting at `self`) whose statics hold `name`.
    pub fn static_owner(&self, name: &str) -> Option<&Class> {
        let mut class = Some(self);
        while let Some(c) = class {
            if c.statics.read().contains_key(name) {
                return Some(c);
            }
            class = c.parent.as_deref();
        }
        None
    }

    /// Nearest constructor along the chain.
    pub fn find_constructor(&self) -> Option<Arc<Function>> {
        let mut class = Some(self);
        while let Some(c) = class {
            if let Some(ctor) = &c.constructor {
                return Some(ctor.clone());
            }
            class = c.parent.as_deref();
        }
        None
    }

    /// Whether `self` is `other` or derives from it.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        let mut class = Some(self);
        while let Some(c) = class {
            if std::ptr::eq(c, other) {
                return true;
            }
            class = c.parent.as_deref();
        }
        false
    }

    /// Classes from the root ancestor down to `self`.
    pub fn lineage(self: &Arc<Self>) -> Vec<Arc<Class>> {
        let mut chain = vec![self.clone()];
        let mut class = self.parent.clone();
        while let Some(c) = class {
            class = c.parent.clone();
            chain.push(c);
        }
        chain.reverse();
        chain
    }
}

// ============================================================================
// Instance
// ============================================================================

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// An object created from a class.
#[derive(Debug)]
pub struct Instance {
    pub class: Arc<Class>,
    pub fields: RwLock<IndexMap<String, Value>>,
    pub id: u64,
}

impl Instance {
    /// Allocate an instance with no fields. Nothing is initialized.
    pub fn new(class: Arc<Class>) -> Self {
        Self {
            class,
            fields: RwLock::new(IndexMap::new()),
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.read().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.write().insert(name.to_string(), value);
    }

    /// Own fields, then instance methods and statics anywhere in the class chain.
    pub fn has_attr(&self, name: &str) -> bool {
        self.fields.read().contains_key(name)
            || self.class.find_method(name).is_some()
            || self.class.find_static(name).is_some()
    }

    /// Snapshot of the own fields in assignment order.
    pub fn field_entries(&self) -> Vec<(String, Value)> {
        self.fields
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ============================================================================
// Bound methods
// ============================================================================

/// What a bound method invokes.
#[derive(Debug, Clone)]
pub enum MethodTarget {
    /// Script method; the receiver becomes `this`
    Script(Arc<Function>),
    /// Built-in member of list/str/dict; the receiver is passed first
    Builtin(&'static Builtin),
}

/// A method paired with its receiver.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub target: MethodTarget,
}

impl BoundMethod {
    pub fn name(&self) -> &str {
        match &self.target {
            MethodTarget::Script(func) => func.name(),
            MethodTarget::Builtin(builtin) => builtin.name,
        }
    }
}

// ============================================================================
// Module
// ============================================================================

/// A loaded source unit and its namespace.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    /// Where the source came from (a path, or `<inline>`)
    pub origin: String,
    pub namespace: Arc<Namespace>,
}
