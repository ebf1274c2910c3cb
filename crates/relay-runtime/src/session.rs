//! Bridge session: the single owner of all state a client can touch.
//!
//! A session holds the interpreter, the loaded component, the object
//! registry and the evaluation context. Loading a component resets the
//! registry (and with it every binding made by `eval`).
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_runtime::{ComponentResolver, Session};
//! use relay_engine::{CallArgs, Value};
//!
//! let mut session = Session::new(ComponentResolver::new(vec!["components".into()]));
//! session.open_component("counter").unwrap();
//! session.new_object("Counter", "c1", CallArgs::positional(vec![Value::Int(5)])).unwrap();
//! let value = session.call_method("c1", "increment", CallArgs::new()).unwrap();
//! assert_eq!(value, Value::Int(6));
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use relay_engine::vm::interpreter::OutputSink;
use relay_engine::{CallArgs, Interpreter, Namespace, Value};

use crate::component::{Component, ComponentLoader};
use crate::error::BridgeResult;
use crate::evaluator::ExpressionEvaluator;
use crate::registry::ObjectRegistry;
use crate::resolve::ComponentResolver;

/// Namespace used for evaluation while no component is loaded
const EMPTY_NAMESPACE: &str = "<empty>";

pub struct Session {
    interp: Interpreter,
    loader: ComponentLoader,
    registry: ObjectRegistry,
    evaluator: ExpressionEvaluator,
    empty: Arc<Namespace>,
}

impl Session {
    pub fn new(resolver: ComponentResolver) -> Self {
        Self {
            interp: Interpreter::new(),
            loader: ComponentLoader::new(resolver),
            registry: ObjectRegistry::new(),
            evaluator: ExpressionEvaluator::new(),
            empty: Arc::new(Namespace::new(EMPTY_NAMESPACE)),
        }
    }

    /// Redirect `print` output of script code.
    pub fn set_output(&mut self, sink: OutputSink) {
        self.interp.set_output(sink);
    }

    pub fn component(&self) -> Option<&Component> {
        self.loader.current()
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &ComponentResolver {
        self.loader.resolver()
    }

    /// Load a component, discarding the previous one and every registered
    /// object and evaluation binding.
    pub fn open_component(&mut self, name: &str) -> BridgeResult<()> {
        self.registry.clear();
        self.loader.load(&mut self.interp, name)?;
        Ok(())
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.loader.has_class(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.loader.has_function(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.loader.has_variable(name)
    }

    pub fn read_variable(&self, name: &str) -> BridgeResult<Value> {
        self.loader.read_variable(name)
    }

    pub fn call_function(&mut self, name: &str, args: CallArgs) -> BridgeResult<Value> {
        self.loader.invoke_function(&mut self.interp, name, args)
    }

    pub fn new_object(&mut self, class_name: &str, id: &str, args: CallArgs) -> BridgeResult<()> {
        self.registry
            .create(&mut self.interp, &self.loader, class_name, id, args)
    }

    pub fn new_object_without_init(
        &mut self,
        class_name: &str,
        id: &str,
        attrs: IndexMap<String, Value>,
    ) -> BridgeResult<()> {
        self.registry
            .create_raw(&mut self.interp, &self.loader, class_name, id, attrs)
    }

    pub fn has_attribute(&self, id: &str, attr: &str) -> BridgeResult<bool> {
        self.registry.has_attribute(&self.interp, id, attr)
    }

    pub fn call_method(&mut self, id: &str, method: &str, args: CallArgs) -> BridgeResult<Value> {
        self.registry.invoke_method(&mut self.interp, id, method, args)
    }

    /// Evaluate code against the component namespace and the registry.
    pub fn eval(&mut self, code: &str) -> BridgeResult<Value> {
        let globals = match self.loader.current() {
            Some(component) => component.namespace().clone(),
            None => self.empty.clone(),
        };
        self.evaluator
            .evaluate(&mut self.interp, code, &globals, &self.registry)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("component", &self.loader.current().map(|c| c.name()))
            .field("objects", &self.registry.ids())
            .field("evaluations", &self.evaluator.evaluations())
            .finish()
    }
}
