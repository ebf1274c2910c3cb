//! Live objects addressed by caller-chosen identifiers.
//!
//! The identifier space is an [`Env`] root so that the expression evaluator
//! can use it directly as its writable local scope: objects created here are
//! visible to `eval`, and names bound by `eval` are addressable here.

use std::sync::Arc;

use indexmap::IndexMap;
use relay_engine::{CallArgs, Class, Env, Instance, Interpreter, Value};

use crate::component::ComponentLoader;
use crate::error::{BridgeError, BridgeResult};

/// A registered instance and the class that produced it.
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    pub id: String,
    pub instance: Arc<Instance>,
}

impl ObjectHandle {
    pub fn class(&self) -> &Arc<Class> {
        &self.instance.class
    }
}

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    scope: Env,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The identifier space as a scope.
    pub fn scope(&self) -> &Env {
        &self.scope
    }

    pub fn clear(&self) {
        self.scope.clear();
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.scope.get_local(id)
    }

    /// The handle for `id` when it holds an instance.
    pub fn handle(&self, id: &str) -> Option<ObjectHandle> {
        match self.scope.get_local(id)? {
            Value::Instance(instance) => Some(ObjectHandle {
                id: id.to_string(),
                instance,
            }),
            _ => None,
        }
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.scope.local_names()
    }

    /// Construct `class_name` normally and register it as `id`, replacing
    /// any previous binding.
    pub fn create(
        &self,
        interp: &mut Interpreter,
        loader: &ComponentLoader,
        class_name: &str,
        id: &str,
        args: CallArgs,
    ) -> BridgeResult<()> {
        let class = loader.class(class_name)?;
        let object = interp
            .construct(&class, args)
            .map_err(|e| BridgeError::Constructor {
                class: class_name.to_string(),
                message: e.to_string(),
            })?;
        self.scope.set_local(id, object);
        tracing::debug!(id, class = class_name, "registered object");
        Ok(())
    }

    /// Allocate `class_name` without field initializers or constructor, set
    /// `attrs` as its fields and register it as `id`.
    pub fn create_raw(
        &self,
        interp: &mut Interpreter,
        loader: &ComponentLoader,
        class_name: &str,
        id: &str,
        attrs: IndexMap<String, Value>,
    ) -> BridgeResult<()> {
        let class = loader.class(class_name)?;
        let instance = interp.allocate(&class);
        for (name, value) in attrs {
            instance.set_field(&name, value);
        }
        self.scope.set_local(id, Value::Instance(instance));
        tracing::debug!(id, class = class_name, "registered object without initialization");
        Ok(())
    }

    pub fn has_attribute(&self, interp: &Interpreter, id: &str, attr: &str) -> BridgeResult<bool> {
        let object = self.lookup(id)?;
        Ok(interp.has_attr(&object, attr))
    }

    /// Call instance method `method` on the object registered as `id`.
    ///
    /// Only methods declared on the object's class chain qualify; static
    /// methods and function-valued fields do not.
    pub fn invoke_method(
        &self,
        interp: &mut Interpreter,
        id: &str,
        method: &str,
        args: CallArgs,
    ) -> BridgeResult<Value> {
        let object = self.lookup(id)?;
        let found = match &object {
            Value::Instance(instance) => instance.class.find_method(method),
            _ => None,
        };
        let Some(function) = found else {
            return Err(BridgeError::MethodNotFound {
                id: id.to_string(),
                method: method.to_string(),
            });
        };

        interp
            .call_function(&function, Some(object), args)
            .map_err(|e| BridgeError::invocation(&format!("{}.{}", id, method), e))
    }

    fn lookup(&self, id: &str) -> BridgeResult<Value> {
        self.scope
            .get_local(id)
            .ok_or_else(|| BridgeError::ObjectNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ComponentResolver;
    use std::fs;

    const SHAPES: &str = r#"
        class Shape {
            kind = "shape";
            static count = 0;
            describe() { return this.kind; }
            static make() { return Shape(); }
        }
        class Box extends Shape {
            constructor(side) {
                if (side < 0) { throw "negative side"; }
                this.side = side;
                this.callback = function () { return 1; };
            }
            area() { return this.side * this.side; }
        }
    "#;

    fn setup() -> (tempfile::TempDir, Interpreter, ComponentLoader) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shapes.rly"), SHAPES).unwrap();
        let mut loader = ComponentLoader::new(ComponentResolver::new(vec![dir.path().to_path_buf()]));
        let mut interp = Interpreter::new();
        loader.load(&mut interp, "shapes").unwrap();
        (dir, interp, loader)
    }

    #[test]
    fn test_create_and_invoke() {
        let (_dir, mut interp, loader) = setup();
        let registry = ObjectRegistry::new();
        registry
            .create(&mut interp, &loader, "Box", "b", CallArgs::positional(vec![Value::Int(3)]))
            .unwrap();

        let area = registry.invoke_method(&mut interp, "b", "area", CallArgs::new()).unwrap();
        assert_eq!(area, Value::Int(9));
        let inherited = registry.invoke_method(&mut interp, "b", "describe", CallArgs::new()).unwrap();
        assert_eq!(inherited, Value::str("shape"));
        assert_eq!(registry.handle("b").unwrap().class().name, "Box");
    }

    #[test]
    fn test_only_instance_methods_are_invocable() {
        let (_dir, mut interp, loader) = setup();
        let registry = ObjectRegistry::new();
        registry
            .create(&mut interp, &loader, "Box", "b", CallArgs::positional(vec![Value::Int(1)]))
            .unwrap();

        for name in ["make", "callback", "side", "missing"] {
            let err = registry.invoke_method(&mut interp, "b", name, CallArgs::new()).unwrap_err();
            assert_eq!(err.kind(), "MethodNotFound", "{}", name);
        }
        assert!(registry.has_attribute(&interp, "b", "callback").unwrap());
        assert!(registry.has_attribute(&interp, "b", "make").unwrap());
        assert!(!registry.has_attribute(&interp, "b", "missing").unwrap());
    }

    #[test]
    fn test_failures_are_classified() {
        let (_dir, mut interp, loader) = setup();
        let registry = ObjectRegistry::new();

        let err = registry
            .create(&mut interp, &loader, "Circle", "c", CallArgs::new())
            .unwrap_err();
        assert_eq!(err.kind(), "ClassNotFound");

        let err = registry
            .create(&mut interp, &loader, "Box", "b", CallArgs::positional(vec![Value::Int(-1)]))
            .unwrap_err();
        assert_eq!(err.kind(), "ConstructorError");
        assert_eq!(err.to_string(), "negative side");
        assert!(registry.get("b").is_none());

        let err = registry.has_attribute(&interp, "nobody", "x").unwrap_err();
        assert_eq!(err.kind(), "ObjectNotFound");
    }

    #[test]
    fn test_raw_creation_and_replacement() {
        let (_dir, mut interp, loader) = setup();
        let registry = ObjectRegistry::new();

        let attrs = IndexMap::from([("side".to_string(), Value::Int(4))]);
        registry.create_raw(&mut interp, &loader, "Box", "b", attrs).unwrap();
        assert!(!registry.has_attribute(&interp, "b", "kind").unwrap());
        assert_eq!(
            registry.invoke_method(&mut interp, "b", "area", CallArgs::new()).unwrap(),
            Value::Int(16)
        );

        registry
            .create(&mut interp, &loader, "Shape", "b", CallArgs::new())
            .unwrap();
        assert_eq!(registry.handle("b").unwrap().class().name, "Shape");
        assert_eq!(registry.ids(), vec!["b".to_string()]);

        registry.clear();
        assert!(registry.ids().is_empty());
    }
}
