//! Component loading and member classification.

use std::sync::Arc;

use indexmap::IndexMap;
use relay_engine::{
    CallArgs, Class, Function, ImportContext, Interpreter, Module, Namespace, Value,
};

use crate::error::{BridgeError, BridgeResult};
use crate::resolve::ComponentResolver;

/// How a top-level binding of a component is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Class,
    Function,
    Variable,
}

impl MemberKind {
    /// Classify a top-level binding. Prelude builtins, bound methods and
    /// imported modules are not members.
    pub fn of(value: &Value) -> Option<MemberKind> {
        match value {
            Value::Builtin(_) | Value::BoundMethod(_) | Value::Module(_) => None,
            Value::Class(_) => Some(MemberKind::Class),
            Value::Function(_) => Some(MemberKind::Function),
            _ => Some(MemberKind::Variable),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub name: String,
    pub class: Arc<Class>,
}

#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub function: Arc<Function>,
}

impl FunctionDescriptor {
    pub fn params(&self) -> Vec<&str> {
        self.function.param_names()
    }
}

/// A loaded component.
///
/// Classes and functions are classified once at load. Variables are not
/// snapshotted; they are read from the namespace on demand.
#[derive(Debug)]
pub struct Component {
    name: String,
    module: Arc<Module>,
    classes: IndexMap<String, ClassDescriptor>,
    functions: IndexMap<String, FunctionDescriptor>,
}

impl Component {
    fn classify(name: &str, module: Arc<Module>) -> Self {
        let mut classes = IndexMap::new();
        let mut functions = IndexMap::new();

        for (member, value) in module.namespace.entries() {
            match value {
                Value::Class(class) => {
                    classes.insert(member.clone(), ClassDescriptor { name: member, class });
                }
                Value::Function(function) => {
                    functions.insert(member.clone(), FunctionDescriptor { name: member, function });
                }
                _ => {}
            }
        }

        Self {
            name: name.to_string(),
            module,
            classes,
            functions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the component was loaded from.
    pub fn origin(&self) -> &str {
        &self.module.origin
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.module.namespace
    }

    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    /// Current value of a variable member.
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.module
            .namespace
            .get(name)
            .filter(|value| MemberKind::of(value) == Some(MemberKind::Variable))
    }

    /// Names of the variable members, in definition order.
    pub fn variables(&self) -> Vec<String> {
        self.module
            .namespace
            .entries()
            .into_iter()
            .filter(|(_, value)| MemberKind::of(value) == Some(MemberKind::Variable))
            .map(|(name, _)| name)
            .collect()
    }
}

/// Loads components and answers queries about the current one.
#[derive(Debug)]
pub struct ComponentLoader {
    resolver: Arc<ComponentResolver>,
    current: Option<Component>,
}

impl ComponentLoader {
    pub fn new(resolver: ComponentResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            current: None,
        }
    }

    pub fn resolver(&self) -> &ComponentResolver {
        &self.resolver
    }

    pub fn current(&self) -> Option<&Component> {
        self.current.as_ref()
    }

    /// Drop the current component.
    pub fn unload(&mut self) {
        if let Some(component) = self.current.take() {
            tracing::debug!(component = component.name(), "unloaded component");
        }
    }

    /// Load `name`, replacing the current component.
    ///
    /// The previous component is dropped before resolution starts, so a
    /// failed load leaves nothing loaded.
    pub fn load(&mut self, interp: &mut Interpreter, name: &str) -> BridgeResult<&Component> {
        self.unload();

        let source = self.resolver.load_source(name)?;
        interp.set_imports(Some(ImportContext::new(self.resolver.clone())));
        let loaded = interp.load_module(&source);
        interp.set_imports(None);
        let module = loaded.map_err(|e| BridgeError::load(name, e))?;

        let component = Component::classify(name, module);
        tracing::info!(
            component = name,
            origin = component.origin(),
            classes = component.classes.len(),
            functions = component.functions.len(),
            "loaded component"
        );
        Ok(self.current.insert(component))
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.current.as_ref().is_some_and(|c| c.class(name).is_some())
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.current.as_ref().is_some_and(|c| c.function(name).is_some())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.current.as_ref().is_some_and(|c| c.variable(name).is_some())
    }

    pub fn class(&self, name: &str) -> BridgeResult<Arc<Class>> {
        self.current
            .as_ref()
            .and_then(|c| c.class(name))
            .map(|descriptor| descriptor.class.clone())
            .ok_or_else(|| BridgeError::ClassNotFound(name.to_string()))
    }

    pub fn read_variable(&self, name: &str) -> BridgeResult<Value> {
        self.current
            .as_ref()
            .and_then(|c| c.variable(name))
            .ok_or_else(|| BridgeError::VariableNotFound(name.to_string()))
    }

    /// Call a free function of the current component.
    pub fn invoke_function(
        &self,
        interp: &mut Interpreter,
        name: &str,
        args: CallArgs,
    ) -> BridgeResult<Value> {
        let function = self
            .current
            .as_ref()
            .and_then(|c| c.function(name))
            .map(|descriptor| descriptor.function.clone())
            .ok_or_else(|| BridgeError::FunctionNotFound(name.to_string()))?;

        interp
            .call_function(&function, None, args)
            .map_err(|e| BridgeError::invocation(name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn loader_with(files: &[(&str, &str)]) -> (tempfile::TempDir, ComponentLoader) {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            fs::write(dir.path().join(format!("{}.rly", name)), text).unwrap();
        }
        let loader = ComponentLoader::new(ComponentResolver::new(vec![dir.path().to_path_buf()]));
        (dir, loader)
    }

    #[test]
    fn test_classification() {
        let (_dir, mut loader) = loader_with(&[
            ("helper", "let SHARED = 1;"),
            (
                "calc",
                r#"
                import helper;
                class Acc {}
                function add(a, b) { return a + b; }
                let total = 0;
                let handler = add;
                let printer = print;
                let upper = "x".upper;
                "#,
            ),
        ]);
        let mut interp = Interpreter::new();
        let component = loader.load(&mut interp, "calc").unwrap();
        assert_eq!(component.variables(), vec!["total".to_string()]);
        assert_eq!(
            component.functions().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            ["add", "handler"]
        );
        assert_eq!(component.function("add").unwrap().params(), ["a", "b"]);

        assert!(loader.has_class("Acc"));
        assert!(loader.has_function("add"));
        assert!(loader.has_variable("total"));
        assert!(!loader.has_variable("helper"));
        assert!(!loader.has_variable("printer"));
        assert!(!loader.has_variable("upper"));
        assert!(!loader.has_class("add"));
    }

    #[test]
    fn test_queries_without_component() {
        let (_dir, loader) = loader_with(&[]);
        assert!(!loader.has_class("A"));
        assert!(!loader.has_function("f"));
        assert!(!loader.has_variable("x"));
        assert!(matches!(loader.read_variable("x"), Err(BridgeError::VariableNotFound(_))));
        assert!(matches!(loader.class("A"), Err(BridgeError::ClassNotFound(_))));
    }

    #[test]
    fn test_failed_load_leaves_nothing_loaded() {
        let (_dir, mut loader) = loader_with(&[
            ("good", "let x = 1;"),
            ("bad", "throw \"top level failure\";"),
        ]);
        let mut interp = Interpreter::new();
        loader.load(&mut interp, "good").unwrap();
        assert!(loader.has_variable("x"));

        let err = loader.load(&mut interp, "bad").unwrap_err();
        assert_eq!(err.kind(), "ComponentLoadError");
        assert!(err.to_string().contains("top level failure"));
        assert!(loader.current().is_none());

        let err = loader.load(&mut interp, "absent").unwrap_err();
        assert_eq!(err.kind(), "ComponentLoadError");
    }

    #[test]
    fn test_variables_are_read_live() {
        let (_dir, mut loader) = loader_with(&[(
            "state",
            "let hits = 0; function hit() { hits += 1; return hits; }",
        )]);
        let mut interp = Interpreter::new();
        loader.load(&mut interp, "state").unwrap();

        loader.invoke_function(&mut interp, "hit", CallArgs::new()).unwrap();
        loader.invoke_function(&mut interp, "hit", CallArgs::new()).unwrap();
        assert_eq!(loader.read_variable("hits").unwrap(), Value::Int(2));
    }
}
