//! Integration tests for `import` through a module source

use std::collections::HashMap;
use std::sync::Arc;

use relay_engine::{
    EngineError, ImportContext, Interpreter, ModuleSource, SourceFile, Value, VmError,
};

/// In-memory module source.
struct Sources(HashMap<&'static str, &'static str>);

impl ModuleSource for Sources {
    fn resolve(&self, name: &str) -> Result<SourceFile, VmError> {
        self.0
            .get(name)
            .map(|text| SourceFile::new(name, format!("mem://{}", name), *text))
            .ok_or_else(|| VmError::Import(format!("no component named '{}'", name)))
    }
}

fn interpreter(modules: &[(&'static str, &'static str)]) -> Interpreter {
    let mut interp = Interpreter::new();
    let source = Sources(modules.iter().copied().collect());
    interp.set_imports(Some(ImportContext::new(Arc::new(source))));
    interp
}

#[test]
fn test_import_binds_module_under_last_segment_or_alias() {
    let mut interp = interpreter(&[
        ("geometry.shapes", "function area(w, h) { return w * h; } let UNIT = 1;"),
        ("util", "function twice(x) { return x * 2; }"),
    ]);
    let module = interp
        .load_module(&SourceFile::inline(
            "main",
            r#"
            import geometry.shapes;
            import util as u;
            let a = shapes.area(2, 3);
            let b = u.twice(shapes.UNIT);
            "#,
        ))
        .unwrap();

    assert_eq!(module.namespace.get("a"), Some(Value::Int(6)));
    assert_eq!(module.namespace.get("b"), Some(Value::Int(2)));
    assert!(matches!(module.namespace.get("shapes"), Some(Value::Module(_))));
    assert_eq!(
        interp.imports().map(|ctx| ctx.loaded()),
        Some(vec!["geometry.shapes".to_string(), "util".to_string()])
    );
}

#[test]
fn test_modules_are_loaded_once_per_context() {
    let mut interp = interpreter(&[
        ("state", "let loads = 0; loads += 1;"),
        ("a", "import state; let seen = state.loads;"),
    ]);
    let module = interp
        .load_module(&SourceFile::inline(
            "main",
            "import a; import state; state.loads += 10; let total = state.loads;",
        ))
        .unwrap();
    assert_eq!(module.namespace.get("total"), Some(Value::Int(11)));
}

#[test]
fn test_import_cycle_is_an_error() {
    let mut interp = interpreter(&[("a", "import b;"), ("b", "import a;")]);
    let err = interp
        .load_module(&SourceFile::inline("main", "import a;"))
        .unwrap_err();
    match err {
        EngineError::Runtime(VmError::Import(message)) => {
            assert!(message.contains("import cycle: a -> b -> a"), "{}", message)
        }
        other => panic!("expected import error, got {}", other),
    }
}

#[test]
fn test_missing_and_broken_imports() {
    let mut interp = interpreter(&[("broken", "let = 1;")]);
    let err = interp
        .load_module(&SourceFile::inline("main", "import nowhere;"))
        .unwrap_err();
    assert!(err.to_string().contains("no component named 'nowhere'"));

    let err = interp
        .load_module(&SourceFile::inline("main", "import broken;"))
        .unwrap_err();
    assert!(err.to_string().contains("failed to load 'broken'"));
}

#[test]
fn test_import_without_source_fails() {
    let err = Interpreter::new()
        .load_module(&SourceFile::inline("main", "import anything;"))
        .unwrap_err();
    assert!(matches!(err, EngineError::Runtime(VmError::Import(_))));
}
