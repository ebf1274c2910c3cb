//! Session-level tests: component introspection and script output

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use relay_engine::{CallArgs, Value};
use relay_runtime::{BridgeError, ComponentResolver, Session};

fn session() -> Session {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    Session::new(ComponentResolver::new(vec![fixtures]))
}

#[test]
fn test_component_description() {
    let mut session = session();
    assert!(session.component().is_none());
    session.open_component("counter").unwrap();

    let component = session.component().unwrap();
    assert_eq!(component.name(), "counter");
    assert!(component.origin().ends_with("counter.rly"));
    assert_eq!(
        component.classes().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        ["Counter", "LimitedCounter"]
    );
    assert_eq!(
        component.functions().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        ["add", "fail", "ratio"]
    );
    assert_eq!(component.variables(), ["instances", "LABEL"]);
}

#[test]
fn test_objects_and_eval_share_one_scope() {
    let mut session = session();
    session.open_component("counter").unwrap();
    session
        .new_object("Counter", "c1", CallArgs::positional(vec![Value::Int(5)]))
        .unwrap();

    session.eval("alias = c1; alias.increment()").unwrap();
    assert_eq!(
        session.call_method("c1", "increment", CallArgs::new()).unwrap(),
        Value::Int(7)
    );
    assert_eq!(session.registry().ids(), ["alias", "c1"]);
    assert!(session.has_attribute("alias", "reset").unwrap());

    session.eval("n = [1, 2]").unwrap();
    assert!(session.has_attribute("n", "length").unwrap());
    assert!(matches!(
        session.call_method("n", "push", CallArgs::new()),
        Err(BridgeError::MethodNotFound { .. })
    ));
}

#[test]
fn test_print_output_is_redirected() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let mut session = session();
    session.set_output(Box::new(move |line| sink.lock().push(line.to_string())));

    session.eval(r#"print("hello", 42)"#).unwrap();
    assert_eq!(lines.lock().as_slice(), ["hello 42"]);
}

#[test]
fn test_functions_defined_by_eval_survive_until_reload() {
    let mut session = session();
    session.open_component("counter").unwrap();
    session
        .eval("function triple(n) { return add(n, add(n, n)); }")
        .unwrap();
    assert_eq!(session.eval("triple(4)").unwrap(), Value::Int(12));
    assert!(!session.has_function("triple"));

    session.open_component("counter").unwrap();
    assert!(matches!(session.eval("triple(4)"), Err(BridgeError::Eval(_))));
}
