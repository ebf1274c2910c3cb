//! Integration tests for the interpreter
//!
//! Each test loads a small module and checks the values its top level and
//! functions produce.

use std::sync::Arc;

use parking_lot::Mutex;
use relay_engine::{
    CallArgs, EngineError, Env, Interpreter, Module, SourceFile, Value, VmError, MAX_CALL_DEPTH,
    SCRIPT_STACK_SIZE,
};

fn load(source: &str) -> (Interpreter, Arc<Module>) {
    let mut interp = Interpreter::new();
    let module = interp
        .load_module(&SourceFile::inline("test", source))
        .unwrap_or_else(|e| panic!("load failed: {}", e));
    (interp, module)
}

fn global(module: &Module, name: &str) -> Value {
    module
        .namespace
        .get(name)
        .unwrap_or_else(|| panic!("'{}' not bound", name))
}

fn call(interp: &mut Interpreter, module: &Module, name: &str, args: Vec<Value>) -> Result<Value, VmError> {
    let callee = global(module, name);
    interp.call(&callee, CallArgs::positional(args))
}

#[test]
fn test_arithmetic_and_precedence() {
    let (_, module) = load("let a = 1 + 2 * 3 ** 2; let b = (1 + 2) * 3; let c = 7 % 3; let d = -2 ** 2;");
    assert_eq!(global(&module, "a"), Value::Int(19));
    assert_eq!(global(&module, "b"), Value::Int(9));
    assert_eq!(global(&module, "c"), Value::Int(1));
    assert_eq!(global(&module, "d"), Value::Int(-4));
}

#[test]
fn test_functions_with_defaults_and_named_arguments() {
    let (mut interp, module) = load(
        r#"
        function scale(value, factor = 2, offset = 0) {
            return value * factor + offset;
        }
        let a = scale(3);
        let b = scale(3, offset: 1);
        let c = scale(value: 1, factor: 10);
        "#,
    );
    assert_eq!(global(&module, "a"), Value::Int(6));
    assert_eq!(global(&module, "b"), Value::Int(7));
    assert_eq!(global(&module, "c"), Value::Int(10));

    let err = call(&mut interp, &module, "scale", vec![]).unwrap_err();
    assert!(err.to_string().contains("missing required argument 'value'"));

    let scale = global(&module, "scale");
    let err = interp
        .call(&scale, CallArgs::positional(vec![Value::Int(1)]).with_named("value", Value::Int(2)))
        .unwrap_err();
    assert!(err.to_string().contains("multiple values for argument 'value'"));

    let err = interp
        .call(&scale, CallArgs::positional(vec![Value::Int(1)]).with_named("bogus", Value::Int(2)))
        .unwrap_err();
    assert!(matches!(err, VmError::ArgumentError(_)));
}

#[test]
fn test_classes_fields_and_methods() {
    let (mut interp, module) = load(
        r#"
        class Counter {
            value = 0;
            static instances = 0;

            constructor(start = 0) {
                this.value = start;
                Counter.instances += 1;
            }

            increment(step = 1) {
                this.value += step;
                return this.value;
            }
        }
        let c = Counter(5);
        c.increment();
        let d = new Counter();
        "#,
    );
    let c = global(&module, "c");
    assert_eq!(interp.get_attr(&c, "value").unwrap(), Value::Int(6));

    let counter = global(&module, "Counter");
    assert_eq!(interp.get_attr(&counter, "instances").unwrap(), Value::Int(2));

    let increment = interp.get_attr(&c, "increment").unwrap();
    let result = interp
        .call(&increment, CallArgs::new().with_named("step", Value::Int(10)))
        .unwrap();
    assert_eq!(result, Value::Int(16));
    assert_eq!(c.type_name(), "Counter");
}

#[test]
fn test_inheritance_and_super() {
    let (_, module) = load(
        r#"
        class Shape {
            constructor(name) { this.name = name; }
            describe() { return "shape " + this.name; }
            area() { return 0; }
        }
        class Square extends Shape {
            constructor(side) {
                super("square");
                this.side = side;
            }
            area() { return this.side * this.side; }
            describe() { return super.describe() + " of area " + this.area(); }
        }
        class Unit extends Square {}

        let text = Square(3).describe();
        let unit = Unit(1);
        let inherited = unit.area();
        let is_shape = isinstance(unit, Shape);
        "#,
    );
    assert_eq!(global(&module, "text"), Value::str("shape square of area 9"));
    assert_eq!(global(&module, "inherited"), Value::Int(1));
    assert_eq!(global(&module, "is_shape"), Value::Bool(true));
}

#[test]
fn test_class_without_constructor_rejects_arguments() {
    let (mut interp, module) = load("class Empty {}");
    let err = call(&mut interp, &module, "Empty", vec![Value::Int(1)]).unwrap_err();
    assert!(matches!(err, VmError::ArgumentError(_)));
    assert!(call(&mut interp, &module, "Empty", vec![]).is_ok());
}

#[test]
fn test_closures_capture_by_reference() {
    let (mut interp, module) = load(
        r#"
        function counter() {
            let count = 0;
            return function () {
                count += 1;
                return count;
            };
        }
        let next = counter();
        next();
        "#,
    );
    let next = global(&module, "next");
    assert_eq!(interp.call(&next, CallArgs::new()).unwrap(), Value::Int(2));
}

#[test]
fn test_control_flow() {
    let (_, module) = load(
        r#"
        let total = 0;
        for (n of range(10)) {
            if (n % 2 == 0) { continue; }
            if (n > 7) { break; }
            total += n;
        }
        let i = 0;
        while (true) {
            i += 1;
            if (i >= 3) break;
        }
        let label = total > 10 ? "big" : "small";
        let fallback = null ?? "default";
        "#,
    );
    assert_eq!(global(&module, "total"), Value::Int(16));
    assert_eq!(global(&module, "i"), Value::Int(3));
    assert_eq!(global(&module, "label"), Value::str("big"));
    assert_eq!(global(&module, "fallback"), Value::str("default"));
}

#[test]
fn test_try_catch_handles_thrown_and_runtime_errors() {
    let (_, module) = load(
        r#"
        let caught = null;
        try { throw "boom"; } catch (e) { caught = e; }

        let runtime = null;
        try { let x = [1][5]; } catch (e) { runtime = e; }
        "#,
    );
    assert_eq!(global(&module, "caught"), Value::str("boom"));
    let runtime = global(&module, "runtime");
    assert!(runtime.to_string().contains("out of range"));
}

#[test]
fn test_uncaught_throw_surfaces_value() {
    let (mut interp, module) = load(r#"function fail(msg) { throw "failed: " + msg; }"#);
    let err = call(&mut interp, &module, "fail", vec![Value::str("x")]).unwrap_err();
    assert_eq!(err.to_string(), "failed: x");
}

#[test]
fn test_constants_and_undefined_names() {
    let err = Interpreter::new()
        .load_module(&SourceFile::inline("m", "const LIMIT = 3; LIMIT = 4;"))
        .unwrap_err();
    assert!(matches!(err, EngineError::Runtime(VmError::ConstAssignment(_))));

    let (mut interp, module) = load("function set() { undeclared = 1; }");
    let err = call(&mut interp, &module, "set", vec![]).unwrap_err();
    assert!(matches!(err, VmError::UndefinedVariable(name) if name == "undeclared"));
}

#[test]
fn test_functions_update_module_bindings() {
    let (mut interp, module) = load("let hits = 0; function hit() { hits += 1; return hits; }");
    call(&mut interp, &module, "hit", vec![]).unwrap();
    call(&mut interp, &module, "hit", vec![]).unwrap();
    assert_eq!(global(&module, "hits"), Value::Int(2));
}

/// Run a test body on a thread sized for the deepest script call.
fn on_script_stack(body: impl FnOnce() + Send + 'static) {
    std::thread::Builder::new()
        .stack_size(SCRIPT_STACK_SIZE)
        .spawn(body)
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn test_recursion_limit_is_an_error() {
    on_script_stack(|| {
        let (mut interp, module) = load("function down(n) { return down(n + 1); }");
        let err = call(&mut interp, &module, "down", vec![Value::Int(0)]).unwrap_err();
        assert!(matches!(err, VmError::StackOverflow(MAX_CALL_DEPTH)));
        assert_eq!(interp.depth(), 0);

        let (mut interp, module) = load("function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }");
        assert_eq!(
            call(&mut interp, &module, "fact", vec![Value::Int(20)]).unwrap(),
            Value::Int(2_432_902_008_176_640_000)
        );
    });
}

#[test]
fn test_deep_recursion_within_limit() {
    on_script_stack(|| {
        let (mut interp, module) =
            load("function sum_to(n) { if (n == 0) { return 0; } return n + sum_to(n - 1); }");
        assert_eq!(
            call(&mut interp, &module, "sum_to", vec![Value::Int(900)]).unwrap(),
            Value::Int(405_450)
        );
        assert_eq!(interp.depth(), 0);
    });
}

#[test]
fn test_containers_are_shared() {
    let (_, module) = load(
        r#"
        let a = [1, 2];
        let b = a;
        b.push(3);
        let d = {name: "x", "count": 1};
        d.count += 1;
        d["extra"] = true;
        let n = len(a);
        let joined = a.join("-");
        "#,
    );
    assert_eq!(global(&module, "n"), Value::Int(3));
    assert_eq!(global(&module, "joined"), Value::str("1-2-3"));
    assert_eq!(
        global(&module, "d").to_string(),
        r#"{"name": "x", "count": 2, "extra": true}"#
    );
}

#[test]
fn test_print_goes_to_output_sink() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let mut interp = Interpreter::new();
    interp.set_output(Box::new(move |line| sink.lock().push(line.to_string())));
    interp
        .load_module(&SourceFile::inline("m", r#"print("a", 1, [2.0]);"#))
        .unwrap();
    assert_eq!(lines.lock().as_slice(), ["a 1 [2.0]"]);
}

#[test]
fn test_eval_in_binds_into_locals() {
    let (mut interp, module) = load("let base = 10; function add(a, b) { return a + b; }");
    let locals = Env::new();

    let value = interp.eval_in("x = add(base, 1)", &module.namespace, &locals).unwrap();
    assert_eq!(value, Value::Int(11));
    assert_eq!(locals.get_local("x"), Some(Value::Int(11)));

    // Assignments never touch the module namespace
    interp.eval_in("base = 0", &module.namespace, &locals).unwrap();
    assert_eq!(global(&module, "base"), Value::Int(10));
    assert_eq!(interp.eval_in("base", &module.namespace, &locals).unwrap(), Value::Int(0));

    // Declarations bind in locals too, and the last expression is the result
    let value = interp
        .eval_in("function double(n) { return n * 2; } let y = double(x); y", &module.namespace, &locals)
        .unwrap();
    assert_eq!(value, Value::Int(22));
    assert!(locals.get_local("double").is_some());

    // Non-expression final statement yields null
    assert_eq!(interp.eval_in("let z = 1;", &module.namespace, &locals).unwrap(), Value::Null);

    // Functions defined in eval can update locals
    interp
        .eval_in("function bump() { x += 1; } bump()", &module.namespace, &locals)
        .unwrap();
    assert_eq!(locals.get_local("x"), Some(Value::Int(12)));
}

#[test]
fn test_eval_errors() {
    let (mut interp, module) = load("");
    let locals = Env::new();
    assert!(matches!(
        interp.eval_in("missing + 1", &module.namespace, &locals),
        Err(EngineError::Runtime(VmError::UndefinedVariable(_)))
    ));
    assert!(matches!(
        interp.eval_in("1 +", &module.namespace, &locals),
        Err(EngineError::Parse(_))
    ));
    assert!(matches!(
        interp.eval_in("break", &module.namespace, &locals),
        Err(EngineError::Runtime(VmError::InvalidControlFlow(..)))
    ));
}

#[test]
fn test_raw_allocation_skips_initialization() {
    let (mut interp, module) = load(
        r#"
        class Stamp {
            created_at = now();
            constructor(value) { this.value = value; }
        }
        "#,
    );
    let Value::Class(class) = global(&module, "Stamp") else {
        panic!("expected class");
    };
    let raw = Value::Instance(interp.allocate(&class));
    assert!(!interp.has_attr(&raw, "created_at"));
    assert!(!interp.has_attr(&raw, "value"));

    interp.set_attr(&raw, "value", Value::Int(5)).unwrap();
    assert!(interp.has_attr(&raw, "value"));

    let built = interp
        .construct(&class, CallArgs::positional(vec![Value::Int(1)]))
        .unwrap();
    assert!(interp.has_attr(&built, "created_at"));
    assert!(interp.has_attr(&built, "value"));
}
