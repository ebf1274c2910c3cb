//! Request dispatch.
//!
//! The dispatcher is the single entry point for every bridge operation. It
//! decodes parameters, runs the operation against the [`Session`] and turns
//! the outcome, including panics, into an [`Envelope`].

use std::panic::{self, AssertUnwindSafe};

use indexmap::IndexMap;
use relay_engine::{CallArgs, Value};
use serde_json::Value as Json;

use crate::convert::from_json;
use crate::envelope::Envelope;
use crate::error::{BridgeError, BridgeResult};
use crate::session::Session;

/// Bridge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Hello,
    ComponentOpen,
    HasClass,
    HasFunction,
    HasVariable,
    VariableEval,
    FunctionEval,
    ObjectNew,
    ObjectNewWithoutInit,
    ObjectHasAttribute,
    MethodEval,
    Eval,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::Hello,
        Operation::ComponentOpen,
        Operation::HasClass,
        Operation::HasFunction,
        Operation::HasVariable,
        Operation::VariableEval,
        Operation::FunctionEval,
        Operation::ObjectNew,
        Operation::ObjectNewWithoutInit,
        Operation::ObjectHasAttribute,
        Operation::MethodEval,
        Operation::Eval,
    ];

    /// Canonical method name.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Hello => "hello",
            Operation::ComponentOpen => "component.open",
            Operation::HasClass => "component.hasClass",
            Operation::HasFunction => "component.hasFunction",
            Operation::HasVariable => "component.hasVariable",
            Operation::VariableEval => "variable.eval",
            Operation::FunctionEval => "function.eval",
            Operation::ObjectNew => "object.new",
            Operation::ObjectNewWithoutInit => "object.newWithoutInit",
            Operation::ObjectHasAttribute => "object.hasAttribute",
            Operation::MethodEval => "method.eval",
            Operation::Eval => "eval",
        }
    }

    /// Parameter names in positional order. Optional ones are marked with
    /// a trailing `?`.
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Operation::Hello => &[],
            Operation::ComponentOpen
            | Operation::HasClass
            | Operation::HasFunction
            | Operation::HasVariable
            | Operation::VariableEval => &["name"],
            Operation::FunctionEval => &["name", "args?", "kwargs?"],
            Operation::ObjectNew => &["className", "id", "args?", "kwargs?"],
            Operation::ObjectNewWithoutInit => &["className", "id", "attrs?"],
            Operation::ObjectHasAttribute => &["id", "attrName"],
            Operation::MethodEval => &["id", "methodName", "args?", "kwargs?"],
            Operation::Eval => &["code"],
        }
    }

    /// Look up a method name. `module.` is accepted for `component.`, and
    /// `_` for the `.` delimiter.
    pub fn parse(method: &str) -> Option<Operation> {
        let normalized = method.replace('_', ".");
        let normalized = match normalized.strip_prefix("module.") {
            Some(rest) => format!("component.{}", rest),
            None => normalized,
        };
        Operation::ALL.into_iter().find(|op| op.name() == normalized)
    }
}

/// Parameters of one request, bound to the operation's parameter names.
struct Params {
    operation: Operation,
    values: Vec<Option<Json>>,
}

impl Params {
    fn bind(operation: Operation, raw: &Json) -> BridgeResult<Self> {
        let names = operation.params();
        let mut values: Vec<Option<Json>> = vec![None; names.len()];

        match raw {
            Json::Null => {}
            Json::Array(items) => {
                if items.len() > names.len() {
                    return Err(BridgeError::Argument(format!(
                        "{} takes at most {} parameters but {} were given",
                        operation.name(),
                        names.len(),
                        items.len()
                    )));
                }
                for (slot, item) in values.iter_mut().zip(items) {
                    *slot = Some(item.clone());
                }
            }
            Json::Object(entries) => {
                for (key, value) in entries {
                    let index = names
                        .iter()
                        .position(|name| name.trim_end_matches('?') == key)
                        .ok_or_else(|| {
                            BridgeError::Argument(format!(
                                "{} got an unexpected parameter '{}'",
                                operation.name(),
                                key
                            ))
                        })?;
                    values[index] = Some(value.clone());
                }
            }
            other => {
                return Err(BridgeError::Argument(format!(
                    "params must be an array or an object, not {}",
                    json_kind(other)
                )))
            }
        }

        for (name, value) in names.iter().zip(&values) {
            if !name.ends_with('?') && value.is_none() {
                return Err(BridgeError::Argument(format!(
                    "{} missing required parameter '{}'",
                    operation.name(),
                    name
                )));
            }
        }

        Ok(Self { operation, values })
    }

    /// The value bound to `name`; `null` counts as absent.
    fn get(&self, name: &str) -> Option<&Json> {
        let index = self
            .operation
            .params()
            .iter()
            .position(|p| p.trim_end_matches('?') == name)?;
        self.values[index].as_ref().filter(|v| !v.is_null())
    }

    fn string(&self, name: &str) -> BridgeResult<&str> {
        match self.get(name) {
            Some(Json::String(s)) => Ok(s),
            Some(other) => Err(self.mistyped(name, "a string", other)),
            None => Err(BridgeError::Argument(format!(
                "{} missing required parameter '{}'",
                self.operation.name(),
                name
            ))),
        }
    }

    /// Positional `args` plus keyword `kwargs`.
    fn call_args(&self) -> BridgeResult<CallArgs> {
        let positional = match self.get("args") {
            None => Vec::new(),
            Some(Json::Array(items)) => items.iter().map(from_json).collect(),
            Some(other) => return Err(self.mistyped("args", "an array", other)),
        };
        let mut args = CallArgs::positional(positional);
        for (key, value) in self.object("kwargs")? {
            args = args.with_named(key, value);
        }
        Ok(args)
    }

    fn object(&self, name: &str) -> BridgeResult<IndexMap<String, Value>> {
        match self.get(name) {
            None => Ok(IndexMap::new()),
            Some(Json::Object(entries)) => Ok(entries
                .iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect()),
            Some(other) => Err(self.mistyped(name, "an object", other)),
        }
    }

    fn mistyped(&self, name: &str, expected: &str, found: &Json) -> BridgeError {
        BridgeError::Argument(format!(
            "{} parameter '{}' must be {}, not {}",
            self.operation.name(),
            name,
            expected,
            json_kind(found)
        ))
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

/// Runs operations against a session and reports every outcome as an
/// envelope.
#[derive(Debug)]
pub struct Dispatcher {
    session: Session,
    handled: u64,
}

impl Dispatcher {
    pub fn new(session: Session) -> Self {
        Self { session, handled: 0 }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of requests dispatched so far.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Run `method` with `params`. Never panics and never fails: every
    /// outcome is an envelope.
    pub fn dispatch(&mut self, method: &str, params: &Json) -> Envelope {
        self.handled += 1;
        tracing::debug!(request = self.handled, method, %params, "dispatch");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.invoke(method, params)));
        match outcome {
            Ok(Ok(value)) => Envelope::success(&value),
            Ok(Err(err)) => {
                tracing::debug!(method, kind = err.kind(), error = %err, "request failed");
                Envelope::failure(&err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(method, %message, "panic while handling request");
                Envelope::failure(&BridgeError::Internal(message))
            }
        }
    }

    fn invoke(&mut self, method: &str, raw: &Json) -> BridgeResult<Value> {
        let operation =
            Operation::parse(method).ok_or_else(|| BridgeError::UnknownMethod(method.to_string()))?;
        let params = Params::bind(operation, raw)?;
        let session = &mut self.session;

        match operation {
            Operation::Hello => Ok(Value::Bool(true)),
            Operation::ComponentOpen => {
                session.open_component(params.string("name")?)?;
                Ok(Value::Bool(true))
            }
            Operation::HasClass => Ok(Value::Bool(session.has_class(params.string("name")?))),
            Operation::HasFunction => Ok(Value::Bool(session.has_function(params.string("name")?))),
            Operation::HasVariable => Ok(Value::Bool(session.has_variable(params.string("name")?))),
            Operation::VariableEval => session.read_variable(params.string("name")?),
            Operation::FunctionEval => {
                session.call_function(params.string("name")?, params.call_args()?)
            }
            Operation::ObjectNew => {
                session.new_object(
                    params.string("className")?,
                    params.string("id")?,
                    params.call_args()?,
                )?;
                Ok(Value::Bool(true))
            }
            Operation::ObjectNewWithoutInit => {
                session.new_object_without_init(
                    params.string("className")?,
                    params.string("id")?,
                    params.object("attrs")?,
                )?;
                Ok(Value::Bool(true))
            }
            Operation::ObjectHasAttribute => session
                .has_attribute(params.string("id")?, params.string("attrName")?)
                .map(Value::Bool),
            Operation::MethodEval => session.call_method(
                params.string("id")?,
                params.string("methodName")?,
                params.call_args()?,
            ),
            Operation::Eval => session.eval(params.string("code")?),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_aliases() {
        assert_eq!(Operation::parse("component.open"), Some(Operation::ComponentOpen));
        assert_eq!(Operation::parse("module.open"), Some(Operation::ComponentOpen));
        assert_eq!(Operation::parse("module_hasClass"), Some(Operation::HasClass));
        assert_eq!(Operation::parse("object_newWithoutInit"), Some(Operation::ObjectNewWithoutInit));
        assert_eq!(Operation::parse("eval"), Some(Operation::Eval));
        assert_eq!(Operation::parse("object.delete"), None);
        for op in Operation::ALL {
            assert_eq!(Operation::parse(op.name()), Some(op));
        }
    }

    #[test]
    fn test_positional_and_named_params() {
        let params = Params::bind(Operation::FunctionEval, &json!(["add", [1, 2]])).unwrap();
        assert_eq!(params.string("name").unwrap(), "add");
        assert_eq!(params.call_args().unwrap().positional, vec![Value::Int(1), Value::Int(2)]);

        let params = Params::bind(
            Operation::FunctionEval,
            &json!({"name": "add", "kwargs": {"b": 2}, "args": null}),
        )
        .unwrap();
        let args = params.call_args().unwrap();
        assert!(args.positional.is_empty());
        assert_eq!(args.named, vec![("b".to_string(), Value::Int(2))]);
    }

    #[test]
    fn test_malformed_params() {
        let cases = [
            (Operation::FunctionEval, json!([])),
            (Operation::FunctionEval, json!(["f", [], {}, 4])),
            (Operation::FunctionEval, json!({"name": "f", "extra": 1})),
            (Operation::Eval, json!("1 + 1")),
        ];
        for (op, raw) in cases {
            let err = Params::bind(op, &raw).err().unwrap_or_else(|| panic!("accepted {}", raw));
            assert_eq!(err.kind(), "ArgumentError");
        }

        let params = Params::bind(Operation::FunctionEval, &json!(["f", {"a": 1}])).unwrap();
        assert_eq!(params.call_args().unwrap_err().kind(), "ArgumentError");
        let params = Params::bind(Operation::Eval, &json!([5])).unwrap();
        assert_eq!(params.string("code").unwrap_err().kind(), "ArgumentError");
    }

    #[test]
    fn test_hello_and_unknown_method() {
        let resolver = crate::resolve::ComponentResolver::new(Vec::new());
        let mut dispatcher = Dispatcher::new(Session::new(resolver));
        assert_eq!(dispatcher.dispatch("hello", &Json::Null).result(), Some(&json!(true)));
        assert_eq!(dispatcher.dispatch("hello", &json!([])).result(), Some(&json!(true)));
        assert_eq!(
            dispatcher.dispatch("object.delete", &json!([])).error_type(),
            Some("UnknownMethod")
        );
        assert_eq!(dispatcher.handled(), 3);
    }
}
