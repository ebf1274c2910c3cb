//! Relay script VM
//!
//! This module provides the runtime side of the engine:
//! - Values and the object model (functions, classes, instances, modules)
//! - Scopes (module namespaces and local environments)
//! - The prelude and built-in members of lists, strings and dicts
//! - The tree-walking interpreter

pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod members;
pub mod module;
pub mod object;
pub mod scope;
pub mod value;

pub use builtins::{prelude, Builtin};
pub use error::{EngineError, VmError, VmResult};
pub use interpreter::{CallArgs, Interpreter, MAX_CALL_DEPTH, SCRIPT_STACK_SIZE};
pub use module::{ImportContext, ModuleSource, SourceFile};
pub use object::{BoundMethod, Class, Function, Instance, MethodTarget, Module};
pub use scope::{Binding, Env, Namespace};
pub use value::Value;
