//! Relay Runtime
//!
//! Exposes a loaded Relay script component to remote callers:
//! - **ComponentLoader**: resolves, loads and classifies a component (`component`)
//! - **ObjectRegistry**: live instances addressed by caller-chosen ids (`registry`)
//! - **ExpressionEvaluator**: free-form evaluation sharing the registry scope (`evaluator`)
//! - **Dispatcher**: the single entry point turning operations into envelopes (`dispatcher`)

#![warn(rust_2018_idioms)]
#![allow(clippy::result_large_err)]
#![allow(clippy::new_without_default)]

pub mod component;
pub mod convert;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod evaluator;
pub mod registry;
pub mod resolve;
pub mod session;

pub use component::{ClassDescriptor, Component, ComponentLoader, FunctionDescriptor, MemberKind};
pub use dispatcher::{Dispatcher, Operation};
pub use envelope::Envelope;
pub use error::{BridgeError, BridgeResult};
pub use evaluator::ExpressionEvaluator;
pub use registry::{ObjectHandle, ObjectRegistry};
pub use resolve::{ComponentResolver, ResolveError, DEFAULT_EXTENSION};
pub use session::Session;

pub use relay_engine::SCRIPT_STACK_SIZE;
