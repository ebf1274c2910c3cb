//! Relay Script Engine
//!
//! This crate provides the language that bridged components are written in:
//! - **Parser**: Lexer (logos), AST, and recursive-descent parser (`parser` module)
//! - **VM**: Object model, scopes, prelude, and tree-walking interpreter (`vm` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_engine::{Interpreter, SourceFile};
//!
//! let source = SourceFile::inline("counter", r#"
//!     class Counter {
//!         constructor(start) { this.value = start; }
//!         increment() { this.value += 1; return this.value; }
//!     }
//! "#);
//!
//! let mut interp = Interpreter::new();
//! let module = interp.load_module(&source).unwrap();
//! ```

#![warn(rust_2018_idioms)]
#![allow(clippy::result_large_err)]
#![allow(clippy::new_without_default)]

// ============================================================================
// Core Modules
// ============================================================================

/// Parser module: lexer, tokens, AST, and parser
pub mod parser;

/// VM module: values, object model, scopes, prelude, and interpreter
pub mod vm;

// ============================================================================
// Re-exports
// ============================================================================

pub use parser::{parse_program, LexError, Lexer, ParseError, Parser, Span, Token};
pub use vm::{
    Binding, Builtin, CallArgs, Class, EngineError, Env, Function, ImportContext, Instance,
    Interpreter, Module, ModuleSource, Namespace, SourceFile, Value, VmError, MAX_CALL_DEPTH,
    SCRIPT_STACK_SIZE,
};
