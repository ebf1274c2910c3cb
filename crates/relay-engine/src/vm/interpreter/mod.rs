//! Tree-walking interpreter
//!
//! Execution is split across:
//! - `stmt`: statements, declarations, classes and imports
//! - `expr`: expressions, operators, attribute and index access
//! - `call`: argument binding, function calls and instance construction
//!
//! # Name resolution
//!
//! Reads walk the local [`Env`] chain, then the module [`Namespace`], then the
//! prelude. Where an assignment to an unbound bare name lands depends on the
//! frame: module top level defines a module binding, an evaluation frame
//! defines it in the caller-supplied root scope, and a function body reports
//! it as undefined.

mod call;
mod expr;
mod stmt;

use std::sync::Arc;

use crate::parser::parse_program;
use crate::vm::scope::{Env, Namespace};
use crate::vm::{
    Class, EngineError, ImportContext, Module, SourceFile, Value, VmError,
};

pub use call::CallArgs;

/// Maximum nesting of script calls before a `StackOverflow` error.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Stack size for threads that run script code.
///
/// Each script call costs several native frames of the tree walker; this
/// holds [`MAX_CALL_DEPTH`] calls with room to spare. The default 2 MiB of a
/// spawned thread does not.
pub const SCRIPT_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Receives `print` output, one line per call.
pub type OutputSink = Box<dyn FnMut(&str) + Send>;

/// Statement completion.
#[derive(Debug)]
pub(crate) enum Flow {
    Next,
    Return(Value),
    Break,
    Continue,
}

/// Where assignments to unbound bare names go.
#[derive(Debug, Clone)]
pub(crate) enum FrameKind {
    /// Module top level: define in the module namespace
    Module,
    /// Function body: unbound names are errors
    Function,
    /// Evaluation snippet: define in this root scope
    Eval(Env),
}

/// Execution state of the code currently running.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    /// Innermost local scope; `None` at module top level outside any block
    pub env: Option<Env>,
    pub globals: Arc<Namespace>,
    pub this: Option<Value>,
    /// Class whose method is executing, for `super`
    pub home: Option<Arc<Class>>,
    pub kind: FrameKind,
}

impl Frame {
    /// Same frame with a fresh block scope.
    pub fn block(&self) -> Frame {
        let env = match &self.env {
            Some(env) => env.child(),
            None => Env::new(),
        };
        Frame {
            env: Some(env),
            ..self.clone()
        }
    }
}

/// The Relay script interpreter.
///
/// One interpreter is enough for any number of modules; it carries only the
/// call depth, the import context and the `print` sink.
pub struct Interpreter {
    depth: usize,
    imports: Option<ImportContext>,
    output: OutputSink,
}

impl Interpreter {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self {
            depth: 0,
            imports: None,
            output: Box::new(|line| println!("{}", line)),
        }
    }

    /// Redirect `print` output.
    pub fn set_output(&mut self, sink: OutputSink) {
        self.output = sink;
    }

    pub(crate) fn write_output(&mut self, line: &str) {
        (self.output)(line);
    }

    /// Install the resolver used by `import`, replacing any previous one
    /// together with its module cache.
    pub fn set_imports(&mut self, imports: Option<ImportContext>) {
        self.imports = imports;
    }

    pub fn imports(&self) -> Option<&ImportContext> {
        self.imports.as_ref()
    }

    /// Parse and execute a module's top level.
    pub fn load_module(&mut self, source: &SourceFile) -> Result<Arc<Module>, EngineError> {
        let program = parse_program(&source.text)?;
        let namespace = Arc::new(Namespace::new(source.name.clone()));
        let frame = Frame {
            env: None,
            globals: namespace.clone(),
            this: None,
            home: None,
            kind: FrameKind::Module,
        };

        for statement in &program.statements {
            match self.exec_statement(statement, &frame)? {
                Flow::Next => {}
                Flow::Return(_) => return Err(VmError::InvalidControlFlow("return", "function").into()),
                Flow::Break => return Err(VmError::InvalidControlFlow("break", "loop").into()),
                Flow::Continue => {
                    return Err(VmError::InvalidControlFlow("continue", "loop").into())
                }
            }
        }

        Ok(Arc::new(Module {
            name: source.name.clone(),
            origin: source.origin.clone(),
            namespace,
        }))
    }

    /// Evaluate `code` with `locals` as its writable root scope.
    ///
    /// Reads see `locals`, then `globals`, then the prelude. Bare-name
    /// assignments and declarations at the top level of `code` bind in
    /// `locals`. The result is the value of the final statement when it is
    /// an expression, `null` otherwise; a top-level `return` ends the
    /// snippet with its value.
    pub fn eval_in(
        &mut self,
        code: &str,
        globals: &Arc<Namespace>,
        locals: &Env,
    ) -> Result<Value, EngineError> {
        let program = parse_program(code)?;
        let frame = Frame {
            env: Some(locals.clone()),
            globals: globals.clone(),
            this: None,
            home: None,
            kind: FrameKind::Eval(locals.clone()),
        };

        let mut last = Value::Null;
        for statement in &program.statements {
            if let crate::parser::ast::Statement::Expression(expr) = statement {
                last = self.eval_expr(expr, &frame)?;
                continue;
            }
            last = Value::Null;
            match self.exec_statement(statement, &frame)? {
                Flow::Next => {}
                Flow::Return(value) => return Ok(value),
                Flow::Break => return Err(VmError::InvalidControlFlow("break", "loop").into()),
                Flow::Continue => {
                    return Err(VmError::InvalidControlFlow("continue", "loop").into())
                }
            }
        }
        Ok(last)
    }

    /// Track one more level of script call nesting.
    pub(crate) fn enter(&mut self) -> Result<(), VmError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(VmError::StackOverflow(MAX_CALL_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Current script call nesting.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("depth", &self.depth)
            .field("imports", &self.imports)
            .finish()
    }
}
