//! Statement execution

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{Flow, Frame, Interpreter};
use crate::parser::ast::{ClassDecl, FunctionDecl, ImportDeclaration, Statement};
use crate::vm::{Class, Function, Value, VmError};

impl Interpreter {
    /// Execute statements in a fresh block scope.
    pub(crate) fn exec_block(
        &mut self,
        statements: &[Statement],
        frame: &Frame,
    ) -> Result<Flow, VmError> {
        let block = frame.block();
        for statement in statements {
            match self.exec_statement(statement, &block)? {
                Flow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    pub(crate) fn exec_statement(
        &mut self,
        statement: &Statement,
        frame: &Frame,
    ) -> Result<Flow, VmError> {
        match statement {
            Statement::Variable(decl) => {
                let value = match &decl.initializer {
                    Some(init) => self.eval_expr(init, frame)?,
                    None => Value::Null,
                };
                self.declare(frame, &decl.name, value, decl.constant)?;
                Ok(Flow::Next)
            }
            Statement::Function(decl) => {
                let func = self.make_function(decl, frame, None);
                self.declare(frame, &decl.name, Value::Function(func), false)?;
                Ok(Flow::Next)
            }
            Statement::Class(decl) => {
                let class = self.build_class(decl, frame)?;
                self.declare(frame, &decl.name, Value::Class(class), false)?;
                Ok(Flow::Next)
            }
            Statement::If(stmt) => {
                if self.eval_expr(&stmt.condition, frame)?.is_truthy() {
                    self.exec_block(&stmt.then_branch, frame)
                } else if let Some(else_branch) = &stmt.else_branch {
                    self.exec_block(else_branch, frame)
                } else {
                    Ok(Flow::Next)
                }
            }
            Statement::While(stmt) => {
                while self.eval_expr(&stmt.condition, frame)?.is_truthy() {
                    match self.exec_block(&stmt.body, frame)? {
                        Flow::Break => break,
                        Flow::Next | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Next)
            }
            Statement::ForOf(stmt) => {
                let iterable = self.eval_expr(&stmt.iterable, frame)?;
                for item in iterate(&iterable)? {
                    let scope = frame.block();
                    self.declare(&scope, &stmt.binding, item, false)?;
                    match self.exec_block(&stmt.body, &scope)? {
                        Flow::Break => break,
                        Flow::Next | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Next)
            }
            Statement::Return(value, _) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, frame)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::Break(_) => Ok(Flow::Break),
            Statement::Continue(_) => Ok(Flow::Continue),
            Statement::Throw(expr, _) => {
                let value = self.eval_expr(expr, frame)?;
                Err(VmError::Thrown(value))
            }
            Statement::Try(stmt) => match self.exec_block(&stmt.body, frame) {
                Err(err) if err.is_catchable() => {
                    let scope = frame.block();
                    if let Some(binding) = &stmt.catch_binding {
                        self.declare(&scope, binding, err.to_value(), false)?;
                    }
                    self.exec_block(&stmt.handler, &scope)
                }
                other => other,
            },
            Statement::Import(decl) => {
                let module = self.import(decl)?;
                self.declare(frame, decl.local_name(), Value::Module(module), false)?;
                Ok(Flow::Next)
            }
            Statement::Expression(expr) => {
                self.eval_expr(expr, frame)?;
                Ok(Flow::Next)
            }
            Statement::Empty(_) => Ok(Flow::Next),
        }
    }

    /// Bind a declaration in the innermost scope of `frame`.
    fn declare(
        &mut self,
        frame: &Frame,
        name: &str,
        value: Value,
        constant: bool,
    ) -> Result<(), VmError> {
        match &frame.env {
            Some(env) => env.declare(name, value, constant),
            None => frame.globals.define(name, value, constant),
        }
    }

    pub(crate) fn make_function(
        &self,
        decl: &Arc<FunctionDecl>,
        frame: &Frame,
        home: Option<std::sync::Weak<Class>>,
    ) -> Arc<Function> {
        Arc::new(Function {
            decl: decl.clone(),
            globals: Arc::downgrade(&frame.globals),
            closure: frame.env.clone(),
            home,
        })
    }

    /// Build a class value: resolve the parent, evaluate static fields, then
    /// create methods that point back at the class.
    fn build_class(&mut self, decl: &Arc<ClassDecl>, frame: &Frame) -> Result<Arc<Class>, VmError> {
        let parent = match &decl.parent {
            Some(expr) => match self.eval_expr(expr, frame)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(VmError::type_error(format!(
                        "class '{}' cannot extend '{}' value",
                        decl.name,
                        other.type_name()
                    )))
                }
            },
            None => None,
        };

        let mut statics = IndexMap::new();
        for field in decl.fields.iter().filter(|f| f.is_static) {
            let value = match &field.initializer {
                Some(init) => self.eval_expr(init, frame)?,
                None => Value::Null,
            };
            statics.insert(field.name.clone(), value);
        }

        let class = Arc::new_cyclic(|this| {
            let method = |method_decl: &Arc<FunctionDecl>| {
                (
                    method_decl.name.clone(),
                    self.make_function(method_decl, frame, Some(this.clone())),
                )
            };
            Class {
                name: decl.name.clone(),
                parent,
                decl: decl.clone(),
                constructor: decl
                    .constructor
                    .as_ref()
                    .map(|ctor| self.make_function(ctor, frame, Some(this.clone()))),
                methods: decl.methods.iter().map(method).collect(),
                static_methods: decl.static_methods.iter().map(method).collect(),
                statics: RwLock::new(statics),
                globals: Arc::downgrade(&frame.globals),
                closure: frame.env.clone(),
            }
        });
        Ok(class)
    }

    /// Load (or reuse) the module named by an import statement.
    fn import(&mut self, decl: &ImportDeclaration) -> Result<Arc<crate::vm::Module>, VmError> {
        let name = decl.path.join(".");
        let source = {
            let Some(imports) = self.imports.as_mut() else {
                return Err(VmError::Import(format!(
                    "cannot import '{}': no component source is configured",
                    name
                )));
            };
            if let Some(module) = imports.cached(&name) {
                return Ok(module);
            }
            imports.begin(&name)?;
            imports.resolve(&name)
        };

        let loaded = source
            .and_then(|source| self.load_module(&source).map_err(|e| import_failure(&name, e)));

        if let Some(imports) = self.imports.as_mut() {
            imports.finish(&name, loaded.as_ref().ok().cloned());
        }
        loaded
    }
}

fn import_failure(name: &str, err: crate::vm::EngineError) -> VmError {
    match err {
        crate::vm::EngineError::Runtime(VmError::Import(message)) => VmError::Import(message),
        other => VmError::Import(format!("failed to load '{}': {}", name, other)),
    }
}

/// Items visited by `for (x of value)`. Containers are snapshotted first.
fn iterate(value: &Value) -> Result<Vec<Value>, VmError> {
    match value {
        Value::List(items) => Ok(items.read().clone()),
        Value::Dict(entries) => Ok(entries
            .read()
            .keys()
            .map(|k| Value::str(k.as_str()))
            .collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
        other => Err(VmError::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}
