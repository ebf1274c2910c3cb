//! Calls, argument binding and construction

use std::sync::Arc;

use super::{Flow, Frame, FrameKind, Interpreter};
use crate::vm::object::MethodTarget;
use crate::vm::scope::Env;
use crate::vm::{Class, Function, Instance, Value, VmError};

/// Arguments of a call: positional values then named values.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            named: Vec::new(),
        }
    }

    pub fn with_named(mut self, name: impl Into<String>, value: Value) -> Self {
        self.named.push((name.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Put `value` in front of the positional arguments.
    fn prepend(mut self, value: Value) -> Self {
        self.positional.insert(0, value);
        self
    }
}

impl Interpreter {
    /// Call any callable value.
    pub fn call(&mut self, callee: &Value, args: CallArgs) -> Result<Value, VmError> {
        match callee {
            Value::Function(func) => self.call_function(func, None, args),
            Value::Builtin(builtin) => (builtin.func)(self, args),
            Value::Class(class) => self.construct(class, args),
            Value::BoundMethod(method) => match &method.target {
                MethodTarget::Script(func) => {
                    self.call_function(func, Some(method.receiver.clone()), args)
                }
                MethodTarget::Builtin(builtin) => {
                    (builtin.func)(self, args.prepend(method.receiver.clone()))
                }
            },
            other => Err(VmError::NotCallable(other.type_name().to_string())),
        }
    }

    /// Call a script function, binding `this` when given.
    pub fn call_function(
        &mut self,
        func: &Arc<Function>,
        this: Option<Value>,
        args: CallArgs,
    ) -> Result<Value, VmError> {
        self.enter()?;
        let result = self.call_function_inner(func, this, args);
        self.leave();
        result
    }

    fn call_function_inner(
        &mut self,
        func: &Arc<Function>,
        this: Option<Value>,
        args: CallArgs,
    ) -> Result<Value, VmError> {
        let env = match &func.closure {
            Some(closure) => closure.child(),
            None => Env::new(),
        };
        let frame = Frame {
            env: Some(env.clone()),
            globals: func.globals()?,
            this,
            home: func.home(),
            kind: FrameKind::Function,
        };

        self.bind_arguments(func, args, &env, &frame)?;

        match self.exec_block(&func.decl.body, &frame)? {
            Flow::Next => Ok(Value::Null),
            Flow::Return(value) => Ok(value),
            Flow::Break => Err(VmError::InvalidControlFlow("break", "loop")),
            Flow::Continue => Err(VmError::InvalidControlFlow("continue", "loop")),
        }
    }

    /// Bind positional arguments, then named arguments, then defaults.
    ///
    /// Defaults are evaluated in the call scope, so they may refer to the
    /// parameters before them.
    fn bind_arguments(
        &mut self,
        func: &Function,
        args: CallArgs,
        env: &Env,
        frame: &Frame,
    ) -> Result<(), VmError> {
        let params = &func.decl.params;
        let name = func.name();

        if args.positional.len() > params.len() {
            return Err(VmError::argument_error(format!(
                "{}() takes {} positional arguments but {} were given",
                name,
                params.len(),
                args.positional.len()
            )));
        }

        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in slots.iter_mut().zip(args.positional) {
            *slot = Some(value);
        }

        for (label, value) in args.named {
            let index = params.iter().position(|p| p.name == label).ok_or_else(|| {
                VmError::argument_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    name, label
                ))
            })?;
            if slots[index].is_some() {
                return Err(VmError::argument_error(format!(
                    "{}() got multiple values for argument '{}'",
                    name, label
                )));
            }
            slots[index] = Some(value);
        }

        for (param, slot) in params.iter().zip(slots) {
            let value = match (slot, &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => self.eval_expr(default, frame)?,
                (None, None) => {
                    return Err(VmError::argument_error(format!(
                        "{}() missing required argument '{}'",
                        name, param.name
                    )))
                }
            };
            env.declare(&param.name, value, false)?;
        }
        Ok(())
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create an instance the normal way: field initializers along the class
    /// chain (root class first), then the nearest constructor.
    pub fn construct(&mut self, class: &Arc<Class>, args: CallArgs) -> Result<Value, VmError> {
        let instance = Value::Instance(Arc::new(Instance::new(class.clone())));
        self.enter()?;
        let result = self.initialize(class, &instance, args);
        self.leave();
        result.map(|()| instance)
    }

    fn initialize(
        &mut self,
        class: &Arc<Class>,
        instance: &Value,
        args: CallArgs,
    ) -> Result<(), VmError> {
        for ancestor in class.lineage() {
            self.init_fields(&ancestor, instance)?;
        }

        match class.find_constructor() {
            Some(ctor) => {
                self.call_function(&ctor, Some(instance.clone()), args)?;
                Ok(())
            }
            None if args.is_empty() => Ok(()),
            None => Err(VmError::argument_error(format!(
                "{}() takes no arguments",
                class.name
            ))),
        }
    }

    /// Run the instance field initializers declared directly on `class`.
    fn init_fields(&mut self, class: &Arc<Class>, instance: &Value) -> Result<(), VmError> {
        let Value::Instance(object) = instance else {
            return Err(VmError::Internal("field initialization on a non-instance".into()));
        };
        let globals = class.globals.upgrade().ok_or_else(|| {
            VmError::Internal(format!("module defining '{}' was unloaded", class.name))
        })?;
        let frame = Frame {
            env: class.closure.clone(),
            globals,
            this: Some(instance.clone()),
            home: Some(class.clone()),
            kind: FrameKind::Function,
        };

        for field in class.decl.fields.iter().filter(|f| !f.is_static) {
            let value = match &field.initializer {
                Some(init) => self.eval_expr(init, &frame)?,
                None => Value::Null,
            };
            object.set_field(&field.name, value);
        }
        Ok(())
    }

    /// Allocate an instance without running field initializers or any
    /// constructor.
    pub fn allocate(&self, class: &Arc<Class>) -> Arc<Instance> {
        Arc::new(Instance::new(class.clone()))
    }

    /// Invoke the constructor of `class`'s parent on `this` (`super(...)`).
    pub(crate) fn call_super_constructor(
        &mut self,
        class: &Arc<Class>,
        this: Value,
        args: CallArgs,
    ) -> Result<(), VmError> {
        let Some(parent) = &class.parent else {
            return Err(VmError::type_error(format!(
                "'super' call in class '{}' which has no parent",
                class.name
            )));
        };
        match parent.find_constructor() {
            Some(ctor) => {
                self.call_function(&ctor, Some(this), args)?;
                Ok(())
            }
            None if args.is_empty() => Ok(()),
            None => Err(VmError::argument_error(format!(
                "{}() takes no arguments",
                parent.name
            ))),
        }
    }
}
