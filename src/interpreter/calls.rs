//! Calling things
//!
//! - [`Interpreter::call_value`]: any callable value
//! - [`Interpreter::call_function`]: a user function or lambda, in a new frame
//! - [`Interpreter::call_method`]: `receiver.name(...)` without allocating a
//!   bound-method object
//! - [`Interpreter::instantiate`]: `ClassName(...)`
//!
//! Argument binding follows positional-then-keyword order with defaults for
//! trailing parameters, and reports mismatches with the same messages the
//! script language uses.

use crate::interpreter::engine::{Flow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::LineHook;
use crate::memory::heap::{FunctionBody, FunctionObject, HeapData, Instance};
use crate::memory::stack::{Frame, FrameKind, Namespace, Scope};
use crate::memory::value::{ObjId, Value};
use crate::parser::ast::SourceLocation;
use std::rc::Rc;

/// `'a'`, `'a' and 'b'`, `'a', 'b', and 'c'`
fn quoted_list(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
    match quoted.as_slice() {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

impl<H: LineHook> Interpreter<H> {
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let id = match callee {
            Value::Builtin(builtin) => return self.call_builtin(*builtin, args, kwargs, location),
            Value::Ref(id) => *id,
            other => return Err(self.not_callable(other, location)),
        };
        match self.heap.get(id) {
            Some(HeapData::Function(function)) => {
                let function = function.clone();
                self.call_function(function, args, kwargs, location)
            }
            Some(HeapData::Class(_)) => self.instantiate(id, args, kwargs, location),
            Some(HeapData::BoundMethod { receiver, function }) => {
                let function = Value::Ref(*function);
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(receiver.clone());
                full.extend(args);
                self.call_value(&function, full, kwargs, location)
            }
            Some(HeapData::BuiltinMethod { receiver, name }) => {
                let (receiver, name) = (receiver.clone(), name.clone());
                if name.as_ref() == "__init__" {
                    return self.native_init(&receiver, args, location);
                }
                self.call_builtin_method(&receiver, &name, args, kwargs, location)
            }
            Some(HeapData::Instance(instance)) => {
                match self.heap.class_attr(instance.class, "__call__") {
                    Some(method) => {
                        let mut full = Vec::with_capacity(args.len() + 1);
                        full.push(callee.clone());
                        full.extend(args);
                        self.call_value(&method, full, kwargs, location)
                    }
                    None => Err(self.not_callable(callee, location)),
                }
            }
            _ => Err(self.not_callable(callee, location)),
        }
    }

    fn not_callable(&self, value: &Value, location: SourceLocation) -> RuntimeError {
        RuntimeError::type_error(
            format!("'{}' object is not callable", self.heap.type_name(value)),
            location,
        )
    }

    /// Run a user function in a fresh frame
    pub(crate) fn call_function(
        &mut self,
        function: Rc<FunctionObject>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if self.stack.depth() >= self.limits.max_call_depth {
            return Err(RuntimeError::RecursionLimit { location });
        }

        let method_of = function.owner.zip(args.first().cloned());
        let scope = Scope::new(function.closure.clone());
        self.bind_arguments(&function, args, kwargs, &scope, location)?;

        let mut frame = Frame::new(FrameKind::Function(function.name.clone()), scope);
        frame.method_of = method_of;
        self.push_frame(frame, location)?;

        let result = match &function.body {
            FunctionBody::Block(body) => self.exec_block(body).and_then(|flow| match flow {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::None),
                Flow::Break | Flow::Continue => Err(RuntimeError::Syntax {
                    message: "'break' outside loop".to_string(),
                    location: SourceLocation::new(function.line, 0),
                }),
            }),
            FunctionBody::Lambda(expr) => self
                .boundary(expr.location())
                .and_then(|_| self.eval(expr)),
        };
        self.stack.pop();
        result
    }

    fn bind_arguments(
        &self,
        function: &FunctionObject,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        scope: &Scope,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let name = &function.name;
        let params = &function.params;
        if args.len() > params.len() {
            let takes = if function.defaults.is_empty() {
                plural(params.len(), "positional argument")
            } else {
                format!(
                    "from {} to {} positional arguments",
                    params.len() - function.defaults.len(),
                    params.len()
                )
            };
            return Err(RuntimeError::type_error(
                format!(
                    "{}() takes {} but {} {} given",
                    name,
                    takes,
                    args.len(),
                    if args.len() == 1 { "was" } else { "were" }
                ),
                location,
            ));
        }

        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in slots.iter_mut().zip(args) {
            *slot = Some(value);
        }
        for (key, value) in kwargs {
            let Some(index) = params.iter().position(|p| *p == key) else {
                return Err(RuntimeError::type_error(
                    format!("{}() got an unexpected keyword argument '{}'", name, key),
                    location,
                ));
            };
            if slots[index].is_some() {
                return Err(RuntimeError::type_error(
                    format!("{}() got multiple values for argument '{}'", name, key),
                    location,
                ));
            }
            slots[index] = Some(value);
        }

        let first_default = params.len().saturating_sub(function.defaults.len());
        let mut missing = Vec::new();
        for (index, slot) in slots.iter_mut().enumerate() {
            if slot.is_none() {
                if index >= first_default {
                    *slot = function.defaults.get(index - first_default).cloned();
                } else {
                    missing.push(params[index].as_str());
                }
            }
        }
        if !missing.is_empty() {
            return Err(RuntimeError::type_error(
                format!(
                    "{}() missing {}: {}",
                    name,
                    plural(missing.len(), "required positional argument"),
                    quoted_list(&missing)
                ),
                location,
            ));
        }

        for (param, value) in params.iter().zip(slots) {
            scope.set(param, value.unwrap_or_default());
        }
        Ok(())
    }

    /// `Class(...)`: allocate an instance and run `__init__`
    pub(crate) fn instantiate(
        &mut self,
        class: ObjId,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let instance = self.alloc(
            HeapData::Instance(Instance {
                class,
                fields: Namespace::default(),
            }),
            location,
        )?;

        match self.heap.class_attr(class, "__init__") {
            Some(init) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(instance.clone());
                full.extend(args);
                let result = self.call_value(&init, full, kwargs, location)?;
                if !result.is_none() {
                    return Err(RuntimeError::type_error(
                        format!(
                            "__init__() should return None, not '{}'",
                            self.heap.type_name(&result)
                        ),
                        location,
                    ));
                }
            }
            None if self.heap.exception_base(class).is_some() => {
                self.native_init(&instance, args, location)?;
            }
            None if !args.is_empty() || !kwargs.is_empty() => {
                return Err(RuntimeError::type_error(
                    format!("{}() takes no arguments", self.heap.class_name(class)),
                    location,
                ));
            }
            None => {}
        }
        Ok(instance)
    }

    /// `__init__` of the built-in base (`object` or an exception class)
    pub(crate) fn native_init(
        &mut self,
        receiver: &Value,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let Some(id) = receiver.as_ref_id() else {
            return Ok(Value::None);
        };
        let class = match self.heap.get(id) {
            Some(HeapData::Instance(instance)) => instance.class,
            _ => return Ok(Value::None),
        };
        if self.heap.exception_base(class).is_none() {
            if !args.is_empty() {
                return Err(RuntimeError::type_error(
                    "object.__init__() takes exactly one argument (the instance to initialize)",
                    location,
                ));
            }
            return Ok(Value::None);
        }

        let message = match args.as_slice() {
            [] => String::new(),
            [single] => self.display_str(single, location)?,
            many => {
                let tuple = self.alloc_tuple(many.to_vec(), location)?;
                self.display_str(&tuple, location)?
            }
        };
        if let Some(HeapData::Instance(instance)) = self.heap.get_mut(id) {
            instance
                .fields
                .insert("__message__".to_string(), Value::str(message));
        }
        Ok(Value::None)
    }

    /// `receiver.name(args)`
    pub(crate) fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let with_receiver = |receiver: &Value, args: Vec<Value>| {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(receiver.clone());
            full.extend(args);
            full
        };

        match self.heap.deref(receiver) {
            Some(HeapData::Instance(instance)) => {
                let class = instance.class;
                if let Some(field) = instance.fields.get(name).cloned() {
                    return self.call_value(&field, args, kwargs, location);
                }
                match self.heap.class_attr(class, name) {
                    Some(attr) if self.is_function(&attr) => {
                        self.call_value(&attr, with_receiver(receiver, args), kwargs, location)
                    }
                    Some(attr) => self.call_value(&attr, args, kwargs, location),
                    None if name == "__init__" => self.native_init(receiver, args, location),
                    None => Err(RuntimeError::attribute_error(
                        format!(
                            "'{}' object has no attribute '{}'",
                            self.heap.class_name(class),
                            name
                        ),
                        location,
                    )),
                }
            }
            Some(HeapData::Super { class, receiver: bound }) => {
                let (class, bound) = (*class, bound.clone());
                let base = match self.heap.get(class) {
                    Some(HeapData::Class(c)) => c.base,
                    _ => None,
                };
                match base.and_then(|b| self.heap.class_attr(b, name)) {
                    Some(attr) if self.is_function(&attr) => {
                        self.call_value(&attr, with_receiver(&bound, args), kwargs, location)
                    }
                    Some(attr) => self.call_value(&attr, args, kwargs, location),
                    None if name == "__init__" => self.native_init(&bound, args, location),
                    None => Err(RuntimeError::attribute_error(
                        format!("'super' object has no attribute '{}'", name),
                        location,
                    )),
                }
            }
            Some(HeapData::Class(_) | HeapData::Module(_)) => {
                let attr = self.get_attr(receiver, name, location)?;
                self.call_value(&attr, args, kwargs, location)
            }
            _ => self.call_builtin_method(receiver, name, args, kwargs, location),
        }
    }

    pub(crate) fn is_function(&self, value: &Value) -> bool {
        matches!(self.heap.deref(value), Some(HeapData::Function(_)))
    }
}
