//! Statement execution implementation
//!
//! This module handles the statements that are more than a single dispatch:
//!
//! - Assignment to names, attributes, subscripts, slices and unpacking
//!   patterns, plus augmented assignment
//! - `del`
//! - `def` and `class`
//! - `raise` and `assert`
//! - `from module import name`
//!
//! # Augmented assignment
//!
//! The target is evaluated once. For `lst[i] += v` the element is read (one
//! logged read) and written back (one logged write). `lst += iterable`
//! extends the list in place and set operators update sets in place, so
//! aliases observe the change.

use crate::interpreter::builtins::Builtin;
use crate::interpreter::engine::{Flow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::LineHook;
use crate::memory::heap::{ClassObject, FunctionBody, FunctionObject, HeapData};
use crate::memory::stack::{Frame, FrameKind, Scope};
use crate::memory::value::Value;
use crate::parser::ast::*;
use std::rc::Rc;

impl<H: LineHook> Interpreter<H> {
    pub(crate) fn exec_assign(
        &mut self,
        targets: &[Expr],
        value: &Expr,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let value = self.eval(value)?;
        for target in targets {
            self.assign_target(target, value.clone(), location)?;
        }
        Ok(())
    }

    /// Bind `value` to an assignment target (also used by `for` and
    /// comprehensions)
    pub(crate) fn assign_target(
        &mut self,
        target: &Expr,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name, _) => {
                self.store_name(name, value);
                Ok(())
            }
            Expr::Tuple { items, .. } | Expr::List { items, .. } => {
                let values = self.collect_items(&value, location)?;
                if values.len() != items.len() {
                    let message = if values.len() > items.len() {
                        format!("too many values to unpack (expected {})", items.len())
                    } else {
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            items.len(),
                            values.len()
                        )
                    };
                    return Err(RuntimeError::value_error(message, location));
                }
                for (item, value) in items.iter().zip(values) {
                    self.assign_target(item, value, location)?;
                }
                Ok(())
            }
            Expr::Attribute { object, name, .. } => {
                let object = self.eval(object)?;
                self.set_attr(&object, name, value, location)
            }
            Expr::Subscript { object, index, .. } => {
                let object = self.eval(object)?;
                match index.as_ref() {
                    Expr::Slice {
                        lower, upper, step, ..
                    } => {
                        let bounds = self.eval_slice_bounds(lower, upper, step)?;
                        self.set_slice(&object, bounds, value, location)
                    }
                    index => {
                        let index = self.eval(index)?;
                        self.set_item(&object, index, value, location)
                    }
                }
            }
            _ => Err(RuntimeError::Syntax {
                message: "cannot assign to expression".to_string(),
                location,
            }),
        }
    }

    pub(crate) fn exec_aug_assign(
        &mut self,
        target: &Expr,
        op: BinOp,
        value: &Expr,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name, loc) => {
                let current = self.lookup_name(name, *loc)?;
                let rhs = self.eval(value)?;
                let updated = self.inplace_op(op, current, rhs, location)?;
                self.store_name(name, updated);
            }
            Expr::Attribute { object, name, .. } => {
                let object = self.eval(object)?;
                let current = self.get_attr(&object, name, location)?;
                let rhs = self.eval(value)?;
                let updated = self.inplace_op(op, current, rhs, location)?;
                self.set_attr(&object, name, updated, location)?;
            }
            Expr::Subscript { object, index, .. } => {
                if matches!(index.as_ref(), Expr::Slice { .. }) {
                    return Err(RuntimeError::Unsupported {
                        message: "augmented assignment to a slice".to_string(),
                        location,
                    });
                }
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = self.get_item(&object, &index, location)?;
                let rhs = self.eval(value)?;
                let updated = self.inplace_op(op, current, rhs, location)?;
                self.set_item(&object, index, updated, location)?;
            }
            _ => {
                return Err(RuntimeError::Syntax {
                    message: "illegal expression for augmented assignment".to_string(),
                    location,
                })
            }
        }
        Ok(())
    }

    /// `left op= right`: lists and sets are updated in place, everything
    /// else falls back to the binary operator
    fn inplace_op(
        &mut self,
        op: BinOp,
        left: Value,
        right: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let Some(id) = left.as_ref_id() else {
            return self.binary_op(op, left, right, location);
        };
        match (self.heap.get(id), op) {
            (Some(HeapData::List(_)), BinOp::Add) => {
                let extra = self.collect_items(&right, location)?;
                if let Some(HeapData::List(list)) = self.heap.get_mut(id) {
                    list.items.extend(extra);
                }
                Ok(left)
            }
            (Some(HeapData::Set(_)), BinOp::BitOr | BinOp::BitAnd | BinOp::Sub | BinOp::BitXor)
                if matches!(self.heap.deref(&right), Some(HeapData::Set(_))) =>
            {
                let combined = self.binary_op(op, left.clone(), right, location)?;
                let result = match self.heap.deref(&combined) {
                    Some(HeapData::Set(set)) => set.clone(),
                    _ => return Ok(combined),
                };
                if let Some(HeapData::Set(set)) = self.heap.get_mut(id) {
                    *set = result;
                }
                Ok(left)
            }
            _ => self.binary_op(op, left, right, location),
        }
    }

    pub(crate) fn delete_target(
        &mut self,
        target: &Expr,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name, loc) => self.delete_name(name, *loc),
            Expr::Tuple { items, .. } | Expr::List { items, .. } => {
                for item in items {
                    self.delete_target(item, location)?;
                }
                Ok(())
            }
            Expr::Attribute { object, name, .. } => {
                let object = self.eval(object)?;
                self.del_attr(&object, name, location)
            }
            Expr::Subscript { object, index, .. } => {
                let object = self.eval(object)?;
                match index.as_ref() {
                    Expr::Slice {
                        lower, upper, step, ..
                    } => {
                        let bounds = self.eval_slice_bounds(lower, upper, step)?;
                        self.del_slice(&object, bounds, location)
                    }
                    index => {
                        let index = self.eval(index)?;
                        self.del_item(&object, &index, location)
                    }
                }
            }
            _ => Err(RuntimeError::Syntax {
                message: "cannot delete expression".to_string(),
                location,
            }),
        }
    }

    /// Evaluate parameter defaults in the defining scope
    pub(crate) fn eval_defaults(&mut self, params: &[Param]) -> Result<Vec<Value>, RuntimeError> {
        let mut defaults = Vec::new();
        for param in params {
            if let Some(default) = &param.default {
                defaults.push(self.eval(default)?);
            }
        }
        Ok(defaults)
    }

    pub(crate) fn exec_def(
        &mut self,
        name: &str,
        params: &[Param],
        body: &[Stmt],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let function = FunctionObject {
            name: name.to_string(),
            params: params.iter().map(|p| p.name.clone()).collect(),
            defaults: self.eval_defaults(params)?,
            body: FunctionBody::Block(Rc::from(body.to_vec())),
            closure: self.enclosing_scope(),
            owner: None,
            line: location.line,
        };
        let value = self.alloc(HeapData::Function(Rc::new(function)), location)?;
        self.store_name(name, value);
        Ok(())
    }

    pub(crate) fn exec_class(
        &mut self,
        name: &str,
        base: Option<&Expr>,
        body: &[Stmt],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let (base_class, builtin_base) = match base {
            None => (None, None),
            Some(expr) => match self.eval(expr)? {
                Value::Builtin(Builtin::Object) => (None, None),
                Value::Builtin(b @ Builtin::Exception(_)) => (None, Some(b)),
                Value::Ref(id) if matches!(self.heap.get(id), Some(HeapData::Class(_))) => {
                    (Some(id), None)
                }
                Value::Builtin(b) if b.is_type() => {
                    return Err(RuntimeError::Unsupported {
                        message: format!("subclassing built-in type '{}'", b.name()),
                        location,
                    })
                }
                other => {
                    return Err(RuntimeError::type_error(
                        format!(
                            "cannot inherit from '{}' object",
                            self.heap.type_name(&other)
                        ),
                        location,
                    ))
                }
            },
        };

        let scope = Scope::new(self.enclosing_scope());
        self.push_frame(
            Frame::new(FrameKind::Class(name.to_string()), scope.clone()),
            location,
        )?;
        let result = self.exec_block(body);
        self.stack.pop();
        match result? {
            Flow::Normal => {}
            Flow::Return(_) => {
                return Err(RuntimeError::Syntax {
                    message: "'return' outside function".to_string(),
                    location,
                })
            }
            Flow::Break | Flow::Continue => {
                return Err(RuntimeError::Syntax {
                    message: "'break' outside loop".to_string(),
                    location,
                })
            }
        }

        let mut class = ClassObject::new(name, base_class);
        class.builtin_base = builtin_base;
        class.attrs = scope.vars().clone();
        let methods: Vec<_> = class.attrs.values().filter_map(Value::as_ref_id).collect();
        let class_value = self.alloc(HeapData::Class(class), location)?;
        let class_id = class_value.as_ref_id();

        // Functions defined in the body belong to this class (for super())
        for id in methods {
            if let Some(HeapData::Function(function)) = self.heap.get_mut(id) {
                if function.owner.is_none() {
                    Rc::make_mut(function).owner = class_id;
                }
            }
        }

        self.store_name(name, class_value);
        Ok(())
    }

    /// Build the error a `raise` statement propagates
    pub(crate) fn exec_raise(
        &mut self,
        exception: Option<&Expr>,
        location: SourceLocation,
    ) -> Result<RuntimeError, RuntimeError> {
        let Some(expr) = exception else {
            return Ok(RuntimeError::Raised {
                kind: "RuntimeError".to_string(),
                message: "No active exception to reraise".to_string(),
                location,
            });
        };
        let value = self.eval(expr)?;
        self.exception_from(&value, location)
    }

    fn exception_from(
        &mut self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<RuntimeError, RuntimeError> {
        let raised = |kind: String, message: String| RuntimeError::Raised {
            kind,
            message,
            location,
        };
        match value {
            Value::Builtin(Builtin::Exception(kind)) => Ok(raised(kind.to_string(), String::new())),
            Value::Ref(id) => match self.heap.get(*id) {
                Some(HeapData::Exception { kind, message }) => {
                    Ok(raised(kind.to_string(), message.clone()))
                }
                Some(HeapData::Class(class)) if self.heap.exception_base(*id).is_some() => {
                    Ok(raised(class.name.clone(), String::new()))
                }
                Some(HeapData::Instance(instance))
                    if self.heap.exception_base(instance.class).is_some() =>
                {
                    let kind = self.heap.class_name(instance.class);
                    let message = self.display_str(value, location)?;
                    Ok(raised(kind, message))
                }
                _ => Err(not_an_exception(location)),
            },
            _ => Err(not_an_exception(location)),
        }
    }

    pub(crate) fn exec_assert(
        &mut self,
        condition: &Expr,
        message: Option<&Expr>,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let test = self.eval(condition)?;
        if self.test_truth(&test, location)? {
            return Ok(());
        }
        let message = match message {
            Some(expr) => {
                let value = self.eval(expr)?;
                self.display_str(&value, location)?
            }
            None => String::new(),
        };
        Err(RuntimeError::Raised {
            kind: "AssertionError".to_string(),
            message,
            location,
        })
    }

    pub(crate) fn exec_import_from(
        &mut self,
        module: &str,
        names: &[(String, Option<String>)],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let module_value = self.import_module(module, location)?;
        for (name, alias) in names {
            let value = match self.heap.deref(&module_value) {
                Some(HeapData::Module(m)) => m.attrs.get(name).cloned(),
                _ => None,
            }
            .ok_or_else(|| RuntimeError::ImportName {
                name: name.clone(),
                module: module.to_string(),
                location,
            })?;
            self.store_name(alias.as_deref().unwrap_or(name), value);
        }
        Ok(())
    }
}

fn not_an_exception(location: SourceLocation) -> RuntimeError {
    RuntimeError::type_error("exceptions must derive from BaseException", location)
}
