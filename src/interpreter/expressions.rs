//! Expression evaluation
//!
//! Operators first give user-defined classes a chance through their dunder
//! methods (`__add__`, `__eq__`, `__lt__`, `__str__`, ...) and otherwise fall
//! back to the value-level implementations in [`ops`].
//!
//! Comprehensions run in a temporary frame of their own, so their loop
//! variables do not leak, and fire no statement boundaries.

use crate::interpreter::constants::MAX_EVAL_DEPTH;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::formatting::format_value;
use crate::interpreter::ops;
use crate::interpreter::LineHook;
use crate::memory::format::{py_repr, py_str};
use crate::memory::heap::{DictObject, FunctionBody, FunctionObject, HeapData};
use crate::memory::stack::{Frame, FrameKind, Scope};
use crate::memory::value::Value;
use crate::parser::ast::*;
use std::cmp::Ordering;
use std::rc::Rc;

/// Nesting limit for element-wise ordering of sequences
const MAX_ORDER_DEPTH: usize = 200;

fn dunder_for(op: BinOp) -> (&'static str, &'static str) {
    match op {
        BinOp::Add => ("__add__", "__radd__"),
        BinOp::Sub => ("__sub__", "__rsub__"),
        BinOp::Mul => ("__mul__", "__rmul__"),
        BinOp::Div => ("__truediv__", "__rtruediv__"),
        BinOp::FloorDiv => ("__floordiv__", "__rfloordiv__"),
        BinOp::Mod => ("__mod__", "__rmod__"),
        BinOp::Pow => ("__pow__", "__rpow__"),
        BinOp::BitAnd => ("__and__", "__rand__"),
        BinOp::BitOr => ("__or__", "__ror__"),
        BinOp::BitXor => ("__xor__", "__rxor__"),
        BinOp::Shl => ("__lshift__", "__rlshift__"),
        BinOp::Shr => ("__rshift__", "__rrshift__"),
    }
}

/// Method for an ordering operator and its reflection
fn ordering_dunders(op: CmpOp) -> (&'static str, &'static str, &'static str) {
    match op {
        CmpOp::Lt => ("__lt__", "__gt__", "<"),
        CmpOp::Le => ("__le__", "__ge__", "<="),
        CmpOp::Gt => ("__gt__", "__lt__", ">"),
        _ => ("__ge__", "__le__", ">="),
    }
}

impl<H: LineHook> Interpreter<H> {
    /// Evaluate `expr`; nesting across calls is capped at [`MAX_EVAL_DEPTH`]
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        if self.eval_depth >= MAX_EVAL_DEPTH {
            return Err(RuntimeError::RecursionLimit {
                location: expr.location(),
            });
        }
        self.eval_depth += 1;
        let result = self.eval_node(expr);
        self.eval_depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::NoneLiteral(_) => Ok(Value::None),
            Expr::BoolLiteral(b, _) => Ok(Value::Bool(*b)),
            Expr::IntLiteral(n, _) => Ok(Value::Int(*n)),
            Expr::FloatLiteral(f, _) => Ok(Value::Float(*f)),
            Expr::StringLiteral(s, _) => Ok(Value::str(s.as_str())),
            Expr::FString { parts, location } => self.eval_fstring(parts, *location),
            Expr::Name(name, location) => self.lookup_name(name, *location),

            Expr::List { items, location } => {
                let items = self.eval_all(items)?;
                self.alloc_list(items, *location)
            }
            Expr::Tracked { inner, location } => match inner.as_ref() {
                Expr::List { items, .. } => {
                    let items = self.eval_all(items)?;
                    self.alloc_tracked_list(items, *location)
                }
                other => self.eval(other),
            },
            Expr::Tuple { items, location } => {
                let items = self.eval_all(items)?;
                self.alloc_tuple(items, *location)
            }
            Expr::Dict { entries, location } => {
                let mut dict = DictObject::default();
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    let hashed = self.hash_key(&key, *location)?;
                    dict.insert(hashed, key, value);
                }
                self.alloc(HeapData::Dict(dict), *location)
            }
            Expr::Set { items, location } => {
                let items = self.eval_all(items)?;
                let set = self.build_set(items, *location)?;
                self.alloc(HeapData::Set(set), *location)
            }
            Expr::ListComp {
                element,
                generators,
                location,
            } => {
                let mut out = Vec::new();
                self.in_comprehension_frame(*location, |this| {
                    this.run_generators(generators, &mut |this| {
                        out.push(this.eval(element)?);
                        Ok(())
                    })
                })?;
                self.alloc_list(out, *location)
            }
            Expr::DictComp {
                key,
                value,
                generators,
                location,
            } => {
                let mut dict = DictObject::default();
                self.in_comprehension_frame(*location, |this| {
                    this.run_generators(generators, &mut |this| {
                        let k = this.eval(key)?;
                        let v = this.eval(value)?;
                        let hashed = this.hash_key(&k, *location)?;
                        dict.insert(hashed, k, v);
                        Ok(())
                    })
                })?;
                self.alloc(HeapData::Dict(dict), *location)
            }

            Expr::BinaryOp {
                op,
                left,
                right,
                location,
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary_op(*op, left, right, *location)
            }
            Expr::UnaryOp {
                op,
                operand,
                location,
            } => {
                let value = self.eval(operand)?;
                self.unary_op(*op, value, *location)
            }
            Expr::BoolOp {
                op, left, right, ..
            } => {
                let left_value = self.eval(left)?;
                let truth = self.test_truth(&left_value, left.location())?;
                match (op, truth) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left_value),
                    _ => self.eval(right),
                }
            }
            Expr::Compare {
                left,
                comparisons,
                location,
            } => {
                let mut current = self.eval(left)?;
                for (op, right) in comparisons {
                    let right = self.eval(right)?;
                    if !self.compare_op(*op, &current, &right, *location)? {
                        return Ok(Value::Bool(false));
                    }
                    current = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::IfExp {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                let test = self.eval(condition)?;
                if self.test_truth(&test, condition.location())? {
                    self.eval(then_expr)
                } else {
                    self.eval(else_expr)
                }
            }
            Expr::Lambda {
                params,
                body,
                location,
            } => {
                let function = FunctionObject {
                    name: "<lambda>".to_string(),
                    params: params.iter().map(|p| p.name.clone()).collect(),
                    defaults: self.eval_defaults(params)?,
                    body: FunctionBody::Lambda(Rc::new(body.as_ref().clone())),
                    closure: self.enclosing_scope(),
                    owner: None,
                    line: location.line,
                };
                self.alloc(HeapData::Function(Rc::new(function)), *location)
            }

            Expr::Call {
                func,
                args,
                keywords,
                location,
            } => {
                if let Expr::Attribute { object, name, .. } = func.as_ref() {
                    let receiver = self.eval(object)?;
                    let (args, kwargs) = self.eval_arguments(args, keywords)?;
                    return self.call_method(&receiver, name, args, kwargs, *location);
                }
                let callee = self.eval(func)?;
                let (args, kwargs) = self.eval_arguments(args, keywords)?;
                self.call_value(&callee, args, kwargs, *location)
            }
            Expr::Attribute {
                object,
                name,
                location,
            } => {
                let object = self.eval(object)?;
                self.get_attr(&object, name, *location)
            }
            Expr::Subscript {
                object,
                index,
                location,
            } => {
                let object = self.eval(object)?;
                match index.as_ref() {
                    Expr::Slice {
                        lower, upper, step, ..
                    } => {
                        let bounds = self.eval_slice_bounds(lower, upper, step)?;
                        self.get_slice(&object, bounds, *location)
                    }
                    index => {
                        let index = self.eval(index)?;
                        self.get_item(&object, &index, *location)
                    }
                }
            }
            Expr::Slice { location, .. } => Err(RuntimeError::Syntax {
                message: "slice outside of a subscript".to_string(),
                location: *location,
            }),
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval_arguments(
        &mut self,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Result<(Vec<Value>, Vec<(String, Value)>), RuntimeError> {
        let args = self.eval_all(args)?;
        let mut kwargs = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            kwargs.push((keyword.name.clone(), self.eval(&keyword.value)?));
        }
        Ok((args, kwargs))
    }

    fn eval_fstring(
        &mut self,
        parts: &[FStringPart],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let mut out = String::new();
        for part in parts {
            match part {
                FStringPart::Literal(text) => out.push_str(text),
                FStringPart::Expr { expr, spec } => {
                    let value = self.eval(expr)?;
                    match spec.as_deref() {
                        None | Some("") => out.push_str(&self.display_str(&value, location)?),
                        Some(spec) => out.push_str(&format_value(&self.heap, &value, spec, location)?),
                    }
                }
            }
        }
        Ok(Value::str(out))
    }

    /// Run `body` in a throwaway frame whose scope sees the current one
    fn in_comprehension_frame(
        &mut self,
        location: SourceLocation,
        body: impl FnOnce(&mut Self) -> Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let current = self.stack.current();
        let parent = match current.kind {
            FrameKind::Class(_) => current.scope.parent().cloned(),
            _ => Some(current.scope.clone()),
        };
        let globals_declared = current.globals_declared.clone();
        let method_of = current.method_of.clone();
        let line = current.line;

        let mut frame = Frame::new(FrameKind::Function("<listcomp>".to_string()), Scope::new(parent));
        frame.globals_declared = globals_declared;
        frame.method_of = method_of;
        frame.line = line;
        self.push_frame(frame, location)?;
        let result = body(self);
        self.stack.pop();
        result
    }

    /// Drive nested `for ... in ... if ...` clauses, calling `emit` for
    /// every combination that passes all conditions
    pub(crate) fn run_generators(
        &mut self,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Self) -> Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let Some((first, rest)) = generators.split_first() else {
            return emit(self);
        };
        let iterable = self.eval(&first.iter)?;
        let location = first.iter.location();
        let mut items = self.iterate(&iterable, location)?;
        'items: while let Some(item) = self.next_item(&mut items) {
            self.assign_target(&first.target, item, location)?;
            for condition in &first.conditions {
                let test = self.eval(condition)?;
                if !self.test_truth(&test, condition.location())? {
                    continue 'items;
                }
            }
            self.run_generators(rest, emit)?;
        }
        Ok(())
    }

    // ---- Truth, operators and comparisons ----

    pub(crate) fn truthy(&self, value: &Value) -> bool {
        ops::truthy(&self.heap, value)
    }

    /// Truth value for conditions; instances may define `__bool__` or
    /// `__len__`
    pub(crate) fn test_truth(
        &mut self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<bool, RuntimeError> {
        if self.is_user_instance(value) {
            if let Some(result) = self.call_dunder(value, "__bool__", Vec::new(), location)? {
                return match result {
                    Value::Bool(b) => Ok(b),
                    other => Err(RuntimeError::type_error(
                        format!(
                            "__bool__ should return bool, returned {}",
                            self.heap.type_name(&other)
                        ),
                        location,
                    )),
                };
            }
            if let Some(result) = self.call_dunder(value, "__len__", Vec::new(), location)? {
                return Ok(result.as_int().is_some_and(|n| n != 0));
            }
        }
        Ok(self.truthy(value))
    }

    pub(crate) fn is_user_instance(&self, value: &Value) -> bool {
        matches!(self.heap.deref(value), Some(HeapData::Instance(_)))
    }

    pub(crate) fn binary_op(
        &mut self,
        op: BinOp,
        left: Value,
        right: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if self.is_user_instance(&left) || self.is_user_instance(&right) {
            let (method, reflected) = dunder_for(op);
            if let Some(result) = self.call_dunder(&left, method, vec![right.clone()], location)? {
                return Ok(result);
            }
            if let Some(result) = self.call_dunder(&right, reflected, vec![left.clone()], location)? {
                return Ok(result);
            }
        }
        ops::binary(&mut self.heap, op, &left, &right, location)
    }

    fn unary_op(
        &mut self,
        op: UnOp,
        value: Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if op == UnOp::Not {
            return Ok(Value::Bool(!self.test_truth(&value, location)?));
        }
        if self.is_user_instance(&value) {
            let method = match op {
                UnOp::Neg => "__neg__",
                UnOp::Pos => "__pos__",
                _ => "__invert__",
            };
            if let Some(result) = self.call_dunder(&value, method, Vec::new(), location)? {
                return Ok(result);
            }
        }
        ops::unary(&self.heap, op, &value, location)
    }

    /// `left == right`, honouring `__eq__`
    pub(crate) fn values_eq(
        &mut self,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<bool, RuntimeError> {
        for (receiver, other) in [(left, right), (right, left)] {
            if self.is_user_instance(receiver) {
                if let Some(result) =
                    self.call_dunder(receiver, "__eq__", vec![other.clone()], location)?
                {
                    return self.test_truth(&result, location);
                }
            }
        }
        Ok(ops::is_same(left, right) || ops::values_equal(&self.heap, left, right))
    }

    pub(crate) fn compare_op(
        &mut self,
        op: CmpOp,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<bool, RuntimeError> {
        match op {
            CmpOp::Eq => self.values_eq(left, right, location),
            CmpOp::Ne => {
                if self.is_user_instance(left) {
                    if let Some(result) =
                        self.call_dunder(left, "__ne__", vec![right.clone()], location)?
                    {
                        return self.test_truth(&result, location);
                    }
                }
                Ok(!self.values_eq(left, right, location)?)
            }
            CmpOp::Is => Ok(ops::is_same(left, right)),
            CmpOp::IsNot => Ok(!ops::is_same(left, right)),
            CmpOp::In | CmpOp::NotIn => {
                let found = if self.is_user_instance(right) {
                    match self.call_dunder(right, "__contains__", vec![left.clone()], location)? {
                        Some(result) => self.test_truth(&result, location)?,
                        None => {
                            let items = self.collect_items(right, location)?;
                            let mut found = false;
                            for item in &items {
                                if self.values_eq(item, left, location)? {
                                    found = true;
                                    break;
                                }
                            }
                            found
                        }
                    }
                } else {
                    ops::contains(&self.heap, right, left, location)?
                };
                Ok(found == (op == CmpOp::In))
            }
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                let (method, reflected, symbol) = ordering_dunders(op);
                if self.is_user_instance(left) || self.is_user_instance(right) {
                    if let Some(result) =
                        self.call_dunder(left, method, vec![right.clone()], location)?
                    {
                        return self.test_truth(&result, location);
                    }
                    if let Some(result) =
                        self.call_dunder(right, reflected, vec![left.clone()], location)?
                    {
                        return self.test_truth(&result, location);
                    }
                }
                let ordering = if self.same_kind_sequences(left, right) {
                    Some(self.order_at(left, right, location, 0)?)
                } else {
                    ops::compare(&self.heap, left, right, symbol, location)?
                };
                Ok(match ordering {
                    None => false,
                    Some(ord) => match op {
                        CmpOp::Lt => ord == Ordering::Less,
                        CmpOp::Le => ord != Ordering::Greater,
                        CmpOp::Gt => ord == Ordering::Greater,
                        _ => ord != Ordering::Less,
                    },
                })
            }
        }
    }

    fn same_kind_sequences(&self, left: &Value, right: &Value) -> bool {
        matches!(
            (self.heap.deref(left), self.heap.deref(right)),
            (Some(HeapData::List(_)), Some(HeapData::List(_)))
                | (Some(HeapData::Tuple(_)), Some(HeapData::Tuple(_)))
        )
    }

    /// Total order used by `sorted`, `min`, `max` and `heapq`. Unordered
    /// floats (NaN) compare equal.
    pub(crate) fn compare_values(
        &mut self,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<Ordering, RuntimeError> {
        self.order_at(left, right, location, 0)
    }

    fn order_at(
        &mut self,
        left: &Value,
        right: &Value,
        location: SourceLocation,
        depth: usize,
    ) -> Result<Ordering, RuntimeError> {
        if depth > MAX_ORDER_DEPTH {
            return Err(RuntimeError::RecursionLimit { location });
        }
        if self.same_kind_sequences(left, right) {
            let l = self.collect_items(left, location)?;
            let r = self.collect_items(right, location)?;
            for (x, y) in l.iter().zip(r.iter()) {
                if !self.values_eq(x, y, location)? {
                    return self.order_at(x, y, location, depth + 1);
                }
            }
            return Ok(l.len().cmp(&r.len()));
        }
        if self.is_user_instance(left) || self.is_user_instance(right) {
            if self.compare_op(CmpOp::Lt, left, right, location)? {
                return Ok(Ordering::Less);
            }
            if self.compare_op(CmpOp::Lt, right, left, location)? {
                return Ok(Ordering::Greater);
            }
            return Ok(Ordering::Equal);
        }
        Ok(ops::compare(&self.heap, left, right, "<", location)?.unwrap_or(Ordering::Equal))
    }

    // ---- Dunder dispatch and display ----

    /// Call `name` on a user instance's class, if the class defines it
    pub(crate) fn call_dunder(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Option<Value>, RuntimeError> {
        let Some(HeapData::Instance(instance)) = self.heap.deref(receiver) else {
            return Ok(None);
        };
        let Some(method) = self.heap.class_attr(instance.class, name) else {
            return Ok(None);
        };
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(receiver.clone());
        full.extend(args);
        self.call_value(&method, full, Vec::new(), location).map(Some)
    }

    /// `str(value)`
    pub(crate) fn display_str(
        &mut self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<String, RuntimeError> {
        match self.heap.deref(value) {
            Some(HeapData::Instance(instance)) => {
                let message = instance.fields.get("__message__").cloned();
                for method in ["__str__", "__repr__"] {
                    if let Some(result) = self.call_dunder(value, method, Vec::new(), location)? {
                        return self.expect_str(result, method, location);
                    }
                }
                if let Some(message) = message {
                    return Ok(py_str(&self.heap, &message));
                }
                Ok(py_str(&self.heap, value))
            }
            Some(HeapData::Exception { message, .. }) => Ok(message.clone()),
            _ => Ok(py_str(&self.heap, value)),
        }
    }

    /// `repr(value)`
    pub(crate) fn display_repr(
        &mut self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<String, RuntimeError> {
        if let Some(result) = self.call_dunder(value, "__repr__", Vec::new(), location)? {
            return self.expect_str(result, "__repr__", location);
        }
        Ok(py_repr(&self.heap, value))
    }

    fn expect_str(
        &self,
        value: Value,
        method: &str,
        location: SourceLocation,
    ) -> Result<String, RuntimeError> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(RuntimeError::type_error(
                format!(
                    "{} returned non-string (type {})",
                    method,
                    self.heap.type_name(&other)
                ),
                location,
            )),
        }
    }

    /// Whether `value` can be called
    pub(crate) fn is_callable(&self, value: &Value) -> bool {
        match value {
            Value::Builtin(_) => true,
            Value::Ref(id) => match self.heap.get(*id) {
                Some(
                    HeapData::Function(_)
                    | HeapData::Class(_)
                    | HeapData::BoundMethod { .. }
                    | HeapData::BuiltinMethod { .. },
                ) => true,
                Some(HeapData::Instance(instance)) => {
                    self.heap.class_attr(instance.class, "__call__").is_some()
                }
                _ => false,
            },
            _ => false,
        }
    }
}
