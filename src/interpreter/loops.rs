//! Loop statement execution (`while`, `for`) and the iteration protocol.
//!
//! A boundary fires at the loop header before every evaluation of it: the
//! first one comes from the statement itself, the rest fire after each pass
//! through the body. For `for` loops that includes the final fetch that
//! finds the iterable exhausted. `break` leaves without another boundary.
//!
//! Lists are iterated live (items appended during the loop are visited) and
//! without logging accesses. Other iterables are snapshotted when the loop
//! starts.

use crate::interpreter::constants::MAX_MATERIALIZED_ITEMS;
use crate::interpreter::engine::{Flow, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::ops;
use crate::interpreter::LineHook;
use crate::memory::heap::HeapData;
use crate::memory::value::{ObjId, Value};
use crate::parser::ast::{Expr, SourceLocation, Stmt};

/// Iteration state over a script value
#[derive(Debug)]
pub(crate) enum ValueIter {
    Range { next: i64, step: i64, remaining: usize },
    List { id: ObjId, position: usize },
    Items(std::vec::IntoIter<Value>),
}

impl<H: LineHook> Interpreter<H> {
    /// Executes a `while condition:` loop.
    pub(crate) fn exec_while(
        &mut self,
        condition: &Expr,
        body: &[Stmt],
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        loop {
            let test = self.eval(condition)?;
            if !self.test_truth(&test, condition.location())? {
                return Ok(Flow::Normal);
            }
            match self.exec_block(body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            self.boundary(location)?;
        }
    }

    /// Executes a `for target in iterable:` loop.
    pub(crate) fn exec_for(
        &mut self,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        location: SourceLocation,
    ) -> Result<Flow, RuntimeError> {
        let iterable = self.eval(iter)?;
        let mut items = self.iterate(&iterable, iter.location())?;
        loop {
            let Some(item) = self.next_item(&mut items) else {
                return Ok(Flow::Normal);
            };
            self.assign_target(target, item, location)?;
            match self.exec_block(body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            self.boundary(location)?;
        }
    }

    /// Start iterating over `value`
    pub(crate) fn iterate(
        &mut self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<ValueIter, RuntimeError> {
        let snapshot: Vec<Value> = match value {
            Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
            Value::Ref(id) => match self.heap.get(*id) {
                Some(HeapData::List(_)) => {
                    return Ok(ValueIter::List {
                        id: *id,
                        position: 0,
                    })
                }
                Some(HeapData::Range(range)) => {
                    return Ok(ValueIter::Range {
                        next: range.start,
                        step: range.step,
                        remaining: range.len(),
                    })
                }
                Some(HeapData::Tuple(items)) => items.clone(),
                Some(HeapData::Dict(dict)) => dict.keys().cloned().collect(),
                Some(HeapData::Set(set)) => set.values().cloned().collect(),
                Some(HeapData::Deque(items)) => items.iter().cloned().collect(),
                Some(HeapData::Instance(_)) => {
                    return match self.call_dunder(value, "__iter__", Vec::new(), location)? {
                        Some(inner) if inner != *value => self.iterate(&inner, location),
                        _ => Err(ops::not_iterable(&self.heap, value, location)),
                    }
                }
                _ => return Err(ops::not_iterable(&self.heap, value, location)),
            },
            _ => return Err(ops::not_iterable(&self.heap, value, location)),
        };
        Ok(ValueIter::Items(snapshot.into_iter()))
    }

    pub(crate) fn next_item(&self, iter: &mut ValueIter) -> Option<Value> {
        match iter {
            ValueIter::Range {
                next,
                step,
                remaining,
            } => {
                if *remaining == 0 {
                    return None;
                }
                let current = *next;
                *remaining -= 1;
                *next = next.wrapping_add(*step);
                Some(Value::Int(current))
            }
            ValueIter::List { id, position } => {
                let item = match self.heap.get(*id) {
                    Some(HeapData::List(list)) => list.items.get(*position).cloned(),
                    _ => None,
                };
                *position += 1;
                item
            }
            ValueIter::Items(items) => items.next(),
        }
    }

    /// Materialize every item of an iterable
    pub(crate) fn collect_items(
        &mut self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<Vec<Value>, RuntimeError> {
        // Fast paths that avoid the iterator for plain containers
        match self.heap.deref(value) {
            Some(HeapData::List(list)) => return Ok(list.items.clone()),
            Some(HeapData::Tuple(items)) => return Ok(items.clone()),
            Some(HeapData::Range(range)) if range.len() > MAX_MATERIALIZED_ITEMS => {
                return Err(RuntimeError::OutOfMemory {
                    message: format!("cannot materialize {} items", range.len()),
                    location,
                })
            }
            _ => {}
        }
        let mut iter = self.iterate(value, location)?;
        let mut items = Vec::new();
        while let Some(item) = self.next_item(&mut iter) {
            items.push(item);
        }
        Ok(items)
    }
}
