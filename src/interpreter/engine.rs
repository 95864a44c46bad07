// Execution engine for the script interpreter

use crate::interpreter::builtins::Builtin;
use crate::interpreter::constants::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_OBJECTS};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::input::InputQueue;
use crate::interpreter::{FrameView, HookControl, LineHook};
use crate::memory::heap::{Heap, HeapData};
use crate::memory::stack::{Frame, FrameKind, Scope, Stack};
use crate::memory::tracked::AccessLog;
use crate::memory::value::{HashKey, Value};
use crate::parser::ast::*;
use crate::snapshot::OutputBuffer;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Resource ceilings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_call_depth: usize,
    pub max_objects: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_objects: DEFAULT_MAX_OBJECTS,
        }
    }
}

/// How a block of statements ended
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// The main interpreter that executes a script
pub struct Interpreter<H: LineHook> {
    /// Call stack; the module frame is at the bottom
    pub(crate) stack: Stack,

    /// Every object with identity
    pub(crate) heap: Heap,

    /// Captured `print` output
    pub(crate) output: OutputBuffer,

    /// Lines `input()` hands out
    pub(crate) inputs: InputQueue,

    /// Tracked-list accesses since the hook last drained them
    pub(crate) access_log: AccessLog,

    /// Imported modules by name, so repeated imports share one object
    pub(crate) modules: FxHashMap<String, Value>,

    pub(crate) limits: Limits,

    /// Observer of statement boundaries
    hook: H,

    /// Set once the hook asked to stop; every later boundary fails fast
    halted: bool,

    /// Line of the most recent boundary
    last_line: usize,

    /// Active `eval` frames, across calls
    pub(crate) eval_depth: usize,
}

impl<H: LineHook> Interpreter<H> {
    pub fn new(hook: H, inputs: InputQueue, limits: Limits) -> Self {
        Interpreter {
            stack: Stack::new(Scope::new(None)),
            heap: Heap::new(limits.max_objects),
            output: OutputBuffer::new(),
            inputs,
            access_log: AccessLog::new(),
            modules: FxHashMap::default(),
            limits,
            hook,
            halted: false,
            last_line: 0,
            eval_depth: 0,
        }
    }

    /// Execute a whole program in the module frame.
    ///
    /// `Err(RuntimeError::Halted)` and `Err(RuntimeError::NeedsInput)` are
    /// control outcomes, not failures; see [`RuntimeError::is_control_signal`].
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        tracing::debug!(statements = program.body.len(), "running program");
        match self.exec_block(&program.body)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(RuntimeError::Syntax {
                message: "'return' outside function".to_string(),
                location: SourceLocation::new(self.last_line, 0),
            }),
            Flow::Break | Flow::Continue => Err(RuntimeError::Syntax {
                message: "'break' outside loop".to_string(),
                location: SourceLocation::new(self.last_line, 0),
            }),
        }
    }

    /// Report the final module state to the hook after a completed run
    pub fn finish(&mut self) {
        let frame = self.stack.module();
        let view = FrameView {
            line: self.last_line,
            kind: &frame.kind,
            scope: &frame.scope,
            heap: &self.heap,
            stdout: self.output.as_str(),
            accesses: &self.access_log,
        };
        self.hook.on_finish(&view);
    }

    /// Give the hook back, consuming the interpreter
    pub fn into_hook(self) -> H {
        self.hook
    }

    pub fn stdout(&self) -> &str {
        self.output.as_str()
    }

    /// Module-level binding, if any
    pub fn global(&self, name: &str) -> Option<Value> {
        self.stack.globals().get(name)
    }

    /// Fire a statement boundary at `location` in the current frame
    pub(crate) fn boundary(&mut self, location: SourceLocation) -> Result<(), RuntimeError> {
        if self.halted {
            return Err(RuntimeError::Halted);
        }
        self.last_line = location.line;
        self.stack.current_mut().line = location.line;

        let frame = self.stack.current();
        let view = FrameView {
            line: location.line,
            kind: &frame.kind,
            scope: &frame.scope,
            heap: &self.heap,
            stdout: self.output.as_str(),
            accesses: &self.access_log,
        };
        match self.hook.on_line(&view) {
            HookControl::Continue => Ok(()),
            HookControl::Halt => {
                tracing::debug!(line = location.line, "hook halted execution");
                self.halted = true;
                Err(RuntimeError::Halted)
            }
        }
    }

    // ---- Names ----

    pub(crate) fn lookup_name(
        &self,
        name: &str,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let frame = self.stack.current();
        if !frame.globals_declared.contains(name) {
            if let Some(value) = frame.scope.lookup(name) {
                return Ok(value);
            }
        }
        if let Some(value) = self.stack.globals().get(name) {
            return Ok(value);
        }
        Builtin::lookup(name)
            .map(Value::Builtin)
            .ok_or_else(|| RuntimeError::UndefinedName {
                name: name.to_string(),
                location,
            })
    }

    pub(crate) fn store_name(&mut self, name: &str, value: Value) {
        let frame = self.stack.current();
        if frame.globals_declared.contains(name) {
            self.stack.globals().set(name, value);
        } else {
            frame.scope.set(name, value);
        }
    }

    pub(crate) fn delete_name(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let frame = self.stack.current();
        let scope = if frame.globals_declared.contains(name) {
            self.stack.globals()
        } else {
            &frame.scope
        };
        scope
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::UndefinedName {
                name: name.to_string(),
                location,
            })
    }

    /// Scope a function or lambda defined here closes over. Class bodies are
    /// skipped: methods do not see the class namespace.
    pub(crate) fn enclosing_scope(&self) -> Option<Rc<Scope>> {
        let frame = self.stack.current();
        match frame.kind {
            FrameKind::Module => None,
            FrameKind::Function(_) => Some(frame.scope.clone()),
            FrameKind::Class(_) => frame.scope.parent().cloned(),
        }
    }

    pub(crate) fn push_frame(
        &mut self,
        frame: Frame,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if self.stack.depth() >= self.limits.max_call_depth {
            return Err(RuntimeError::RecursionLimit { location });
        }
        self.stack.push(frame);
        Ok(())
    }

    // ---- Allocation ----

    pub(crate) fn alloc(
        &mut self,
        data: HeapData,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        self.heap
            .alloc(data)
            .map(Value::Ref)
            .map_err(|e| RuntimeError::from_heap(e, location))
    }

    pub(crate) fn alloc_list(
        &mut self,
        items: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        self.heap
            .alloc_list(items)
            .map_err(|e| RuntimeError::from_heap(e, location))
    }

    pub(crate) fn alloc_tracked_list(
        &mut self,
        items: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        self.heap
            .alloc_tracked_list(items, &self.access_log)
            .map(Value::Ref)
            .map_err(|e| RuntimeError::from_heap(e, location))
    }

    pub(crate) fn alloc_tuple(
        &mut self,
        items: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        self.heap
            .alloc_tuple(items)
            .map_err(|e| RuntimeError::from_heap(e, location))
    }

    pub(crate) fn hash_key(
        &self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<HashKey, RuntimeError> {
        self.heap
            .hash_key(value)
            .map_err(|e| RuntimeError::from_heap(e, location))
    }

    // ---- Statements ----

    pub(crate) fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in body {
            let flow = self.exec_stmt(stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        self.boundary(stmt.location())?;

        match stmt {
            Stmt::Expr { expr, .. } => {
                self.eval(expr)?;
            }
            Stmt::Assign {
                targets,
                value,
                location,
            } => self.exec_assign(targets, value, *location)?,
            Stmt::AugAssign {
                target,
                op,
                value,
                location,
            } => self.exec_aug_assign(target, *op, value, *location)?,
            Stmt::If {
                condition,
                body,
                orelse,
                ..
            } => {
                let test = self.eval(condition)?;
                return if self.test_truth(&test, condition.location())? {
                    self.exec_block(body)
                } else {
                    self.exec_block(orelse)
                };
            }
            Stmt::While {
                condition,
                body,
                location,
            } => return self.exec_while(condition, body, *location),
            Stmt::For {
                target,
                iter,
                body,
                location,
            } => return self.exec_for(target, iter, body, *location),
            Stmt::Break { .. } => return Ok(Flow::Break),
            Stmt::Continue { .. } => return Ok(Flow::Continue),
            Stmt::Pass { .. } => {}
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::FunctionDef {
                name,
                params,
                body,
                location,
            } => self.exec_def(name, params, body, *location)?,
            Stmt::ClassDef {
                name,
                base,
                body,
                location,
            } => self.exec_class(name, base.as_ref(), body, *location)?,
            Stmt::Global { names, .. } => {
                let frame = self.stack.current_mut();
                if !frame.is_module() {
                    frame.globals_declared.extend(names.iter().cloned());
                }
            }
            Stmt::Raise {
                exception,
                location,
            } => return Err(self.exec_raise(exception.as_ref(), *location)?),
            Stmt::Assert {
                condition,
                message,
                location,
            } => self.exec_assert(condition, message.as_ref(), *location)?,
            Stmt::Delete { targets, location } => {
                for target in targets {
                    self.delete_target(target, *location)?;
                }
            }
            Stmt::Import {
                module,
                alias,
                location,
            } => {
                let value = self.import_module(module, *location)?;
                self.store_name(alias.as_deref().unwrap_or(module), value);
            }
            Stmt::ImportFrom {
                module,
                names,
                location,
            } => self.exec_import_from(module, names, *location)?,
        }
        Ok(Flow::Normal)
    }
}
