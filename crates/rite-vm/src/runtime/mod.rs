// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Runtime environment and host entry.
//!
//! [`Env`] is the explicit process-wide handle: the pool allocator, the
//! symbol interner, the built-in class graph and the global/constant
//! tables all hang off it so tests can instantiate isolated
//! environments - there are no true globals.
//!
//! Host entry is `Env::init` -> `Env::create_task` -> `Env::run`.
//! A [`Task`] borrows its bytecode buffer for its whole lifetime, which
//! is what keeps the loader's zero-copy irep borrows sound.

#[cfg(test)]
mod runtime_test;

use crate::class::ClassSet;
use crate::console::Console;
use crate::loader::{self, Irep, LoadError};
use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::symbol::{SymId, SymbolTable};
use crate::types::Addr;
use crate::value::printer::{class_name, print_value};
use crate::value::string::string_bytes;
use crate::value::{Value, heap, rc};
use crate::vm::Vm;

/// Capacity of the global-variable table.
pub const MAX_GLOBALS: usize = 64;

/// Capacity of the constant table (includes the built-in classes).
pub const MAX_CONSTS: usize = 96;

/// Exit code for normal completion of all tasks.
pub const EXIT_OK: i32 = 1;

/// Exit code for an aborted task.
pub const EXIT_ABORTED: i32 = 0;

/// Fixed-capacity symbol-to-value table (globals, constants).
pub struct VarTable<const N: usize> {
    entries: [(SymId, Value); N],
    len: usize,
}

impl<const N: usize> VarTable<N> {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [(SymId::new(0), Value::Nil); N],
            len: 0,
        }
    }

    /// Look up a symbol; the result is borrowed (no count change).
    #[must_use]
    pub fn get(&self, sym: SymId) -> Option<Value> {
        self.entries[..self.len]
            .iter()
            .find(|(s, _)| *s == sym)
            .map(|&(_, v)| v)
    }

    /// Insert or overwrite a binding. Takes ownership of `value`; an
    /// overwritten value is released. `None` (value released) when the
    /// table is full.
    pub fn set<M: MemorySpace>(
        &mut self,
        mem: &mut M,
        pool: &mut MemPool,
        sym: SymId,
        value: Value,
    ) -> Option<()> {
        for entry in &mut self.entries[..self.len] {
            if entry.0 == sym {
                let old = core::mem::replace(&mut entry.1, value);
                rc::release(mem, pool, old);
                return Some(());
            }
        }
        if self.len >= N {
            rc::release(mem, pool, value);
            return None;
        }
        self.entries[self.len] = (sym, value);
        self.len += 1;
        Some(())
    }
}

impl<const N: usize> Default for VarTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide runtime environment.
pub struct Env {
    /// The pool allocator over the caller-supplied region.
    pub pool: MemPool,
    /// The symbol interner.
    pub syms: SymbolTable,
    /// The built-in class graph.
    pub classes: ClassSet,
    /// Constants (`A = 1`, class names).
    pub consts: VarTable<MAX_CONSTS>,
    /// Global variables (`$g`).
    pub globals: VarTable<MAX_GLOBALS>,
}

impl Env {
    /// Build an environment over `[base, base+size)` of `mem`:
    /// create the pool, bootstrap the class graph, install the builtin
    /// method set, and publish the class constants.
    ///
    /// Returns `None` when the region cannot hold the bootstrap data.
    pub fn init<M: MemorySpace>(mem: &mut M, base: Addr, size: u32) -> Option<Self> {
        let mut pool = MemPool::new(mem, base, size)?;
        let mut syms = SymbolTable::new();
        let classes = ClassSet::bootstrap(mem, &mut pool, &mut syms)?;
        crate::builtins::install(mem, &mut pool, &mut syms, &classes)?;

        let mut env = Self {
            pool,
            syms,
            classes,
            consts: VarTable::new(),
            globals: VarTable::new(),
        };

        // Classes are reachable as constants by their names.
        let class_list = [
            classes.object,
            classes.nil,
            classes.true_class,
            classes.false_class,
            classes.integer,
            classes.float,
            classes.symbol,
            classes.string,
            classes.array,
            classes.hash,
            classes.range,
            classes.proc_class,
            classes.exception,
            classes.standard_error,
            classes.runtime_error,
            classes.type_error,
            classes.argument_error,
            classes.index_error,
            classes.range_error,
            classes.nomemory_error,
            classes.bytecode_error,
        ];
        for cls in class_list {
            let header: heap::RClass = mem.read(cls);
            let value = Value::Class(cls);
            rc::incref(mem, value);
            env.consts.set(mem, &mut env.pool, header.name, value)?;
        }

        Some(env)
    }

    /// Load a RITE02 buffer into a task.
    ///
    /// The task borrows `buf`; every irep's code and literals point
    /// into it.
    pub fn create_task<'buf, M: MemorySpace>(
        &mut self,
        mem: &mut M,
        buf: &'buf [u8],
    ) -> Result<Task<'buf>, LoadError> {
        let root = loader::load(mem, &mut self.pool, &mut self.syms, buf)?;
        Ok(Task {
            buf,
            root,
            released: false,
        })
    }

    /// Run a task to completion.
    ///
    /// Returns [`EXIT_OK`] on normal completion, [`EXIT_ABORTED`] when
    /// the task died on an unhandled exception or a machine error
    /// (either is reported on the console).
    pub fn run<M: MemorySpace, C: Console>(
        &mut self,
        mem: &mut M,
        console: &mut C,
        task: &Task<'_>,
    ) -> i32 {
        let mut vm = Vm::new();
        vm.boot(self, task.root);

        let result = vm.run(self, mem, console, task.buf);

        let code = match result {
            Err(_) => {
                console.write_str("task aborted: bytecode execution failed\n");
                EXIT_ABORTED
            }
            Ok(()) if !vm.exc.is_nil() => {
                self.report_exception(mem, console, vm.exc);
                EXIT_ABORTED
            }
            Ok(()) => EXIT_OK,
        };

        // Drop every root the VM still holds so the pool drains.
        for i in 0..crate::vm::MAX_REGS {
            let value = core::mem::replace(&mut vm.regs[i], Value::Empty);
            rc::release(mem, &mut self.pool, value);
        }
        let exc = core::mem::replace(&mut vm.exc, Value::Nil);
        rc::release(mem, &mut self.pool, exc);

        code
    }

    /// `Exception: <message> (<class>)` on the console.
    fn report_exception<M: MemorySpace, C: Console>(
        &self,
        mem: &M,
        console: &mut C,
        exc: Value,
    ) {
        console.write_str("Exception: ");
        if let Value::Exception(addr) = exc {
            let header: heap::RException = mem.read(addr);
            if let Value::String(msg) = header.message {
                console.write_bytes(string_bytes(mem, msg));
            } else {
                console.write_bytes(class_name(mem, &self.syms, header.cls));
            }
            console.write_str(" (");
            console.write_bytes(class_name(mem, &self.syms, header.cls));
            console.write_str(")");
        } else {
            print_value(mem, &self.syms, exc, true, console);
        }
        console.write_str("\n");
    }
}

/// One loaded program: the borrowed bytecode buffer plus the owned
/// irep tree.
pub struct Task<'buf> {
    /// The RITE02 container; outlives every irep loaded from it.
    pub buf: &'buf [u8],
    /// Root of the irep tree.
    pub root: Irep,
    released: bool,
}

impl Task<'_> {
    /// Release the irep tree, returning its pool bytes.
    pub fn release<M: MemorySpace>(&mut self, mem: &mut M, env: &mut Env) {
        if !self.released {
            loader::release_irep(mem, &mut env.pool, self.root);
            self.released = true;
        }
    }
}
