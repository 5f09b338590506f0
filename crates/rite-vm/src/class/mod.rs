// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Class registry and method lookup.
//!
//! Classes are pool payloads that are never torn down (the registry
//! pins one count). Each carries its name symbol, an optional
//! superclass and a singly-linked method chain; registration prepends,
//! lookup walks the chain and then ascends supers, and methods are
//! never unregistered - so a later definition shadows an earlier one
//! and is observed immediately.
//!
//! Method dispatch on a class receiver walks the class's own chain
//! (`C.new` finds `Object#new` through `C < Object`); instance and
//! class methods share one namespace, which is the usual trade of
//! runtimes this size.


use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::symbol::{SymId, SymbolTable};
use crate::types::Addr;
use crate::value::Value;
use crate::value::heap::{MethodNode, RClass, RException, RObject};
use crate::value::kv::{self, KvHandle};

use num_enum::TryFromPrimitive;

/// Discriminant stored in a method node's `kind` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum MethodKind {
    /// `target` is a builtin id (see [`crate::builtins`]).
    Native = 0,
    /// `target` is the pool address of an irep.
    Irep = 1,
    /// `target` is the symbol of the instance variable to read.
    IvarGetter = 2,
    /// `target` is the symbol of the instance variable to write.
    IvarSetter = 3,
}

/// A resolved method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Builtin, dispatched by id through a match.
    Native(u16),
    /// Script method body.
    Irep(Addr),
    /// Synthesized `attr_reader` body.
    IvarGetter(SymId),
    /// Synthesized `attr_accessor` writer body.
    IvarSetter(SymId),
}

/// The built-in class graph, created once at environment setup.
#[derive(Debug, Clone, Copy)]
pub struct ClassSet {
    /// Root of the hierarchy.
    pub object: Addr,
    /// Class of `nil`.
    pub nil: Addr,
    /// Class of `true`.
    pub true_class: Addr,
    /// Class of `false`.
    pub false_class: Addr,
    /// Class of integers.
    pub integer: Addr,
    /// Class of floats.
    pub float: Addr,
    /// Class of symbols.
    pub symbol: Addr,
    /// Class of strings.
    pub string: Addr,
    /// Class of arrays.
    pub array: Addr,
    /// Class of hashes.
    pub hash: Addr,
    /// Class of ranges.
    pub range: Addr,
    /// Class of procs.
    pub proc_class: Addr,
    /// Root of the exception hierarchy.
    pub exception: Addr,
    /// `StandardError < Exception`; what a bare `rescue` matches.
    pub standard_error: Addr,
    /// `RuntimeError < StandardError`.
    pub runtime_error: Addr,
    /// `TypeError < StandardError`.
    pub type_error: Addr,
    /// `ArgumentError < StandardError`.
    pub argument_error: Addr,
    /// `IndexError < StandardError`.
    pub index_error: Addr,
    /// `RangeError < StandardError`.
    pub range_error: Addr,
    /// `NoMemoryError < Exception`.
    pub nomemory_error: Addr,
    /// `BytecodeError < Exception`.
    pub bytecode_error: Addr,
}

impl ClassSet {
    /// Create the built-in class graph.
    ///
    /// Method shims are installed separately by
    /// [`crate::builtins::install`].
    pub fn bootstrap<M: MemorySpace>(
        mem: &mut M,
        pool: &mut MemPool,
        syms: &mut SymbolTable,
    ) -> Option<Self> {
        let object = define_class(mem, pool, syms, "Object", Addr::NULL)?;
        let exception = define_class(mem, pool, syms, "Exception", object)?;
        let standard_error = define_class(mem, pool, syms, "StandardError", exception)?;

        Some(Self {
            object,
            nil: define_class(mem, pool, syms, "NilClass", object)?,
            true_class: define_class(mem, pool, syms, "TrueClass", object)?,
            false_class: define_class(mem, pool, syms, "FalseClass", object)?,
            integer: define_class(mem, pool, syms, "Integer", object)?,
            float: define_class(mem, pool, syms, "Float", object)?,
            symbol: define_class(mem, pool, syms, "Symbol", object)?,
            string: define_class(mem, pool, syms, "String", object)?,
            array: define_class(mem, pool, syms, "Array", object)?,
            hash: define_class(mem, pool, syms, "Hash", object)?,
            range: define_class(mem, pool, syms, "Range", object)?,
            proc_class: define_class(mem, pool, syms, "Proc", object)?,
            exception,
            standard_error,
            runtime_error: define_class(mem, pool, syms, "RuntimeError", standard_error)?,
            type_error: define_class(mem, pool, syms, "TypeError", standard_error)?,
            argument_error: define_class(mem, pool, syms, "ArgumentError", standard_error)?,
            index_error: define_class(mem, pool, syms, "IndexError", standard_error)?,
            range_error: define_class(mem, pool, syms, "RangeError", standard_error)?,
            nomemory_error: define_class(mem, pool, syms, "NoMemoryError", exception)?,
            bytecode_error: define_class(mem, pool, syms, "BytecodeError", exception)?,
        })
    }

    /// The built-in class a value belongs to.
    #[must_use]
    pub fn class_of<M: MemorySpace>(&self, mem: &M, value: Value) -> Addr {
        match value {
            Value::Nil | Value::Empty => self.nil,
            Value::True => self.true_class,
            Value::False => self.false_class,
            Value::Integer(_) => self.integer,
            Value::Float(_) => self.float,
            Value::Symbol(_) => self.symbol,
            Value::String(_) => self.string,
            Value::Array(_) => self.array,
            Value::Hash(_) => self.hash,
            Value::Range(_) => self.range,
            Value::Proc(_) => self.proc_class,
            Value::Handle(_) => self.object,
            // Class receivers dispatch through their own chain.
            Value::Class(cls) => cls,
            Value::Object(addr) => {
                let header: RObject = mem.read(addr);
                header.cls
            }
            Value::Exception(addr) => {
                let header: RException = mem.read(addr);
                header.cls
            }
        }
    }
}

/// Allocate and register a class.
///
/// The returned payload starts with one count held by the registry, so
/// it is never torn down.
pub fn define_class<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    syms: &mut SymbolTable,
    name: &'static str,
    super_class: Addr,
) -> Option<Addr> {
    let name = syms.intern_static(mem, name)?;
    define_class_sym(mem, pool, name, super_class)
}

/// Allocate a class for an already-interned name (script `class` keyword).
pub fn define_class_sym<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    name: SymId,
    super_class: Addr,
) -> Option<Addr> {
    let addr = pool.alloc(mem, core::mem::size_of::<RClass>() as u32)?;
    mem.write(
        addr,
        RClass {
            ref_count: 1,
            name,
            super_class,
            procs: Addr::NULL,
        },
    );
    Some(addr)
}

/// Prepend a method to a class's chain.
pub fn define_method<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    cls: Addr,
    sym: SymId,
    method: Method,
) -> Option<()> {
    let (kind, target) = match method {
        Method::Native(id) => (MethodKind::Native, u32::from(id)),
        Method::Irep(irep) => (MethodKind::Irep, irep.as_u32()),
        Method::IvarGetter(ivar) => (MethodKind::IvarGetter, u32::from(ivar.as_u16())),
        Method::IvarSetter(ivar) => (MethodKind::IvarSetter, u32::from(ivar.as_u16())),
    };

    let node = pool.alloc(mem, core::mem::size_of::<MethodNode>() as u32)?;
    let mut header: RClass = mem.read(cls);
    mem.write(
        node,
        MethodNode {
            next: header.procs,
            sym,
            kind: kind as u8,
            target,
        },
    );
    header.procs = node;
    mem.write(cls, header);
    Some(())
}

/// Look up a method, walking the receiver class chain and then its
/// ancestors. First match wins.
#[must_use]
pub fn find_method<M: MemorySpace>(mem: &M, cls: Addr, sym: SymId) -> Option<Method> {
    let mut current = cls;
    while !current.is_null() {
        let header: RClass = mem.read(current);
        let mut node_addr = header.procs;
        while !node_addr.is_null() {
            let node: MethodNode = mem.read(node_addr);
            if node.sym == sym {
                return decode_method(&node);
            }
            node_addr = node.next;
        }
        current = header.super_class;
    }
    None
}

fn decode_method(node: &MethodNode) -> Option<Method> {
    Some(match MethodKind::try_from(node.kind).ok()? {
        MethodKind::Native => Method::Native(node.target as u16),
        MethodKind::Irep => Method::Irep(Addr::new(node.target)),
        MethodKind::IvarGetter => Method::IvarGetter(SymId::new(node.target as u16)),
        MethodKind::IvarSetter => Method::IvarSetter(SymId::new(node.target as u16)),
    })
}

/// Whether `cls` is `ancestor` or one of its descendants.
#[must_use]
pub fn is_subclass<M: MemorySpace>(mem: &M, cls: Addr, ancestor: Addr) -> bool {
    let mut current = cls;
    while !current.is_null() {
        if current == ancestor {
            return true;
        }
        let header: RClass = mem.read(current);
        current = header.super_class;
    }
    false
}

/// Walk the parent chain of `value`'s class looking for `cls`.
#[must_use]
pub fn is_kind_of<M: MemorySpace>(mem: &M, classes: &ClassSet, value: Value, cls: Addr) -> bool {
    let mut current = classes.class_of(mem, value);
    while !current.is_null() {
        if current == cls {
            return true;
        }
        let header: RClass = mem.read(current);
        current = header.super_class;
    }
    false
}

/// Allocate an instance of `cls` with an empty ivar table, refcount 1.
pub fn instance_new<M: MemorySpace>(mem: &mut M, pool: &mut MemPool, cls: Addr) -> Option<Value> {
    let addr = pool.alloc(mem, core::mem::size_of::<RObject>() as u32)?;
    mem.write(
        addr,
        RObject {
            ref_count: 1,
            cls,
            ivar: KvHandle::EMPTY,
        },
    );
    Some(Value::Object(addr))
}

/// Read an instance variable; nil when unset. The result is borrowed.
#[must_use]
pub fn ivar_get<M: MemorySpace>(mem: &M, obj: Addr, sym: SymId) -> Value {
    kv::get(mem, obj.add(RObject::IVAR_OFFSET), Value::Symbol(sym)).unwrap_or(Value::Nil)
}

/// Write an instance variable. Takes ownership of `value`.
pub fn ivar_set<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    obj: Addr,
    sym: SymId,
    value: Value,
) -> Option<()> {
    kv::set(
        mem,
        pool,
        obj.add(RObject::IVAR_OFFSET),
        Value::Symbol(sym),
        value,
    )
}

/// Re-point an instance at `cls` (used after `initialize` returns).
pub fn set_instance_class<M: MemorySpace>(mem: &mut M, obj: Addr, cls: Addr) {
    let mut header: RObject = mem.read(obj);
    header.cls = cls;
    mem.write(obj, header);
}
