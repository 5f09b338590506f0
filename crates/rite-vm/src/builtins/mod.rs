// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Built-in method shims.
//!
//! Builtins use a fixed calling convention: the receiver sits in
//! `R(r0)`, arguments in `R(r0+1)..R(r0+argc)`, and the result replaces
//! the receiver register. Methods are identified by a dense id and
//! dispatched through a match - pool-resident method nodes store the id,
//! never a function pointer.
//!
//! `Object.new` and `Proc#call` re-enter the interpreter through the
//! VM's snapshot/restore protocol; nothing else runs script code.

#[cfg(test)]
mod builtins_test;

mod object;
mod string;

use crate::class::{Method, define_method};
use crate::console::Console;
use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::runtime::Env;
use crate::symbol::SymbolTable;
use crate::value::Value;
use crate::vm::{ExcKind, Vm, VmError};

/// Builtin method ids.
pub mod id {
    /// `Class.new`
    pub const OBJ_NEW: u16 = 0;
    /// Default `initialize` (no-op).
    pub const OBJ_INITIALIZE: u16 = 1;
    /// `Object#!`
    pub const OBJ_NOT: u16 = 2;
    /// `Object#!=`
    pub const OBJ_NEQ: u16 = 3;
    /// `Object#==`
    pub const OBJ_EQ: u16 = 4;
    /// `Object#<=>`
    pub const OBJ_CMP: u16 = 5;
    /// `Object#class`
    pub const OBJ_CLASS: u16 = 6;
    /// `Object#dup`
    pub const OBJ_DUP: u16 = 7;
    /// `Object#is_a?` / `Object#kind_of?`
    pub const OBJ_KIND_OF: u16 = 8;
    /// `Object#nil?`
    pub const OBJ_IS_NIL: u16 = 9;
    /// `Object#to_s`
    pub const OBJ_TO_S: u16 = 10;
    /// `Object#inspect`
    pub const OBJ_INSPECT: u16 = 11;
    /// `Object#p`
    pub const OBJ_P: u16 = 12;
    /// `Object#print`
    pub const OBJ_PRINT: u16 = 13;
    /// `Object#puts`
    pub const OBJ_PUTS: u16 = 14;
    /// `Object#raise`
    pub const OBJ_RAISE: u16 = 15;
    /// `Object#attr_reader`
    pub const OBJ_ATTR_READER: u16 = 16;
    /// `Object#attr_accessor`
    pub const OBJ_ATTR_ACCESSOR: u16 = 17;
    /// `Object#instance_variable_get`
    pub const OBJ_IVAR_GET: u16 = 18;
    /// `Object#instance_variable_set`
    pub const OBJ_IVAR_SET: u16 = 19;
    /// `String#+`
    pub const STR_ADD: u16 = 20;
    /// `String#==`
    pub const STR_EQ: u16 = 21;
    /// `String#size` / `String#length`
    pub const STR_SIZE: u16 = 22;
    /// `String#to_s`
    pub const STR_TO_S: u16 = 23;
    /// `String#to_sym`
    pub const STR_TO_SYM: u16 = 24;
    /// `String#empty?`
    pub const STR_EMPTY: u16 = 25;
    /// `Symbol#to_s`
    pub const SYM_TO_S: u16 = 26;
    /// `Symbol#to_sym`
    pub const SYM_TO_SYM: u16 = 27;
    /// `Proc#call`
    pub const PROC_CALL: u16 = 28;
    /// `Exception#message`
    pub const EXC_MESSAGE: u16 = 29;
}

/// Execute builtin `builtin_id`.
pub fn call<M: MemorySpace, C: Console>(
    builtin_id: u16,
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    console: &mut C,
    buf: &[u8],
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    match builtin_id {
        id::OBJ_NEW => object::obj_new(vm, env, mem, console, buf, r0, argc),
        id::OBJ_INITIALIZE => {
            // Default initialize: leave the receiver as the result.
            Ok(())
        }
        id::OBJ_NOT => object::obj_not(vm, env, mem, r0),
        id::OBJ_NEQ => object::obj_neq(vm, env, mem, r0, argc),
        id::OBJ_EQ => object::obj_eq(vm, env, mem, r0, argc),
        id::OBJ_CMP => object::obj_cmp(vm, env, mem, r0, argc),
        id::OBJ_CLASS => object::obj_class(vm, env, mem, r0),
        id::OBJ_DUP => object::obj_dup(vm, env, mem, r0),
        id::OBJ_KIND_OF => object::obj_kind_of(vm, env, mem, r0, argc),
        id::OBJ_IS_NIL => object::obj_is_nil(vm, env, mem, r0),
        id::OBJ_TO_S => object::obj_to_s(vm, env, mem, r0, false),
        id::OBJ_INSPECT => object::obj_to_s(vm, env, mem, r0, true),
        id::OBJ_P => object::obj_p(vm, env, mem, console, r0, argc),
        id::OBJ_PRINT => object::obj_print(vm, env, mem, console, r0, argc),
        id::OBJ_PUTS => object::obj_puts(vm, env, mem, console, r0, argc),
        id::OBJ_RAISE => object::obj_raise(vm, env, mem, r0, argc),
        id::OBJ_ATTR_READER => object::obj_attr(vm, env, mem, r0, argc, false),
        id::OBJ_ATTR_ACCESSOR => object::obj_attr(vm, env, mem, r0, argc, true),
        id::OBJ_IVAR_GET => object::obj_ivar_get(vm, env, mem, r0, argc),
        id::OBJ_IVAR_SET => object::obj_ivar_set(vm, env, mem, r0, argc),
        id::STR_ADD => string::str_add(vm, env, mem, r0, argc),
        id::STR_EQ => string::str_eq(vm, env, mem, r0, argc),
        id::STR_SIZE => string::str_size(vm, env, mem, r0),
        id::STR_TO_S | id::SYM_TO_SYM => {
            // Identity on the receiver.
            Ok(())
        }
        id::STR_TO_SYM => string::str_to_sym(vm, env, mem, r0),
        id::STR_EMPTY => string::str_empty(vm, env, mem, r0),
        id::SYM_TO_S => string::sym_to_s(vm, env, mem, r0),
        id::PROC_CALL => object::proc_call(vm, env, mem, console, buf, r0, argc),
        id::EXC_MESSAGE => object::exc_message(vm, env, mem, r0),
        other => Err(VmError::UnknownBuiltin(other)),
    }
}

/// Install the built-in method set onto the bootstrapped classes.
///
/// Returns `None` when the pool cannot hold the method nodes.
pub fn install<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    syms: &mut SymbolTable,
    classes: &crate::class::ClassSet,
) -> Option<()> {
    let object_methods: &[(&'static str, u16)] = &[
        ("new", id::OBJ_NEW),
        ("initialize", id::OBJ_INITIALIZE),
        ("!", id::OBJ_NOT),
        ("!=", id::OBJ_NEQ),
        ("==", id::OBJ_EQ),
        ("<=>", id::OBJ_CMP),
        ("class", id::OBJ_CLASS),
        ("dup", id::OBJ_DUP),
        ("is_a?", id::OBJ_KIND_OF),
        ("kind_of?", id::OBJ_KIND_OF),
        ("nil?", id::OBJ_IS_NIL),
        ("to_s", id::OBJ_TO_S),
        ("inspect", id::OBJ_INSPECT),
        ("p", id::OBJ_P),
        ("print", id::OBJ_PRINT),
        ("puts", id::OBJ_PUTS),
        ("raise", id::OBJ_RAISE),
        ("attr_reader", id::OBJ_ATTR_READER),
        ("attr_accessor", id::OBJ_ATTR_ACCESSOR),
        ("instance_variable_get", id::OBJ_IVAR_GET),
        ("instance_variable_set", id::OBJ_IVAR_SET),
    ];
    for &(name, builtin) in object_methods {
        let sym = syms.intern_static(mem, name)?;
        define_method(mem, pool, classes.object, sym, Method::Native(builtin))?;
    }

    let string_methods: &[(&'static str, u16)] = &[
        ("+", id::STR_ADD),
        ("==", id::STR_EQ),
        ("size", id::STR_SIZE),
        ("length", id::STR_SIZE),
        ("to_s", id::STR_TO_S),
        ("to_sym", id::STR_TO_SYM),
        ("empty?", id::STR_EMPTY),
    ];
    for &(name, builtin) in string_methods {
        let sym = syms.intern_static(mem, name)?;
        define_method(mem, pool, classes.string, sym, Method::Native(builtin))?;
    }

    let symbol_methods: &[(&'static str, u16)] = &[
        ("to_s", id::SYM_TO_S),
        ("to_sym", id::SYM_TO_SYM),
    ];
    for &(name, builtin) in symbol_methods {
        let sym = syms.intern_static(mem, name)?;
        define_method(mem, pool, classes.symbol, sym, Method::Native(builtin))?;
    }

    let call_sym = syms.intern_static(mem, "call")?;
    define_method(mem, pool, classes.proc_class, call_sym, Method::Native(id::PROC_CALL))?;

    let message_sym = syms.intern_static(mem, "message")?;
    define_method(
        mem,
        pool,
        classes.exception,
        message_sym,
        Method::Native(id::EXC_MESSAGE),
    )?;

    Some(())
}

/// Raise `ArgumentError` for a builtin called with the wrong arity.
fn wrong_argc<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
) -> Result<(), VmError> {
    vm.raise(
        env,
        mem,
        ExcKind::Argument,
        Some(b"wrong number of arguments"),
    )
}

/// Result helper: `true`/`false` into the receiver register.
fn bool_result<M: MemorySpace>(vm: &mut Vm, env: &mut Env, mem: &mut M, r0: usize, b: bool) {
    vm.set_reg(mem, &mut env.pool, r0, Value::bool(b));
}
