// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! String and Symbol builtins.

use super::{bool_result, wrong_argc};
use crate::platform::MemorySpace;
use crate::runtime::Env;
use crate::value::Value;
use crate::value::string::{string_add, string_bytes, string_eq, string_len, string_new};
use crate::vm::{ExcKind, Vm, VmError};

/// Longest symbol name `String#to_sym` accepts.
const MAX_SYM_LEN: usize = 128;

/// `String#+`
pub fn str_add<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc != 1 {
        return wrong_argc(vm, env, mem);
    }
    let (Value::String(lhs), Value::String(rhs)) = (vm.regs[r0], vm.regs[r0 + 1]) else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"string expected"));
    };
    match string_add(mem, &mut env.pool, lhs, rhs) {
        Some(value) => {
            vm.set_reg(mem, &mut env.pool, r0, value);
            Ok(())
        }
        None => vm.raise(env, mem, ExcKind::NoMemory, None),
    }
}

/// `String#==`
pub fn str_eq<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc != 1 {
        return wrong_argc(vm, env, mem);
    }
    let equal = match (vm.regs[r0], vm.regs[r0 + 1]) {
        (Value::String(lhs), Value::String(rhs)) => string_eq(mem, lhs, rhs),
        _ => false,
    };
    bool_result(vm, env, mem, r0, equal);
    Ok(())
}

/// `String#size` / `String#length`
pub fn str_size<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    let Value::String(addr) = vm.regs[r0] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"string expected"));
    };
    let len = i64::from(string_len(mem, addr));
    vm.set_reg(mem, &mut env.pool, r0, Value::Integer(len));
    Ok(())
}

/// `String#to_sym`
pub fn str_to_sym<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    let Value::String(addr) = vm.regs[r0] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"string expected"));
    };

    let mut name = [0u8; MAX_SYM_LEN];
    let len = {
        let bytes = string_bytes(mem, addr);
        if bytes.len() > name.len() {
            return vm.raise(env, mem, ExcKind::Argument,
                Some(b"symbol name too long"));
        }
        name[..bytes.len()].copy_from_slice(bytes);
        bytes.len()
    };

    let Some(sym) = env.syms.intern(mem, &mut env.pool, &name[..len]) else {
        return vm.raise(env, mem, ExcKind::NoMemory, Some(b"symbol table full"));
    };
    vm.set_reg(mem, &mut env.pool, r0, Value::Symbol(sym));
    Ok(())
}

/// `String#empty?`
pub fn str_empty<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    let Value::String(addr) = vm.regs[r0] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"string expected"));
    };
    let empty = string_len(mem, addr) == 0;
    bool_result(vm, env, mem, r0, empty);
    Ok(())
}

/// `Symbol#to_s`
pub fn sym_to_s<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    let Value::Symbol(sym) = vm.regs[r0] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"symbol expected"));
    };

    let mut name = [0u8; MAX_SYM_LEN];
    let len = {
        let Some(bytes) = env.syms.name(mem, sym) else {
            return Err(VmError::BadBytecode);
        };
        let take = bytes.len().min(name.len());
        name[..take].copy_from_slice(&bytes[..take]);
        take
    };

    match string_new(mem, &mut env.pool, &name[..len]) {
        Some(value) => {
            vm.set_reg(mem, &mut env.pool, r0, value);
            Ok(())
        }
        None => vm.raise(env, mem, ExcKind::NoMemory, None),
    }
}
