// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Object builtins: construction, identity, printing, raising.

use super::{bool_result, wrong_argc};
use crate::class::{self, Method, instance_new, is_kind_of, is_subclass, set_instance_class};
use crate::console::{Console, SliceConsole};
use crate::loader::{CODE_IN_POOL, Irep, IrepHeader, release_irep};
use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::runtime::Env;
use crate::symbol::SymId;
use crate::types::Addr;
use crate::value::heap::{RException, RObject, RProc, exception_new};
use crate::value::printer::{class_name, print_value};
use crate::value::string::{string_bytes, string_new};
use crate::value::{Value, compare, kv, rc, value_eq};
use crate::vm::{ExcKind, Vm, VmError};

/// Render buffer for `to_s`/`inspect` results.
const RENDER_BUF: usize = 256;

/// `Class.new`: allocate an instance, then run `initialize` through a
/// synthesized one-shot frame (the stack-swap protocol).
pub fn obj_new<M: MemorySpace, C: Console>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    console: &mut C,
    buf: &[u8],
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    let Value::Class(cls) = vm.regs[r0] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"new requires a class"));
    };

    let Some(instance) = instance_new(mem, &mut env.pool, cls) else {
        return vm.raise(env, mem, ExcKind::NoMemory, None);
    };
    // The receiver register becomes `self` for the synthesized call.
    vm.set_reg(mem, &mut env.pool, r0, instance);

    let Some(init_sym) = env.syms.intern_static(mem, "initialize") else {
        return Err(VmError::OutOfMemory);
    };
    let Some(synth) = synthesize_send(mem, &mut env.pool, init_sym, argc) else {
        return vm.raise(env, mem, ExcKind::NoMemory, None);
    };

    let saved = vm.dup_reg(mem, r0);
    let result = vm.run_nested(env, mem, console, buf, synth, r0, cls, argc);
    release_irep(mem, &mut env.pool, synth);

    // initialize's return value is discarded; the receiver register
    // gets the instance back and its class is re-asserted in case the
    // initializer rebound it.
    vm.set_reg(mem, &mut env.pool, r0, saved);
    if let Value::Object(obj) = saved {
        set_instance_class(mem, obj, cls);
    }
    result
}

/// Build the one-shot irep `{SEND r0 sym argc; STOP}` in the pool.
fn synthesize_send<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    sym: SymId,
    argc: u8,
) -> Option<Irep> {
    use crate::bytecode::op;

    let code = pool.alloc(mem, 5)?;
    mem.slice_mut(code, 5)
        .copy_from_slice(&[op::SEND, 0, 0, argc, op::STOP]);

    let Some(block) = pool.alloc(mem, Irep::block_size(0, 0, 1)) else {
        pool.free(mem, code);
        return None;
    };
    mem.write(
        block,
        IrepHeader {
            nlocals: 0,
            nregs: u16::from(argc) + 2,
            rlen: 0,
            clen: 0,
            ilen: 5,
            plen: 0,
            slen: 1,
            code: code.as_u32() | CODE_IN_POOL,
            catches: 0,
        },
    );
    mem.write(block.add(IrepHeader::SIZE), sym.as_u16());
    Some(Irep(block))
}

/// `Object#!`
pub fn obj_not<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    let truthy = vm.regs[r0].is_truthy();
    bool_result(vm, env, mem, r0, !truthy);
    Ok(())
}

/// `Object#!=`
pub fn obj_neq<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc != 1 {
        return wrong_argc(vm, env, mem);
    }
    let equal = value_eq(mem, vm.regs[r0], vm.regs[r0 + 1]);
    bool_result(vm, env, mem, r0, !equal);
    Ok(())
}

/// `Object#==`
pub fn obj_eq<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc != 1 {
        return wrong_argc(vm, env, mem);
    }
    let equal = value_eq(mem, vm.regs[r0], vm.regs[r0 + 1]);
    bool_result(vm, env, mem, r0, equal);
    Ok(())
}

/// `Object#<=>`: -1/0/1, or nil when the comparison is undefined.
pub fn obj_cmp<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc != 1 {
        return wrong_argc(vm, env, mem);
    }
    let result = match compare(mem, vm.regs[r0], vm.regs[r0 + 1]) {
        Some(ordering) => Value::Integer(ordering as i64),
        None => Value::Nil,
    };
    vm.set_reg(mem, &mut env.pool, r0, result);
    Ok(())
}

/// `Object#class`
pub fn obj_class<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    let cls = env.classes.class_of(mem, vm.regs[r0]);
    let value = Value::Class(cls);
    rc::incref(mem, value);
    vm.set_reg(mem, &mut env.pool, r0, value);
    Ok(())
}

/// `Object#dup`: shallow-copies OBJECT payloads. Procs and ranges stay
/// unimplemented upstream, so they raise; immediates return themselves.
pub fn obj_dup<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    match vm.regs[r0] {
        Value::Object(src) => {
            let header: RObject = mem.read(src);
            let Some(dup) = instance_new(mem, &mut env.pool, header.cls) else {
                return vm.raise(env, mem, ExcKind::NoMemory, None);
            };
            let dup_addr = dup.ref_addr().unwrap_or(Addr::NULL);

            let src_kv = src.add(RObject::IVAR_OFFSET);
            for i in 0..kv::len(mem, src_kv) {
                let Some(pair) = kv::pair_at(mem, src_kv, i) else {
                    break;
                };
                rc::incref(mem, pair.key);
                rc::incref(mem, pair.value);
                if kv::set(
                    mem,
                    &mut env.pool,
                    dup_addr.add(RObject::IVAR_OFFSET),
                    pair.key,
                    pair.value,
                )
                .is_none()
                {
                    rc::release(mem, &mut env.pool, dup);
                    return vm.raise(env, mem, ExcKind::NoMemory, None);
                }
            }
            vm.set_reg(mem, &mut env.pool, r0, dup);
            Ok(())
        }
        Value::Proc(_) | Value::Range(_) => {
            // TODO: dup for procs and ranges once upstream defines it.
            vm.raise(env, mem, ExcKind::Type, Some(b"can't dup this value"))
        }
        _ => Ok(()), // immediates and shared payloads dup to themselves
    }
}

/// `Object#is_a?` / `Object#kind_of?`
pub fn obj_kind_of<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc != 1 {
        return wrong_argc(vm, env, mem);
    }
    let Value::Class(cls) = vm.regs[r0 + 1] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"class required"));
    };
    let result = is_kind_of(mem, &env.classes, vm.regs[r0], cls);
    bool_result(vm, env, mem, r0, result);
    Ok(())
}

/// `Object#nil?`
pub fn obj_is_nil<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    let is_nil = vm.regs[r0].is_nil();
    bool_result(vm, env, mem, r0, is_nil);
    Ok(())
}

/// `Object#to_s` / `Object#inspect`: render through the printer.
pub fn obj_to_s<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    inspect: bool,
) -> Result<(), VmError> {
    let mut buffer = [0u8; RENDER_BUF];
    let len = {
        let mut sink = SliceConsole::new(&mut buffer);
        print_value(mem, &env.syms, vm.regs[r0], inspect, &mut sink);
        sink.bytes().len()
    };
    match string_new(mem, &mut env.pool, &buffer[..len]) {
        Some(value) => {
            vm.set_reg(mem, &mut env.pool, r0, value);
            Ok(())
        }
        None => vm.raise(env, mem, ExcKind::NoMemory, None),
    }
}

/// `Object#p`: inspect each argument on its own line; returns the
/// argument, or an array of them when called with several.
pub fn obj_p<M: MemorySpace, C: Console>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    console: &mut C,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    for i in 1..=usize::from(argc) {
        print_value(mem, &env.syms, vm.regs[r0 + i], true, console);
        console.write_str("\n");
    }

    let result = match argc {
        0 => Value::Nil,
        1 => vm.dup_reg(mem, r0 + 1),
        _ => {
            use crate::value::array::{array_new, array_push};
            let Some(ary) = array_new(mem, &mut env.pool, u16::from(argc)) else {
                return vm.raise(env, mem, ExcKind::NoMemory, None);
            };
            let ary_addr = ary.ref_addr().unwrap_or(Addr::NULL);
            for i in 1..=usize::from(argc) {
                let value = vm.dup_reg(mem, r0 + i);
                if array_push(mem, &mut env.pool, ary_addr, value).is_none() {
                    rc::release(mem, &mut env.pool, ary);
                    return vm.raise(env, mem, ExcKind::NoMemory, None);
                }
            }
            ary
        }
    };
    vm.set_reg(mem, &mut env.pool, r0, result);
    Ok(())
}

/// `Object#print`: to_s of each argument, no separators. Returns nil.
pub fn obj_print<M: MemorySpace, C: Console>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    console: &mut C,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    for i in 1..=usize::from(argc) {
        print_value(mem, &env.syms, vm.regs[r0 + i], false, console);
    }
    vm.set_reg(mem, &mut env.pool, r0, Value::Nil);
    Ok(())
}

/// `Object#puts`: each printable on its own line; strings already
/// ending in a newline do not get a second one. Returns nil.
pub fn obj_puts<M: MemorySpace, C: Console>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    console: &mut C,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc == 0 {
        console.write_str("\n");
    }
    for i in 1..=usize::from(argc) {
        puts_value(mem, env, vm.regs[r0 + i], console);
    }
    vm.set_reg(mem, &mut env.pool, r0, Value::Nil);
    Ok(())
}

fn puts_value<M: MemorySpace, C: Console>(mem: &M, env: &Env, value: Value, console: &mut C) {
    match value {
        Value::Array(addr) => {
            for i in 0..crate::value::array::array_len(mem, addr) {
                if let Some(elem) = crate::value::array::array_get(mem, addr, i) {
                    puts_value(mem, env, elem, console);
                }
            }
        }
        Value::String(addr) => {
            let bytes = string_bytes(mem, addr);
            let ends_with_newline = bytes.last() == Some(&b'\n');
            console.write_bytes(bytes);
            if !ends_with_newline {
                console.write_str("\n");
            }
        }
        other => {
            print_value(mem, &env.syms, other, false, console);
            console.write_str("\n");
        }
    }
}

/// `Object#raise`: the four accepted forms are no argument, a message
/// string, an exception class, and class plus message. Anything else is
/// itself a `TypeError`.
pub fn obj_raise<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    let (cls, message) = match argc {
        0 => (env.classes.runtime_error, Value::Nil),
        1 => match vm.regs[r0 + 1] {
            Value::String(_) => {
                let message = vm.dup_reg(mem, r0 + 1);
                (env.classes.runtime_error, message)
            }
            Value::Class(cls) if is_subclass(mem, cls, env.classes.exception) => {
                (cls, Value::Nil)
            }
            _ => {
                return vm.raise(env, mem, ExcKind::Type,
                    Some(b"exception class/message expected"));
            }
        },
        2 => match (vm.regs[r0 + 1], vm.regs[r0 + 2]) {
            (Value::Class(cls), Value::String(_))
                if is_subclass(mem, cls, env.classes.exception) =>
            {
                let message = vm.dup_reg(mem, r0 + 2);
                (cls, message)
            }
            _ => {
                return vm.raise(env, mem, ExcKind::Type,
                    Some(b"exception class/message expected"));
            }
        },
        _ => {
            return vm.raise(env, mem, ExcKind::Type,
                Some(b"exception class/message expected"));
        }
    };

    let Some(exc) = exception_new(mem, &mut env.pool, cls, message) else {
        rc::release(mem, &mut env.pool, message);
        return Err(VmError::OutOfMemory);
    };
    vm.set_exc(mem, &mut env.pool, exc);
    Ok(())
}

/// `attr_reader` / `attr_accessor`: synthesize ivar accessor methods on
/// the receiver class.
pub fn obj_attr<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
    with_writer: bool,
) -> Result<(), VmError> {
    let Value::Class(cls) = vm.regs[r0] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"class receiver required"));
    };

    for i in 1..=usize::from(argc) {
        let Value::Symbol(name_sym) = vm.regs[r0 + i] else {
            return vm.raise(env, mem, ExcKind::Type, Some(b"symbol expected"));
        };

        // Derive "@name" and "name=" from the attribute name.
        let mut ivar_buf = [0u8; 80];
        let mut writer_buf = [0u8; 80];
        let name_len = {
            let Some(name) = env.syms.name(mem, name_sym) else {
                return Err(VmError::BadBytecode);
            };
            if name.len() + 1 > ivar_buf.len() {
                return vm.raise(env, mem, ExcKind::Argument,
                    Some(b"attribute name too long"));
            }
            ivar_buf[0] = b'@';
            ivar_buf[1..=name.len()].copy_from_slice(name);
            writer_buf[..name.len()].copy_from_slice(name);
            writer_buf[name.len()] = b'=';
            name.len()
        };

        let Some(ivar_sym) = env.syms.intern(mem, &mut env.pool, &ivar_buf[..=name_len]) else {
            return vm.raise(env, mem, ExcKind::NoMemory, Some(b"symbol table full"));
        };

        if class::define_method(mem, &mut env.pool, cls, name_sym, Method::IvarGetter(ivar_sym))
            .is_none()
        {
            return vm.raise(env, mem, ExcKind::NoMemory, None);
        }

        if with_writer {
            let Some(writer_sym) = env.syms.intern(mem, &mut env.pool, &writer_buf[..=name_len])
            else {
                return vm.raise(env, mem, ExcKind::NoMemory,
                    Some(b"symbol table full"));
            };
            if class::define_method(
                mem,
                &mut env.pool,
                cls,
                writer_sym,
                Method::IvarSetter(ivar_sym),
            )
            .is_none()
            {
                return vm.raise(env, mem, ExcKind::NoMemory, None);
            }
        }
    }

    vm.set_reg(mem, &mut env.pool, r0, Value::Nil);
    Ok(())
}

/// `Object#instance_variable_get`
pub fn obj_ivar_get<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc != 1 {
        return wrong_argc(vm, env, mem);
    }
    let (Value::Object(obj), Value::Symbol(sym)) = (vm.regs[r0], vm.regs[r0 + 1]) else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"object and symbol required"));
    };
    let value = class::ivar_get(mem, obj, sym);
    rc::incref(mem, value);
    vm.set_reg(mem, &mut env.pool, r0, value);
    Ok(())
}

/// `Object#instance_variable_set`
pub fn obj_ivar_set<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    if argc != 2 {
        return wrong_argc(vm, env, mem);
    }
    let (Value::Object(obj), Value::Symbol(sym)) = (vm.regs[r0], vm.regs[r0 + 1]) else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"object and symbol required"));
    };
    let stored = vm.dup_reg(mem, r0 + 2);
    if class::ivar_set(mem, &mut env.pool, obj, sym, stored).is_none() {
        return vm.raise(env, mem, ExcKind::NoMemory, None);
    }
    let result = vm.dup_reg(mem, r0 + 2);
    vm.set_reg(mem, &mut env.pool, r0, result);
    Ok(())
}

/// `Proc#call`: run the proc's body through the nested-entry protocol.
pub fn proc_call<M: MemorySpace, C: Console>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    console: &mut C,
    buf: &[u8],
    r0: usize,
    argc: u8,
) -> Result<(), VmError> {
    let Value::Proc(addr) = vm.regs[r0] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"proc required"));
    };
    let header: RProc = mem.read(addr);
    let target_class = env.classes.object;
    vm.run_nested(
        env,
        mem,
        console,
        buf,
        Irep(header.irep),
        r0,
        target_class,
        argc,
    )
}

/// `Exception#message`: the message string, or the class name when the
/// exception carries none.
pub fn exc_message<M: MemorySpace>(
    vm: &mut Vm,
    env: &mut Env,
    mem: &mut M,
    r0: usize,
) -> Result<(), VmError> {
    let Value::Exception(addr) = vm.regs[r0] else {
        return vm.raise(env, mem, ExcKind::Type, Some(b"exception required"));
    };
    let header: RException = mem.read(addr);

    match header.message {
        Value::String(_) => {
            rc::incref(mem, header.message);
            vm.set_reg(mem, &mut env.pool, r0, header.message);
            Ok(())
        }
        _ => {
            let mut name_buf = [0u8; 80];
            let len = {
                let name = class_name(mem, &env.syms, header.cls);
                let take = name.len().min(name_buf.len());
                name_buf[..take].copy_from_slice(&name[..take]);
                take
            };
            match string_new(mem, &mut env.pool, &name_buf[..len]) {
                Some(value) => {
                    vm.set_reg(mem, &mut env.pool, r0, value);
                    Ok(())
                }
                None => vm.raise(env, mem, ExcKind::NoMemory, None),
            }
        }
    }
}
