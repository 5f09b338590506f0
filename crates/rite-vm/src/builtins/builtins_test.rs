// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Direct-call tests for the builtin shims.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::{call, id};
use crate::class::{self, Method, instance_new};
use crate::console::BufferConsole;
use crate::platform::{HostMem, MemorySpace};
use crate::runtime::Env;
use crate::symbol::SymId;
use crate::types::Addr;
use crate::value::heap::{RException, RObject, exception_new};
use crate::value::rc::refcount;
use crate::value::string::{string_bytes, string_new};
use crate::value::{Value, array};
use crate::vm::Vm;

const POOL_SIZE: u32 = 128 * 1024;

struct Fixture {
    mem: HostMem,
    env: Env,
    vm: Vm,
    console: BufferConsole,
}

fn fixture() -> Fixture {
    let mut mem = HostMem::new(POOL_SIZE as usize);
    let env = Env::init(&mut mem, Addr::NULL, POOL_SIZE).expect("env");
    Fixture {
        mem,
        env,
        vm: Vm::new(),
        console: BufferConsole::new(),
    }
}

impl Fixture {
    fn call(&mut self, builtin: u16, r0: usize, argc: u8) {
        call(
            builtin,
            &mut self.vm,
            &mut self.env,
            &mut self.mem,
            &mut self.console,
            &[],
            r0,
            argc,
        )
        .expect("builtin");
    }

    fn string(&mut self, s: &[u8]) -> Value {
        string_new(&mut self.mem, &mut self.env.pool, s).expect("string")
    }

    fn pending_exception_class(&self) -> Addr {
        let Value::Exception(addr) = self.vm.exc else {
            panic!("no pending exception");
        };
        let header: RException = self.mem.read(addr);
        header.cls
    }
}

#[test]
fn p_prints_each_argument_and_returns_them() {
    // p 1, "a" prints 1 and "a" on separate lines and
    // returns the array of both.
    let mut f = fixture();
    f.vm.regs[5] = Value::Nil;
    f.vm.regs[6] = Value::Integer(1);
    f.vm.regs[7] = f.string(b"a");

    f.call(id::OBJ_P, 5, 2);

    assert_eq!(f.console.as_string(), "1\n\"a\"\n");
    let Value::Array(ary) = f.vm.regs[5] else {
        panic!("p with two arguments should return an array");
    };
    assert_eq!(array::array_len(&f.mem, ary), 2);
    assert_eq!(array::array_get(&f.mem, ary, 0), Some(Value::Integer(1)));
}

#[test]
fn p_with_one_argument_returns_it() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Nil;
    f.vm.regs[6] = Value::Integer(9);

    f.call(id::OBJ_P, 5, 1);

    assert_eq!(f.console.as_string(), "9\n");
    assert_eq!(f.vm.regs[5], Value::Integer(9));
}

#[test]
fn puts_appends_newlines_but_never_doubles_them() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Nil;
    f.vm.regs[6] = f.string(b"plain");
    f.call(id::OBJ_PUTS, 5, 1);
    assert_eq!(f.console.as_string(), "plain\n");
    assert_eq!(f.vm.regs[5], Value::Nil, "puts returns nil");

    f.console.clear();
    f.vm.regs[6] = f.string(b"trailing\n");
    f.call(id::OBJ_PUTS, 5, 1);
    assert_eq!(f.console.as_string(), "trailing\n");

    f.console.clear();
    f.vm.regs[6] = Value::Nil;
    f.call(id::OBJ_PUTS, 5, 1);
    assert_eq!(f.console.as_string(), "\n");

    f.console.clear();
    f.call(id::OBJ_PUTS, 5, 0);
    assert_eq!(f.console.as_string(), "\n");
}

#[test]
fn puts_flattens_arrays_one_line_per_element() {
    let mut f = fixture();
    let ary = array::array_new(&mut f.mem, &mut f.env.pool, 2).unwrap();
    let ary_addr = ary.ref_addr().unwrap();
    array::array_push(&mut f.mem, &mut f.env.pool, ary_addr, Value::Integer(1)).unwrap();
    array::array_push(&mut f.mem, &mut f.env.pool, ary_addr, Value::Integer(2)).unwrap();

    f.vm.regs[5] = Value::Nil;
    f.vm.regs[6] = ary;
    f.call(id::OBJ_PUTS, 5, 1);
    assert_eq!(f.console.as_string(), "1\n2\n");
}

#[test]
fn print_writes_without_separators_and_returns_nil() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Nil;
    f.vm.regs[6] = f.string(b"a");
    f.vm.regs[7] = Value::Integer(1);

    f.call(id::OBJ_PRINT, 5, 2);
    assert_eq!(f.console.as_string(), "a1");
    assert_eq!(f.vm.regs[5], Value::Nil);
}

#[test]
fn raise_with_message_string() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Nil;
    f.vm.regs[6] = f.string(b"boom");

    f.call(id::OBJ_RAISE, 5, 1);

    assert_eq!(f.pending_exception_class(), f.env.classes.runtime_error);
    let Value::Exception(addr) = f.vm.exc else {
        unreachable!()
    };
    let header: RException = f.mem.read(addr);
    let Value::String(msg) = header.message else {
        panic!("message expected");
    };
    assert_eq!(string_bytes(&f.mem, msg), b"boom");
}

#[test]
fn raise_with_class_and_with_both() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Nil;
    f.vm.regs[6] = Value::Class(f.env.classes.index_error);
    f.call(id::OBJ_RAISE, 5, 1);
    assert_eq!(f.pending_exception_class(), f.env.classes.index_error);

    f.vm.set_exc(&mut f.mem, &mut f.env.pool, Value::Nil);
    f.vm.regs[6] = Value::Class(f.env.classes.range_error);
    f.vm.regs[7] = f.string(b"out of range");
    f.call(id::OBJ_RAISE, 5, 2);
    assert_eq!(f.pending_exception_class(), f.env.classes.range_error);
}

#[test]
fn raise_with_no_arguments_is_a_runtime_error() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Nil;
    f.call(id::OBJ_RAISE, 5, 0);
    assert_eq!(f.pending_exception_class(), f.env.classes.runtime_error);
}

#[test]
fn raise_rejects_other_argument_shapes() {
    // Anything outside the four accepted forms is itself a TypeError.
    let mut f = fixture();
    f.vm.regs[5] = Value::Nil;
    f.vm.regs[6] = Value::Integer(3);
    f.call(id::OBJ_RAISE, 5, 1);
    assert_eq!(f.pending_exception_class(), f.env.classes.type_error);

    // A non-exception class is rejected too.
    f.vm.set_exc(&mut f.mem, &mut f.env.pool, Value::Nil);
    f.vm.regs[6] = Value::Class(f.env.classes.string);
    f.call(id::OBJ_RAISE, 5, 1);
    assert_eq!(f.pending_exception_class(), f.env.classes.type_error);
}

#[test]
fn cmp_returns_ordering_or_nil_sentinel() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Integer(1);
    f.vm.regs[6] = Value::Integer(2);
    f.call(id::OBJ_CMP, 5, 1);
    assert_eq!(f.vm.regs[5], Value::Integer(-1));

    f.vm.regs[5] = Value::Integer(1);
    f.vm.regs[6] = f.string(b"x");
    f.call(id::OBJ_CMP, 5, 1);
    assert_eq!(f.vm.regs[5], Value::Nil, "undefined comparison yields nil");
}

#[test]
fn dup_copies_objects_shallowly() {
    let mut f = fixture();
    let inst = instance_new(&mut f.mem, &mut f.env.pool, f.env.classes.object).unwrap();
    let obj = inst.ref_addr().unwrap();
    let x = f.env.syms.intern_static(&f.mem, "@x").unwrap();
    class::ivar_set(&mut f.mem, &mut f.env.pool, obj, x, Value::Integer(5)).unwrap();

    f.vm.regs[5] = inst;
    f.call(id::OBJ_DUP, 5, 0);

    let Value::Object(dup) = f.vm.regs[5] else {
        panic!("dup should produce an object");
    };
    assert_ne!(dup, obj);
    assert_eq!(class::ivar_get(&f.mem, dup, x), Value::Integer(5));

    let src_header: RObject = f.mem.read(dup);
    assert_eq!(src_header.cls, f.env.classes.object);
}

#[test]
fn dup_stays_unimplemented_for_procs_and_ranges() {
    let mut f = fixture();
    let range = crate::value::heap::range_new(
        &mut f.mem,
        &mut f.env.pool,
        Value::Integer(1),
        Value::Integer(2),
        false,
    )
    .unwrap();

    f.vm.regs[5] = range;
    f.call(id::OBJ_DUP, 5, 0);
    assert_eq!(f.pending_exception_class(), f.env.classes.type_error);
}

#[test]
fn dup_on_immediates_is_identity() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Integer(3);
    f.call(id::OBJ_DUP, 5, 0);
    assert_eq!(f.vm.regs[5], Value::Integer(3));
}

#[test]
fn kind_of_walks_the_ancestry() {
    let mut f = fixture();
    let exc = exception_new(
        &mut f.mem,
        &mut f.env.pool,
        f.env.classes.runtime_error,
        Value::Nil,
    )
    .unwrap();

    f.vm.regs[5] = exc;
    f.vm.regs[6] = Value::Class(f.env.classes.standard_error);
    f.call(id::OBJ_KIND_OF, 5, 1);
    assert_eq!(f.vm.regs[5], Value::True);
}

#[test]
fn new_builds_an_instance_with_count_one() {
    let mut f = fixture();
    // The register takes its own count on the class payload.
    f.vm.regs[5] = Value::Class(f.env.classes.object);
    crate::value::rc::incref(&mut f.mem, f.vm.regs[5]);

    f.call(id::OBJ_NEW, 5, 0);

    let Value::Object(obj) = f.vm.regs[5] else {
        panic!("new should produce an instance");
    };
    assert_eq!(refcount(&f.mem, obj), 1);
    let header: RObject = f.mem.read(obj);
    assert_eq!(header.cls, f.env.classes.object);
    assert!(f.vm.exc.is_nil());
}

#[test]
fn to_s_and_inspect_render_values() {
    let mut f = fixture();
    f.vm.regs[5] = Value::Integer(42);
    f.call(id::OBJ_TO_S, 5, 0);
    let Value::String(s) = f.vm.regs[5] else {
        panic!("to_s should produce a string");
    };
    assert_eq!(string_bytes(&f.mem, s), b"42");

    f.vm.regs[5] = f.string(b"hi");
    f.call(id::OBJ_INSPECT, 5, 0);
    let Value::String(s) = f.vm.regs[5] else {
        panic!("inspect should produce a string");
    };
    assert_eq!(string_bytes(&f.mem, s), b"\"hi\"");
}

#[test]
fn string_builtins() {
    let mut f = fixture();

    f.vm.regs[5] = f.string(b"foo");
    f.vm.regs[6] = f.string(b"bar");
    f.call(id::STR_ADD, 5, 1);
    let Value::String(s) = f.vm.regs[5] else {
        panic!("+ should produce a string");
    };
    assert_eq!(string_bytes(&f.mem, s), b"foobar");

    f.call(id::STR_SIZE, 5, 0);
    assert_eq!(f.vm.regs[5], Value::Integer(6));

    f.vm.regs[5] = f.string(b"");
    f.call(id::STR_EMPTY, 5, 0);
    assert_eq!(f.vm.regs[5], Value::True);

    f.vm.regs[5] = f.string(b"name");
    f.call(id::STR_TO_SYM, 5, 0);
    let Value::Symbol(sym) = f.vm.regs[5] else {
        panic!("to_sym should produce a symbol");
    };
    assert_eq!(f.env.syms.name(&f.mem, sym).unwrap(), b"name");
}

#[test]
fn symbol_to_s_round_trips() {
    let mut f = fixture();
    let sym = f.env.syms.intern_static(&f.mem, "hello").unwrap();
    f.vm.regs[5] = Value::Symbol(sym);
    f.call(id::SYM_TO_S, 5, 0);
    let Value::String(s) = f.vm.regs[5] else {
        panic!("to_s should produce a string");
    };
    assert_eq!(string_bytes(&f.mem, s), b"hello");
}

#[test]
fn exc_message_falls_back_to_the_class_name() {
    let mut f = fixture();
    let exc = exception_new(
        &mut f.mem,
        &mut f.env.pool,
        f.env.classes.type_error,
        Value::Nil,
    )
    .unwrap();
    f.vm.regs[5] = exc;
    f.call(id::EXC_MESSAGE, 5, 0);
    let Value::String(s) = f.vm.regs[5] else {
        panic!("message should produce a string");
    };
    assert_eq!(string_bytes(&f.mem, s), b"TypeError");
}

#[test]
fn attr_accessor_synthesizes_both_methods() {
    let mut f = fixture();
    let cls = class::define_class(
        &mut f.mem,
        &mut f.env.pool,
        &mut f.env.syms,
        "Point",
        f.env.classes.object,
    )
    .unwrap();
    let x = f.env.syms.intern_static(&f.mem, "x").unwrap();

    f.vm.regs[5] = Value::Class(cls);
    crate::value::rc::incref(&mut f.mem, f.vm.regs[5]);
    f.vm.regs[6] = Value::Symbol(x);
    f.call(id::OBJ_ATTR_ACCESSOR, 5, 1);

    let at_x = f.env.syms.find(&f.mem, b"@x").expect("@x interned");
    assert_eq!(
        class::find_method(&f.mem, cls, x),
        Some(Method::IvarGetter(at_x))
    );
    let writer = f.env.syms.find(&f.mem, b"x=").expect("x= interned");
    assert_eq!(
        class::find_method(&f.mem, cls, writer),
        Some(Method::IvarSetter(at_x))
    );
}

#[test]
fn ivar_get_and_set_builtins() {
    let mut f = fixture();
    let inst = instance_new(&mut f.mem, &mut f.env.pool, f.env.classes.object).unwrap();
    let at_y: SymId = f.env.syms.intern_static(&f.mem, "@y").unwrap();

    // The receiver register is overwritten with the result twice; give
    // it a count for each placement.
    crate::value::rc::incref(&mut f.mem, inst);
    crate::value::rc::incref(&mut f.mem, inst);

    f.vm.regs[5] = inst;
    f.vm.regs[6] = Value::Symbol(at_y);
    f.vm.regs[7] = Value::Integer(11);
    f.call(id::OBJ_IVAR_SET, 5, 2);
    assert_eq!(f.vm.regs[5], Value::Integer(11), "setter returns the value");

    f.vm.regs[5] = inst;
    f.vm.regs[6] = Value::Symbol(at_y);
    f.call(id::OBJ_IVAR_GET, 5, 1);
    assert_eq!(f.vm.regs[5], Value::Integer(11));
}
