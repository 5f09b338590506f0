// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the runtime environment and host entry.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::{EXIT_ABORTED, EXIT_OK, Env, MAX_GLOBALS, VarTable};
use crate::bytecode::op;
use crate::console::BufferConsole;
use crate::loader::LoadError;
use crate::mem::MemPool;
use crate::platform::HostMem;
use crate::support::{IrepBuilder, rite_file};
use crate::symbol::SymId;
use crate::types::Addr;
use crate::value::Value;

const POOL_SIZE: u32 = 128 * 1024;

fn setup() -> (HostMem, Env) {
    let mut mem = HostMem::new(POOL_SIZE as usize);
    let env = Env::init(&mut mem, Addr::NULL, POOL_SIZE).expect("env");
    (mem, env)
}

#[test]
fn init_publishes_builtin_classes_as_constants() {
    let (mem, env) = setup();

    for name in [
        "Object",
        "String",
        "Exception",
        "StandardError",
        "RuntimeError",
        "NoMemoryError",
        "BytecodeError",
    ] {
        let sym = env.syms.find(&mem, name.as_bytes()).expect("interned");
        let Some(Value::Class(_)) = env.consts.get(sym) else {
            panic!("{name} should be a class constant");
        };
    }
}

#[test]
fn isolated_environments_do_not_share_state() {
    let (mut mem_a, mut env_a) = setup();
    let (mem_b, env_b) = setup();

    let extra = env_a
        .syms
        .intern(&mut mem_a, &mut env_a.pool, b"only_in_a")
        .unwrap();
    assert!(env_a.syms.name(&mem_a, extra).is_some());
    assert!(env_b.syms.find(&mem_b, b"only_in_a").is_none());
}

#[test]
fn minimal_task_runs_to_completion() {
    let (mut mem, mut env) = setup();
    let mut root = IrepBuilder::new(1, 4);
    root.op(&[op::RETURN, 0]);
    let buf = rite_file(&root);

    let mut task = env.create_task(&mut mem, &buf).expect("load");
    let mut console = BufferConsole::new();
    assert_eq!(env.run(&mut mem, &mut console, &task), EXIT_OK);
    assert!(console.bytes().is_empty());
    task.release(&mut mem, &mut env);
}

#[test]
fn create_task_surfaces_loader_errors() {
    let (mut mem, mut env) = setup();
    assert_eq!(
        env.create_task(&mut mem, b"not bytecode").map(|_| ()),
        Err(LoadError::BadMagic)
    );
}

#[test]
fn unhandled_exception_aborts_and_reports() {
    let (mut mem, mut env) = setup();
    let mut root = IrepBuilder::new(1, 4);
    let raise = root.sym("raise");
    root.op(&[op::SSEND, 1, raise, 0]);
    root.op(&[op::RETURN, 0]);
    let buf = rite_file(&root);

    let mut task = env.create_task(&mut mem, &buf).expect("load");
    let mut console = BufferConsole::new();
    assert_eq!(env.run(&mut mem, &mut console, &task), EXIT_ABORTED);
    assert_eq!(
        console.as_string(),
        "Exception: RuntimeError (RuntimeError)\n"
    );
    task.release(&mut mem, &mut env);
}

#[test]
fn load_then_release_is_net_zero_on_the_pool() {
    // Loading a file then releasing its irep frees exactly
    // what the load claimed, net of interned-symbol storage (sealed
    // bytes are accounted separately).
    let (mut mem, mut env) = setup();
    let mut root = IrepBuilder::new(1, 4);
    let m = root.sym("fresh_method_name");
    root.op(&[op::SSEND, 1, m, 0]);
    root.op(&[op::RETURN, 0]);
    let buf = rite_file(&root);

    let used_before_any = env.pool.statistics(&mem).used;
    let sealed_before = env.pool.statistics(&mem).sealed;

    let mut task = env.create_task(&mut mem, &buf).expect("load");
    task.release(&mut mem, &mut env);

    let stats = env.pool.statistics(&mem);
    assert_eq!(stats.used, used_before_any, "irep bytes returned");
    assert!(
        stats.sealed > sealed_before,
        "the fresh symbol was sealed into never-freed storage"
    );

    // A second load interns nothing new and is also net-zero.
    let mut task = env.create_task(&mut mem, &buf).expect("reload");
    task.release(&mut mem, &mut env);
    let again = env.pool.statistics(&mem);
    assert_eq!(again.used, used_before_any);
    assert_eq!(again.sealed, stats.sealed);
}

#[test]
fn release_is_idempotent() {
    let (mut mem, mut env) = setup();
    let mut root = IrepBuilder::new(1, 4);
    root.op(&[op::RETURN, 0]);
    let buf = rite_file(&root);

    let before = env.pool.statistics(&mem).used;
    let mut task = env.create_task(&mut mem, &buf).expect("load");
    task.release(&mut mem, &mut env);
    task.release(&mut mem, &mut env);
    assert_eq!(env.pool.statistics(&mem).used, before);
}

#[test]
fn var_table_overwrites_and_rejects_overflow() {
    let mut mem = HostMem::new(4096);
    let mut pool = MemPool::new(&mut mem, Addr::NULL, 4096).unwrap();
    let mut table: VarTable<MAX_GLOBALS> = VarTable::new();

    let sym = SymId::new(1);
    table.set(&mut mem, &mut pool, sym, Value::Integer(1)).unwrap();
    table.set(&mut mem, &mut pool, sym, Value::Integer(2)).unwrap();
    assert_eq!(table.get(sym), Some(Value::Integer(2)));
    assert_eq!(table.get(SymId::new(9)), None);

    for i in 0..MAX_GLOBALS as u16 {
        // Slot 1 is taken; the rest fill the table.
        let _ = table.set(&mut mem, &mut pool, SymId::new(100 + i), Value::Nil);
    }
    assert!(
        table
            .set(&mut mem, &mut pool, SymId::new(999), Value::Nil)
            .is_none()
    );
}

#[test]
fn tasks_can_run_repeatedly_from_one_environment() {
    let (mut mem, mut env) = setup();
    let mut root = IrepBuilder::new(1, 8);
    let p = root.sym("p");
    root.op(&[op::LOADI, 3, 5]);
    root.op(&[op::SSEND, 2, p, 1]);
    root.op(&[op::RETURN, 0]);
    let buf = rite_file(&root);

    for _ in 0..3 {
        let mut task = env.create_task(&mut mem, &buf).expect("load");
        let mut console = BufferConsole::new();
        assert_eq!(env.run(&mut mem, &mut console, &task), EXIT_OK);
        assert_eq!(console.as_string(), "5\n");
        task.release(&mut mem, &mut env);
    }
}
