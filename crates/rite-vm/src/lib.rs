// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Rite VM
//!
//! Runtime for mruby "RITE02" bytecode on fixed-pool targets.
//!
//! This crate provides:
//! - A first-fit, coalescing allocator over a caller-supplied byte pool
//! - The tagged value representation with reference-counted heap payloads
//! - The class registry and method lookup graph
//! - A loader for the RITE02 bytecode container
//! - The symbol interner (string <-> dense id)
//! - The bytecode dispatcher with catch/raise unwinding
//! - Built-in classes (Object, Nil, True, False, Integer, Float, Symbol,
//!   String, Array, Hash, Range, Proc, Exception) and their method shims
//!
//! All allocation routes through the pool; the host allocator is only
//! used by test scaffolding. The runtime is single-threaded: native code
//! may only re-enter the interpreter through the VM's snapshot/restore
//! protocol.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod builtins;
pub mod bytecode;
pub mod class;
pub mod console;
pub mod loader;
pub mod mem;
pub mod platform;
pub mod runtime;
pub mod symbol;
pub mod types;
pub mod value;
pub mod vm;

#[cfg(test)]
mod support;

// Re-export commonly used types at crate root
pub use mem::MemPool;
pub use platform::MemorySpace;
pub use runtime::{Env, Task};
pub use symbol::SymId;
pub use types::Addr;
pub use value::Value;

/// Crate version.
pub const VERSION: &str = match option_env!("RITE_VERSION") {
    Some(v) => v,
    None => "unknown",
};
