// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Printer for values.
//!
//! Renders the `to_s` and `inspect` forms of every tag to a
//! [`Console`]. Used by the `p`/`puts`/`print` shims and by the
//! unhandled-exception report.

use crate::console::{Console, FmtWriter};
use crate::platform::MemorySpace;
use crate::symbol::SymbolTable;
use crate::types::Addr;
use crate::value::Value;
use crate::value::heap::{RArray, RClass, RException, RHash, RObject, RRange};
use crate::value::string::string_bytes;
use core::fmt::Write;

/// Print a value to the console.
///
/// With `inspect` set, strings are quoted and escaped and nil renders
/// as `nil`; otherwise strings print raw and nil prints nothing.
pub fn print_value<M: MemorySpace, C: Console>(
    mem: &M,
    syms: &SymbolTable,
    value: Value,
    inspect: bool,
    out: &mut C,
) {
    match value {
        Value::Nil => {
            if inspect {
                out.write_str("nil");
            }
        }
        Value::False => out.write_str("false"),
        Value::True => out.write_str("true"),
        Value::Integer(n) => {
            let _ = write!(FmtWriter(out), "{n}");
        }
        Value::Float(f) => print_float(f, out),
        Value::Symbol(id) => {
            if inspect {
                out.write_str(":");
            }
            out.write_bytes(syms.name(mem, id).unwrap_or(b"?"));
        }
        Value::String(addr) => {
            if inspect {
                out.write_str("\"");
                print_escaped(string_bytes(mem, addr), out);
                out.write_str("\"");
            } else {
                out.write_bytes(string_bytes(mem, addr));
            }
        }
        Value::Array(addr) => print_array(mem, syms, addr, out),
        Value::Hash(addr) => print_hash(mem, syms, addr, out),
        Value::Range(addr) => print_range(mem, syms, addr, out),
        Value::Class(addr) => out.write_bytes(class_name(mem, syms, addr)),
        Value::Object(addr) => {
            let header: RObject = mem.read(addr);
            out.write_str("#<");
            out.write_bytes(class_name(mem, syms, header.cls));
            out.write_str(">");
        }
        Value::Exception(addr) => print_exception(mem, syms, addr, inspect, out),
        Value::Proc(_) => out.write_str("#<Proc>"),
        Value::Handle(_) => out.write_str("#<Handle>"),
        Value::Empty => {}
    }
}

/// The name bytes of a class, `"?"` when unreadable.
pub fn class_name<'a, M: MemorySpace>(
    mem: &'a M,
    syms: &'a SymbolTable,
    cls: Addr,
) -> &'a [u8] {
    if cls.is_null() {
        return b"?";
    }
    let header: RClass = mem.read(cls);
    syms.name(mem, header.name).unwrap_or(b"?")
}

fn print_float<C: Console>(f: f64, out: &mut C) {
    if !f.is_finite() {
        let _ = write!(FmtWriter(out), "{f}");
        return;
    }
    // Match Ruby's rendering of integral floats ("7.0", not "7").
    let mut buf = FloatBuf::default();
    let _ = write!(&mut buf, "{f}");
    out.write_bytes(buf.bytes());
    if !buf.bytes().iter().any(|&b| b == b'.' || b == b'e') {
        out.write_str(".0");
    }
}

/// Small stack buffer for float formatting.
struct FloatBuf {
    data: [u8; 40],
    len: usize,
}

impl Default for FloatBuf {
    fn default() -> Self {
        Self {
            data: [0u8; 40],
            len: 0,
        }
    }
}

impl FloatBuf {
    fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl Write for FloatBuf {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let avail = self.data.len() - self.len;
        let take = s.len().min(avail);
        self.data[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

fn print_escaped<C: Console>(bytes: &[u8], out: &mut C) {
    for &b in bytes {
        match b {
            b'\n' => out.write_str("\\n"),
            b'\t' => out.write_str("\\t"),
            b'\r' => out.write_str("\\r"),
            b'\\' => out.write_str("\\\\"),
            b'"' => out.write_str("\\\""),
            b if b < 0x20 => {
                let _ = write!(FmtWriter(out), "\\x{b:02x}");
            }
            b => out.write_bytes(&[b]),
        }
    }
}

fn print_array<M: MemorySpace, C: Console>(mem: &M, syms: &SymbolTable, addr: Addr, out: &mut C) {
    let header: RArray = mem.read(addr);
    out.write_str("[");
    for i in 0..header.len {
        if i > 0 {
            out.write_str(", ");
        }
        let elem: Value = mem.read(
            header
                .data
                .add(u32::from(i) * core::mem::size_of::<Value>() as u32),
        );
        print_value(mem, syms, elem, true, out);
    }
    out.write_str("]");
}

fn print_hash<M: MemorySpace, C: Console>(mem: &M, syms: &SymbolTable, addr: Addr, out: &mut C) {
    use crate::value::kv;

    let kv_addr = addr.add(RHash::KV_OFFSET);
    out.write_str("{");
    for i in 0..kv::len(mem, kv_addr) {
        if i > 0 {
            out.write_str(", ");
        }
        if let Some(pair) = kv::pair_at(mem, kv_addr, i) {
            print_value(mem, syms, pair.key, true, out);
            out.write_str("=>");
            print_value(mem, syms, pair.value, true, out);
        }
    }
    out.write_str("}");
}

fn print_range<M: MemorySpace, C: Console>(mem: &M, syms: &SymbolTable, addr: Addr, out: &mut C) {
    let header: RRange = mem.read(addr);
    print_value(mem, syms, header.first, true, out);
    out.write_str(if header.exclusive != 0 { "..." } else { ".." });
    print_value(mem, syms, header.last, true, out);
}

fn print_exception<M: MemorySpace, C: Console>(
    mem: &M,
    syms: &SymbolTable,
    addr: Addr,
    inspect: bool,
    out: &mut C,
) {
    let header: RException = mem.read(addr);
    if inspect {
        out.write_str("#<");
        out.write_bytes(class_name(mem, syms, header.cls));
        if let Value::String(msg) = header.message {
            out.write_str(": ");
            out.write_bytes(string_bytes(mem, msg));
        }
        out.write_str(">");
    } else if let Value::String(msg) = header.message {
        out.write_bytes(string_bytes(mem, msg));
    } else {
        out.write_bytes(class_name(mem, syms, header.cls));
    }
}
