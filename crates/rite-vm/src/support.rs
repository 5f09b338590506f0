// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared test scaffolding: hand-assembles RITE02 containers so loader,
//! VM and runtime tests can execute real bytecode without a compiler.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::string::String;
use std::vec::Vec;

/// A pool literal for [`IrepBuilder`].
pub enum PoolLit {
    /// Tag 0: length-prefixed string.
    Str(String),
    /// Tag 1: 32-bit integer.
    Int32(i32),
    /// Tag 3: 64-bit integer.
    Int64(i64),
    /// Tag 5: IEEE double.
    Float(f64),
}

/// A catch-handler record under construction.
pub struct CatchSpec {
    /// 0 = rescue, 1 = ensure.
    pub kind: u8,
    /// Protected range start.
    pub begin: u32,
    /// Protected range end (exclusive).
    pub end: u32,
    /// Handler entry offset.
    pub target: u32,
}

/// Builds one irep record (and its children).
pub struct IrepBuilder {
    nlocals: u16,
    nregs: u16,
    code: Vec<u8>,
    catches: Vec<CatchSpec>,
    pool: Vec<PoolLit>,
    syms: Vec<Vec<u8>>,
    children: Vec<IrepBuilder>,
}

impl IrepBuilder {
    /// Start an irep with the given register window sizing.
    pub fn new(nlocals: u16, nregs: u16) -> Self {
        Self {
            nlocals,
            nregs,
            code: Vec::new(),
            catches: Vec::new(),
            pool: Vec::new(),
            syms: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Append raw instruction bytes.
    pub fn op(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Current code offset (for computing jump targets).
    pub fn here(&self) -> usize {
        self.code.len()
    }

    /// Intern a symbol into the per-irep table, returning its index.
    pub fn sym(&mut self, name: &str) -> u8 {
        let bytes = name.as_bytes().to_vec();
        if let Some(i) = self.syms.iter().position(|s| *s == bytes) {
            return i as u8;
        }
        self.syms.push(bytes);
        (self.syms.len() - 1) as u8
    }

    /// Add a pool literal, returning its index.
    pub fn lit(&mut self, lit: PoolLit) -> u8 {
        self.pool.push(lit);
        (self.pool.len() - 1) as u8
    }

    /// Add a catch handler record.
    pub fn catch(&mut self, spec: CatchSpec) -> &mut Self {
        self.catches.push(spec);
        self
    }

    /// Add a child irep, returning its index.
    pub fn child(&mut self, child: IrepBuilder) -> u8 {
        self.children.push(child);
        (self.children.len() - 1) as u8
    }

    /// Serialize this record, recursively including children.
    pub fn record(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.nlocals.to_be_bytes());
        body.extend_from_slice(&self.nregs.to_be_bytes());
        body.extend_from_slice(&(self.children.len() as u16).to_be_bytes());
        body.extend_from_slice(&(self.catches.len() as u16).to_be_bytes());
        body.extend_from_slice(&(self.code.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.code);

        for c in &self.catches {
            body.push(c.kind);
            body.extend_from_slice(&c.begin.to_be_bytes());
            body.extend_from_slice(&c.end.to_be_bytes());
            body.extend_from_slice(&c.target.to_be_bytes());
        }

        body.extend_from_slice(&(self.pool.len() as u16).to_be_bytes());
        for lit in &self.pool {
            match lit {
                PoolLit::Str(s) => {
                    body.push(0);
                    body.extend_from_slice(&(s.len() as u16).to_be_bytes());
                    body.extend_from_slice(s.as_bytes());
                    body.push(0);
                }
                PoolLit::Int32(n) => {
                    body.push(1);
                    body.extend_from_slice(&n.to_be_bytes());
                }
                PoolLit::Int64(n) => {
                    body.push(3);
                    body.extend_from_slice(&n.to_be_bytes());
                }
                PoolLit::Float(f) => {
                    body.push(5);
                    body.extend_from_slice(&f.to_be_bytes());
                }
            }
        }

        body.extend_from_slice(&(self.syms.len() as u16).to_be_bytes());
        for name in &self.syms {
            body.extend_from_slice(&(name.len() as u16).to_be_bytes());
            body.extend_from_slice(name);
            body.push(0);
        }

        // record_size covers the whole nested record.
        let mut nested = Vec::new();
        for child in &self.children {
            nested.extend_from_slice(&child.record());
        }

        let total = 4 + body.len() + nested.len();
        let mut record = Vec::with_capacity(total);
        record.extend_from_slice(&(total as u32).to_be_bytes());
        record.extend_from_slice(&body);
        record.extend_from_slice(&nested);
        record
    }
}

/// Wrap a root irep record into a complete RITE02 container.
pub fn rite_file(root: &IrepBuilder) -> Vec<u8> {
    let record = root.record();

    let mut file = Vec::new();
    file.extend_from_slice(b"RITE0200");
    let total = 20 + 8 + record.len() + 8;
    file.extend_from_slice(&(total as u32).to_be_bytes());
    file.extend_from_slice(b"MATZ");
    file.extend_from_slice(b"0000");

    file.extend_from_slice(b"IREP");
    file.extend_from_slice(&((8 + record.len()) as u32).to_be_bytes());
    file.extend_from_slice(&record);

    file.extend_from_slice(b"END\0");
    file.extend_from_slice(&8u32.to_be_bytes());

    file
}
