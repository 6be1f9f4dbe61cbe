//! The store: an immutable, persistent map from addresses to values.
//!
//! Backed by `im::OrdMap`, a balanced, structurally-shared tree -- the same shape of
//! persistent map interpreters and VMs elsewhere in this tree reach for when a step
//! needs to return a brand-new store without recopying everything in it (see
//! `DESIGN.md`). `extend` never mutates its receiver: every prior `Store` remains a
//! valid, independently inspectable snapshot, which is what makes replay and
//! abstract-interpretation-style tooling built on top of this machine possible.

use im::OrdMap;

use crate::pointer::Addr;
use crate::value::Value;

#[derive(Clone, Debug, Default)]
pub struct Store(OrdMap<Addr, Value>);

impl Store {
    pub fn new() -> Self {
        Store(OrdMap::new())
    }

    pub fn get(&self, addr: &Addr) -> Option<&Value> {
        self.0.get(addr)
    }

    /// Returns a new store with `addr` bound to `value`, overriding any previous
    /// binding for `addr`. `self` is left untouched.
    pub fn extend(&self, addr: Addr, value: Value) -> Store {
        Store(self.0.update(addr, value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
