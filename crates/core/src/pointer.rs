//! Frame pointers, object pointers, and the addresses derived from them.
//!
//! Both pointer kinds are minted from the one counter in [`crate::context::MachineContext`],
//! so a [`FramePointer`] and an [`ObjectPointer`] allocated one after another are still
//! totally ordered against each other. That shared order is what makes the store's
//! address ordering (tag, then counter, then offset string) deterministic.

use std::fmt;

/// A fresh token minted on entry to a method.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FramePointer(u64);

/// A fresh token minted by `new`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectPointer(u64);

impl FramePointer {
    pub(crate) fn from_counter(n: u64) -> Self {
        FramePointer(n)
    }
}

impl ObjectPointer {
    pub(crate) fn from_counter(n: u64) -> Self {
        ObjectPointer(n)
    }
}

impl fmt::Debug for FramePointer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "fp{}", self.0)
    }
}

impl fmt::Debug for ObjectPointer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "obj{}", self.0)
    }
}

/// A store key: either a register slot in a frame, or a field slot on an object.
///
/// Derived `Ord` gives exactly the address ordering the design calls for: the enum's
/// declaration order is the pointer-kind tag, and each variant then orders by the
/// pointer's counter value before the offset string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Addr {
    Frame(FramePointer, String),
    Field(ObjectPointer, String),
}

impl Addr {
    pub fn frame(fp: FramePointer, register: impl Into<String>) -> Self {
        Addr::Frame(fp, register.into())
    }

    pub fn field(ptr: ObjectPointer, field: impl Into<String>) -> Self {
        Addr::Field(ptr, field.into())
    }
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Addr::Frame(fp, reg) => write!(f, "{fp:?}.{reg}"),
            Addr::Field(ptr, field) => write!(f, "{ptr:?}.{field}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_pointers_order_by_counter() {
        let a = FramePointer::from_counter(1);
        let b = FramePointer::from_counter(2);
        assert!(a < b);
    }

    #[test]
    fn addr_orders_by_tag_then_pointer_then_offset() {
        let fp0 = FramePointer::from_counter(0);
        let fp1 = FramePointer::from_counter(1);
        let op0 = ObjectPointer::from_counter(0);

        let a = Addr::frame(fp0, "a");
        let b = Addr::frame(fp0, "b");
        let c = Addr::frame(fp1, "a");
        let d = Addr::field(op0, "a");

        assert!(a < b, "same frame, offsets order lexicographically");
        assert!(b < c, "lower-numbered frame pointer sorts first");
        assert!(c < d, "Frame addresses sort before Field addresses");
    }
}
