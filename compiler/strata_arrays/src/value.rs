//! Code-generation handles for array operands.

use strata_llir::ValueId;
use strata_types::Idx;

/// How an operand is known while generating code.
///
/// Array operands are the main users; element values, broadcast scalars
/// and literal elements use the same representation, where `Addressable`
/// holds a pointer to the value's storage and `Materialized`/`Constant`
/// hold the value itself.
///
/// Values live for one statement and own no storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArrayValue {
    /// Storage exists at `ptr`, typed as a pointer to the IR memory type.
    Addressable { ty: Idx, ptr: ValueId },
    /// A computed value without backing storage, e.g. a runtime result.
    Materialized { ty: Idx, value: ValueId },
    /// A dynamic array tracked as separate length and element pointer.
    DecomposedSlice { ty: Idx, len: ValueId, ptr: ValueId },
    /// The null dynamic array.
    Null { ty: Idx },
    /// A compile-time constant.
    Constant { ty: Idx, value: ValueId },
}

impl ArrayValue {
    /// Source type of the operand.
    pub fn ty(&self) -> Idx {
        match *self {
            ArrayValue::Addressable { ty, .. }
            | ArrayValue::Materialized { ty, .. }
            | ArrayValue::DecomposedSlice { ty, .. }
            | ArrayValue::Null { ty }
            | ArrayValue::Constant { ty, .. } => ty,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArrayValue::Null { .. })
    }

    /// True if the operand has storage.
    pub fn is_lvalue(&self) -> bool {
        matches!(self, ArrayValue::Addressable { .. })
    }

    /// Address of the operand's storage.
    ///
    /// Asking for the address of a value without storage is a compiler
    /// bug.
    pub fn addr(&self) -> ValueId {
        match *self {
            ArrayValue::Addressable { ptr, .. } => ptr,
            other => panic!("internal error: {other:?} has no storage"),
        }
    }

    /// True for a length/pointer pair without storage of its own.
    pub fn is_slice(&self) -> bool {
        matches!(self, ArrayValue::DecomposedSlice { .. })
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, ArrayValue::Constant { .. })
    }
}
