//! Length, pointer and value extraction for [`ArrayValue`] operands.
//!
//! Every consumer goes through these helpers, so the `Null` and
//! `DecomposedSlice` special cases live in one place.

use strata_llir::ValueId;
use strata_types::{Idx, Tag};

use super::array_lowerer::ArrayLowerer;
use crate::ArrayValue;

impl ArrayLowerer<'_, '_, '_> {
    /// Length of an array operand, as `i64`.
    ///
    /// Dynamic arrays in memory load only the length field; fixed arrays
    /// and vectors yield their dimension without touching storage.
    pub fn array_len(&mut self, v: ArrayValue) -> ValueId {
        let ty = v.ty();
        match self.pool.tag(ty) {
            Tag::DynArray => match v {
                ArrayValue::Null { .. } => self.builder.const_i64(0),
                ArrayValue::Addressable { ptr, .. } => {
                    let field = self.builder.struct_gep(ptr, 0, ".len");
                    self.builder.load(field, ".len")
                }
                ArrayValue::Materialized { value, .. } | ArrayValue::Constant { value, .. } => {
                    self.builder.extract_value(value, 0, ".len")
                }
                ArrayValue::DecomposedSlice { len, .. } => len,
            },
            Tag::FixedArray | Tag::Vector => {
                assert_not_pair(v);
                let dim = self.pool.dim(ty).unwrap_or(0);
                self.builder.const_i64(dim)
            }
            _ => panic!(
                "internal error: length of non-array `{}`",
                self.pool.display(ty)
            ),
        }
    }

    /// Element pointer of an array operand, typed as a pointer to the
    /// element's memory type.
    ///
    /// The stored pointer may have a different element type than the
    /// operand's (after an implicit upcast); it is reinterpreted.
    pub fn array_ptr(&mut self, v: ArrayValue) -> ValueId {
        let ty = v.ty();
        let wanted = self.elem_ptr_type(ty);
        let ptr = match self.pool.tag(ty) {
            Tag::DynArray => match v {
                ArrayValue::Null { .. } => return self.builder.const_null(wanted),
                ArrayValue::Addressable { ptr, .. } => {
                    let field = self.builder.struct_gep(ptr, 1, ".ptr");
                    self.builder.load(field, ".ptr")
                }
                ArrayValue::Materialized { value, .. } | ArrayValue::Constant { value, .. } => {
                    self.builder.extract_value(value, 1, ".ptr")
                }
                ArrayValue::DecomposedSlice { ptr, .. } => ptr,
            },
            Tag::FixedArray | Tag::Vector => {
                assert_not_pair(v);
                self.make_lvalue(v, ".tmp")
            }
            Tag::Pointer => self.rvalue(v),
            _ => panic!(
                "internal error: element pointer of non-array `{}`",
                self.pool.display(ty)
            ),
        };
        self.builder.bitcast(ptr, wanted, ".ptr")
    }

    /// Size of one element of an array-like type, in bytes.
    pub(crate) fn elem_size(&self, array_ty: Idx) -> u64 {
        self.pool.size_of(self.pool.elem(array_ty))
    }

    /// The operand's value in its register type.
    ///
    /// `bool` in memory is `i8` and is truncated back to `i1`.
    pub fn rvalue(&mut self, v: ArrayValue) -> ValueId {
        match v {
            ArrayValue::Addressable { ty, ptr } => {
                let loaded = self.builder.load(ptr, "");
                if self.pool.tag(ty) == Tag::Bool {
                    let i1 = self.builder.i1_type();
                    self.builder.trunc(loaded, i1, ".tobool")
                } else {
                    loaded
                }
            }
            ArrayValue::Materialized { value, .. } | ArrayValue::Constant { value, .. } => value,
            ArrayValue::DecomposedSlice { ty, len, ptr } => {
                let header = self.mem_type(ty);
                let elem_ptr = self.elem_ptr_type(ty);
                let ptr = self.builder.bitcast(ptr, elem_ptr, "");
                self.builder.build_struct(header, &[len, ptr], ".slice")
            }
            ArrayValue::Null { ty } => {
                let lowered = self.mem_type(ty);
                self.builder.const_zero(lowered)
            }
        }
    }

    /// Address of an operand, spilling it to a stack slot if it has no
    /// storage of its own.
    pub fn make_lvalue(&mut self, v: ArrayValue, name: &str) -> ValueId {
        if let ArrayValue::Addressable { ptr, .. } = v {
            return ptr;
        }
        let ty = self.mem_type(v.ty());
        let slot = self.builder.alloca(ty, name);
        let value = self.rvalue(v);
        self.store_value(value, slot);
        slot
    }

    /// Store a register value to memory, widening `i1` to its `i8`
    /// storage type.
    pub fn store_value(&mut self, value: ValueId, ptr: ValueId) {
        let stored = self.builder.pointee_of(ptr);
        let i1 = self.builder.i1_type();
        let value = if self.builder.type_of(value) == i1 && stored != i1 {
            self.builder.zext(value, stored, ".frombool")
        } else {
            value
        };
        self.builder.store(value, ptr);
    }

    /// Re-bind a `{ length, pointer }` pair returned by the runtime as a
    /// value of `array_ty`.
    ///
    /// A pair that already has the array's IR type is used as is;
    /// otherwise its fields are split and the pointer reinterpreted.
    pub fn get_slice(&mut self, array_ty: Idx, pair: ValueId) -> ArrayValue {
        let header = self.mem_type(array_ty);
        if self.builder.type_of(pair) == header {
            return ArrayValue::Materialized {
                ty: array_ty,
                value: pair,
            };
        }
        let len = self.builder.extract_value(pair, 0, ".len");
        let ptr = self.builder.extract_value(pair, 1, ".ptr");
        let elem_ptr = self.elem_ptr_type(array_ty);
        let ptr = self.builder.bitcast(ptr, elem_ptr, "");
        ArrayValue::DecomposedSlice {
            ty: array_ty,
            len,
            ptr,
        }
    }

    /// `{ len, ptr as i8* }`, the type-erased pair the runtime takes.
    pub(crate) fn make_byte_slice(&mut self, len: ValueId, ptr: ValueId) -> ValueId {
        let slice = self.slice_type();
        let i8_ptr = self.builder.i8_ptr_type();
        let ptr = self.builder.bitcast(ptr, i8_ptr, "");
        self.builder.build_struct(slice, &[len, ptr], ".slice")
    }

    /// An array operand as a type-erased `{ i64, i8* }`.
    pub fn byte_slice(&mut self, v: ArrayValue) -> ValueId {
        let len = self.array_len(v);
        let ptr = self.array_ptr(v);
        self.make_byte_slice(len, ptr)
    }

    /// Address of a dynamic array's header, as the runtime's `{ i64, i8* }*`.
    pub(crate) fn header_ptr(&mut self, v: ArrayValue) -> ValueId {
        let header = v.addr();
        let slice = self.slice_type();
        let slice_ptr = self.builder.ptr_type(slice);
        self.builder.bitcast(header, slice_ptr, "")
    }
}

fn assert_not_pair(v: ArrayValue) {
    assert!(
        !matches!(
            v,
            ArrayValue::Null { .. } | ArrayValue::DecomposedSlice { .. }
        ),
        "internal error: fixed array operand {v:?} is null or a bare pair"
    );
}

#[cfg(test)]
mod tests;
