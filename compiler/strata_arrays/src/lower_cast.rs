//! Casts from array operands.
//!
//! Array to dynamic array reinterprets the element pointer and rescales
//! the length to the new element size. Casts to a fixed array check that
//! the dynamic source is long enough first.

use strata_diagnostic::{Diagnostic, ErrorCode, ErrorGuaranteed};
use strata_ir::Loc;
use strata_llir::{IntPredicate, ValueId};
use strata_types::{Idx, Tag};

use super::array_lowerer::ArrayLowerer;
use crate::{ArrayValue, RuntimeFn};

impl ArrayLowerer<'_, '_, '_> {
    /// Cast the array operand `v` to `to`.
    ///
    /// Fails with a diagnostic when `v` is not an array, or when a fixed
    /// array's byte size is not a multiple of the new element size.
    pub fn cast_array(
        &mut self,
        v: ArrayValue,
        to: Idx,
        loc: Loc,
    ) -> Result<ArrayValue, ErrorGuaranteed> {
        let from = v.ty();
        tracing::debug!(
            from = %self.pool.display(from),
            to = %self.pool.display(to),
            "array cast"
        );
        let from_tag = self.pool.tag(from);
        if !matches!(from_tag, Tag::DynArray | Tag::FixedArray) {
            let message = format!(
                "cannot cast `{}` to `{}`",
                self.pool.display(from),
                self.pool.display(to)
            );
            return Err(self.emit_error(
                Diagnostic::error(ErrorCode::E4003)
                    .with_message(message)
                    .with_label(loc, "not an array"),
            ));
        }

        match self.pool.tag(to) {
            Tag::Pointer => {
                let ptr = self.array_ptr(v);
                let ptr_ty = self.mem_type(to);
                let ptr = self.builder.bitcast(ptr, ptr_ty, "");
                Ok(ArrayValue::Materialized { ty: to, value: ptr })
            }
            Tag::DynArray => {
                let from_size = self.elem_size(from);
                let to_size = self.elem_size(to);
                let len = if from_tag == Tag::FixedArray {
                    let dim = self.pool.dim(from).unwrap_or(0);
                    let bytes = dim * from_size;
                    if from_size != to_size {
                        if to_size == 0 || bytes % to_size != 0 {
                            let message = format!(
                                "cannot cast `{}` to `{}` since sizes don't line up",
                                self.pool.display(from),
                                self.pool.display(to)
                            );
                            let label = format!("{bytes} bytes is not a multiple of {to_size}");
                            return Err(self.emit_error(
                                Diagnostic::error(ErrorCode::E4004)
                                    .with_message(message)
                                    .with_label(loc, label),
                            ));
                        }
                        self.builder.const_i64(bytes / to_size)
                    } else {
                        self.builder.const_i64(dim)
                    }
                } else {
                    let len = self.array_len(v);
                    self.cast_len(len, from_size, to_size)
                };
                let ptr = self.array_ptr(v);
                let elem_ptr = self.elem_ptr_type(to);
                let ptr = self.builder.bitcast(ptr, elem_ptr, "");
                Ok(ArrayValue::DecomposedSlice { ty: to, len, ptr })
            }
            Tag::FixedArray => {
                let ptr = if from_tag == Tag::FixedArray {
                    self.make_lvalue(v, ".tmp")
                } else {
                    let to_bytes = self.pool.dim(to).unwrap_or(0) * self.elem_size(to);
                    // A target without bytes reads nothing.
                    if to_bytes > 0 {
                        let last = (to_bytes - 1) / self.elem_size(from).max(1);
                        let index = self.builder.const_i64(last);
                        self.check_index(v, Some(index), loc);
                    }
                    self.array_ptr(v)
                };
                Ok(self.reinterpret_as(ptr, to))
            }
            Tag::Bool => {
                let ptr = self.array_ptr(v);
                let ptr_ty = self.builder.type_of(ptr);
                let null = self.builder.const_null(ptr_ty);
                let value = self.builder.icmp(IntPredicate::Ne, ptr, null, "");
                Ok(ArrayValue::Materialized { ty: to, value })
            }
            _ => {
                let ptr = self.array_ptr(v);
                Ok(self.reinterpret_as(ptr, to))
            }
        }
    }

    /// Rescale an element count from elements of `from_size` bytes to
    /// elements of `to_size` bytes.
    ///
    /// Equal sizes return `len` unchanged. Otherwise the runtime divides
    /// exactly and traps on a remainder.
    pub fn cast_len(&mut self, len: ValueId, from_size: u64, to_size: u64) -> ValueId {
        if from_size == to_size {
            tracing::trace!("same element size, length unchanged");
            return len;
        }
        let from_size = self.builder.const_i64(from_size);
        let to_size = self.builder.const_i64(to_size);
        self.call_runtime_value(RuntimeFn::CastLen, &[len, from_size, to_size], "")
    }

    /// `ptr` viewed as the storage of a value of type `to`.
    fn reinterpret_as(&mut self, ptr: ValueId, to: Idx) -> ArrayValue {
        let mem = self.mem_type(to);
        let ptr_ty = self.builder.ptr_type(mem);
        let ptr = self.builder.bitcast(ptr, ptr_ty, "");
        ArrayValue::Addressable { ty: to, ptr }
    }
}

#[cfg(test)]
mod tests;
