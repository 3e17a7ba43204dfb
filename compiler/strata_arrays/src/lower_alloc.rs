//! Allocation, resizing and header stores.

use strata_llir::ValueId;
use strata_types::{Idx, Tag};

use super::array_lowerer::ArrayLowerer;
use crate::{ArrayValue, RuntimeFn};

impl ArrayLowerer<'_, '_, '_> {
    /// Allocate a dynamic array of `length` elements.
    ///
    /// With `default_init` the elements are zero-filled or set to the
    /// element's default; without it they are left uninitialized.
    pub fn new_dyn_array(
        &mut self,
        array_ty: Idx,
        length: ValueId,
        default_init: bool,
    ) -> ArrayValue {
        tracing::debug!(ty = %self.pool.display(array_ty), default_init, "new dynamic array");
        let ti = self.type_desc(array_ty);
        let zero_init = self.pool.is_zero_init(self.pool.elem(array_ty));
        let rt = match (default_init, zero_init) {
            (true, true) => RuntimeFn::NewZeroed,
            (true, false) => RuntimeFn::NewInit,
            (false, _) => RuntimeFn::NewUninit,
        };
        let pair = self.call_runtime_value(rt, &[ti, length], ".gc_mem");
        self.get_slice(array_ty, pair)
    }

    /// Allocate nested dynamic arrays, one dimension per entry of `dims`
    /// (outermost first).
    pub fn new_multi_dim_array(&mut self, array_ty: Idx, dims: &[ValueId]) -> ArrayValue {
        tracing::debug!(
            ty = %self.pool.display(array_ty),
            ndims = dims.len(),
            "new multi-dimensional array"
        );
        let ti = self.type_desc(array_ty);

        let mut value_ty = array_ty;
        for _ in 0..dims.len() {
            value_ty = self.pool.elem(value_ty);
        }
        let rt = if self.pool.is_zero_init(value_ty) {
            RuntimeFn::NewMultiZeroed
        } else {
            RuntimeFn::NewMultiInit
        };

        let i64 = self.builder.i64_type();
        let all_const = dims.iter().all(|&d| self.builder.is_const(d));
        let dims_ptr = if all_const {
            let init = self.builder.const_array(i64, dims);
            let global = self.builder.add_global(".dimsarray", init, true);
            self.builder.global_addr(global)
        } else {
            let dims_ty = self.builder.array_type(i64, dims.len() as u64);
            let dims_array = self.builder.alloca(dims_ty, ".dimarray");
            let i64_ptr = self.builder.ptr_type(i64);
            let first = self.builder.bitcast(dims_array, i64_ptr, "");
            for (i, &dim) in dims.iter().enumerate() {
                let index = self.builder.const_i64(i as u64);
                let slot = self.builder.gep(first, index, ".ndim");
                self.builder.store(dim, slot);
            }
            dims_array
        };

        let slice = self.slice_type();
        let header = self.builder.alloca(slice, ".array");
        let count = self.builder.const_i64(dims.len() as u64);
        let len_field = self.builder.struct_gep(header, 0, ".len");
        self.builder.store(count, len_field);
        let i8_ptr = self.builder.i8_ptr_type();
        let dims_ptr = self.builder.bitcast(dims_ptr, i8_ptr, "");
        let ptr_field = self.builder.struct_gep(header, 1, ".ptr");
        self.builder.store(dims_ptr, ptr_field);
        let header = self.builder.load(header, "");

        let pair = self.call_runtime_value(rt, &[ti, header], ".gc_mem");
        self.get_slice(array_ty, pair)
    }

    /// Set the length of the dynamic array in `array`'s storage to
    /// `new_length`, filling any new tail with the element default.
    pub fn resize_dyn_array(
        &mut self,
        array_ty: Idx,
        array: ArrayValue,
        new_length: ValueId,
    ) -> ArrayValue {
        tracing::debug!(ty = %self.pool.display(array_ty), "resize dynamic array");
        debug_assert_eq!(self.pool.tag(array_ty), Tag::DynArray);
        let rt = if self.pool.is_zero_init(self.pool.elem(array_ty)) {
            RuntimeFn::SetLengthZeroed
        } else {
            RuntimeFn::SetLengthInit
        };
        let ti = self.type_desc(array_ty);
        let header = self.header_ptr(array);
        let pair = self.call_runtime_value(rt, &[ti, new_length, header], ".gc_mem");
        self.get_slice(array_ty, pair)
    }

    /// Store the null header through `header`.
    pub fn set_array_to_null(&mut self, header: ValueId) {
        let ty = self.builder.pointee_of(header);
        let null = self.builder.const_zero(ty);
        self.builder.store(null, header);
    }

    /// Store `len` and `ptr` into the header of a dynamic array in memory.
    pub fn set_array(&mut self, array: ArrayValue, len: ValueId, ptr: ValueId) {
        let header = array.addr();
        let len_field = self.builder.struct_gep(header, 0, ".len");
        self.builder.store(len, len_field);
        let ptr_field = self.builder.struct_gep(header, 1, ".ptr");
        let field_ty = self.builder.pointee_of(ptr_field);
        let ptr = self.builder.bitcast(ptr, field_ty, "");
        self.builder.store(ptr, ptr_field);
    }
}
