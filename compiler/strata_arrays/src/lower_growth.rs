//! Growth and concatenation: `a ~= e`, `a ~= b`, `a ~ b ~ c`, and
//! character append with transcoding.
//!
//! The runtime grows the destination's header in place and returns the
//! updated pair; callers re-bind it.

use smallvec::SmallVec;
use strata_diagnostic::ErrorGuaranteed;
use strata_ir::{ExprId, ExprKind};
use strata_llir::ValueId;
use strata_types::{Idx, Tag};

use super::array_lowerer::ArrayLowerer;
use crate::{ArrayValue, ExprLowering, RuntimeFn};

impl ArrayLowerer<'_, '_, '_> {
    /// `array ~= exp` for a single element.
    ///
    /// `exp` is evaluated before the runtime grows the array, so it sees
    /// the array as it was (`a ~= a[$ - 1]`).
    pub fn append_element(
        &mut self,
        ex: &mut dyn ExprLowering,
        array_ty: Idx,
        array: ArrayValue,
        exp: ExprId,
    ) -> Result<(), ErrorGuaranteed> {
        tracing::debug!(ty = %self.pool.display(array_ty), "append element");
        let old_len = self.array_len(array);
        let value = ex.lower_expr(self, exp)?;

        let ti = self.type_desc(array_ty);
        let header = self.header_ptr(array);
        let one = self.builder.const_i64(1);
        self.call_runtime_value(RuntimeFn::AppendCap, &[ti, header, one], ".appendedArray");

        let ptr = self.array_ptr(array);
        let last = self.builder.gep(ptr, old_len, ".lastElem");
        self.blit_store(last, value);
        self.call_postblit(exp, last);
        Ok(())
    }

    /// `array ~= exp` for an array `exp`.
    pub fn append_array(
        &mut self,
        ex: &mut dyn ExprLowering,
        array: ArrayValue,
        exp: ExprId,
    ) -> Result<ArrayValue, ErrorGuaranteed> {
        let array_ty = array.ty();
        tracing::debug!(ty = %self.pool.display(array_ty), "append array");
        let value = ex.lower_expr(self, exp)?;
        let slice = self.byte_slice(value);
        let ti = self.type_desc(array_ty);
        let header = self.header_ptr(array);
        let pair =
            self.call_runtime_value(RuntimeFn::Append, &[ti, header, slice], ".appendedArray");
        Ok(self.get_slice(array_ty, pair))
    }

    /// `lhs ~ rhs`, flattening a chain `a ~ b ~ c ~ ...` into one runtime
    /// call.
    ///
    /// Operands of a chain are evaluated right to left: `rhs` first, then
    /// walking down the left spine. They are passed in source order.
    pub fn concat(
        &mut self,
        ex: &mut dyn ExprLowering,
        array_ty: Idx,
        lhs: ExprId,
        rhs: ExprId,
    ) -> Result<ArrayValue, ErrorGuaranteed> {
        let arena = self.arena;
        let ti = self.type_desc(array_ty);

        let pair = if let ExprKind::Cat { lhs: mut left, rhs: right } = *arena.kind(lhs) {
            let mut slices: SmallVec<[ValueId; 4]> = SmallVec::new();
            slices.push(self.slice_ptr(ex, rhs)?);
            slices.push(self.slice_ptr(ex, right)?);
            while let ExprKind::Cat { lhs: l, rhs: r } = *arena.kind(left) {
                slices.push(self.slice_ptr(ex, r)?);
                left = l;
            }
            slices.push(self.slice_ptr(ex, left)?);
            tracing::debug!(
                ty = %self.pool.display(array_ty),
                operands = slices.len(),
                "concatenate n"
            );

            let slice = self.slice_type();
            let slice_ptr_ty = self.builder.ptr_type(slice);
            let n = slices.len() as u64;
            let array_of_slices = self.builder.array_type(slice, n);
            let storage = self.builder.alloca(array_of_slices, ".slicearray");
            let first = self.builder.bitcast(storage, slice_ptr_ty, "");
            for (i, &operand) in slices.iter().rev().enumerate() {
                let value = self.builder.load(operand, "");
                let index = self.builder.const_i64(i as u64);
                let slot = self.builder.gep(first, index, ".slice");
                self.builder.store(value, slot);
            }

            let header = self.builder.alloca(slice, ".array");
            let count = self.builder.const_i64(n);
            let len_field = self.builder.struct_gep(header, 0, ".len");
            self.builder.store(count, len_field);
            let i8_ptr = self.builder.i8_ptr_type();
            let erased = self.builder.bitcast(storage, i8_ptr, "");
            let ptr_field = self.builder.struct_gep(header, 1, ".ptr");
            self.builder.store(erased, ptr_field);
            let slices_arg = self.builder.load(header, "");
            self.call_runtime_value(RuntimeFn::CatN, &[ti, slices_arg], ".appendedArray")
        } else {
            tracing::debug!(ty = %self.pool.display(array_ty), "concatenate");
            let x = self.slice_ptr(ex, lhs)?;
            let x = self.builder.load(x, "");
            let y = self.slice_ptr(ex, rhs)?;
            let y = self.builder.load(y, "");
            self.call_runtime_value(RuntimeFn::Cat, &[ti, x, y], ".appendedArray")
        };
        Ok(self.get_slice(array_ty, pair))
    }

    /// `array ~= c` for a `dchar` appended to a `char[]` or `wchar[]`,
    /// encoding it as UTF-8 or UTF-16.
    pub fn append_dchar(
        &mut self,
        ex: &mut dyn ExprLowering,
        array: ArrayValue,
        exp: ExprId,
    ) -> Result<ArrayValue, ErrorGuaranteed> {
        let array_ty = array.ty();
        let wide = self.pool.tag(self.pool.elem(array_ty)) == Tag::WChar;
        tracing::debug!(ty = %self.pool.display(array_ty), wide, "append dchar");
        let value = ex.lower_expr(self, exp)?;
        let code_point = self.rvalue(value);
        let i32 = self.builder.i32_type();
        let code_point = self.builder.zext(code_point, i32, "");
        let header = self.header_ptr(array);
        let rt = if wide {
            RuntimeFn::AppendWChar
        } else {
            RuntimeFn::AppendChar
        };
        let pair = self.call_runtime_value(rt, &[header, code_point], ".appendedArray");
        Ok(self.get_slice(array_ty, pair))
    }

    /// Pointer to a `{ i64, i8* }` describing an operand: a dynamic array
    /// itself, a fixed array's elements, or a single element.
    fn slice_ptr(
        &mut self,
        ex: &mut dyn ExprLowering,
        exp: ExprId,
    ) -> Result<ValueId, ErrorGuaranteed> {
        let value = ex.lower_expr(self, exp)?;
        let slice = self.slice_type();
        let slice_ptr_ty = self.builder.ptr_type(slice);
        if self.pool.tag(value.ty()) == Tag::DynArray {
            let header = self.make_lvalue(value, ".slice");
            return Ok(self.builder.bitcast(header, slice_ptr_ty, ""));
        }

        let is_fixed = self.pool.tag(value.ty()) == Tag::FixedArray;
        let (len, storage) = if is_fixed {
            (self.array_len(value), self.make_lvalue(value, ".tmp"))
        } else {
            (self.builder.const_i64(1), self.make_lvalue(value, ".elem"))
        };
        let array = self.builder.alloca(slice, ".array");
        let len_field = self.builder.struct_gep(array, 0, "");
        self.builder.store(len, len_field);
        let i8_ptr = self.builder.i8_ptr_type();
        let storage = self.builder.bitcast(storage, i8_ptr, "");
        let ptr_field = self.builder.struct_gep(array, 1, "");
        self.builder.store(storage, ptr_field);
        Ok(array)
    }

    /// Run the postblit of a struct element copied out of an lvalue.
    fn call_postblit(&mut self, exp: ExprId, ptr: ValueId) {
        let arena = self.arena;
        let expr = arena.get(exp);
        if !expr.is_lvalue() || self.pool.tag(expr.ty) != Tag::Struct {
            return;
        }
        let def = self.pool.record_def(expr.ty);
        if !def.has_postblit {
            return;
        }
        let symbol = def.postblit_symbol();
        let hook = self.hook_fn(&symbol);
        let i8_ptr = self.builder.i8_ptr_type();
        let ptr = self.builder.bitcast(ptr, i8_ptr, "");
        self.builder.call(hook, &[ptr], "");
    }
}
