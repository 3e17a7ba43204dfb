//! Bounds checks and element access.

use strata_ir::{FileId, Loc};
use strata_llir::{IntPredicate, ValueId};
use strata_types::Tag;

use super::array_lowerer::ArrayLowerer;
use crate::{ArrayValue, RuntimeFn};

impl ArrayLowerer<'_, '_, '_> {
    /// Check `0 <= index < length` before an access to `array`.
    ///
    /// Without an index, or for a pointer that carries no length, nothing
    /// is emitted. An index the builder proves in range folds the check
    /// away. Otherwise control continues in `bounds.ok`; `bounds.fail`
    /// reports `loc` and does not return.
    pub fn check_index(&mut self, array: ArrayValue, index: Option<ValueId>, loc: Loc) {
        let Some(index) = index else {
            return;
        };
        let ty = array.ty();
        if self.pool.tag(ty) == Tag::Pointer {
            return;
        }
        tracing::debug!(ty = %self.pool.display(ty), %loc, "bounds check");

        let len = self.array_len(array);
        let in_bounds = self
            .builder
            .icmp(IntPredicate::Ult, index, len, "bounds.cmp");
        if self.builder.as_const_int(in_bounds) == Some(1) {
            tracing::trace!("index statically in bounds");
            return;
        }

        let Some(current) = self.builder.current_block() else {
            panic!("internal error: bounds check without an insertion point");
        };
        let ok_bb = self.builder.insert_block_after(current, "bounds.ok");
        let fail_bb = self.builder.insert_block_after(ok_bb, "bounds.fail");
        self.builder.cond_br(in_bounds, ok_bb, fail_bb);

        self.builder.position_at_end(fail_bb);
        self.bounds_fail_call(loc);
        self.builder.position_at_end(ok_bb);
    }

    /// Report an out-of-bounds access at `loc`; terminates the block.
    pub fn bounds_fail_call(&mut self, loc: Loc) {
        let file = self.module_file_name(loc.file);
        let line = self.builder.const_i32(loc.line);
        self.call_runtime(RuntimeFn::BoundsFail, &[file, line], "");
        self.builder.unreachable();
    }

    /// The name of `file` as a constant `{ i64, i8* }`, one global per
    /// file.
    pub(crate) fn module_file_name(&mut self, file: FileId) -> ValueId {
        if let Some(&name) = self.file_names.get(&file) {
            return name;
        }
        let arena = self.arena;
        let name = arena.file_name(file);
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        let init = self.builder.const_bytes(&bytes);
        let global = self.builder.add_global(".str", init, true);
        self.builder.set_unnamed_addr(global);
        let addr = self.builder.global_addr(global);
        let i8_ptr = self.builder.i8_ptr_type();
        let ptr = self.builder.const_bitcast(addr, i8_ptr);
        let len = self.builder.const_i64(name.len() as u64);
        let slice = self.const_slice(len, ptr, None);
        self.file_names.insert(file, slice);
        slice
    }

    /// Address of `array[index]`, bounds-checked when checks are on.
    pub fn index_element(&mut self, array: ArrayValue, index: ValueId, loc: Loc) -> ArrayValue {
        let ty = array.ty();
        if self.config.bounds_checks.is_enabled() {
            self.check_index(array, Some(index), loc);
        }
        let ptr = self.array_ptr(array);
        let ptr = self.builder.gep(ptr, index, ".elem");
        ArrayValue::Addressable {
            ty: self.pool.elem(ty),
            ptr,
        }
    }
}
