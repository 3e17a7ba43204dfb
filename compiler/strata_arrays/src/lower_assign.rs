//! Array assignment: blit, construction and assignment between arrays,
//! and broadcast of a scalar to every element.
//!
//! The element type's [`Obligation`] picks between an inline bulk copy or
//! element loop and a runtime call that runs the hooks.

use strata_llir::{IntPredicate, ValueId};
use strata_types::{Idx, Tag};

use super::array_lowerer::ArrayLowerer;
use crate::{ArrayValue, RuntimeFn};

/// How the destination takes on the source's value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AssignMode {
    /// Raw bit copy, no hooks. Used for default initialization.
    Blit,
    /// Copy construction of a fresh destination.
    Construct,
    /// Assignment over a live destination: the old value is destroyed.
    Assign,
}

impl AssignMode {
    /// The destination holds no value yet.
    pub fn is_constructing(self) -> bool {
        matches!(self, AssignMode::Blit | AssignMode::Construct)
    }
}

/// Hooks an element type requires when copied or overwritten.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Obligation {
    /// The innermost non-fixed-array element is a struct with a postblit.
    pub postblit: bool,
    /// Overwriting an element runs a destructor.
    pub destroy: bool,
}

impl ArrayLowerer<'_, '_, '_> {
    /// Hook obligation of an element type, computed once per type.
    pub fn obligation(&mut self, elem: Idx) -> Obligation {
        if let Some(&cached) = self.obligations.get(&elem) {
            return cached;
        }
        let mut base = elem;
        while self.pool.tag(base) == Tag::FixedArray {
            base = self.pool.elem(base);
        }
        let obligation = Obligation {
            postblit: self.pool.tag(base) == Tag::Struct && self.pool.needs_postblit(base),
            destroy: self.pool.needs_destruction(elem),
        };
        self.obligations.insert(elem, obligation);
        obligation
    }

    /// Assign `src` to the array `dst`.
    ///
    /// A dynamic array destination that is not a slice is re-bound to the
    /// source's length and pointer. Otherwise elements are copied from an
    /// array source or set from a scalar source. `can_skip_postblit` says
    /// the source is a temporary whose elements need no copy hook.
    pub fn assign(
        &mut self,
        dst: ArrayValue,
        src: ArrayValue,
        mode: AssignMode,
        can_skip_postblit: bool,
    ) {
        let t = dst.ty();
        let t2 = src.ty();
        tracing::debug!(
            dst = %self.pool.display(t),
            src = %self.pool.display(t2),
            ?mode,
            can_skip_postblit,
            "array assign"
        );

        if self.pool.tag(t) == Tag::DynArray && !dst.is_slice() {
            let header = dst.addr();
            if src.is_null() {
                self.set_array_to_null(header);
            } else {
                let len = self.array_len(src);
                let ptr = self.array_ptr(src);
                self.set_array(dst, len, ptr);
            }
            return;
        }

        let constructing = mode.is_constructing();
        let elem = self.pool.elem(t);
        let obligation = self.obligation(elem);
        let needs_destruction = !constructing && obligation.destroy;

        let lhs_ptr = self.array_ptr(dst);
        let lhs_len = self.array_len(dst);
        let i8_ptr = self.builder.i8_ptr_type();
        let lhs_bytes_ptr = self.builder.bitcast(lhs_ptr, i8_ptr, "");

        let src_is_array = matches!(self.pool.tag(t2), Tag::DynArray | Tag::FixedArray);
        let rhs_ptr = if src_is_array {
            Some(self.array_ptr(src))
        } else {
            None
        };

        match rhs_ptr {
            Some(rhs_ptr) if self.builder.type_of(rhs_ptr) == self.builder.type_of(lhs_ptr) => {
                let rhs_bytes_ptr = self.builder.bitcast(rhs_ptr, i8_ptr, "");
                let rhs_len = self.array_len(src);
                let needs_postblit = mode != AssignMode::Blit
                    && obligation.postblit
                    && (!can_skip_postblit || self.pool.tag(t2) == Tag::DynArray);

                if !needs_destruction && !needs_postblit {
                    tracing::trace!("bulk copy");
                    let elem_size = self.builder.const_i64(self.pool.size_of(elem));
                    let lhs_size = self.builder.mul(elem_size, lhs_len, "");
                    if src.is_null() {
                        let zero = self.builder.const_i8(0);
                        self.builder.memset(lhs_bytes_ptr, zero, lhs_size);
                    } else {
                        let rhs_size = self.builder.mul(elem_size, rhs_len, "");
                        let known_in_bounds = constructing
                            || (self.pool.tag(t) == Tag::FixedArray
                                && self.pool.tag(t2) == Tag::FixedArray);
                        self.copy_slice(
                            lhs_bytes_ptr,
                            lhs_size,
                            rhs_bytes_ptr,
                            rhs_size,
                            known_in_bounds,
                        );
                    }
                } else if constructing {
                    tracing::trace!("runtime construct");
                    let ti = self.type_desc(elem);
                    let src_slice = self.make_byte_slice(rhs_len, rhs_bytes_ptr);
                    let dst_slice = self.make_byte_slice(lhs_len, lhs_bytes_ptr);
                    self.call_runtime(RuntimeFn::Ctor, &[ti, src_slice, dst_slice], "");
                } else {
                    tracing::trace!(may_alias = !can_skip_postblit, "runtime assign");
                    let elem_mem = self.mem_type(elem);
                    let tmp = self.builder.alloca(elem_mem, "arrayAssign.tmpSwap");
                    let tmp = self.builder.bitcast(tmp, i8_ptr, "");
                    let rt = if can_skip_postblit {
                        RuntimeFn::AssignR
                    } else {
                        RuntimeFn::AssignL
                    };
                    let ti = self.type_desc(elem);
                    let src_slice = self.make_byte_slice(rhs_len, rhs_bytes_ptr);
                    let dst_slice = self.make_byte_slice(lhs_len, lhs_bytes_ptr);
                    self.call_runtime(rt, &[ti, src_slice, dst_slice, tmp], "");
                }
            }
            _ => {
                // Scalar broadcast: T[] = T, T[n][m] = T.
                let needs_postblit =
                    mode != AssignMode::Blit && !can_skip_postblit && obligation.postblit;

                if !needs_destruction && !needs_postblit {
                    let elem_bytes = self.pool.size_of(elem);
                    let elem_size = self.builder.const_i64(elem_bytes);
                    let lhs_size = self.builder.mul(elem_size, lhs_len, "");
                    let rhs_ty = self.mem_type(t2);
                    let rhs_bytes = self.builder.size_of(rhs_ty);
                    if rhs_bytes == 0 || elem_bytes % rhs_bytes != 0 {
                        tracing::warn!(elem_bytes, rhs_bytes, "broadcast value does not tile");
                    }
                    let rhs_size = self.builder.const_i64(rhs_bytes);
                    let rhs_ptr_ty = self.builder.ptr_type(rhs_ty);
                    let actual_ptr = self.builder.bitcast(lhs_bytes_ptr, rhs_ptr_ty, "");
                    let count = self.builder.udiv_exact(lhs_size, rhs_size, "");
                    self.array_init(actual_ptr, count, src);
                } else {
                    tracing::trace!(constructing, "runtime set");
                    let rt = if constructing {
                        RuntimeFn::SetCtor
                    } else {
                        RuntimeFn::SetAssign
                    };
                    let src_ptr = self.make_lvalue(src, ".setsrc");
                    let src_ptr = self.builder.bitcast(src_ptr, i8_ptr, "");
                    let i32 = self.builder.i32_type();
                    let count = self.builder.trunc(lhs_len, i32, "");
                    let ti = self.type_desc(t2);
                    self.call_runtime(rt, &[lhs_bytes_ptr, src_ptr, count, ti], "");
                }
            }
        }
    }

    /// Store `value` to each of `length` elements at `ptr`.
    ///
    /// A constant that is zero or a single byte becomes one `memset`;
    /// anything else drives an explicit counting loop.
    pub fn array_init(&mut self, ptr: ValueId, length: ValueId, value: ArrayValue) {
        tracing::debug!(ty = %self.pool.display(value.ty()), "array init");

        if !value.is_lvalue() {
            let constant = self.rvalue(value);
            let i8 = self.builder.i8_type();
            let const_ty = self.builder.type_of(constant);
            let is_zero = self.builder.is_null_value(constant);
            if self.builder.is_const(constant) && (is_zero || const_ty == i8) {
                tracing::trace!(is_zero, "array init as memset");
                let elem_size = self.builder.size_of(const_ty);
                let size = if elem_size == 1 {
                    length
                } else {
                    let elem_size = self.builder.const_i64(elem_size);
                    self.builder.mul(length, elem_size, ".arraysize")
                };
                let byte = if is_zero {
                    self.builder.const_i8(0)
                } else {
                    constant
                };
                self.builder.memset(ptr, byte, size);
                return;
            }
        }

        let Some(current) = self.builder.current_block() else {
            panic!("internal error: array init without an insertion point");
        };
        let cond_bb = self.builder.insert_block_after(current, "arrayinit.cond");
        let body_bb = self.builder.insert_block_after(cond_bb, "arrayinit.body");
        let end_bb = self.builder.insert_block_after(body_bb, "arrayinit.end");

        let i64 = self.builder.i64_type();
        let itr = self.builder.alloca(i64, "arrayinit.itr");
        let zero = self.builder.const_i64(0);
        self.builder.store(zero, itr);
        self.builder.br(cond_bb);

        self.builder.position_at_end(cond_bb);
        let itr_val = self.builder.load(itr, "");
        let more = self
            .builder
            .icmp(IntPredicate::Ne, itr_val, length, "arrayinit.condition");
        self.builder.cond_br(more, body_bb, end_bb);

        self.builder.position_at_end(body_bb);
        let itr_val = self.builder.load(itr, "");
        let elem = self.builder.gep(ptr, itr_val, "arrayinit.arrayelem");
        self.blit_store(elem, value);
        let one = self.builder.const_i64(1);
        let next = self.builder.add(itr_val, one, "arrayinit.new_itr");
        self.builder.store(next, itr);
        self.builder.br(cond_bb);

        self.builder.position_at_end(end_bb);
    }

    /// Blit `src` into the element or array `dst`.
    pub(crate) fn blit(&mut self, dst: ArrayValue, src: ArrayValue) {
        if matches!(self.pool.tag(dst.ty()), Tag::DynArray | Tag::FixedArray) {
            self.assign(dst, src, AssignMode::Blit, false);
        } else {
            self.blit_store(dst.addr(), src);
        }
    }

    /// Bit copy of a value into the storage at `dst`.
    pub(crate) fn blit_store(&mut self, dst: ValueId, value: ArrayValue) {
        let stored = self.rvalue(value);
        self.store_value(stored, dst);
    }

    /// Copy `dst_size` bytes from `src` to `dst`.
    ///
    /// With checks enabled and the operands not known to fit, the runtime
    /// verifies equal sizes and disjointness. Otherwise a raw `memcpy` is
    /// emitted and the caller guarantees the regions do not overlap.
    pub(crate) fn copy_slice(
        &mut self,
        dst: ValueId,
        dst_size: ValueId,
        src: ValueId,
        src_size: ValueId,
        known_in_bounds: bool,
    ) {
        if self.config.checks_slice_copies() && !known_in_bounds {
            tracing::trace!("checked slice copy");
            self.call_runtime(RuntimeFn::SliceCopy, &[dst, dst_size, src, src_size], "");
        } else {
            self.builder.memcpy(dst, src, dst_size);
        }
    }
}
