//! Array equality, ordering and identity.
//!
//! Equality and ordering are element-wise and go through the runtime;
//! identity compares the `{ length, pointer }` pairs directly.

use strata_llir::{IntPredicate, ValueId};
use strata_types::Tag;

use super::array_lowerer::ArrayLowerer;
use crate::{ArrayValue, RuntimeFn};

/// `==` or `!=`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EqOp {
    Eq,
    Ne,
}

impl EqOp {
    fn predicate(self) -> IntPredicate {
        match self {
            EqOp::Eq => IntPredicate::Eq,
            EqOp::Ne => IntPredicate::Ne,
        }
    }
}

/// An ordering comparison.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn predicate(self) -> IntPredicate {
        match self {
            CmpOp::Lt => IntPredicate::Slt,
            CmpOp::Le => IntPredicate::Sle,
            CmpOp::Gt => IntPredicate::Sgt,
            CmpOp::Ge => IntPredicate::Sge,
        }
    }
}

impl ArrayLowerer<'_, '_, '_> {
    /// Element-wise `l == r` / `l != r`, as `i1`.
    ///
    /// Comparing against a statically null array only tests the length.
    pub fn equals(&mut self, op: EqOp, l: ArrayValue, r: ArrayValue) -> ValueId {
        tracing::debug!(
            lhs = %self.pool.display(l.ty()),
            rhs = %self.pool.display(r.ty()),
            ?op,
            "array equals"
        );
        if r.is_null() {
            tracing::trace!("compare length against zero");
            let len = self.array_len(l);
            let zero = self.builder.const_i64(0);
            return self.builder.icmp(op.predicate(), len, zero, "");
        }
        let res = self.call_eq_cmp(RuntimeFn::Eq, l, r);
        let zero = self.builder.const_i32(0);
        // The runtime returns 1 for equal.
        self.builder.icmp(op.predicate().inverse(), res, zero, "")
    }

    /// Element-wise ordering of `l` and `r`, as `i1`.
    ///
    /// `char` arrays compare as bytes without a type descriptor.
    pub fn compare(&mut self, op: CmpOp, l: ArrayValue, r: ArrayValue) -> ValueId {
        tracing::debug!(
            lhs = %self.pool.display(l.ty()),
            rhs = %self.pool.display(r.ty()),
            ?op,
            "array compare"
        );
        let by_bytes = self.pool.tag(self.pool.elem(l.ty())) == Tag::Char;
        let rt = if by_bytes {
            RuntimeFn::CmpChar
        } else {
            RuntimeFn::Cmp
        };
        let res = self.call_eq_cmp(rt, l, r);
        let zero = self.builder.const_i32(0);
        self.builder.icmp(op.predicate(), res, zero, "")
    }

    /// `l is r` (`is = true`) or `l !is r`: same length and same pointer.
    pub fn identity(&mut self, is: bool, l: ArrayValue, r: ArrayValue) -> ValueId {
        tracing::debug!(ty = %self.pool.display(l.ty()), is, "array identity");
        let pred = if is {
            IntPredicate::Eq
        } else {
            IntPredicate::Ne
        };
        let len1 = self.array_len(l);
        let len2 = self.array_len(r);
        let same_len = self.builder.icmp(pred, len1, len2, "");
        let ptr1 = self.array_ptr(l);
        let ptr2 = self.array_ptr(r);
        let ptr_ty = self.builder.type_of(ptr1);
        let ptr2 = self.builder.bitcast(ptr2, ptr_ty, "");
        let same_ptr = self.builder.icmp(pred, ptr1, ptr2, "");
        if is {
            self.builder.and(same_len, same_ptr, "")
        } else {
            self.builder.or(same_len, same_ptr, "")
        }
    }

    /// Call an equality or ordering entry with both operands viewed as
    /// dynamic arrays of `l`'s element type.
    fn call_eq_cmp(&mut self, rt: RuntimeFn, l: ArrayValue, r: ArrayValue) -> ValueId {
        let elem = self.pool.elem(l.ty());
        let common = self.pool.dyn_array(elem);
        let elem_size = self.pool.size_of(elem);
        let lhs = self.common_slice(l, elem_size);
        let rhs = self.common_slice(r, elem_size);
        if rt == RuntimeFn::CmpChar {
            return self.call_runtime_value(rt, &[lhs, rhs], "");
        }
        let ti = self.type_desc(common);
        self.call_runtime_value(rt, &[lhs, rhs, ti], "")
    }

    /// `v` as a byte slice whose length counts elements of `elem_size`.
    fn common_slice(&mut self, v: ArrayValue, elem_size: u64) -> ValueId {
        let len = self.array_len(v);
        let from_size = self.elem_size(v.ty());
        let len = self.cast_len(len, from_size, elem_size);
        let ptr = self.array_ptr(v);
        self.make_byte_slice(len, ptr)
    }
}
