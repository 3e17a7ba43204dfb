//! The `strata_array_*` runtime library interface.
//!
//! Every entry point is a variant of [`RuntimeFn`]; its symbol and
//! signature live here and nowhere else. Declarations are created lazily,
//! once per module, by [`ArrayLowerer::runtime_fn`](crate::ArrayLowerer).
//!
//! Parameter conventions:
//! - a *byte slice* is `{ i64, i8* }` passed by value, length in elements;
//! - a *header pointer* is a `{ i64, i8* }*` to a dynamic array in memory;
//! - a *type descriptor* is a `%strata.TypeInfo*` passed as `i8*`.

use strata_llir::{IrBuilder, TyId};

/// A runtime library entry point.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RuntimeFn {
    // -- Allocation --
    NewZeroed,
    NewInit,
    NewUninit,
    NewMultiZeroed,
    NewMultiInit,
    SetLengthZeroed,
    SetLengthInit,

    // -- Copies --
    SliceCopy,
    Ctor,
    /// Assignment where the source may alias the destination.
    AssignL,
    /// Assignment from a disposable source.
    AssignR,
    SetCtor,
    SetAssign,

    // -- Growth --
    AppendCap,
    Append,
    Cat,
    CatN,
    AppendChar,
    AppendWChar,

    // -- Comparison and casts --
    Eq,
    Cmp,
    CmpChar,
    CastLen,

    // -- Failures --
    BoundsFail,
}

/// Parameter and return kinds of the runtime ABI.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Abi {
    Void,
    I32,
    I64,
    Ptr,
    Slice,
    SlicePtr,
}

impl RuntimeFn {
    pub const ALL: [RuntimeFn; 24] = [
        RuntimeFn::NewZeroed,
        RuntimeFn::NewInit,
        RuntimeFn::NewUninit,
        RuntimeFn::NewMultiZeroed,
        RuntimeFn::NewMultiInit,
        RuntimeFn::SetLengthZeroed,
        RuntimeFn::SetLengthInit,
        RuntimeFn::SliceCopy,
        RuntimeFn::Ctor,
        RuntimeFn::AssignL,
        RuntimeFn::AssignR,
        RuntimeFn::SetCtor,
        RuntimeFn::SetAssign,
        RuntimeFn::AppendCap,
        RuntimeFn::Append,
        RuntimeFn::Cat,
        RuntimeFn::CatN,
        RuntimeFn::AppendChar,
        RuntimeFn::AppendWChar,
        RuntimeFn::Eq,
        RuntimeFn::Cmp,
        RuntimeFn::CmpChar,
        RuntimeFn::CastLen,
        RuntimeFn::BoundsFail,
    ];

    /// Linker symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            RuntimeFn::NewZeroed => "strata_array_new_zeroed",
            RuntimeFn::NewInit => "strata_array_new_init",
            RuntimeFn::NewUninit => "strata_array_new_uninit",
            RuntimeFn::NewMultiZeroed => "strata_array_new_multi_zeroed",
            RuntimeFn::NewMultiInit => "strata_array_new_multi_init",
            RuntimeFn::SetLengthZeroed => "strata_array_set_length_zeroed",
            RuntimeFn::SetLengthInit => "strata_array_set_length_init",
            RuntimeFn::SliceCopy => "strata_array_slice_copy",
            RuntimeFn::Ctor => "strata_array_ctor",
            RuntimeFn::AssignL => "strata_array_assign_l",
            RuntimeFn::AssignR => "strata_array_assign_r",
            RuntimeFn::SetCtor => "strata_array_set_ctor",
            RuntimeFn::SetAssign => "strata_array_set_assign",
            RuntimeFn::AppendCap => "strata_array_append_cap",
            RuntimeFn::Append => "strata_array_append",
            RuntimeFn::Cat => "strata_array_cat",
            RuntimeFn::CatN => "strata_array_cat_n",
            RuntimeFn::AppendChar => "strata_array_append_char",
            RuntimeFn::AppendWChar => "strata_array_append_wchar",
            RuntimeFn::Eq => "strata_array_eq",
            RuntimeFn::Cmp => "strata_array_cmp",
            RuntimeFn::CmpChar => "strata_array_cmp_char",
            RuntimeFn::CastLen => "strata_array_cast_len",
            RuntimeFn::BoundsFail => "strata_array_bounds_fail",
        }
    }

    fn abi(self) -> (&'static [Abi], Abi) {
        use Abi::{Ptr, Slice, SlicePtr, Void, I32, I64};
        match self {
            RuntimeFn::NewZeroed | RuntimeFn::NewInit | RuntimeFn::NewUninit => {
                (&[Ptr, I64], Slice)
            }
            RuntimeFn::NewMultiZeroed | RuntimeFn::NewMultiInit => (&[Ptr, Slice], Slice),
            RuntimeFn::SetLengthZeroed | RuntimeFn::SetLengthInit => {
                (&[Ptr, I64, SlicePtr], Slice)
            }
            RuntimeFn::SliceCopy => (&[Ptr, I64, Ptr, I64], Void),
            RuntimeFn::Ctor => (&[Ptr, Slice, Slice], Void),
            RuntimeFn::AssignL | RuntimeFn::AssignR => (&[Ptr, Slice, Slice, Ptr], Void),
            RuntimeFn::SetCtor | RuntimeFn::SetAssign => (&[Ptr, Ptr, I32, Ptr], Void),
            RuntimeFn::AppendCap => (&[Ptr, SlicePtr, I64], Slice),
            RuntimeFn::Append => (&[Ptr, SlicePtr, Slice], Slice),
            RuntimeFn::Cat => (&[Ptr, Slice, Slice], Slice),
            RuntimeFn::CatN => (&[Ptr, Slice], Slice),
            RuntimeFn::AppendChar | RuntimeFn::AppendWChar => (&[SlicePtr, I32], Slice),
            RuntimeFn::Eq | RuntimeFn::Cmp => (&[Slice, Slice, Ptr], I32),
            RuntimeFn::CmpChar => (&[Slice, Slice], I32),
            RuntimeFn::CastLen => (&[I64, I64, I64], I64),
            RuntimeFn::BoundsFail => (&[Slice, I32], Void),
        }
    }

    /// Control never comes back from the call.
    pub fn is_no_return(self) -> bool {
        matches!(self, RuntimeFn::BoundsFail)
    }

    /// IR parameter types and return type.
    pub fn signature(self, builder: &mut IrBuilder<'_, '_>) -> (Vec<TyId>, TyId) {
        let (params, ret) = self.abi();
        let params = params.iter().map(|&abi| abi_type(builder, abi)).collect();
        (params, abi_type(builder, ret))
    }
}

/// `{ i64, i8* }`, the type-erased dynamic array.
pub(crate) fn byte_slice_type(builder: &mut IrBuilder<'_, '_>) -> TyId {
    let i64 = builder.i64_type();
    let i8_ptr = builder.i8_ptr_type();
    builder.struct_type(&[i64, i8_ptr], false)
}

fn abi_type(builder: &mut IrBuilder<'_, '_>, abi: Abi) -> TyId {
    match abi {
        Abi::Void => builder.void_type(),
        Abi::I32 => builder.i32_type(),
        Abi::I64 => builder.i64_type(),
        Abi::Ptr => builder.i8_ptr_type(),
        Abi::Slice => byte_slice_type(builder),
        Abi::SlicePtr => {
            let slice = byte_slice_type(builder);
            builder.ptr_type(slice)
        }
    }
}

#[cfg(test)]
mod tests;
