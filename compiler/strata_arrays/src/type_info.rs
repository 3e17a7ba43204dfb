//! Run-time type descriptors.
//!
//! Every runtime entry that walks elements takes a `%strata.TypeInfo*`
//! (passed as `i8*`) describing the element or array type:
//!
//! ```text
//! %strata.TypeInfo  = { i64 size, i64 align, i32 kind, i32 flags, i64 dim,
//!                       %strata.TypeInfo* next, i8* init,
//!                       %strata.FieldInfo* fields, i64 field_count,
//!                       void (i8*)* postblit, void (i8*)* destroy }
//! %strata.FieldInfo = { i64 offset, %strata.TypeInfo* ty }
//! ```
//!
//! The layout is mirrored by `strata_rt::TypeInfo`. Descriptors are private
//! constant globals, one per source type, created on first use.

use strata_llir::{FunctionId, GlobalId, TyId, ValueId};
use strata_types::{Idx, Tag};

use super::array_lowerer::ArrayLowerer;

/// `TypeKind` discriminants of the runtime.
mod kind {
    pub const OTHER: u32 = 0;
    pub const SIGNED: u32 = 1;
    pub const UNSIGNED: u32 = 2;
    pub const FLOAT32: u32 = 3;
    pub const FLOAT64: u32 = 4;
    pub const DYN_ARRAY: u32 = 5;
    pub const FIXED_ARRAY: u32 = 6;
    pub const STRUCT: u32 = 7;
    pub const UNION: u32 = 8;
}

const ZERO_INIT: u32 = 1;
const NEEDS_POSTBLIT: u32 = 1 << 1;
const NEEDS_DESTROY: u32 = 1 << 2;

/// The descriptor struct types, created once per module.
#[derive(Copy, Clone, Debug)]
pub(crate) struct TypeInfoTypes {
    type_info: TyId,
    field_info: TyId,
    hook: TyId,
}

impl ArrayLowerer<'_, '_, '_> {
    /// Runtime type descriptor of a source type, as an `i8*` constant.
    pub fn type_desc(&mut self, ty: Idx) -> ValueId {
        let global = self.type_info_global(ty);
        let addr = self.builder.global_addr(global);
        let i8_ptr = self.builder.i8_ptr_type();
        self.builder.const_bitcast(addr, i8_ptr)
    }

    /// Signature of record hooks: `void (i8*)`.
    pub(crate) fn hook_fn(&mut self, symbol: &str) -> FunctionId {
        let i8_ptr = self.builder.i8_ptr_type();
        let void = self.builder.void_type();
        self.builder.declare_function(symbol, &[i8_ptr], void)
    }

    fn type_info_types(&mut self) -> TypeInfoTypes {
        if let Some(types) = self.type_info_types {
            return types;
        }
        let b = &mut *self.builder;
        let i32 = b.i32_type();
        let i64 = b.i64_type();
        let i8_ptr = b.i8_ptr_type();
        let void = b.void_type();
        let hook = b.fn_ptr_type(&[i8_ptr], void);

        let type_info = b.named_struct("strata.TypeInfo");
        let field_info = b.named_struct("strata.FieldInfo");
        let type_info_ptr = b.ptr_type(type_info);
        let field_info_ptr = b.ptr_type(field_info);
        b.set_struct_body(field_info, &[i64, type_info_ptr], false);
        b.set_struct_body(
            type_info,
            &[
                i64,
                i64,
                i32,
                i32,
                i64,
                type_info_ptr,
                i8_ptr,
                field_info_ptr,
                i64,
                hook,
                hook,
            ],
            false,
        );
        let types = TypeInfoTypes {
            type_info,
            field_info,
            hook,
        };
        self.type_info_types = Some(types);
        types
    }

    /// The descriptor global of `ty`. The global is registered before its
    /// initializer is built, so recursive types refer to themselves.
    fn type_info_global(&mut self, ty: Idx) -> GlobalId {
        if let Some(&global) = self.type_infos.get(&ty) {
            return global;
        }
        let types = self.type_info_types();
        let name = format!("strata.typeinfo.{}", self.pool.display(ty));
        let global = self.builder.declare_global(&name, types.type_info, true);
        self.builder.set_unnamed_addr(global);
        self.type_infos.insert(ty, global);
        tracing::trace!(ty = %self.pool.display(ty), "type descriptor");

        let init = self.type_info_init(ty, types);
        self.builder.set_initializer(global, init);
        global
    }

    fn type_info_init(&mut self, ty: Idx, types: TypeInfoTypes) -> ValueId {
        let tag = self.pool.tag(ty);
        let mut flags = 0;
        if self.pool.is_zero_init(ty) {
            flags |= ZERO_INIT;
        }
        if self.pool.needs_postblit(ty) {
            flags |= NEEDS_POSTBLIT;
        }
        if self.pool.needs_destruction(ty) {
            flags |= NEEDS_DESTROY;
        }

        let type_info_ptr = self.builder.ptr_type(types.type_info);
        let next = match tag {
            Tag::DynArray | Tag::FixedArray | Tag::Vector => {
                let elem = self.type_info_global(self.pool.elem(ty));
                self.builder.global_addr(elem)
            }
            _ => self.builder.const_null(type_info_ptr),
        };

        let i8_ptr = self.builder.i8_ptr_type();
        let init = if flags & ZERO_INIT == 0 {
            let bytes = self.pool.default_bytes(ty);
            let bytes = self.builder.const_bytes(&bytes);
            let global = self.builder.add_global("strata.init", bytes, true);
            self.builder.set_unnamed_addr(global);
            let addr = self.builder.global_addr(global);
            self.builder.const_bitcast(addr, i8_ptr)
        } else {
            self.builder.const_null(i8_ptr)
        };

        let (fields, field_count) = self.field_infos(ty, types);
        let (postblit, destroy) = self.record_hooks(ty, types);

        let size = self.builder.const_i64(self.pool.size_of(ty));
        let align = self.builder.const_i64(self.pool.align_of(ty));
        let kind = self.builder.const_i32(type_kind(tag));
        let flags = self.builder.const_i32(flags);
        let dim = self.builder.const_i64(self.pool.dim(ty).unwrap_or(0));
        let field_count = self.builder.const_i64(field_count);
        self.builder.const_named_struct(
            types.type_info,
            &[
                size,
                align,
                kind,
                flags,
                dim,
                next,
                init,
                fields,
                field_count,
                postblit,
                destroy,
            ],
        )
    }

    /// `{ offset, type }` of every struct member; unions have none.
    fn field_infos(&mut self, ty: Idx, types: TypeInfoTypes) -> (ValueId, u64) {
        let field_info_ptr = self.builder.ptr_type(types.field_info);
        if self.pool.tag(ty) != Tag::Struct || self.pool.record_def(ty).fields.is_empty() {
            return (self.builder.const_null(field_info_ptr), 0);
        }
        let def = self.pool.record_def(ty);
        let field_tys: Vec<Idx> = def.fields.iter().map(|f| f.ty).collect();
        let offsets = self.pool.record_layout(ty).offsets.clone();
        let mut entries = Vec::with_capacity(field_tys.len());
        for (field_ty, offset) in field_tys.into_iter().zip(offsets) {
            let desc = self.type_info_global(field_ty);
            let desc = self.builder.global_addr(desc);
            let offset = self.builder.const_i64(offset);
            entries.push(self.builder.const_named_struct(types.field_info, &[offset, desc]));
        }
        let count = entries.len() as u64;
        let table = self.builder.const_array(types.field_info, &entries);
        let global = self.builder.add_global("strata.fields", table, true);
        let addr = self.builder.global_addr(global);
        (self.builder.const_bitcast(addr, field_info_ptr), count)
    }

    /// The record's own postblit and destructor, null when absent.
    fn record_hooks(&mut self, ty: Idx, types: TypeInfoTypes) -> (ValueId, ValueId) {
        let mut hooks = [None, None];
        if matches!(self.pool.tag(ty), Tag::Struct | Tag::Union) {
            let def = self.pool.record_def(ty);
            if def.has_postblit {
                hooks[0] = Some(def.postblit_symbol());
            }
            if def.has_destructor {
                hooks[1] = Some(def.destructor_symbol());
            }
        }
        let [postblit, destroy] = hooks.map(|symbol| match symbol {
            Some(symbol) => {
                let func = self.hook_fn(&symbol);
                self.builder.function_addr(func)
            }
            None => self.builder.const_null(types.hook),
        });
        (postblit, destroy)
    }
}

fn type_kind(tag: Tag) -> u32 {
    match tag {
        Tag::Void => kind::OTHER,
        Tag::Int8 | Tag::Int16 | Tag::Int32 | Tag::Int64 => kind::SIGNED,
        Tag::Bool
        | Tag::UInt8
        | Tag::UInt16
        | Tag::UInt32
        | Tag::UInt64
        | Tag::Char
        | Tag::WChar
        | Tag::DChar
        | Tag::Pointer => kind::UNSIGNED,
        Tag::Float32 => kind::FLOAT32,
        Tag::Float64 => kind::FLOAT64,
        Tag::DynArray => kind::DYN_ARRAY,
        Tag::FixedArray | Tag::Vector => kind::FIXED_ARRAY,
        Tag::Struct => kind::STRUCT,
        Tag::Union => kind::UNION,
    }
}

#[cfg(test)]
mod tests;
