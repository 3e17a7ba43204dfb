//! Source type to IR type lowering.
//!
//! The memory type is authoritative for storage: `bool` is stored as `i8`
//! and only widened to `i1` as an SSA value.

use strata_llir::TyId;
use strata_types::{Idx, RecordKind, Tag};

use super::array_lowerer::ArrayLowerer;
use super::runtime_decl::byte_slice_type;

impl ArrayLowerer<'_, '_, '_> {
    /// IR type of a value of `ty` in memory.
    ///
    /// - `T[]` is `{ i64, T* }`
    /// - `T[N]` is `[N x T]`, `__vector(T[N])` is `<N x T>`
    /// - records are named structs; a union is its most aligned member
    ///   followed by byte padding up to the union's size
    pub fn mem_type(&mut self, ty: Idx) -> TyId {
        if let Some(&lowered) = self.mem_types.get(&ty) {
            return lowered;
        }
        let lowered = match self.pool.tag(ty) {
            Tag::Void | Tag::Bool | Tag::Int8 | Tag::UInt8 | Tag::Char => self.builder.i8_type(),
            Tag::Int16 | Tag::UInt16 | Tag::WChar => self.builder.int_type(16),
            Tag::Int32 | Tag::UInt32 | Tag::DChar => self.builder.i32_type(),
            Tag::Int64 | Tag::UInt64 => self.builder.i64_type(),
            Tag::Float32 => self.builder.f32_type(),
            Tag::Float64 => self.builder.f64_type(),
            Tag::DynArray => {
                let len = self.builder.i64_type();
                let ptr = self.elem_ptr_type(ty);
                self.builder.struct_type(&[len, ptr], false)
            }
            Tag::FixedArray | Tag::Vector => {
                let elem = self.mem_type(self.pool.elem(ty));
                let dim = self.pool.dim(ty).unwrap_or(0);
                if self.pool.tag(ty) == Tag::Vector {
                    self.builder.vector_type(elem, dim)
                } else {
                    self.builder.array_type(elem, dim)
                }
            }
            Tag::Pointer => self.elem_ptr_type(ty),
            Tag::Struct | Tag::Union => return self.record_type(ty),
        };
        self.mem_types.insert(ty, lowered);
        lowered
    }

    /// IR type of a value of `ty` held in a register.
    pub fn value_type(&mut self, ty: Idx) -> TyId {
        if self.pool.tag(ty) == Tag::Bool {
            self.builder.i1_type()
        } else {
            self.mem_type(ty)
        }
    }

    /// Element pointer type of an array-like or pointer type.
    pub fn elem_ptr_type(&mut self, ty: Idx) -> TyId {
        let elem = self.mem_type(self.pool.elem(ty));
        self.builder.ptr_type(elem)
    }

    /// The type-erased dynamic array `{ i64, i8* }`.
    pub fn slice_type(&mut self) -> TyId {
        byte_slice_type(self.builder)
    }

    /// Named struct for a record. The name is registered before the body
    /// so self-referential records terminate.
    fn record_type(&mut self, ty: Idx) -> TyId {
        let def = self.pool.record_def(ty).clone();
        let named = self.builder.named_struct(&def.name);
        self.mem_types.insert(ty, named);

        let i8 = self.builder.i8_type();
        let body = if def.fields.is_empty() {
            vec![i8]
        } else if def.kind == RecordKind::Struct {
            def.fields.iter().map(|f| self.mem_type(f.ty)).collect()
        } else {
            let main = def.fields[self.union_main_member(ty).unwrap_or(0)].ty;
            let mut body = vec![self.mem_type(main)];
            let pad = self.pool.size_of(ty) - self.pool.size_of(main);
            if pad > 0 {
                body.push(self.builder.array_type(i8, pad));
            }
            body
        };
        self.builder.set_struct_body(named, &body, false);
        named
    }

    /// Index of the member a union is laid out as: the most aligned one,
    /// the larger on ties, the first among equals. `None` for structs and
    /// empty unions.
    pub(crate) fn union_main_member(&self, ty: Idx) -> Option<usize> {
        let def = self.pool.record_def(ty);
        if def.kind != RecordKind::Union {
            return None;
        }
        let mut best: Option<(usize, u64, u64)> = None;
        for (i, field) in def.fields.iter().enumerate() {
            let key = (self.pool.align_of(field.ty), self.pool.size_of(field.ty));
            if best.is_none_or(|(_, align, size)| key > (align, size)) {
                best = Some((i, key.0, key.1));
            }
        }
        best.map(|(i, _, _)| i)
    }
}

#[cfg(test)]
mod tests;
