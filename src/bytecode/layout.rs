//! Static segment layout.
//!
//! Global declarations are packed back to back in declaration order, starting at
//! offset 0. Constant function bindings are called directly and never loaded, so
//! they take no storage and get no offset. Local declarations are laid out lazily
//! by the generator from the active function's frame counter.

use crate::ast::{DeclId, Declaration, FileAst, ScopeId};
use crate::core::error::{CompileResult, InvariantViolation};

/// Alignment of the static segment size.
pub const PAGE_SIZE: u64 = 4 * 1024;

/// Stack budget shared by every frame.
pub const STACK_SIZE: u64 = 10 * 1024;

/// Round `size` up to a multiple of `page_size` (a power of two). Multiples are unchanged.
pub fn page_round(size: u64, page_size: u64) -> u64 {
    debug_assert!(page_size.is_power_of_two());
    if size & (page_size - 1) == 0 {
        size
    } else {
        (size + page_size) & !(page_size - 1)
    }
}

/// Check the sizing preconditions of a declaration's type and return its bit size.
pub fn checked_size_in_bits(decl: &Declaration) -> CompileResult<u32> {
    let ty = decl.ty.as_ref().ok_or_else(|| InvariantViolation::MissingType {
        name: decl.name.clone(),
    })?;

    let bits = ty.size_in_bits();
    if bits == 0 {
        return Err(InvariantViolation::ZeroSizedType {
            name: decl.name.clone(),
        }
        .into());
    }
    if bits % 8 != 0 {
        return Err(InvariantViolation::UnalignedSize {
            name: decl.name.clone(),
            bits,
        }
        .into());
    }
    Ok(bits)
}

/// Storage a declaration needs, in bytes. Constant functions need none.
pub fn variable_size(decl: &Declaration) -> CompileResult<u64> {
    let bits = checked_size_in_bits(decl)?;
    if decl.is_constant() && decl.is_function_declaration() {
        return Ok(0);
    }
    Ok(bits as u64 / 8)
}

/// Record the offset of `id`, rejecting a second assignment.
pub fn assign_offset(ast: &FileAst, id: DeclId, offset: u64) -> CompileResult<()> {
    let decl = ast.decl(id);
    decl.assign_memory_offset(offset).map_err(|existing| {
        InvariantViolation::OffsetAlreadyAssigned {
            name: decl.name.clone(),
            existing,
        }
        .into()
    })
}

/// Assign static-segment offsets to every global in `scope` and return the total size.
///
/// Only defined for the outermost scope.
pub fn compute_global_layout(ast: &FileAst, scope: ScopeId) -> CompileResult<u64> {
    let scope = ast.scope(scope);
    if !scope.is_global() {
        return Err(InvariantViolation::NestedScopeLayout.into());
    }

    let mut total_size = 0u64;
    for &id in scope.decls() {
        let decl = ast.decl(id);
        let size = variable_size(decl)?;
        if size == 0 {
            log::debug!("global `{}` needs no storage", decl.name);
            continue;
        }

        assign_offset(ast, id, total_size)?;
        log::debug!("global `{}` at static offset {} ({} bytes)", decl.name, total_size, size);
        total_size += size;
    }
    Ok(total_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        ArrayType, BasicType, DeclFlags, DirectType, FunctionType, SizedType, SourceLocation,
    };

    fn declare(ast: &mut FileAst, scope: ScopeId, name: &str, ty: SizedType, flags: DeclFlags) -> DeclId {
        ast.declare(scope, name, Some(ty), flags, SourceLocation::default())
    }

    #[test]
    fn test_page_round() {
        assert_eq!(page_round(0, PAGE_SIZE), 0);
        assert_eq!(page_round(1, PAGE_SIZE), 4096);
        assert_eq!(page_round(4095, PAGE_SIZE), 4096);
        assert_eq!(page_round(4096, PAGE_SIZE), 4096);
        assert_eq!(page_round(4097, PAGE_SIZE), 8192);
        assert_eq!(page_round(8192, PAGE_SIZE), 8192);
    }

    #[test]
    fn test_globals_are_packed_in_order() {
        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        let x = declare(&mut ast, global, "x", SizedType::direct(BasicType::S32), DeclFlags::empty());
        let s = declare(&mut ast, global, "s", SizedType::direct(BasicType::String), DeclFlags::empty());
        let b = declare(&mut ast, global, "b", SizedType::direct(BasicType::Bool), DeclFlags::empty());

        let total = compute_global_layout(&ast, global).unwrap();
        assert_eq!(total, 4 + 16 + 1);
        assert_eq!(ast.decl(x).memory_offset(), Some(0));
        assert_eq!(ast.decl(s).memory_offset(), Some(4));
        assert_eq!(ast.decl(b).memory_offset(), Some(20));
    }

    #[test]
    fn test_constant_functions_take_no_space() {
        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        let fn_ty = SizedType::Function(FunctionType::new(vec![], None));
        let a = declare(&mut ast, global, "a", SizedType::direct(BasicType::U64), DeclFlags::empty());
        let f = declare(&mut ast, global, "f", fn_ty.clone(), DeclFlags::IS_CONSTANT);
        let p = declare(&mut ast, global, "p", fn_ty, DeclFlags::empty());

        let total = compute_global_layout(&ast, global).unwrap();
        assert_eq!(total, 16);
        assert_eq!(ast.decl(a).memory_offset(), Some(0));
        assert_eq!(ast.decl(f).memory_offset(), None);
        // a non-constant function value is a pointer and needs storage
        assert_eq!(ast.decl(p).memory_offset(), Some(8));
    }

    #[test]
    fn test_nested_scope_is_rejected() {
        let mut ast = FileAst::new(None);
        let inner = ast.add_scope(ast.global_scope());
        assert_eq!(
            compute_global_layout(&ast, inner),
            Err(InvariantViolation::NestedScopeLayout.into())
        );
    }

    #[test]
    fn test_missing_and_malformed_sizes_are_rejected() {
        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        ast.declare(global, "untyped", None, DeclFlags::empty(), SourceLocation::default());
        assert!(matches!(
            compute_global_layout(&ast, global),
            Err(crate::core::error::CompileError::Internal(InvariantViolation::MissingType { .. }))
        ));

        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        let empty = SizedType::Array(ArrayType::fixed(SizedType::direct(BasicType::U8), 0).unwrap());
        declare(&mut ast, global, "empty", empty, DeclFlags::empty());
        assert!(matches!(
            compute_global_layout(&ast, global),
            Err(crate::core::error::CompileError::Internal(InvariantViolation::ZeroSizedType { .. }))
        ));

        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        let odd = SizedType::Direct(DirectType {
            basic: BasicType::U8,
            size_in_bits: 12,
        });
        declare(&mut ast, global, "odd", odd, DeclFlags::empty());
        assert!(matches!(
            compute_global_layout(&ast, global),
            Err(crate::core::error::CompileError::Internal(InvariantViolation::UnalignedSize { bits: 12, .. }))
        ));
    }

    #[test]
    fn test_offset_written_once() {
        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        let x = declare(&mut ast, global, "x", SizedType::direct(BasicType::S32), DeclFlags::empty());
        compute_global_layout(&ast, global).unwrap();

        assert!(matches!(
            assign_offset(&ast, x, 8),
            Err(crate::core::error::CompileError::Internal(
                InvariantViolation::OffsetAlreadyAssigned { existing: 0, .. }
            ))
        ));
    }
}
