//! Type expressions for the C subset.
//!
//! The type language is a closed sum: the three base types, pointer
//! derivation, fixed-length arrays, and function signatures. Types are
//! arena-allocated like every other node and refer to each other by
//! `&'ast` reference, so no two descriptors ever form a cycle.

use seedc_core::Span;
use std::fmt;

/// A type as written in source, with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeExpr<'ast> {
    /// The shape of the type
    pub desc: TypeDesc<'ast>,
    /// Source location
    pub span: Span,
}

impl<'ast> TypeExpr<'ast> {
    pub fn new(desc: TypeDesc<'ast>, span: Span) -> Self {
        Self { desc, span }
    }

    /// Check if this is the `void` type (not a pointer to void).
    pub fn is_void(&self) -> bool {
        matches!(self.desc, TypeDesc::Void)
    }

    /// Check if this type is a pointer.
    pub fn is_pointer(&self) -> bool {
        matches!(self.desc, TypeDesc::Pointer(_))
    }
}

/// The shape of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDesc<'ast> {
    /// `void`
    Void,
    /// `char`
    Char,
    /// `int`
    Int,
    /// Pointer to another type
    Pointer(&'ast TypeDesc<'ast>),
    /// Fixed-length array
    Array(&'ast ArrayType<'ast>),
    /// Function signature
    Function(&'ast FunctionType<'ast>),
}

impl<'ast> TypeDesc<'ast> {
    /// Number of `*` derivations applied to the base type.
    pub fn pointer_depth(&self) -> u32 {
        match self {
            TypeDesc::Pointer(inner) => 1 + inner.pointer_depth(),
            _ => 0,
        }
    }
}

impl fmt::Display for TypeDesc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Void => write!(f, "void"),
            TypeDesc::Char => write!(f, "char"),
            TypeDesc::Int => write!(f, "int"),
            TypeDesc::Pointer(inner) => write!(f, "{inner}*"),
            TypeDesc::Array(arr) => write!(f, "{}[{}]", arr.element, arr.length),
            TypeDesc::Function(func) => {
                write!(f, "{}(", func.return_type)?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A fixed-length array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayType<'ast> {
    /// Element type
    pub element: TypeDesc<'ast>,
    /// Number of elements
    pub length: u32,
}

/// A function signature type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionType<'ast> {
    /// Return type
    pub return_type: TypeDesc<'ast>,
    /// Parameter types in declaration order
    pub params: &'ast [TypeDesc<'ast>],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_checks() {
        let void_ty = TypeExpr::new(TypeDesc::Void, Span::new(1, 1, 4));
        assert!(void_ty.is_void());
        assert!(!void_ty.is_pointer());

        let int_ty = TypeExpr::new(TypeDesc::Int, Span::new(1, 1, 3));
        assert!(!int_ty.is_void());
    }

    #[test]
    fn pointer_depth_counts_derivations() {
        let arena = bumpalo::Bump::new();
        let int_ty = arena.alloc(TypeDesc::Int);
        let ptr = arena.alloc(TypeDesc::Pointer(int_ty));
        let ptr_ptr = TypeDesc::Pointer(ptr);

        assert_eq!(TypeDesc::Int.pointer_depth(), 0);
        assert_eq!(ptr.pointer_depth(), 1);
        assert_eq!(ptr_ptr.pointer_depth(), 2);
    }

    #[test]
    fn display_forms() {
        let arena = bumpalo::Bump::new();
        let char_ty = arena.alloc(TypeDesc::Char);
        assert_eq!(format!("{}", TypeDesc::Pointer(char_ty)), "char*");

        let arr = arena.alloc(ArrayType {
            element: TypeDesc::Int,
            length: 8,
        });
        assert_eq!(format!("{}", TypeDesc::Array(arr)), "int[8]");

        let params = arena.alloc_slice_copy(&[TypeDesc::Int, TypeDesc::Char]);
        let func = arena.alloc(FunctionType {
            return_type: TypeDesc::Void,
            params,
        });
        assert_eq!(format!("{}", TypeDesc::Function(func)), "void(int, char)");
    }
}
