//! Local variable scopes for function lowering.
//!
//! `Locals` maps names to backend-specific slots (a register index for
//! the bytecode emitter, a frame offset for the native backends) with
//! block scoping: redeclaration in the same scope is an error, an inner
//! scope may shadow an outer name, and leaving a scope restores what it
//! shadowed.

use rustc_hash::FxHashMap;
use seedc_core::{CodegenError, Span};

#[derive(Debug, Clone, Copy)]
struct Slot<T> {
    value: T,
    depth: u32,
}

/// Scoped name-to-slot map for one function body.
#[derive(Debug)]
pub(crate) struct Locals<'ast, T> {
    vars: FxHashMap<&'ast str, Slot<T>>,
    /// Shadowed bindings with the depth at which the shadowing occurred.
    shadowed: Vec<(u32, &'ast str, Slot<T>)>,
    depth: u32,
}

impl<'ast, T: Copy> Locals<'ast, T> {
    pub fn new() -> Self {
        Self {
            vars: FxHashMap::default(),
            shadowed: Vec::new(),
            depth: 0,
        }
    }

    /// Enter a block scope.
    pub fn enter_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave the current block scope, dropping its variables and
    /// restoring anything they shadowed.
    pub fn exit_scope(&mut self) {
        let depth = self.depth;
        self.vars.retain(|_, slot| slot.depth < depth);

        while let Some(&(shadow_depth, name, slot)) = self.shadowed.last() {
            if shadow_depth != depth {
                break;
            }
            self.shadowed.pop();
            self.vars.insert(name, slot);
        }

        self.depth -= 1;
    }

    /// Bind a name to a slot in the current scope.
    pub fn declare(&mut self, name: &'ast str, value: T, span: Span) -> Result<(), CodegenError> {
        if let Some(existing) = self.vars.get(name) {
            if existing.depth == self.depth {
                return Err(CodegenError::RedeclaredVariable {
                    name: name.to_string(),
                    span,
                });
            }
            self.shadowed.push((self.depth, name, *existing));
        }

        self.vars.insert(
            name,
            Slot {
                value,
                depth: self.depth,
            },
        );
        Ok(())
    }

    /// Look up the slot bound to a name.
    pub fn get(&self, name: &str) -> Option<T> {
        self.vars.get(name).map(|slot| slot.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_look_up() {
        let mut locals: Locals<'_, u8> = Locals::new();
        locals.declare("x", 4, Span::default()).unwrap();
        assert_eq!(locals.get("x"), Some(4));
        assert_eq!(locals.get("y"), None);
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut locals: Locals<'_, u8> = Locals::new();
        locals.declare("x", 4, Span::default()).unwrap();
        let err = locals.declare("x", 5, Span::default()).unwrap_err();
        assert!(matches!(err, CodegenError::RedeclaredVariable { name, .. } if name == "x"));
    }

    #[test]
    fn inner_scope_shadows_and_restores() {
        let mut locals: Locals<'_, i32> = Locals::new();
        locals.declare("x", -8, Span::default()).unwrap();

        locals.enter_scope();
        locals.declare("x", -16, Span::default()).unwrap();
        assert_eq!(locals.get("x"), Some(-16));
        locals.exit_scope();

        assert_eq!(locals.get("x"), Some(-8));
    }

    #[test]
    fn scope_exit_drops_inner_bindings() {
        let mut locals: Locals<'_, u8> = Locals::new();
        locals.enter_scope();
        locals.declare("tmp", 4, Span::default()).unwrap();
        locals.exit_scope();
        assert_eq!(locals.get("tmp"), None);
    }

    #[test]
    fn sibling_scopes_do_not_leak() {
        let mut locals: Locals<'_, u8> = Locals::new();

        locals.enter_scope();
        locals.declare("a", 4, Span::default()).unwrap();
        locals.exit_scope();

        locals.enter_scope();
        assert_eq!(locals.get("a"), None);
        locals.declare("a", 5, Span::default()).unwrap();
        assert_eq!(locals.get("a"), Some(5));
        locals.exit_scope();
    }
}
