//! Function signature collection shared by the backends.
//!
//! Every backend starts by tabling the unit's function declarations, so
//! calls can be checked against the declared arity before any code is
//! produced, and prototypes can stand in for definitions that appear
//! later in the file.

use rustc_hash::FxHashMap;
use seedc_core::{CodegenError, Span};
use seedc_parser::TranslationUnit;
use seedc_parser::ast::Item;

/// The callable shape of a declared function.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FnSig {
    pub params: usize,
    pub returns_value: bool,
    /// Whether a body has been seen for this name.
    pub defined: bool,
    pub span: Span,
}

/// Signatures of every function declared in a translation unit.
#[derive(Debug)]
pub(crate) struct FunctionTable<'ast> {
    map: FxHashMap<&'ast str, FnSig>,
}

impl<'ast> FunctionTable<'ast> {
    /// Collect signatures, rejecting duplicate definitions and
    /// declarations that disagree with an earlier one.
    pub fn build(unit: &TranslationUnit<'ast>) -> Result<Self, CodegenError> {
        let mut map: FxHashMap<&'ast str, FnSig> = FxHashMap::default();

        for item in unit.items() {
            let Item::Function(func) = item else {
                continue;
            };
            let name = func.name.name;
            let sig = FnSig {
                params: func.params.len(),
                returns_value: func.returns_value(),
                defined: func.is_definition(),
                span: func.span,
            };

            match map.get_mut(name) {
                None => {
                    map.insert(name, sig);
                }
                Some(existing) => {
                    if existing.defined && sig.defined {
                        return Err(CodegenError::RedefinedFunction {
                            name: name.to_string(),
                            span: func.span,
                        });
                    }
                    if existing.params != sig.params
                        || existing.returns_value != sig.returns_value
                    {
                        // A prototype that disagrees with the definition
                        // (or another prototype) is treated the same way.
                        return Err(CodegenError::RedefinedFunction {
                            name: name.to_string(),
                            span: func.span,
                        });
                    }
                    existing.defined |= sig.defined;
                }
            }
        }

        Ok(Self { map })
    }

    pub fn get(&self, name: &str) -> Option<&FnSig> {
        self.map.get(name)
    }
}
