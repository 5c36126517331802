//! The `ASTC` bytecode program container.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic        [4]  = b"ASTC"
//! version      u32  = 1
//! flags        u32  (bit 0: source section present)
//! entry_point  u32  (offset into the bytecode section)
//! source_size  u32
//! source       [source_size]  utf-8
//! bytecode_size u32
//! bytecode     [bytecode_size]
//! ```
//!
//! The optional source section lets a program artifact carry the text it
//! was compiled from, so diagnostics and disassembly listings can refer
//! back to it.

use crate::container::Reader;
use crate::error::ContainerError;

pub const ASTC_MAGIC: [u8; 4] = *b"ASTC";
pub const ASTC_VERSION: u32 = 1;

/// Source section present when set in `flags`.
const FLAG_HAS_SOURCE: u32 = 1;

/// Sanity cap per section, against corrupt headers.
const ASTC_MAX_SECTION: u32 = 16 * 1024 * 1024;

/// A compiled bytecode program with an optional embedded source copy.
#[derive(Debug, Clone, PartialEq)]
pub struct AstcProgram {
    /// Bytecode offset where execution starts.
    pub entry_point: u32,
    /// The source text the program was compiled from, if embedded.
    pub source: Option<String>,
    /// The bytecode instruction stream.
    pub bytecode: Vec<u8>,
}

impl AstcProgram {
    /// Create a program with no embedded source.
    pub fn new(bytecode: Vec<u8>, entry_point: u32) -> Self {
        Self {
            entry_point,
            source: None,
            bytecode,
        }
    }

    /// Attach the source text this program was compiled from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Encode into the container format.
    ///
    /// # Errors
    ///
    /// Rejects an empty bytecode section, sections over the sanity cap,
    /// and an entry point outside the bytecode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        self.validate()?;

        let source = self.source.as_deref().unwrap_or("");
        let mut out = Vec::with_capacity(24 + source.len() + self.bytecode.len());

        out.extend_from_slice(&ASTC_MAGIC);
        out.extend_from_slice(&ASTC_VERSION.to_le_bytes());
        let flags = if self.source.is_some() {
            FLAG_HAS_SOURCE
        } else {
            0
        };
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&self.entry_point.to_le_bytes());
        out.extend_from_slice(&(source.len() as u32).to_le_bytes());
        out.extend_from_slice(source.as_bytes());
        out.extend_from_slice(&(self.bytecode.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.bytecode);

        Ok(out)
    }

    /// Decode and validate a container.
    ///
    /// The whole buffer is checked before any field is handed out; a
    /// container that fails any check yields no program at all.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut reader = Reader::new(bytes);

        let magic = reader.magic()?;
        if magic != ASTC_MAGIC {
            return Err(ContainerError::BadMagic {
                expected: ASTC_MAGIC,
                found: magic,
            });
        }

        let version = reader.u32()?;
        if version != ASTC_VERSION {
            return Err(ContainerError::BadVersion { found: version });
        }

        let flags = reader.u32()?;
        let entry_point = reader.u32()?;

        let source_size = reader.u32()?;
        if source_size > ASTC_MAX_SECTION {
            return Err(ContainerError::OutOfBounds {
                what: "source size",
                value: source_size as u64,
                limit: ASTC_MAX_SECTION as u64,
            });
        }
        let source_bytes = reader.take(source_size as usize)?;
        let source = if flags & FLAG_HAS_SOURCE != 0 {
            let text = std::str::from_utf8(source_bytes)
                .map_err(|_| ContainerError::InvalidSource)?;
            Some(text.to_string())
        } else {
            None
        };

        let bytecode_size = reader.u32()?;
        if bytecode_size > ASTC_MAX_SECTION {
            return Err(ContainerError::OutOfBounds {
                what: "bytecode size",
                value: bytecode_size as u64,
                limit: ASTC_MAX_SECTION as u64,
            });
        }
        let bytecode = reader.take(bytecode_size as usize)?.to_vec();

        let program = Self {
            entry_point,
            source,
            bytecode,
        };
        program.validate()?;
        Ok(program)
    }

    fn validate(&self) -> Result<(), ContainerError> {
        if self.bytecode.is_empty() {
            return Err(ContainerError::EmptyCode);
        }
        if self.bytecode.len() as u32 > ASTC_MAX_SECTION {
            return Err(ContainerError::OutOfBounds {
                what: "bytecode size",
                value: self.bytecode.len() as u64,
                limit: ASTC_MAX_SECTION as u64,
            });
        }
        if let Some(source) = &self.source {
            if source.len() as u32 > ASTC_MAX_SECTION {
                return Err(ContainerError::OutOfBounds {
                    what: "source size",
                    value: source.len() as u64,
                    limit: ASTC_MAX_SECTION as u64,
                });
            }
        }
        if self.entry_point as usize >= self.bytecode.len() {
            return Err(ContainerError::EntryOutOfBounds {
                entry: self.entry_point,
                len: self.bytecode.len() as u64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AstcProgram {
        AstcProgram::new(vec![0x10, 0x00, 42, 0, 0, 0, 0, 0, 0, 0, 0x01], 0)
            .with_source("int main() { return 42; }")
    }

    #[test]
    fn round_trip_preserves_all_fields() {
        let program = sample();
        let bytes = program.to_bytes().unwrap();
        let back = AstcProgram::from_bytes(&bytes).unwrap();
        assert_eq!(back, program);
    }

    #[test]
    fn round_trip_without_source() {
        let program = AstcProgram::new(vec![0x01], 0);
        let back = AstcProgram::from_bytes(&program.to_bytes().unwrap()).unwrap();
        assert_eq!(back.source, None);
        assert_eq!(back.bytecode, vec![0x01]);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[..4].copy_from_slice(b"BADC");
        let err = AstcProgram::from_bytes(&bytes).unwrap_err();
        assert_eq!(
            err,
            ContainerError::BadMagic {
                expected: ASTC_MAGIC,
                found: *b"BADC",
            }
        );
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert_eq!(
            AstcProgram::from_bytes(&bytes).unwrap_err(),
            ContainerError::BadVersion { found: 99 }
        );
    }

    #[test]
    fn truncated_container_is_rejected() {
        let bytes = sample().to_bytes().unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(
            AstcProgram::from_bytes(cut).unwrap_err(),
            ContainerError::Truncated { .. }
        ));
    }

    #[test]
    fn empty_bytecode_never_encodes() {
        let program = AstcProgram::new(Vec::new(), 0);
        assert_eq!(program.to_bytes().unwrap_err(), ContainerError::EmptyCode);
    }

    #[test]
    fn entry_outside_bytecode_is_rejected() {
        let program = AstcProgram::new(vec![0x01], 5);
        assert_eq!(
            program.to_bytes().unwrap_err(),
            ContainerError::EntryOutOfBounds { entry: 5, len: 1 }
        );
    }

    #[test]
    fn oversized_declared_source_is_rejected() {
        let mut bytes = AstcProgram::new(vec![0x01], 0).to_bytes().unwrap();
        // Source size field sits after magic, version, flags and entry.
        bytes[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            AstcProgram::from_bytes(&bytes).unwrap_err(),
            ContainerError::OutOfBounds { what: "source size", .. }
        ));
    }
}
