//! The `NATV` native module container.
//!
//! A native module carries machine code, optional initialized data, and an
//! export table describing the symbols the code defines. Layout (integers
//! little-endian):
//!
//! ```text
//! offset  field                size
//! 0       magic                u32  = 0x5654414E ("NATV")
//! 4       version              u32  = 1
//! 8       architecture         u32  (Architecture tag)
//! 12      module_kind          u32  (ModuleKind tag)
//! 16      flags                u32  (ModuleFlags bits)
//! 20      header_size          u32  = 64
//! 24      code_size            u64
//! 32      data_size            u64
//! 40      export_count         u32
//! 44      entry_point          u32  (offset into code)
//! 48      export_table_offset  u64  (= 64 + code_size + data_size)
//! 56      checksum             u64  (xxh64 of the code section)
//!
//! [code] [data] [export table]
//! ```
//!
//! Each export table entry is 280 bytes: a 256-byte NUL-padded name, a
//! u32 type tag, a u32 signature word, and u64 offset and size. Export
//! names are unique within a module; both the writer and the reader
//! reject duplicates, so a valid module file can always be indexed by
//! name without ambiguity.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashSet;
use xxhash_rust::xxh64::xxh64;

use crate::container::Reader;
use crate::error::ContainerError;
use crate::target::{Architecture, ModuleKind};

pub const NATIVE_MAGIC: u32 = 0x5654_414E; // "NATV"
pub const NATIVE_VERSION: u32 = 1;
pub const NATIVE_HEADER_SIZE: usize = 64;
pub const NATIVE_MAX_CODE_SIZE: u64 = 16 * 1024 * 1024;
pub const NATIVE_MAX_EXPORTS: usize = 1024;

const EXPORT_ENTRY_SIZE: usize = 280;
const EXPORT_NAME_SIZE: usize = 256;

bitflags! {
    /// Properties of a native module, stored in its header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModuleFlags: u32 {
        /// Code can be relocated to a different base.
        const RELOCATABLE = 1;
        /// Code is position independent.
        const POSITION_INDEPENDENT = 2;
        /// Module carries debug information.
        const DEBUG_INFO = 4;
        /// Code was produced with optimization enabled.
        const OPTIMIZED = 8;
        /// Module carries a signature section.
        const SIGNED = 16;
    }
}

/// What an export table entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ExportType {
    Function = 1,
    Variable = 2,
    Constant = 3,
}

/// The call signature of an exported function, packed into the entry's
/// signature word: bit 0 is the returns-a-value flag, bits 8..16 hold the
/// parameter count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSignature {
    pub param_count: u8,
    pub returns_value: bool,
}

impl ExportSignature {
    pub fn new(param_count: u8, returns_value: bool) -> Self {
        Self {
            param_count,
            returns_value,
        }
    }

    fn to_word(self) -> u32 {
        (self.returns_value as u32) | ((self.param_count as u32) << 8)
    }

    fn from_word(word: u32) -> Self {
        Self {
            returns_value: word & 1 != 0,
            param_count: ((word >> 8) & 0xFF) as u8,
        }
    }
}

/// One entry of a module's export table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeExport {
    pub name: String,
    pub export_type: ExportType,
    pub signature: ExportSignature,
    /// Offset of the symbol within the code section.
    pub offset: u64,
    /// Size of the symbol in bytes.
    pub size: u64,
}

impl NativeExport {
    /// A function export with a typed signature.
    pub fn function(
        name: impl Into<String>,
        offset: u64,
        size: u64,
        signature: ExportSignature,
    ) -> Self {
        Self {
            name: name.into(),
            export_type: ExportType::Function,
            signature,
            offset,
            size,
        }
    }
}

/// An in-memory native module, encodable to and decodable from the
/// container format.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeModuleFile {
    pub architecture: Architecture,
    pub kind: ModuleKind,
    pub flags: ModuleFlags,
    /// Code offset where execution starts when the module is run directly.
    pub entry_point: u32,
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    pub exports: Vec<NativeExport>,
}

impl NativeModuleFile {
    /// Create an empty module for the given architecture and kind.
    pub fn new(architecture: Architecture, kind: ModuleKind) -> Self {
        Self {
            architecture,
            kind,
            flags: ModuleFlags::empty(),
            entry_point: 0,
            code: Vec::new(),
            data: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Look up an export by name.
    pub fn find_export(&self, name: &str) -> Option<&NativeExport> {
        self.exports.iter().find(|e| e.name == name)
    }

    /// Encode into the container format.
    ///
    /// # Errors
    ///
    /// All structural limits are enforced before any byte is produced:
    /// non-empty code within the size cap, export count within the table
    /// limit, names under 256 bytes and unique, symbol ranges and the
    /// entry point within the code section.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ContainerError> {
        self.validate()?;

        let code_size = self.code.len() as u64;
        let data_size = self.data.len() as u64;
        let export_table_offset = NATIVE_HEADER_SIZE as u64 + code_size + data_size;
        let total = export_table_offset as usize + self.exports.len() * EXPORT_ENTRY_SIZE;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&NATIVE_MAGIC.to_le_bytes());
        out.extend_from_slice(&NATIVE_VERSION.to_le_bytes());
        out.extend_from_slice(&u32::from(self.architecture).to_le_bytes());
        out.extend_from_slice(&u32::from(self.kind).to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&(NATIVE_HEADER_SIZE as u32).to_le_bytes());
        out.extend_from_slice(&code_size.to_le_bytes());
        out.extend_from_slice(&data_size.to_le_bytes());
        out.extend_from_slice(&(self.exports.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.entry_point.to_le_bytes());
        out.extend_from_slice(&export_table_offset.to_le_bytes());
        out.extend_from_slice(&xxh64(&self.code, 0).to_le_bytes());
        debug_assert_eq!(out.len(), NATIVE_HEADER_SIZE);

        out.extend_from_slice(&self.code);
        out.extend_from_slice(&self.data);

        for export in &self.exports {
            let mut name = [0u8; EXPORT_NAME_SIZE];
            name[..export.name.len()].copy_from_slice(export.name.as_bytes());
            out.extend_from_slice(&name);
            out.extend_from_slice(&u32::from(export.export_type).to_le_bytes());
            out.extend_from_slice(&export.signature.to_word().to_le_bytes());
            out.extend_from_slice(&export.offset.to_le_bytes());
            out.extend_from_slice(&export.size.to_le_bytes());
        }
        debug_assert_eq!(out.len(), total);

        Ok(out)
    }

    /// Decode and validate a container.
    ///
    /// A module that fails any check (magic, version, tags, bounds,
    /// checksum, export table contents) yields nothing; no partially
    /// decoded module escapes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContainerError> {
        let mut reader = Reader::new(bytes);

        let magic = reader.u32()?;
        if magic != NATIVE_MAGIC {
            return Err(ContainerError::BadMagic {
                expected: NATIVE_MAGIC.to_le_bytes(),
                found: magic.to_le_bytes(),
            });
        }

        let version = reader.u32()?;
        if version != NATIVE_VERSION {
            return Err(ContainerError::BadVersion { found: version });
        }

        let architecture = Architecture::try_from(reader.u32()?)
            .map_err(|e| ContainerError::BadArchitecture(e.number))?;
        let kind = ModuleKind::try_from(reader.u32()?)
            .map_err(|e| ContainerError::BadModuleKind(e.number))?;
        let flags = ModuleFlags::from_bits_truncate(reader.u32()?);

        let header_size = reader.u32()?;
        if header_size as usize != NATIVE_HEADER_SIZE {
            return Err(ContainerError::BadHeaderSize { found: header_size });
        }

        let code_size = reader.u64()?;
        if code_size == 0 {
            return Err(ContainerError::EmptyCode);
        }
        if code_size > NATIVE_MAX_CODE_SIZE {
            return Err(ContainerError::CodeTooLarge {
                size: code_size,
                max: NATIVE_MAX_CODE_SIZE,
            });
        }
        let data_size = reader.u64()?;
        if data_size > NATIVE_MAX_CODE_SIZE {
            return Err(ContainerError::OutOfBounds {
                what: "data size",
                value: data_size,
                limit: NATIVE_MAX_CODE_SIZE,
            });
        }

        let export_count = reader.u32()? as usize;
        if export_count > NATIVE_MAX_EXPORTS {
            return Err(ContainerError::TooManyExports {
                count: export_count,
                limit: NATIVE_MAX_EXPORTS,
            });
        }
        let entry_point = reader.u32()?;
        let export_table_offset = reader.u64()?;
        let stored_checksum = reader.u64()?;
        debug_assert_eq!(reader.offset(), NATIVE_HEADER_SIZE);

        let expected_table = NATIVE_HEADER_SIZE as u64 + code_size + data_size;
        if export_table_offset != expected_table {
            return Err(ContainerError::OutOfBounds {
                what: "export table offset",
                value: export_table_offset,
                limit: expected_table,
            });
        }

        let code = reader.take(code_size as usize)?.to_vec();
        let data = reader.take(data_size as usize)?.to_vec();

        let computed = xxh64(&code, 0);
        if computed != stored_checksum {
            return Err(ContainerError::ChecksumMismatch {
                stored: stored_checksum,
                computed,
            });
        }

        if entry_point as u64 >= code_size {
            return Err(ContainerError::EntryOutOfBounds {
                entry: entry_point,
                len: code_size,
            });
        }

        let mut exports = Vec::with_capacity(export_count);
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for index in 0..export_count {
            let entry = reader.take(EXPORT_ENTRY_SIZE)?;

            let name_field = &entry[..EXPORT_NAME_SIZE];
            let nul = name_field
                .iter()
                .position(|&b| b == 0)
                .ok_or(ContainerError::UnterminatedName { index })?;
            let name = std::str::from_utf8(&name_field[..nul])
                .map_err(|_| ContainerError::InvalidName { index })?
                .to_string();

            let type_raw = u32::from_le_bytes([entry[256], entry[257], entry[258], entry[259]]);
            let export_type = ExportType::try_from(type_raw)
                .map_err(|e| ContainerError::BadExportType(e.number))?;
            let word = u32::from_le_bytes([entry[260], entry[261], entry[262], entry[263]]);

            let mut raw = [0u8; 8];
            raw.copy_from_slice(&entry[264..272]);
            let offset = u64::from_le_bytes(raw);
            raw.copy_from_slice(&entry[272..280]);
            let size = u64::from_le_bytes(raw);

            if offset.checked_add(size).is_none_or(|end| end > code_size) {
                return Err(ContainerError::OutOfBounds {
                    what: "export range",
                    value: offset.saturating_add(size),
                    limit: code_size,
                });
            }
            if !seen.insert(name.clone()) {
                return Err(ContainerError::DuplicateExport { name });
            }

            exports.push(NativeExport {
                name,
                export_type,
                signature: ExportSignature::from_word(word),
                offset,
                size,
            });
        }

        Ok(Self {
            architecture,
            kind,
            flags,
            entry_point,
            code,
            data,
            exports,
        })
    }

    fn validate(&self) -> Result<(), ContainerError> {
        if self.code.is_empty() {
            return Err(ContainerError::EmptyCode);
        }
        let code_size = self.code.len() as u64;
        if code_size > NATIVE_MAX_CODE_SIZE {
            return Err(ContainerError::CodeTooLarge {
                size: code_size,
                max: NATIVE_MAX_CODE_SIZE,
            });
        }
        if self.exports.len() > NATIVE_MAX_EXPORTS {
            return Err(ContainerError::TooManyExports {
                count: self.exports.len(),
                limit: NATIVE_MAX_EXPORTS,
            });
        }
        if self.entry_point as u64 >= code_size {
            return Err(ContainerError::EntryOutOfBounds {
                entry: self.entry_point,
                len: code_size,
            });
        }

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for export in &self.exports {
            if export.name.len() >= EXPORT_NAME_SIZE {
                return Err(ContainerError::NameTooLong {
                    name: export.name.clone(),
                    limit: EXPORT_NAME_SIZE - 1,
                });
            }
            if export
                .offset
                .checked_add(export.size)
                .is_none_or(|end| end > code_size)
            {
                return Err(ContainerError::OutOfBounds {
                    what: "export range",
                    value: export.offset.saturating_add(export.size),
                    limit: code_size,
                });
            }
            if !seen.insert(&export.name) {
                return Err(ContainerError::DuplicateExport {
                    name: export.name.clone(),
                });
            }
        }
        Ok(())
    }
}
