//! On-disk artifact containers.
//!
//! Three byte formats leave the toolchain:
//!
//! - [`astc`] - compiled bytecode programs (magic `ASTC`)
//! - [`native`] - native code modules with export tables (magic `NATV`)
//! - [`elf`] - minimal executable images handed to the OS loader
//!
//! All multi-byte fields are little-endian. Readers validate a container
//! completely before any payload is used; writers validate their inputs
//! before producing a single byte, so a failed encode or a failed write
//! never leaves a partial artifact behind.

pub mod astc;
pub mod elf;
pub mod native;

use std::io;
use std::path::Path;

use crate::error::ContainerError;

/// The kind of artifact a byte buffer holds, detected from its magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// An `ASTC` bytecode program.
    Program,
    /// A `NATV` native module.
    NativeModule,
    /// An ELF executable image.
    Executable,
}

impl ArtifactKind {
    /// Detect the artifact kind from the leading magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        let magic = bytes.get(..4)?;
        if magic == astc::ASTC_MAGIC {
            Some(ArtifactKind::Program)
        } else if magic == native::NATIVE_MAGIC.to_le_bytes() {
            Some(ArtifactKind::NativeModule)
        } else if magic == elf::ELF_MAGIC {
            Some(ArtifactKind::Executable)
        } else {
            None
        }
    }
}

/// Write an artifact file, removing the partial file if the write fails.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Err(err) = std::fs::write(path, bytes) {
        let _ = std::fs::remove_file(path);
        return Err(err);
    }
    Ok(())
}

/// Bounds-checked little-endian reads over a byte buffer.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, off: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.off
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], ContainerError> {
        let end = self.off.checked_add(n).ok_or(ContainerError::Truncated {
            needed: usize::MAX,
            have: self.buf.len(),
        })?;
        if end > self.buf.len() {
            return Err(ContainerError::Truncated {
                needed: end,
                have: self.buf.len(),
            });
        }
        let slice = &self.buf[self.off..end];
        self.off = end;
        Ok(slice)
    }

    pub(crate) fn magic(&mut self) -> Result<[u8; 4], ContainerError> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ContainerError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, ContainerError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }
}
