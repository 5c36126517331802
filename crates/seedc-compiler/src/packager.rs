//! Packaging of native code-generation output.
//!
//! The code generator hands back a flat machine-code image with an
//! export table; this module wraps that image in the on-disk containers.
//! [`package_module`] produces a loadable `.native` module,
//! [`build_executable`] produces a standalone executable image, and
//! [`write_executable`] writes that image to disk with the permission
//! bits set.

use std::path::Path;

use seedc_core::container::elf;
use seedc_core::{ContainerError, ModuleFlags, ModuleKind, NativeModuleFile, SeedcError, Target};

use crate::codegen::NativeArtifact;

/// Package a compiled artifact as a loadable native module.
///
/// The module carries the artifact's code, entry point, and export
/// table unchanged. Serialization validates the result: empty code,
/// oversized sections, out-of-range export spans, and duplicate export
/// names are rejected before any bytes are produced.
pub fn package_module(
    artifact: &NativeArtifact,
    target: Target,
    kind: ModuleKind,
    flags: ModuleFlags,
) -> Result<Vec<u8>, ContainerError> {
    let mut module = NativeModuleFile::new(target.arch, kind);
    module.flags = flags;
    module.entry_point = artifact.entry;
    module.code = artifact.code.clone();
    module.exports = artifact.exports.clone();
    module.to_bytes()
}

/// Build a standalone executable image from a compiled artifact.
///
/// The image is a minimal static executable for the artifact's target:
/// headers in the first page, code immediately after, entry at the
/// page boundary.
pub fn build_executable(
    artifact: &NativeArtifact,
    target: Target,
) -> Result<Vec<u8>, ContainerError> {
    elf::build_executable_image(&artifact.code, target)
}

/// Write a compiled artifact to disk as an executable.
///
/// The file comes out with the execute bits set. A partially written
/// file is removed before the error is returned.
pub fn write_executable(
    path: &Path,
    artifact: &NativeArtifact,
    target: Target,
) -> Result<(), SeedcError> {
    elf::write_executable(path, &artifact.code, target)
}
