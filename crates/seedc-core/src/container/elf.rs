//! Minimal ELF executable images.
//!
//! An executable is the smallest image the OS loader accepts: an ELF
//! header, a single `PT_LOAD` program header mapping the whole file
//! read-and-execute, and the machine code at one page alignment past the
//! start. No section table is emitted. The entry point is the image base
//! plus the page-aligned header size, which is where the code sits.
//!
//! ```text
//! 0x0000  ELF header
//! 0x0040  program header        (0x0034 on 32-bit)
//! ......  zero padding
//! 0x1000  machine code          <- e_entry = base + 0x1000
//! ```

use std::path::Path;

use crate::container::write_artifact;
use crate::error::{ContainerError, SeedcError};
use crate::target::{Architecture, Target};

pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

const ET_EXEC: u16 = 2;
const PT_LOAD: u32 = 1;
const PF_R_X: u32 = 5;

/// Code size cap shared with the native module container.
const MAX_CODE_SIZE: u64 = super::native::NATIVE_MAX_CODE_SIZE;

fn machine_tag(arch: Architecture) -> u16 {
    match arch {
        Architecture::X86_64 => 62,
        Architecture::Arm64 => 183,
        Architecture::X86_32 => 3,
    }
}

/// Build an executable image for `target` around raw machine code.
///
/// # Errors
///
/// Rejects empty code and code over the size cap; the returned buffer is
/// otherwise complete and ready to be written to disk.
pub fn build_executable_image(code: &[u8], target: Target) -> Result<Vec<u8>, ContainerError> {
    if code.is_empty() {
        return Err(ContainerError::EmptyCode);
    }
    if code.len() as u64 > MAX_CODE_SIZE {
        return Err(ContainerError::CodeTooLarge {
            size: code.len() as u64,
            max: MAX_CODE_SIZE,
        });
    }

    let code_offset = target.page_align();
    let entry = target.base_address() + code_offset;
    let image_size = code_offset + code.len() as u64;

    let mut out = Vec::with_capacity(image_size as usize);
    match target.arch {
        Architecture::X86_32 => write_headers_32(&mut out, target, entry, image_size),
        _ => write_headers_64(&mut out, target, entry, image_size),
    }

    out.resize(code_offset as usize, 0);
    out.extend_from_slice(code);
    Ok(out)
}

/// Write an executable to disk with the execute permission bits set.
///
/// On any failure the partial file is removed; a path either receives a
/// complete runnable image or nothing.
pub fn write_executable(path: &Path, code: &[u8], target: Target) -> Result<(), SeedcError> {
    let image = build_executable_image(code, target)?;
    write_artifact(path, &image)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        if let Err(err) = std::fs::set_permissions(path, perms) {
            let _ = std::fs::remove_file(path);
            return Err(err.into());
        }
    }

    Ok(())
}

fn write_headers_64(out: &mut Vec<u8>, target: Target, entry: u64, image_size: u64) {
    // e_ident
    out.extend_from_slice(&ELF_MAGIC);
    out.push(2); // 64-bit
    out.push(1); // little-endian
    out.push(1); // ELF version
    out.push(0); // System V ABI
    out.extend_from_slice(&[0; 8]);

    put_u16(out, ET_EXEC);
    put_u16(out, machine_tag(target.arch));
    put_u32(out, 1); // e_version
    put_u64(out, entry);
    put_u64(out, 64); // e_phoff: right after this header
    put_u64(out, 0); // e_shoff: no sections
    put_u32(out, 0); // e_flags
    put_u16(out, 64); // e_ehsize
    put_u16(out, 56); // e_phentsize
    put_u16(out, 1); // e_phnum
    put_u16(out, 0); // e_shentsize
    put_u16(out, 0); // e_shnum
    put_u16(out, 0); // e_shstrndx
    debug_assert_eq!(out.len(), 64);

    put_u32(out, PT_LOAD);
    put_u32(out, PF_R_X);
    put_u64(out, 0); // p_offset: map from the start of the file
    put_u64(out, target.base_address());
    put_u64(out, target.base_address());
    put_u64(out, image_size); // p_filesz
    put_u64(out, image_size); // p_memsz
    put_u64(out, target.page_align());
    debug_assert_eq!(out.len(), 64 + 56);
}

fn write_headers_32(out: &mut Vec<u8>, target: Target, entry: u64, image_size: u64) {
    out.extend_from_slice(&ELF_MAGIC);
    out.push(1); // 32-bit
    out.push(1); // little-endian
    out.push(1); // ELF version
    out.push(0); // System V ABI
    out.extend_from_slice(&[0; 8]);

    put_u16(out, ET_EXEC);
    put_u16(out, machine_tag(target.arch));
    put_u32(out, 1); // e_version
    put_u32(out, entry as u32);
    put_u32(out, 52); // e_phoff
    put_u32(out, 0); // e_shoff
    put_u32(out, 0); // e_flags
    put_u16(out, 52); // e_ehsize
    put_u16(out, 32); // e_phentsize
    put_u16(out, 1); // e_phnum
    put_u16(out, 0); // e_shentsize
    put_u16(out, 0); // e_shnum
    put_u16(out, 0); // e_shstrndx
    debug_assert_eq!(out.len(), 52);

    // The 32-bit program header carries its flags near the end, not after
    // p_type as the 64-bit layout does.
    put_u32(out, PT_LOAD);
    put_u32(out, 0); // p_offset
    put_u32(out, target.base_address() as u32);
    put_u32(out, target.base_address() as u32);
    put_u32(out, image_size as u32); // p_filesz
    put_u32(out, image_size as u32); // p_memsz
    put_u32(out, PF_R_X);
    put_u32(out, target.page_align() as u32);
    debug_assert_eq!(out.len(), 52 + 32);
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}
