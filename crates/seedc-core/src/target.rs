use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

// ============================================================================
// Architecture
// ============================================================================

/// CPU architecture tag, as stored in native module headers.
///
/// The numeric values are part of the on-disk format and must not change.
/// `Arm64` is a reserved tag: containers carrying it validate, but the code
/// generators only produce x86 output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum Architecture {
    X86_64 = 1,
    Arm64 = 2,
    X86_32 = 3,
}

impl Architecture {
    /// Pointer/word width in bits.
    pub fn bits(&self) -> u32 {
        match self {
            Architecture::X86_64 | Architecture::Arm64 => 64,
            Architecture::X86_32 => 32,
        }
    }

    /// Pointer/word width in bytes.
    pub fn word_size(&self) -> u32 {
        self.bits() / 8
    }

    /// Short tag used in module file names (`{stem}_{tag}_{bits}.native`).
    pub fn tag(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x64",
            Architecture::Arm64 => "arm64",
            Architecture::X86_32 => "x86",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::X86_64 => "x86-64",
            Architecture::Arm64 => "arm64",
            Architecture::X86_32 => "x86-32",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Module Kind
// ============================================================================

/// What a native module contains, as stored in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ModuleKind {
    /// A virtual-machine core module.
    Vm = 1,
    /// A C runtime support module.
    Libc = 2,
    /// An ordinary user module.
    User = 3,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Vm => "vm",
            ModuleKind::Libc => "libc",
            ModuleKind::User => "user",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Target
// ============================================================================

/// A code-generation target: the architecture plus the layout constants the
/// backends and the executable writer depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub arch: Architecture,
}

impl Target {
    pub const X86_64: Target = Target {
        arch: Architecture::X86_64,
    };
    pub const X86_32: Target = Target {
        arch: Architecture::X86_32,
    };

    /// The target matching the machine this build runs on.
    pub fn host() -> Self {
        #[cfg(target_arch = "x86")]
        {
            Target::X86_32
        }
        #[cfg(not(target_arch = "x86"))]
        {
            Target::X86_64
        }
    }

    pub fn bits(&self) -> u32 {
        self.arch.bits()
    }

    /// Word size in bytes; also the stack slot and argument size.
    pub fn word_size(&self) -> u32 {
        self.arch.word_size()
    }

    /// Virtual base address executables are linked at.
    pub fn base_address(&self) -> u64 {
        match self.arch {
            Architecture::X86_32 => 0x0804_8000,
            _ => 0x40_0000,
        }
    }

    /// Load-segment alignment; also the file offset of the code in an
    /// executable image.
    pub fn page_align(&self) -> u64 {
        0x1000
    }

    /// Accumulator register name in AT&T syntax.
    pub fn accumulator(&self) -> &'static str {
        if self.bits() == 64 { "%rax" } else { "%eax" }
    }

    /// Scratch register name in AT&T syntax.
    pub fn scratch(&self) -> &'static str {
        if self.bits() == 64 { "%rcx" } else { "%ecx" }
    }

    /// Frame-pointer register name in AT&T syntax.
    pub fn frame_pointer(&self) -> &'static str {
        if self.bits() == 64 { "%rbp" } else { "%ebp" }
    }

    /// Stack-pointer register name in AT&T syntax.
    pub fn stack_pointer(&self) -> &'static str {
        if self.bits() == 64 { "%rsp" } else { "%esp" }
    }

    /// File name a module compiled for this target is stored under.
    pub fn native_file_name(&self, stem: &str) -> String {
        format!("{stem}_{}_{}.native", self.arch.tag(), self.bits())
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::host()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.arch)
    }
}
