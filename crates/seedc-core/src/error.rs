//! Unified error types for the seedc toolchain.
//!
//! One enum per phase, composed under a single top-level wrapper:
//!
//! ```text
//! SeedcError (top-level wrapper)
//! ├── ParseError     - syntax errors (with ParseErrorKind)
//! ├── CodegenError   - lowering/code-generation errors
//! ├── ContainerError - on-disk container format errors
//! ├── VmError        - bytecode execution errors
//! ├── ModuleError    - module loading and linkage errors
//! └── Io             - file-system errors from artifact I/O
//! ```
//!
//! Phase errors are plain data (`Clone`, `PartialEq`) so tests can assert on
//! them; anything carrying an `std::io::Error` enters the hierarchy at the
//! top level only. Lexing has no error type at all: tokenization is total
//! and malformed input surfaces later as a parse error.

use thiserror::Error;

use crate::span::Span;

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A specific token was expected but not found.
    ExpectedToken,
    /// An unexpected token was encountered.
    UnexpectedToken,
    /// Unexpected end of input.
    UnexpectedEof,
    /// An expression was expected.
    ExpectedExpression,
    /// A type name was expected.
    ExpectedType,
    /// A statement was expected.
    ExpectedStatement,
    /// A declaration was expected.
    ExpectedDeclaration,
    /// An identifier was expected.
    ExpectedIdentifier,
    /// A literal could not be used here.
    InvalidLiteral,
    /// `break` or `continue` outside of a loop.
    OutsideLoop,
    /// General syntax error.
    InvalidSyntax,
}

impl ParseErrorKind {
    /// Human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of input",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedStatement => "expected statement",
            ParseErrorKind::ExpectedDeclaration => "expected declaration",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::InvalidLiteral => "invalid literal",
            ParseErrorKind::OutsideLoop => "outside loop",
            ParseErrorKind::InvalidSyntax => "invalid syntax",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parse error with location and context.
///
/// Parsing aborts the translation unit on the first unrecoverable mismatch;
/// the error names the expected construct and the offending position, and no
/// partial AST is handed back.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct ParseError {
    /// The category of this error.
    pub kind: ParseErrorKind,
    /// Where the error occurred.
    pub span: Span,
    /// A detailed message.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// A specific token was expected but something else was found.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    /// An unexpected token was encountered.
    pub fn unexpected_token(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedToken,
            span,
            format!("unexpected {found}"),
        )
    }

    /// The token stream ended before the construct was complete.
    pub fn unexpected_eof(span: Span, while_parsing: &str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedEof,
            span,
            format!("input ended while parsing {while_parsing}"),
        )
    }

    /// An expression was expected.
    pub fn expected_expression(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedExpression,
            span,
            format!("expected expression, found {found}"),
        )
    }

    /// A type name was expected.
    pub fn expected_type(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedType,
            span,
            format!("expected type name, found {found}"),
        )
    }

    /// An identifier was expected.
    pub fn expected_identifier(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedIdentifier,
            span,
            format!("expected identifier, found {found}"),
        )
    }

    /// The span where this error occurred.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Render this error with the offending source line and a caret
    /// underlining the span.
    pub fn display_with_source(&self, source: &str) -> String {
        display_with_source(&self.to_string(), self.span, source)
    }
}

// ============================================================================
// Code Generation Errors
// ============================================================================

/// Errors raised while lowering an AST to bytecode or machine code.
///
/// Each variant names the construct or limit that stopped generation; the
/// artifact being generated is abandoned, nothing partial is emitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// The backend has no lowering for this construct.
    #[error("unsupported construct at {span}: {construct}")]
    UnsupportedConstruct { construct: String, span: Span },

    /// A name was used that no declaration binds.
    #[error("undefined variable '{name}' at {span}")]
    UndefinedVariable { name: String, span: Span },

    /// A variable declared twice in the same scope.
    #[error("variable '{name}' redeclared at {span}")]
    RedeclaredVariable { name: String, span: Span },

    /// A call names a function with no definition in the unit.
    #[error("undefined function '{name}' at {span}")]
    UndefinedFunction { name: String, span: Span },

    /// A function declared more than once with a body.
    #[error("function '{name}' redefined at {span}")]
    RedefinedFunction { name: String, span: Span },

    /// A call whose argument count disagrees with the declaration.
    #[error("call to '{name}' at {span} passes {found} arguments, declared with {expected}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    /// The register-slot allocator ran out of slots.
    #[error("function '{name}' uses more than {limit} locals")]
    TooManyLocals { name: String, limit: usize },

    /// The program has no `main` to use as an entry point.
    #[error("program has no 'main' function")]
    MissingMain,

    /// A relative jump or call distance exceeded the encodable range.
    #[error("jump distance out of range in function '{name}'")]
    JumpTooFar { name: String },

    /// No backend exists for the requested architecture.
    #[error("no code generator for {target}")]
    UnsupportedTarget { target: String },
}

impl CodegenError {
    /// The span where this error occurred, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CodegenError::UnsupportedConstruct { span, .. }
            | CodegenError::UndefinedVariable { span, .. }
            | CodegenError::RedeclaredVariable { span, .. }
            | CodegenError::UndefinedFunction { span, .. }
            | CodegenError::RedefinedFunction { span, .. }
            | CodegenError::ArityMismatch { span, .. } => Some(*span),
            CodegenError::TooManyLocals { .. }
            | CodegenError::MissingMain
            | CodegenError::JumpTooFar { .. }
            | CodegenError::UnsupportedTarget { .. } => None,
        }
    }
}

// ============================================================================
// Container Format Errors
// ============================================================================

/// Errors raised while encoding or decoding an on-disk container.
///
/// Readers reject a container before any of its payload is used; writers
/// reject invalid inputs before any byte is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// The magic tag did not match the expected format.
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    /// The format version is not supported.
    #[error("unsupported container version {found}")]
    BadVersion { found: u32 },

    /// The declared header size does not match the format.
    #[error("unexpected header size {found}")]
    BadHeaderSize { found: u32 },

    /// The buffer ended before a declared structure.
    #[error("truncated container: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    /// A declared length or offset points outside the physical buffer.
    #[error("{what} out of bounds: {value} exceeds {limit}")]
    OutOfBounds {
        what: &'static str,
        value: u64,
        limit: u64,
    },

    /// The architecture field holds an unknown value.
    #[error("unknown architecture tag {0}")]
    BadArchitecture(u32),

    /// The module-kind field holds an unknown value.
    #[error("unknown module kind {0}")]
    BadModuleKind(u32),

    /// An export entry's type field holds an unknown value.
    #[error("unknown export type {0}")]
    BadExportType(u32),

    /// An export name is missing its NUL terminator.
    #[error("export name at index {index} is not NUL-terminated")]
    UnterminatedName { index: usize },

    /// An export name holds non-UTF-8 bytes.
    #[error("export name at index {index} is not valid UTF-8")]
    InvalidName { index: usize },

    /// Embedded program source holds non-UTF-8 bytes.
    #[error("embedded source is not valid UTF-8")]
    InvalidSource,

    /// An export name exceeds the fixed name field.
    #[error("export name '{name}' exceeds {limit} bytes")]
    NameTooLong { name: String, limit: usize },

    /// Two exports share one name; lookups would be ambiguous.
    #[error("duplicate export name '{name}'")]
    DuplicateExport { name: String },

    /// More exports than the format allows.
    #[error("{count} exports exceed the limit of {limit}")]
    TooManyExports { count: usize, limit: usize },

    /// A code buffer must not be empty.
    #[error("refusing to package an empty code buffer")]
    EmptyCode,

    /// A code buffer exceeded the sanity maximum.
    #[error("code size {size} exceeds the maximum of {max}")]
    CodeTooLarge { size: u64, max: u64 },

    /// The entry offset points outside the instruction stream.
    #[error("entry offset {entry} is outside the {len}-byte payload")]
    EntryOutOfBounds { entry: u32, len: u64 },

    /// The stored checksum does not match the payload.
    #[error("checksum mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    /// The bytes are a recognized container, but not an executable program.
    #[error("artifact with magic {magic:?} is not a runnable program")]
    NotAProgram { magic: [u8; 4] },
}

// ============================================================================
// VM Errors
// ============================================================================

/// Errors that move the bytecode VM into its error state.
///
/// A VM error halts execution and is retained (code and message) on the
/// machine; it never escapes as a process-level fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// No program has been loaded.
    #[error("no program loaded")]
    NoProgram,

    /// The byte at the program counter is not a known opcode.
    #[error("invalid opcode {opcode:#04x} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },

    /// The instruction stream ended inside an operand.
    #[error("truncated instruction at offset {offset}")]
    TruncatedInstruction { offset: usize },

    /// A jump or call target is outside the program.
    #[error("jump target {target} is outside the {len}-byte program")]
    JumpOutOfBounds { target: u32, len: usize },

    /// An operand named a register the machine does not have.
    #[error("invalid register r{index}")]
    InvalidRegister { index: u8 },

    /// The value stack is full.
    #[error("value stack overflow (capacity {capacity})")]
    StackOverflow { capacity: usize },

    /// A pop was issued on an empty value stack.
    #[error("value stack underflow")]
    StackUnderflow,

    /// The call stack is full.
    #[error("call depth exceeded (capacity {capacity})")]
    CallDepthExceeded { capacity: usize },

    /// A return was issued with no call frame to return to.
    #[error("return without a matching call")]
    CallStackUnderflow,

    /// Integer division or remainder by zero at run time.
    #[error("division by zero at offset {offset}")]
    DivideByZero { offset: usize },

    /// A heap handle that was never allocated or already freed.
    #[error("invalid heap handle {handle}")]
    InvalidHandle { handle: i64 },

    /// An allocation size outside the configured limit.
    #[error("allocation of {size} bytes exceeds the limit of {limit}")]
    AllocTooLarge { size: i64, limit: usize },

    /// An unknown syscall number.
    #[error("unknown syscall {number}")]
    UnknownSyscall { number: u8 },
}

impl VmError {
    /// Stable numeric code for this error, exposed alongside the message.
    pub fn code(&self) -> u32 {
        match self {
            VmError::NoProgram => 1,
            VmError::InvalidOpcode { .. } => 2,
            VmError::TruncatedInstruction { .. } => 3,
            VmError::JumpOutOfBounds { .. } => 4,
            VmError::InvalidRegister { .. } => 5,
            VmError::StackOverflow { .. } => 6,
            VmError::StackUnderflow => 7,
            VmError::CallDepthExceeded { .. } => 8,
            VmError::CallStackUnderflow => 9,
            VmError::DivideByZero { .. } => 10,
            VmError::InvalidHandle { .. } => 11,
            VmError::AllocTooLarge { .. } => 12,
            VmError::UnknownSyscall { .. } => 13,
        }
    }
}

// ============================================================================
// Module System Errors
// ============================================================================

/// Errors from module loading and linkage.
///
/// A missing provider or missing symbol during import resolution is *not*
/// an error; partial linkage is observable and reported per import through
/// diagnostics. These variants cover the failures that abort an operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModuleError {
    /// No module with this name is loaded.
    #[error("module '{name}' is not loaded")]
    NotFound { name: String },

    /// The module file could not be located in the search roots.
    #[error("no file for module '{name}' (searched {searched})")]
    FileNotFound { name: String, searched: String },

    /// The backing file could not be read.
    #[error("failed to read '{path}': {detail}")]
    ReadFailed { path: String, detail: String },

    /// The container failed validation; nothing was added to the table.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A stale handle referenced a slot that has been released.
    #[error("module handle {id} is no longer valid")]
    StaleHandle { id: u32 },

    /// The declared dependencies form a cycle.
    #[error("circular dependency involving module '{name}'")]
    CircularDependency { name: String },
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Any error the toolchain can produce, for callers that drive the whole
/// pipeline and want one type to match on.
#[derive(Debug, Error)]
pub enum SeedcError {
    /// Syntax error from the parser.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Lowering / code-generation error.
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    /// Container encode/decode error.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Bytecode execution error.
    #[error(transparent)]
    Vm(#[from] VmError),

    /// Module loading or linkage error.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// File-system error while reading sources or writing artifacts.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Map an error to the small process exit code the CLI collaborator expects.
///
/// 0 is success; the distinct positive codes are: 1 file-not-found,
/// 2 invalid format, 3 parse failure, 4 code-generation failure,
/// 5 link failure, 6 runtime failure.
pub fn exit_code(err: &SeedcError) -> i32 {
    match err {
        SeedcError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => 1,
        SeedcError::Io(_) => 2,
        SeedcError::Container(_) => 2,
        SeedcError::Parse(_) => 3,
        SeedcError::Codegen(_) => 4,
        SeedcError::Module(ModuleError::FileNotFound { .. }) => 1,
        SeedcError::Module(_) => 5,
        SeedcError::Vm(_) => 6,
    }
}

/// Render a message above the offending source line with a caret underline.
fn display_with_source(message: &str, span: Span, source: &str) -> String {
    let mut out = String::new();
    out.push_str(message);
    if span.line == 0 {
        return out;
    }
    let Some(line) = source.lines().nth(span.line as usize - 1) else {
        return out;
    };
    out.push('\n');
    out.push_str(line);
    out.push('\n');
    for _ in 1..span.col {
        out.push(' ');
    }
    let width = (span.len.max(1)) as usize;
    for _ in 0..width {
        out.push('^');
    }
    out
}
