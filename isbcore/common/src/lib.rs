use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextPosition {
    pub line: u32,
    pub column: u32,
}

impl TextPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    pub fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    /// A zero-width range at the start of the given 0-based line.
    pub fn at_line(line: u32) -> Self {
        let p = TextPosition::new(line, 0);
        Self { start: p, end: p }
    }
}

/// Diagnostic codes for compile-time and runtime failures. The engine never
/// unwinds across its public boundary; everything lands in the bag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ErrorCode {
    /// Input ended mid-statement. The incremental driver treats this as
    /// "needs more lines" rather than a fatal error.
    #[error("Unexpected end of stream.")]
    UnexpectedEndOfStream,
    #[error("Unexpected token.")]
    UnexpectedToken,
    #[error("Unknown opcode.")]
    UnknownOpcode,
    #[error("Duplicate assembly label.")]
    DuplicateAssemblyLabel,
    #[error("Undefined assembly label.")]
    UndefinedAssemblyLabel,
    #[error("Unexpected empty stack.")]
    UnexpectedEmptyStack,
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Unassigned variable.")]
    UnassignedVariable,
    #[error("Unsupported operand.")]
    UnsupportedOperand,
    #[error("Unsupported invocation.")]
    UnsupportedInvocation,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct IsbError {
    pub code: ErrorCode,
    pub range: TextRange,
    pub message: String,
}

impl IsbError {
    pub fn new(code: ErrorCode, range: TextRange, message: impl Into<String>) -> Self {
        Self { code, range, message: message.into() }
    }

    /// Error with the code's canonical message text.
    pub fn of(code: ErrorCode, range: TextRange) -> Self {
        Self { code, range, message: code.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, IsbError>;

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub range: TextRange,
    pub message: String,
}

/// Append-only collection of diagnostics produced by one compile or run.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diags: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, code: ErrorCode, range: TextRange, message: impl Into<String>) {
        self.diags.push(Diagnostic { code, range, message: message.into() });
    }

    pub fn report_err(&mut self, err: IsbError) {
        self.diags.push(Diagnostic { code: err.code, range: err.range, message: err.message });
    }

    pub fn has_error(&self) -> bool {
        !self.diags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    /// True when every diagnostic is `UnexpectedEndOfStream`, i.e. the input
    /// was incomplete rather than wrong.
    pub fn only_end_of_stream(&self) -> bool {
        !self.diags.is_empty()
            && self.diags.iter().all(|d| d.code == ErrorCode::UnexpectedEndOfStream)
    }

    pub fn clear(&mut self) {
        self.diags.clear();
    }

    pub fn absorb(&mut self, other: DiagnosticBag) {
        self.diags.extend(other.diags);
    }
}
