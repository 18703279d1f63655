use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GlmResult<T> = Result<T, GlmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlmErrorCategory {
    InputValidationError,
    IoSystemError,
    InternalError,
}

impl GlmErrorCategory {
    pub const fn exit_placeholder(self) -> ExitPlaceholder {
        match self {
            Self::InputValidationError => ExitPlaceholder {
                exit_code: 2,
                rust_category: "InputValidationError",
            },
            Self::IoSystemError => ExitPlaceholder {
                exit_code: 3,
                rust_category: "IoSystemError",
            },
            Self::InternalError => ExitPlaceholder {
                exit_code: 5,
                rust_category: "InternalError",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_placeholder().exit_code
    }

    pub const fn rust_category(self) -> &'static str {
        self.exit_placeholder().rust_category
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPlaceholder {
    pub exit_code: i32,
    pub rust_category: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlmErrorKind {
    UnknownParameter,
    TypeMismatch,
    MissingBlock,
    CrossField,
    Parse,
    InvalidGeometry,
    InvalidRange,
    LengthMismatch,
    DateOutOfRange,
    InvalidParameter,
    Resolution,
    Io,
    /// A failure inside the toolkit itself rather than in its inputs.
    Internal,
}

impl GlmErrorKind {
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::UnknownParameter => "INPUT.UNKNOWN_PARAMETER",
            Self::TypeMismatch => "INPUT.TYPE_MISMATCH",
            Self::MissingBlock => "INPUT.MISSING_BLOCK",
            Self::CrossField => "INPUT.CROSS_FIELD",
            Self::Parse => "INPUT.PARSE",
            Self::InvalidGeometry => "INPUT.INVALID_GEOMETRY",
            Self::InvalidRange => "INPUT.INVALID_RANGE",
            Self::LengthMismatch => "INPUT.LENGTH_MISMATCH",
            Self::DateOutOfRange => "INPUT.DATE_OUT_OF_RANGE",
            Self::InvalidParameter => "INPUT.INVALID_PARAMETER",
            Self::Resolution => "INPUT.RESOLUTION",
            Self::Io => "IO.SYSTEM",
            Self::Internal => "INTERNAL.UNEXPECTED",
        }
    }

    pub const fn category(self) -> GlmErrorCategory {
        match self {
            Self::Io => GlmErrorCategory::IoSystemError,
            Self::Internal => GlmErrorCategory::InternalError,
            _ => GlmErrorCategory::InputValidationError,
        }
    }
}

impl Display for GlmErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.placeholder())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlmError {
    kind: GlmErrorKind,
    message: String,
}

impl GlmError {
    pub fn new(kind: GlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_parameter(block: &str, name: &str) -> Self {
        Self::new(
            GlmErrorKind::UnknownParameter,
            format!("block '&{}' has no parameter named '{}'", block, name),
        )
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::TypeMismatch, message)
    }

    pub fn missing_block(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::MissingBlock, message)
    }

    pub fn cross_field(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::CrossField, message)
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::new(
            GlmErrorKind::Parse,
            format!("line {}: {}", line, message.into()),
        )
    }

    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::InvalidGeometry, message)
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::InvalidRange, message)
    }

    pub fn length_mismatch(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::LengthMismatch, message)
    }

    pub fn date_out_of_range(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::DateOutOfRange, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::InvalidParameter, message)
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::Resolution, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::Io, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(GlmErrorKind::Internal, message)
    }

    pub const fn kind(&self) -> GlmErrorKind {
        self.kind
    }

    pub const fn category(&self) -> GlmErrorCategory {
        self.kind.category()
    }

    pub const fn placeholder(&self) -> &'static str {
        self.kind.placeholder()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.kind.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder(), self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for GlmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category().rust_category(),
            self.placeholder(),
            self.message
        )
    }
}

impl Error for GlmError {}
