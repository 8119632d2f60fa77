use core::fmt;

/// Status codes reported by every engine call.
///
/// `Success` is zero; every failure maps to a distinct negative code so it can
/// be surfaced unchanged through a process exit path or a C-style API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
    NoResources,
    NoMemory,
    InvalidParameters,
    InvalidReference,
    InvalidDimension,
    InvalidType,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => -1,
            Self::NoResources => -7,
            Self::NoMemory => -8,
            Self::InvalidParameters => -10,
            Self::InvalidReference => -12,
            Self::InvalidDimension => -15,
            Self::InvalidType => -17,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::NoResources => "no resources",
            Self::NoMemory => "no memory",
            Self::InvalidParameters => "invalid parameters",
            Self::InvalidReference => "invalid reference",
            Self::InvalidDimension => "invalid dimension",
            Self::InvalidType => "invalid type",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// A failed engine call: the status plus what was being attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    status: Status,
    detail: String,
}

impl Error {
    pub fn new(status: Status, detail: impl Into<String>) -> Self {
        debug_assert!(!status.is_success(), "errors carry a failure status");
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.detail, self.status)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
