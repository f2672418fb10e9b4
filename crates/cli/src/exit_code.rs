// Consistent exit codes for the quill CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/validation error
//   4  = page, version or thread not found
//   12 = precondition conflict (stale --if-current / --if-version)

use std::process;

use quillwiki_common::anchor::AnchorError;
use quillwiki_common::key::KeyError;
use quillwiki_common::types::ThreadError;
use quillwiki_store::PageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NotFound = 4,
    Conflict = 12,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<NotFound>().is_some() {
                return Self::NotFound;
            }
            if let Some(page_err) = cause.downcast_ref::<PageError>() {
                return match page_err {
                    PageError::PreconditionFailed { .. } => Self::Conflict,
                    err if err.is_invalid_input() => Self::Usage,
                    _ => Self::Error,
                };
            }
            if cause.is::<KeyError>() || cause.is::<AnchorError>() || cause.is::<ThreadError>() {
                return Self::Usage;
            }
        }
        Self::Error
    }

    /// Stable machine-readable code for JSON error output.
    pub fn error_code(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Error => "ERROR",
            Self::Usage => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "PRECONDITION_FAILED",
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// A missing page, version or thread, carried in an `anyhow::Error` chain.
#[derive(Debug)]
pub struct NotFound(pub String);

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found", self.0)
    }
}

impl std::error::Error for NotFound {}
