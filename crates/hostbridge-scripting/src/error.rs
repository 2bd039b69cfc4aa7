//! Script bridge error types

use rhai::{EvalAltResult, Position};
use std::fmt;

/// Script bridge result type
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Result of a native function called from a script
pub type RhaiResultOf<T> = std::result::Result<T, Box<EvalAltResult>>;

/// Script bridge error
#[derive(Debug)]
pub enum ScriptError {
    /// Script compilation/parsing error
    CompilationError {
        /// Error message
        message: String,
        /// Line number if available
        line: Option<usize>,
        /// Column number if available
        column: Option<usize>,
    },

    /// Script runtime error
    RuntimeError {
        /// Error message
        message: String,
        /// Script line where error occurred
        line: Option<usize>,
    },

    /// Type conversion error
    TypeError {
        /// Error message
        message: String,
    },

    /// Array shape that cannot be injected
    UnsupportedArray {
        /// Error message
        message: String,
    },

    /// Error raised on the host side of a call
    Host(hostbridge_core::Error),

    /// The runtime cache backing a proxy was released
    CacheReleased,
}

impl ScriptError {
    /// Create a compilation error
    pub fn compilation<S: Into<String>>(message: S) -> Self {
        Self::CompilationError {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Create a runtime error
    pub fn runtime<S: Into<String>>(message: S) -> Self {
        Self::RuntimeError {
            message: message.into(),
            line: None,
        }
    }

    /// Create a type error
    pub fn type_error<S: Into<String>>(message: S) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    /// Create an unsupported array error
    pub fn unsupported_array<S: Into<String>>(message: S) -> Self {
        Self::UnsupportedArray {
            message: message.into(),
        }
    }

    /// Convert into an error native functions can return to the engine
    pub fn into_rhai(self) -> Box<EvalAltResult> {
        EvalAltResult::ErrorRuntime(self.to_string().into(), Position::NONE).into()
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompilationError {
                message,
                line,
                column,
            } => {
                write!(f, "Script compilation error: {}", message)?;
                if let Some(line) = line {
                    write!(f, " at line {}", line)?;
                    if let Some(col) = column {
                        write!(f, ", column {}", col)?;
                    }
                }
                Ok(())
            }
            Self::RuntimeError { message, line } => {
                write!(f, "Script runtime error: {}", message)?;
                if let Some(line) = line {
                    write!(f, " at line {}", line)?;
                }
                Ok(())
            }
            Self::TypeError { message } => {
                write!(f, "Script type error: {}", message)
            }
            Self::UnsupportedArray { message } => {
                write!(f, "Unsupported array: {}", message)
            }
            Self::Host(err) => write!(f, "{}", err),
            Self::CacheReleased => write!(f, "Runtime cache has been released"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<hostbridge_core::Error> for ScriptError {
    fn from(err: hostbridge_core::Error) -> Self {
        match err {
            hostbridge_core::Error::UnsupportedArray(message) => Self::UnsupportedArray { message },
            other => Self::Host(other),
        }
    }
}

impl From<Box<EvalAltResult>> for ScriptError {
    fn from(err: Box<EvalAltResult>) -> Self {
        let pos = err.position();
        match *err {
            EvalAltResult::ErrorParsing(ref kind, _) => Self::CompilationError {
                message: kind.to_string(),
                line: pos.line(),
                column: pos.position(),
            },
            _ => Self::RuntimeError {
                message: err.to_string(),
                line: pos.line(),
            },
        }
    }
}

impl From<rhai::ParseError> for ScriptError {
    fn from(err: rhai::ParseError) -> Self {
        let pos = err.position();
        Self::CompilationError {
            message: err.err_type().to_string(),
            line: pos.line(),
            column: pos.position(),
        }
    }
}
