//! Error taxonomy for the runtime extension layer.
//!
//! # Invariants
//! - `HostUnavailable` is the only recoverable kind; the extender swallows it
//!   and retries on a later trigger.
//! - Every other kind means the host is incompatible with the configuration
//!   and disables the extension for the rest of the process.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Failures raised by property access, domain merging and method hooking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// No property with this name exists on the target's dynamic type.
    PropertyNotFound {
        type_name: String,
        property: String,
    },
    /// The property exists but its storage has a different kind.
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The object owning the domain does not exist (yet).
    HostUnavailable(String),
    /// No hookable method with this name exists on the target's dynamic type.
    MethodNotFound { type_name: String, method: String },
    /// The method already carries a hook installed by this layer.
    AlreadyHooked(String),
}

impl ExtensionError {
    /// Returns `true` when a later retry may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::HostUnavailable(_))
    }

    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PropertyNotFound { .. } => "property_not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::HostUnavailable(_) => "host_unavailable",
            Self::MethodNotFound { .. } => "method_not_found",
            Self::AlreadyHooked(_) => "already_hooked",
        }
    }
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PropertyNotFound {
                type_name,
                property,
            } => write!(f, "property `{property}` not found on `{type_name}`"),
            Self::TypeMismatch {
                property,
                expected,
                found,
            } => write!(
                f,
                "property `{property}` has type {found}, expected {expected}"
            ),
            Self::HostUnavailable(what) => write!(f, "host object unavailable: {what}"),
            Self::MethodNotFound { type_name, method } => {
                write!(f, "method `{method}` not found on `{type_name}`")
            }
            Self::AlreadyHooked(method) => write!(f, "method already hooked: {method}"),
        }
    }
}

impl Error for ExtensionError {}
