//! Runtime extension layer for a closed, already-running host.
//!
//! Extends a host-owned value domain with extra values, hooks host setters
//! so a feedback display follows the active value, and maps input triggers
//! onto the extended domain. The host is only ever seen through the
//! capability probes in [`host`].

pub mod accessor;
pub mod config;
pub mod context;
pub mod error;
pub mod extender;
pub mod feedback;
pub mod host;
pub mod interceptor;
pub mod logging;
pub mod trigger;

pub use config::{Color, ConfigError, ExtensionConfig, ExtensionEntry, GateResetPolicy, TriggerId};
pub use context::{ExtensionContext, ExtensionStats};
pub use error::{ExtensionError, ExtensionResult};
pub use extender::{ensure_extended, merge_domain, ExtendOutcome, ExtendReport, InitGate};
pub use feedback::{resolve_feedback_color, FeedbackBinding, FeedbackUpdate};
pub use host::{
    ColorDisplay, DisplayHandle, DomainOwner, HookId, HookPoint, HostApplication, PostHook,
    PropertyValue, Reflect, TriggerSource,
};
pub use interceptor::{dispatch_post_hooks, InstalledHook, MethodInterceptor};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use trigger::{TickReport, TriggerMapper, TriggerOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
