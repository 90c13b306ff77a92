//! Initialization context threaded through the extender and trigger mapper.
//!
//! # Responsibility
//! - Own the gate, the hooked method set and the feedback binding of one
//!   extension instance.
//! - Apply the configured gate reset policy on host session changes.
//!
//! # Invariants
//! - Constructed only from a validated configuration.
//! - A fatal error recorded in `disabled` is never cleared.

use crate::config::{ConfigError, ExtensionConfig, GateResetPolicy};
use crate::error::{ExtensionError, ExtensionResult};
use crate::extender::{self, ExtendOutcome, InitGate};
use crate::feedback::FeedbackBinding;
use crate::host::HostApplication;
use crate::interceptor::{InstalledHook, MethodInterceptor};
use log::info;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Counters for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtensionStats {
    /// Calls to `ensure_extended`, including gated no-ops.
    pub ensure_calls: usize,
    /// Times the merged domain was written to the host.
    pub merge_writes: usize,
    /// Merge attempts postponed because the host was unavailable.
    pub deferred: usize,
    /// Activation requests sent to the host.
    pub activations: usize,
}

/// State of one extension instance.
pub struct ExtensionContext {
    pub(crate) config: Rc<ExtensionConfig>,
    pub(crate) gate: InitGate,
    pub(crate) feedback: Rc<RefCell<Option<FeedbackBinding>>>,
    pub(crate) interceptor: MethodInterceptor,
    pub(crate) installed: Vec<InstalledHook>,
    pub(crate) disabled: Option<ExtensionError>,
    pub(crate) stats: ExtensionStats,
}

impl ExtensionContext {
    pub fn new(config: ExtensionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Rc::new(config),
            gate: InitGate::default(),
            feedback: Rc::new(RefCell::new(None)),
            interceptor: MethodInterceptor::new(),
            installed: Vec::new(),
            disabled: None,
            stats: ExtensionStats::default(),
        })
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    pub fn is_extended(&self) -> bool {
        self.gate.is_set()
    }

    pub fn disabled_reason(&self) -> Option<&ExtensionError> {
        self.disabled.as_ref()
    }

    pub fn stats(&self) -> ExtensionStats {
        self.stats
    }

    pub fn interceptor(&self) -> &MethodInterceptor {
        &self.interceptor
    }

    pub fn installed_hooks(&self) -> &[InstalledHook] {
        &self.installed
    }

    pub fn feedback_binding(&self) -> Option<FeedbackBinding> {
        self.feedback.borrow().clone()
    }

    /// See [`extender::ensure_extended`].
    pub fn ensure_extended(
        &mut self,
        host: &mut dyn HostApplication,
    ) -> ExtensionResult<ExtendOutcome> {
        extender::ensure_extended(self, host)
    }

    /// Handles a host session change (e.g. back to the main menu).
    ///
    /// With [`GateResetPolicy::OnSessionChange`] this detaches the installed
    /// hooks, restores the display's captured color and reopens the gate so
    /// the next trigger merges into the new session. Returns whether a reset
    /// happened.
    pub fn on_session_change(&mut self, host: &mut dyn HostApplication) -> bool {
        if self.config.gate_reset == GateResetPolicy::Never {
            info!("event=session_change module=context status=skip policy=never");
            return false;
        }
        if !self.gate.is_set() {
            return false;
        }

        if let Some(binding) = self.feedback.borrow_mut().take() {
            binding.restore();
        }
        let installed = std::mem::take(&mut self.installed);
        match host.domain_owner_mut() {
            Some(owner) => self.interceptor.uninstall(owner.as_reflect_mut(), &installed),
            None => self.interceptor.forget_all(),
        }
        self.gate.reset();
        info!(
            "event=session_change module=context status=ok hooks_released={}",
            installed.len()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::ExtensionContext;
    use crate::config::{ConfigError, ExtensionConfig};

    #[test]
    fn rejects_invalid_config() {
        let mut config = ExtensionConfig::game_speed();
        config.entries.clear();
        let err = ExtensionContext::new(config)
            .err()
            .expect("empty entries must be rejected");
        assert_eq!(err, ConfigError::EmptyEntries);
    }

    #[test]
    fn fresh_context_is_not_extended() {
        let ctx = ExtensionContext::new(ExtensionConfig::game_speed()).expect("valid config");
        assert!(!ctx.is_extended());
        assert!(ctx.disabled_reason().is_none());
        assert_eq!(ctx.stats().ensure_calls, 0);
        assert!(ctx.feedback_binding().is_none());
    }
}
