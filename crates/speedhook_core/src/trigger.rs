//! Per-tick trigger mapping.
//!
//! # Responsibility
//! - Map newly activated trigger identifiers to extended domain indices.
//! - Lazily extend the domain on the first matching trigger, then ask the
//!   host to activate the computed index and refresh the feedback color.
//!
//! # Invariants
//! - Trigger `i` always targets `i + native_domain_len`; the native length is
//!   a configured constant, never re-read from the (possibly extended) host.
//! - Host state is only changed through the host's activation entry point.
//! - No state is kept across ticks besides what lives in the context.

use crate::accessor;
use crate::config::TriggerId;
use crate::context::ExtensionContext;
use crate::extender::ensure_extended;
use crate::feedback::FeedbackUpdate;
use crate::host::{HostApplication, TriggerSource};
use log::{info, warn};
use std::collections::BTreeSet;
use std::rc::Rc;

/// What happened to one matched trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    Activated {
        trigger: TriggerId,
        index: u32,
        requested: f32,
        active: Option<f32>,
        feedback: Option<FeedbackUpdate>,
    },
    /// Extension not in place (deferred, disabled or failed).
    NotReady {
        trigger: TriggerId,
        reason: &'static str,
    },
    /// Computed index lies outside the host domain.
    OutOfRange {
        trigger: TriggerId,
        index: usize,
        domain_len: usize,
    },
}

/// Outcomes of one tick, in configured trigger order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub outcomes: Vec<TriggerOutcome>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn activated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TriggerOutcome::Activated { .. }))
            .count()
    }
}

/// Stateless mapper from trigger identifiers to domain activations.
#[derive(Debug, Default, Clone, Copy)]
pub struct TriggerMapper;

impl TriggerMapper {
    pub fn new() -> Self {
        Self
    }

    /// Domain index targeted by trigger slot `slot`.
    pub fn domain_index(ctx: &ExtensionContext, slot: usize) -> usize {
        slot + ctx.config().native_domain_len
    }

    /// Polls `source` once and maps the result.
    pub fn poll(
        &self,
        ctx: &mut ExtensionContext,
        host: &mut dyn HostApplication,
        source: &mut dyn TriggerSource,
    ) -> TickReport {
        let triggers = source.poll();
        self.on_tick(ctx, host, &triggers)
    }

    /// Handles the triggers newly activated this tick.
    pub fn on_tick(
        &self,
        ctx: &mut ExtensionContext,
        host: &mut dyn HostApplication,
        triggers: &BTreeSet<TriggerId>,
    ) -> TickReport {
        let mut report = TickReport::default();
        if triggers.is_empty() {
            return report;
        }

        let config = Rc::clone(&ctx.config);
        for (slot, trigger) in config.triggers.iter().enumerate() {
            if triggers.contains(trigger) {
                let outcome = self.handle(ctx, host, slot, trigger);
                report.outcomes.push(outcome);
            }
        }
        report
    }

    fn handle(
        &self,
        ctx: &mut ExtensionContext,
        host: &mut dyn HostApplication,
        slot: usize,
        trigger: &TriggerId,
    ) -> TriggerOutcome {
        match ensure_extended(ctx, host) {
            Ok(outcome) if outcome.is_ready() => {}
            Ok(outcome) => {
                return TriggerOutcome::NotReady {
                    trigger: trigger.clone(),
                    reason: outcome.as_str(),
                };
            }
            Err(err) => {
                return TriggerOutcome::NotReady {
                    trigger: trigger.clone(),
                    reason: err.code(),
                };
            }
        }

        let index = Self::domain_index(ctx, slot);
        let config = Rc::clone(&ctx.config);
        let Some(owner) = host.domain_owner_mut() else {
            warn!("event=trigger module=trigger status=skip trigger={trigger} reason=host_unavailable");
            return TriggerOutcome::NotReady {
                trigger: trigger.clone(),
                reason: "host_unavailable",
            };
        };

        let domain = match accessor::get_floats(owner.as_reflect(), &config.domain_property) {
            Ok(domain) => domain,
            Err(err) => {
                warn!(
                    "event=trigger module=trigger status=error trigger={trigger} code={} reason={err}",
                    err.code()
                );
                return TriggerOutcome::NotReady {
                    trigger: trigger.clone(),
                    reason: err.code(),
                };
            }
        };
        let (Some(&requested), Ok(host_index)) = (domain.get(index), u32::try_from(index)) else {
            warn!(
                "event=trigger module=trigger status=skip trigger={trigger} index={index} domain_len={}",
                domain.len()
            );
            return TriggerOutcome::OutOfRange {
                trigger: trigger.clone(),
                index,
                domain_len: domain.len(),
            };
        };

        info!("event=trigger module=trigger trigger={trigger} index={index} value={requested}");
        owner.activate_value_at(host_index, config.force_apply);
        ctx.stats.activations += 1;
        let active = owner.active_value();
        info!("event=trigger module=trigger status=ok active_value={active:?}");

        let feedback = match (active, ctx.feedback_binding()) {
            (Some(value), Some(binding)) => Some(binding.apply(value, &config)),
            _ => None,
        };

        TriggerOutcome::Activated {
            trigger: trigger.clone(),
            index: host_index,
            requested,
            active,
            feedback,
        }
    }
}
