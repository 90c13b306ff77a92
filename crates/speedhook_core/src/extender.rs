//! Domain extension: merge extension values into the host domain once.
//!
//! # Responsibility
//! - Read the host's native domain, append the configured extension values
//!   and write the merged domain back.
//! - Raise the host's visible bound, hook the host's setters and capture the
//!   feedback display as part of the same one-shot initialization.
//!
//! # Invariants
//! - Native values keep their order and indices; extension values occupy the
//!   trailing indices.
//! - Only the domain property is required. The active index property is
//!   optional and only feeds the post-hook recolor.
//! - Every probe runs before the first write, so a fatal error leaves the
//!   host untouched.
//! - The gate is set only after the merged domain was written.

use crate::accessor;
use crate::config::ExtensionConfig;
use crate::context::ExtensionContext;
use crate::error::{ExtensionError, ExtensionResult};
use crate::feedback::FeedbackBinding;
use crate::host::{HostApplication, PostHook, Reflect};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::Rc;

/// One-shot initialization flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InitGate {
    set: bool,
}

impl InitGate {
    pub fn is_set(self) -> bool {
        self.set
    }

    pub(crate) fn set(&mut self) {
        self.set = true;
    }

    pub(crate) fn reset(&mut self) {
        self.set = false;
    }
}

/// What a successful merge did to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendReport {
    pub native_len: usize,
    pub domain: Vec<f32>,
    /// New visible bound, `None` when the host has no bound property.
    pub visible_bound: Option<u32>,
    pub hooked_methods: Vec<String>,
    pub feedback_captured: bool,
}

/// Result of one `ensure_extended` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtendOutcome {
    Extended(ExtendReport),
    AlreadyExtended,
    /// Host object missing; the gate stays open for a retry.
    Deferred,
    /// An earlier fatal error switched the extension off.
    Disabled,
}

impl ExtendOutcome {
    /// `true` when the extended domain is in place.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Extended(_) | Self::AlreadyExtended)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extended(_) => "extended",
            Self::AlreadyExtended => "already_extended",
            Self::Deferred => "deferred",
            Self::Disabled => "disabled",
        }
    }
}

/// Union of `native` and `extension`, first occurrence wins.
///
/// Native order is kept and extension values are appended in their own
/// order, skipping values already present. With extension values above
/// every native value the result is ascending.
///
/// Assumes `native` holds no duplicate values: repeated native values are
/// collapsed too, which would shift later native indices.
pub fn merge_domain(native: &[f32], extension: &[f32]) -> Vec<f32> {
    let mut merged: Vec<f32> = Vec::with_capacity(native.len() + extension.len());
    for &value in native.iter().chain(extension) {
        if !merged.contains(&value) {
            merged.push(value);
        }
    }
    merged
}

/// Extends the host domain unless already done.
///
/// `HostUnavailable` is swallowed into [`ExtendOutcome::Deferred`]. Any other
/// error disables `ctx` and is returned once; later calls report
/// [`ExtendOutcome::Disabled`].
pub fn ensure_extended(
    ctx: &mut ExtensionContext,
    host: &mut dyn HostApplication,
) -> ExtensionResult<ExtendOutcome> {
    ctx.stats.ensure_calls += 1;
    if ctx.gate.is_set() {
        return Ok(ExtendOutcome::AlreadyExtended);
    }
    if ctx.disabled.is_some() {
        return Ok(ExtendOutcome::Disabled);
    }

    match extend(ctx, host) {
        Ok(report) => {
            ctx.gate.set();
            Ok(ExtendOutcome::Extended(report))
        }
        Err(err) if err.is_recoverable() => {
            ctx.stats.deferred += 1;
            info!(
                "event=domain_extend module=extender status=deferred code={} reason={err}",
                err.code()
            );
            Ok(ExtendOutcome::Deferred)
        }
        Err(err) => {
            error!(
                "event=domain_extend module=extender status=error code={} reason={err}",
                err.code()
            );
            ctx.disabled = Some(err.clone());
            Err(err)
        }
    }
}

fn extend(
    ctx: &mut ExtensionContext,
    host: &mut dyn HostApplication,
) -> ExtensionResult<ExtendReport> {
    info!("event=domain_extend module=extender status=start");
    let config = Rc::clone(&ctx.config);

    let owner = host.domain_owner_mut().ok_or_else(|| {
        ExtensionError::HostUnavailable(format!("owner of `{}`", config.domain_property))
    })?;

    let native = accessor::get_floats(owner.as_reflect(), &config.domain_property)?;
    if !accessor::probe_uint(owner.as_reflect(), &config.active_index_property)? {
        info!(
            "event=active_index module=extender status=skip property={} reason=hook_recolor_off",
            config.active_index_property
        );
    }
    let has_bound = accessor::probe_uint(owner.as_reflect(), &config.bound_property)?;
    let merged = merge_domain(&native, &config.extension_values());

    let hook = feedback_hook(Rc::clone(&config), Rc::clone(&ctx.feedback));
    let installed =
        ctx.interceptor
            .install_post_hook(owner.as_reflect_mut(), &config.hooked_methods, hook)?;

    if let Err(err) =
        accessor::set_floats(owner.as_reflect_mut(), &config.domain_property, merged.clone())
    {
        ctx.interceptor.uninstall(owner.as_reflect_mut(), &installed);
        return Err(err);
    }
    ctx.stats.merge_writes += 1;
    info!(
        "event=domain_extend module=extender status=ok native_len={} values={}",
        native.len(),
        format_values(&merged)
    );

    let visible_bound = if has_bound {
        let bound = u32::try_from(merged.len().saturating_sub(1)).unwrap_or(u32::MAX);
        accessor::set_uint(owner.as_reflect_mut(), &config.bound_property, bound)?;
        Some(bound)
    } else {
        info!(
            "event=visible_bound module=extender status=skip property={}",
            config.bound_property
        );
        None
    };

    let binding = FeedbackBinding::capture(&*host, &config.feedback_display);
    let feedback_captured = binding.is_some();
    *ctx.feedback.borrow_mut() = binding;

    let hooked_methods = installed.iter().map(|hook| hook.method.clone()).collect();
    ctx.installed = installed;

    Ok(ExtendReport {
        native_len: native.len(),
        domain: merged,
        visible_bound,
        hooked_methods,
        feedback_captured,
    })
}

/// Hook body attached to the host setters: recolor from current host state.
fn feedback_hook(
    config: Rc<ExtensionConfig>,
    feedback: Rc<RefCell<Option<FeedbackBinding>>>,
) -> PostHook {
    Rc::new(move |host: &dyn Reflect| {
        let Some(binding) = feedback.borrow().clone() else {
            return;
        };
        match active_value(host, &config) {
            Ok(Some(value)) => {
                binding.apply(value, &config);
            }
            Ok(None) => debug!("event=feedback_hook module=extender status=skip reason=no_active_value"),
            Err(err) => warn!(
                "event=feedback_hook module=extender status=error code={} reason={err}",
                err.code()
            ),
        }
    })
}

/// `domain[activeIndex]`, `None` when the host exposes no index property or
/// the index lies outside the domain.
fn active_value(host: &dyn Reflect, config: &ExtensionConfig) -> ExtensionResult<Option<f32>> {
    if !accessor::probe_uint(host, &config.active_index_property)? {
        return Ok(None);
    }
    let values = accessor::get_floats(host, &config.domain_property)?;
    let index = accessor::get_uint(host, &config.active_index_property)?;
    Ok(usize::try_from(index)
        .ok()
        .and_then(|index| values.get(index).copied()))
}

fn format_values(values: &[f32]) -> String {
    values
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::{merge_domain, InitGate};
    use proptest::prelude::*;

    fn to_values(raw: impl IntoIterator<Item = u16>) -> Vec<f32> {
        raw.into_iter().map(f32::from).collect()
    }

    #[test]
    fn appends_extension_after_native_prefix() {
        let native = [0.0, 1.0, 2.0, 3.0];
        let merged = merge_domain(&native, &[5.0, 10.0, 15.0]);
        assert_eq!(merged, vec![0.0, 1.0, 2.0, 3.0, 5.0, 10.0, 15.0]);
        assert_eq!(&merged[..native.len()], &native);
    }

    #[test]
    fn shared_values_are_not_duplicated() {
        let merged = merge_domain(&[1.0, 2.0, 5.0, 10.0], &[5.0, 10.0, 15.0]);
        assert_eq!(merged, vec![1.0, 2.0, 5.0, 10.0, 15.0]);
    }

    #[test]
    fn merging_twice_is_stable() {
        let once = merge_domain(&[1.0, 2.0], &[5.0, 10.0]);
        let twice = merge_domain(&once, &[5.0, 10.0]);
        assert_eq!(once, twice);
    }

    #[test]
    fn repeated_native_values_collapse() {
        let merged = merge_domain(&[0.0, 1.0, 1.0, 3.0], &[5.0, 10.0]);
        assert_eq!(merged, vec![0.0, 1.0, 3.0, 5.0, 10.0]);
    }

    #[test]
    fn empty_native_domain_yields_extension() {
        assert_eq!(merge_domain(&[], &[5.0, 10.0]), vec![5.0, 10.0]);
    }

    #[test]
    fn gate_starts_unset() {
        let mut gate = InitGate::default();
        assert!(!gate.is_set());
        gate.set();
        assert!(gate.is_set());
        gate.reset();
        assert!(!gate.is_set());
    }

    proptest! {
        #[test]
        fn extension_above_native_keeps_prefix_and_order(
            native in prop::collection::btree_set(0u16..1000, 0..8),
            offsets in prop::collection::btree_set(1u16..1000, 1..8),
        ) {
            let native = to_values(native);
            let base = native.last().copied().unwrap_or(0.0);
            let extension: Vec<f32> = to_values(offsets)
                .into_iter()
                .map(|offset| base + offset)
                .collect();

            let merged = merge_domain(&native, &extension);
            prop_assert_eq!(merged.len(), native.len() + extension.len());
            prop_assert_eq!(&merged[..native.len()], native.as_slice());
            prop_assert!(merged.windows(2).all(|pair| pair[0] < pair[1]));
        }

        #[test]
        fn shared_value_is_kept_once(
            native in prop::collection::btree_set(0u16..1000, 1..8),
            pick in any::<prop::sample::Index>(),
            offsets in prop::collection::btree_set(1u16..1000, 0..8),
        ) {
            let native = to_values(native);
            let shared = native[pick.index(native.len())];
            let base = native[native.len() - 1];
            let mut extension = vec![shared];
            extension.extend(to_values(offsets).into_iter().map(|offset| base + offset));

            let merged = merge_domain(&native, &extension);
            prop_assert_eq!(merged.len(), native.len() + extension.len() - 1);
            prop_assert_eq!(&merged[..native.len()], native.as_slice());
            let mut distinct = merged.clone();
            distinct.sort_by(f32::total_cmp);
            distinct.dedup();
            prop_assert_eq!(distinct.len(), merged.len());
        }
    }
}
