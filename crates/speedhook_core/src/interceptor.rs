//! Post-execution method hooks.
//!
//! # Responsibility
//! - Attach one hook body to a batch of named host methods.
//! - Track which methods this interceptor has hooked so a second attempt is
//!   rejected instead of doubling side effects.
//!
//! # Invariants
//! - A batch is all-or-nothing: every method is resolved and checked before
//!   the first hook is attached.
//! - Hooks run after the original method body, in attach order.

use crate::error::{ExtensionError, ExtensionResult};
use crate::host::{HookId, PostHook, Reflect};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Receipt for one attached hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledHook {
    pub method: String,
    pub id: HookId,
}

/// Hooked method set of one extension context.
#[derive(Debug, Default)]
pub struct MethodInterceptor {
    next_id: u64,
    hooked: BTreeMap<String, HookId>,
}

impl MethodInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `hook` as a post-hook on every method in `method_names`.
    ///
    /// # Errors
    /// - `MethodNotFound` when any name does not resolve on `target`.
    /// - `AlreadyHooked` when any method already carries a hook from this
    ///   interceptor.
    ///
    /// Nothing is attached when an error is returned.
    pub fn install_post_hook<I, S>(
        &mut self,
        target: &mut dyn Reflect,
        method_names: I,
        hook: PostHook,
    ) -> ExtensionResult<Vec<InstalledHook>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods: BTreeSet<String> = method_names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect();

        for method in &methods {
            let key = hook_key(target.type_name(), method);
            if self.hooked.contains_key(&key) {
                return Err(ExtensionError::AlreadyHooked(key));
            }
            if target.resolve_method(method).is_none() {
                return Err(ExtensionError::MethodNotFound {
                    type_name: target.type_name().to_string(),
                    method: method.clone(),
                });
            }
        }

        let mut installed = Vec::with_capacity(methods.len());
        for method in methods {
            let key = hook_key(target.type_name(), &method);
            let id = self.allocate_id();
            let Some(point) = target.resolve_method_mut(&method) else {
                self.uninstall(target, &installed);
                return Err(ExtensionError::MethodNotFound {
                    type_name: target.type_name().to_string(),
                    method,
                });
            };
            point.attach(id, Rc::clone(&hook));
            info!("event=hook_install module=interceptor status=ok method={key}");
            self.hooked.insert(key, id);
            installed.push(InstalledHook { method, id });
        }
        Ok(installed)
    }

    /// Detaches previously installed hooks and forgets them.
    pub fn uninstall(&mut self, target: &mut dyn Reflect, installed: &[InstalledHook]) {
        for hook in installed {
            let key = hook_key(target.type_name(), &hook.method);
            let detached = target
                .resolve_method_mut(&hook.method)
                .map(|point| point.detach(hook.id))
                .unwrap_or(false);
            self.hooked.remove(&key);
            debug!("event=hook_uninstall module=interceptor method={key} detached={detached}");
        }
    }

    /// Forgets all bookkeeping without touching any host object.
    ///
    /// Used when the hooked host object itself is gone.
    pub fn forget_all(&mut self) {
        self.hooked.clear();
    }

    pub fn is_hooked(&self, type_name: &str, method: &str) -> bool {
        self.hooked.contains_key(&hook_key(type_name, method))
    }

    pub fn hooked_count(&self) -> usize {
        self.hooked.len()
    }

    fn allocate_id(&mut self) -> HookId {
        self.next_id += 1;
        HookId(self.next_id)
    }
}

/// Runs every post-hook registered on `method`.
///
/// Host adapters call this as the last step of the method body. Returns the
/// number of hooks that ran; unknown methods run none.
pub fn dispatch_post_hooks(host: &dyn Reflect, method: &str) -> usize {
    let hooks = match host.resolve_method(method) {
        Some(point) => point.snapshot(),
        None => return 0,
    };
    for hook in &hooks {
        hook(host);
    }
    hooks.len()
}

fn hook_key(type_name: &str, method: &str) -> String {
    format!("{type_name}::{method}")
}
