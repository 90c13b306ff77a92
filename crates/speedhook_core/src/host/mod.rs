//! Host collaborator contracts.
//!
//! # Responsibility
//! - Describe the opaque host through capability probes: properties and
//!   methods are resolved by name and absence is a normal `None`.
//! - Define the entry points, scene lookup and polling source the extension
//!   consumes but never implements.
//!
//! # Invariants
//! - The extension never owns host objects; display nodes are held weakly.
//! - Hooks only ever see a read-only view of the host.

pub mod memory;

use crate::config::{Color, TriggerId};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Dynamically typed storage behind one host property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Floats(Vec<f32>),
    UInt(u32),
    Float(f32),
    Bool(bool),
    Text(String),
}

impl PropertyValue {
    /// Human-readable kind used in type mismatch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Floats(_) => "float sequence",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
        }
    }
}

/// Post-execution hook body. Receives the host after the original method
/// returned, never the original call arguments.
pub type PostHook = Rc<dyn Fn(&dyn Reflect)>;

/// Identity of one attached hook, unique per interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookId(pub(crate) u64);

/// Registered post-hook list of one host method.
///
/// Host adapters embed one per hookable method and call
/// [`crate::interceptor::dispatch_post_hooks`] at the end of the method body.
#[derive(Default, Clone)]
pub struct HookPoint {
    hooks: Vec<(HookId, PostHook)>,
}

impl HookPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&mut self, id: HookId, hook: PostHook) {
        self.hooks.push((id, hook));
    }

    /// Removes the hook with `id`; returns whether it was present.
    pub(crate) fn detach(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(candidate, _)| *candidate != id);
        self.hooks.len() != before
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Snapshot of registered hooks in attach order.
    pub fn snapshot(&self) -> Vec<PostHook> {
        self.hooks.iter().map(|(_, hook)| Rc::clone(hook)).collect()
    }
}

impl Debug for HookPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<HookId> = self.hooks.iter().map(|(id, _)| *id).collect();
        f.debug_struct("HookPoint").field("hooks", &ids).finish()
    }
}

/// Capability-probe view of an opaque host object.
pub trait Reflect {
    /// Dynamic type name used in diagnostics and hook bookkeeping.
    fn type_name(&self) -> &str;
    fn resolve_property(&self, name: &str) -> Option<&PropertyValue>;
    fn resolve_property_mut(&mut self, name: &str) -> Option<&mut PropertyValue>;
    fn resolve_method(&self, name: &str) -> Option<&HookPoint>;
    fn resolve_method_mut(&mut self, name: &str) -> Option<&mut HookPoint>;
}

/// Host object that owns the value domain.
pub trait DomainOwner: Reflect {
    fn as_reflect(&self) -> &dyn Reflect;
    fn as_reflect_mut(&mut self) -> &mut dyn Reflect;
    /// Activates the domain value at `index`; `force` applies immediately
    /// instead of deferring to the host's next update.
    fn activate_value_at(&mut self, index: u32, force: bool);
    /// Currently active domain value.
    fn active_value(&self) -> Option<f32>;
}

/// UI text-like node with a mutable color.
pub trait ColorDisplay {
    fn color(&self) -> Color;
    fn set_color(&mut self, color: Color);
}

/// Shared handle to a host-owned display node.
pub type DisplayHandle = Rc<RefCell<dyn ColorDisplay>>;

/// Entry into the running host application.
pub trait HostApplication {
    /// Domain owner, or `None` while the host is still booting.
    fn domain_owner_mut(&mut self) -> Option<&mut dyn DomainOwner>;
    /// Scene lookup by node name.
    fn find_display(&self, name: &str) -> Option<DisplayHandle>;
}

/// Per-tick input polling.
pub trait TriggerSource {
    /// Trigger identifiers newly activated this tick.
    fn poll(&mut self) -> BTreeSet<TriggerId>;
}
