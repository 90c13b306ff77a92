//! In-memory reflective host.
//!
//! Models the pieces of a running game the extension talks to: a time
//! manager with a speed table and hookable speed setters, a scene with a
//! speed label, and a scripted input source. Used by the CLI driver and by
//! tests.

use crate::config::{Color, TriggerId};
use crate::host::{
    ColorDisplay, DisplayHandle, DomainOwner, HookPoint, HostApplication, PropertyValue, Reflect,
    TriggerSource,
};
use crate::interceptor::dispatch_post_hooks;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

pub const TIME_SCALES: &str = "timeScales";
pub const TIME_SCALE_INDEX: &str = "timeScaleIndex";
pub const HIGHEST_VISIBLE_INDEX: &str = "highestVisibleTimeScaleIndex";
pub const SET_TIME_SCALE: &str = "SetTimeScale";
pub const INCREASE_TIME_SCALE: &str = "IncreaseTimeScale";
pub const DECREASE_TIME_SCALE: &str = "DecreaseTimeScale";

/// Bag of named properties and hook points.
#[derive(Debug, Clone)]
pub struct MemoryObject {
    type_name: String,
    properties: BTreeMap<String, PropertyValue>,
    methods: BTreeMap<String, HookPoint>,
    writes: BTreeMap<String, usize>,
}

impl MemoryObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: BTreeMap::new(),
            methods: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_method(mut self, name: impl Into<String>) -> Self {
        self.methods.insert(name.into(), HookPoint::new());
        self
    }

    /// Number of times `name` was resolved for writing.
    pub fn write_count(&self, name: &str) -> usize {
        self.writes.get(name).copied().unwrap_or(0)
    }

    /// Direct read that bypasses write accounting.
    pub fn peek(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn hook_count(&self, method: &str) -> usize {
        self.methods.get(method).map(HookPoint::len).unwrap_or(0)
    }
}

impl Reflect for MemoryObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn resolve_property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    fn resolve_property_mut(&mut self, name: &str) -> Option<&mut PropertyValue> {
        let slot = self.properties.get_mut(name)?;
        *self.writes.entry(name.to_string()).or_default() += 1;
        Some(slot)
    }

    fn resolve_method(&self, name: &str) -> Option<&HookPoint> {
        self.methods.get(name)
    }

    fn resolve_method_mut(&mut self, name: &str) -> Option<&mut HookPoint> {
        self.methods.get_mut(name)
    }
}

/// Simulated time manager owning the speed table.
///
/// Activation requests beyond the visible bound or the table are ignored,
/// the way a host guards its own selector. Without a `timeScaleIndex`
/// property the active index lives in an unreflected field.
#[derive(Debug, Clone)]
pub struct SimulatedTimeManager {
    object: MemoryObject,
    hidden_index: u32,
}

impl SimulatedTimeManager {
    /// Time manager with `scales`, the first `visible` of them selectable.
    pub fn new(scales: Vec<f32>, visible: u32) -> Self {
        let object = MemoryObject::new("TimeManager")
            .with_property(TIME_SCALES, PropertyValue::Floats(scales))
            .with_property(TIME_SCALE_INDEX, PropertyValue::UInt(1))
            .with_property(
                HIGHEST_VISIBLE_INDEX,
                PropertyValue::UInt(visible.saturating_sub(1)),
            )
            .with_method(SET_TIME_SCALE)
            .with_method(INCREASE_TIME_SCALE)
            .with_method(DECREASE_TIME_SCALE);
        Self::from_object(object)
    }

    /// Stock table: paused, 1x, 2x, 3x.
    pub fn stock() -> Self {
        Self::new(vec![0.0, 1.0, 2.0, 3.0], 4)
    }

    /// Wraps an arbitrary object, e.g. one missing members.
    pub fn from_object(object: MemoryObject) -> Self {
        Self {
            object,
            hidden_index: 1,
        }
    }

    pub fn object(&self) -> &MemoryObject {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut MemoryObject {
        &mut self.object
    }

    pub fn scales(&self) -> Vec<f32> {
        match self.object.peek(TIME_SCALES) {
            Some(PropertyValue::Floats(values)) => values.clone(),
            _ => Vec::new(),
        }
    }

    pub fn active_index(&self) -> u32 {
        self.uint(TIME_SCALE_INDEX).unwrap_or(self.hidden_index)
    }

    fn uint(&self, name: &str) -> Option<u32> {
        match self.object.peek(name) {
            Some(PropertyValue::UInt(value)) => Some(*value),
            _ => None,
        }
    }

    fn selectable_limit(&self) -> Option<u32> {
        let len = u32::try_from(self.scales().len()).ok()?;
        let last = len.checked_sub(1)?;
        Some(match self.uint(HIGHEST_VISIBLE_INDEX) {
            Some(bound) => bound.min(last),
            None => last,
        })
    }

    fn store_index(&mut self, index: u32) {
        match self.object.properties.get_mut(TIME_SCALE_INDEX) {
            Some(PropertyValue::UInt(slot)) => *slot = index,
            _ => self.hidden_index = index,
        }
    }

    /// Host speed-up button.
    pub fn increase(&mut self) {
        if let Some(limit) = self.selectable_limit() {
            let next = self.active_index().saturating_add(1).min(limit);
            self.store_index(next);
        }
        dispatch_post_hooks(&self.object, INCREASE_TIME_SCALE);
    }

    /// Host slow-down button.
    pub fn decrease(&mut self) {
        let next = self.active_index().saturating_sub(1);
        self.store_index(next);
        dispatch_post_hooks(&self.object, DECREASE_TIME_SCALE);
    }
}

impl Reflect for SimulatedTimeManager {
    fn type_name(&self) -> &str {
        self.object.type_name()
    }

    fn resolve_property(&self, name: &str) -> Option<&PropertyValue> {
        self.object.resolve_property(name)
    }

    fn resolve_property_mut(&mut self, name: &str) -> Option<&mut PropertyValue> {
        self.object.resolve_property_mut(name)
    }

    fn resolve_method(&self, name: &str) -> Option<&HookPoint> {
        self.object.resolve_method(name)
    }

    fn resolve_method_mut(&mut self, name: &str) -> Option<&mut HookPoint> {
        self.object.resolve_method_mut(name)
    }
}

impl DomainOwner for SimulatedTimeManager {
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn activate_value_at(&mut self, index: u32, force: bool) {
        match self.selectable_limit() {
            Some(limit) if index <= limit => {
                self.store_index(index);
                debug!("event=host_set_time_scale module=host index={index} force={force}");
            }
            _ => warn!(
                "event=host_set_time_scale module=host status=skip index={index} reason=out_of_range"
            ),
        }
        dispatch_post_hooks(&self.object, SET_TIME_SCALE);
    }

    fn active_value(&self) -> Option<f32> {
        let index = usize::try_from(self.active_index()).ok()?;
        self.scales().get(index).copied()
    }
}

/// Text label with a mutable color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
    pub color: Color,
}

impl TextNode {
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

impl ColorDisplay for TextNode {
    fn color(&self) -> Color {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}

/// Running game: an optional time manager plus a scene of labels.
#[derive(Default)]
pub struct SimulatedGame {
    time_manager: Option<SimulatedTimeManager>,
    scene: BTreeMap<String, Rc<RefCell<TextNode>>>,
    owner_lookups: Cell<usize>,
}

impl SimulatedGame {
    /// Game still on its loading screen: no time manager, empty scene.
    pub fn booting() -> Self {
        Self::default()
    }

    /// Game in a session with the stock speed table and a white speed label.
    pub fn in_session(label: &str) -> Self {
        let mut game = Self::booting();
        game.load_session(SimulatedTimeManager::stock());
        game.add_label(label, Color::WHITE);
        game
    }

    pub fn load_session(&mut self, time_manager: SimulatedTimeManager) {
        self.time_manager = Some(time_manager);
    }

    pub fn unload_session(&mut self) {
        self.time_manager = None;
    }

    pub fn add_label(&mut self, name: &str, color: Color) -> Rc<RefCell<TextNode>> {
        let node = Rc::new(RefCell::new(TextNode::new(name, color)));
        self.scene.insert(name.to_string(), Rc::clone(&node));
        node
    }

    pub fn remove_label(&mut self, name: &str) {
        self.scene.remove(name);
    }

    pub fn label(&self, name: &str) -> Option<Rc<RefCell<TextNode>>> {
        self.scene.get(name).cloned()
    }

    pub fn time_manager(&self) -> Option<&SimulatedTimeManager> {
        self.time_manager.as_ref()
    }

    pub fn time_manager_mut(&mut self) -> Option<&mut SimulatedTimeManager> {
        self.time_manager.as_mut()
    }

    /// How often the extension asked for the domain owner.
    pub fn owner_lookups(&self) -> usize {
        self.owner_lookups.get()
    }
}

impl HostApplication for SimulatedGame {
    fn domain_owner_mut(&mut self) -> Option<&mut dyn DomainOwner> {
        self.owner_lookups.set(self.owner_lookups.get() + 1);
        self.time_manager
            .as_mut()
            .map(|manager| manager as &mut dyn DomainOwner)
    }

    fn find_display(&self, name: &str) -> Option<DisplayHandle> {
        self.scene
            .get(name)
            .map(|node| Rc::clone(node) as DisplayHandle)
    }
}

/// Input source replaying one trigger set per tick.
#[derive(Debug, Default)]
pub struct ScriptedTriggers {
    ticks: VecDeque<BTreeSet<TriggerId>>,
}

impl ScriptedTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one tick; an empty slice is an idle tick.
    pub fn push_tick(&mut self, triggers: &[&str]) {
        self.ticks
            .push_back(triggers.iter().map(|value| TriggerId::new(*value)).collect());
    }

    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

impl TriggerSource for ScriptedTriggers {
    fn poll(&mut self) -> BTreeSet<TriggerId> {
        self.ticks.pop_front().unwrap_or_default()
    }
}
