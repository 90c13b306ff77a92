//! Feedback color for the active domain value.
//!
//! # Invariants
//! - The display is held weakly; a dropped node turns every update into a
//!   no-op instead of keeping it alive.
//! - Lookup is exact-match-or-noop and never fails.

use crate::config::{Color, ExtensionConfig};
use crate::host::{ColorDisplay, DisplayHandle, HostApplication};
use log::{debug, info};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Weak reference to the host display plus the color it had at capture.
#[derive(Clone)]
pub struct FeedbackBinding {
    display: Weak<RefCell<dyn ColorDisplay>>,
    original: Color,
}

/// Result of pushing a color to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackUpdate {
    Applied(Color),
    Unchanged,
    DisplayGone,
}

impl FeedbackBinding {
    /// Looks up `name` in the host scene; `None` when absent.
    pub fn capture(host: &dyn HostApplication, name: &str) -> Option<Self> {
        let Some(display) = host.find_display(name) else {
            info!("event=feedback_capture module=feedback status=skip display={name:?}");
            return None;
        };
        Some(Self::from_handle(&display))
    }

    pub fn from_handle(display: &DisplayHandle) -> Self {
        let original = display.borrow().color();
        Self {
            display: Rc::downgrade(display),
            original,
        }
    }

    pub fn original(&self) -> Color {
        self.original
    }

    pub fn is_alive(&self) -> bool {
        self.display.strong_count() > 0
    }

    /// Recolors the display for `active_value`.
    pub fn apply(&self, active_value: f32, config: &ExtensionConfig) -> FeedbackUpdate {
        let Some(display) = self.display.upgrade() else {
            return FeedbackUpdate::DisplayGone;
        };
        match resolve_feedback_color(active_value, config, self.original) {
            Some(color) => {
                display.borrow_mut().set_color(color);
                debug!("event=feedback_apply module=feedback value={active_value} color={color}");
                FeedbackUpdate::Applied(color)
            }
            None => FeedbackUpdate::Unchanged,
        }
    }

    /// Puts the captured color back.
    pub fn restore(&self) -> FeedbackUpdate {
        match self.display.upgrade() {
            Some(display) => {
                display.borrow_mut().set_color(self.original);
                FeedbackUpdate::Applied(self.original)
            }
            None => FeedbackUpdate::DisplayGone,
        }
    }
}

/// Color for `active_value`: `default` below the first extension value,
/// the exact entry color otherwise, `None` when no entry matches.
pub fn resolve_feedback_color(
    active_value: f32,
    config: &ExtensionConfig,
    default: Color,
) -> Option<Color> {
    match config.first_extension_value() {
        Some(first) if active_value < first => Some(default),
        Some(_) => config.color_for(active_value),
        None => None,
    }
}
