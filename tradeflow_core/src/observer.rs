//! Outbound notifications.
//!
//! The controller pushes these at phase boundaries only, never per frame.

use crate::route::Role;
use crate::sequence::SequencePhase;
use crate::sphere::GeoPoint;
use serde::{Deserialize, Serialize};

/// Receives sequence notifications. Every method defaults to a no-op.
pub trait SequenceObserver {
    /// Human-readable progress text changed.
    fn on_status_changed(&mut self, _text: &str) {}

    /// The sequence arrived at route step `index`.
    fn on_step_changed(&mut self, _index: usize) {}

    /// A country should be highlighted in its role colour.
    fn on_country_highlighted(&mut self, _name: &str, _role: Role) {}

    /// A text label should be placed at `point`.
    fn on_label_added(&mut self, _point: GeoPoint, _text: &str, _color: &str) {}

    /// The controller changed phase.
    fn on_phase_changed(&mut self, _phase: SequencePhase) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SequenceObserver for NullObserver {}

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SequenceEvent {
    Status { text: String },
    Step { index: usize },
    Highlight { name: String, role: Role },
    Label { point: GeoPoint, text: String, color: String },
    Phase { phase: SequencePhase },
}

/// Observer that keeps every notification in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub events: Vec<SequenceEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step indices in notification order.
    pub fn step_indices(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SequenceEvent::Step { index } => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Phases in notification order.
    pub fn phases(&self) -> Vec<SequencePhase> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SequenceEvent::Phase { phase } => Some(*phase),
                _ => None,
            })
            .collect()
    }

    /// Status texts in notification order.
    pub fn statuses(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SequenceEvent::Status { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Highlighted country names in notification order.
    pub fn highlights(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SequenceEvent::Highlight { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl SequenceObserver for RecordingObserver {
    fn on_status_changed(&mut self, text: &str) {
        self.events.push(SequenceEvent::Status { text: text.to_string() });
    }

    fn on_step_changed(&mut self, index: usize) {
        self.events.push(SequenceEvent::Step { index });
    }

    fn on_country_highlighted(&mut self, name: &str, role: Role) {
        self.events.push(SequenceEvent::Highlight {
            name: name.to_string(),
            role,
        });
    }

    fn on_label_added(&mut self, point: GeoPoint, text: &str, color: &str) {
        self.events.push(SequenceEvent::Label {
            point,
            text: text.to_string(),
            color: color.to_string(),
        });
    }

    fn on_phase_changed(&mut self, phase: SequencePhase) {
        self.events.push(SequenceEvent::Phase { phase });
    }
}
