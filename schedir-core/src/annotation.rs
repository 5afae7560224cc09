//! User annotations (comment, color tag) attached to events.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Event;

/// A persisted annotation row, keyed by `(schedule_id, event_id)`.
///
/// Reconciliation hands an unchanged event its previous id, so the event id
/// keeps pointing at the same structural event across re-fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventExtraData {
    pub schedule_id: i64,
    pub event_id: i64,
    #[serde(default)]
    pub comment: String,
    /// Color tag, 0 = none
    #[serde(default)]
    pub tag: u32,
}

impl EventExtraData {
    pub fn annotation(&self) -> Annotation {
        Annotation {
            comment: self.comment.clone(),
            tag: self.tag,
        }
    }
}

/// The user-visible part of an annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub comment: String,
    pub tag: u32,
}

impl Annotation {
    pub fn is_empty(&self) -> bool {
        self.comment.is_empty() && self.tag == 0
    }
}

/// An event joined with its annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedEvent {
    pub event: Event,
    pub annotation: Annotation,
}

impl AnnotatedEvent {
    pub fn is_hidden(&self) -> bool {
        self.event.is_hidden
    }
}

/// Left-join `events` of `schedule_id` with `annotations`.
///
/// Events without a stored annotation (including unsaved ones with no id)
/// get [`Annotation::default`].
pub fn attach(
    schedule_id: Option<i64>,
    events: &[Event],
    annotations: &[EventExtraData],
) -> Vec<AnnotatedEvent> {
    let by_event: HashMap<(i64, i64), &EventExtraData> = annotations
        .iter()
        .map(|a| ((a.schedule_id, a.event_id), a))
        .collect();

    events
        .iter()
        .map(|event| {
            let annotation = schedule_id
                .zip(event.id)
                .and_then(|key| by_event.get(&key))
                .map(|extra| extra.annotation())
                .unwrap_or_default();

            AnnotatedEvent {
                event: event.clone(),
                annotation,
            }
        })
        .collect()
}
