//! Hover tooltip: an Idle/Showing state machine that owns the one tooltip
//! element, so a second pointer-enter replaces it rather than stacking.

use crate::document::{Document, NodeId};
use crate::types::{EducationRecord, Fips};

const POINTER_OFFSET: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TooltipState {
    #[default]
    Idle,
    Showing { node: NodeId, fips: Fips },
}

#[derive(Debug)]
pub struct HoverHandler {
    container: NodeId,
    state: TooltipState,
}

pub fn message(record: &EducationRecord) -> String {
    format!(
        "{}, {}: {}%",
        record.area_name, record.state, record.bachelors_or_higher
    )
}

impl HoverHandler {
    /// Tooltips are attached to `container`.
    pub fn new(container: NodeId) -> Self {
        Self {
            container,
            state: TooltipState::Idle,
        }
    }

    pub fn state(&self) -> TooltipState {
        self.state
    }

    pub fn pointer_enter(&mut self, doc: &mut Document, record: &EducationRecord, pointer: Pointer) -> NodeId {
        self.pointer_leave(doc);

        let node = doc.append(self.container, "div");
        doc.set_attr(node, "id", "tooltip")
            .set_attr(node, "data-education", record.bachelors_or_higher.to_string())
            .set_attr(
                node,
                "style",
                format!(
                    "position: absolute; left: {}px; top: {}px;",
                    pointer.x + POINTER_OFFSET,
                    pointer.y + POINTER_OFFSET
                ),
            );
        let span = doc.append(node, "span");
        doc.append_text(span, &message(record));

        self.state = TooltipState::Showing {
            node,
            fips: record.fips,
        };
        node
    }

    pub fn pointer_leave(&mut self, doc: &mut Document) {
        if let TooltipState::Showing { node, .. } = std::mem::take(&mut self.state) {
            doc.remove(node);
        }
    }
}

/// Markup of the tooltip a pointer-enter on `record` would produce.
pub fn fragment(record: &EducationRecord, pointer: Pointer) -> String {
    let mut doc = Document::new("div");
    let mut handler = HoverHandler::new(doc.root());
    let node = handler.pointer_enter(&mut doc, record, pointer);
    doc.to_markup(node)
}
