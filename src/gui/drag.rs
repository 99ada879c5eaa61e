use egui::{PointerButton, Pos2, Vec2};

use crate::graph_utils::pipeline::{Connection, PipeId};
use super::connections::ConnectionLayer;
use super::scene::{AlphaProbe, SceneStore};

/// What a pointer-down on the canvas turns into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Gesture {
    NodeDrag,
    Pan,
    Ignored,
}

/// What lies under the pointer when a button goes down.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PressTarget {
    Node,
    Background,
    // Another layer (a window, a popup) sits over the canvas here.
    Covered,
}

/// Node drags need the primary button on a node; pans need the secondary or
/// middle button on the background. Everything else is ignored.
pub fn classify_press(button: PointerButton, target: PressTarget) -> Gesture {
    match (button, target) {
        (PointerButton::Primary, PressTarget::Node) => Gesture::NodeDrag,
        (PointerButton::Secondary | PointerButton::Middle, PressTarget::Background) => Gesture::Pan,
        _ => Gesture::Ignored,
    }
}

/// Pointer state sampled once per frame to decide whether a gesture is over.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PointerSample {
    pub released: bool,
    pub left_canvas: bool,
    pub primary_down: bool,
}

impl PointerSample {
    pub fn ends_drag(self) -> bool { self.released || self.left_canvas || !self.primary_down }
    pub fn ends_pan(self) -> bool { self.released || self.left_canvas }
}

/// Final position of a completed drag, to be persisted remotely.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveRequest {
    pub pipe: PipeId,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed on a node but not moved yet. A release from here is a click.
    Pending {
        id: PipeId,
        grab: Vec2,
        press: Pos2,
    },
    Dragging {
        id: PipeId,
        // Pointer position relative to the node origin at grab time.
        grab: Vec2,
    },
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self { Self::default() }

    pub fn state(&self) -> &DragState { &self.state }

    /// Node being moved. A pending grab does not count.
    pub fn dragging(&self) -> Option<&PipeId> {
        match &self.state {
            DragState::Dragging { id, .. } => Some(id),
            DragState::Idle | DragState::Pending { .. } => None,
        }
    }

    /// Node under the held button, moved or not.
    pub fn held(&self) -> Option<&PipeId> {
        match &self.state {
            DragState::Pending { id, .. } | DragState::Dragging { id, .. } => Some(id),
            DragState::Idle => None,
        }
    }

    /// Grab the node under `pointer` (scene space). Fails when no node is
    /// there or the pixel under the pointer is transparent. The node is not
    /// marked as dragged until the pointer actually moves.
    pub fn begin(&mut self, scene: &SceneStore, pointer: Pos2, probe: &impl AlphaProbe) -> bool {
        if self.held().is_some() {
            return false;
        }
        let Some(node) = scene.node_at(pointer) else { return false };
        if !scene.is_opaque_at(node, pointer, probe) {
            log::debug!("ignoring press on transparent part of '{}'", node.id);
            return false;
        }
        self.state = DragState::Pending { id: node.id.clone(), grab: pointer - node.position, press: pointer };
        true
    }

    /// Move the held node under the pointer and redraw the connection lines
    /// so they follow it. The first move away from the press point starts
    /// the drag proper.
    pub fn drag_to(
        &mut self,
        scene: &mut SceneStore,
        pointer: Pos2,
        layer: &mut ConnectionLayer,
        connections: &[Connection],
    ) -> bool {
        let (id, grab) = match &self.state {
            DragState::Idle => return false,
            DragState::Pending { press, .. } if *press == pointer => return true,
            DragState::Pending { id, grab, .. } | DragState::Dragging { id, grab } => (id.clone(), *grab),
        };
        if !scene.set_position(&id, pointer - grab) {
            // The node was reconciled away under us.
            self.state = DragState::Idle;
            return false;
        }
        if matches!(self.state, DragState::Pending { .. }) {
            scene.set_dragging(&id, true);
            self.state = DragState::Dragging { id, grab };
        }
        layer.render(connections, scene);
        true
    }

    /// Drop the node. Returns the move to persist when the node was actually
    /// dragged; a press without movement persists nothing.
    pub fn release(&mut self, scene: &mut SceneStore) -> Option<MoveRequest> {
        let DragState::Dragging { id, .. } = std::mem::take(&mut self.state) else { return None };
        scene.set_dragging(&id, false);
        let pos = scene.position(&id)?;
        Some(MoveRequest { pipe: id, x: pos.x, y: pos.y })
    }

    /// Release if `sample` ends the gesture: button up, pointer off the
    /// canvas, or the primary button no longer held.
    pub fn end_if(&mut self, scene: &mut SceneStore, sample: PointerSample) -> Option<MoveRequest> {
        if self.held().is_some() && sample.ends_drag() {
            self.release(scene)
        } else {
            None
        }
    }
}
