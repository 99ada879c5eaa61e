use std::collections::HashMap;

use egui::{Pos2, Rect, Vec2};

use crate::graph_utils::pipeline::{PipeId, PipeSpec, PipeVisual, PortCounts, Sprite};

/// Sprite transparency lookup used for pixel-accurate hit-testing.
pub trait AlphaProbe {
    /// `uv` is the normalized position inside the sprite. `None` means the
    /// sprite has not been loaded yet.
    fn is_opaque(&self, sprite: Sprite, uv: Vec2) -> Option<bool>;
}

/// Probe for callers that have no sprites at all; every hit lands.
pub struct BoundingBoxes;

impl AlphaProbe for BoundingBoxes {
    fn is_opaque(&self, _sprite: Sprite, _uv: Vec2) -> Option<bool> { None }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisualNode {
    pub id: PipeId,
    pub visual: PipeVisual,
    pub position: Pos2,
    pub is_being_dragged: bool,
    // Set once the sprite texture is available.
    pub decorated: bool,
}

impl VisualNode {
    pub fn new(id: PipeId, spec: &PipeSpec, position: Pos2) -> Self {
        Self {
            id,
            visual: PipeVisual::of(spec),
            position,
            is_being_dragged: false,
            decorated: false,
        }
    }

    pub fn ports(&self) -> PortCounts { self.visual.ports }
    pub fn sprite(&self) -> Sprite { self.visual.sprite }
}

/// Everything currently drawn on the node layer, keyed by pipe id.
///
/// Nodes are stacked in creation order; later nodes are drawn on top and win
/// hit-tests.
#[derive(Debug)]
pub struct SceneStore {
    nodes: HashMap<PipeId, VisualNode>,
    stacking: Vec<PipeId>,
    node_size: Vec2,
}

impl SceneStore {
    pub fn new(node_size: Vec2) -> Self {
        Self { nodes: HashMap::new(), stacking: Vec::new(), node_size }
    }

    pub fn node_size(&self) -> Vec2 { self.node_size }

    /// Adds a node unless one with the same id already exists.
    pub fn insert(&mut self, node: VisualNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.stacking.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<VisualNode> {
        let node = self.nodes.remove(id)?;
        self.stacking.retain(|s| s != id);
        Some(node)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.stacking.clear();
    }

    pub fn get(&self, id: &str) -> Option<&VisualNode> { self.nodes.get(id) }
    pub fn get_mut(&mut self, id: &str) -> Option<&mut VisualNode> { self.nodes.get_mut(id) }
    pub fn contains(&self, id: &str) -> bool { self.nodes.contains_key(id) }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn ids(&self) -> impl Iterator<Item = &PipeId> { self.stacking.iter() }

    /// Nodes bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &VisualNode> {
        self.stacking.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn position(&self, id: &str) -> Option<Pos2> { self.nodes.get(id).map(|n| n.position) }

    pub fn set_position(&mut self, id: &str, pos: Pos2) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.position = pos;
                true
            }
            None => false,
        }
    }

    pub fn set_dragging(&mut self, id: &str, dragging: bool) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.is_being_dragged = dragging;
                true
            }
            None => false,
        }
    }

    pub fn node_rect(&self, id: &str) -> Option<Rect> {
        self.position(id).map(|p| Rect::from_min_size(p, self.node_size))
    }

    /// Topmost node whose bounding box contains `point` (scene space).
    pub fn node_at(&self, point: Pos2) -> Option<&VisualNode> {
        self.stacking
            .iter()
            .rev()
            .filter_map(|id| self.nodes.get(id))
            .find(|n| Rect::from_min_size(n.position, self.node_size).contains(point))
    }

    /// Whether the pixel under `point` on `node` is drawn. Undecorated nodes
    /// have no pixels to test yet and use their bounding box.
    pub fn is_opaque_at(&self, node: &VisualNode, point: Pos2, probe: &impl AlphaProbe) -> bool {
        let local = point - node.position;
        if local.x < 0.0 || local.y < 0.0 || local.x >= self.node_size.x || local.y >= self.node_size.y {
            return false;
        }
        let uv = Vec2::new(local.x / self.node_size.x, local.y / self.node_size.y);
        probe.is_opaque(node.sprite(), uv).unwrap_or(true)
    }

    /// Marks every node using `sprite` as decorated; returns how many changed.
    pub fn decorate(&mut self, sprite: Sprite) -> usize {
        let mut n = 0;
        for node in self.nodes.values_mut() {
            if node.sprite() == sprite && !node.decorated {
                node.decorated = true;
                n += 1;
            }
        }
        n
    }
}
