use egui::{Pos2, Rect, Vec2};

use crate::graph_utils::geometry::Segment;

/// Shared camera frame for the grid, node and connection layers.
///
/// The grid is drawn `grid_multiplier` times larger than the viewport and
/// starts shifted so the viewport sits in its middle. Panning moves every
/// layer by the same delta; nodes and connections share the node offset.
#[derive(Debug, Clone)]
pub struct Camera {
    viewport: Vec2,
    grid_size: f32,
    grid_multiplier: f32,
    grid_offset: Vec2,
    node_offset: Vec2,
    pan_anchor: Option<Pos2>,
    grid_lines: Vec<Segment>,
}

impl Camera {
    pub fn new(viewport: Vec2, grid_size: f32, grid_multiplier: f32) -> Self {
        let mut cam = Self {
            viewport,
            grid_size: grid_size.max(1.0),
            grid_multiplier: grid_multiplier.max(1.0),
            grid_offset: Vec2::ZERO,
            node_offset: Vec2::ZERO,
            pan_anchor: None,
            grid_lines: Vec::new(),
        };
        cam.grid_offset = cam.grid_home();
        cam.rebuild_grid();
        cam
    }

    pub fn viewport(&self) -> Vec2 { self.viewport }
    pub fn grid_offset(&self) -> Vec2 { self.grid_offset }
    pub fn node_offset(&self) -> Vec2 { self.node_offset }
    pub fn grid_lines(&self) -> &[Segment] { &self.grid_lines }

    /// Canvas outline, in viewport space.
    pub fn border(&self) -> Rect { Rect::from_min_size(Pos2::ZERO, self.viewport) }

    fn grid_extent(&self) -> Vec2 { self.viewport * self.grid_multiplier }

    /// Grid offset that centers the oversized grid on the viewport.
    pub fn grid_home(&self) -> Vec2 { -(self.grid_extent() - self.viewport) * 0.5 }

    fn rebuild_grid(&mut self) {
        self.grid_lines.clear();
        let extent = self.grid_extent();
        let mut x = 0.0;
        while x < extent.x {
            self.grid_lines.push(Segment::new(Pos2::new(x, 0.0), Pos2::new(x, extent.y)));
            x += self.grid_size;
        }
        let mut y = 0.0;
        while y < extent.y {
            self.grid_lines.push(Segment::new(Pos2::new(0.0, y), Pos2::new(extent.x, y)));
            y += self.grid_size;
        }
    }

    /// Follow a new viewport size. The grid is re-centered on the new
    /// viewport with any pan applied so far kept; scene positions and the
    /// node offset are untouched.
    pub fn resize(&mut self, viewport: Vec2) -> bool {
        if viewport == self.viewport || viewport.x <= 0.0 || viewport.y <= 0.0 {
            return false;
        }
        let old_home = self.grid_home();
        self.viewport = viewport;
        self.grid_offset += self.grid_home() - old_home;
        self.rebuild_grid();
        true
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.grid_offset += delta;
        self.node_offset += delta;
    }

    pub fn reset(&mut self) {
        self.grid_offset = self.grid_home();
        self.node_offset = Vec2::ZERO;
    }

    pub fn is_panning(&self) -> bool { self.pan_anchor.is_some() }

    pub fn begin_pan(&mut self, pointer: Pos2) { self.pan_anchor = Some(pointer); }

    /// Pan by the pointer motion since the last event and re-anchor there.
    pub fn pan_to(&mut self, pointer: Pos2) -> Option<Vec2> {
        let anchor = self.pan_anchor.as_mut()?;
        let delta = pointer - *anchor;
        *anchor = pointer;
        if delta != Vec2::ZERO {
            self.grid_offset += delta;
            self.node_offset += delta;
        }
        Some(delta)
    }

    pub fn end_pan(&mut self) { self.pan_anchor = None; }

    pub fn scene_to_viewport(&self, p: Pos2) -> Pos2 { p + self.node_offset }
    pub fn viewport_to_scene(&self, p: Pos2) -> Pos2 { p - self.node_offset }
}
