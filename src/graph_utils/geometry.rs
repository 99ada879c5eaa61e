use egui::{Pos2, Vec2};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortSide {
    Input,
    Output,
}

/// A straight connection line in scene space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    pub from: Pos2,
    pub to: Pos2,
}

impl Segment {
    pub fn new(from: Pos2, to: Pos2) -> Self { Self { from, to } }

    pub fn translate(self, by: Vec2) -> Self {
        Self { from: self.from + by, to: self.to + by }
    }

    pub fn points(self) -> [Pos2; 2] { [self.from, self.to] }
}

/// Offset of a port anchor from the node's top-left corner.
///
/// Inputs sit on the left edge, outputs on the right edge; the `total` slots
/// on a side are spread evenly so the group is centered on the node height.
/// Returns `None` when `slot` is not a valid index for that side.
pub fn port_offset(side: PortSide, slot: u32, total: u32, node_size: Vec2) -> Option<Vec2> {
    if slot >= total {
        return None;
    }
    let x = match side {
        PortSide::Input => 0.0,
        PortSide::Output => node_size.x,
    };
    let y = node_size.y * (slot as f32 + 1.0) / (total as f32 + 1.0);
    Some(Vec2::new(x, y))
}

pub fn port_anchor(node_pos: Pos2, side: PortSide, slot: u32, total: u32, node_size: Vec2) -> Option<Pos2> {
    port_offset(side, slot, total, node_size).map(|off| node_pos + off)
}

pub fn segment_between(from: Pos2, to: Pos2) -> Segment { Segment::new(from, to) }
