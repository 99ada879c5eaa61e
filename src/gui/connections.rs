use crate::graph_utils::geometry::{PortSide, Segment, port_anchor, segment_between};
use crate::graph_utils::pipeline::Connection;
use super::scene::SceneStore;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawnConnection {
    // Index into the connection list that produced this line.
    pub index: usize,
    pub segment: Segment,
}

/// Line geometry for every drawable connection, in scene space.
#[derive(Debug, Default)]
pub struct ConnectionLayer {
    drawn: Vec<DrawnConnection>,
    skipped: usize,
}

impl ConnectionLayer {
    pub fn new() -> Self { Self::default() }

    /// Throw away every line and recompute from `connections`.
    /// Returns the number of lines drawn.
    pub fn render(&mut self, connections: &[Connection], scene: &SceneStore) -> usize {
        self.drawn.clear();
        self.skipped = 0;
        for (index, c) in connections.iter().enumerate() {
            match resolve(c, scene) {
                Some(segment) => self.drawn.push(DrawnConnection { index, segment }),
                None => {
                    self.skipped += 1;
                    log::debug!(
                        "skipping connection {}:{} -> {}:{}",
                        c.source_pipe, c.source_slot, c.destination_pipe, c.destination_slot
                    );
                }
            }
        }
        self.drawn.len()
    }

    pub fn clear(&mut self) {
        self.drawn.clear();
        self.skipped = 0;
    }

    pub fn lines(&self) -> &[DrawnConnection] { &self.drawn }
    pub fn skipped(&self) -> usize { self.skipped }
}

/// Output anchor of the source to input anchor of the destination, or `None`
/// when either end is missing or the slot is out of range.
pub fn resolve(connection: &Connection, scene: &SceneStore) -> Option<Segment> {
    let size = scene.node_size();
    let src = scene.get(&connection.source_pipe)?;
    let dst = scene.get(&connection.destination_pipe)?;
    let from = port_anchor(src.position, PortSide::Output, connection.source_slot, src.ports().outputs, size)?;
    let to = port_anchor(dst.position, PortSide::Input, connection.destination_slot, dst.ports().inputs, size)?;
    Some(segment_between(from, to))
}
