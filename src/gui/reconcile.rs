use crate::graph_utils::pipeline::{DEFAULT_POSITION, PipeId, Snapshot};
use super::scene::{SceneStore, VisualNode};

/// What a reconcile pass changed in the scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Delta {
    pub added: Vec<PipeId>,
    pub removed: Vec<PipeId>,
    // Spec changed on an existing pipe. Reported but not acted on.
    pub updated: Vec<PipeId>,
    pub moved: Vec<PipeId>,
    pub connections_changed: bool,
}

impl Delta {
    /// No node was created or destroyed.
    pub fn is_structurally_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Connection lines must be recomputed.
    pub fn needs_redraw(&self) -> bool {
        !self.is_structurally_empty() || !self.moved.is_empty() || self.connections_changed
    }
}

/// Apply the difference between `previous` and `current` to `scene`.
pub fn reconcile(previous: Option<&Snapshot>, current: &Snapshot, scene: &mut SceneStore) -> Delta {
    let mut delta = Delta::default();
    let pipes = &current.model.pipes;

    for (id, spec) in pipes {
        match previous.and_then(|p| p.model.pipes.get(id)) {
            Some(old) if old != spec => delta.updated.push(id.clone()),
            Some(_) => {}
            None => {
                if scene.contains(id) {
                    continue;
                }
                let pos = current.metadata.position(id).unwrap_or(DEFAULT_POSITION);
                scene.insert(VisualNode::new(id.clone(), spec, pos));
                delta.added.push(id.clone());
            }
        }
    }

    // Anything the scene still holds that the snapshot no longer names goes,
    // which covers both the previous snapshot's pipes and stray nodes.
    let stale: Vec<PipeId> = scene.ids().filter(|id| !pipes.contains_key(*id)).cloned().collect();
    for id in stale {
        scene.remove(&id);
        delta.removed.push(id);
    }

    for id in &delta.updated {
        log::debug!("pipe '{}' changed its spec; keeping the existing node", id);
    }

    for (id, target) in &current.metadata.positions {
        if delta.added.contains(id) {
            continue;
        }
        if let Some(node) = scene.get_mut(id)
            && !node.is_being_dragged
            && node.position != *target
        {
            node.position = *target;
            delta.moved.push(id.clone());
        }
    }

    delta.connections_changed = previous.map(|p| p.model.connections != current.model.connections).unwrap_or(true);
    delta
}

/// Owns the last applied snapshot and feeds each new one through
/// [`reconcile`].
#[derive(Debug, Default)]
pub struct Reconciler {
    previous: Option<Snapshot>,
}

impl Reconciler {
    pub fn new() -> Self { Self::default() }

    pub fn previous(&self) -> Option<&Snapshot> { self.previous.as_ref() }

    pub fn apply(&mut self, current: Snapshot, scene: &mut SceneStore) -> Delta {
        let delta = reconcile(self.previous.as_ref(), &current, scene);
        if !delta.is_structurally_empty() {
            log::debug!("reconciled: +{:?} -{:?}", delta.added, delta.removed);
        }
        self.previous = Some(current);
        delta
    }

    pub fn reset(&mut self) { self.previous = None; }
}
