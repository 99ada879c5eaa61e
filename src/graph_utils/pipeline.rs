use std::collections::{BTreeMap, HashMap};

use egui::Pos2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Pipes are keyed by their name on the server; it is stable across polls.
pub type PipeId = String;

/// Fallback position for pipes the server has no layout for.
pub const DEFAULT_POSITION: Pos2 = Pos2::new(50.0, 50.0);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

impl RunState {
    pub fn from_wire(s: &str) -> Self {
        if s == "running" { RunState::Running } else { RunState::Stopped }
    }

    pub fn is_running(self) -> bool { self == RunState::Running }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipeSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parameters: Value,
}

impl PipeSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), parameters: Value::Null }
    }

    pub fn with_parameters(kind: impl Into<String>, parameters: Value) -> Self {
        Self { kind: kind.into(), parameters }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(alias = "sourcePipe")]
    pub source_pipe: PipeId,
    #[serde(alias = "sourceSlot")]
    pub source_slot: u32,
    #[serde(alias = "destinationPipe")]
    pub destination_pipe: PipeId,
    #[serde(alias = "destinationSlot")]
    pub destination_slot: u32,
}

impl Connection {
    pub fn new(source_pipe: &str, source_slot: u32, destination_pipe: &str, destination_slot: u32) -> Self {
        Self {
            source_pipe: source_pipe.to_string(),
            source_slot,
            destination_pipe: destination_pipe.to_string(),
            destination_slot,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineModel {
    pub pipes: BTreeMap<PipeId, PipeSpec>,
    pub connections: Vec<Connection>,
}

/// Server-held layout. Positions are in scene coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
    pub positions: HashMap<PipeId, Pos2>,
}

impl Layout {
    pub fn position(&self, id: &str) -> Option<Pos2> { self.positions.get(id).copied() }
}

/// One poll worth of remote state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub name: Option<String>,
    pub run_state: RunState,
    pub model: PipelineModel,
    pub metadata: Layout,
}

#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("snapshot is not a JSON object")]
    NotAnObject,
    #[error("snapshot has no model")]
    MissingModel,
    #[error("model.pipes is not an object")]
    InvalidPipes,
    #[error("pipe '{0}' is malformed")]
    InvalidPipe(PipeId),
    #[error("model.connections is not a list")]
    InvalidConnections,
}

#[derive(Deserialize)]
struct WirePosition {
    x: f32,
    y: f32,
}

#[derive(Deserialize)]
struct WirePipeLayout {
    position: WirePosition,
}

impl Snapshot {
    pub fn new(model: PipelineModel) -> Self {
        Self { model, ..Default::default() }
    }

    pub fn with_position(mut self, id: &str, x: f32, y: f32) -> Self {
        self.metadata.positions.insert(id.to_string(), Pos2::new(x, y));
        self
    }

    pub fn parse(body: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(body).map_err(|e| SnapshotError::InvalidJson(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Decode a `GET /pipelines/{id}` body.
    ///
    /// The pipe set must decode completely or not at all: a snapshot with a
    /// broken pipe entry is rejected so the canvas keeps its last good state.
    /// Connections and layout entries are independent and dropped one by one.
    pub fn from_json(value: &Value) -> Result<Self, SnapshotError> {
        let root = value.as_object().ok_or(SnapshotError::NotAnObject)?;
        let model = root
            .get("model")
            .and_then(Value::as_object)
            .ok_or(SnapshotError::MissingModel)?;

        // The server leaves `pipes` out entirely for an empty pipeline.
        let mut pipes = BTreeMap::new();
        match model.get("pipes") {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => {
                for (id, entry) in entries {
                    let spec: PipeSpec = serde_json::from_value(entry.clone())
                        .map_err(|_| SnapshotError::InvalidPipe(id.clone()))?;
                    pipes.insert(id.clone(), spec);
                }
            }
            Some(_) => return Err(SnapshotError::InvalidPipes),
        }

        let mut connections = Vec::new();
        match model.get("connections") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    match serde_json::from_value::<Connection>(item.clone()) {
                        Ok(c) => connections.push(c),
                        Err(e) => log::debug!("dropping malformed connection {}: {}", item, e),
                    }
                }
            }
            Some(_) => return Err(SnapshotError::InvalidConnections),
        }

        let mut metadata = Layout::default();
        if let Some(entries) = root
            .get("metadata")
            .and_then(|m| m.get("pipes"))
            .and_then(Value::as_object)
        {
            for (id, entry) in entries {
                match serde_json::from_value::<WirePipeLayout>(entry.clone()) {
                    Ok(l) => {
                        metadata.positions.insert(id.clone(), Pos2::new(l.position.x, l.position.y));
                    }
                    Err(e) => log::debug!("ignoring layout for '{}': {}", id, e),
                }
            }
        }

        let run_state = root
            .get("state")
            .and_then(Value::as_str)
            .map(RunState::from_wire)
            .unwrap_or_default();
        let name = root.get("name").and_then(Value::as_str).map(str::to_string);

        Ok(Self { name, run_state, model: PipelineModel { pipes, connections }, metadata })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortCounts {
    pub inputs: u32,
    pub outputs: u32,
}

impl PortCounts {
    pub const fn new(inputs: u32, outputs: u32) -> Self { Self { inputs, outputs } }
}

/// Static sprite assets, one per pipe (or evaluator) type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sprite {
    RegularPipe,
    FactoryPipe,
    NullSinkPipe,
    EvaluatorPipe,
    AggregationEvaluator,
    MazeEvaluator,
    NoopEvaluator,
    OperatorUsageEvaluator,
    PassthroughEvaluator,
    RuntimeStatisticsEvaluator,
}

impl Sprite {
    pub const ALL: [Sprite; 10] = [
        Sprite::RegularPipe,
        Sprite::FactoryPipe,
        Sprite::NullSinkPipe,
        Sprite::EvaluatorPipe,
        Sprite::AggregationEvaluator,
        Sprite::MazeEvaluator,
        Sprite::NoopEvaluator,
        Sprite::OperatorUsageEvaluator,
        Sprite::PassthroughEvaluator,
        Sprite::RuntimeStatisticsEvaluator,
    ];

    pub fn asset_name(self) -> &'static str {
        match self {
            Sprite::RegularPipe => "regular_pipe.png",
            Sprite::FactoryPipe => "factory_pipe.png",
            Sprite::NullSinkPipe => "null_sink_pipe.png",
            Sprite::EvaluatorPipe => "evaluator_pipe.png",
            Sprite::AggregationEvaluator => "aggregation_evaluator.png",
            Sprite::MazeEvaluator => "maze_evaluator.png",
            Sprite::NoopEvaluator => "noop_evaluator.png",
            Sprite::OperatorUsageEvaluator => "operator_usage_evaluator.png",
            Sprite::PassthroughEvaluator => "passthrough_evaluator.png",
            Sprite::RuntimeStatisticsEvaluator => "runtime_statistics_evaluator.png",
        }
    }

    fn for_evaluator(kind: &str) -> Option<Sprite> {
        Some(match kind {
            "AggregationEvaluator" => Sprite::AggregationEvaluator,
            "MazeEvaluator" => Sprite::MazeEvaluator,
            "NoopEvaluator" => Sprite::NoopEvaluator,
            "OperatorUsageEvaluator" => Sprite::OperatorUsageEvaluator,
            "RandomSerialDataPassthroughEvaluator" => Sprite::PassthroughEvaluator,
            "RuntimeStatisticsEvaluator" => Sprite::RuntimeStatisticsEvaluator,
            _ => return None,
        })
    }
}

/// Closed set of pipe types the canvas knows how to draw.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PipeKind {
    ProgramFactory,
    NullSink,
    Evaluator,
    Evolution,
    Unknown,
}

impl PipeKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ProgramFactoryPipe" => PipeKind::ProgramFactory,
            "NullSinkPipe" => PipeKind::NullSink,
            "EvaluatorPipe" => PipeKind::Evaluator,
            "EvolutionPipe" => PipeKind::Evolution,
            _ => PipeKind::Unknown,
        }
    }

    pub fn ports(self) -> PortCounts {
        match self {
            PipeKind::ProgramFactory => PortCounts::new(0, 1),
            PipeKind::NullSink => PortCounts::new(1, 0),
            PipeKind::Evaluator | PipeKind::Evolution | PipeKind::Unknown => PortCounts::new(1, 1),
        }
    }
}

/// Everything the canvas derives from a pipe spec when its node is created.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PipeVisual {
    pub kind: PipeKind,
    pub ports: PortCounts,
    pub sprite: Sprite,
}

impl PipeVisual {
    pub fn of(spec: &PipeSpec) -> Self {
        let kind = PipeKind::from_tag(&spec.kind);
        let sprite = match kind {
            PipeKind::ProgramFactory => Sprite::FactoryPipe,
            PipeKind::NullSink => Sprite::NullSinkPipe,
            PipeKind::Evaluator => spec
                .parameters
                .get("evaluators")
                .and_then(Value::as_array)
                .and_then(|evals| evals.first())
                .and_then(|e| e.get("type"))
                .and_then(Value::as_str)
                .and_then(Sprite::for_evaluator)
                .unwrap_or(Sprite::EvaluatorPipe),
            PipeKind::Evolution | PipeKind::Unknown => Sprite::RegularPipe,
        };
        Self { kind, ports: kind.ports(), sprite }
    }
}
