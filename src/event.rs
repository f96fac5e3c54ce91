//! Lineage event model
//!
//! Events are serialized as camelCase JSON. Only [`RunEvent`] is accepted
//! by the client; [`JobEvent`] and [`DatasetEvent`] exist so callers and
//! the CLI can hand over any lineage document and get a clear usage error
//! back instead of a parse failure.

use chrono::{DateTime, Utc};
use colored::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClientError;

/// Schema URL stamped on events built by this crate.
pub const RUN_EVENT_SCHEMA_URL: &str = "https://openlineage.io/spec/1-0-5/OpenLineage.json#/definitions/RunEvent";

/// Producer URI used when the caller does not provide one.
pub const DEFAULT_PRODUCER: &str =
    concat!("https://github.com/lineage-client/lineage/tree/", env!("CARGO_PKG_VERSION"));

/// Facets are free-form JSON documents keyed by facet name.
pub type Facets = IndexMap<String, serde_json::Value>;

/// Run state transition carried by a run event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Start,
    Running,
    Complete,
    Abort,
    Fail,
    Other,
}

impl EventType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "running" => Some(Self::Running),
            "complete" => Some(Self::Complete),
            "abort" => Some(Self::Abort),
            "fail" => Some(Self::Fail),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Abort => "ABORT",
            Self::Fail => "FAIL",
            Self::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Run {
    #[serde(rename = "runId")]
    pub run_id: Uuid,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub facets: Facets,
}

impl Run {
    /// A run with a fresh random id
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            facets: Facets::new(),
        }
    }
}

impl Default for Run {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Job {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub facets: Facets,
}

impl Job {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            facets: Facets::new(),
        }
    }
}

/// A dataset read or written by a job
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Dataset {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub facets: Facets,
}

impl Dataset {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            facets: Facets::new(),
        }
    }
}

/// A run state change of a job, with the datasets it touched
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub event_type: EventType,
    pub event_time: DateTime<Utc>,
    pub run: Run,
    pub job: Job,
    pub producer: String,
    #[serde(default)]
    pub inputs: Vec<Dataset>,
    #[serde(default)]
    pub outputs: Vec<Dataset>,
    #[serde(rename = "schemaURL", default = "default_schema_url")]
    pub schema_url: String,
}

fn default_schema_url() -> String {
    RUN_EVENT_SCHEMA_URL.to_string()
}

impl RunEvent {
    /// Create a run event stamped with the current time
    pub fn new(event_type: EventType, run: Run, job: Job, producer: impl Into<String>) -> Self {
        Self {
            event_type,
            event_time: Utc::now(),
            run,
            job,
            producer: producer.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            schema_url: default_schema_url(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<Dataset>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<Dataset>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Format for stdout display
    pub fn format_display(&self) -> String {
        let event_type = self.event_type.as_str();
        let event_colored = match self.event_type {
            EventType::Start => event_type.green(),
            EventType::Complete => event_type.blue(),
            EventType::Fail | EventType::Abort => event_type.red(),
            EventType::Running => event_type.cyan(),
            EventType::Other => event_type.normal(),
        };

        let run_id = self.run.run_id.to_string();
        let mut parts = vec![
            self.event_time.format("%Y-%m-%d %H:%M:%S").to_string().dimmed().to_string(),
            event_colored.to_string(),
            format!("{}.{}", self.job.namespace, self.job.name).bold().to_string(),
            format!("[{}]", &run_id[..8]).dimmed().to_string(),
        ];

        if !self.inputs.is_empty() || !self.outputs.is_empty() {
            parts.push(format!("{} in / {} out", self.inputs.len(), self.outputs.len()));
        }

        parts.join(" ")
    }
}

/// Job-level lineage without a run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub event_time: DateTime<Utc>,
    pub job: Job,
    pub producer: String,
    #[serde(default)]
    pub inputs: Vec<Dataset>,
    #[serde(default)]
    pub outputs: Vec<Dataset>,
    #[serde(rename = "schemaURL", default)]
    pub schema_url: String,
}

/// Dataset metadata without a job
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetEvent {
    pub event_time: DateTime<Utc>,
    pub dataset: Dataset,
    pub producer: String,
    #[serde(rename = "schemaURL", default)]
    pub schema_url: String,
}

/// Any lineage document a caller might hand to the client
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LineageEvent {
    Run(RunEvent),
    Job(JobEvent),
    Dataset(DatasetEvent),
}

impl LineageEvent {
    /// Classify a raw JSON document.
    ///
    /// The `run`, `job` and `dataset` keys pick the event type, in that order,
    /// and the document must then be valid for it. Anything else is a usage error.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ClientError> {
        let invalid = |kind: &str, e: serde_json::Error| ClientError::Usage(format!("invalid {}: {}", kind, e));

        if value.get("run").is_some() {
            serde_json::from_value(value).map(Self::Run).map_err(|e| invalid("run event", e))
        } else if value.get("job").is_some() {
            serde_json::from_value(value).map(Self::Job).map_err(|e| invalid("job event", e))
        } else if value.get("dataset").is_some() {
            serde_json::from_value(value).map(Self::Dataset).map_err(|e| invalid("dataset event", e))
        } else {
            Err(ClientError::Usage("document is not a run, job or dataset event".to_string()))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Run(_) => "RunEvent",
            Self::Job(_) => "JobEvent",
            Self::Dataset(_) => "DatasetEvent",
        }
    }
}

impl From<RunEvent> for LineageEvent {
    fn from(event: RunEvent) -> Self {
        Self::Run(event)
    }
}

impl From<JobEvent> for LineageEvent {
    fn from(event: JobEvent) -> Self {
        Self::Job(event)
    }
}

impl From<DatasetEvent> for LineageEvent {
    fn from(event: DatasetEvent) -> Self {
        Self::Dataset(event)
    }
}
