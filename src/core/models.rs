use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const ATTR_JOB_NAME: &str = "Job_Name";
pub const ATTR_JOB_OWNER: &str = "Job_Owner";
pub const ATTR_JOB_STATE: &str = "job_state";
pub const ATTR_QUEUE: &str = "queue";
pub const ATTR_EXEC_HOST: &str = "exec_host";
pub const ATTR_JOB_ARRAY_ID: &str = "job_array_id";
pub const ATTR_RESOURCES_USED_MEM: &str = "resources_used.mem";
pub const ATTR_RESOURCES_USED_CPUT: &str = "resources_used.cput";
pub const ATTR_RESOURCES_USED_WALLTIME: &str = "resources_used.walltime";

/// One job as reported by a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(alias = "name")]
    pub id: String,
    #[serde(rename = "attributes", default)]
    pub attrs: HashMap<String, String>,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attrs: HashMap::new(),
        }
    }

    /// Attribute key for `name`, qualified by `resource` when present.
    pub fn attr_key(name: &str, resource: Option<&str>) -> String {
        match resource {
            Some(resource) => format!("{name}.{resource}"),
            None => name.to_string(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.attr(ATTR_JOB_NAME)
    }

    /// Owner without the submit host (`user@host` -> `user`).
    pub fn owner(&self) -> Option<&str> {
        self.attr(ATTR_JOB_OWNER)
            .map(|owner| owner.split_once('@').map_or(owner, |(user, _)| user))
    }

    pub fn state(&self) -> JobState {
        self.attr(ATTR_JOB_STATE)
            .map(JobState::from_code)
            .unwrap_or(JobState::Unknown)
    }

    pub fn walltime(&self) -> Option<&str> {
        self.attr(ATTR_RESOURCES_USED_WALLTIME)
    }

    /// Job name with the array index suffix removed, so all elements of an
    /// array job share one name.
    pub fn base_name(&self) -> &str {
        let name = self.name().unwrap_or(&self.id);
        match self.attr(ATTR_JOB_ARRAY_ID) {
            Some(index) => name
                .strip_suffix(index)
                .and_then(|rest| rest.strip_suffix('-'))
                .unwrap_or(name),
            None => name,
        }
    }
}

/// Scheduler state letter from `job_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Held,
    Exiting,
    Completed,
    Waiting,
    Transit,
    Suspended,
    Unknown,
}

impl JobState {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "Q" => Self::Queued,
            "R" => Self::Running,
            "H" => Self::Held,
            "E" => Self::Exiting,
            "C" => Self::Completed,
            "W" => Self::Waiting,
            "T" => Self::Transit,
            "S" => Self::Suspended,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "Q",
            Self::Running => "R",
            Self::Held => "H",
            Self::Exiting => "E",
            Self::Completed => "C",
            Self::Waiting => "W",
            Self::Transit => "T",
            Self::Suspended => "S",
            Self::Unknown => "?",
        }
    }
}
