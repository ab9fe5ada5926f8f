use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Identity of one job instance: the job name plus a digest of its parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Arc<str>);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Arc::from(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Addresses the persisted execution state of one step inside one job instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepKey {
    pub job_name: String,
    pub instance_id: InstanceId,
    pub step_name: String,
}

impl StepKey {
    pub fn new(
        job_name: impl Into<String>,
        instance_id: InstanceId,
        step_name: impl Into<String>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            instance_id,
            step_name: step_name.into(),
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.job_name, self.instance_id, self.step_name)
    }
}
