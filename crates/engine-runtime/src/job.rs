use crate::error::JobError;
use engine_processing::step::Step;
use std::{collections::HashSet, sync::Arc};

/// An ordered sequence of steps run as one unit.
#[derive(Clone)]
pub struct Job {
    name: String,
    steps: Vec<Arc<dyn Step>>,
}

impl Job {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }
}

pub struct JobBuilder {
    name: String,
    steps: Vec<Arc<dyn Step>>,
}

impl JobBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// First step of the job.
    pub fn start(mut self, step: impl Step + 'static) -> Self {
        self.steps.insert(0, Arc::new(step));
        self
    }

    /// Step run after the previous ones completed.
    pub fn next(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn build(self) -> Result<Job, JobError> {
        if self.steps.is_empty() {
            return Err(JobError::NoSteps(self.name));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name().to_string()) {
                return Err(JobError::DuplicateStep {
                    job: self.name,
                    step: step.name().to_string(),
                });
            }
        }

        Ok(Job {
            name: self.name,
            steps: self.steps,
        })
    }
}
