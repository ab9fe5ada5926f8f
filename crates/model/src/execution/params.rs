use crate::execution::errors::ParameterError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};

/// String-typed parameters a job is launched with.
///
/// Ordered so that the canonical form, and therefore the job instance key,
/// does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    values: BTreeMap<String, String>,
}

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ParameterError> {
        self.get(key)
            .ok_or_else(|| ParameterError::Missing(key.to_string()))
    }

    /// Reads an ISO-8601 local date-time such as `2024-03-01T10:15:30`.
    /// Seconds may be omitted.
    pub fn get_datetime(&self, key: &str) -> Result<NaiveDateTime, ParameterError> {
        let raw = self.require(key)?;
        raw.parse::<NaiveDateTime>()
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .map_err(|e| ParameterError::Invalid {
                key: key.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `k1=v1;k2=v2` in key order.
    pub fn canonical(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Parses a single `KEY=VALUE` pair as given on the command line.
    pub fn parse_pair(pair: &str) -> Result<(String, String), ParameterError> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ParameterError::Malformed(pair.to_string())),
        }
    }
}

impl FromStr for JobParameters {
    type Err = ParameterError;

    /// Parses a comma separated list of `KEY=VALUE` pairs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut params = JobParameters::new();
        for pair in s.split(',').filter(|p| !p.trim().is_empty()) {
            let (key, value) = Self::parse_pair(pair)?;
            params.insert(key, value);
        }
        Ok(params)
    }
}

impl<K, V> FromIterator<(K, V)> for JobParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = JobParameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
