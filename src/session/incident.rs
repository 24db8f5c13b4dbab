// Incident log - append-only per-subject fall history
//
// Incidents are never removed. Amendment merges caller metadata into an
// existing record; everything else about an incident is fixed at append.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::features::FeatureVector;
use crate::error::SessionError;

/// A confirmed fall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: u64,
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub features: FeatureVector,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Fields supplied when recording an incident
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub features: FeatureVector,
    pub keywords: Vec<String>,
}

#[derive(Debug, Default)]
pub struct IncidentLog {
    next_id: AtomicU64,
    entries: RwLock<HashMap<String, Vec<Incident>>>,
}

impl IncidentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an incident for a subject
    ///
    /// Ids are unique across all subjects and increase in append order.
    pub fn append(&self, subject_id: &str, incident: NewIncident) -> Result<Incident, SessionError> {
        let mut entries = self.entries.write().map_err(|_| SessionError::StatePoisoned)?;

        let record = Incident {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            subject_id: subject_id.to_string(),
            timestamp: incident.timestamp,
            confidence: incident.confidence,
            features: incident.features,
            keywords: incident.keywords,
            metadata: Map::new(),
        };

        entries
            .entry(subject_id.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    /// Most recent incidents first, at most `limit`
    pub fn history(&self, subject_id: &str, limit: usize) -> Result<Vec<Incident>, SessionError> {
        let entries = self.entries.read().map_err(|_| SessionError::StatePoisoned)?;
        Ok(entries
            .get(subject_id)
            .map(|incidents| incidents.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    /// Merge metadata into an existing incident; later keys overwrite earlier ones
    pub fn amend(
        &self,
        subject_id: &str,
        incident_id: u64,
        metadata: Map<String, Value>,
    ) -> Result<Incident, SessionError> {
        let mut entries = self.entries.write().map_err(|_| SessionError::StatePoisoned)?;

        let incident = entries
            .get_mut(subject_id)
            .and_then(|incidents| incidents.iter_mut().find(|i| i.id == incident_id))
            .ok_or_else(|| SessionError::UnknownIncident {
                subject_id: subject_id.to_string(),
                incident_id,
            })?;

        incident.metadata.extend(metadata);
        Ok(incident.clone())
    }
}
