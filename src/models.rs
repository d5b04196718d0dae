//! Data models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::VesselStoreError;

/// Maritime Mobile Service Identity (MMSI)
///
/// Exactly nine digits identifying a vessel. Used as the cache key, so the
/// value is taken verbatim: no trimming, no zero-padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Mmsi(String);

impl TryFrom<&str> for Mmsi {
    type Error = VesselStoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.len() != 9 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VesselStoreError::InvalidMmsi(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<String> for Mmsi {
    type Error = VesselStoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl Mmsi {
    /// Get the MMSI as stored
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Mmsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vessel report enriched with weather at the reported position
///
/// Field names follow the upstream document layout, so a JSON observation
/// can be deserialized as-is. `mmsi` is kept raw here and validated on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VesselObservation {
    /// Raw MMSI, empty if missing
    #[serde(default)]
    pub mmsi: String,
    /// IMO number
    pub imo: Option<i64>,
    /// Vessel name, display only
    pub name: Option<String>,
    /// Observation time reported by the vessel
    pub timestamp: Option<DateTime<Utc>>,
    /// Length in m
    pub length: Option<f64>,
    /// Width in m
    pub width: Option<f64>,
    /// Draft in m
    pub draft: Option<f64>,
    /// Course over ground in degrees
    pub cog: Option<f64>,
    /// Heading in degrees
    pub heading: Option<f64>,
    /// Latitude in WGS84 decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in WGS84 decimal degrees
    pub longitude: Option<f64>,
    /// Short weather code, e.g. `Clouds`
    pub weather: Option<String>,
    #[serde(rename = "weatherdescription")]
    pub weather_description: Option<String>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub windspeed: Option<f64>,
    pub rain: Option<String>,
    /// Cloud coverage in %
    pub clouds: Option<f64>,
}

impl VesselObservation {
    /// Observation with only the identity set
    pub fn new(mmsi: impl Into<String>) -> Self {
        Self {
            mmsi: mmsi.into(),
            ..Default::default()
        }
    }

    /// Validated MMSI of this observation
    pub fn mmsi(&self) -> Result<Mmsi, VesselStoreError> {
        Mmsi::try_from(self.mmsi.as_str())
    }
}

/// Latest known state of a vessel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedState {
    #[serde(flatten)]
    pub observation: VesselObservation,
    /// When this state was written to the cache
    #[serde(rename = "cachedAt")]
    pub cached_at: DateTime<Utc>,
}

/// One immutable record of the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Insertion sequence, breaks ties between equal `created_at`
    pub id: i64,
    #[serde(flatten)]
    pub observation: VesselObservation,
    /// Provenance, e.g. `API Fetch` or `User Query`
    pub message: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Result of a successful ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub cached: CachedState,
    pub history: HistoryEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filters for reading the history log
///
/// Ranges are half-open, `[from, until)`. Entries are ordered by
/// `created_at`, then by insertion sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryQuery {
    pub mmsi: Option<Mmsi>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_until: Option<DateTime<Utc>>,
    pub reported_from: Option<DateTime<Utc>>,
    pub reported_until: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: Option<u32>,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_vessel(mmsi: Mmsi) -> Self {
        Self {
            mmsi: Some(mmsi),
            ..Default::default()
        }
    }

    pub fn created_between(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_from = from;
        self.created_until = until;
        self
    }

    pub fn reported_between(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.reported_from = from;
        self.reported_until = until;
        self
    }

    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check an entry against the filters, ignoring order and limit
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        if let Some(mmsi) = &self.mmsi {
            if entry.observation.mmsi != mmsi.as_str() {
                return false;
            }
        }
        if !in_range(entry.created_at, self.created_from, self.created_until) {
            return false;
        }
        if self.reported_from.is_some() || self.reported_until.is_some() {
            // Entries without a report time never match a report-time range
            return match entry.observation.timestamp {
                Some(ts) => in_range(ts, self.reported_from, self.reported_until),
                None => false,
            };
        }
        true
    }
}

fn in_range(
    value: DateTime<Utc>,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> bool {
    from.map_or(true, |from| value >= from) && until.map_or(true, |until| value < until)
}
