//! Tracked equities and their ingestion status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a symbol stands in historical ingestion.
///
/// Batch and chunked population move a symbol from `NotStarted` to either
/// `Populated` or `NoDataAvailable`; both are terminal for those modes.
/// The explicit no-data tag keeps the chunked cursor from picking the same
/// empty symbol forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    NotStarted,
    Populated,
    #[serde(rename = "no_data")]
    NoDataAvailable,
}

impl IngestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestStatus::NotStarted => "not_started",
            IngestStatus::Populated => "populated",
            IngestStatus::NoDataAvailable => "no_data",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(IngestStatus::NotStarted),
            "populated" => Ok(IngestStatus::Populated),
            "no_data" => Ok(IngestStatus::NoDataAvailable),
            other => Err(format!("unknown ingest status '{other}'")),
        }
    }
}

/// A stored symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: i64,
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub ingest_status: IngestStatus,
}

/// Seed record for a symbol; immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSeed {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl SymbolSeed {
    pub fn new(ticker: &str, name: &str, sector: &str, industry: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
            sector: Some(sector.to_string()),
            industry: Some(industry.to_string()),
        }
    }
}
