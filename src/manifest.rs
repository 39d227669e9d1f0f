//! In-memory record of the artifacts a run produced
//!
//! Aggregation steps read the manifest rather than globbing the filesystem,
//! so a year's time series contains exactly the months this run produced.

use serde::Serialize;
use std::path::PathBuf;

/// Monthly 2D file produced for one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyArtifact {
    pub month: u32,
    pub path: PathBuf,
}

/// Outcome of one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearRecord {
    pub year: i32,
    /// Produced monthly files in month order
    pub months: Vec<MonthlyArtifact>,
    /// Months whose input file was absent
    pub skipped_months: Vec<u32>,
    /// Annual-mean file, if the year had any monthly output
    pub annual: Option<PathBuf>,
}

impl YearRecord {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            months: Vec::new(),
            skipped_months: Vec::new(),
            annual: None,
        }
    }

    pub fn push_month(&mut self, month: u32, path: PathBuf) {
        self.months.push(MonthlyArtifact { month, path });
    }

    pub fn skip_month(&mut self, month: u32) {
        self.skipped_months.push(month);
    }

    /// Monthly files in chronological order
    pub fn monthly_files(&self) -> Vec<&PathBuf> {
        self.months.iter().map(|m| &m.path).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// All years of a run, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunManifest {
    pub years: Vec<YearRecord>,
}

impl RunManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: YearRecord) {
        self.years.push(record);
    }

    /// Annual-mean files in chronological order
    pub fn annual_files(&self) -> Vec<&PathBuf> {
        self.years.iter().filter_map(|y| y.annual.as_ref()).collect()
    }

    pub fn year(&self, year: i32) -> Option<&YearRecord> {
        self.years.iter().find(|y| y.year == year)
    }

    pub fn months_processed(&self) -> usize {
        self.years.iter().map(|y| y.months.len()).sum()
    }

    pub fn months_skipped(&self) -> usize {
        self.years.iter().map(|y| y.skipped_months.len()).sum()
    }
}
