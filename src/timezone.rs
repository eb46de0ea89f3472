// Windows / IANA timezone mapping
// Bidirectional lookup over the CLDR windowsZones table

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use thiserror::Error;

const BUNDLED_MAPPING: &str = include_str!("../data/windows_zones.csv");

/// Territory code of the default IANA zone for a Windows id.
const WORLD_TERRITORY: &str = "001";

static GLOBAL: Lazy<TimeZoneConverter> = Lazy::new(|| {
    TimeZoneConverter::from_mapping(BUNDLED_MAPPING).unwrap_or_else(|e| {
        tracing::error!(error = %e, "bundled timezone mapping is malformed");
        TimeZoneConverter::default()
    })
});

/// Timezone table errors
#[derive(Error, Debug)]
pub enum TimeZoneError {
    #[error("malformed timezone mapping at line {line}: {row}")]
    Malformed { line: usize, row: String },

    #[error("failed to read timezone mapping: {0}")]
    Io(#[from] std::io::Error),
}

/// Windows ⇄ IANA timezone id converter.
#[derive(Debug, Default, Clone)]
pub struct TimeZoneConverter {
    iana_to_windows: HashMap<String, String>,
    /// Keyed `territory|windowsId`.
    windows_to_iana: HashMap<String, String>,
    valid: HashSet<String>,
}

impl TimeZoneConverter {
    /// The table shipped with the crate, loaded on first use.
    pub fn global() -> &'static TimeZoneConverter {
        &GLOBAL
    }

    /// Load rows of `Windows id,territory,IANA ids` where the IANA ids are
    /// space separated. Blank lines are skipped.
    pub fn from_mapping(mapping: &str) -> Result<TimeZoneConverter, TimeZoneError> {
        let mut converter = TimeZoneConverter::default();
        let mut rows = 0;
        for (index, line) in mapping.lines().enumerate() {
            let row = line.trim();
            if row.is_empty() {
                continue;
            }
            let malformed = || TimeZoneError::Malformed {
                line: index + 1,
                row: row.to_string(),
            };
            let mut fields = row.splitn(3, ',');
            let (Some(windows), Some(territory), Some(ianas)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(malformed());
            };
            let (windows, territory) = (windows.trim(), territory.trim());
            let ianas: Vec<&str> = ianas.split_whitespace().collect();
            if windows.is_empty() || territory.is_empty() || ianas.is_empty() {
                return Err(malformed());
            }

            converter
                .windows_to_iana
                .entry(format!("{}|{}", territory, windows))
                .or_insert_with(|| ianas[0].to_string());
            for iana in &ianas {
                converter
                    .iana_to_windows
                    .entry(iana.to_string())
                    .or_insert_with(|| windows.to_string());
                converter.valid.insert(iana.to_string());
            }
            converter.valid.insert(windows.to_string());
            rows += 1;
        }
        tracing::debug!(rows, zones = converter.valid.len(), "loaded timezone mapping");
        Ok(converter)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<TimeZoneConverter, TimeZoneError> {
        let mapping = std::fs::read_to_string(path)?;
        Self::from_mapping(&mapping)
    }

    /// Windows id for an IANA id; unknown ids come back unchanged.
    pub fn iana_to_windows<'a>(&'a self, iana: &'a str) -> &'a str {
        self.iana_to_windows.get(iana).map_or(iana, String::as_str)
    }

    /// Default IANA id for a Windows id; unknown ids come back unchanged.
    pub fn windows_to_iana<'a>(&'a self, windows: &'a str) -> &'a str {
        self.windows_to_iana
            .get(&format!("{}|{}", WORLD_TERRITORY, windows))
            .map_or(windows, String::as_str)
    }

    /// Whether `id` is a known Windows or IANA id.
    pub fn verify_time_zone_str(&self, id: &str) -> bool {
        self.valid.contains(id)
    }

    /// Resolve a Windows or IANA id to a chrono-tz zone.
    pub fn resolve(&self, id: &str) -> Option<Tz> {
        if !self.verify_time_zone_str(id) && id.parse::<Tz>().is_err() {
            return None;
        }
        self.windows_to_iana(id).parse::<Tz>().ok()
    }
}
