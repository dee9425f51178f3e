//! Per-string measurement entries stored inside a draft payload.
//!
//! Commissioning forms keep one entry per inverter string under the
//! `mppt_data` payload field. Each entry is a JSON object addressed by the
//! composite key (`inverter_index`, `mppt`, `string_num`) and carrying the
//! editable fields in [`MeasurementField`]. Values are kept exactly as the
//! caller typed them: no numeric coercion or locale normalisation happens
//! here, so consumers must not assume the fields are numbers.

mod pipe_record;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use pipe_record::PipeRecord;

use super::DraftPayload;

/// Payload field holding the measurement entries.
pub const MEASUREMENTS_FIELD: &str = "mppt_data";
/// Entry field holding the inverter index.
pub const INVERTER_INDEX_FIELD: &str = "inverter_index";
/// Entry field holding the MPPT (tracker) number.
pub const MPPT_FIELD: &str = "mppt";
/// Entry field holding the string number.
pub const STRING_NUM_FIELD: &str = "string_num";

/// Composite key addressing one string's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasurementKey {
    /// Position of the inverter within the report.
    pub inverter_index: u32,
    /// Tracker number on the inverter.
    pub mppt: u32,
    /// String number on the tracker.
    pub string_num: u32,
}

impl MeasurementKey {
    /// Build a key.
    pub const fn new(inverter_index: u32, mppt: u32, string_num: u32) -> Self {
        Self {
            inverter_index,
            mppt,
            string_num,
        }
    }

    /// Whether a stored entry carries this key.
    ///
    /// Legacy forms stored the key fields as strings, so numeric strings
    /// match too.
    pub fn matches(&self, entry: &Map<String, Value>) -> bool {
        key_part(entry, INVERTER_INDEX_FIELD) == Some(self.inverter_index)
            && key_part(entry, MPPT_FIELD) == Some(self.mppt)
            && key_part(entry, STRING_NUM_FIELD) == Some(self.string_num)
    }
}

fn key_part(entry: &Map<String, Value>, field: &str) -> Option<u32> {
    match entry.get(field)? {
        Value::Number(number) => number.as_u64().and_then(|raw| u32::try_from(raw).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

impl fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inverter {} / MPPT {} / string {}",
            self.inverter_index, self.mppt, self.string_num
        )
    }
}

/// Editable fields of a string measurement entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementField {
    /// Open-circuit voltage.
    Voc,
    /// Short-circuit current.
    Isc,
    /// Voltage at maximum power.
    Vmp,
    /// Current at maximum power.
    Imp,
    /// Insulation resistance, positive pole to earth.
    InsulationPos,
    /// Insulation resistance, negative pole to earth.
    InsulationNeg,
    /// Polarity check result.
    Polarity,
    /// Irradiance at measurement time.
    Irradiance,
    /// Module temperature at measurement time.
    ModuleTemp,
    /// Free-text remarks.
    Notes,
}

impl MeasurementField {
    /// Every editable field, in display order.
    pub const ALL: [Self; 10] = [
        Self::Voc,
        Self::Isc,
        Self::Vmp,
        Self::Imp,
        Self::InsulationPos,
        Self::InsulationNeg,
        Self::Polarity,
        Self::Irradiance,
        Self::ModuleTemp,
        Self::Notes,
    ];

    /// Field name as stored in the payload.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Voc => "voc",
            Self::Isc => "isc",
            Self::Vmp => "vmp",
            Self::Imp => "imp",
            Self::InsulationPos => "insulation_pos",
            Self::InsulationNeg => "insulation_neg",
            Self::Polarity => "polarity",
            Self::Irradiance => "irradiance",
            Self::ModuleTemp => "module_temp",
            Self::Notes => "notes",
        }
    }
}

impl fmt::Display for MeasurementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a field name is outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown measurement field: {name}")]
pub struct UnknownMeasurementField {
    /// Rejected name.
    pub name: String,
}

impl FromStr for MeasurementField {
    type Err = UnknownMeasurementField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownMeasurementField { name: s.to_owned() })
    }
}

/// Build an entry for `key` with every editable field blank.
pub fn blank_entry(key: MeasurementKey) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert(INVERTER_INDEX_FIELD.to_owned(), Value::from(key.inverter_index));
    entry.insert(MPPT_FIELD.to_owned(), Value::from(key.mppt));
    entry.insert(STRING_NUM_FIELD.to_owned(), Value::from(key.string_num));
    for field in MeasurementField::ALL {
        entry.insert(field.as_str().to_owned(), Value::String(String::new()));
    }
    entry
}

/// Replace the whole measurement collection.
///
/// Entries missing from `entries` are gone afterwards.
pub fn apply_batch(payload: &mut DraftPayload, entries: Vec<Value>) {
    payload.insert(MEASUREMENTS_FIELD, Value::Array(entries));
}

/// Outcome of a single-field update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate {
    /// An existing entry was edited in place.
    Updated,
    /// No entry matched, so a blank one was appended first.
    Synthesized,
}

/// Overwrite one field of the entry addressed by `key`.
///
/// All other fields of the entry and all other entries are left as they
/// were. When no entry matches, a blank entry (see [`blank_entry`]) is
/// appended and the field is set on it. A missing or non-array collection
/// is treated as empty.
///
/// # Examples
/// ```
/// use commissioning_backend::domain::DraftPayload;
/// use commissioning_backend::domain::measurements::{
///     FieldUpdate, MeasurementField, MeasurementKey, apply_field,
/// };
/// use serde_json::json;
///
/// let mut payload = DraftPayload::new();
/// let key = MeasurementKey::new(0, 1, 2);
/// let outcome = apply_field(&mut payload, key, MeasurementField::Voc, "812,4");
/// assert_eq!(outcome, FieldUpdate::Synthesized);
/// assert_eq!(payload.get("mppt_data").and_then(|v| v[0].get("voc")), Some(&json!("812,4")));
/// ```
pub fn apply_field(
    payload: &mut DraftPayload,
    key: MeasurementKey,
    field: MeasurementField,
    value: &str,
) -> FieldUpdate {
    let mut entries = match payload.insert(MEASUREMENTS_FIELD, Value::Null) {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };

    let existing = entries.iter_mut().find_map(|entry| match entry {
        Value::Object(map) if key.matches(map) => Some(map),
        _ => None,
    });
    let outcome = if let Some(entry) = existing {
        entry.insert(field.as_str().to_owned(), Value::String(value.to_owned()));
        FieldUpdate::Updated
    } else {
        let mut entry = blank_entry(key);
        entry.insert(field.as_str().to_owned(), Value::String(value.to_owned()));
        entries.push(Value::Object(entry));
        FieldUpdate::Synthesized
    };

    payload.insert(MEASUREMENTS_FIELD, Value::Array(entries));
    outcome
}
