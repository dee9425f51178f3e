//! Legacy `key: value | key: value` notes strings.
//!
//! Equipment rows carry a free-text notes column that older screens parse
//! as pipe-delimited pairs. Only the pairs we touch are rewritten; unknown
//! segments (text without a colon) survive untouched.

use std::fmt;

const SEPARATOR: &str = " | ";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Pair { key: String, value: String },
    Text(String),
}

/// Parsed notes string.
///
/// # Examples
/// ```
/// use commissioning_backend::domain::measurements::PipeRecord;
///
/// let mut record = PipeRecord::parse("voc: 810 | isc: 9.1");
/// record.upsert("isc", "9.3");
/// record.upsert("polarity", "ok");
/// assert_eq!(record.to_string(), "voc: 810 | isc: 9.3 | polarity: ok");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipeRecord {
    segments: Vec<Segment>,
}

impl PipeRecord {
    /// Parse a notes string. Empty segments are dropped.
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('|')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once(':') {
                Some((key, value)) if !key.trim().is_empty() => Segment::Pair {
                    key: key.trim().to_owned(),
                    value: value.trim().to_owned(),
                },
                _ => Segment::Text(segment.to_owned()),
            })
            .collect();
        Self { segments }
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Pair { key: k, value } if k.eq_ignore_ascii_case(key) => {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    /// Set `key` to `value`, keeping its position or appending it.
    pub fn upsert(&mut self, key: &str, value: &str) {
        let existing = self.segments.iter_mut().find_map(|segment| match segment {
            Segment::Pair { key: k, value } if k.eq_ignore_ascii_case(key) => Some(value),
            _ => None,
        });
        match existing {
            Some(slot) => value.clone_into(slot),
            None => self.segments.push(Segment::Pair {
                key: key.to_owned(),
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for PipeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(SEPARATOR)?;
            }
            match segment {
                Segment::Pair { key, value } => write!(f, "{key}: {value}")?,
                Segment::Text(text) => f.write_str(text)?,
            }
        }
        Ok(())
    }
}
