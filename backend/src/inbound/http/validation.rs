//! Lenient parsing of legacy form values.
//!
//! The portal's browser forms post identifiers either as JSON numbers or as
//! numeric strings, depending on which screen built the request. Both are
//! accepted here; anything else becomes a `400` with the offending field in
//! the error details.

use serde_json::{Value, json};

use crate::domain::{Error, MeasurementField, ReportId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidInteger,
    UnknownField,
    InvalidValue,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidInteger => "invalid_integer",
            ErrorCode::UnknownField => "unknown_field",
            ErrorCode::InvalidValue => "invalid_value",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

pub(crate) const REPORT_ID: FieldName = FieldName::new("report_id");
pub(crate) const INVERTER_INDEX: FieldName = FieldName::new("inverter_index");
pub(crate) const MPPT: FieldName = FieldName::new("mppt");
pub(crate) const STRING_NUM: FieldName = FieldName::new("string_num");
pub(crate) const FIELD: FieldName = FieldName::new("field");
pub(crate) const VALUE: FieldName = FieldName::new("value");
pub(crate) const MPPT_DATA: FieldName = FieldName::new("mppt_data");

fn field_error(field: FieldName, code: ErrorCode, message: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

fn missing(field: FieldName) -> Error {
    field_error(
        field,
        ErrorCode::MissingField,
        format!("missing required field: {}", field.as_str()),
    )
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn integer(field: FieldName, value: &Value) -> Result<i64, Error> {
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        field_error(
            field,
            ErrorCode::InvalidInteger,
            format!("{} must be an integer", field.as_str()),
        )
    })
}

fn report_id_from(value: &Value) -> Result<ReportId, Error> {
    let raw = integer(REPORT_ID, value)?;
    ReportId::new(raw).map_err(|_| {
        field_error(
            REPORT_ID,
            ErrorCode::InvalidInteger,
            "report_id must be a positive integer".to_owned(),
        )
    })
}

/// Report id of a draft save; absent, `null` and `""` mean "no report yet".
pub(crate) fn optional_report_id(value: Option<&Value>) -> Result<Option<ReportId>, Error> {
    match value {
        None => Ok(None),
        Some(value) if is_blank(value) => Ok(None),
        Some(value) => report_id_from(value).map(Some),
    }
}

/// Report id required by measurement updates.
pub(crate) fn required_report_id(value: Option<&Value>) -> Result<ReportId, Error> {
    optional_report_id(value)?.ok_or_else(|| missing(REPORT_ID))
}

/// Non-negative index such as `inverter_index`, `mppt` or `string_num`.
pub(crate) fn key_part(field: FieldName, value: Option<&Value>) -> Result<u32, Error> {
    let value = value.filter(|value| !is_blank(value)).ok_or_else(|| missing(field))?;
    let raw = integer(field, value)?;
    u32::try_from(raw).map_err(|_| {
        field_error(
            field,
            ErrorCode::InvalidInteger,
            format!("{} must be a non-negative integer", field.as_str()),
        )
    })
}

/// One of the fixed measurement field names.
pub(crate) fn measurement_field(name: &str) -> Result<MeasurementField, Error> {
    name.trim()
        .parse::<MeasurementField>()
        .map_err(|err| field_error(FIELD, ErrorCode::UnknownField, err.to_string()))
}

/// Measurement value kept verbatim; numbers are rendered with their JSON
/// spelling and `null` clears the field.
pub(crate) fn measurement_value(value: &Value) -> Result<String, Error> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(field_error(
            VALUE,
            ErrorCode::InvalidValue,
            "value must be a string or a number".to_owned(),
        )),
    }
}

/// Batch entries are required and must be JSON objects; the first offender
/// is reported by index.
pub(crate) fn measurement_entries(entries: Option<Vec<Value>>) -> Result<Vec<Value>, Error> {
    let entries = entries.ok_or_else(|| missing(MPPT_DATA))?;
    match entries.iter().position(|entry| !entry.is_object()) {
        None => Ok(entries),
        Some(index) => Err(Error::invalid_request(format!(
            "mppt_data[{index}] must be an object"
        ))
        .with_details(json!({
            "field": MPPT_DATA.as_str(),
            "index": index,
            "code": ErrorCode::InvalidValue.as_str(),
        }))),
    }
}
