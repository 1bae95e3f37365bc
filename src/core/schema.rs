//! Field-level validation of untyped JSON documents.
//!
//! `FieldReader` walks a JSON object field by field and records every
//! violation instead of stopping at the first one, so a rejected document
//! reports all of its problems at once.

use crate::core::error::{FieldViolation, SchemaError, ViolationKind};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Collects violations while reading fields out of a JSON object.
#[derive(Debug)]
pub(crate) struct FieldReader<'a> {
    entity: &'static str,
    object: Option<&'a Map<String, Value>>,
    violations: Vec<FieldViolation>,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(entity: &'static str, value: &'a Value) -> Self {
        let mut reader = Self {
            entity,
            object: value.as_object(),
            violations: Vec::new(),
        };
        if reader.object.is_none() {
            reader.fail("$", ViolationKind::WrongType { expected: "object" });
        }
        reader
    }

    /// Consumes the reader, failing if any violation was recorded.
    pub(crate) fn finish(self) -> Result<(), SchemaError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::new(self.entity, self.violations))
        }
    }

    pub(crate) fn fail(&mut self, field: impl Into<String>, kind: ViolationKind) {
        self.violations.push(FieldViolation::new(field, kind));
    }

    /// Absent and explicit `null` are treated alike.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.object
            .and_then(|object| object.get(field))
            .filter(|value| !value.is_null())
    }

    fn wrong_type(&mut self, field: &str, expected: &'static str) {
        self.fail(field, ViolationKind::WrongType { expected });
    }

    pub(crate) fn required_str(&mut self, field: &str) -> Option<String> {
        // A missing object was already reported against the root.
        if self.object.is_none() {
            return None;
        }
        match self.get(field) {
            None => {
                self.fail(field, ViolationKind::Missing);
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.fail(field, ViolationKind::Empty);
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.wrong_type(field, "string");
                None
            }
        }
    }

    pub(crate) fn optional_str(&mut self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.wrong_type(field, "string");
                None
            }
        }
    }

    pub(crate) fn bool_or(&mut self, field: &str, default: bool) -> bool {
        match self.get(field) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                self.wrong_type(field, "boolean");
                default
            }
        }
    }

    pub(crate) fn optional_u32(&mut self, field: &str, min: u32) -> Option<u32> {
        let value = self.get(field)?;
        let Some(number) = value.as_i64() else {
            self.wrong_type(field, "integer");
            return None;
        };
        match u32::try_from(number) {
            Ok(n) if n >= min => Some(n),
            _ => {
                self.fail(
                    field,
                    ViolationKind::OutOfRange {
                        range: format!("integer >= {min}"),
                    },
                );
                None
            }
        }
    }

    pub(crate) fn u32_or(&mut self, field: &str, default: u32, min: u32) -> u32 {
        self.optional_u32(field, min).unwrap_or(default)
    }

    pub(crate) fn optional_f64_in(&mut self, field: &str, lo: f64, hi: f64) -> Option<f64> {
        let value = self.get(field)?;
        let Some(number) = value.as_f64() else {
            self.wrong_type(field, "number");
            return None;
        };
        if (lo..=hi).contains(&number) {
            Some(number)
        } else {
            self.fail(
                field,
                ViolationKind::OutOfRange {
                    range: format!("{lo}..={hi}"),
                },
            );
            None
        }
    }

    pub(crate) fn f64_in_or(&mut self, field: &str, default: f64, lo: f64, hi: f64) -> f64 {
        self.optional_f64_in(field, lo, hi).unwrap_or(default)
    }

    pub(crate) fn optional_enum<T: FromStr>(
        &mut self,
        field: &str,
        allowed: &'static [&'static str],
    ) -> Option<T> {
        let value = self.get(field)?;
        let Some(text) = value.as_str() else {
            self.wrong_type(field, "string");
            return None;
        };
        match text.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.fail(
                    field,
                    ViolationKind::NotInEnumeration {
                        value: text.to_string(),
                        allowed,
                    },
                );
                None
            }
        }
    }

    pub(crate) fn required_enum<T: FromStr>(
        &mut self,
        field: &str,
        allowed: &'static [&'static str],
    ) -> Option<T> {
        if self.object.is_some() && self.get(field).is_none() {
            self.fail(field, ViolationKind::Missing);
            return None;
        }
        self.optional_enum(field, allowed)
    }

    pub(crate) fn enum_or<T: FromStr>(
        &mut self,
        field: &str,
        allowed: &'static [&'static str],
        default: T,
    ) -> T {
        self.optional_enum(field, allowed).unwrap_or(default)
    }

    pub(crate) fn optional_timestamp(&mut self, field: &str) -> Option<DateTime<Utc>> {
        let value = self.get(field)?;
        let parsed = value.as_str().and_then(parse_timestamp);
        if parsed.is_none() {
            self.wrong_type(field, "ISO 8601 timestamp");
        }
        parsed
    }

    pub(crate) fn string_set(&mut self, field: &str) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        for (index, item) in self.array(field).into_iter().enumerate() {
            match item {
                Value::String(s) => {
                    set.insert(s.clone());
                }
                _ => self.wrong_type(&format!("{field}[{index}]"), "string"),
            }
        }
        set
    }

    pub(crate) fn port_set(&mut self, field: &str) -> BTreeSet<u16> {
        let mut set = BTreeSet::new();
        for (index, item) in self.array(field).into_iter().enumerate() {
            let path = format!("{field}[{index}]");
            match item.as_i64() {
                Some(n) => match u16::try_from(n) {
                    Ok(port) => {
                        set.insert(port);
                    }
                    Err(_) => self.fail(
                        path,
                        ViolationKind::OutOfRange {
                            range: "0..=65535".into(),
                        },
                    ),
                },
                None => self.wrong_type(&path, "integer"),
            }
        }
        set
    }

    pub(crate) fn string_map(&mut self, field: &str) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (key, item) in self.object_field(field) {
            match item {
                Value::String(s) => {
                    map.insert(key.clone(), s.clone());
                }
                _ => self.wrong_type(&format!("{field}.{key}"), "string"),
            }
        }
        map
    }

    pub(crate) fn array(&mut self, field: &str) -> Vec<&'a Value> {
        match self.get(field) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(_) => {
                self.wrong_type(field, "array");
                Vec::new()
            }
        }
    }

    pub(crate) fn object_field(&mut self, field: &str) -> Vec<(&'a String, &'a Value)> {
        match self.get(field) {
            None => Vec::new(),
            Some(Value::Object(map)) => map.iter().collect(),
            Some(_) => {
                self.wrong_type(field, "object");
                Vec::new()
            }
        }
    }
}

/// Parses RFC 3339, falling back to offset-less ISO 8601 read as UTC.
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}
