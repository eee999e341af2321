//! Column mapping tables: how one CSV row becomes one row of column values.

use std::collections::HashMap;

use csv::StringRecord;

use crate::types::SqlValue;

/// How a cell's text is turned into a value.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Free text; absent → NULL.
    Text,
    /// Whole number; absent → NULL.
    Integer,
    /// Decimal number; absent → 0.
    Decimal,
    /// Fixed vocabulary, matched trimmed and case-insensitively.
    /// Unrecognized or absent values fall back to `default`.
    Enum {
        map: &'static [(&'static str, &'static str)],
        default: &'static str,
    },
    /// Lowercased text; absent → `default`.
    LowerText { default: &'static str },
}

/// Check applied after conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Optional,
    Required,
    /// Must be greater than zero.
    Positive,
    /// Zero means unset; anything else must be greater than zero.
    PositiveIfSet,
    /// Must contain `@` when present.
    Email,
}

/// One canonical field: where it comes from and what it must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub column: &'static str,
    pub label: &'static str,
    /// Accepted source headers, in priority order.
    pub sources: &'static [&'static str],
    pub kind: FieldKind,
    pub rule: Rule,
}

impl FieldSpec {
    pub const fn new(
        column: &'static str,
        label: &'static str,
        sources: &'static [&'static str],
        kind: FieldKind,
        rule: Rule,
    ) -> Self {
        Self {
            column,
            label,
            sources,
            kind,
            rule,
        }
    }
}

/// Header name → field position, built once per file.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &StringRecord) -> Self {
        let mut positions = HashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            positions.entry(name.trim().to_string()).or_insert(i);
        }
        Self { positions }
    }

    /// First non-empty cell among `sources`.
    pub fn resolve<'r>(&self, record: &'r StringRecord, sources: &[&str]) -> Option<&'r str> {
        sources
            .iter()
            .filter_map(|name| self.positions.get(*name))
            .filter_map(|&i| record.get(i))
            .map(str::trim)
            .find(|cell| !cell.is_empty())
    }
}

/// A mapped row: column values in field order, plus any problems found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRecord {
    pub values: Vec<(&'static str, SqlValue)>,
    pub problems: Vec<String>,
}

impl MappedRecord {
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Map and validate one row against `fields`.
pub fn map_record(fields: &[FieldSpec], headers: &HeaderIndex, record: &StringRecord) -> MappedRecord {
    let mut mapped = MappedRecord::default();
    for field in fields {
        let raw = headers.resolve(record, field.sources);
        let before = mapped.problems.len();
        let value = convert(field, raw, &mut mapped.problems);
        if mapped.problems.len() == before {
            check(field, raw, &value, &mut mapped.problems);
        }
        mapped.values.push((field.column, value));
    }
    mapped
}

fn convert(field: &FieldSpec, raw: Option<&str>, problems: &mut Vec<String>) -> SqlValue {
    match (field.kind, raw) {
        (FieldKind::Text, Some(cell)) => SqlValue::Text(cell.to_string()),
        (FieldKind::Text, None) | (FieldKind::Integer, None) => SqlValue::Null,
        (FieldKind::Integer, Some(cell)) => match cell.parse::<i64>() {
            Ok(n) => SqlValue::Int64(n),
            Err(_) => {
                problems.push(format!("{} must be a number", field.label));
                SqlValue::Null
            }
        },
        (FieldKind::Decimal, None) => SqlValue::Float64(0.0),
        (FieldKind::Decimal, Some(cell)) => match cell.parse::<f64>() {
            Ok(n) if n.is_finite() => SqlValue::Float64(n),
            _ => {
                problems.push(format!("{} must be a number", field.label));
                SqlValue::Float64(0.0)
            }
        },
        (FieldKind::Enum { map, default }, raw) => {
            let mapped = raw.and_then(|cell| {
                map.iter()
                    .find(|(source, _)| source.eq_ignore_ascii_case(cell))
                    .map(|(_, canonical)| *canonical)
            });
            SqlValue::Text(mapped.unwrap_or(default).to_string())
        }
        (FieldKind::LowerText { default }, raw) => {
            SqlValue::Text(raw.map_or_else(|| default.to_string(), str::to_lowercase))
        }
    }
}

fn check(field: &FieldSpec, raw: Option<&str>, value: &SqlValue, problems: &mut Vec<String>) {
    match field.rule {
        Rule::Optional => {}
        Rule::Required => {
            if raw.is_none() {
                problems.push(format!("{} is required", field.label));
            }
        }
        Rule::Positive => {
            if value.as_f64().is_some_and(|n| n <= 0.0) {
                problems.push(format!("{} must be positive", field.label));
            }
        }
        Rule::PositiveIfSet => {
            if value.as_f64().is_some_and(|n| n < 0.0) {
                problems.push(format!("{} must be positive", field.label));
            }
        }
        Rule::Email => {
            if raw.is_some_and(|email| !email.contains('@')) {
                problems.push("Invalid email format".to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: &[(&str, &str)] = &[("Mixed Use", "mixed-use"), ("Retail", "retail")];

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::new("name", "Name", &["PropertyName", "name"], FieldKind::Text, Rule::Required),
        FieldSpec::new(
            "type",
            "Type",
            &["PropertyType", "type"],
            FieldKind::Enum {
                map: KINDS,
                default: "office",
            },
            Rule::Optional,
        ),
        FieldSpec::new("area", "Area", &["TotalSQM"], FieldKind::Decimal, Rule::PositiveIfSet),
        FieldSpec::new("rent", "Rent", &["Rent"], FieldKind::Decimal, Rule::Positive),
        FieldSpec::new("email", "Email", &["Email"], FieldKind::Text, Rule::Email),
    ];

    fn map(headers: &[&str], row: &[&str]) -> MappedRecord {
        let index = HeaderIndex::new(&StringRecord::from(headers.to_vec()));
        map_record(FIELDS, &index, &StringRecord::from(row.to_vec()))
    }

    #[test]
    fn test_first_non_empty_source_wins() {
        let record = map(
            &["PropertyName", "name", "Rent"],
            &["", "Fallback Tower", "10"],
        );
        assert_eq!(record.get("name"), Some(&SqlValue::Text("Fallback Tower".to_string())));
        assert!(record.is_valid());
    }

    #[test]
    fn test_enum_matching_and_default() {
        let record = map(&["name", "type", "Rent"], &["A", "  mixed use ", "1"]);
        assert_eq!(record.get("type"), Some(&SqlValue::Text("mixed-use".to_string())));

        let record = map(&["name", "type", "Rent"], &["A", "Castle", "1"]);
        assert_eq!(record.get("type"), Some(&SqlValue::Text("office".to_string())));
        assert!(record.is_valid());
    }

    #[test]
    fn test_numeric_defaults_and_rules() {
        let record = map(&["name", "Rent"], &["A", "0"]);
        assert_eq!(record.get("area"), Some(&SqlValue::Float64(0.0)));
        assert_eq!(record.problems, vec!["Rent must be positive".to_string()]);

        let record = map(&["name", "TotalSQM", "Rent"], &["A", "-5", "abc"]);
        assert_eq!(
            record.problems,
            vec![
                "Area must be positive".to_string(),
                "Rent must be a number".to_string(),
            ]
        );
    }

    #[test]
    fn test_required_and_email() {
        let record = map(&["Email", "Rent"], &["nobody", "1"]);
        assert_eq!(
            record.problems,
            vec!["Name is required".to_string(), "Invalid email format".to_string()]
        );
    }
}
