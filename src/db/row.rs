use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, ValueRef};
use serde::{Serialize, Serializer};

/// A single cell value from a query result.
///
/// DuckDB reports a concrete type per column, but the pipeline treats every
/// cell as a tagged scalar so chart code can coerce without caring which
/// integer width the driver picked. Dates, times and timestamps are carried
/// as formatted date-text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Date(String),
    Null,
}

impl Scalar {
    pub fn from_value_ref(value: ValueRef<'_>) -> Scalar {
        match value {
            ValueRef::Null => Scalar::Null,
            ValueRef::Boolean(b) => Scalar::Int(b as i64),
            ValueRef::TinyInt(i) => Scalar::Int(i as i64),
            ValueRef::SmallInt(i) => Scalar::Int(i as i64),
            ValueRef::Int(i) => Scalar::Int(i as i64),
            ValueRef::BigInt(i) => Scalar::Int(i),
            ValueRef::HugeInt(i) => {
                Scalar::Int(i.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
            }
            ValueRef::UTinyInt(i) => Scalar::Int(i as i64),
            ValueRef::USmallInt(i) => Scalar::Int(i as i64),
            ValueRef::UInt(i) => Scalar::Int(i as i64),
            ValueRef::UBigInt(i) => Scalar::Int(i.min(i64::MAX as u64) as i64),
            ValueRef::Float(f) => Scalar::Float(f as f64),
            ValueRef::Double(f) => Scalar::Float(f),
            ValueRef::Decimal(d) => match d.to_string().parse::<f64>() {
                Ok(f) => Scalar::Float(f),
                Err(_) => Scalar::Text(d.to_string()),
            },
            ValueRef::Text(bytes) => Scalar::Text(String::from_utf8_lossy(bytes).to_string()),
            ValueRef::Blob(b) => Scalar::Text(format!("<blob {} bytes>", b.len())),
            ValueRef::Date32(days) => Scalar::Date(format_date32(days)),
            ValueRef::Time64(unit, v) => Scalar::Date(format_time64(unit, v)),
            ValueRef::Timestamp(unit, v) => Scalar::Date(format_timestamp(unit, v)),
            other => Scalar::Text(format!("{:?}", other)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Strict numeric view: typed numbers only.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Lossy cast used by the chart config builders: anything that is not a
    /// number, nulls included, becomes 0 rather than aborting the chart.
    pub fn to_f64_lossy(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }

    /// Display form used for category labels and sample data.
    pub fn to_display_string(&self) -> String {
        match self {
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) | Scalar::Date(s) => s.clone(),
            Scalar::Null => "NULL".to_string(),
        }
    }

    /// True for `Scalar::Date` and for text that parses as a calendar date
    /// or RFC 3339 timestamp.
    pub fn is_date_like(&self) -> bool {
        match self {
            Scalar::Date(_) => true,
            Scalar::Text(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                    || NaiveDate::parse_from_str(s, "%Y/%m/%d").is_ok()
                    || DateTime::parse_from_rfc3339(s).is_ok()
            }
            _ => false,
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Int(i) => serializer.serialize_i64(*i),
            Scalar::Float(f) => serializer.serialize_f64(*f),
            Scalar::Text(s) | Scalar::Date(s) => serializer.serialize_str(s),
            Scalar::Null => serializer.serialize_none(),
        }
    }
}

fn format_date32(days: i32) -> String {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| days.to_string())
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn format_time64(unit: TimeUnit, value: i64) -> String {
    let micros = to_micros(unit, value);
    let secs = (micros / 1_000_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| value.to_string())
}

fn format_timestamp(unit: TimeUnit, value: i64) -> String {
    DateTime::from_timestamp_micros(to_micros(unit, value))
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Normalized tabular query result: ordered column names plus one scalar per
/// cell. Every row shares the column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Scalar>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Rows projected as JSON objects keyed by column name, for API replies
    /// and LLM sample data.
    pub fn to_json_rows(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (name, cell) in self.columns.iter().zip(row) {
                    obj.insert(
                        name.clone(),
                        serde_json::to_value(cell).unwrap_or(serde_json::Value::Null),
                    );
                }
                obj
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion() {
        assert_eq!(Scalar::Int(5).as_f64(), Some(5.0));
        assert_eq!(Scalar::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Scalar::Text("3.5".into()).as_f64(), Some(3.5));
        assert_eq!(Scalar::Text("abc".into()).as_f64(), None);
        assert_eq!(Scalar::Null.as_f64(), None);
    }

    #[test]
    fn lossy_cast_degrades_to_zero() {
        assert_eq!(Scalar::Text("not a number".into()).to_f64_lossy(), 0.0);
        assert_eq!(Scalar::Null.to_f64_lossy(), 0.0);
        assert_eq!(Scalar::Int(7).to_f64_lossy(), 7.0);
    }

    #[test]
    fn date_likeness() {
        assert!(Scalar::Date("2024-01-01".into()).is_date_like());
        assert!(Scalar::Text("2024-01-31".into()).is_date_like());
        assert!(Scalar::Text("2024/01/31".into()).is_date_like());
        assert!(!Scalar::Text("yesterday".into()).is_date_like());
        assert!(!Scalar::Int(20240101).is_date_like());
    }

    #[test]
    fn result_set_lookups() {
        let rs = ResultSet::new(
            vec!["dept".into(), "count".into()],
            vec![
                vec![Scalar::Text("Eng".into()), Scalar::Int(5)],
                vec![Scalar::Text("Sales".into()), Scalar::Int(3)],
            ],
        );
        assert_eq!(rs.column_index("count"), Some(1));
        assert_eq!(rs.column_index("missing"), None);
        let values = rs.column_values("count").unwrap();
        assert_eq!(values, vec![&Scalar::Int(5), &Scalar::Int(3)]);

        let json = rs.to_json_rows();
        assert_eq!(json[0]["dept"], serde_json::json!("Eng"));
        assert_eq!(json[1]["count"], serde_json::json!(3));
    }
}
