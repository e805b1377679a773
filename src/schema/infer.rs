//! Column type inference from a single sample value.

use crate::types::{ColumnType, RawValue};

/// Pick the storage type for a column from its value in the sample row.
///
/// Precedence: integral number, other number, date/time, boolean, then text. Empty cells and
/// strings fall through to [`ColumnType::Text`]. Only one value is consulted, so a later row that
/// does not fit the chosen type fails at insertion time.
pub fn infer_column_type(sample: &RawValue) -> ColumnType {
    match sample {
        RawValue::Int(_) => ColumnType::Integer,
        RawValue::Float(f) if f.is_finite() && f.fract() == 0.0 => ColumnType::Integer,
        RawValue::Float(_) => ColumnType::Numeric,
        RawValue::DateTime(_) => ColumnType::Timestamp,
        RawValue::Bool(_) => ColumnType::Boolean,
        RawValue::Text(_) | RawValue::Empty => ColumnType::Text,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::infer_column_type;
    use crate::types::{ColumnType, RawValue};

    #[test]
    fn numbers_split_on_fractional_part() {
        assert_eq!(infer_column_type(&RawValue::Int(42)), ColumnType::Integer);
        assert_eq!(infer_column_type(&RawValue::Float(42.0)), ColumnType::Integer);
        assert_eq!(infer_column_type(&RawValue::Float(42.5)), ColumnType::Numeric);
        assert_eq!(infer_column_type(&RawValue::Float(f64::NAN)), ColumnType::Numeric);
    }

    #[test]
    fn bool_and_datetime() {
        assert_eq!(infer_column_type(&RawValue::Bool(true)), ColumnType::Boolean);
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(infer_column_type(&RawValue::DateTime(dt)), ColumnType::Timestamp);
    }

    #[test]
    fn text_and_empty_fall_back_to_text() {
        assert_eq!(infer_column_type(&RawValue::Text("abc".to_string())), ColumnType::Text);
        assert_eq!(infer_column_type(&RawValue::Text("42".to_string())), ColumnType::Text);
        assert_eq!(infer_column_type(&RawValue::Text(String::new())), ColumnType::Text);
        assert_eq!(infer_column_type(&RawValue::Empty), ColumnType::Text);
    }
}
