use std::collections::HashMap;

use crate::driver::{ColumnMeta, TypeFamily};
use crate::error::DecodeError;
use crate::types::SqlValue;

use super::value::FromValue;
use super::mismatch;

/// Column name to value map built from one row, without a declared record type.
pub type Record = HashMap<String, SqlValue>;

/// Scan plan for dynamic records: the type family of every column, resolved once per
/// result set.
///
/// A column the driver reports no type for (such as an expression that only produced NULL) has
/// no family; its NULL cells decode to `SqlValue::Null` and any other cell is rejected.
pub(super) struct DynamicPlan<'c> {
    columns: &'c [ColumnMeta],
    families: Vec<Option<TypeFamily>>,
}

fn unsupported(column: &ColumnMeta) -> DecodeError {
    DecodeError::UnsupportedColumnType {
        column: column.name.clone(),
        type_name: column.database_type.clone().unwrap_or_default(),
    }
}

impl<'c> DynamicPlan<'c> {
    pub(super) fn new(columns: &'c [ColumnMeta]) -> Result<Self, DecodeError> {
        let families = columns
            .iter()
            .map(|col| match (col.family(), &col.database_type) {
                (Some(family), _) => Ok(Some(family)),
                (None, None) => Ok(None),
                (None, Some(_)) => Err(unsupported(col)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns, families })
    }

    /// Scan `row` into `dest`. Nothing is written unless every cell converts.
    pub(super) fn fill(&self, row: Vec<SqlValue>, dest: &mut Record) -> Result<(), DecodeError> {
        if row.len() != self.columns.len() {
            return Err(DecodeError::ColumnCount {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        let mut scanned = Vec::with_capacity(row.len());
        for ((column, family), value) in self.columns.iter().zip(&self.families).zip(row) {
            scanned.push((column.name.clone(), scan_family(column, *family, value)?));
        }
        dest.extend(scanned);
        Ok(())
    }
}

fn scan_family(
    column: &ColumnMeta,
    family: Option<TypeFamily>,
    value: SqlValue,
) -> Result<SqlValue, DecodeError> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    let Some(family) = family else {
        return Err(unsupported(column));
    };
    let scanned = match family {
        TypeFamily::Text => match value {
            SqlValue::Text(_) => Ok(value),
            other => String::from_value(&other).map(SqlValue::Text),
        },
        TypeFamily::Integer => i64::from_value(&value).map(SqlValue::Int),
        TypeFamily::Boolean => bool::from_value(&value).map(SqlValue::Bool),
    };
    scanned.map_err(|m| mismatch(column, m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnMeta> {
        vec![
            ColumnMeta::new("id", Some("BIGINT")),
            ColumnMeta::new("name", Some("VARCHAR(20)")),
            ColumnMeta::new("active", Some("BOOL")),
        ]
    }

    #[test]
    fn fills_by_family() {
        let cols = columns();
        let plan = DynamicPlan::new(&cols).unwrap();
        let mut rec = Record::new();
        plan.fill(
            vec![SqlValue::Int(1), SqlValue::from("Alice"), SqlValue::Int(1)],
            &mut rec,
        )
        .unwrap();
        assert_eq!(rec.get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(rec.get("name"), Some(&SqlValue::from("Alice")));
        assert_eq!(rec.get("active"), Some(&SqlValue::Bool(true)));
    }

    #[test]
    fn unsupported_type_is_an_error() {
        let cols = vec![ColumnMeta::new("price", Some("DECIMAL(10,2)"))];
        let err = DynamicPlan::new(&cols).err().unwrap();
        assert_eq!(
            err,
            DecodeError::UnsupportedColumnType {
                column: "price".into(),
                type_name: "DECIMAL(10,2)".into()
            }
        );
    }

    #[test]
    fn untyped_column_accepts_only_null() {
        let cols = vec![
            ColumnMeta::new("id", Some("INTEGER")),
            ColumnMeta::new("nothing", None),
        ];
        let plan = DynamicPlan::new(&cols).unwrap();
        let mut rec = Record::new();
        plan.fill(vec![SqlValue::Int(1), SqlValue::Null], &mut rec)
            .unwrap();
        assert_eq!(rec.get("nothing"), Some(&SqlValue::Null));

        let err = plan
            .fill(vec![SqlValue::Int(2), SqlValue::Float(0.5)], &mut Record::new())
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnsupportedColumnType { ref column, .. } if column == "nothing"
        ));
    }

    #[test]
    fn mismatch_leaves_record_untouched() {
        let cols = columns();
        let plan = DynamicPlan::new(&cols).unwrap();
        let mut rec = Record::new();
        let err = plan
            .fill(
                vec![SqlValue::from("x"), SqlValue::from("Alice"), SqlValue::Int(1)],
                &mut rec,
            )
            .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { ref column, .. } if column == "id"));
        assert!(rec.is_empty());
    }
}
