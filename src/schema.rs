//! Column-to-field binding for tagged records.
//!
//! A [`Schema`] is declared once per record type and names the column each field is bound
//! to. For a result set it produces an [`Association`] (column ordinal to field ordinal) that is
//! computed once and reused for every row.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::decode::{FromValue, Mismatch};
use crate::driver::ColumnMeta;
use crate::error::DecodeError;
use crate::types::SqlValue;

type Convert = Box<dyn Fn(&SqlValue) -> Result<Box<dyn Any>, Mismatch> + Send + Sync>;
type Store<T> = Box<dyn Fn(&mut T, Box<dyn Any>) + Send + Sync>;

struct FieldBinding<T> {
    column: String,
    convert: Convert,
    store: Store<T>,
}

/// Record types that carry their own schema.
///
/// ```rust
/// use std::sync::LazyLock;
/// use sql_dbc::prelude::*;
///
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// static USER: LazyLock<Schema<User>> = LazyLock::new(|| {
///     Schema::builder()
///         .field("id", |u: &mut User| &mut u.id)
///         .field("name", |u: &mut User| &mut u.name)
///         .build()
/// });
///
/// impl Tagged for User {
///     fn schema() -> &'static Schema<Self> {
///         &USER
///     }
/// }
/// ```
pub trait Tagged: Sized + 'static {
    fn schema() -> &'static Schema<Self>;
}

/// Binding of column names to fields of `T`.
pub struct Schema<T> {
    fields: Vec<FieldBinding<T>>,
    index: HashMap<String, usize>,
}

impl<T: 'static> Schema<T> {
    #[must_use]
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder { fields: Vec::new() }
    }
}

impl<T> Schema<T> {
    /// Bound column names, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.column.as_str())
    }

    /// Field ordinal bound to `column`, if any.
    #[must_use]
    pub fn field_index(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Map every result column to the field bound to its name.
    #[must_use]
    pub fn associate(&self, columns: &[ColumnMeta]) -> Association {
        Association {
            slots: columns
                .iter()
                .map(|col| self.field_index(&col.name))
                .collect(),
        }
    }

    /// Decode one row into `dest`.
    ///
    /// All matched cells are converted before any field is written, so a failed row leaves
    /// `dest` as it was. Unmatched columns are read past and dropped.
    pub(crate) fn decode_row(
        &self,
        association: &Association,
        columns: &[ColumnMeta],
        row: &[SqlValue],
        dest: &mut T,
    ) -> Result<(), DecodeError> {
        if row.len() != association.slots.len() {
            return Err(DecodeError::ColumnCount {
                expected: association.slots.len(),
                found: row.len(),
            });
        }

        let mut staged: Vec<(usize, Box<dyn Any>)> = Vec::with_capacity(self.fields.len());
        for (col_idx, (slot, value)) in association.slots.iter().zip(row).enumerate() {
            let Some(field_idx) = *slot else {
                continue;
            };
            let field = &self.fields[field_idx];
            let converted = (field.convert)(value).map_err(|m| DecodeError::TypeMismatch {
                column: columns
                    .get(col_idx)
                    .map_or_else(|| field.column.clone(), |c| c.name.clone()),
                expected: m.expected,
                found: m.found,
            })?;
            staged.push((field_idx, converted));
        }

        for (field_idx, value) in staged {
            (self.fields[field_idx].store)(dest, value);
        }
        Ok(())
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("columns", &self.columns().collect::<Vec<_>>())
            .finish()
    }
}

/// Fluent builder for [`Schema`].
pub struct SchemaBuilder<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Bind `column` to the field returned by `accessor`.
    ///
    /// Binding the same column twice keeps the later field.
    #[must_use]
    pub fn field<F, A>(mut self, column: &str, accessor: A) -> Self
    where
        F: FromValue + 'static,
        A: for<'r> Fn(&'r mut T) -> &'r mut F + Send + Sync + 'static,
    {
        let convert: Convert =
            Box::new(|value: &SqlValue| F::from_value(value).map(|v| Box::new(v) as Box<dyn Any>));
        let store: Store<T> = Box::new(move |record: &mut T, staged: Box<dyn Any>| {
            if let Ok(v) = staged.downcast::<F>() {
                *accessor(record) = *v;
            }
        });
        self.fields.push(FieldBinding {
            column: column.to_owned(),
            convert,
            store,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> Schema<T> {
        let index = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.column.clone(), i))
            .collect();
        Schema {
            fields: self.fields,
            index,
        }
    }
}

/// Column ordinal to field ordinal mapping for one result set. `None` marks a column that is
/// read and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    slots: Vec<Option<usize>>,
}

impl Association {
    #[must_use]
    pub fn field_for(&self, column: usize) -> Option<usize> {
        self.slots.get(column).copied().flatten()
    }

    /// Number of columns bound to a field.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Rec {
        id: u32,
        name: String,
        note: Option<String>,
        untouched: i32,
    }

    fn schema() -> Schema<Rec> {
        Schema::builder()
            .field("id", |r: &mut Rec| &mut r.id)
            .field("name", |r: &mut Rec| &mut r.name)
            .field("note", |r: &mut Rec| &mut r.note)
            .build()
    }

    fn cols(names: &[&str]) -> Vec<ColumnMeta> {
        names.iter().map(|n| ColumnMeta::new(*n, None)).collect()
    }

    #[test]
    fn association_skips_unknown_columns() {
        let s = schema();
        let a = s.associate(&cols(&["extra", "name", "id"]));
        assert_eq!(a.field_for(0), None);
        assert_eq!(a.field_for(1), Some(1));
        assert_eq!(a.field_for(2), Some(0));
        assert_eq!(a.matched(), 2);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn decode_fills_only_bound_fields() {
        let s = schema();
        let columns = cols(&["id", "extra", "note"]);
        let a = s.associate(&columns);
        let mut rec = Rec {
            name: "keep".into(),
            untouched: 9,
            ..Rec::default()
        };
        s.decode_row(
            &a,
            &columns,
            &[SqlValue::Int(4), SqlValue::Float(1.5), SqlValue::Null],
            &mut rec,
        )
        .unwrap();
        assert_eq!(
            rec,
            Rec {
                id: 4,
                name: "keep".into(),
                note: None,
                untouched: 9
            }
        );
    }

    #[test]
    fn failed_row_leaves_record_unchanged() {
        let s = schema();
        let columns = cols(&["name", "id"]);
        let a = s.associate(&columns);
        let mut rec = Rec::default();
        let err = s
            .decode_row(
                &a,
                &columns,
                &[SqlValue::from("bob"), SqlValue::from("not a number")],
                &mut rec,
            )
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                column: "id".into(),
                expected: "u32",
                found: "text"
            }
        );
        assert_eq!(rec, Rec::default());
    }

    #[test]
    fn later_binding_wins() {
        let s: Schema<Rec> = Schema::builder()
            .field("x", |r: &mut Rec| &mut r.untouched)
            .field("x", |r: &mut Rec| &mut r.id)
            .build();
        assert_eq!(s.field_index("x"), Some(1));
        assert_eq!(s.columns().collect::<Vec<_>>(), vec!["x", "x"]);
    }
}
