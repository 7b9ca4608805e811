// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Minimal columnar schema model and the `required_schema` derivation logic
//! of §4.6.
//!
//! The crate intentionally does not depend on a full columnar engine crate
//! for this: the actual file codec (Parquet/Avro/HFile) is abstracted
//! behind [`crate::block::codec::BlockBodyCodec`] and
//! [`crate::base_file::BaseFileReader`], so all the merge path needs is a
//! small, self-contained notion of "named, typed columns" to reason about
//! required-for-merge columns, widening and projection.

use std::sync::Arc;

/// A column's logical type.
#[derive(Clone, Debug, PartialEq)]
pub enum DataType {
    /// UTF-8 string.
    String,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// 32-bit IEEE-754 float.
    Float32,
    /// 64-bit IEEE-754 float.
    Float64,
    /// Boolean.
    Boolean,
    /// Opaque byte blob.
    Binary,
    /// A nested struct (bootstrap skeleton/data rows are flat, but base
    /// schemas may carry nested Hudi metadata in principle).
    Struct(Vec<StructField>),
}

impl DataType {
    /// Returns `true` if a value of type `self` can be safely read as type
    /// `target` (widening, not narrowing).
    ///
    /// Mirrors the allowed widenings of §4.4's "transparent mapping of
    /// file-resident types to required types when compatible".
    #[must_use]
    pub fn is_compatible_with(&self, target: &DataType) -> bool {
        use DataType::{Binary, Boolean, Float32, Float64, Int32, Int64, String as Str, Struct};

        if self == target {
            return true;
        }

        matches!(
            (self, target),
            (Int32, Int64) | (Int32, Float64) | (Int64, Float64) | (Float32, Float64)
        ) || matches!((self, target), (Str, Binary))
            || match (self, target) {
                (Struct(a), Struct(b)) => {
                    a.len() == b.len()
                        && a.iter()
                            .zip(b)
                            .all(|(x, y)| x.name == y.name && x.data_type.is_compatible_with(&y.data_type))
                }
                _ => false,
            }
    }
}

/// A named, possibly-nullable column.
#[derive(Clone, Debug, PartialEq)]
pub struct StructField {
    /// Column name.
    pub name: Arc<str>,
    /// Column type.
    pub data_type: DataType,
    /// Whether the column may hold nulls.
    pub nullable: bool,
}

impl StructField {
    /// Creates a new field.
    pub fn new(name: impl Into<Arc<str>>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Well-known name of the synthetic row-position column injected when
/// position-based merging is enabled (§4.6 step 4).
pub const ROW_INDEX_COLUMN: &str = "_row_index";

/// An ordered, named set of columns.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Schema {
    fields: Vec<StructField>,
}

impl Schema {
    /// Creates a schema from an ordered field list.
    #[must_use]
    pub fn new(fields: Vec<StructField>) -> Self {
        Self { fields }
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[StructField] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| &*f.name == name)
    }

    /// Returns the 0-based index of a field by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| &*f.name == name)
    }

    /// Returns `true` if `self` is a subset of `other`: every field in
    /// `self` exists in `other` under a compatible type. Used by the
    /// projection-preservation invariant (§8, invariant 5).
    #[must_use]
    pub fn is_subset_of(&self, other: &Schema) -> bool {
        self.fields.iter().all(|f| {
            other
                .field(&f.name)
                .is_some_and(|g| f.data_type.is_compatible_with(&g.data_type))
        })
    }

    /// Appends a field, returning a new schema. No-op if the field already exists.
    #[must_use]
    pub fn with_field(mut self, field: StructField) -> Self {
        if self.field(&field.name).is_none() {
            self.fields.push(field);
        }
        self
    }
}

/// Computes `required_schema` from `requested_schema` per §4.6.
///
/// Steps, in order:
/// 1. Start with `requested_schema`.
/// 2. Add merger-mandatory columns (precombine, record-key) copied from
///    `data_schema`, failing with [`crate::Error::SchemaMismatch`] if absent.
/// 3. If bootstrap merging will run, ensure at least one meta and one data
///    column remain (checked by the caller, which knows the meta/data split;
///    this function only guarantees the columns are *present*).
/// 4. If position merging is enabled, append `_row_index` (non-null Int64).
pub struct SchemaHandler<'a> {
    data_schema: &'a Schema,
}

impl<'a> SchemaHandler<'a> {
    /// Creates a handler bound to the file slice's on-disk schema.
    #[must_use]
    pub fn new(data_schema: &'a Schema) -> Self {
        Self { data_schema }
    }

    /// Derives `required_schema`, per §4.6.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SchemaMismatch`] if `record_key_field` or
    /// `precombine_field` (when set) is absent from `data_schema`.
    pub fn derive_required_schema(
        &self,
        requested_schema: &Schema,
        record_key_field: &str,
        precombine_field: Option<&str>,
        use_row_position: bool,
    ) -> crate::Result<Schema> {
        let mut required = requested_schema.clone();

        required = self.ensure_mandatory_column(required, record_key_field)?;

        if let Some(precombine) = precombine_field {
            required = self.ensure_mandatory_column(required, precombine)?;
        }

        if use_row_position && required.field(ROW_INDEX_COLUMN).is_none() {
            required = required.with_field(StructField::new(
                ROW_INDEX_COLUMN,
                DataType::Int64,
                false,
            ));
        }

        Ok(required)
    }

    fn ensure_mandatory_column(&self, schema: Schema, name: &str) -> crate::Result<Schema> {
        if schema.field(name).is_some() {
            return Ok(schema);
        }

        let Some(field) = self.data_schema.field(name) else {
            return Err(crate::Error::SchemaMismatch {
                column: name.to_owned(),
                reason: "required column absent from data_schema".to_owned(),
            });
        };

        Ok(schema.with_field(field.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(fields: &[(&str, DataType, bool)]) -> Schema {
        Schema::new(
            fields
                .iter()
                .cloned()
                .map(|(n, t, nullable)| StructField::new(n, t, nullable))
                .collect(),
        )
    }

    #[test]
    fn required_schema_adds_precombine_and_key() {
        let data = schema(&[
            ("id", DataType::String, false),
            ("ts", DataType::Int64, false),
            ("v", DataType::Int32, true),
        ]);
        let requested = schema(&[("v", DataType::Int32, true)]);

        let required = SchemaHandler::new(&data)
            .derive_required_schema(&requested, "id", Some("ts"), false)
            .unwrap();

        assert!(required.field("id").is_some());
        assert!(required.field("ts").is_some());
        assert!(required.field("v").is_some());
    }

    #[test]
    fn required_schema_fails_when_precombine_missing_from_data() {
        let data = schema(&[("id", DataType::String, false)]);
        let requested = schema(&[]);

        let err = SchemaHandler::new(&data)
            .derive_required_schema(&requested, "id", Some("ts"), false)
            .unwrap_err();

        assert!(matches!(err, crate::Error::SchemaMismatch { .. }));
    }

    #[test]
    fn required_schema_appends_row_index_when_position_mode() {
        let data = schema(&[("id", DataType::String, false)]);
        let requested = schema(&[]);

        let required = SchemaHandler::new(&data)
            .derive_required_schema(&requested, "id", None, true)
            .unwrap();

        let idx = required.field(ROW_INDEX_COLUMN).unwrap();
        assert_eq!(idx.data_type, DataType::Int64);
        assert!(!idx.nullable);
    }

    #[test]
    fn widening_is_compatible_narrowing_is_not() {
        assert!(DataType::Int32.is_compatible_with(&DataType::Int64));
        assert!(!DataType::Int64.is_compatible_with(&DataType::Int32));
    }

    #[test]
    fn projection_preservation_subset_check() {
        let required = schema(&[
            ("id", DataType::String, false),
            ("ts", DataType::Int64, false),
            ("v", DataType::Int32, true),
        ]);
        let requested = schema(&[("v", DataType::Int32, true)]);
        assert!(requested.is_subset_of(&required));
    }
}
