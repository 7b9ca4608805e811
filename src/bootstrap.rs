// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Bootstrap skeleton/data zip (§4.4, bootstrap file slices).
//!
//! A bootstrapped table stores Hudi's own metadata columns (commit time,
//! record key, ...) in a small "skeleton" file and leaves the original
//! external data file untouched. Reading such a slice means zipping the two
//! row streams back together before the merge driver ever sees them.

use crate::error::{Error, Result};
use crate::row::{Row, ScalarValue};
use crate::schema::{Schema, ROW_INDEX_COLUMN};

/// How skeleton and external data rows correspond to one another.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootstrapMode {
    /// Zips index-for-index; both streams must have equal length.
    Key,
    /// Matches rows by `_row_index`, advancing whichever side is behind —
    /// used when the external data file was itself filtered (predicate
    /// pushdown on the data file only) and so is shorter than the skeleton.
    Position,
}

/// Zips a skeleton row stream with an external data row stream into
/// complete rows (skeleton columns followed by data columns).
pub struct BootstrapMerger {
    mode: BootstrapMode,
}

impl BootstrapMerger {
    /// Creates a merger for the given correspondence mode.
    #[must_use]
    pub fn new(mode: BootstrapMode) -> Self {
        Self { mode }
    }

    /// Zips `skeleton` against `data`, producing one row per match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BootstrapDesync`] if the streams cannot be
    /// reconciled: unequal length in [`BootstrapMode::Key`], or a
    /// non-terminating position skew (a `_row_index` on one side with no
    /// counterpart reachable on the other) in [`BootstrapMode::Position`].
    pub fn zip(
        &self,
        skeleton: &[Row],
        skeleton_schema: &Schema,
        data: &[Row],
        data_schema: &Schema,
    ) -> Result<Vec<Row>> {
        match self.mode {
            BootstrapMode::Key => self.zip_by_key(skeleton, data),
            BootstrapMode::Position => {
                self.zip_by_position(skeleton, skeleton_schema, data, data_schema)
            }
        }
    }

    fn zip_by_key(&self, skeleton: &[Row], data: &[Row]) -> Result<Vec<Row>> {
        if skeleton.len() != data.len() {
            return Err(Error::BootstrapDesync {
                reason: format!(
                    "skeleton has {} rows but data has {} rows",
                    skeleton.len(),
                    data.len()
                ),
            });
        }

        Ok(skeleton
            .iter()
            .zip(data)
            .map(|(s, d)| concat_row(s, d))
            .collect())
    }

    fn zip_by_position(
        &self,
        skeleton: &[Row],
        skeleton_schema: &Schema,
        data: &[Row],
        data_schema: &Schema,
    ) -> Result<Vec<Row>> {
        let skel_idx = skeleton_schema.index_of(ROW_INDEX_COLUMN).ok_or_else(|| {
            Error::BootstrapDesync {
                reason: "skeleton schema has no _row_index column".to_owned(),
            }
        })?;
        let data_idx = data_schema.index_of(ROW_INDEX_COLUMN).ok_or_else(|| {
            Error::BootstrapDesync {
                reason: "data schema has no _row_index column".to_owned(),
            }
        })?;

        let mut out = Vec::with_capacity(data.len());
        let mut s = 0usize;

        for d in data {
            let Some(ScalarValue::Int64(d_pos)) = d.get(data_idx) else {
                return Err(Error::BootstrapDesync {
                    reason: "data row has non-integer _row_index".to_owned(),
                });
            };

            loop {
                let Some(skeleton_row) = skeleton.get(s) else {
                    return Err(Error::BootstrapDesync {
                        reason: format!("no skeleton row left to match data position {d_pos}"),
                    });
                };

                let Some(ScalarValue::Int64(s_pos)) = skeleton_row.get(skel_idx) else {
                    return Err(Error::BootstrapDesync {
                        reason: "skeleton row has non-integer _row_index".to_owned(),
                    });
                };

                match s_pos.cmp(d_pos) {
                    std::cmp::Ordering::Equal => {
                        out.push(concat_row(skeleton_row, d));
                        s += 1;
                        break;
                    }
                    std::cmp::Ordering::Less => s += 1,
                    std::cmp::Ordering::Greater => {
                        return Err(Error::BootstrapDesync {
                            reason: format!(
                                "skeleton position {s_pos} skipped past data position {d_pos}"
                            ),
                        });
                    }
                }
            }
        }

        Ok(out)
    }
}

fn concat_row(skeleton: &Row, data: &Row) -> Row {
    let mut values = skeleton.values().to_vec();
    values.extend(data.values().iter().cloned());
    Row::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataType, StructField};

    fn schema(fields: &[&str]) -> Schema {
        Schema::new(
            fields
                .iter()
                .map(|n| StructField::new(*n, DataType::String, false))
                .collect(),
        )
    }

    #[test]
    fn key_mode_zips_equal_length_streams() {
        let skeleton_schema = schema(&["_hoodie_commit_time"]);
        let data_schema = schema(&["value"]);

        let skeleton = vec![Row::new(vec![ScalarValue::String("c1".into())])];
        let data = vec![Row::new(vec![ScalarValue::String("v1".into())])];

        let merger = BootstrapMerger::new(BootstrapMode::Key);
        let rows = merger
            .zip(&skeleton, &skeleton_schema, &data, &data_schema)
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values().len(), 2);
    }

    #[test]
    fn key_mode_mismatched_length_is_desync() {
        let skeleton_schema = schema(&["_hoodie_commit_time"]);
        let data_schema = schema(&["value"]);

        let skeleton = vec![Row::new(vec![ScalarValue::String("c1".into())])];
        let data = vec![];

        let merger = BootstrapMerger::new(BootstrapMode::Key);
        let err = merger
            .zip(&skeleton, &skeleton_schema, &data, &data_schema)
            .unwrap_err();
        assert!(matches!(err, Error::BootstrapDesync { .. }));
    }

    #[test]
    fn position_mode_skips_filtered_out_data_rows() {
        let skeleton_schema = Schema::new(vec![StructField::new(
            ROW_INDEX_COLUMN,
            DataType::Int64,
            false,
        )]);
        let data_schema = Schema::new(vec![
            StructField::new("value", DataType::String, false),
            StructField::new(ROW_INDEX_COLUMN, DataType::Int64, false),
        ]);

        let skeleton = vec![
            Row::new(vec![ScalarValue::Int64(0)]),
            Row::new(vec![ScalarValue::Int64(1)]),
            Row::new(vec![ScalarValue::Int64(2)]),
        ];
        // Data file was filtered and only kept position 2.
        let data = vec![Row::new(vec![
            ScalarValue::String("v2".into()),
            ScalarValue::Int64(2),
        ])];

        let merger = BootstrapMerger::new(BootstrapMode::Position);
        let rows = merger
            .zip(&skeleton, &skeleton_schema, &data, &data_schema)
            .unwrap();

        assert_eq!(rows.len(), 1);
    }
}
