//! History diffing.
//!
//! A [`DiffEngine`] compares each row version with the next older one and
//! derives three views from that comparison: the per-column diff matrix, the
//! delta list and the history of a single column. Snapshots must be ordered
//! newest first by period start; the engine checks this before comparing.
//!
//! Delta and column history intervals are stitched: the newest interval keeps
//! its raw period end, every older interval ends where the next newer one
//! starts. Rows where nothing of interest changed are skipped, so their raw
//! period end would otherwise leave gaps.

use chrono::NaiveDateTime;
use serde::Serialize;
use tempview_db::{
    column_with_role, serialize_datetime, ColumnMetadata, GenerationRole, RoleLookup, RowSnapshot,
    TypedValue,
};
use thiserror::Error;

/// Integrity errors: the metadata or the rows are not a usable history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("Table has no {0} column")]
    MissingPeriodColumn(&'static str),

    #[error("Table has more than one {0} column")]
    AmbiguousPeriodColumn(&'static str),

    #[error("History row {row} has no value for column \"{column}\"")]
    MissingValue { row: usize, column: String },

    #[error("History row {row} holds {kind} in period column \"{column}\", expected a timestamp")]
    InvalidPeriodValue {
        row: usize,
        column: String,
        kind: &'static str,
    },

    #[error("History rows are not ordered newest first: row {row} starts at {start}, after row {previous_row} ({previous_start})")]
    OutOfOrder {
        row: usize,
        start: NaiveDateTime,
        previous_row: usize,
        previous_start: NaiveDateTime,
    },

    #[error("Column \"{0}\" not in Table.")]
    UnknownColumn(String),
}

/// A column whose value differs between two consecutive row versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedColumn {
    pub column_name: String,
    pub old_value: TypedValue,
    pub new_value: TypedValue,
}

/// Validity window of a row version together with what changed at its start.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffInterval {
    #[serde(serialize_with = "serialize_datetime")]
    pub start_date: NaiveDateTime,
    #[serde(serialize_with = "serialize_datetime")]
    pub end_date: NaiveDateTime,
    pub changed_columns: Vec<ChangedColumn>,
}

/// One change of a single column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHistoryEntry {
    #[serde(serialize_with = "serialize_datetime")]
    pub start_date: NaiveDateTime,
    #[serde(serialize_with = "serialize_datetime")]
    pub end_date: NaiveDateTime,
    pub old_value: TypedValue,
    pub new_value: TypedValue,
}

/// Compares row versions of one temporal table.
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine<'a> {
    columns: &'a [ColumnMetadata],
    period_start: &'a ColumnMetadata,
    period_end: &'a ColumnMetadata,
}

impl<'a> DiffEngine<'a> {
    /// Requires exactly one period start and one period end column.
    pub fn new(columns: &'a [ColumnMetadata]) -> Result<Self, DiffError> {
        Ok(Self {
            columns,
            period_start: period_column(columns, GenerationRole::PeriodStart, "period start")?,
            period_end: period_column(columns, GenerationRole::PeriodEnd, "period end")?,
        })
    }

    /// Check that every row carries every column, that period values are
    /// timestamps and that period starts never increase.
    pub fn validate(&self, snapshots: &[RowSnapshot]) -> Result<(), DiffError> {
        let mut previous: Option<(usize, NaiveDateTime)> = None;
        for (row, snapshot) in snapshots.iter().enumerate() {
            for column in self.columns {
                if snapshot.get(&column.name).is_none() {
                    return Err(DiffError::MissingValue {
                        row,
                        column: column.name.clone(),
                    });
                }
            }
            self.timestamp(row, snapshot, self.period_end)?;

            // Equal starts are legal: several updates in one transaction.
            let start = self.timestamp(row, snapshot, self.period_start)?;
            if let Some((previous_row, previous_start)) = previous {
                if start > previous_start {
                    return Err(DiffError::OutOfOrder {
                        row,
                        start,
                        previous_row,
                        previous_start,
                    });
                }
            }
            previous = Some((row, start));
        }
        Ok(())
    }

    /// One boolean vector per snapshot over all columns.
    ///
    /// Row `i` marks the columns that changed from snapshot `i + 1` to `i`.
    /// The oldest snapshot has nothing to compare against and gets an
    /// all-false row. Only regular columns are ever marked.
    pub fn diff_matrix(&self, snapshots: &[RowSnapshot]) -> Result<Vec<Vec<bool>>, DiffError> {
        self.validate(snapshots)?;
        if snapshots.is_empty() {
            return Ok(Vec::new());
        }

        let mut matrix: Vec<Vec<bool>> = snapshots
            .windows(2)
            .map(|pair| {
                self.columns
                    .iter()
                    .map(|column| {
                        column.role == GenerationRole::Regular
                            && pair[0].get(&column.name) != pair[1].get(&column.name)
                    })
                    .collect()
            })
            .collect();
        matrix.push(vec![false; self.columns.len()]);
        Ok(matrix)
    }

    /// Intervals at whose start at least one regular column changed.
    pub fn delta(&self, snapshots: &[RowSnapshot]) -> Result<Vec<DiffInterval>, DiffError> {
        self.validate(snapshots)?;
        let mut intervals = self.changes(snapshots, |_| true)?;
        stitch(&mut intervals);
        Ok(intervals)
    }

    /// Changes of one column. A period or other generated column never
    /// changes as far as the history is concerned.
    pub fn column_history(
        &self,
        snapshots: &[RowSnapshot],
        column_name: &str,
    ) -> Result<Vec<ColumnHistoryEntry>, DiffError> {
        if !self.columns.iter().any(|c| c.name == column_name) {
            return Err(DiffError::UnknownColumn(column_name.to_string()));
        }
        self.validate(snapshots)?;

        let mut intervals = self.changes(snapshots, |c| c.name == column_name)?;
        stitch(&mut intervals);
        Ok(intervals
            .into_iter()
            .filter_map(|interval| {
                let start_date = interval.start_date;
                let end_date = interval.end_date;
                interval
                    .changed_columns
                    .into_iter()
                    .next()
                    .map(|changed| ColumnHistoryEntry {
                        start_date,
                        end_date,
                        old_value: changed.old_value,
                        new_value: changed.new_value,
                    })
            })
            .collect())
    }

    /// Compare each adjacent pair, restricted to regular columns accepted by
    /// `include`. Intervals carry their raw period end.
    fn changes<F>(&self, snapshots: &[RowSnapshot], include: F) -> Result<Vec<DiffInterval>, DiffError>
    where
        F: Fn(&ColumnMetadata) -> bool,
    {
        let mut intervals = Vec::new();
        for (row, pair) in snapshots.windows(2).enumerate() {
            let (newer, older) = (&pair[0], &pair[1]);
            let changed_columns: Vec<ChangedColumn> = self
                .columns
                .iter()
                .filter(|c| c.role == GenerationRole::Regular && include(c))
                .filter_map(|c| {
                    let new_value = newer.get(&c.name)?;
                    let old_value = older.get(&c.name)?;
                    (new_value != old_value).then(|| ChangedColumn {
                        column_name: c.name.clone(),
                        old_value: old_value.clone(),
                        new_value: new_value.clone(),
                    })
                })
                .collect();

            if !changed_columns.is_empty() {
                intervals.push(DiffInterval {
                    start_date: self.timestamp(row, newer, self.period_start)?,
                    end_date: self.timestamp(row, newer, self.period_end)?,
                    changed_columns,
                });
            }
        }
        Ok(intervals)
    }

    fn timestamp(
        &self,
        row: usize,
        snapshot: &RowSnapshot,
        column: &ColumnMetadata,
    ) -> Result<NaiveDateTime, DiffError> {
        let value = snapshot.get(&column.name).ok_or_else(|| DiffError::MissingValue {
            row,
            column: column.name.clone(),
        })?;
        value.as_timestamp().ok_or_else(|| DiffError::InvalidPeriodValue {
            row,
            column: column.name.clone(),
            kind: value.kind(),
        })
    }
}

fn period_column<'a>(
    columns: &'a [ColumnMetadata],
    role: GenerationRole,
    label: &'static str,
) -> Result<&'a ColumnMetadata, DiffError> {
    match column_with_role(columns, role) {
        RoleLookup::Found(column) => Ok(column),
        RoleLookup::Missing => Err(DiffError::MissingPeriodColumn(label)),
        RoleLookup::Ambiguous => Err(DiffError::AmbiguousPeriodColumn(label)),
    }
}

/// Newest first: the first interval keeps its raw end, each later one ends
/// where its predecessor starts. An empty list stays empty.
fn stitch(intervals: &mut [DiffInterval]) {
    for i in 1..intervals.len() {
        intervals[i].end_date = intervals[i - 1].start_date;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn ts(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn forever() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(9999, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap()
    }

    fn columns() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata::new("Id", 1, "int"),
            ColumnMetadata::new("Name", 2, "varchar"),
            ColumnMetadata::new("Amount", 3, "int"),
            ColumnMetadata::new("SysStart", 4, "datetime2").with_role(GenerationRole::PeriodStart),
            ColumnMetadata::new("SysEnd", 5, "datetime2").with_role(GenerationRole::PeriodEnd),
        ]
    }

    fn row(name: &str, amount: i64, start: NaiveDateTime, end: NaiveDateTime) -> RowSnapshot {
        RowSnapshot::new()
            .with("Id", 1i64)
            .with("Name", name)
            .with("Amount", amount)
            .with("SysStart", start)
            .with("SysEnd", end)
    }

    /// Newest first: Amount changes at 04-01 and 02-01, Name at 03-01.
    fn history() -> Vec<RowSnapshot> {
        vec![
            row("Carol", 250, ts(4, 1), forever()),
            row("Carol", 200, ts(3, 1), ts(4, 1)),
            row("Caro", 200, ts(2, 1), ts(3, 1)),
            row("Caro", 150, ts(1, 15), ts(2, 1)),
        ]
    }

    #[test]
    fn test_engine_requires_period_columns() {
        let cols = columns();
        assert!(DiffEngine::new(&cols).is_ok());

        let no_end: Vec<_> = cols
            .iter()
            .filter(|c| c.role != GenerationRole::PeriodEnd)
            .cloned()
            .collect();
        assert_eq!(
            DiffEngine::new(&no_end).unwrap_err(),
            DiffError::MissingPeriodColumn("period end")
        );

        let mut two_starts = cols.clone();
        two_starts.push(
            ColumnMetadata::new("Other", 6, "datetime2").with_role(GenerationRole::PeriodStart),
        );
        assert_eq!(
            DiffEngine::new(&two_starts).unwrap_err(),
            DiffError::AmbiguousPeriodColumn("period start")
        );
    }

    #[test]
    fn test_short_histories_are_empty() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();
        let one = vec![row("a", 1, ts(1, 1), forever())];

        assert!(engine.diff_matrix(&[]).unwrap().is_empty());
        assert!(engine.delta(&[]).unwrap().is_empty());
        assert!(engine.delta(&one).unwrap().is_empty());
        assert!(engine.column_history(&[], "Name").unwrap().is_empty());
        assert!(engine.column_history(&one, "Name").unwrap().is_empty());
        assert_eq!(engine.diff_matrix(&one).unwrap(), vec![vec![false; 5]]);
    }

    #[test]
    fn test_diff_matrix_shape() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();
        let matrix = engine.diff_matrix(&history()).unwrap();

        assert_eq!(matrix.len(), 4);
        assert!(matrix.iter().all(|r| r.len() == cols.len()));
        assert_eq!(matrix[0], vec![false, false, true, false, false]);
        assert_eq!(matrix[1], vec![false, true, false, false, false]);
        assert_eq!(matrix[2], vec![false, false, true, false, false]);
        assert_eq!(matrix[3], vec![false; 5]);
    }

    #[test]
    fn test_generated_columns_never_marked() {
        let mut cols = columns();
        cols.push(ColumnMetadata::new("TxId", 6, "bigint").with_role(GenerationRole::Generated(7)));
        let engine = DiffEngine::new(&cols).unwrap();
        let rows = vec![
            row("a", 1, ts(2, 1), forever()).with("TxId", 2i64),
            row("a", 1, ts(1, 1), ts(2, 1)).with("TxId", 1i64),
        ];
        assert_eq!(engine.diff_matrix(&rows).unwrap()[0], vec![false; 6]);
        assert!(engine.delta(&rows).unwrap().is_empty());
        assert!(engine.column_history(&rows, "TxId").unwrap().is_empty());
        assert!(engine.column_history(&rows, "SysStart").unwrap().is_empty());
    }

    #[test]
    fn test_delta_list_is_stitched() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();
        let delta = engine.delta(&history()).unwrap();

        assert_eq!(delta.len(), 3);
        assert_eq!((delta[0].start_date, delta[0].end_date), (ts(4, 1), forever()));
        assert_eq!((delta[1].start_date, delta[1].end_date), (ts(3, 1), ts(4, 1)));
        assert_eq!((delta[2].start_date, delta[2].end_date), (ts(2, 1), ts(3, 1)));
        assert_eq!(
            delta[1].changed_columns,
            vec![ChangedColumn {
                column_name: "Name".into(),
                old_value: TypedValue::Text("Caro".into()),
                new_value: TypedValue::Text("Carol".into()),
            }]
        );
    }

    #[test]
    fn test_column_history_stitches_over_skipped_rows() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();
        let history = engine.column_history(&history(), "Amount").unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].start_date, ts(4, 1));
        assert_eq!(history[0].end_date, forever());
        assert_eq!(history[0].old_value, TypedValue::Integer(200));
        assert_eq!(history[0].new_value, TypedValue::Integer(250));

        // Raw end of the older change was 03-01; stitched to the newer start.
        assert_eq!(history[1].start_date, ts(2, 1));
        assert_eq!(history[1].end_date, ts(4, 1));
        for i in 1..history.len() {
            assert_eq!(history[i].end_date, history[i - 1].start_date);
        }
    }

    #[test]
    fn test_unchanged_column_has_empty_history() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();
        assert!(engine.column_history(&history(), "Id").unwrap().is_empty());
        assert_eq!(
            engine.column_history(&history(), "Nope").unwrap_err(),
            DiffError::UnknownColumn("Nope".into())
        );
    }

    #[test]
    fn test_out_of_order_rejected() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();
        let mut rows = history();
        rows.swap(1, 2);
        assert!(matches!(
            engine.delta(&rows).unwrap_err(),
            DiffError::OutOfOrder { row: 2, .. }
        ));
        assert!(engine.diff_matrix(&rows).is_err());
    }

    #[test]
    fn test_equal_period_starts_allowed() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();
        let rows = vec![
            row("b", 1, ts(1, 1), forever()),
            row("a", 1, ts(1, 1), ts(1, 1)),
        ];
        assert_eq!(engine.delta(&rows).unwrap().len(), 1);
    }

    #[test]
    fn test_integrity_of_row_values() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();

        let missing = vec![RowSnapshot::new().with("Id", 1i64)];
        assert!(matches!(
            engine.diff_matrix(&missing).unwrap_err(),
            DiffError::MissingValue { row: 0, .. }
        ));

        let bad_period = vec![row("a", 1, ts(1, 1), forever()).with("SysStart", "yesterday")];
        assert_eq!(
            engine.delta(&bad_period).unwrap_err(),
            DiffError::InvalidPeriodValue {
                row: 0,
                column: "SysStart".into(),
                kind: "text",
            }
        );
    }

    #[test]
    fn test_type_sensitive_comparison() {
        let cols = columns();
        let engine = DiffEngine::new(&cols).unwrap();
        let rows = vec![
            row("a", 1, ts(2, 1), forever()).with("Amount", TypedValue::Text("1".into())),
            row("a", 1, ts(1, 1), ts(2, 1)),
        ];
        let delta = engine.delta(&rows).unwrap();
        assert_eq!(delta[0].changed_columns[0].column_name, "Amount");
    }

    #[test]
    fn test_interval_json_shape() {
        let interval = DiffInterval {
            start_date: ts(3, 1),
            end_date: ts(4, 1),
            changed_columns: vec![ChangedColumn {
                column_name: "Name".into(),
                old_value: TypedValue::Null,
                new_value: TypedValue::Text("x".into()),
            }],
        };
        let json = serde_json::to_value(&interval).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "startDate": "2024-03-01T00:00:00",
                "endDate": "2024-04-01T00:00:00",
                "changedColumns": [{"columnName": "Name", "oldValue": null, "newValue": "x"}]
            })
        );
    }

    #[test]
    fn test_history_entry_keeps_datetime2_precision() {
        let end_of_time = forever().with_nanosecond(999_999_900).unwrap();
        let entry = ColumnHistoryEntry {
            start_date: ts(4, 1),
            end_date: end_of_time,
            old_value: TypedValue::Integer(200),
            new_value: TypedValue::Integer(250),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["startDate"], "2024-04-01T00:00:00");
        assert_eq!(json["endDate"], "9999-12-31T23:59:59.9999999");
    }
}
