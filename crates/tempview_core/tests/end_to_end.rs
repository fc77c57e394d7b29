use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tempview_core::processor::{COLUMNS_NOT_FOUND, TABLE_NOT_FOUND};
use tempview_core::{ProcessError, TemporalViewerProcessor, TemporalViewerRequest};
use tempview_db::{
    CatalogEntry, ColumnMetadata, DbError, GenerationRole, HistoryQuery, HistoryReader,
    MemoryCatalog, PrimaryKeyColumn, QueryError, ReadHint, RowSnapshot, TemporalTable, TypedValue,
};

const DEMO: &str = include_str!("../../../fixtures/demo.json");

fn processor() -> TemporalViewerProcessor {
    TemporalViewerProcessor::from_backend(MemoryCatalog::from_json(DEMO).unwrap())
}

fn employee(id: &str) -> TemporalViewerRequest {
    TemporalViewerRequest::new("dbo", "Employee").lookup("Id", "int", id)
}

fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn end_of_time() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("9999-12-31T23:59:59.9999999", "%Y-%m-%dT%H:%M:%S%.f").unwrap()
}

#[tokio::test]
async fn test_full_result_for_three_versions() {
    let results = processor().process(&employee("1")).await.unwrap();

    assert!(results.is_valid(), "{:?}", results.messages);
    assert_eq!(results.names.base_table_name, "Employee");
    assert_eq!(results.names.history_table_name, "EmployeeHistory");
    assert_eq!(results.history_info.len(), 3);
    assert_eq!(results.diff_inds.len(), 3);
    assert!(results.diff_inds.iter().all(|r| r.len() == 5));
    assert_eq!(results.diff_inds[0], vec![false, true, false, false, false]);
    assert_eq!(results.diff_inds[1], vec![false; 5]);
    assert_eq!(results.diff_inds[2], vec![false; 5]);
    assert_eq!(
        results.history_info[0].get("Amount"),
        Some(&TypedValue::Decimal(Decimal::from_str("100.00").unwrap()))
    );
}

#[tokio::test]
async fn test_delta_reports_single_name_change() {
    let delta = processor().delta(&employee("1")).await.unwrap();

    assert!(delta.is_valid());
    assert_eq!(delta.delta.len(), 1);
    let interval = &delta.delta[0];
    assert_eq!(interval.start_date, ts(2024, 3, 1));
    assert_eq!(interval.end_date, end_of_time());
    assert_eq!(interval.changed_columns.len(), 1);
    assert_eq!(interval.changed_columns[0].column_name, "Name");
    assert_eq!(interval.changed_columns[0].old_value, TypedValue::Text("Bob".into()));
    assert_eq!(interval.changed_columns[0].new_value, TypedValue::Text("Bobby".into()));
}

#[tokio::test]
async fn test_column_history_for_unchanged_and_changed_columns() {
    let processor = processor();

    let amount = processor.column_history(&employee("1"), "Amount").await.unwrap();
    assert!(amount.is_valid());
    assert!(amount.column_history.is_empty());
    assert_eq!(amount.column_info.unwrap().type_name, "decimal");

    let name = processor.column_history(&employee("1"), "Name").await.unwrap();
    assert_eq!(name.column_history.len(), 1);
    assert_eq!(name.column_history[0].start_date, ts(2024, 3, 1));
    assert_eq!(name.column_history[0].end_date, end_of_time());
}

#[tokio::test]
async fn test_column_history_is_contiguous() {
    let history = processor()
        .column_history(&employee("2"), "Amount")
        .await
        .unwrap()
        .column_history;

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].start_date, ts(2024, 4, 1));
    assert_eq!(history[0].end_date, end_of_time());
    assert_eq!(history[1].start_date, ts(2024, 2, 1));
    assert_eq!(history[1].end_date, history[0].start_date);
}

#[tokio::test]
async fn test_single_version_and_unknown_record() {
    let processor = processor();

    let single = processor.delta(&employee("3")).await.unwrap();
    assert!(single.is_valid());
    assert!(single.delta.is_empty());

    let full = processor.process(&employee("3")).await.unwrap();
    assert_eq!(full.diff_inds, vec![vec![false; 5]]);
    assert_eq!(full.history_info[0].get("Amount"), Some(&TypedValue::Null));

    let none = processor.process(&employee("99")).await.unwrap();
    assert!(none.is_valid());
    assert!(none.history_info.is_empty());
    assert!(none.diff_inds.is_empty());
}

#[tokio::test]
async fn test_unknown_table_and_bad_lookup_become_messages() {
    let processor = processor();

    let missing = processor
        .process(&TemporalViewerRequest::new("dbo", "Nope"))
        .await
        .unwrap();
    assert!(!missing.is_valid());
    assert_eq!(missing.messages, vec![TABLE_NOT_FOUND]);

    let no_key = processor
        .delta(&TemporalViewerRequest::new("dbo", "Employee"))
        .await
        .unwrap();
    assert_eq!(no_key.messages, vec!["PK Column Id not in Lookup Input collection."]);
    assert_eq!(no_key.names.base_table_name, "Employee");

    let bad_value = processor.process(&employee("one")).await.unwrap();
    assert_eq!(
        bad_value.messages,
        vec!["Could not parse value for column \"Id\".  Expected type \"int\", got \"one\"."]
    );
}

#[tokio::test]
async fn test_composite_key_lookup() {
    let request = TemporalViewerRequest::new("sales", "PriceList")
        .lookup("Sku", "varchar", "WID-1")
        .lookup("Region", "char", "E");
    let delta = processor().delta(&request).await.unwrap();

    assert!(delta.is_valid());
    assert_eq!(delta.names.history_schema_name, "history");
    let changed: Vec<&str> = delta.delta[0]
        .changed_columns
        .iter()
        .map(|c| c.column_name.as_str())
        .collect();
    assert_eq!(changed, vec!["Price", "Active"]);
}

struct BrokenHistory;

#[async_trait]
impl HistoryReader for BrokenHistory {
    async fn read_history(&self, _query: &HistoryQuery) -> tempview_db::Result<Vec<RowSnapshot>> {
        Err(DbError::Driver("connection refused".into()))
    }
}

#[tokio::test]
async fn test_history_failure_is_captured() {
    let catalog = Arc::new(MemoryCatalog::from_json(DEMO).unwrap());
    let processor = TemporalViewerProcessor::new(catalog, Arc::new(BrokenHistory));

    let results = processor.process(&employee("1")).await.unwrap();
    assert!(!results.is_valid());
    assert_eq!(results.messages, vec!["Database error: connection refused"]);
}

fn entry(columns: Vec<ColumnMetadata>) -> CatalogEntry {
    CatalogEntry {
        table: TemporalTable {
            base_schema_name: "dbo".into(),
            base_table_name: "Odd".into(),
            base_table_object_id: 0,
            history_schema_name: "dbo".into(),
            history_table_name: "OddHistory".into(),
            history_table_object_id: 0,
        },
        columns,
        primary_keys: vec![PrimaryKeyColumn::new("Id", "int")],
        current_rows: Vec::new(),
        history_rows: Vec::new(),
    }
}

#[tokio::test]
async fn test_missing_period_columns_are_fatal() {
    let no_start = MemoryCatalog::from_entries(vec![entry(vec![ColumnMetadata::new("Id", 1, "int")])]);
    let err = TemporalViewerProcessor::from_backend(no_start)
        .process(&TemporalViewerRequest::new("dbo", "Odd").lookup("Id", "int", "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::Query(QueryError::MissingPeriodStart)));

    let no_end = MemoryCatalog::from_entries(vec![entry(vec![
        ColumnMetadata::new("Id", 1, "int"),
        ColumnMetadata::new("From", 2, "datetime2").with_role(GenerationRole::PeriodStart),
    ])]);
    let err = TemporalViewerProcessor::from_backend(no_end)
        .process(&TemporalViewerRequest::new("dbo", "Odd").lookup("Id", "int", "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::Diff(_)));
}

#[tokio::test]
async fn test_table_without_columns() {
    let empty = MemoryCatalog::from_entries(vec![entry(Vec::new())]);
    let results = TemporalViewerProcessor::from_backend(empty)
        .process(&TemporalViewerRequest::new("dbo", "Odd"))
        .await
        .unwrap();
    assert_eq!(results.messages, vec![COLUMNS_NOT_FOUND]);
}

#[test]
fn test_processor_debug_shows_read_hint() {
    let processor = processor().with_read_hint(ReadHint::None);
    let debug = format!("{:?}", processor);
    assert!(debug.starts_with("TemporalViewerProcessor"));
    assert!(debug.contains("read_hint: None"));
}
