use std::io::Write;

use tempview_db::{
    DbError, GenerationRole, HistoryQuery, HistoryReader, LookupParam, MemoryCatalog,
    SchemaRepository, TypedValue,
};

const DEMO: &str = include_str!("../../../fixtures/demo.json");

fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_load_fixture_from_path() {
    let file = write_fixture(DEMO);
    let catalog = MemoryCatalog::from_path(file.path()).unwrap();

    let tables = catalog.temporal_tables().await.unwrap();
    let names: Vec<String> = tables.iter().map(|t| t.base_ref().to_string()).collect();
    assert_eq!(names, vec!["dbo.Employee", "sales.PriceList"]);

    let price_list = catalog
        .temporal_table_by_name("sales", "PriceList")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(price_list.history_ref().to_string(), "history.PriceList");
    assert!(catalog
        .temporal_table_by_name("sales", "Missing")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_missing_fixture_file() {
    let err = MemoryCatalog::from_path("/nonexistent/tempview/fixture.json").unwrap_err();
    assert!(matches!(err, DbError::Io(_)));
}

#[tokio::test]
async fn test_malformed_fixture_value() {
    let bad = DEMO.replace(r#""Amount": "250.00""#, r#""Amount": "lots""#);
    let file = write_fixture(&bad);
    let err = MemoryCatalog::from_path(file.path()).unwrap_err();
    assert!(matches!(err, DbError::InvalidInput(msg) if msg.contains("dbo.Employee.Amount")));
}

#[tokio::test]
async fn test_columns_by_id_and_by_name_agree() {
    let catalog = MemoryCatalog::from_json(DEMO).unwrap();
    let by_id = catalog.table_columns_by_id(901578250).await.unwrap();
    let by_name = catalog.table_columns_by_name("dbo", "Employee").await.unwrap();
    assert_eq!(by_id, by_name);
    assert_eq!(by_id.len(), 5);
    assert_eq!(by_id[3].role, GenerationRole::PeriodStart);
    assert_eq!(by_id[4].role, GenerationRole::PeriodEnd);

    assert!(catalog.table_columns_by_id(42).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_primary_keys_keep_key_order() {
    let catalog = MemoryCatalog::from_json(DEMO).unwrap();
    let keys = catalog.primary_keys("sales", "PriceList").await.unwrap();
    let names: Vec<&str> = keys.iter().map(|k| k.column_name.as_str()).collect();
    assert_eq!(names, vec!["Sku", "Region"]);
    assert!(catalog.primary_keys("dbo", "Nope").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_composite_key_history() {
    let catalog = MemoryCatalog::from_json(DEMO).unwrap();
    let table = catalog
        .temporal_table_by_name("sales", "PriceList")
        .await
        .unwrap()
        .unwrap();
    let columns = catalog
        .table_columns_by_id(table.base_table_object_id)
        .await
        .unwrap();
    let params = vec![
        LookupParam::new("Sku", "varchar", TypedValue::Text("WID-1".into())),
        LookupParam::new("Region", "char", TypedValue::Text("E".into())),
    ];
    let query =
        HistoryQuery::build(&columns, &params, table.base_ref(), table.history_ref()).unwrap();

    let rows = catalog.read_history(&query).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("Active"), Some(&TypedValue::Boolean(true)));
    assert_eq!(rows[1].get("Active"), Some(&TypedValue::Boolean(false)));
    assert_eq!(rows[1].get("Price").unwrap().to_string(), "11.0000");
}

#[tokio::test]
async fn test_empty_lookup_reads_every_row() {
    let catalog = MemoryCatalog::from_json(DEMO).unwrap();
    let table = catalog
        .temporal_table_by_name("dbo", "Employee")
        .await
        .unwrap()
        .unwrap();
    let columns = catalog.table_columns_by_name("dbo", "Employee").await.unwrap();
    let query = HistoryQuery::build(&columns, &[], table.base_ref(), table.history_ref()).unwrap();

    let rows = catalog.read_history(&query).await.unwrap();
    assert_eq!(rows.len(), 8);
    let starts: Vec<_> = rows
        .iter()
        .map(|r| r.get("SysStart").and_then(TypedValue::as_timestamp).unwrap())
        .collect();
    assert!(starts.windows(2).all(|w| w[0] >= w[1]));
}
