//! SQL Server backend (feature `mssql`).
//!
//! Every operation opens its own TDS connection and drops it before
//! returning, whether the call succeeded or not. Catalog queries read
//! `sys.tables`, `sys.columns` and `INFORMATION_SCHEMA`.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::time::Instant;
use tiberius::numeric::Numeric;
use tiberius::{Client, ColumnData, Config, FromSql, IntoSql, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, debug_span, Instrument};

use crate::error::{DbError, Result};
use crate::query::{HistoryQuery, ParamStyle};
use crate::repository::{HistoryReader, SchemaRepository};
use crate::types::{ColumnMetadata, GenerationRole, PrimaryKeyColumn, TemporalTable};
use crate::value::{RowSnapshot, TypedValue};

const TEMPORAL_TABLES_SQL: &str = "SELECT \
s.name AS BaseSchemaName, \
t.name AS BaseTableName, \
t.object_id AS BaseTableObjectId, \
hs.name AS HistorySchemaName, \
ht.name AS HistoryTableName, \
t.history_table_id AS HistoryTableObjectId \
FROM sys.tables t WITH (NOLOCK) \
INNER JOIN sys.schemas s WITH (NOLOCK) ON t.schema_id = s.schema_id \
INNER JOIN sys.tables ht WITH (NOLOCK) ON t.history_table_id = ht.object_id \
INNER JOIN sys.schemas hs WITH (NOLOCK) ON ht.schema_id = hs.schema_id \
WHERE t.temporal_type = 2 \
AND t.type = 'U'";

const TABLE_BY_NAME_FILTER: &str = " AND s.name = @P1 AND t.name = @P2";

const PRIMARY_KEYS_SQL: &str = "SELECT \
cc.COLUMN_NAME AS ColumnName, \
ty.name AS ColumnType \
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
INNER JOIN INFORMATION_SCHEMA.CONSTRAINT_COLUMN_USAGE cc ON tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME \
INNER JOIN sys.schemas s WITH (NOLOCK) ON tc.TABLE_SCHEMA = s.name \
INNER JOIN sys.tables t WITH (NOLOCK) ON s.schema_id = t.schema_id AND tc.TABLE_NAME = t.name \
INNER JOIN sys.columns c WITH (NOLOCK) ON t.object_id = c.object_id AND cc.COLUMN_NAME = c.name \
INNER JOIN sys.types ty WITH (NOLOCK) ON c.user_type_id = ty.user_type_id \
WHERE cc.TABLE_SCHEMA = @P1 \
AND cc.TABLE_NAME = @P2 \
AND tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
ORDER BY c.column_id";

const COLUMNS_SELECT: &str = "SELECT \
c.name AS ColumnName, \
c.column_id AS ColumnId, \
ty.name AS ColumnTypeName, \
c.max_length AS MaxLen, \
c.precision AS Precision, \
c.scale AS Scale, \
c.is_nullable AS IsNullable, \
c.is_identity AS IsIdentity, \
c.generated_always_type AS GeneratedType \
FROM sys.columns c WITH (NOLOCK) \
INNER JOIN sys.types ty WITH (NOLOCK) ON c.user_type_id = ty.user_type_id ";

const COLUMNS_BY_ID_FILTER: &str = "WHERE c.object_id = @P1 ORDER BY c.column_id";

const COLUMNS_BY_NAME_FILTER: &str = "\
INNER JOIN sys.tables t WITH (NOLOCK) ON c.object_id = t.object_id \
INNER JOIN sys.schemas s WITH (NOLOCK) ON t.schema_id = s.schema_id \
WHERE s.name = @P1 AND t.name = @P2 \
ORDER BY c.column_id";

type TdsClient = Client<Compat<TcpStream>>;

/// Schema repository and history reader over a live SQL Server database.
#[derive(Clone)]
pub struct MssqlBackend {
    config: Config,
}

impl std::fmt::Debug for MssqlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlBackend")
            .field("addr", &self.config.get_addr())
            .finish()
    }
}

impl MssqlBackend {
    /// Parse an ADO.NET style connection string
    /// (`Server=tcp:host,1433;Database=...;User Id=...;Password=...`).
    pub fn new(connection_string: &str) -> Result<Self> {
        let config = Config::from_ado_string(connection_string)?;
        Ok(Self { config })
    }

    async fn connect(&self) -> Result<TdsClient> {
        let tcp = TcpStream::connect(self.config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        match Client::connect(self.config.clone(), tcp.compat_write()).await {
            Ok(client) => Ok(client),
            // Azure SQL gateways may redirect to the node holding the database.
            Err(tiberius::error::Error::Routing { host, port }) => {
                let mut config = self.config.clone();
                config.host(&host);
                config.port(port);
                let tcp = TcpStream::connect(config.get_addr()).await?;
                tcp.set_nodelay(true)?;
                Ok(Client::connect(config, tcp.compat_write()).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Run one statement on a fresh connection and collect its first result set.
    async fn fetch(&self, op: &'static str, sql: &str, params: &[TypedValue]) -> Result<Vec<Row>> {
        let span = debug_span!(
            "db.query",
            op = op,
            rows = tracing::field::Empty,
            duration_ms = tracing::field::Empty
        );
        let start = Instant::now();

        let rows = async {
            let mut client = self.connect().await?;
            let mut query = Query::new(sql.to_string());
            for param in params {
                query.bind(SqlParam(param.clone()));
            }
            let stream = query.query(&mut client).await?;
            let rows = stream.into_first_result().await?;
            Ok::<_, DbError>(rows)
        }
        .instrument(span.clone())
        .await?;

        span.record("rows", rows.len());
        span.record("duration_ms", start.elapsed().as_millis() as u64);
        Ok(rows)
    }
}

/// A [`TypedValue`] bound as a query parameter.
struct SqlParam(TypedValue);

impl<'a> IntoSql<'a> for SqlParam {
    fn into_sql(self) -> ColumnData<'a> {
        match self.0 {
            TypedValue::Null => ColumnData::String(None),
            TypedValue::Text(v) => v.into_sql(),
            TypedValue::Integer(v) => v.into_sql(),
            TypedValue::Decimal(v) => decimal_to_numeric(v).into_sql(),
            TypedValue::Double(v) => v.into_sql(),
            TypedValue::Single(v) => v.into_sql(),
            TypedValue::Boolean(v) => v.into_sql(),
            TypedValue::DateTime(v) => v.into_sql(),
            TypedValue::DateTimeOffset(v) => v.into_sql(),
            TypedValue::Duration(v) => v.into_sql(),
            TypedValue::Binary(v) => v.into_sql(),
        }
    }
}

fn decimal_to_numeric(value: Decimal) -> Numeric {
    // rust_decimal scales top out at 28, within SQL Server's 38.
    Numeric::new_with_scale(value.mantissa(), value.scale() as u8)
}

/// Map one TDS column value to a [`TypedValue`].
fn column_value(data: ColumnData<'static>) -> Result<TypedValue> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| TypedValue::Integer(v as i64)),
        ColumnData::I16(v) => v.map(|v| TypedValue::Integer(v as i64)),
        ColumnData::I32(v) => v.map(|v| TypedValue::Integer(v as i64)),
        ColumnData::I64(v) => v.map(TypedValue::Integer),
        ColumnData::F32(v) => v.map(TypedValue::Single),
        ColumnData::F64(v) => v.map(TypedValue::Double),
        ColumnData::Bit(v) => v.map(TypedValue::Boolean),
        ColumnData::String(v) => v.map(|s| TypedValue::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| TypedValue::Text(g.to_string().to_uppercase())),
        ColumnData::Binary(v) => v.map(|b| TypedValue::Binary(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| {
            TypedValue::Decimal(Decimal::from_i128_with_scale(n.value(), n.scale() as u32))
        }),
        ColumnData::Xml(v) => v.map(|x| TypedValue::Text(x.into_owned().into_string())),
        data @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => NaiveDateTime::from_sql(&data)?.map(TypedValue::DateTime),
        data @ ColumnData::Date(_) => NaiveDate::from_sql(&data)?
            .map(|d| TypedValue::DateTime(d.and_time(NaiveTime::default()))),
        data @ ColumnData::Time(_) => NaiveTime::from_sql(&data)?.map(TypedValue::Duration),
        data @ ColumnData::DateTimeOffset(_) => {
            DateTime::<FixedOffset>::from_sql(&data)?.map(TypedValue::DateTimeOffset)
        }
    };
    Ok(value.unwrap_or(TypedValue::Null))
}

fn row_snapshot(row: Row) -> Result<RowSnapshot> {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut snapshot = RowSnapshot::with_capacity(names.len());
    for (name, data) in names.into_iter().zip(row) {
        snapshot.insert(name, column_value(data)?);
    }
    Ok(snapshot)
}

fn required_str(row: &Row, idx: usize) -> Result<String> {
    row.try_get::<&str, _>(idx)?
        .map(str::to_string)
        .ok_or_else(|| DbError::TypeConversion(format!("unexpected NULL in catalog column {}", idx)))
}

fn temporal_table(row: &Row) -> Result<TemporalTable> {
    Ok(TemporalTable {
        base_schema_name: required_str(row, 0)?,
        base_table_name: required_str(row, 1)?,
        base_table_object_id: row.try_get::<i32, _>(2)?.unwrap_or_default(),
        history_schema_name: required_str(row, 3)?,
        history_table_name: required_str(row, 4)?,
        history_table_object_id: row.try_get::<i32, _>(5)?.unwrap_or_default(),
    })
}

fn column_metadata(row: &Row) -> Result<ColumnMetadata> {
    Ok(ColumnMetadata {
        name: required_str(row, 0)?,
        ordinal: row.try_get::<i32, _>(1)?.unwrap_or_default(),
        type_name: required_str(row, 2)?,
        max_length: row.try_get::<i16, _>(3)?.unwrap_or_default() as i32,
        precision: row.try_get::<u8, _>(4)?.unwrap_or_default() as i32,
        scale: row.try_get::<u8, _>(5)?.unwrap_or_default() as i32,
        is_nullable: row.try_get::<bool, _>(6)?.unwrap_or_default(),
        is_identity: row.try_get::<bool, _>(7)?.unwrap_or_default(),
        role: GenerationRole::from(row.try_get::<u8, _>(8)?.unwrap_or_default()),
    })
}

fn name_params(schema: &str, table: &str) -> [TypedValue; 2] {
    [TypedValue::from(schema), TypedValue::from(table)]
}

#[async_trait]
impl SchemaRepository for MssqlBackend {
    async fn temporal_tables(&self) -> Result<Vec<TemporalTable>> {
        let rows = self.fetch("temporal_tables", TEMPORAL_TABLES_SQL, &[]).await?;
        rows.iter().map(temporal_table).collect()
    }

    async fn temporal_table_by_name(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Option<TemporalTable>> {
        let sql = format!("{}{}", TEMPORAL_TABLES_SQL, TABLE_BY_NAME_FILTER);
        let rows = self
            .fetch("temporal_table_by_name", &sql, &name_params(schema, table))
            .await?;
        rows.first().map(temporal_table).transpose()
    }

    async fn primary_keys(&self, schema: &str, table: &str) -> Result<Vec<PrimaryKeyColumn>> {
        let rows = self
            .fetch("primary_keys", PRIMARY_KEYS_SQL, &name_params(schema, table))
            .await?;
        rows.iter()
            .map(|row| Ok(PrimaryKeyColumn::new(required_str(row, 0)?, required_str(row, 1)?)))
            .collect()
    }

    async fn table_columns_by_id(&self, object_id: i32) -> Result<Vec<ColumnMetadata>> {
        let sql = format!("{}{}", COLUMNS_SELECT, COLUMNS_BY_ID_FILTER);
        let rows = self
            .fetch("table_columns_by_id", &sql, &[TypedValue::from(object_id)])
            .await?;
        rows.iter().map(column_metadata).collect()
    }

    async fn table_columns_by_name(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnMetadata>> {
        let sql = format!("{}{}", COLUMNS_SELECT, COLUMNS_BY_NAME_FILTER);
        let rows = self
            .fetch("table_columns_by_name", &sql, &name_params(schema, table))
            .await?;
        rows.iter().map(column_metadata).collect()
    }
}

#[async_trait]
impl HistoryReader for MssqlBackend {
    async fn read_history(&self, query: &HistoryQuery) -> Result<Vec<RowSnapshot>> {
        let sql = query.render(ParamStyle::Positional);
        let params: Vec<TypedValue> = query.params().cloned().collect();
        debug!(table = %query.base(), params = params.len(), "reading history");

        let rows = self.fetch("read_history", &sql, &params).await?;
        rows.into_iter().map(row_snapshot).collect()
    }
}
