use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dbcourier_core::{dump_preamble, DumpDocument, Dumper, Error, Result, SqlValue};
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysqlDumperConfig {
    /// MySQL server host
    pub host: String,

    /// MySQL server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Account used for dumping; needs SELECT and SHOW VIEW on every target
    pub username: String,

    /// Account password
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    3306
}

impl Default for MysqlDumperConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_port(),
            username: "root".to_string(),
            password: String::new(),
        }
    }
}

/// Produces replayable logical dumps over a connection scoped to one target
/// database at a time.
pub struct MysqlDumper {
    config: MysqlDumperConfig,
}

impl MysqlDumper {
    pub fn new(config: MysqlDumperConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self, database: &str) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.username)
            .password(&self.config.password)
            .database(database)
    }
}

#[async_trait]
impl Dumper for MysqlDumper {
    async fn dump(&self, target: &str) -> Result<DumpDocument> {
        info!("[{}] Connecting for dump", target);
        let mut conn = MySqlConnection::connect_with(&self.connect_options(target))
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to '{}': {}", target, e)))?;

        let result = dump_database(&mut conn, target).await;

        // the connection is released on every exit path, success or failure
        if let Err(e) = conn.close().await {
            debug!("[{}] Closing the connection failed: {}", target, e);
        }

        result
    }
}

async fn dump_database(conn: &mut MySqlConnection, target: &str) -> Result<DumpDocument> {
    let generated_at = Utc::now();
    let mut sql = dump_preamble(target, generated_at);

    // table order is whatever the engine reports, no re-sorting
    let tables: Vec<MySqlRow> = sqlx::query("SHOW TABLES")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| Error::Query(format!("Failed to list tables in '{}': {}", target, e)))?;

    let mut table_names = Vec::with_capacity(tables.len());
    for row in &tables {
        let table: String = row
            .try_get(0)
            .map_err(|e| Error::Query(format!("Failed to read table name: {}", e)))?;
        table_names.push(table);
    }
    debug!("[{}] Dumping {} table(s)", target, table_names.len());

    for table in &table_names {
        append_table(conn, table, &mut sql).await?;
    }

    Ok(DumpDocument {
        database: target.to_string(),
        generated_at,
        sql,
    })
}

async fn append_table(conn: &mut MySqlConnection, table: &str, out: &mut String) -> Result<()> {
    let create: MySqlRow = sqlx::query(&format!("SHOW CREATE TABLE `{table}`"))
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| Error::Query(format!("Failed to read schema of `{}`: {}", table, e)))?;
    let schema: String = create
        .try_get(1)
        .map_err(|e| Error::Query(format!("Failed to read schema of `{}`: {}", table, e)))?;

    out.push_str(&schema);
    out.push_str(";\n");

    let rows: Vec<MySqlRow> = sqlx::query(&format!("SELECT * FROM `{table}`"))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| Error::Query(format!("Failed to read rows of `{}`: {}", table, e)))?;

    for row in &rows {
        let mut values = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            values.push(read_value(row, idx)?);
        }
        out.push_str(&insert_statement(table, &values));
    }

    out.push('\n');
    Ok(())
}

/// One data-insertion statement per row, column order as reported.
fn insert_statement(table: &str, values: &[SqlValue]) -> String {
    let rendered: Vec<String> = values.iter().map(SqlValue::render).collect();
    format!("INSERT INTO `{}` VALUES ({});\n", table, rendered.join(", "))
}

fn read_value(row: &MySqlRow, idx: usize) -> Result<SqlValue> {
    let raw = row
        .try_get_raw(idx)
        .map_err(|e| Error::Query(format!("Failed to read column {}: {}", idx, e)))?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let column = &row.columns()[idx];
    let type_name = column.type_info().name();
    let decode_err =
        |e: sqlx::Error| Error::Query(format!("Failed to decode `{}`: {}", column.name(), e));

    let value = match type_name {
        "BOOLEAN" => SqlValue::Text((row.try_get::<bool, _>(idx).map_err(decode_err)? as u8).to_string()),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            SqlValue::Text(row.try_get::<i64, _>(idx).map_err(decode_err)?.to_string())
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" | "BIT" => {
            SqlValue::Text(row.try_get::<u64, _>(idx).map_err(decode_err)?.to_string())
        }
        "FLOAT" => SqlValue::Text(row.try_get::<f32, _>(idx).map_err(decode_err)?.to_string()),
        "DOUBLE" => SqlValue::Text(row.try_get::<f64, _>(idx).map_err(decode_err)?.to_string()),
        "DATETIME" | "TIMESTAMP" => {
            SqlValue::Timestamp(row.try_get::<NaiveDateTime, _>(idx).map_err(decode_err)?)
        }
        "DATE" => SqlValue::Text(
            row.try_get::<NaiveDate, _>(idx)
                .map_err(decode_err)?
                .format("%Y-%m-%d")
                .to_string(),
        ),
        "TIME" => SqlValue::Text(
            row.try_get::<NaiveTime, _>(idx)
                .map_err(decode_err)?
                .format("%H:%M:%S")
                .to_string(),
        ),
        "YEAR" => SqlValue::Text(row.try_get::<u16, _>(idx).map_err(decode_err)?.to_string()),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            SqlValue::Bytes(row.try_get::<Vec<u8>, _>(idx).map_err(decode_err)?)
        }
        "JSON" => SqlValue::Text(
            row.try_get::<serde_json::Value, _>(idx)
                .map_err(decode_err)?
                .to_string(),
        ),
        _ => SqlValue::Text(row.try_get::<String, _>(idx).map_err(decode_err)?),
    };

    Ok(value)
}
