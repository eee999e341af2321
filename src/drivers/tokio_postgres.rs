use std::error::Error;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime,
};
use futures_util::TryStreamExt;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use tokio_postgres::NoTls;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::dialect::Dialect;
use crate::error::{PropDbError, Result};
use crate::traits::DatabaseDriver;
use crate::types::{RawQueryResult, SqlValue};

type BoxError = Box<dyn Error + Sync + Send>;

/// PostgreSQL driver implementation using tokio-postgres behind a
/// bounded deadpool connection pool.
pub struct TokioPostgresDriver {
    pool: Pool,
}

impl TokioPostgresDriver {
    /// Build the pool and check that the server answers.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let mut pg = Config::new();
        pg.host = Some(config.host.clone());
        pg.port = Some(config.port);
        pg.dbname = Some(config.database.clone());
        pg.user = Some(config.user.clone());
        pg.password = Some(config.password.clone());
        pg.connect_timeout = Some(config.connect_timeout);
        pg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(config.acquire_timeout);
        pool_config.timeouts.create = Some(config.connect_timeout);
        pool_config.timeouts.recycle = Some(config.connect_timeout);
        pg.pool = Some(pool_config);

        let pool = pg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| PropDbError::ConnectionFailed(e.to_string()))?;

        let driver = Self { pool };
        driver
            .client()
            .await?
            .simple_query("SELECT 1")
            .await
            .map_err(|e| PropDbError::ConnectionFailed(e.to_string()))?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            pool_size = config.pool_size,
            "Connected to PostgreSQL"
        );
        Ok(driver)
    }

    async fn client(&self) -> Result<Object> {
        self.pool.get().await.map_err(|e| {
            error!("PostgreSQL connection unavailable: {}", e);
            PropDbError::ConnectionFailed(e.to_string())
        })
    }
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    /// Runs any statement; mutations without RETURNING yield no rows but
    /// still report their affected count.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        debug!(sql, params = params.len(), "postgres query");
        let client = self.client().await?;

        let stream = client
            .query_raw(sql, params.iter().map(|p| p as &dyn ToSql))
            .await
            .map_err(query_failed)?;
        let mut stream = std::pin::pin!(stream);

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        while let Some(row) = stream.try_next().await.map_err(query_failed)? {
            if columns.is_empty() {
                columns = row.columns().iter().map(|c| c.name().to_string()).collect();
            }
            let values = (0..row.len())
                .map(|i| row.try_get::<_, SqlValue>(i))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(query_failed)?;
            rows.push(values);
        }

        let mut result = RawQueryResult::new(columns, rows);
        result.rows_affected = stream.rows_affected();
        Ok(result)
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        debug!(sql, params = params.len(), "postgres execute");
        let client = self.client().await?;
        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let affected = client.execute(sql, &params).await.map_err(query_failed)?;
        Ok(RawQueryResult::mutation(affected, None))
    }

    async fn execute_batch(&self, sql: &str) -> Result<()> {
        self.client()
            .await?
            .batch_execute(sql)
            .await
            .map_err(query_failed)
    }

    async fn close(&self) {
        self.pool.close();
        info!("Closed PostgreSQL pool");
    }
}

fn query_failed(e: tokio_postgres::Error) -> PropDbError {
    PropDbError::QueryFailed(e.to_string())
}

/// Parameters go over the wire in text format so the server coerces each
/// one to the column type it is compared with or assigned to.
impl ToSql for SqlValue {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        let text = match self {
            SqlValue::Null => return Ok(IsNull::Yes),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Int64(v) => v.to_string(),
            SqlValue::Float64(v) => v.to_string(),
            SqlValue::Bool(b) => if *b { "t" } else { "f" }.to_string(),
        };
        out.extend_from_slice(text.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> tokio_postgres::types::Format {
        tokio_postgres::types::Format::Text
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for SqlValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => SqlValue::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => SqlValue::Int64(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => SqlValue::Int64(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => SqlValue::Int64(i64::from_sql(ty, raw)?),
            Type::OID => SqlValue::Int64(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => SqlValue::Float64(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => SqlValue::Float64(f64::from_sql(ty, raw)?),
            Type::NUMERIC => SqlValue::Float64(decode_numeric(raw)?.parse()?),
            Type::DATE => SqlValue::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIMESTAMP => SqlValue::Text(
                NaiveDateTime::from_sql(ty, raw)?
                    .format("%Y-%m-%d %H:%M:%S%.f")
                    .to_string(),
            ),
            Type::TIMESTAMPTZ => {
                SqlValue::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339())
            }
            _ if <String as FromSql>::accepts(ty) => SqlValue::Text(String::from_sql(ty, raw)?),
            _ => return Err(format!("unsupported column type {}", ty).into()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> std::result::Result<Self, BoxError> {
        Ok(SqlValue::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Binary NUMERIC → decimal string. Layout: ndigits, weight, sign, dscale
/// (all 16-bit), then ndigits base-10000 digits.
fn decode_numeric(raw: &[u8]) -> std::result::Result<String, BoxError> {
    fn word(raw: &[u8], at: usize) -> std::result::Result<u16, BoxError> {
        raw.get(at..at + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| "truncated NUMERIC value".into())
    }

    let ndigits = word(raw, 0)? as usize;
    let weight = word(raw, 2)? as i16 as i32;
    let sign = word(raw, 4)?;
    let dscale = word(raw, 6)? as usize;

    match sign {
        0x0000 | 0x4000 => {}
        0xC000 => return Ok("NaN".to_string()),
        other => return Err(format!("invalid NUMERIC sign {:#x}", other).into()),
    }

    let digits = (0..ndigits)
        .map(|i| word(raw, 8 + i * 2))
        .collect::<std::result::Result<Vec<u16>, BoxError>>()?;

    let mut int_part = String::new();
    for pos in 0..=weight.max(-1) {
        let d = digits.get(pos as usize).copied().unwrap_or(0);
        if int_part.is_empty() {
            int_part = d.to_string();
        } else {
            int_part.push_str(&format!("{:04}", d));
        }
    }
    if int_part.is_empty() {
        int_part.push('0');
    }

    let mut frac_part = String::new();
    let mut pos = weight + 1;
    while frac_part.len() < dscale {
        let d = if pos < 0 {
            0
        } else {
            digits.get(pos as usize).copied().unwrap_or(0)
        };
        frac_part.push_str(&format!("{:04}", d));
        pos += 1;
    }
    frac_part.truncate(dscale);

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }
    out.push_str(&int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(&frac_part);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            raw.extend_from_slice(&d.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_decode_numeric() {
        // 1500.50
        assert_eq!(
            decode_numeric(&numeric(0, 0, 2, &[1500, 5000])).unwrap(),
            "1500.50"
        );
        // 123456.7
        assert_eq!(
            decode_numeric(&numeric(1, 0, 1, &[12, 3456, 7000])).unwrap(),
            "123456.7"
        );
        // -0.0042
        assert_eq!(
            decode_numeric(&numeric(-1, 0x4000, 4, &[42])).unwrap(),
            "-0.0042"
        );
        // 0
        assert_eq!(decode_numeric(&numeric(0, 0, 0, &[])).unwrap(), "0");
        // 20000 (trailing zero group omitted on the wire)
        assert_eq!(decode_numeric(&numeric(1, 0, 0, &[2])).unwrap(), "20000");
    }

    #[test]
    fn test_decode_numeric_rejects_truncated_input() {
        assert!(decode_numeric(&[0, 1, 0, 0]).is_err());
    }

    #[test]
    fn test_decode_numeric_special_values() {
        assert_eq!(decode_numeric(&numeric(0, 0xC000, 0, &[])).unwrap(), "NaN");
        assert!(decode_numeric(&numeric(0, 0x1234, 0, &[])).is_err());
        // 0.000012 sits two groups below the point
        assert_eq!(
            decode_numeric(&numeric(-2, 0, 6, &[1200])).unwrap(),
            "0.000012"
        );
        // -7 with display scale kept: -7.00
        assert_eq!(
            decode_numeric(&numeric(0, 0x4000, 2, &[7])).unwrap(),
            "-7.00"
        );
    }

    #[test]
    fn test_params_encode_as_text() {
        let mut out = BytesMut::new();
        let is_null = SqlValue::Float64(1500.5)
            .to_sql(&Type::NUMERIC, &mut out)
            .unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&out[..], b"1500.5");

        let mut out = BytesMut::new();
        assert!(matches!(
            SqlValue::Null.to_sql(&Type::INT4, &mut out).unwrap(),
            IsNull::Yes
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_decodes_integer_widths() {
        assert_eq!(
            SqlValue::from_sql(&Type::INT4, &7i32.to_be_bytes()).unwrap(),
            SqlValue::Int64(7)
        );
        assert_eq!(
            SqlValue::from_sql(&Type::INT8, &(-3i64).to_be_bytes()).unwrap(),
            SqlValue::Int64(-3)
        );
        assert_eq!(
            SqlValue::from_sql(&Type::TEXT, b"hello").unwrap(),
            SqlValue::Text("hello".to_string())
        );
    }
}
