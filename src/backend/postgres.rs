use std::{
    error::Error,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use futures::{pin_mut, TryStreamExt};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_postgres::{
    types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type},
    CancelToken, Client, NoTls,
};

use super::{Backend, Transaction};
use crate::{
    config::Config,
    core::{Datum, ErrorKind, RowSet, SQLError},
    util::Logger,
};

type BoxError = Box<dyn Error + Sync + Send>;

/// PostgreSQL backend over a fixed set of connections. Each connection is
/// locked for the lifetime of one transaction.
pub struct PgBackend {
    connections: Vec<Arc<Mutex<Client>>>,
    next: AtomicUsize,
    logger: Logger,
}

impl PgBackend {
    pub async fn connect(config: &Config, logger: Logger) -> Result<Self, SQLError> {
        let conn = config.connection_string();
        let pool_size = config.pool_size.max(1);

        let mut connections = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let (client, connection) = tokio_postgres::connect(&conn, NoTls)
                .await
                .map_err(|e| SQLError::new(ErrorKind::ConnectionError, e.to_string()))?;

            let conn_logger = logger.clone();
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    conn_logger.error(format_args!("connection closed: {}", e));
                }
            });

            connections.push(Arc::new(Mutex::new(client)));
        }

        logger.info(format_args!(
            "Connected to {}:{}/{} with {} connection(s)",
            config.host, config.port, config.dbname, pool_size
        ));

        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
            logger,
        })
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn begin(&self) -> Result<Box<dyn Transaction>, SQLError> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        let client = self.connections[index].clone().lock_owned().await;

        client
            .batch_execute("BEGIN")
            .await
            .map_err(transaction_error)?;

        Ok(Box::new(PgTransaction {
            cancel_token: client.cancel_token(),
            client: Some(client),
            in_flight: false,
            logger: self.logger.clone(),
        }))
    }
}

/// Holds the connection lock until the transaction is finished. If it is
/// dropped while still open the rollback runs on a spawned task that keeps
/// the lock, so no other caller can see the connection mid-transaction. A
/// statement still running on the server at that point is cancelled first.
struct PgTransaction {
    client: Option<OwnedMutexGuard<Client>>,
    cancel_token: CancelToken,
    /// Set while a statement is awaiting the server.
    in_flight: bool,
    logger: Logger,
}

impl PgTransaction {
    fn client(&self) -> Result<&Client, SQLError> {
        self.client.as_deref().ok_or_else(finished)
    }

    async fn finish(mut self: Box<Self>, command: &str) -> Result<(), SQLError> {
        let result = self.client()?.batch_execute(command).await;
        match result {
            Ok(()) => {
                self.client.take();
                Ok(())
            }
            Err(e) => Err(transaction_error(e)),
        }
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn query(&mut self, sql: &str, params: &[Datum]) -> Result<RowSet, SQLError> {
        let client = self.client.as_deref().ok_or_else(finished)?;

        self.in_flight = true;
        let result = fetch_rows(client, sql, params).await;
        self.in_flight = false;
        result
    }

    async fn execute(&mut self, sql: &str, params: &[Datum]) -> Result<u64, SQLError> {
        let client = self.client.as_deref().ok_or_else(finished)?;

        self.in_flight = true;
        let result = client
            .execute_raw(sql, params.iter().map(|p| p as &(dyn ToSql + Sync)))
            .await
            .map_err(statement_error);
        self.in_flight = false;
        result
    }

    async fn commit(self: Box<Self>) -> Result<(), SQLError> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> Result<(), SQLError> {
        self.finish("ROLLBACK").await
    }
}

async fn fetch_rows(client: &Client, sql: &str, params: &[Datum]) -> Result<RowSet, SQLError> {
    // Prepare first so that column names are known even for empty results.
    let statement = client.prepare(sql).await.map_err(statement_error)?;
    let columns = statement
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect::<Vec<_>>();

    let stream = client
        .query_raw(&statement, params.iter().map(|p| p as &(dyn ToSql + Sync)))
        .await
        .map_err(statement_error)?;
    pin_mut!(stream);

    let mut rows = vec![];
    while let Some(row) = stream.try_next().await.map_err(statement_error)? {
        let mut values = Vec::with_capacity(row.len());
        for index in 0..row.len() {
            let value: Datum = row.try_get(index).map_err(statement_error)?;
            values.push(value);
        }
        rows.push(values);
    }

    Ok(RowSet { columns, rows })
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        let client = match self.client.take() {
            Some(client) => client,
            None => return,
        };

        let logger = self.logger.clone();
        let cancel_token = self.in_flight.then(|| self.cancel_token.clone());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Some(cancel_token) = cancel_token {
                        if let Err(e) = cancel_token.cancel_query(NoTls).await {
                            logger.warn(format_args!("cancelling abandoned statement failed: {}", e));
                        }
                    }
                    if let Err(e) = client.batch_execute("ROLLBACK").await {
                        logger.warn(format_args!("rollback of abandoned transaction failed: {}", e));
                    }
                });
            }
            Err(_) => logger.error(format_args!(
                "transaction dropped outside a runtime; connection left for the server to reset"
            )),
        }
    }
}

fn finished() -> SQLError {
    SQLError::new(ErrorKind::TransactionError, "transaction already finished")
}

fn statement_error(err: tokio_postgres::Error) -> SQLError {
    if let Some(db) = err.as_db_error() {
        return SQLError::new(
            ErrorKind::ExecutionError,
            format!("{} (SQLSTATE {})", db.message(), db.code().code()),
        );
    }

    SQLError::new(ErrorKind::ConnectionError, err.to_string())
}

fn transaction_error(err: tokio_postgres::Error) -> SQLError {
    if err.is_closed() {
        return SQLError::new(ErrorKind::ConnectionError, err.to_string());
    }

    let message = match err.as_db_error() {
        Some(db) => format!("{} (SQLSTATE {})", db.message(), db.code().code()),
        None => err.to_string(),
    };
    SQLError::new(ErrorKind::TransactionError, message)
}

impl ToSql for Datum {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Datum::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Datum::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Datum::String(v) => v.as_str().to_sql(ty, out),
            Datum::Boolean(v) => v.to_sql(ty, out),
            Datum::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Datum::Bytes(v) => v.as_slice().to_sql(ty, out),
            Datum::Null => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Datum {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode(ty, raw)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Datum::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Decodes one binary-format value of any type.
fn decode(ty: &Type, raw: &[u8]) -> Result<Datum, BoxError> {
    let datum = match *ty {
        Type::BOOL => Datum::Boolean(bool::from_sql(ty, raw)?),
        Type::CHAR => Datum::String(((i8::from_sql(ty, raw)? as u8) as char).to_string()),
        Type::INT2 => Datum::Int(i16::from_sql(ty, raw)? as i64),
        Type::INT4 => Datum::Int(i32::from_sql(ty, raw)? as i64),
        Type::INT8 => Datum::Int(i64::from_sql(ty, raw)?),
        Type::OID => Datum::Int(u32::from_sql(ty, raw)? as i64),
        Type::FLOAT4 => Datum::Float(f32::from_sql(ty, raw)? as f64),
        Type::FLOAT8 => Datum::Float(f64::from_sql(ty, raw)?),
        Type::NUMERIC => Datum::String(decode_numeric(raw)?),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN | Type::JSON => {
            Datum::String(<&str as FromSql>::from_sql(ty, raw)?.to_string())
        }
        Type::JSONB => match raw.split_first() {
            Some((1, body)) => Datum::String(std::str::from_utf8(body)?.to_string()),
            _ => return Err("unsupported jsonb version".into()),
        },
        Type::TIMESTAMPTZ => Datum::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?),
        Type::TIMESTAMP => Datum::Timestamp(Utc.from_utc_datetime(&NaiveDateTime::from_sql(ty, raw)?)),
        Type::DATE => Datum::String(NaiveDate::from_sql(ty, raw)?.to_string()),
        Type::UUID => Datum::String(format_uuid(raw)?),
        Type::BYTEA => Datum::Bytes(raw.to_vec()),
        _ => match ty.kind() {
            Kind::Enum(_) => Datum::String(std::str::from_utf8(raw)?.to_string()),
            Kind::Domain(base) => decode(base, raw)?,
            _ => Datum::Bytes(raw.to_vec()),
        },
    };

    Ok(datum)
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Renders a binary NUMERIC (base-10000 digit groups) as decimal text,
/// keeping the declared display scale.
fn decode_numeric(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() < 8 {
        return Err("numeric payload too short".into());
    }

    let read = |at: usize| u16::from_be_bytes([raw[at], raw[at + 1]]);
    let ndigits = read(0) as usize;
    let weight = read(2) as i16 as i64;
    let sign = read(4);
    let dscale = read(6) as usize;

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    if raw.len() < 8 + ndigits * 2 {
        return Err("numeric payload truncated".into());
    }
    let digits = (0..ndigits).map(|i| read(8 + i * 2)).collect::<Vec<_>>();
    let group = |index: i64| {
        if index < 0 {
            0
        } else {
            digits.get(index as usize).copied().unwrap_or(0)
        }
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&group(0).to_string());
        for index in 1..=weight {
            out.push_str(&format!("{:04}", group(index)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::new();
        let mut index = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", group(index)));
            index += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

fn format_uuid(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 16 {
        return Err("uuid payload must be 16 bytes".into());
    }

    let hex = raw.iter().map(|b| format!("{:02x}", b)).collect::<String>();
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(ndigits: u16, weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = vec![];
        for word in [ndigits, weight as u16, sign, dscale] {
            raw.extend_from_slice(&word.to_be_bytes());
        }
        for digit in digits {
            raw.extend_from_slice(&digit.to_be_bytes());
        }
        raw
    }

    #[test]
    fn numeric_renders_integer_and_fraction() {
        let raw = numeric(2, 0, 0, 2, &[123, 4500]);
        assert_eq!(decode_numeric(&raw).unwrap(), "123.45");

        let raw = numeric(2, 1, NUMERIC_NEG, 0, &[1, 2]);
        assert_eq!(decode_numeric(&raw).unwrap(), "-10002");
    }

    #[test]
    fn numeric_handles_small_magnitudes_and_specials() {
        // 0.00001
        let raw = numeric(1, -2, 0, 5, &[1000]);
        assert_eq!(decode_numeric(&raw).unwrap(), "0.00001");

        let raw = numeric(0, 0, NUMERIC_NAN, 0, &[]);
        assert_eq!(decode_numeric(&raw).unwrap(), "NaN");

        assert!(decode_numeric(&[0, 1]).is_err());
    }

    #[test]
    fn decode_maps_common_types() {
        assert_eq!(decode(&Type::INT4, &7i32.to_be_bytes()).unwrap(), Datum::Int(7));
        assert_eq!(decode(&Type::BOOL, &[1]).unwrap(), Datum::Boolean(true));
        assert_eq!(
            decode(&Type::VARCHAR, b"variant-b").unwrap(),
            Datum::from("variant-b")
        );
        assert_eq!(
            decode(&Type::JSONB, b"\x01{\"a\":1}").unwrap(),
            Datum::from("{\"a\":1}")
        );
        assert_eq!(
            decode(&Type::INET, &[2, 32, 0, 4, 127, 0, 0, 1]).unwrap(),
            Datum::Bytes(vec![2, 32, 0, 4, 127, 0, 0, 1])
        );
    }

    #[test]
    fn uuid_is_hyphenated() {
        let raw = (0u8..16).collect::<Vec<_>>();
        assert_eq!(
            format_uuid(&raw).unwrap(),
            "00010203-0405-0607-0809-0a0b0c0d0e0f"
        );
    }

    #[test]
    fn datum_binds_null_and_narrows_ints() {
        let mut out = BytesMut::new();
        assert!(matches!(
            Datum::Null.to_sql(&Type::INT4, &mut out).unwrap(),
            IsNull::Yes
        ));

        Datum::Int(42).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(&out[..], &42i32.to_be_bytes());

        assert!(Datum::Int(i64::MAX).to_sql(&Type::INT2, &mut out).is_err());
    }
}
