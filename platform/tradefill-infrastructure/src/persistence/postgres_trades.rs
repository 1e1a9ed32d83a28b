use postgres::NoTls;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use std::path::Path;
use std::time::Instant;
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::value_objects::coverage::Coverage;
use tradefill_domain::value_objects::interval::Interval;
use tradefill_domain::value_objects::trade::{Side, TradeRecord};

type PgPool = Pool<PostgresConnectionManager<NoTls>>;
type PgConnection = PooledConnection<PostgresConnectionManager<NoTls>>;

/// Trade series in one Postgres table keyed by `(symbol, trade_id)`.
#[derive(Debug, Clone)]
pub struct PostgresTradeStore {
    pool: PgPool,
    pub table: String,
}

impl PostgresTradeStore {
    pub fn new(db_url: &str, table: String, pool_max_size: u32) -> Result<Self, String> {
        if let Err(err) = validate_table_name(&table) {
            return Err(format!("invalid trades table '{}': {}", table, err));
        }

        let config = db_url
            .parse::<postgres::Config>()
            .map_err(|err| format!("invalid postgres db url: {err}"))?;
        let manager = PostgresConnectionManager::new(config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_max_size)
            .build(manager)
            .map_err(|err| format!("failed to build postgres pool: {err}"))?;

        Ok(Self { pool, table })
    }

    /// Creates the table and index if missing. A file path replaces the
    /// built-in schema.
    pub fn migrate(&self, migrations_path: Option<&Path>) -> Result<(), String> {
        let sql = match migrations_path {
            Some(path) => std::fs::read_to_string(path).map_err(|err| {
                format!("failed to read migrations file {}: {}", path.display(), err)
            })?,
            None => schema_sql(&self.table)?,
        };
        let mut client = self.checkout("migrate")?;
        client
            .batch_execute(&sql)
            .map_err(|err| format!("failed to apply migrations: {err}"))?;
        tracing::info!(table = %self.table, "migrations applied");
        Ok(())
    }

    fn checkout(&self, op: &'static str) -> Result<PgConnection, String> {
        let started = Instant::now();
        match self.pool.get() {
            Ok(client) => {
                metrics::histogram!("tradefill.infra.postgres.pool.get_ms")
                    .record(started.elapsed().as_secs_f64() * 1000.0);
                Ok(client)
            }
            Err(err) => {
                metrics::counter!("tradefill.infra.postgres.errors_total", "op" => op, "stage" => "pool_get")
                    .increment(1);
                tracing::error!(op, error = %err, "failed to checkout postgres connection");
                Err(format!("failed to checkout postgres connection: {err}"))
            }
        }
    }

    fn query_edge(
        &self,
        client: &mut PgConnection,
        symbol: &str,
        order: &str,
    ) -> Result<Option<(i64, i64)>, String> {
        let query = format!(
            "SELECT trade_id, ts FROM {} WHERE symbol = $1 ORDER BY trade_id {} LIMIT 1",
            self.table, order
        );
        let row = client
            .query_opt(&query, &[&symbol])
            .map_err(|err| format!("failed to query coverage: {err}"))?;
        Ok(row.map(|row| (row.get(0), row.get(1))))
    }
}

fn timed<T>(op: &'static str, run: impl FnOnce() -> Result<T, String>) -> Result<T, String> {
    let started = Instant::now();
    let result = run();
    let label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!("tradefill.infra.postgres.calls_total", "op" => op, "result" => label)
        .increment(1);
    metrics::histogram!("tradefill.infra.postgres.op_ms", "op" => op)
        .record(started.elapsed().as_secs_f64() * 1000.0);
    result
}

impl TradeStore for PostgresTradeStore {
    fn coverage(&self, symbol: &str) -> Result<Option<Coverage>, String> {
        timed("coverage", || {
            let mut client = self.checkout("coverage")?;
            let oldest = self.query_edge(&mut client, symbol, "ASC")?;
            let newest = self.query_edge(&mut client, symbol, "DESC")?;
            Ok(match (oldest, newest) {
                (Some((oldest_id, oldest_ts)), Some((newest_id, newest_ts))) => Some(Coverage {
                    oldest_ts,
                    oldest_id,
                    newest_ts,
                    newest_id,
                }),
                _ => None,
            })
        })
    }

    fn insert_if_absent(&self, symbol: &str, records: &[TradeRecord]) -> Result<u64, String> {
        if records.is_empty() {
            return Ok(0);
        }
        let span = tracing::debug_span!(
            "infra.postgres.insert_trades",
            table = %self.table,
            symbol = %symbol,
            records = records.len()
        );
        let _enter = span.enter();
        let result = timed("insert", || {
            let mut client = self.checkout("insert")?;
            let mut transaction = client
                .transaction()
                .map_err(|err| format!("failed to start transaction: {err}"))?;
            let statement = transaction
                .prepare(&format!(
                    "INSERT INTO {} (symbol, trade_id, ts, price, amount, side) \
                     VALUES ($1, $2, $3, $4, $5, $6) \
                     ON CONFLICT (symbol, trade_id) DO NOTHING",
                    self.table
                ))
                .map_err(|err| format!("failed to prepare insert: {err}"))?;

            let mut added = 0u64;
            for record in records {
                added += transaction
                    .execute(
                        &statement,
                        &[
                            &symbol,
                            &record.id,
                            &record.timestamp,
                            &record.price,
                            &record.amount,
                            &record.side.as_str(),
                        ],
                    )
                    .map_err(|err| format!("insert failed at trade {}: {err}", record.id))?;
            }
            transaction
                .commit()
                .map_err(|err| format!("failed to commit: {err}"))?;
            Ok(added)
        });

        match &result {
            Ok(added) => {
                metrics::counter!("tradefill.infra.postgres.rows_inserted_total").increment(*added);
                tracing::debug!(added, "trades inserted");
            }
            Err(err) => tracing::error!(error = %err, "failed to insert trades"),
        }
        result
    }

    fn drop_symbol(&self, symbol: &str) -> Result<(), String> {
        timed("drop", || {
            let mut client = self.checkout("drop")?;
            let removed = client
                .execute(&format!("DELETE FROM {} WHERE symbol = $1", self.table), &[&symbol])
                .map_err(|err| format!("failed to drop {symbol}: {err}"))?;
            tracing::info!(symbol = %symbol, removed, "series dropped");
            Ok(())
        })
    }

    fn list_symbols(&self) -> Result<Vec<String>, String> {
        timed("list_symbols", || {
            let mut client = self.checkout("list_symbols")?;
            let rows = client
                .query(
                    &format!("SELECT DISTINCT symbol FROM {} ORDER BY symbol", self.table),
                    &[],
                )
                .map_err(|err| format!("failed to list symbols: {err}"))?;
            Ok(rows.iter().map(|row| row.get(0)).collect())
        })
    }

    fn count(&self, symbol: &str) -> Result<u64, String> {
        timed("count", || {
            let mut client = self.checkout("count")?;
            let row = client
                .query_one(
                    &format!("SELECT COUNT(*) FROM {} WHERE symbol = $1", self.table),
                    &[&symbol],
                )
                .map_err(|err| format!("failed to count {symbol}: {err}"))?;
            let count: i64 = row.get(0);
            Ok(count.max(0) as u64)
        })
    }

    fn load_range(&self, symbol: &str, interval: &Interval) -> Result<Vec<TradeRecord>, String> {
        timed("load_range", || {
            let mut client = self.checkout("load_range")?;
            let rows = client
                .query(
                    &format!(
                        "SELECT trade_id, ts, price, amount, side FROM {} \
                         WHERE symbol = $1 AND ts >= $2 AND ts < $3 \
                         ORDER BY trade_id ASC",
                        self.table
                    ),
                    &[&symbol, &interval.from_ts, &interval.to_ts],
                )
                .map_err(|err| format!("failed to load trades: {err}"))?;
            rows.iter()
                .map(|row| {
                    let side: String = row.get(4);
                    Ok(TradeRecord {
                        id: row.get(0),
                        timestamp: row.get(1),
                        price: row.get(2),
                        amount: row.get(3),
                        side: Side::parse(&side)?,
                    })
                })
                .collect::<Result<Vec<_>, String>>()
        })
    }
}

/// DDL for `table`, matching `ops/migrations/0001_create_trades.sql`.
pub fn schema_sql(table: &str) -> Result<String, String> {
    validate_table_name(table)?;
    let index_prefix = table.rsplit('.').next().unwrap_or(table);
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    \
             symbol TEXT NOT NULL,\n    \
             trade_id BIGINT NOT NULL,\n    \
             ts BIGINT NOT NULL,\n    \
             price DOUBLE PRECISION NOT NULL,\n    \
             amount DOUBLE PRECISION NOT NULL,\n    \
             side TEXT NOT NULL,\n    \
             PRIMARY KEY (symbol, trade_id)\n\
         );\n\n\
         CREATE INDEX IF NOT EXISTS {index_prefix}_symbol_ts_idx ON {table} (symbol, ts);\n"
    ))
}

fn validate_table_name(table: &str) -> Result<(), String> {
    if table.is_empty() {
        return Err("table name is empty".to_string());
    }
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(format!("invalid table name: {table}"));
    }
    for part in parts {
        let mut chars = part.chars();
        let valid_start = matches!(chars.next(), Some(ch) if ch.is_ascii_alphabetic() || ch == '_');
        if !valid_start || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(format!("invalid table name: {table}"));
        }
    }
    Ok(())
}
