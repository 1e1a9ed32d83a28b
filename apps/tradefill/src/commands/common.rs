use super::Globals;
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tradefill_application::config::{
    load_config_or_default, resolve_db_url, resolve_pool_max_size, resolve_remote,
    resolve_sync_settings, resolve_table, Config, DB_URL_ENV,
};
use tradefill_application::executor::SyncSettings;
use tradefill_domain::services::planner::PlanRequest;
use tradefill_domain::value_objects::bound::Bound;
use tradefill_infrastructure::persistence::postgres_trades::PostgresTradeStore;
use tradefill_infrastructure::remote::binance::BinanceTradeSource;

pub struct Context {
    pub config: Config,
    db_url: Option<String>,
}

impl Context {
    pub fn load(globals: &Globals) -> Result<Self, String> {
        let config = load_config_or_default(globals.config.as_deref())?;
        match &globals.config {
            Some(path) => tracing::debug!(config = %path.display(), "config loaded"),
            None => tracing::debug!("no config file, using defaults"),
        }
        Ok(Self {
            config,
            db_url: globals.db_url.clone(),
        })
    }

    pub fn open_store(&self) -> Result<PostgresTradeStore, String> {
        let env_url = std::env::var(DB_URL_ENV).ok();
        let url = resolve_db_url(self.db_url.as_deref(), env_url.as_deref(), &self.config)?;
        let table = resolve_table(&self.config);
        let pool_max_size = resolve_pool_max_size(&self.config)?;
        tracing::debug!(table = %table, pool_max_size, "opening trade store");
        PostgresTradeStore::new(&url, table, pool_max_size)
    }

    pub fn open_source(&self) -> Result<BinanceTradeSource, String> {
        let remote = resolve_remote(&self.config)?;
        tracing::debug!(
            base_url = %remote.base_url,
            page_size = remote.page_size,
            "opening binance source"
        );
        BinanceTradeSource::new(&remote.base_url, remote.page_size, remote.timeout)
    }

    pub fn sync_settings(&self) -> Result<SyncSettings, String> {
        resolve_sync_settings(&self.config)
    }
}

pub fn plan_request(
    from: Option<&str>,
    to: Option<&str>,
    overwrite: bool,
) -> Result<PlanRequest, String> {
    let from = Bound::from_option(from).map_err(|err| format!("invalid --from: {err}"))?;
    let to = Bound::from_option(to).map_err(|err| format!("invalid --to: {err}"))?;
    Ok(PlanRequest::between(from, to).with_overwrite(overwrite))
}

pub fn normalize_symbol(symbol: &str) -> Result<String, String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() || !symbol.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-') {
        return Err(format!("invalid symbol: '{symbol}'"));
    }
    Ok(symbol)
}

/// One JSON document per line on stdout.
pub fn print_json_line<T: Serialize>(value: &T) -> Result<(), String> {
    let line = serde_json::to_string(value).map_err(|err| format!("failed to encode output: {err}"))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").map_err(|err| format!("failed to write output: {err}"))?;
    stdout.flush().map_err(|err| format!("failed to flush output: {err}"))
}

/// Flag set once Ctrl-C arrives. The signal is awaited on a small runtime
/// owned by a background thread.
pub fn cancel_on_ctrl_c() -> Result<Arc<AtomicBool>, String> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("failed to build signal runtime: {err}"))?;

    std::thread::Builder::new()
        .name("tradefill-ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::warn!("ctrl-c received, stopping after the current pass");
                        flag.store(true, Ordering::SeqCst);
                    }
                    Err(err) => tracing::error!(error = %err, "failed to listen for ctrl-c"),
                }
            });
        })
        .map_err(|err| format!("failed to spawn signal thread: {err}"))?;
    Ok(cancel)
}

#[cfg(test)]
mod tests {
    use super::{normalize_symbol, plan_request};
    use tradefill_domain::value_objects::bound::Bound;

    #[test]
    fn plan_request_defaults_to_unbounded() {
        let request = plan_request(None, Some("newest"), true).unwrap();
        assert_eq!(request.from, Bound::Unbounded);
        assert_eq!(request.to, Bound::Newest);
        assert!(request.full_overwrite);
    }

    #[test]
    fn plan_request_reports_the_bad_flag() {
        let err = plan_request(Some("soon"), None, false).unwrap_err();
        assert!(err.starts_with("invalid --from"));
    }

    #[test]
    fn normalize_symbol_uppercases() {
        assert_eq!(normalize_symbol(" ethbtc ").unwrap(), "ETHBTC");
        assert!(normalize_symbol("eth btc").is_err());
        assert!(normalize_symbol("").is_err());
    }
}
