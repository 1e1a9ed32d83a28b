use super::common::{normalize_symbol, print_json_line, Context};
use std::path::PathBuf;
use tradefill_application::config::to_toml_pretty;
use tradefill_application::inspection::{database_summary, series_candles, series_info, verify_series};
use tradefill_application::selection::resolve_symbols;
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::value_objects::bound::Bound;
use tradefill_domain::value_objects::interval::Interval;
use tradefill_domain::value_objects::selector::SymbolSelector;
use tradefill_domain::value_objects::timeframe::Timeframe;
use tradefill_infrastructure::artifacts::{write_candles_csv, write_candles_to};

pub fn run_migrate(ctx: &Context, migrations_path: Option<PathBuf>) -> Result<(), String> {
    let store = ctx.open_store()?;
    store.migrate(migrations_path.as_deref())?;
    println!("migrations applied to {}", store.table);
    Ok(())
}

pub fn run_info(ctx: &Context, symbol: Option<String>) -> Result<(), String> {
    let store = ctx.open_store()?;
    match symbol {
        Some(symbol) => print_json_line(&series_info(&store, &normalize_symbol(&symbol)?)?),
        None => print_json_line(&database_summary(&store)?),
    }
}

pub fn run_verify(ctx: &Context, selector: &str) -> Result<(), String> {
    let selector = SymbolSelector::parse(selector)?;
    let store = ctx.open_store()?;
    let source = ctx.open_source()?;
    let symbols = resolve_symbols(&selector, &source, &store).map_err(|err| err.to_string())?;

    let mut broken = 0usize;
    for symbol in &symbols {
        let report = verify_series(&store, symbol)?;
        if !report.consistency.is_verified() {
            broken += 1;
        }
        print_json_line(&report)?;
    }
    if broken > 0 {
        return Err(format!("{broken} of {} series are inconsistent", symbols.len()));
    }
    Ok(())
}

pub fn run_drop(ctx: &Context, symbol: &str, yes: bool) -> Result<(), String> {
    let symbol = normalize_symbol(symbol)?;
    if !yes {
        return Err(format!("refusing to drop {symbol} without --yes"));
    }
    let store = ctx.open_store()?;
    let before = store.count(&symbol)?;
    store.drop_symbol(&symbol)?;
    println!("dropped {before} records of {symbol}");
    Ok(())
}

pub fn run_show_config(ctx: &Context) -> Result<(), String> {
    print!("{}", to_toml_pretty(&ctx.config)?);
    Ok(())
}

pub fn run_candles(
    ctx: &Context,
    symbol: &str,
    timeframe: &str,
    from: Option<String>,
    to: Option<String>,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let symbol = normalize_symbol(symbol)?;
    let timeframe = Timeframe::parse(timeframe)?;
    let store = ctx.open_store()?;
    let coverage = store
        .coverage(&symbol)?
        .ok_or_else(|| format!("no stored trades for {symbol}"))?;

    let from = Bound::from_option(from.as_deref())
        .map_err(|err| format!("invalid --from: {err}"))?
        .resolve(Some(&coverage), coverage.oldest_ts)
        .map_err(|err| err.to_string())?;
    let to = Bound::from_option(to.as_deref())
        .map_err(|err| format!("invalid --to: {err}"))?
        .resolve(Some(&coverage), coverage.newest_ts + 1)
        .map_err(|err| err.to_string())?;

    let candles = series_candles(&store, &symbol, &Interval::new(from, to), timeframe.step_seconds)?;
    match out {
        Some(path) => {
            write_candles_csv(&path, &candles)?;
            tracing::info!(
                symbol = %symbol,
                timeframe = %timeframe.label,
                candles = candles.len(),
                out = %path.display(),
                "candles written"
            );
        }
        None => write_candles_to(std::io::stdout().lock(), &candles)?,
    }
    Ok(())
}
