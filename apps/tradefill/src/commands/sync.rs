use super::common::{cancel_on_ctrl_c, normalize_symbol, plan_request, print_json_line, Context};
use tradefill_application::config::resolve_ring_options;
use tradefill_application::scheduler::{SymbolOutcome, SyncService};
use tradefill_domain::services::clock::SystemClock;
use tradefill_domain::value_objects::selector::SymbolSelector;

pub fn run_one(
    ctx: &Context,
    symbol: &str,
    from: Option<String>,
    to: Option<String>,
    overwrite: bool,
) -> Result<(), String> {
    let symbol = normalize_symbol(symbol)?;
    let request = plan_request(from.as_deref(), to.as_deref(), overwrite)?;
    let store = ctx.open_store()?;
    let source = ctx.open_source()?;
    let clock = SystemClock;
    let service = SyncService::new(&source, &store, &clock, ctx.sync_settings()?);

    let outcome = service.sync_one(&symbol, &request);
    print_json_line(&outcome)?;
    finish(std::slice::from_ref(&outcome))
}

pub fn run_row(
    ctx: &Context,
    selector: &str,
    from: Option<String>,
    to: Option<String>,
    overwrite: bool,
) -> Result<(), String> {
    let selector = SymbolSelector::parse(selector)?;
    let request = plan_request(from.as_deref(), to.as_deref(), overwrite)?;
    let store = ctx.open_store()?;
    let source = ctx.open_source()?;
    let clock = SystemClock;
    let service = SyncService::new(&source, &store, &clock, ctx.sync_settings()?);

    let outcomes = service
        .sync_many(&selector, &request)
        .map_err(|err| err.to_string())?;
    for outcome in &outcomes {
        print_json_line(outcome)?;
    }
    finish(&outcomes)
}

pub fn run_ring(
    ctx: &Context,
    selector: &str,
    every: Option<String>,
    iterations: Option<u32>,
) -> Result<(), String> {
    let selector = SymbolSelector::parse(selector)?;
    let options = resolve_ring_options(&ctx.config, every.as_deref(), iterations)?;
    let store = ctx.open_store()?;
    let source = ctx.open_source()?;
    let clock = SystemClock;
    let service = SyncService::new(&source, &store, &clock, ctx.sync_settings()?);
    let cancel = cancel_on_ctrl_c()?;

    let mut output_error = None;
    let summary = service
        .sync_ring(&selector, &options, &cancel, |tick| {
            if output_error.is_some() {
                return;
            }
            for outcome in &tick.outcomes {
                if let Err(err) = print_json_line(outcome) {
                    output_error = Some(err);
                    return;
                }
            }
        })
        .map_err(|err| err.to_string())?;
    if let Some(err) = output_error {
        return Err(err);
    }
    print_json_line(&summary)
}

/// Non-zero exit when any symbol failed; the outcomes are already printed.
fn finish(outcomes: &[SymbolOutcome]) -> Result<(), String> {
    let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
    if failed > 0 {
        return Err(format!("{failed} of {} symbols failed", outcomes.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::finish;
    use tradefill_application::scheduler::SymbolOutcome;
    use tradefill_domain::errors::ErrorKind;

    fn outcome(symbol: &str, error: Option<ErrorKind>) -> SymbolOutcome {
        SymbolOutcome {
            symbol: symbol.to_string(),
            records_added: 0,
            final_coverage: None,
            error,
            message: None,
        }
    }

    #[test]
    fn finish_fails_when_any_symbol_failed() {
        assert!(finish(&[outcome("A", None), outcome("B", None)]).is_ok());
        let err = finish(&[outcome("A", None), outcome("B", Some(ErrorKind::RemoteFailure))])
            .unwrap_err();
        assert_eq!(err, "1 of 2 symbols failed");
    }
}
