use regex::Regex;
use std::collections::BTreeSet;
use tradefill_domain::errors::SyncError;
use tradefill_domain::repositories::trade_source::TradeSource;
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::value_objects::selector::{SelectorScope, SymbolSelector};

/// Expands a selector into a concrete, duplicate-free symbol list.
///
/// Explicit lists keep their order; everything resolved from the remote
/// listing or the store comes back sorted.
pub fn resolve_symbols<S, T>(
    selector: &SymbolSelector,
    source: &S,
    store: &T,
) -> Result<Vec<String>, SyncError>
where
    S: TradeSource + ?Sized,
    T: TradeStore + ?Sized,
{
    let symbols = match selector {
        SymbolSelector::Symbols(list) => {
            let mut seen = BTreeSet::new();
            list.iter()
                .filter(|symbol| seen.insert(symbol.as_str()))
                .cloned()
                .collect()
        }
        SymbolSelector::Remote => remote_symbols(source)?,
        SymbolSelector::Stored => stored_symbols(store)?,
        SymbolSelector::Pattern { pattern, scope } => {
            let regex = Regex::new(pattern).map_err(|err| {
                SyncError::Config(format!("invalid symbol pattern '{pattern}': {err}"))
            })?;
            let candidates = match scope {
                SelectorScope::Remote => remote_symbols(source)?,
                SelectorScope::Stored => stored_symbols(store)?,
            };
            candidates
                .into_iter()
                .filter(|symbol| regex.is_match(symbol))
                .collect()
        }
    };

    if symbols.is_empty() {
        return Err(SyncError::Config(format!(
            "selector '{selector}' matched no symbols"
        )));
    }
    tracing::debug!(selector = %selector, symbols = symbols.len(), "selector resolved");
    Ok(symbols)
}

fn remote_symbols<S: TradeSource + ?Sized>(source: &S) -> Result<Vec<String>, SyncError> {
    let listed = source
        .list_tradable_symbols()
        .map_err(|err| SyncError::Config(format!("unable to list remote symbols: {err}")))?;
    Ok(sorted_unique(listed))
}

fn stored_symbols<T: TradeStore + ?Sized>(store: &T) -> Result<Vec<String>, SyncError> {
    let listed = store
        .list_symbols()
        .map_err(|err| SyncError::Storage(format!("unable to list stored symbols: {err}")))?;
    Ok(sorted_unique(listed))
}

fn sorted_unique(symbols: Vec<String>) -> Vec<String> {
    symbols
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
