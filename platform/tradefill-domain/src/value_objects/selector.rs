#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorScope {
    /// Symbols currently tradable on the remote source.
    Remote,
    /// Symbols with records in local storage.
    Stored,
}

/// Request-time description of which symbols to process. Resolved once per
/// invocation into a concrete ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolSelector {
    Symbols(Vec<String>),
    Remote,
    Stored,
    Pattern { pattern: String, scope: SelectorScope },
}

impl SymbolSelector {
    /// Parses the CLI form:
    /// `ticker`, `db`, `ticker:<regex>`, `db:<regex>`, `/<regex>/`, or a
    /// comma-separated symbol list.
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("empty symbol selector".to_string());
        }

        match trimmed.to_lowercase().as_str() {
            "ticker" => return Ok(SymbolSelector::Remote),
            "db" => return Ok(SymbolSelector::Stored),
            _ => {}
        }

        if let Some(pattern) = trimmed.strip_prefix("ticker:") {
            return pattern_selector(pattern, SelectorScope::Remote);
        }
        if let Some(pattern) = trimmed.strip_prefix("db:") {
            return pattern_selector(pattern, SelectorScope::Stored);
        }
        if trimmed.len() >= 2 && trimmed.starts_with('/') && trimmed.ends_with('/') {
            return pattern_selector(&trimmed[1..trimmed.len() - 1], SelectorScope::Remote);
        }

        let symbols: Vec<String> = trimmed
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(format!("no symbols in selector: {value}"));
        }
        if let Some(bad) = symbols
            .iter()
            .find(|s| !s.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'))
        {
            return Err(format!("invalid symbol '{bad}' (use ticker:<regex> for patterns)"));
        }
        Ok(SymbolSelector::Symbols(symbols))
    }
}

fn pattern_selector(pattern: &str, scope: SelectorScope) -> Result<SymbolSelector, String> {
    if pattern.trim().is_empty() {
        return Err("empty selector pattern".to_string());
    }
    Ok(SymbolSelector::Pattern {
        pattern: pattern.trim().to_string(),
        scope,
    })
}

impl std::fmt::Display for SymbolSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolSelector::Symbols(symbols) => f.write_str(&symbols.join(",")),
            SymbolSelector::Remote => f.write_str("ticker"),
            SymbolSelector::Stored => f.write_str("db"),
            SymbolSelector::Pattern { pattern, scope } => match scope {
                SelectorScope::Remote => write!(f, "ticker:{pattern}"),
                SelectorScope::Stored => write!(f, "db:{pattern}"),
            },
        }
    }
}
