mod common;
mod inspect;
mod sync;

use std::path::PathBuf;

/// Flags shared by every subcommand.
pub struct Globals {
    pub config: Option<PathBuf>,
    pub db_url: Option<String>,
}

pub enum Command {
    Migrate {
        migrations_path: Option<PathBuf>,
    },
    One {
        symbol: String,
        from: Option<String>,
        to: Option<String>,
        overwrite: bool,
    },
    Row {
        selector: String,
        from: Option<String>,
        to: Option<String>,
        overwrite: bool,
    },
    Ring {
        selector: String,
        every: Option<String>,
        iterations: Option<u32>,
    },
    Info {
        symbol: Option<String>,
    },
    Verify {
        selector: String,
    },
    Drop {
        symbol: String,
        yes: bool,
    },
    ShowConfig,
    Candles {
        symbol: String,
        timeframe: String,
        from: Option<String>,
        to: Option<String>,
        out: Option<PathBuf>,
    },
}

pub fn run(globals: &Globals, command: Command) -> Result<(), String> {
    let ctx = common::Context::load(globals)?;
    match command {
        Command::Migrate { migrations_path } => inspect::run_migrate(&ctx, migrations_path),
        Command::One {
            symbol,
            from,
            to,
            overwrite,
        } => sync::run_one(&ctx, &symbol, from, to, overwrite),
        Command::Row {
            selector,
            from,
            to,
            overwrite,
        } => sync::run_row(&ctx, &selector, from, to, overwrite),
        Command::Ring {
            selector,
            every,
            iterations,
        } => sync::run_ring(&ctx, &selector, every, iterations),
        Command::Info { symbol } => inspect::run_info(&ctx, symbol),
        Command::Verify { selector } => inspect::run_verify(&ctx, &selector),
        Command::Drop { symbol, yes } => inspect::run_drop(&ctx, &symbol, yes),
        Command::ShowConfig => inspect::run_show_config(&ctx),
        Command::Candles {
            symbol,
            timeframe,
            from,
            to,
            out,
        } => inspect::run_candles(&ctx, &symbol, &timeframe, from, to, out),
    }
}
