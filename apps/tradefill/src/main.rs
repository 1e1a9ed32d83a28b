mod commands;
mod obs;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{Command, Globals};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tradefill")]
#[command(
    about = "Keeps a local Postgres trade history in sync with Binance.",
    version,
    arg_required_else_help = true
)]
#[command(
    after_help = "Examples:\n  tradefill migrate\n  tradefill one BTCUSDT --from 2024-01-01T00:00:00Z\n  tradefill row ETHBTC,BNBBTC --from newest\n  tradefill ring 'db:USDT$' --every 5m\n  tradefill candles BTCUSDT --timeframe 1h --out btc_1h.csv\n"
)]
struct Cli {
    /// Config file path (TOML). Every section is optional.
    #[arg(long, global = true, env = "TRADEFILL_CONFIG")]
    config: Option<PathBuf>,

    /// Postgres URL. Overrides TRADEFILL_DB_URL and [db].url.
    #[arg(long, global = true)]
    db_url: Option<String>,

    /// Default log filter; TRADEFILL_LOG wins when set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on host:port.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Create the trades table and index if missing.
    Migrate {
        /// SQL file to apply instead of the built-in schema.
        #[arg(long)]
        migrations_path: Option<PathBuf>,
    },
    /// Sync one symbol over [from, to).
    One {
        symbol: String,
        /// oldest | newest | epoch seconds/millis | RFC3339. Default: epoch.
        #[arg(long)]
        from: Option<String>,
        /// oldest | newest | epoch seconds/millis | RFC3339. Default: now.
        #[arg(long)]
        to: Option<String>,
        /// Drop the stored series before fetching.
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Sync every symbol of a selector, one after another.
    Row {
        /// ticker | db | ticker:<regex> | db:<regex> | /<regex>/ | A,B,C
        selector: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Keep extending the selected series to now until Ctrl-C.
    Ring {
        selector: String,
        /// Pause after each pass, e.g. 30, 90s, 5m. Default: [ring].every or 60s.
        #[arg(long)]
        every: Option<String>,
        /// Stop after this many passes.
        #[arg(long)]
        iterations: Option<u32>,
    },
    /// Show stored coverage for one symbol, or for the whole table.
    Info { symbol: Option<String> },
    /// Check that stored ids are contiguous.
    Verify {
        #[arg(default_value = "db")]
        selector: String,
    },
    /// Delete every stored record of a symbol.
    Drop {
        symbol: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Print the loaded config as TOML.
    Config,
    /// Aggregate stored trades into OHLCV candles (CSV).
    Candles {
        symbol: String,
        #[arg(long, default_value = "1min")]
        timeframe: String,
        /// Default: stored oldest.
        #[arg(long)]
        from: Option<String>,
        /// Default: past the stored newest.
        #[arg(long)]
        to: Option<String>,
        /// Output path. Default: stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

impl From<CliCommand> for Command {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Migrate { migrations_path } => Command::Migrate { migrations_path },
            CliCommand::One {
                symbol,
                from,
                to,
                overwrite,
            } => Command::One {
                symbol,
                from,
                to,
                overwrite,
            },
            CliCommand::Row {
                selector,
                from,
                to,
                overwrite,
            } => Command::Row {
                selector,
                from,
                to,
                overwrite,
            },
            CliCommand::Ring {
                selector,
                every,
                iterations,
            } => Command::Ring {
                selector,
                every,
                iterations,
            },
            CliCommand::Info { symbol } => Command::Info { symbol },
            CliCommand::Verify { selector } => Command::Verify { selector },
            CliCommand::Drop { symbol, yes } => Command::Drop { symbol, yes },
            CliCommand::Config => Command::ShowConfig,
            CliCommand::Candles {
                symbol,
                timeframe,
                from,
                to,
                out,
            } => Command::Candles {
                symbol,
                timeframe,
                from,
                to,
                out,
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, cli.log_format.as_str()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let globals = Globals {
        config: cli.config,
        db_url: cli.db_url,
    };
    if let Err(err) = commands::run(&globals, cli.command.into()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
