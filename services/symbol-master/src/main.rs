//! Symbol master CLI
//!
//! Resolves BFO contract descriptions into expiries, trading symbols, tokens,
//! strike steps and lot sizes from the cached daily master.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use common::{Px, format_master_date, parse_master_date};
use std::path::PathBuf;
use std::sync::Arc;
use symbol_master::{
    Clock, ContractSpec, Expiry, ExpiryType, FixedClock, InitOutcome, InstrumentKind, MasterStore,
    OptionType, SymbolMasterConfig, TokenQuery,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "symbol-master")]
#[command(about = "Query the BFO derivatives symbol master")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML/YAML/JSON); `SYMBOL_MASTER_*` env vars also apply
    #[arg(long, global = true)]
    config: Option<String>,

    /// Download the master even if today's copy is cached
    #[arg(long, global = true)]
    hard_refresh: bool,

    /// Override the master file URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Override the cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Pretend today is this date (DD-MON-YYYY or YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_date)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Force a fresh download and show the refresh state
    Refresh,
    /// Expiry dates of a symbol's contracts
    Expiry {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "OPTIDX")]
        instrument: InstrumentKind,
        /// current, near, next, far or all
        #[arg(long, default_value = "near")]
        expiry_type: ExpiryType,
    },
    /// Exchange trading symbol of a contract
    TradingSymbol(ContractArgs),
    /// Exchange token, by trading symbol or contract components
    Token {
        /// Takes precedence over the contract components
        #[arg(long)]
        trading_symbol: Option<String>,
        #[command(flatten)]
        contract: OptionalContractArgs,
    },
    /// Strike step of a symbol's options
    StrikeDiff {
        #[arg(long)]
        symbol: String,
    },
    /// Lot size of a symbol
    LotSize {
        #[arg(long)]
        symbol: String,
    },
    /// Snapshot summary
    Info,
}

#[derive(Args)]
struct ContractArgs {
    #[arg(long)]
    symbol: String,
    #[arg(long)]
    instrument: InstrumentKind,
    #[arg(long, value_parser = parse_date)]
    expiry: NaiveDate,
    #[arg(long)]
    option_type: Option<OptionType>,
    #[arg(long)]
    strike: Option<Px>,
}

impl ContractArgs {
    fn into_spec(self) -> ContractSpec {
        ContractSpec {
            symbol: self.symbol,
            instrument: self.instrument,
            expiry: self.expiry,
            option_type: self.option_type,
            strike: self.strike,
        }
    }
}

#[derive(Args)]
struct OptionalContractArgs {
    #[arg(long)]
    symbol: Option<String>,
    #[arg(long, default_value = "OPTIDX")]
    instrument: InstrumentKind,
    #[arg(long, value_parser = parse_date)]
    expiry: Option<NaiveDate>,
    #[arg(long)]
    option_type: Option<OptionType>,
    #[arg(long)]
    strike: Option<Px>,
}

impl OptionalContractArgs {
    fn into_spec(self) -> Result<Option<ContractSpec>> {
        let Some(symbol) = self.symbol else {
            return Ok(None);
        };
        let expiry = self
            .expiry
            .context("--expiry is required when looking up by --symbol")?;
        Ok(Some(ContractSpec {
            symbol,
            instrument: self.instrument,
            expiry,
            option_type: self.option_type,
            strike: self.strike,
        }))
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_master_date(value).map_err(|e| format!("invalid date '{value}': {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "symbol_master=info,storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = SymbolMasterConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.source_url = url;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }
    config.hard_refresh |= cli.hard_refresh;

    let clock = cli
        .today
        .map(|date| Arc::new(FixedClock(date)) as Arc<dyn Clock>);
    let store = if matches!(cli.command, Commands::Refresh) {
        let store = MasterStore::from_config(&config, clock)?;
        store.refresh().context("Failed to refresh symbol master")?;
        store
    } else {
        let (store, outcome) =
            MasterStore::open(&config, clock).context("Failed to load symbol master")?;
        match &outcome {
            InitOutcome::Cached => info!("Using cached symbol master"),
            InitOutcome::Refreshed => info!("Downloaded fresh symbol master"),
            InitOutcome::Stale(e) => warn!("Answering from a stale symbol master: {}", e),
        }
        store
    };

    let table = store.table()?;
    match cli.command {
        Commands::Refresh | Commands::Info => {
            let state = store
                .refresh_state()
                .context("No refresh state after initialization")?;
            println!("last_refresh_date: {}", format_master_date(state.last_refresh_date));
            println!("source_checksum:   {:#010x}", state.source_checksum);
            println!("source_size:       {}", state.source_size);
            println!("instruments:       {}", table.len());
            println!("symbols:           {}", table.symbols().join(" "));
        }
        Commands::Expiry {
            symbol,
            instrument,
            expiry_type,
        } => match table.expiry(&symbol, instrument, expiry_type, store.today())? {
            Expiry::Single(date) => println!("{}", format_master_date(date)),
            Expiry::All(dates) => {
                for date in dates {
                    println!("{}", format_master_date(date));
                }
            }
        },
        Commands::TradingSymbol(contract) => {
            println!("{}", table.trading_symbol(&contract.into_spec())?);
        }
        Commands::Token {
            trading_symbol,
            contract,
        } => {
            let components = match trading_symbol {
                Some(_) => None,
                None => contract.into_spec()?,
            };
            let query = TokenQuery::from_parts(trading_symbol, components)?;
            println!("{}", table.token(&query)?);
        }
        Commands::StrikeDiff { symbol } => println!("{}", table.strike_diff(&symbol)?),
        Commands::LotSize { symbol } => println!("{}", table.lot_size(&symbol)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_token_by_components() {
        let cli = Cli::try_parse_from([
            "symbol-master",
            "token",
            "--symbol",
            "bankex",
            "--instrument",
            "futidx",
            "--expiry",
            "06-NOV-2023",
        ])
        .unwrap();
        let Commands::Token {
            trading_symbol,
            contract,
        } = cli.command
        else {
            panic!("expected token command");
        };
        assert!(trading_symbol.is_none());
        let spec = contract.into_spec().unwrap().unwrap();
        assert_eq!(spec.instrument, InstrumentKind::FutIdx);
        assert_eq!(spec.expiry, NaiveDate::from_ymd_opt(2023, 11, 6).unwrap());
    }

    #[test]
    fn test_token_accepts_trading_symbol_with_components() {
        let cli = Cli::try_parse_from([
            "symbol-master",
            "token",
            "--trading-symbol",
            "BANKEX23N06FUT",
            "--symbol",
            "BANKEX",
        ])
        .unwrap();
        let Commands::Token { trading_symbol, .. } = cli.command else {
            panic!("expected token command");
        };
        assert_eq!(trading_symbol.as_deref(), Some("BANKEX23N06FUT"));
    }

    #[test]
    fn test_refresh_does_not_imply_hard_refresh_flag() {
        let cli = Cli::try_parse_from(["symbol-master", "refresh"]).unwrap();
        assert!(!cli.hard_refresh);
        assert!(matches!(cli.command, Commands::Refresh));
    }

    #[test]
    fn test_parse_option_contract_and_today() {
        let cli = Cli::try_parse_from([
            "symbol-master",
            "--today",
            "2023-11-01",
            "trading-symbol",
            "--symbol",
            "SENSEX",
            "--instrument",
            "OPTIDX",
            "--expiry",
            "10-nov-2023",
            "--option-type",
            "ce",
            "--strike",
            "65000",
        ])
        .unwrap();
        assert_eq!(cli.today, NaiveDate::from_ymd_opt(2023, 11, 1));
        let Commands::TradingSymbol(contract) = cli.command else {
            panic!("expected trading-symbol command");
        };
        let spec = contract.into_spec();
        assert_eq!(spec.option_type, Some(OptionType::Call));
        assert_eq!(spec.strike, Some(Px::from_units(65000)));
    }
}
