//! CLI for seriesq: query time series metadata and values.

mod commands;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use seriesq_core::{DEFAULT_DOCUMENT, DEFAULT_HOST, DEFAULT_PORT, ReportOptions, StoreSettings};

#[derive(Parser, Debug)]
#[command(name = "seriesq")]
#[command(about = "seriesq: query time series metadata and values")]
#[command(version = seriesq_core::VERSION)]
#[command(override_usage = "seriesq [options] [query ... | series ... | source ...]")]
#[command(disable_help_flag = true)]
struct Cli {
    /// Report all metadata (-dilmsS) for time series
    #[arg(short = 'a', long)]
    all: bool,

    /// Report context names for a time series source
    #[arg(short = 'c', long)]
    contexts: bool,

    /// Metric descriptor for time series
    #[arg(short = 'd', long)]
    desc: bool,

    /// Instance identifiers for time series
    #[arg(short = 'i', long)]
    instances: bool,

    /// List all labels for time series
    #[arg(short = 'l', long)]
    labels: bool,

    /// Load time series values and metadata
    #[arg(short = 'L', long)]
    load: bool,

    /// Metric names for time series
    #[arg(short = 'm', long)]
    metrics: bool,

    /// Perform a time series query (default)
    #[arg(short = 'q', long)]
    query: bool,

    /// Connect to the store on this TCP/IP port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connect to the store using this host specification
    #[arg(short = 'h', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Local store document serving the connection
    #[arg(short = 'f', long, default_value = DEFAULT_DOCUMENT)]
    file: PathBuf,

    /// Query or load series metadata, not values
    #[arg(short = 'F', long)]
    fast: bool,

    /// Print PMID in verbose format
    #[arg(short = 'M', long = "fullpmid")]
    full_pmid: bool,

    /// Print InDom in verbose format
    #[arg(short = 'I', long = "fullindom")]
    full_indom: bool,

    /// Print label names only, not values
    #[arg(short = 'n', long = "names")]
    names_only: bool,

    /// Print the source for each time series
    #[arg(short = 'S', long = "source")]
    source_id: bool,

    /// Print the series for each instance
    #[arg(short = 's', long = "series")]
    series_id: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Query text, series identifiers or source identifiers
    args: Vec<String>,
}

impl Cli {
    fn options(&self, colour: bool) -> ReportOptions {
        ReportOptions {
            all: self.all,
            contexts: self.contexts,
            desc: self.desc,
            instances: self.instances,
            labels: self.labels,
            load: self.load,
            metrics: self.metrics,
            query: self.query,
            fast: self.fast,
            full_pmid: self.full_pmid,
            full_indom: self.full_indom,
            names_only: self.names_only,
            source_id: self.source_id,
            series_id: self.series_id,
            colour,
        }
    }

    fn settings(&self) -> StoreSettings {
        StoreSettings::new(&self.host, self.port, &self.file)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = cli.options(std::io::stdout().is_terminal());
    commands::series::run(&cli.settings(), &options, &cli.args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("seriesq").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.host, "localhost");
        assert_eq!(cli.port, 6379);
        assert_eq!(cli.file, PathBuf::from("series.json"));
        assert!(cli.args.is_empty());
        assert_eq!(cli.options(false), ReportOptions::default());
    }

    #[test]
    fn test_short_h_is_host() {
        let cli = parse(&["-h", "db.example", "-p", "7000"]);
        assert_eq!(cli.settings().hostspec, "db.example:7000");
    }

    #[test]
    fn test_long_help_is_available() {
        let err = Cli::try_parse_from(["seriesq", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = parse(&["-dMIsS", "-n", "abc,def"]);
        let options = cli.options(true);
        assert!(options.desc && options.full_pmid && options.full_indom);
        assert!(options.series_id && options.source_id && options.names_only);
        assert!(options.colour);
        assert_eq!(cli.args, ["abc,def"]);
    }

    #[test]
    fn test_query_words_stay_separate() {
        let cli = parse(&["-q", "kernel.all.load", "{hostname==\"a\"}"]);
        assert!(cli.query);
        assert_eq!(cli.args.len(), 2);
    }
}
