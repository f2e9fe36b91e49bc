use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "survey-tab",
    version,
    about = "Tabulate and cross-tabulate survey responses",
    long_about = "Tabulate and cross-tabulate survey responses.\n\n\
                  Columns are addressed by name or 1-based index. Derived columns, filters \
                  and value orders are read from TOML documents in the config directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Survey responses as CSV with a header row. Required by the analysis
    /// commands.
    #[arg(long = "data", value_name = "CSV", global = true)]
    pub data: Option<PathBuf>,

    /// Directory holding derived_columns.toml, filters.toml, column_orders.toml
    /// and settings.toml.
    #[arg(long = "config-dir", value_name = "DIR", global = true, default_value = "configs")]
    pub config_dir: PathBuf,

    /// Let polars infer numeric and date column types instead of reading text.
    #[arg(long = "infer-types", global = true)]
    pub infer_types: bool,

    /// Output format for results.
    #[arg(long = "output", value_enum, default_value = "json", global = true)]
    pub output: OutputArg,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    #[command(flatten)]
    pub color: Color,

    /// Set log level explicitly (overrides -v/-q).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow answer values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List base and derived columns.
    Columns,
    /// Frequency table of one column.
    Simple(SimpleArgs),
    /// Joint frequencies of two columns.
    Cross(CrossArgs),
    /// List configured filters.
    Filters,
    /// Count the rows a filter keeps and drops.
    Impact {
        /// Filter name.
        filter: String,
    },
    /// List the derived column templates in a template document.
    Templates {
        #[arg(long = "from", value_name = "PATH", default_value = DEFAULT_TEMPLATES)]
        from: PathBuf,
    },
    /// Copy templates into the config directory's derived column document.
    ImportTemplates(ImportArgs),
}

const DEFAULT_TEMPLATES: &str = "templates/derived_columns.toml";

#[derive(Args)]
pub struct ImportArgs {
    /// 0-based template indices as listed by `templates`.
    #[arg(required = true, value_name = "INDEX")]
    pub indices: Vec<usize>,

    #[arg(long = "from", value_name = "PATH", default_value = DEFAULT_TEMPLATES)]
    pub from: PathBuf,
}

#[derive(Args)]
pub struct SimpleArgs {
    /// Column name or 1-based index.
    pub column: String,

    /// Count each answer of a multi-answer field separately.
    #[arg(long = "split")]
    pub split: bool,

    /// Apply the named filter.
    #[arg(long = "filter", value_name = "NAME")]
    pub filter: Option<String>,
}

#[derive(Args)]
pub struct CrossArgs {
    /// Row column name or 1-based index.
    pub x: String,

    /// Column column name or 1-based index.
    pub y: String,

    #[arg(long = "split-x")]
    pub split_x: bool,

    #[arg(long = "split-y")]
    pub split_y: bool,

    /// Apply the named filter.
    #[arg(long = "filter", value_name = "NAME")]
    pub filter: Option<String>,

    /// Render as a dense matrix ordered by the configured value orders.
    #[arg(long = "pivot")]
    pub pivot: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputArg {
    Json,
    Table,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
