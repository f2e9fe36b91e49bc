//! Survey tabulation CLI.

use clap::{ColorChoice, Parser};
use std::io::{self, IsTerminal};
use survey_cli::commands::{
    CrossRequest, Report, SessionSource, SurveyAnalyzer, open_analyzer, run_columns, run_cross,
    run_filters, run_impact, run_import_templates, run_simple, run_templates,
};
use survey_cli::logging::{LogConfig, LogFormat, init_logging};
use survey_cli::render::{OutputFormat, render};
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, OutputArg};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let report: Report = match &cli.command {
        Command::Templates { from } => run_templates(from)?,
        Command::ImportTemplates(args) => {
            run_import_templates(&args.from, &args.indices, &cli.config_dir)?
        }
        Command::Columns => run_columns(&open(cli)?),
        Command::Simple(args) => {
            run_simple(&open(cli)?, &args.column, args.split, args.filter.as_deref())?
        }
        Command::Cross(args) => run_cross(
            &open(cli)?,
            &CrossRequest {
                x: &args.x,
                y: &args.y,
                split_x: args.split_x,
                split_y: args.split_y,
                filter: args.filter.as_deref(),
                pivot: args.pivot,
            },
        )?,
        Command::Filters => run_filters(&open(cli)?),
        Command::Impact { filter } => run_impact(&open(cli)?, filter)?,
    };
    let format = match cli.output {
        OutputArg::Json => OutputFormat::Json,
        OutputArg::Table => OutputFormat::Table,
    };
    println!("{}", render(&report, format)?);
    Ok(())
}

fn open(cli: &Cli) -> anyhow::Result<SurveyAnalyzer> {
    let data = cli
        .data
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--data <CSV> is required for this command"))?;
    open_analyzer(&SessionSource {
        data,
        config_dir: &cli.config_dir,
        infer_types: cli.infer_types,
    })
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
