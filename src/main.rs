use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tfhfs_perf::{
    cli::{Cli, OutputFormat},
    command::SystemRunner,
    config::BenchConfig,
    driver::BenchmarkDriver,
    error::{BenchError, GENERIC_FAILURE_EXIT_CODE},
    fuse_mounter::FuseMounter,
    json_output::JsonOutput,
    report::Reporter,
    suite::Selection,
    text_output::TextOutput,
};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Config file (or defaults) with command-line path overrides applied
fn load_config(args: &Cli) -> Result<BenchConfig> {
    let mut config = match &args.config {
        Some(path) => BenchConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BenchConfig::default(),
    };

    if let Some(mountpoint) = &args.mountpoint {
        config.mountpoint = mountpoint.clone();
    }
    if let Some(storage_dir) = &args.storage_dir {
        config.storage_dir = storage_dir.clone();
    }
    if let Some(fs_binary) = &args.fs_binary {
        config.fs_binary = fs_binary.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Print test case indices for use with --test
fn print_test_cases(config: &BenchConfig) -> Result<()> {
    let mut out = io::stdout().lock();
    for (index, case) in config.test_cases.iter().enumerate() {
        let backend = case
            .options
            .backend
            .map_or_else(|| "default".to_string(), |b| b.to_string());
        writeln!(out, "{:>2}  {} [{}]", index, case.label, backend)?;
    }
    Ok(())
}

fn run_driver<R: Reporter>(config: BenchConfig, selection: Selection, reporter: R) -> Result<()> {
    let mounter = FuseMounter::new(&config.fs_binary)
        .with_timeouts(config.mount_timeout(), config.poll_interval());
    let mut driver = BenchmarkDriver::new(config, mounter, SystemRunner::new(), reporter);
    let summary = driver.run(selection)?;
    tracing::info!(
        measured = summary.records.len(),
        skipped = summary.skipped_phases,
        "benchmark finished"
    );
    Ok(())
}

fn run(args: Cli) -> Result<()> {
    let config = load_config(&args)?;

    if args.list {
        return print_test_cases(&config);
    }

    let selection = Selection::from_index(args.test);
    match args.format {
        OutputFormat::Text => run_driver(config, selection, TextOutput::new(io::stdout())),
        OutputFormat::Json => run_driver(config, selection, JsonOutput::new(io::stdout())),
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<BenchError>()
                .map_or(GENERIC_FAILURE_EXIT_CODE, BenchError::exit_code);
            ExitCode::from(code)
        }
    }
}
