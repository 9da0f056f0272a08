use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing::error;
use tracing_subscriber::EnvFilter;

use periodo_fix::{
    Pipeline, PipelineConfig, Registry, Result, Source, ValidationMode, DEFAULT_DATASET_URL,
};

/// Generate a JSON patch that fixes the PeriodO dataset, or apply it.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Fix to run (see --list)
    rule: Option<String>,
    /// Print the patched dataset instead of the patch
    #[arg(short, long)]
    apply: bool,
    /// Dataset URL or local file
    #[arg(long, env = "PERIODO_DATASET", default_value = DEFAULT_DATASET_URL)]
    source: Source,
    /// Extra query parameter for the dataset request, as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
    /// Replay the patch against the dataset before emitting it
    #[arg(long)]
    structural: bool,
    /// Pause after each remote lookup, in milliseconds
    #[arg(long, default_value_t = 50)]
    lookup_interval_ms: u64,
    /// List the available fixes and exit
    #[arg(long)]
    list: bool,
    /// Log filter, used when RUST_LOG is unset
    #[arg(long, env = "PERIODO_LOG", default_value = "info")]
    log_level: String,
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{s}`"))
}

// Logs go to stderr; stdout carries only the JSON output.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_rules(registry: &Registry, mut out: impl Write) -> std::io::Result<()> {
    for rule in registry.rules() {
        writeln!(out, "  {:<36}{}", rule.name(), rule.description())?;
    }
    Ok(())
}

async fn run(args: Args) -> Result<ExitCode> {
    let registry = Registry::with_builtins()?;
    if args.list {
        print_rules(&registry, std::io::stdout().lock())?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(name) = args.rule.as_deref() else {
        let mut err = std::io::stderr().lock();
        writeln!(err, "{}", Args::command().render_usage())?;
        writeln!(err, "\nAvailable fixes:")?;
        print_rules(&registry, &mut err)?;
        return Ok(ExitCode::from(2));
    };

    let rule = registry.resolve(name)?;
    let config = PipelineConfig {
        apply: args.apply,
        source: args.source,
        params: args.params,
        lookup_interval: Duration::from_millis(args.lookup_interval_ms),
        validation: args.structural.then_some(ValidationMode::Structural),
    };
    let output = Pipeline::builder().config(config).build()?.run(rule.as_ref()).await?;
    output.write_to(std::io::stdout().lock())?;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
