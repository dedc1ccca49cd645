use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser};
use tracing::debug;

use modvers::config::{Config, ConfigError, DEFAULT_INTERPRETER, EXIT_CONFIG_ERROR};
use modvers::driver::{Driver, Request, RunSummary};
use modvers::host::{LoadWatch, ModuleHost, PerlHost};
use modvers::logging;
use modvers::module::{ModuleName, SearchPath};
use modvers::version::in_process::{InProcessLoad, load_version};
use modvers::version::outcome::VersionOutcome;
use modvers::version::protocol;
use modvers::version::strategy::{StrategyKind, VersionStrategy};
use modvers::version::subprocess::SubprocessLoad;
use modvers::version::text_scan::TextScanner;

#[derive(Parser)]
#[command(name = "modvers")]
#[command(version, about = "Report the installed versions of modules")]
struct Cli {
    /// Modules to report on, e.g. Foo::Bar
    #[arg(value_name = "MODULE")]
    modules: Vec<String>,

    /// Report every module installed on the search path
    #[arg(short, long)]
    all: bool,

    /// How versions are found: text, load or subprocess
    #[arg(short, long, value_name = "METHOD")]
    method: Option<String>,

    /// Always prefix each line with the module name
    #[arg(short = 'n', long)]
    name: bool,

    /// Never prefix lines with the module name
    #[arg(short = 'N', long)]
    no_name: bool,

    /// Append the path of the module's file
    #[arg(short, long)]
    file: bool,

    #[command(flatten)]
    host: HostArgs,

    /// Load one module and print its outcome as a single protocol line
    #[arg(long, hide = true, value_name = "MODULE")]
    probe: Option<String>,
}

#[derive(Args)]
struct HostArgs {
    /// Search this directory before the default search path (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    includes: Vec<PathBuf>,

    /// Host interpreter used to load modules and read the search path
    #[arg(long, value_name = "PATH")]
    perl: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    if let Some(module) = &cli.probe {
        return probe(module, &cli.host);
    }

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli));

    match result {
        Ok(summary) if summary.success() => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e) => match e.downcast_ref::<ConfigError>() {
            Some(config_error) => {
                eprintln!("modvers: {config_error}");
                Ok(ExitCode::from(EXIT_CONFIG_ERROR))
            }
            None => Err(e),
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let plan = Request {
        modules: cli.modules,
        all: cli.all,
        always_name: cli.name,
        never_name: cli.no_name,
        show_file: cli.file,
    }
    .plan()?;

    let config = Config::load()?;
    let kind = config.strategy(cli.method.as_deref())?;

    let interpreter = cli.host.perl.unwrap_or(config.host.interpreter);
    let includes = cli
        .host
        .includes
        .into_iter()
        .chain(config.extra_paths)
        .collect();
    let host = PerlHost::new(interpreter, includes);
    let search_path = SearchPath::new(host.search_path().map_err(ConfigError::from)?);
    debug!("Search path: {:?}", search_path.roots());

    let watch = LoadWatch::new();
    let strategy: Box<dyn VersionStrategy> = match kind {
        StrategyKind::TextScan => Box::new(TextScanner::new()),
        StrategyKind::InProcess => {
            let _interrupts = watch.spawn_interrupt_handler();
            Box::new(InProcessLoad::new(host.with_watch(watch.clone()), watch.clone()))
        }
        StrategyKind::Subprocess => {
            let _interrupts = watch.spawn_interrupt_handler();
            Box::new(SubprocessLoad::probe(
                host.interpreter(),
                host.includes(),
                watch.clone(),
            )?)
        }
    };

    let summary = Driver::new(&search_path, strategy.as_ref())
        .run(&plan, std::io::stdout(), std::io::stderr())
        .await?;
    Ok(summary)
}

/// Worker side of the subprocess strategy
///
/// Prints exactly one protocol line for `module` on stdout. The parent passes
/// the interpreter and include directories explicitly, so the config file is
/// not read here.
fn probe(module: &str, host_args: &HostArgs) -> anyhow::Result<ExitCode> {
    let outcome = match module.parse::<ModuleName>() {
        Ok(name) => {
            let interpreter = host_args
                .perl
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INTERPRETER));
            let mut host = PerlHost::new(interpreter, host_args.includes.clone());
            load_version(&mut host, &name, &LoadWatch::new())
        }
        Err(e) => {
            debug!("{}", e);
            VersionOutcome::failed()
        }
    };

    let mut stdout = std::io::stdout();
    stdout.write_all(protocol::encode(&outcome).as_bytes())?;
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}
