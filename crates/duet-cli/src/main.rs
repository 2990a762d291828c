use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use duet_artifact::render;
use duet_cli::{init_tracing, AppConfig, LogFormat, Overrides};
use duet_completion::HttpCompletionService;
use duet_core::{Pipeline, RunReport};
use duet_sandbox::{LocalSandboxFactory, SessionId, SessionRegistry};
use std::path::PathBuf;
use std::sync::Arc;

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("TOML config file");

    Command::new("duet")
        .version(duet_cli::VERSION)
        .about("Two-role code generation: plan, generate, test, review, revise")
        .subcommand_required(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Log output format (logs go to stderr)"),
        )
        .subcommand(
            Command::new("run")
                .about("Run one task through the pipeline")
                .arg(Arg::new("task").required(true).help("What to build"))
                .arg(config_arg.clone())
                .arg(
                    Arg::new("max-iterations")
                        .long("max-iterations")
                        .value_parser(value_parser!(u32))
                        .help("Revision rounds before giving up"),
                )
                .arg(
                    Arg::new("planning")
                        .long("planning")
                        .action(ArgAction::SetTrue)
                        .help("Produce a design before the instructions"),
                )
                .arg(
                    Arg::new("stepping")
                        .long("stepping")
                        .action(ArgAction::SetTrue)
                        .help("Split the design into steps built one at a time"),
                )
                .arg(
                    Arg::new("testing")
                        .long("testing")
                        .action(ArgAction::SetTrue)
                        .help("Run a generated test command before each review"),
                )
                .arg(
                    Arg::new("no-summary")
                        .long("no-summary")
                        .action(ArgAction::SetTrue)
                        .help("Skip the final summary"),
                )
                .arg(
                    Arg::new("sandbox-dir")
                        .long("sandbox-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Keep the generated files under this directory"),
                )
                .arg(
                    Arg::new("session")
                        .long("session")
                        .default_value("default")
                        .help("Session name; its files live in <sandbox-dir>/<session>"),
                )
                .arg(Arg::new("model").long("model").help("Model name override"))
                .arg(
                    Arg::new("endpoint")
                        .long("endpoint")
                        .help("OpenAI-compatible API base URL"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the full run report as JSON"),
                ),
        )
        .subcommand(
            Command::new("show-config")
                .about("Print the effective configuration")
                .arg(config_arg),
        )
}

fn overrides(args: &ArgMatches) -> Overrides {
    Overrides {
        max_iterations: args.get_one::<u32>("max-iterations").copied(),
        planning: args.get_flag("planning"),
        stepping: args.get_flag("stepping"),
        testing: args.get_flag("testing"),
        no_summary: args.get_flag("no-summary"),
        sandbox_dir: args.get_one::<PathBuf>("sandbox-dir").cloned(),
        model: args.get_one::<String>("model").cloned(),
        endpoint: args.get_one::<String>("endpoint").cloned(),
    }
}

fn load_config(args: &ArgMatches) -> anyhow::Result<AppConfig> {
    let path = args.get_one::<PathBuf>("config");
    Ok(AppConfig::load(path.map(PathBuf::as_path))?)
}

fn print_report(report: &RunReport) {
    println!("Run {}: {} after {} revision(s)", report.run_id, report.outcome, report.iterations_used);
    if report.steps_completed > 0 {
        println!("Steps completed: {}", report.steps_completed);
    }
    println!("Fingerprint: {}", report.fingerprint.short());
    println!();
    if let Some(summary) = &report.summary {
        println!("{}", summary.trim());
        println!();
    }
    print!("{}", render(&report.final_artifacts));
}

async fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let task = args
        .get_one::<String>("task")
        .context("a task is required")?;
    let mut config = load_config(args)?;
    config.apply(&overrides(args));

    let completion = HttpCompletionService::from_config(config.completion.clone())
        .context("cannot build completion client")?;
    let pipeline = Pipeline::new(Arc::new(completion), config.pipeline.clone());
    let registry = SessionRegistry::new(Arc::new(LocalSandboxFactory::new(config.sandbox.clone())));
    let session = SessionId::new(
        args.get_one::<String>("session")
            .map_or("default", String::as_str),
    );

    let result = pipeline.run_session(task, &registry, &session).await;
    registry.shutdown_all().await;
    let report = result?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    if let Some(root) = &config.sandbox.root {
        eprintln!("Files kept in {}", root.join(session.dir_name()).display());
    }
    Ok(())
}

fn show_config(args: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(args)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let format = matches
        .get_one::<String>("log-format")
        .and_then(|f| f.parse::<LogFormat>().ok())
        .unwrap_or_default();
    init_tracing(format, "info");

    let result = match matches.subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("show-config", args)) => show_config(args),
        _ => Ok(()),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "duet failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
