use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use nncp_conditions::ConditionsConfig;
use nncp_sim::{run_reset, run_rollout, RolloutConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("nncp-sim")
        .version(nncp_sim::VERSION)
        .about("Policy conditions rollout simulator")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Controller config file (.toml, .yaml or .yml)"),
        )
        .subcommand(
            Command::new("rollout")
                .about("Roll a policy out across simulated nodes")
                .arg(
                    Arg::new("nodes")
                        .long("nodes")
                        .default_value("5")
                        .value_parser(value_parser!(usize))
                        .help("Number of ready nodes"),
                )
                .arg(
                    Arg::new("fail")
                        .long("fail")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Nodes whose enactment fails"),
                )
                .arg(
                    Arg::new("not-matching")
                        .long("not-matching")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Nodes the policy does not match"),
                )
                .arg(
                    Arg::new("replicas")
                        .long("replicas")
                        .default_value("2")
                        .value_parser(value_parser!(usize))
                        .help("Concurrent controller replicas"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("reset")
                .about("Seed a degraded policy and reset its conditions")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        );

    let matches = cli.get_matches();
    init_tracing(matches.get_flag("log-json"));
    let conditions = load_config(&matches)?;

    let passed = match matches.subcommand() {
        Some(("rollout", args)) => {
            let config = RolloutConfig {
                nodes: arg(args, "nodes")?,
                failing: arg(args, "fail")?,
                not_matching: arg(args, "not-matching")?,
                replicas: arg(args, "replicas")?,
                seed: arg(args, "seed")?,
                conditions,
                ..RolloutConfig::default()
            };

            let report = run_rollout(config).await.context("rollout failed")?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }
            report.passed
        }
        Some(("reset", args)) => {
            let report = run_reset(&conditions).await.context("reset failed")?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Reset Report:");
                println!("  Conditions before: {}", report.conditions_before);
                println!("  Conditions after: {}", report.conditions_after);
                println!(
                    "  Status: {}",
                    if report.passed { "PASSED" } else { "FAILED" }
                );
            }
            report.passed
        }
        _ => anyhow::bail!("unknown command"),
    };

    std::process::exit(if passed { 0 } else { 1 });
}

fn arg<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> anyhow::Result<T> {
    args.get_one::<T>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ConditionsConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => ConditionsConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ConditionsConfig::default()),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
