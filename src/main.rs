//! offtask - offline-first task list with a versioned response cache

use clap::Parser;

mod cli;
mod config;
mod error;
mod offline;
mod output;
mod store;

use cli::{CacheCommands, Cli, Commands, ConfigCommands, GlobalOptions, TaskCommands};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug for this crate with `--debug`
fn init_logging(debug: bool) {
    let default_filter = if debug { "offtask=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
    log::debug!("Debug logging enabled");
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Task(task_cmd) => match task_cmd {
            TaskCommands::List { completed, pending } => {
                cli::task::list(&opts, completed, pending).await
            }
            TaskCommands::Show { id } => cli::task::show(&opts, &id).await,
            TaskCommands::Add { title, description } => {
                cli::task::add(&opts, &title, &description).await
            }
            TaskCommands::Update {
                id,
                title,
                description,
                completed,
            } => {
                cli::task::update(
                    &opts,
                    &id,
                    title.as_deref(),
                    description.as_deref(),
                    completed,
                )
                .await
            }
            TaskCommands::Done { id } => cli::task::done(&opts, &id).await,
            TaskCommands::Delete { id } => cli::task::delete(&opts, &id).await,
            TaskCommands::Clear { yes } => cli::task::clear(&opts, yes).await,
        },
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Install => cli::cache::install(&opts).await,
            CacheCommands::Activate => cli::cache::activate(&opts).await,
            CacheCommands::Fetch {
                target,
                html,
                method,
                quiet,
            } => cli::cache::fetch(&opts, &target, html, &method, quiet).await,
            CacheCommands::Message { json } => cli::cache::message(&opts, &json).await,
            CacheCommands::Status => cli::cache::status(&opts),
            CacheCommands::Snapshots { name } => cli::cache::snapshots(&opts, name.as_deref()),
            CacheCommands::Clear { yes } => cli::cache::clear(&opts, yes),
            CacheCommands::Path => cli::cache::path(&opts),
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => cli::config::show(&opts),
            ConfigCommands::Init { force } => cli::config::init(&opts, force),
        },
        Commands::Completions { shell } => {
            cli::completions::run(shell);
            Ok(())
        }
        Commands::Version => {
            println!("offtask version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
