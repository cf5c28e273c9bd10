mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use commands::{
    EXIT_DEPLOY_ERROR, EXIT_FAILURE, EXIT_SPEC_ERROR, EXIT_STORE_ERROR, EXIT_SUCCESS,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "boxyard",
    version,
    about = "Declarative deployment of chart boxes into a Kubernetes cluster"
)]
struct Cli {
    /// Path to the boxyard store directory.
    #[arg(long, default_value = "~/.local/share/boxyard", global = true)]
    store: String,

    /// Deploy driver used to reach the cluster.
    #[arg(
        long,
        env = "BOXYARD_DRIVER",
        default_value = "helm",
        value_parser = ["helm", "mock"],
        global = true
    )]
    driver: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deploy an environment spec: tear down the previous deploy, stage and apply every box.
    Deploy {
        /// Path to the environment spec TOML file.
        #[arg(default_value = "boxyard.toml")]
        spec: PathBuf,
    },
    /// Show what a deploy would tear down and apply, without changing anything.
    Plan {
        /// Path to the environment spec TOML file.
        #[arg(default_value = "boxyard.toml")]
        spec: PathBuf,
    },
    /// Check an environment spec and its chart sources.
    Validate {
        /// Path to the environment spec TOML file.
        #[arg(default_value = "boxyard.toml")]
        spec: PathBuf,
    },
    /// List deployed environments.
    List,
    /// Show the recorded snapshot of a deployed environment.
    Inspect {
        /// Environment ID.
        env_id: String,
    },
    /// Ask the driver for the cluster status of every box of an environment.
    Describe {
        /// Environment ID.
        env_id: String,
    },
    /// Tear down every box of an environment and forget it.
    Destroy {
        /// Environment ID.
        env_id: String,
        /// Do not ask for confirmation.
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Run diagnostic checks on the driver prerequisites and the store.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BOXYARD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let store_path = expand_tilde(&cli.store);
    let json_output = cli.json;
    let driver = cli.driver.as_str();

    let needs_cluster = matches!(
        cli.command,
        Commands::Deploy { .. } | Commands::Describe { .. } | Commands::Destroy { .. }
    );
    if needs_cluster
        && driver == "helm"
        && std::env::var("BOXYARD_SKIP_PREREQS").as_deref() != Ok("1")
    {
        if let Err(msg) = commands::check_prereqs() {
            eprintln!("error: {msg}");
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let result = match cli.command {
        Commands::Deploy { spec } => commands::deploy::run(&store_path, driver, &spec, json_output),
        Commands::Plan { spec } => commands::plan::run(&store_path, driver, &spec, json_output),
        Commands::Validate { spec } => {
            commands::validate::run(&store_path, driver, &spec, json_output)
        }
        Commands::List => commands::list::run(&store_path, driver, json_output),
        Commands::Inspect { env_id } => {
            commands::inspect::run(&store_path, driver, &env_id, json_output)
        }
        Commands::Describe { env_id } => {
            commands::describe::run(&store_path, driver, &env_id, json_output)
        }
        Commands::Destroy { env_id, yes } => {
            commands::destroy::run(&store_path, driver, &env_id, yes, json_output)
        }
        Commands::Doctor => commands::doctor::run(&store_path, driver, json_output),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "boxyard", &mut std::io::stdout());
            Ok(EXIT_SUCCESS)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("spec error:") || msg.starts_with("validation failed") {
        EXIT_SPEC_ERROR
    } else if msg.starts_with("store error:") || msg.starts_with("store lock:") {
        EXIT_STORE_ERROR
    } else if msg.starts_with("deploy error:") {
        EXIT_DEPLOY_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
