use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "jobroute",
    about = "jobroute — rule-based job destination routing",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Show the full diagnostic trail (validation decisions, measurements).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a routing config and print its normalized form.
    Validate {
        /// Path to a YAML or TOML config
        path: String,
        /// Only report whether the config is already clean
        #[arg(long)]
        check: bool,
        /// Output format for the normalized config
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
    /// Resolve the destination for a job.
    ///
    /// Inputs are measured from disk. Files ending in .fasta or .fa count
    /// records by `>` headers; anything else counts lines.
    Resolve {
        /// Path to a YAML or TOML config
        #[arg(short, long)]
        config: String,
        /// Tool the job runs
        #[arg(short, long)]
        tool: String,
        /// Requester email
        #[arg(short, long)]
        user: String,
        /// Pick tier-qualified destinations
        #[arg(long)]
        priority: bool,
        /// Job input as name=path (repeatable)
        #[arg(long = "input", value_name = "NAME=PATH")]
        inputs: Vec<String>,
        /// Tool argument as key=value (repeatable); values are read as JSON
        /// when they parse, otherwise as strings
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "jobroute=debug" } else { "jobroute=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate { path, check, format } => {
            commands::validate::validate(&path, check, format)
        }
        Commands::Resolve {
            config,
            tool,
            user,
            priority,
            inputs,
            args,
        } => commands::resolve::resolve(&config, &tool, &user, priority, &inputs, &args),
    }
}
