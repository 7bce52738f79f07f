use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "agent-panel", about = "Configure procurement assistant agents")]
pub struct Cli {
    #[arg(long, default_value = "panel.toml")]
    pub config: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Answer yes to every confirmation prompt.
    #[arg(long)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the agents known to the default catalog.
    Agents,
    /// Load one agent's configuration and print it.
    Show { agent: String },
    /// Interactive panel session.
    Repl { agent: Option<String> },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
