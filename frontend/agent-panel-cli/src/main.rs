mod cli;
mod renderer;
mod repl;

use std::path::Path;

use agent_panel_core::panel::{Confirm, FixedAnswer};
use agent_panel_core::{AgentCatalog, ConfigurationPanel};

fn main() {
    if let Err(error) = run() {
        eprintln!("agent-panel failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> agent_panel_core::Result<()> {
    let args = cli::Cli::parse_args();
    let config = agent_panel_core::config::load(Some(Path::new(&args.config)))?;
    agent_panel_core::config::validate_config(&config)?;
    agent_panel_core::logging::init_tracing(&config.logging);

    let renderer = renderer::Renderer::new(args.output);
    let command = args
        .command
        .unwrap_or(cli::Command::Repl { agent: None });

    match command {
        cli::Command::Agents => {
            let catalog = AgentCatalog::from_config(&config.catalog)?;
            for agent_id in catalog.list_agents() {
                if let Some(agent) = catalog.get_config(&agent_id) {
                    println!("{agent_id:<10} {} - {}", agent.name, agent.title);
                }
            }
            Ok(())
        }
        cli::Command::Show { agent } => {
            let runtime = new_runtime()?;
            let mut panel = ConfigurationPanel::from_config(&config)?;
            let mut events = panel.subscribe();
            runtime.block_on(panel.open(&agent));
            renderer.drain(&mut events);
            renderer.render_config(panel.config());
            Ok(())
        }
        cli::Command::Repl { agent } => {
            let runtime = new_runtime()?;
            let panel = ConfigurationPanel::from_config(&config)?;
            let confirm: Box<dyn Confirm> = if args.yes {
                Box::new(FixedAnswer(true))
            } else {
                Box::new(repl::StdinConfirm)
            };
            let mut repl = repl::Repl::new(panel, renderer, confirm);
            runtime.block_on(repl.run(agent))
        }
    }
}

fn new_runtime() -> agent_panel_core::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|err| {
        agent_panel_core::Error::Config(format!("failed to create tokio runtime: {err}"))
    })
}
