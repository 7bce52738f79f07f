use agent_panel_core::agents::AgentConfig;
use agent_panel_core::events::{NoticeLevel, PanelEvent};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;

use crate::cli::OutputFormat;

pub struct Renderer {
    output_format: OutputFormat,
}

impl Renderer {
    pub fn new(output_format: OutputFormat) -> Self {
        Self { output_format }
    }

    /// Renders every event published since the last drain.
    pub fn drain(&self, events: &mut Receiver<PanelEvent>) {
        loop {
            match events.try_recv() {
                Ok(event) => self.render_event(&event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "renderer fell behind the panel event stream");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    pub fn render_event(&self, event: &PanelEvent) {
        match self.output_format {
            OutputFormat::Text => self.render_text(event),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string(event).unwrap_or_else(|_| "{}".to_owned())
            ),
        }
    }

    pub fn render_config(&self, config: &AgentConfig) {
        match self.output_format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(config).unwrap_or_else(|_| "{}".to_owned())
            ),
            OutputFormat::Text => {
                println!("{} {} ({})", config.avatar, config.name, config.id);
                println!("  title:        {}", config.title);
                println!("  description:  {}", config.description);
                println!("  color:        {}", config.color);
                println!("  capabilities: {}", config.capabilities.join(", "));
                println!(
                    "  model:        {} (max_tokens {}, temperature {})",
                    config.model, config.max_tokens, config.temperature
                );
                println!("  knowledge:");
                render_sources(config);
                println!("  prompt:");
                for line in config.prompt.lines() {
                    println!("    {line}");
                }
            }
        }
    }

    fn render_text(&self, event: &PanelEvent) {
        match event {
            PanelEvent::ModalShown { agent_id } => println!("[panel] opened {agent_id}"),
            PanelEvent::ModalHidden => println!("[panel] closed"),
            PanelEvent::LoadingChanged { loading } => {
                if *loading {
                    println!("[panel] loading configuration...");
                }
            }
            PanelEvent::ConfigPopulated { agent_id, name } => {
                println!("[config] {name} ({agent_id})");
            }
            PanelEvent::CapabilitiesChanged { capabilities } => {
                println!("[capabilities] {}", capabilities.join(", "));
            }
            PanelEvent::KnowledgeSourcesChanged { sources } => {
                println!("[knowledge] {} source(s)", sources.len());
            }
            PanelEvent::Notice(notice) => match notice.level {
                NoticeLevel::Success => println!("[ok] {}", notice.message),
                NoticeLevel::Warning => println!("[demo] {}", notice.message),
                NoticeLevel::Error => eprintln!("[error] {}", notice.message),
            },
        }
    }
}

fn render_sources(config: &AgentConfig) {
    if config.knowledge_sources.is_empty() {
        println!("    No knowledge sources added yet");
        return;
    }
    for source in &config.knowledge_sources {
        println!(
            "    [{}] {} ({}: {})",
            source.id,
            source.name,
            source.type_label(),
            source.detail()
        );
    }
}
