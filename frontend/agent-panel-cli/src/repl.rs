use std::io::{self, Write};
use std::path::Path;

use agent_panel_core::backend::FileUpload;
use agent_panel_core::error::{Error, Result};
use agent_panel_core::panel::{Confirm, ConfigTab, RemoveOutcome, SyncOutcome};
use agent_panel_core::ConfigurationPanel;

use crate::renderer::Renderer;

const HELP: &str = "\
Commands:
  open <agent>               open the panel for an agent
  close                      close the panel
  show                       print the current configuration
  tab <general|prompt|model|knowledge>
  set <field> <value>        name, title, description, prompt, model, max_tokens, temperature
  cap add <text>             add a capability
  cap rm <text>              remove a capability
  url <name> <url>           add a url knowledge source
  upload <path> [name]       upload a document
  rm <source-id>             remove a knowledge source
  refresh <source-id>        re-ingest a knowledge source
  save <prompt|model|all>    persist edits
  reset                      restore the agent's default configuration
  reset-prompt               restore the default prompt
  preview                    show the system prompt
  exit";

/// Asks on stdin; anything but `y`/`yes` declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, message: &str) -> bool {
        print!("{message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

pub struct Repl {
    panel: ConfigurationPanel,
    renderer: Renderer,
    confirm: Box<dyn Confirm>,
}

impl Repl {
    pub fn new(panel: ConfigurationPanel, renderer: Renderer, confirm: Box<dyn Confirm>) -> Self {
        Self {
            panel,
            renderer,
            confirm,
        }
    }

    pub async fn run(&mut self, agent_id: Option<String>) -> Result<()> {
        let mut events = self.panel.subscribe();

        println!("Agent configuration panel (type 'help' for commands)");
        if let Some(agent_id) = agent_id {
            self.panel.open(&agent_id).await;
            self.renderer.drain(&mut events);
        }

        loop {
            let prompt = self.panel.active_agent().unwrap_or("-").to_owned();
            print!("{prompt}> ");
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();
            if input.is_empty() {
                continue;
            }
            if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
                break;
            }

            let result = self.execute(input).await;
            self.renderer.drain(&mut events);
            if let Err(error) = result {
                eprintln!("[error] {error}");
            }
        }

        Ok(())
    }

    async fn execute(&mut self, input: &str) -> Result<()> {
        let (command, rest) = split_word(input);
        match command {
            "help" => println!("{HELP}"),
            "open" => {
                let agent_id = required(rest, "open <agent>")?;
                self.panel.open(agent_id).await;
            }
            "close" => self.panel.close(),
            "show" => {
                self.require_open()?;
                self.renderer.render_config(self.panel.config());
            }
            "tab" => {
                let tab: ConfigTab = required(rest, "tab <name>")?.parse()?;
                self.panel.switch_tab(tab);
                println!("[panel] tab {tab}");
            }
            "set" => {
                let (field, value) = split_word(rest);
                self.set_field(field, value)?;
            }
            "cap" => {
                let (action, text) = split_word(rest);
                let text = required(text, "cap add|rm <text>")?;
                match action {
                    "add" => {
                        if !self.panel.add_capability(text) {
                            println!("[panel] capability already present");
                        }
                    }
                    "rm" => {
                        if !self.panel.remove_capability(text) {
                            println!("[panel] no capability named '{text}'");
                        }
                    }
                    other => {
                        return Err(Error::Validation(format!(
                            "unknown capability action '{other}'"
                        )))
                    }
                }
            }
            "url" => {
                let (name, url) = rest.rsplit_once(char::is_whitespace).unwrap_or((rest, ""));
                self.panel.add_knowledge_url(name, url).await?;
            }
            "upload" => {
                let (path, name) = split_word(rest);
                let path = required(path, "upload <path> [name]")?;
                let upload = FileUpload::from_path(Path::new(path))?;
                let name = (!name.is_empty()).then_some(name);
                self.panel.upload_knowledge_files(vec![upload], name).await?;
            }
            "rm" => {
                let source_id = required(rest, "rm <source-id>")?;
                match self
                    .panel
                    .remove_knowledge_source(source_id, self.confirm.as_ref())
                    .await?
                {
                    RemoveOutcome::Cancelled => println!("[panel] kept {source_id}"),
                    RemoveOutcome::NotFound => println!("[panel] no source with id {source_id}"),
                    RemoveOutcome::Removed { backend, .. } => {
                        if !backend.is_saved() {
                            tracing::debug!(?backend, "removal not confirmed by backend");
                        }
                    }
                }
            }
            "refresh" => {
                let source_id = required(rest, "refresh <source-id>")?;
                if self.panel.refresh_knowledge_source(source_id).await.is_none() {
                    println!("[panel] no source with id {source_id}");
                }
            }
            "save" => {
                self.require_open()?;
                let outcome = match rest {
                    "prompt" => self.panel.save_prompt().await?,
                    "model" => self.panel.save_model_settings().await?,
                    "all" | "" => self.panel.save_all_settings().await?,
                    other => {
                        return Err(Error::Validation(format!(
                            "unknown save target '{other}'"
                        )))
                    }
                };
                if let SyncOutcome::SavedLocallyOnly { reason } = outcome {
                    tracing::info!(%reason, "changes kept locally only");
                }
            }
            "reset" => {
                self.panel.reset_agent(self.confirm.as_ref())?;
            }
            "reset-prompt" => {
                self.panel.reset_prompt(self.confirm.as_ref())?;
            }
            "preview" => println!("{}", self.panel.preview_prompt()),
            other => {
                return Err(Error::Validation(format!(
                    "unknown command '{other}' (try 'help')"
                )))
            }
        }
        Ok(())
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "name" => self.panel.set_name(value),
            "title" => self.panel.set_title(value),
            "description" => self.panel.set_description(value),
            "prompt" => self.panel.set_prompt(value.replace("\\n", "\n")),
            "model" => self.panel.set_model(value),
            "max_tokens" => self.panel.set_max_tokens(value.parse().map_err(|err| {
                Error::Validation(format!("invalid max_tokens '{value}': {err}"))
            })?),
            "temperature" => self.panel.set_temperature(value.parse().map_err(|err| {
                Error::Validation(format!("invalid temperature '{value}': {err}"))
            })?),
            other => {
                return Err(Error::Validation(format!("unknown field '{other}'")));
            }
        }
        Ok(())
    }

    fn require_open(&self) -> Result<()> {
        match self.panel.active_agent() {
            Some(_) => Ok(()),
            None => Err(Error::Validation("no agent is open".to_owned())),
        }
    }
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn required<'a>(value: &'a str, usage: &str) -> Result<&'a str> {
    if value.is_empty() {
        Err(Error::Validation(format!("usage: {usage}")))
    } else {
        Ok(value)
    }
}
