pub mod confirm;
pub mod outcome;
pub mod tab;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::agents::registry::AgentCatalog;
use crate::agents::types::{AgentConfig, KnowledgeKind, KnowledgeSource};
use crate::backend::types::{AgentUpdate, ConfigBackend, FileUpload};
use crate::backend::HttpConfigBackend;
use crate::config::schema::PanelConfig;
use crate::config::validate_config;
use crate::error::{Error, Result};
use crate::events::types::{Notice, NoticeLevel, PanelEvent};
use crate::events::{EventBus, NoticeBoard};

pub use confirm::{Confirm, FixedAnswer};
pub use outcome::{KnowledgeChange, LoadOutcome, LoadTicket, RemoveOutcome, SyncOutcome};
pub use tab::ConfigTab;

const REMOVE_SOURCE_QUESTION: &str = "Are you sure you want to remove this knowledge source?";
const RESET_AGENT_QUESTION: &str =
    "Are you sure you want to reset this agent to default settings? This action cannot be undone.";
const RESET_PROMPT_QUESTION: &str = "Are you sure you want to reset the prompt to default?";

#[derive(Debug, Clone)]
pub struct PanelOptions {
    pub notice_dismiss_after: Duration,
    pub event_buffer: usize,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            notice_dismiss_after: Duration::from_secs(5),
            event_buffer: 128,
        }
    }
}

/// Rendered system prompt for a read-only preview window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPreview {
    pub title: String,
    pub body: String,
}

impl std::fmt::Display for PromptPreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;
        write!(f, "{}", self.body)
    }
}

/// Messages reported by one of the save actions.
struct SaveMessages {
    saved: &'static str,
    error_prefix: &'static str,
    demo: &'static str,
}

/// Editing state for the configuration of one agent at a time.
///
/// The panel owns its draft configuration and mirrors every change onto an
/// [`EventBus`]; a front-end renders those events. Backend failures never
/// abort an operation: they come back as [`SyncOutcome`] / [`LoadOutcome`]
/// values together with a user-facing notice.
pub struct ConfigurationPanel {
    backend: Arc<dyn ConfigBackend>,
    catalog: AgentCatalog,
    events: EventBus,
    notices: NoticeBoard,
    notice_dismiss_after: Duration,
    active_agent: Option<String>,
    draft: AgentConfig,
    visible: bool,
    loading: bool,
    active_tab: ConfigTab,
    load_generation: u64,
    pending_load: Option<LoadTicket>,
}

impl std::fmt::Debug for ConfigurationPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationPanel")
            .field("backend", &self.backend.name())
            .field("active_agent", &self.active_agent)
            .field("visible", &self.visible)
            .field("loading", &self.loading)
            .field("active_tab", &self.active_tab)
            .finish()
    }
}

impl ConfigurationPanel {
    pub fn new(
        backend: Arc<dyn ConfigBackend>,
        catalog: AgentCatalog,
        options: PanelOptions,
    ) -> Self {
        Self {
            backend,
            catalog,
            events: EventBus::new(options.event_buffer),
            notices: NoticeBoard::new(),
            notice_dismiss_after: options.notice_dismiss_after,
            active_agent: None,
            draft: AgentConfig::default(),
            visible: false,
            loading: false,
            active_tab: ConfigTab::default(),
            load_generation: 0,
            pending_load: None,
        }
    }

    /// Panel talking HTTP to the configured backend.
    pub fn from_config(config: &PanelConfig) -> Result<Self> {
        validate_config(config)?;
        let catalog = AgentCatalog::from_config(&config.catalog)?;
        let backend = HttpConfigBackend::new(&config.backend)?;
        let options = PanelOptions {
            notice_dismiss_after: Duration::from_secs(config.notices.dismiss_after_secs),
            ..PanelOptions::default()
        };
        Ok(Self::new(Arc::new(backend), catalog, options))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.events.subscribe()
    }

    pub fn active_agent(&self) -> Option<&str> {
        self.active_agent.as_deref()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.draft
    }

    pub fn capabilities(&self) -> &[String] {
        &self.draft.capabilities
    }

    pub fn knowledge_sources(&self) -> &[KnowledgeSource] {
        &self.draft.knowledge_sources
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn active_tab(&self) -> ConfigTab {
        self.active_tab
    }

    /// Tab whose content is on screen; none while a load is running.
    pub fn visible_tab(&self) -> Option<ConfigTab> {
        (!self.loading).then_some(self.active_tab)
    }

    pub fn switch_tab(&mut self, tab: ConfigTab) {
        self.active_tab = tab;
    }

    /// Notice still on display (auto-dismissed after the configured delay).
    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.visible_at(Utc::now())
    }

    pub async fn open(&mut self, agent_id: &str) -> LoadOutcome {
        self.active_agent = Some(agent_id.to_owned());
        self.visible = true;
        self.events.publish(PanelEvent::ModalShown {
            agent_id: agent_id.to_owned(),
        });
        self.load(agent_id).await
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.active_agent = None;
        self.pending_load = None;
        self.set_loading(false);
        self.events.publish(PanelEvent::ModalHidden);
    }

    /// Reloads an agent. While the panel is open on another agent, the
    /// loaded agent becomes the active one.
    pub async fn load(&mut self, agent_id: &str) -> LoadOutcome {
        if self.active_agent.is_some() && self.active_agent.as_deref() != Some(agent_id) {
            self.active_agent = Some(agent_id.to_owned());
        }
        let ticket = self.begin_load(agent_id);
        let fetched = self.backend.fetch_config(agent_id).await;
        self.finish_load(ticket, fetched)
    }

    /// Starts a load; only the most recent ticket may populate the panel.
    pub fn begin_load(&mut self, agent_id: &str) -> LoadTicket {
        self.load_generation += 1;
        let ticket = LoadTicket {
            agent_id: agent_id.to_owned(),
            generation: self.load_generation,
        };
        self.pending_load = Some(ticket.clone());
        self.set_loading(true);
        ticket
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        fetched: Result<AgentConfig>,
    ) -> LoadOutcome {
        let agent_matches = self
            .active_agent
            .as_deref()
            .map_or(true, |active| active == ticket.agent_id);
        let is_pending = self.pending_load.as_ref() == Some(&ticket);
        if is_pending && !agent_matches {
            self.pending_load = None;
            self.set_loading(false);
        }
        if !is_pending || !agent_matches {
            tracing::debug!(
                agent_id = %ticket.agent_id,
                generation = ticket.generation,
                "discarding stale configuration response"
            );
            return LoadOutcome::Stale;
        }

        self.pending_load = None;
        let outcome = match fetched {
            Ok(config) => {
                self.populate(config);
                self.notify(NoticeLevel::Success, "Configuration loaded successfully");
                LoadOutcome::Remote
            }
            Err(Error::Connectivity(error)) => {
                tracing::info!(agent_id = %ticket.agent_id, %error, "backend unreachable, using default configuration");
                self.load_defaults(&ticket.agent_id);
                self.notify(
                    NoticeLevel::Error,
                    "Loaded default configuration (backend not connected)",
                );
                LoadOutcome::DefaultsAfterConnectivityError { error }
            }
            Err(other) => {
                let error = match other {
                    Error::Remote(message) => message,
                    other => other.to_string(),
                };
                tracing::info!(agent_id = %ticket.agent_id, %error, "backend rejected configuration load, using defaults");
                self.notify(
                    NoticeLevel::Error,
                    format!("Error loading configuration: {error}"),
                );
                self.load_defaults(&ticket.agent_id);
                LoadOutcome::DefaultsAfterRemoteError { error }
            }
        };
        self.set_loading(false);
        outcome
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.draft.prompt = prompt.into();
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.draft.model = model.into();
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.draft.max_tokens = max_tokens;
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.draft.temperature = temperature;
    }

    pub fn add_capability(&mut self, capability: &str) -> bool {
        if !self.draft.add_capability(capability) {
            return false;
        }
        self.publish_capabilities();
        self.notify(NoticeLevel::Success, "Capability added successfully");
        true
    }

    pub fn remove_capability(&mut self, capability: &str) -> bool {
        if !self.draft.remove_capability(capability) {
            return false;
        }
        self.publish_capabilities();
        self.notify(NoticeLevel::Success, "Capability removed");
        true
    }

    pub async fn upload_knowledge_file(
        &mut self,
        upload: FileUpload,
        display_name: Option<&str>,
    ) -> Result<KnowledgeChange> {
        let mut changes = self
            .upload_knowledge_files(vec![upload], display_name)
            .await?;
        changes
            .pop()
            .ok_or_else(|| Error::Validation("no file was uploaded".to_owned()))
    }

    /// Uploads each file in turn; `display_name` (when non-blank) names
    /// every uploaded source, otherwise the file name does.
    pub async fn upload_knowledge_files(
        &mut self,
        uploads: Vec<FileUpload>,
        display_name: Option<&str>,
    ) -> Result<Vec<KnowledgeChange>> {
        if uploads.is_empty() {
            self.notify(NoticeLevel::Error, "Please select files to upload");
            return Err(Error::Validation(
                "no files selected for upload".to_owned(),
            ));
        }
        let agent_id = self.require_agent()?;
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let mut changes = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let name = display_name.unwrap_or(&upload.file_name).to_owned();
            let result = self.backend.upload_file(&agent_id, &upload, &name).await;

            let change = match result {
                Ok(ack) => {
                    let id = ack
                        .knowledge_id
                        .unwrap_or_else(|| self.local_source_id());
                    let source = KnowledgeSource::document(id, name, upload.size());
                    self.push_source(source.clone());
                    self.notify(
                        NoticeLevel::Success,
                        format!("File \"{}\" uploaded successfully", upload.file_name),
                    );
                    KnowledgeChange {
                        source: Some(source),
                        outcome: SyncOutcome::Saved,
                    }
                }
                Err(error) if error.is_connectivity() => {
                    tracing::warn!(%agent_id, file = %upload.file_name, %error, "upload failed, keeping document locally");
                    let source =
                        KnowledgeSource::document(self.local_source_id(), name, upload.size());
                    self.push_source(source.clone());
                    self.notify(
                        NoticeLevel::Warning,
                        format!("File \"{}\" uploaded (demo mode)", upload.file_name),
                    );
                    KnowledgeChange {
                        source: Some(source),
                        outcome: SyncOutcome::from_error(&error),
                    }
                }
                Err(error) => {
                    let outcome = SyncOutcome::from_error(&error);
                    self.notify(
                        NoticeLevel::Error,
                        format!(
                            "Error uploading \"{}\": {}",
                            upload.file_name,
                            failure_reason(&outcome)
                        ),
                    );
                    KnowledgeChange {
                        source: None,
                        outcome,
                    }
                }
            };
            changes.push(change);
        }

        Ok(changes)
    }

    pub async fn add_knowledge_url(&mut self, name: &str, url: &str) -> Result<KnowledgeChange> {
        let name = name.trim();
        let url = url.trim();
        if name.is_empty() || url.is_empty() {
            self.notify(NoticeLevel::Error, "Please enter both name and URL");
            return Err(Error::Validation(
                "knowledge url needs both a name and a url".to_owned(),
            ));
        }
        let agent_id = self.require_agent()?;

        let change = match self.backend.add_url(&agent_id, name, url).await {
            Ok(ack) => {
                let id = ack.knowledge_id.unwrap_or_else(|| self.local_source_id());
                let source = KnowledgeSource::url(id, name, url);
                self.push_source(source.clone());
                self.notify(NoticeLevel::Success, "URL added successfully");
                KnowledgeChange {
                    source: Some(source),
                    outcome: SyncOutcome::Saved,
                }
            }
            Err(error) if error.is_connectivity() => {
                tracing::warn!(%agent_id, %url, %error, "add url failed, keeping source locally");
                let source = KnowledgeSource::url(self.local_source_id(), name, url);
                self.push_source(source.clone());
                self.notify(NoticeLevel::Warning, "URL added (demo mode)");
                KnowledgeChange {
                    source: Some(source),
                    outcome: SyncOutcome::from_error(&error),
                }
            }
            Err(error) => {
                let outcome = SyncOutcome::from_error(&error);
                self.notify(
                    NoticeLevel::Error,
                    format!("Error adding URL: {}", failure_reason(&outcome)),
                );
                KnowledgeChange {
                    source: None,
                    outcome,
                }
            }
        };

        Ok(change)
    }

    pub async fn remove_knowledge_source(
        &mut self,
        source_id: &str,
        confirm: &dyn Confirm,
    ) -> Result<RemoveOutcome> {
        let agent_id = self.require_agent()?;
        if !confirm.confirm(REMOVE_SOURCE_QUESTION) {
            return Ok(RemoveOutcome::Cancelled);
        }

        let Some(source) = self.draft.remove_source(source_id) else {
            return Ok(RemoveOutcome::NotFound);
        };
        self.publish_sources();
        self.notify(NoticeLevel::Success, "Knowledge source removed");

        let backend = match self.backend.remove_knowledge(&agent_id, source_id).await {
            Ok(()) => SyncOutcome::Saved,
            Err(error) => {
                tracing::warn!(%agent_id, source_id, %error, "backend removal failed");
                SyncOutcome::from_error(&error)
            }
        };

        Ok(RemoveOutcome::Removed { source, backend })
    }

    /// Re-ingests a url source. Documents have nothing to fetch again.
    /// Returns `None` for an unknown id.
    pub async fn refresh_knowledge_source(&mut self, source_id: &str) -> Option<SyncOutcome> {
        let source = self.draft.find_source(source_id)?.clone();

        let result = match &source.kind {
            KnowledgeKind::Url { url } => self.backend.refresh_url(url).await,
            KnowledgeKind::Document { .. } => Ok(()),
        };

        let outcome = match result {
            Ok(()) => {
                self.notify(
                    NoticeLevel::Success,
                    format!("Knowledge source \"{}\" refreshed successfully", source.name),
                );
                SyncOutcome::Saved
            }
            Err(error) => {
                tracing::warn!(source_id, %error, "knowledge refresh failed");
                let reason = failure_reason(&SyncOutcome::from_error(&error)).to_owned();
                self.notify(
                    NoticeLevel::Error,
                    format!("Error refreshing knowledge source: {reason}"),
                );
                SyncOutcome::Failed { reason }
            }
        };
        Some(outcome)
    }

    pub async fn save_prompt(&mut self) -> Result<SyncOutcome> {
        let update = AgentUpdate::prompt(self.draft.prompt.clone());
        self.save(
            update,
            SaveMessages {
                saved: "Prompt saved successfully",
                error_prefix: "Error saving prompt",
                demo: "Prompt saved (demo mode)",
            },
        )
        .await
    }

    pub async fn save_model_settings(&mut self) -> Result<SyncOutcome> {
        let update = AgentUpdate::model_settings(self.draft.model_settings());
        self.save(
            update,
            SaveMessages {
                saved: "Model settings saved successfully",
                error_prefix: "Error saving model settings",
                demo: "Model settings saved (demo mode)",
            },
        )
        .await
    }

    pub async fn save_all_settings(&mut self) -> Result<SyncOutcome> {
        let update = AgentUpdate::all(&self.draft);
        self.save(
            update,
            SaveMessages {
                saved: "All settings saved successfully",
                error_prefix: "Error saving settings",
                demo: "All settings saved (demo mode)",
            },
        )
        .await
    }

    /// Discards edits and in-flight loads, restoring the catalog defaults.
    pub fn reset_agent(&mut self, confirm: &dyn Confirm) -> Result<bool> {
        let agent_id = self.require_agent()?;
        if !confirm.confirm(RESET_AGENT_QUESTION) {
            return Ok(false);
        }

        self.pending_load = None;
        self.set_loading(false);
        self.load_defaults(&agent_id);
        self.notify(NoticeLevel::Success, "Agent reset to default configuration");
        Ok(true)
    }

    pub fn reset_prompt(&mut self, confirm: &dyn Confirm) -> Result<bool> {
        let agent_id = self.require_agent()?;
        if !confirm.confirm(RESET_PROMPT_QUESTION) {
            return Ok(false);
        }

        self.draft.prompt = self.catalog.default_prompt(&agent_id).to_owned();
        self.notify(NoticeLevel::Success, "Prompt reset to default");
        Ok(true)
    }

    pub fn preview_prompt(&self) -> PromptPreview {
        PromptPreview {
            title: "System Prompt Preview".to_owned(),
            body: self.draft.prompt.clone(),
        }
    }

    async fn save(&mut self, update: AgentUpdate, messages: SaveMessages) -> Result<SyncOutcome> {
        let agent_id = self.require_agent()?;

        let outcome = match self.backend.update(&agent_id, &update).await {
            Ok(()) => SyncOutcome::Saved,
            Err(error) => {
                tracing::warn!(%agent_id, %error, "agent update did not reach the backend");
                SyncOutcome::from_error(&error)
            }
        };

        match &outcome {
            SyncOutcome::Saved => self.notify(NoticeLevel::Success, messages.saved),
            SyncOutcome::SavedLocallyOnly { .. } => {
                self.notify(NoticeLevel::Warning, messages.demo)
            }
            SyncOutcome::Failed { reason } => self.notify(
                NoticeLevel::Error,
                format!("{}: {reason}", messages.error_prefix),
            ),
        }
        Ok(outcome)
    }

    fn require_agent(&self) -> Result<String> {
        self.active_agent
            .clone()
            .ok_or_else(|| Error::Validation("no agent is open".to_owned()))
    }

    fn load_defaults(&mut self, agent_id: &str) {
        let defaults = self.catalog.resolve(agent_id).clone();
        self.populate(defaults);
    }

    fn populate(&mut self, config: AgentConfig) {
        self.draft = config;
        self.events.publish(PanelEvent::ConfigPopulated {
            agent_id: self.draft.id.clone(),
            name: self.draft.name.clone(),
        });
        self.publish_capabilities();
        self.publish_sources();
    }

    fn push_source(&mut self, source: KnowledgeSource) {
        self.draft.knowledge_sources.push(source);
        self.publish_sources();
    }

    fn local_source_id(&self) -> String {
        self.draft.next_local_source_id(Utc::now().timestamp_millis())
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.events.publish(PanelEvent::LoadingChanged { loading });
        }
    }

    fn publish_capabilities(&self) {
        self.events.publish(PanelEvent::CapabilitiesChanged {
            capabilities: self.draft.capabilities.clone(),
        });
    }

    fn publish_sources(&self) {
        self.events.publish(PanelEvent::KnowledgeSourcesChanged {
            sources: self.draft.knowledge_sources.clone(),
        });
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
            dismiss_after: self.notice_dismiss_after,
        };
        self.notices.post(notice.clone(), Utc::now());
        self.events.publish(PanelEvent::Notice(notice));
    }
}

fn failure_reason(outcome: &SyncOutcome) -> &str {
    match outcome {
        SyncOutcome::Saved => "",
        SyncOutcome::SavedLocallyOnly { reason } | SyncOutcome::Failed { reason } => reason,
    }
}
