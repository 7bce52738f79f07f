use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;
use crate::backend::types::BackendAck;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Online,
    Offline,
    Rejecting,
}

/// In-memory backend whose behaviour is switched per test.
struct ScriptedBackend {
    mode: Mutex<Mode>,
    configs: HashMap<String, AgentConfig>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<u32>,
}

impl ScriptedBackend {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            configs: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        })
    }

    fn with_config(mode: Mode, config: AgentConfig) -> Arc<Self> {
        let mut configs = HashMap::new();
        configs.insert(config.id.clone(), config);
        Arc::new(Self {
            mode: Mutex::new(mode),
            configs,
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        })
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().expect("mode lock") = mode;
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().expect("calls lock").push(call);
        match *self.mode.lock().expect("mode lock") {
            Mode::Online => Ok(()),
            Mode::Offline => Err(Error::Connectivity("connection refused".to_owned())),
            Mode::Rejecting => Err(Error::Remote("permission denied".to_owned())),
        }
    }

    fn ack(&self) -> BackendAck {
        let mut next = self.next_id.lock().expect("id lock");
        *next += 1;
        BackendAck {
            knowledge_id: Some(format!("srv-{next}")),
        }
    }
}

#[async_trait]
impl ConfigBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_config(&self, agent_id: &str) -> Result<AgentConfig> {
        self.record(format!("fetch {agent_id}"))?;
        self.configs
            .get(agent_id)
            .cloned()
            .ok_or_else(|| Error::Remote(format!("agent {agent_id} not found")))
    }

    async fn upload_file(
        &self,
        agent_id: &str,
        upload: &FileUpload,
        display_name: &str,
    ) -> Result<BackendAck> {
        self.record(format!(
            "upload {agent_id} {} as {display_name}",
            upload.file_name
        ))?;
        Ok(self.ack())
    }

    async fn add_url(&self, agent_id: &str, name: &str, url: &str) -> Result<BackendAck> {
        self.record(format!("add-url {agent_id} {name} {url}"))?;
        Ok(self.ack())
    }

    async fn remove_knowledge(&self, agent_id: &str, source_id: &str) -> Result<()> {
        self.record(format!("remove {agent_id} {source_id}"))
    }

    async fn refresh_url(&self, url: &str) -> Result<()> {
        self.record(format!("refresh {url}"))
    }

    async fn update(&self, agent_id: &str, update: &AgentUpdate) -> Result<()> {
        let body = serde_json::to_string(update).map_err(|err| Error::Remote(err.to_string()))?;
        self.record(format!("update {agent_id} {body}"))
    }
}

fn panel_with(backend: Arc<ScriptedBackend>) -> ConfigurationPanel {
    let catalog = AgentCatalog::builtin("wally").expect("builtin catalog");
    ConfigurationPanel::new(backend, catalog, PanelOptions::default())
}

fn live_catm() -> AgentConfig {
    AgentConfig {
        id: "catm".to_owned(),
        name: "CatM Live".to_owned(),
        title: "Category Lead".to_owned(),
        description: "Served by the backend".to_owned(),
        avatar: "📈".to_owned(),
        color: "#123456".to_owned(),
        capabilities: vec!["Category Strategy".to_owned()],
        prompt: "live prompt".to_owned(),
        model: "claude-3-opus-20240229".to_owned(),
        max_tokens: 2048,
        temperature: 0.2,
        knowledge_sources: vec![KnowledgeSource::url("k1", "Index", "https://index.example")],
    }
}

fn notice_messages(receiver: &mut broadcast::Receiver<PanelEvent>) -> Vec<(NoticeLevel, String)> {
    let mut messages = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let PanelEvent::Notice(notice) = event {
            messages.push((notice.level, notice.message));
        }
    }
    messages
}

const YES: FixedAnswer = FixedAnswer(true);
const NO: FixedAnswer = FixedAnswer(false);

#[tokio::test]
async fn reachable_backend_populates_every_field() {
    let backend = ScriptedBackend::with_config(Mode::Online, live_catm());
    let mut panel = panel_with(backend);
    let mut events = panel.subscribe();

    let outcome = panel.open("catm").await;

    assert_eq!(outcome, LoadOutcome::Remote);
    assert_eq!(panel.config(), &live_catm());
    assert!(panel.is_visible());
    assert!(!panel.is_loading());
    assert_eq!(panel.visible_tab(), Some(ConfigTab::General));
    assert_eq!(
        notice_messages(&mut events),
        vec![(NoticeLevel::Success, "Configuration loaded successfully".to_owned())]
    );
}

#[tokio::test]
async fn unknown_agent_offline_falls_back_to_wally() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    let mut events = panel.subscribe();

    let outcome = panel.open("sourcing-bot").await;

    assert!(matches!(outcome, LoadOutcome::DefaultsAfterConnectivityError { .. }));
    assert_eq!(panel.config().id, "wally");
    assert_eq!(panel.config().name, "Wally");
    assert_eq!(panel.active_agent(), Some("sourcing-bot"));
    assert_eq!(
        notice_messages(&mut events),
        vec![(
            NoticeLevel::Error,
            "Loaded default configuration (backend not connected)".to_owned()
        )]
    );
}

#[tokio::test]
async fn remote_error_falls_back_to_agent_defaults() {
    let backend = ScriptedBackend::new(Mode::Online);
    let mut panel = panel_with(backend);
    let mut events = panel.subscribe();

    let outcome = panel.open("butler").await;

    assert_eq!(
        outcome,
        LoadOutcome::DefaultsAfterRemoteError {
            error: "agent butler not found".to_owned()
        }
    );
    assert_eq!(panel.config().name, "Butler");
    assert_eq!(
        notice_messages(&mut events),
        vec![(
            NoticeLevel::Error,
            "Error loading configuration: agent butler not found".to_owned()
        )]
    );
}

#[tokio::test]
async fn stale_load_does_not_overwrite_newer_selection() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("butler").await;

    let first = panel.begin_load("butler");
    let second = panel.begin_load("butler");
    assert!(panel.is_loading());
    assert_eq!(panel.visible_tab(), None);

    assert_eq!(panel.finish_load(second, Ok(live_catm())), LoadOutcome::Remote);
    assert_eq!(
        panel.finish_load(first, Err(Error::Connectivity("late".to_owned()))),
        LoadOutcome::Stale
    );
    assert_eq!(panel.config().name, "CatM Live");
}

#[tokio::test]
async fn close_invalidates_in_flight_load() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("catm").await;

    let ticket = panel.begin_load("catm");
    panel.close();

    assert_eq!(panel.finish_load(ticket, Ok(live_catm())), LoadOutcome::Stale);
    assert!(!panel.is_visible());
    assert!(panel.active_agent().is_none());
    assert_eq!(panel.config().name, "CatM");
}

#[tokio::test]
async fn response_for_previous_agent_is_discarded() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("catm").await;

    let ticket = panel.begin_load("catm");
    panel.open("butler").await;

    assert_eq!(panel.finish_load(ticket, Ok(live_catm())), LoadOutcome::Stale);
    assert_eq!(panel.config().name, "Butler");
}

#[tokio::test]
async fn loading_another_agent_switches_the_open_panel() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(Arc::clone(&backend));
    panel.open("wally").await;

    let outcome = panel.load("butler").await;

    assert!(matches!(outcome, LoadOutcome::DefaultsAfterConnectivityError { .. }));
    assert_eq!(panel.active_agent(), Some("butler"));
    assert_eq!(panel.config().name, "Butler");
    assert!(!panel.is_loading());
    assert_eq!(panel.visible_tab(), Some(ConfigTab::General));
}

#[tokio::test]
async fn mismatched_pending_ticket_clears_loading() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("wally").await;

    let ticket = panel.begin_load("butler");
    assert_eq!(panel.visible_tab(), None);

    assert_eq!(panel.finish_load(ticket, Ok(live_catm())), LoadOutcome::Stale);
    assert!(!panel.is_loading());
    assert_eq!(panel.visible_tab(), Some(ConfigTab::General));
    assert_eq!(panel.config().name, "Wally");
}

#[tokio::test]
async fn capability_edits_are_idempotent() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("butler").await;
    let before = panel.capabilities().len();

    assert!(panel.add_capability("Cost Analysis"));
    assert!(!panel.add_capability("Cost Analysis"));
    assert!(!panel.add_capability("  "));
    assert_eq!(panel.capabilities().len(), before + 1);
    assert_eq!(
        panel
            .capabilities()
            .iter()
            .filter(|cap| cap.as_str() == "Cost Analysis")
            .count(),
        1
    );

    let snapshot = panel.capabilities().to_vec();
    assert!(!panel.remove_capability("X"));
    assert_eq!(panel.capabilities(), snapshot.as_slice());
}

#[tokio::test]
async fn offline_url_add_keeps_local_source_with_demo_notice() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("butler").await;
    let mut events = panel.subscribe();

    let change = panel
        .add_knowledge_url("Spec", "https://example.com")
        .await
        .expect("change");

    assert!(change.outcome.is_local_only());
    let source = change.source.expect("local source");
    assert_eq!(panel.knowledge_sources(), std::slice::from_ref(&source));
    assert_eq!(source.type_label(), "url");
    assert!(source.id.parse::<i64>().is_ok());
    assert_eq!(
        notice_messages(&mut events),
        vec![(NoticeLevel::Warning, "URL added (demo mode)".to_owned())]
    );
}

#[tokio::test]
async fn url_add_uses_server_id_when_online() {
    let backend = ScriptedBackend::new(Mode::Online);
    let mut panel = panel_with(Arc::clone(&backend));
    panel.open("wally").await;
    let existing = panel.knowledge_sources().len();

    let change = panel
        .add_knowledge_url(" Docs ", " http://a ")
        .await
        .expect("change");

    assert_eq!(change.outcome, SyncOutcome::Saved);
    assert_eq!(change.source.expect("source").id, "srv-1");
    assert_eq!(panel.knowledge_sources().len(), existing + 1);
    assert!(backend.calls().contains(&"add-url wally Docs http://a".to_owned()));
}

#[tokio::test]
async fn rejected_url_add_appends_nothing() {
    let backend = ScriptedBackend::new(Mode::Rejecting);
    let mut panel = panel_with(backend);
    panel.open("butler").await;
    let mut events = panel.subscribe();

    let change = panel
        .add_knowledge_url("Docs", "http://a")
        .await
        .expect("change");

    assert!(change.source.is_none());
    assert!(panel.knowledge_sources().is_empty());
    assert_eq!(
        notice_messages(&mut events),
        vec![(
            NoticeLevel::Error,
            "Error adding URL: permission denied".to_owned()
        )]
    );
}

#[tokio::test]
async fn url_add_requires_name_and_url() {
    let backend = ScriptedBackend::new(Mode::Online);
    let mut panel = panel_with(Arc::clone(&backend));
    panel.open("butler").await;

    let error = panel
        .add_knowledge_url("Docs", "   ")
        .await
        .expect_err("missing url");

    assert!(matches!(error, Error::Validation(_)));
    assert!(panel.knowledge_sources().is_empty());
    assert_eq!(backend.calls(), vec!["fetch butler".to_owned()]);
}

#[tokio::test]
async fn added_then_removed_source_leaves_list_empty() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("butler").await;
    assert!(panel.knowledge_sources().is_empty());

    let change = panel
        .add_knowledge_url("Docs", "http://a")
        .await
        .expect("change");
    let id = change.source.expect("source").id;

    let outcome = panel
        .remove_knowledge_source(&id, &YES)
        .await
        .expect("removal");

    assert!(matches!(
        outcome,
        RemoveOutcome::Removed { backend: SyncOutcome::SavedLocallyOnly { .. }, .. }
    ));
    assert!(panel.knowledge_sources().is_empty());
}

#[tokio::test]
async fn removal_failure_is_not_surfaced_as_notice() {
    let backend = ScriptedBackend::new(Mode::Rejecting);
    let mut panel = panel_with(backend);
    panel.open("wally").await;
    let mut events = panel.subscribe();

    let outcome = panel
        .remove_knowledge_source("1", &YES)
        .await
        .expect("removal");

    assert!(matches!(
        outcome,
        RemoveOutcome::Removed { backend: SyncOutcome::Failed { .. }, .. }
    ));
    assert!(panel.config().find_source("1").is_none());
    assert_eq!(
        notice_messages(&mut events),
        vec![(NoticeLevel::Success, "Knowledge source removed".to_owned())]
    );
}

#[tokio::test]
async fn declined_removal_keeps_source() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(Arc::clone(&backend));
    panel.open("wally").await;

    let asked = Mutex::new(Vec::new());
    let confirm = |question: &str| {
        asked.lock().expect("asked lock").push(question.to_owned());
        false
    };
    let outcome = panel
        .remove_knowledge_source("1", &confirm)
        .await
        .expect("removal");

    assert_eq!(outcome, RemoveOutcome::Cancelled);
    assert_eq!(panel.knowledge_sources().len(), 2);
    assert_eq!(
        asked.lock().expect("asked lock").as_slice(),
        &["Are you sure you want to remove this knowledge source?".to_owned()]
    );
    assert!(!backend.calls().iter().any(|call| call.starts_with("remove")));
}

#[tokio::test]
async fn upload_offline_appends_local_documents() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("catm").await;
    let mut events = panel.subscribe();

    let changes = panel
        .upload_knowledge_files(
            vec![
                FileUpload::new("a.pdf", vec![0; 1024 * 1024]),
                FileUpload::new("b.pdf", vec![0; 10]),
            ],
            None,
        )
        .await
        .expect("uploads");

    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|change| change.outcome.is_local_only()));
    let sources = panel.knowledge_sources();
    assert_eq!(sources.len(), 2);
    assert_ne!(sources[0].id, sources[1].id);
    assert_eq!(sources[0].name, "a.pdf");
    assert_eq!(sources[0].detail(), "1.00 MB");
    assert_eq!(
        notice_messages(&mut events)
            .into_iter()
            .map(|(_, message)| message)
            .collect::<Vec<_>>(),
        vec![
            "File \"a.pdf\" uploaded (demo mode)".to_owned(),
            "File \"b.pdf\" uploaded (demo mode)".to_owned()
        ]
    );
}

#[tokio::test]
async fn upload_online_uses_display_name_and_server_id() {
    let backend = ScriptedBackend::new(Mode::Online);
    let mut panel = panel_with(Arc::clone(&backend));
    panel.open("butler").await;

    let change = panel
        .upload_knowledge_file(FileUpload::new("terms.txt", b"net 30".to_vec()), Some("Supplier Terms"))
        .await
        .expect("upload");

    let source = change.source.expect("source");
    assert_eq!(source.id, "srv-1");
    assert_eq!(source.name, "Supplier Terms");
    assert!(backend
        .calls()
        .contains(&"upload butler terms.txt as Supplier Terms".to_owned()));
}

#[tokio::test]
async fn empty_upload_selection_is_rejected() {
    let backend = ScriptedBackend::new(Mode::Online);
    let mut panel = panel_with(backend);
    panel.open("butler").await;
    let mut events = panel.subscribe();

    let error = panel
        .upload_knowledge_files(Vec::new(), None)
        .await
        .expect_err("nothing selected");

    assert!(matches!(error, Error::Validation(_)));
    assert_eq!(
        notice_messages(&mut events),
        vec![(NoticeLevel::Error, "Please select files to upload".to_owned())]
    );
}

#[tokio::test]
async fn saves_report_where_the_change_landed() {
    let backend = ScriptedBackend::new(Mode::Online);
    let mut panel = panel_with(Arc::clone(&backend));
    panel.open("catm").await;
    panel.set_prompt("Be concise.");
    panel.set_max_tokens(1024);

    assert_eq!(panel.save_prompt().await.expect("save"), SyncOutcome::Saved);
    assert!(backend
        .calls()
        .contains(&r#"update catm {"prompt":"Be concise."}"#.to_owned()));

    backend.set_mode(Mode::Offline);
    let mut events = panel.subscribe();
    let offline = panel.save_model_settings().await.expect("save");
    assert!(offline.is_local_only());
    assert_eq!(
        notice_messages(&mut events),
        vec![(NoticeLevel::Warning, "Model settings saved (demo mode)".to_owned())]
    );

    backend.set_mode(Mode::Rejecting);
    let rejected = panel.save_all_settings().await.expect("save");
    assert_eq!(
        rejected,
        SyncOutcome::Failed {
            reason: "permission denied".to_owned()
        }
    );
    assert_eq!(
        notice_messages(&mut events),
        vec![(
            NoticeLevel::Error,
            "Error saving settings: permission denied".to_owned()
        )]
    );
}

#[tokio::test]
async fn save_without_open_agent_is_an_error() {
    let backend = ScriptedBackend::new(Mode::Online);
    let mut panel = panel_with(backend);

    let error = panel.save_prompt().await.expect_err("no agent");
    assert!(error.to_string().contains("no agent is open"));
}

#[tokio::test]
async fn refresh_reports_backend_outcome() {
    let backend = ScriptedBackend::new(Mode::Online);
    let mut panel = panel_with(Arc::clone(&backend));
    panel.open("wally").await;

    assert_eq!(panel.refresh_knowledge_source("2").await, Some(SyncOutcome::Saved));
    assert!(backend
        .calls()
        .contains(&"refresh https://procurement-best-practices.com".to_owned()));

    backend.set_mode(Mode::Offline);
    let mut events = panel.subscribe();
    assert!(matches!(
        panel.refresh_knowledge_source("2").await,
        Some(SyncOutcome::Failed { .. })
    ));
    let notices = notice_messages(&mut events);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, NoticeLevel::Error);
    assert!(notices[0].1.starts_with("Error refreshing knowledge source:"));

    backend.set_mode(Mode::Rejecting);
    let mut events = panel.subscribe();
    assert_eq!(
        panel.refresh_knowledge_source("2").await,
        Some(SyncOutcome::Failed {
            reason: "permission denied".to_owned()
        })
    );
    assert_eq!(
        notice_messages(&mut events),
        vec![(
            NoticeLevel::Error,
            "Error refreshing knowledge source: permission denied".to_owned()
        )]
    );

    backend.set_mode(Mode::Online);
    // Documents are not re-fetched.
    assert_eq!(panel.refresh_knowledge_source("1").await, Some(SyncOutcome::Saved));
    assert_eq!(panel.refresh_knowledge_source("missing").await, None);
}

#[tokio::test]
async fn reset_agent_discards_edits_after_confirmation() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("catm").await;
    panel.set_name("Renamed");
    panel.add_capability("Cost Analysis");

    assert!(!panel.reset_agent(&NO).expect("reset"));
    assert_eq!(panel.config().name, "Renamed");

    assert!(panel.reset_agent(&YES).expect("reset"));
    assert_eq!(panel.config().name, "CatM");
    assert!(!panel.capabilities().iter().any(|cap| cap == "Cost Analysis"));
}

#[tokio::test]
async fn reset_prompt_only_touches_the_prompt() {
    let backend = ScriptedBackend::with_config(Mode::Online, live_catm());
    let mut panel = panel_with(backend);
    panel.open("catm").await;
    panel.set_prompt("edited");

    assert!(panel.reset_prompt(&YES).expect("reset"));
    assert!(panel.config().prompt.starts_with("You are CatM,"));
    assert_eq!(panel.config().name, "CatM Live");

    let preview = panel.preview_prompt();
    assert_eq!(preview.title, "System Prompt Preview");
    assert!(preview.to_string().contains("You are CatM,"));
}

#[tokio::test]
async fn current_notice_tracks_latest_message() {
    let backend = ScriptedBackend::new(Mode::Offline);
    let mut panel = panel_with(backend);
    panel.open("butler").await;
    panel.add_capability("Sourcing");

    let notice = panel.current_notice().expect("notice visible");
    assert_eq!(notice.message, "Capability added successfully");
    assert_eq!(notice.dismiss_after, Duration::from_secs(5));
}

#[test]
fn tabs_parse_from_names() {
    assert_eq!("Knowledge".parse::<ConfigTab>().expect("tab"), ConfigTab::Knowledge);
    assert!("advanced".parse::<ConfigTab>().is_err());
}
