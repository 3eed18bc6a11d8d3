use std::sync::Arc;

use tracing::{info, warn};

use crate::access::{AccessControl, Identity, REJECTION_MESSAGE};
use crate::bot::command::CallbackAction;
use crate::bot::session::{Session, SessionState, SessionStore};
use crate::settings::{SettingKey, SettingsStore};
use crate::socialdata::{Monitor, MonitorParams, MonitorRegistry, MonitorType, RegistryError};

/// A button on an inline keyboard, carrying its typed action.
#[derive(Debug, Clone)]
pub struct Button {
    pub label: String,
    pub action: CallbackAction,
}

fn button(label: &str, action: CallbackAction) -> Button {
    Button {
        label: label.to_string(),
        action,
    }
}

/// A destination-agnostic reply. The transport layer renders the markup
/// mode and the keyboard.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub html: bool,
    pub keyboard: Option<Vec<Vec<Button>>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: false,
            keyboard: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.keyboard = Some(rows);
        self
    }
}

/// Per-chat finite state machine driving monitor lifecycle operations.
///
/// Every entry point checks the allow-list before touching any state and
/// holds the chat's session guard across the whole transition, so inputs
/// for one chat are handled strictly one at a time.
pub struct ConversationEngine {
    registry: Arc<dyn MonitorRegistry>,
    sessions: SessionStore,
    settings: Arc<SettingsStore>,
    access: AccessControl,
}

impl ConversationEngine {
    pub fn new(registry: Arc<dyn MonitorRegistry>, settings: Arc<SettingsStore>) -> Self {
        Self {
            registry,
            sessions: SessionStore::new(),
            settings: settings.clone(),
            access: AccessControl::new(settings),
        }
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle a plain text message. Commands always discard pending work.
    pub async fn handle_text(&self, chat_id: i64, who: &Identity, text: &str) -> Vec<Reply> {
        if !self.access.is_allowed(who) {
            warn!("Rejected message from @{}", who.username);
            return vec![Reply::text(REJECTION_MESSAGE)];
        }

        let _guard = self.sessions.acquire(chat_id).await;

        if text.starts_with('/') {
            // A new command always wins over an unfinished conversation.
            self.sessions.clear(chat_id);
            return self.handle_command(text);
        }

        let Some(session) = self.sessions.take(chat_id) else {
            return vec![];
        };

        match session.state {
            SessionState::AwaitingMonitorTypeSelection
            | SessionState::AwaitingDuplicateResolution { .. } => {
                // These steps resolve by button press only.
                self.sessions.put(chat_id, session);
                vec![Reply::text("Please use the buttons above.")]
            }
            SessionState::AwaitingHandleInput { monitor_type } => {
                self.create_monitor_flow(chat_id, monitor_type, text.trim())
                    .await
            }
            SessionState::AwaitingStopHandleInput => self.stop_monitor_flow(text.trim()).await,
            SessionState::AwaitingDetailsId => self.details_flow(text.trim()).await,
            SessionState::AwaitingSettingValue { key } => self.apply_setting(key, text).await,
        }
    }

    /// Handle an inline keyboard press.
    pub async fn handle_callback(&self, chat_id: i64, who: &Identity, data: &str) -> Vec<Reply> {
        if !self.access.is_allowed(who) {
            warn!("Rejected callback from @{}", who.username);
            return vec![Reply::text(REJECTION_MESSAGE)];
        }

        let _guard = self.sessions.acquire(chat_id).await;

        let Some(action) = CallbackAction::parse(data) else {
            return vec![Reply::text("❓ Unknown command.")];
        };

        info!("Callback from @{}: {:?}", who.username, action);

        match action {
            CallbackAction::StartMonitor => {
                self.sessions.put(
                    chat_id,
                    Session::new(SessionState::AwaitingMonitorTypeSelection),
                );
                vec![Reply::text("🔎 Choose the type of monitor to start:")
                    .with_keyboard(vec![
                        vec![
                            button(
                                "User Tweets Monitor",
                                CallbackAction::StartMonitorType(MonitorType::UserTweets),
                            ),
                            button(
                                "User Following Monitor",
                                CallbackAction::StartMonitorType(MonitorType::UserFollowing),
                            ),
                        ],
                        vec![button(
                            "User Profile Monitor",
                            CallbackAction::StartMonitorType(MonitorType::UserProfile),
                        )],
                    ])]
            }
            CallbackAction::StartMonitorType(monitor_type) => {
                self.sessions.put(
                    chat_id,
                    Session::new(SessionState::AwaitingHandleInput { monitor_type }),
                );
                vec![Reply::text(
                    "✍️ Please provide the Twitter handle (without @) for monitoring:",
                )]
            }
            CallbackAction::StopMonitor => {
                self.sessions
                    .put(chat_id, Session::new(SessionState::AwaitingStopHandleInput));
                vec![Reply::text(
                    "🛑 Please provide the Twitter handle (without @) to stop its monitor:",
                )]
            }
            CallbackAction::ListMonitors => self.list_flow().await,
            CallbackAction::MonitorDetails => {
                self.sessions
                    .put(chat_id, Session::new(SessionState::AwaitingDetailsId));
                vec![Reply::text(
                    "🔍 Please provide the Monitor ID to view details:",
                )]
            }
            CallbackAction::ViewMonitor(handle) => {
                self.sessions.clear(chat_id);
                self.view_monitor_flow(&handle).await
            }
            CallbackAction::DeleteMonitor(handle) => {
                self.sessions.clear(chat_id);
                self.delete_monitor_flow(&handle).await
            }
            CallbackAction::SettingsMenu => {
                let rows = SettingKey::ALL
                    .iter()
                    .map(|key| vec![button(key.label(), CallbackAction::UpdateSetting(*key))])
                    .collect();
                vec![Reply::text("⚙️ Choose a setting to update:").with_keyboard(rows)]
            }
            CallbackAction::UpdateSetting(key) => {
                self.sessions
                    .put(chat_id, Session::new(SessionState::AwaitingSettingValue { key }));
                let current = self.settings.get(key);
                let current = if current.is_empty() {
                    "(not set)".to_string()
                } else {
                    current
                };
                vec![Reply::text(format!(
                    "✏️ Please provide the new value for {} (current: {}):",
                    key.label(),
                    current
                ))]
            }
        }
    }

    fn handle_command(&self, text: &str) -> Vec<Reply> {
        match text {
            "/start" => vec![Reply::text(
                "👋 Welcome to Twitter Monitor Bot!\nUse the inline buttons below to manage monitors.",
            )
            .with_keyboard(vec![
                vec![
                    button("➕ Start Monitor", CallbackAction::StartMonitor),
                    button("🛑 Stop Monitor", CallbackAction::StopMonitor),
                ],
                vec![
                    button("📃 List Monitors", CallbackAction::ListMonitors),
                    button("🔍 Monitor Details", CallbackAction::MonitorDetails),
                ],
                vec![button("⚙️ Settings", CallbackAction::SettingsMenu)],
            ])],
            _ => vec![],
        }
    }

    async fn create_monitor_flow(
        &self,
        chat_id: i64,
        monitor_type: MonitorType,
        handle: &str,
    ) -> Vec<Reply> {
        let params = MonitorParams {
            user_screen_name: handle.to_string(),
            webhook_url: None,
        };

        match self.registry.create_monitor(monitor_type, params).await {
            Ok(monitor) => {
                info!("Created {} monitor {} for @{}", monitor_type, monitor.id, handle);
                vec![Reply::html(format!(
                    "✅ Monitor created successfully!\nMonitor ID: <code>{}</code>",
                    monitor.id
                ))]
            }
            Err(RegistryError::Duplicate { .. }) => {
                let lower = handle.to_lowercase();
                self.sessions.put(
                    chat_id,
                    Session::new(SessionState::AwaitingDuplicateResolution {
                        handle: lower.clone(),
                    }),
                );
                vec![Reply::html(format!(
                    "⚠️ A monitor for @{} already exists. Would you like to view its details or delete it?",
                    handle
                ))
                .with_keyboard(vec![vec![
                    button("View Monitor", CallbackAction::ViewMonitor(lower.clone())),
                    button("Delete Monitor", CallbackAction::DeleteMonitor(lower)),
                ]])]
            }
            Err(e) => vec![Reply::text(format!("⚠️ Failed to create monitor: {}", e))],
        }
    }

    async fn stop_monitor_flow(&self, handle: &str) -> Vec<Reply> {
        match self.find_by_handle(handle).await {
            Ok(Some(monitor)) => self.delete_and_confirm(&monitor).await,
            Ok(None) => vec![Reply::text(format!("⚠️ No monitor found for @{}", handle))],
            Err(e) => vec![Reply::text(format!("⚠️ An error occurred: {}", e))],
        }
    }

    async fn view_monitor_flow(&self, handle: &str) -> Vec<Reply> {
        match self.find_by_handle(handle).await {
            Ok(Some(monitor)) => vec![details_reply(&monitor)],
            Ok(None) => vec![Reply::text(format!("⚠️ No monitor found for @{}", handle))],
            Err(e) => vec![Reply::text(format!("⚠️ An error occurred: {}", e))],
        }
    }

    async fn delete_monitor_flow(&self, handle: &str) -> Vec<Reply> {
        match self.find_by_handle(handle).await {
            Ok(Some(monitor)) => self.delete_and_confirm(&monitor).await,
            Ok(None) => vec![Reply::text(format!("⚠️ No monitor found for @{}", handle))],
            Err(e) => vec![Reply::text(format!("⚠️ An error occurred: {}", e))],
        }
    }

    async fn details_flow(&self, id: &str) -> Vec<Reply> {
        match self.registry.get_monitor(id).await {
            Ok(monitor) => vec![details_reply(&monitor)],
            Err(RegistryError::NotFound) => vec![Reply::text(
                "⚠️ Could not retrieve monitor details. Please check the Monitor ID and try again.",
            )],
            Err(e) => vec![Reply::text(format!("⚠️ An error occurred: {}", e))],
        }
    }

    async fn list_flow(&self) -> Vec<Reply> {
        match self.registry.list_monitors(1).await {
            Ok(monitors) => {
                let mut msg = String::from("<b>📃 Active Monitors:</b>\n");
                if monitors.is_empty() {
                    msg.push_str("No active monitors found.");
                } else {
                    for monitor in &monitors {
                        let handle = monitor.handle().unwrap_or("N/A");
                        msg.push_str(&format!(
                            "• Twitter: <a href=\"https://twitter.com/{}\">@{}</a> - Type: {} - Created: {}\n",
                            handle,
                            handle,
                            monitor.monitor_type,
                            monitor.created_at.as_deref().unwrap_or("unknown"),
                        ));
                    }
                }
                vec![Reply::html(msg)]
            }
            Err(e) => vec![Reply::text(format!("⚠️ An error occurred: {}", e))],
        }
    }

    async fn apply_setting(&self, key: SettingKey, raw: &str) -> Vec<Reply> {
        self.settings.set(key, raw);
        info!("Setting {} updated", key.token());

        let mut replies = vec![Reply::text(format!("✅ {} updated.", key.label()))];

        // The global webhook must also be re-registered upstream.
        if key == SettingKey::WebhookUrl {
            let url = self.settings.webhook_url();
            if let Err(e) = self.registry.set_global_webhook(&url).await {
                replies.push(Reply::text(format!(
                    "⚠️ Failed to register the webhook upstream: {}",
                    e
                )));
            }
        }

        replies
    }

    /// Case-insensitive lookup of an active monitor by target handle.
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Monitor>, RegistryError> {
        let monitors = self.registry.list_monitors(1).await?;
        Ok(monitors.into_iter().find(|m| m.matches_handle(handle)))
    }

    async fn delete_and_confirm(&self, monitor: &Monitor) -> Vec<Reply> {
        match self.registry.delete_monitor(&monitor.id).await {
            Ok(()) => {
                info!("Deleted monitor {}", monitor.id);
                vec![Reply::html(format!(
                    "✅ Monitor for @{} (ID: <code>{}</code>) has been deleted.",
                    monitor.handle().unwrap_or("unknown"),
                    monitor.id
                ))]
            }
            Err(e) => vec![Reply::text(format!("⚠️ An error occurred: {}", e))],
        }
    }
}

fn details_reply(monitor: &Monitor) -> Reply {
    let mut msg = String::from("🔍 <b>Monitor Details:</b>\n");
    if let Some(handle) = monitor.handle() {
        msg.push_str(&format!(
            "Twitter: <a href=\"https://twitter.com/{}\">@{}</a>\n",
            handle, handle
        ));
    }
    msg.push_str(&format!("Type: {}\n", monitor.monitor_type));
    msg.push_str(&format!(
        "Created At: {}\n",
        monitor.created_at.as_deref().unwrap_or("unknown")
    ));
    msg.push_str(&format!("Monitor ID: <code>{}</code>\n", monitor.id));
    Reply::html(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ServerConfig, SocialDataConfig, TelegramConfig, WebhookConfig};
    use crate::socialdata::MonitorParameters;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeRegistry {
        monitors: Mutex<Vec<Monitor>>,
        deleted: Mutex<Vec<String>>,
        webhook: Mutex<Option<String>>,
        create_error: Mutex<Option<String>>,
        next_id: Mutex<u32>,
    }

    impl FakeRegistry {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                monitors: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
                webhook: Mutex::new(None),
                create_error: Mutex::new(None),
                next_id: Mutex::new(1),
            })
        }

        fn seed(&self, id: &str, handle: &str, monitor_type: MonitorType) {
            self.monitors.lock().unwrap().push(Monitor {
                id: id.to_string(),
                monitor_type,
                parameters: MonitorParameters {
                    user_screen_name: Some(handle.to_string()),
                    webhook_url: None,
                },
                created_at: Some("2025-01-01T00:00:00Z".to_string()),
            });
        }

        fn fail_create_with(&self, message: &str) {
            *self.create_error.lock().unwrap() = Some(message.to_string());
        }
    }

    #[async_trait]
    impl MonitorRegistry for FakeRegistry {
        async fn create_monitor(
            &self,
            monitor_type: MonitorType,
            params: MonitorParams,
        ) -> Result<Monitor, RegistryError> {
            if let Some(message) = self.create_error.lock().unwrap().take() {
                return Err(RegistryError::Api(message));
            }

            let mut monitors = self.monitors.lock().unwrap();
            if monitors
                .iter()
                .any(|m| m.matches_handle(&params.user_screen_name))
            {
                return Err(RegistryError::Duplicate {
                    message: "Monitor for this user already exists".to_string(),
                });
            }

            let mut next_id = self.next_id.lock().unwrap();
            let monitor = Monitor {
                id: format!("mon-{}", *next_id),
                monitor_type,
                parameters: MonitorParameters {
                    user_screen_name: Some(params.user_screen_name),
                    webhook_url: params.webhook_url,
                },
                created_at: Some("2025-01-01T00:00:00Z".to_string()),
            };
            *next_id += 1;
            monitors.push(monitor.clone());
            Ok(monitor)
        }

        async fn delete_monitor(&self, id: &str) -> Result<(), RegistryError> {
            let mut monitors = self.monitors.lock().unwrap();
            let before = monitors.len();
            monitors.retain(|m| m.id != id);
            if monitors.len() == before {
                return Err(RegistryError::NotFound);
            }
            self.deleted.lock().unwrap().push(id.to_string());
            Ok(())
        }

        async fn get_monitor(&self, id: &str) -> Result<Monitor, RegistryError> {
            self.monitors
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or(RegistryError::NotFound)
        }

        async fn list_monitors(&self, _page: u32) -> Result<Vec<Monitor>, RegistryError> {
            Ok(self.monitors.lock().unwrap().clone())
        }

        async fn set_global_webhook(&self, url: &str) -> Result<(), RegistryError> {
            *self.webhook.lock().unwrap() = Some(url.to_string());
            Ok(())
        }
    }

    fn make_settings() -> Arc<SettingsStore> {
        Arc::new(SettingsStore::from_config(&Config {
            telegram: TelegramConfig {
                bot_token: "t".to_string(),
                chat_id: "100".to_string(),
                allowed_usernames: vec!["alice".to_string()],
            },
            discord: None,
            socialdata: SocialDataConfig {
                api_key: "k".to_string(),
                base_url: String::new(),
            },
            server: ServerConfig { port: 3000 },
            webhook: WebhookConfig::default(),
        }))
    }

    fn make_engine(registry: Arc<FakeRegistry>) -> ConversationEngine {
        ConversationEngine::new(registry, make_settings())
    }

    fn alice() -> Identity {
        Identity::new("alice")
    }

    const CHAT: i64 = 1;

    async fn walk_to_handle_input(engine: &ConversationEngine) {
        engine.handle_callback(CHAT, &alice(), "start_monitor").await;
        engine
            .handle_callback(CHAT, &alice(), "start_monitor_user_tweets")
            .await;
    }

    #[tokio::test]
    async fn test_unauthorized_user_is_rejected_without_state_change() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());
        let mallory = Identity::new("mallory");

        let replies = engine.handle_callback(CHAT, &mallory, "start_monitor").await;
        assert_eq!(replies[0].text, REJECTION_MESSAGE);
        assert!(engine.sessions().get(CHAT).is_none());

        let replies = engine.handle_text(CHAT, &mallory, "anything").await;
        assert_eq!(replies[0].text, REJECTION_MESSAGE);
        assert!(registry.monitors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_flow_creates_monitor_and_clears_session() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());

        walk_to_handle_input(&engine).await;
        assert_eq!(
            engine.sessions().get(CHAT).unwrap().state,
            SessionState::AwaitingHandleInput {
                monitor_type: MonitorType::UserTweets
            }
        );

        let replies = engine.handle_text(CHAT, &alice(), "carol").await;
        assert!(replies[0].text.contains("mon-1"));
        assert!(engine.sessions().get(CHAT).is_none());
        assert_eq!(registry.monitors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_offers_view_and_delete_for_lowercased_handle() {
        let registry = FakeRegistry::new();
        registry.seed("m-7", "Bob", MonitorType::UserTweets);
        let engine = make_engine(registry.clone());

        walk_to_handle_input(&engine).await;
        let replies = engine.handle_text(CHAT, &alice(), "Bob").await;

        assert!(replies[0].text.contains("already exists"));
        let keyboard = replies[0].keyboard.as_ref().unwrap();
        let buttons: Vec<&Button> = keyboard.iter().flatten().collect();
        assert_eq!(buttons.len(), 2);
        assert_eq!(
            buttons[0].action,
            CallbackAction::ViewMonitor("bob".to_string())
        );
        assert_eq!(
            buttons[1].action,
            CallbackAction::DeleteMonitor("bob".to_string())
        );

        // The original handle stays retrievable through the pending session.
        assert_eq!(
            engine.sessions().get(CHAT).unwrap().state,
            SessionState::AwaitingDuplicateResolution {
                handle: "bob".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_resolution_ignores_free_text() {
        let registry = FakeRegistry::new();
        registry.seed("m-7", "Bob", MonitorType::UserTweets);
        let engine = make_engine(registry.clone());

        walk_to_handle_input(&engine).await;
        engine.handle_text(CHAT, &alice(), "Bob").await;

        let replies = engine.handle_text(CHAT, &alice(), "what now?").await;
        assert_eq!(replies[0].text, "Please use the buttons above.");
        assert_eq!(
            engine.sessions().get(CHAT).unwrap().state,
            SessionState::AwaitingDuplicateResolution {
                handle: "bob".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_delete_resolution_removes_monitor() {
        let registry = FakeRegistry::new();
        registry.seed("m-7", "Bob", MonitorType::UserTweets);
        let engine = make_engine(registry.clone());

        walk_to_handle_input(&engine).await;
        engine.handle_text(CHAT, &alice(), "Bob").await;

        let replies = engine
            .handle_callback(CHAT, &alice(), "delete_monitor_bob")
            .await;
        assert!(replies[0].text.contains("has been deleted"));
        assert!(replies[0].text.contains("m-7"));
        assert_eq!(*registry.deleted.lock().unwrap(), vec!["m-7".to_string()]);
        assert!(engine.sessions().get(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_create_failure_reported_verbatim_and_session_cleared() {
        let registry = FakeRegistry::new();
        registry.fail_create_with("API rate limit exceeded");
        let engine = make_engine(registry.clone());

        walk_to_handle_input(&engine).await;
        let replies = engine.handle_text(CHAT, &alice(), "carol").await;

        assert!(replies[0].text.contains("API rate limit exceeded"));
        assert!(engine.sessions().get(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_stop_matches_handle_case_insensitively() {
        let registry = FakeRegistry::new();
        registry.seed("m-3", "ElonMusk", MonitorType::UserTweets);
        let engine = make_engine(registry.clone());

        engine.handle_callback(CHAT, &alice(), "stop_monitor").await;
        let replies = engine.handle_text(CHAT, &alice(), "elonmusk").await;

        assert!(replies[0].text.contains("m-3"));
        assert!(replies[0].text.contains("@ElonMusk"));
        assert_eq!(*registry.deleted.lock().unwrap(), vec!["m-3".to_string()]);
        assert!(engine.sessions().get(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_stop_unknown_handle_reports_not_found() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());

        engine.handle_callback(CHAT, &alice(), "stop_monitor").await;
        let replies = engine.handle_text(CHAT, &alice(), "nobody").await;

        assert!(replies[0].text.contains("No monitor found for @nobody"));
        assert!(engine.sessions().get(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_details_matches_id_exactly() {
        let registry = FakeRegistry::new();
        registry.seed("m-AbC", "alice", MonitorType::UserProfile);
        let engine = make_engine(registry.clone());

        engine
            .handle_callback(CHAT, &alice(), "monitor_details")
            .await;
        let replies = engine.handle_text(CHAT, &alice(), "m-AbC").await;
        assert!(replies[0].text.contains("m-AbC"));
        assert!(engine.sessions().get(CHAT).is_none());

        engine
            .handle_callback(CHAT, &alice(), "monitor_details")
            .await;
        let replies = engine.handle_text(CHAT, &alice(), "M-ABC").await;
        assert!(replies[0].text.contains("Could not retrieve monitor details"));
    }

    #[tokio::test]
    async fn test_empty_list_reports_no_active_monitors() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());

        let replies = engine.handle_callback(CHAT, &alice(), "list_monitors").await;
        assert!(replies[0].text.contains("No active monitors found."));
    }

    #[tokio::test]
    async fn test_command_discards_pending_session() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());

        engine.handle_callback(CHAT, &alice(), "stop_monitor").await;
        assert!(engine.sessions().get(CHAT).is_some());

        let replies = engine.handle_text(CHAT, &alice(), "/start").await;
        assert!(replies[0].text.contains("Welcome"));
        assert!(engine.sessions().get(CHAT).is_none());

        // Unknown commands discard the session too, silently.
        engine.handle_callback(CHAT, &alice(), "stop_monitor").await;
        let replies = engine.handle_text(CHAT, &alice(), "/whatever").await;
        assert!(replies.is_empty());
        assert!(engine.sessions().get(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_view_monitor_callback_shows_details() {
        let registry = FakeRegistry::new();
        registry.seed("m-9", "Bob", MonitorType::UserFollowing);
        let engine = make_engine(registry.clone());

        let replies = engine
            .handle_callback(CHAT, &alice(), "view_monitor_bob")
            .await;
        assert!(replies[0].text.contains("Monitor Details"));
        assert!(replies[0].text.contains("m-9"));
        assert!(engine.sessions().get(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_settings_flow_updates_allow_list() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());

        let replies = engine.handle_callback(CHAT, &alice(), "settings_menu").await;
        let keyboard = replies[0].keyboard.as_ref().unwrap();
        assert_eq!(keyboard.iter().flatten().count(), SettingKey::ALL.len());

        engine
            .handle_callback(CHAT, &alice(), "update_setting_allowed_users")
            .await;
        assert_eq!(
            engine.sessions().get(CHAT).unwrap().state,
            SessionState::AwaitingSettingValue {
                key: SettingKey::AllowedUsers
            }
        );

        let replies = engine.handle_text(CHAT, &alice(), "alice, bob").await;
        assert!(replies[0].text.contains("updated"));
        assert!(engine.sessions().get(CHAT).is_none());

        // The new allow-list takes effect immediately.
        let replies = engine
            .handle_callback(CHAT, &Identity::new("bob"), "list_monitors")
            .await;
        assert!(!replies[0].text.contains("not authorized"));
    }

    #[tokio::test]
    async fn test_webhook_setting_reregisters_upstream() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());

        engine
            .handle_callback(CHAT, &alice(), "update_setting_webhook_url")
            .await;
        engine
            .handle_text(CHAT, &alice(), "https://new.example/webhook")
            .await;

        assert_eq!(
            registry.webhook.lock().unwrap().as_deref(),
            Some("https://new.example/webhook")
        );
    }

    #[tokio::test]
    async fn test_unknown_callback_token() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());

        let replies = engine.handle_callback(CHAT, &alice(), "bogus_action").await;
        assert_eq!(replies[0].text, "❓ Unknown command.");
    }

    #[tokio::test]
    async fn test_new_command_replaces_pending_session() {
        let registry = FakeRegistry::new();
        let engine = make_engine(registry.clone());

        engine.handle_callback(CHAT, &alice(), "stop_monitor").await;
        engine
            .handle_callback(CHAT, &alice(), "monitor_details")
            .await;

        // The later command's state wins; the stop flow is gone.
        assert_eq!(
            engine.sessions().get(CHAT).unwrap().state,
            SessionState::AwaitingDetailsId
        );
    }
}
