//! AI Nexus Desktop: egui app state and UI.
//!
//! Network calls run on worker threads (one current-thread tokio runtime each) and report
//! back over mpsc channels that are polled every frame.

use eframe::egui;
use lib::api::{ApiError, ChatBackend, HistoryEntry, ModelCatalog};
use lib::bridge::DesktopBridge;
use lib::catalog::ModelKind;
use lib::config::{self, Config};
use lib::connectivity::{self, ConnectivityState};
use lib::controller::{Controller, Generation};
use lib::error::ChatRequestFailure;
use lib::session::{ChatOutcome, Message, Role};
use lib::settings::{InterfaceMode, KEY_INTERFACE_MODE, KEY_STREAMLIT_URL};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

const CHAT_INPUT_HEIGHT: f32 = 90.0;
const CHAT_MESSAGES_MIN_HEIGHT: f32 = 80.0;
const LOG_BUFFER_MAX_LINES: usize = 2000;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ring buffer of log lines for the Logs screen. Written by DesktopLogger.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        // reqwest/hyper internals are noise on the Logs screen
        metadata.level() <= log::Level::Info || metadata.target().starts_with("lib")
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("{} [{}] {}", clock_time(), record.level(), record.args());
        push_log_line(line);
    }

    fn flush(&self) {}
}

/// Wall-clock time of day (UTC) as HH:MM:SS.mmm.
fn clock_time() -> String {
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = t.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
        t.subsec_millis()
    )
}

static LOGGER: DesktopLogger = DesktopLogger;

/// Run `work` on its own thread inside a current-thread runtime; the result arrives on the receiver.
/// If the runtime cannot be built the sender is dropped and the receiver reports disconnection.
fn spawn_worker<T, F, Fut>(work: F) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T>,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("failed to start worker runtime: {}", e);
                return;
            }
        };
        let _ = tx.send(rt.block_on(work()));
    });
    rx
}

/// Outcome of polling a worker channel.
enum Poll<T> {
    Pending,
    Ready(T),
    Lost,
}

fn poll_receiver<T>(slot: &mut Option<mpsc::Receiver<T>>) -> Poll<T> {
    let Some(rx) = slot else {
        return Poll::Pending;
    };
    match rx.try_recv() {
        Ok(v) => {
            *slot = None;
            Poll::Ready(v)
        }
        Err(mpsc::TryRecvError::Empty) => Poll::Pending,
        Err(mpsc::TryRecvError::Disconnected) => {
            *slot = None;
            Poll::Lost
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Info,
    Chat,
    History,
    Settings,
    Logs,
}

impl Screen {
    const ALL: [(Screen, &'static str); 5] = [
        (Screen::Info, "Info"),
        (Screen::Chat, "Chat"),
        (Screen::History, "History"),
        (Screen::Settings, "Settings"),
        (Screen::Logs, "Logs"),
    ];

    fn for_mode(mode: InterfaceMode) -> Self {
        match mode {
            InterfaceMode::Chat => Screen::Chat,
            InterfaceMode::Streamlit | InterfaceMode::Landing => Screen::Info,
        }
    }
}

pub struct NexusApp {
    controller: Controller,
    bridge: DesktopBridge,
    /// Streamlit URL from config, used when no `streamlitUrl` setting is stored.
    default_streamlit_url: String,
    /// True once at least one probe has finished (so the header does not claim "Disconnected" before probing).
    probe_completed: bool,
    /// When Some, a health check is in flight. Results carry the backend generation they ran against.
    probe_receiver: Option<mpsc::Receiver<(Generation, ConnectivityState)>>,
    /// When Some, a model catalog fetch is in flight.
    models_receiver: Option<mpsc::Receiver<(Generation, Result<ModelCatalog, ApiError>)>>,
    /// When Some, a chat request is in flight.
    chat_receiver: Option<mpsc::Receiver<ChatOutcome>>,
    /// When Some, a history fetch is in flight.
    history_receiver: Option<mpsc::Receiver<(Generation, Result<Vec<HistoryEntry>, ApiError>)>>,
    /// When Some, a "Test connection" check from the Settings screen is in flight.
    server_check_receiver: Option<mpsc::Receiver<bool>>,
    /// Last non-fatal catalog fetch failure.
    models_notice: Option<String>,
    /// Last non-fatal history fetch failure.
    history_notice: Option<String>,
    /// Text field contents on the Settings screen.
    api_url_input: String,
    streamlit_url_input: String,
    /// Result line shown under the Settings form.
    settings_status: Option<(bool, String)>,
    current_screen: Screen,
}

impl NexusApp {
    /// Space between the main screen title and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 48.0;
    const LINE_SPACING: f32 = 6.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);

        let (config, config_path) = config::load_config(None).unwrap_or_else(|e| {
            log::error!("failed to load config, using defaults: {:#}", e);
            (Config::default(), config::default_config_path())
        });
        let controller = Controller::open(config.clone(), &config_path);
        let bridge = DesktopBridge::new(controller.settings().clone(), &config);
        let default_streamlit_url = config.desktop.streamlit_url.clone();
        let mode = controller.settings().interface_mode();
        log::info!("desktop started (interface mode: {})", mode.as_str());

        let mut app = Self {
            api_url_input: controller.api_url().to_string(),
            streamlit_url_input: controller.settings().streamlit_url(&default_streamlit_url),
            controller,
            bridge,
            default_streamlit_url,
            probe_completed: false,
            probe_receiver: None,
            models_receiver: None,
            chat_receiver: None,
            history_receiver: None,
            server_check_receiver: None,
            models_notice: None,
            history_notice: None,
            settings_status: None,
            current_screen: Screen::for_mode(mode),
        };
        app.start_probe();
        app
    }

    fn is_busy(&self) -> bool {
        self.probe_receiver.is_some()
            || self.models_receiver.is_some()
            || self.chat_receiver.is_some()
            || self.history_receiver.is_some()
            || self.server_check_receiver.is_some()
    }

    fn start_probe(&mut self) {
        if self.probe_receiver.is_some() {
            return;
        }
        let backend = self.controller.backend();
        let generation = self.controller.generation();
        let timeout = self.controller.monitor().timeout();
        self.probe_receiver = Some(spawn_worker(move || async move {
            (generation, connectivity::check(backend.as_ref(), timeout).await)
        }));
    }

    fn start_models_fetch(&mut self) {
        if self.models_receiver.is_some() {
            return;
        }
        let backend = self.controller.backend();
        let generation = self.controller.generation();
        self.models_receiver = Some(spawn_worker(move || async move {
            (generation, backend.models().await)
        }));
    }

    fn start_history_fetch(&mut self) {
        if self.history_receiver.is_some() {
            return;
        }
        let backend = self.controller.backend();
        let generation = self.controller.generation();
        self.history_receiver = Some(spawn_worker(move || async move {
            (generation, backend.history().await)
        }));
    }

    fn start_chat_turn(&mut self) {
        let Some(pending) = self.controller.begin_send_input() else {
            return;
        };
        let backend = self.controller.backend();
        self.chat_receiver = Some(spawn_worker(move || async move {
            pending.run(backend.as_ref()).await
        }));
    }

    /// Poll all worker channels. Call each frame.
    fn poll_workers(&mut self) {
        match poll_receiver(&mut self.probe_receiver) {
            Poll::Ready((generation, state)) => {
                self.probe_completed = true;
                if self.controller.apply_probe(generation, state) {
                    self.start_models_fetch();
                }
            }
            Poll::Lost => {
                self.probe_completed = true;
                let generation = self.controller.generation();
                self.controller
                    .apply_probe(generation, ConnectivityState::Disconnected);
            }
            Poll::Pending => {}
        }

        match poll_receiver(&mut self.models_receiver) {
            Poll::Ready((generation, result)) => {
                self.models_notice = self
                    .controller
                    .apply_models(generation, result)
                    .map(|f| f.to_string());
            }
            Poll::Lost => self.models_notice = Some("model fetch was interrupted".to_string()),
            Poll::Pending => {}
        }

        match poll_receiver(&mut self.chat_receiver) {
            Poll::Ready(outcome) => {
                self.controller.finish_send(outcome);
            }
            Poll::Lost => {
                if let Some(id) = self.controller.session().in_flight_id() {
                    self.controller.finish_send(ChatOutcome {
                        id,
                        result: Err(ChatRequestFailure(ApiError::Server(
                            "request worker stopped".to_string(),
                        ))),
                    });
                }
            }
            Poll::Pending => {}
        }

        match poll_receiver(&mut self.history_receiver) {
            Poll::Ready((generation, result)) => {
                self.history_notice = self
                    .controller
                    .apply_history(generation, result)
                    .map(|f| f.to_string());
            }
            Poll::Lost => self.history_notice = Some("history fetch was interrupted".to_string()),
            Poll::Pending => {}
        }

        match poll_receiver(&mut self.server_check_receiver) {
            Poll::Ready(ok) => {
                let text = if ok {
                    "Server is online."
                } else {
                    "Server did not respond as online."
                };
                self.settings_status = Some((ok, text.to_string()));
            }
            Poll::Lost => self.settings_status = Some((false, "Check was interrupted.".to_string())),
            Poll::Pending => {}
        }
    }

    fn status_color(&self) -> egui::Color32 {
        if !self.probe_completed {
            egui::Color32::GRAY
        } else if self.controller.connectivity().is_connected() {
            egui::Color32::from_rgb(0x2e, 0xa0, 0x43)
        } else {
            egui::Color32::from_rgb(0xd0, 0x3a, 0x3a)
        }
    }

    fn status_text(&self) -> &'static str {
        if self.probe_receiver.is_some() {
            "Checking…"
        } else if !self.probe_completed {
            "Not checked"
        } else {
            self.controller.connectivity().label()
        }
    }

    fn render_chat_message(ui: &mut egui::Ui, m: &Message) {
        let is_user = m.role == Role::User;
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| match m.role {
            Role::User => {
                ui.label(egui::RichText::new(&m.content).strong());
            }
            Role::Assistant => {
                ui.label(&m.content);
            }
            Role::Error => {
                ui.colored_label(egui::Color32::RED, &m.content);
            }
        });
    }

    /// Messages fill the space above; input and controls are fixed at the bottom.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        let connectivity = self.controller.connectivity();
        let can_send = self.controller.session().can_send(connectivity);

        let row_height = ui.spacing().interact_size.y + 8.0;
        let bottom_section_height =
            CHAT_INPUT_HEIGHT + 8.0 + row_height + Self::SCREEN_FOOTER_SPACING;
        let available = ui.available_height();
        let messages_height = (available - bottom_section_height).max(CHAT_MESSAGES_MIN_HEIGHT);

        let messages_rect = ui
            .allocate_exact_size(
                egui::vec2(ui.available_width(), messages_height),
                egui::Sense::hover(),
            )
            .0;
        let mut messages_ui = ui.child_ui(messages_rect, egui::Layout::top_down(egui::Align::Min));
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(&mut messages_ui, |ui| {
                let content_width = ui.available_width();
                ui.allocate_exact_size(egui::vec2(content_width, 0.0), egui::Sense::hover());
                let transcript = self.controller.session().transcript();
                if transcript.is_empty() {
                    ui.label("No messages yet.");
                }
                for m in transcript {
                    Self::render_chat_message(ui, m);
                    ui.add_space(8.0);
                }
                if self.controller.session().is_in_flight() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Waiting for the server…");
                    });
                }
            });

        ui.add_space(8.0);

        let text_response = ui.add_enabled_ui(can_send, |ui| {
            ui.add_sized(
                [ui.available_width(), CHAT_INPUT_HEIGHT],
                egui::TextEdit::multiline(self.controller.session_mut().input_mut())
                    .hint_text("Type a message (Ctrl+Enter to send)"),
            )
        });
        let response = text_response.inner;
        ui.add_space(8.0);

        let mut send_now = false;
        let mut new_session = false;
        ui.horizontal(|ui| {
            if ui.add_enabled(can_send, egui::Button::new("Send")).clicked() {
                send_now = true;
            }
            let can_reset = !self.controller.session().is_in_flight()
                && !self.controller.session().transcript().is_empty();
            if ui.add_enabled(can_reset, egui::Button::new("New chat")).clicked() {
                new_session = true;
            }
            if !connectivity.is_connected() {
                ui.label("Server is not connected. Use \"Check status\" to retry.");
            }
        });
        if can_send && response.has_focus() {
            let modifiers = ui.input(|i| i.modifiers);
            if (modifiers.command || modifiers.ctrl) && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send_now = true;
            }
        }
        if send_now {
            self.start_chat_turn();
        }
        if new_session {
            self.controller.reset_session();
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    /// Model checkboxes for the chat screen's right panel.
    fn ui_model_picker(&mut self, ui: &mut egui::Ui) {
        let catalog = self.controller.catalog().clone();
        let selection = self.controller.model_selection();
        if catalog.is_empty() {
            ui.label("No models loaded.");
            if let Some(ref notice) = self.models_notice {
                ui.add_space(Self::LINE_SPACING);
                ui.colored_label(egui::Color32::YELLOW, notice);
            }
            return;
        }
        let mut toggled: Option<(ModelKind, String)> = None;
        for (kind, title, ids) in [
            (ModelKind::Online, "Online", &catalog.online),
            (ModelKind::Offline, "Offline", &catalog.offline),
        ] {
            ui.label(egui::RichText::new(title).strong());
            ui.add_space(Self::LINE_SPACING);
            if ids.is_empty() {
                ui.label("None available.");
            }
            for id in ids {
                let mut checked = selection.is_selected(kind, id);
                if ui.checkbox(&mut checked, id.as_str()).changed() {
                    toggled = Some((kind, id.clone()));
                }
            }
            ui.add_space(18.0);
        }
        let missing = selection.missing_from(&catalog);
        if !missing.is_empty() {
            ui.label(format!("Selected but not offered: {}", missing.join(", ")));
        }
        if let Some(ref notice) = self.models_notice {
            ui.add_space(Self::LINE_SPACING);
            ui.colored_label(egui::Color32::YELLOW, notice);
        }
        if let Some((kind, id)) = toggled {
            if let Err(e) = self.controller.toggle_model(kind, &id) {
                log::error!("failed to save model selection: {:#}", e);
            }
        }
    }

    fn ui_info_screen(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Info");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        ui.label(egui::RichText::new("Server").strong());
        ui.add_space(Self::LINE_SPACING);
        ui.label(format!("URL: {}", self.controller.api_url()));
        ui.add_space(Self::LINE_SPACING);
        ui.horizontal(|ui| {
            ui.label("Status:");
            ui.colored_label(self.status_color(), self.status_text());
        });
        ui.add_space(Self::LINE_SPACING);
        let catalog = self.controller.catalog();
        ui.label(format!(
            "Models: {} online, {} offline",
            catalog.online.len(),
            catalog.offline.len()
        ));
        ui.add_space(18.0);

        ui.label(egui::RichText::new("Interfaces").strong());
        ui.add_space(Self::LINE_SPACING);
        let mode = self.controller.settings().interface_mode();
        ui.label(format!("Preferred: {}", mode.as_str()));
        ui.add_space(Self::LINE_SPACING);
        if ui.link("Open chat").clicked() {
            self.current_screen = Screen::Chat;
        }
        ui.add_space(Self::LINE_SPACING);
        let streamlit = self
            .controller
            .settings()
            .streamlit_url(&self.default_streamlit_url);
        ui.hyperlink_to("Open the Streamlit interface in a browser", streamlit);
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_history_screen(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.horizontal(|ui| {
            ui.heading("History");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let loading = self.history_receiver.is_some();
                if ui
                    .add_enabled(!loading, egui::Button::new("Refresh"))
                    .clicked()
                {
                    self.start_history_fetch();
                }
                if loading {
                    ui.spinner();
                }
            });
        });
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
        if let Some(ref notice) = self.history_notice {
            ui.colored_label(egui::Color32::YELLOW, notice);
            ui.add_space(8.0);
        }

        let available = ui.available_height();
        let scroll_height = (available - Self::SCREEN_FOOTER_SPACING).max(0.0);
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .show(ui, |ui| {
                let entries = self.controller.history();
                if entries.is_empty() {
                    ui.label("No history loaded. Press Refresh to fetch it from the server.");
                }
                for e in entries {
                    egui::Frame::none()
                        .stroke(egui::Stroke::new(
                            1.0,
                            ui.style().visuals.widgets.noninteractive.bg_stroke.color,
                        ))
                        .rounding(egui::Rounding::same(8.0))
                        .inner_margin(egui::Margin::same(8.0))
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(e.display_timestamp())
                                    .small()
                                    .weak(),
                            );
                            ui.label(egui::RichText::new(&e.query).strong());
                            ui.label(&e.answer);
                        });
                    ui.add_space(8.0);
                }
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_settings_screen(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Settings");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        ui.label(egui::RichText::new("Server URL").strong());
        ui.add_space(Self::LINE_SPACING);
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.api_url_input).desired_width(320.0));
            if ui.button("Save").clicked() {
                match self.controller.set_api_url(&self.api_url_input) {
                    Ok(()) => {
                        self.api_url_input = self.controller.api_url().to_string();
                        self.settings_status = Some((true, "Server URL saved.".to_string()));
                        // work still running against the old server reports to nobody
                        self.probe_receiver = None;
                        self.models_receiver = None;
                        self.history_receiver = None;
                        self.start_probe();
                    }
                    Err(e) => self.settings_status = Some((false, format!("{:#}", e))),
                }
            }
            let checking = self.server_check_receiver.is_some();
            if ui
                .add_enabled(!checking, egui::Button::new("Test connection"))
                .clicked()
            {
                let bridge = self.bridge.clone();
                self.server_check_receiver = Some(spawn_worker(move || async move {
                    bridge.check_server().await
                }));
            }
        });
        ui.add_space(18.0);

        ui.label(egui::RichText::new("Interface").strong());
        ui.add_space(Self::LINE_SPACING);
        let current = self.controller.settings().interface_mode();
        let mut chosen = current;
        egui::ComboBox::from_id_source("interface_mode")
            .selected_text(current.as_str())
            .show_ui(ui, |ui| {
                for mode in InterfaceMode::ALL {
                    ui.selectable_value(&mut chosen, mode, mode.as_str());
                }
            });
        if chosen != current
            && !self
                .bridge
                .set_setting(KEY_INTERFACE_MODE, serde_json::json!(chosen.as_str()))
        {
            self.settings_status = Some((false, "Could not save interface mode.".to_string()));
        }
        ui.add_space(Self::LINE_SPACING);
        ui.label("Applies the next time the app starts.");
        ui.add_space(18.0);

        ui.label(egui::RichText::new("Streamlit URL").strong());
        ui.add_space(Self::LINE_SPACING);
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut self.streamlit_url_input).desired_width(320.0));
            if ui.button("Save").clicked() {
                let url = config::normalize_url(&self.streamlit_url_input);
                if self
                    .bridge
                    .set_setting(KEY_STREAMLIT_URL, serde_json::Value::String(url.clone()))
                {
                    self.streamlit_url_input = url;
                    self.settings_status = Some((true, "Streamlit URL saved.".to_string()));
                } else {
                    self.settings_status =
                        Some((false, "Could not save Streamlit URL.".to_string()));
                }
            }
        });

        if let Some((ok, text)) = &self.settings_status {
            ui.add_space(18.0);
            let color = if *ok {
                egui::Color32::from_rgb(0x2e, 0xa0, 0x43)
            } else {
                egui::Color32::RED
            };
            ui.colored_label(color, text);
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();

        let available = ui.available_height();
        let scroll_height = (available - Self::SCREEN_FOOTER_SPACING).max(0.0);
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
                if lines.is_empty() {
                    ui.label("No log output yet.");
                }
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }
}

impl eframe::App for NexusApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_workers();
        if self.is_busy() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| {
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        ui.heading("AI Nexus");
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            let probing = self.probe_receiver.is_some();
                            if ui
                                .add_enabled(!probing, egui::Button::new("Check status"))
                                .clicked()
                            {
                                self.start_probe();
                            }
                            ui.colored_label(self.status_color(), self.status_text());
                            ui.label(self.controller.api_url());
                        });
                    });
                    ui.add_space(16.0);
                });
        });

        let current_screen = &mut self.current_screen;
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(140.0)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                    .show(ui, |ui| {
                        ui.add_space(24.0);
                        for (screen, label) in Screen::ALL {
                            if ui.selectable_label(*current_screen == screen, label).clicked() {
                                *current_screen = screen;
                            }
                            ui.add_space(12.0);
                        }
                    });
            });

        if self.current_screen == Screen::Chat {
            egui::SidePanel::right("models_panel")
                .resizable(false)
                .exact_width(240.0)
                .show(ctx, |ui| {
                    egui::Frame::none()
                        .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                        .show(ui, |ui| {
                            ui.add_space(24.0);
                            ui.heading("Models");
                            ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
                            egui::ScrollArea::vertical().show(ui, |ui| {
                                self.ui_model_picker(ui);
                            });
                        });
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.current_screen {
                    Screen::Info => self.ui_info_screen(ui),
                    Screen::Chat => {
                        ui.add_space(24.0);
                        ui.heading("Chat");
                        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
                        self.ui_chat(ui);
                    }
                    Screen::History => self.ui_history_screen(ui),
                    Screen::Settings => self.ui_settings_screen(ui),
                    Screen::Logs => self.ui_logs_screen(ui),
                });
        });
    }
}
