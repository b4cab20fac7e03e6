//! Persisted user settings: server URL, model selection, desktop interface mode.
//!
//! A [`SettingsStore`] holds raw JSON values by key. [`Settings`] wraps one with typed
//! access: a missing or malformed value reads as the supplied default, never an error.

use anyhow::{anyhow, Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::catalog::ModelSelection;
use crate::config::normalize_url;

pub const KEY_API_URL: &str = "apiUrl";
/// Older mobile builds stored the server under this key.
pub const KEY_SERVER_URL: &str = "serverUrl";
pub const KEY_ONLINE_MODELS: &str = "online_models";
pub const KEY_OFFLINE_MODELS: &str = "offline_models";
/// Older mobile builds stored a single (online) model list under this key.
pub const KEY_SELECTED_MODELS: &str = "selectedModels";
pub const KEY_SYNTHESIZER_MODEL: &str = "synthesizerModel";
pub const KEY_INTERFACE_MODE: &str = "interfaceMode";
pub const KEY_STREAMLIT_URL: &str = "streamlitUrl";

/// Raw key-value persistence. Reads return the last value written in this process.
pub trait SettingsStore: Send + Sync {
    fn get_value(&self, key: &str) -> Option<Value>;
    fn set_value(&self, key: &str, value: Value) -> Result<()>;
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut g = self
            .values
            .lock()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        g.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by one JSON object on disk (e.g. `~/.nexus/settings.json`).
///
/// Writes reload the file under an exclusive lock on `<file>.lock`, apply the key and
/// replace the file via rename, so concurrent writers (CLI and desktop) only race per key.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store. A missing or unparseable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = read_object(&path);
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn persist(&self, key: &str, value: &Value) -> Result<Map<String, Value>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating settings directory {}", parent.display()))?;
        }
        let lock_path = self.lock_path();
        let lock = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("opening {}", lock_path.display()))?;
        lock.lock_exclusive()
            .with_context(|| format!("locking {}", lock_path.display()))?;

        let mut on_disk = read_object(&self.path);
        on_disk.insert(key.to_string(), value.clone());
        let body = serde_json::to_string_pretty(&on_disk)?;
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let mut file = std::fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        file.write_all(body.as_bytes())
            .with_context(|| format!("writing {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing {}", tmp.display()))?;
        drop(file);
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        if let Err(e) = lock.unlock() {
            log::warn!("unlocking {}: {}", lock_path.display(), e);
        }
        Ok(on_disk)
    }
}

impl SettingsStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut g = self
            .values
            .lock()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *g = self.persist(key, &value)?;
        Ok(())
    }
}

fn read_object(path: &Path) -> Map<String, Value> {
    let s = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("cannot read settings {}: {}", path.display(), e);
            }
            return Map::new();
        }
    };
    match serde_json::from_str::<Value>(&s) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            log::warn!("settings file {} is not a JSON object; ignoring it", path.display());
            Map::new()
        }
    }
}

/// Which interface the desktop shell opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceMode {
    #[default]
    Chat,
    Streamlit,
    Landing,
}

impl InterfaceMode {
    pub const ALL: [InterfaceMode; 3] = [
        InterfaceMode::Chat,
        InterfaceMode::Streamlit,
        InterfaceMode::Landing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceMode::Chat => "chat",
            InterfaceMode::Streamlit => "streamlit",
            InterfaceMode::Landing => "landing",
        }
    }
}

/// Typed view over a shared [`SettingsStore`].
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingsStore>,
}

impl Settings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(JsonFileStore::open(path)))
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.store.get_value(key)
    }

    pub fn set_value(&self, key: &str, value: Value) -> Result<()> {
        self.store.set_value(key, value)
    }

    /// Typed read; None when absent or of the wrong shape.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.store.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("setting {:?} is malformed ({}); using default", key, e);
                None
            }
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_opt(key).unwrap_or(default)
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("serializing setting {:?}", key))?;
        self.store.set_value(key, value)
    }

    /// Server URL: `apiUrl`, then the legacy `serverUrl`, then `fallback`.
    pub fn api_url(&self, fallback: &str) -> String {
        [KEY_API_URL, KEY_SERVER_URL]
            .iter()
            .filter_map(|k| self.get_opt::<String>(k))
            .map(|u| normalize_url(&u))
            .find(|u| !u.is_empty())
            .unwrap_or_else(|| normalize_url(fallback))
    }

    pub fn set_api_url(&self, url: &str) -> Result<()> {
        self.set(KEY_API_URL, &normalize_url(url))
    }

    /// Selected models. Split keys win; the legacy `selectedModels` list is read as online.
    pub fn model_selection(&self) -> ModelSelection {
        let online = self.get_opt::<Vec<String>>(KEY_ONLINE_MODELS);
        let offline = self.get_opt::<Vec<String>>(KEY_OFFLINE_MODELS);
        if online.is_some() || offline.is_some() {
            return ModelSelection::new(online.unwrap_or_default(), offline.unwrap_or_default());
        }
        match self.get_opt::<Vec<String>>(KEY_SELECTED_MODELS) {
            Some(legacy) => ModelSelection::new(legacy, Vec::new()),
            None => ModelSelection::default(),
        }
    }

    pub fn set_model_selection(&self, selection: &ModelSelection) -> Result<()> {
        self.set(KEY_ONLINE_MODELS, &selection.online)?;
        self.set(KEY_OFFLINE_MODELS, &selection.offline)
    }

    pub fn synthesizer_model(&self) -> Option<String> {
        self.get_opt::<Option<String>>(KEY_SYNTHESIZER_MODEL)
            .flatten()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn interface_mode(&self) -> InterfaceMode {
        self.get(KEY_INTERFACE_MODE, InterfaceMode::default())
    }

    pub fn set_interface_mode(&self, mode: InterfaceMode) -> Result<()> {
        self.set(KEY_INTERFACE_MODE, &mode)
    }

    pub fn streamlit_url(&self, fallback: &str) -> String {
        self.get_opt::<String>(KEY_STREAMLIT_URL)
            .map(|u| normalize_url(&u))
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| normalize_url(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_settings_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("nexus-settings-test-{}", uuid::Uuid::new_v4()))
            .join("settings.json")
    }

    #[test]
    fn get_returns_last_written_value() {
        let s = Settings::in_memory();
        assert_eq!(s.api_url("http://localhost:8000"), "http://localhost:8000");
        s.set_api_url("http://x:9000").unwrap();
        assert_eq!(s.api_url("http://localhost:8000"), "http://x:9000");
        s.set_api_url("http://y:9000/").unwrap();
        assert_eq!(s.api_url("http://localhost:8000"), "http://y:9000");
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = temp_settings_path();
        {
            let s = Settings::open_file(&path);
            s.set_api_url("http://x:9000").unwrap();
            s.set_model_selection(&ModelSelection::new(
                vec!["Claude (Anthropic)".to_string()],
                vec!["llama3.2:latest".to_string()],
            ))
            .unwrap();
        }
        let reopened = Settings::open_file(&path);
        assert_eq!(reopened.api_url("http://localhost:8000"), "http://x:9000");
        let sel = reopened.model_selection();
        assert_eq!(sel.online, vec!["Claude (Anthropic)"]);
        assert_eq!(sel.offline, vec!["llama3.2:latest"]);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn file_store_keeps_keys_written_by_another_handle() {
        let path = temp_settings_path();
        let a = Settings::open_file(&path);
        let b = Settings::open_file(&path);
        a.set_api_url("http://x:9000").unwrap();
        b.set_interface_mode(InterfaceMode::Landing).unwrap();
        let reopened = Settings::open_file(&path);
        assert_eq!(reopened.api_url("http://localhost:8000"), "http://x:9000");
        assert_eq!(reopened.interface_mode(), InterfaceMode::Landing);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn file_store_replaces_the_file_whole() {
        let path = temp_settings_path();
        let s = Settings::open_file(&path);
        s.set_api_url("http://x:9000").unwrap();
        s.set_api_url("http://y:9000").unwrap();

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        assert!(!PathBuf::from(tmp).exists());
        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk[KEY_API_URL], json!("http://y:9000"));

        // the lock is free again once a write returns
        let lock = std::fs::File::open(lock_file_for(&path)).unwrap();
        lock.try_lock_exclusive().unwrap();
        lock.unlock().unwrap();
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    fn lock_file_for(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    #[test]
    fn malformed_file_reads_as_empty() {
        let path = temp_settings_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        let s = Settings::open_file(&path);
        assert_eq!(s.api_url("http://localhost:8000"), "http://localhost:8000");
        assert_eq!(s.model_selection(), ModelSelection::default());
        s.set_api_url("http://x:9000").unwrap();
        assert_eq!(
            Settings::open_file(&path).api_url("http://localhost:8000"),
            "http://x:9000"
        );
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        let s = Settings::in_memory();
        s.set_value(KEY_ONLINE_MODELS, json!("not a list")).unwrap();
        s.set_value(KEY_INTERFACE_MODE, json!("fullscreen")).unwrap();
        s.set_value(KEY_API_URL, json!(42)).unwrap();
        assert_eq!(s.model_selection(), ModelSelection::default());
        assert_eq!(s.interface_mode(), InterfaceMode::Chat);
        assert_eq!(s.api_url("http://localhost:8000"), "http://localhost:8000");
    }

    #[test]
    fn default_selection_has_an_online_model() {
        let sel = Settings::in_memory().model_selection();
        assert_eq!(sel.online, vec!["Free Web (g4f)"]);
        assert!(sel.offline.is_empty());
    }

    #[test]
    fn legacy_keys_are_read() {
        let s = Settings::in_memory();
        s.set(KEY_SERVER_URL, "http://192.168.1.5:8000").unwrap();
        s.set(KEY_SELECTED_MODELS, &vec!["Gemini (Google)"]).unwrap();
        assert_eq!(s.api_url("http://localhost:8000"), "http://192.168.1.5:8000");
        let sel = s.model_selection();
        assert_eq!(sel.online, vec!["Gemini (Google)"]);
        assert!(sel.offline.is_empty());

        s.set(KEY_OFFLINE_MODELS, &vec!["mistral"]).unwrap();
        let sel = s.model_selection();
        assert!(sel.online.is_empty());
        assert_eq!(sel.offline, vec!["mistral"]);
    }

    #[test]
    fn interface_mode_round_trips_as_lowercase() {
        let s = Settings::in_memory();
        s.set_interface_mode(InterfaceMode::Streamlit).unwrap();
        assert_eq!(s.get_value(KEY_INTERFACE_MODE), Some(json!("streamlit")));
        assert_eq!(s.interface_mode(), InterfaceMode::Streamlit);
    }

    #[test]
    fn blank_synthesizer_is_none() {
        let s = Settings::in_memory();
        assert_eq!(s.synthesizer_model(), None);
        s.set(KEY_SYNTHESIZER_MODEL, "  ").unwrap();
        assert_eq!(s.synthesizer_model(), None);
        s.set(KEY_SYNTHESIZER_MODEL, "Claude (Anthropic)").unwrap();
        assert_eq!(s.synthesizer_model().as_deref(), Some("Claude (Anthropic)"));
    }
}
