//! 設定檔持久化模組
//!
//! 每個 world 一個目錄：`<config_dir>/sharpmud/worlds/<name>/`
//! - `settings.json`：連線與輸出設定（[`WorldSettings`]）
//! - `config.set`：別名、觸發器、巨集、頻道的指令文字

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

const SETTINGS_FILE: &str = "settings.json";
const SCRIPT_FILE: &str = "config.set";

/// 設定存取錯誤
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO 錯誤: {0}")]
    Io(#[from] io::Error),

    #[error("設定格式錯誤: {0}")]
    Json(#[from] serde_json::Error),

    #[error("找不到系統設定目錄")]
    NoConfigDir,
}

/// 單一 world 的設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSettings {
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 文字編碼標籤（`utf-8`、`big5`…）
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// 命令堆疊分隔符，空字串表示停用
    #[serde(default)]
    pub command_stacking: String,
    #[serde(default = "default_true")]
    pub speech: bool,
    #[serde(default)]
    pub braille: bool,
    /// 計時器檢查間隔（毫秒）
    #[serde(default = "default_timer_tick")]
    pub timer_tick_ms: u64,
}

fn default_port() -> u16 {
    23
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timer_tick() -> u64 {
    100
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self::new("default")
    }
}

impl WorldSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: String::new(),
            port: default_port(),
            encoding: default_encoding(),
            command_stacking: String::new(),
            speech: true,
            braille: false,
            timer_tick_ms: default_timer_tick(),
        }
    }

    pub fn timer_tick(&self) -> Duration {
        Duration::from_millis(self.timer_tick_ms.max(1))
    }
}

/// world 設定的磁碟存取
#[derive(Debug)]
pub struct WorldStore {
    root: PathBuf,
    /// 最近一次讀寫的 `config.set` 摘要，內容沒變就不寫入
    digests: HashMap<String, Vec<u8>>,
}

impl WorldStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            digests: HashMap::new(),
        }
    }

    /// 系統預設位置
    pub fn default_root() -> Result<PathBuf, StoreError> {
        dirs::config_dir()
            .map(|dir| dir.join("sharpmud"))
            .ok_or(StoreError::NoConfigDir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// world 目錄
    pub fn world_dir(&self, name: &str) -> PathBuf {
        self.root.join("worlds").join(name)
    }

    /// 讀取設定；檔案不存在時回傳預設值
    pub fn load_settings(&self, name: &str) -> Result<WorldSettings, StoreError> {
        let path = self.world_dir(name).join(SETTINGS_FILE);
        if !path.exists() {
            debug!("設定檔不存在，使用預設值: {}", path.display());
            return Ok(WorldSettings::new(name));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_settings(&self, settings: &WorldSettings) -> Result<(), StoreError> {
        let dir = self.world_dir(&settings.name);
        fs::create_dir_all(&dir)?;
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// 讀取 `config.set`；檔案不存在時回傳空字串
    pub fn load_script(&mut self, name: &str) -> Result<String, StoreError> {
        let path = self.world_dir(name).join(SCRIPT_FILE);
        let content = if path.exists() {
            fs::read_to_string(&path)?
        } else {
            String::new()
        };
        self.digests.insert(name.to_string(), digest(&content));
        Ok(content)
    }

    /// 寫入 `config.set`；內容與上次相同時略過，回傳是否實際寫入
    pub fn save_script(&mut self, name: &str, content: &str) -> Result<bool, StoreError> {
        let hash = digest(content);
        if self.digests.get(name) == Some(&hash) {
            debug!(world = name, "config.set 未變更，略過寫入");
            return Ok(false);
        }

        let dir = self.world_dir(name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(SCRIPT_FILE), content)?;
        self.digests.insert(name.to_string(), hash);
        info!(world = name, "已儲存 config.set");
        Ok(true)
    }

    /// 所有已存在的 world 名稱（排序）
    pub fn list_worlds(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join("worlds");
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn digest(content: &str) -> Vec<u8> {
    Sha256::digest(content.as_bytes()).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings: WorldSettings = serde_json::from_str(r#"{"name": "aardwolf"}"#).unwrap();
        assert_eq!(settings, WorldSettings::new("aardwolf"));
        assert_eq!(settings.port, 23);
        assert_eq!(settings.encoding, "utf-8");
        assert!(settings.command_stacking.is_empty());
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldStore::new(dir.path());

        let mut settings = WorldSettings::new("aardwolf");
        settings.host = "aardmud.org".to_string();
        settings.port = 4000;
        store.save_settings(&settings).unwrap();

        assert_eq!(store.load_settings("aardwolf").unwrap(), settings);
        assert_eq!(store.list_worlds().unwrap(), vec!["aardwolf".to_string()]);
    }

    #[test]
    fn test_missing_world_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WorldStore::new(dir.path());
        assert_eq!(store.load_settings("nowhere").unwrap().name, "nowhere");
        assert_eq!(store.load_script("nowhere").unwrap(), "");
        assert!(store.list_worlds().unwrap().is_empty());
    }

    #[test]
    fn test_unchanged_script_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WorldStore::new(dir.path());

        assert!(store.save_script("w", "#alias kk {kill kobold}\n").unwrap());
        assert!(!store.save_script("w", "#alias kk {kill kobold}\n").unwrap());
        assert!(store.save_script("w", "#alias kk {kill orc}\n").unwrap());

        let mut reopened = WorldStore::new(dir.path());
        assert_eq!(reopened.load_script("w").unwrap(), "#alias kk {kill orc}\n");
        assert!(!reopened.save_script("w", "#alias kk {kill orc}\n").unwrap());
    }
}
