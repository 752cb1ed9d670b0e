//! World 與外部的介面
//!
//! - [`Client`]：送出文字到伺服器
//! - [`OutputSink`]：顯示、語音、點字與音效輸出

use tokio::sync::mpsc;
use tracing::warn;

/// 網路連線端
pub trait Client: Send {
    /// 送出一行文字（不含換行）
    fn write(&mut self, text: &str);
}

/// 輸出目標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFlags {
    pub screen: bool,
    pub speech: bool,
    pub braille: bool,
    /// 語音輸出前先中斷目前的朗讀
    pub interrupt: bool,
}

impl OutputFlags {
    /// 螢幕 + 語音 + 點字
    pub fn all() -> Self {
        Self {
            screen: true,
            speech: true,
            braille: true,
            interrupt: false,
        }
    }

    /// 只有語音
    pub fn speech(interrupt: bool) -> Self {
        Self {
            speech: true,
            interrupt,
            ..Default::default()
        }
    }
}

/// 輸出端（畫面、螢幕閱讀器）
pub trait OutputSink: Send {
    fn handle_message(&mut self, text: &str, flags: OutputFlags);

    /// 播放音效；預設不支援
    fn play_sound(&mut self, path: &str) {
        warn!(path, "此輸出端不支援播放音效");
    }
}

/// 透過 channel 轉交給網路任務的 [`Client`]
#[derive(Debug, Clone)]
pub struct ChannelClient {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelClient {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Client for ChannelClient {
    fn write(&mut self, text: &str) {
        if self.tx.send(text.to_string()).is_err() {
            warn!("網路任務已結束，丟棄輸出: {}", text);
        }
    }
}
