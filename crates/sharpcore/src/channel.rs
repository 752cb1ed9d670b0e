//! 訊息頻道
//!
//! 腳本以 `#channel` 宣告頻道，再以 `#feed` 寫入。每個頻道保存最近的訊息。

/// 頻道預設容量
pub const DEFAULT_CAPACITY: usize = 1000;

/// 訊息頻道
#[derive(Debug, Clone)]
pub struct Channel {
    /// 頻道名稱
    pub name: String,
    /// 訊息緩衝區容量
    pub capacity: usize,
    messages: Vec<String>,
}

impl Channel {
    /// 創建新的頻道
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: DEFAULT_CAPACITY,
            messages: Vec::new(),
        }
    }

    /// 設置緩衝區容量
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// 添加訊息，超過容量時丟棄最舊的
    pub fn push(&mut self, message: impl Into<String>) {
        if self.messages.len() >= self.capacity {
            self.messages.remove(0);
        }
        self.messages.push(message.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// 獲取最後 N 條訊息
    pub fn last_n(&self, n: usize) -> &[String] {
        let len = self.messages.len();
        &self.messages[len.saturating_sub(n)..]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// 頻道管理器（依宣告順序）
#[derive(Debug, Default)]
pub struct ChannelManager {
    channels: Vec<Channel>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 宣告頻道；已存在時不變，回傳是否為新頻道
    pub fn add(&mut self, name: &str) -> bool {
        if self.get(name).is_some() {
            return false;
        }
        self.channels.push(Channel::new(name));
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<Channel> {
        let index = self.channels.iter().position(|c| c.name == name)?;
        Some(self.channels.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// 寫入訊息；頻道不存在時回傳 `false`
    pub fn feed(&mut self, name: &str, message: impl Into<String>) -> bool {
        match self.channels.iter_mut().find(|c| c.name == name) {
            Some(channel) => {
                channel.push(message);
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }
}
