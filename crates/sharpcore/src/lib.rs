//! SharpScript MUD 客戶端核心
//!
//! 提供 MUD 客戶端的核心功能：
//! - `script`: SharpScript 切分、編譯與可暫停的執行
//! - `functions`: 內建 `#` 函式
//! - `pattern`: 別名與觸發器共用的匹配模式
//! - `alias` / `trigger` / `keymacro` / `channel`: 反應物件
//! - `world`: 單一 MUD 連線的狀態與事件處理
//! - `client`: 網路與輸出端介面
//! - `config`: world 設定持久化
//! - `telnet`: Telnet 協定連線

pub mod alias;
pub mod channel;
pub mod client;
pub mod config;
pub mod functions;
pub mod keymacro;
pub mod pattern;
pub mod script;
pub mod telnet;
pub mod trigger;
pub mod world;

pub use alias::{Alias, AliasManager};
pub use channel::{Channel, ChannelManager};
pub use client::{ChannelClient, Client, OutputFlags, OutputSink};
pub use config::{StoreError, WorldSettings, WorldStore};
pub use functions::{Function, FunctionRegistry};
pub use keymacro::{Macro, MacroManager, Modifiers, Shortcut};
pub use pattern::{MatchCaptures, ReactionPattern};
pub use script::{Effect, RunOutcome, ScriptEngine, ScriptError};
pub use telnet::{TelnetConfig, TelnetConnection, TelnetError};
pub use trigger::{Trigger, TriggerManager};
pub use world::{lock_world, Mark, Reception, SharedWorld, World};
