//! 腳本函式
//!
//! 每個 `#name` 對應一個實作 [`Function`] 的物件。函式只透過
//! [`ExecContext`] 讀寫變數、產生副作用，不直接碰觸網路或畫面。

mod declare;
mod output;
mod pause;
mod vars;

use std::collections::HashMap;
use std::sync::Arc;

use crate::script::{ExecContext, Flags, Flow, Instruction, ScriptError};

pub use declare::{AliasFunction, ChannelFunction, MacroFunction, TriggerFunction};
pub use output::{DisplayFunction, FeedFunction, PlayFunction, SayFunction, SendFunction};
pub use pause::{Delay, PauseFunction};
pub use vars::{CheckVarFunction, DelVarFunction, WriteVarFunction};

/// 腳本函式共同介面
pub trait Function: Send + Sync {
    /// 註冊名稱（不含 `#`）
    fn name(&self) -> &'static str;

    /// 一行說明
    fn summary(&self) -> &'static str;

    /// 允許的位置參數數量 `(最少, 最多)`
    fn arity(&self) -> (usize, Option<usize>) {
        (0, None)
    }

    /// 參數是否做變數替換
    fn substitutes(&self) -> bool {
        true
    }

    /// 自訂編譯形式，回傳 `None` 時編譯為一般呼叫
    fn custom_form(&self, _args: &[String], _flags: &Flags) -> Option<Instruction> {
        None
    }

    /// 檢查參數
    fn validate(&self, args: &[String], _flags: &Flags) -> Result<(), ScriptError> {
        let (min, max) = self.arity();
        let count = args.len();
        if count < min || max.is_some_and(|max| count > max) {
            let expected = match max {
                Some(max) if max == min => format!("{}", min),
                Some(max) => format!("{} 到 {}", min, max),
                None => format!("至少 {}", min),
            };
            return Err(ScriptError::InvalidArguments {
                function: self.name().to_string(),
                reason: format!("需要 {} 個參數，收到 {} 個", expected, count),
            });
        }
        Ok(())
    }

    /// 執行
    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], flags: &Flags) -> Result<Flow, ScriptError>;
}

/// 函式註冊表
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// 創建空的註冊表
    pub fn new() -> Self {
        Self::default()
    }

    /// 創建包含所有內建函式的註冊表
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(SendFunction);
        registry.register(DisplayFunction);
        registry.register(PlayFunction);
        registry.register(FeedFunction);
        registry.register(PauseFunction);
        registry.register(AliasFunction);
        registry.register(TriggerFunction);
        registry.register(MacroFunction);
        registry.register(ChannelFunction);
        registry.register(WriteVarFunction);
        registry.register(CheckVarFunction);
        registry.register(DelVarFunction);

        let say: Arc<dyn Function> = Arc::new(SayFunction);
        registry.register_as("say", say.clone());
        registry.register_as("tts", say);
        registry
    }

    /// 以函式本身的名稱註冊
    pub fn register(&mut self, function: impl Function + 'static) {
        let name = function.name();
        self.register_as(name, Arc::new(function));
    }

    /// 以指定名稱註冊（同一個函式可有多個名稱）
    pub fn register_as(&mut self, name: &str, function: Arc<dyn Function>) {
        self.functions.insert(name.to_lowercase(), function);
    }

    /// 查詢函式（不區分大小寫）
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Function>> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 所有已註冊名稱（排序）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
