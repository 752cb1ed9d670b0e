//! Alias（別名）模組
//!
//! 使用者輸入的整行命令符合模式時，改為執行別名的動作腳本。
//! 別名依宣告順序測試，第一個符合的別名生效。

use std::time::Instant;

use tracing::debug;

use crate::pattern::{MatchCaptures, ReactionPattern};
use crate::script::{
    collapse_separators, format, Argument, Effect, RunOutcome, ScriptEngine, ScriptError, Statement,
};

/// 別名定義
#[derive(Debug, Clone)]
pub struct Alias {
    /// 匹配模式（`*` 為萬用字元，`^` 開頭為正則表達式）
    pattern: ReactionPattern,
    /// 動作腳本
    action: String,
}

impl Alias {
    /// 創建新的別名
    pub fn new(pattern: impl Into<String>, action: impl Into<String>) -> Result<Self, ScriptError> {
        Ok(Self {
            pattern: ReactionPattern::new(pattern)?,
            action: action.into(),
        })
    }

    pub fn pattern(&self) -> &ReactionPattern {
        &self.pattern
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// 記錄用的名稱
    pub fn label(&self) -> String {
        format!("alias {}", self.pattern.as_str())
    }

    /// 嘗試匹配整行命令
    pub fn try_match(&self, command: &str) -> Option<MatchCaptures> {
        self.pattern.captures(command)
    }

    /// 測試命令，符合時執行動作
    ///
    /// 回傳 `Some` 表示命令已被這個別名消耗（即使動作編譯失敗）。
    pub fn test(
        &self,
        command: &str,
        engine: &mut ScriptEngine,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Option<Result<RunOutcome, ScriptError>> {
        let captures = self.try_match(command)?;
        debug!(alias = self.pattern.as_str(), command, "別名匹配");
        Some(engine.execute(&self.action, Some(&captures), &self.label(), effects, now))
    }

    /// 序列化為 `#alias` 指令
    pub fn to_statement(&self) -> String {
        let statement = Statement::new("alias")
            .with_argument(Argument::Braced(self.pattern.as_str().to_string()))
            .with_argument(Argument::Braced(collapse_separators(&self.action)));
        format(&statement)
    }
}

/// 別名管理器
#[derive(Debug, Default)]
pub struct AliasManager {
    /// 依宣告順序排列
    aliases: Vec<Alias>,
}

impl AliasManager {
    /// 創建新的別名管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加別名；相同模式的別名會被更新（保留原本順序）
    pub fn add(&mut self, alias: Alias) {
        match self
            .aliases
            .iter_mut()
            .find(|existing| existing.pattern.as_str() == alias.pattern.as_str())
        {
            Some(existing) => *existing = alias,
            None => self.aliases.push(alias),
        }
    }

    /// 移除別名
    pub fn remove(&mut self, pattern: &str) -> Option<Alias> {
        let index = self.aliases.iter().position(|a| a.pattern.as_str() == pattern)?;
        Some(self.aliases.remove(index))
    }

    /// 獲取別名
    pub fn get(&self, pattern: &str) -> Option<&Alias> {
        self.aliases.iter().find(|a| a.pattern.as_str() == pattern)
    }

    /// 獲取所有別名
    pub fn list(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    /// 依序測試所有別名，第一個符合的生效
    pub fn test(
        &self,
        command: &str,
        engine: &mut ScriptEngine,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Option<(&Alias, Result<RunOutcome, ScriptError>)> {
        self.test_except(command, &[], engine, effects, now)
    }

    /// 同 [`AliasManager::test`]，但略過 `exclude` 中的模式
    pub fn test_except(
        &self,
        command: &str,
        exclude: &[String],
        engine: &mut ScriptEngine,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Option<(&Alias, Result<RunOutcome, ScriptError>)> {
        self.aliases
            .iter()
            .filter(|alias| !exclude.iter().any(|pattern| pattern == alias.pattern.as_str()))
            .find_map(|alias| alias.test(command, engine, effects, now).map(|result| (alias, result)))
    }
}
