//! Trigger（觸發器）模組
//!
//! 偵測伺服器送來的每一行文字並執行動作。同一行符合多個觸發器時，
//! 只有排序最前面的一個會執行：
//! 1. 模式長度（字元數）較長者優先
//! 2. 長度相同時，萬用字元較少者優先
//! 3. 仍相同時依宣告順序

use std::cmp::Reverse;
use std::time::Instant;

use tracing::debug;

use crate::pattern::{MatchCaptures, ReactionPattern};
use crate::script::{
    collapse_separators, format, replace_variables, unescape_separators, Argument, Effect, Locals,
    RunOutcome, ScriptEngine, ScriptError, Statement,
};

/// 觸發器定義
#[derive(Debug, Clone)]
pub struct Trigger {
    pattern: ReactionPattern,
    action: String,
    /// 取代顯示的文字（可含變數）
    substitution: Option<String>,
    /// 不顯示符合的行
    mute: bool,
    /// 將游標移到匹配位置
    mark: bool,
}

impl Trigger {
    /// 創建新的觸發器
    pub fn new(pattern: impl Into<String>, action: impl Into<String>) -> Result<Self, ScriptError> {
        Ok(Self {
            pattern: ReactionPattern::new(pattern)?,
            action: action.into(),
            substitution: None,
            mute: false,
            mark: false,
        })
    }

    pub fn with_substitution(mut self, substitution: impl Into<String>) -> Self {
        self.substitution = Some(substitution.into());
        self
    }

    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    pub fn with_mark(mut self, mark: bool) -> Self {
        self.mark = mark;
        self
    }

    pub fn pattern(&self) -> &ReactionPattern {
        &self.pattern
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn substitution(&self) -> Option<&str> {
        self.substitution.as_deref()
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    pub fn mark(&self) -> bool {
        self.mark
    }

    pub fn label(&self) -> String {
        format!("trigger {}", self.pattern.as_str())
    }

    /// 嘗試匹配一行文字
    pub fn test(&self, line: &str) -> Option<MatchCaptures> {
        self.pattern.captures(line)
    }

    /// 執行動作；動作為空時只寫入捕獲群組
    pub fn fire(
        &self,
        captures: &MatchCaptures,
        engine: &mut ScriptEngine,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Result<RunOutcome, ScriptError> {
        if self.action.trim().is_empty() {
            engine.locals_mut().apply_captures(captures);
            return Ok(RunOutcome::Completed);
        }
        debug!(trigger = self.pattern.as_str(), matched = %captures.matched, "觸發器匹配");
        engine.execute(&self.action, Some(captures), &self.label(), effects, now)
    }

    /// 實際顯示的文字；`None` 表示不顯示
    pub fn display_text(&self, line: &str, locals: &Locals) -> Option<String> {
        if self.mute {
            return None;
        }
        match &self.substitution {
            Some(substitution) => Some(unescape_separators(&replace_variables(
                substitution,
                locals,
            ))),
            None => Some(line.to_string()),
        }
    }

    /// 序列化為 `#trigger` 指令
    pub fn to_statement(&self) -> String {
        let mut statement = Statement::new("trigger")
            .with_argument(Argument::Braced(self.pattern.as_str().to_string()))
            .with_argument(Argument::Braced(collapse_separators(&self.action)));
        if let Some(substitution) = &self.substitution {
            statement = statement.with_argument(Argument::Braced(collapse_separators(substitution)));
        }
        if self.mute {
            statement = statement.with_flag("mute", true);
        }
        if self.mark {
            statement = statement.with_flag("mark", true);
        }
        format(&statement)
    }
}

/// 觸發器管理器
#[derive(Debug, Default)]
pub struct TriggerManager {
    /// 依宣告順序排列
    triggers: Vec<Trigger>,
}

impl TriggerManager {
    /// 創建新的觸發器管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加觸發器；相同模式的觸發器會被更新（保留原本順序）
    pub fn add(&mut self, trigger: Trigger) {
        match self
            .triggers
            .iter_mut()
            .find(|existing| existing.pattern.as_str() == trigger.pattern.as_str())
        {
            Some(existing) => *existing = trigger,
            None => self.triggers.push(trigger),
        }
    }

    /// 移除觸發器
    pub fn remove(&mut self, pattern: &str) -> Option<Trigger> {
        let index = self.triggers.iter().position(|t| t.pattern.as_str() == pattern)?;
        Some(self.triggers.remove(index))
    }

    /// 獲取觸發器
    pub fn get(&self, pattern: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.pattern.as_str() == pattern)
    }

    /// 獲取所有觸發器
    pub fn list(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn clear(&mut self) {
        self.triggers.clear();
    }

    /// 所有符合的觸發器，依優先順序排列
    pub fn rank(&self, line: &str) -> Vec<(&Trigger, MatchCaptures)> {
        let mut matches: Vec<(&Trigger, MatchCaptures)> = self
            .triggers
            .iter()
            .filter_map(|trigger| trigger.test(line).map(|captures| (trigger, captures)))
            .collect();
        // 穩定排序，相同優先度保留宣告順序
        matches.sort_by_key(|(trigger, _)| (Reverse(trigger.pattern.len()), trigger.pattern.wildcards()));
        matches
    }

    /// 優先順序最高的觸發器
    pub fn best(&self, line: &str) -> Option<(&Trigger, MatchCaptures)> {
        self.rank(line).into_iter().next()
    }
}
