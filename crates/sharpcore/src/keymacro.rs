//! 快捷鍵巨集
//!
//! 快捷鍵以 `Ctrl + F1` 形式書寫：修飾鍵（Ctrl/Alt/Shift）不區分大小寫、
//! 順序不限，最後輸出為固定順序的標準形式。

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::script::{
    collapse_separators, format, Argument, Effect, RunOutcome, ScriptEngine, ScriptError, Statement,
};

/// 修飾鍵
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

/// 快捷鍵組合
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    key: String,
    modifiers: Modifiers,
}

impl Shortcut {
    pub fn new(key: &str, modifiers: Modifiers) -> Self {
        Self {
            key: normalize_key(key),
            modifiers,
        }
    }

    /// 解析 `Ctrl + Shift + F1` 形式的文字
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let invalid = || ScriptError::InvalidShortcut(text.to_string());
        let mut modifiers = Modifiers::default();
        let mut key: Option<&str> = None;

        for part in text.split('+').map(str::trim) {
            if part.is_empty() {
                return Err(invalid());
            }
            let slot = match part.to_lowercase().as_str() {
                "ctrl" | "control" => &mut modifiers.ctrl,
                "alt" => &mut modifiers.alt,
                "shift" => &mut modifiers.shift,
                _ => {
                    if key.replace(part).is_some() {
                        return Err(invalid());
                    }
                    continue;
                }
            };
            if std::mem::replace(slot, true) {
                return Err(invalid());
            }
        }

        let key = key.ok_or_else(invalid)?;
        Ok(Self::new(key, modifiers))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
}

/// 單一字元轉大寫，其餘首字大寫（`f1` → `F1`、`pageup` → `Pageup`）
fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        if self.modifiers.ctrl {
            parts.push("Ctrl");
        }
        if self.modifiers.alt {
            parts.push("Alt");
        }
        if self.modifiers.shift {
            parts.push("Shift");
        }
        parts.push(&self.key);
        write!(f, "{}", parts.join(" + "))
    }
}

impl FromStr for Shortcut {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// 快捷鍵巨集
#[derive(Debug, Clone)]
pub struct Macro {
    shortcut: Shortcut,
    action: String,
}

impl Macro {
    pub fn new(shortcut: Shortcut, action: impl Into<String>) -> Self {
        Self {
            shortcut,
            action: action.into(),
        }
    }

    pub fn shortcut(&self) -> &Shortcut {
        &self.shortcut
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn label(&self) -> String {
        format!("macro {}", self.shortcut)
    }

    /// 執行動作
    pub fn fire(
        &self,
        engine: &mut ScriptEngine,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Result<RunOutcome, ScriptError> {
        engine.execute(&self.action, None, &self.label(), effects, now)
    }

    /// 序列化為 `#macro` 指令
    pub fn to_statement(&self) -> String {
        let statement = Statement::new("macro")
            .with_argument(Argument::Braced(self.shortcut.to_string()))
            .with_argument(Argument::Braced(collapse_separators(&self.action)));
        format(&statement)
    }
}

/// 巨集管理器
#[derive(Debug, Default)]
pub struct MacroManager {
    macros: Vec<Macro>,
}

impl MacroManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加巨集；相同快捷鍵的巨集會被更新
    pub fn add(&mut self, item: Macro) {
        match self.macros.iter_mut().find(|m| m.shortcut == item.shortcut) {
            Some(existing) => *existing = item,
            None => self.macros.push(item),
        }
    }

    pub fn remove(&mut self, shortcut: &Shortcut) -> Option<Macro> {
        let index = self.macros.iter().position(|m| &m.shortcut == shortcut)?;
        Some(self.macros.remove(index))
    }

    /// 查詢快捷鍵對應的巨集
    pub fn find(&self, shortcut: &Shortcut) -> Option<&Macro> {
        self.macros.iter().find(|m| &m.shortcut == shortcut)
    }

    pub fn list(&self) -> &[Macro] {
        &self.macros
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn clear(&mut self) {
        self.macros.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_any_order() {
        let a = Shortcut::parse("shift+CTRL+f5").unwrap();
        let b: Shortcut = "Ctrl + Shift + F5".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Ctrl + Shift + F5");
    }

    #[test]
    fn test_parse_plain_key() {
        let shortcut = Shortcut::parse("a").unwrap();
        assert_eq!(shortcut.key(), "A");
        assert_eq!(shortcut.modifiers(), Modifiers::default());
    }

    #[test]
    fn test_parse_errors() {
        for text in ["", "ctrl+", "ctrl", "f1+f2", "ctrl+ctrl+a"] {
            assert!(
                matches!(Shortcut::parse(text), Err(ScriptError::InvalidShortcut(_))),
                "{:?} should fail",
                text
            );
        }
    }

    #[test]
    fn test_macro_fires() {
        let item = Macro::new(Shortcut::parse("alt+n").unwrap(), "north;look");
        let mut engine = ScriptEngine::new();
        let mut effects = Vec::new();
        item.fire(&mut engine, &mut effects, Instant::now()).unwrap();
        assert!(matches!(&effects[0], Effect::Send(text) if text == "north\nlook"));
    }

    #[test]
    fn test_manager_upsert() {
        let mut manager = MacroManager::new();
        let shortcut = Shortcut::parse("Ctrl + F1").unwrap();
        manager.add(Macro::new(shortcut.clone(), "flee"));
        manager.add(Macro::new(Shortcut::parse("ctrl+f1").unwrap(), "recall"));

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.find(&shortcut).map(Macro::action), Some("recall"));
    }

    #[test]
    fn test_to_statement() {
        let item = Macro::new(Shortcut::parse("ctrl+f1").unwrap(), "flee\nrecall");
        assert_eq!(item.to_statement(), "#macro {Ctrl + F1} {flee;recall}");
    }
}
