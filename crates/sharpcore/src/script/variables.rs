//! 變數表與 `$name` 替換
//!
//! 每個腳本引擎擁有一張變數表，觸發器/別名匹配到的捕獲群組也會寫進來：
//! - 數字群組放在 `args`（`$1`, `$2`…）
//! - 具名群組直接成為頂層變數

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::pattern::MatchCaptures;

lazy_static! {
    // 依序嘗試：跳脫的 `\$`、`${name}`、`$name`
    static ref VARIABLE_RE: Regex = Regex::new(r"\\\$|\$\{(\w+)\}|\$(\w+)").unwrap();
}

/// 腳本變數表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals {
    /// 具名變數
    values: HashMap<String, String>,
    /// 最近一次匹配的數字捕獲群組（"1", "2", …）
    args: HashMap<String, String>,
}

impl Locals {
    /// 創建空的變數表
    pub fn new() -> Self {
        Self::default()
    }

    /// 讀取具名變數
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// 設定具名變數
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// 移除具名變數
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    /// 讀取數字捕獲群組
    pub fn arg(&self, index: &str) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// 所有數字捕獲群組
    pub fn args(&self) -> &HashMap<String, String> {
        &self.args
    }

    /// 依名稱查詢：全數字的名稱查 `args`，其餘查具名變數
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
            self.arg(name)
        } else {
            self.get(name)
        }
    }

    /// 寫入一次匹配的捕獲群組，取代先前的 `args`
    pub fn apply_captures(&mut self, captures: &MatchCaptures) {
        self.args = captures
            .positional
            .iter()
            .enumerate()
            .map(|(i, value)| ((i + 1).to_string(), value.clone()))
            .collect();

        for (name, value) in &captures.named {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// 逐一列出具名變數
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 將文字中的 `$name` / `${name}` 替換為變數值
///
/// 找不到的變數替換為空字串；`\$` 還原為字面上的 `$`。
pub fn replace_variables(text: &str, locals: &Locals) -> String {
    if !text.contains('$') {
        return text.to_string();
    }

    VARIABLE_RE
        .replace_all(text, |caps: &Captures| {
            match caps.get(1).or_else(|| caps.get(2)) {
                Some(name) => locals.lookup(name.as_str()).unwrap_or_default().to_string(),
                None => "$".to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> Locals {
        let mut locals = Locals::new();
        for (k, v) in pairs {
            locals.set(*k, *v);
        }
        locals
    }

    #[test]
    fn test_replace_simple() {
        let locals = table(&[("n", "5")]);
        assert_eq!(replace_variables("$n", &locals), "5");
    }

    #[test]
    fn test_replace_braced() {
        let locals = table(&[("n", "5")]);
        assert_eq!(replace_variables("${n}X", &locals), "5X");
    }

    #[test]
    fn test_escaped_dollar() {
        assert_eq!(replace_variables("\\$n", &Locals::new()), "$n");
        assert_eq!(replace_variables("costs \\$5", &table(&[("5", "x")])), "costs $5");
    }

    #[test]
    fn test_missing_variable_is_empty() {
        assert_eq!(replace_variables("hp: $hp!", &Locals::new()), "hp: !");
    }

    #[test]
    fn test_positional_args() {
        let mut locals = Locals::new();
        locals.apply_captures(&MatchCaptures {
            positional: vec!["sword".to_string(), "orc".to_string()],
            ..Default::default()
        });
        assert_eq!(replace_variables("wield $1;kill $2", &locals), "wield sword;kill orc");
        assert_eq!(replace_variables("$3", &locals), "");
    }

    #[test]
    fn test_named_captures_become_variables() {
        let mut locals = Locals::new();
        locals.apply_captures(&MatchCaptures {
            positional: vec!["42".to_string()],
            named: vec![("gold".to_string(), "42".to_string())],
            ..Default::default()
        });
        assert_eq!(locals.get("gold"), Some("42"));
        assert_eq!(replace_variables("${gold}g", &locals), "42g");
    }

    #[test]
    fn test_captures_replace_previous_args() {
        let mut locals = Locals::new();
        locals.apply_captures(&MatchCaptures {
            positional: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        });
        locals.apply_captures(&MatchCaptures {
            positional: vec!["c".to_string()],
            ..Default::default()
        });
        assert_eq!(locals.arg("1"), Some("c"));
        assert_eq!(locals.arg("2"), None);
    }

    #[test]
    fn test_unclosed_brace_left_alone() {
        let locals = table(&[("n", "5")]);
        assert_eq!(replace_variables("${n", &locals), "${n");
    }
}
