//! Reaction 匹配模式
//!
//! 別名與觸發器共用的模式編譯：
//! - 以 `^` 開頭：原樣作為正則表達式（區分大小寫）
//! - 其他：字面文字，`*` 為捕獲萬用字元，整行錨定、不區分大小寫

use regex::Regex;

use crate::script::ScriptError;

/// 一次匹配的結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCaptures {
    /// 數字捕獲群組，依序對應 `$1`, `$2`…（未參與匹配的群組為空字串）
    pub positional: Vec<String>,
    /// 具名捕獲群組
    pub named: Vec<(String, String)>,
    /// 匹配起點（字元欄位）
    pub start: usize,
    /// 匹配到的整段文字
    pub matched: String,
}

/// 已編譯的匹配模式
#[derive(Debug, Clone)]
pub struct ReactionPattern {
    source: String,
    regex: Regex,
}

impl ReactionPattern {
    /// 編譯模式
    pub fn new(source: impl Into<String>) -> Result<Self, ScriptError> {
        let source = source.into();
        let regex = Regex::new(&Self::translate(&source)).map_err(|e| {
            ScriptError::InvalidPattern {
                pattern: source.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self { source, regex })
    }

    /// 將使用者模式轉為正則表達式
    fn translate(source: &str) -> String {
        if source.starts_with('^') {
            return source.to_string();
        }

        let body = source
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("(.*?)");
        format!("(?i)^{}$", body)
    }

    /// 原始模式文字
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 模式長度（字元數），用於觸發器排序
    pub fn len(&self) -> usize {
        self.source.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// 萬用字元數量，長度相同時越少越具體
    pub fn wildcards(&self) -> usize {
        if self.source.starts_with('^') {
            self.regex.captures_len() - 1
        } else {
            self.source.matches('*').count()
        }
    }

    /// 嘗試匹配文字
    pub fn captures(&self, text: &str) -> Option<MatchCaptures> {
        let caps = self.regex.captures(text)?;
        let whole = caps.get(0)?;

        let positional = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();

        let named = self
            .regex
            .capture_names()
            .enumerate()
            .filter_map(|(i, name)| {
                let name = name?;
                let value = caps.get(i)?;
                Some((name.to_string(), value.as_str().to_string()))
            })
            .collect();

        Some(MatchCaptures {
            positional,
            named,
            start: text[..whole.start()].chars().count(),
            matched: whole.as_str().to_string(),
        })
    }
}
