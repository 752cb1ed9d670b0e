//! 語句切分
//!
//! 將腳本原始文字切分為 [`Statement`]：
//! - `#name arg {brace arg} +flag -flag`：呼叫函式
//! - 其他文字：隱含的 `#send`，整行作為唯一參數
//! - `##text`：跳脫，送出字面上的 `#text`
//! - `{+ code }`：嵌入的 Lua 區塊
//!
//! 大括號以深度計數配對，可跨行；未閉合視為解析失敗。

use std::collections::BTreeMap;

use super::ScriptError;

/// 沒有 `#` 開頭時使用的函式
pub const IMPLICIT_FUNCTION: &str = "send";

/// 獨立 Lua 區塊語句的函式名稱
pub const BLOCK_FUNCTION: &str = "+";

/// 語句旗標（`+name` / `-name`）
pub type Flags = BTreeMap<String, bool>;

/// 語句參數
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// 以空白分隔的單字
    Plain(String),
    /// 大括號內的文字（不含外層大括號）
    Braced(String),
    /// `{+ ... }` 嵌入程式碼
    Foreign(String),
}

impl Argument {
    /// 參數文字內容
    pub fn text(&self) -> &str {
        match self {
            Argument::Plain(s) | Argument::Braced(s) | Argument::Foreign(s) => s,
        }
    }
}

/// 一條已切分的語句
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statement {
    pub function: String,
    pub arguments: Vec<Argument>,
    pub flags: Flags,
}

impl Statement {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Default::default()
        }
    }

    /// 隱含的 `#send`
    pub fn implicit(text: impl Into<String>) -> Self {
        Self::new(IMPLICIT_FUNCTION).with_argument(Argument::Plain(text.into()))
    }

    /// 獨立的 Lua 區塊
    pub fn block(source: impl Into<String>) -> Self {
        Self::new(BLOCK_FUNCTION).with_argument(Argument::Foreign(source.into()))
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    pub fn is_block(&self) -> bool {
        self.function == BLOCK_FUNCTION
    }
}

/// 切分腳本為語句序列
pub fn split(content: &str) -> Result<Vec<Statement>, ScriptError> {
    let mut scanner = Scanner::new(content);
    let mut statements = Vec::new();

    loop {
        scanner.skip_blank();
        let Some(first) = scanner.peek() else {
            break;
        };

        let statement = match (first, scanner.peek_at(1)) {
            ('#', Some('#')) => {
                scanner.bump();
                Statement::implicit(scanner.rest_of_line())
            }
            ('#', Some(next)) if !next.is_whitespace() => {
                scanner.bump();
                scanner.function_statement()?
            }
            ('{', Some('+')) => {
                let inner = scanner.braced()?;
                Statement::block(foreign_source(&inner))
            }
            _ => Statement::implicit(scanner.rest_of_line()),
        };
        statements.push(statement);
    }

    Ok(statements)
}

/// 將語句重新序列化為標準形式
pub fn format(statement: &Statement) -> String {
    if statement.is_block() {
        let source = statement.arguments.first().map(Argument::text).unwrap_or_default();
        return format_argument(&Argument::Foreign(source.to_string()));
    }

    let mut parts = vec![format!("#{}", statement.function)];
    parts.extend(statement.arguments.iter().map(format_argument));
    parts.extend(
        statement
            .flags
            .iter()
            .map(|(name, value)| format!("{}{}", if *value { '+' } else { '-' }, name)),
    );
    parts.join(" ")
}

/// 序列化單一參數，必要時加上大括號
pub fn format_argument(argument: &Argument) -> String {
    match argument {
        Argument::Foreign(source) => format!("{{+ {} }}", source),
        Argument::Plain(text) | Argument::Braced(text) => {
            if needs_braces(text) {
                format!("{{{}}}", text)
            } else {
                text.clone()
            }
        }
    }
}

fn needs_braces(text: &str) -> bool {
    text.is_empty()
        || text.starts_with(['#', '+', '-'])
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | ';'))
}

/// 大括號參數內的分號：單一 `;` 轉為換行（新語句），`;;` 轉為跳脫的 `\;`
///
/// `\;` 在之後的每一層展開都保持不變，直到文字離開腳本（送出、顯示）時才由
/// [`unescape_separators`] 還原為 `;`。
pub fn expand_separators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                chars.next();
                out.push_str("\\;");
            }
            ';' if chars.peek() == Some(&';') => {
                chars.next();
                out.push_str("\\;");
            }
            ';' => out.push('\n'),
            _ => out.push(c),
        }
    }

    out
}

/// [`expand_separators`] 的反向操作，用於把多行動作寫回單行設定
pub fn collapse_separators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                chars.next();
                out.push_str(";;");
            }
            ';' => out.push_str(";;"),
            '\n' => out.push(';'),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// 還原跳脫的分號
pub fn unescape_separators(text: &str) -> String {
    text.replace("\\;", ";")
}

fn foreign_source(inner: &str) -> String {
    inner.strip_prefix('+').unwrap_or(inner).trim().to_string()
}

/// `+name` → (name, true)，`-name` → (name, false)
fn parse_flag(word: &str) -> Option<(String, bool)> {
    let mut chars = word.chars();
    let value = match chars.next()? {
        '+' => true,
        '-' => false,
        _ => return None,
    };

    let name = chars.as_str();
    let starts_alpha = name.chars().next().is_some_and(char::is_alphabetic);
    if starts_alpha && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Some((name.to_string(), value))
    } else {
        None
    }
}

// ============================================================================
// Scanner
// ============================================================================

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(content: &str) -> Self {
        Self {
            chars: content.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// 略過語句之間的空白（含換行）
    fn skip_blank(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// 略過同一行內的空白
    fn skip_inline_space(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace() && c != '\n') {
            self.bump();
        }
    }

    /// 讀到行尾（不含換行），去除尾端空白
    fn rest_of_line(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        text.trim_end().to_string()
    }

    /// 讀取一個以空白結束的單字
    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }

    /// 目前位於 `{`，回傳配對大括號內的文字
    fn braced(&mut self) -> Result<String, ScriptError> {
        let line = self.line;
        self.bump();

        let mut depth = 1usize;
        let mut inner = String::new();
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            inner.push(c);
        }

        Err(ScriptError::UnbalancedBrace { line })
    }

    /// `#` 之後：函式名稱與參數，直到大括號外的換行
    fn function_statement(&mut self) -> Result<Statement, ScriptError> {
        let mut statement = Statement::new(self.word().to_lowercase());

        loop {
            self.skip_inline_space();
            match self.peek() {
                None | Some('\n') => break,
                Some('{') => {
                    let argument = if self.peek_at(1) == Some('+') {
                        Argument::Foreign(foreign_source(&self.braced()?))
                    } else {
                        Argument::Braced(self.braced()?)
                    };
                    statement.arguments.push(argument);
                }
                Some(_) => {
                    let word = self.word();
                    match parse_flag(&word) {
                        Some((name, value)) => {
                            statement.flags.insert(name, value);
                        }
                        None => statement.arguments.push(Argument::Plain(word)),
                    }
                }
            }
        }

        Ok(statement)
    }
}
