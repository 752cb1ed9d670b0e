//! 語句編譯
//!
//! 將 [`Statement`] 轉為執行器可直接解讀的 [`Instruction`]，不產生任何動態程式碼。

use std::time::Duration;

use super::splitter::{self, expand_separators, format_argument, Argument, Flags, Statement};
use super::variables::{replace_variables, Locals};
use super::ScriptError;
use crate::functions::FunctionRegistry;

/// 呼叫參數
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// 原樣傳遞
    Literal(String),
    /// 執行當下才做變數替換
    Template(String),
    /// 嵌入的 Lua 區塊，不做任何處理
    Block(String),
}

impl Value {
    /// 取得實際傳給函式的文字
    pub fn resolve(&self, locals: &Locals) -> String {
        match self {
            Value::Literal(text) => text.clone(),
            Value::Template(text) => replace_variables(text, locals),
            Value::Block(source) => format_argument(&Argument::Foreign(source.clone())),
        }
    }
}

/// 編譯後的指令
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// 呼叫已註冊的函式
    Call {
        function: String,
        args: Vec<Value>,
        flags: Flags,
    },
    /// 暫停指定時間後繼續
    Pause { duration: Duration },
    /// 直接執行的 Lua 區塊
    RawBlock { source: String },
}

/// 編譯單一語句
///
/// `vars` 為 `Some` 時參數會做變數替換：一般呼叫在執行當下替換，
/// 自訂編譯形式（如 `#pause`）則立即以這張表替換。
pub fn compile(
    statement: &Statement,
    vars: Option<&Locals>,
    functions: &FunctionRegistry,
) -> Result<Instruction, ScriptError> {
    if statement.is_block() {
        let source = statement.arguments.first().map(Argument::text).unwrap_or_default();
        return Ok(Instruction::RawBlock {
            source: source.to_string(),
        });
    }

    let function = functions
        .get(&statement.function)
        .ok_or_else(|| ScriptError::UnknownFunction(statement.function.clone()))?;
    let vars = vars.filter(|_| function.substitutes());

    let literals: Vec<String> = statement
        .arguments
        .iter()
        .map(|argument| match argument {
            Argument::Foreign(_) => format_argument(argument),
            other => expand_separators(other.text()),
        })
        .collect();
    function.validate(&literals, &statement.flags)?;

    let custom_args: Vec<String> = match vars {
        Some(table) => literals.iter().map(|text| replace_variables(text, table)).collect(),
        None => literals,
    };
    if let Some(instruction) = function.custom_form(&custom_args, &statement.flags) {
        return Ok(instruction);
    }

    let args = statement
        .arguments
        .iter()
        .map(|argument| match argument {
            Argument::Foreign(source) => Value::Block(source.clone()),
            other => {
                let text = expand_separators(other.text());
                if vars.is_some() {
                    Value::Template(text)
                } else {
                    Value::Literal(text)
                }
            }
        })
        .collect();

    Ok(Instruction::Call {
        function: statement.function.clone(),
        args,
        flags: statement.flags.clone(),
    })
}

/// 切分並編譯整段腳本
pub fn compile_script(
    source: &str,
    vars: Option<&Locals>,
    functions: &FunctionRegistry,
) -> Result<Vec<Instruction>, ScriptError> {
    splitter::split(source)?
        .iter()
        .map(|statement| compile(statement, vars, functions))
        .collect()
}
