//! 變數函式：`#writevar`、`#checkvar`、`#delvar`
//!
//! 寫入與刪除都先排入佇列，下一條指令開始時才生效。

use super::Function;
use crate::script::{Effect, ExecContext, Flags, Flow, ScriptError};

/// `#writevar <name> <value…>`
pub struct WriteVarFunction;

impl Function for WriteVarFunction {
    fn name(&self) -> &'static str {
        "writevar"
    }

    fn summary(&self) -> &'static str {
        "寫入變數"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, None)
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        ctx.set_var(args[0].clone(), args[1..].join(" "));
        Ok(Flow::Continue)
    }
}

/// `#checkvar <name> [<expected>] [+warn]`
///
/// 變數不存在、為空或不等於預期值時中斷腳本。
pub struct CheckVarFunction;

impl Function for CheckVarFunction {
    fn name(&self) -> &'static str {
        "checkvar"
    }

    fn summary(&self) -> &'static str {
        "檢查變數，不符合時中斷腳本"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(2))
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], flags: &Flags) -> Result<Flow, ScriptError> {
        let name = &args[0];
        let value = ctx.locals().get(name).unwrap_or_default();

        let notice = match args.get(1) {
            _ if value.is_empty() => format!("變數 {} 未設定", name),
            Some(expected) if value != expected.as_str() => {
                format!("變數 {} 為 {}，預期 {}", name, value, expected)
            }
            _ => return Ok(Flow::Continue),
        };

        if flags.get("warn").copied().unwrap_or(false) {
            ctx.emit(Effect::Display(notice));
        }
        Ok(Flow::Stop)
    }
}

/// `#delvar <name>`
pub struct DelVarFunction;

impl Function for DelVarFunction {
    fn name(&self) -> &'static str {
        "delvar"
    }

    fn summary(&self) -> &'static str {
        "刪除變數"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        ctx.delete_var(args[0].clone());
        Ok(Flow::Continue)
    }
}
