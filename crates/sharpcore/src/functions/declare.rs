//! 宣告類函式：`#alias`、`#trigger`、`#macro`、`#channel`
//!
//! 這些函式的參數一律不做變數替換，動作文字原樣保存，等到觸發時才替換。

use super::Function;
use crate::alias::Alias;
use crate::keymacro::{Macro, Shortcut};
use crate::script::{Effect, ExecContext, Flags, Flow, ScriptError};
use crate::trigger::Trigger;

/// `#alias <pattern> <action>`
pub struct AliasFunction;

impl Function for AliasFunction {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn summary(&self) -> &'static str {
        "宣告別名"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (2, Some(2))
    }

    fn substitutes(&self) -> bool {
        false
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        let alias = Alias::new(&args[0], &args[1])?;
        ctx.emit(Effect::DeclareAlias(alias));
        Ok(Flow::Continue)
    }
}

/// `#trigger <pattern> <action> [<substitution>] [+mute] [+mark]`
pub struct TriggerFunction;

impl Function for TriggerFunction {
    fn name(&self) -> &'static str {
        "trigger"
    }

    fn summary(&self) -> &'static str {
        "宣告觸發器"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (2, Some(3))
    }

    fn substitutes(&self) -> bool {
        false
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], flags: &Flags) -> Result<Flow, ScriptError> {
        let mut trigger = Trigger::new(&args[0], &args[1])?
            .with_mute(flags.get("mute").copied().unwrap_or(false))
            .with_mark(flags.get("mark").copied().unwrap_or(false));
        if let Some(substitution) = args.get(2).filter(|text| !text.is_empty()) {
            trigger = trigger.with_substitution(substitution.clone());
        }
        ctx.emit(Effect::DeclareTrigger(trigger));
        Ok(Flow::Continue)
    }
}

/// `#macro <shortcut> <action>`
pub struct MacroFunction;

impl Function for MacroFunction {
    fn name(&self) -> &'static str {
        "macro"
    }

    fn summary(&self) -> &'static str {
        "宣告快捷鍵巨集"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (2, Some(2))
    }

    fn substitutes(&self) -> bool {
        false
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        let shortcut = Shortcut::parse(&args[0])?;
        ctx.emit(Effect::DeclareMacro(Macro::new(shortcut, &args[1])));
        Ok(Flow::Continue)
    }
}

/// `#channel <name>`
pub struct ChannelFunction;

impl Function for ChannelFunction {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn summary(&self) -> &'static str {
        "宣告訊息頻道"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }

    fn substitutes(&self) -> bool {
        false
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        ctx.emit(Effect::DeclareChannel(args[0].clone()));
        Ok(Flow::Continue)
    }
}
