//! 輸出類函式：送出、顯示、語音、音效、頻道

use super::Function;
use crate::script::{Effect, ExecContext, Flags, Flow, ScriptError};

/// 旗標值，未指定時為 `false`
fn flag(flags: &Flags, name: &str) -> bool {
    flags.get(name).copied().unwrap_or(false)
}

/// `#send <text>`：送出到 MUD
pub struct SendFunction;

impl Function for SendFunction {
    fn name(&self) -> &'static str {
        "send"
    }

    fn summary(&self) -> &'static str {
        "送出文字到伺服器"
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        ctx.emit(Effect::Send(args.join(" ")));
        Ok(Flow::Continue)
    }
}

/// `#say <text> [+interrupt]`：交給螢幕閱讀器朗讀（別名 `#tts`）
pub struct SayFunction;

impl Function for SayFunction {
    fn name(&self) -> &'static str {
        "say"
    }

    fn summary(&self) -> &'static str {
        "以語音朗讀文字"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, None)
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], flags: &Flags) -> Result<Flow, ScriptError> {
        ctx.emit(Effect::Speak {
            text: args.join(" "),
            interrupt: flag(flags, "interrupt"),
        });
        Ok(Flow::Continue)
    }
}

/// `#display <text>`：只在本地顯示
pub struct DisplayFunction;

impl Function for DisplayFunction {
    fn name(&self) -> &'static str {
        "display"
    }

    fn summary(&self) -> &'static str {
        "在本地顯示文字"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, None)
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        ctx.emit(Effect::Display(args.join(" ")));
        Ok(Flow::Continue)
    }
}

/// `#play <file>`：播放音效
pub struct PlayFunction;

impl Function for PlayFunction {
    fn name(&self) -> &'static str {
        "play"
    }

    fn summary(&self) -> &'static str {
        "播放音效檔"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        ctx.emit(Effect::Play(args[0].clone()));
        Ok(Flow::Continue)
    }
}

/// `#feed <channel> <text>`：寫入頻道
pub struct FeedFunction;

impl Function for FeedFunction {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn summary(&self) -> &'static str {
        "將訊息加入頻道"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (2, None)
    }

    fn run(&self, ctx: &mut ExecContext<'_>, args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        ctx.emit(Effect::Feed {
            channel: args[0].clone(),
            message: args[1..].join(" "),
        });
        Ok(Flow::Continue)
    }
}
