//! `#pause`：暫停腳本
//!
//! 參數為秒數或 `min..max` 範圍（範圍內均勻取樣），格式錯誤視為 0。

use std::time::Duration;

use rand::Rng;

use super::Function;
use crate::script::{ExecContext, Flags, Flow, Instruction, ScriptError};

/// 暫停時間設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delay {
    min: f64,
    max: f64,
}

impl Delay {
    /// 解析 `2`、`0.5`、`1..3` 等格式
    pub fn parse(text: &str) -> Self {
        let (min, max) = match text.split_once("..") {
            Some((min, max)) => (seconds(min), seconds(max)),
            None => {
                let value = seconds(text);
                (value, value)
            }
        };

        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// 取得實際暫停時間
    pub fn sample(&self) -> Duration {
        let value = if self.max > self.min {
            rand::thread_rng().gen_range(self.min..=self.max)
        } else {
            self.min
        };
        Duration::from_secs_f64(value)
    }
}

/// 解析秒數，無效或負值為 0
fn seconds(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.max(0.0))
        .unwrap_or(0.0)
}

/// `#pause <seconds | min..max>`
pub struct PauseFunction;

impl Function for PauseFunction {
    fn name(&self) -> &'static str {
        "pause"
    }

    fn summary(&self) -> &'static str {
        "暫停腳本一段時間"
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }

    fn custom_form(&self, args: &[String], _flags: &Flags) -> Option<Instruction> {
        let delay = Delay::parse(args.first()?);
        Some(Instruction::Pause {
            duration: delay.sample(),
        })
    }

    /// 一律以 [`Instruction::Pause`] 編譯，這裡只在直接呼叫函式時使用
    fn run(&self, _ctx: &mut ExecContext<'_>, _args: &[String], _flags: &Flags) -> Result<Flow, ScriptError> {
        Ok(Flow::Suspend(Duration::ZERO))
    }
}
