//! SharpScript 腳本引擎
//!
//! 處理流程：原始文字 → [`split`] 切分為語句 → [`compile`] 編譯為指令 →
//! 執行器依序呼叫函式。`#pause` 會讓執行暫停並回傳 [`Continuation`]，
//! 由呼叫端在時間到時交給 [`ScriptEngine::resume`] 繼續。

mod block;
mod compiler;
mod runner;
mod splitter;
mod variables;

use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::functions::FunctionRegistry;
use crate::pattern::MatchCaptures;
use runner::{Change, Run, Runner, Step};

pub use compiler::{compile, compile_script, Instruction, Value};
pub use runner::{Continuation, Effect, ExecContext, Flow, RunOutcome};
pub use splitter::{
    collapse_separators, expand_separators, format, format_argument, split, unescape_separators,
    Argument, Flags, Statement,
};
pub use variables::{replace_variables, Locals};

/// 腳本錯誤
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("第 {line} 行的大括號未閉合")]
    UnbalancedBrace { line: usize },

    #[error("未知的函式: #{0}")]
    UnknownFunction(String),

    #[error("#{function} 參數錯誤: {reason}")]
    InvalidArguments { function: String, reason: String },

    #[error("無效的模式 {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("無效的快捷鍵: {0}")]
    InvalidShortcut(String),

    #[error("Lua 錯誤: {0}")]
    Block(String),

    #[error("#{function} 執行失敗: {reason}")]
    Function { function: String, reason: String },
}

impl ScriptError {
    /// 是否為編譯階段的錯誤（腳本完全沒有執行）
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            ScriptError::UnbalancedBrace { .. }
                | ScriptError::UnknownFunction(_)
                | ScriptError::InvalidArguments { .. }
        )
    }
}

impl From<mlua::Error> for ScriptError {
    fn from(err: mlua::Error) -> Self {
        ScriptError::Block(err.to_string())
    }
}

/// 腳本引擎：變數表、函式註冊表與世代計數
pub struct ScriptEngine {
    locals: Locals,
    functions: FunctionRegistry,
    /// 每次重設引擎時遞增，舊世代的暫停腳本恢復時直接丟棄
    generation: u64,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    /// 創建使用內建函式的引擎
    pub fn new() -> Self {
        Self::with_functions(FunctionRegistry::with_builtins())
    }

    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self {
            locals: Locals::new(),
            functions,
            generation: 0,
        }
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    pub fn locals_mut(&mut self) -> &mut Locals {
        &mut self.locals
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 使所有暫停中的腳本失效
    pub fn invalidate(&mut self) {
        self.generation += 1;
        debug!(generation = self.generation, "腳本引擎世代更新");
    }

    /// 編譯腳本；`vars` 為 `Some` 時參數做變數替換
    pub fn compile(&self, source: &str, vars: Option<&Locals>) -> Result<Vec<Instruction>, ScriptError> {
        compile_script(source, vars, &self.functions)
    }

    /// 執行腳本（參數做變數替換）
    ///
    /// `captures` 為觸發這次執行的匹配結果，會先寫入變數表。
    pub fn execute(
        &mut self,
        source: &str,
        captures: Option<&MatchCaptures>,
        label: &str,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Result<RunOutcome, ScriptError> {
        if let Some(captures) = captures {
            self.locals.apply_captures(captures);
        }
        let program = compile_script(source, Some(&self.locals), &self.functions)?;
        self.start(program, label, effects, now)
    }

    /// 執行腳本，不做變數替換（載入設定檔用）
    pub fn execute_raw(
        &mut self,
        source: &str,
        label: &str,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Result<RunOutcome, ScriptError> {
        let program = compile_script(source, None, &self.functions)?;
        self.start(program, label, effects, now)
    }

    /// 恢復暫停中的腳本
    pub fn resume(
        &mut self,
        continuation: Continuation,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Result<RunOutcome, ScriptError> {
        if continuation.generation() != self.generation {
            debug!(
                script = continuation.label(),
                generation = continuation.generation(),
                "丟棄舊世代的暫停腳本"
            );
            return Ok(RunOutcome::Cancelled);
        }
        self.drive(continuation.into_run(), effects, now)
    }

    fn start(
        &mut self,
        program: Vec<Instruction>,
        label: &str,
        effects: &mut Vec<Effect>,
        now: Instant,
    ) -> Result<RunOutcome, ScriptError> {
        let run = Run::new(program, self.locals.clone(), label);
        self.drive(run, effects, now)
    }

    /// 執行到結束或暫停，並把這段執行的變更合併回引擎
    ///
    /// 暫停中的腳本保有自己的快照；其他腳本在這段期間寫入的變數不會被覆蓋。
    fn drive(&mut self, run: Run, effects: &mut Vec<Effect>, now: Instant) -> Result<RunOutcome, ScriptError> {
        let step = Runner::new(&self.functions).execute(run, effects);
        match step {
            Step::Completed(changes) => {
                self.merge(changes);
                Ok(RunOutcome::Completed)
            }
            Step::Suspended { run, delay, changes } => {
                self.merge(changes);
                Ok(RunOutcome::Suspended(Continuation::new(
                    run,
                    now + delay,
                    self.generation,
                )))
            }
            Step::Aborted(changes) => {
                self.merge(changes);
                Ok(RunOutcome::Aborted)
            }
            Step::Failed(changes, err) => {
                self.merge(changes);
                Err(err)
            }
        }
    }

    fn merge(&mut self, changes: Vec<Change>) {
        for change in changes {
            change.apply(&mut self.locals);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sent(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Send(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_line_is_one_send() {
        let statements = split("kill orc").unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].function, "send");
    }

    #[test]
    fn test_pause_then_send() {
        let mut engine = ScriptEngine::new();
        engine.locals_mut().set("hp", "100");
        let now = Instant::now();

        let mut effects = Vec::new();
        let continuation = match engine.execute("#pause 2\n#send ok", None, "test", &mut effects, now).unwrap() {
            RunOutcome::Suspended(continuation) => continuation,
            other => panic!("expected suspension, got {:?}", other),
        };
        assert!(effects.is_empty());
        assert_eq!(continuation.due(), now + Duration::from_secs(2));
        assert_eq!(continuation.locals(), engine.locals());

        let later = now + Duration::from_secs(2);
        let outcome = engine.resume(continuation, &mut effects, later).unwrap();
        assert!(matches!(outcome, RunOutcome::Completed));
        assert_eq!(sent(&effects), vec!["ok"]);
        assert_eq!(engine.locals().get("hp"), Some("100"));
    }

    #[test]
    fn test_resume_keeps_writes_from_other_runs() {
        let mut engine = ScriptEngine::new();
        let now = Instant::now();
        let mut effects = Vec::new();
        let continuation = match engine
            .execute("#pause 1\n#writevar done yes", None, "paused", &mut effects, now)
            .unwrap()
        {
            RunOutcome::Suspended(continuation) => continuation,
            other => panic!("expected suspension, got {:?}", other),
        };

        engine.execute("#writevar hp 50", None, "other", &mut effects, now).unwrap();
        assert_eq!(engine.locals().get("hp"), Some("50"));

        engine.resume(continuation, &mut effects, now + Duration::from_secs(1)).unwrap();
        assert_eq!(engine.locals().get("hp"), Some("50"));
        assert_eq!(engine.locals().get("done"), Some("yes"));
    }

    #[test]
    fn test_stale_generation_is_cancelled() {
        let mut engine = ScriptEngine::new();
        let now = Instant::now();
        let mut effects = Vec::new();
        let continuation = match engine.execute("#pause 1\n#send late", None, "test", &mut effects, now).unwrap() {
            RunOutcome::Suspended(continuation) => continuation,
            other => panic!("expected suspension, got {:?}", other),
        };

        engine.invalidate();
        let outcome = engine.resume(continuation, &mut effects, now + Duration::from_secs(1)).unwrap();
        assert!(matches!(outcome, RunOutcome::Cancelled));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_captures_fill_args() {
        let mut engine = ScriptEngine::new();
        let captures = MatchCaptures {
            positional: vec!["orc".to_string()],
            ..Default::default()
        };
        let mut effects = Vec::new();
        engine
            .execute("kill $1", Some(&captures), "test", &mut effects, Instant::now())
            .unwrap();
        assert_eq!(sent(&effects), vec!["kill orc"]);
    }

    #[test]
    fn test_raw_execution_keeps_placeholders() {
        let mut engine = ScriptEngine::new();
        engine.locals_mut().set("x", "1");
        let mut effects = Vec::new();
        engine
            .execute_raw("#send {$x}", "config", &mut effects, Instant::now())
            .unwrap();
        assert_eq!(sent(&effects), vec!["$x"]);
    }

    #[test]
    fn test_failure_keeps_earlier_effects_and_vars() {
        let mut engine = ScriptEngine::new();
        let mut effects = Vec::new();
        let err = engine
            .execute(
                "#writevar seen yes\n#send before\n{+ error('boom') }\n#send after",
                None,
                "test",
                &mut effects,
                Instant::now(),
            )
            .unwrap_err();
        assert!(matches!(err, ScriptError::Block(_)));
        assert!(!err.is_parse_failure());
        assert_eq!(sent(&effects), vec!["before"]);
        assert_eq!(engine.locals().get("seen"), Some("yes"));
    }

    #[test]
    fn test_parse_failure_runs_nothing() {
        let mut engine = ScriptEngine::new();
        let mut effects = Vec::new();
        let err = engine
            .execute("#send first\n#nosuch thing", None, "test", &mut effects, Instant::now())
            .unwrap_err();
        assert!(err.is_parse_failure());
        assert!(effects.is_empty());
    }
}
