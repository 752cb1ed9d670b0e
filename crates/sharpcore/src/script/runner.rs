//! 腳本執行器
//!
//! 依序執行編譯後的指令。`#pause` 不會阻塞：執行器把剩餘指令、位置與變數表
//! 打包成 [`Continuation`] 交回呼叫端，時間到了再從下一條指令繼續。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::block;
use super::compiler::{Instruction, Value};
use super::splitter::Flags;
use super::variables::Locals;
use super::ScriptError;
use crate::alias::Alias;
use crate::functions::FunctionRegistry;
use crate::keymacro::Macro;
use crate::trigger::Trigger;

/// 函式執行後的副作用，由 World 在執行結束（或暫停）後依序套用
#[derive(Debug, Clone)]
pub enum Effect {
    /// 送出到 MUD（會經過別名與命令堆疊處理）
    Send(String),
    /// 本地顯示
    Display(String),
    /// 無障礙語音輸出
    Speak { text: String, interrupt: bool },
    /// 播放音效
    Play(String),
    /// 寫入頻道
    Feed { channel: String, message: String },
    /// 宣告或更新別名
    DeclareAlias(Alias),
    /// 宣告或更新觸發器
    DeclareTrigger(Trigger),
    /// 宣告或更新巨集
    DeclareMacro(Macro),
    /// 宣告頻道
    DeclareChannel(String),
}

/// 函式執行後的流程控制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// 繼續下一條指令
    Continue,
    /// 暫停指定時間
    Suspend(Duration),
    /// 中斷整個腳本（不是錯誤）
    Stop,
}

/// 變數表的一筆變更
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Set(String, String),
    Delete(String),
}

impl Change {
    pub fn apply(self, locals: &mut Locals) {
        match self {
            Change::Set(name, value) => locals.set(name, value),
            Change::Delete(name) => {
                locals.remove(&name);
            }
        }
    }
}

/// 單次執行期間函式可存取的上下文
pub struct ExecContext<'a> {
    locals: Locals,
    to_set: Vec<(String, String)>,
    to_del: Vec<String>,
    /// 已生效的變更，依發生順序
    changes: Vec<Change>,
    effects: &'a mut Vec<Effect>,
}

impl<'a> ExecContext<'a> {
    pub fn new(locals: Locals, effects: &'a mut Vec<Effect>) -> Self {
        Self {
            locals,
            to_set: Vec::new(),
            to_del: Vec::new(),
            changes: Vec::new(),
            effects,
        }
    }

    /// 目前已生效的變數
    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// 排入變數寫入，下一條指令開始時生效
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.to_set.push((name.into(), value.into()));
    }

    /// 排入變數刪除，下一條指令開始時生效
    pub fn delete_var(&mut self, name: impl Into<String>) {
        self.to_del.push(name.into());
    }

    /// 產生副作用
    pub fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub(crate) fn commit(&mut self) {
        for (name, value) in self.to_set.drain(..) {
            self.locals.set(name.clone(), value.clone());
            self.changes.push(Change::Set(name, value));
        }
        for name in self.to_del.drain(..) {
            self.locals.remove(&name);
            self.changes.push(Change::Delete(name));
        }
    }

    pub(crate) fn finish(self) -> Locals {
        self.settle().0
    }

    /// 提交剩餘寫入，回傳變數表與這段執行的全部變更
    pub(crate) fn settle(mut self) -> (Locals, Vec<Change>) {
        self.commit();
        (self.locals, self.changes)
    }
}

/// 一次執行的狀態：指令序列、目前位置與變數表
#[derive(Debug, Clone)]
pub struct Run {
    program: Arc<[Instruction]>,
    position: usize,
    locals: Locals,
    label: String,
}

impl Run {
    pub fn new(program: Vec<Instruction>, locals: Locals, label: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            position: 0,
            locals,
            label: label.into(),
        }
    }

    /// 剩餘未執行的指令數
    pub fn remaining(&self) -> usize {
        self.program.len().saturating_sub(self.position)
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// 暫停中的腳本
#[derive(Debug, Clone)]
pub struct Continuation {
    run: Run,
    due: Instant,
    generation: u64,
}

impl Continuation {
    pub(crate) fn new(run: Run, due: Instant, generation: u64) -> Self {
        Self { run, due, generation }
    }

    /// 預定恢復的時間
    pub fn due(&self) -> Instant {
        self.due
    }

    /// 建立時的引擎世代
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 啟動這個腳本的來源（別名、觸發器…）
    pub fn label(&self) -> &str {
        &self.run.label
    }

    /// 暫停當下的變數表快照
    pub fn locals(&self) -> &Locals {
        &self.run.locals
    }

    pub(crate) fn into_run(self) -> Run {
        self.run
    }
}

/// 執行結果
#[derive(Debug)]
pub enum RunOutcome {
    /// 所有指令執行完畢
    Completed,
    /// 遇到暫停，等待恢復
    Suspended(Continuation),
    /// 被函式中斷
    Aborted,
    /// 引擎已重設，這個暫停的腳本被丟棄
    Cancelled,
}

/// 執行器內部的單步結果
///
/// 每種結果都帶著這一段執行對變數表的變更，由引擎合併回自己的變數表。
pub(crate) enum Step {
    Completed(Vec<Change>),
    Suspended {
        run: Run,
        delay: Duration,
        changes: Vec<Change>,
    },
    Aborted(Vec<Change>),
    Failed(Vec<Change>, ScriptError),
}

/// 依序執行指令
pub(crate) struct Runner<'a> {
    functions: &'a FunctionRegistry,
}

impl<'a> Runner<'a> {
    pub(crate) fn new(functions: &'a FunctionRegistry) -> Self {
        Self { functions }
    }

    pub(crate) fn execute(&self, run: Run, effects: &mut Vec<Effect>) -> Step {
        let Run {
            program,
            mut position,
            locals,
            label,
        } = run;
        let mut ctx = ExecContext::new(locals, effects);

        while position < program.len() {
            ctx.commit();
            let flow = {
                let instruction = &program[position];
                self.step(instruction, &mut ctx)
            };
            position += 1;

            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Suspend(delay)) => {
                    debug!(script = %label, ?delay, "腳本暫停");
                    let (locals, changes) = ctx.settle();
                    return Step::Suspended {
                        run: Run {
                            program,
                            position,
                            locals,
                            label,
                        },
                        delay,
                        changes,
                    };
                }
                Ok(Flow::Stop) => {
                    debug!(script = %label, "腳本被中斷");
                    return Step::Aborted(ctx.settle().1);
                }
                Err(err) => return Step::Failed(ctx.settle().1, err),
            }
        }

        Step::Completed(ctx.settle().1)
    }

    fn step(&self, instruction: &Instruction, ctx: &mut ExecContext<'_>) -> Result<Flow, ScriptError> {
        match instruction {
            Instruction::Pause { duration } => Ok(Flow::Suspend(*duration)),
            Instruction::RawBlock { source } => {
                block::run_block(source, ctx)?;
                Ok(Flow::Continue)
            }
            Instruction::Call {
                function,
                args,
                flags,
            } => self.call(function, args, flags, ctx),
        }
    }

    fn call(
        &self,
        name: &str,
        args: &[Value],
        flags: &Flags,
        ctx: &mut ExecContext<'_>,
    ) -> Result<Flow, ScriptError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ScriptError::UnknownFunction(name.to_string()))?;
        let args: Vec<String> = args.iter().map(|value| value.resolve(ctx.locals())).collect();
        function.run(ctx, &args, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::compiler::compile_script;

    fn run_source(source: &str, locals: Locals) -> (Step, Vec<Effect>) {
        let functions = FunctionRegistry::with_builtins();
        let program = compile_script(source, Some(&locals), &functions).unwrap();
        let mut effects = Vec::new();
        let step = Runner::new(&functions).execute(Run::new(program, locals, "test"), &mut effects);
        (step, effects)
    }

    fn sent(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Send(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_runs_in_order() {
        let (step, effects) = run_source("north\n#say hello\nsouth", Locals::new());
        assert!(matches!(step, Step::Completed(..)));
        assert_eq!(effects.len(), 3);
        assert!(matches!(&effects[1], Effect::Speak { text, .. } if text == "hello"));
        assert_eq!(sent(&effects), vec!["north", "south"]);
    }

    #[test]
    fn test_pause_suspends_with_remaining_calls() {
        let (step, effects) = run_source("#send first\n#pause 2\n#send ok", Locals::new());
        assert_eq!(sent(&effects), vec!["first"]);
        match step {
            Step::Suspended { run, delay, .. } => {
                assert_eq!(delay, Duration::from_secs(2));
                assert_eq!(run.remaining(), 1);
            }
            _ => panic!("expected suspension"),
        }
    }

    #[test]
    fn test_resume_continues_after_pause() {
        let functions = FunctionRegistry::with_builtins();
        let program = compile_script("#pause 1\n#send $x", Some(&Locals::new()), &functions).unwrap();
        let mut locals = Locals::new();
        locals.set("x", "ok");

        let mut effects = Vec::new();
        let run = match Runner::new(&functions).execute(Run::new(program, locals, "test"), &mut effects) {
            Step::Suspended { run, .. } => run,
            _ => panic!("expected suspension"),
        };
        assert!(effects.is_empty());

        let step = Runner::new(&functions).execute(run, &mut effects);
        assert!(matches!(step, Step::Completed(..)));
        assert_eq!(sent(&effects), vec!["ok"]);
    }

    #[test]
    fn test_writes_visible_from_next_call() {
        let (step, effects) = run_source("#writevar hp 10\n#send hp=$hp", Locals::new());
        assert_eq!(sent(&effects), vec!["hp=10"]);
        match step {
            Step::Completed(changes) => {
                assert_eq!(changes, vec![Change::Set("hp".to_string(), "10".to_string())])
            }
            _ => panic!("expected completion"),
        }
    }

    #[test]
    fn test_checkvar_stops_silently() {
        let (step, effects) = run_source("#checkvar target\n#send kill $target", Locals::new());
        assert!(matches!(step, Step::Aborted(..)));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_checkvar_passes() {
        let mut locals = Locals::new();
        locals.set("target", "orc");
        let (step, effects) = run_source("#checkvar target\n#send kill $target", locals);
        assert!(matches!(step, Step::Completed(..)));
        assert_eq!(sent(&effects), vec!["kill orc"]);
    }

    #[test]
    fn test_delete_var() {
        let mut locals = Locals::new();
        locals.set("target", "orc");
        let (step, effects) = run_source("#delvar target\n#send [$target]", locals);
        assert_eq!(sent(&effects), vec!["[]"]);
        match step {
            Step::Completed(changes) => assert_eq!(changes, vec![Change::Delete("target".to_string())]),
            _ => panic!("expected completion"),
        }
    }

    #[test]
    fn test_step_reports_changes_in_order() {
        let (step, _) = run_source("#writevar hp 10
#delvar target
#writevar hp 20", Locals::new());
        match step {
            Step::Completed(changes) => assert_eq!(
                changes,
                vec![
                    Change::Set("hp".to_string(), "10".to_string()),
                    Change::Delete("target".to_string()),
                    Change::Set("hp".to_string(), "20".to_string()),
                ]
            ),
            _ => panic!("expected completion"),
        }
    }
}
