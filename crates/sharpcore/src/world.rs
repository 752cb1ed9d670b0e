//! World：一個 MUD 連線的完整狀態
//!
//! 持有腳本引擎、別名、觸發器、巨集、頻道與暫停中的腳本，是所有事件的進入點：
//! - [`World::handle_message`]：伺服器送來的文字
//! - [`World::handle_input`]：使用者輸入
//! - [`World::handle_key`]：快捷鍵
//! - [`World::poll_timers`]：計時器，恢復到期的暫停腳本
//!
//! 腳本函式只產生 [`Effect`]，由 World 在執行後依序套用。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::alias::AliasManager;
use crate::channel::ChannelManager;
use crate::client::{Client, OutputFlags, OutputSink};
use crate::config::WorldSettings;
use crate::keymacro::{MacroManager, Shortcut};
use crate::script::{
    format, unescape_separators, Argument, Continuation, Effect, Locals, RunOutcome, ScriptEngine,
    ScriptError, Statement,
};
use crate::trigger::TriggerManager;

/// 別名展開的最大遞迴深度
pub const MAX_SEND_DEPTH: usize = 50;

/// 多個任務共用的 World
pub type SharedWorld = Arc<Mutex<World>>;

/// 取得 World 的鎖；持有鎖的任務 panic 後仍可繼續使用
pub fn lock_world(world: &SharedWorld) -> MutexGuard<'_, World> {
    world.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 游標標記位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    /// 在 [`Reception::lines`] 中的索引
    pub line: usize,
    /// 匹配起點（字元欄位）
    pub column: usize,
}

/// 一批伺服器文字的處理結果
#[derive(Debug, Default)]
pub struct Reception {
    /// 實際顯示的行（經過取代與靜音）
    pub lines: Vec<String>,
    /// 這批文字中第一個 `+mark` 觸發器的位置
    pub mark: Option<Mark>,
}

pub struct World {
    settings: WorldSettings,
    engine: ScriptEngine,
    aliases: AliasManager,
    triggers: TriggerManager,
    macros: MacroManager,
    channels: ChannelManager,
    client: Option<Box<dyn Client>>,
    sink: Box<dyn OutputSink>,
    pending: Vec<Continuation>,
    /// 展開中的別名模式，避免別名展開自己
    expanding: Vec<String>,
}

impl World {
    pub fn new(settings: WorldSettings, sink: Box<dyn OutputSink>) -> Self {
        Self {
            settings,
            engine: ScriptEngine::new(),
            aliases: AliasManager::new(),
            triggers: TriggerManager::new(),
            macros: MacroManager::new(),
            channels: ChannelManager::new(),
            client: None,
            sink,
            pending: Vec::new(),
            expanding: Vec::new(),
        }
    }

    pub fn into_shared(self) -> SharedWorld {
        Arc::new(Mutex::new(self))
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut WorldSettings {
        &mut self.settings
    }

    pub fn engine(&self) -> &ScriptEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ScriptEngine {
        &mut self.engine
    }

    pub fn aliases(&self) -> &AliasManager {
        &self.aliases
    }

    pub fn triggers(&self) -> &TriggerManager {
        &self.triggers
    }

    pub fn macros(&self) -> &MacroManager {
        &self.macros
    }

    pub fn channels(&self) -> &ChannelManager {
        &self.channels
    }

    // ========================================================================
    // 連線
    // ========================================================================

    pub fn bind_client(&mut self, client: Box<dyn Client>) {
        info!(world = %self.settings.name, "已綁定連線");
        self.client = Some(client);
    }

    pub fn unbind_client(&mut self) -> Option<Box<dyn Client>> {
        info!(world = %self.settings.name, "已解除連線");
        self.client.take()
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    // ========================================================================
    // 事件
    // ========================================================================

    /// 使用者輸入：經過別名與命令堆疊後送出；空白輸入直接送出空行
    pub fn handle_input(&mut self, input: &str, now: Instant) {
        if input.trim().is_empty() {
            self.transmit("");
            return;
        }
        self.send(input, 0, now);
    }

    /// 伺服器文字：逐行測試觸發器並顯示
    pub fn handle_message(&mut self, text: &str, now: Instant) -> Reception {
        let mut reception = Reception::default();

        for line in text.lines() {
            let mut effects = Vec::new();
            let fired = match self.triggers.best(line) {
                Some((trigger, captures)) => {
                    let result = trigger.fire(&captures, &mut self.engine, &mut effects, now);
                    // 動作無法解析時觸發器這一回合不生效，原樣顯示
                    let (shown, mark) = match &result {
                        Err(err) if err.is_parse_failure() => (Some(line.to_string()), None),
                        _ => (
                            trigger.display_text(line, self.engine.locals()),
                            trigger.mark().then_some(captures.start),
                        ),
                    };
                    Some((trigger.label(), result, shown, mark))
                }
                None => None,
            };

            let (shown, mark, outcome) = match fired {
                Some((label, result, shown, mark)) => (shown, mark, Some((label, result))),
                None => (Some(line.to_string()), None, None),
            };

            if let Some(shown) = shown {
                if let (Some(column), None) = (mark, reception.mark) {
                    reception.mark = Some(Mark {
                        line: reception.lines.len(),
                        column,
                    });
                }
                let flags = self.line_flags();
                self.sink.handle_message(&shown, flags);
                reception.lines.push(shown);
            }

            self.apply(effects, 0, now);
            if let Some((label, result)) = outcome {
                self.settle(&label, result);
            }
        }

        reception
    }

    /// 快捷鍵：回傳是否有對應的巨集
    pub fn handle_key(&mut self, shortcut: &Shortcut, now: Instant) -> bool {
        let mut effects = Vec::new();
        let fired = self
            .macros
            .find(shortcut)
            .map(|item| (item.label(), item.fire(&mut self.engine, &mut effects, now)));

        match fired {
            Some((label, result)) => {
                self.apply(effects, 0, now);
                self.settle(&label, result);
                true
            }
            None => false,
        }
    }

    /// 恢復所有到期的暫停腳本（依到期順序），回傳恢復的數量
    pub fn poll_timers(&mut self, now: Instant) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let (mut due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|continuation| continuation.due() <= now);
        self.pending = waiting;
        due.sort_by_key(Continuation::due);

        let count = due.len();
        for continuation in due {
            let label = continuation.label().to_string();
            let mut effects = Vec::new();
            let result = self.engine.resume(continuation, &mut effects, now);
            self.apply(effects, 0, now);
            self.settle(&label, result);
        }
        count
    }

    /// 最近一個暫停腳本的到期時間
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(Continuation::due).min()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// 重設引擎：清空變數，所有暫停中的腳本到期時直接丟棄
    pub fn reset_engine(&mut self) {
        self.engine.invalidate();
        *self.engine.locals_mut() = Locals::new();
        info!(world = %self.settings.name, "腳本引擎已重設");
    }

    // ========================================================================
    // 設定
    // ========================================================================

    /// 執行 `config.set` 內容（不做變數替換）
    pub fn load_config(&mut self, text: &str, now: Instant) -> Result<(), ScriptError> {
        let mut effects = Vec::new();
        let result = self.engine.execute_raw(text, "config", &mut effects, now);
        self.apply(effects, 0, now);

        match result {
            Ok(RunOutcome::Suspended(continuation)) => self.pending.push(continuation),
            Ok(_) => {}
            Err(err) => {
                error!(world = %self.settings.name, error = %err, "載入設定失敗");
                return Err(err);
            }
        }

        info!(
            world = %self.settings.name,
            aliases = self.aliases.len(),
            triggers = self.triggers.len(),
            macros = self.macros.len(),
            "已載入設定"
        );
        Ok(())
    }

    /// 序列化為 `config.set` 內容
    pub fn save_config(&self) -> String {
        let mut lines = Vec::new();
        for channel in self.channels.list() {
            let statement =
                Statement::new("channel").with_argument(Argument::Braced(channel.name.clone()));
            lines.push(format(&statement));
        }
        lines.extend(self.aliases.list().iter().map(|alias| alias.to_statement()));
        lines.extend(self.triggers.list().iter().map(|trigger| trigger.to_statement()));
        lines.extend(self.macros.list().iter().map(|item| item.to_statement()));

        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        content
    }

    // ========================================================================
    // 內部
    // ========================================================================

    /// 送出命令：拆分後逐段測試別名，沒有別名符合就送到伺服器
    ///
    /// 展開中的別名不會再次匹配自己展開出來的命令。
    fn send(&mut self, text: &str, depth: usize, now: Instant) {
        if depth > MAX_SEND_DEPTH {
            error!(command = text, "別名遞迴超過 {} 層，停止展開", MAX_SEND_DEPTH);
            return;
        }

        for command in self.split_commands(text) {
            let mut effects = Vec::new();
            let matched = self
                .aliases
                .test_except(&command, &self.expanding, &mut self.engine, &mut effects, now)
                .map(|(alias, result)| (alias.label(), alias.pattern().as_str().to_string(), result));

            match matched {
                Some((label, pattern, result)) => {
                    self.expanding.push(pattern);
                    self.apply(effects, depth + 1, now);
                    self.expanding.pop();
                    self.settle(&label, result);
                }
                None => self.transmit(&command),
            }
        }
    }

    /// 依換行與命令堆疊分隔符拆分，並還原跳脫的分號
    fn split_commands(&self, text: &str) -> Vec<String> {
        let stacking = self.settings.command_stacking.as_str();
        let commands: Vec<String> = text
            .split('\n')
            .flat_map(|line| split_stacked(line.trim_end_matches('\r'), stacking))
            .filter(|command| !command.trim().is_empty())
            .map(|command| unescape_separators(&command))
            .collect();

        if commands.is_empty() {
            vec![String::new()]
        } else {
            commands
        }
    }

    fn transmit(&mut self, command: &str) {
        match self.client.as_mut() {
            Some(client) => {
                debug!(command, "送出");
                client.write(command);
            }
            None => warn!(command, "未連線，丟棄命令"),
        }
    }

    fn line_flags(&self) -> OutputFlags {
        OutputFlags {
            screen: true,
            speech: self.settings.speech,
            braille: self.settings.braille,
            interrupt: false,
        }
    }

    /// 套用腳本副作用
    fn apply(&mut self, effects: Vec<Effect>, depth: usize, now: Instant) {
        for effect in effects {
            match effect {
                Effect::Send(text) => self.send(&text, depth, now),
                Effect::Display(text) => {
                    let flags = self.line_flags();
                    self.sink.handle_message(&unescape_separators(&text), flags);
                }
                Effect::Speak { text, interrupt } => self
                    .sink
                    .handle_message(&unescape_separators(&text), OutputFlags::speech(interrupt)),
                Effect::Play(path) => self.sink.play_sound(&unescape_separators(&path)),
                Effect::Feed { channel, message } => {
                    if !self.channels.feed(&channel, unescape_separators(&message)) {
                        warn!(channel = %channel, "頻道未宣告，丟棄訊息");
                    }
                }
                Effect::DeclareAlias(alias) => {
                    debug!(pattern = alias.pattern().as_str(), "宣告別名");
                    self.aliases.add(alias);
                }
                Effect::DeclareTrigger(trigger) => {
                    debug!(pattern = trigger.pattern().as_str(), "宣告觸發器");
                    self.triggers.add(trigger);
                }
                Effect::DeclareMacro(item) => {
                    debug!(shortcut = %item.shortcut(), "宣告巨集");
                    self.macros.add(item);
                }
                Effect::DeclareChannel(name) => {
                    if self.channels.add(&name) {
                        debug!(channel = %name, "宣告頻道");
                    }
                }
            }
        }
    }

    /// 處理一次執行的結果：暫停的排入佇列，錯誤記錄後忽略
    fn settle(&mut self, label: &str, result: Result<RunOutcome, ScriptError>) {
        match result {
            Ok(RunOutcome::Suspended(continuation)) => {
                debug!(reaction = label, "腳本暫停，等待恢復");
                self.pending.push(continuation);
            }
            Ok(RunOutcome::Completed) | Ok(RunOutcome::Aborted) | Ok(RunOutcome::Cancelled) => {}
            Err(err) if err.is_parse_failure() => {
                error!(reaction = label, error = %err, "腳本解析失敗");
            }
            Err(err) => {
                error!(reaction = label, error = %err, "腳本執行失敗");
            }
        }
    }
}

/// 以命令堆疊分隔符拆分一行；前面是反斜線的分隔符不拆
fn split_stacked(line: &str, stacking: &str) -> Vec<String> {
    if stacking.is_empty() {
        return vec![line.to_string()];
    }

    let mut pieces: Vec<String> = Vec::new();
    let mut escaped = false;
    for piece in line.split(stacking) {
        match pieces.last_mut() {
            Some(last) if escaped => {
                last.push_str(stacking);
                last.push_str(piece);
            }
            _ => pieces.push(piece.to_string()),
        }
        escaped = piece.ends_with('\\');
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Recorder {
        writes: Arc<Mutex<Vec<String>>>,
        screen: Arc<Mutex<Vec<(String, OutputFlags)>>>,
        sounds: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn writes(&self) -> Vec<String> {
            self.writes.lock().unwrap().clone()
        }

        fn screen(&self) -> Vec<String> {
            self.screen.lock().unwrap().iter().map(|(text, _)| text.clone()).collect()
        }
    }

    impl Client for Recorder {
        fn write(&mut self, text: &str) {
            self.writes.lock().unwrap().push(text.to_string());
        }
    }

    impl OutputSink for Recorder {
        fn handle_message(&mut self, text: &str, flags: OutputFlags) {
            self.screen.lock().unwrap().push((text.to_string(), flags));
        }

        fn play_sound(&mut self, path: &str) {
            self.sounds.lock().unwrap().push(path.to_string());
        }
    }

    fn world(config: &str) -> (World, Recorder) {
        let recorder = Recorder::default();
        let mut world = World::new(WorldSettings::new("test"), Box::new(recorder.clone()));
        world.bind_client(Box::new(recorder.clone()));
        world.load_config(config, Instant::now()).unwrap();
        (world, recorder)
    }

    #[test]
    fn test_alias_expands_and_sends() {
        let (mut world, recorder) = world("#alias {s*} {say $1}\n#alias kk {kill kobold;look}");
        world.handle_input("syes!", Instant::now());
        world.handle_input("kk", Instant::now());
        world.handle_input("north", Instant::now());
        assert_eq!(recorder.writes(), vec!["say yes!", "kill kobold", "look", "north"]);
    }

    #[test]
    fn test_alias_say() {
        let (mut world, recorder) = world("#alias {s*} {#say $1}");
        world.handle_input("syes!", Instant::now());
        assert!(recorder.writes().is_empty());

        let screen = recorder.screen.lock().unwrap().clone();
        assert_eq!(screen.len(), 1);
        assert_eq!(screen[0].0, "yes!");
        assert!(screen[0].1.speech && !screen[0].1.screen);
    }

    #[test]
    fn test_pause_resumes_on_timer() {
        let (mut world, recorder) = world("#alias go {#pause 2;#send ok}");
        let now = Instant::now();

        world.handle_input("go", now);
        assert!(recorder.writes().is_empty());
        assert_eq!(world.pending_count(), 1);
        assert_eq!(world.next_due(), Some(now + Duration::from_secs(2)));

        assert_eq!(world.poll_timers(now + Duration::from_secs(1)), 0);
        assert!(recorder.writes().is_empty());

        assert_eq!(world.poll_timers(now + Duration::from_secs(2)), 1);
        assert_eq!(recorder.writes(), vec!["ok"]);
        assert_eq!(world.pending_count(), 0);
    }

    #[test]
    fn test_reset_engine_cancels_pending() {
        let (mut world, recorder) = world("#alias go {#pause 1;#send late}");
        let now = Instant::now();
        world.engine_mut().locals_mut().set("x", "1");

        world.handle_input("go", now);
        world.reset_engine();
        assert!(world.engine().locals().is_empty());

        world.poll_timers(now + Duration::from_secs(5));
        assert!(recorder.writes().is_empty());
        assert_eq!(world.pending_count(), 0);
    }

    #[test]
    fn test_only_best_trigger_fires() {
        let (mut world, recorder) = world("#trigger {*hp} short\n#trigger {your hp} long");
        let reception = world.handle_message("your hp", Instant::now());
        assert_eq!(recorder.writes(), vec!["long"]);
        assert_eq!(reception.lines, vec!["your hp".to_string()]);
    }

    #[test]
    fn test_trigger_substitution_mute_and_mark() {
        let (mut world, recorder) = world(
            "#trigger {* tells you *} {} {[$1] $2}\n\
             #trigger {spam*} {} +mute\n\
             #trigger {^.*(?P<foe>orc)} {#writevar foe $foe} +mark",
        );
        let reception = world.handle_message(
            "Bob tells you hi\nspam spam\nhello\nan angry orc\nanother orc",
            Instant::now(),
        );

        assert_eq!(
            reception.lines,
            vec!["[Bob] hi", "hello", "an angry orc", "another orc"]
        );
        assert_eq!(reception.mark, Some(Mark { line: 2, column: 0 }));
        assert_eq!(recorder.screen(), reception.lines);
        assert_eq!(world.engine().locals().get("foe"), Some("orc"));
    }

    #[test]
    fn test_command_stacking() {
        let (mut world, recorder) = world("");
        world.handle_input("n|s", Instant::now());
        world.settings_mut().command_stacking = "|".to_string();
        world.handle_input("n|s", Instant::now());
        assert_eq!(recorder.writes(), vec!["n|s", "n", "s"]);
    }

    #[test]
    fn test_blank_input_sends_empty_line() {
        let (mut world, recorder) = world("");
        world.handle_input("", Instant::now());
        assert_eq!(recorder.writes(), vec![""]);
    }

    #[test]
    fn test_alias_does_not_expand_itself() {
        let (mut world, recorder) = world("#alias loop loop
#alias a b
#alias b a");
        world.handle_input("loop", Instant::now());
        world.handle_input("a", Instant::now());
        assert_eq!(recorder.writes(), vec!["loop", "a"]);
    }

    #[test]
    fn test_alias_depth_limit() {
        let config: Vec<String> = (0..=MAX_SEND_DEPTH + 1)
            .map(|i| format!("#alias a{} a{}", i, i + 1))
            .collect();
        let (mut world, recorder) = world(&config.join("\n"));
        world.handle_input("a0", Instant::now());
        assert!(recorder.writes().is_empty());
    }

    #[test]
    fn test_feed_channel() {
        let (mut world, _recorder) = world("#channel tells\n#trigger {* tells you *} {#feed tells $1: $2}");
        world.handle_message("Bob tells you hi", Instant::now());
        world.handle_message("nothing here", Instant::now());

        let channel = world.channels().get("tells").unwrap();
        assert_eq!(channel.messages(), ["Bob: hi".to_string()]);
    }

    #[test]
    fn test_feed_undeclared_channel_is_dropped() {
        let (mut world, _recorder) = world("#alias x {#feed nowhere text}");
        world.handle_input("x", Instant::now());
        assert!(world.channels().is_empty());
    }

    #[test]
    fn test_macro_key() {
        let (mut world, recorder) = world("#macro {ctrl+f1} {flee;recall}");
        let shortcut = Shortcut::parse("Ctrl + F1").unwrap();
        assert!(world.handle_key(&shortcut, Instant::now()));
        assert!(!world.handle_key(&Shortcut::parse("F2").unwrap(), Instant::now()));
        assert_eq!(recorder.writes(), vec!["flee", "recall"]);
    }

    #[test]
    fn test_play_sound() {
        let (mut world, recorder) = world("#trigger {beep} {#play alarm.wav}");
        world.handle_message("beep", Instant::now());
        assert_eq!(recorder.sounds.lock().unwrap().clone(), vec!["alarm.wav"]);
    }

    #[test]
    fn test_script_declares_reactions_at_runtime() {
        let (mut world, recorder) = world("#alias learn {#alias k* {kill $1}}");
        world.handle_input("learn", Instant::now());
        world.handle_input("korc", Instant::now());
        assert_eq!(recorder.writes(), vec!["kill orc"]);
    }

    #[test]
    fn test_failing_alias_consumes_command() {
        let (mut world, recorder) = world("#alias bad {#send before;{+ error('x') }}");
        world.handle_input("bad", Instant::now());
        assert_eq!(recorder.writes(), vec!["before"]);
    }

    #[test]
    fn test_save_config_round_trip() {
        let config = "#channel tells\n\
                      #alias {go *} {walk $1;look}\n\
                      #trigger {hp *} flee +mark +mute\n\
                      #macro {Ctrl + F1} flee\n";
        let (world, _recorder) = world(config);
        assert_eq!(world.save_config(), config);

        let (reloaded, _recorder) = self::world(&world.save_config());
        assert_eq!(reloaded.save_config(), config);
    }

    #[test]
    fn test_write_during_pause_survives_resume() {
        let (mut world, recorder) =
            world("#alias go {#pause 1;#send ok}\n#alias set {#writevar hp 50}");
        let now = Instant::now();

        world.handle_input("go", now);
        world.handle_input("set", now);
        assert_eq!(world.engine().locals().get("hp"), Some("50"));

        assert_eq!(world.poll_timers(now + Duration::from_secs(2)), 1);
        assert_eq!(recorder.writes(), vec!["ok"]);
        assert_eq!(world.engine().locals().get("hp"), Some("50"));
    }

    #[test]
    fn test_interleaved_pauses_keep_every_write() {
        let (mut world, recorder) = world(
            "#alias slow {#writevar a 1;#pause 3;#send right;#writevar c 3}\n\
             #alias fast {#pause 1;#send left;#writevar b 2}\n\
             #trigger {hp *} {#writevar hp $1}",
        );
        let now = Instant::now();

        world.handle_input("slow", now);
        world.handle_input("fast", now);
        assert_eq!(world.pending_count(), 2);

        world.handle_message("hp 90", now + Duration::from_millis(500));
        assert_eq!(world.engine().locals().get("hp"), Some("90"));

        assert_eq!(world.poll_timers(now + Duration::from_secs(5)), 2);
        assert_eq!(recorder.writes(), vec!["left", "right"]);
        assert_eq!(world.pending_count(), 0);

        let locals = world.engine().locals();
        assert_eq!(locals.get("a"), Some("1"));
        assert_eq!(locals.get("b"), Some("2"));
        assert_eq!(locals.get("c"), Some("3"));
        assert_eq!(locals.get("hp"), Some("90"));
    }

    #[test]
    fn test_double_semicolon_is_literal() {
        let (mut world, recorder) = world(
            "#alias x {say a;;b}\n\
             #alias y {#display one;;two}\n\
             #trigger {ping} {} {pong;;pang}",
        );
        world.handle_input("x", Instant::now());
        assert_eq!(recorder.writes(), vec!["say a;b"]);

        world.handle_input("y", Instant::now());
        let reception = world.handle_message("ping", Instant::now());
        assert_eq!(reception.lines, vec!["pong;pang"]);
        assert_eq!(recorder.screen(), vec!["one;two", "pong;pang"]);
    }

    #[test]
    fn test_stacked_commands_keep_escaped_separator() {
        let (mut world, recorder) = world("");
        world.settings_mut().command_stacking = ";".to_string();
        world.handle_input("north;say hi\\;there", Instant::now());
        assert_eq!(recorder.writes(), vec!["north", "say hi;there"]);
    }

    #[test]
    fn test_unparsable_trigger_keeps_line() {
        let (mut world, recorder) = world("#trigger {hp *} {#nosuch} {changed} +mark");
        let reception = world.handle_message("hp 10", Instant::now());

        assert_eq!(reception.lines, vec!["hp 10"]);
        assert_eq!(reception.mark, None);
        assert_eq!(recorder.screen(), vec!["hp 10"]);
        assert!(recorder.writes().is_empty());
    }

    #[test]
    fn test_unconnected_world_drops_commands() {
        let recorder = Recorder::default();
        let mut world = World::new(WorldSettings::new("offline"), Box::new(recorder.clone()));
        world.handle_input("look", Instant::now());
        assert!(!world.is_connected());
        assert!(recorder.writes().is_empty());
    }
}
