//! 終端機主迴圈
//!
//! stdin 的每一行交給 [`World::handle_input`]，以 `/` 開頭的是本地命令：
//! - `/key Ctrl+F1`：觸發巨集
//! - `/reset`：重設腳本引擎
//! - `/save`：儲存 `config.set`
//! - `/quit`：離開

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use sharpcore::{
    lock_world, ChannelClient, SharedWorld, Shortcut, StoreError, TelnetConfig, TelnetConnection,
    TelnetError, World, WorldStore,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::console::ConsoleSink;

#[derive(Parser, Debug)]
#[command(version, about = "SharpScript MUD 客戶端", long_about = None)]
pub struct Args {
    /// world 名稱
    pub world: String,

    /// 主機（會寫回 world 設定）
    #[arg(long)]
    pub host: Option<String>,

    /// 連接埠（會寫回 world 設定）
    #[arg(short, long)]
    pub port: Option<u16>,

    /// 文字編碼（utf-8、big5…）
    #[arg(long)]
    pub encoding: Option<String>,

    /// 設定目錄，預設為系統設定目錄下的 sharpmud
    #[arg(long)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Telnet(#[from] TelnetError),

    #[error("終端機 IO 錯誤: {0}")]
    Io(#[from] io::Error),

    #[error("world {0} 沒有設定主機，請使用 --host")]
    NoHost(String),
}

/// 伺服器安靜這麼久之後，沒有換行的最後一行視為提示字元顯示
const PROMPT_DELAY: Duration = Duration::from_millis(200);

enum Event {
    Received(Option<String>),
    Outgoing(String),
    Input(Option<String>),
    Tick,
}

#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

pub async fn run(args: Args) -> Result<(), AppError> {
    let root = match args.config_dir {
        Some(dir) => dir,
        None => WorldStore::default_root()?,
    };
    let mut store = WorldStore::new(root);

    let mut settings = store.load_settings(&args.world)?;
    let mut changed = false;
    if let Some(host) = args.host {
        settings.host = host;
        changed = true;
    }
    if let Some(port) = args.port {
        settings.port = port;
        changed = true;
    }
    if let Some(encoding) = args.encoding {
        settings.encoding = encoding;
        changed = true;
    }
    if changed {
        store.save_settings(&settings)?;
    }
    if settings.host.is_empty() {
        return Err(AppError::NoHost(settings.name));
    }

    let script = store.load_script(&settings.name)?;
    let mut world = World::new(settings.clone(), Box::new(ConsoleSink::new(settings.speech)));
    if let Err(err) = world.load_config(&script, Instant::now()) {
        warn!(world = %settings.name, "config.set 有錯誤，僅載入部分設定: {}", err);
    }
    let world = world.into_shared();

    let config = TelnetConfig::with_encoding_label(&settings.encoding)?;
    let mut connection = TelnetConnection::connect(&settings.host, settings.port, config).await?;

    let (tx, mut outgoing) = mpsc::unbounded_channel();
    lock_world(&world).bind_client(Box::new(ChannelClient::new(tx)));

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(settings.timer_tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_received = Instant::now();
    let result = loop {
        let event = tokio::select! {
            text = connection.read_text() => match text {
                Ok(text) => Event::Received(text),
                Err(err) => break Err(err.into()),
            },
            Some(line) = outgoing.recv() => Event::Outgoing(line),
            line = input.next_line() => match line {
                Ok(line) => Event::Input(line),
                Err(err) => break Err(err.into()),
            },
            _ = ticker.tick() => Event::Tick,
        };

        match event {
            Event::Received(None) => break Ok(()),
            Event::Received(Some(text)) => {
                last_received = Instant::now();
                if !text.is_empty() {
                    receive(&world, &text);
                }
                if let Err(err) = connection.flush_replies().await {
                    break Err(err.into());
                }
            }
            Event::Outgoing(line) => {
                if let Err(err) = connection.send_line(&line).await {
                    break Err(err.into());
                }
            }
            Event::Input(None) => break Ok(()),
            Event::Input(Some(line)) => {
                if handle_line(&world, &mut store, &line) == Control::Quit {
                    break Ok(());
                }
            }
            Event::Tick => {
                if connection.has_partial() && last_received.elapsed() >= PROMPT_DELAY {
                    if let Some(prompt) = connection.take_partial() {
                        receive(&world, &prompt);
                    }
                }
                let resumed = lock_world(&world).poll_timers(Instant::now());
                if resumed > 0 {
                    debug!(resumed, "恢復暫停的腳本");
                }
            }
        }
    };

    lock_world(&world).unbind_client();
    save(&world, &mut store);
    info!("已離開");
    result
}

fn receive(world: &SharedWorld, text: &str) {
    let reception = lock_world(world).handle_message(text, Instant::now());
    if let Some(mark) = reception.mark {
        debug!(line = mark.line, column = mark.column, "標記位置");
    }
}

fn handle_line(world: &SharedWorld, store: &mut WorldStore, line: &str) -> Control {
    let Some(command) = line.strip_prefix('/') else {
        lock_world(world).handle_input(line, Instant::now());
        return Control::Continue;
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .unwrap_or((command, ""));
    match name {
        "quit" => return Control::Quit,
        "reset" => lock_world(world).reset_engine(),
        "save" => save(world, store),
        "key" => match Shortcut::parse(rest) {
            Ok(shortcut) => {
                if !lock_world(world).handle_key(&shortcut, Instant::now()) {
                    warn!("{} 沒有對應的巨集", shortcut);
                }
            }
            Err(err) => warn!("{}", err),
        },
        // 不認得的本地命令原樣送出
        _ => lock_world(world).handle_input(line, Instant::now()),
    }
    Control::Continue
}

fn save(world: &SharedWorld, store: &mut WorldStore) {
    let (name, content) = {
        let world = lock_world(world);
        (world.settings().name.clone(), world.save_config())
    };
    if let Err(err) = store.save_script(&name, &content) {
        error!(world = %name, "儲存 config.set 失敗: {}", err);
    }
}
