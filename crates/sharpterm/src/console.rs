//! 終端機輸出端

use std::io::{self, Write};

use sharpcore::{OutputFlags, OutputSink};
use tracing::trace;

/// 把畫面文字印到 stdout；沒有語音引擎，語音輸出以前綴標示
pub struct ConsoleSink {
    speech: bool,
}

impl ConsoleSink {
    pub fn new(speech: bool) -> Self {
        Self { speech }
    }

    fn print(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

impl OutputSink for ConsoleSink {
    fn handle_message(&mut self, text: &str, flags: OutputFlags) {
        if flags.screen {
            self.print(text);
        } else if flags.speech && self.speech {
            self.print(&format!("[語音] {}", text));
        }
        if flags.braille {
            trace!(text, "點字輸出");
        }
    }

    fn play_sound(&mut self, path: &str) {
        self.print(&format!("[音效] {}", path));
    }
}
