//! Telnet 連線
//!
//! 非同步讀寫、協商回應、文字編解碼與 ANSI 控制碼清除。

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use encoding_rs::{Decoder, Encoding, UTF_8};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use super::protocol::{escape_iac, negotiate, parse_telnet_data, TelnetEvent};

lazy_static! {
    /// CSI 序列與兩字元的 ESC 序列
    static ref ANSI_SEQUENCE: Regex = Regex::new(r"\x1b(?:\[[0-9;?]*[ -/]*[@-~]|[@-Z\\-_])").unwrap();
}

/// 保留未完成 ESC 序列的最大長度，超過視為雜訊
const MAX_PENDING_ESCAPE: usize = 32;

/// Telnet 連線錯誤
#[derive(Debug, Error)]
pub enum TelnetError {
    #[error("連線失敗: {0}")]
    ConnectionFailed(#[from] io::Error),

    #[error("連線逾時")]
    Timeout,

    #[error("DNS 解析失敗: {0}")]
    DnsResolutionFailed(String),

    #[error("不支援的編碼: {0}")]
    UnknownEncoding(String),
}

/// Telnet 連線配置
#[derive(Debug, Clone)]
pub struct TelnetConfig {
    pub connect_timeout: Duration,
    pub read_buffer_size: usize,
    pub encoding: &'static Encoding,
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_buffer_size: 8192,
            encoding: UTF_8,
        }
    }
}

impl TelnetConfig {
    /// 依編碼標籤（`utf-8`、`big5`…）建立配置
    pub fn with_encoding_label(label: &str) -> Result<Self, TelnetError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| TelnetError::UnknownEncoding(label.to_string()))?;
        Ok(Self {
            encoding,
            ..Default::default()
        })
    }
}

/// 一條 Telnet 連線
pub struct TelnetConnection<S> {
    stream: S,
    config: TelnetConfig,
    /// 尚未處理完的原始位元組（不完整的 IAC 序列）
    raw: BytesMut,
    /// 串流解碼器，多位元組字元可跨越多次讀取
    decoder: Decoder,
    /// 尚未結束的 ESC 序列
    pending_escape: String,
    /// 待送出的協商回應
    replies: BytesMut,
    /// 還沒收到換行的最後一行
    partial: String,
}

impl TelnetConnection<TcpStream> {
    /// 連線到 MUD 伺服器
    pub async fn connect(host: &str, port: u16, config: TelnetConfig) -> Result<Self, TelnetError> {
        info!("正在連線到 {}:{}", host, port);

        let addr = format!("{}:{}", host, port);
        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr)
            .await
            .map_err(|e| TelnetError::DnsResolutionFailed(e.to_string()))?
            .collect();
        let Some(target) = socket_addrs.first() else {
            return Err(TelnetError::DnsResolutionFailed(format!("無法解析主機: {}", host)));
        };
        debug!("已解析到位址: {:?}", socket_addrs);

        let stream = timeout(config.connect_timeout, TcpStream::connect(target))
            .await
            .map_err(|_| TelnetError::Timeout)??;
        stream.set_nodelay(true)?;

        info!("已連線到 {}:{}", host, port);
        Ok(Self::new(stream, config))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> TelnetConnection<S> {
    pub fn new(stream: S, config: TelnetConfig) -> Self {
        Self {
            stream,
            decoder: config.encoding.new_decoder_without_bom_handling(),
            config,
            raw: BytesMut::new(),
            pending_escape: String::new(),
            replies: BytesMut::new(),
            partial: String::new(),
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.config.encoding
    }

    /// 讀取一批完整的行
    ///
    /// 回傳 `None` 表示伺服器關閉連線。回傳的文字已去除 ANSI 控制碼，
    /// 換行統一為 `\n`。沒有換行結尾的最後一行會留到下一次讀取，
    /// 除非同一封包帶有 GA 或 EOR；沒有送出提示標記的伺服器由呼叫端以
    /// [`TelnetConnection::take_partial`] 在閒置後取出。連線關閉時先交出
    /// 剩下的部分行，下一次才回傳 `None`。
    ///
    /// 唯一的 await 點是底層的 `read`，可以放在 `tokio::select!` 中。
    /// 協商回應會排入佇列，由 [`TelnetConnection::flush_replies`] 或下一次
    /// [`TelnetConnection::send_line`] 送出。
    pub async fn read_text(&mut self) -> Result<Option<String>, TelnetError> {
        let mut buffer = vec![0u8; self.config.read_buffer_size];
        let n = self.stream.read(&mut buffer).await?;
        if n == 0 {
            if let Some(rest) = self.take_partial() {
                return Ok(Some(rest));
            }
            info!("伺服器關閉連線");
            return Ok(None);
        }
        trace!(bytes = n, "收到資料");

        self.raw.extend_from_slice(&buffer[..n]);
        let (data, events, consumed) = parse_telnet_data(&self.raw);
        self.raw.advance(consumed);

        let prompt = events
            .iter()
            .any(|event| matches!(event, TelnetEvent::Command(command) if command.ends_prompt()));
        for event in events {
            match event {
                TelnetEvent::Negotiation(command, option) => {
                    if let Some(reply) = negotiate(command, option) {
                        debug!(?command, option, "回應選項協商");
                        self.replies.extend_from_slice(&reply);
                    }
                }
                other => trace!(?other, "略過 Telnet 事件"),
            }
        }

        let decoded = self.decode(&data);
        let mut text = std::mem::take(&mut self.partial);
        text.push_str(&self.clean(decoded));
        if !prompt {
            let complete = text.rfind('\n').map_or(0, |pos| pos + 1);
            self.partial = text.split_off(complete);
        }
        Ok(Some(text))
    }

    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }

    /// 取出還沒收到換行的最後一行
    pub fn take_partial(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.partial))
        }
    }

    pub fn has_replies(&self) -> bool {
        !self.replies.is_empty()
    }

    /// 送出排隊中的協商回應
    pub async fn flush_replies(&mut self) -> Result<(), TelnetError> {
        if self.replies.is_empty() {
            return Ok(());
        }
        let replies = self.replies.split();
        self.stream.write_all(&replies).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// 送出一行文字（加上 CRLF）
    pub async fn send_line(&mut self, text: &str) -> Result<(), TelnetError> {
        self.flush_replies().await?;
        let (encoded, _, unmappable) = self.config.encoding.encode(text);
        if unmappable {
            debug!("部分字元無法以 {} 編碼", self.config.encoding.name());
        }

        let mut data = escape_iac(&encoded);
        data.extend_from_slice(b"\r\n");
        self.stream.write_all(&data).await?;
        self.stream.flush().await?;

        debug!("已發送: {}", text);
        Ok(())
    }

    fn decode(&mut self, data: &[u8]) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(data.len())
            .unwrap_or(data.len() * 3 + 4);
        let mut out = String::with_capacity(capacity);
        let _ = self.decoder.decode_to_string(data, &mut out, false);
        out
    }

    fn clean(&mut self, decoded: String) -> String {
        let mut text = std::mem::take(&mut self.pending_escape);
        text.push_str(&decoded);

        // 封包結尾若停在 ESC 序列中間，留到下一次
        if let Some(pos) = text.rfind('\x1b') {
            let tail = &text[pos..];
            let complete = ANSI_SEQUENCE.find(tail).is_some_and(|m| m.start() == 0);
            if !complete && tail.len() < MAX_PENDING_ESCAPE && !tail.contains('\n') {
                self.pending_escape = tail.to_string();
                text.truncate(pos);
            }
        }

        ANSI_SEQUENCE
            .replace_all(&text, "")
            .replace("\r\n", "\n")
            .replace('\r', "")
    }
}
