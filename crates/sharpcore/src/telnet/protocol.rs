//! Telnet 協定解析
//!
//! 只處理 MUD 連線需要的部分（RFC 854）：分離命令與文字、回應選項協商。
//! 除了 ECHO 與 SUPPRESS-GO-AHEAD 之外的選項一律拒絕。

/// Interpret As Command
pub const IAC: u8 = 255;

/// Telnet 命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelnetCommand {
    /// End of Record，部分 MUD 以此標示提示字元結尾
    Eor = 239,
    Se = 240,
    Nop = 241,
    DataMark = 242,
    Break = 243,
    InterruptProcess = 244,
    AbortOutput = 245,
    AreYouThere = 246,
    EraseCharacter = 247,
    EraseLine = 248,
    GoAhead = 249,
    Sb = 250,
    Will = 251,
    Wont = 252,
    Do = 253,
    Dont = 254,
}

impl TryFrom<u8> for TelnetCommand {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use TelnetCommand::*;
        Ok(match byte {
            239 => Eor,
            240 => Se,
            241 => Nop,
            242 => DataMark,
            243 => Break,
            244 => InterruptProcess,
            245 => AbortOutput,
            246 => AreYouThere,
            247 => EraseCharacter,
            248 => EraseLine,
            249 => GoAhead,
            250 => Sb,
            251 => Will,
            252 => Wont,
            253 => Do,
            254 => Dont,
            other => return Err(other),
        })
    }
}

impl TelnetCommand {
    /// 是否為選項協商命令（後面跟一個選項位元組）
    pub fn is_negotiation(self) -> bool {
        matches!(self, Self::Will | Self::Wont | Self::Do | Self::Dont)
    }

    /// 是否標示提示字元結尾（GA 或 EOR）
    pub fn ends_prompt(self) -> bool {
        matches!(self, Self::GoAhead | Self::Eor)
    }
}

/// 常用的選項代碼
pub mod option {
    pub const ECHO: u8 = 1;
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    pub const TERMINAL_TYPE: u8 = 24;
    pub const NAWS: u8 = 31;
    pub const CHARSET: u8 = 42;
    pub const MCCP2: u8 = 86;
    pub const GMCP: u8 = 201;
}

/// 解析出的協定事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// 選項協商（WILL/WONT/DO/DONT + 選項）
    Negotiation(TelnetCommand, u8),
    /// 子協商內容
    Subnegotiation(u8, Vec<u8>),
    /// 其他單一命令（GA、NOP…）
    Command(TelnetCommand),
}

/// 解析位元組流
///
/// 回傳 `(文字位元組, 事件, 已處理的位元組數)`。結尾不完整的命令序列
/// 不會被處理，呼叫端應保留 `input[consumed..]` 等下一次資料到達。
pub fn parse_telnet_data(input: &[u8]) -> (Vec<u8>, Vec<TelnetEvent>, usize) {
    let mut data = Vec::with_capacity(input.len());
    let mut events = Vec::new();
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];
        if byte != IAC {
            data.push(byte);
            i += 1;
            continue;
        }

        let Some(&next) = input.get(i + 1) else {
            break;
        };
        if next == IAC {
            data.push(IAC);
            i += 2;
            continue;
        }

        match TelnetCommand::try_from(next) {
            Ok(command) if command.is_negotiation() => {
                let Some(&option) = input.get(i + 2) else {
                    break;
                };
                events.push(TelnetEvent::Negotiation(command, option));
                i += 3;
            }
            Ok(TelnetCommand::Sb) => match subnegotiation_end(input, i + 2) {
                Some(end) if end > i + 2 => {
                    let option = input[i + 2];
                    let payload = unescape(&input[i + 3..end]);
                    events.push(TelnetEvent::Subnegotiation(option, payload));
                    i = end + 2;
                }
                Some(end) => i = end + 2,
                None => break,
            },
            Ok(command) => {
                events.push(TelnetEvent::Command(command));
                i += 2;
            }
            // 未知命令，略過
            Err(_) => i += 2,
        }
    }

    (data, events, i)
}

/// 從 `start` 開始尋找 `IAC SE`，回傳 IAC 的位置
fn subnegotiation_end(input: &[u8], start: usize) -> Option<usize> {
    let mut j = start;
    while j + 1 < input.len() {
        if input[j] == IAC {
            if input[j + 1] == TelnetCommand::Se as u8 {
                return Some(j);
            }
            // IAC IAC 是資料
            j += 2;
            continue;
        }
        j += 1;
    }
    None
}

fn unescape(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    let mut iter = payload.iter().copied().peekable();
    while let Some(byte) = iter.next() {
        if byte == IAC && iter.peek() == Some(&IAC) {
            iter.next();
        }
        out.push(byte);
    }
    out
}

/// 對伺服器協商的回應；`None` 表示不需要回應
pub fn negotiate(command: TelnetCommand, option: u8) -> Option<[u8; 3]> {
    let accepted = matches!(option, option::ECHO | option::SUPPRESS_GO_AHEAD);
    let reply = match (command, accepted) {
        (TelnetCommand::Will, true) => TelnetCommand::Do,
        (TelnetCommand::Will, false) => TelnetCommand::Dont,
        (TelnetCommand::Do, true) if option == option::SUPPRESS_GO_AHEAD => TelnetCommand::Will,
        (TelnetCommand::Do, _) => TelnetCommand::Wont,
        _ => return None,
    };
    Some([IAC, reply as u8, option])
}

/// 將送出的資料中的 0xFF 轉義為 `IAC IAC`
pub fn escape_iac(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        if byte == IAC {
            out.push(IAC);
        }
        out.push(byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text() {
        let (data, events, consumed) = parse_telnet_data(b"Hello World");
        assert_eq!(data, b"Hello World");
        assert!(events.is_empty());
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_escaped_iac() {
        let (data, _, _) = parse_telnet_data(&[b'A', IAC, IAC, b'B']);
        assert_eq!(data, vec![b'A', IAC, b'B']);
    }

    #[test]
    fn test_parse_negotiation_between_text() {
        let mut input = b"Hello ".to_vec();
        input.extend_from_slice(&[IAC, TelnetCommand::Do as u8, option::NAWS]);
        input.extend_from_slice(b"World");

        let (data, events, consumed) = parse_telnet_data(&input);
        assert_eq!(data, b"Hello World");
        assert_eq!(events, vec![TelnetEvent::Negotiation(TelnetCommand::Do, option::NAWS)]);
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_incomplete_sequence_is_kept() {
        let input = [b'a', IAC, TelnetCommand::Will as u8];
        let (data, events, consumed) = parse_telnet_data(&input);
        assert_eq!(data, b"a");
        assert!(events.is_empty());
        assert_eq!(consumed, 1);
    }

    #[test]
    fn test_subnegotiation() {
        let input = [
            IAC,
            TelnetCommand::Sb as u8,
            option::GMCP,
            b'x',
            IAC,
            IAC,
            IAC,
            TelnetCommand::Se as u8,
            b'!',
        ];
        let (data, events, consumed) = parse_telnet_data(&input);
        assert_eq!(data, b"!");
        assert_eq!(events, vec![TelnetEvent::Subnegotiation(option::GMCP, vec![b'x', IAC])]);
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_unterminated_subnegotiation_waits() {
        let input = [IAC, TelnetCommand::Sb as u8, option::GMCP, b'x'];
        let (_, events, consumed) = parse_telnet_data(&input);
        assert!(events.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_go_ahead_is_command() {
        let (_, events, _) = parse_telnet_data(&[b'>', IAC, TelnetCommand::GoAhead as u8]);
        assert_eq!(events, vec![TelnetEvent::Command(TelnetCommand::GoAhead)]);
    }

    #[test]
    fn test_negotiate() {
        assert_eq!(
            negotiate(TelnetCommand::Do, option::MCCP2),
            Some([IAC, TelnetCommand::Wont as u8, option::MCCP2])
        );
        assert_eq!(
            negotiate(TelnetCommand::Will, option::ECHO),
            Some([IAC, TelnetCommand::Do as u8, option::ECHO])
        );
        assert_eq!(
            negotiate(TelnetCommand::Will, option::GMCP),
            Some([IAC, TelnetCommand::Dont as u8, option::GMCP])
        );
        assert_eq!(negotiate(TelnetCommand::Wont, option::ECHO), None);
    }

    #[test]
    fn test_escape_iac() {
        assert_eq!(escape_iac(&[1, IAC, 2]), vec![1, IAC, IAC, 2]);
    }
}
