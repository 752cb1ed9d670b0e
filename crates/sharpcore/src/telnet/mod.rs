//! Telnet 協定與連線

mod connection;
pub mod protocol;

pub use connection::{TelnetConfig, TelnetConnection, TelnetError};
pub use protocol::{TelnetCommand, TelnetEvent};
