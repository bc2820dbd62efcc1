pub mod cbuf;
pub mod config;
pub mod congestion;
pub mod errors;
pub mod host;
pub mod input;
pub mod isn;
pub mod state;
pub mod stats;
pub mod tcb;
pub mod tcp_header;
pub mod transition;
pub mod wrap32;
mod accept;
mod engine;
mod predict;

// Unit test helpers

#[cfg(test)]
pub(crate) mod test_utils;

// -- Re-export structs for more concise usage

pub use cbuf::CircularBuffer;
pub use config::{Blackhole, TcpConfig};
pub use errors::TcpError;
pub use host::{Host, TimerKind};
pub use input::{Disposition, Endpoint, TcpInput};
pub use isn::IsnGenerator;
pub use state::TcpState;
pub use stats::{Stat, TcpStats};
pub use tcb::{ListenTcb, Tcb, TcbFlags};
pub use tcp_header::{IpInfo, TcpFlags, TcpHeader};
pub use wrap32::Wrap32;
