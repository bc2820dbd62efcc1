use thiserror::Error;

use crate::tcp::state::TcpState;
use crate::tcp::transition::Event;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TcpError {
    #[error("Header too short: {0} bytes")]
    HeaderTooShort(usize),

    #[error("Buffer too small: expected {expected} bytes, found {found}")]
    BufferTooSmall {
        expected: usize,
        found: usize,
    },

    #[error("Bad header offset: {offset} bytes in a {len} byte segment")]
    BadHeaderOffset {
        offset: usize,
        len: usize,
    },

    #[error("SYN is missing")]
    MissingSyn, // listener got a non-SYN segment

    #[error("Unexpected ACK on a listening endpoint")]
    UnexpectedAck,

    #[error("SYN with RST on a listening endpoint")]
    SynWithRst,

    #[error("SYN with FIN dropped")]
    SynFin,

    #[error("Self-connect attempt")]
    SelfConnect,

    #[error("Multicast endpoint")]
    Multicast,

    #[error("Listener slot already in use")]
    ListenerBusy,

    #[error("Connection refused")]
    ConnectionRefused, // ECONNREFUSED

    #[error("Connection reset")]
    ConnectionReset, // ECONNRESET

    #[error("No transition from {from} on {event:?}")]
    InvalidTransition {
        from: TcpState,
        event: Event,
    },
}
