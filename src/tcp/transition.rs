//! The legal edges of the connection state machine.
//!
//! Every state change the receive path makes goes through [`next_state`], so a
//! handler that asks for an edge missing from [`TRANSITIONS`] gets an error
//! instead of silently corrupting the connection.

use log::debug;

use crate::tcp::errors::TcpError;
use crate::tcp::host::Host;
use crate::tcp::state::TcpState;
use crate::tcp::tcb::Tcb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Valid SYN accepted on a listening endpoint.
    PassiveOpen,
    /// Our SYN was acknowledged and no local close is pending.
    SynAcked,
    /// Our SYN was acknowledged while a local close is pending.
    SynAckedClosePending,
    /// SYN without ACK while in SYN_SENT.
    SimultaneousOpen,
    /// First FIN from the peer was consumed.
    FinReceived,
    /// The peer acknowledged our FIN.
    FinAcked,
    /// Connection aborted by an acceptable RST or a refused open.
    Reset,
}

use Event::*;
use TcpState::*;

/// `(from, event, to)`
pub const TRANSITIONS: &[(TcpState, Event, TcpState)] = &[
    (Closed, PassiveOpen, SynReceived),
    (SynSent, SynAcked, Established),
    (SynSent, SynAckedClosePending, FinWait1),
    (SynSent, SimultaneousOpen, SynReceived),
    (SynSent, Reset, Closed),
    (SynReceived, SynAcked, Established),
    (SynReceived, SynAckedClosePending, FinWait1),
    (SynReceived, FinReceived, CloseWait),
    (SynReceived, Reset, Closed),
    (Established, FinReceived, CloseWait),
    (Established, Reset, Closed),
    (FinWait1, FinReceived, Closing),
    (FinWait1, FinAcked, FinWait2),
    (FinWait1, Reset, Closed),
    (FinWait2, FinReceived, TimeWait),
    (FinWait2, Reset, Closed),
    (CloseWait, Reset, Closed),
    (Closing, FinAcked, TimeWait),
    (Closing, Reset, Closed),
    (LastAck, FinAcked, Closed),
    (LastAck, Reset, Closed),
];

pub fn next_state(from: TcpState, event: Event) -> Result<TcpState, TcpError> {
    TRANSITIONS
        .iter()
        .find(|(s, e, _)| *s == from && *e == event)
        .map(|(_, _, to)| *to)
        .ok_or(TcpError::InvalidTransition { from, event })
}

/// Move `tcb` along the edge for `event` and tell the host about it.
pub(crate) fn apply<H: Host>(host: &mut H, tcb: &mut Tcb, event: Event) -> Result<TcpState, TcpError> {
    let old = tcb.state;
    let new = next_state(old, event)?;
    tcb.state = new;
    debug!("tcb {}: {} -> {} on {:?}", tcb.id, old, new, event);
    host.state_change(tcb, old, new);
    Ok(new)
}

// -- Unit tests --
