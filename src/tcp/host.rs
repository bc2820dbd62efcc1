use crate::tcp::errors::TcpError;
use crate::tcp::state::TcpState;
use crate::tcp::tcb::Tcb;
use crate::tcp::tcp_header::{IpInfo, TcpFlags, TcpHeader};
use crate::tcp::wrap32::Wrap32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Rexmt,   // Retransmission
    Persist, // Zero-window probe
    Keep,    // Keepalive, or connection-establishment timeout
    Delack,  // Delayed ACK
    TwoMsl,  // FIN_WAIT_2 and TIME_WAIT
}

/// Everything the receive path needs from the rest of the stack. All calls
/// are synchronous and complete before the current segment is finished.
pub trait Host {
    /// Current time in timer ticks.
    fn ticks(&self) -> u32;

    fn new_isn(&mut self, tcb: &Tcb) -> Wrap32;

    /// Send whatever the connection has pending: data, ACK, SYN or FIN.
    /// May advance `snd_nxt`/`snd_max` and clear `ACK_NOW`.
    fn output(&mut self, tcb: &mut Tcb);

    /// Send a bare control segment (RST or challenge ACK) in reply to `th`.
    /// `tcb` is `None` when no connection owns the segment.
    fn respond(
        &mut self,
        tcb: Option<&Tcb>,
        ip: &IpInfo,
        th: &TcpHeader,
        seq: Wrap32,
        ack: Wrap32,
        flags: TcpFlags,
    );

    // -- Timers --

    fn timer_arm(&mut self, tcb: &Tcb, kind: TimerKind, ticks: u32);
    fn timer_cancel(&mut self, tcb: &Tcb, kind: TimerKind);
    fn timer_active(&self, tcb: &Tcb, kind: TimerKind) -> bool;

    /// Called after every state change.
    fn state_change(&mut self, _tcb: &Tcb, _old: TcpState, _new: TcpState) {}

    // -- Teardown --

    /// Finalize the connection, reporting `err` to the user if present. The
    /// slot must not be used by the caller afterwards.
    fn close(&mut self, tcb: &mut Tcb, err: Option<TcpError>);

    /// Abort the connection with `err`. Unlike `close`, a synchronized
    /// connection tells the peer with a RST before it is finalized.
    fn drop_conn(&mut self, tcb: &mut Tcb, err: TcpError);

    /// Enter TIME_WAIT bookkeeping: stop the other timers and arm 2MSL.
    fn tw_start(&mut self, tcb: &mut Tcb);

    /// Process a segment for a connection in TIME_WAIT. Returns true when the
    /// segment should be looked up again as a new connection attempt.
    fn tw_check(&mut self, tcb: &mut Tcb, ip: &IpInfo, th: &TcpHeader, tlen: usize) -> bool;
}
