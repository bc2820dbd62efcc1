use bitflags::bitflags;
use std::net::Ipv6Addr;

use crate::tcp::cbuf::CircularBuffer;
use crate::tcp::config::{TcpConfig, TCP_DEFAULT_MSS};
use crate::tcp::congestion::Congestion;
use crate::tcp::state::TcpState;
use crate::tcp::wrap32::Wrap32;

bitflags! {
    /// Per-connection condition flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TcbFlags: u32 {
        const ACK_NOW = 1 << 0;       // Send an ACK with the next output
        const DEL_ACK = 1 << 1;       // ACK owed, send on delayed-ack timer
        const NO_OPT = 1 << 2;        // Don't use TCP options
        const SENT_FIN = 1 << 3;      // Our FIN has been sent
        const REQ_SCALE = 1 << 4;     // We asked for window scaling
        const RCVD_SCALE = 1 << 5;    // Peer sent window scaling
        const NEED_SYN = 1 << 6;      // Half-synchronized, SYN still owed
        const NEED_FIN = 1 << 7;      // Local close requested before established
        const SACK_PERMIT = 1 << 8;   // Never negotiated, kept as a capability bit
        const ECN_PERMIT = 1 << 9;    // ECN negotiated
        const ECN_SND_ECE = 1 << 10;  // Echo congestion with ECE
        const CANT_RCV_MORE = 1 << 11; // Receive side closed by peer FIN
    }
}

/// Connection control block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tcb {
    pub id: usize, // Slot in the owner's connection pool
    pub state: TcpState,
    pub flags: TcbFlags,

    // -- Peer identity --
    pub laddr: Ipv6Addr,
    pub faddr: Ipv6Addr,
    pub lport: u16,
    pub fport: u16,

    // -- Send sequence space --
    pub iss: Wrap32,
    pub snd_una: Wrap32, // Oldest unacknowledged
    pub snd_nxt: Wrap32, // Next to send
    pub snd_max: Wrap32, // Highest sent
    pub snd_up: Wrap32,
    pub snd_wl1: Wrap32, // Seq of last window update
    pub snd_wl2: Wrap32, // Ack of last window update
    pub snd_wnd: u32,
    pub max_sndwnd: u32,

    // -- Receive sequence space --
    pub irs: Wrap32,
    pub rcv_nxt: Wrap32,
    pub rcv_adv: Wrap32, // Right edge of the advertised window
    pub rcv_up: Wrap32,
    pub last_ack_sent: Wrap32,
    pub rcv_wnd: u32,

    // -- Window scaling --
    pub snd_scale: u8,
    pub rcv_scale: u8,
    pub request_r_scale: u8,

    pub cc: Congestion,

    // -- Timing, in ticks --
    pub t_maxseg: u32,
    pub t_rxtcur: u32, // Current retransmission timeout
    pub t_rcvtime: u32,
    pub t_starttime: u32,
    pub t_rtttime: u32, // Zero when no segment is being timed

    pub sndbuf: CircularBuffer,
    pub rcvbuf: CircularBuffer,
}

impl Tcb {
    pub fn new(id: usize, sndbuf_len: usize, rcvbuf_len: usize, cfg: &TcpConfig) -> Self {
        Tcb {
            id,
            state: TcpState::Closed,
            flags: TcbFlags::empty(),
            laddr: Ipv6Addr::UNSPECIFIED,
            faddr: Ipv6Addr::UNSPECIFIED,
            lport: 0,
            fport: 0,
            iss: Wrap32::default(),
            snd_una: Wrap32::default(),
            snd_nxt: Wrap32::default(),
            snd_max: Wrap32::default(),
            snd_up: Wrap32::default(),
            snd_wl1: Wrap32::default(),
            snd_wl2: Wrap32::default(),
            snd_wnd: 0,
            max_sndwnd: 0,
            irs: Wrap32::default(),
            rcv_nxt: Wrap32::default(),
            rcv_adv: Wrap32::default(),
            rcv_up: Wrap32::default(),
            last_ack_sent: Wrap32::default(),
            rcv_wnd: 0,
            snd_scale: 0,
            rcv_scale: 0,
            request_r_scale: 0,
            cc: Congestion::default(),
            t_maxseg: TCP_DEFAULT_MSS,
            t_rxtcur: cfg.default_rto,
            t_rcvtime: 0,
            t_starttime: 0,
            t_rtttime: 0,
            sndbuf: CircularBuffer::new(sndbuf_len),
            rcvbuf: CircularBuffer::new(rcvbuf_len),
        }
    }

    /// Return a finalized slot to its freshly allocated condition, keeping
    /// its buffers' storage.
    pub fn recycle(&mut self, cfg: &TcpConfig) {
        let mut sndbuf = std::mem::replace(&mut self.sndbuf, CircularBuffer::new(0));
        let mut rcvbuf = std::mem::replace(&mut self.rcvbuf, CircularBuffer::new(0));
        sndbuf.pop(sndbuf.used_space());
        rcvbuf.pop(rcvbuf.used_space());
        *self = Tcb { sndbuf, rcvbuf, ..Tcb::new(self.id, 0, 0, cfg) };
    }

    /// Receive sequence space starts just past the peer's SYN.
    pub fn rcv_seq_init(&mut self) {
        self.rcv_nxt = self.irs + 1;
        self.rcv_adv = self.rcv_nxt;
    }

    pub fn send_seq_init(&mut self) {
        self.snd_una = self.iss;
        self.snd_nxt = self.iss;
        self.snd_max = self.iss;
        self.snd_up = self.iss;
        self.cc.snd_recover = self.iss;
    }

    /// Bytes sent but not yet acknowledged.
    pub fn in_flight(&self) -> u32 {
        (self.snd_nxt - self.snd_una).max(0) as u32
    }

    pub fn has_flag(&self, flag: TcbFlags) -> bool {
        self.flags.contains(flag)
    }
}

/// A listening endpoint: a local port plus the single slot the next valid
/// SYN is accepted into. There is no backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenTcb {
    pub lport: u16,
}

// -- Unit tests --
