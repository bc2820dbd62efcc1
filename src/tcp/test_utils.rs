use std::collections::HashMap;
use std::net::Ipv6Addr;

use crate::tcp::config::TcpConfig;
use crate::tcp::errors::TcpError;
use crate::tcp::host::{Host, TimerKind};
use crate::tcp::input::{Disposition, Endpoint, TcpInput};
use crate::tcp::state::TcpState;
use crate::tcp::tcb::{Tcb, TcbFlags};
use crate::tcp::tcp_header::{IpInfo, TcpFlags, TcpHeader, TCP_HEADER_LEN};
use crate::tcp::wrap32::Wrap32;

const TIME_WAIT_TICKS: u32 = 60_000;

/// Connection state as `output` saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputCall {
    pub snd_nxt: Wrap32,
    pub snd_max: Wrap32,
    pub snd_cwnd: u32,
    pub ack_now: bool,
    pub state: TcpState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub seq: Wrap32,
    pub ack: Wrap32,
    pub flags: TcpFlags,
}

/// Records every collaborator call. With `send_model` set, `output` also
/// sends one segment of new data the way a real sender would, bounded by
/// the send buffer, `min(snd_wnd, cwnd)` and the MSS.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    pub now: u32,
    pub next_isn: Wrap32,
    pub send_model: bool,
    pub outputs: Vec<OutputCall>,
    pub responses: Vec<Response>,
    pub timers: HashMap<(usize, TimerKind), u32>,
    pub transitions: Vec<(TcpState, TcpState)>,
    pub closed: Vec<Option<TcpError>>,
    pub dropped: Vec<TcpError>,
    pub time_waits: usize,
    pub tw_checks: usize,
    pub tw_relookup: bool,
}

impl MockHost {
    pub fn arm(&mut self, kind: TimerKind, ticks: u32) {
        self.timers.insert((0, kind), ticks);
    }

    pub fn timer(&self, kind: TimerKind) -> Option<u32> {
        self.timer_for(0, kind)
    }

    pub fn timer_for(&self, id: usize, kind: TimerKind) -> Option<u32> {
        self.timers.get(&(id, kind)).copied()
    }

    fn send_segment(&mut self, tcb: &mut Tcb) {
        let offset = (tcb.snd_nxt - tcb.snd_una).max(0) as u32;
        let avail = (tcb.sndbuf.used_space() as u32).saturating_sub(offset);
        let win = tcb.snd_wnd.min(tcb.cc.snd_cwnd).saturating_sub(offset);
        let len = avail.min(win).min(tcb.t_maxseg);
        if len > 0 {
            tcb.snd_nxt += len;
            tcb.snd_max = tcb.snd_max.seq_max(tcb.snd_nxt);
        }
    }
}

impl Host for MockHost {
    fn ticks(&self) -> u32 {
        self.now
    }

    fn new_isn(&mut self, _tcb: &Tcb) -> Wrap32 {
        self.next_isn
    }

    fn output(&mut self, tcb: &mut Tcb) {
        self.outputs.push(OutputCall {
            snd_nxt: tcb.snd_nxt,
            snd_max: tcb.snd_max,
            snd_cwnd: tcb.cc.snd_cwnd,
            ack_now: tcb.has_flag(TcbFlags::ACK_NOW),
            state: tcb.state,
        });
        tcb.flags.remove(TcbFlags::ACK_NOW);
        tcb.last_ack_sent = tcb.rcv_nxt;

        // (Re)sending our SYN uses up one sequence number
        if tcb.snd_nxt == tcb.iss && matches!(tcb.state, TcpState::SynSent | TcpState::SynReceived) {
            tcb.snd_nxt += 1;
            tcb.snd_max = tcb.snd_max.seq_max(tcb.snd_nxt);
        }
        if self.send_model {
            self.send_segment(tcb);
        }
    }

    fn respond(
        &mut self,
        _tcb: Option<&Tcb>,
        _ip: &IpInfo,
        _th: &TcpHeader,
        seq: Wrap32,
        ack: Wrap32,
        flags: TcpFlags,
    ) {
        self.responses.push(Response { seq, ack, flags });
    }

    fn timer_arm(&mut self, tcb: &Tcb, kind: TimerKind, ticks: u32) {
        self.timers.insert((tcb.id, kind), ticks);
    }

    fn timer_cancel(&mut self, tcb: &Tcb, kind: TimerKind) {
        self.timers.remove(&(tcb.id, kind));
    }

    fn timer_active(&self, tcb: &Tcb, kind: TimerKind) -> bool {
        self.timers.contains_key(&(tcb.id, kind))
    }

    fn state_change(&mut self, _tcb: &Tcb, old: TcpState, new: TcpState) {
        self.transitions.push((old, new));
    }

    fn close(&mut self, _tcb: &mut Tcb, err: Option<TcpError>) {
        self.closed.push(err);
    }

    fn drop_conn(&mut self, _tcb: &mut Tcb, err: TcpError) {
        self.dropped.push(err);
    }

    fn tw_start(&mut self, tcb: &mut Tcb) {
        self.time_waits += 1;
        self.timers.retain(|(id, _), _| *id != tcb.id);
        self.timers.insert((tcb.id, TimerKind::TwoMsl), TIME_WAIT_TICKS);
    }

    fn tw_check(&mut self, _tcb: &mut Tcb, _ip: &IpInfo, _th: &TcpHeader, _tlen: usize) -> bool {
        self.tw_checks += 1;
        self.tw_relookup
    }
}

// -- Fixtures --

pub fn ip_pair() -> IpInfo {
    IpInfo {
        src: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1),
        dst: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2),
        flow: 0x6000_0000,
    }
}

pub fn header(flags: TcpFlags, seq: Wrap32, ack: Wrap32, window: u16) -> TcpHeader {
    TcpHeader {
        src_port: 1234,
        dst_port: 80,
        seq,
        ack,
        flags,
        window,
        ..TcpHeader::default()
    }
}

/// Serialize `th` and `payload` into a wire segment.
pub fn segment_bytes(th: &TcpHeader, payload: &[u8]) -> Vec<u8> {
    let mut seg = vec![0u8; th.header_len().max(TCP_HEADER_LEN)];
    let n = th.serialize(&mut seg).unwrap();
    seg.truncate(n);
    seg.extend_from_slice(payload);
    seg
}

/// Feed one segment to an existing connection from the usual peer.
pub fn deliver(
    input: &mut TcpInput,
    host: &mut MockHost,
    tcb: &mut Tcb,
    th: &TcpHeader,
    payload: &[u8],
) -> Disposition {
    let seg = segment_bytes(th, payload);
    input.input(host, &ip_pair(), th, &seg, Endpoint::Connection(tcb))
}

fn base_tcb(state: TcpState) -> Tcb {
    let mut tcb = Tcb::new(0, 8192, 4096, &TcpConfig::default());
    tcb.state = state;
    tcb.flags = TcbFlags::NO_OPT;
    tcb.laddr = ip_pair().dst;
    tcb.faddr = ip_pair().src;
    tcb.lport = 80;
    tcb.fport = 1234;
    tcb.iss = Wrap32::new(1000);
    tcb.send_seq_init();
    tcb.snd_nxt = tcb.iss + 1;
    tcb.snd_max = tcb.snd_nxt;
    tcb
}

/// Active open with our SYN outstanding.
pub fn syn_sent() -> Tcb {
    base_tcb(TcpState::SynSent)
}

/// Passive open after our SYN-ACK went out.
pub fn syn_received() -> Tcb {
    let mut tcb = base_tcb(TcpState::SynReceived);
    tcb.irs = Wrap32::new(5000);
    tcb.rcv_seq_init();
    tcb.rcv_wnd = 4096;
    tcb.rcv_adv = tcb.rcv_nxt + 4096;
    tcb.rcv_up = tcb.rcv_nxt;
    tcb.last_ack_sent = tcb.rcv_nxt;
    tcb.snd_wl1 = tcb.irs;
    tcb.snd_wnd = 1024;
    tcb.max_sndwnd = 1024;
    tcb
}

/// Idle ESTABLISHED connection: nothing in flight, nothing buffered.
pub fn established() -> Tcb {
    let mut tcb = syn_received();
    tcb.state = TcpState::Established;
    tcb.snd_una = tcb.snd_nxt;
    tcb.snd_wl1 = tcb.rcv_nxt;
    tcb.snd_wl2 = tcb.snd_una;
    let mss = tcb.t_maxseg;
    tcb.cc.conn_init(mss);
    tcb
}
