//! Per-connection segment processing for every synchronized or half-open
//! state.
//!
//! A segment moves through a fixed sequence of phases: the per-state
//! prelude, RST and SYN screening, trimming to the receive window, ACK
//! processing, the window update, data and FIN. Each phase returns a
//! [`Flow`] saying where to continue, and the segment ends in exactly one
//! [`Verdict`] that [`Engine::finish`] turns into output, a reset or nothing.

use log::{debug, trace, warn};

use crate::tcp::config::TCP_MAXWIN;
use crate::tcp::errors::TcpError;
use crate::tcp::host::{Host, TimerKind};
use crate::tcp::input::{RstReason, TcpInput};
use crate::tcp::state::TcpState;
use crate::tcp::stats::Stat;
use crate::tcp::tcb::{Tcb, TcbFlags};
use crate::tcp::tcp_header::{
    IpInfo, TcpFlags, TcpHeader, IPTOS_ECN_CE, IPTOS_ECN_ECT0, IPTOS_ECN_ECT1, IPTOS_ECN_MASK,
};
use crate::tcp::transition::{self, Event};

/// How processing of a segment ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Send if anything is owed, then arm a pending delayed ACK.
    Done,
    /// Output already handled; only arm a pending delayed ACK.
    Delack,
    Drop,
    /// Drop, but ACK to resynchronize the peer.
    DropAfterAck,
    DropWithReset(RstReason),
    /// The connection was handed to close or time-wait; touch nothing.
    Finished,
}

/// Where to continue after a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    ProcessAck,
    Step6,
    Exit(Verdict),
}

pub(crate) struct Engine<'a, H: Host> {
    pub(crate) input: &'a mut TcpInput,
    pub(crate) host: &'a mut H,
    pub(crate) tcb: &'a mut Tcb,
    pub(crate) ip: &'a IpInfo,
    pub(crate) th: TcpHeader, // seq, flags and urgent follow the trimming
    payload: &'a [u8],
    pub(crate) data_start: usize,
    pub(crate) tlen: usize,
    pub(crate) tiwin: u32, // Scaled peer window
    iptos: u8,
    pub(crate) needoutput: bool,
}

impl<'a, H: Host> Engine<'a, H> {
    pub(crate) fn new(
        input: &'a mut TcpInput,
        host: &'a mut H,
        tcb: &'a mut Tcb,
        ip: &'a IpInfo,
        th: &TcpHeader,
        payload: &'a [u8],
        iptos: u8,
    ) -> Self {
        Engine {
            input,
            host,
            tcb,
            ip,
            th: *th,
            payload,
            data_start: 0,
            tlen: payload.len(),
            tiwin: 0,
            iptos,
            needoutput: false,
        }
    }

    pub(crate) fn run(mut self) {
        let verdict = self.process();
        self.finish(verdict);
    }

    pub(crate) fn thflag(&self, flag: TcpFlags) -> bool {
        self.th.flags.contains(flag)
    }

    fn process(&mut self) -> Verdict {
        self.tcb.t_rcvtime = self.host.ticks();
        if self.tcb.state.have_established() {
            self.host.timer_arm(self.tcb, TimerKind::Keep, self.input.config.keep_idle);
        }

        // SYN windows are never scaled and snd_scale is still zero in SYN_SENT
        self.tiwin = (self.th.window as u32) << self.tcb.snd_scale;
        self.ecn_input();
        if self.tcb.state == TcpState::SynSent && self.thflag(TcpFlags::SYN) {
            self.tcb.snd_wnd = self.th.window as u32;
        }
        self.update_rcv_wnd();

        if self.input.config.header_prediction {
            if let Some(verdict) = self.header_prediction() {
                return verdict;
            }
        }

        let mut flow = match self.tcb.state {
            TcpState::SynSent => self.syn_sent(),
            TcpState::SynReceived => self.syn_received(),
            _ => Flow::Continue,
        };
        if flow == Flow::Continue {
            flow = self.synchronized();
        }
        if flow == Flow::ProcessAck {
            flow = self.process_ack();
        }
        match flow {
            Flow::Exit(verdict) => verdict,
            _ => self.step6(),
        }
    }

    fn ecn_input(&mut self) {
        if !self.tcb.has_flag(TcbFlags::ECN_PERMIT) {
            return;
        }
        if self.thflag(TcpFlags::CWR) {
            self.tcb.flags.remove(TcbFlags::ECN_SND_ECE);
        }
        match self.iptos & IPTOS_ECN_MASK {
            IPTOS_ECN_CE => {
                self.tcb.flags.insert(TcbFlags::ECN_SND_ECE);
                self.input.stats.inc(Stat::EcnCe);
            }
            IPTOS_ECN_ECT0 => self.input.stats.inc(Stat::EcnEct0),
            IPTOS_ECN_ECT1 => self.input.stats.inc(Stat::EcnEct1),
            _ => {}
        }
    }

    /// The receive window never shrinks below what was already advertised.
    fn update_rcv_wnd(&mut self) {
        let free = self.tcb.rcvbuf.free_space() as i64;
        let advertised = (self.tcb.rcv_adv - self.tcb.rcv_nxt) as i64;
        self.tcb.rcv_wnd = free.max(advertised) as u32;
    }

    pub(crate) fn transition(&mut self, event: Event) -> Result<TcpState, Verdict> {
        transition::apply(self.host, self.tcb, event).map_err(|e| {
            warn!("tcb {}: {}", self.tcb.id, e);
            Verdict::Drop
        })
    }

    // -- Per-state preludes --

    fn syn_sent(&mut self) -> Flow {
        let ack = self.th.ack;
        if self.thflag(TcpFlags::ACK) && (ack.seq_leq(self.tcb.iss) || ack.seq_gt(self.tcb.snd_max)) {
            return Flow::Exit(Verdict::DropWithReset(RstReason::Unlimited));
        }
        if self.th.flags.contains(TcpFlags::ACK | TcpFlags::RST) {
            if let Err(v) = self.transition(Event::Reset) {
                return Flow::Exit(v);
            }
            self.host.drop_conn(self.tcb, TcpError::ConnectionRefused);
            return Flow::Exit(Verdict::Finished);
        }
        if self.thflag(TcpFlags::RST) || !self.thflag(TcpFlags::SYN) {
            return Flow::Exit(Verdict::Drop);
        }

        self.tcb.irs = self.th.seq;
        self.tcb.rcv_seq_init();
        if self.thflag(TcpFlags::ACK) {
            if self.tcb.flags.contains(TcbFlags::RCVD_SCALE | TcbFlags::REQ_SCALE) {
                self.tcb.rcv_scale = self.tcb.request_r_scale;
            }
            let wnd = self.tcb.rcv_wnd.min(TCP_MAXWIN << self.tcb.rcv_scale);
            self.tcb.rcv_adv += wnd;
            self.tcb.snd_una += 1; // SYN is acked
            self.tcb.flags.insert(TcbFlags::ACK_NOW);
            if self.thflag(TcpFlags::ECE) && self.input.config.ecn {
                self.tcb.flags.insert(TcbFlags::ECN_PERMIT);
                self.input.stats.inc(Stat::EcnShs);
            }
            self.tcb.t_starttime = self.host.ticks();
            if self.tcb.has_flag(TcbFlags::NEED_FIN) {
                if let Err(v) = self.transition(Event::SynAckedClosePending) {
                    return Flow::Exit(v);
                }
                self.tcb.flags.remove(TcbFlags::NEED_FIN);
                self.th.flags.remove(TcpFlags::SYN);
            } else {
                if let Err(v) = self.transition(Event::SynAcked) {
                    return Flow::Exit(v);
                }
                self.established();
            }
        } else {
            // Simultaneous open
            self.tcb.flags.insert(TcbFlags::ACK_NOW | TcbFlags::NEED_SYN);
            self.host.timer_cancel(self.tcb, TimerKind::Rexmt);
            if let Err(v) = self.transition(Event::SimultaneousOpen) {
                return Flow::Exit(v);
            }
        }

        // Skip the SYN and keep any data inside the window
        self.th.seq += 1;
        let rcv_wnd = self.tcb.rcv_wnd as usize;
        if self.tlen > rcv_wnd {
            self.input.stats.inc(Stat::RcvPackAfterWin);
            self.input.stats.add(Stat::RcvByteAfterWin, (self.tlen - rcv_wnd) as u64);
            self.tlen = rcv_wnd;
            self.th.flags.remove(TcpFlags::FIN);
        }
        self.tcb.snd_wl1 = self.th.seq - 1;
        self.tcb.rcv_up = self.th.seq;

        if self.thflag(TcpFlags::ACK) {
            Flow::ProcessAck
        } else {
            Flow::Step6
        }
    }

    fn syn_received(&mut self) -> Flow {
        let ack = self.th.ack;
        if self.thflag(TcpFlags::ACK) && (ack.seq_leq(self.tcb.snd_una) || ack.seq_gt(self.tcb.snd_max)) {
            return Flow::Exit(Verdict::DropWithReset(RstReason::OpenPort));
        }
        if self.thflag(TcpFlags::SYN) && self.th.seq == self.tcb.irs {
            // Peer retransmitted its SYN: resend our SYN-ACK
            self.tcb.snd_nxt = self.tcb.snd_una;
            self.tcb.flags.insert(TcbFlags::ACK_NOW);
        }
        Flow::Continue
    }

    /// Bookkeeping on entering ESTABLISHED.
    fn established(&mut self) {
        self.tcb.cc.conn_init(self.tcb.t_maxseg);
        self.input.stats.inc(Stat::Connects);
        self.host.timer_arm(self.tcb, TimerKind::Keep, self.input.config.keep_idle);
    }

    // -- Shared processing --

    fn synchronized(&mut self) -> Flow {
        if self.thflag(TcpFlags::RST) {
            return Flow::Exit(self.rst_input());
        }

        let state = self.tcb.state;
        if self.thflag(TcpFlags::SYN) && state != TcpState::SynReceived {
            self.input.stats.inc(Stat::BadSyn);
            self.challenge_ack();
            return Flow::Exit(Verdict::Drop);
        }

        // A SYN_RECEIVED segment from before the peer's ISN cannot be ours
        if state == TcpState::SynReceived && self.th.seq.seq_lt(self.tcb.irs) {
            return Flow::Exit(Verdict::DropWithReset(RstReason::OpenPort));
        }

        self.trim_leading();
        if let Some(verdict) = self.trim_trailing() {
            return Flow::Exit(verdict);
        }

        if !self.thflag(TcpFlags::ACK) {
            return if state == TcpState::SynReceived || self.tcb.has_flag(TcbFlags::NEED_SYN) {
                Flow::Step6
            } else if self.tcb.has_flag(TcbFlags::ACK_NOW) {
                Flow::Exit(Verdict::DropAfterAck)
            } else {
                Flow::Exit(Verdict::Drop)
            };
        }

        self.ack_input()
    }

    fn rst_input(&mut self) -> Verdict {
        let seq = self.th.seq;
        let last = self.tcb.last_ack_sent;
        let rcv_wnd = self.tcb.rcv_wnd;
        let in_window = (seq.seq_geq(last) && seq.seq_lt(last + rcv_wnd)) || (rcv_wnd == 0 && seq == last);

        if !in_window {
            self.input.stats.inc(Stat::BadRst);
            debug!("tcb {}: RST seq {} outside window at {}", self.tcb.id, seq, last);
            return Verdict::Drop;
        }
        if seq != last {
            self.input.stats.inc(Stat::BadRst);
            self.challenge_ack();
            return Verdict::Drop;
        }

        let err = match self.tcb.state {
            TcpState::SynReceived => Some(TcpError::ConnectionRefused),
            TcpState::Established | TcpState::FinWait1 | TcpState::FinWait2 | TcpState::CloseWait => {
                Some(TcpError::ConnectionReset)
            }
            _ => None,
        };
        if let Err(v) = self.transition(Event::Reset) {
            return v;
        }
        self.host.close(self.tcb, err);
        Verdict::Finished
    }

    /// RFC 5961: make the peer prove it knows our sequence space.
    pub(crate) fn challenge_ack(&mut self) {
        self.input.stats.inc(Stat::ChallengeAck);
        let (seq, ack) = (self.tcb.snd_nxt, self.tcb.rcv_nxt);
        self.host.respond(Some(&*self.tcb), self.ip, &self.th, seq, ack, TcpFlags::ACK);
        self.tcb.last_ack_sent = self.tcb.rcv_nxt;
    }

    /// Drop bytes before `rcv_nxt`. A segment that is entirely old becomes a
    /// bare ACK trigger.
    pub(crate) fn trim_leading(&mut self) {
        let mut todrop = (self.tcb.rcv_nxt - self.th.seq) as i64;
        if todrop <= 0 {
            return;
        }

        if self.thflag(TcpFlags::SYN) {
            self.th.flags.remove(TcpFlags::SYN);
            self.th.seq += 1;
            if self.th.urgent > 1 {
                self.th.urgent -= 1;
            } else {
                self.th.flags.remove(TcpFlags::URG);
            }
            todrop -= 1;
        }

        let tlen = self.tlen as i64;
        if todrop > tlen || (todrop == tlen && !self.thflag(TcpFlags::FIN)) {
            // Any valid FIN is to the left of the window; this one is a duplicate
            self.th.flags.remove(TcpFlags::FIN);
            self.tcb.flags.insert(TcbFlags::ACK_NOW);
            todrop = tlen;
            self.input.stats.inc(Stat::RcvDupPack);
            self.input.stats.add(Stat::RcvDupByte, todrop as u64);
        } else {
            self.input.stats.inc(Stat::RcvPartDupPack);
            self.input.stats.add(Stat::RcvPartDupByte, todrop as u64);
        }

        let todrop = todrop as usize;
        self.data_start += todrop;
        self.th.seq += todrop as u32;
        self.tlen -= todrop;
        if self.th.urgent as usize > todrop {
            self.th.urgent -= todrop as u16;
        } else {
            self.th.flags.remove(TcpFlags::URG);
            self.th.urgent = 0;
        }
    }

    /// Drop bytes past `rcv_nxt + rcv_wnd`. Only a probe at the edge of a
    /// closed window survives losing its whole payload.
    pub(crate) fn trim_trailing(&mut self) -> Option<Verdict> {
        let todrop = (self.th.seq + self.tlen as u32) - (self.tcb.rcv_nxt + self.tcb.rcv_wnd);
        if todrop <= 0 {
            return None;
        }
        let todrop = todrop as usize;

        self.input.stats.inc(Stat::RcvPackAfterWin);
        if todrop >= self.tlen {
            self.input.stats.add(Stat::RcvByteAfterWin, self.tlen as u64);
            if self.tcb.rcv_wnd == 0 && self.th.seq == self.tcb.rcv_nxt {
                self.tcb.flags.insert(TcbFlags::ACK_NOW);
                self.input.stats.inc(Stat::RcvWinProbe);
            } else {
                return Some(Verdict::DropAfterAck);
            }
        } else {
            self.input.stats.add(Stat::RcvByteAfterWin, todrop as u64);
        }
        self.tlen = self.tlen.saturating_sub(todrop);
        self.th.flags.remove(TcpFlags::PSH | TcpFlags::FIN);
        None
    }

    fn ack_input(&mut self) -> Flow {
        match self.tcb.state {
            TcpState::SynReceived => {
                if self.tcb.flags.contains(TcbFlags::RCVD_SCALE | TcbFlags::REQ_SCALE) {
                    self.tcb.rcv_scale = self.tcb.request_r_scale;
                    self.tcb.snd_wnd = self.tiwin;
                }
                self.tcb.t_starttime = self.host.ticks();
                if self.tcb.has_flag(TcbFlags::NEED_FIN) {
                    if let Err(v) = self.transition(Event::SynAckedClosePending) {
                        return Flow::Exit(v);
                    }
                    self.tcb.flags.remove(TcbFlags::NEED_FIN);
                } else {
                    if let Err(v) = self.transition(Event::SynAcked) {
                        return Flow::Exit(v);
                    }
                    self.established();
                }
                self.tcb.snd_wl1 = self.th.seq - 1;
            }
            TcpState::Established
            | TcpState::FinWait1
            | TcpState::FinWait2
            | TcpState::CloseWait
            | TcpState::Closing
            | TcpState::LastAck => {}
            _ => return Flow::Exit(Verdict::Drop),
        }

        let ack = self.th.ack;
        if ack.seq_gt(self.tcb.snd_max) {
            self.input.stats.inc(Stat::RcvAckTooMuch);
            return Flow::Exit(Verdict::DropAfterAck);
        }
        if ack.seq_leq(self.tcb.snd_una) {
            return self.duplicate_ack();
        }

        self.recovery_ack();
        self.tcb.cc.t_dupacks = 0;
        if self.tcb.has_flag(TcbFlags::NEED_SYN) {
            // Half-synchronized and our SYN is now acked
            self.tcb.flags.remove(TcbFlags::NEED_SYN);
            self.tcb.snd_una += 1;
            if self.tcb.flags.contains(TcbFlags::RCVD_SCALE | TcbFlags::REQ_SCALE) {
                self.tcb.rcv_scale = self.tcb.request_r_scale;
            }
        }
        Flow::ProcessAck
    }

    fn process_ack(&mut self) -> Flow {
        let ack = self.th.ack;
        let acked = (ack - self.tcb.snd_una).max(0) as u32;
        self.input.stats.inc(Stat::RcvAckPack);
        self.input.stats.add(Stat::RcvAckByte, acked as u64);

        self.ack_timers();
        if acked == 0 {
            return Flow::Step6;
        }

        self.ack_received(acked);
        let ourfinisacked = self.release_acked(acked);

        let cc = &mut self.tcb.cc;
        if !cc.in_fast_recovery && self.tcb.snd_una.seq_gt(cc.snd_recover) && ack.seq_leq(cc.snd_recover) {
            // snd_una wrapped past snd_recover
            cc.snd_recover = ack - 1;
        }
        if cc.in_fast_recovery && ack.seq_geq(cc.snd_recover) {
            cc.in_fast_recovery = false;
        }
        self.tcb.snd_una = ack;
        if self.tcb.has_flag(TcbFlags::SACK_PERMIT) && self.tcb.snd_una.seq_gt(self.tcb.cc.snd_recover) {
            self.tcb.cc.snd_recover = self.tcb.snd_una;
        }
        if self.tcb.snd_nxt.seq_lt(self.tcb.snd_una) {
            self.tcb.snd_nxt = self.tcb.snd_una;
        }

        if !ourfinisacked {
            return Flow::Step6;
        }
        match self.tcb.state {
            TcpState::FinWait1 => {
                if self.tcb.has_flag(TcbFlags::CANT_RCV_MORE) {
                    // No FIN may ever come; don't wait for it forever
                    let cfg = &self.input.config;
                    let t = if cfg.fast_finwait2_recycle { cfg.finwait2_timeout } else { cfg.max_idle };
                    self.host.timer_arm(self.tcb, TimerKind::TwoMsl, t);
                }
                if let Err(v) = self.transition(Event::FinAcked) {
                    return Flow::Exit(v);
                }
            }
            TcpState::Closing => {
                if let Err(v) = self.transition(Event::FinAcked) {
                    return Flow::Exit(v);
                }
                self.host.tw_start(self.tcb);
                return Flow::Exit(Verdict::Finished);
            }
            TcpState::LastAck => {
                if let Err(v) = self.transition(Event::FinAcked) {
                    return Flow::Exit(v);
                }
                self.host.close(self.tcb, None);
                return Flow::Exit(Verdict::Finished);
            }
            _ => {}
        }
        Flow::Step6
    }

    /// Rearm or stop the retransmit timer after `th.ack` advanced.
    pub(crate) fn ack_timers(&mut self) {
        if self.th.ack == self.tcb.snd_max {
            self.host.timer_cancel(self.tcb, TimerKind::Rexmt);
            self.needoutput = true;
        } else if !self.host.timer_active(self.tcb, TimerKind::Persist) {
            self.host.timer_arm(self.tcb, TimerKind::Rexmt, self.tcb.t_rxtcur);
        }
    }

    /// Free acknowledged bytes from the send buffer. Returns true when the
    /// ACK also covers our FIN.
    pub(crate) fn release_acked(&mut self, acked: u32) -> bool {
        let tcb = &mut *self.tcb;
        let used = tcb.sndbuf.used_space() as u32;
        if acked > used {
            tcb.snd_wnd = tcb.snd_wnd.saturating_sub(used);
            tcb.sndbuf.pop(used as usize);
            true
        } else {
            tcb.sndbuf.pop(acked as usize);
            tcb.snd_wnd = tcb.snd_wnd.saturating_sub(acked);
            false
        }
    }

    // -- Window update, data and FIN --

    fn step6(&mut self) -> Verdict {
        if self.thflag(TcpFlags::ACK) {
            self.update_window();
        }
        self.pull_rcv_up();
        self.dodata();
        if self.thflag(TcpFlags::FIN) {
            if let Some(verdict) = self.fin_input() {
                return verdict;
            }
        }
        Verdict::Done
    }

    /// Take the peer's window if `(seq, ack)` is newer than the last update.
    pub(crate) fn update_window(&mut self) {
        let (seq, ack, tiwin) = (self.th.seq, self.th.ack, self.tiwin);
        let tcb = &mut *self.tcb;
        let newer = tcb.snd_wl1.seq_lt(seq)
            || (tcb.snd_wl1 == seq
                && (tcb.snd_wl2.seq_lt(ack) || (tcb.snd_wl2 == ack && tiwin > tcb.snd_wnd)));
        if !newer {
            return;
        }

        if self.tlen == 0 && tcb.snd_wl2 == ack && tiwin > tcb.snd_wnd {
            self.input.stats.inc(Stat::RcvWinUpd);
        }
        tcb.snd_wnd = tiwin;
        tcb.snd_wl1 = seq;
        tcb.snd_wl2 = ack;
        tcb.max_sndwnd = tcb.max_sndwnd.max(tcb.snd_wnd);
        self.needoutput = true;
    }

    /// No urgent data is delivered, so the urgent pointer trails rcv_nxt.
    pub(crate) fn pull_rcv_up(&mut self) {
        if self.tcb.rcv_nxt.seq_gt(self.tcb.rcv_up) {
            self.tcb.rcv_up = self.tcb.rcv_nxt;
        }
    }

    fn dodata(&mut self) {
        let has_text = self.tlen > 0 || self.thflag(TcpFlags::FIN);
        if !has_text || self.tcb.state.have_rcvd_fin() {
            self.th.flags.remove(TcpFlags::FIN);
            return;
        }

        if self.th.seq == self.tcb.rcv_nxt && self.tcb.state.have_established() {
            self.deliver_in_order();
        } else {
            // Nothing is queued out of order; just tell the peer where we are
            self.tcb.flags.insert(TcbFlags::ACK_NOW);
            if self.th.seq != self.tcb.rcv_nxt || self.tlen > 0 {
                self.th.flags.remove(TcpFlags::FIN);
            }
        }
    }

    /// Append the (trimmed) payload at `rcv_nxt` and ACK it right away.
    pub(crate) fn deliver_in_order(&mut self) {
        self.tcb.flags.insert(TcbFlags::ACK_NOW);
        let payload = self.payload;
        let data = &payload[self.data_start..self.data_start + self.tlen];

        let n = if self.tcb.has_flag(TcbFlags::CANT_RCV_MORE) {
            data.len()
        } else {
            let n = self.tcb.rcvbuf.write(data);
            if n < data.len() {
                warn!("tcb {}: receive buffer took {} of {} bytes", self.tcb.id, n, data.len());
                self.th.flags.remove(TcpFlags::FIN);
            }
            n
        };
        self.tcb.rcv_nxt += n as u32;
        self.input.stats.inc(Stat::RcvPack);
        self.input.stats.add(Stat::RcvByte, n as u64);
    }

    fn fin_input(&mut self) -> Option<Verdict> {
        if !self.tcb.state.have_rcvd_fin() {
            self.tcb.flags.insert(TcbFlags::CANT_RCV_MORE);
            // Half-synchronized: let the ACK ride on our SYN
            if self.tcb.has_flag(TcbFlags::NEED_SYN) {
                self.tcb.flags.insert(TcbFlags::DEL_ACK);
            } else {
                self.tcb.flags.insert(TcbFlags::ACK_NOW);
            }
            self.tcb.rcv_nxt += 1;
        }

        match self.tcb.state {
            TcpState::SynReceived | TcpState::Established | TcpState::FinWait1 => {
                if self.tcb.state == TcpState::SynReceived {
                    self.tcb.t_starttime = self.host.ticks();
                }
                if let Err(v) = self.transition(Event::FinReceived) {
                    return Some(v);
                }
            }
            TcpState::FinWait2 => {
                if let Err(v) = self.transition(Event::FinReceived) {
                    return Some(v);
                }
                self.host.tw_start(self.tcb);
                return Some(Verdict::Finished);
            }
            _ => {}
        }
        None
    }

    // -- Exit paths --

    pub(crate) fn finish(mut self, verdict: Verdict) {
        trace!("tcb {}: {:?}", self.tcb.id, verdict);
        match verdict {
            Verdict::Done => {
                if self.needoutput || self.tcb.has_flag(TcbFlags::ACK_NOW) {
                    self.host.output(self.tcb);
                }
                self.check_delack();
            }
            Verdict::Delack => self.check_delack(),
            Verdict::Drop | Verdict::Finished => {}
            Verdict::DropAfterAck => {
                // Never ACK a SYN_RECEIVED segment whose ACK fails the
                // handshake check; that is how two forged listeners loop
                let ack = self.th.ack;
                if self.tcb.state == TcpState::SynReceived
                    && self.thflag(TcpFlags::ACK)
                    && (self.tcb.snd_una.seq_gt(ack) || ack.seq_gt(self.tcb.snd_max))
                {
                    self.reset(RstReason::OpenPort);
                    return;
                }
                self.tcb.flags.insert(TcbFlags::ACK_NOW);
                self.host.output(self.tcb);
            }
            Verdict::DropWithReset(reason) => self.reset(reason),
        }
    }

    fn check_delack(&mut self) {
        if self.tcb.has_flag(TcbFlags::DEL_ACK) {
            self.tcb.flags.remove(TcbFlags::DEL_ACK);
            self.host.timer_arm(self.tcb, TimerKind::Delack, self.input.config.delack_time);
        }
    }

    fn reset(&mut self, reason: RstReason) {
        self.input.drop_with_reset(self.host, Some(&*self.tcb), self.ip, &self.th, self.tlen, reason);
    }
}

// -- Unit tests --
