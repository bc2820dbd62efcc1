//! NewReno congestion control and the duplicate-ACK machinery on top of it:
//! fast retransmit, fast recovery and limited transmit (RFC 3042).

use log::debug;

use crate::tcp::config::TCP_MAXWIN;
use crate::tcp::engine::{Engine, Flow, Verdict};
use crate::tcp::host::{Host, TimerKind};
use crate::tcp::stats::Stat;
use crate::tcp::tcb::TcbFlags;
use crate::tcp::tcp_header::TcpFlags;
use crate::tcp::wrap32::Wrap32;

/// Congestion state of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Congestion {
    pub snd_cwnd: u32,
    pub snd_ssthresh: u32,
    pub t_dupacks: u32, // Consecutive duplicate ACKs
    pub snd_recover: Wrap32, // snd_max when fast recovery began
    pub snd_limited: u32, // Segments sent by limited transmit
    pub in_fast_recovery: bool,
}

impl Default for Congestion {
    fn default() -> Self {
        Congestion {
            snd_cwnd: TCP_MAXWIN << 14,
            snd_ssthresh: TCP_MAXWIN << 14,
            t_dupacks: 0,
            snd_recover: Wrap32::new(0),
            snd_limited: 0,
            in_fast_recovery: false,
        }
    }
}

impl Congestion {
    /// Initial window on entering ESTABLISHED (RFC 3390).
    pub fn conn_init(&mut self, mss: u32) {
        let mss = mss.max(1);
        self.snd_cwnd = (4 * mss).min((2 * mss).max(4380));
    }

    /// Open the window for `acked` newly acknowledged bytes. Slow start below
    /// ssthresh, one segment per window above it.
    pub fn ack_received(&mut self, acked: u32, mss: u32, max_cwnd: u32) {
        if self.in_fast_recovery {
            return;
        }
        let mss = mss.max(1);
        let incr = if self.snd_cwnd <= self.snd_ssthresh {
            acked.min(mss)
        } else {
            (mss * mss / self.snd_cwnd.max(1)).max(1)
        };
        self.snd_cwnd = self.snd_cwnd.saturating_add(incr).min(max_cwnd);
    }

    /// Halve the flight size into ssthresh and remember where recovery ends.
    pub fn enter_fast_recovery(&mut self, snd_wnd: u32, mss: u32, snd_max: Wrap32) {
        let mss = mss.max(1);
        let win = snd_wnd.min(self.snd_cwnd) / 2 / mss;
        self.snd_ssthresh = win.max(2) * mss;
        self.snd_recover = snd_max;
        self.in_fast_recovery = true;
    }

    /// Deflate the window when an ACK ends recovery.
    pub fn post_recovery(&mut self, snd_max: Wrap32, ack: Wrap32, mss: u32) {
        let pipe = (snd_max - ack).max(0) as u32;
        self.snd_cwnd = if pipe < self.snd_ssthresh {
            pipe + mss.max(1)
        } else {
            self.snd_ssthresh
        };
    }
}

impl<H: Host> Engine<'_, H> {
    /// Handle an ACK at or below snd_una.
    pub(crate) fn duplicate_ack(&mut self) -> Flow {
        if self.tlen != 0 || self.tiwin != self.tcb.snd_wnd {
            self.tcb.cc.t_dupacks = 0;
            return Flow::Step6;
        }
        // A first FIN during simultaneous close is not a duplicate
        if self.thflag(TcpFlags::FIN) && !self.tcb.state.have_rcvd_fin() {
            self.tcb.cc.t_dupacks = 0;
            return Flow::Step6;
        }

        self.input.stats.inc(Stat::RcvDupAck);
        if !self.host.timer_active(self.tcb, TimerKind::Rexmt) || self.th.ack != self.tcb.snd_una {
            self.tcb.cc.t_dupacks = 0;
            return Flow::Step6;
        }

        self.tcb.cc.t_dupacks += 1;
        let thresh = self.input.config.rexmt_thresh;
        let dupacks = self.tcb.cc.t_dupacks;
        if dupacks > thresh || self.tcb.cc.in_fast_recovery {
            // Each further duplicate is a segment that left the network
            self.tcb.cc.snd_cwnd += self.tcb.t_maxseg;
            self.host.output(self.tcb);
            return Flow::Exit(Verdict::Drop);
        }
        if dupacks == thresh {
            let stale = if self.tcb.has_flag(TcbFlags::SACK_PERMIT) {
                self.tcb.cc.in_fast_recovery
            } else {
                self.th.ack.seq_leq(self.tcb.cc.snd_recover)
            };
            if stale {
                self.tcb.cc.t_dupacks = 0;
                return Flow::Step6;
            }
            self.fast_retransmit();
            return Flow::Exit(Verdict::Drop);
        }
        if self.input.config.limited_transmit {
            self.limited_transmit();
            return Flow::Exit(Verdict::Drop);
        }
        Flow::Step6
    }

    /// Resend the segment at `th.ack` alone, then inflate cwnd by the
    /// segments the duplicates account for.
    fn fast_retransmit(&mut self) {
        let onxt = self.tcb.snd_nxt;
        let mss = self.tcb.t_maxseg;
        let (snd_wnd, snd_max) = (self.tcb.snd_wnd, self.tcb.snd_max);
        self.tcb.cc.enter_fast_recovery(snd_wnd, mss, snd_max);
        self.host.timer_cancel(self.tcb, TimerKind::Rexmt);
        self.tcb.t_rtttime = 0;
        self.tcb.snd_nxt = self.th.ack;
        self.tcb.cc.snd_cwnd = mss;
        self.input.stats.inc(Stat::SndRexmitFast);
        debug!("tcb {}: fast retransmit at {}", self.tcb.id, self.th.ack);
        self.host.output(self.tcb);

        let cc = &mut self.tcb.cc;
        cc.snd_cwnd = cc.snd_ssthresh + mss * cc.t_dupacks.saturating_sub(cc.snd_limited);
        if onxt.seq_gt(self.tcb.snd_nxt) {
            self.tcb.snd_nxt = onxt;
        }
    }

    /// Let each of the first duplicates clock out one new segment.
    fn limited_transmit(&mut self) {
        let cc = &mut self.tcb.cc;
        if cc.t_dupacks == 1 {
            cc.snd_limited = 0;
        }
        let oldcwnd = cc.snd_cwnd;
        let oldsndmax = self.tcb.snd_max;
        let in_flight = self.tcb.in_flight();
        let extra = self.tcb.cc.t_dupacks.saturating_sub(self.tcb.cc.snd_limited);
        self.tcb.cc.snd_cwnd = in_flight + extra * self.tcb.t_maxseg;

        // Only new data is worth sending; a bare ACK would be another duplicate
        let avail = self.tcb.sndbuf.used_space() as i64 - in_flight as i64;
        if avail > 0 {
            self.host.output(self.tcb);
        }

        let sent = (self.tcb.snd_max - oldsndmax).max(0) as u32;
        let cc = &mut self.tcb.cc;
        if sent > self.tcb.t_maxseg {
            cc.snd_limited = 2;
        } else if sent > 0 {
            cc.snd_limited += 1;
        }
        cc.snd_cwnd = oldcwnd;
    }

    /// NewReno bookkeeping for an ACK that advances snd_una while in fast
    /// recovery.
    pub(crate) fn recovery_ack(&mut self) {
        if !self.tcb.cc.in_fast_recovery {
            return;
        }
        if self.th.ack.seq_lt(self.tcb.cc.snd_recover) {
            self.partial_ack();
        } else {
            let (snd_max, mss) = (self.tcb.snd_max, self.tcb.t_maxseg);
            self.tcb.cc.post_recovery(snd_max, self.th.ack, mss);
        }
    }

    /// Retransmit the next hole right away and partially deflate cwnd by
    /// what the ACK covered (RFC 6582).
    fn partial_ack(&mut self) {
        let onxt = self.tcb.snd_nxt;
        let ocwnd = self.tcb.cc.snd_cwnd;
        let mss = self.tcb.t_maxseg;
        let acked = (self.th.ack - self.tcb.snd_una).max(0) as u32;

        self.host.timer_cancel(self.tcb, TimerKind::Rexmt);
        self.tcb.t_rtttime = 0;
        self.tcb.snd_nxt = self.th.ack;
        self.tcb.cc.snd_cwnd = mss + acked;
        self.tcb.flags.insert(TcbFlags::ACK_NOW);
        self.host.output(self.tcb);

        if onxt.seq_gt(self.tcb.snd_nxt) {
            self.tcb.snd_nxt = onxt;
        }
        self.tcb.cc.snd_cwnd = ocwnd.saturating_sub(acked) + mss;
    }

    /// Grow cwnd for `acked` bytes, capped by the largest window we could
    /// be offered.
    pub(crate) fn ack_received(&mut self, acked: u32) {
        let max_cwnd = TCP_MAXWIN << self.tcb.snd_scale;
        let mss = self.tcb.t_maxseg;
        self.tcb.cc.ack_received(acked, mss, max_cwnd);
    }
}

// -- Unit tests --
