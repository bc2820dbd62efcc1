use log::{debug, trace};

use crate::tcp::config::{Blackhole, TcpConfig};
use crate::tcp::engine::Engine;
use crate::tcp::errors::TcpError;
use crate::tcp::host::Host;
use crate::tcp::state::TcpState;
use crate::tcp::stats::{Stat, TcpStats};
use crate::tcp::tcb::{ListenTcb, Tcb};
use crate::tcp::tcp_header::{IpInfo, TcpFlags, TcpHeader, TCP_HEADER_LEN};
use crate::tcp::wrap32::Wrap32;

/// What the caller should do with the segment once `input` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fully handled, including silent drops.
    Consumed,
    /// A TIME_WAIT connection gave the segment up; look it up again as a
    /// new connection attempt. Retrying is the caller's decision.
    RelookupRequired,
}

/// Where the demultiplexer routed the segment.
pub enum Endpoint<'a> {
    Connection(&'a mut Tcb),
    Listening {
        listener: &'a ListenTcb,
        accept_into: &'a mut Tcb,
    },
    /// Nothing matched.
    Unbound,
}

/// Which RST budget a reset is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RstReason {
    Unlimited,
    OpenPort,
    ClosedPort,
}

#[derive(Debug, Default)]
struct RstLimiter {
    window_start: u32,
    sent: u32,
}

impl RstLimiter {
    fn allow(&mut self, now: u32, limit: Option<u32>, hz: u32) -> bool {
        let Some(limit) = limit else {
            return true;
        };
        if now.wrapping_sub(self.window_start) >= hz {
            self.window_start = now;
            self.sent = 0;
        }
        if self.sent >= limit {
            return false;
        }
        self.sent += 1;
        true
    }
}

/// The receive-side entry point: validates each segment, then hands it to
/// the acceptor, the connection state machine, or the time-wait check.
#[derive(Debug, Default)]
pub struct TcpInput {
    pub config: TcpConfig,
    pub stats: TcpStats,
    rst_limiter: RstLimiter,
}

impl TcpInput {
    pub fn new(config: TcpConfig) -> Self {
        TcpInput {
            config,
            stats: TcpStats::default(),
            rst_limiter: RstLimiter::default(),
        }
    }

    /// Process one segment. `segment` is the whole TCP segment (header,
    /// options and payload) and `th` its host-order header.
    pub fn input<H: Host>(
        &mut self,
        host: &mut H,
        ip: &IpInfo,
        th: &TcpHeader,
        segment: &[u8],
        endpoint: Endpoint<'_>,
    ) -> Disposition {
        self.stats.inc(Stat::RcvTotal);

        let off = th.header_len();
        if off < TCP_HEADER_LEN || off > segment.len() {
            self.stats.inc(Stat::RcvBadOff);
            debug!("{}", TcpError::BadHeaderOffset { offset: off, len: segment.len() });
            return Disposition::Consumed;
        }
        let payload = &segment[off..];
        trace!(
            "segment {}:{} -> {}:{} seq {} ack {} {:?} len {}",
            ip.src, th.src_port, ip.dst, th.dst_port, th.seq, th.ack, th.flags, payload.len()
        );

        match endpoint {
            Endpoint::Connection(tcb) => match tcb.state {
                TcpState::TimeWait => {
                    if host.tw_check(tcb, ip, th, payload.len()) {
                        Disposition::RelookupRequired
                    } else {
                        Disposition::Consumed
                    }
                }
                TcpState::Closed => {
                    self.stats.inc(Stat::RcvAfterClose);
                    self.reject_unbound(host, ip, th, payload.len());
                    Disposition::Consumed
                }
                _ => {
                    let iptos = ip.tos();
                    Engine::new(self, host, tcb, ip, th, payload, iptos).run();
                    Disposition::Consumed
                }
            },
            Endpoint::Listening { listener, accept_into } => {
                self.accept(host, ip, th, payload, listener, accept_into);
                Disposition::Consumed
            }
            Endpoint::Unbound => {
                self.reject_unbound(host, ip, th, payload.len());
                Disposition::Consumed
            }
        }
    }

    fn reject_unbound<H: Host>(&mut self, host: &mut H, ip: &IpInfo, th: &TcpHeader, tlen: usize) {
        self.stats.inc(Stat::Drops);
        let silent = match self.config.blackhole {
            Blackhole::Off => false,
            Blackhole::SynOnly => th.flags.contains(TcpFlags::SYN),
            Blackhole::All => true,
        };
        if silent {
            debug!("blackholed segment to port {}", th.dst_port);
            return;
        }
        self.drop_with_reset(host, None, ip, th, tlen, RstReason::ClosedPort);
    }

    /// Answer `th` with a RST that the sender will accept. `th` carries the
    /// segment's current sequence number and flags, and `tlen` its current
    /// payload length, after any trimming.
    pub(crate) fn drop_with_reset<H: Host>(
        &mut self,
        host: &mut H,
        tcb: Option<&Tcb>,
        ip: &IpInfo,
        th: &TcpHeader,
        tlen: usize,
        reason: RstReason,
    ) {
        if th.flags.contains(TcpFlags::RST) || ip.is_multicast() {
            return;
        }
        if reason != RstReason::Unlimited
            && !self.rst_limiter.allow(host.ticks(), self.config.rst_rate_limit, self.config.hz)
        {
            self.stats.inc(Stat::RstLimited);
            return;
        }

        if th.flags.contains(TcpFlags::ACK) {
            host.respond(tcb, ip, th, th.ack, Wrap32::new(0), TcpFlags::RST);
        } else {
            let mut ack = th.seq + tlen as u32;
            if th.flags.contains(TcpFlags::SYN) {
                ack += 1;
            }
            host.respond(tcb, ip, th, Wrap32::new(0), ack, TcpFlags::RST | TcpFlags::ACK);
        }
        self.stats.inc(Stat::RstSent);
        debug!("sent RST to {}:{} ({:?})", ip.src, th.src_port, reason);
    }
}

// -- Unit tests --
