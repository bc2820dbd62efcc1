use log::debug;

use crate::tcp::config::TCP_MAXWIN;
use crate::tcp::errors::TcpError;
use crate::tcp::host::{Host, TimerKind};
use crate::tcp::input::{RstReason, TcpInput};
use crate::tcp::state::TcpState;
use crate::tcp::stats::Stat;
use crate::tcp::tcb::{ListenTcb, Tcb, TcbFlags};
use crate::tcp::tcp_header::{IpInfo, TcpFlags, TcpHeader};
use crate::tcp::transition::{self, Event};

impl TcpInput {
    /// Turn a SYN on a listening endpoint into a half-open connection in
    /// the listener's spare slot and send the SYN-ACK.
    pub(crate) fn accept<H: Host>(
        &mut self,
        host: &mut H,
        ip: &IpInfo,
        th: &TcpHeader,
        payload: &[u8],
        listener: &ListenTcb,
        slot: &mut Tcb,
    ) {
        if let Err(e) = self.try_accept(host, ip, th, payload, listener, slot) {
            debug!("listener {}: {} from {}:{}", listener.lport, e, ip.src, th.src_port);
            self.stats.inc(Stat::Drops);
        }
    }

    fn try_accept<H: Host>(
        &mut self,
        host: &mut H,
        ip: &IpInfo,
        th: &TcpHeader,
        payload: &[u8],
        listener: &ListenTcb,
        slot: &mut Tcb,
    ) -> Result<(), TcpError> {
        if !th.flags.contains(TcpFlags::SYN) {
            self.stats.inc(Stat::BadSyn);
            return Err(TcpError::MissingSyn);
        }
        if th.flags.contains(TcpFlags::ACK) {
            self.stats.inc(Stat::BadSyn);
            self.drop_with_reset(host, None, ip, th, payload.len(), RstReason::OpenPort);
            return Err(TcpError::UnexpectedAck);
        }
        if th.flags.contains(TcpFlags::RST) {
            return Err(TcpError::SynWithRst);
        }
        if th.flags.contains(TcpFlags::FIN) && self.config.drop_synfin {
            self.stats.inc(Stat::BadSyn);
            return Err(TcpError::SynFin);
        }
        if th.src_port == th.dst_port && ip.src == ip.dst {
            return Err(TcpError::SelfConnect);
        }
        if ip.is_multicast() {
            return Err(TcpError::Multicast);
        }

        if slot.state == TcpState::SynReceived
            && slot.irs == th.seq
            && slot.fport == th.src_port
            && slot.faddr == ip.src
        {
            // Our SYN-ACK was lost; send it again
            slot.snd_nxt = slot.snd_una;
            slot.flags.insert(TcbFlags::ACK_NOW);
            host.output(slot);
            return Ok(());
        }
        if slot.state != TcpState::Closed {
            self.stats.inc(Stat::ListenDrop);
            return Err(TcpError::ListenerBusy);
        }

        transition::apply(host, slot, Event::PassiveOpen)?;
        slot.flags = TcbFlags::ACK_NOW | TcbFlags::NO_OPT;
        slot.iss = host.new_isn(slot);
        slot.irs = th.seq;
        slot.rcv_seq_init();
        slot.send_seq_init();
        slot.snd_wl1 = th.seq;
        slot.rcv_up = th.seq + 1;
        slot.rcv_wnd = (slot.rcvbuf.free_space() as u32).min(TCP_MAXWIN);
        slot.rcv_adv += slot.rcv_wnd;
        slot.last_ack_sent = slot.rcv_nxt;
        slot.faddr = ip.src;
        slot.laddr = ip.dst;
        slot.fport = th.src_port;
        slot.lport = listener.lport;

        let now = host.ticks();
        slot.t_starttime = now;
        slot.t_rcvtime = now;
        host.timer_arm(slot, TimerKind::Keep, self.config.keep_init);
        self.stats.inc(Stat::Accepts);
        debug!(
            "listener {}: accepted {}:{} into tcb {}, iss {}",
            listener.lport, ip.src, th.src_port, slot.id, slot.iss
        );

        host.output(slot);
        Ok(())
    }
}

// -- Unit tests --
