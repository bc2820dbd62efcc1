//! Header prediction: the two common cases of a unidirectional transfer on an
//! ESTABLISHED connection, a pure ACK for outstanding data and a pure
//! in-sequence data segment, are handled without the general state machine.
//! Both cases use the same helpers as the general path, so a predicted
//! segment leaves the connection exactly as the general path would.

use crate::tcp::engine::{Engine, Verdict};
use crate::tcp::host::Host;
use crate::tcp::state::TcpState;
use crate::tcp::stats::Stat;
use crate::tcp::tcb::TcbFlags;
use crate::tcp::tcp_header::TcpFlags;

impl<H: Host> Engine<'_, H> {
    fn predictable(&self) -> bool {
        let tcb = &*self.tcb;
        let control = TcpFlags::SYN | TcpFlags::FIN | TcpFlags::RST | TcpFlags::URG | TcpFlags::ACK;
        tcb.state == TcpState::Established
            && self.th.seq == tcb.rcv_nxt
            && self.th.flags & control == TcpFlags::ACK
            && tcb.snd_nxt == tcb.snd_max
            && self.tiwin != 0
            && self.tiwin == tcb.snd_wnd
            && !tcb.flags.intersects(TcbFlags::NEED_SYN | TcbFlags::NEED_FIN)
    }

    /// Returns `None` when the segment needs the general path.
    pub(crate) fn header_prediction(&mut self) -> Option<Verdict> {
        if !self.predictable() {
            return None;
        }

        let ack = self.th.ack;
        if self.tlen == 0 {
            if ack.seq_gt(self.tcb.snd_una) && ack.seq_leq(self.tcb.snd_max) && !self.tcb.cc.in_fast_recovery {
                self.predicted_ack();
                return Some(Verdict::Delack);
            }
        } else if ack == self.tcb.snd_una && self.tlen <= self.tcb.rcvbuf.free_space() {
            self.predicted_data();
            return Some(Verdict::Delack);
        }
        None
    }

    /// Pure ACK for outstanding data.
    fn predicted_ack(&mut self) {
        let ack = self.th.ack;
        let acked = (ack - self.tcb.snd_una) as u32;
        self.input.stats.inc(Stat::PredAck);
        self.input.stats.inc(Stat::RcvAckPack);
        self.input.stats.add(Stat::RcvAckByte, acked as u64);

        self.ack_timers();
        self.ack_received(acked);
        self.release_acked(acked);
        let cc = &mut self.tcb.cc;
        if self.tcb.snd_una.seq_gt(cc.snd_recover) && ack.seq_leq(cc.snd_recover) {
            cc.snd_recover = ack - 1;
        }
        cc.t_dupacks = 0;
        self.tcb.snd_una = ack;
        self.update_window();
        self.pull_rcv_up();

        if !self.tcb.sndbuf.is_empty() {
            self.host.output(self.tcb);
        }
    }

    /// Pure in-sequence data that fits the receive buffer.
    fn predicted_data(&mut self) {
        self.input.stats.inc(Stat::PredDat);
        self.tcb.cc.t_dupacks = 0;
        self.update_window();
        self.pull_rcv_up();
        self.deliver_in_order();
        self.host.output(self.tcb);
    }
}

// -- Unit tests --
