use std::fmt;

/// Connection states. Listening endpoints are a separate type
/// (`ListenTcb`), so a connection record is never in LISTEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TcpState {
    #[default]
    Closed, // Free slot or finalized connection

    // -- Opening states --
    SynSent,     // SYN sent, waiting for SYN-ACK
    SynReceived, // SYN received, expecting ACK

    // -- Steady state; opened --
    Established, // Connection established, exchanging data

    // -- Passive close states --
    CloseWait, // FIN received, waiting for application to close

    // -- Active close states --
    FinWait1, // FIN sent, waiting for ACK of FIN or FIN from peer
    Closing,  // Both FINs sent, waiting for final ACK
    LastAck,  // FIN sent after CloseWait, waiting for ACK
    FinWait2, // FIN acknowledged, waiting for FIN from peer
    TimeWait, // Holding sequence state after both FINs
}

impl TcpState {
    /// ESTABLISHED or any state reachable from it.
    pub fn have_established(self) -> bool {
        self >= TcpState::Established
    }

    /// A FIN from the peer has been consumed.
    pub fn have_rcvd_fin(self) -> bool {
        matches!(
            self,
            TcpState::CloseWait | TcpState::Closing | TcpState::LastAck | TcpState::TimeWait
        )
    }

    /// Sequence numbers of both sides are known.
    pub fn is_synchronized(self) -> bool {
        self >= TcpState::SynReceived
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TcpState::Closed => "CLOSED",
            TcpState::SynSent => "SYN_SENT",
            TcpState::SynReceived => "SYN_RECEIVED",
            TcpState::Established => "ESTABLISHED",
            TcpState::CloseWait => "CLOSE_WAIT",
            TcpState::FinWait1 => "FIN_WAIT_1",
            TcpState::Closing => "CLOSING",
            TcpState::LastAck => "LAST_ACK",
            TcpState::FinWait2 => "FIN_WAIT_2",
            TcpState::TimeWait => "TIME_WAIT",
        };
        f.write_str(name)
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_have_established() {
        assert!(!TcpState::SynSent.have_established());
        assert!(!TcpState::SynReceived.have_established());
        assert!(TcpState::Established.have_established());
        assert!(TcpState::FinWait2.have_established());
        assert!(TcpState::TimeWait.have_established());
    }

    #[test]
    fn test_have_rcvd_fin() {
        assert!(!TcpState::Established.have_rcvd_fin());
        assert!(!TcpState::FinWait1.have_rcvd_fin());
        assert!(!TcpState::FinWait2.have_rcvd_fin());
        assert!(TcpState::CloseWait.have_rcvd_fin());
        assert!(TcpState::Closing.have_rcvd_fin());
        assert!(TcpState::LastAck.have_rcvd_fin());
        assert!(TcpState::TimeWait.have_rcvd_fin());
    }

    #[test]
    fn test_display() {
        assert_eq!(TcpState::FinWait1.to_string(), "FIN_WAIT_1");
        assert_eq!(TcpState::default().to_string(), "CLOSED");
    }
}
