/// Largest window representable without scaling.
pub const TCP_MAXWIN: u32 = 65535;
/// Largest window shift allowed by RFC 7323.
pub const TCP_MAX_WINSHIFT: u8 = 14;
/// Default segment size until the peer tells us otherwise.
pub const TCP_DEFAULT_MSS: u32 = 536;

/// Which segments to unknown connections are dropped without a RST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blackhole {
    #[default]
    Off,
    SynOnly,
    All,
}

/// Stack-wide knobs for the receive path. Durations are in timer ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConfig {
    pub rexmt_thresh: u32,           // Duplicate ACKs before fast retransmit
    pub drop_synfin: bool,           // Drop SYN+FIN on listening endpoints
    pub blackhole: Blackhole,        // No RST for segments to unknown connections
    pub limited_transmit: bool,      // RFC 3042
    pub ecn: bool,                   // Accept ECN on active opens
    pub header_prediction: bool,     // Fast path for in-order bulk data and pure ACKs
    pub rst_rate_limit: Option<u32>, // RSTs per second, None for unlimited
    pub hz: u32,                     // Ticks per second
    pub keep_init: u32,              // Connection-establishment timeout
    pub keep_idle: u32,
    pub delack_time: u32,
    pub max_idle: u32,
    pub fast_finwait2_recycle: bool, // Use finwait2_timeout instead of max_idle
    pub finwait2_timeout: u32,
    pub default_rto: u32,
}

impl TcpConfig {
    pub fn seconds(&self, s: u32) -> u32 {
        s.saturating_mul(self.hz)
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        let hz = 1000;
        TcpConfig {
            rexmt_thresh: 3,
            drop_synfin: false,
            blackhole: Blackhole::Off,
            limited_transmit: true,
            ecn: false,
            header_prediction: true,
            rst_rate_limit: Some(200),
            hz,
            keep_init: 75 * hz,
            keep_idle: 2 * 60 * 60 * hz,
            delack_time: hz / 10,
            max_idle: 8 * 75 * hz,
            fast_finwait2_recycle: false,
            finwait2_timeout: 60 * hz,
            default_rto: 3 * hz,
        }
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TcpConfig::default();
        assert_eq!(cfg.rexmt_thresh, 3);
        assert!(!cfg.drop_synfin);
        assert_eq!(cfg.blackhole, Blackhole::Off);
        assert_eq!(cfg.delack_time, 100);
        assert_eq!(cfg.seconds(75), 75_000);
    }
}
