/// Stack-wide receive counters, kept apart from any single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    RcvTotal,
    RcvShort,
    RcvBadOff,
    BadSyn,
    ListenDrop,
    Drops,
    Connects,
    PredAck,
    PredDat,
    RcvAckPack,
    RcvAckByte,
    RcvAckTooMuch,
    RcvDupAck,
    RcvDupPack,
    RcvDupByte,
    RcvPartDupPack,
    RcvPartDupByte,
    RcvPackAfterWin,
    RcvByteAfterWin,
    RcvWinProbe,
    RcvWinUpd,
    RcvPack,
    RcvByte,
    RcvAfterClose,
    BadRst,
    ChallengeAck,
    SndRexmitFast,
    RstSent,
    RstLimited,
    EcnCe,
    EcnEct0,
    EcnEct1,
    EcnShs,
    Accepts,
}

impl Stat {
    pub const COUNT: usize = Stat::Accepts as usize + 1;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpStats {
    counters: [u64; Stat::COUNT],
}

impl Default for TcpStats {
    fn default() -> Self {
        TcpStats { counters: [0; Stat::COUNT] }
    }
}

impl TcpStats {
    pub fn inc(&mut self, stat: Stat) {
        self.add(stat, 1);
    }

    pub fn add(&mut self, stat: Stat, n: u64) {
        let c = &mut self.counters[stat as usize];
        *c = c.wrapping_add(n);
    }

    pub fn get(&self, stat: Stat) -> u64 {
        self.counters[stat as usize]
    }

    pub fn reset(&mut self) {
        self.counters = [0; Stat::COUNT];
    }
}

// -- Unit tests --
