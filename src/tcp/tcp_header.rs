use bitflags::bitflags;
use std::net::Ipv6Addr;

use crate::tcp::errors::TcpError;
use crate::tcp::wrap32::Wrap32;

/// Size of a TCP header without options.
pub const TCP_HEADER_LEN: usize = 20;

// ECN codepoints in the low two bits of the traffic class
pub const IPTOS_ECN_MASK: u8 = 0x03;
pub const IPTOS_ECN_ECT1: u8 = 0x01;
pub const IPTOS_ECN_ECT0: u8 = 0x02;
pub const IPTOS_ECN_CE: u8 = 0x03;

bitflags! {
    // Bit positions [ CWR, ECE, URG, ACK, PSH, RST, SYN, FIN ]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TcpFlags: u8 {
        const CWR = 1 << 7;
        const ECE = 1 << 6;
        const URG = 1 << 5;
        const ACK = 1 << 4;
        const PSH = 1 << 3;
        const RST = 1 << 2;
        const SYN = 1 << 1;
        const FIN = 1 << 0;
    }
}

/// Host-order view of a TCP header. Options are never interpreted, so only
/// the data offset is kept to locate the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: Wrap32,
    pub ack: Wrap32,
    pub data_offset: u8, // In 32-bit words
    pub flags: TcpFlags,
    pub window: u16, // Unscaled
    pub urgent: u16,
}

impl Default for TcpHeader {
    fn default() -> Self {
        TcpHeader {
            src_port: 0,
            dst_port: 0,
            seq: Wrap32::new(0),
            ack: Wrap32::new(0),
            data_offset: (TCP_HEADER_LEN / 4) as u8,
            flags: TcpFlags::empty(),
            window: 0,
            urgent: 0,
        }
    }
}

impl TcpHeader {
    /// Normalize the fixed part of a wire header. Checksum verification is
    /// the network layer's job and is not repeated here.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, TcpError> {
        if buf.len() < TCP_HEADER_LEN {
            return Err(TcpError::HeaderTooShort(buf.len()));
        }

        Ok(TcpHeader {
            src_port: u16::from_be_bytes([buf[0], buf[1]]),
            dst_port: u16::from_be_bytes([buf[2], buf[3]]),
            seq: Wrap32::new(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]])),
            ack: Wrap32::new(u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]])),
            data_offset: buf[12] >> 4,
            flags: TcpFlags::from_bits_truncate(buf[13]),
            window: u16::from_be_bytes([buf[14], buf[15]]),
            urgent: u16::from_be_bytes([buf[18], buf[19]]),
        })
    }

    /// Write the header into `buf`, leaving the checksum and any option
    /// space zeroed. Returns the number of bytes written.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, TcpError> {
        let header_len = self.header_len().max(TCP_HEADER_LEN);
        if buf.len() < header_len {
            return Err(TcpError::BufferTooSmall { expected: header_len, found: buf.len() });
        }

        buf[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        buf[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        buf[4..8].copy_from_slice(&self.seq.value().to_be_bytes());
        buf[8..12].copy_from_slice(&self.ack.value().to_be_bytes());
        buf[12] = self.data_offset << 4;
        buf[13] = self.flags.bits();
        buf[14..16].copy_from_slice(&self.window.to_be_bytes());
        buf[16..18].fill(0);
        buf[18..20].copy_from_slice(&self.urgent.to_be_bytes());
        buf[20..header_len].fill(0);

        Ok(header_len)
    }

    /// Header length in bytes, options included.
    pub fn header_len(&self) -> usize {
        self.data_offset as usize * 4
    }
}

/// The parts of the IPv6 header the receive path looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
    pub flow: u32, // version | traffic class | flow label
}

impl IpInfo {
    /// Traffic class, the IPv6 equivalent of the IPv4 ToS byte.
    pub fn tos(&self) -> u8 {
        ((self.flow >> 20) & 0xff) as u8
    }

    pub fn ecn(&self) -> u8 {
        self.tos() & IPTOS_ECN_MASK
    }

    pub fn is_multicast(&self) -> bool {
        self.src.is_multicast() || self.dst.is_multicast()
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;

    fn get_tcp_hex() -> &'static str {
        "c6b70050a4269c9300000000b002ffff92970000020405b4010303060101080abb6879f80000000004020000"
    }

    #[test]
    fn test_tcp_flags() {
        assert_eq!(TcpFlags::FIN.bits(), 0b00000001);
        assert_eq!(TcpFlags::SYN.bits(), 0b00000010);
        assert_eq!(TcpFlags::RST.bits(), 0b00000100);
        assert_eq!(TcpFlags::PSH.bits(), 0b00001000);
        assert_eq!(TcpFlags::ACK.bits(), 0b00010000);
        assert_eq!(TcpFlags::URG.bits(), 0b00100000);
        assert_eq!(TcpFlags::ECE.bits(), 0b01000000);
        assert_eq!(TcpFlags::CWR.bits(), 0b10000000);
    }

    #[test]
    fn test_tcp_header_from_bytes() {
        let tcp_bytes = hex::decode(get_tcp_hex()).unwrap();
        let th = TcpHeader::from_bytes(&tcp_bytes).unwrap();

        assert_eq!(th.src_port, 50871);
        assert_eq!(th.dst_port, 80);
        assert_eq!(th.seq, Wrap32::new(2753993875));
        assert_eq!(th.ack, Wrap32::new(0));
        assert_eq!(th.data_offset, 11);
        assert_eq!(th.header_len(), 44);
        assert_eq!(th.header_len(), tcp_bytes.len());
        assert_eq!(th.flags, TcpFlags::SYN);
        assert_eq!(th.window, 65535);
        assert_eq!(th.urgent, 0);
    }

    #[test]
    fn test_tcp_header_serialize() {
        let tcp_bytes = hex::decode(get_tcp_hex()).unwrap();
        let th = TcpHeader::from_bytes(&tcp_bytes).unwrap();

        let mut buf = vec![0xffu8; 64];
        let n = th.serialize(&mut buf).unwrap();
        assert_eq!(n, 44);
        assert_eq!(buf[..16], tcp_bytes[..16]);
        assert_eq!(buf[16..18], [0, 0]);
        assert_eq!(buf[18..20], tcp_bytes[18..20]);
        assert!(buf[20..n].iter().all(|&b| b == 0));
        assert_eq!(TcpHeader::from_bytes(&buf[..n]).unwrap(), th);

        let err = th.serialize(&mut buf[..40]).unwrap_err();
        assert_eq!(err, TcpError::BufferTooSmall { expected: 44, found: 40 });
    }

    #[test]
    fn test_tcp_header_too_short() {
        let tcp_bytes = hex::decode(get_tcp_hex()).unwrap();
        let err = TcpHeader::from_bytes(&tcp_bytes[..19]).unwrap_err();
        assert!(matches!(err, TcpError::HeaderTooShort(19)));
    }

    #[test]
    fn test_ip_info_tos_and_ecn() {
        let ip = IpInfo {
            src: "fe80::1".parse().unwrap(),
            dst: "fe80::2".parse().unwrap(),
            flow: 0x6000_0000 | (0xb7 << 20) | 0x12345,
        };
        assert_eq!(ip.tos(), 0xb7);
        assert_eq!(ip.ecn(), IPTOS_ECN_CE);
        assert!(!ip.is_multicast());
    }

    #[test]
    fn test_ip_info_multicast() {
        let ip = IpInfo {
            src: "fe80::1".parse().unwrap(),
            dst: "ff02::1".parse().unwrap(),
            flow: 0x6000_0000,
        };
        assert!(ip.is_multicast());
    }
}
