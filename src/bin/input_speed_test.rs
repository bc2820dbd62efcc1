use embedtcp::tcp::{
    Disposition, Endpoint, Host, IpInfo, IsnGenerator, ListenTcb, Tcb, TcbFlags, TcpConfig, TcpError, TcpFlags,
    TcpHeader, TcpInput, TcpState, TimerKind, Wrap32,
};
use rand::RngCore;
use std::io;
use std::io::{Error, ErrorKind, Read};
use std::net::Ipv6Addr;
use std::time::Instant;

const LPORT: u16 = 80;
const PEER_PORT: u16 = 40000;

/// Stands in for the rest of the stack: ACKs are counted, not sent.
struct LoopbackHost {
    isn: IsnGenerator,
    acks: usize,
}

impl Host for LoopbackHost {
    fn ticks(&self) -> u32 {
        0
    }

    fn new_isn(&mut self, _tcb: &Tcb) -> Wrap32 {
        self.isn.next_isn(0)
    }

    fn output(&mut self, tcb: &mut Tcb) {
        if tcb.snd_nxt == tcb.iss && tcb.state == TcpState::SynReceived {
            tcb.snd_nxt += 1;
            tcb.snd_max = tcb.snd_nxt;
        }
        tcb.flags.remove(TcbFlags::ACK_NOW);
        tcb.last_ack_sent = tcb.rcv_nxt;
        tcb.rcv_adv = tcb.rcv_nxt + tcb.rcv_wnd;
        self.acks += 1;
    }

    fn respond(&mut self, _: Option<&Tcb>, _: &IpInfo, _: &TcpHeader, _: Wrap32, _: Wrap32, _: TcpFlags) {}

    fn timer_arm(&mut self, _: &Tcb, _: TimerKind, _: u32) {}
    fn timer_cancel(&mut self, _: &Tcb, _: TimerKind) {}
    fn timer_active(&self, _: &Tcb, _: TimerKind) -> bool {
        false
    }

    fn close(&mut self, _: &mut Tcb, _: Option<TcpError>) {}
    fn drop_conn(&mut self, _: &mut Tcb, _: TcpError) {}
    fn tw_start(&mut self, _: &mut Tcb) {}
    fn tw_check(&mut self, _: &mut Tcb, _: &IpInfo, _: &TcpHeader, _: usize) -> bool {
        false
    }
}

fn segment(th: &TcpHeader, payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut seg = vec![0u8; th.header_len() + payload.len()];
    let n = th.serialize(&mut seg).map_err(|e| Error::new(ErrorKind::Other, e))?;
    seg[n..].copy_from_slice(payload);
    Ok(seg)
}

fn speed_test(input_len: usize, capacity: usize, write_size: usize, read_size: usize) -> io::Result<()> {
    // Generate random data
    let mut rng = rand::thread_rng();
    let mut data = vec![0u8; input_len];
    rng.fill_bytes(&mut data);

    let ip = IpInfo {
        src: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1),
        dst: Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2),
        flow: 0x6000_0000,
    };
    let config = TcpConfig::default();
    let mut host = LoopbackHost { isn: IsnGenerator::with_seed(1, config.hz), acks: 0 };
    let mut input = TcpInput::new(config);
    let mut tcb = Tcb::new(0, capacity, capacity, &input.config);
    let listener = ListenTcb { lport: LPORT };

    // Handshake
    let mut th = TcpHeader {
        src_port: PEER_PORT,
        dst_port: LPORT,
        seq: Wrap32::new(1),
        flags: TcpFlags::SYN,
        window: u16::MAX,
        ..TcpHeader::default()
    };
    let seg = segment(&th, &[])?;
    input.input(&mut host, &ip, &th, &seg, Endpoint::Listening { listener: &listener, accept_into: &mut tcb });

    th.seq += 1;
    th.ack = tcb.snd_max;
    th.flags = TcpFlags::ACK;
    let seg = segment(&th, &[])?;
    input.input(&mut host, &ip, &th, &seg, Endpoint::Connection(&mut tcb));
    if tcb.state != TcpState::Established {
        return Err(Error::new(ErrorKind::Other, format!("handshake ended in {}", tcb.state)));
    }

    let mut output_buffer = Vec::with_capacity(input_len);
    let mut read_buf = vec![0u8; read_size];

    // Start timer
    let t0 = Instant::now();

    let mut i = 0;
    while i < data.len() {
        let end = usize::min(i + write_size, data.len());
        if end - i <= tcb.rcvbuf.free_space() {
            let seg = segment(&th, &data[i..end])?;
            if input.input(&mut host, &ip, &th, &seg, Endpoint::Connection(&mut tcb)) != Disposition::Consumed {
                return Err(Error::new(ErrorKind::Other, "segment was not consumed"));
            }
            th.seq += (end - i) as u32;
            i = end;
        }

        let n = tcb.rcvbuf.read(&mut read_buf)?;
        output_buffer.extend_from_slice(&read_buf[..n]);
    }
    while !tcb.rcvbuf.is_empty() {
        let n = tcb.rcvbuf.read(&mut read_buf)?;
        output_buffer.extend_from_slice(&read_buf[..n]);
    }

    // Stop timer
    let duration = t0.elapsed();

    // Validate data
    if data != output_buffer {
        return Err(Error::new(ErrorKind::Other, "Data sent does not equal data received :("));
    }

    // Calculate throughput
    let duration_secs = duration.as_secs_f64();
    let bytes_per_sec = input_len as f64 / duration_secs;
    let gigabits_per_sec = bytes_per_sec * 8.0 / 1e9;

    println!(
        "TcpInput with capacity={}, segment_size={}, read_size={} reached {:.2} Gbit/s ({} ACKs, {} predicted)",
        capacity,
        write_size,
        read_size,
        gigabits_per_sec,
        host.acks,
        input.stats.get(embedtcp::tcp::Stat::PredDat)
    );

    Ok(())
}

fn main() {
    let input_len = 1e7 as usize; // 10 MB
    let capacity = 32768; // 32 KB
    let write_size = 1440; // IPv6 MSS on a 1500 byte MTU
    let read_size = 4096;

    if let Err(e) = speed_test(input_len, capacity, write_size, read_size) {
        eprintln!("Speed test failed: {}", e);
        std::process::exit(1);
    };
}
