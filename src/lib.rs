//! Receive side of a small BSD-derived TCP for embedded IPv6 stacks.
//!
//! [`tcp::TcpInput::input`] takes one validated segment plus the endpoint it
//! was demultiplexed to and runs it through the acceptor or the connection
//! state machine. Everything else the stack owns (output, timers, teardown)
//! is reached through the [`tcp::Host`] trait.

pub mod tcp;
