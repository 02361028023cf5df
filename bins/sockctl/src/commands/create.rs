//! sockctl create command implementation.
//!
//! Creates one endpoint, reports where it landed, and closes it again.

use std::io::Write;

use clap::Args;
use sockif::socket::{
    ConnFlags, Domain, Endpoint, EndpointManager, Result, SOCK_CLOEXEC, SOCK_NONBLOCK, SockType,
};

use crate::output::{OutputFormat, OutputOptions, Printable, print_one};

#[derive(Args)]
pub struct CreateCmd {
    /// Address family (inet, inet6, local/unix, or a number).
    #[arg(value_parser = parse_domain)]
    domain: Domain,

    /// Socket type (stream, dgram, raw, seqpacket, or a number).
    #[arg(value_name = "TYPE", value_parser = parse_type)]
    ty: SockType,

    /// Protocol (tcp, udp, icmp, icmpv6, or a number).
    #[arg(long, default_value = "0", value_parser = parse_protocol)]
    protocol: i32,

    /// Request a non-blocking endpoint.
    #[arg(long)]
    nonblock: bool,

    /// Set close-on-exec.
    #[arg(long)]
    cloexec: bool,
}

fn parse_domain(s: &str) -> std::result::Result<Domain, String> {
    s.parse().map_err(|e: sockif::Error| e.to_string())
}

fn parse_type(s: &str) -> std::result::Result<SockType, String> {
    s.parse().map_err(|e: sockif::Error| e.to_string())
}

fn parse_protocol(s: &str) -> std::result::Result<i32, String> {
    let proto = match s.to_ascii_lowercase().as_str() {
        "tcp" => libc::IPPROTO_TCP,
        "udp" => libc::IPPROTO_UDP,
        "icmp" => libc::IPPROTO_ICMP,
        "icmpv6" => libc::IPPROTO_ICMPV6,
        other => match other.strip_prefix("0x") {
            Some(hex) => i32::from_str_radix(hex, 16).map_err(|e| e.to_string())?,
            None => other.parse().map_err(|_| format!("invalid protocol '{}'", s))?,
        },
    };
    Ok(proto)
}

/// What the command reports about a created endpoint.
#[derive(Debug)]
struct EndpointInfo {
    domain: Domain,
    ty: SockType,
    protocol: i32,
    backend: &'static str,
    kind: &'static str,
    flags: ConnFlags,
    cloexec: bool,
}

impl EndpointInfo {
    fn new(ep: &Endpoint) -> Self {
        Self {
            domain: ep.domain(),
            ty: ep.sock_type(),
            protocol: ep.protocol(),
            backend: ep.backend().name(),
            kind: ep.backend_kind().as_str(),
            flags: ep.flags(),
            cloexec: ep.cloexec(),
        }
    }

    fn flag_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.flags.contains(ConnFlags::INITD) {
            names.push("initd");
        }
        if self.flags.contains(ConnFlags::NONBLOCK) {
            names.push("nonblock");
        }
        names
    }
}

impl Printable for EndpointInfo {
    fn print_text<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write!(
            w,
            "{} {} proto {} backend {} ({}) flags {}",
            self.domain,
            self.ty,
            self.protocol,
            self.backend,
            self.kind,
            self.flag_names().join(",")
        )?;
        if self.cloexec {
            write!(w, " cloexec")?;
        }
        writeln!(w)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "domain": self.domain.to_string(),
            "type": self.ty.to_string(),
            "protocol": self.protocol,
            "backend": self.backend,
            "kind": self.kind,
            "flags": self.flag_names(),
            "cloexec": self.cloexec,
        })
    }
}

impl CreateCmd {
    pub fn run(
        &self,
        manager: &EndpointManager,
        format: OutputFormat,
        opts: &OutputOptions,
    ) -> Result<()> {
        let mut flags = 0;
        if self.nonblock {
            flags |= SOCK_NONBLOCK;
        }
        if self.cloexec {
            flags |= SOCK_CLOEXEC;
        }

        let ep = manager.create_endpoint(self.domain.raw(), self.ty.raw(), self.protocol, flags)?;
        print_one(&EndpointInfo::new(&ep), format, opts)?;
        ep.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_protocol() {
        assert_eq!(parse_protocol("tcp"), Ok(libc::IPPROTO_TCP));
        assert_eq!(parse_protocol("UDP"), Ok(libc::IPPROTO_UDP));
        assert_eq!(parse_protocol("0x3a"), Ok(58));
        assert_eq!(parse_protocol("17"), Ok(17));
        assert!(parse_protocol("sctp-ish").is_err());
    }
}
