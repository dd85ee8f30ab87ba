// src/server/mod.rs

//! Read-only HTTP file server for the published artifact.

pub mod file_server;

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::PathBuf;

pub use file_server::{NO_CACHE, ServerHandle, build_router, content_type_for, start_file_server};

/// Where and what the file server serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    pub static_root: PathBuf,
    /// Extension (without the dot) that selects the artifact route.
    pub artifact_extension: String,
}

/// Address of the interface used for outbound traffic, or loopback when
/// there is none. No packet is sent: connecting a UDP socket only selects a
/// route.
pub fn local_ip() -> IpAddr {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("10.254.254.254:1")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// URL operators can hand out for the served artifact.
pub fn serve_url(host: IpAddr, port: u16, artifact_file: &str) -> String {
    format!("http://{host}:{port}/{artifact_file}")
}
