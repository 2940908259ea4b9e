use std::env;
use std::fmt;
use std::net::UdpSocket;

/// Who is running the crawl, stamped on every failure line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorIdentity {
    pub client_ip: String,
    pub user: String,
}

impl OperatorIdentity {
    pub fn new(client_ip: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            client_ip: client_ip.into(),
            user: user.into(),
        }
    }

    /// Detect the local address and login name of this process
    pub fn detect() -> Self {
        Self::new(local_ip(), current_user())
    }
}

impl fmt::Display for OperatorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.client_ip, self.user)
    }
}

/// Address of the interface that routes outward. Connecting a UDP socket sends
/// nothing, and the target does not have to be reachable.
fn local_ip() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("10.255.255.255:1")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn current_user() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
