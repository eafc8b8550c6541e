/**
 * Working out who is on the other end of a request.
 *
 * Nothing here is authenticated. Headers are trusted as the fronting proxy supplies them.
 */
use tide::http::Request;

use std::net::SocketAddr;

use crate::models::VoterAddress;

pub const FORWARDED_FOR: &str = "X-Forwarded-For";
pub const FORWARDED_USER: &str = "X-Forwarded-User";

/**
 * Source of the address used to deduplicate votes
 */
pub trait VoterSource: Send + Sync {
    fn voter(&self, req: &Request) -> Option<VoterAddress>;
}

/**
 * Takes the `X-Forwarded-For` header as-is, or the peer address when there is no proxy in front
 */
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardedFor;

impl VoterSource for ForwardedFor {
    fn voter(&self, req: &Request) -> Option<VoterAddress> {
        if let Some(forwarded) = req.header(FORWARDED_FOR) {
            if let Ok(address) = VoterAddress::new(forwarded.last().as_str()) {
                return Some(address);
            }
        }

        req.peer_addr()
            .map(peer_ip)
            .and_then(|ip| VoterAddress::new(&ip).ok())
    }
}

/**
 * Strip the port off a `host:port` peer address
 */
fn peer_ip(peer: &str) -> String {
    peer.parse::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| peer.to_string())
}

/**
 * The display identity an auth proxy forwarded, used to mark polls as owned
 */
pub fn display_user(req: &Request) -> Option<String> {
    req.header(FORWARDED_USER)
        .map(|v| v.last().as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}
