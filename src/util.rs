use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const FETCHER_PORT: &str = "FETCHER_PORT";

const DEFAULT_PORT: u16 = 8080;

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(FETCHER_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const FETCHER_ADDR: &str = "FETCHER_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> IpAddr {
    let addr_from_env = std::env::var(FETCHER_ADDR);
    addr_from_env.map_or(IpAddr::V4(DEFAULT_ADDR), |res| {
        res.parse().unwrap_or(IpAddr::V4(DEFAULT_ADDR))
    })
}

pub fn get_bind_addr() -> SocketAddr {
    SocketAddr::new(get_addr(), get_port())
}
