
use std::net::{Ipv6Addr, SocketAddr, TcpListener};

use anyhow::{Result, Context};
use socket2::{Domain, Protocol, Socket, Type};

pub mod period_call;
pub mod period_rate;
pub mod log;


// same as the platform maximum, the kernel clamps it to somaxconn
const LISTEN_BACKLOG: i32 = i32::MAX;

/// listen at [::]:port, accepting both IPv4 and IPv6 clients
pub fn listen_dual_stack(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));

    let socket = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP))
    .with_context(||"fail to create ipv6 socket")?;

    socket.set_only_v6(false)
    .with_context(||"fail to enable dual stack")?;

    #[cfg(unix)]
    socket.set_reuse_address(true)
    .with_context(||"fail to set reuse address")?;

    socket.bind(&addr.into())
    .with_context(||format!("fail to bind at [{}]", addr))?;

    socket.listen(LISTEN_BACKLOG)
    .with_context(||format!("fail to listen at [{}]", addr))?;

    Ok(socket.into())
}
