//! Thread-per-connection workers on blocking std sockets.

use std::{net::{TcpListener, TcpStream}, io::{Read, Write}, sync::Arc, thread::{self, JoinHandle}};
use anyhow::{Result, Context, anyhow};
use tracing::{debug, trace};

use crate::{stati::Stati, util::listen_dual_stack, PAYLOAD_LEN};


pub fn run_as_server(port: u16, stati: &Arc<Stati>) -> Result<()> {
    let listener = listen_dual_stack(port)?;
    println!("Listening on {}", port);

    serve_forever(listener, stati)
}

/// Accepts forever, spawning one thread per connection.
pub fn serve_forever(listener: TcpListener, stati: &Arc<Stati>) -> Result<()> {
    loop {
        let (socket, remote) = listener.accept().with_context(||"fail to accept")?;
        debug!("accepted connection from [{}]", remote);

        let stati = stati.clone();
        thread::Builder::new()
        .spawn(move || {
            if let Err(e) = echo_session(socket, &stati) {
                debug!("connection [{}] error [{}]", remote, e);
            }
        })
        .with_context(||"fail to spawn connection thread")?;
    }
}

/// Echoes every byte back until the peer closes.
pub fn echo_session(mut socket: TcpStream, stati: &Stati) -> std::io::Result<()> {
    let _guard = stati.conn_guard();
    let mut buf = [0_u8; PAYLOAD_LEN];

    loop {
        let n = socket.read(&mut buf)?;
        if n == 0 {
            return Ok(())
        }
        socket.write_all(&buf[..n])?;
        stati.inc_requests();
    }
}


pub fn run_as_client(host: &str, port: u16, workers: usize, stati: &Arc<Stati>) -> Result<()> {
    let tasks = spawn_client(host, port, workers, stati)?;
    for task in tasks {
        task.join().map_err(|_e| anyhow!("client worker panicked"))?;
    }
    Ok(())
}

/// Starts `workers` threads, each one reconnecting forever.
pub fn spawn_client(host: &str, port: u16, workers: usize, stati: &Arc<Stati>) -> Result<Vec<JoinHandle<()>>> {
    (0..workers).map(|n| {
        let host = host.to_string();
        let stati = stati.clone();
        thread::Builder::new()
        .name(format!("client-{}", n))
        .spawn(move || run_one(&host, port, &stati))
        .with_context(||format!("fail to spawn client worker {}", n))
    })
    .collect()
}

fn run_one(host: &str, port: u16, stati: &Stati) {
    let mut buf = [1_u8; PAYLOAD_LEN];

    loop {
        // busy retry, no backoff
        let socket = match TcpStream::connect((host, port)) {
            Ok(socket) => socket,
            Err(e) => {
                trace!("connect to [{}:{}] error [{}]", host, port, e);
                continue;
            },
        };

        if let Err(e) = ping_session(socket, &mut buf, stati) {
            debug!("connection to [{}:{}] error [{}]", host, port, e);
        }
    }
}

/// Sends one byte and waits for the echo, until a send comes up short.
pub fn ping_session(mut socket: TcpStream, buf: &mut [u8; PAYLOAD_LEN], stati: &Stati) -> std::io::Result<()> {
    let _guard = stati.conn_guard();

    while socket.write(&buf[..])? == PAYLOAD_LEN {
        // the received length is not checked
        let _received = socket.read(&mut buf[..])?;
        stati.inc_requests();
    }
    Ok(())
}
