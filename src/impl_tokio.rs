
use std::sync::Arc;
use anyhow::{Result, Context};
use tokio::{runtime, net::{TcpListener, TcpStream}, io::{AsyncReadExt, AsyncWriteExt}, task::JoinHandle};
use tracing::{debug, trace};

use crate::{stati::Stati, util::listen_dual_stack, PAYLOAD_LEN};


fn new_runtime() -> Result<runtime::Runtime> {
    runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
    .with_context(||"fail to build tokio runtime")
}

pub fn run_tokio_server(port: u16, stati: Arc<Stati>) -> Result<()> {
    let rt = new_runtime()?;

    rt.block_on(async move {
        let listener = listen_dual_stack(port)?;
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        println!("Listening on {}", port);

        serve_forever(listener, stati).await
    })
}

pub fn run_tokio_client(host: String, port: u16, workers: usize, stati: Arc<Stati>) -> Result<()> {
    let rt = new_runtime()?;

    rt.block_on(async move {
        let tasks = spawn_client(&host, port, workers, &stati);
        for task in tasks {
            task.await?;
        }
        Ok(())
    })
}

/// Accepts forever, spawning one task per connection.
pub async fn serve_forever(listener: TcpListener, stati: Arc<Stati>) -> Result<()> {
    loop {
        let (socket, remote) = listener.accept().await.with_context(||"fail to accept")?;
        debug!("accepted connection from [{}]", remote);

        let stati = stati.clone();
        tokio::spawn(async move {
            if let Err(e) = echo_session(socket, &stati).await {
                debug!("connection [{}] error [{}]", remote, e);
            }
        });
    }
}

pub async fn echo_session(mut socket: TcpStream, stati: &Stati) -> std::io::Result<()> {
    let _guard = stati.conn_guard();
    let mut buf = [0_u8; PAYLOAD_LEN];

    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(())
        }
        socket.write_all(&buf[..n]).await?;
        stati.inc_requests();
    }
}

/// Must be called inside a tokio runtime.
pub fn spawn_client(host: &str, port: u16, workers: usize, stati: &Arc<Stati>) -> Vec<JoinHandle<()>> {
    (0..workers).map(|_n| {
        let host = host.to_string();
        let stati = stati.clone();
        tokio::spawn(async move {
            run_one(&host, port, &stati).await
        })
    })
    .collect()
}

async fn run_one(host: &str, port: u16, stati: &Stati) {
    let mut buf = [1_u8; PAYLOAD_LEN];

    loop {
        let socket = match TcpStream::connect((host, port)).await {
            Ok(socket) => socket,
            Err(e) => {
                trace!("connect to [{}:{}] error [{}]", host, port, e);
                // retry at once, only let the other tasks run first
                tokio::task::yield_now().await;
                continue;
            },
        };

        if let Err(e) = ping_session(socket, &mut buf, stati).await {
            debug!("connection to [{}:{}] error [{}]", host, port, e);
        }
    }
}

pub async fn ping_session(mut socket: TcpStream, buf: &mut [u8; PAYLOAD_LEN], stati: &Stati) -> std::io::Result<()> {
    let _guard = stati.conn_guard();

    while socket.write(&buf[..]).await? == PAYLOAD_LEN {
        let _received = socket.read(&mut buf[..]).await?;
        stati.inc_requests();
    }
    Ok(())
}
