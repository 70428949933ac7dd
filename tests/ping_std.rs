
use std::{net::{TcpListener, TcpStream}, io::{Read, Write}, sync::Arc, thread, time::{Duration, Instant}};

use parking_lot::Mutex;
use tcp_ping::{stati::Stati, impl_std, reporter::{PeriodReport, Sample}, util::period_call::period_call};

fn wait_until<F>(timeout: Duration, mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

fn spawn_server() -> (u16, Arc<Stati>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let stati = Arc::new(Stati::new());
    {
        let stati = stati.clone();
        thread::spawn(move || impl_std::serve_forever(listener, &stati));
    }
    (port, stati)
}

#[test]
fn test_echo_identity() {
    let (port, stati) = spawn_server();

    let mut socket = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut buf = [0_u8; 1];
    for b in 0..=255_u8 {
        socket.write_all(&[b]).unwrap();
        socket.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], b);
    }

    assert!(wait_until(Duration::from_secs(5), || stati.requests() == 256));
    assert_eq!(stati.conns(), 1);

    drop(socket);
    assert!(wait_until(Duration::from_secs(5), || stati.conns() == 0));
    assert_eq!(stati.requests(), 256);
}

#[test]
fn test_server_counts_connections() {
    let (port, stati) = spawn_server();

    let sockets: Vec<_> = (0..3).map(|_| TcpStream::connect(("127.0.0.1", port)).unwrap()).collect();
    assert!(wait_until(Duration::from_secs(5), || stati.conns() == 3));

    drop(sockets);
    assert!(wait_until(Duration::from_secs(5), || stati.conns() == 0));
    assert_eq!(stati.requests(), 0);
}

#[test]
fn test_client_converges_to_workers() {
    const WORKERS: usize = 4;
    let (port, server_stati) = spawn_server();

    let stati = Arc::new(Stati::new());
    let samples = Arc::new(Mutex::new(Vec::new()));
    let job = {
        let samples = samples.clone();
        PeriodReport::with_interval(stati.clone(), Duration::from_millis(100), move |sample: &Sample| {
            samples.lock().push(*sample);
        })
    };
    let guard = period_call("reporter", job).unwrap();

    // resolved by name
    let _tasks = impl_std::spawn_client("localhost", port, WORKERS, &stati).unwrap();

    assert!(wait_until(Duration::from_secs(5), || stati.conns() == WORKERS as i64));
    assert!(wait_until(Duration::from_secs(5), || server_stati.conns() == WORKERS as i64));

    let mut last = stati.requests();
    for _ in 0..3 {
        thread::sleep(Duration::from_millis(200));
        let requests = stati.requests();
        assert!(requests > last, "requests {} not above {}", requests, last);
        last = requests;
    }
    guard.stop();

    let samples = samples.lock();
    assert!(samples.len() >= 3);
    assert!(samples.iter().all(|s| s.conns >= 0 && s.conns <= WORKERS as i64));
    for pair in samples.windows(2) {
        assert!(pair[0].requests <= pair[1].requests);
    }
    assert_eq!(samples.last().unwrap().conns, WORKERS as i64);
    assert!(samples.last().unwrap().requests > 0);
}

#[test]
fn test_client_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let stati = Arc::new(Stati::new());
    let tasks = impl_std::spawn_client("127.0.0.1", port, 1, &stati).unwrap();

    let mut buf = [0_u8; 1];
    let (mut conn1, _) = listener.accept().unwrap();
    for _ in 0..3 {
        conn1.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 1);
        conn1.write_all(&buf).unwrap();
    }
    assert!(wait_until(Duration::from_secs(5), || stati.requests() >= 3));
    assert_eq!(stati.conns(), 1);

    // server side goes away
    drop(conn1);

    let (mut conn2, _) = listener.accept().unwrap();
    let before = stati.requests();
    conn2.read_exact(&mut buf).unwrap();
    conn2.write_all(&buf).unwrap();

    assert!(wait_until(Duration::from_secs(5), || stati.requests() > before));
    assert_eq!(stati.conns(), 1);
    assert!(!tasks[0].is_finished());
}

#[test]
fn test_client_counts_empty_receives_after_half_close() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let stati = Arc::new(Stati::new());
    let _tasks = impl_std::spawn_client("127.0.0.1", port, 1, &stati).unwrap();

    // read one byte, close the write half, never echo
    let (mut conn, _) = listener.accept().unwrap();
    let mut buf = [0_u8; 1];
    conn.read_exact(&mut buf).unwrap();
    conn.shutdown(std::net::Shutdown::Write).unwrap();

    // keep draining so the client's sends never block
    let drain = {
        let mut conn = conn.try_clone().unwrap();
        thread::spawn(move || {
            let mut buf = [0_u8; 4096];
            while matches!(conn.read(&mut buf), Ok(n) if n > 0) {}
        })
    };

    assert!(wait_until(Duration::from_secs(5), || stati.requests() > 1000));

    let mut last = stati.requests();
    for _ in 0..3 {
        thread::sleep(Duration::from_millis(100));
        let requests = stati.requests();
        assert!(requests > last, "requests {} not above {}", requests, last);
        assert_eq!(stati.conns(), 1);
        last = requests;
    }
    assert!(!drain.is_finished());
}
