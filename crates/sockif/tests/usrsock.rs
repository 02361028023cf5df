//! End-to-end tests: usrsock daemon in front of the built-in inet backend.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sockif::socket::{
    Backend, ConnFlags, Domain, EndpointManager, Error, PolicyAction, RegistryBuilder,
    SOCK_NONBLOCK, StackConfig,
};
use sockif::usrsock::wire::{Ack, Request};
use sockif::usrsock::{
    Daemon, DaemonHandler, DaemonLink, PolicyHandler, UsrsockBackend, UsrsockConn,
};
use tokio::runtime::{Builder, Runtime};

fn inet_only() -> StackConfig {
    StackConfig::from_json_str(r#"{ "local": { "enabled": false } }"#).unwrap()
}

fn stack(rt: &Runtime, daemon: &Daemon) -> EndpointManager {
    let proxy = UsrsockBackend::new(daemon.link(), rt.handle().clone(), Duration::from_secs(2));
    let registry = RegistryBuilder::new()
        .with_config(&inet_only())
        .proxy(Backend::proxy(proxy))
        .build();
    EndpointManager::new(Arc::new(registry))
}

/// Accepts everything and records closes.
#[derive(Default)]
struct Recording {
    next: i32,
    closed: Arc<Mutex<Vec<i32>>>,
}

impl DaemonHandler for Recording {
    fn socket(&mut self, _domain: i32, _ty: i32, _protocol: i32) -> i32 {
        self.next += 1;
        self.next + 100
    }

    fn close(&mut self, usockid: i32) -> i32 {
        self.closed.lock().unwrap().push(usockid);
        0
    }
}

#[test]
fn daemon_accepts() {
    let rt = Runtime::new().unwrap();
    let daemon = Daemon::spawn(rt.handle(), PolicyHandler::new(PolicyAction::Accept));
    let mgr = stack(&rt, &daemon);

    let ep = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_DGRAM, 0, SOCK_NONBLOCK)
        .unwrap();
    assert!(ep.backend().is_proxy());
    assert_eq!(ep.backend().name(), "usrsock");
    assert_eq!(ep.flags(), ConnFlags::INITD | ConnFlags::NONBLOCK);
    assert_eq!(
        ep.with_connection(|c| c.private::<UsrsockConn>().map(UsrsockConn::usockid)),
        Some(0)
    );
}

#[test]
fn daemon_defers_to_native() {
    let rt = Runtime::new().unwrap();
    let daemon = Daemon::spawn(rt.handle(), PolicyHandler::new(PolicyAction::Defer));
    let mgr = stack(&rt, &daemon);

    let ep = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap();
    assert!(ep.backend().is_native());
    assert_eq!(ep.backend().name(), "inet");
    assert_eq!(ep.flags(), ConnFlags::INITD);
}

#[test]
fn daemon_declines_per_family() {
    let rt = Runtime::new().unwrap();
    let handler = PolicyHandler::new(PolicyAction::Accept)
        .family(Domain::INET, PolicyAction::Decline);
    let daemon = Daemon::spawn(rt.handle(), handler);
    let mgr = stack(&rt, &daemon);

    let inet = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap();
    assert!(inet.backend().is_native());

    // No native backend exists for CAN, but the daemon takes it.
    let can = mgr
        .create_endpoint(libc::AF_CAN, libc::SOCK_RAW, 1, 0)
        .unwrap();
    assert!(can.backend().is_proxy());
}

#[test]
fn daemon_down_falls_back() {
    let rt = Runtime::new().unwrap();
    let daemon = Daemon::spawn(rt.handle(), PolicyHandler::new(PolicyAction::Down));
    let mgr = stack(&rt, &daemon);

    let ep = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_DGRAM, 0, 0)
        .unwrap();
    assert!(ep.backend().is_native());

    let err = mgr
        .create_endpoint(libc::AF_CAN, libc::SOCK_RAW, 1, 0)
        .unwrap_err();
    assert!(matches!(err, Error::NetworkDown));
}

#[test]
fn stopped_daemon_is_network_down() {
    let rt = Runtime::new().unwrap();
    let daemon = Daemon::spawn(rt.handle(), PolicyHandler::new(PolicyAction::Accept));
    let mgr = stack(&rt, &daemon);

    let before = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap();
    assert!(before.backend().is_proxy());

    daemon.shutdown();

    let after = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap();
    assert!(after.backend().is_native());

    let err = mgr
        .create_endpoint(libc::AF_CAN, libc::SOCK_RAW, 1, 0)
        .unwrap_err();
    assert!(matches!(err, Error::NetworkDown));
    assert_eq!(err.errno(), libc::ENETDOWN);
}

#[test]
fn daemon_errno_is_final() {
    let rt = Runtime::new().unwrap();
    let daemon = Daemon::spawn(
        rt.handle(),
        PolicyHandler::new(PolicyAction::Errno(libc::ENOMEM)),
    );
    let mgr = stack(&rt, &daemon);

    let err = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap_err();
    assert!(matches!(err, Error::OutOfMemory));
}

#[test]
fn native_rules_apply_after_fallback() {
    let rt = Runtime::new().unwrap();
    let daemon = Daemon::spawn(rt.handle(), PolicyHandler::new(PolicyAction::Defer));
    let mgr = stack(&rt, &daemon);

    let err = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_RAW, libc::IPPROTO_ICMP, 0)
        .unwrap_err();
    assert!(err.is_permission_denied());

    let err = mgr
        .create_endpoint(libc::AF_INET6, libc::SOCK_STREAM, 0, 0)
        .unwrap_err();
    assert!(matches!(err, Error::NotImplemented));
}

#[test]
fn close_reaches_daemon() {
    let rt = Runtime::new().unwrap();
    let handler = Recording::default();
    let closed = Arc::clone(&handler.closed);
    let daemon = Daemon::spawn(rt.handle(), handler);
    let mgr = stack(&rt, &daemon);

    let ep = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap();
    let dup = ep.dup();

    ep.close().unwrap();
    assert!(closed.lock().unwrap().is_empty());

    dup.close().unwrap();
    assert_eq!(*closed.lock().unwrap(), [101]);
}

/// Wait until `cond` holds, for at most two seconds.
fn eventually(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn dropped_endpoint_reaches_daemon() {
    let rt = Runtime::new().unwrap();
    let handler = Recording::default();
    let closed = Arc::clone(&handler.closed);
    let daemon = Daemon::spawn(rt.handle(), handler);
    let mgr = stack(&rt, &daemon);

    let ep = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap();
    assert!(ep.backend().is_proxy());

    drop(ep);
    assert_eq!(*closed.lock().unwrap(), [101]);
}

#[test]
fn late_socket_reply_is_closed() {
    let rt = Runtime::new().unwrap();
    let (link, mut port) = DaemonLink::channel(4);
    let closed = Arc::new(Mutex::new(Vec::new()));

    let daemon_closed = Arc::clone(&closed);
    rt.spawn(async move {
        while let Some(req) = port.recv().await {
            match Request::decode(req.frame()).unwrap() {
                Request::Socket { xid, .. } => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    req.respond(Ack::new(xid, 7).encode());
                }
                Request::Close { xid, usockid } => {
                    daemon_closed.lock().unwrap().push(usockid);
                    req.respond(Ack::new(xid, 0).encode());
                }
            }
        }
    });

    let registry = RegistryBuilder::new()
        .proxy(Backend::proxy(UsrsockBackend::new(
            link,
            rt.handle().clone(),
            Duration::from_millis(20),
        )))
        .build();
    let mgr = EndpointManager::new(Arc::new(registry));

    let err = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap_err();
    assert!(matches!(err, Error::TimedOut));
    assert!(eventually(|| *closed.lock().unwrap() == [7]));
}

/// Accepts after blocking the calling thread.
struct Sluggish {
    closed: Arc<Mutex<Vec<i32>>>,
}

impl DaemonHandler for Sluggish {
    fn socket(&mut self, _domain: i32, _ty: i32, _protocol: i32) -> i32 {
        std::thread::sleep(Duration::from_millis(200));
        3
    }

    fn close(&mut self, usockid: i32) -> i32 {
        self.closed.lock().unwrap().push(usockid);
        0
    }
}

#[test]
fn blocking_handler_still_times_out() {
    let rt = Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let closed = Arc::new(Mutex::new(Vec::new()));
    let daemon = Daemon::spawn(
        rt.handle(),
        Sluggish {
            closed: Arc::clone(&closed),
        },
    );
    let proxy = UsrsockBackend::new(daemon.link(), rt.handle().clone(), Duration::from_millis(20));
    let registry = RegistryBuilder::new().proxy(Backend::proxy(proxy)).build();
    let mgr = EndpointManager::new(Arc::new(registry));

    let err = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap_err();
    assert!(matches!(err, Error::TimedOut));

    // The late socket is handed back once the handler finishes.
    assert!(eventually(|| *closed.lock().unwrap() == [3]));
}

#[test]
fn configured_stack() {
    let config = StackConfig::from_json_str(
        r#"{
            "inet": { "ipv6": true },
            "local": { "enabled": false },
            "usrsock": {
                "enabled": true,
                "timeout_ms": 500,
                "policy": { "default": "defer", "families": { "inet6": "accept" } }
            }
        }"#,
    )
    .unwrap();

    let rt = Runtime::new().unwrap();
    let handler = PolicyHandler::from_config(&config.usrsock.policy).unwrap();
    let daemon = Daemon::spawn(rt.handle(), handler);
    let proxy = UsrsockBackend::from_config(daemon.link(), rt.handle().clone(), &config.usrsock);
    assert_eq!(proxy.timeout(), Duration::from_millis(500));

    let registry = RegistryBuilder::new()
        .with_config(&config)
        .proxy(Backend::proxy(proxy))
        .build();
    let mgr = EndpointManager::new(Arc::new(registry));

    let v6 = mgr
        .create_endpoint(libc::AF_INET6, libc::SOCK_STREAM, 0, 0)
        .unwrap();
    assert!(v6.backend().is_proxy());

    let v4 = mgr
        .create_endpoint(libc::AF_INET, libc::SOCK_STREAM, 0, 0)
        .unwrap();
    assert!(v4.backend().is_native());
}
