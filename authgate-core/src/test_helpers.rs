//! Helpers shared by the provider tests

/// `http://127.0.0.1:<port>` with nothing listening on the port
///
/// The port is bound once to reserve it from the OS, then released.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
