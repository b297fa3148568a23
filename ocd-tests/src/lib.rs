//! Fixtures for end-to-end tests over real TCP.
use std::{net::TcpListener, thread::JoinHandle};

use ocd_server::{DebugServer, server::Builder};

/// A backend served on a free local port for exactly one client.
pub struct Served<T> {
    pub port: u16,
    handle: JoinHandle<T>,
}

impl<T: DebugServer + Send + 'static> Served<T> {
    pub fn start(backend: T) -> Served<T> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut server = Builder::new().build(backend);
            server.serve_one(&listener).unwrap();
            server.into_backend()
        });
        Served { port, handle }
    }

    /// Waits for the client to go away and returns the backend.
    pub fn finish(self) -> T {
        self.handle.join().unwrap()
    }
}
