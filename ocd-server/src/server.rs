use std::{
    io::{self, BufReader, ErrorKind, Write},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{DebugServer, Response};
use ocd_protocol::codec::{read_message, write_command};
use ocd_protocol::NOTIFICATION_END;
use ocd_protocol::error::ReadError;

#[derive(Debug, Clone)]
pub struct Config {
    pub read_write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_write_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct Server<T: DebugServer> {
    backend: T,
    config: Config,
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use ocd_server::server::Builder;
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .rw_timeout(Duration::from_secs(20))
///     .build(my_backend);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the TCP read and write timeout
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = timeout;
        self
    }

    /// Build and return the server
    pub fn build<T: DebugServer>(self, backend: T) -> Server<T> {
        Server::new(backend, self.config)
    }
}

impl<T: DebugServer> Server<T> {
    pub fn new(backend: T, config: Config) -> Server<T> {
        Server { backend, config }
    }

    pub fn into_backend(self) -> T {
        self.backend
    }

    pub fn listen(&mut self, addr: impl ToSocketAddrs) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr)?;
        log::info!("Server listening for connections");

        for stream in listener.incoming() {
            match stream {
                Ok(tcp) => self.serve(tcp),
                Err(e) => log::error!("Connection error: {}", e),
            }
        }
        Ok(())
    }

    /// Accepts and serves a single client, then returns.
    pub fn serve_one(&mut self, listener: &TcpListener) -> io::Result<()> {
        let (tcp, _) = listener.accept()?;
        self.serve(tcp);
        Ok(())
    }

    fn serve(&mut self, tcp: TcpStream) {
        if let Ok(addr) = tcp.peer_addr() {
            log::info!("New client connection from {}", addr);
        }
        if let Err(e) = self.handle_client(tcp) {
            log::error!("Client error: {}", e);
        }
    }

    fn handle_client(&mut self, tcp: TcpStream) -> Result<(), ReadError> {
        tcp.set_read_timeout(Some(self.config.read_write_timeout))?;
        tcp.set_write_timeout(Some(self.config.read_write_timeout))?;
        let mut reader = BufReader::new(tcp.try_clone()?);
        let mut writer = tcp;

        loop {
            match read_message(&mut reader) {
                Ok(Some(command)) => self.process_command(&command, &mut writer)?,
                // Client disconnected
                Ok(None) => break,
                Err(ReadError::IoError(err))
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    log::error!("Client read timeout, closing connection");
                    break;
                }
                Err(ReadError::IoError(err))
                    if err.kind() == ErrorKind::ConnectionAborted
                        || err.kind() == ErrorKind::ConnectionReset =>
                {
                    break;
                }
                Err(other) => return Err(other),
            }
        }
        log::info!("Client disconnected");
        Ok(())
    }

    /// Executes a command, writing the notifications it caused before its reply.
    fn process_command(&mut self, command: &str, tcp: &mut impl Write) -> io::Result<()> {
        log::debug!("Received command {:?}", command);
        let Response { events, reply } = self.backend.execute(command);
        for event in events {
            let line = event.to_line();
            log::debug!("Sending notification {:?}", line);
            let mut frame = line.into_bytes();
            frame.extend_from_slice(NOTIFICATION_END.as_bytes());
            tcp.write_all(&frame)?;
            tcp.write_all(&[ocd_protocol::TERMINATOR])?;
        }
        log::debug!("Sending reply {:?}", reply);
        write_command(tcp, &reply)?;
        tcp.flush()
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::HashMap,
        io::{BufReader, Write},
        net::{TcpListener, TcpStream},
        thread,
    };

    use ocd_protocol::{
        Event, Message,
        codec::{read_message, write_command},
    };

    use super::Builder;
    use crate::{DebugServer, Response};

    #[derive(Default)]
    struct Echo {
        received: Vec<String>,
    }

    impl DebugServer for Echo {
        fn execute(&mut self, command: &str) -> Response {
            self.received.push(command.to_string());
            let mut payload = HashMap::new();
            payload.insert("event".to_string(), command.to_string());
            Response::reply(command.to_uppercase()).with_event(Event::new("target_event", payload))
        }
    }

    #[test]
    fn notifications_precede_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut server = Builder::new().build(Echo::default());
            server.serve_one(&listener).unwrap();
            server.into_backend()
        });

        let mut tcp = TcpStream::connect(addr).unwrap();
        let mut reader = BufReader::new(tcp.try_clone().unwrap());
        write_command(&mut tcp, "halt").unwrap();
        tcp.flush().unwrap();

        let first = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(
            Message::classify(first),
            Message::Events(vec!["type target_event event halt".to_string()])
        );
        let second = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(Message::classify(second), Message::Reply("HALT".to_string()));

        drop(reader);
        drop(tcp);
        let backend = handle.join().unwrap();
        assert_eq!(backend.received, ["halt"]);
    }
}
