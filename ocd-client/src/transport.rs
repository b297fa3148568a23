use std::{io, net::SocketAddr};

use futures::{SinkExt, StreamExt};
use ocd_protocol::{codec::MessageCodec, error::ReadError};
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio_util::codec::{FramedRead, FramedWrite};

/// The TCP connection to the debug server.
///
/// Outgoing commands are framed with the terminator byte, incoming bytes are split into messages.
pub struct Transport {
    reader: FramedRead<OwnedReadHalf, MessageCodec>,
    writer: FramedWrite<OwnedWriteHalf, MessageCodec>,
}

impl Transport {
    /// Makes exactly one connection attempt.
    pub async fn connect(addr: SocketAddr) -> io::Result<Transport> {
        log::debug!("Connecting to debug server at {}", addr);
        let tcp = TcpStream::connect(addr).await?;
        tcp.set_nodelay(true)?;
        let (read_half, write_half) = tcp.into_split();
        Ok(Transport {
            reader: FramedRead::new(read_half, MessageCodec::new()),
            writer: FramedWrite::new(write_half, MessageCodec::new()),
        })
    }

    /// Writes `command` followed by the terminator and flushes it.
    pub async fn send(&mut self, command: &str) -> io::Result<()> {
        log::debug!("command {:?}", command);
        self.writer.send(command).await
    }

    /// The next message without its terminator, `None` once the server closed the connection.
    pub async fn next_message(&mut self) -> Option<Result<String, ReadError>> {
        let message = self.reader.next().await;
        if let Some(Ok(text)) = &message {
            log::trace!("received {:?}", text);
        }
        message
    }

    /// Shuts down the write side and releases the socket.
    pub async fn close(mut self) -> io::Result<()> {
        let result = SinkExt::<&str>::close(&mut self.writer).await;
        drop(self.reader);
        result
    }
}
