use std::time::Duration;

use ocd_client::{Client, Payload};
use ocd_protocol::DEFAULT_PORT;
use tokio::sync::mpsc;

use crate::{error::HarnessError, semihost::Semihost};

pub use ocd_protocol::firmware::{CMD_DFU, CMD_GET_IP};

const SEMIHOST_MESSAGE: &str = "semihost-message";
const LINK_PREFIX: &str = "comm=";

const INIT_COMMANDS: [&str; 3] = [
    "tcl_notifications on",
    "capture \"arm semihosting enable\"",
    "reset run",
];
const RESUME: &str = "capture \"resume\"";
const RESET: [&str; 2] = ["capture \"reset run\"", "capture \"continue\""];

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Time the target is left halted after announcing its link, before it is resumed.
    pub settle_delay: Duration,
    /// Time to wait for the firmware to answer, `None` waits forever.
    pub answer_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            settle_delay: Duration::from_secs(1),
            answer_timeout: None,
        }
    }
}

#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn answer_timeout(mut self, timeout: Duration) -> Self {
        self.config.answer_timeout = Some(timeout);
        self
    }

    pub async fn connect(self) -> Result<TargetInterface, HarnessError> {
        TargetInterface::connect_with_config(self.config).await
    }
}

/// Talks to the test firmware through the debug server.
///
/// Commands are single bytes written to a comm byte in target memory; the firmware answers
/// with a semihosting message. Answers are matched to commands in order.
pub struct TargetInterface {
    client: Client,
    comm_address: u32,
    messages: mpsc::UnboundedReceiver<String>,
    answer_timeout: Option<Duration>,
}

fn forward(payload: &Payload, messages: &mpsc::UnboundedSender<String>) {
    let Some(message) = payload.get("message") else {
        log::warn!("Semihosting notification without message");
        return;
    };
    match Semihost::parse(message) {
        Semihost::Reply(reply) => {
            log::debug!("Firmware answered {:?}", reply);
            let _ = messages.send(reply.to_string());
        }
        Semihost::Info(info) => log::info!("Target: {}", info),
        Semihost::Untagged(text) => log::debug!("Untagged semihosting output {:?}", text),
    }
}

/// Parses the `comm=<hex>` link info the firmware announces after reset.
pub fn parse_link_info(message: &str) -> Result<u32, HarnessError> {
    message
        .strip_prefix(LINK_PREFIX)
        .and_then(|hex| u32::from_str_radix(hex.trim(), 16).ok())
        .ok_or_else(|| HarnessError::LinkInfo(message.to_string()))
}

impl TargetInterface {
    pub async fn connect(port: u16) -> Result<TargetInterface, HarnessError> {
        Builder::new().port(port).connect().await
    }

    /// Connects, resets the target with semihosting enabled and waits for the firmware
    /// to announce its comm address. Resolves once the target runs again.
    pub async fn connect_with_config(config: Config) -> Result<TargetInterface, HarnessError> {
        let client = Client::connect(config.port).await?;
        let (sender, messages) = mpsc::unbounded_channel();
        client.on(SEMIHOST_MESSAGE, move |payload| forward(payload, &sender))?;

        let mut interface = TargetInterface {
            client,
            comm_address: 0,
            messages,
            answer_timeout: config.answer_timeout,
        };

        log::info!("Sending connection commands");
        for reply in interface.client.send_all(INIT_COMMANDS).await? {
            if !reply.is_empty() {
                log::debug!("Initialization reply: {}", reply);
            }
        }
        let link = interface.next_answer().await?;
        interface.comm_address = parse_link_info(&link)?;
        log::info!("Link established, comm byte at 0x{:x}", interface.comm_address);

        interface.client.wait_for("halted").await?;
        tokio::time::sleep(config.settle_delay).await;
        interface.client.send(RESUME)?.await?;
        Ok(interface)
    }

    pub fn comm_address(&self) -> u32 {
        self.comm_address
    }

    /// The underlying client, for commands the interface does not wrap.
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn next_answer(&mut self) -> Result<String, HarnessError> {
        let answer = match self.answer_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.messages.recv())
                .await
                .map_err(|_| HarnessError::NoAnswer)?,
            None => self.messages.recv().await,
        };
        answer.ok_or(HarnessError::Client(ocd_client::ClientError::Disconnected))
    }

    /// Writes `command` to the comm byte and returns the firmware's answer.
    pub async fn send_command(&mut self, command: u8) -> Result<String, HarnessError> {
        let write = format!("capture \"mwb 0x{:x} {}\"", self.comm_address, command);
        self.client.send(write)?.await?;
        self.next_answer().await
    }

    pub async fn get_ip(&mut self) -> Result<String, HarnessError> {
        self.send_command(CMD_GET_IP).await
    }

    /// Resets and restarts the target. The firmware announces its link again, the
    /// comm address is taken from that announcement.
    pub async fn reset(&mut self) -> Result<(), HarnessError> {
        self.client.send_all(RESET).await?;
        let link = self.next_answer().await?;
        self.comm_address = parse_link_info(&link)?;
        Ok(())
    }

    pub async fn disconnect(self) {
        self.client.disconnect().await
    }
}
