use std::{
    future::{Future, IntoFuture},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use ocd_protocol::{DEFAULT_PORT, Payload};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::Instant,
};

use crate::{
    dispatcher::Dispatcher,
    error::ClientError,
    router::Handler,
    state::Waiter,
    transport::Transport,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// TCL RPC port of the debug server on the local host.
    pub port: u16,
    /// How long a command may wait for its reply. `None` waits forever.
    pub reply_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reply_timeout: None,
        }
    }
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.port)
    }
}

/// Builder to configure and connect a [Client]
///
/// # Example
///
/// ```ignore
/// use ocd_client::Builder;
/// use std::time::Duration;
///
/// let client = Builder::new()
///     .port(6666)
///     .reply_timeout(Duration::from_secs(5))
///     .connect()
///     .await?;
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the TCL RPC port of the debug server
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Fail commands whose reply takes longer than `timeout`
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.reply_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    /// Connect to the debug server with the configured options
    pub async fn connect(self) -> Result<Client, ClientError> {
        Client::connect_with_config(self.config).await
    }
}

enum Request {
    Send {
        command: String,
        reply: oneshot::Sender<String>,
    },
    On {
        kind: String,
        handler: Handler,
    },
    When {
        state: String,
        waiter: Waiter,
    },
    State {
        current: oneshot::Sender<Option<String>>,
    },
    Disconnect {
        done: oneshot::Sender<()>,
    },
}

/// Connection to the TCL RPC port of a debug server.
///
/// All protocol state (socket, reply queue, event handlers, state waiters and the current
/// target state) is owned by a background task. The client only forwards requests to it,
/// which keeps every mutation on a single task in the order requests were made.
pub struct Client {
    requests: mpsc::UnboundedSender<Request>,
    desync: Arc<AtomicBool>,
    reply_timeout: Option<Duration>,
    driver: JoinHandle<()>,
}

impl Client {
    /// Connects to the debug server on `127.0.0.1:port` with an otherwise default configuration.
    pub async fn connect(port: u16) -> Result<Client, ClientError> {
        Client::connect_with_config(Config {
            port,
            ..Config::default()
        })
        .await
    }

    /// Makes a single connection attempt. A failure is reported here and nowhere else.
    pub async fn connect_with_config(config: Config) -> Result<Client, ClientError> {
        let transport = Transport::connect(config.addr())
            .await
            .map_err(ClientError::Connect)?;
        log::info!("Connected to debug server at {}", config.addr());

        let (requests, receiver) = mpsc::unbounded_channel();
        let desync = Arc::new(AtomicBool::new(false));
        let driver = Driver {
            transport,
            dispatcher: Dispatcher::new(),
            requests: receiver,
            desync: desync.clone(),
        };
        Ok(Client {
            requests,
            desync,
            reply_timeout: config.reply_timeout,
            driver: tokio::spawn(driver.run()),
        })
    }

    fn request(&self, request: Request) -> Result<(), ClientError> {
        self.requests
            .send(request)
            .map_err(|_| ClientError::Disconnected)
    }

    /// Sends a command without waiting for earlier commands to be answered.
    ///
    /// Commands go out in the order `send` is called and their replies are matched in the
    /// same order. The returned [PendingReply] resolves to the reply text; dropping it
    /// discards the reply.
    pub fn send(&self, command: impl Into<String>) -> Result<PendingReply, ClientError> {
        if self.desync.load(Ordering::Acquire) {
            return Err(ClientError::ProtocolDesync);
        }
        let (reply, receiver) = oneshot::channel();
        self.request(Request::Send {
            command: command.into(),
            reply,
        })?;
        Ok(PendingReply {
            receiver,
            deadline: self.reply_timeout.map(|timeout| Instant::now() + timeout),
        })
    }

    /// Sends the commands one after the other, each only after the reply to the previous
    /// one arrived. Returns all replies in order, or the first error.
    pub async fn send_all<I>(&self, commands: I) -> Result<Vec<String>, ClientError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut replies = Vec::new();
        for command in commands {
            replies.push(self.send(command)?.await?);
        }
        Ok(replies)
    }

    /// Registers a persistent handler for events of type `kind`.
    ///
    /// `target_event` notifications are delivered under the name of the inner event,
    /// e.g. `halted` or `resumed`. Handlers run on the connection task and must not block.
    pub fn on(
        &self,
        kind: impl Into<String>,
        handler: impl Fn(&Payload) + Send + 'static,
    ) -> Result<(), ClientError> {
        self.request(Request::On {
            kind: kind.into(),
            handler: Box::new(handler),
        })
    }

    /// Like [Client::on], but delivers the payloads through a channel.
    pub fn subscribe(
        &self,
        kind: impl Into<String>,
    ) -> Result<mpsc::UnboundedReceiver<Payload>, ClientError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.on(kind, move |payload| {
            let _ = sender.send(payload.clone());
        })?;
        Ok(receiver)
    }

    /// Runs `waiter` once, as soon as the target is in `state`.
    /// If the target is already in `state`, it runs right when the request is processed.
    pub fn when(
        &self,
        state: impl Into<String>,
        waiter: impl FnOnce() + Send + 'static,
    ) -> Result<(), ClientError> {
        self.request(Request::When {
            state: state.into(),
            waiter: Box::new(waiter),
        })
    }

    /// Resolves once the target is in `state`.
    pub async fn wait_for(&self, state: impl Into<String>) -> Result<(), ClientError> {
        let (reached, receiver) = oneshot::channel();
        self.when(state, move || {
            let _ = reached.send(());
        })?;
        receiver.await.map_err(|_| ClientError::Disconnected)
    }

    /// The last reported target state.
    pub async fn state(&self) -> Result<Option<String>, ClientError> {
        let (current, receiver) = oneshot::channel();
        self.request(Request::State { current })?;
        receiver.await.map_err(|_| ClientError::Disconnected)
    }

    /// Drops all handlers, waiters and pending replies and closes the connection.
    /// Resolves once the socket is released.
    pub async fn disconnect(self) {
        let (done, receiver) = oneshot::channel();
        if self.request(Request::Disconnect { done }).is_ok() {
            let _ = receiver.await;
        }
        if let Err(e) = self.driver.await {
            log::error!("Connection task failed: {}", e);
        }
    }
}

/// The reply to a command sent with [Client::send].
///
/// With a reply timeout configured, the deadline counts from the moment the command was
/// sent, not from when the reply is awaited.
pub struct PendingReply {
    receiver: oneshot::Receiver<String>,
    deadline: Option<Instant>,
}

impl PendingReply {
    pub async fn wait(self) -> Result<String, ClientError> {
        let Some(deadline) = self.deadline else {
            return self.receiver.await.map_err(|_| ClientError::Disconnected);
        };
        match tokio::time::timeout_at(deadline, self.receiver).await {
            Ok(reply) => reply.map_err(|_| ClientError::Disconnected),
            Err(_) => {
                log::warn!("No reply before the deadline");
                Err(ClientError::ReplyTimeout)
            }
        }
    }
}

impl IntoFuture for PendingReply {
    type Output = Result<String, ClientError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

enum Flow {
    Continue,
    /// Tear down the connection, then acknowledge through the sender if there is one.
    Stop(Option<oneshot::Sender<()>>),
}

struct Driver {
    transport: Transport,
    dispatcher: Dispatcher,
    requests: mpsc::UnboundedReceiver<Request>,
    desync: Arc<AtomicBool>,
}

impl Driver {
    async fn run(mut self) {
        let done = loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(request) => {
                        if let Flow::Stop(done) = self.process_request(request).await {
                            break done;
                        }
                    }
                    // The client was dropped without disconnecting
                    None => break None,
                },
                message = self.transport.next_message() => match message {
                    Some(Ok(text)) => self.process_message(text),
                    Some(Err(e)) => {
                        log::error!("Failed to read from debug server: {}", e);
                        break None;
                    }
                    None => {
                        log::info!("Debug server closed the connection");
                        break None;
                    }
                },
            }
        };

        self.dispatcher.clear();
        if let Err(e) = self.transport.close().await {
            log::debug!("Error while closing connection: {}", e);
        }
        log::info!("Disconnected from debug server");
        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    async fn process_request(&mut self, request: Request) -> Flow {
        match request {
            Request::Send { command, reply } => {
                if let Err(e) = self.transport.send(&command).await {
                    log::error!("Failed to send command {:?}: {}", command, e);
                    return Flow::Stop(None);
                }
                self.dispatcher.replies.enqueue(reply);
            }
            Request::On { kind, handler } => self.dispatcher.router.on(kind, handler),
            Request::When { state, waiter } => self.dispatcher.state.when(state, waiter),
            Request::State { current } => {
                let _ = current.send(self.dispatcher.state.current().map(str::to_owned));
            }
            Request::Disconnect { done } => return Flow::Stop(Some(done)),
        }
        Flow::Continue
    }

    fn process_message(&mut self, text: String) {
        if let Err(e) = self.dispatcher.dispatch(text) {
            log::error!("{}; rejecting further commands", e);
            self.desync.store(true, Ordering::Release);
        }
    }
}
