use std::error::Error;
use std::time::Duration;

use clap::{Parser, Subcommand};
use env_logger::Env;
use ocd_client::Client;
use ocd_harness::Builder;
use ocd_protocol::DEFAULT_PORT;

#[derive(Subcommand, Clone)]
enum Command {
    /// Ask the firmware for its IP address
    Ip,
    /// Reset and restart the target
    Reset,
    /// Send raw TCL commands and print their replies
    Send { commands: Vec<String> },
    /// Print notifications of the given types until interrupted
    Watch { events: Vec<String> },
}

#[derive(Parser)]
#[command(about = "Test harness for firmware behind an OpenOCD debug server", long_about=None)]
struct Args {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(
        long,
        help = "Milliseconds the target stays halted after announcing its link",
        default_value = "1000"
    )]
    settle_ms: u64,

    #[arg(long, help = "Milliseconds to wait for the firmware to answer")]
    timeout_ms: Option<u64>,

    #[clap(subcommand)]
    command: Command,
}

impl Args {
    fn harness(&self) -> Builder {
        let builder = Builder::new()
            .port(self.port)
            .settle_delay(Duration::from_millis(self.settle_ms));
        match self.timeout_ms {
            Some(ms) => builder.answer_timeout(Duration::from_millis(ms)),
            None => builder,
        }
    }
}

async fn watch(client: &Client, events: Vec<String>) -> Result<(), Box<dyn Error>> {
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    for kind in events {
        let sender = sender.clone();
        let name = kind.clone();
        client.on(kind, move |payload| {
            let _ = sender.send(format!("{} {:?}", name, payload));
        })?;
    }
    drop(sender);
    client.send("tcl_notifications on")?.await?;

    loop {
        tokio::select! {
            line = receiver.recv() => match line {
                Some(line) => println!("{}", line),
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("Parsed arguments: port={}, settle_ms={}", args.port, args.settle_ms);

    match args.command.clone() {
        Command::Ip => {
            let mut target = args.harness().connect().await?;
            let ip = target.get_ip().await?;
            target.disconnect().await;
            match ip.parse::<std::net::Ipv4Addr>() {
                Ok(addr) if !addr.is_unspecified() => println!("{}", addr),
                _ => return Err(format!("Target reported an invalid IP address '{}'", ip).into()),
            }
        }
        Command::Reset => {
            let mut target = args.harness().connect().await?;
            target.reset().await?;
            log::info!("Target reset, comm byte at 0x{:x}", target.comm_address());
            target.disconnect().await;
        }
        Command::Send { commands } => {
            let client = Client::connect(args.port).await?;
            for reply in client.send_all(commands).await? {
                println!("{}", reply);
            }
            client.disconnect().await;
        }
        Command::Watch { events } => {
            let client = Client::connect(args.port).await?;
            log::info!("Watching notifications, press Ctrl-C to stop");
            let result = watch(&client, events).await;
            client.disconnect().await;
            result?;
        }
    }
    Ok(())
}
