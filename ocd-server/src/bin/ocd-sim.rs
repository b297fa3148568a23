//! Serves a simulated target on the TCL RPC port, for running the harness without hardware.
use std::error::Error;
use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use clap_num::maybe_hex;
use env_logger::Env;
use ocd_protocol::DEFAULT_PORT;
use ocd_server::{server::Server, simulator::TargetSimulator};

#[derive(Parser)]
#[command(about = "Simulated OpenOCD TCL RPC server with a semihosting test target", long_about=None)]
struct Args {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value = "127.0.0.1")]
    bind: IpAddr,

    #[arg(long, default_value = "0x20000400", value_parser = maybe_hex::<u32>)]
    comm_address: u32,

    #[arg(long, default_value = "192.168.1.5", help = "The IP address the target reports")]
    target_ip: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!("Starting target simulator");

    let args = Args::parse();
    log::debug!(
        "Parsed arguments: bind={}, port={}, comm_address=0x{:x}",
        args.bind,
        args.port,
        args.comm_address
    );

    let addr = SocketAddr::new(args.bind, args.port);
    log::info!("Binding to address: {}", addr);

    let target = TargetSimulator::new(args.comm_address, args.target_ip);
    let mut server = Server::new(target, Default::default());
    server.listen(addr)
}
