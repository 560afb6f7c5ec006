//! One-shot datagram injector: sends a single data packet to a router's
//! input port. Thin glue for exercising a running topology by hand, not
//! part of the routing core itself.

use clap::Parser;
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(name = "inject", about = "Send one data packet into a router")]
struct Args {
    /// The router's input UDP port on localhost.
    port: u16,

    /// Destination router name (or "Broadcast" to inject a control packet).
    destination: String,

    /// The message carried in the packet's `data.msg` field.
    message: String,

    /// Initial hop counter. Defaults to 0, as for freshly injected traffic.
    #[arg(long, default_value_t = 0)]
    hop: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let packet = router_proto::Packet {
        destination: if args.destination == router_proto::Destination::BROADCAST_LITERAL {
            router_proto::Destination::Broadcast
        } else {
            router_proto::Destination::named(args.destination)
        },
        data: serde_json::json!({ "msg": args.message }),
        hop: args.hop,
    };

    let socket = UdpSocket::bind(("127.0.0.1", 0)).await?;
    socket
        .send_to(&packet.encode(), ("127.0.0.1", args.port))
        .await?;

    Ok(())
}
