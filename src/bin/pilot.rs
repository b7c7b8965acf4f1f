//! Disposable test flight against a running bridge: enter SDK mode, take
//! off, nudge around, switch the stream on, print a few state reports,
//! land. Replies and reports go straight to stdout.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

#[derive(Parser, Debug)]
#[command(name = "pilot", about = "Scripted test flight against a Tello bridge")]
struct Args {
    /// Bridge host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Bridge control port.
    #[arg(long, default_value_t = 8889)]
    control_port: u16,

    /// Local port state reports arrive on.
    #[arg(long, default_value_t = 8890)]
    state_port: u16,

    /// How many state reports to print before landing.
    #[arg(long, default_value_t = 5)]
    reports: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let control = UdpSocket::bind("0.0.0.0:0").await?;
    control
        .connect((args.host.as_str(), args.control_port))
        .await?;

    let state = UdpSocket::bind(("0.0.0.0", args.state_port)).await?;

    for line in ["command", "streamon", "takeoff", "up 100", "rc 0 20 0 0"] {
        send(&control, line).await?;
        sleep(Duration::from_millis(200)).await;
    }

    let mut buf = [0u8; 2048];
    for _ in 0..args.reports {
        match timeout(Duration::from_secs(2), state.recv_from(&mut buf)).await {
            Ok(received) => {
                let (n, _) = received?;
                println!("state   <- {}", String::from_utf8_lossy(&buf[..n]));
            }
            Err(_) => {
                println!("state   <- (nothing)");
                break;
            }
        }
    }

    send(&control, "land").await?;
    Ok(())
}

async fn send(control: &UdpSocket, line: &str) -> Result<()> {
    println!("command -> {line}");
    control.send(line.as_bytes()).await?;

    let mut buf = [0u8; 64];
    let n = timeout(Duration::from_secs(3), control.recv(&mut buf)).await??;
    println!("reply   <- {}", String::from_utf8_lossy(&buf[..n]));
    Ok(())
}
