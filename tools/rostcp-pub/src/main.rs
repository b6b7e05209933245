// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rostcp-pub - publish `std_msgs/String` messages to a ROS TCP endpoint
//!
//! Connects to the endpoint, registers the topic and streams messages at a
//! fixed rate. The connection is re-established (with latched value and
//! registration re-sent) when the peer drops it.

use clap::Parser;
use rostcp::{
    ConnectorConfig, MessagePool, RecyclePool, TransmitLoop, TransmitStats, WireFormat,
    WireMessage, WireSerializer,
};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// rostcp publisher
#[derive(Parser, Debug)]
#[command(name = "rostcp-pub")]
#[command(version)]
#[command(about = "Publish std_msgs/String messages to a ROS TCP endpoint")]
struct Args {
    /// Endpoint host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Endpoint port
    #[arg(short, long, default_value = "10000")]
    port: u16,

    /// Topic to publish on
    #[arg(short, long, default_value = "/chatter")]
    topic: String,

    /// Message text (the sequence number is appended)
    #[arg(short, long, default_value = "hello")]
    message: String,

    /// Publish rate (msg/s)
    #[arg(short, long, default_value = "10")]
    rate: u64,

    /// Number of messages (0 = until Ctrl+C)
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,

    /// Wire format: legacy (ros1) or cdr (ros2); overrides the environment
    #[arg(short, long)]
    format: Option<WireFormat>,

    /// Per-topic queue size; overrides the environment
    #[arg(short, long)]
    queue_size: Option<usize>,

    /// YAML configuration file (replaces the environment layer)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the 4-byte CDR trailing pad
    #[arg(long)]
    no_trailing_pad: bool,

    /// Mark the topic as latched
    #[arg(long)]
    latch: bool,
}

/// `std_msgs/String`
#[derive(Debug, Default)]
struct StringMsg {
    data: String,
}

impl WireMessage for StringMsg {
    fn serialize_into(&self, ser: &mut WireSerializer) {
        ser.write_str(&self.data);
    }
}

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> rostcp::Result<ConnectorConfig> {
    let mut config = match &args.config {
        Some(path) => ConnectorConfig::from_yaml_file(path)?,
        None => ConnectorConfig::from_env(),
    };
    if let Some(format) = args.format {
        config = config.with_wire_format(format);
    }
    if let Some(queue_size) = args.queue_size {
        config = config.with_queue_capacity(queue_size);
    }
    if args.no_trailing_pad {
        config = config.with_trailing_pad(false);
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.rate == 0 {
        return Err("rate must be at least 1 msg/s".into());
    }
    let config = load_config(args)?;
    let addr = format!("{}:{}", args.host, args.port);
    println!(
        "Publishing on {} to {} ({} format, queue {})",
        args.topic, addr, config.wire_format, config.queue_capacity
    );

    let pool = Arc::new(RecyclePool::<StringMsg>::new(config.queue_capacity)?);
    let mut tx = TransmitLoop::new(config)?;
    let publisher = tx.advertise::<StringMsg>(args.topic.as_str(), "std_msgs/String", args.latch)?;
    publisher
        .queue()
        .set_pool(Some(Arc::clone(&pool) as Arc<dyn MessagePool<StringMsg>>));
    let stop = tx.stop_handle();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    let ctrl_stop = stop.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        ctrl_stop.stop();
    })?;

    let transmit_running = running.clone();
    let transmitter = thread::spawn(move || transmit(&mut tx, &addr, &transmit_running));

    let interval = Duration::from_micros(1_000_000 / args.rate);
    let start = Instant::now();
    let mut seq = 0_u64;
    while running.load(Ordering::SeqCst) && (args.count == 0 || seq < args.count) {
        let mut msg = pool.get_or_create(StringMsg::default);
        msg.data.clear();
        msg.data.push_str(&args.message);
        msg.data.push_str(&format!(" {}", seq));
        publisher.publish(Arc::new(msg));
        seq += 1;
        thread::sleep(interval);
    }
    // Ends connect retries too; a live connection drains before stopping.
    running.store(false, Ordering::SeqCst);
    stop.stop();

    let stats = transmitter
        .join()
        .map_err(|_| "transmit thread panicked")?;
    let elapsed = start.elapsed();
    let pool_stats = pool.stats();

    println!("\n=== Results ===");
    println!("  Duration: {:?}", elapsed);
    println!("  Messages published: {}", seq);
    println!("  Frames sent: {}", stats.frames_sent);
    println!("  Dropped (queue full): {}", stats.overflow_warnings);
    println!("  Keepalives: {}", stats.keepalives_sent);
    println!(
        "  Pool: {} reused, {} accepted, {} dropped",
        pool_stats.reused, pool_stats.accepted, pool_stats.dropped
    );

    Ok(())
}

/// Connect, run the loop, and reconnect until stopped.
///
/// Once `running` is cleared, a failed connect or a lost connection ends the
/// loop instead of retrying.
fn transmit(tx: &mut TransmitLoop, addr: &str, running: &AtomicBool) -> TransmitStats {
    let mut first = true;
    loop {
        let mut stream = match TcpStream::connect(addr) {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("[rostcp-pub] connect {} failed: {}", addr, e);
                if !running.load(Ordering::SeqCst) {
                    log::info!("[rostcp-pub] giving up, pending messages dropped");
                    break;
                }
                thread::sleep(RECONNECT_DELAY);
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("[rostcp-pub] set_nodelay: {}", e);
        }
        if !first {
            tx.prepare_reconnect();
        }
        first = false;
        log::info!("[rostcp-pub] connected to {}", addr);

        match tx.run(&mut stream) {
            Ok(()) => break,
            Err(e) => {
                log::warn!("[rostcp-pub] connection lost: {}", e);
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    tx.stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        addr
    }

    #[test]
    fn test_transmit_gives_up_when_unreachable_after_stop() {
        let mut tx = TransmitLoop::new(ConnectorConfig::default()).unwrap();
        let publisher = tx.advertise::<StringMsg>("/chatter", "std_msgs/String", false).unwrap();
        publisher.publish(Arc::new(StringMsg { data: "lost".into() }));
        tx.stop_handle().stop();

        let running = AtomicBool::new(false);
        let start = Instant::now();
        let stats = transmit(&mut tx, &closed_port(), &running);
        assert_eq!(stats.frames_sent, 0);
        assert!(start.elapsed() < RECONNECT_DELAY);
    }

    #[test]
    fn test_transmit_drains_before_stopping() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let reader = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            conn.read_to_end(&mut received).unwrap();
            received
        });

        let mut tx = TransmitLoop::new(ConnectorConfig::default()).unwrap();
        let publisher = tx.advertise::<StringMsg>("/chatter", "std_msgs/String", false).unwrap();
        publisher.publish(Arc::new(StringMsg { data: "kept".into() }));
        tx.stop_handle().stop();

        let running = AtomicBool::new(false);
        let stats = transmit(&mut tx, &addr, &running);
        drop(tx);
        assert_eq!(stats.frames_sent, 1);
        assert_eq!(stats.commands_sent, 1);

        let received = reader.join().unwrap();
        assert!(received.windows(4).any(|w| w == b"kept"));
    }
}
