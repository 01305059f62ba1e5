//! `dynadir` — a peer-to-peer directory-and-chat client for the two-level
//! naming protocol.
//!
//! # Usage
//!
//! ```bash
//! dynadir alice.stark 10.0.0.1                  # defaults: talk/dns port 30000
//! dynadir alice.stark 10.0.0.1 -t 31000 -d 31001
//! dynadir alice.stark 10.0.0.1 -i 10.0.0.100 -p 58000
//! ```
//!
//! Once running, identity and addresses are fixed for the process lifetime;
//! everything else happens through the interactive command line documented
//! by the `help` command.

mod chat;
mod commands;
mod event_loop;

use anyhow::Context;
use clap::Parser;
use dynadir_core::config::{SelfConfig, DEFAULT_PORT, DEFAULT_SA_PORT};
use dynadir_core::engine::Engine;
use event_loop::Driver;
use std::net::Ipv4Addr;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::reload;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Hostname consulted for the Surname Server's address when `-i` is not
/// given. Overridable for testing/deployment without touching the binary.
const DEFAULT_SS_HOSTNAME_ENV: &str = "DYNADIR_SS_HOST";
const DEFAULT_SS_HOSTNAME: &str = "localhost";

/// `prog name.surname IP [-t talkPort] [-d dnsPort] [-i saIP] [-p saPort]`
#[derive(Parser, Debug)]
#[command(name = "dynadir", about = "Two-level P2P naming and chat client")]
struct Cli {
    /// This node's identity, e.g. `alice.stark`.
    name: String,

    /// This node's own IPv4 address, as seen by peers.
    ip: Ipv4Addr,

    /// TCP port this node listens for chat connections on.
    #[arg(short = 't', long = "talk-port", default_value_t = DEFAULT_PORT)]
    talk_port: u16,

    /// UDP port this node's directory socket binds to.
    #[arg(short = 'd', long = "dns-port", default_value_t = DEFAULT_PORT)]
    dns_port: u16,

    /// Surname Server's IPv4 address. If omitted, resolved from
    /// `DYNADIR_SS_HOST` (default `localhost`).
    #[arg(short = 'i', long = "sa-ip")]
    sa_ip: Option<Ipv4Addr>,

    /// Surname Server's UDP port.
    #[arg(short = 'p', long = "sa-port", default_value_t = DEFAULT_SA_PORT)]
    sa_port: u16,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap already printed usage/help to stderr.
            let _ = e.print();
            return exit_code_for_clap(&e);
        }
    };

    let reload_handle = init_logging();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("fatal: could not start async runtime: {e}");
            return fatal_os_error();
        }
    };

    match rt.block_on(run(cli, reload_handle)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e:#}");
            fatal_os_error()
        }
    }
}

async fn run(
    cli: Cli,
    reload_handle: reload::Handle<EnvFilter, tracing_subscriber::Registry>,
) -> anyhow::Result<()> {
    let sa_ip = match cli.sa_ip {
        Some(ip) => ip,
        None => resolve_ss_hostname().await.context("failed to resolve Surname Server hostname")?,
    };

    let self_config = SelfConfig::new(cli.name, cli.ip, cli.talk_port, cli.dns_port, sa_ip, cli.sa_port)
        .context("invalid identity or address on the command line")?;

    info!(
        name = %self_config.my_name,
        ip = %self_config.my_ip,
        talk_port = self_config.my_talk_port,
        dns_port = self_config.my_dns_port,
        sa_addr = %self_config.sa_addr,
        "starting up"
    );

    // Bind on all interfaces, not just `my_ip`: the address in `SelfConfig`
    // is what this node *advertises* to peers, which need not match the
    // interface the local machine actually binds to.
    let chat_bind = format!("0.0.0.0:{}", self_config.my_talk_port);
    let chat_listener = TcpListener::bind(&chat_bind)
        .await
        .with_context(|| format!("failed to bind chat listen socket on {chat_bind}"))?;

    let engine = Engine::new(self_config);
    let mut driver = Driver::new(engine, chat_listener);

    println!("Ready. Type 'help' for a list of commands.");

    driver
        .run(move |n| set_verbosity(&reload_handle, n))
        .await
}

/// Resolves the Surname Server's address from `DYNADIR_SS_HOST` (or
/// `localhost` if unset). Failure here is unrecoverable, same as failing
/// to bind the chat listen socket.
async fn resolve_ss_hostname() -> anyhow::Result<Ipv4Addr> {
    let host = std::env::var(DEFAULT_SS_HOSTNAME_ENV).unwrap_or_else(|_| DEFAULT_SS_HOSTNAME.to_string());
    let lookup_target = format!("{host}:0");
    let mut addrs = tokio::net::lookup_host(&lookup_target)
        .await
        .with_context(|| format!("could not resolve Surname Server host '{host}'"))?;
    addrs
        .find_map(|addr| match addr {
            std::net::SocketAddr::V4(v4) => Some(*v4.ip()),
            std::net::SocketAddr::V6(_) => None,
        })
        .with_context(|| format!("host '{host}' resolved to no IPv4 address"))
}

/// Sets up the live-reloadable tracing filter. `DYNADIR_LOG` selects the
/// initial level, defaulting to `info`; the interactive `verbose <n>`
/// command rewires it at runtime via the returned handle.
fn init_logging() -> reload::Handle<EnvFilter, tracing_subscriber::Registry> {
    let env_filter = EnvFilter::try_from_env("DYNADIR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, reload_handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    reload_handle
}

/// Applies the `verbose <n>` command: `0` is quiet (warnings only), higher
/// values progressively widen the filter up to full trace output.
fn set_verbosity(handle: &reload::Handle<EnvFilter, tracing_subscriber::Registry>, n: u8) {
    let level = match n {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    if let Err(e) = handle.reload(EnvFilter::new(level.to_string())) {
        eprintln!("failed to change log verbosity: {e}");
    }
}

fn exit_code_for_clap(e: &clap::Error) -> ExitCode {
    use clap::error::ErrorKind;
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => argument_error(),
    }
}

/// Exit code -2 on argument error, as its `u8` two's-complement wrap.
fn argument_error() -> ExitCode {
    ExitCode::from(254)
}

/// Exit code -1 on fatal OS error, as its `u8` two's-complement wrap.
fn fatal_os_error() -> ExitCode {
    ExitCode::from(255)
}
