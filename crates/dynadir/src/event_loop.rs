//! The single-threaded cooperative event loop.
//!
//! One [`Driver`] owns the directory engine and every socket; it multiplexes
//! over the UDP directory socket, the TCP chat listen socket, the optional
//! TCP chat peer socket, and stdin with `tokio::select!`, arming a bounded
//! sequence timeout whenever the engine is in a transient join/find state.
//! Nothing here spawns a task to handle a connection: the engine's
//! sequencing invariants assume exactly one in-flight join/leave/find
//! exchange at a time, which a second concurrently-handled connection
//! could violate.

use crate::chat;
use crate::commands::{self, Command};
use dynadir_core::codec::{self, Message};
use dynadir_core::engine::{Effect, Engine, FindMode, FindStatus, JoinStatus, Notification};
use dynadir_core::types::{DirAddr, FullName};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, info, warn};

/// How long the loop waits for a sequence (join/leave/find) to complete
/// before giving up.
const SEQUENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait on the best-effort, discarded read after a leave
/// sequence's SS `DNS` update.
const DISCARD_READ_TIMEOUT: Duration = Duration::from_millis(500);

pub struct Driver {
    engine: Engine,
    dir_socket: Option<UdpSocket>,
    chat_listener: TcpListener,
    chat_peer: Option<(TcpStream, FullName)>,
    recv_buf: String,
    exit_requested: bool,
    stdin_closed: bool,
}

impl Driver {
    pub fn new(engine: Engine, chat_listener: TcpListener) -> Self {
        Self {
            engine,
            dir_socket: None,
            chat_listener,
            chat_peer: None,
            recv_buf: String::new(),
            exit_requested: false,
            stdin_closed: false,
        }
    }

    /// Runs until the user exits and the engine has cleanly left (or was
    /// never joined). `set_verbosity` rewires the live tracing filter for
    /// the `verbose <n>` command.
    pub async fn run(&mut self, mut set_verbosity: impl FnMut(u8)) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut udp_buf = vec![0u8; 2048];
        let mut tcp_buf = vec![0u8; 4096];

        loop {
            let timeout_armed = !matches!(self.engine.join_status(), JoinStatus::NotJoined | JoinStatus::Joined)
                || self.engine.find_status() != FindStatus::NotFinding;
            let sleep = tokio::time::sleep(SEQUENCE_TIMEOUT);
            tokio::pin!(sleep);

            tokio::select! {
                line = lines.next_line(), if !self.stdin_closed => {
                    match line {
                        Ok(Some(text)) => self.handle_line(&text, &mut set_verbosity).await,
                        Ok(None) => self.handle_eof().await,
                        Err(e) => {
                            warn!(error = %e, "stdin read error");
                            self.stdin_closed = true;
                        }
                    }
                }

                res = self.dir_socket.as_ref().unwrap().recv_from(&mut udp_buf), if self.dir_socket.is_some() => {
                    self.handle_dir_datagram(res, &udp_buf).await;
                }

                res = self.chat_listener.accept() => {
                    self.handle_inbound_chat(res).await;
                }

                res = self.chat_peer.as_mut().unwrap().0.read(&mut tcp_buf), if self.chat_peer.is_some() => {
                    self.handle_chat_read(res, &tcp_buf).await;
                }

                () = &mut sleep, if timeout_armed => {
                    let effects = self.engine.on_timeout();
                    self.apply_effects(effects).await;
                }
            }

            if self.exit_requested && self.engine.join_status() == JoinStatus::NotJoined {
                break;
            }
        }
        Ok(())
    }

    async fn handle_eof(&mut self) {
        self.exit_requested = true;
        self.stdin_closed = true;
        if self.engine.join_status() == JoinStatus::Joined {
            let effects = self.engine.cmd_leave();
            self.apply_effects(effects).await;
        }
    }

    async fn handle_line(&mut self, text: &str, set_verbosity: &mut impl FnMut(u8)) {
        match commands::parse(text) {
            Command::Empty => {}
            Command::Join => {
                let effects = self.engine.cmd_join();
                self.apply_effects(effects).await;
            }
            Command::Leave => {
                let effects = self.engine.cmd_leave();
                self.apply_effects(effects).await;
            }
            Command::Find(target) => {
                let effects = self.engine.cmd_find(&target, FindMode::FindForFind, self.chat_peer.is_some());
                self.apply_effects(effects).await;
            }
            Command::Connect(target) => {
                let effects = self.engine.cmd_find(&target, FindMode::FindForConnect, self.chat_peer.is_some());
                self.apply_effects(effects).await;
            }
            Command::Disconnect => {
                if self.chat_peer.take().is_some() {
                    println!("Disconnected.");
                } else {
                    println!("No chat peer connected.");
                }
            }
            Command::Message(text) => self.send_chat(&text, true).await,
            Command::RawMessage(text) => self.send_chat(&text, false).await,
            Command::Rickroll => self.send_chat(chat::RICKROLL_TEXT, true).await,
            Command::Exit => {
                self.exit_requested = true;
                if self.engine.join_status() == JoinStatus::Joined {
                    let effects = self.engine.cmd_leave();
                    self.apply_effects(effects).await;
                }
            }
            Command::Verbose(n) => {
                set_verbosity(n);
                println!("Verbosity set to {n}.");
            }
            Command::List => self.print_roster(),
            Command::Status => self.handle_status().await,
            Command::Help => print_help(),
            Command::Unknown(word) => println!("Unknown command '{word}'. Type 'help' for a list."),
        }
    }

    async fn send_chat(&mut self, text: &str, framed: bool) {
        let Some((stream, _)) = self.chat_peer.as_mut() else {
            println!("No chat peer connected. Use 'connect <name>' first.");
            return;
        };
        let payload = if framed {
            chat::format_frame(&self.engine.self_config().my_name, text)
        } else {
            chat::format_raw(text)
        };
        if let Err(e) = stream.write_all(payload.as_bytes()).await {
            warn!(error = %e, "failed to send chat message, dropping peer");
            self.chat_peer = None;
        }
    }

    async fn handle_inbound_chat(&mut self, res: std::io::Result<(TcpStream, SocketAddr)>) {
        let (stream, peer_addr) = match res {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "failed to accept chat connection");
                return;
            }
        };
        if self.chat_peer.is_some() {
            debug!(peer = %peer_addr, "rejecting second chat caller, busy");
            chat::reject_busy(stream, &self.engine.self_config().my_name).await;
            return;
        }
        info!(peer = %peer_addr, "accepted chat connection");
        println!("Incoming chat connection from {peer_addr}.");
        // The peer's identity is only learned once they send a framed
        // message; until then it's tracked as "unknown".
        self.chat_peer = Some((stream, FullName::new("unknown.unknown").unwrap()));
    }

    async fn handle_chat_read(&mut self, res: std::io::Result<usize>, buf: &[u8]) {
        match res {
            Ok(0) => {
                println!("Chat peer disconnected.");
                self.chat_peer = None;
            }
            Ok(n) => {
                self.recv_buf.push_str(&String::from_utf8_lossy(&buf[..n]));
                for line in chat::drain_frames(&mut self.recv_buf) {
                    println!("{line}");
                }
            }
            Err(e) => {
                warn!(error = %e, "chat read error, dropping peer");
                self.chat_peer = None;
            }
        }
    }

    async fn handle_dir_datagram(&mut self, res: std::io::Result<(usize, SocketAddr)>, buf: &[u8]) {
        let (n, from) = match res {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "directory socket recv error");
                return;
            }
        };
        let from_v4 = match from {
            SocketAddr::V4(v4) => DirAddr::new(*v4.ip(), v4.port()),
            SocketAddr::V6(_) => {
                warn!(%from, "dropping datagram from IPv6 peer, unsupported");
                return;
            }
        };
        let msg = match codec::decode(&buf[..n]) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%from, error = %e, "dropping malformed directory datagram");
                return;
            }
        };
        let effects = self.engine.on_datagram(from_v4, msg);
        self.apply_effects(effects).await;
    }

    fn print_roster(&self) {
        for c in self.engine.roster().iter() {
            println!("{};{};{};{}", c.name, c.ip, c.talk_port, c.dns_port);
        }
    }

    /// Prints the current snapshot and, if the GNS is unknown while joined,
    /// kicks off a background re-resolution via the SS whose answer arrives
    /// later as an unsolicited `FW` datagram.
    async fn handle_status(&mut self) {
        if self.engine.name_server().is_none() && self.engine.join_status() == JoinStatus::Joined {
            let (_, effects) = self.engine.resolve_name_server();
            self.apply_effects(effects).await;
        }
        let s = self.engine.status_snapshot();
        println!(
            "joinStatus={:?} findStatus={:?} nameServer={} roster={} oksExpected={}",
            s.join_status,
            s.find_status,
            s.name_server.map(|n| n.to_string()).unwrap_or_else(|| "unknown".to_string()),
            s.roster_len,
            s.oks_expected,
        );
    }

    async fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.apply_effect(effect).await;
        }
    }

    async fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::BindDirSocket => self.bind_dir_socket().await,
            Effect::CloseDirSocket => {
                self.dir_socket = None;
            }
            Effect::ArmTimeout | Effect::DisarmTimeout => {
                // The loop recomputes `timeout_armed` from engine state on
                // every iteration; these are purely advisory here.
            }
            Effect::SendToSs(msg) => {
                let addr = self.engine.self_config().sa_addr;
                self.send_datagram(addr, &msg).await;
            }
            Effect::SendToPeer(addr, msg) => {
                self.send_datagram(addr, &msg).await;
            }
            Effect::ConnectChat(name, addr) => self.connect_chat(name, addr).await,
            Effect::DiscardReply { addr } => self.discard_reply(addr).await,
            Effect::Notify(notification) => print_notification(notification),
        }
    }

    async fn bind_dir_socket(&mut self) {
        // Bind on all interfaces, same rationale as the chat listen socket:
        // `my_dns_port` is the advertised port, not necessarily tied to the
        // advertised IP on this machine.
        let bind_addr: SocketAddr = format!("0.0.0.0:{}", self.engine.self_config().my_dns_port)
            .parse()
            .expect("formatted socket address is always valid");
        match UdpSocket::bind(bind_addr).await {
            Ok(sock) => {
                info!(addr = %bind_addr, "directory socket bound");
                self.dir_socket = Some(sock);
            }
            Err(e) => {
                warn!(addr = %bind_addr, error = %e, "failed to bind directory socket");
                let effects = self.engine.on_bind_failed(e.to_string());
                // Box the recursive call: `apply_effects` is async and this
                // path never re-enters BindDirSocket, so no actual
                // unbounded recursion occurs.
                Box::pin(self.apply_effects(effects)).await;
            }
        }
    }

    async fn send_datagram(&mut self, addr: DirAddr, msg: &Message) {
        let Some(sock) = self.dir_socket.as_ref() else {
            warn!("attempted to send a directory datagram with no socket bound");
            return;
        };
        let bytes = codec::encode(msg);
        if let Err(e) = sock.send_to(&bytes, addr.to_socket_addr()).await {
            warn!(%addr, error = %e, "failed to send directory datagram");
        }
    }

    async fn connect_chat(&mut self, name: FullName, addr: std::net::SocketAddrV4) {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                info!(%name, %addr, "chat connection established");
                self.chat_peer = Some((stream, name));
            }
            Err(e) => {
                warn!(%name, %addr, error = %e, "failed to connect chat socket");
            }
        }
    }

    async fn discard_reply(&mut self, addr: DirAddr) {
        let Some(sock) = self.dir_socket.as_ref() else { return };
        let mut scratch = [0u8; 512];
        match tokio::time::timeout(DISCARD_READ_TIMEOUT, sock.recv_from(&mut scratch)).await {
            Ok(Ok((_, from))) => debug!(%addr, %from, "discarded best-effort SS reply"),
            Ok(Err(e)) => debug!(%addr, error = %e, "discarded reply read errored"),
            Err(_) => debug!(%addr, "discarded reply read timed out"),
        }
    }

}

fn print_notification(n: Notification) {
    match n {
        Notification::Joined => println!("Joined the family."),
        Notification::JoinAborted { reason } => println!("Join aborted: {reason}"),
        Notification::Left => println!("Left the family."),
        Notification::LeaveAborted { reason } => println!("Leave aborted: {reason}"),
        Notification::FoundAt { name, ip, talk_port } => {
            println!("User {name} is at {ip}:{talk_port}.")
        }
        Notification::FindNotFound => println!("User not found."),
        Notification::FindTimedOut => println!("Find timed out."),
        Notification::AlreadyJoined { gns } => println!(
            "Already joined (GNS: {}).",
            gns.map(|n| n.to_string()).unwrap_or_else(|| "unknown".to_string())
        ),
        Notification::NotJoined => println!("Not joined."),
        Notification::AlreadyLeaving => println!("Already leaving."),
        Notification::AlreadyFinding => println!("Already finding."),
        Notification::ChatBusy => println!("Chat is already busy with another peer."),
        Notification::Error(msg) => println!("Error: {msg}"),
    }
}

fn print_help() {
    println!(
        "Commands: join, leave, find <name>, connect <name>, disconnect, \
         message <text> (m), mraw <text>, verbose <n>, list, status, rickroll, exit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynadir_core::config::SelfConfig;

    async fn test_driver() -> Driver {
        let self_config = SelfConfig::new(
            "alice.stark",
            std::net::Ipv4Addr::new(127, 0, 0, 1),
            0,
            0,
            std::net::Ipv4Addr::new(127, 0, 0, 1),
            0,
        )
        .unwrap();
        let chat_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Driver::new(Engine::new(self_config), chat_listener)
    }

    #[tokio::test]
    async fn bind_dir_socket_effect_binds_a_real_socket() {
        let mut driver = test_driver().await;
        assert!(driver.dir_socket.is_none());
        driver.apply_effect(Effect::BindDirSocket).await;
        assert!(driver.dir_socket.is_some());
    }

    #[tokio::test]
    async fn send_to_peer_delivers_bytes_on_the_wire() {
        let mut driver = test_driver().await;
        driver.apply_effect(Effect::BindDirSocket).await;

        let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let probe_addr = probe.local_addr().unwrap();
        let probe_dir_addr = DirAddr::new(std::net::Ipv4Addr::new(127, 0, 0, 1), probe_addr.port());

        driver.apply_effect(Effect::SendToPeer(probe_dir_addr, Message::Ok)).await;

        let mut buf = [0u8; 32];
        let (n, _) = tokio::time::timeout(Duration::from_secs(1), probe.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"OK");
    }

    #[tokio::test]
    async fn second_inbound_chat_connection_is_rejected_busy() {
        let mut driver = test_driver().await;
        let chat_addr = driver.chat_listener.local_addr().unwrap();

        let _existing_client = TcpStream::connect(chat_addr).await.unwrap();
        let (existing_server_side, _) = driver.chat_listener.accept().await.unwrap();
        driver.chat_peer = Some((existing_server_side, FullName::new("bob.stark").unwrap()));

        let mut second_client = TcpStream::connect(chat_addr).await.unwrap();
        let (incoming, addr) = driver.chat_listener.accept().await.unwrap();
        driver.handle_inbound_chat(Ok((incoming, addr))).await;

        let mut buf = vec![0u8; 128];
        let n = tokio::time::timeout(Duration::from_secs(1), second_client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.starts_with("MSS alice.stark;Sorry, I am busy right now."));
    }

    #[tokio::test]
    async fn chat_read_reformats_framed_line_for_display() {
        let mut driver = test_driver().await;
        let chat_addr = driver.chat_listener.local_addr().unwrap();

        let mut far_side = TcpStream::connect(chat_addr).await.unwrap();
        let (near_side, _) = driver.chat_listener.accept().await.unwrap();
        driver.chat_peer = Some((near_side, FullName::new("bob.stark").unwrap()));

        far_side.write_all(b"MSS bob.stark;hello there\n").await.unwrap();

        let mut buf = vec![0u8; 256];
        let n = driver
            .chat_peer
            .as_mut()
            .unwrap()
            .0
            .read(&mut buf)
            .await
            .unwrap();
        driver.handle_chat_read(Ok(n), &buf).await;

        assert!(driver.recv_buf.is_empty());
        assert!(driver.chat_peer.is_some());
    }
}
