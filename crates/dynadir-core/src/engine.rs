//! The directory engine: the protocol state machine this crate exists to
//! implement.
//!
//! The engine is a plain value. Every public `cmd_*`/`on_*` method is a
//! transition function: it mutates `self` and returns the list of
//! [`Effect`]s the caller (the event loop) must carry out — sending a
//! datagram, arming the sequence timeout, opening or closing the directory
//! socket, starting a chat connection, or surfacing a [`Notification`] to
//! the user. No socket, clock, or I/O handle is ever touched inside this
//! module, which is what makes it testable without a network.

use crate::codec::{DnsInfo, Message, RegisterInfo, ReplyInfo};
use crate::config::SelfConfig;
use crate::contact::Contact;
use crate::roster::Roster;
use crate::types::{DirAddr, FullName, FullNameError};
use std::net::{Ipv4Addr, SocketAddrV4};

/// Join-sequence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    NotJoined,
    WaitForDns,
    WaitForLst,
    WaitForOk,
    Joined,
    LeavingDns,
    LeavingUsers,
    SearchingNewDns,
    LeavingForGood,
}

/// Find-sequence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindStatus {
    NotFinding,
    WaitForFw,
    WaitForRpl,
}

/// Whether an in-flight find was issued by the `find` command (print the
/// result) or the `connect` command (open a chat session with it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindMode {
    FindForFind,
    FindForConnect,
}

/// A side effect the engine asks its driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    BindDirSocket,
    CloseDirSocket,
    ArmTimeout,
    DisarmTimeout,
    SendToSs(Message),
    SendToPeer(DirAddr, Message),
    /// Open a TCP chat connection to the resolved peer (FindForConnect).
    ConnectChat(FullName, SocketAddrV4),
    /// A best-effort read whose result the protocol discards (see the
    /// `continueLeave` open question in the design notes); the event loop
    /// issues one `recv` with a short timeout and drops whatever comes back.
    DiscardReply { addr: DirAddr },
    Notify(Notification),
}

/// A user-visible event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Joined,
    JoinAborted { reason: String },
    Left,
    LeaveAborted { reason: String },
    FoundAt {
        name: FullName,
        ip: Ipv4Addr,
        talk_port: u16,
    },
    FindNotFound,
    FindTimedOut,
    AlreadyJoined { gns: Option<FullName> },
    NotJoined,
    AlreadyLeaving,
    AlreadyFinding,
    ChatBusy,
    Error(String),
}

/// A snapshot of the engine's state, for the `status` command.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub join_status: JoinStatus,
    pub find_status: FindStatus,
    pub name_server: Option<FullName>,
    pub roster_len: usize,
    pub oks_expected: u32,
}

/// The directory engine.
pub struct Engine {
    self_config: SelfConfig,
    roster: Roster,
    join_status: JoinStatus,
    find_status: FindStatus,
    find_mode: FindMode,
    oks_expected: u32,
    /// Set while waiting for the SS's ack to the sole-member leave's `UNR`.
    /// Kept separate from `oks_expected`, which only counts Roster entries
    /// with `ok_expected` set and the SS is never a Roster entry.
    awaiting_ss_unr_ok: bool,
    /// Non-owning: always re-resolved by name against `roster`, never a
    /// second owner of a `Contact`.
    name_server: Option<FullName>,
    pending_dns_candidate: Option<FullName>,
    name_to_find: Option<FullName>,
}

impl Engine {
    pub fn new(self_config: SelfConfig) -> Self {
        Self {
            self_config,
            roster: Roster::new(),
            join_status: JoinStatus::NotJoined,
            find_status: FindStatus::NotFinding,
            find_mode: FindMode::FindForFind,
            oks_expected: 0,
            awaiting_ss_unr_ok: false,
            name_server: None,
            pending_dns_candidate: None,
            name_to_find: None,
        }
    }

    pub fn join_status(&self) -> JoinStatus {
        self.join_status
    }

    pub fn find_status(&self) -> FindStatus {
        self.find_status
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn name_server(&self) -> Option<&FullName> {
        self.name_server.as_ref()
    }

    pub fn self_config(&self) -> &SelfConfig {
        &self.self_config
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            join_status: self.join_status,
            find_status: self.find_status,
            name_server: self.name_server.clone(),
            roster_len: self.roster.len(),
            oks_expected: self.oks_expected,
        }
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    /// Starts the join sequence.
    pub fn cmd_join(&mut self) -> Vec<Effect> {
        if self.join_status != JoinStatus::NotJoined {
            return vec![Effect::Notify(Notification::AlreadyJoined {
                gns: self.name_server.clone(),
            })];
        }
        self.join_status = JoinStatus::WaitForDns;
        vec![
            Effect::BindDirSocket,
            Effect::SendToSs(Message::Reg(self.my_register_info())),
            Effect::ArmTimeout,
        ]
    }

    /// Called by the event loop when [`Effect::BindDirSocket`] fails.
    pub fn on_bind_failed(&mut self, reason: String) -> Vec<Effect> {
        self.reset_to_not_joined();
        vec![Effect::Notify(Notification::JoinAborted { reason })]
    }

    /// Starts the leave sequence.
    pub fn cmd_leave(&mut self) -> Vec<Effect> {
        if matches!(
            self.join_status,
            JoinStatus::LeavingUsers | JoinStatus::LeavingDns | JoinStatus::SearchingNewDns | JoinStatus::LeavingForGood
        ) {
            return vec![Effect::Notify(Notification::AlreadyLeaving)];
        }
        if self.join_status != JoinStatus::Joined {
            return vec![Effect::Notify(Notification::NotJoined)];
        }
        self.oks_expected = 0;
        let my_name = self.self_config.my_name.clone();

        if self.roster.has_exactly_one() {
            self.join_status = JoinStatus::LeavingDns;
            self.awaiting_ss_unr_ok = true;
            return vec![Effect::SendToSs(Message::Unr(my_name)), Effect::ArmTimeout];
        }

        let mut effects = Vec::new();
        let am_gns = self.name_server.as_deref() == Some(&my_name);

        if !am_gns {
            if let Some(gns_name) = self.name_server.clone() {
                if let Some(c) = self.roster.get_by_name_mut(&gns_name) {
                    c.ok_expected = true;
                    effects.push(Effect::SendToPeer(c.dir_addr(), Message::Unr(my_name.clone())));
                    self.oks_expected += 1;
                }
            }
        }

        let gns_name = self.name_server.clone();
        let others: Vec<(FullName, DirAddr)> = self
            .roster
            .iter_except(&my_name)
            .filter(|c| am_gns || Some(&c.name) != gns_name.as_ref())
            .map(|c| (c.name.clone(), c.dir_addr()))
            .collect();
        for (name, addr) in others {
            if let Some(c) = self.roster.get_by_name_mut(&name) {
                c.ok_expected = true;
            }
            effects.push(Effect::SendToPeer(addr, Message::Unr(my_name.clone())));
            self.oks_expected += 1;
        }

        self.join_status = JoinStatus::LeavingUsers;
        effects.push(Effect::ArmTimeout);
        effects
    }

    /// Starts a find sequence. `chat_busy` reports whether a chat peer is
    /// already connected, since `FindForConnect` refuses in that case.
    pub fn cmd_find(&mut self, raw_target: &str, mode: FindMode, chat_busy: bool) -> Vec<Effect> {
        if self.join_status != JoinStatus::Joined {
            return vec![Effect::Notify(Notification::NotJoined)];
        }
        if self.find_status != FindStatus::NotFinding {
            return vec![Effect::Notify(Notification::AlreadyFinding)];
        }
        if mode == FindMode::FindForConnect && chat_busy {
            return vec![Effect::Notify(Notification::ChatBusy)];
        }

        let target = match self.normalize_target(raw_target) {
            Ok(t) => t,
            Err(e) => return vec![Effect::Notify(Notification::Error(e.to_string()))],
        };
        self.find_mode = mode;

        if target.same_family(&self.self_config.my_name) {
            return self.resolve_locally(&target);
        }

        self.name_to_find = Some(target.clone());
        self.find_status = FindStatus::WaitForFw;
        vec![Effect::SendToSs(Message::Qry(target)), Effect::ArmTimeout]
    }

    fn normalize_target(&self, raw: &str) -> Result<FullName, FullNameError> {
        if raw.contains('.') {
            FullName::new(raw)
        } else {
            FullName::new(format!("{raw}.{}", self.self_config.my_name.surname()))
        }
    }

    fn resolve_locally(&mut self, target: &FullName) -> Vec<Effect> {
        match self.roster.get_by_name(target) {
            Some(c) => {
                let (name, ip, talk_port) = (c.name.clone(), c.ip, c.talk_port);
                self.report_found(name, ip, talk_port)
            }
            None => vec![Effect::Notify(Notification::FindNotFound)],
        }
    }

    fn report_found(&mut self, name: FullName, ip: Ipv4Addr, talk_port: u16) -> Vec<Effect> {
        match self.find_mode {
            FindMode::FindForFind => vec![Effect::Notify(Notification::FoundAt { name, ip, talk_port })],
            FindMode::FindForConnect => vec![
                Effect::ConnectChat(name.clone(), SocketAddrV4::new(ip, talk_port)),
                Effect::Notify(Notification::FoundAt { name, ip, talk_port }),
            ],
        }
    }

    /// The sequence-wide timeout fired.
    pub fn on_timeout(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if matches!(self.find_status, FindStatus::WaitForFw | FindStatus::WaitForRpl) {
            self.find_status = FindStatus::NotFinding;
            self.name_to_find = None;
            effects.push(Effect::Notify(Notification::FindTimedOut));
        }
        match self.join_status {
            JoinStatus::NotJoined | JoinStatus::Joined => {}
            JoinStatus::LeavingUsers | JoinStatus::LeavingDns | JoinStatus::SearchingNewDns => {
                self.reset_to_not_joined();
                effects.push(Effect::Notify(Notification::LeaveAborted {
                    reason: "remote state may be inconsistent".to_string(),
                }));
            }
            _ => {
                let mut abort = self.abort_join("join sequence timed out".to_string());
                effects.append(&mut abort);
                return effects;
            }
        }
        effects.push(Effect::DisarmTimeout);
        effects
    }

    // -----------------------------------------------------------------
    // Inbound datagrams
    // -----------------------------------------------------------------

    /// Handles one inbound datagram, already decoded. `from` is the UDP
    /// endpoint it arrived from.
    pub fn on_datagram(&mut self, from: DirAddr, msg: Message) -> Vec<Effect> {
        match msg {
            Message::Reg(info) => self.serve_reg(from, info),
            Message::Unr(name) => self.serve_unr(from, name),
            Message::Qry(name) => self.serve_qry(from, name),
            Message::Dns(info) => {
                if self.join_status == JoinStatus::WaitForDns {
                    self.continue_join_dns(info)
                } else {
                    self.serve_dns_promotion(from, info)
                }
            }
            Message::Lst(contacts) => self.continue_join_lst(contacts),
            Message::Ok => self.continue_ok(from),
            Message::Nok(reason) => self.continue_nok(from, reason),
            Message::Fw(target) => self.continue_find_fw(target),
            Message::Rpl(target) => self.continue_find_rpl(target),
        }
    }

    // -- serving (always active) -----------------------------------------

    fn serve_qry(&self, from: DirAddr, name: FullName) -> Vec<Effect> {
        let reply = match self.roster.get_by_name(&name) {
            Some(c) => Message::Rpl(Some(ReplyInfo {
                name: c.name.clone(),
                ip: c.ip,
                talk_port: c.talk_port,
            })),
            None => Message::Rpl(None),
        };
        vec![Effect::SendToPeer(from, reply)]
    }

    fn serve_reg(&mut self, from: DirAddr, info: RegisterInfo) -> Vec<Effect> {
        if info.name.surname() != self.self_config.my_name.surname() {
            let reason = format!("You do not have my surname ({})", self.self_config.my_name.surname());
            return vec![Effect::SendToPeer(from, Message::Nok(Some(reason)))];
        }

        let is_duplicate = self.roster.get_by_name(&info.name).is_some();
        if !is_duplicate {
            self.roster
                .add(Contact::new(info.name.clone(), info.ip, info.talk_port, info.dns_port));
        }

        let am_gns = self.name_server.as_deref() == Some(&self.self_config.my_name);
        if am_gns {
            if is_duplicate {
                return vec![Effect::SendToPeer(from, Message::Lst(vec![]))];
            }
            let contacts = self
                .roster
                .iter()
                .map(|c| RegisterInfo {
                    name: c.name.clone(),
                    ip: c.ip,
                    talk_port: c.talk_port,
                    dns_port: c.dns_port,
                })
                .collect();
            vec![Effect::SendToPeer(from, Message::Lst(contacts))]
        } else {
            vec![Effect::SendToPeer(from, Message::Ok)]
        }
    }

    fn serve_unr(&mut self, from: DirAddr, name: FullName) -> Vec<Effect> {
        // Advance the successor cursor *before* removing — the cursor
        // compares against the departing contact's own position (open
        // question iv: this ordering must not change).
        if self.pending_dns_candidate.as_ref() == Some(&name) {
            let my_name = self.self_config.my_name.clone();
            self.pending_dns_candidate = self.next_candidate_after(Some(&name), &my_name);
        }
        if self.name_server.as_ref() == Some(&name) {
            self.name_server = None;
        }
        self.roster.remove_by_name(&name);
        vec![Effect::SendToPeer(from, Message::Ok)]
    }

    fn serve_dns_promotion(&mut self, from: DirAddr, info: DnsInfo) -> Vec<Effect> {
        if info.name != self.self_config.my_name {
            return vec![Effect::SendToPeer(
                from,
                Message::Nok(Some("That was not my name".to_string())),
            )];
        }
        let leaving = matches!(
            self.join_status,
            JoinStatus::LeavingDns
                | JoinStatus::LeavingUsers
                | JoinStatus::SearchingNewDns
                | JoinStatus::LeavingForGood
        );
        if leaving {
            return vec![Effect::SendToPeer(
                from,
                Message::Nok(Some("Not fully joined, can't be DNS.".to_string())),
            )];
        }
        self.name_server = Some(self.self_config.my_name.clone());
        vec![Effect::SendToPeer(from, Message::Ok)]
    }

    // -- join continuation ------------------------------------------------

    fn continue_join_dns(&mut self, info: DnsInfo) -> Vec<Effect> {
        let gns_name = info.name.clone();
        if gns_name == self.self_config.my_name {
            self.roster.add(Contact::new(
                gns_name.clone(),
                info.ip,
                self.self_config.my_talk_port,
                info.dns_port,
            ));
            self.name_server = Some(gns_name);
            self.join_status = JoinStatus::Joined;
            return vec![Effect::DisarmTimeout, Effect::Notify(Notification::Joined)];
        }

        // talk_port is unknown until the GNS's LST reply carries it.
        self.roster.add(Contact::new(gns_name.clone(), info.ip, 0, info.dns_port));
        self.roster.add(Contact::new(
            self.self_config.my_name.clone(),
            self.self_config.my_ip,
            self.self_config.my_talk_port,
            self.self_config.my_dns_port,
        ));
        self.name_server = Some(gns_name);
        self.join_status = JoinStatus::WaitForLst;
        vec![
            Effect::SendToPeer(DirAddr::new(info.ip, info.dns_port), Message::Reg(self.my_register_info())),
            Effect::ArmTimeout,
        ]
    }

    fn continue_join_lst(&mut self, contacts: Vec<RegisterInfo>) -> Vec<Effect> {
        if self.join_status != JoinStatus::WaitForLst {
            return vec![];
        }
        if contacts.is_empty() {
            return self.abort_join("name already in use".to_string());
        }

        let my_name = self.self_config.my_name.clone();
        let gns_name = self.name_server.clone();
        let mut effects = Vec::new();

        for info in contacts {
            if info.name == my_name {
                continue;
            }
            if gns_name.as_ref() == Some(&info.name) {
                if let Some(c) = self.roster.get_by_name_mut(&info.name) {
                    c.talk_port = info.talk_port;
                }
                continue;
            }
            let mut c = Contact::new(info.name.clone(), info.ip, info.talk_port, info.dns_port);
            c.ok_expected = true;
            self.oks_expected += 1;
            effects.push(Effect::SendToPeer(c.dir_addr(), Message::Reg(self.my_register_info())));
            self.roster.add(c);
        }

        if self.oks_expected == 0 {
            self.join_status = JoinStatus::Joined;
            effects.push(Effect::DisarmTimeout);
            effects.push(Effect::Notify(Notification::Joined));
        } else {
            self.join_status = JoinStatus::WaitForOk;
        }
        effects
    }

    fn continue_join_ok(&mut self, from: DirAddr) -> Vec<Effect> {
        self.decrement_ok_expected(from);
        if self.oks_expected == 0 {
            self.join_status = JoinStatus::Joined;
            vec![Effect::DisarmTimeout, Effect::Notify(Notification::Joined)]
        } else {
            vec![]
        }
    }

    fn abort_join(&mut self, reason: String) -> Vec<Effect> {
        let should_unregister =
            self.join_status != JoinStatus::NotJoined && self.name_server.as_deref() == Some(&self.self_config.my_name);
        let my_name = self.self_config.my_name.clone();
        self.reset_to_not_joined();
        let mut effects = vec![Effect::CloseDirSocket, Effect::DisarmTimeout];
        if should_unregister {
            effects.push(Effect::SendToSs(Message::Unr(my_name)));
        }
        effects.push(Effect::Notify(Notification::JoinAborted { reason }));
        effects
    }

    // -- leave continuation -----------------------------------------------

    fn continue_leave_users_ok(&mut self, from: DirAddr) -> Vec<Effect> {
        self.decrement_ok_expected(from);
        if self.oks_expected == 0 {
            self.join_status = JoinStatus::LeavingDns;
            self.leaving_dns_advance()
        } else {
            vec![]
        }
    }

    /// Shared fallback for `LeavingDns`/`SearchingNewDns`: pick (or move to
    /// the next) GNS successor candidate, or give up.
    fn leaving_dns_advance(&mut self) -> Vec<Effect> {
        let my_name = self.self_config.my_name.clone();
        if self.name_server.as_deref() != Some(&my_name) {
            return self.enter_leaving_for_good();
        }
        match self.next_candidate_after(self.pending_dns_candidate.clone().as_ref(), &my_name) {
            Some(next_name) => {
                let candidate = self.roster.get_by_name(&next_name).unwrap().clone();
                self.pending_dns_candidate = Some(next_name.clone());
                self.join_status = JoinStatus::SearchingNewDns;
                vec![Effect::SendToPeer(
                    candidate.dir_addr(),
                    Message::Dns(DnsInfo {
                        name: next_name,
                        ip: candidate.ip,
                        dns_port: candidate.dns_port,
                    }),
                )]
            }
            None => self.enter_leaving_for_good(),
        }
    }

    fn continue_leave_searching_accept(&mut self, _from: DirAddr) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(candidate_name) = self.pending_dns_candidate.clone() {
            if let Some(c) = self.roster.get_by_name(&candidate_name) {
                effects.push(Effect::SendToSs(Message::Dns(DnsInfo {
                    name: candidate_name,
                    ip: c.ip,
                    dns_port: c.dns_port,
                })));
                // The SS's reply to this DNS update is read and discarded;
                // its content doesn't change what this node does next.
                effects.push(Effect::DiscardReply {
                    addr: self.self_config.sa_addr,
                });
            }
        }
        self.name_server = None;
        effects.extend(self.enter_leaving_for_good());
        effects
    }

    fn enter_leaving_for_good(&mut self) -> Vec<Effect> {
        self.pending_dns_candidate = None;
        self.roster.empty();
        self.name_server = None;
        self.oks_expected = 0;
        self.awaiting_ss_unr_ok = false;
        self.join_status = JoinStatus::NotJoined;
        vec![
            Effect::CloseDirSocket,
            Effect::DisarmTimeout,
            Effect::Notify(Notification::Left),
        ]
    }

    fn next_candidate_after(&self, current: Option<&FullName>, exclude: &FullName) -> Option<FullName> {
        let names: Vec<&FullName> = self
            .roster
            .iter()
            .map(|c| &c.name)
            .filter(|n| *n != exclude)
            .collect();
        match current {
            None => names.first().map(|n| (*n).clone()),
            Some(cur) => {
                let pos = names.iter().position(|n| *n == cur)?;
                names.get(pos + 1).map(|n| (*n).clone())
            }
        }
    }

    // -- find continuation ------------------------------------------------

    fn continue_find_fw(&mut self, target: Option<DnsInfo>) -> Vec<Effect> {
        if self.find_status != FindStatus::WaitForFw {
            // An unsolicited FW while not in a find sequence is the reply
            // to a background GNS resolution kicked off by
            // resolve_name_server: both share the FW message shape.
            if let Some(info) = target {
                if let Some(c) = self.roster.get_by_name(&info.name) {
                    self.name_server = Some(c.name.clone());
                }
            }
            return vec![];
        }
        match target {
            None => {
                self.find_status = FindStatus::NotFinding;
                self.name_to_find = None;
                vec![Effect::DisarmTimeout, Effect::Notify(Notification::FindNotFound)]
            }
            Some(info) => {
                let want = match self.name_to_find.clone() {
                    Some(n) => n,
                    None => return vec![],
                };
                self.find_status = FindStatus::WaitForRpl;
                vec![Effect::SendToPeer(DirAddr::new(info.ip, info.dns_port), Message::Qry(want))]
            }
        }
    }

    fn continue_find_rpl(&mut self, reply: Option<ReplyInfo>) -> Vec<Effect> {
        if self.find_status != FindStatus::WaitForRpl {
            return vec![];
        }
        self.find_status = FindStatus::NotFinding;
        self.name_to_find = None;
        match reply {
            None => vec![Effect::DisarmTimeout, Effect::Notify(Notification::FindNotFound)],
            Some(info) => {
                let mut effects = vec![Effect::DisarmTimeout];
                effects.extend(self.report_found(info.name, info.ip, info.talk_port));
                effects
            }
        }
    }

    /// Best-effort re-resolution of the family GNS when it is currently
    /// unknown (the previous GNS left and no handover reached this node).
    /// Returns the GNS if already known, plus the effect to kick off
    /// resolution otherwise; the answer — if any — arrives later as an
    /// unsolicited `FW` handled in [`Engine::continue_find_fw`].
    pub fn resolve_name_server(&mut self) -> (Option<FullName>, Vec<Effect>) {
        if let Some(name) = &self.name_server {
            return (Some(name.clone()), vec![]);
        }
        (
            None,
            vec![Effect::SendToSs(Message::Qry(self.self_config.my_name.clone()))],
        )
    }

    // -- shared continuation dispatch -------------------------------------

    fn continue_ok(&mut self, from: DirAddr) -> Vec<Effect> {
        match self.join_status {
            JoinStatus::WaitForOk => self.continue_join_ok(from),
            JoinStatus::LeavingUsers => self.continue_leave_users_ok(from),
            JoinStatus::LeavingDns => {
                self.awaiting_ss_unr_ok = false;
                self.leaving_dns_advance()
            }
            JoinStatus::SearchingNewDns => self.continue_leave_searching_accept(from),
            _ => {
                tracing::debug!(%from, "unexpected OK, dropping");
                vec![]
            }
        }
    }

    fn continue_nok(&mut self, from: DirAddr, reason: Option<String>) -> Vec<Effect> {
        match self.join_status {
            JoinStatus::SearchingNewDns => self.leaving_dns_advance(),
            _ => {
                tracing::debug!(%from, ?reason, "unexpected NOK, dropping");
                vec![]
            }
        }
    }

    // -- helpers -----------------------------------------------------------

    fn decrement_ok_expected(&mut self, from: DirAddr) {
        match self.roster.get_by_peer_address_mut(from.ip, from.port) {
            Some(c) if c.ok_expected => {
                c.ok_expected = false;
                self.oks_expected = self.oks_expected.saturating_sub(1);
            }
            Some(_) => {}
            None => {
                tracing::debug!(%from, "OK from unknown address, dropping");
            }
        }
    }

    fn reset_to_not_joined(&mut self) {
        self.roster.empty();
        self.name_server = None;
        self.pending_dns_candidate = None;
        self.name_to_find = None;
        self.oks_expected = 0;
        self.awaiting_ss_unr_ok = false;
        self.join_status = JoinStatus::NotJoined;
    }

    fn my_register_info(&self) -> RegisterInfo {
        RegisterInfo {
            name: self.self_config.my_name.clone(),
            ip: self.self_config.my_ip,
            talk_port: self.self_config.my_talk_port,
            dns_port: self.self_config.my_dns_port,
        }
    }
}
