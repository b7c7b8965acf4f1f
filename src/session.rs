use std::net::IpAddr;

use tokio::sync::watch;

/// Protocol mode of the bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Power-on state; no controller yet, nothing is published.
    #[default]
    Binary,
    /// A controller has sent `command`; state reports and video may flow.
    Sdk,
}

/// Who is controlling the vehicle and what the bridge owes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub mode: Mode,
    /// Address of the registered controller, set when SDK mode is entered.
    pub controller: Option<IpAddr>,
    /// Whether video streaming is switched on.
    pub video: bool,
}

pub type SessionSender = watch::Sender<Session>;
pub type SessionReceiver = watch::Receiver<Session>;

/// Makes the channel carrying the session record from the command channel
/// to the state and video channels. Writers go through `send_modify`, so a
/// reader always sees a complete record, never SDK mode without its
/// controller address.
pub fn make_session_channel() -> (SessionSender, SessionReceiver) {
    watch::channel(Session::default())
}
