//! Caller records
//!
//! A caller is one simulated person. Its identity never changes; only its
//! status and the partner it is paired with move, and only while the
//! switchboard lock is held.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identity of a caller, `0..N-1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallerId(pub usize);

impl CallerId {
    /// Position of this caller in the registry
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for CallerId {
    fn from(index: usize) -> Self {
        CallerId(index)
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phone status of a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerStatus {
    /// Idle, free to place or receive a call
    #[default]
    Waiting,

    /// Paired with a partner, phone ringing, not yet connected
    Receiving,

    /// Connected and talking to the partner
    Talking,
}

impl fmt::Display for CallerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallerStatus::Waiting => "waiting",
            CallerStatus::Receiving => "receiving",
            CallerStatus::Talking => "talking",
        };
        f.write_str(name)
    }
}

impl FromStr for CallerStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "waiting" | "Waiting" | "WAITING" => Ok(CallerStatus::Waiting),
            "receiving" | "Receiving" | "RECEIVING" => Ok(CallerStatus::Receiving),
            "talking" | "Talking" | "TALKING" => Ok(CallerStatus::Talking),
            _ => Err(format!("Unknown caller status: {}", s)),
        }
    }
}

/// One simulated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: CallerId,
    pub status: CallerStatus,

    /// Current partner, or the last one once a call has ended.
    /// `None` until the first pairing.
    pub interlocutor: Option<CallerId>,
}

impl Caller {
    /// Create an idle caller that has never been paired
    pub fn new(id: CallerId) -> Self {
        Self {
            id,
            status: CallerStatus::Waiting,
            interlocutor: None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == CallerStatus::Waiting
    }

    /// Partner this caller is currently bound to, ignoring a stale one
    pub fn live_partner(&self) -> Option<CallerId> {
        if self.is_waiting() {
            None
        } else {
            self.interlocutor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [CallerStatus::Waiting, CallerStatus::Receiving, CallerStatus::Talking] {
            assert_eq!(status.to_string().parse::<CallerStatus>(), Ok(status));
        }
        assert_eq!("TALKING".parse::<CallerStatus>(), Ok(CallerStatus::Talking));
        assert!("ringing".parse::<CallerStatus>().is_err());
    }

    #[test]
    fn test_new_caller_is_idle_and_unpaired() {
        let caller = Caller::new(CallerId(7));
        assert_eq!(caller.id.to_string(), "7");
        assert!(caller.is_waiting());
        assert_eq!(caller.interlocutor, None);
    }

    #[test]
    fn test_stale_partner_is_not_live() {
        let mut caller = Caller::new(CallerId(0));
        caller.interlocutor = Some(CallerId(3));
        assert_eq!(caller.live_partner(), None);

        caller.status = CallerStatus::Talking;
        assert_eq!(caller.live_partner(), Some(CallerId(3)));
    }
}
