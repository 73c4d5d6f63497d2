//! Caller registry
//!
//! The registry is a plain, eagerly built vector of callers indexed by id.
//! It carries no locking of its own: every mutation goes through the
//! [`Switchboard`](crate::switchboard::Switchboard), whose single lock covers
//! the whole registry so that both sides of a pair always change together.

use thiserror::Error;

use crate::caller::{Caller, CallerId, CallerStatus};

/// Smallest population in which a caller has somebody to call
pub const MIN_CALLERS: usize = 2;

/// Ordered set of callers, indexed by [`CallerId`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerRegistry {
    callers: Vec<Caller>,
}

/// A broken pairing found by [`CallerRegistry::verify_pairing`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingViolation {
    #[error("caller {caller} is {status} without an interlocutor")]
    Unpaired { caller: CallerId, status: CallerStatus },

    #[error("caller {caller} is paired with itself")]
    SelfPaired { caller: CallerId },

    #[error("caller {caller} points at unknown caller {partner}")]
    UnknownPartner { caller: CallerId, partner: CallerId },

    #[error("caller {caller} points at {partner}, which points at {back:?}")]
    Asymmetric {
        caller: CallerId,
        partner: CallerId,
        back: Option<CallerId>,
    },

    #[error("caller {caller} is {status} but partner {partner} is {partner_status}")]
    StatusMismatch {
        caller: CallerId,
        status: CallerStatus,
        partner: CallerId,
        partner_status: CallerStatus,
    },
}

impl CallerRegistry {
    /// Create `count` idle callers with ids `0..count`
    pub fn new(count: usize) -> Self {
        Self {
            callers: (0..count).map(|index| Caller::new(CallerId(index))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }

    /// Look up a caller by id
    pub fn get(&self, id: CallerId) -> Option<&Caller> {
        self.callers.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Caller> {
        self.callers.iter()
    }

    /// Copy of every caller record, in id order
    pub fn snapshot(&self) -> Vec<Caller> {
        self.callers.clone()
    }

    /// Count callers per status as `(waiting, receiving, talking)`
    pub fn status_counts(&self) -> (usize, usize, usize) {
        self.callers.iter().fold((0, 0, 0), |(w, r, t), caller| match caller.status {
            CallerStatus::Waiting => (w + 1, r, t),
            CallerStatus::Receiving => (w, r + 1, t),
            CallerStatus::Talking => (w, r, t + 1),
        })
    }

    /// Status of a caller the engine itself handed out.
    ///
    /// Ids used by workers always come from `0..len`, so indexing is total.
    pub(crate) fn status_of(&self, id: CallerId) -> CallerStatus {
        self.callers[id.index()].status
    }

    /// Bind `a` and `b` to each other with the same status
    pub(crate) fn connect(&mut self, a: CallerId, b: CallerId, status: CallerStatus) {
        for (caller, partner) in [(a, b), (b, a)] {
            let record = &mut self.callers[caller.index()];
            record.status = status;
            record.interlocutor = Some(partner);
        }
    }

    /// Return both sides of a call to WAITING.
    ///
    /// The interlocutor fields keep pointing at the former partner.
    pub(crate) fn release(&mut self, a: CallerId, b: CallerId) {
        self.connect(a, b, CallerStatus::Waiting);
    }

    /// Check that every non-waiting caller is symmetrically paired with a
    /// partner in the same status
    pub fn verify_pairing(&self) -> std::result::Result<(), PairingViolation> {
        for caller in &self.callers {
            if caller.is_waiting() {
                continue;
            }

            let partner_id = caller.interlocutor.ok_or(PairingViolation::Unpaired {
                caller: caller.id,
                status: caller.status,
            })?;
            if partner_id == caller.id {
                return Err(PairingViolation::SelfPaired { caller: caller.id });
            }

            let partner = self.get(partner_id).ok_or(PairingViolation::UnknownPartner {
                caller: caller.id,
                partner: partner_id,
            })?;
            if partner.interlocutor != Some(caller.id) {
                return Err(PairingViolation::Asymmetric {
                    caller: caller.id,
                    partner: partner_id,
                    back: partner.interlocutor,
                });
            }
            if partner.status != caller.status {
                return Err(PairingViolation::StatusMismatch {
                    caller: caller.id,
                    status: caller.status,
                    partner: partner_id,
                    partner_status: partner.status,
                });
            }
        }
        Ok(())
    }

    /// Build a registry from explicit records (observers and tests)
    pub fn from_callers(callers: Vec<Caller>) -> Self {
        Self { callers }
    }
}
