use borsh::{BorshDeserialize, BorshSerialize};

use crate::{address::Address, error::EngineError};

/// One bundled operation carried by a proposal: an opaque instruction for
/// `target` together with the account references it touches.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Program the action is dispatched to.
    pub target: Address,
    /// Accounts the action touches, in the order the target expects them.
    /// Execution validates the caller-supplied references against this list.
    pub accounts: Vec<Address>,
    /// Opaque instruction payload for the target program.
    pub payload: Vec<u8>,
}

/// Membership and quorum configuration for one authorization domain.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Name seed the group account's address is derived from.
    pub name: Vec<u8>,
    /// Member identities, insertion-ordered, no duplicates.
    pub members: Vec<Address>,
    /// Approvals required to execute a proposal, `1..=members.len()`.
    pub threshold: u64,
}

impl Group {
    /// Validate and assemble a new group.
    pub fn new(name: Vec<u8>, members: Vec<Address>, threshold: u64) -> Result<Self, EngineError> {
        let mut group = Group {
            name,
            members: Vec::with_capacity(members.len()),
            threshold: 0,
        };
        for member in members {
            if group.is_member(&member) {
                return Err(EngineError::DuplicateMember);
            }
            group.members.push(member);
        }
        if group.members.is_empty() {
            return Err(EngineError::NoMembers);
        }
        group.set_threshold(threshold)?;
        Ok(group)
    }

    pub fn is_member(&self, member: &Address) -> bool {
        self.members.contains(member)
    }

    pub fn check_member(&self, member: &Address) -> Result<(), EngineError> {
        if !self.is_member(member) {
            return Err(EngineError::NotAMember);
        }
        Ok(())
    }

    pub fn add_member(&mut self, member: Address) -> Result<(), EngineError> {
        if self.is_member(&member) {
            return Err(EngineError::AlreadyMember);
        }
        self.members.push(member);
        Ok(())
    }

    /// Remove a member. Fails if the member is absent, if removal would
    /// leave the threshold unsatisfiable, or if it would empty the group.
    pub fn remove_member(&mut self, member: &Address) -> Result<(), EngineError> {
        self.check_member(member)?;
        let remaining = self.members.len() as u64 - 1;
        if remaining == 0 {
            return Err(EngineError::NoMembers);
        }
        if self.threshold > remaining {
            return Err(EngineError::ThresholdTooHigh);
        }
        self.members.retain(|m| m != member);
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: u64) -> Result<(), EngineError> {
        if threshold > self.members.len() as u64 {
            return Err(EngineError::ThresholdTooHigh);
        }
        if threshold < 1 {
            return Err(EngineError::ThresholdTooLow);
        }
        self.threshold = threshold;
        Ok(())
    }
}

/// A pending or executed bundle of actions awaiting quorum.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Caller-chosen id the proposal account's address is derived from.
    pub id: u64,
    /// Actions replayed in order at execution. May be empty.
    pub actions: Vec<Action>,
    /// Approvals in first-come order.
    pub approvers: Vec<Address>,
    pub executed: bool,
}

impl Proposal {
    pub fn new(id: u64, actions: Vec<Action>) -> Self {
        Proposal {
            id,
            actions,
            approvers: Vec::new(),
            executed: false,
        }
    }

    /// Record an approval. Approvals are append-only; a second approval by
    /// the same identity is rejected.
    pub fn approve(&mut self, approver: Address) -> Result<(), EngineError> {
        if self.approvers.contains(&approver) {
            return Err(EngineError::AlreadyApproved);
        }
        self.approvers.push(approver);
        Ok(())
    }

    pub fn check_executed(&self) -> Result<(), EngineError> {
        if self.executed {
            return Err(EngineError::AlreadyExecuted);
        }
        Ok(())
    }

    pub fn check_quorum(&self, group: &Group) -> Result<(), EngineError> {
        if (self.approvers.len() as u64) < group.threshold {
            return Err(EngineError::NotEnoughApprovals);
        }
        Ok(())
    }
}
