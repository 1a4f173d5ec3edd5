use borsh::{BorshDeserialize, BorshSerialize};

use crate::{address::Address, state::Action};

/// Operations understood by the authorization engine.
///
/// Payloads are borsh-encoded. The accounts each operation expects are
/// listed per variant, in order; `[signer]` marks an account whose
/// authorization the engine checks.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum EngineInstruction {
    /// Create a new group account.
    /// Accounts:
    /// 0. `[signer]` payer
    /// 1. `[writable]` group, at `group_address(engine, name)`
    CreateGroup {
        /// Name seed; one group per name per engine deployment.
        name: Vec<u8>,
        /// Initial members, order preserved, no duplicates.
        members: Vec<Address>,
        /// Approvals required to execute, `1..=members.len()`.
        threshold: u64,
    },

    /// Create a proposal under a group.
    /// Accounts:
    /// 0. `[signer]` proposer, must be a group member
    /// 1. `[]` group
    /// 2. `[writable]` proposal, at `proposal_address(engine, group, id)`
    CreateProposal {
        /// Caller-chosen id, unused so far under this group.
        id: u64,
        /// Bundled actions, replayed in order at execution. May be empty.
        actions: Vec<Action>,
    },

    /// Approve an existing proposal.
    /// Accounts:
    /// 0. `[signer]` approver, must be a group member
    /// 1. `[]` group
    /// 2. `[writable]` proposal
    ApproveProposal,

    /// Execute a proposal once quorum is met. Any party may submit; no
    /// signature is checked.
    /// Accounts:
    /// 0. `[]` group
    /// 1. `[writable]` proposal
    /// 2... account references for the bundled actions, concatenated in
    ///      action order
    ExecuteProposal,

    /// Append a member. Runs only under the group's delegated authority.
    /// Accounts:
    /// 0. `[writable]` group
    AddMember { member: Address },

    /// Remove a member. Runs only under the group's delegated authority.
    /// Accounts:
    /// 0. `[writable]` group
    RemoveMember { member: Address },

    /// Change the quorum size. Runs only under the group's delegated
    /// authority.
    /// Accounts:
    /// 0. `[writable]` group
    UpdateThreshold { threshold: u64 },
}

impl EngineInstruction {
    /// Borsh-encode for embedding in a ledger instruction or in an action
    /// payload.
    pub fn encode(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("instruction encoding is infallible")
    }
}
