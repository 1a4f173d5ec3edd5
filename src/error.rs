use thiserror::Error;

use crate::address::Address;

/// Errors raised by the authorization engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    // membership
    #[error("not a member of this group")]
    NotAMember,
    #[error("already a member of this group")]
    AlreadyMember,
    #[error("duplicate member in initial member list")]
    DuplicateMember,
    #[error("a group must have at least one member")]
    NoMembers,

    // quorum
    #[error("not enough approvals")]
    NotEnoughApprovals,

    // proposal lifecycle
    #[error("proposal already executed")]
    AlreadyExecuted,
    #[error("already approved this proposal")]
    AlreadyApproved,

    // threshold bounds
    #[error("threshold exceeds member count")]
    ThresholdTooHigh,
    #[error("threshold must be at least 1")]
    ThresholdTooLow,

    // authorization
    #[error("operation requires the group's delegated authority")]
    MissingAuthority,
    #[error("required signature is missing")]
    MissingSignature,

    // account plumbing
    #[error("invalid instruction payload")]
    InvalidInstruction,
    #[error("instruction references too few accounts")]
    NotEnoughAccounts,
    #[error("account not found: {0}")]
    AccountNotFound(Address),
    #[error("account data did not deserialize")]
    InvalidAccountData,
    #[error("account is not at its derived address (expected {expected}, found {found})")]
    AddressMismatch { expected: Address, found: Address },
    #[error("supplied account references do not match the action's account list")]
    ActionAccountMismatch,
}
