//! Multi-party authorization engine for a programmable account ledger.
//!
//! A [`Group`] of members collectively controls a shared authority. Any
//! privileged action is bundled into a [`Proposal`], approved by at least
//! `threshold` members, and then executed atomically: the engine replays
//! the bundled actions under the group's own delegated authority, so they
//! run as the group rather than as any individual signer. A bundle either
//! applies in full or leaves no trace.
//!
//! The engine itself is a program ([`Processor`]) registered on a minimal
//! in-memory [`Ledger`]. Group and proposal accounts live at addresses
//! derived from stable seeds ([`group_address`], [`proposal_address`]), so
//! clients compute them without asking the engine.
//!
//! Self-administrative operations, member changes and threshold updates,
//! only run inside an executing proposal: they require the group's own
//! address as delegated authority, which the ledger mints exclusively for
//! the owning program via [`InvocationContext::invoke_delegated`]. Direct
//! calls fail with [`EngineError::MissingAuthority`] no matter who signed
//! the transaction.

pub mod address;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod processor;
pub mod state;


pub use address::{
    derive_address, group_address, proposal_address, Address, GROUP_SEED, PROPOSAL_SEED,
};
pub use error::EngineError;
pub use instruction::EngineInstruction;
pub use ledger::{
    Commitment, Instruction, InvocationContext, Ledger, LedgerError, Program, ProgramResult,
    Transaction, MAX_INVOKE_DEPTH,
};
pub use processor::Processor;
pub use state::{Action, Group, Proposal};
