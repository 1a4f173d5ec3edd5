//! Minimal in-memory ledger the engine runs on.
//!
//! The ledger provides exactly the two operations clients need: submitting a
//! signed transaction and reading committed account state by address. Every
//! transaction executes against a staged overlay of the account map; the
//! overlay commits only if all of its instructions and all of their nested
//! invocations succeed. That commit rule is what makes multi-action
//! execution all-or-nothing.
//!
//! Programs invoke each other through [`InvocationContext`]. A plain
//! [`InvocationContext::invoke`] passes no authorization downward.
//! [`InvocationContext::invoke_delegated`] attaches a delegated authority to
//! the inner frame, derived from the calling program's own address, so a
//! program can only ever delegate authorities living in its own derivation
//! namespace.

use std::collections::BTreeMap;
use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    address::{derive_address, Address},
    error::EngineError,
};

/// Nested invocation ceiling. A transaction's top-level instructions run at
/// depth zero.
pub const MAX_INVOKE_DEPTH: u8 = 5;

/// Transaction-level failures. Engine errors bubble up through
/// [`LedgerError::Engine`]; other programs surface structured codes via
/// [`LedgerError::Custom`].
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("no program registered at {0}")]
    UnknownProgram(Address),
    #[error("account already exists at {0}")]
    AccountAlreadyExists(Address),
    #[error("invocation depth limit exceeded")]
    CallDepthExceeded,
    #[error("account serialization failed: {0}")]
    Serialization(#[from] std::io::Error),
    #[error("program error: {0}")]
    Custom(u32),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// One program invocation: the target program, the accounts it may touch,
/// and an opaque payload the target decodes itself.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program: Address,
    pub accounts: Vec<Address>,
    pub data: Vec<u8>,
}

/// A signed batch of instructions, applied atomically and in order.
///
/// `signers` is the set of identities whose signatures the transport has
/// already verified; key handling itself is outside the ledger.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signers: Vec<Address>,
    pub instructions: Vec<Instruction>,
}

/// Receipt for a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    /// Position in the ledger's total order, starting at 1.
    pub sequence: u64,
}

pub type ProgramResult = Result<(), LedgerError>;

/// A program registered on the ledger.
pub trait Program {
    fn process(&self, ctx: &mut InvocationContext<'_, '_>, data: &[u8]) -> ProgramResult;
}

/// Staged view of the account map for one transaction. Reads fall through
/// to the committed base; writes land in `staged` until commit.
struct Overlay<'l> {
    base: &'l BTreeMap<Address, Vec<u8>>,
    staged: BTreeMap<Address, Vec<u8>>,
}

impl<'l> Overlay<'l> {
    fn new(base: &'l BTreeMap<Address, Vec<u8>>) -> Self {
        Overlay {
            base,
            staged: BTreeMap::new(),
        }
    }

    fn get(&self, address: &Address) -> Option<&[u8]> {
        self.staged
            .get(address)
            .or_else(|| self.base.get(address))
            .map(Vec::as_slice)
    }

    fn contains(&self, address: &Address) -> bool {
        self.staged.contains_key(address) || self.base.contains_key(address)
    }

    fn set(&mut self, address: Address, data: Vec<u8>) {
        self.staged.insert(address, data);
    }

    fn into_staged(self) -> BTreeMap<Address, Vec<u8>> {
        self.staged
    }
}

/// Per-transaction execution state: the program registry, the staged
/// account view, and the transport-verified signer set.
struct Session<'l> {
    programs: &'l BTreeMap<Address, Arc<dyn Program>>,
    overlay: Overlay<'l>,
    signers: &'l [Address],
}

impl<'l> Session<'l> {
    fn dispatch(
        &mut self,
        instruction: &Instruction,
        authority: Option<Address>,
        depth: u8,
    ) -> ProgramResult {
        if depth >= MAX_INVOKE_DEPTH {
            return Err(LedgerError::CallDepthExceeded);
        }
        let program = self
            .programs
            .get(&instruction.program)
            .cloned()
            .ok_or(LedgerError::UnknownProgram(instruction.program))?;
        let mut ctx = InvocationContext {
            session: self,
            instruction,
            authority,
            depth,
        };
        program.process(&mut ctx, &instruction.data)
    }
}

/// Execution context handed to a program for one invocation frame.
pub struct InvocationContext<'a, 'l> {
    session: &'a mut Session<'l>,
    instruction: &'a Instruction,
    authority: Option<Address>,
    depth: u8,
}

impl InvocationContext<'_, '_> {
    /// Address the current program is registered under.
    pub fn program_id(&self) -> Address {
        self.instruction.program
    }

    /// Accounts referenced by the current instruction.
    pub fn accounts(&self) -> &[Address] {
        &self.instruction.accounts
    }

    /// Positional account access.
    pub fn account(&self, index: usize) -> Result<Address, EngineError> {
        self.instruction
            .accounts
            .get(index)
            .copied()
            .ok_or(EngineError::NotEnoughAccounts)
    }

    /// Whether `address` authorized this frame: a transaction signer at the
    /// top level, or the frame's delegated authority anywhere.
    ///
    /// Transaction signers do not reach nested frames. A program that wants
    /// an inner invocation to carry authority must delegate it explicitly.
    pub fn is_signer(&self, address: &Address) -> bool {
        self.authority == Some(*address)
            || (self.depth == 0 && self.session.signers.contains(address))
    }

    /// The delegated authority attached to this frame, if any. Top-level
    /// frames never carry one; nested frames carry one only when the caller
    /// invoked with its own derivation seeds.
    pub fn delegated_authority(&self) -> Option<Address> {
        self.authority
    }

    /// Current account state, staged writes included.
    pub fn account_data(&self, address: &Address) -> Option<&[u8]> {
        self.session.overlay.get(address)
    }

    /// Allocate a new account. Fails if anything already lives at
    /// `address`, committed or staged earlier in this transaction.
    pub fn create_account(&mut self, address: Address, data: Vec<u8>) -> ProgramResult {
        if self.session.overlay.contains(&address) {
            return Err(LedgerError::AccountAlreadyExists(address));
        }
        self.session.overlay.set(address, data);
        Ok(())
    }

    /// Stage new state for an account.
    pub fn set_account(&mut self, address: Address, data: Vec<u8>) {
        self.session.overlay.set(address, data);
    }

    /// Plain nested invocation. The inner frame carries no signers and no
    /// authority.
    pub fn invoke(&mut self, instruction: &Instruction) -> ProgramResult {
        self.session.dispatch(instruction, None, self.depth + 1)
    }

    /// Nested invocation under a delegated authority derived from the
    /// calling program's address and `seeds`. Another program presenting
    /// the same seeds derives a different authority, so delegations cannot
    /// be forged across programs.
    pub fn invoke_delegated(&mut self, instruction: &Instruction, seeds: &[&[u8]]) -> ProgramResult {
        let authority = derive_address(&self.program_id(), seeds);
        self.session.dispatch(instruction, Some(authority), self.depth + 1)
    }
}

/// Single-node, in-memory ledger: an account map, a program registry, and a
/// commit counter providing the total order.
#[derive(Default)]
pub struct Ledger {
    accounts: BTreeMap<Address, Vec<u8>>,
    programs: BTreeMap<Address, Arc<dyn Program>>,
    sequence: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program under `address`. A later registration replaces an
    /// earlier one.
    pub fn register_program(&mut self, address: Address, program: impl Program + 'static) {
        self.programs.insert(address, Arc::new(program));
    }

    /// Read committed account state. Staged writes of in-flight
    /// transactions are never visible here.
    pub fn account(&self, address: &Address) -> Option<&[u8]> {
        self.accounts.get(address).map(Vec::as_slice)
    }

    /// Apply a transaction atomically: its instructions run in order
    /// against a staged overlay, and the overlay commits only if every one
    /// of them succeeds.
    pub fn submit(&mut self, transaction: &Transaction) -> Result<Commitment, LedgerError> {
        let mut session = Session {
            programs: &self.programs,
            overlay: Overlay::new(&self.accounts),
            signers: transaction.signers.as_slice(),
        };
        let outcome = transaction
            .instructions
            .iter()
            .try_for_each(|instruction| session.dispatch(instruction, None, 0));
        match outcome {
            Ok(()) => {
                let staged = session.overlay.into_staged();
                self.accounts.extend(staged);
                self.sequence += 1;
                debug!(
                    sequence = self.sequence,
                    instructions = transaction.instructions.len(),
                    "transaction committed"
                );
                Ok(Commitment {
                    sequence: self.sequence,
                })
            }
            Err(error) => {
                debug!(%error, "transaction aborted");
                Err(error)
            }
        }
    }
}
