//! Shared harness for the integration suites: a deployed engine, client
//! helpers doing what a wallet front end would do, and toy programs for
//! heterogeneous bundles and delegation checks.

#![allow(dead_code)]

use borsh::{BorshDeserialize, BorshSerialize};
use quorumsig::{
    group_address, proposal_address, Action, Address, Commitment, EngineError, EngineInstruction,
    Group, Instruction, InvocationContext, Ledger, LedgerError, Processor, Program, ProgramResult,
    Proposal, Transaction, GROUP_SEED,
};

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh ledger with the engine registered at a random address.
pub fn deploy() -> (Ledger, Address) {
    init_tracing();
    let mut ledger = Ledger::new();
    let engine = Address::new_unique();
    ledger.register_program(engine, Processor);
    (ledger, engine)
}

pub fn identities<const N: usize>() -> [Address; N] {
    std::array::from_fn(|_| Address::new_unique())
}

/// Probe for a name whose derived group address is unused, the way a
/// client would before submitting creation.
pub fn unused_group_name(ledger: &Ledger, engine: &Address) -> Vec<u8> {
    loop {
        let candidate = rand::random::<[u8; 16]>().to_vec();
        if ledger.account(&group_address(engine, &candidate)).is_none() {
            return candidate;
        }
    }
}

pub fn create_group_named(
    ledger: &mut Ledger,
    engine: Address,
    name: &[u8],
    members: &[Address],
    threshold: u64,
) -> Result<Address, LedgerError> {
    let payer = Address::new_unique();
    let group = group_address(&engine, name);
    let instruction = Instruction {
        program: engine,
        accounts: vec![payer, group],
        data: EngineInstruction::CreateGroup {
            name: name.to_vec(),
            members: members.to_vec(),
            threshold,
        }
        .encode(),
    };
    ledger.submit(&Transaction {
        signers: vec![payer],
        instructions: vec![instruction],
    })?;
    Ok(group)
}

pub fn create_group(
    ledger: &mut Ledger,
    engine: Address,
    members: &[Address],
    threshold: u64,
) -> Address {
    let name = unused_group_name(ledger, &engine);
    create_group_named(ledger, engine, &name, members, threshold).expect("group creation")
}

pub fn create_proposal(
    ledger: &mut Ledger,
    engine: Address,
    group: Address,
    proposer: Address,
    id: u64,
    actions: Vec<Action>,
) -> Result<Address, LedgerError> {
    let proposal = proposal_address(&engine, &group, id);
    let instruction = Instruction {
        program: engine,
        accounts: vec![proposer, group, proposal],
        data: EngineInstruction::CreateProposal { id, actions }.encode(),
    };
    ledger.submit(&Transaction {
        signers: vec![proposer],
        instructions: vec![instruction],
    })?;
    Ok(proposal)
}

pub fn approve(
    ledger: &mut Ledger,
    engine: Address,
    group: Address,
    proposal: Address,
    approver: Address,
) -> Result<Commitment, LedgerError> {
    let instruction = Instruction {
        program: engine,
        accounts: vec![approver, group, proposal],
        data: EngineInstruction::ApproveProposal.encode(),
    };
    ledger.submit(&Transaction {
        signers: vec![approver],
        instructions: vec![instruction],
    })
}

/// Submit execution with no signers at all; quorum is the only gate.
pub fn execute(
    ledger: &mut Ledger,
    engine: Address,
    group: Address,
    proposal: Address,
    action_refs: &[Address],
) -> Result<Commitment, LedgerError> {
    let mut accounts = vec![group, proposal];
    accounts.extend_from_slice(action_refs);
    let instruction = Instruction {
        program: engine,
        accounts,
        data: EngineInstruction::ExecuteProposal.encode(),
    };
    ledger.submit(&Transaction {
        signers: vec![],
        instructions: vec![instruction],
    })
}

/// An action invoking one of the engine's self-administrative operations
/// on `group`.
pub fn admin_action(engine: Address, group: Address, op: EngineInstruction) -> Action {
    Action {
        target: engine,
        accounts: vec![group],
        payload: op.encode(),
    }
}

pub fn read_group(ledger: &Ledger, group: &Address) -> Group {
    Group::try_from_slice(ledger.account(group).expect("group account")).expect("group layout")
}

pub fn read_proposal(ledger: &Ledger, proposal: &Address) -> Proposal {
    Proposal::try_from_slice(ledger.account(proposal).expect("proposal account"))
        .expect("proposal layout")
}

/// Unwrap the engine error inside a failed submission.
pub fn engine_err<T: std::fmt::Debug>(result: Result<T, LedgerError>) -> EngineError {
    match result {
        Err(LedgerError::Engine(error)) => error,
        Ok(value) => panic!("expected an engine error, got Ok({value:?})"),
        Err(other) => panic!("expected an engine error, got {other:?}"),
    }
}

/// Test program keeping a little-endian u64 per account.
pub struct Counter;

pub const COUNTER_CREATE: &[u8] = &[0];
pub const COUNTER_BUMP: &[u8] = &[1];
pub const COUNTER_FAIL: &[u8] = &[2];
pub const COUNTER_FAIL_CODE: u32 = 42;

impl Program for Counter {
    fn process(&self, ctx: &mut InvocationContext<'_, '_>, data: &[u8]) -> ProgramResult {
        let account = ctx.account(0)?;
        match data.first().copied() {
            Some(0) => ctx.create_account(account, 0u64.to_le_bytes().to_vec()),
            Some(1) => {
                let raw = ctx
                    .account_data(&account)
                    .ok_or(EngineError::AccountNotFound(account))?;
                let value = u64::from_le_bytes(
                    raw.try_into().map_err(|_| EngineError::InvalidAccountData)?,
                );
                ctx.set_account(account, (value + 1).to_le_bytes().to_vec());
                Ok(())
            }
            Some(2) => Err(LedgerError::Custom(COUNTER_FAIL_CODE)),
            _ => Err(EngineError::InvalidInstruction.into()),
        }
    }
}

/// Register a counter program and create one zeroed counter account.
pub fn setup_counter(ledger: &mut Ledger) -> (Address, Address) {
    let program = Address::new_unique();
    ledger.register_program(program, Counter);
    let account = Address::new_unique();
    ledger
        .submit(&Transaction {
            signers: vec![],
            instructions: vec![Instruction {
                program,
                accounts: vec![account],
                data: COUNTER_CREATE.to_vec(),
            }],
        })
        .expect("counter setup");
    (program, account)
}

pub fn read_counter(ledger: &Ledger, account: &Address) -> u64 {
    u64::from_le_bytes(
        ledger
            .account(account)
            .expect("counter account")
            .try_into()
            .expect("counter layout"),
    )
}

pub fn bump_counter_action(program: Address, account: Address) -> Action {
    Action {
        target: program,
        accounts: vec![account],
        payload: COUNTER_BUMP.to_vec(),
    }
}

/// Test program that forwards a borsh-encoded instruction through a plain
/// nested invocation, dropping any delegated authority on the floor.
pub struct Forwarder;

impl Program for Forwarder {
    fn process(&self, ctx: &mut InvocationContext<'_, '_>, data: &[u8]) -> ProgramResult {
        let inner =
            Instruction::try_from_slice(data).map_err(|_| EngineError::InvalidInstruction)?;
        ctx.invoke(&inner)
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
pub struct ImpersonateArgs {
    pub name: Vec<u8>,
    pub inner: Instruction,
}

/// Test program that tries to mint another program's authority by
/// replaying a group's seeds from its own address.
pub struct Impersonator;

impl Program for Impersonator {
    fn process(&self, ctx: &mut InvocationContext<'_, '_>, data: &[u8]) -> ProgramResult {
        let args =
            ImpersonateArgs::try_from_slice(data).map_err(|_| EngineError::InvalidInstruction)?;
        ctx.invoke_delegated(&args.inner, &[GROUP_SEED, args.name.as_slice()])
    }
}
