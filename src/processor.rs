use borsh::BorshDeserialize;
use tracing::debug;

use crate::{
    address::{group_address, proposal_address, Address, GROUP_SEED},
    error::EngineError,
    instruction::EngineInstruction,
    ledger::{Instruction, InvocationContext, Program, ProgramResult},
    state::{Action, Group, Proposal},
};

/// The authorization engine. Register it on a [`crate::Ledger`] to deploy;
/// group and proposal accounts live in the derivation namespace of the
/// address it is registered under.
pub struct Processor;

impl Program for Processor {
    fn process(&self, ctx: &mut InvocationContext<'_, '_>, data: &[u8]) -> ProgramResult {
        let instruction = EngineInstruction::try_from_slice(data)
            .map_err(|_| EngineError::InvalidInstruction)?;

        match instruction {
            EngineInstruction::CreateGroup {
                name,
                members,
                threshold,
            } => Self::process_create_group(ctx, name, members, threshold),
            EngineInstruction::CreateProposal { id, actions } => {
                Self::process_create_proposal(ctx, id, actions)
            }
            EngineInstruction::ApproveProposal => Self::process_approve(ctx),
            EngineInstruction::ExecuteProposal => Self::process_execute(ctx),
            EngineInstruction::AddMember { member } => Self::process_add_member(ctx, member),
            EngineInstruction::RemoveMember { member } => Self::process_remove_member(ctx, member),
            EngineInstruction::UpdateThreshold { threshold } => {
                Self::process_update_threshold(ctx, threshold)
            }
        }
    }
}

impl Processor {
    fn process_create_group(
        ctx: &mut InvocationContext<'_, '_>,
        name: Vec<u8>,
        members: Vec<Address>,
        threshold: u64,
    ) -> ProgramResult {
        let payer = ctx.account(0)?;
        let group_account = ctx.account(1)?;

        if !ctx.is_signer(&payer) {
            return Err(EngineError::MissingSignature.into());
        }
        let expected = group_address(&ctx.program_id(), &name);
        if group_account != expected {
            return Err(EngineError::AddressMismatch {
                expected,
                found: group_account,
            }
            .into());
        }

        let group = Group::new(name, members, threshold)?;
        ctx.create_account(group_account, borsh::to_vec(&group)?)?;
        debug!(
            group = %group_account,
            members = group.members.len(),
            threshold = group.threshold,
            "group created"
        );
        Ok(())
    }

    fn process_create_proposal(
        ctx: &mut InvocationContext<'_, '_>,
        id: u64,
        actions: Vec<Action>,
    ) -> ProgramResult {
        let proposer = ctx.account(0)?;
        let group_account = ctx.account(1)?;
        let proposal_account = ctx.account(2)?;

        if !ctx.is_signer(&proposer) {
            return Err(EngineError::MissingSignature.into());
        }
        let group = load_group(ctx, group_account)?;
        group.check_member(&proposer)?;

        let expected = proposal_address(&ctx.program_id(), &group_account, id);
        if proposal_account != expected {
            return Err(EngineError::AddressMismatch {
                expected,
                found: proposal_account,
            }
            .into());
        }

        let proposal = Proposal::new(id, actions);
        ctx.create_account(proposal_account, borsh::to_vec(&proposal)?)?;
        debug!(
            proposal = %proposal_account,
            id,
            actions = proposal.actions.len(),
            "proposal created"
        );
        Ok(())
    }

    fn process_approve(ctx: &mut InvocationContext<'_, '_>) -> ProgramResult {
        let approver = ctx.account(0)?;
        let group_account = ctx.account(1)?;
        let proposal_account = ctx.account(2)?;

        if !ctx.is_signer(&approver) {
            return Err(EngineError::MissingSignature.into());
        }
        // membership is judged against the group as it stands right now;
        // execution will not revisit recorded approvals
        let group = load_group(ctx, group_account)?;
        group.check_member(&approver)?;

        let mut proposal = load_proposal(ctx, proposal_account, group_account)?;
        proposal.approve(approver)?;
        ctx.set_account(proposal_account, borsh::to_vec(&proposal)?);
        debug!(
            proposal = %proposal_account,
            approvals = proposal.approvers.len(),
            threshold = group.threshold,
            "approval recorded"
        );
        Ok(())
    }

    fn process_execute(ctx: &mut InvocationContext<'_, '_>) -> ProgramResult {
        let group_account = ctx.account(0)?;
        let proposal_account = ctx.account(1)?;

        let group = load_group(ctx, group_account)?;
        let mut proposal = load_proposal(ctx, proposal_account, group_account)?;

        proposal.check_executed()?;
        proposal.check_quorum(&group)?;

        // Stage the executed flag before replaying anything. The whole
        // transaction shares one overlay, so a failing action discards the
        // flag along with every other staged write, and a reentrant
        // execution of this proposal sees it immediately.
        proposal.executed = true;
        ctx.set_account(proposal_account, borsh::to_vec(&proposal)?);

        let supplied = ctx.accounts()[2..].to_vec();
        let mut cursor = 0usize;
        for (index, action) in proposal.actions.iter().enumerate() {
            let needed = action.accounts.len();
            let refs = supplied
                .get(cursor..cursor + needed)
                .ok_or(EngineError::ActionAccountMismatch)?;
            if refs != action.accounts.as_slice() {
                return Err(EngineError::ActionAccountMismatch.into());
            }
            cursor += needed;

            debug!(
                proposal = %proposal_account,
                action = index,
                target = %action.target,
                "replaying action"
            );
            let instruction = Instruction {
                program: action.target,
                accounts: action.accounts.clone(),
                data: action.payload.clone(),
            };
            ctx.invoke_delegated(&instruction, &[GROUP_SEED, group.name.as_slice()])?;
        }
        debug!(proposal = %proposal_account, "proposal executed");
        Ok(())
    }

    fn process_add_member(ctx: &mut InvocationContext<'_, '_>, member: Address) -> ProgramResult {
        let group_account = ctx.account(0)?;
        require_group_authority(ctx, group_account)?;

        let mut group = load_group(ctx, group_account)?;
        group.add_member(member)?;
        ctx.set_account(group_account, borsh::to_vec(&group)?);
        debug!(group = %group_account, member = %member, "member added");
        Ok(())
    }

    fn process_remove_member(
        ctx: &mut InvocationContext<'_, '_>,
        member: Address,
    ) -> ProgramResult {
        let group_account = ctx.account(0)?;
        require_group_authority(ctx, group_account)?;

        let mut group = load_group(ctx, group_account)?;
        group.remove_member(&member)?;
        ctx.set_account(group_account, borsh::to_vec(&group)?);
        debug!(group = %group_account, member = %member, "member removed");
        Ok(())
    }

    fn process_update_threshold(
        ctx: &mut InvocationContext<'_, '_>,
        threshold: u64,
    ) -> ProgramResult {
        let group_account = ctx.account(0)?;
        require_group_authority(ctx, group_account)?;

        let mut group = load_group(ctx, group_account)?;
        group.set_threshold(threshold)?;
        ctx.set_account(group_account, borsh::to_vec(&group)?);
        debug!(group = %group_account, threshold, "threshold updated");
        Ok(())
    }
}

/// Self-administrative operations run only under the group's own delegated
/// authority. Transaction signers never satisfy this, whoever they are; the
/// only path to such an authority is the engine's own execution replay.
fn require_group_authority(
    ctx: &InvocationContext<'_, '_>,
    group_account: Address,
) -> Result<(), EngineError> {
    if ctx.delegated_authority() != Some(group_account) {
        return Err(EngineError::MissingAuthority);
    }
    Ok(())
}

fn load_group(ctx: &InvocationContext<'_, '_>, address: Address) -> Result<Group, EngineError> {
    let data = ctx
        .account_data(&address)
        .ok_or(EngineError::AccountNotFound(address))?;
    let group = Group::try_from_slice(data).map_err(|_| EngineError::InvalidAccountData)?;
    let expected = group_address(&ctx.program_id(), &group.name);
    if expected != address {
        return Err(EngineError::AddressMismatch {
            expected,
            found: address,
        });
    }
    Ok(group)
}

fn load_proposal(
    ctx: &InvocationContext<'_, '_>,
    address: Address,
    group_account: Address,
) -> Result<Proposal, EngineError> {
    let data = ctx
        .account_data(&address)
        .ok_or(EngineError::AccountNotFound(address))?;
    let proposal = Proposal::try_from_slice(data).map_err(|_| EngineError::InvalidAccountData)?;
    // a proposal account is pinned to the group its address was derived from
    let expected = proposal_address(&ctx.program_id(), &group_account, proposal.id);
    if expected != address {
        return Err(EngineError::AddressMismatch {
            expected,
            found: address,
        });
    }
    Ok(proposal)
}
