use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

/// Namespace seed for group accounts.
pub const GROUP_SEED: &[u8] = b"group";
/// Namespace seed for proposal accounts.
pub const PROPOSAL_SEED: &[u8] = b"proposal";

/// Domain constant mixed into every derivation.
const DERIVE_DOMAIN: &[u8] = b"quorumsig/derive/v1";

/// A 32-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct Address([u8; 32]);

impl Address {
    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// A fresh address backed by OS entropy, for member identities, program
    /// registration, and throwaway signers.
    pub fn new_unique() -> Self {
        Self(rand::random())
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Derive a deterministic address from seed components under `program`.
///
/// The same (program, seeds) always yield the same address; any change to
/// the program, a component, or the component boundaries yields a different
/// one. Components are length-framed before hashing, so `["ab", "c"]` and
/// `["a", "bc"]` do not collide. Derivation is a pure function: any client
/// can recompute an address without talking to the program that owns it.
pub fn derive_address(program: &Address, seeds: &[&[u8]]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(DERIVE_DOMAIN);
    hasher.update(program.as_ref());
    for seed in seeds {
        hasher.update((seed.len() as u64).to_le_bytes());
        hasher.update(seed);
    }
    Address(hasher.finalize().into())
}

/// Canonical address of the group account named `name`.
pub fn group_address(program: &Address, name: &[u8]) -> Address {
    derive_address(program, &[GROUP_SEED, name])
}

/// Canonical address of proposal `id` under `group`.
pub fn proposal_address(program: &Address, group: &Address, id: u64) -> Address {
    derive_address(program, &[PROPOSAL_SEED, group.as_ref(), &id.to_le_bytes()])
}
