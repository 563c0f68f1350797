//! The interface to the rollup contract deployed on L1.

mod abi;
pub use abi::IRollupContract;

pub use client::RollupContractClient;
mod client;

pub use contract::{PublicDataInfo, RollupContract, UpdateStateRequest};
mod contract;

pub use error::{ContractError, L1Error};
mod error;

pub use noop::NoopRollupContract;
mod noop;

pub use verifier::{DataProofVerifier, KzgDataProofVerifier};
mod verifier;
