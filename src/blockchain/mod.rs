//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Credentials (private keys, RPC URL)
//!     → wallet.rs (signers, named account book)
//!     → client.rs (RPC connection with timeouts and read failover)
//!     → transaction.rs (fill, sign, broadcast, confirm)
//!     → adapter.rs (ABI encoding, ChainClient for the orchestrator)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or the API-keyed RPC URL
//! - All RPC calls have configurable timeouts
//! - Confirmation waits have a hard deadline

pub mod adapter;
pub mod client;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use types::{BlockchainError, BlockchainResult, ChainId, NetworkConfig, Receipt};
pub use wallet::{AccountBook, Keyring, Wallet};
