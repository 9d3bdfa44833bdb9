//! Shared utilities for integration tests: an in-memory chain that runs the
//! token and ballot contracts, plus fixture loading.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::Function;
use alloy::primitives::{keccak256, Address, TxHash, B256, U256};
use async_trait::async_trait;

use ballot_deployer::artifacts::{Artifact, ArtifactDirectory, ArtifactSource};
use ballot_deployer::blockchain::{AccountBook, BlockchainError, BlockchainResult, Receipt};
use ballot_deployer::orchestrator::{ChainClient, Orchestrator};

pub const DEPLOYER: Address = Address::repeat_byte(0xd0);
pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);

pub fn accounts() -> AccountBook {
    AccountBook::new("deployer", DEPLOYER)
        .with("alice", ALICE)
        .with("bob", BOB)
}

pub fn fixture_artifacts() -> Arc<dyn ArtifactSource> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("artifacts");
    Arc::new(ArtifactDirectory::new(dir))
}

pub fn orchestrator(chain: MockChain) -> Orchestrator<MockChain> {
    Orchestrator::new(chain, fixture_artifacts(), accounts())
}

/// Everything the chain was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Deploy {
        artifact: String,
        args: Vec<DynSolValue>,
        tx_hash: TxHash,
    },
    Send {
        function: String,
        from: Address,
        tx_hash: TxHash,
    },
    Mined {
        tx_hash: TxHash,
        block: u64,
    },
    Call {
        function: String,
    },
    BlockNumber(u64),
}

#[derive(Debug, Clone, Default)]
struct Token {
    minter: Address,
    balances: HashMap<Address, U256>,
    delegates: HashMap<Address, Address>,
    /// Per delegatee: (block, votes) checkpoints in block order.
    checkpoints: HashMap<Address, Vec<(u64, U256)>>,
}

impl Token {
    fn balance(&self, who: Address) -> U256 {
        self.balances.get(&who).copied().unwrap_or_default()
    }

    fn votes(&self, who: Address) -> U256 {
        self.checkpoints
            .get(&who)
            .and_then(|c| c.last())
            .map(|(_, v)| *v)
            .unwrap_or_default()
    }

    fn past_votes(&self, who: Address, timepoint: u64, clock: u64) -> Result<U256, String> {
        if timepoint >= clock {
            return Err(format!(
                "execution reverted: ERC5805FutureLookup({}, {})",
                timepoint, clock
            ));
        }
        Ok(self
            .checkpoints
            .get(&who)
            .and_then(|c| c.iter().rev().find(|(b, _)| *b <= timepoint))
            .map(|(_, v)| *v)
            .unwrap_or_default())
    }

    fn move_votes(&mut self, from: Option<Address>, to: Option<Address>, amount: U256, block: u64) {
        if let Some(from) = from {
            let current = self.votes(from);
            self.write_checkpoint(from, current - amount, block);
        }
        if let Some(to) = to {
            let current = self.votes(to);
            self.write_checkpoint(to, current + amount, block);
        }
    }

    fn write_checkpoint(&mut self, who: Address, votes: U256, block: u64) {
        let list = self.checkpoints.entry(who).or_default();
        match list.last_mut() {
            Some((b, v)) if *b == block => *v = votes,
            _ => list.push((block, votes)),
        }
    }
}

#[derive(Debug, Clone)]
struct Ballot {
    proposals: Vec<(B256, U256)>,
    token: Address,
    target_block: u64,
    spent: HashMap<Address, U256>,
}

impl Ballot {
    fn winning(&self) -> usize {
        let mut best = 0;
        for (i, (_, count)) in self.proposals.iter().enumerate() {
            if *count > self.proposals[best].1 {
                best = i;
            }
        }
        best
    }
}

#[derive(Debug, Clone)]
enum Contract {
    Token(Token),
    Ballot(Ballot),
    Opaque,
}

#[derive(Debug, Clone)]
enum TxKind {
    Deploy {
        artifact: String,
        args: Vec<DynSolValue>,
        address: Address,
    },
    Call {
        to: Address,
        function: String,
        args: Vec<DynSolValue>,
    },
}

#[derive(Debug, Clone)]
struct PendingTx {
    from: Address,
    kind: TxKind,
}

#[derive(Debug, Default)]
struct Faults {
    reject_deploy: HashSet<String>,
    revert_deploy: HashSet<String>,
    no_address: HashSet<String>,
    stall_confirmations: bool,
    block_number_down: bool,
}

#[derive(Debug, Default)]
struct State {
    block: u64,
    tx_counter: u64,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, Contract>,
    pending: HashMap<TxHash, PendingTx>,
    receipts: HashMap<TxHash, Receipt>,
    events: Vec<Event>,
    faults: Faults,
}

/// In-memory chain. Transactions stay pending until someone waits for their
/// receipt; waiting mines exactly that transaction into the next block.
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<State>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::starting_at(100)
    }

    pub fn starting_at(block: u64) -> Self {
        let chain = Self::default();
        chain.lock().block = block;
        chain
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn reject_deploy(&self, artifact: &str) {
        self.lock().faults.reject_deploy.insert(artifact.to_string());
    }

    pub fn revert_deploy(&self, artifact: &str) {
        self.lock().faults.revert_deploy.insert(artifact.to_string());
    }

    pub fn omit_contract_address(&self, artifact: &str) {
        self.lock().faults.no_address.insert(artifact.to_string());
    }

    pub fn stall_confirmations(&self) {
        self.lock().faults.stall_confirmations = true;
    }

    pub fn fail_block_number(&self) {
        self.lock().faults.block_number_down = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// Transactions submitted so far (deployments and writes).
    pub fn transaction_count(&self) -> usize {
        self.lock().tx_counter as usize
    }

    pub fn block(&self) -> u64 {
        self.lock().block
    }

    pub fn balance_of(&self, token: Address, who: Address) -> U256 {
        match self.lock().contracts.get(&token) {
            Some(Contract::Token(t)) => t.balance(who),
            _ => U256::ZERO,
        }
    }

    pub fn deployed_artifacts(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Deploy { artifact, .. } => Some(artifact.clone()),
                _ => None,
            })
            .collect()
    }

    fn next_hash(state: &mut State) -> TxHash {
        state.tx_counter += 1;
        keccak256(state.tx_counter.to_be_bytes())
    }

    fn next_nonce(state: &mut State, from: Address) -> u64 {
        let nonce = state.nonces.entry(from).or_insert(0);
        let current = *nonce;
        *nonce += 1;
        current
    }
}

fn uint(value: &DynSolValue) -> Result<U256, String> {
    value
        .as_uint()
        .map(|(v, _)| v)
        .ok_or_else(|| format!("expected uint, got {:?}", value))
}

fn address(value: &DynSolValue) -> Result<Address, String> {
    value
        .as_address()
        .ok_or_else(|| format!("expected address, got {:?}", value))
}

fn word(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

/// Build contract state from constructor arguments.
fn construct(artifact: &str, from: Address, args: &[DynSolValue]) -> Result<Contract, String> {
    match artifact {
        "MyToken" => Ok(Contract::Token(Token {
            minter: from,
            ..Token::default()
        })),
        "TokenizedBallot" => {
            let names = match &args[0] {
                DynSolValue::Array(items) => items
                    .iter()
                    .map(|i| match i {
                        DynSolValue::FixedBytes(w, 32) => Ok((*w, U256::ZERO)),
                        other => Err(format!("bad proposal {:?}", other)),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                other => return Err(format!("bad proposals {:?}", other)),
            };
            Ok(Contract::Ballot(Ballot {
                proposals: names,
                token: address(&args[1])?,
                target_block: uint(&args[2])?.to::<u64>(),
                spent: HashMap::new(),
            }))
        }
        _ => Ok(Contract::Opaque),
    }
}

/// Apply a state-changing call at `block`. Errors are revert reasons.
fn execute_write(
    contracts: &mut HashMap<Address, Contract>,
    from: Address,
    to: Address,
    function: &str,
    args: &[DynSolValue],
    block: u64,
) -> Result<(), String> {
    let target = contracts
        .get(&to)
        .cloned()
        .ok_or_else(|| "execution reverted: no code at address".to_string())?;

    match (target, function) {
        (Contract::Token(mut token), "mint") => {
            if from != token.minter {
                return Err("execution reverted: AccessControlUnauthorizedAccount".into());
            }
            let (who, amount) = (address(&args[0])?, uint(&args[1])?);
            *token.balances.entry(who).or_default() += amount;
            let delegatee = token.delegates.get(&who).copied();
            token.move_votes(None, delegatee, amount, block);
            contracts.insert(to, Contract::Token(token));
        }
        (Contract::Token(mut token), "transfer") => {
            let (who, amount) = (address(&args[0])?, uint(&args[1])?);
            if token.balance(from) < amount {
                return Err("execution reverted: ERC20InsufficientBalance".into());
            }
            *token.balances.entry(from).or_default() -= amount;
            *token.balances.entry(who).or_default() += amount;
            let src = token.delegates.get(&from).copied();
            let dst = token.delegates.get(&who).copied();
            token.move_votes(src, dst, amount, block);
            contracts.insert(to, Contract::Token(token));
        }
        (Contract::Token(mut token), "delegate") => {
            let delegatee = address(&args[0])?;
            let old = token.delegates.insert(from, delegatee);
            let balance = token.balance(from);
            token.move_votes(old, Some(delegatee), balance, block);
            contracts.insert(to, Contract::Token(token));
        }
        (Contract::Ballot(mut ballot), "vote") => {
            let (proposal, amount) = (uint(&args[0])?.to::<usize>(), uint(&args[1])?);
            let power = match contracts.get(&ballot.token) {
                Some(Contract::Token(token)) => token.past_votes(from, ballot.target_block, block)?,
                _ => return Err("execution reverted: token missing".into()),
            };
            let spent = ballot.spent.get(&from).copied().unwrap_or_default();
            if power - spent < amount {
                return Err("execution reverted: TokenizedBallot: trying to vote more than allowed".into());
            }
            let entry = ballot
                .proposals
                .get_mut(proposal)
                .ok_or_else(|| "execution reverted: array out-of-bounds access".to_string())?;
            entry.1 += amount;
            ballot.spent.insert(from, spent + amount);
            contracts.insert(to, Contract::Ballot(ballot));
        }
        (_, other) => return Err(format!("execution reverted: unknown function {}", other)),
    }
    Ok(())
}

fn execute_read(
    contracts: &HashMap<Address, Contract>,
    to: Address,
    function: &str,
    args: &[DynSolValue],
    clock: u64,
) -> Result<Vec<DynSolValue>, String> {
    let target = contracts
        .get(&to)
        .ok_or_else(|| "no code at address".to_string())?;
    let values = match (target, function) {
        (Contract::Token(token), "balanceOf") => vec![word(token.balance(address(&args[0])?))],
        (Contract::Token(token), "getVotes") => vec![word(token.votes(address(&args[0])?))],
        (Contract::Token(token), "getPastVotes") => {
            let timepoint = uint(&args[1])?.to::<u64>();
            vec![word(token.past_votes(address(&args[0])?, timepoint, clock)?)]
        }
        (Contract::Token(token), "totalSupply") => {
            vec![word(token.balances.values().copied().sum())]
        }
        (Contract::Ballot(ballot), "proposals") => {
            let index = uint(&args[0])?.to::<usize>();
            let (name, count) = ballot
                .proposals
                .get(index)
                .ok_or_else(|| "execution reverted".to_string())?;
            vec![DynSolValue::FixedBytes(*name, 32), word(*count)]
        }
        (Contract::Ballot(ballot), "winningProposal") => vec![word(U256::from(ballot.winning()))],
        (Contract::Ballot(ballot), "winnerName") => {
            vec![DynSolValue::FixedBytes(ballot.proposals[ballot.winning()].0, 32)]
        }
        (Contract::Ballot(ballot), "targetBlockNumber") => vec![word(U256::from(ballot.target_block))],
        (Contract::Ballot(ballot), "tokenContract") => vec![DynSolValue::Address(ballot.token)],
        (_, other) => return Err(format!("unknown view {}", other)),
    };
    Ok(values)
}

#[async_trait]
impl ChainClient for MockChain {
    async fn deploy_contract(
        &self,
        from: Address,
        artifact: &Artifact,
        constructor_args: &[DynSolValue],
    ) -> BlockchainResult<TxHash> {
        let mut state = self.lock();
        if state.faults.reject_deploy.contains(&artifact.name) {
            return Err(BlockchainError::Rpc("insufficient funds for gas * price + value".into()));
        }
        let nonce = Self::next_nonce(&mut state, from);
        let tx_hash = Self::next_hash(&mut state);
        state.events.push(Event::Deploy {
            artifact: artifact.name.clone(),
            args: constructor_args.to_vec(),
            tx_hash,
        });
        state.pending.insert(
            tx_hash,
            PendingTx {
                from,
                kind: TxKind::Deploy {
                    artifact: artifact.name.clone(),
                    args: constructor_args.to_vec(),
                    address: from.create(nonce),
                },
            },
        );
        Ok(tx_hash)
    }

    async fn call(
        &self,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> BlockchainResult<Vec<DynSolValue>> {
        let mut state = self.lock();
        state.events.push(Event::Call {
            function: function.name.clone(),
        });
        let clock = state.block + 1;
        execute_read(&state.contracts, to, &function.name, args, clock).map_err(BlockchainError::Reverted)
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> BlockchainResult<TxHash> {
        let mut state = self.lock();
        // Simulate like eth_estimateGas: a call that would revert never gets a hash
        let mut scratch = state.contracts.clone();
        let next_block = state.block + 1;
        execute_write(&mut scratch, from, to, &function.name, args, next_block)
            .map_err(BlockchainError::Reverted)?;

        Self::next_nonce(&mut state, from);
        let tx_hash = Self::next_hash(&mut state);
        state.events.push(Event::Send {
            function: function.name.clone(),
            from,
            tx_hash,
        });
        state.pending.insert(
            tx_hash,
            PendingTx {
                from,
                kind: TxKind::Call {
                    to,
                    function: function.name.clone(),
                    args: args.to_vec(),
                },
            },
        );
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Receipt> {
        let mut state = self.lock();
        if let Some(receipt) = state.receipts.get(&tx_hash) {
            return Ok(receipt.clone());
        }
        if state.faults.stall_confirmations {
            return Err(BlockchainError::ConfirmationTimeout {
                tx_hash,
                waited_secs: 300,
            });
        }
        let pending = state
            .pending
            .remove(&tx_hash)
            .ok_or_else(|| BlockchainError::Rpc(format!("unknown transaction {}", tx_hash)))?;

        state.block += 1;
        let block = state.block;
        let mut receipt = Receipt {
            tx_hash,
            block_number: Some(block),
            contract_address: None,
            success: true,
            gas_used: 50_000,
        };

        match pending.kind {
            TxKind::Deploy {
                artifact,
                args,
                address,
            } => {
                if state.faults.revert_deploy.contains(&artifact) {
                    receipt.success = false;
                } else {
                    match construct(&artifact, pending.from, &args) {
                        Ok(contract) => {
                            state.contracts.insert(address, contract);
                            if !state.faults.no_address.contains(&artifact) {
                                receipt.contract_address = Some(address);
                            }
                        }
                        Err(_) => receipt.success = false,
                    }
                }
            }
            TxKind::Call { to, function, args } => {
                let from = pending.from;
                if execute_write(&mut state.contracts, from, to, &function, &args, block).is_err() {
                    receipt.success = false;
                }
            }
        }

        state.events.push(Event::Mined { tx_hash, block });
        state.receipts.insert(tx_hash, receipt.clone());
        Ok(receipt)
    }

    async fn get_block_number(&self) -> BlockchainResult<u64> {
        let mut state = self.lock();
        if state.faults.block_number_down {
            return Err(BlockchainError::Rpc("connection refused".into()));
        }
        let block = state.block;
        state.events.push(Event::BlockNumber(block));
        Ok(block)
    }
}
