//! Block and transaction environment

use fugue_primitives::{Address, H256, U256};

/// Block environment information
#[derive(Clone, Debug)]
pub struct BlockContext {
    /// Block number
    pub number: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: u64,
    /// Block coinbase (miner/validator)
    pub coinbase: Address,
    /// Block prevrandao
    pub prevrandao: H256,
    /// Chain ID
    pub chain_id: u64,
    /// Base fee (EIP-1559)
    pub base_fee: U256,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            gas_limit: 30_000_000,
            coinbase: Address::ZERO,
            prevrandao: H256::ZERO,
            chain_id: 1,
            base_fee: U256::zero(),
        }
    }
}

/// Transaction environment information
#[derive(Clone, Debug, Default)]
pub struct TxContext {
    /// Transaction origin (original sender)
    pub origin: Address,
    /// Gas price
    pub gas_price: U256,
}

/// Complete execution environment
#[derive(Clone, Debug, Default)]
pub struct Environment {
    /// Block context
    pub block: BlockContext,
    /// Transaction context
    pub tx: TxContext,
}

impl Environment {
    /// Create new environment
    pub fn new(block: BlockContext, tx: TxContext) -> Self {
        Self { block, tx }
    }
}

/// Source of historical block hashes for BLOCKHASH
pub trait BlockHashes: Send + Sync {
    /// Hash of block `number`, if known
    fn block_hash(&self, number: u64) -> Option<H256>;
}

/// Hash BLOCKHASH yields for `requested` while executing block `current`:
/// zero unless it is one of the 256 preceding blocks.
pub fn lookup_block_hash(
    provider: Option<&dyn BlockHashes>,
    current: u64,
    requested: U256,
) -> H256 {
    if requested.bits() > 64 {
        return H256::ZERO;
    }
    let requested = requested.low_u64();
    if requested >= current || current - requested > 256 {
        return H256::ZERO;
    }
    provider
        .and_then(|p| p.block_hash(requested))
        .unwrap_or(H256::ZERO)
}
