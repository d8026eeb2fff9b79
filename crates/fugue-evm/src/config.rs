//! Execution configuration and fork rules

use crate::error::ConfigError;
use crate::gas::cost;
use crate::opcode::Opcode;
use serde::{Deserialize, Serialize};

/// Fork-gated behaviour toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainRules {
    /// Code-store out-of-gas during creation is fatal
    pub homestead: bool,
    /// 63/64 gas retention on sub-calls
    pub eip150: bool,
    /// Empty-account pruning and nonce 1 for new contracts
    pub eip158: bool,
    /// RETURNDATA*, STATICCALL, REVERT
    pub byzantium: bool,
    /// Shifts, CREATE2, EXTCODEHASH
    pub constantinople: bool,
    /// CHAINID, SELFBALANCE and the SSTORE sentry
    pub istanbul: bool,
    /// BASEFEE; removes the SELFDESTRUCT refund
    pub london: bool,
    /// PUSH0
    pub shanghai: bool,
}

impl ChainRules {
    /// Every toggle off
    pub const fn frontier() -> Self {
        Self {
            homestead: false,
            eip150: false,
            eip158: false,
            byzantium: false,
            constantinople: false,
            istanbul: false,
            london: false,
            shanghai: false,
        }
    }

    /// Every toggle on
    pub const fn latest() -> Self {
        Self {
            homestead: true,
            eip150: true,
            eip158: true,
            byzantium: true,
            constantinople: true,
            istanbul: true,
            london: true,
            shanghai: true,
        }
    }

    /// Whether `op` exists under these rules
    pub fn is_enabled(&self, op: Opcode) -> bool {
        use Opcode::*;
        match op {
            DelegateCall => self.homestead,
            ReturnDataSize | ReturnDataCopy | StaticCall | Revert => self.byzantium,
            Shl | Shr | Sar | Create2 | ExtCodeHash => self.constantinople,
            ChainId | SelfBalance => self.istanbul,
            BaseFee => self.london,
            Push(0) => self.shanghai,
            _ => true,
        }
    }
}

impl Default for ChainRules {
    fn default() -> Self {
        Self::latest()
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Honour back-end selector bytes in stored code
    #[serde(default)]
    pub multi_backend: bool,
    /// Largest deployable code, in bytes
    #[serde(default = "default_max_code_size")]
    pub max_code_size: usize,
    /// Bound of each scratch pool
    #[serde(default = "default_scratch_capacity")]
    pub scratch_capacity: usize,
    /// Overwrite returned scratch values with a sentinel
    #[serde(default)]
    pub verify_scratch: bool,
    /// Fork toggles
    #[serde(default)]
    pub rules: ChainRules,
}

fn default_max_code_size() -> usize {
    cost::MAX_CODE_SIZE
}

fn default_scratch_capacity() -> usize {
    1024
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            multi_backend: false,
            max_code_size: default_max_code_size(),
            scratch_capacity: default_scratch_capacity(),
            verify_scratch: false,
            rules: ChainRules::default(),
        }
    }
}

impl VmConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the interpreter cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_code_size == 0 {
            return Err(ConfigError::Invalid("max_code_size must be positive".into()));
        }
        if self.scratch_capacity > cost::MAX_STACK_SIZE * 16 {
            return Err(ConfigError::Invalid(format!(
                "scratch_capacity {} exceeds {}",
                self.scratch_capacity,
                cost::MAX_STACK_SIZE * 16
            )));
        }
        Ok(())
    }
}
