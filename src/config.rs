// This file is part of QUERCIA.
//
// Copyright (C) 2021 Affidaty Spa.
//
// QUERCIA is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// QUERCIA is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with QUERCIA. If not, see <https://www.gnu.org/licenses/>.

//! Chain parameters loaded from a JSON document.
//!
//! The whole document is parsed and checked once at startup, a rejected
//! config is a fatal condition. After a successful load every accessor is
//! total, feature trigger lookups included.

use crate::{Error, ErrorKind, Result};
use std::collections::BTreeMap;

/// Features activated at a configured height or timestamp.
///
/// Every trigger shall have an entry in the config document, even when the
/// feature is active since genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureTrigger {
    MessageHeight,
    AtHeight,
    AssetsTimestamp,
    VotingTimestamp,
    ArbitraryTimestamp,
    PowfixTimestamp,
    V2Timestamp,
    NewAssetPricingTimestamp,
}

impl FeatureTrigger {
    pub const ALL: [FeatureTrigger; 8] = [
        FeatureTrigger::MessageHeight,
        FeatureTrigger::AtHeight,
        FeatureTrigger::AssetsTimestamp,
        FeatureTrigger::VotingTimestamp,
        FeatureTrigger::ArbitraryTimestamp,
        FeatureTrigger::PowfixTimestamp,
        FeatureTrigger::V2Timestamp,
        FeatureTrigger::NewAssetPricingTimestamp,
    ];

    /// Key of the trigger within the config document.
    pub fn name(self) -> &'static str {
        match self {
            FeatureTrigger::MessageHeight => "messageHeight",
            FeatureTrigger::AtHeight => "atHeight",
            FeatureTrigger::AssetsTimestamp => "assetsTimestamp",
            FeatureTrigger::VotingTimestamp => "votingTimestamp",
            FeatureTrigger::ArbitraryTimestamp => "arbitraryTimestamp",
            FeatureTrigger::PowfixTimestamp => "powfixTimestamp",
            FeatureTrigger::V2Timestamp => "v2Timestamp",
            FeatureTrigger::NewAssetPricingTimestamp => "newAssetPricingTimestamp",
        }
    }
}

/// Block reward paid to the generator starting from a given height.
#[derive(Debug, Clone, Deserialize)]
pub struct RewardByHeight {
    pub height: u64,
    pub reward: i64,
}

/// Forging rights tier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgingTier {
    /// Minimum number of generated blocks to enter the tier.
    pub min_blocks: u64,
    /// Maximum number of other accounts that can be enabled to forge.
    pub max_sub_accounts: u32,
}

/// Initial coin allocation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenesisAllocation {
    pub recipient: String,
    pub amount: i64,
}

/// Genesis block construction parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisInfo {
    /// Genesis block timestamp, milliseconds since the epoch.
    pub timestamp: u64,
    /// Generating balance declared by the genesis block.
    pub generating_balance: i64,
    /// Initial coin allocations, one genesis transaction each.
    pub allocations: Vec<GenesisAllocation>,
}

/// Chain parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Maximum coin supply.
    pub max_balance: i64,
    /// Fee for one fee unit worth of transaction bytes.
    pub unit_fee: i64,
    /// Number of transaction bytes covered by one fee unit.
    pub max_bytes_per_unit_fee: u64,
    /// Number of blocks between generating balance re-declarations.
    pub block_difficulty_interval: u64,
    /// Minimum target time between blocks, in seconds.
    pub min_block_time: u64,
    /// Maximum target time between blocks, in seconds.
    pub max_block_time: u64,
    /// Maximum acceptable timestamp disagreement, in milliseconds.
    pub block_timestamp_margin: u64,
    /// Activation point of each chain feature.
    pub feature_triggers: BTreeMap<String, u64>,
    /// Block rewards by block height.
    pub rewards_by_height: Vec<RewardByHeight>,
    /// Forging right tiers.
    pub forging_tiers: Vec<ForgingTier>,
    /// Genesis block parameters.
    pub genesis_info: GenesisInfo,
}

impl ChainConfig {
    /// Parse and validate a config document.
    ///
    /// # Errors
    ///
    /// Returns a `BadConfig` error kind when the document cannot be parsed
    /// or one of the validation checks fails.
    pub fn from_json(json: &str) -> Result<ChainConfig> {
        let config: ChainConfig = serde_json::from_str(json)
            .map_err(|err| Error::new_ext(ErrorKind::BadConfig, err))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_balance <= 0 {
            return Err(bad_config("maxBalance shall be positive"));
        }
        if self.unit_fee <= 0 {
            return Err(bad_config("unitFee shall be positive"));
        }
        if self.max_bytes_per_unit_fee == 0 {
            return Err(bad_config("maxBytesPerUnitFee shall not be zero"));
        }
        if self.block_difficulty_interval == 0 {
            return Err(bad_config("blockDifficultyInterval shall not be zero"));
        }
        if self.min_block_time == 0 || self.min_block_time > self.max_block_time {
            return Err(bad_config("bad block time window"));
        }
        for trigger in FeatureTrigger::ALL {
            if !self.feature_triggers.contains_key(trigger.name()) {
                return Err(bad_config(format!(
                    "missing feature trigger \"{}\"",
                    trigger.name()
                )));
            }
        }
        if self.genesis_info.allocations.is_empty() {
            return Err(bad_config("genesis shall have at least one allocation"));
        }
        let mut total: i128 = 0;
        for allocation in &self.genesis_info.allocations {
            if allocation.amount < 0 || allocation.amount > self.max_balance {
                return Err(bad_config("genesis allocation amount out of range"));
            }
            total += allocation.amount as i128;
        }
        if total > self.max_balance as i128 {
            return Err(bad_config("genesis allocations exceed max balance"));
        }
        if self.rewards_by_height.is_empty() {
            return Err(bad_config("rewardsByHeight shall not be empty"));
        }
        if !is_ascending(self.rewards_by_height.iter().map(|entry| entry.height)) {
            return Err(bad_config("rewardsByHeight heights shall be ascending"));
        }
        if self.forging_tiers.is_empty() {
            return Err(bad_config("forgingTiers shall not be empty"));
        }
        if !is_ascending(self.forging_tiers.iter().map(|tier| tier.min_blocks)) {
            return Err(bad_config("forgingTiers minBlocks shall be ascending"));
        }
        Ok(())
    }

    /// Activation point of the given feature.
    ///
    /// # Panics
    ///
    /// Panics if the trigger entry is missing. Cannot happen for a config
    /// obtained via `from_json` since the presence of every trigger is
    /// checked at load time.
    pub fn feature_trigger(&self, trigger: FeatureTrigger) -> u64 {
        match self.feature_triggers.get(trigger.name()) {
            Some(value) => *value,
            None => panic!("unchecked config, trigger \"{}\" missing", trigger.name()),
        }
    }

    /// Height at which automated transactions become acceptable.
    pub fn at_release_height(&self) -> u64 {
        self.feature_trigger(FeatureTrigger::AtHeight)
    }

    /// Minimal fee acceptable for a transaction of the given serialized size.
    pub fn required_fee(&self, size: usize) -> i64 {
        let units = (size as u64 + self.max_bytes_per_unit_fee - 1) / self.max_bytes_per_unit_fee;
        (units.max(1) as i64) * self.unit_fee
    }

    /// Block reward at the given height.
    pub fn reward_at_height(&self, height: u64) -> i64 {
        self.rewards_by_height
            .iter()
            .take_while(|entry| entry.height <= height)
            .last()
            .map(|entry| entry.reward)
            .unwrap_or(0)
    }
}

fn bad_config<E>(detail: E) -> Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Error::new_ext(ErrorKind::BadConfig, detail)
}

fn is_ascending(values: impl Iterator<Item = u64>) -> bool {
    let mut prev = None;
    for value in values {
        if matches!(prev, Some(p) if p >= value) {
            return false;
        }
        prev = Some(value);
    }
    true
}
