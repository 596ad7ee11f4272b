//! Snowflake bit layouts: the five named presets plus arbitrary custom layouts.

use crate::error::IdGenError;

/// `{epochMillis, timestampBits, workerIdBits, sequenceBits}` with the
/// invariant `timestampBits + workerIdBits + sequenceBits = 63`.
///
/// `tick_millis` generalizes the millisecond-resolution assumption to
/// Sonyflake-style 10ms ticks without changing the packed-word shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnowflakeLayout {
    pub epoch_millis: i64,
    pub timestamp_bits: u8,
    pub worker_id_bits: u8,
    pub sequence_bits: u8,
    pub tick_millis: u32,
}

impl SnowflakeLayout {
    pub fn new(
        epoch_millis: i64,
        timestamp_bits: u8,
        worker_id_bits: u8,
        sequence_bits: u8,
    ) -> Result<Self, IdGenError> {
        Self::with_tick_millis(epoch_millis, timestamp_bits, worker_id_bits, sequence_bits, 1)
    }

    pub fn with_tick_millis(
        epoch_millis: i64,
        timestamp_bits: u8,
        worker_id_bits: u8,
        sequence_bits: u8,
        tick_millis: u32,
    ) -> Result<Self, IdGenError> {
        let sum = timestamp_bits as u16 + worker_id_bits as u16 + sequence_bits as u16;
        if sum != 63 {
            return Err(IdGenError::InvalidLayout { sum });
        }
        Ok(Self { epoch_millis, timestamp_bits, worker_id_bits, sequence_bits, tick_millis })
    }

    pub fn max_worker_id(&self) -> u64 {
        (1u64 << self.worker_id_bits) - 1
    }

    pub fn sequence_mask(&self) -> u64 {
        (1u64 << self.sequence_bits) - 1
    }

    /// Approximate lifespan in milliseconds before the timestamp field wraps.
    pub fn lifespan_millis(&self) -> i64 {
        (1i64 << self.timestamp_bits) * self.tick_millis as i64
    }

    /// Twitter's original Snowflake layout: epoch 2010-11-04T01:42:54.657Z.
    pub fn twitter_snowflake() -> Self {
        Self::new(1_288_834_974_657, 41, 10, 12).expect("twitter_snowflake layout is valid")
    }

    /// Discord's layout: epoch 2015-01-01T00:00:00Z.
    pub fn discord_snowflake() -> Self {
        Self::new(1_420_070_400_000, 42, 10, 10).expect("discord_snowflake layout is valid")
    }

    /// Instagram-style layout: epoch 2011-01-01T00:00:00Z, shard-heavy bit split.
    pub fn instagram_snowflake() -> Self {
        Self::new(1_293_840_000_000, 41, 13, 9).expect("instagram_snowflake layout is valid")
    }

    /// Sonyflake-style layout: epoch 2014-09-01T00:00:00Z, 10ms ticks.
    pub fn sonyflake() -> Self {
        Self::with_tick_millis(1_409_529_600_000, 39, 16, 8, 10).expect("sonyflake layout is valid")
    }

    /// This workspace's own default: epoch 2020-01-01T00:00:00Z.
    pub fn fc_default() -> Self {
        Self::new(1_577_836_800_000, 41, 10, 12).expect("fc_default layout is valid")
    }
}

impl Default for SnowflakeLayout {
    fn default() -> Self {
        Self::fc_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_satisfies_the_bit_invariant() {
        for layout in [
            SnowflakeLayout::twitter_snowflake(),
            SnowflakeLayout::discord_snowflake(),
            SnowflakeLayout::instagram_snowflake(),
            SnowflakeLayout::sonyflake(),
            SnowflakeLayout::fc_default(),
        ] {
            let sum = layout.timestamp_bits as u16 + layout.worker_id_bits as u16 + layout.sequence_bits as u16;
            assert_eq!(sum, 63);
        }
    }

    #[test]
    fn rejects_layouts_that_violate_the_bit_invariant() {
        assert!(SnowflakeLayout::new(0, 40, 10, 12).is_err());
    }
}
