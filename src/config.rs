//! Immutable session parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Adaptive-bitrate streaming configuration for one session.
///
/// Immutable once validated. Shared by the controller, the predictors, and
/// the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Nominal playback duration of one segment in seconds.
    pub segment_seconds: f64,
    /// Bitrate ladder in Mbps, strictly ascending.
    pub bitrates_mbps: Vec<f64>,
    /// Number of concurrent views (1 = classic single-view ABR).
    pub stream_count: usize,
    /// Buffer-occupancy safety fraction used by controllers, in (0, 1].
    pub rebuffer_safety: f64,
    /// Playback buffer capacity in seconds.
    pub max_buffer_seconds: f64,
}

impl StreamingConfig {
    /// Checks the configuration for contradictions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bitrates_mbps.is_empty() {
            return Err(ConfigError::EmptyLadder);
        }
        let mut prev = 0.0;
        for (index, &value) in self.bitrates_mbps.iter().enumerate() {
            if !value.is_finite() || value <= prev {
                return Err(ConfigError::LadderNotAscending { index, value });
            }
            prev = value;
        }
        if self.stream_count < 1 {
            return Err(ConfigError::NoStreams);
        }
        if !(self.segment_seconds > 0.0) {
            return Err(ConfigError::NonPositiveSegment(self.segment_seconds));
        }
        if !(self.rebuffer_safety > 0.0 && self.rebuffer_safety <= 1.0) {
            return Err(ConfigError::SafetyOutOfRange(self.rebuffer_safety));
        }
        if !(self.max_buffer_seconds > 0.0) {
            return Err(ConfigError::NonPositiveMaxBuffer(self.max_buffer_seconds));
        }
        if self.max_buffer_seconds < self.segment_seconds {
            return Err(ConfigError::BufferSmallerThanSegment {
                max_buffer_seconds: self.max_buffer_seconds,
                segment_seconds: self.segment_seconds,
            });
        }
        Ok(())
    }

    /// Number of rungs in the bitrate ladder.
    pub fn bitrate_count(&self) -> usize {
        self.bitrates_mbps.len()
    }

    /// Download volume in MB of one segment at the given ladder rung.
    pub fn segment_mb(&self, rung: usize) -> f64 {
        self.bitrates_mbps[rung] * self.segment_seconds / 8.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> StreamingConfig {
        StreamingConfig {
            segment_seconds: 1.0,
            bitrates_mbps: vec![1.0, 2.0, 4.0, 8.0],
            stream_count: 4,
            rebuffer_safety: 0.75,
            max_buffer_seconds: 5.0,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn empty_ladder_rejected() {
        let mut config = base_config();
        config.bitrates_mbps.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyLadder));
    }

    #[test]
    fn descending_ladder_rejected() {
        let mut config = base_config();
        config.bitrates_mbps = vec![1.0, 4.0, 2.0];
        assert_eq!(
            config.validate(),
            Err(ConfigError::LadderNotAscending {
                index: 2,
                value: 2.0
            })
        );
    }

    #[test]
    fn non_positive_rung_rejected() {
        let mut config = base_config();
        config.bitrates_mbps = vec![0.0, 1.0];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LadderNotAscending { index: 0, .. })
        ));
    }

    #[test]
    fn zero_streams_rejected() {
        let mut config = base_config();
        config.stream_count = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoStreams));
    }

    #[test]
    fn zero_segment_rejected() {
        let mut config = base_config();
        config.segment_seconds = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveSegment(_))
        ));
    }

    #[test]
    fn safety_above_one_rejected() {
        let mut config = base_config();
        config.rebuffer_safety = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SafetyOutOfRange(_))
        ));
    }

    #[test]
    fn buffer_smaller_than_segment_rejected() {
        let mut config = base_config();
        config.max_buffer_seconds = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BufferSmallerThanSegment { .. })
        ));
    }

    #[test]
    fn segment_mb_follows_units() {
        // 8 Mbps over a 1 s segment is exactly 1 MB.
        assert!((base_config().segment_mb(3) - 1.0).abs() < f64::EPSILON);
        assert!((base_config().segment_mb(0) - 0.125).abs() < f64::EPSILON);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = base_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: StreamingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
