use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_BETA, DEFAULT_BINS, DEFAULT_CYCLES, DEFAULT_GAMMA, DEFAULT_MODE};
use crate::sidecar::SidecarRecord;

/// Resolved parameters for one unmixing run.
///
/// `mode` stays a free-form string; the engine rejects values it does not
/// understand, so a bad mode fails as an algorithmic error rather than at
/// sidecar parse time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnmixParams {
    pub bins: usize,
    pub cycles: usize,
    pub beta: f64,
    pub gamma: f64,
    pub mode: String,
    /// Channel count, always derived from the loaded image.
    pub nch: usize,
}

impl UnmixParams {
    pub fn defaults(nch: usize) -> Self {
        Self {
            bins: DEFAULT_BINS,
            cycles: DEFAULT_CYCLES,
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
            mode: DEFAULT_MODE.to_string(),
            nch,
        }
    }

    /// Merge persisted overrides into the defaults.
    ///
    /// Each of `bins`, `beta`, `gamma`, `cycles`, `mode` overrides its
    /// default independently when present in the record. `nch` is
    /// authoritative from the image; a stale value in the record's unknown
    /// keys is ignored here (but survives in the record itself).
    pub fn resolve(nch: usize, record: &SidecarRecord) -> Self {
        let mut params = Self::defaults(nch);
        if let Some(bins) = record.bins {
            params.bins = bins;
        }
        if let Some(beta) = record.beta {
            params.beta = beta;
        }
        if let Some(gamma) = record.gamma {
            params.gamma = gamma;
        }
        if let Some(cycles) = record.cycles {
            params.cycles = cycles;
        }
        if let Some(ref mode) = record.mode {
            params.mode = mode.clone();
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = UnmixParams::defaults(4);
        assert_eq!(p.bins, 256);
        assert_eq!(p.cycles, 40);
        assert_eq!(p.beta, 0.0);
        assert_eq!(p.gamma, 0.1);
        assert_eq!(p.mode, "ssim");
        assert_eq!(p.nch, 4);
    }

    #[test]
    fn test_partial_overrides() {
        let record = SidecarRecord {
            gamma: Some(0.05),
            mode: Some("mi".into()),
            ..Default::default()
        };
        let p = UnmixParams::resolve(3, &record);
        assert_eq!(p.gamma, 0.05);
        assert_eq!(p.mode, "mi");
        // untouched fields keep their defaults
        assert_eq!(p.bins, 256);
        assert_eq!(p.cycles, 40);
    }

    #[test]
    fn test_nch_never_taken_from_record() {
        // A stale nch can only appear as an unknown key.
        let record: SidecarRecord = serde_json::from_str(r#"{"nch": 12}"#).unwrap();
        let p = UnmixParams::resolve(5, &record);
        assert_eq!(p.nch, 5);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let record = SidecarRecord {
            bins: Some(64),
            cycles: Some(10),
            ..Default::default()
        };
        assert_eq!(
            UnmixParams::resolve(2, &record),
            UnmixParams::resolve(2, &record)
        );
    }
}
