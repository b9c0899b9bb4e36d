//! Proof-system and group configuration.
//!
//! Configuration comes from defaults, environment variables (`ZK_MIXNET_*`)
//! or JSON. Group parameters are hex strings so presets and files share one
//! representation.

use std::str::FromStr;
use std::sync::Arc;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batching::{BackendError, ModExpBackend, ParallelBackend, SequentialBackend};
use crate::challenge::{ChallengeError, ChallengeSpace};
use crate::group::{GroupError, SchnorrGroup};

const LOG_TARGET: &str = "zk_mixnet::config";

/// Statistical security parameter for the randomized preimage.
pub const DEFAULT_KR: u32 = 20;

pub const ENV_KE: &str = "ZK_MIXNET_KE";
pub const ENV_KC: &str = "ZK_MIXNET_KC";
pub const ENV_KR: &str = "ZK_MIXNET_KR";
pub const ENV_GENERATOR_SEED: &str = "ZK_MIXNET_GENERATOR_SEED";
pub const ENV_PROVER_ID: &str = "ZK_MIXNET_PROVER_ID";
pub const ENV_BACKEND: &str = "ZK_MIXNET_BACKEND";
pub const ENV_BACKEND_THREADS: &str = "ZK_MIXNET_BACKEND_THREADS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value `{value}` for {var}")]
    Env { var: &'static str, value: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Challenge space error: {0}")]
    Challenge(#[from] ChallengeError),

    #[error("Group error: {0}")]
    Group(#[from] GroupError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Which batch compute backend to build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendKind {
    Sequential,
    Parallel {
        #[serde(default)]
        threads: Option<usize>,
    },
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Parallel { threads: None }
    }
}

impl BackendKind {
    pub fn build(&self) -> Result<Arc<dyn ModExpBackend>, BackendError> {
        Ok(match self {
            BackendKind::Sequential => Arc::new(SequentialBackend),
            BackendKind::Parallel { threads } => Arc::new(ParallelBackend::new(*threads)?),
        })
    }
}

/// Parameters of the permutation-commitment proof system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofSystemConfig {
    /// Bit length of the e-values; `None` draws them from Z_q.
    pub ke: Option<u32>,
    /// Bit length of the sigma challenge; `None` draws it from Z_q.
    pub kc: Option<u32>,
    pub kr: u32,
    /// Seed for the commitment generators. Prover and verifier must agree.
    pub generator_seed: String,
    /// Folded into the sigma challenge when set.
    pub prover_id: Option<String>,
    pub backend: BackendKind,
}

impl Default for ProofSystemConfig {
    fn default() -> Self {
        Self {
            ke: None,
            kc: None,
            kr: DEFAULT_KR,
            generator_seed: String::new(),
            prover_id: None,
            backend: BackendKind::default(),
        }
    }
}

impl ProofSystemConfig {
    /// Defaults overridden by any `ZK_MIXNET_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ke) = parse_var::<u32>(&lookup, ENV_KE)? {
            config.ke = Some(ke);
        }
        if let Some(kc) = parse_var::<u32>(&lookup, ENV_KC)? {
            config.kc = Some(kc);
        }
        if let Some(kr) = parse_var::<u32>(&lookup, ENV_KR)? {
            config.kr = kr;
        }
        if let Some(seed) = lookup(ENV_GENERATOR_SEED) {
            config.generator_seed = seed;
        }
        if let Some(id) = lookup(ENV_PROVER_ID) {
            config.prover_id = Some(id);
        }

        let threads = parse_var::<usize>(&lookup, ENV_BACKEND_THREADS)?;
        config.backend = match lookup(ENV_BACKEND).as_deref() {
            None | Some("parallel") => BackendKind::Parallel { threads },
            Some("sequential") => BackendKind::Sequential,
            Some(other) => {
                return Err(ConfigError::Env {
                    var: ENV_BACKEND,
                    value: other.to_string(),
                })
            }
        };

        tracing::debug!(target: LOG_TARGET, ?config, "Loaded proof system configuration from environment");
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `kr ≥ 1`, and power-of-two challenge spaces no larger than the group order.
    pub fn validate(&self, group: &SchnorrGroup) -> Result<(), ConfigError> {
        if self.kr == 0 {
            return Err(ConfigError::Invalid("kr must be at least 1".to_string()));
        }
        ChallengeSpace::for_group(self.ke, group)?;
        ChallengeSpace::for_group(self.kc, group)?;
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}

/// Schnorr group parameters as big-endian hex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParameters {
    pub modulus: String,
    pub order: String,
}

impl GroupParameters {
    /// p = 23, q = 11. Only for tests and examples.
    pub fn toy() -> Self {
        Self {
            modulus: "17".to_string(),
            order: "0b".to_string(),
        }
    }

    /// 256-bit safe prime p = 2q + 1.
    pub fn test_256() -> Self {
        Self {
            modulus: "f2b19788485432e856c0ea5a5f416206e341dd3a152a90d0d39c2273de2df0b7".to_string(),
            order: "7958cbc4242a19742b60752d2fa0b10371a0ee9d0a95486869ce1139ef16f85b".to_string(),
        }
    }

    /// 512-bit safe prime p = 2q + 1.
    pub fn test_512() -> Self {
        Self {
            modulus: concat!(
                "dfee7c447aed8c3725b4f9a0d83019d10181a8c8aa0c2fcd998b669851a071bb",
                "dc36bdd7b64a5c61cbafddc4753102429ba37c896b00de03b6afa6aa8b147523"
            )
            .to_string(),
            order: concat!(
                "6ff73e223d76c61b92da7cd06c180ce880c0d464550617e6ccc5b34c28d038dd",
                "ee1b5eebdb252e30e5d7eee23a9881214dd1be44b5806f01db57d355458a3a91"
            )
            .to_string(),
        }
    }

    pub fn from_group(group: &SchnorrGroup) -> Self {
        Self {
            modulus: hex::encode(group.modulus().to_bytes_be()),
            order: hex::encode(group.order().to_bytes_be()),
        }
    }

    pub fn build(&self) -> Result<SchnorrGroup, ConfigError> {
        let modulus = parse_hex(&self.modulus)?;
        let order = parse_hex(&self.order)?;
        Ok(SchnorrGroup::new(modulus, order)?)
    }
}

fn parse_hex(value: &str) -> Result<BigUint, ConfigError> {
    let digits = value.trim().trim_start_matches("0x");
    let bytes = if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))?
    } else {
        hex::decode(digits)?
    };
    Ok(BigUint::from_bytes_be(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProofSystemConfig::default();
        assert_eq!(config.kr, DEFAULT_KR);
        assert_eq!(config.ke, None);
        assert_eq!(config.kc, None);
        assert_eq!(config.backend, BackendKind::Parallel { threads: None });
        assert!(config.validate(&GroupParameters::toy().build().unwrap()).is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = ProofSystemConfig::from_lookup(lookup_from(&[
            (ENV_KE, "40"),
            (ENV_KC, " 64 "),
            (ENV_KR, "10"),
            (ENV_GENERATOR_SEED, "election-2026"),
            (ENV_PROVER_ID, "mixer-1"),
            (ENV_BACKEND_THREADS, "4"),
        ]))
        .unwrap();
        assert_eq!(config.ke, Some(40));
        assert_eq!(config.kc, Some(64));
        assert_eq!(config.kr, 10);
        assert_eq!(config.generator_seed, "election-2026");
        assert_eq!(config.prover_id.as_deref(), Some("mixer-1"));
        assert_eq!(config.backend, BackendKind::Parallel { threads: Some(4) });

        let sequential =
            ProofSystemConfig::from_lookup(lookup_from(&[(ENV_BACKEND, "sequential")])).unwrap();
        assert_eq!(sequential.backend, BackendKind::Sequential);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = ProofSystemConfig::from_lookup(lookup_from(&[(ENV_KR, "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_KR, .. }));
        let err = ProofSystemConfig::from_lookup(lookup_from(&[(ENV_BACKEND, "gpu")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_BACKEND, .. }));
    }

    #[test]
    fn test_json_round_trip_and_partial_input() {
        let config = ProofSystemConfig {
            ke: Some(32),
            prover_id: Some("p".to_string()),
            backend: BackendKind::Sequential,
            ..Default::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(ProofSystemConfig::from_json_str(&json).unwrap(), config);

        let partial = ProofSystemConfig::from_json_str(r#"{"kc": 16, "backend": {"kind": "parallel", "threads": 2}}"#).unwrap();
        assert_eq!(partial.kc, Some(16));
        assert_eq!(partial.kr, DEFAULT_KR);
        assert_eq!(partial.backend, BackendKind::Parallel { threads: Some(2) });
    }

    #[test]
    fn test_validation() {
        let toy = GroupParameters::toy().build().unwrap();
        let bad_kr = ProofSystemConfig {
            kr: 0,
            ..Default::default()
        };
        assert!(matches!(bad_kr.validate(&toy), Err(ConfigError::Invalid(_))));

        let too_wide = ProofSystemConfig {
            kc: Some(8),
            ..Default::default()
        };
        assert!(matches!(
            too_wide.validate(&toy),
            Err(ConfigError::Challenge(ChallengeError::ExceedsGroupOrder { bits: 8 }))
        ));
    }

    #[test]
    fn test_group_presets() {
        let toy = GroupParameters::toy().build().unwrap();
        assert_eq!(toy.modulus(), &BigUint::from(23u32));
        assert_eq!(toy.order(), &BigUint::from(11u32));

        for params in [GroupParameters::test_256(), GroupParameters::test_512()] {
            let group = params.build().unwrap();
            assert_eq!(group.cofactor(), &BigUint::from(2u32));
            assert_eq!(GroupParameters::from_group(&group), params);
        }

        let odd = GroupParameters {
            modulus: "0x17".to_string(),
            order: "b".to_string(),
        };
        assert_eq!(odd.build().unwrap(), toy);
    }

    #[test]
    fn test_backend_kinds_build() {
        assert_eq!(BackendKind::Sequential.build().unwrap().name(), "sequential");
        assert_eq!(
            BackendKind::Parallel { threads: Some(2) }.build().unwrap().name(),
            "parallel"
        );
        assert!(BackendKind::Parallel { threads: Some(0) }.build().is_err());
    }
}
