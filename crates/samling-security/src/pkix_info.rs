#![forbid(unsafe_code)]

//! Trust anchors and path constraints for PKIX validation, per peer.

use samling_core::Result;
use samling_keys::x509::DEFAULT_MAX_DEPTH;
use samling_keys::CertValidationConfig;
use std::collections::HashMap;
use std::time::SystemTime;

/// One set of anchors a certificate path may end in.
#[derive(Debug, Clone)]
pub struct PkixValidationInformation {
    pub trust_anchors: Vec<Vec<u8>>,
    pub crls: Vec<Vec<u8>>,
    pub max_depth: usize,
    /// Time to validate at; `None` means now.
    pub verification_time: Option<SystemTime>,
}

impl Default for PkixValidationInformation {
    fn default() -> Self {
        Self {
            trust_anchors: Vec::new(),
            crls: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            verification_time: None,
        }
    }
}

impl PkixValidationInformation {
    pub fn new(trust_anchors: Vec<Vec<u8>>) -> Self {
        Self {
            trust_anchors,
            ..Self::default()
        }
    }

    pub fn with_crls(mut self, crls: Vec<Vec<u8>>) -> Self {
        self.crls = crls;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_verification_time(mut self, time: SystemTime) -> Self {
        self.verification_time = Some(time);
        self
    }

    /// The path validation settings, adding CRLs that came with the
    /// signature.
    pub fn to_config(&self, extra_crls: &[Vec<u8>]) -> CertValidationConfig {
        let mut crls = self.crls.clone();
        crls.extend(extra_crls.iter().cloned());
        CertValidationConfig {
            trust_anchors: self.trust_anchors.clone(),
            crls,
            max_depth: self.max_depth,
            verification_time: self.verification_time,
            ..CertValidationConfig::default()
        }
    }
}

/// Supplies the validation information that applies to a peer.
pub trait PkixValidationInformationResolver {
    fn resolve(&self, peer: Option<&str>) -> Result<Vec<PkixValidationInformation>>;
}

/// Validation information configured up front: sets that apply to every
/// peer, plus sets for specific peer names.
#[derive(Debug, Clone, Default)]
pub struct StaticPkixValidationInformationResolver {
    defaults: Vec<PkixValidationInformation>,
    by_peer: HashMap<String, Vec<PkixValidationInformation>>,
}

impl StaticPkixValidationInformationResolver {
    pub fn new(defaults: Vec<PkixValidationInformation>) -> Self {
        Self {
            defaults,
            by_peer: HashMap::new(),
        }
    }

    pub fn with_peer(
        mut self,
        peer: impl Into<String>,
        information: PkixValidationInformation,
    ) -> Self {
        self.by_peer.entry(peer.into()).or_default().push(information);
        self
    }
}

impl PkixValidationInformationResolver for StaticPkixValidationInformationResolver {
    /// The peer's own sets first, then the defaults.
    fn resolve(&self, peer: Option<&str>) -> Result<Vec<PkixValidationInformation>> {
        let mut infos: Vec<PkixValidationInformation> = peer
            .and_then(|p| self.by_peer.get(p))
            .cloned()
            .unwrap_or_default();
        infos.extend(self.defaults.iter().cloned());
        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_merges_crls() {
        let info = PkixValidationInformation::new(vec![vec![1]])
            .with_crls(vec![vec![2]])
            .with_max_depth(3);
        let config = info.to_config(&[vec![3]]);
        assert_eq!(config.trust_anchors, vec![vec![1u8]]);
        assert_eq!(config.crls, vec![vec![2u8], vec![3]]);
        assert_eq!(config.max_depth, 3);
        assert!(config.check_validity_period);
        assert_eq!(PkixValidationInformation::default().max_depth, 10);
    }

    #[test]
    fn peer_sets_come_before_defaults() {
        let resolver = StaticPkixValidationInformationResolver::new(vec![
            PkixValidationInformation::new(vec![vec![0]]),
        ])
        .with_peer("sp", PkixValidationInformation::new(vec![vec![9]]));
        let infos = resolver.resolve(Some("sp")).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].trust_anchors, vec![vec![9u8]]);
        assert_eq!(resolver.resolve(Some("other")).unwrap().len(), 1);
        assert_eq!(resolver.resolve(None).unwrap().len(), 1);
    }
}
