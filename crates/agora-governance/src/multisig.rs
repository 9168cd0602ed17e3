//! Council membership multisig.
//!
//! Aggregates council signatures over `(target, severity, payload)` and
//! forwards the payload to `target` exactly once, when the severity threshold
//! is reached. The request hash binds all three fields: the same payload
//! bytes approved for one target (or at one severity) never count toward, or
//! block, a request for another.

use std::collections::{BTreeSet, HashMap};

use agora_types::{Address, Hash, HashBuilder};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::access::CallerContext;
use crate::config::MultisigConfig;
use crate::error::GovernanceError;
use crate::events::GovernanceEvent;

/// Impact level of a request; selects its signature threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
}

impl Severity {
    fn tag(&self) -> u8 {
        match self {
            Severity::Minor => 0,
            Severity::Major => 1,
        }
    }
}

/// Receiver of forwarded payloads.
pub trait ForwardTarget {
    /// Deliver `payload` to `target` on behalf of `origin` (the multisig).
    fn forward(
        &mut self,
        origin: Address,
        target: Address,
        payload: &[u8],
    ) -> Result<(), GovernanceError>;
}

/// Signature state of one `(target, severity, payload)` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigRequest {
    pub target: Address,
    pub severity: Severity,
    pub signers: BTreeSet<Address>,
    pub count: u32,
    pub forwarded: bool,
}

/// Result of a successful signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignOutcome {
    pub request: Hash,
    pub count: u32,
    pub forwarded: bool,
}

#[derive(Debug)]
pub struct MembershipMultisig {
    /// Forwarding identity
    address: Address,
    members: Vec<Address>,
    minor_threshold: u32,
    major_threshold: u32,
    requests: HashMap<Hash, MultisigRequest>,
    events: Vec<GovernanceEvent>,
}

impl MembershipMultisig {
    pub fn new(address: Address, config: &MultisigConfig) -> Result<Self, GovernanceError> {
        config.validate()?;

        Ok(Self {
            address,
            members: config.members.clone(),
            minor_threshold: config.minor_threshold,
            major_threshold: config.major_threshold,
            requests: HashMap::new(),
            events: Vec::new(),
        })
    }

    /// Binding hash of a request.
    pub fn request_hash(target: &Address, severity: Severity, payload: &[u8]) -> Hash {
        HashBuilder::new("agora/multisig-request")
            .bytes(target.as_bytes())
            .u8(severity.tag())
            .bytes(payload)
            .finish()
    }

    /// Sign a request and forward it once the threshold is reached.
    ///
    /// # Errors
    /// - `Unauthorized` if the caller is not a council member
    /// - `AlreadyForwarded` if the request already went out
    /// - `DuplicateSignature` if the caller already signed it
    /// - `ForwardingFailed` if the forwarding call fails; the signature is
    ///   not recorded in that case
    pub fn sign_and_forward(
        &mut self,
        ctx: &CallerContext,
        target: Address,
        severity: Severity,
        payload: &[u8],
        forwarder: &mut dyn ForwardTarget,
    ) -> Result<SignOutcome, GovernanceError> {
        let signer = ctx.caller();
        if !self.is_member(&signer) {
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not a council member",
                signer
            )));
        }

        let hash = Self::request_hash(&target, severity, payload);
        let previous = match self.requests.get(&hash) {
            Some(request) if request.forwarded => return Err(GovernanceError::AlreadyForwarded),
            Some(request) if request.signers.contains(&signer) => {
                return Err(GovernanceError::DuplicateSignature)
            }
            Some(request) => request.count,
            None => 0,
        };

        let count = previous + 1;
        let forwarded = count >= self.threshold(severity);

        // The forwarder cannot reach this multisig, so committing after a
        // successful call is equivalent to set-then-rollback.
        if forwarded {
            forwarder
                .forward(self.address, target, payload)
                .map_err(|e| GovernanceError::ForwardingFailed(e.to_string()))?;
        }

        let request = self.requests.entry(hash).or_insert_with(|| MultisigRequest {
            target,
            severity,
            signers: BTreeSet::new(),
            count: 0,
            forwarded: false,
        });
        request.signers.insert(signer);
        request.count = count;
        request.forwarded = forwarded;

        debug!(request = %hash.short(), %signer, count, "Request signed");
        self.events.push(GovernanceEvent::RequestSigned {
            request: hash,
            signer,
            count,
        });

        if forwarded {
            info!(request = %hash.short(), %target, ?severity, "Request forwarded");
            self.events.push(GovernanceEvent::RequestForwarded {
                request: hash,
                target,
                severity,
            });
        }

        Ok(SignOutcome {
            request: hash,
            count,
            forwarded,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn is_member(&self, account: &Address) -> bool {
        self.members.contains(account)
    }

    pub fn threshold(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Minor => self.minor_threshold,
            Severity::Major => self.major_threshold,
        }
    }

    pub fn request(&self, hash: &Hash) -> Option<&MultisigRequest> {
        self.requests.get(hash)
    }

    pub fn signature_count(&self, hash: &Hash) -> u32 {
        self.requests.get(hash).map_or(0, |r| r.count)
    }

    pub fn has_signed(&self, hash: &Hash, member: &Address) -> bool {
        self.requests
            .get(hash)
            .is_some_and(|r| r.signers.contains(member))
    }

    pub fn is_forwarded(&self, hash: &Hash) -> bool {
        self.requests.get(hash).is_some_and(|r| r.forwarded)
    }

    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every forwarded call; optionally refuses them.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Address, Address, Vec<u8>)>,
        fail: bool,
    }

    impl ForwardTarget for Recorder {
        fn forward(
            &mut self,
            origin: Address,
            target: Address,
            payload: &[u8],
        ) -> Result<(), GovernanceError> {
            if self.fail {
                return Err(GovernanceError::InvalidProposal("target refused".to_string()));
            }
            self.calls.push((origin, target, payload.to_vec()));
            Ok(())
        }
    }

    fn member(i: u8) -> Address {
        Address::derive(&[b'm', i])
    }

    fn multisig() -> MembershipMultisig {
        let config = MultisigConfig {
            members: vec![member(1), member(2), member(3)],
            minor_threshold: 2,
            major_threshold: 3,
        };
        MembershipMultisig::new(Address::derive(b"multisig"), &config).unwrap()
    }

    fn ctx(account: Address) -> CallerContext {
        CallerContext::system(account, &[])
    }

    #[test]
    fn test_minor_threshold_scenario() {
        let mut ms = multisig();
        let mut rec = Recorder::default();
        let target = Address::derive(b"governor");
        let payload = b"payload-p".to_vec();

        let first = ms
            .sign_and_forward(&ctx(member(1)), target, Severity::Minor, &payload, &mut rec)
            .unwrap();
        assert_eq!(first.count, 1);
        assert!(!first.forwarded);
        assert!(rec.calls.is_empty());

        let second = ms
            .sign_and_forward(&ctx(member(2)), target, Severity::Minor, &payload, &mut rec)
            .unwrap();
        assert_eq!(second.count, 2);
        assert!(second.forwarded);
        assert!(ms.is_forwarded(&second.request));
        assert_eq!(rec.calls, vec![(ms.address(), target, payload.clone())]);

        let third =
            ms.sign_and_forward(&ctx(member(3)), target, Severity::Minor, &payload, &mut rec);
        assert_eq!(third, Err(GovernanceError::AlreadyForwarded));
        assert_eq!(rec.calls.len(), 1);
    }

    #[test]
    fn test_duplicate_signature() {
        let mut ms = multisig();
        let mut rec = Recorder::default();
        let target = Address::derive(b"governor");

        ms.sign_and_forward(&ctx(member(1)), target, Severity::Major, b"x", &mut rec)
            .unwrap();
        let again = ms.sign_and_forward(&ctx(member(1)), target, Severity::Major, b"x", &mut rec);
        assert_eq!(again, Err(GovernanceError::DuplicateSignature));
        assert_eq!(
            ms.signature_count(&MembershipMultisig::request_hash(&target, Severity::Major, b"x")),
            1
        );
    }

    #[test]
    fn test_non_member_rejected() {
        let mut ms = multisig();
        let mut rec = Recorder::default();
        let result = ms.sign_and_forward(
            &ctx(Address::derive(b"outsider")),
            Address::derive(b"governor"),
            Severity::Minor,
            b"x",
            &mut rec,
        );
        assert!(matches!(result, Err(GovernanceError::Unauthorized(_))));
    }

    #[test]
    fn test_same_payload_different_targets_are_independent() {
        let mut ms = multisig();
        let mut rec = Recorder::default();
        let target_a = Address::derive(b"a");
        let target_b = Address::derive(b"b");

        ms.sign_and_forward(&ctx(member(1)), target_a, Severity::Minor, b"same", &mut rec)
            .unwrap();
        ms.sign_and_forward(&ctx(member(2)), target_a, Severity::Minor, b"same", &mut rec)
            .unwrap();

        // Forwarding to A does not block B
        let b1 = ms
            .sign_and_forward(&ctx(member(1)), target_b, Severity::Minor, b"same", &mut rec)
            .unwrap();
        assert_eq!(b1.count, 1);
        assert!(!b1.forwarded);
        assert_ne!(
            MembershipMultisig::request_hash(&target_a, Severity::Minor, b"same"),
            b1.request
        );
    }

    #[test]
    fn test_severity_is_bound() {
        let target = Address::derive(b"governor");
        assert_ne!(
            MembershipMultisig::request_hash(&target, Severity::Minor, b"p"),
            MembershipMultisig::request_hash(&target, Severity::Major, b"p"),
        );
    }

    #[test]
    fn test_forwarding_failure_leaves_no_state() {
        let mut ms = multisig();
        let mut ok = Recorder::default();
        let mut failing = Recorder {
            fail: true,
            ..Default::default()
        };
        let target = Address::derive(b"governor");
        let hash = MembershipMultisig::request_hash(&target, Severity::Minor, b"p");

        ms.sign_and_forward(&ctx(member(1)), target, Severity::Minor, b"p", &mut ok)
            .unwrap();
        ms.drain_events();

        let result = ms.sign_and_forward(&ctx(member(2)), target, Severity::Minor, b"p", &mut failing);
        assert!(matches!(result, Err(GovernanceError::ForwardingFailed(_))));
        assert_eq!(ms.signature_count(&hash), 1);
        assert!(!ms.has_signed(&hash, &member(2)));
        assert!(!ms.is_forwarded(&hash));
        assert!(ms.drain_events().is_empty());

        // Retry once the target accepts
        let retry = ms
            .sign_and_forward(&ctx(member(2)), target, Severity::Minor, b"p", &mut ok)
            .unwrap();
        assert!(retry.forwarded);
        assert_eq!(ok.calls.len(), 1);
    }

    #[test]
    fn test_major_needs_three() {
        let mut ms = multisig();
        let mut rec = Recorder::default();
        let target = Address::derive(b"governor");
        for i in 1..=2 {
            let out = ms
                .sign_and_forward(&ctx(member(i)), target, Severity::Major, b"m", &mut rec)
                .unwrap();
            assert!(!out.forwarded);
        }
        let out = ms
            .sign_and_forward(&ctx(member(3)), target, Severity::Major, b"m", &mut rec)
            .unwrap();
        assert!(out.forwarded);
        assert_eq!(rec.calls.len(), 1);
    }
}
