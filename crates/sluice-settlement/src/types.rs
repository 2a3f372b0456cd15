use serde::{Deserialize, Serialize};
use sluice_core::{AccountId, AssetId, Timestamp};
use std::fmt;
use uuid::Uuid;

/// Identifier of a registered settlement effect.
///
/// `blake3(target || value || payload || salt)`, so two identical diverted
/// outflows still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectId(#[serde(with = "hex::serde")] pub [u8; 32]);

impl EffectId {
    /// Derive the id of an effect from its content and a unique salt.
    pub fn derive(target: &SettlementTarget, value: u128, payload: &[u8], salt: &Uuid) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&content_digest(target, value, payload));
        hasher.update(salt.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Hex encoding of the id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Digest of `(target, value, payload)` used to match `execute` calls to
/// previously registered effects.
pub fn content_digest(target: &SettlementTarget, value: u128, payload: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    // Length prefixes keep the encoding unambiguous.
    for part in [target.asset.as_str().as_bytes(), target.recipient.as_str().as_bytes()] {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.update(&value.to_le_bytes());
    hasher.update(&(payload.len() as u64).to_le_bytes());
    hasher.update(payload);
    *hasher.finalize().as_bytes()
}

/// Where a diverted outflow was headed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementTarget {
    /// Asset being moved.
    pub asset: AssetId,
    /// Original recipient of the outflow.
    pub recipient: AccountId,
}

impl SettlementTarget {
    pub fn new(asset: AssetId, recipient: AccountId) -> Self {
        Self { asset, recipient }
    }
}

impl fmt::Display for SettlementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.asset, self.recipient)
    }
}

/// Lifecycle status of a settlement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectStatus {
    /// Waiting for its release time.
    Scheduled,
    /// Released to the original recipient.
    Executed,
    /// Vetoed by the supervisor; funds stay in strategy custody.
    Cancelled,
    /// Permanently blocked; requires out-of-band recovery.
    Blocked,
}

impl fmt::Display for EffectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "Scheduled"),
            Self::Executed => write!(f, "Executed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Blocked => write!(f, "Blocked"),
        }
    }
}

/// A diverted outflow held by a settlement strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementEffect {
    pub id: EffectId,
    pub target: SettlementTarget,
    pub value: u128,
    pub payload: Vec<u8>,
    pub status: EffectStatus,
    /// When the strategy accepted custody.
    pub created_at: Timestamp,
    /// Earliest release time; `None` for effects that can never be released.
    pub ready_at: Option<Timestamp>,
    pub(crate) digest: [u8; 32],
}

impl SettlementEffect {
    /// Whether this effect was registered for exactly this content.
    pub fn matches(&self, target: &SettlementTarget, value: u128, payload: &[u8]) -> bool {
        self.digest == content_digest(target, value, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> SettlementTarget {
        SettlementTarget::new(AssetId::from("USDC"), AccountId::from("alice"))
    }

    #[test]
    fn test_effect_ids_are_salted() {
        let a = EffectId::derive(&target(), 100, b"", &Uuid::now_v7());
        let b = EffectId::derive(&target(), 100, b"", &Uuid::now_v7());
        assert_ne!(a, b);
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn test_content_digest_is_unambiguous() {
        let left = SettlementTarget::new(AssetId::from("ab"), AccountId::from("c"));
        let right = SettlementTarget::new(AssetId::from("a"), AccountId::from("bc"));
        assert_ne!(content_digest(&left, 1, b""), content_digest(&right, 1, b""));
        assert_ne!(content_digest(&left, 1, b"x"), content_digest(&left, 2, b"x"));
        assert_eq!(content_digest(&left, 1, b"x"), content_digest(&left, 1, b"x"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", EffectStatus::Scheduled), "Scheduled");
        assert_eq!(format!("{}", EffectStatus::Executed), "Executed");
        assert_eq!(format!("{}", EffectStatus::Cancelled), "Cancelled");
        assert_eq!(format!("{}", EffectStatus::Blocked), "Blocked");
        assert_eq!(format!("{}", target()), "USDC->alice");
    }
}
