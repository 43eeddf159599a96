//! Strong type definitions for Vaultstream.
//!
//! All identifiers are newtypes to prevent misuse at compile time. The
//! data model mirrors what the delivery pipeline needs: assets with a
//! sealed encryption envelope, and license grants with optional expiry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;
use crate::originality::OriginalityVerdict;

/// Identifier of a registered asset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the canonical hyphenated form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of an authenticated principal (a platform account).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the canonical hyphenated form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Debug for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrincipalId({})", self.0)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of a license grant record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(pub Uuid);

impl GrantId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Debug for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GrantId({})", self.0)
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 20-byte external chain identity.
///
/// Parsed from and formatted as `0x`-prefixed hex. This is the identity
/// the ledger oracle is queried with.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(pub [u8; 20]);

impl WalletAddress {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse from a `0x`-prefixed (or bare) hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(stripped).map_err(|_| CoreError::InvalidWalletAddress(s.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidWalletAddress(s.to_string()))?;
        Ok(Self(arr))
    }

    /// Format as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// A short prefix of the address for display (watermark text, logs).
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wallet({})", self.short())
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<WalletAddress> for String {
    fn from(w: WalletAddress) -> Self {
        w.to_hex()
    }
}

/// The actor behind a request: a platform account, optionally linked to
/// an external chain identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub wallet: Option<WalletAddress>,
}

impl Principal {
    /// A principal with no linked wallet.
    pub fn local(id: PrincipalId) -> Self {
        Self { id, wallet: None }
    }

    /// A principal with a linked wallet.
    pub fn with_wallet(id: PrincipalId, wallet: WalletAddress) -> Self {
        Self {
            id,
            wallet: Some(wallet),
        }
    }
}

/// Content kind of an asset.
///
/// The category drives MIME resolution, originality normalization, and
/// whether the watermark transform applies. See [`crate::media`] and
/// [`crate::originality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Video,
    Audio,
    Image,
    Text,
}

impl ContentCategory {
    /// All categories, in declaration order.
    pub const ALL: [ContentCategory; 4] = [
        ContentCategory::Video,
        ContentCategory::Audio,
        ContentCategory::Image,
        ContentCategory::Text,
    ];

    /// Lowercase name, as used on the wire and in engine routing.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Video => "video",
            ContentCategory::Audio => "audio",
            ContentCategory::Image => "image",
            ContentCategory::Text => "text",
        }
    }
}

impl FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(ContentCategory::Video),
            "audio" => Ok(ContentCategory::Audio),
            "image" => Ok(ContentCategory::Image),
            "text" => Ok(ContentCategory::Text),
            other => Err(format!("unknown content category: {other}")),
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// License tier purchased for an asset.
///
/// Wire names (`license1`..`license4`) are kept for compatibility with
/// the marketplace contract events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseTier {
    #[serde(rename = "license1")]
    OneTime,
    #[serde(rename = "license2")]
    Limited,
    #[serde(rename = "license3")]
    Commercial,
    #[serde(rename = "license4")]
    Exclusive,
}

impl LicenseTier {
    /// Wire name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseTier::OneTime => "license1",
            LicenseTier::Limited => "license2",
            LicenseTier::Commercial => "license3",
            LicenseTier::Exclusive => "license4",
        }
    }

    /// Default grant duration for this tier, if time-bounded.
    ///
    /// `Limited` grants run for 24 hours; every other tier is unbounded.
    pub fn default_duration_ms(&self) -> Option<i64> {
        match self {
            LicenseTier::Limited => Some(24 * 60 * 60 * 1000),
            _ => None,
        }
    }
}

/// Price and availability of one license tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTerms {
    pub price: u64,
    pub enabled: bool,
}

/// A royalty recipient and their share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltySplit {
    pub recipient: WalletAddress,
    pub percentage: u8,
}

/// Per-tier license pricing for an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseTerms {
    #[serde(default)]
    pub one_time: TierTerms,
    #[serde(default)]
    pub limited: TierTerms,
    #[serde(default)]
    pub commercial: TierTerms,
    #[serde(default)]
    pub exclusive: TierTerms,
    #[serde(default)]
    pub royalty_splits: Vec<RoyaltySplit>,
}

/// A registered asset and its delivery metadata.
///
/// Key material is deliberately **not** part of this struct; it is stored
/// and fetched separately so that default reads can never leak it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub owner: PrincipalId,
    pub title: String,
    pub description: String,
    pub category: ContentCategory,

    /// Name of the uploaded file, used for extension-based MIME refinement
    /// and to derive the decrypted cache path.
    pub original_file_name: String,

    /// Path of the plaintext upload. The encrypted blob lives at
    /// `{storage_path}.enc` once the asset is secured.
    pub storage_path: String,

    /// Content address of the pinned encrypted blob. Set at securing time;
    /// a secured asset is never re-encrypted.
    pub cid: Option<String>,

    /// Normalized originality verdict and score.
    #[serde(default)]
    pub originality: OriginalityVerdict,

    /// On-chain registration id, set once the asset is minted. Without it
    /// the ledger path cannot authorize a purchase.
    pub registration_id: Option<String>,

    #[serde(default)]
    pub license_terms: LicenseTerms,

    /// Creation time, Unix milliseconds.
    pub created_at: i64,
}

impl Asset {
    /// Whether this asset has been secured (encrypted and pinned).
    pub fn is_secured(&self) -> bool {
        self.cid.is_some()
    }

    /// Path of the encrypted blob for this asset.
    ///
    /// Appends `.enc` unless the stored path already carries it.
    pub fn encrypted_path(&self) -> String {
        if self.storage_path.ends_with(".enc") {
            self.storage_path.clone()
        } else {
            format!("{}.enc", self.storage_path)
        }
    }

    /// Extension of the original file name, lowercased, with the dot.
    pub fn extension(&self) -> String {
        match self.original_file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => format!(".{}", ext.to_ascii_lowercase()),
            _ => String::new(),
        }
    }
}

/// A local license grant.
///
/// `(principal, asset)` pairs are not unique: a principal may hold several
/// grants for one asset (renewals). Authorization needs only one grant
/// that is currently valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseGrant {
    pub id: GrantId,
    pub principal: PrincipalId,
    pub asset: AssetId,

    /// Reference of the transaction that produced this grant. Unique: a
    /// transaction may produce at most one grant.
    pub transaction_ref: String,

    pub tier: LicenseTier,

    /// Issue time, Unix milliseconds.
    pub issued_at: i64,

    /// Expiry time, Unix milliseconds. Absent means unbounded.
    pub expires_at: Option<i64>,

    pub active: bool,
}

impl LicenseGrant {
    /// Check whether this grant authorizes access at `now`.
    ///
    /// A grant expiring exactly at `now` is still valid.
    pub fn is_valid(&self, now: i64) -> bool {
        if !self.active {
            return false;
        }
        match self.expires_at {
            Some(expires) => now <= expires,
            None => true,
        }
    }

    /// Whether the grant has an expiry in the past at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires) if now > expires)
    }
}

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_address_hex_roundtrip() {
        let addr = WalletAddress::from_bytes([0xab; 20]);
        let hex = addr.to_hex();
        assert!(hex.starts_with("0x"));
        let recovered = WalletAddress::from_hex(&hex).unwrap();
        assert_eq!(addr, recovered);
    }

    #[test]
    fn test_wallet_address_rejects_bad_length() {
        assert!(WalletAddress::from_hex("0x1234").is_err());
        assert!(WalletAddress::from_hex("not hex at all").is_err());
    }

    #[test]
    fn test_wallet_address_short() {
        let addr = WalletAddress::from_bytes([0x12; 20]);
        assert_eq!(addr.short(), "0x121212");
    }

    #[test]
    fn test_category_parse_roundtrip() {
        for cat in ContentCategory::ALL {
            assert_eq!(cat.as_str().parse::<ContentCategory>().unwrap(), cat);
        }
        assert!("midi".parse::<ContentCategory>().is_err());
    }

    #[test]
    fn test_tier_durations() {
        assert_eq!(
            LicenseTier::Limited.default_duration_ms(),
            Some(24 * 60 * 60 * 1000)
        );
        assert_eq!(LicenseTier::OneTime.default_duration_ms(), None);
        assert_eq!(LicenseTier::Exclusive.default_duration_ms(), None);
    }

    #[test]
    fn test_grant_validity_boundaries() {
        let grant = LicenseGrant {
            id: GrantId::generate(),
            principal: PrincipalId::generate(),
            asset: AssetId::generate(),
            transaction_ref: "0xfeed".into(),
            tier: LicenseTier::Limited,
            issued_at: 0,
            expires_at: Some(1000),
            active: true,
        };

        assert!(grant.is_valid(500));
        assert!(grant.is_valid(1000)); // at expiry
        assert!(!grant.is_valid(1001)); // past expiry
        assert!(grant.is_expired(1001));
        assert!(!grant.is_expired(1000));
    }

    #[test]
    fn test_inactive_grant_never_valid() {
        let grant = LicenseGrant {
            id: GrantId::generate(),
            principal: PrincipalId::generate(),
            asset: AssetId::generate(),
            transaction_ref: "0xdead".into(),
            tier: LicenseTier::Commercial,
            issued_at: 0,
            expires_at: None,
            active: false,
        };
        assert!(!grant.is_valid(0));
    }

    #[test]
    fn test_asset_encrypted_path() {
        let mut asset = sample_asset();
        asset.storage_path = "/data/uploads/clip.mp4".into();
        assert_eq!(asset.encrypted_path(), "/data/uploads/clip.mp4.enc");

        asset.storage_path = "/data/uploads/clip.mp4.enc".into();
        assert_eq!(asset.encrypted_path(), "/data/uploads/clip.mp4.enc");
    }

    #[test]
    fn test_asset_extension() {
        let mut asset = sample_asset();
        asset.original_file_name = "Movie.Final.MP4".into();
        assert_eq!(asset.extension(), ".mp4");

        asset.original_file_name = "noext".into();
        assert_eq!(asset.extension(), "");
    }

    fn sample_asset() -> Asset {
        Asset {
            id: AssetId::generate(),
            owner: PrincipalId::generate(),
            title: "t".into(),
            description: "d".into(),
            category: ContentCategory::Video,
            original_file_name: "clip.mp4".into(),
            storage_path: "/tmp/clip.mp4".into(),
            cid: None,
            originality: OriginalityVerdict::default(),
            registration_id: None,
            license_terms: LicenseTerms::default(),
            created_at: 0,
        }
    }
}
