//! Proposal and Transform structures
//!
//! Configuration-side view of SA proposals (RFC 7296 Section 3.3). A
//! configured proposal lists every transform this end is willing to
//! negotiate; the daemon builds the wire SA payload from it.
//!
//! # Structure
//!
//! ```text
//! Proposal (IKE or ESP)
//!   └── Transform(s): ENCR, PRF, INTEG, DH, ESN
//! ```

use std::fmt;

/// Transform Type (RFC 7296 Section 3.3.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum TransformType {
    /// Encryption Algorithm (ENCR)
    Encr = 1,
    /// Pseudo-random Function (PRF)
    Prf = 2,
    /// Integrity Algorithm (INTEG)
    Integ = 3,
    /// Diffie-Hellman Group (D-H)
    Dh = 4,
    /// Extended Sequence Numbers (ESN)
    Esn = 5,
}

/// Transform ID for Encryption (ENCR) algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum EncrTransformId {
    /// AES-CBC with 128-bit key
    AesCbc128,
    /// AES-CBC with 256-bit key
    AesCbc256,
    /// AES-GCM with 128-bit key and 16-byte ICV
    AesGcm128,
    /// AES-GCM with 256-bit key and 16-byte ICV
    AesGcm256,
}

impl EncrTransformId {
    fn name(self) -> &'static str {
        match self {
            EncrTransformId::AesCbc128 => "AES_CBC_128",
            EncrTransformId::AesCbc256 => "AES_CBC_256",
            EncrTransformId::AesGcm128 => "AES_GCM_16_128",
            EncrTransformId::AesGcm256 => "AES_GCM_16_256",
        }
    }
}

/// Transform ID for PRF algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PrfTransformId {
    /// HMAC-SHA2-256
    HmacSha256,
    /// HMAC-SHA2-384
    HmacSha384,
    /// HMAC-SHA2-512
    HmacSha512,
}

impl PrfTransformId {
    fn name(self) -> &'static str {
        match self {
            PrfTransformId::HmacSha256 => "PRF_HMAC_SHA2_256",
            PrfTransformId::HmacSha384 => "PRF_HMAC_SHA2_384",
            PrfTransformId::HmacSha512 => "PRF_HMAC_SHA2_512",
        }
    }
}

/// Transform ID for Integrity algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum IntegTransformId {
    /// HMAC-SHA2-256-128 (128-bit ICV)
    HmacSha256_128,
    /// HMAC-SHA2-384-192 (192-bit ICV)
    HmacSha384_192,
    /// HMAC-SHA2-512-256 (256-bit ICV)
    HmacSha512_256,
}

impl IntegTransformId {
    fn name(self) -> &'static str {
        match self {
            IntegTransformId::HmacSha256_128 => "HMAC_SHA2_256_128",
            IntegTransformId::HmacSha384_192 => "HMAC_SHA2_384_192",
            IntegTransformId::HmacSha512_256 => "HMAC_SHA2_512_256",
        }
    }
}

/// Transform ID for Diffie-Hellman groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DhTransformId {
    /// 2048-bit MODP Group
    Group14,
    /// 3072-bit MODP Group
    Group15,
    /// 256-bit random ECP group
    Group19,
    /// Curve25519
    Group31,
}

impl DhTransformId {
    fn name(self) -> &'static str {
        match self {
            DhTransformId::Group14 => "MODP_2048",
            DhTransformId::Group15 => "MODP_3072",
            DhTransformId::Group19 => "ECP_256",
            DhTransformId::Group31 => "CURVE_25519",
        }
    }
}

/// A single algorithm choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Transform {
    /// Encryption algorithm
    Encr(EncrTransformId),
    /// Pseudo-random function
    Prf(PrfTransformId),
    /// Integrity algorithm
    Integ(IntegTransformId),
    /// Diffie-Hellman group
    Dh(DhTransformId),
    /// Extended sequence numbers on/off
    Esn(bool),
}

impl Transform {
    /// Transform type of this transform
    pub fn transform_type(&self) -> TransformType {
        match self {
            Transform::Encr(_) => TransformType::Encr,
            Transform::Prf(_) => TransformType::Prf,
            Transform::Integ(_) => TransformType::Integ,
            Transform::Dh(_) => TransformType::Dh,
            Transform::Esn(_) => TransformType::Esn,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Encr(id) => f.write_str(id.name()),
            Transform::Prf(id) => f.write_str(id.name()),
            Transform::Integ(id) => f.write_str(id.name()),
            Transform::Dh(id) => f.write_str(id.name()),
            Transform::Esn(true) => f.write_str("ESN"),
            Transform::Esn(false) => f.write_str("NO_EXT_SEQ"),
        }
    }
}

/// Protocol ID for proposals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ProtocolId {
    /// IKE SA
    Ike,
    /// AH (Authentication Header)
    Ah,
    /// ESP (Encapsulating Security Payload)
    Esp,
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolId::Ike => f.write_str("IKE"),
            ProtocolId::Ah => f.write_str("AH"),
            ProtocolId::Esp => f.write_str("ESP"),
        }
    }
}

/// Configured proposal
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Proposal {
    /// Protocol ID (IKE, ESP, AH)
    pub protocol_id: ProtocolId,

    /// Acceptable transforms, in order of preference per type
    pub transforms: Vec<Transform>,
}

impl Proposal {
    /// Create empty proposal
    pub fn new(protocol_id: ProtocolId) -> Self {
        Proposal {
            protocol_id,
            transforms: Vec::new(),
        }
    }

    /// Add transform to proposal
    pub fn add_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Default proposal for a protocol.
    ///
    /// - IKE: AES-CBC / AES-GCM, HMAC-SHA2 PRFs and integrity, MODP-2048,
    ///   ECP-256 and Curve25519
    /// - ESP/AH: AES-GCM, AES-CBC with HMAC-SHA2-256, no ESN
    pub fn default_for(protocol_id: ProtocolId) -> Self {
        match protocol_id {
            ProtocolId::Ike => Proposal::new(ProtocolId::Ike)
                .add_transform(Transform::Encr(EncrTransformId::AesCbc128))
                .add_transform(Transform::Encr(EncrTransformId::AesCbc256))
                .add_transform(Transform::Encr(EncrTransformId::AesGcm128))
                .add_transform(Transform::Encr(EncrTransformId::AesGcm256))
                .add_transform(Transform::Integ(IntegTransformId::HmacSha256_128))
                .add_transform(Transform::Integ(IntegTransformId::HmacSha384_192))
                .add_transform(Transform::Prf(PrfTransformId::HmacSha256))
                .add_transform(Transform::Prf(PrfTransformId::HmacSha384))
                .add_transform(Transform::Dh(DhTransformId::Group31))
                .add_transform(Transform::Dh(DhTransformId::Group19))
                .add_transform(Transform::Dh(DhTransformId::Group14)),
            ProtocolId::Esp | ProtocolId::Ah => Proposal::new(protocol_id)
                .add_transform(Transform::Encr(EncrTransformId::AesGcm128))
                .add_transform(Transform::Encr(EncrTransformId::AesGcm256))
                .add_transform(Transform::Encr(EncrTransformId::AesCbc128))
                .add_transform(Transform::Integ(IntegTransformId::HmacSha256_128))
                .add_transform(Transform::Esn(false)),
        }
    }

    /// Get first transform of a type
    pub fn get_transform(&self, transform_type: TransformType) -> Option<&Transform> {
        self.transforms
            .iter()
            .find(|t| t.transform_type() == transform_type)
    }

    /// Whether the proposal contains at least one transform of a type
    pub fn has_transform(&self, transform_type: TransformType) -> bool {
        self.get_transform(transform_type).is_some()
    }
}

impl fmt::Display for Proposal {
    /// strongSwan-like notation, e.g. `ESP:AES_GCM_16_128/NO_EXT_SEQ`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.protocol_id)?;
        for (i, transform) in self.transforms.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", transform)?;
        }
        Ok(())
    }
}
