//! Connection profiles
//!
//! A profile fixes the IKE version and the ordered list of authentication
//! rounds each side performs. The mapping is a static table:
//!
//! ```text
//! Profile           Version  Rounds (side: method)
//! ikev2-pub         IKEv2    local: pubkey, remote: any
//! ikev2-eap         IKEv2    local: EAP,    remote: any
//! ikev2-pub-eap     IKEv2    local: pubkey, local: EAP,   remote: any
//! ikev1-pub         IKEv1    local: pubkey, remote: pubkey
//! ikev1-xauth       IKEv1    local: pubkey, local: XAuth, remote: pubkey
//! ikev1-xauth-psk   IKEv1    local: PSK,    local: XAuth, remote: PSK
//! ikev1-hybrid      IKEv1    local: XAuth,  remote: pubkey
//! ```
//!
//! Without an explicit profile, `ikev2-pub` is used when a private key was
//! supplied and `ikev2-eap` otherwise.

use super::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// IKE protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum IkeVersion {
    /// IKEv1 (RFC 2409)
    V1,
    /// IKEv2 (RFC 7296)
    V2,
}

impl fmt::Display for IkeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IkeVersion::V1 => write!(f, "IKEv1"),
            IkeVersion::V2 => write!(f, "IKEv2"),
        }
    }
}

/// Which end of the connection an entry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Side {
    /// This host
    Local,
    /// The peer
    Remote,
}

/// Authentication method class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AuthClass {
    /// Accept whatever the peer uses
    Any,
    /// Public key signature (RSA, ECDSA, ...)
    Pubkey,
    /// Pre-shared key
    Psk,
    /// Extensible Authentication Protocol
    Eap,
    /// IKEv1 Extended Authentication
    Xauth,
}

impl fmt::Display for AuthClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthClass::Any => "any",
            AuthClass::Pubkey => "public key",
            AuthClass::Psk => "pre-shared key",
            AuthClass::Eap => "EAP",
            AuthClass::Xauth => "XAuth",
        };
        f.write_str(name)
    }
}

/// One authentication round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthStep {
    /// Side performing the round
    pub side: Side,
    /// Method used in the round
    pub class: AuthClass,
}

const fn local(class: AuthClass) -> AuthStep {
    AuthStep {
        side: Side::Local,
        class,
    }
}

const fn remote(class: AuthClass) -> AuthStep {
    AuthStep {
        side: Side::Remote,
        class,
    }
}

const V2_PUB: &[AuthStep] = &[local(AuthClass::Pubkey), remote(AuthClass::Any)];
const V2_EAP: &[AuthStep] = &[local(AuthClass::Eap), remote(AuthClass::Any)];
const V2_PUB_EAP: &[AuthStep] = &[
    local(AuthClass::Pubkey),
    local(AuthClass::Eap),
    remote(AuthClass::Any),
];
const V1_PUB: &[AuthStep] = &[local(AuthClass::Pubkey), remote(AuthClass::Pubkey)];
const V1_XAUTH: &[AuthStep] = &[
    local(AuthClass::Pubkey),
    local(AuthClass::Xauth),
    remote(AuthClass::Pubkey),
];
const V1_XAUTH_PSK: &[AuthStep] = &[
    local(AuthClass::Psk),
    local(AuthClass::Xauth),
    remote(AuthClass::Psk),
];
const V1_HYBRID: &[AuthStep] = &[local(AuthClass::Xauth), remote(AuthClass::Pubkey)];

/// Connection profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Profile {
    /// No profile requested; inferred from credential presence
    #[default]
    Undefined,
    /// `ikev2-pub`
    V2Pub,
    /// `ikev2-eap`
    V2Eap,
    /// `ikev2-pub-eap`
    V2PubEap,
    /// `ikev1-pub`
    V1Pub,
    /// `ikev1-xauth`
    V1Xauth,
    /// `ikev1-xauth-psk`
    V1XauthPsk,
    /// `ikev1-hybrid`
    V1Hybrid,
}

impl Profile {
    /// Every named profile, in canonical order
    pub const NAMED: [Profile; 7] = [
        Profile::V2Pub,
        Profile::V2Eap,
        Profile::V2PubEap,
        Profile::V1Pub,
        Profile::V1Xauth,
        Profile::V1XauthPsk,
        Profile::V1Hybrid,
    ];

    /// Canonical name, `None` for [`Profile::Undefined`]
    pub fn name(self) -> Option<&'static str> {
        match self {
            Profile::Undefined => None,
            Profile::V2Pub => Some("ikev2-pub"),
            Profile::V2Eap => Some("ikev2-eap"),
            Profile::V2PubEap => Some("ikev2-pub-eap"),
            Profile::V1Pub => Some("ikev1-pub"),
            Profile::V1Xauth => Some("ikev1-xauth"),
            Profile::V1XauthPsk => Some("ikev1-xauth-psk"),
            Profile::V1Hybrid => Some("ikev1-hybrid"),
        }
    }

    /// Parse a canonical profile name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProfile`] for anything else.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::NAMED
            .into_iter()
            .find(|profile| profile.name() == Some(name))
            .ok_or_else(|| Error::UnknownProfile(name.to_string()))
    }

    /// IKE version; an undefined profile negotiates IKEv2
    pub fn version(self) -> IkeVersion {
        match self {
            Profile::Undefined | Profile::V2Pub | Profile::V2Eap | Profile::V2PubEap => {
                IkeVersion::V2
            }
            Profile::V1Pub | Profile::V1Xauth | Profile::V1XauthPsk | Profile::V1Hybrid => {
                IkeVersion::V1
            }
        }
    }

    /// Whether the profile authenticates with a local private key.
    ///
    /// This is a fixed set; new profiles do not join it implicitly.
    pub fn requires_credential(self) -> bool {
        matches!(
            self,
            Profile::V2Pub | Profile::V2PubEap | Profile::V1Pub | Profile::V1Xauth
        )
    }

    /// Ordered authentication rounds, `None` for [`Profile::Undefined`]
    pub fn auth_sequence(self) -> Option<&'static [AuthStep]> {
        match self {
            Profile::Undefined => None,
            Profile::V2Pub => Some(V2_PUB),
            Profile::V2Eap => Some(V2_EAP),
            Profile::V2PubEap => Some(V2_PUB_EAP),
            Profile::V1Pub => Some(V1_PUB),
            Profile::V1Xauth => Some(V1_XAUTH),
            Profile::V1XauthPsk => Some(V1_XAUTH_PSK),
            Profile::V1Hybrid => Some(V1_HYBRID),
        }
    }

    /// Replace [`Profile::Undefined`] by the default for the credential state.
    pub fn infer(self, key_seen: bool) -> Self {
        match self {
            Profile::Undefined if key_seen => Profile::V2Pub,
            Profile::Undefined => Profile::V2Eap,
            profile => profile,
        }
    }

    /// Infer, validate credential presence and look up the round table.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingCredential`] if the profile needs a private key and
    ///   `key_seen` is false
    /// - [`Error::UnknownProfile`] if no table entry exists
    pub fn resolve(self, key_seen: bool) -> Result<ResolvedProfile> {
        let profile = self.infer(key_seen);

        if profile.requires_credential() && !key_seen {
            return Err(Error::MissingCredential(profile));
        }

        let steps = profile
            .auth_sequence()
            .ok_or_else(|| Error::UnknownProfile(profile.to_string()))?;

        Ok(ResolvedProfile {
            profile,
            version: profile.version(),
            steps,
        })
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Profile::from_name(s)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("undefined"))
    }
}

/// Outcome of [`Profile::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedProfile {
    /// Profile after inference
    pub profile: Profile,
    /// IKE version to negotiate
    pub version: IkeVersion,
    /// Authentication rounds in emission order
    pub steps: &'static [AuthStep],
}
