//! Hub (CIE) identity derivation
//!
//! The verified- and unverified-write enrollment strategies need the hub's
//! 8-byte IEEE address to write into the device's `CieAddress` attribute.
//! Hubs expose that address in wildly different shapes — a raw byte buffer,
//! a colon-separated hex string, or a partially mangled string with stray
//! separators — so derivation is deliberately forgiving: strip everything
//! that is not a hex digit, take the first 16 hex characters, and reverse
//! the byte pairs into the little-endian order the wire expects.

use crate::{Error, Result};

/// An 8-byte CIE (hub) IEEE address in wire (little-endian) byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CieAddress([u8; 8]);

impl CieAddress {
    /// Wrap raw wire-order bytes without transformation
    #[must_use]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Wire-order bytes of this address
    #[must_use]
    pub fn as_bytes(&self) -> [u8; 8] {
        self.0
    }

    /// Whether this is the all-zero (unenrolled) address
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 8]
    }

    /// Derive an address from a textual hub identity.
    ///
    /// Cleans non-hex characters, takes the first 16 hex characters, splits
    /// them into byte pairs and reverses the pair order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when fewer than 16 hex characters remain
    /// after cleaning.
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned: String = text
            .chars()
            .filter(char::is_ascii_hexdigit)
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if cleaned.len() < 16 {
            return Err(Error::Config(format!(
                "hub identity has {} hex characters, need 16: {text:?}",
                cleaned.len()
            )));
        }

        let decoded = hex::decode(&cleaned[..16])
            .map_err(|e| Error::Config(format!("hub identity not decodable: {e}")))?;

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&decoded);
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for CieAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Hub identity as supplied by the platform at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubIdentity {
    /// A raw 8-byte IEEE address already in wire order
    Raw([u8; 8]),
    /// A textual address (colon-separated or bare hex)
    Text(String),
}

impl HubIdentity {
    /// Derive the wire-order CIE address from this identity.
    ///
    /// Raw bytes pass through unchanged; text goes through
    /// [`CieAddress::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the textual form does not contain a
    /// full address.
    pub fn derive(&self) -> Result<CieAddress> {
        match self {
            Self::Raw(bytes) => Ok(CieAddress::from_bytes(*bytes)),
            Self::Text(text) => CieAddress::parse(text),
        }
    }
}
