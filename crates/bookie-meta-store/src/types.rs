//! Stored types for ledger metadata.
//!
//! Records are prost-encoded (protobuf wire format) so that fields can
//! be added without rewriting existing entries.

use prost::Message;

/// Length of an encoded ledger key
pub const LEDGER_KEY_LEN: usize = 8;

/// Per-ledger metadata record
#[derive(Clone, PartialEq, Eq, Message)]
pub struct LedgerRecord {
    /// Always true for a stored record
    #[prost(bool, tag = "1")]
    pub exists: bool,
    /// Ledger accepts no further writes
    #[prost(bool, tag = "2")]
    pub fenced: bool,
    /// Write-once authorization token, empty when unset
    #[prost(bytes = "vec", tag = "3")]
    pub master_key: Vec<u8>,
    /// Last explicit LAC, an 8-byte big-endian long
    #[prost(bytes = "vec", optional, tag = "4")]
    pub explicit_lac: Option<Vec<u8>>,
    /// Ledger is being recovered
    #[prost(bool, tag = "5")]
    pub limbo: bool,
}

impl LedgerRecord {
    /// Create a record for a new, unfenced ledger
    #[must_use]
    pub fn new(master_key: impl Into<Vec<u8>>) -> Self {
        Self {
            exists: true,
            master_key: master_key.into(),
            ..Default::default()
        }
    }

    /// Set the fenced flag
    #[must_use]
    pub const fn with_fenced(mut self, fenced: bool) -> Self {
        self.fenced = fenced;
        self
    }

    /// Set the limbo flag
    #[must_use]
    pub const fn with_limbo(mut self, limbo: bool) -> Self {
        self.limbo = limbo;
        self
    }

    /// Set the explicit LAC from an entry id
    #[must_use]
    pub fn with_explicit_lac(mut self, lac: i64) -> Self {
        self.explicit_lac = Some(lac.to_be_bytes().to_vec());
        self
    }

    /// Decode the explicit LAC payload, if set and well-formed
    #[must_use]
    pub fn explicit_lac_value(&self) -> Option<i64> {
        let bytes: [u8; 8] = self.explicit_lac.as_deref()?.try_into().ok()?;
        Some(i64::from_be_bytes(bytes))
    }

    /// Encode to bytes
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Decode from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, prost::DecodeError> {
        Self::decode(data)
    }
}

/// Encode a ledger id as its store key
#[must_use]
pub const fn ledger_key(ledger_id: i64) -> [u8; LEDGER_KEY_LEN] {
    ledger_id.to_be_bytes()
}

/// Decode a store key back to a ledger id
#[must_use]
pub fn ledger_id_from_key(key: &[u8]) -> Option<i64> {
    let bytes: [u8; LEDGER_KEY_LEN] = key.try_into().ok()?;
    Some(i64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let record = LedgerRecord::new(b"secret".to_vec())
            .with_fenced(true)
            .with_explicit_lac(123);

        let decoded = LedgerRecord::from_bytes(&record.to_bytes()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.explicit_lac_value(), Some(123));
        assert!(!decoded.limbo);
    }

    #[test]
    fn test_empty_record_defaults() {
        let decoded = LedgerRecord::from_bytes(&[]).unwrap();
        assert!(!decoded.exists);
        assert!(decoded.master_key.is_empty());
        assert_eq!(decoded.explicit_lac, None);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(LedgerRecord::from_bytes(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_malformed_lac_payload() {
        let mut record = LedgerRecord::new(Vec::new());
        record.explicit_lac = Some(vec![1, 2, 3]);
        assert_eq!(record.explicit_lac_value(), None);
    }

    #[test]
    fn test_key_ordering_is_big_endian() {
        assert_eq!(ledger_key(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(ledger_key(1) < ledger_key(256));
        assert_eq!(ledger_id_from_key(&ledger_key(42)), Some(42));
        assert_eq!(ledger_id_from_key(&ledger_key(-1)), Some(-1));
        assert_eq!(ledger_id_from_key(b"short"), None);
    }
}
