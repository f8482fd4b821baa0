use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::Couple;
use crate::utils;

/// Fingerprint computed by a remote client and sent in for matching,
/// bypassing the local analysis pipeline. Addresses travel as decimal
/// strings because JSON object keys are strings.
///
/// ```json
/// { "fingerprint": { "123456789": 2040, "987654321": 2070 } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FingerprintPayload {
    pub fingerprint: HashMap<String, u32>,
}

impl FingerprintPayload {
    /// Converts the payload into the address map the matcher consumes.
    /// The couples carry a throwaway probe ID; it never reaches the store.
    pub fn into_fingerprint(self) -> Result<HashMap<u32, Couple>> {
        let probe_id = utils::generate_unique_id();
        let mut fingerprint = HashMap::with_capacity(self.fingerprint.len());
        for (address, anchor_time_ms) in self.fingerprint {
            let address: u32 = address.parse().map_err(|_| {
                Error::invalid_input(format!("malformed fingerprint address: {:?}", address))
            })?;
            fingerprint.insert(
                address,
                Couple {
                    anchor_time_ms,
                    song_id: probe_id,
                },
            );
        }
        Ok(fingerprint)
    }
}
