//! Endpoint ids: sanitation and collision disambiguation

use std::collections::HashSet;

use crc::{Crc, CRC_32_ISO_HDLC};

/// Maximum endpoint id length accepted by the protocol
pub const MAX_ENDPOINT_ID_LEN: usize = 256;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

fn allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-=#;:?@&".contains(c)
}

/// Replace disallowed characters with `_` and cut to the maximum length
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if allowed(c) { c } else { '_' })
        .take(MAX_ENDPOINT_ID_LEN)
        .collect()
}

/// Hands out unique endpoint ids for one collection pass
#[derive(Debug, Default)]
pub struct EndpointIds {
    used: HashSet<String>,
}

impl EndpointIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitized id for `raw`; on collision a hash of `raw` is appended
    pub fn assign(&mut self, raw: &str) -> String {
        let id = sanitize(raw);
        if self.used.insert(id.clone()) {
            return id;
        }

        let mut salt = 0u32;
        loop {
            let mut digest = CRC32.digest();
            digest.update(raw.as_bytes());
            if salt > 0 {
                digest.update(&salt.to_le_bytes());
            }
            let suffix = format!("#{:08x}", digest.finalize());
            let keep = MAX_ENDPOINT_ID_LEN - suffix.len();
            let candidate: String = id.chars().take(keep).chain(suffix.chars()).collect();
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            salt += 1;
        }
    }
}
