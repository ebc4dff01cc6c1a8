use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::message::PeerId;

/// Generates a fresh peer identifier: 16 bytes from a cryptographically
/// strong source, URL-safe base64 encoded (22 characters, no `=` padding
/// since 16 bytes encodes exactly).
///
/// Pure with respect to the caller -- no shared state -- and safe to call
/// from any thread.
#[must_use]
pub fn new_peer_id() -> PeerId {
    let mut bytes = [0_u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn peer_id_has_expected_shape() {
        let id = new_peer_id();
        assert_eq!(id.len(), 22);
        assert!(id.is_ascii());
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn peer_ids_do_not_collide() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(new_peer_id()), "peer id collision");
        }
    }
}
