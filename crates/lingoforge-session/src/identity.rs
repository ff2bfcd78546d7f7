//! Server-generated identifiers.

use lingoforge_protocol::{HostKey, PlayerId, RoomCode};
use rand::Rng;

/// Characters used in room codes. `I`, `O`, `0` and `1` are left out so
/// codes survive being read aloud in a classroom.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Random lowercase hex with `bytes * 8` bits of entropy.
fn random_hex(bytes: usize) -> String {
    let mut rng = rand::rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}

/// A secret host key: 128 random bits as 32 hex characters.
pub fn generate_host_key() -> HostKey {
    HostKey::new(random_hex(16))
}

/// An opaque, unguessable player id.
pub fn generate_player_id() -> PlayerId {
    PlayerId::new(format!("p_{}", random_hex(8)))
}

/// A random room code of `len` characters, clamped to the allowed range.
pub fn generate_room_code(len: usize) -> RoomCode {
    let len = len.clamp(RoomCode::MIN_LEN, RoomCode::MAX_LEN);
    let mut rng = rand::rng();
    let code: String = (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    RoomCode::new(code)
}
