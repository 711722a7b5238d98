//! Record identifiers.
//!
//! On-device records use `local:<millis base36>-<random base36>`; records that
//! are addressable on the network use UUIDs (or 64-char hex event ids).

use chrono::Utc;
use uuid::Uuid;

const LOCAL_PREFIX: &str = "local:";
const RANDOM_LEN: usize = 7;

/// Where a new identifier will live
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdSource {
    Local,
    Nostr,
}

/// Generate a fresh identifier for the given source
pub fn generate_id(source: IdSource) -> String {
    match source {
        IdSource::Local => {
            let millis = Utc::now().timestamp_millis().max(0) as u128;
            let random = to_base36(Uuid::new_v4().as_u128());
            let suffix: String = random.chars().take(RANDOM_LEN).collect();
            format!("{}{}-{}", LOCAL_PREFIX, to_base36(millis), suffix)
        }
        IdSource::Nostr => Uuid::new_v4().to_string(),
    }
}

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_PREFIX)
}

/// True for UUIDs and 64-character hex event ids
pub fn is_nostr_id(id: &str) -> bool {
    if is_local_id(id) {
        return false;
    }
    Uuid::parse_str(id).is_ok()
        || (id.len() == 64 && id.chars().all(|c| c.is_ascii_hexdigit()))
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
