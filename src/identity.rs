//! Instance identity: alias and MAC address.

use rand_core::{OsRng, RngCore};

use crate::error::MacpineError;

const ADJECTIVES: &[&str] = &[
    "able", "amber", "ample", "azure", "bold", "brave", "brisk", "calm", "clever", "cosmic",
    "crisp", "dapper", "eager", "fancy", "fleet", "gentle", "golden", "happy", "hidden", "jolly",
    "keen", "lively", "lucky", "mellow", "merry", "misty", "nimble", "noble", "polar", "proud",
    "quiet", "rapid", "rustic", "shiny", "silent", "snowy", "solid", "sunny", "swift", "tidy",
    "vivid", "wise",
];

const NOUNS: &[&str] = &[
    "alpaca", "badger", "beacon", "birch", "canyon", "cedar", "comet", "coyote", "crane", "delta",
    "falcon", "fjord", "forest", "gecko", "glacier", "harbor", "heron", "island", "lagoon",
    "lynx", "maple", "meadow", "otter", "panda", "pebble", "pine", "quartz", "raven", "reef",
    "ridge", "river", "sparrow", "summit", "tundra", "valley", "walrus", "willow", "yak",
];

/// Random draws before giving up on finding a free alias.
const MAX_ALIAS_ATTEMPTS: usize = 10_000;

/// Resolve the alias for a new instance.
///
/// A requested name must not already exist. Without one, random
/// `adjective-noun` aliases are drawn until one is free, up to
/// [`MAX_ALIAS_ATTEMPTS`] times.
pub fn resolve_alias(requested: &str, existing: &[String]) -> Result<String, MacpineError> {
    resolve_alias_with(requested, existing, &mut OsRng)
}

pub fn resolve_alias_with(
    requested: &str,
    existing: &[String],
    rng: &mut impl RngCore,
) -> Result<String, MacpineError> {
    if !requested.is_empty() {
        if existing.iter().any(|n| n == requested) {
            return Err(MacpineError::AliasExists {
                alias: requested.to_string(),
            });
        }
        return Ok(requested.to_string());
    }

    for _ in 0..MAX_ALIAS_ATTEMPTS {
        let candidate = random_alias(rng);
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
        tracing::debug!(candidate = %candidate, "generated alias already taken, retrying");
    }
    Err(MacpineError::validation(
        "name",
        format!("no free generated name after {MAX_ALIAS_ATTEMPTS} attempts, pass one with --name"),
    ))
}

fn random_alias(rng: &mut impl RngCore) -> String {
    let adjective = ADJECTIVES[rng.next_u32() as usize % ADJECTIVES.len()];
    let noun = NOUNS[rng.next_u32() as usize % NOUNS.len()];
    format!("{adjective}-{noun}")
}

/// Random locally administered, unicast MAC address.
///
/// Not checked against other instances on the host.
pub fn generate_mac_address() -> String {
    generate_mac_address_with(&mut OsRng)
}

pub fn generate_mac_address_with(rng: &mut impl RngCore) -> String {
    let mut bytes = [0u8; 6];
    rng.fill_bytes(&mut bytes);
    bytes[0] = (bytes[0] | 0x02) & !0x01;
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
