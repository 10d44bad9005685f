use rand::{Rng, distributions::Alphanumeric};

use crate::address::Address;

pub(crate) fn random_local_part(len: usize) -> String {
    let length = len.clamp(6, 32);
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

/// Recipient that almost certainly does not exist on the server of `first`:
/// a random prefix glued to its local part, capped at 64 characters.
pub(crate) fn bogus_recipient(first: &Address) -> String {
    let mut local = random_local_part(12);
    local.extend(
        first
            .local_part()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
            .take(64 - 12),
    );
    let mut collapsed = String::with_capacity(local.len());
    for c in local.trim_end_matches('.').chars() {
        if c == '.' && collapsed.ends_with('.') {
            continue;
        }
        collapsed.push(c);
    }
    format!("{collapsed}@{}", first.domain())
}
