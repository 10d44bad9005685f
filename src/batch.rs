//! Grouping of addresses by domain and by MX, then chunking into the batches
//! probed by a single SMTP session.

use std::collections::BTreeMap;

use crate::address::Address;

/// Addresses sharing one exchange, probed over one SMTP session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeBatch {
    pub mx: String,
    pub addresses: Vec<Address>,
}

impl ProbeBatch {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Every batch targeting one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxGroup {
    pub exchange: String,
    pub batches: Vec<ProbeBatch>,
}

impl MxGroup {
    pub fn address_count(&self) -> usize {
        self.batches.iter().map(ProbeBatch::len).sum()
    }
}

/// Domain → addresses, in input order within each domain.
pub(crate) fn group_by_domain(addresses: Vec<Address>) -> BTreeMap<String, Vec<Address>> {
    let mut groups: BTreeMap<String, Vec<Address>> = BTreeMap::new();
    for address in addresses {
        groups
            .entry(address.domain().to_string())
            .or_default()
            .push(address);
    }
    groups
}

/// Flattens the addresses of every domain mapped to an exchange and splits
/// them into batches of at most `batch_size`.
pub(crate) fn build_groups(
    by_domain: &BTreeMap<String, Vec<Address>>,
    by_exchange: &BTreeMap<String, Vec<String>>,
    batch_size: usize,
) -> Vec<MxGroup> {
    let batch_size = batch_size.max(1);
    by_exchange
        .iter()
        .map(|(exchange, domains)| {
            let flattened: Vec<Address> = domains
                .iter()
                .filter_map(|domain| by_domain.get(domain))
                .flatten()
                .cloned()
                .collect();
            let batches = flattened
                .chunks(batch_size)
                .map(|chunk| ProbeBatch {
                    mx: exchange.clone(),
                    addresses: chunk.to_vec(),
                })
                .collect();
            MxGroup {
                exchange: exchange.clone(),
                batches,
            }
        })
        .filter(|group| !group.batches.is_empty())
        .collect()
}
