use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address `{address}` must contain an '@'")]
    MissingAt { address: String },
    #[error("address `{address}` is malformed: {}", reasons.join("; "))]
    Malformed {
        address: String,
        reasons: Vec<String>,
    },
}

impl AddressError {
    pub(crate) fn malformed(address: &str, reasons: Vec<String>) -> Self {
        Self::Malformed {
            address: address.to_string(),
            reasons,
        }
    }
}
