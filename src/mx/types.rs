/// One MX answer. Lower `priority` is preferred.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub priority: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(priority: u16, exchange: impl Into<String>) -> Self {
        Self {
            priority,
            exchange: exchange.into(),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MxStatus {
    Records(Vec<MxRecord>),
    NoRecords,
}

impl MxStatus {
    pub fn records(&self) -> &[MxRecord] {
        match self {
            Self::Records(records) => records.as_slice(),
            Self::NoRecords => &[],
        }
    }

    /// The record with the smallest priority; ties keep the first answer.
    pub fn preferred(&self) -> Option<&MxRecord> {
        self.records()
            .iter()
            .reduce(|best, next| if next.priority < best.priority { next } else { best })
    }
}

impl From<Vec<MxRecord>> for MxStatus {
    fn from(records: Vec<MxRecord>) -> Self {
        if records.is_empty() {
            Self::NoRecords
        } else {
            Self::Records(records)
        }
    }
}
