use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("source cannot be resolved: {0}")]
    InvalidSource(String),

    #[error("malformed progress record: {0}")]
    Protocol(String),

    #[error("transfer stalled: no progress for {cycles} consecutive polls and the reference endpoint is unreachable")]
    SoftStall { cycles: u32 },

    #[error("transfer stalled: no progress for {cycles} consecutive polls")]
    HardStall { cycles: u32 },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// True for either stall variant, regardless of which threshold fired.
    pub fn is_stall(&self) -> bool {
        matches!(
            self,
            TrackerError::SoftStall { .. } | TrackerError::HardStall { .. }
        )
    }
}
