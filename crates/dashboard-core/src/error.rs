use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    Calculation(String),

    #[error("Export error: {0}")]
    Export(String),
}
