use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliSinkMode {
    /// Signed HTTP delivery to the ingestion endpoint.
    Http,
    /// Direct writes to a local SQLite database.
    Sqlite,
}

impl CliSinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Sqlite => "sqlite",
        }
    }
}
