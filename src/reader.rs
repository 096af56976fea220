//! Patient record intake for the batch shell

use crate::error::Result;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::info;

/// Reads newline-delimited patient records from a file or stdin
pub struct RecordReader {
    source: Option<PathBuf>,
}

impl RecordReader {
    /// Create a reader for a file path, or stdin when `None`
    pub fn from_path(source: Option<PathBuf>) -> Self {
        Self { source }
    }

    /// Open the source and return a line reader
    pub async fn lines(&self) -> Result<Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>> {
        let reader: Box<dyn AsyncRead + Send + Unpin> = match &self.source {
            Some(path) => {
                let file = File::open(path).await?;
                info!(path = %path.display(), "Reading patient records");
                Box::new(file)
            }
            None => {
                info!("Reading patient records from stdin");
                Box::new(tokio::io::stdin())
            }
        };
        Ok(BufReader::new(reader).lines())
    }
}
