use std::sync::Arc;

use crate::errors::Result;

pub mod handle;
pub mod source;

pub use handle::{DatasetHandle, ReloadOutcome, ReloadStatus};
pub use source::{DatasetSource, SqliteSource};

pub struct DatasetFactory;

impl DatasetFactory {
    /// Open the configured dataset with the SQLite source.
    pub async fn open() -> Result<Arc<DatasetHandle>> {
        let config = crate::config::get_config();
        let source: Arc<dyn DatasetSource> = Arc::new(SqliteSource);

        let handle = DatasetHandle::open(source, &config.dataset.path).await?;
        Ok(Arc::new(handle))
    }
}
