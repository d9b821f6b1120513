use std::path::Path;

use tracing::{debug, info};

use super::{HelperError, Session};
use crate::galaxy::GalaxyApi;

impl<A: GalaxyApi> Session<A> {
    /// Upload each file into the history, in order. The first failure aborts the rest.
    pub fn put<P: AsRef<Path>>(&self, files: &[P], file_type: &str) -> Result<(), HelperError> {
        for file in files {
            let path = file.as_ref();
            info!(
                history = %self.history_id,
                localpath = %path.display(),
                ft = file_type,
                "uploading"
            );
            let receipt = self.api.upload_file(&self.history_id, path, file_type)?;
            let outputs: Vec<&str> = receipt.outputs.iter().map(|o| o.id.as_str()).collect();
            debug!(localpath = %path.display(), ?outputs, "upload submitted");
        }
        Ok(())
    }
}
