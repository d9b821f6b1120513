use super::{HelperError, Session};
use crate::galaxy::{ContentItem, GalaxyApi};

impl<A: GalaxyApi> Session<A> {
    /// Visible contents of the history, in server order.
    pub fn user_history(&self) -> Result<Vec<ContentItem>, HelperError> {
        Ok(self.api.history_contents(&self.history_id, true)?)
    }
}
