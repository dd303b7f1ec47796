use std::time::Duration;

use crate::{backend::Backend, util::Logger};

/// The context stores everything a session needs to run statements.
pub struct QueryContext {
    pub backend: Box<dyn Backend>,
    pub logger: Logger,
    /// Deadline applied to calls that do not bring their own.
    pub statement_timeout: Duration,
}
