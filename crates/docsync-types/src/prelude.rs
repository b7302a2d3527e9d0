pub use crate::error::{DocResult, Error};
pub use crate::model::{AuthToken, ClientId, DocName, ErrorEntry, PutOutcome, EMPTY_DOC};
pub use tracing::{debug, error, info, warn};

// vim: ts=4
