//! Standard APIs we use everywhere.

pub use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
pub use tracing::{debug, error, info, instrument, trace, warn};

pub use crate::error::{LaylaError, Result};
