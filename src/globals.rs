use crate::configuration::Configuration;
use once_cell::sync::Lazy;
use std::sync::Arc;

static CONFIGURATION: Lazy<Arc<Configuration>> = Lazy::new(|| Arc::new(Configuration::new()));

/// The process-wide configuration used by [`Target::named`].
///
/// [`Target::named`]: crate::target::Target::named
pub fn configuration() -> Arc<Configuration> {
    Arc::clone(&CONFIGURATION)
}
