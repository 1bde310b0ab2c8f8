//! Query settings loaded via OrthoConfig.

use ortho_config::OrthoConfig;
use pagination::{PageError, PageLimits};
use serde::Deserialize;

/// Paging defaults applied to searches.
///
/// Values come from CLI flags, `QUERY_*` environment variables or a config
/// file, falling back to 20 and 100.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "QUERY")]
pub struct QuerySettings {
    /// Page size used when a search omits one.
    #[ortho_config(default = 20)]
    pub default_page_size: u32,
    /// Largest page size a search may request.
    #[ortho_config(default = 100)]
    pub max_page_size: u32,
}

impl QuerySettings {
    /// Validated paging limits.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidLimits`] when the default size is zero or
    /// exceeds the maximum.
    pub fn page_limits(&self) -> Result<PageLimits, PageError> {
        PageLimits::new(self.default_page_size, self.max_page_size)
    }
}
