//! Page request defaults and bounds checking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a page request falls outside the configured limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// The page size is zero.
    #[error("page size must be at least 1")]
    ZeroSize,
    /// The page size exceeds the configured maximum.
    #[error("page size {size} exceeds the maximum of {max}")]
    SizeTooLarge {
        /// Requested page size.
        size: u32,
        /// Configured maximum page size.
        max: u32,
    },
    /// The limits themselves are inconsistent.
    #[error("default page size {default_size} must be between 1 and {max_size}")]
    InvalidLimits {
        /// Configured default page size.
        default_size: u32,
        /// Configured maximum page size.
        max_size: u32,
    },
}

/// A zero-based page index and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Create a request without applying any limits.
    #[must_use]
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Zero-based page index.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of items per page.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of items to skip (`page * size`).
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64).saturating_mul(self.size as u64)
    }

    /// Maximum number of items to return.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.size as u64
    }
}

/// Default and maximum page sizes.
///
/// ## Invariants
/// - `1 <= default_size <= max_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    default_size: u32,
    max_size: u32,
}

impl PageLimits {
    /// Build limits, rejecting a default outside `1..=max_size`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidLimits`] when the default page size is zero
    /// or larger than the maximum.
    pub const fn new(default_size: u32, max_size: u32) -> Result<Self, PageError> {
        if default_size == 0 || default_size > max_size {
            return Err(PageError::InvalidLimits {
                default_size,
                max_size,
            });
        }
        Ok(Self {
            default_size,
            max_size,
        })
    }

    /// Page size used when the caller omits one.
    #[must_use]
    pub const fn default_size(&self) -> u32 {
        self.default_size
    }

    /// Largest accepted page size.
    #[must_use]
    pub const fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Fill omitted values: page defaults to `0`, size to the default size.
    ///
    /// Explicit values are kept as given; use [`PageLimits::check`] to
    /// validate them.
    #[must_use]
    pub fn fill(&self, page: Option<u32>, size: Option<u32>) -> PageRequest {
        PageRequest {
            page: page.unwrap_or(0),
            size: size.unwrap_or(self.default_size),
        }
    }

    /// Validate a request against these limits.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::ZeroSize`] or [`PageError::SizeTooLarge`].
    pub const fn check(&self, request: &PageRequest) -> Result<(), PageError> {
        if request.size == 0 {
            return Err(PageError::ZeroSize);
        }
        if request.size > self.max_size {
            return Err(PageError::SizeTooLarge {
                size: request.size,
                max: self.max_size,
            });
        }
        Ok(())
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn fill_applies_defaults_for_missing_values() {
        let limits = PageLimits::default();
        let request = limits.fill(None, None);
        assert_eq!(request, PageRequest::new(0, 20));
    }

    #[rstest]
    fn fill_keeps_explicit_values() {
        let limits = PageLimits::default();
        let request = limits.fill(Some(3), Some(500));
        assert_eq!(request.page(), 3);
        assert_eq!(request.size(), 500);
    }

    #[rstest]
    #[case(0, Err(PageError::ZeroSize))]
    #[case(1, Ok(()))]
    #[case(100, Ok(()))]
    #[case(101, Err(PageError::SizeTooLarge { size: 101, max: 100 }))]
    fn check_enforces_bounds(#[case] size: u32, #[case] expected: Result<(), PageError>) {
        let limits = PageLimits::default();
        assert_eq!(limits.check(&PageRequest::new(0, size)), expected);
    }

    #[rstest]
    #[case(0, 10)]
    #[case(11, 10)]
    fn new_rejects_inconsistent_limits(#[case] default_size: u32, #[case] max_size: u32) {
        assert_eq!(
            PageLimits::new(default_size, max_size),
            Err(PageError::InvalidLimits {
                default_size,
                max_size
            })
        );
    }

    #[rstest]
    fn offset_multiplies_page_by_size() {
        assert_eq!(PageRequest::new(4, 25).offset(), 100);
        assert_eq!(PageRequest::new(4, 25).limit(), 25);
    }

    #[rstest]
    fn offset_fits_the_largest_page_request() {
        let request = PageRequest::new(u32::MAX, u32::MAX);
        assert_eq!(request.offset(), u64::from(u32::MAX) * u64::from(u32::MAX));
    }
}
