//! Page request and paginated envelope primitives.
//!
//! Search endpoints page through results with a zero-based page index and a
//! page size. [`PageLimits`] fills in defaults for omitted values and rejects
//! sizes outside the configured bounds; [`Paginated`] carries one page of
//! items together with the un-paged total so clients can render page
//! controls.
//!
//! # Example
//!
//! ```
//! use pagination::{PageLimits, Paginated};
//!
//! let limits = PageLimits::new(20, 100).expect("valid limits");
//! let request = limits.fill(Some(2), None);
//! assert_eq!(request.offset(), 40);
//! assert!(limits.check(&request).is_ok());
//!
//! let page = Paginated::new(vec!["a", "b"], 42, request);
//! assert_eq!(page.total_pages(), 3);
//! ```

mod envelope;
mod request;

pub use envelope::Paginated;
pub use request::{PageError, PageLimits, PageRequest};
