//! Test utilities for the crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`,
//! through the `test-support` feature): a sample contact entity with its
//! flow and registry, plus a fixed clock.

mod clock;
mod contacts;

pub use clock::{fixture_clock, fixture_timestamp, FixtureClock};
pub use contacts::{
    contact_registry, Company, Contact, ContactFlow, NewContact, BLOCKED_EMAIL_DOMAIN,
};
