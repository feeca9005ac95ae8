//! End-to-end tests at the search engine level.
//!
//! Each test file covers a specific scenario, using deterministic inputs
//! (seeded random directories where volume matters) to verify the complete
//! annotate, build and walk cycle.

#![cfg(test)]

mod helpers;

mod test_and_driver;
mod test_cursor_properties;
mod test_equality_index;
mod test_not_scan;
mod test_one_level_scope;
mod test_optimizer_properties;
mod test_substring_scan;
