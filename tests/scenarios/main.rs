//! Scenario-based tests for the scraper graphs

mod helpers;

mod concurrency;
mod failures;
mod last_names;
mod retries;
mod routing;
