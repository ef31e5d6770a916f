pub mod audit;
pub mod payments;
pub mod reporting;
pub mod schedule;
