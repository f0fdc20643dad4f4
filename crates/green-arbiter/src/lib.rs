//! Scores cloud regions on latency, grid carbon and cost, and turns the scores into a
//! referee-style verdict with a greener alternative where one exists.

pub mod analysis;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod report;
pub mod scoring;
pub mod telemetry;
pub mod verdict;

pub use evaluator::{EvaluationError, Evaluator, HealthSnapshot};
