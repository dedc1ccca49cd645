//! Version resolution layer
//!
//! Turns a module name (and, for text scanning, its source file) into a
//! [`VersionOutcome`](outcome::VersionOutcome).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ TextScanner │     │InProcessLoad│     │ Subprocess  │
//! │ (read line) │     │ (host load) │     │  (worker)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Expr     │     │ ModuleHost  │────▶│  Protocol   │
//! │ (evaluate)  │     │ + LoadWatch │     │ (one line)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`strategy`]: `VersionStrategy` trait and `StrategyKind` selection
//! - [`text_scan`]: static extraction of the first version line
//! - [`expr`]: restricted evaluator for that line
//! - [`in_process`]: load through the host with output suppressed
//! - [`subprocess`]: load in a worker process
//! - [`protocol`]: the worker's `okflag,value` line
//! - [`outcome`]: `VersionOutcome` and its failed/unknown/version status
//! - [`error`]: error types for evaluation, protocol and strategies

pub mod error;
pub mod expr;
pub mod in_process;
pub mod outcome;
pub mod protocol;
pub mod strategy;
pub mod subprocess;
pub mod text_scan;
