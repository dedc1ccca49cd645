//! Shared test utilities

#![allow(dead_code)]

mod fixture;
mod host;

pub use fixture::ModuleTree;
pub use host::FakeHost;

use modvers::driver::{Driver, Plan, Request, RunSummary};
use modvers::module::SearchPath;
use modvers::version::strategy::VersionStrategy;

/// Build a plan from module names and the display flags
pub fn plan(modules: &[&str], always_name: bool, show_file: bool) -> Plan {
    Request {
        modules: modules.iter().map(|m| m.to_string()).collect(),
        always_name,
        show_file,
        ..Request::default()
    }
    .plan()
    .unwrap()
}

/// Plan covering every module on the search path
pub fn plan_all(show_file: bool) -> Plan {
    Request {
        all: true,
        show_file,
        ..Request::default()
    }
    .plan()
    .unwrap()
}

/// Run `plan` and return (stdout, diagnostics, summary)
pub async fn run(
    search_path: &SearchPath,
    strategy: &dyn VersionStrategy,
    plan: &Plan,
) -> (String, String, RunSummary) {
    let mut out = Vec::new();
    let mut diag = Vec::new();
    let summary = Driver::new(search_path, strategy)
        .run(plan, &mut out, &mut diag)
        .await
        .unwrap();

    (
        String::from_utf8(out).unwrap(),
        String::from_utf8(diag).unwrap(),
        summary,
    )
}
