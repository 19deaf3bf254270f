//! A regression test for the "desalination" example
mod regression;
use regression::run_regression_test;

#[test]
fn test_regression_desalination() {
    run_regression_test("desalination")
}
