//! Fixtures for tests
use crate::parameters::OptimizationParameters;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn example_parameters() -> OptimizationParameters {
    crate::cli::example_parameters()
}
