//! `test-utils` is used for testing in `courier-lib`.
//! This crate does not depend on `courier-lib`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Poll a condition until it holds, yielding to the runtime in between.
///
/// Scheduling happens on other tasks, so assertions about dispatcher state
/// after a completion have to wait for it to settle.
///
/// # Panic
///
/// Panics if the condition does not hold within five seconds (or the given timeout)
#[macro_export]
macro_rules! wait_until {
    ($condition:expr $(,)?) => {
        $crate::wait_until!($condition, std::time::Duration::from_secs(5))
    };
    ($condition:expr, $timeout:expr $(,)?) => {{
        let deadline = tokio::time::Instant::now() + $timeout;
        while !$condition {
            assert!(
                tokio::time::Instant::now() < deadline,
                "Condition `{}` did not hold in time",
                stringify!($condition)
            );
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }};
}
