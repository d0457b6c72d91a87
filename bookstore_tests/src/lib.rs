//! End to end tests running against a deployed bookstore service.
//! Enabled with the `system_tests` feature, the service url defaults to http://127.0.0.1:8080
//! and can be changed with `BOOKSTORE_URL`.
