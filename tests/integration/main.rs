//! End-to-end authentication flows over the in-memory stores.

mod common;

mod concurrency;
mod login_flow;
mod reset_flow;
