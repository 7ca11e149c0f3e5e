//! End-to-end tests against local mock OAuth and streaming servers.

mod common;
mod init_logging;
mod session;
