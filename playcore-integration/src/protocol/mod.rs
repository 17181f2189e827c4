/// Http REST request/response framework, shared by every Bybit REST call the execution and
/// data crates make.
pub mod http;
