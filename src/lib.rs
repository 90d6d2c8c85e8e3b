//! Client-side building blocks for talking to beanstalkd-compatible job
//! queue servers: wire types, a reply parser, line/chunk framing, a
//! sequential request/response connection, and the multi-step admin
//! operations built on top of it.

pub mod client;
pub mod line_reader;
pub mod ops;
pub mod parser;
pub mod types;
pub mod util;
