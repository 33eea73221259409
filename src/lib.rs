//! Driftwood - static file server over non-persistent HTTP/1.1 connections
//!
//! Core library for request parsing, response construction and the
//! connection lifecycle.

pub mod config;
pub mod http;
pub mod server;
