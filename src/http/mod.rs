//! HTTP protocol implementation.
//!
//! This module implements a static-file HTTP/1.1 server over non-persistent
//! connections: every connection carries exactly one request and is closed
//! after the response.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection handler implementing the state machine below
//! - **`parser`**: Reads a request off the socket byte by byte up to the end of headers
//! - **`request`**: The parsed request line
//! - **`response`**: Status codes and the response head (status line + headers)
//! - **`writer`**: Writes the head and streams file bodies to the client
//! - **`metadata`**: File size, modification time and HTTP date formatting
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← Read until the blank line ending the headers
//!        └──────┬───────────┘
//!               │ Request read            (idle timeout → Responding 408)
//!               ▼
//!        ┌──────────────────┐
//!        │     Routing      │ ← Validate and resolve under the document root
//!        └──────┬───────────┘
//!               │ 200 / 400 / 404 chosen
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← Write head, stream body, flush
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← Socket released (also on I/O error or cancellation)
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod metadata;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
