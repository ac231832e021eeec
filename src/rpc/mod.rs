//! JSON-RPC surface of the proxy.
//!
//! - [`codec`]: `Content-Length` framing over a byte stream
//! - [`protocol`]: JSON-RPC 2.0 request/response envelopes and error codes
//! - [`handlers`]: [`ProxyService`], the four operations and method dispatch
//! - [`server`]: [`RpcServer`], the TCP accept loop
//! - [`client`]: [`ProxyClient`], a typed client for the same protocol

pub mod client;
pub mod codec;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use client::{ClientError, ProxyClient};
pub use codec::{CodecError, JsonRpcCodec};
pub use handlers::{Method, ProxyService};
pub use protocol::{Request, Response, RpcError};
pub use server::{RpcServer, serve_connection};
