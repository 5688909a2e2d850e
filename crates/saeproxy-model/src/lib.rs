//! Model types for the SAE API server proxy.
//!
//! This crate holds everything that crosses a crate boundary without behavior
//! attached to it:
//!
//! - [`types`] - the `SAEAPIServer` resource, its list, the backing secret and
//!   the Kubernetes-style `Status` / discovery documents
//! - [`envelope`] - the JSON request/response envelopes exchanged with the
//!   `VirtualServerProxy` RPC
//! - [`error`] - the error taxonomy shared by every layer
//! - [`table`] - `meta.k8s.io/v1` table rendering for command-line clients
//! - [`api`] - group/version/resource constants and path helpers

pub mod api;
pub mod envelope;
pub mod error;
pub mod table;
pub mod types;

pub use envelope::{ProxyInput, ProxyOutput};
pub use error::{ProxyError, ProxyErrorCode, ProxyResult};
pub use table::{Table, ToTable};
pub use types::{ApiServer, ApiServerList, ApiServerSpec, ObjectMeta, ProxyOptions, Secret};
