//! HTTP service layer for the SAE API server proxy.
//!
//! Serves the `saeapiservers` collection of `sae.alibaba-cloud.oam.dev/v1alpha1`
//! and the `proxy` sub-resource, which forwards a request to the SAE
//! endpoint a record names through the `VirtualServerProxy` RPC.
//!
//! The request pipeline:
//!
//! 1. [`escape::ProxyRequestEscaper`] renames reserved query keys on proxy
//!    requests (`dryRun` becomes `__dryRun`)
//! 2. [`router::resolve_route`] maps the path to a route
//! 3. collection and item routes are served by [`resource`]
//! 4. proxy routes resolve their record, [`connect`] a [`proxy::ProxyHandler`],
//!    and exchange one envelope through [`codec`]
//! 5. failures are rendered once by a [`responder::Responder`]

pub mod body;
pub mod codec;
pub mod connect;
pub mod escape;
pub mod proxy;
pub mod resource;
pub mod responder;
pub mod response;
pub mod router;
pub mod service;

pub use body::ProxyResponseBody;
pub use connect::{ApiServerProxy, SubResource};
pub use escape::{ProxyPathMatcher, ProxyRequestEscaper};
pub use proxy::ProxyHandler;
pub use responder::{Responder, StatusResponder};
pub use service::ProxyHttpService;
