//! Request router.
//!
//! Every served path lives under `/apis/<group>/<version>`:
//!
//! ```text
//! /apis/<g>/<v>                                  discovery
//! /apis/<g>/<v>/saeapiservers                    collection
//! /apis/<g>/<v>/saeapiservers/<name>             item
//! /apis/<g>/<v>/saeapiservers/<name>/proxy[/..]  proxy sub-resource
//! ```

use saeproxy_model::api;
use saeproxy_model::error::{ProxyError, ProxyResult};

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `APIResourceList` of the served group version.
    Discovery,
    /// The `saeapiservers` collection.
    Collection,
    /// A named record.
    Item(String),
    /// A sub-resource of a named record.
    SubResource {
        /// Record name.
        name: String,
        /// Sub-resource name, e.g. `proxy`.
        subresource: String,
        /// Remainder of the path after the sub-resource, starting with `/`.
        sub_path: Option<String>,
    },
}

/// Resolve the route of `path`.
pub fn resolve_route(path: &str) -> ProxyResult<Route> {
    let prefix = format!("{}/{}/{}", api::API_GROUP_PREFIX, api::GROUP, api::VERSION);
    let rest = path
        .strip_prefix(&prefix)
        .ok_or_else(|| ProxyError::route_not_found(path))?;

    if rest.is_empty() || rest == "/" {
        return Ok(Route::Discovery);
    }

    let rest = rest
        .strip_prefix('/')
        .and_then(|r| r.strip_prefix(api::RESOURCE))
        .ok_or_else(|| ProxyError::route_not_found(path))?;
    if rest.is_empty() || rest == "/" {
        return Ok(Route::Collection);
    }
    let rest = rest
        .strip_prefix('/')
        .ok_or_else(|| ProxyError::route_not_found(path))?;

    let (name, rest) = rest.split_once('/').unwrap_or((rest, ""));
    if name.is_empty() {
        return Err(ProxyError::route_not_found(path));
    }
    if rest.is_empty() {
        return Ok(Route::Item(name.to_owned()));
    }

    let (subresource, sub_path) = match rest.find('/') {
        Some(i) => (&rest[..i], Some(rest[i..].to_owned())),
        None => (rest, None),
    };
    Ok(Route::SubResource {
        name: name.to_owned(),
        subresource: subresource.to_owned(),
        sub_path,
    })
}
