//! Disables client and proxy caching on every response.

use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use http::HeaderValue;
use tower::layer::util::{Identity, Stack};
use tower::{Layer, ServiceBuilder};
use tower_http::set_header::{SetResponseHeader, SetResponseHeaderLayer};

pub const CACHE_CONTROL_VALUE: &str = "no-cache, no-store, must-revalidate";
pub const PRAGMA_VALUE: &str = "no-cache";
pub const EXPIRES_VALUE: &str = "0";

/// `S` wrapped so that every response carries the three cache-busting headers.
pub type NoCache<S> = SetResponseHeader<
    SetResponseHeader<SetResponseHeader<S, HeaderValue>, HeaderValue>,
    HeaderValue,
>;

type NoCacheLayer = Stack<
    SetResponseHeaderLayer<HeaderValue>,
    Stack<
        SetResponseHeaderLayer<HeaderValue>,
        Stack<SetResponseHeaderLayer<HeaderValue>, Identity>,
    >,
>;

fn no_cache_layer() -> NoCacheLayer {
    ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            EXPIRES,
            HeaderValue::from_static(EXPIRES_VALUE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            PRAGMA,
            HeaderValue::from_static(PRAGMA_VALUE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_VALUE),
        ))
        .into_inner()
}

/// Wraps `service` so that `Cache-Control`, `Pragma` and `Expires` forbid caching on every
/// response it produces, whatever the status.
///
/// Values already set by `service` are replaced.
pub fn no_cache<S>(service: S) -> NoCache<S> {
    no_cache_layer().layer(service)
}
