use std::time::SystemTime;

use http::HeaderValue;
use httpdate::HttpDate;

/// `Last-Modified`, kept at the one second precision of HTTP dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LastModified(pub(crate) HttpDate);

impl From<SystemTime> for LastModified {
    fn from(time: SystemTime) -> Self {
        LastModified(time.into())
    }
}

impl LastModified {
    pub(crate) fn to_header_value(self) -> HeaderValue {
        // IMF-fixdate is plain ASCII
        HeaderValue::from_str(&self.0.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct IfModifiedSince(HttpDate);

impl IfModifiedSince {
    /// Check if the supplied time means the resource has been modified.
    pub(crate) fn is_modified(&self, last_modified: &LastModified) -> bool {
        self.0 < last_modified.0
    }

    /// Returns `None` for anything that is not a valid HTTP date, the header is then ignored.
    pub(crate) fn from_header_value(value: &HeaderValue) -> Option<IfModifiedSince> {
        std::str::from_utf8(value.as_bytes())
            .ok()
            .and_then(|value| httpdate::parse_http_date(value).ok())
            .map(|time| IfModifiedSince(time.into()))
    }
}
