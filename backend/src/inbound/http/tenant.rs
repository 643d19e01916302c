//! Tenant candidates carried by a request.
//!
//! The header and query parameter are read by the extractor; handlers that
//! accept a body pass its `city` field to [`RequestTenant::resolve`].

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::{Ready, ready};
use serde::Deserialize;

use crate::domain::{Error, TENANT_FIELD, Tenant, TenantCandidates, TenantPolicy};

/// Header naming the tenant.
pub const TENANT_HEADER: &str = "x-city";

#[derive(Deserialize)]
struct TenantParam {
    city: Option<String>,
}

/// Raw tenant values from the request line and headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTenant {
    header: Option<String>,
    query: Option<String>,
}

impl RequestTenant {
    /// Gather the candidates present on `req`.
    ///
    /// Unreadable headers and query strings count as absent.
    pub fn from_request_parts(req: &HttpRequest) -> Self {
        let header = req
            .headers()
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let query = web::Query::<TenantParam>::from_query(req.query_string())
            .ok()
            .and_then(|param| param.into_inner().city);
        Self { header, query }
    }

    /// Resolve against `policy`, consulting `body` after the header and
    /// query parameter.
    pub fn resolve(&self, policy: &TenantPolicy, body: Option<&str>) -> Tenant {
        policy.resolve(&TenantCandidates {
            header: self.header.as_deref(),
            query: self.query.as_deref(),
            body,
        })
    }
}

/// The tenant field of a JSON body, when it is a string.
pub fn body_tenant(body: &serde_json::Map<String, serde_json::Value>) -> Option<&str> {
    body.get(TENANT_FIELD).and_then(serde_json::Value::as_str)
}

impl FromRequest for RequestTenant {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self::from_request_parts(req)))
    }
}
