//! Principal supplied by the upstream authentication layer.
//!
//! Credentials are verified before requests reach this service; the
//! resulting identity arrives in trusted headers.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};

use crate::domain::{Error, Principal, Role};

/// Authenticated user identifier.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Role of the authenticated user.
pub const USER_ROLE_HEADER: &str = "x-user-role";
/// Contractor owning the authenticated user.
pub const CONTRACTOR_ID_HEADER: &str = "x-contractor-id";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn principal_from(req: &HttpRequest) -> Result<Principal, Error> {
    let id = header(req, USER_ID_HEADER).ok_or_else(|| Error::unauthorized("login required"))?;
    let role = Role::parse_lenient(header(req, USER_ROLE_HEADER));
    let contractor = header(req, CONTRACTOR_ID_HEADER).map(str::to_owned);
    Ok(Principal::new(id, role, contractor))
}

impl FromRequest for Principal {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(principal_from(req))
    }
}
