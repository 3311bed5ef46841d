//! The authenticated caller, handed to handlers as a typed argument.

use crate::error::ApiError;
use crate::user::BridgeUser;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::fmt;
use std::sync::Arc;

/// The user a request acts for, resolved by the credential gate.
#[derive(Clone)]
pub struct Caller(pub Arc<dyn BridgeUser>);

impl Caller {
    pub fn user(&self) -> &dyn BridgeUser {
        self.0.as_ref()
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Caller").field(&self.0.mxid()).finish()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when the gate ran and accepted the request.
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or(ApiError::Authorization)
    }
}
