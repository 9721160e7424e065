// rest_api/src/extract.rs

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use models::medical::{PublicUser, Role};
use models::DocumentId;
use security::{require_permission, Permission};

use crate::error::RestApiError;
use crate::state::AppState;

/// JSON body whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(RestApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(RestApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(RestApiError))]
pub struct ApiQuery<T>(pub T);

/// The authenticated account behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: DocumentId,
    pub role: Role,
    pub user: PublicUser,
}

impl CurrentUser {
    pub fn require(&self, permission: Permission) -> Result<(), RestApiError> {
        Ok(require_permission(self.role, permission)?)
    }
}

/// Reads the session token from the `Authorization: Bearer` header, or from
/// the `access_token` query parameter for clients such as `EventSource` that
/// cannot set headers.
fn session_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        return value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }
    parts.uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "access_token" && !value.is_empty()).then(|| value.to_string())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = RestApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts).ok_or(RestApiError::MissingToken)?;
        let account = state.users.authenticate(&token).await?;
        Ok(CurrentUser {
            id: account.id.clone(),
            role: account.record.role,
            user: PublicUser::from(&account),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn token_from_header_or_query() {
        assert_eq!(session_token(&parts("/x", Some("Bearer abc.def"))), Some("abc.def".to_string()));
        assert_eq!(session_token(&parts("/x", Some("Basic abc"))), None);
        assert_eq!(
            session_token(&parts("/x?a=1&access_token=tok", None)),
            Some("tok".to_string())
        );
        assert_eq!(session_token(&parts("/x", None)), None);
    }
}
