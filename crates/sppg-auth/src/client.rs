//! Authorized request middleware
//!
//! Wraps the transport so that every backend call carries the session's
//! bearer token and survives one access-token expiry. Retry bookkeeping is
//! local to each `send` call; the caller's request value is never mutated.

use sppg_api::{endpoints, ApiRequest, ApiResponse, AUTHORIZATION};

use crate::error::AuthError;
use crate::manager::SessionManager;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Replayed,
}

#[derive(Clone)]
pub struct AuthorizedClient {
    session: SessionManager,
}

impl AuthorizedClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// Send `request` to the backend.
    ///
    /// A 401 on anything but login/refresh triggers one refresh; on success
    /// the request is replayed once with the new token. If the session cannot
    /// be refreshed it is cleared and `AuthError::Unauthenticated` is returned.
    /// Any other status is handed back to the caller untouched.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut outgoing = request;
        // Session token attached here; `None` for caller-supplied credentials
        let session_token = if outgoing.has_header(AUTHORIZATION) {
            None
        } else {
            let token = self.session.get_access_token()?;
            if let Some(token) = &token {
                outgoing.set_header(AUTHORIZATION, format!("Bearer {token}"));
            }
            token
        };

        let retryable = !endpoints::is_credential_exchange(&outgoing.path);
        let mut attempt = Attempt::First;

        loop {
            let response = self.session.transport().send(outgoing.clone()).await?;

            if !response.is_unauthorized() || !retryable || attempt == Attempt::Replayed {
                return Ok(response);
            }

            tracing::debug!(path = %outgoing.path, "Access token rejected; refreshing");

            match self.session.refresh_after(session_token.as_deref()).await? {
                Some(token) => {
                    outgoing.set_header(AUTHORIZATION, format!("Bearer {token}"));
                    attempt = Attempt::Replayed;
                }
                None => {
                    tracing::info!(path = %outgoing.path, "Session expired");
                    return Err(AuthError::Unauthenticated);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::keys;
    use crate::testing::{manager_with, ok, sample_user_json, status, MockTransport};
    use serde_json::json;
    use sppg_storage::KeyValueStore;

    fn login_response() -> std::result::Result<ApiResponse, sppg_api::TransportError> {
        ok(json!({
            "success": true,
            "token": "t1",
            "refreshToken": "r1",
            "user": sample_user_json()
        }))
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            endpoints::LOGIN => login_response(),
            _ => ok(json!({ "success": true, "data": [] })),
        });
        let (manager, _db) = manager_with(transport.clone());
        manager.login("admin1", "correct-pass").await.unwrap();

        let response = manager
            .client()
            .send(ApiRequest::get("/schools"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        let requests = transport.requests();
        assert_eq!(requests[1].header_value(AUTHORIZATION), Some("Bearer t1"));
    }

    #[tokio::test]
    async fn test_explicit_authorization_header_is_kept() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            endpoints::LOGIN => login_response(),
            _ => ok(json!({ "success": true })),
        });
        let (manager, _db) = manager_with(transport.clone());
        manager.login("admin1", "correct-pass").await.unwrap();

        manager
            .client()
            .send(ApiRequest::get("/reports").bearer("scoped-token"))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[1].header_value(AUTHORIZATION),
            Some("Bearer scoped-token")
        );
    }

    #[tokio::test]
    async fn test_401_refreshes_and_replays_once() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            endpoints::LOGIN => login_response(),
            endpoints::REFRESH => ok(json!({ "success": true, "token": "t2", "refreshToken": "r2" })),
            "/menus" if req.header_value(AUTHORIZATION) == Some("Bearer t2") => {
                ok(json!({ "success": true, "data": ["nasi"] }))
            }
            _ => status(401, json!({ "success": false, "error": "Token expired" })),
        });
        let (manager, _db) = manager_with(transport.clone());
        manager.login("admin1", "correct-pass").await.unwrap();

        let request = ApiRequest::get("/menus");
        let response = manager.client().send(request.clone()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.calls_to(endpoints::REFRESH), 1);
        assert_eq!(transport.calls_to("/menus"), 2);

        let replay = transport.requests().pop().unwrap();
        assert_eq!(replay.header_value(AUTHORIZATION), Some("Bearer t2"));
        assert_eq!(manager.get_access_token().unwrap().as_deref(), Some("t2"));

        // The caller's request value is untouched
        assert!(!request.has_header(AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_caller_token_401_still_refreshes() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            endpoints::LOGIN => login_response(),
            endpoints::REFRESH => ok(json!({ "success": true, "token": "t2", "refreshToken": "r2" })),
            _ if req.header_value(AUTHORIZATION) == Some("Bearer t2") => ok(json!({ "success": true })),
            _ => status(401, json!({ "success": false, "error": "Token expired" })),
        });
        let (manager, _db) = manager_with(transport.clone());
        manager.login("admin1", "correct-pass").await.unwrap();

        let response = manager
            .client()
            .send(ApiRequest::get("/reports").bearer("scoped"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.calls_to(endpoints::REFRESH), 1);
        let replay = transport.requests().pop().unwrap();
        assert_eq!(replay.header_value(AUTHORIZATION), Some("Bearer t2"));
    }

    #[tokio::test]
    async fn test_request_before_initialize_refreshes_stored_session() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            endpoints::REFRESH => ok(json!({ "success": true, "token": "t2", "refreshToken": "r2" })),
            _ if req.header_value(AUTHORIZATION) == Some("Bearer t2") => ok(json!({ "success": true })),
            _ => status(401, json!({ "success": false, "error": "Token expired" })),
        });
        let (manager, db) = manager_with(transport.clone());
        let user = sample_user_json().to_string();
        db.set_many(&[
            (keys::TOKEN, "expired"),
            (keys::REFRESH_TOKEN, "r1"),
            (keys::USER, user.as_str()),
        ])
        .unwrap();

        let response = manager
            .client()
            .send(ApiRequest::get("/schools"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.calls_to(endpoints::REFRESH), 1);
        let refresh = transport
            .requests()
            .into_iter()
            .find(|r| r.path == endpoints::REFRESH)
            .unwrap();
        assert_eq!(refresh.body.unwrap()["refreshToken"], "r1");
        assert_eq!(db.get(keys::TOKEN).unwrap().as_deref(), Some("t2"));
        assert_eq!(db.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("r2"));

        manager.initialize().await.unwrap();
        assert!(manager.is_authenticated());
        assert_eq!(manager.current_user().unwrap().username, "admin1");
    }

    #[tokio::test]
    async fn test_second_401_is_returned_without_another_refresh() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            endpoints::LOGIN => login_response(),
            endpoints::REFRESH => ok(json!({ "success": true, "token": "t2" })),
            _ => status(401, json!({ "success": false, "error": "Forbidden for this role" })),
        });
        let (manager, _db) = manager_with(transport.clone());
        manager.login("admin1", "correct-pass").await.unwrap();

        let response = manager
            .client()
            .send(ApiRequest::get("/users"))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.calls_to(endpoints::REFRESH), 1);
        assert_eq!(transport.calls_to("/users"), 2);
        // Refresh tokens are kept when the backend does not rotate them
        assert_eq!(manager.refresh_token().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_session() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            endpoints::LOGIN => login_response(),
            endpoints::REFRESH => status(401, json!({ "success": false, "error": "Refresh token expired" })),
            _ => status(401, json!({ "success": false, "error": "Token expired" })),
        });
        let (manager, _db) = manager_with(transport.clone());
        manager.login("admin1", "correct-pass").await.unwrap();

        let result = manager.client().send(ApiRequest::get("/schools")).await;

        assert!(matches!(result, Err(AuthError::Unauthenticated)));
        assert!(!manager.is_authenticated());
        assert!(manager.session().is_empty());
    }

    #[tokio::test]
    async fn test_login_401_is_not_refreshed() {
        let transport = MockTransport::new(|_| {
            status(401, json!({ "success": false, "error": "Invalid credentials" }))
        });
        let (manager, _db) = manager_with(transport.clone());

        let response = manager
            .client()
            .send(
                ApiRequest::post(endpoints::LOGIN)
                    .json(&json!({ "username": "a" }))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.calls_to(endpoints::REFRESH), 0);
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            endpoints::LOGIN => login_response(),
            endpoints::REFRESH => ok(json!({ "success": true, "token": "t2", "refreshToken": "r2" })),
            _ if req.header_value(AUTHORIZATION) == Some("Bearer t2") => ok(json!({ "success": true })),
            _ => status(401, json!({ "success": false, "error": "Token expired" })),
        });
        let (manager, _db) = manager_with(transport.clone());
        manager.login("admin1", "correct-pass").await.unwrap();

        let client = manager.client();
        let (a, b, c) = tokio::join!(
            client.send(ApiRequest::get("/schools")),
            client.send(ApiRequest::get("/menus")),
            client.send(ApiRequest::get("/deliveries")),
        );

        assert_eq!(a.unwrap().status, 200);
        assert_eq!(b.unwrap().status, 200);
        assert_eq!(c.unwrap().status, 200);
        assert_eq!(transport.calls_to(endpoints::REFRESH), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_connectivity_error() {
        let (manager, _db) = manager_with(MockTransport::offline());

        let result = manager.client().send(ApiRequest::get("/schools")).await;

        assert!(matches!(result, Err(AuthError::Connectivity(_))));
    }
}
