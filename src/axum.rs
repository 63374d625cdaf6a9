//! Axum integration utilities.

use std::fmt;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::Error;
use crate::manager::RoleReader;

use ::axum::body::Body;
use ::axum::http::{Request, StatusCode};
use ::axum::response::{IntoResponse, Response};
use ::tower::{Layer, Service};

/// Name of the authenticated principal (its email), stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalName(String);

impl PrincipalName {
    /// Wraps a principal name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middleware layer that only lets through principals holding a role.
pub struct RequireRoleLayer<M: ?Sized> {
    manager: Arc<M>,
    role: Arc<str>,
}

impl<M: ?Sized> RequireRoleLayer<M> {
    /// Creates a layer requiring `role`.
    pub fn new(manager: Arc<M>, role: impl Into<String>) -> Self {
        Self {
            manager,
            role: Arc::from(role.into()),
        }
    }
}

impl<M: ?Sized> Clone for RequireRoleLayer<M> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            role: self.role.clone(),
        }
    }
}

impl<M: ?Sized> fmt::Debug for RequireRoleLayer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequireRoleLayer")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl<M, Inner> Layer<Inner> for RequireRoleLayer<M>
where
    M: RoleReader + ?Sized,
{
    type Service = RequireRoleService<Inner, M>;

    fn layer(&self, inner: Inner) -> Self::Service {
        RequireRoleService {
            inner,
            manager: self.manager.clone(),
            role: self.role.clone(),
        }
    }
}

/// Middleware service produced by [`RequireRoleLayer`].
pub struct RequireRoleService<Inner, M: ?Sized> {
    inner: Inner,
    manager: Arc<M>,
    role: Arc<str>,
}

impl<Inner: Clone, M: ?Sized> Clone for RequireRoleService<Inner, M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            manager: self.manager.clone(),
            role: self.role.clone(),
        }
    }
}

impl<Inner, M> Service<Request<Body>> for RequireRoleService<Inner, M>
where
    Inner: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Inner::Future: Send + 'static,
    M: RoleReader + ?Sized + 'static,
{
    type Response = Response;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let manager = self.manager.clone();
        let role = self.role.clone();

        Box::pin(async move {
            let principal = req.extensions().get::<PrincipalName>().cloned();
            let Some(principal) = principal else {
                return Ok((StatusCode::UNAUTHORIZED, "missing principal").into_response());
            };

            match manager.has_link(principal.as_str(), &role, &[]).await {
                Ok(true) => {
                    poll_fn(|cx| inner.poll_ready(cx)).await?;
                    inner.call(req).await
                }
                Ok(false) | Err(Error::UnknownPrincipal(_)) => {
                    Ok((StatusCode::FORBIDDEN, "forbidden").into_response())
                }
                Err(err) => {
                    tracing::warn!(
                        principal = %principal,
                        role = %role,
                        error = %err,
                        "role check failed"
                    );
                    Ok((StatusCode::INTERNAL_SERVER_ERROR, "role check failed").into_response())
                }
            }
        })
    }
}

#[cfg(feature = "axum-jwt")]
pub mod jwt {
    use std::fmt;
    use std::future::poll_fn;
    use std::marker::PhantomData;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use jsonwebtoken::{DecodingKey, Validation, decode};
    use serde::de::DeserializeOwned;
    use thiserror::Error;

    use crate::axum::PrincipalName;

    use ::axum::body::Body;
    use ::axum::extract::FromRequestParts;
    use ::axum::http::header::AUTHORIZATION;
    use ::axum::http::request::Parts;
    use ::axum::http::{HeaderMap, Request, StatusCode};
    use ::axum::response::{IntoResponse, Response};
    use ::tower::{Layer, Service};

    /// Errors returned while authenticating a bearer token.
    #[derive(Debug, Error)]
    pub enum AuthError {
        /// Authorization header is missing.
        #[error("missing authorization header")]
        MissingAuthorization,
        /// Authorization header is not `Bearer <token>`.
        #[error("invalid authorization header")]
        InvalidAuthorization,
        /// Signature or standard claim validation failed.
        #[error("invalid token")]
        InvalidToken,
        /// The token carries no principal name.
        #[error("token has no principal name claim")]
        MissingPrincipal,
    }

    impl IntoResponse for AuthError {
        fn into_response(self) -> Response {
            (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
        }
    }

    /// Claims that name the principal used for role lookups.
    pub trait PrincipalClaims: DeserializeOwned + Send + Sync + Clone + 'static {
        /// Returns the principal name, normally the email address.
        fn principal_name(&self) -> Option<&str>;
    }

    /// Default claims shape: the `email` claim names the principal.
    #[derive(Debug, Clone, serde::Deserialize)]
    pub struct EmailClaims {
        /// Principal email.
        pub email: Option<String>,
        /// Standard JWT subject.
        pub sub: Option<String>,
        /// Standard JWT expiration.
        pub exp: Option<usize>,
    }

    impl PrincipalClaims for EmailClaims {
        fn principal_name(&self) -> Option<&str> {
            self.email.as_deref().filter(|email| !email.trim().is_empty())
        }
    }

    /// Token decoding settings.
    #[derive(Clone)]
    pub struct JwtAuthState<C: PrincipalClaims> {
        decoding_key: Arc<DecodingKey>,
        validation: Validation,
        _marker: PhantomData<fn() -> C>,
    }

    impl<C: PrincipalClaims> fmt::Debug for JwtAuthState<C> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("JwtAuthState")
                .field("decoding_key", &"<redacted>")
                .field("validation", &self.validation)
                .finish()
        }
    }

    impl<C: PrincipalClaims> JwtAuthState<C> {
        /// Creates decoding settings.
        pub fn new(decoding_key: DecodingKey, validation: Validation) -> Self {
            Self {
                decoding_key: Arc::new(decoding_key),
                validation,
                _marker: PhantomData,
            }
        }

        fn authenticate(&self, headers: &HeaderMap) -> Result<JwtPrincipal<C>, AuthError> {
            let token = bearer_token(headers)?;
            let data = decode::<C>(token, &self.decoding_key, &self.validation)
                .map_err(|_| AuthError::InvalidToken)?;
            let name = data
                .claims
                .principal_name()
                .ok_or(AuthError::MissingPrincipal)?;
            Ok(JwtPrincipal {
                principal: PrincipalName::new(name),
                claims: data.claims,
            })
        }
    }

    /// Gives extractors access to [`JwtAuthState`].
    pub trait JwtAuthProvider<C: PrincipalClaims> {
        /// Returns the decoding settings.
        fn jwt_auth(&self) -> &JwtAuthState<C>;
    }

    /// Authenticated principal plus the decoded claims.
    #[derive(Debug, Clone)]
    pub struct JwtPrincipal<C: PrincipalClaims> {
        /// Principal name taken from the claims.
        pub principal: PrincipalName,
        /// Full claims.
        pub claims: C,
    }

    impl<S, C> FromRequestParts<S> for JwtPrincipal<C>
    where
        S: Send + Sync + JwtAuthProvider<C>,
        C: PrincipalClaims,
    {
        type Rejection = AuthError;

        async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
            if let Some(existing) = parts.extensions.get::<JwtPrincipal<C>>() {
                return Ok(existing.clone());
            }
            let auth = state.jwt_auth().authenticate(&parts.headers)?;
            parts.extensions.insert(auth.clone());
            parts.extensions.insert(auth.principal.clone());
            Ok(auth)
        }
    }

    /// Middleware layer that authenticates the bearer token and inserts
    /// [`PrincipalName`] for [`RequireRoleLayer`](crate::axum::RequireRoleLayer).
    #[derive(Debug, Clone)]
    pub struct JwtAuthLayer<C: PrincipalClaims> {
        state: Arc<JwtAuthState<C>>,
    }

    impl<C: PrincipalClaims> JwtAuthLayer<C> {
        /// Creates the layer.
        pub fn new(state: JwtAuthState<C>) -> Self {
            Self {
                state: Arc::new(state),
            }
        }
    }

    impl<S, C> Layer<S> for JwtAuthLayer<C>
    where
        C: PrincipalClaims,
    {
        type Service = JwtAuthService<S, C>;

        fn layer(&self, inner: S) -> Self::Service {
            JwtAuthService {
                inner,
                state: self.state.clone(),
            }
        }
    }

    /// Middleware service produced by [`JwtAuthLayer`].
    #[derive(Debug, Clone)]
    pub struct JwtAuthService<S, C: PrincipalClaims> {
        inner: S,
        state: Arc<JwtAuthState<C>>,
    }

    impl<S, C> Service<Request<Body>> for JwtAuthService<S, C>
    where
        S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
        S::Future: Send + 'static,
        C: PrincipalClaims,
    {
        type Response = Response;
        type Error = S::Error;
        type Future =
            Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, mut req: Request<Body>) -> Self::Future {
            let state = self.state.clone();
            let mut inner = self.inner.clone();

            Box::pin(async move {
                match state.authenticate(req.headers()) {
                    Ok(auth) => {
                        req.extensions_mut().insert(auth.principal.clone());
                        req.extensions_mut().insert(auth);
                        poll_fn(|cx| inner.poll_ready(cx)).await?;
                        inner.call(req).await
                    }
                    Err(err) => Ok(err.into_response()),
                }
            })
        }
    }

    fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthorization)?;
        match value.strip_prefix("Bearer ") {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(AuthError::InvalidAuthorization),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use ::axum::http::HeaderValue;
        use futures::executor::block_on;
        use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
        use std::convert::Infallible;
        use std::future::{Ready, ready};
        use std::sync::Mutex;

        const SECRET: &[u8] = b"role-manager-test-secret";

        #[derive(serde::Serialize)]
        struct IssuedClaims<'a> {
            email: &'a str,
            sub: &'a str,
            exp: usize,
        }

        fn issue(secret: &[u8], email: &str) -> String {
            let claims = IssuedClaims {
                email,
                sub: "auth0|u1",
                exp: 4_102_444_800,
            };
            encode(
                &Header::new(Algorithm::HS256),
                &claims,
                &EncodingKey::from_secret(secret),
            )
            .unwrap()
        }

        fn auth_state() -> JwtAuthState<EmailClaims> {
            JwtAuthState::new(
                DecodingKey::from_secret(SECRET),
                Validation::new(Algorithm::HS256),
            )
        }

        fn bearer_request(token: &str) -> Request<Body> {
            Request::builder()
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        }

        /// Inner service that remembers which principal reached it.
        #[derive(Clone, Default)]
        struct SeenPrincipal {
            seen: Arc<Mutex<Option<PrincipalName>>>,
        }

        impl Service<Request<Body>> for SeenPrincipal {
            type Response = Response;
            type Error = Infallible;
            type Future = Ready<Result<Response, Infallible>>;

            fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
                Poll::Ready(Ok(()))
            }

            fn call(&mut self, req: Request<Body>) -> Self::Future {
                *self.seen.lock().unwrap() = req.extensions().get::<PrincipalName>().cloned();
                ready(Ok(StatusCode::OK.into_response()))
            }
        }

        #[test]
        fn jwt_layer_should_pass_email_principal_to_inner_service() {
            let inner = SeenPrincipal::default();
            let mut service = JwtAuthLayer::new(auth_state()).layer(inner.clone());

            let token = issue(SECRET, "alice@example.com");
            let response = block_on(service.call(bearer_request(&token))).unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                inner.seen.lock().unwrap().clone(),
                Some(PrincipalName::new("alice@example.com"))
            );
        }

        #[test]
        fn jwt_layer_should_reject_token_signed_with_other_key() {
            let inner = SeenPrincipal::default();
            let mut service = JwtAuthLayer::new(auth_state()).layer(inner.clone());

            let token = issue(b"some-other-secret", "alice@example.com");
            let response = block_on(service.call(bearer_request(&token))).unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(inner.seen.lock().unwrap().is_none());
        }

        struct AppState {
            jwt: JwtAuthState<EmailClaims>,
        }

        impl JwtAuthProvider<EmailClaims> for AppState {
            fn jwt_auth(&self) -> &JwtAuthState<EmailClaims> {
                &self.jwt
            }
        }

        #[test]
        fn jwt_extractor_should_expose_principal_and_claims() {
            let state = AppState { jwt: auth_state() };
            let token = issue(SECRET, "bob@example.com");
            let (mut parts, _body) = bearer_request(&token).into_parts();

            let auth = block_on(JwtPrincipal::<EmailClaims>::from_request_parts(
                &mut parts, &state,
            ))
            .unwrap();

            assert_eq!(auth.principal.as_str(), "bob@example.com");
            assert_eq!(auth.claims.sub.as_deref(), Some("auth0|u1"));
            assert_eq!(
                parts.extensions.get::<PrincipalName>(),
                Some(&PrincipalName::new("bob@example.com"))
            );
        }

        #[test]
        fn bearer_token_requires_scheme_and_value() {
            let mut headers = HeaderMap::new();
            assert!(matches!(
                bearer_token(&headers),
                Err(AuthError::MissingAuthorization)
            ));

            headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
            assert!(matches!(
                bearer_token(&headers),
                Err(AuthError::InvalidAuthorization)
            ));

            headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
            assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
        }

        #[test]
        fn email_claims_ignore_blank_email() {
            let claims = EmailClaims {
                email: Some("  ".to_string()),
                sub: None,
                exp: None,
            };
            assert!(claims.principal_name().is_none());
        }
    }
}
