//! Authentication middleware for the server
//!
//! Requires a Bearer token on every `/api/` request. The health check and the
//! index page stay public.

use axum::{
    body::Body,
    extract::Request,
    http::{header::AUTHORIZATION, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::Layer;

/// Authentication layer that validates Bearer tokens
#[derive(Clone)]
pub struct AuthLayer {
    token: Arc<String>,
}

impl AuthLayer {
    pub fn new(token: String) -> Self {
        Self {
            token: Arc::new(token),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            token: self.token.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    token: Arc<String>,
}

/// Whether the request carries `Authorization: Bearer <token>`
fn has_valid_token(req: &Request, token: &str) -> bool {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map_or(false, |provided| provided == token)
}

fn requires_auth(method: &Method, path: &str) -> bool {
    // CORS preflight never carries credentials
    *method != Method::OPTIONS && path.starts_with("/api/")
}

impl<S> tower::Service<Request> for AuthMiddleware<S>
where
    S: tower::Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let token = self.token.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !requires_auth(req.method(), req.uri().path()) || has_valid_token(&req, &token) {
                return inner.call(req).await;
            }

            log::debug!("Rejected unauthenticated request to {}", req.uri().path());
            Ok((
                StatusCode::UNAUTHORIZED,
                Body::from("Unauthorized: Invalid or missing Bearer token"),
            )
                .into_response())
        })
    }
}

/// Generate a random auth token
pub fn generate_auth_token() -> String {
    use rand::Rng;
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(&bytes)
}

mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: &[u8]) -> String {
        let mut result = String::with_capacity(bytes.len() * 2);
        for &byte in bytes {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0xf) as usize] as char);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, path: &str, auth: Option<&str>) -> Request {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_generate_auth_token() {
        let token = generate_auth_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_auth_token());
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex::encode(&[0x00, 0xff, 0xab]), "00ffab");
    }

    #[test]
    fn test_only_api_paths_require_auth() {
        assert!(requires_auth(&Method::POST, "/api/invoke"));
        assert!(requires_auth(&Method::GET, "/api/version"));
        assert!(!requires_auth(&Method::OPTIONS, "/api/invoke"));
        assert!(!requires_auth(&Method::GET, "/health"));
        assert!(!requires_auth(&Method::GET, "/"));
    }

    #[test]
    fn test_bearer_token_check() {
        let token = "abc123";
        assert!(has_valid_token(
            &request(Method::POST, "/api/invoke", Some("Bearer abc123")),
            token
        ));
        assert!(!has_valid_token(
            &request(Method::POST, "/api/invoke", Some("Bearer wrong")),
            token
        ));
        assert!(!has_valid_token(
            &request(Method::POST, "/api/invoke", Some("abc123")),
            token
        ));
        assert!(!has_valid_token(&request(Method::POST, "/api/invoke", None), token));
    }
}
