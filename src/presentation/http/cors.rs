use std::sync::Arc;

use poem::{
    Endpoint, IntoResponse, Middleware, Request, Response, http::StatusCode, http::header,
    middleware::Cors,
};
use tracing::warn;
use url::Url;

/// Hosts allowed to call the API. Each entry also admits its subdomains, and
/// an entry with a port only matches that port.
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    domains: Arc<Vec<String>>,
}

impl AllowedOrigins {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self {
            domains: Arc::new(domains),
        }
    }

    pub fn permits(&self, origin: &str) -> bool {
        let Ok(url) = Url::parse(origin) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") || url.path() != "/" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        self.domains.iter().any(|domain| {
            authority == *domain
                || authority
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    pub fn cors(&self) -> Cors {
        let allowed = self.clone();
        Cors::new()
            .allow_origins_fn(move |origin| allowed.permits(origin))
            .allow_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allow_credentials(true)
    }
}

/// Rejects requests whose `Origin` header is missing or not allow-listed.
pub struct OriginGuard {
    allowed: AllowedOrigins,
}

impl OriginGuard {
    pub fn new(allowed: AllowedOrigins) -> Self {
        Self { allowed }
    }
}

impl<E: Endpoint> Middleware<E> for OriginGuard {
    type Output = OriginGuardEndpoint<E>;

    fn transform(&self, inner: E) -> Self::Output {
        OriginGuardEndpoint {
            inner,
            allowed: self.allowed.clone(),
        }
    }
}

pub struct OriginGuardEndpoint<E> {
    inner: E,
    allowed: AllowedOrigins,
}

impl<E: Endpoint> Endpoint for OriginGuardEndpoint<E> {
    type Output = Response;

    async fn call(&self, req: Request) -> poem::Result<Self::Output> {
        let origin = req
            .headers()
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok());

        match origin {
            Some(origin) if self.allowed.permits(origin) => {
                self.inner.call(req).await.map(IntoResponse::into_response)
            }
            _ => {
                warn!(origin = ?origin, path = %req.uri().path(), "blocked by origin policy");
                Ok(Response::builder()
                    .status(StatusCode::FORBIDDEN)
                    .content_type("application/json")
                    .body(
                        serde_json::json!({
                            "status": "error",
                            "message": "Not allowed by CORS",
                            "error": null,
                        })
                        .to_string(),
                    ))
            }
        }
    }
}
