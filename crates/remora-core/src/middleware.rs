//! Middleware trait and chain

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::fmt;
use std::sync::Arc;

/// Body type alias
pub type Body = Full<Bytes>;

/// Middleware trait for request/response processing
#[async_trait]
pub trait Middleware: Send + Sync + fmt::Debug {
    /// Process a request, delegating to `next` for the rest of the chain
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>>;
}

/// Type alias for the final handler function at the end of the chain
pub type HandlerFn = Box<
    dyn Fn(
            Request<Body>,
        )
            -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response<Body>>> + Send>>
        + Send
        + Sync,
>;

/// Represents the next middleware/handler in the chain
pub struct Next {
    stack: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    final_handler: Option<Arc<HandlerFn>>,
}

impl Next {
    /// Create a new chain cursor over a middleware stack
    pub fn new(stack: Arc<[Arc<dyn Middleware>]>) -> Self {
        Self {
            stack,
            index: 0,
            final_handler: None,
        }
    }

    /// Create a new chain cursor with a final handler
    pub fn with_handler(stack: Arc<[Arc<dyn Middleware>]>, handler: HandlerFn) -> Self {
        Self {
            stack,
            index: 0,
            final_handler: Some(Arc::new(handler)),
        }
    }

    /// Run the next middleware or the final handler
    pub async fn run(self, req: Request<Body>) -> Result<Response<Body>> {
        if let Some(middleware) = self.stack.get(self.index) {
            let next = Self {
                stack: Arc::clone(&self.stack),
                index: self.index + 1,
                final_handler: self.final_handler.clone(),
            };
            middleware.call(req, next).await
        } else if let Some(handler) = self.final_handler {
            handler(req).await
        } else {
            Err(Error::Internal(
                "middleware chain completed without handler".to_string(),
            ))
        }
    }
}

impl Clone for Next {
    fn clone(&self) -> Self {
        Self {
            stack: Arc::clone(&self.stack),
            index: self.index,
            final_handler: self.final_handler.clone(),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &(self.stack.len() - self.index))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Tag {
        name: &'static str,
    }

    #[async_trait]
    impl Middleware for Tag {
        async fn call(&self, mut req: Request<Body>, next: Next) -> Result<Response<Body>> {
            req.headers_mut().append(
                http::header::VIA,
                http::HeaderValue::from_static(self.name),
            );
            next.run(req).await
        }
    }

    #[tokio::test]
    async fn test_chain_without_handler_errors() {
        let stack: Arc<[Arc<dyn Middleware>]> =
            Arc::new([Arc::new(Tag { name: "first" }) as Arc<dyn Middleware>]);
        let next = Next::new(stack);

        let req = Request::builder()
            .uri("/test")
            .body(Body::from("test"))
            .unwrap();

        assert!(next.run(req).await.is_err());
    }

    #[tokio::test]
    async fn test_chain_reaches_handler() {
        let stack: Arc<[Arc<dyn Middleware>]> = Arc::new([
            Arc::new(Tag { name: "first" }) as Arc<dyn Middleware>,
            Arc::new(Tag { name: "second" }) as Arc<dyn Middleware>,
        ]);
        let next = Next::with_handler(
            stack,
            Box::new(|req| {
                Box::pin(async move {
                    assert_eq!(req.headers().get_all(http::header::VIA).iter().count(), 2);
                    Ok(Response::new(Body::from("ok")))
                })
            }),
        );

        let req = Request::builder()
            .uri("/test")
            .body(Body::from("test"))
            .unwrap();

        let resp = next.run(req).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
    }
}
