//! Serves the feed over HTTP.
//!
//! `GET /` regenerates the feed on every request; nothing is cached between
//! requests.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use headers::{Allow, ContentType, HeaderMapExt};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::feed;
use crate::github::IssueSource;

pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Read-only state shared by all requests.
pub struct Feeds {
    config: Config,
    source: Arc<dyn IssueSource>,
}

impl Feeds {
    pub fn new(config: Config, source: Arc<dyn IssueSource>) -> Self {
        Self { config, source }
    }
}

fn text_response(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    let mut resp = Response::new(body.into());
    *resp.status_mut() = status;
    resp.headers_mut().typed_insert(ContentType::text_utf8());
    resp
}

pub async fn handle(feeds: Arc<Feeds>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    debug!(method = %req.method(), path = req.uri().path(), "request");
    if req.uri().path() != "/" {
        return Ok(text_response(StatusCode::NOT_FOUND, "not found"));
    }
    if req.method() != Method::GET {
        let mut resp = text_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        resp.headers_mut()
            .typed_insert(std::iter::once(Method::GET).collect::<Allow>());
        return Ok(resp);
    }

    match feed::generate(&feeds.config, feeds.source.as_ref()).await {
        Ok(ics) => {
            let mut resp = Response::new(Body::from(ics));
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(CALENDAR_CONTENT_TYPE));
            Ok(resp)
        }
        Err(err) => {
            error!(error = %err, "feed generation failed");
            Ok(text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("feed generation failed: {}", err),
            ))
        }
    }
}

/// Serves `feeds` on `addr` until `shutdown` completes.
pub async fn serve(
    addr: SocketAddr,
    feeds: Feeds,
    shutdown: impl Future<Output = ()>,
) -> Result<(), hyper::Error> {
    let feeds = Arc::new(feeds);
    let make_svc = make_service_fn(move |_conn| {
        let feeds = feeds.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(feeds.clone(), req))) }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    info!(address = %server.local_addr(), "serving feed");
    server.with_graceful_shutdown(shutdown).await
}
