//! Access to the GitHub REST API.
//!
//! [`IssueSource`] is the boundary the feed is generated against; [`Github`]
//! implements it over hyper.

use futures::future::{BoxFuture, FutureExt};
use headers::authorization::Bearer;
use headers::{Authorization, HeaderMapExt, UserAgent};
use hyper::client::HttpConnector;
use hyper::header::{HeaderMap, HeaderValue, ACCEPT, LINK, LOCATION};
use hyper::{Body, Client, Method, Request, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::config::IssueFilter;
use crate::error::ApiError;
use crate::model::{Issue, Label, Repository};

/// Everything but RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const PER_PAGE: u8 = 100;

const MAX_REDIRECTS: usize = 5;

/// Read-only queries against an issue tracker.
///
/// Lookups of a named repository or label fail with
/// [`ApiError::NotFound`] when it does not exist, so callers can tell a
/// missing object apart from any other failure.
pub trait IssueSource: Send + Sync {
    /// Resolves a repository by its `owner/name`.
    fn repository<'a>(&'a self, full_name: &'a str) -> BoxFuture<'a, Result<Repository, ApiError>>;

    /// Resolves a label defined in `repository`.
    fn label<'a>(
        &'a self,
        repository: &'a Repository,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Label, ApiError>>;

    /// Open issues of `repository`, optionally only those carrying `label`.
    fn repository_issues<'a>(
        &'a self,
        repository: &'a Repository,
        label: Option<&'a Label>,
    ) -> BoxFuture<'a, Result<Vec<Issue>, ApiError>>;

    /// Every repository the credential can access.
    fn user_repositories(&self) -> BoxFuture<'_, Result<Vec<Repository>, ApiError>>;

    /// Open issues of the authenticated user, scoped by `filter`.
    fn user_issues(&self, filter: IssueFilter) -> BoxFuture<'_, Result<Vec<Issue>, ApiError>>;
}

#[derive(Clone)]
pub struct Github {
    client: Client<HttpsConnector<HttpConnector>>,
    endpoint: String,
    user_agent: UserAgent,
    token: Authorization<Bearer>,
}

impl Github {
    pub fn new(endpoint: &str, token: &str) -> Result<Self, ApiError> {
        let token = Authorization::bearer(token.trim()).map_err(|_| ApiError::Token)?;
        Ok(Self {
            client: Client::builder().build(HttpsConnector::new()),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            user_agent: UserAgent::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )),
            token,
        })
    }

    /// Fetches a single page, returning the body and the URL of the next
    /// page, if any. A 404 is reported as not found `what`.
    ///
    /// Renamed and transferred repositories answer with a redirect, which is
    /// followed as long as it stays on the API host.
    async fn get_page<T>(&self, url: &str, what: &str) -> Result<(T, Option<String>), ApiError>
    where
        T: DeserializeOwned,
    {
        let mut url = url.to_string();
        let mut redirects = 0;
        let resp = loop {
            let uri: Uri = url.parse().map_err(hyper::http::Error::from)?;
            let mut req = Request::builder()
                .method(Method::GET)
                .uri(uri.clone())
                .header(ACCEPT, HeaderValue::from_static("application/vnd.github+json"))
                .body(Body::empty())?;
            req.headers_mut().typed_insert(self.user_agent.clone());
            req.headers_mut().typed_insert(self.token.clone());

            trace!(%url, "GET");
            let resp = self.client.request(req).await?;
            if !is_redirect(resp.status()) || redirects == MAX_REDIRECTS {
                break resp;
            }
            match redirect_target(&uri, resp.headers()) {
                Some(target) => {
                    debug!(from = %url, to = %target, "following redirect");
                    redirects += 1;
                    url = target;
                }
                None => break resp,
            }
        };
        let status = resp.status();
        let next = next_link(resp.headers());
        let chunk = hyper::body::to_bytes(resp.into_body()).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status,
                body: String::from_utf8_lossy(&chunk).into_owned(),
            });
        }
        let value = serde_json::from_slice(&chunk).map_err(|source| ApiError::Json {
            url: url.clone(),
            source,
        })?;
        Ok((value, next))
    }

    async fn get<T>(&self, url: String, what: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.get_page(&url, what).await.map(|(value, _)| value)
    }

    /// Follows `Link: <...>; rel="next"` until the last page.
    async fn get_all<T>(&self, url: String, what: &str) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let (page, following): (Vec<T>, _) = self.get_page(&url, what).await?;
            items.extend(page);
            next = following;
        }
        debug!(what, count = items.len(), "fetched all pages");
        Ok(items)
    }
}

impl IssueSource for Github {
    fn repository<'a>(&'a self, full_name: &'a str) -> BoxFuture<'a, Result<Repository, ApiError>> {
        async move {
            let url = format!("{}/repos/{}", self.endpoint, full_name);
            self.get(url, &format!("repository {}", full_name)).await
        }
        .boxed()
    }

    fn label<'a>(
        &'a self,
        repository: &'a Repository,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Label, ApiError>> {
        async move {
            let url = format!(
                "{}/repos/{}/labels/{}",
                self.endpoint,
                repository.full_name,
                utf8_percent_encode(name, COMPONENT)
            );
            self.get(url, &format!("label {} in {}", name, repository.full_name))
                .await
        }
        .boxed()
    }

    fn repository_issues<'a>(
        &'a self,
        repository: &'a Repository,
        label: Option<&'a Label>,
    ) -> BoxFuture<'a, Result<Vec<Issue>, ApiError>> {
        async move {
            let mut url = format!(
                "{}/repos/{}/issues?state=open&per_page={}",
                self.endpoint, repository.full_name, PER_PAGE
            );
            if let Some(label) = label {
                url.push_str("&labels=");
                url.extend(utf8_percent_encode(&label.name, COMPONENT));
            }
            self.get_all(url, &format!("issues of {}", repository.full_name))
                .await
        }
        .boxed()
    }

    fn user_repositories(&self) -> BoxFuture<'_, Result<Vec<Repository>, ApiError>> {
        async move {
            let url = format!("{}/user/repos?per_page={}", self.endpoint, PER_PAGE);
            self.get_all(url, "repositories of the authenticated user")
                .await
        }
        .boxed()
    }

    fn user_issues(&self, filter: IssueFilter) -> BoxFuture<'_, Result<Vec<Issue>, ApiError>> {
        async move {
            let url = format!(
                "{}/issues?state=open&filter={}&per_page={}",
                self.endpoint, filter, PER_PAGE
            );
            self.get_all(url, "issues of the authenticated user").await
        }
        .boxed()
    }
}

/// Extracts the `rel="next"` target of a `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;
    value.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        is_next.then(|| {
            target
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
    })
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Resolves the `Location` of a redirect from `from`. Targets on another
/// host are refused, the request carries the API token.
fn redirect_target(from: &Uri, headers: &HeaderMap) -> Option<String> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    let target: Uri = location.parse().ok()?;
    match (target.scheme(), target.authority()) {
        (Some(scheme), Some(authority))
            if Some(scheme) == from.scheme() && Some(authority) == from.authority() =>
        {
            Some(location.to_string())
        }
        (None, None) if location.starts_with('/') => Some(format!(
            "{}://{}{}",
            from.scheme_str()?,
            from.authority()?,
            location
        )),
        _ => None,
    }
}
