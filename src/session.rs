//! Authenticated HTTP session and login flow.
//!
//! A [`Session`] keeps one cookie jar for the whole run. Page-level
//! operations go through the [`PageFetcher`] trait so they can be driven by
//! canned pages in tests.

use crate::config::{Credentials, ScrapingConfig};
use crate::console::Console;
use crate::error::ScraperError;
use crate::shelf::Shelf;
use crate::utils::{
    content_type_extension, element_text, request_error, resolve_url, url_extension,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, REFERER};
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Text of the link shown to a signed-in user pointing at their own page.
const MY_PAGE_LINK_TEXT: &str = "さんのマイページ";

/// CSS selectors used by the login flow.
struct Selectors {
    /// Email input, identified by its placeholder.
    email_input: Selector,
    /// Password input.
    password_input: Selector,
    /// Hidden inputs (CSRF token and friends).
    hidden_input: Selector,
    /// Any link.
    link: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            email_input: Selector::parse(r#"input[placeholder="sample@bookmeter.com"]"#).unwrap(),
            password_input: Selector::parse(r#"input[type="password"]"#).unwrap(),
            hidden_input: Selector::parse(r#"input[type="hidden"]"#).unwrap(),
            link: Selector::parse("a[href]").unwrap(),
        }
    }
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(Selectors::new);

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: Url,
    pub body: String,
}

impl Page {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    /// Parses the body. The document must not be held across an `.await`.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Fetches pages on behalf of the signed-in user.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a page with GET.
    async fn get(&self, url: &Url) -> Result<Page, ScraperError>;

    /// Submits an url-encoded form with POST.
    async fn post_form(&self, url: &Url, fields: &[(String, String)])
    -> Result<Page, ScraperError>;
}

/// Common HTTP client configuration.
pub fn create_http_client(config: &ScrapingConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
        .cookie_store(true)
        .timeout(Duration::from_secs(config.request_timeout_sec))
        .build()
}

/// Applies rate limiting delay.
pub async fn rate_limit(delay_sec: f64) {
    if delay_sec > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(delay_sec)).await;
    }
}

/// Cookie-keeping HTTP session shared by every step of a run.
pub struct Session {
    client: reqwest::Client,
    config: ScrapingConfig,
    console: Console,
}

impl Session {
    /// Creates a session with an empty cookie jar.
    pub fn new(config: ScrapingConfig, console: Console) -> Result<Self, ScraperError> {
        let client = create_http_client(&config)?;
        Ok(Self {
            client,
            config,
            console,
        })
    }

    /// Streams `url` into `<dest_dir>/<stem>.<ext>` and returns the path.
    ///
    /// The extension comes from the URL's last path segment, falling back to
    /// the response's image content type. Nothing is written for an empty body.
    pub async fn download(
        &self,
        url: &Url,
        dest_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, ScraperError> {
        rate_limit(self.config.delay_between_requests_sec).await;
        self.console.debug(&format!("GET {} (download)", url));

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(e, url))?
            .error_for_status()?;

        let extension = url_extension(url)
            .or_else(|| content_type_extension(response.headers()))
            .ok_or_else(|| {
                ScraperError::InvalidUrl(format!("cannot derive a file extension for {}", url))
            })?;

        let mut stream = response.bytes_stream();
        let first = loop {
            match stream.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| request_error(e, url))?;
                    if !chunk.is_empty() {
                        break chunk;
                    }
                }
                None => {
                    return Err(ScraperError::NotFound(format!(
                        "empty response body from {}",
                        url
                    )));
                }
            }
        };

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(format!("{}.{}", stem, extension));
        let mut file = tokio::fs::File::create(&path).await?;

        file.write_all(&first).await?;
        let mut written = first.len() as u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| request_error(e, url))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        self.console
            .debug(&format!("wrote {} bytes to {}", written, path.display()));
        Ok(path)
    }

    async fn read_page(
        &self,
        url: &Url,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<Page, ScraperError> {
        let response = response.map_err(|e| request_error(e, url))?;
        let response = response.error_for_status()?;
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| request_error(e, url))?;

        self.console.debug(&format!(
            "{} -> {} ({} bytes)",
            url,
            final_url,
            body.len()
        ));
        Ok(Page::new(final_url, body))
    }
}

#[async_trait]
impl PageFetcher for Session {
    async fn get(&self, url: &Url) -> Result<Page, ScraperError> {
        rate_limit(self.config.delay_between_requests_sec).await;
        self.console.debug(&format!("GET {}", url));

        let response = self.client.get(url.clone()).send().await;
        self.read_page(url, response).await
    }

    async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<Page, ScraperError> {
        rate_limit(self.config.delay_between_requests_sec).await;
        self.console.debug(&format!("POST {} ({} fields)", url, fields.len()));

        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(REFERER, url.as_str())
            .body(body)
            .send()
            .await;
        self.read_page(url, response).await
    }
}

/// Opaque account identifier taken from the user's page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountId(String);

impl AccountId {
    /// Reads the identifier from a `/users/<id>` URL.
    pub fn from_url(url: &Url) -> Result<Self, ScraperError> {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [.., "users", id] => Ok(Self((*id).to_string())),
            _ => Err(ScraperError::InvalidUrl(format!(
                "expected a /users/<id> page, got {}",
                url
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL of the user's profile page.
    pub fn user_url(&self, site: &Url) -> Result<Url, ScraperError> {
        resolve_url(site, &format!("/users/{}", self.0))
    }

    /// URL of the first page of a shelf listing.
    pub fn shelf_url(&self, site: &Url, shelf: Shelf) -> Result<Url, ScraperError> {
        resolve_url(site, &format!("/users/{}/{}", self.0, shelf.path()))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The site's login form, read from the login page.
#[derive(Debug, Clone)]
pub struct LoginForm {
    /// Where the form submits to.
    pub action: Url,
    email_field: String,
    password_field: String,
    hidden_fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Locates the login form on `page`.
    pub fn parse(page: &Page) -> Result<Self, ScraperError> {
        let doc = page.document();

        let email = doc
            .select(&SELECTORS.email_input)
            .next()
            .ok_or_else(|| ScraperError::ElementNotFound("login email field".to_string()))?;

        let form = email
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|elem| elem.value().name() == "form")
            .ok_or_else(|| ScraperError::ElementNotFound("login form".to_string()))?;

        let password = form
            .select(&SELECTORS.password_input)
            .next()
            .ok_or_else(|| ScraperError::ElementNotFound("login password field".to_string()))?;

        let email_field = field_name(email, "login email field")?;
        let password_field = field_name(password, "login password field")?;

        let action = match form.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => resolve_url(&page.url, action)?,
            _ => page.url.clone(),
        };

        let hidden_fields = form
            .select(&SELECTORS.hidden_input)
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or("");
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        Ok(Self {
            action,
            email_field,
            password_field,
            hidden_fields,
        })
    }

    /// Form fields to submit, hidden fields first.
    pub fn fields(&self, credentials: &Credentials) -> Vec<(String, String)> {
        let mut fields = self.hidden_fields.clone();
        fields.push((self.email_field.clone(), credentials.email.clone()));
        fields.push((self.password_field.clone(), credentials.password.clone()));
        fields
    }
}

fn field_name(input: ElementRef, what: &str) -> Result<String, ScraperError> {
    input
        .value()
        .attr("name")
        .map(str::to_string)
        .ok_or_else(|| ScraperError::ElementNotFound(format!("name attribute of the {}", what)))
}

/// Finds the link a signed-in page shows to the user's own page.
fn find_my_page_link(page: &Page) -> Result<Option<Url>, ScraperError> {
    let doc = page.document();
    let href = doc
        .select(&SELECTORS.link)
        .find(|link| element_text(*link).contains(MY_PAGE_LINK_TEXT))
        .and_then(|link| link.value().attr("href"));

    href.map(|href| resolve_url(&page.url, href)).transpose()
}

/// Signs in and resolves the account identifier.
///
/// Fails without retrying when the form is missing, the credentials are
/// rejected, or the user's page URL has an unexpected shape.
pub async fn authenticate<F: PageFetcher + ?Sized>(
    fetcher: &F,
    site: &Url,
    credentials: &Credentials,
) -> Result<AccountId, ScraperError> {
    let login_url = resolve_url(site, "/login")?;
    let login_page = fetcher.get(&login_url).await?;
    let form = LoginForm::parse(&login_page)?;

    let landing = fetcher
        .post_form(&form.action, &form.fields(credentials))
        .await?;

    let my_page_url = find_my_page_link(&landing)?.ok_or_else(|| {
        ScraperError::AuthenticationFailed(format!(
            "no link containing '{}' after submitting credentials",
            MY_PAGE_LINK_TEXT
        ))
    })?;

    let my_page = fetcher.get(&my_page_url).await?;
    AccountId::from_url(&my_page.url)
}
