//! Profile extraction and icon download.

use crate::error::ScraperError;
use crate::records::Profile;
use crate::session::{AccountId, Page, PageFetcher};
use crate::utils::{element_text, resolve_url};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Dates render as `2020/01/05（日）`.
static SLASH_DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/(\d+)/(\d+)（.+$").unwrap());

/// CSS selectors used for parsing.
struct Selectors {
    /// Profile icon; its alt text is the display name.
    icon: Selector,
    registration_date: Selector,
    first_recording_date: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            icon: Selector::parse("figure img").unwrap(),
            registration_date: Selector::parse(".userdata dl > dd:nth-child(2)").unwrap(),
            first_recording_date: Selector::parse(".userdata dl > dd:nth-child(4)").unwrap(),
        }
    }
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(Selectors::new);

/// Rewrites `YYYY/MM/DD（曜日）` as `YYYY-MM-DD`; other text is returned as is.
pub fn reformat_date(text: &str) -> String {
    SLASH_DATE_REGEX.replace(text, "$1-$2-$3").into_owned()
}

/// Reads the profile fields from the user's page.
pub fn extract_profile(
    doc: &Html,
    page_url: &Url,
    account: &AccountId,
) -> Result<Profile, ScraperError> {
    let icon = doc
        .select(&SELECTORS.icon)
        .next()
        .ok_or_else(|| ScraperError::ElementNotFound("profile icon".to_string()))?;

    let name = icon
        .value()
        .attr("alt")
        .ok_or_else(|| ScraperError::ElementNotFound("alt text of the profile icon".to_string()))?;
    let src = icon
        .value()
        .attr("src")
        .ok_or_else(|| ScraperError::ElementNotFound("src of the profile icon".to_string()))?;

    let date = |selector: &Selector, what: &str| {
        doc.select(selector)
            .next()
            .map(|dd| reformat_date(&element_text(dd)))
            .ok_or_else(|| ScraperError::ElementNotFound(what.to_string()))
    };

    Ok(Profile {
        id: account.to_string(),
        name: name.to_string(),
        icon_url: resolve_url(page_url, src)?.to_string(),
        registration_date: date(&SELECTORS.registration_date, "registration date")?,
        first_recording_date: date(&SELECTORS.first_recording_date, "first recording date")?,
    })
}

/// Fetches the user's page and extracts the profile.
pub async fn fetch_profile<F: PageFetcher + ?Sized>(
    fetcher: &F,
    site: &Url,
    account: &AccountId,
) -> Result<Profile, ScraperError> {
    let url = account.user_url(site)?;
    let page: Page = fetcher.get(&url).await?;
    extract_profile(&page.document(), &page.url, account)
}
