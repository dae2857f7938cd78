//! Pagination over listings linked by a "次" (next) control.

use crate::config::ScrapingConfig;
use crate::console::Console;
use crate::error::ScraperError;
use crate::session::{Page, PageFetcher, rate_limit};
use crate::utils::{element_text, resolve_url};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Link text of the next-page control.
const NEXT_LINK_TEXT: &str = "次";

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Finds the next-page link on a listing, if there is one.
pub fn find_next_link(doc: &Html, base: &Url) -> Result<Option<Url>, ScraperError> {
    doc.select(&LINK_SELECTOR)
        .find(|link| element_text(*link) == NEXT_LINK_TEXT)
        .and_then(|link| link.value().attr("href"))
        .map(|href| resolve_url(base, href))
        .transpose()
}

/// Walks a listing page by page, accumulating what each page yields.
pub struct Paginator<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    config: &'a ScrapingConfig,
    console: &'a Console,
}

impl<'a, F: PageFetcher + ?Sized> Paginator<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a ScrapingConfig, console: &'a Console) -> Self {
        Self {
            fetcher,
            config,
            console,
        }
    }

    /// Collects records from `first` and every page reachable through next links.
    ///
    /// A page without a next link ends the walk. A next page that keeps timing
    /// out after `page_retries` retries is an error, not the end of the list.
    pub async fn collect<T, E>(
        &self,
        label: &str,
        first: Page,
        extract: E,
    ) -> Result<Vec<T>, ScraperError>
    where
        E: Fn(&Html) -> Result<Vec<T>, ScraperError>,
    {
        let mut records = Vec::new();
        let mut page = first;
        let mut page_count: u32 = 0;

        loop {
            page_count += 1;

            let next = {
                let doc = page.document();
                let found = extract(&doc)?;
                self.console.debug(&format!(
                    "{} page {}: {} records at {}",
                    label,
                    page_count,
                    found.len(),
                    page.url
                ));
                records.extend(found);
                find_next_link(&doc, &page.url)?
            };

            self.console.progress_update(&format!(
                "{}: page {}, {} books",
                label,
                page_count,
                records.len()
            ));

            let Some(next_url) = next else {
                break;
            };

            if page_count >= self.config.max_pages {
                self.console.clear_line();
                self.console.warning(&format!(
                    "{}: stopped after {} pages; raise scraping.max_pages to follow {}",
                    label, page_count, next_url
                ));
                break;
            }

            page = self.fetch_next(&next_url).await?;
        }

        self.console.clear_line();
        Ok(records)
    }

    /// Fetches a next page, retrying transient failures.
    async fn fetch_next(&self, url: &Url) -> Result<Page, ScraperError> {
        let mut attempt = 0;
        loop {
            match self.fetcher.get(url).await {
                Ok(page) => return Ok(page),
                Err(err) if err.is_transient() && attempt < self.config.page_retries => {
                    attempt += 1;
                    self.console.clear_line();
                    self.console.warning(&format!(
                        "{} (retry {}/{})",
                        err, attempt, self.config.page_retries
                    ));
                    rate_limit(self.config.delay_between_requests_sec).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_records;
    use crate::extract::tests::thumbnail_listing;
    use crate::records::BookRecord;
    use crate::session::fixtures::FixtureSite;
    use crate::shelf::Shelf;

    const FIRST: &str = "https://bookmeter.com/users/1/books/wish";
    const SECOND: &str = "https://bookmeter.com/users/1/books/wish?page=2";
    const THIRD: &str = "https://bookmeter.com/users/1/books/wish?page=3";

    fn config() -> ScrapingConfig {
        ScrapingConfig {
            delay_between_requests_sec: 0.0,
            ..ScrapingConfig::default()
        }
    }

    fn console() -> Console {
        Console::with_colors(false)
    }

    fn first_page(body: String) -> Page {
        Page::new(Url::parse(FIRST).unwrap(), body)
    }

    fn ids(records: &[BookRecord]) -> Vec<u64> {
        records.iter().map(|r| r.book().book_id).collect()
    }

    fn wish(doc: &Html) -> Result<Vec<BookRecord>, ScraperError> {
        extract_records(doc, Shelf::Wish)
    }

    #[test]
    fn test_find_next_link() {
        let html = thumbnail_listing(&[], Some("?page=2"));
        let doc = Html::parse_document(&html);
        let base = Url::parse(FIRST).unwrap();
        assert_eq!(
            find_next_link(&doc, &base).unwrap().unwrap().as_str(),
            SECOND
        );

        let html = thumbnail_listing(&[], None);
        let doc = Html::parse_document(&html);
        assert!(find_next_link(&doc, &base).unwrap().is_none());
    }

    #[test]
    fn test_next_text_must_match_exactly() {
        let doc = Html::parse_document(r#"<a href="/next">次へ進む</a><a href="/x">目次</a>"#);
        let base = Url::parse(FIRST).unwrap();
        assert!(find_next_link(&doc, &base).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_page_without_next_link() {
        let fixture = FixtureSite::new();
        let (config, console) = (config(), console());
        let paginator = Paginator::new(&fixture, &config, &console);

        let first = first_page(thumbnail_listing(&[(1, "a"), (2, "b")], None));
        let records = paginator.collect("wish", first, wish).await.unwrap();

        assert_eq!(ids(&records), vec![1, 2]);
        assert!(fixture.requests().is_empty());
    }

    #[tokio::test]
    async fn test_pages_accumulate_in_order() {
        let fixture = FixtureSite::new();
        fixture.page(SECOND, &thumbnail_listing(&[(3, "c")], Some("?page=3")));
        fixture.page(THIRD, &thumbnail_listing(&[(4, "d"), (5, "e")], None));
        let (config, console) = (config(), console());
        let paginator = Paginator::new(&fixture, &config, &console);

        let first = first_page(thumbnail_listing(&[(1, "a"), (2, "b")], Some("?page=2")));
        let records = paginator.collect("wish", first, wish).await.unwrap();

        assert_eq!(ids(&records), vec![1, 2, 3, 4, 5]);
        assert_eq!(
            fixture.requests(),
            vec![format!("GET {}", SECOND), format!("GET {}", THIRD)]
        );
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let fixture = FixtureSite::new();
        fixture.fail(SECOND, ScraperError::Timeout(SECOND.to_string()));
        fixture.page(SECOND, &thumbnail_listing(&[(2, "b")], None));
        let (config, console) = (config(), console());
        let paginator = Paginator::new(&fixture, &config, &console);

        let first = first_page(thumbnail_listing(&[(1, "a")], Some("?page=2")));
        let records = paginator.collect("wish", first, wish).await.unwrap();

        assert_eq!(ids(&records), vec![1, 2]);
        assert_eq!(fixture.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_persistent_timeout_is_an_error() {
        let fixture = FixtureSite::new();
        for _ in 0..3 {
            fixture.fail(SECOND, ScraperError::Timeout(SECOND.to_string()));
        }
        let (config, console) = (config(), console());
        let paginator = Paginator::new(&fixture, &config, &console);

        let first = first_page(thumbnail_listing(&[(1, "a")], Some("?page=2")));
        let err = paginator.collect("wish", first, wish).await.unwrap_err();

        assert!(matches!(err, ScraperError::Timeout(_)));
        assert_eq!(fixture.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried() {
        let fixture = FixtureSite::new();
        fixture.fail(SECOND, ScraperError::NotFound(SECOND.to_string()));
        let (config, console) = (config(), console());
        let paginator = Paginator::new(&fixture, &config, &console);

        let first = first_page(thumbnail_listing(&[(1, "a")], Some("?page=2")));
        let err = paginator.collect("wish", first, wish).await.unwrap_err();

        assert!(matches!(err, ScraperError::NotFound(_)));
        assert_eq!(fixture.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_max_pages_stops_walk() {
        let fixture = FixtureSite::new();
        fixture.page(SECOND, &thumbnail_listing(&[(2, "b")], Some("?page=3")));
        let config = ScrapingConfig {
            max_pages: 2,
            ..config()
        };
        let console = console();
        let paginator = Paginator::new(&fixture, &config, &console);

        let first = first_page(thumbnail_listing(&[(1, "a")], Some("?page=2")));
        let records = paginator.collect("wish", first, wish).await.unwrap();

        assert_eq!(ids(&records), vec![1, 2]);
        assert_eq!(fixture.requests().len(), 1);
    }
}
