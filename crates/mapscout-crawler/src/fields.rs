//! Per-field extraction from a place page.
//!
//! Every field is read independently with its own timeout. A failed read
//! leaves that field empty and never affects the others; only a missing name
//! rejects the record.

use mapscout_browser::actions::with_timeout;
use mapscout_browser::{BrowserError, PageDriver};
use mapscout_core::{BusinessRecord, CrawlConfig, SelectorConfig};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Why a field came back without a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldMiss {
    #[error("element not found")]
    NotFound,

    #[error("element is empty")]
    Empty,

    #[error("driver error: {0}")]
    Driver(String),
}

impl From<BrowserError> for FieldMiss {
    fn from(err: BrowserError) -> Self {
        if err.is_absence() {
            Self::NotFound
        } else {
            Self::Driver(err.to_string())
        }
    }
}

/// Outcome of reading a single field.
pub type FieldRead = Result<String, FieldMiss>;

const ADDRESS_PREFIXES: &[&str] = &["Dirección: ", "Address: "];
const PHONE_PREFIXES: &[&str] = &["Teléfono: ", "Phone: "];

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
            .expect("email pattern is valid")
    })
}

/// Trim a raw value, mapping blank and missing values to a miss.
fn non_empty(raw: Option<String>) -> FieldRead {
    let value = raw.ok_or(FieldMiss::NotFound)?;
    let value = value.trim();
    if value.is_empty() {
        Err(FieldMiss::Empty)
    } else {
        Ok(value.to_string())
    }
}

/// Remove every occurrence of the label prefixes.
pub fn strip_prefixes(value: &str, prefixes: &[&str]) -> String {
    prefixes
        .iter()
        .fold(value.to_string(), |acc, prefix| acc.replace(prefix, ""))
        .trim()
        .to_string()
}

/// Keep only ASCII digits (`"(1.234 reseñas)"` -> `"1234"`).
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// First email in `text` that does not belong to the provider domain.
pub fn find_email(text: &str, provider_fragment: &str) -> Option<String> {
    let fragment = provider_fragment.to_lowercase();
    email_regex()
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|email| fragment.is_empty() || !email.to_lowercase().contains(&fragment))
        .map(str::to_string)
}

fn require(read: FieldRead) -> FieldRead {
    match read {
        Ok(v) if v.is_empty() => Err(FieldMiss::Empty),
        other => other,
    }
}

/// Reads a [`BusinessRecord`] off an open place page.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    selectors: SelectorConfig,
    field_timeout: Duration,
    short_timeout: Duration,
}

impl FieldExtractor {
    pub fn new(selectors: SelectorConfig, field_timeout: Duration, short_timeout: Duration) -> Self {
        Self {
            selectors,
            field_timeout,
            short_timeout,
        }
    }

    pub fn from_config(crawl: &CrawlConfig, selectors: &SelectorConfig) -> Self {
        Self::new(
            selectors.clone(),
            crawl.field_timeout(),
            crawl.short_field_timeout(),
        )
    }

    async fn text(&self, page: &dyn PageDriver, selector: &str, timeout: Duration) -> FieldRead {
        non_empty(page.get_text(selector, timeout).await?)
    }

    async fn attribute(
        &self,
        page: &dyn PageDriver,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> FieldRead {
        non_empty(page.get_attribute(selector, name, timeout).await?)
    }

    pub async fn name(&self, page: &dyn PageDriver) -> FieldRead {
        self.text(page, &self.selectors.name, self.field_timeout).await
    }

    pub async fn address(&self, page: &dyn PageDriver) -> FieldRead {
        let raw = self
            .attribute(page, &self.selectors.address, "aria-label", self.field_timeout)
            .await?;
        require(Ok(strip_prefixes(&raw, ADDRESS_PREFIXES)))
    }

    pub async fn phone(&self, page: &dyn PageDriver) -> FieldRead {
        let raw = self
            .attribute(page, &self.selectors.phone, "aria-label", self.field_timeout)
            .await?;
        require(Ok(strip_prefixes(&raw, PHONE_PREFIXES)))
    }

    pub async fn rating(&self, page: &dyn PageDriver) -> FieldRead {
        self.text(page, &self.selectors.rating, self.short_timeout)
            .await
    }

    pub async fn review_count(&self, page: &dyn PageDriver) -> FieldRead {
        let raw = self
            .text(page, &self.selectors.reviews, self.short_timeout)
            .await?;
        require(Ok(digits_only(&raw)))
    }

    pub async fn open_status(&self, page: &dyn PageDriver) -> FieldRead {
        self.attribute(
            page,
            &self.selectors.open_status,
            "aria-label",
            self.short_timeout,
        )
        .await
    }

    pub async fn website(&self, page: &dyn PageDriver) -> FieldRead {
        self.attribute(page, &self.selectors.website, "href", self.short_timeout)
            .await
    }

    pub async fn email(&self, page: &dyn PageDriver) -> FieldRead {
        let texts = with_timeout(
            "read summary text",
            self.short_timeout,
            page.get_all_texts(&self.selectors.summary),
        )
        .await?;
        find_email(&texts.join(" "), &self.selectors.provider_domain_fragment)
            .ok_or(FieldMiss::NotFound)
    }

    /// Read every field of the page.
    ///
    /// Fails with the name's miss when no name could be read; all other
    /// misses only leave the corresponding field `None`.
    pub async fn extract(
        &self,
        page: &dyn PageDriver,
        region: Option<&str>,
    ) -> Result<BusinessRecord, FieldMiss> {
        let (name, address, phone, rating, reviews, status, website, email) = tokio::join!(
            self.name(page),
            self.address(page),
            self.phone(page),
            self.rating(page),
            self.review_count(page),
            self.open_status(page),
            self.website(page),
            self.email(page),
        );

        let name = name?;
        Ok(BusinessRecord {
            name,
            address: keep("address", address),
            phone: keep("phone", phone),
            rating: keep("rating", rating),
            review_count: keep("reviews", reviews),
            open_status: keep("open status", status),
            email: keep("email", email),
            website: keep("website", website),
            region: region.map(str::to_string),
        })
    }
}

fn keep(field: &str, read: FieldRead) -> Option<String> {
    match read {
        Ok(value) => Some(value),
        Err(miss) => {
            tracing::debug!("{} not read: {}", field, miss);
            None
        }
    }
}
