//! HAL-style paginated responses.

use crate::error::{HorizonError, HorizonResult};
use reqwest::Url;
use serde::Deserialize;
use ticker_core::Link;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageLinks {
    #[serde(rename = "self", default)]
    pub self_link: Link,
    #[serde(default)]
    pub next: Link,
    #[serde(default)]
    pub prev: Link,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Embedded<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

impl<T> Default for Embedded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

/// One page of a listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
    #[serde(rename = "_embedded", default)]
    pub embedded: Embedded<T>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, self_href: impl Into<String>, next_href: impl Into<String>) -> Self {
        Self {
            links: PageLinks {
                self_link: Link {
                    href: self_href.into(),
                },
                next: Link {
                    href: next_href.into(),
                },
                prev: Link::default(),
            },
            embedded: Embedded { records },
        }
    }

    pub fn records(&self) -> &[T] {
        &self.embedded.records
    }

    pub fn into_records(self) -> Vec<T> {
        self.embedded.records
    }

    /// The listing is exhausted once `next` points back at `self`.
    pub fn is_last(&self) -> bool {
        self.links.next.href == self.links.self_link.href
    }

    /// Cursor for the following page, taken from the `next` link.
    pub fn next_cursor(&self) -> HorizonResult<String> {
        next_cursor(&self.links.next.href)
    }
}

/// Extract the `cursor` query parameter from a pagination link.
pub fn next_cursor(href: &str) -> HorizonResult<String> {
    let url = Url::parse(href).map_err(|e| HorizonError::MalformedLink(format!("{href}: {e}")))?;

    url.query_pairs()
        .find(|(key, _)| key == "cursor")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| HorizonError::MalformedLink(format!("{href}: no cursor parameter")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticker_core::RawTrade;

    #[test]
    fn test_next_cursor() {
        let href = "https://horizon.example.org/trades?cursor=107449584845914113-0&limit=200&order=desc";
        assert_eq!(next_cursor(href).unwrap(), "107449584845914113-0");
    }

    #[test]
    fn test_next_cursor_malformed() {
        assert!(matches!(
            next_cursor("not a url"),
            Err(HorizonError::MalformedLink(_))
        ));
        assert!(matches!(
            next_cursor("https://horizon.example.org/trades?limit=200"),
            Err(HorizonError::MalformedLink(_))
        ));
    }

    #[test]
    fn test_page_deserialize() {
        let json = r#"{
            "_links": {
                "self": {"href": "https://h.example/trades?cursor=&limit=200&order=desc"},
                "next": {"href": "https://h.example/trades?cursor=9-1&limit=200&order=desc"},
                "prev": {"href": "https://h.example/trades?cursor=9-9&limit=200&order=asc"}
            },
            "_embedded": {"records": [
                {"id": "9-1", "paging_token": "9-1", "ledger_close_time": "2024-03-01T12:00:00Z",
                 "price": {"n": 1, "d": 2}}
            ]}
        }"#;
        let page: Page<RawTrade> = serde_json::from_str(json).unwrap();
        assert_eq!(page.records().len(), 1);
        assert!(!page.is_last());
        assert_eq!(page.next_cursor().unwrap(), "9-1");
    }

    #[test]
    fn test_empty_page_is_last() {
        let json = r#"{
            "_links": {
                "self": {"href": "https://h.example/assets?cursor=x&limit=200&order=asc"},
                "next": {"href": "https://h.example/assets?cursor=x&limit=200&order=asc"}
            },
            "_embedded": {"records": []}
        }"#;
        let page: Page<RawTrade> = serde_json::from_str(json).unwrap();
        assert!(page.is_last());
        assert!(page.into_records().is_empty());
    }
}
