//! Feed records and the listing view the filters match against.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.+)\]").expect("valid category regex"));
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([0-9]+(?:\.[0-9]+)?)").expect("valid price regex"));

/// A post as delivered by the feed, one JSON object per line.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    /// Body of a text post; link posts have none.
    #[serde(default)]
    pub selftext: String,
}

impl Post {
    /// Only link posts are deals; text posts are discussion.
    pub fn is_deal(&self) -> bool {
        self.selftext.is_empty()
    }

    pub fn listing(&self) -> Listing {
        Listing::from_title(&self.title)
    }
}

/// What a filter sees of a post.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub category: String,
    pub price: Option<f64>,
    /// Title with spaces removed, lowercased.
    pub content: String,
}

impl Listing {
    /// Derive a listing from a title like `[GPU] RTX 3080 10GB ($699 - $50 MIR)`.
    ///
    /// The category is everything between the first `[` and the last `]`,
    /// the price is the first `$` amount.
    pub fn from_title(title: &str) -> Self {
        let title = title.trim();
        let category = CATEGORY_RE
            .captures(title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        let price = PRICE_RE
            .captures(title)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());

        Listing {
            category,
            price,
            content: title.replace(' ', "").to_lowercase(),
        }
    }
}
