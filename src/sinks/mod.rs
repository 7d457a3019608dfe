use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::filters::Filter;
use crate::listing::{Listing, Post};

pub mod jsonl;

pub use self::jsonl::JsonlSink;

/// A matched deal, ready to be delivered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub subject: String,
    pub title: String,
    pub category: String,
    pub price: Option<f64>,
    pub url: String,
    pub permalink: String,
    /// Rendered form of the filter that matched.
    pub filter: String,
    pub matched_at: String,
}

impl Alert {
    pub fn new(
        post: &Post,
        listing: &Listing,
        filter: &Filter,
        subject_prefix: &str,
        matched_at: &str,
    ) -> Self {
        let title = post.title.trim().to_string();
        Alert {
            id: post.id.clone(),
            subject: format!("{}: {}", subject_prefix, title),
            title,
            category: listing.category.clone(),
            price: listing.price,
            url: post.url.clone(),
            permalink: post.permalink.clone(),
            filter: filter.to_string(),
            matched_at: matched_at.to_string(),
        }
    }
}

pub fn format_timestamp(at: OffsetDateTime) -> Result<String> {
    Ok(at.format(&Rfc3339)?)
}

pub trait AlertSink: Send {
    fn send(&mut self, alert: &Alert) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}
