// collectors/fed_speech.rs
// ====
// Federal Reserve communications from the public RSS feeds
// ====
// Feeds are small and regular, so items are pulled apart with regexes
// rather than a full XML parser.
// ====

use super::traits::Collector;
use super::CollectorError;
use crate::config::FedFeed;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use monitor_common::data::{CommunicationType, FedCommunication};
use regex::Regex;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const DEFAULT_SPEAKER: &str = "Federal Reserve";

#[derive(Debug, Clone, PartialEq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
}

pub struct RssParser {
    item: Regex,
    title: Regex,
    link: Regex,
    description: Regex,
    pub_date: Regex,
    cdata: Regex,
    script: Regex,
    tag: Regex,
    space: Regex,
}

impl RssParser {
    pub fn new() -> Result<Self, CollectorError> {
        let re = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CollectorError::ParseError(format!("regex {}: {}", pattern, e)))
        };

        Ok(Self {
            item: re(r"(?s)<item\b[^>]*>(.*?)</item>")?,
            title: re(r"(?s)<title\b[^>]*>(.*?)</title>")?,
            link: re(r"(?s)<link\b[^>]*>(.*?)</link>")?,
            description: re(r"(?s)<description\b[^>]*>(.*?)</description>")?,
            pub_date: re(r"(?s)<pubDate\b[^>]*>(.*?)</pubDate>")?,
            cdata: re(r"(?s)<!\[CDATA\[(.*?)\]\]>")?,
            script: re(r"(?is)<(script|style)\b.*?</(script|style)>")?,
            tag: re(r"(?s)<[^>]+>")?,
            space: re(r"\s+")?,
        })
    }

    /// Items with a title, link and parseable RFC 2822 date; others are skipped.
    pub fn parse_items(&self, xml: &str) -> Vec<RssItem> {
        self.item
            .captures_iter(xml)
            .filter_map(|caps| {
                let body = caps.get(1)?.as_str();
                let title = self.field(&self.title, body)?;
                let link = self.field(&self.link, body)?;
                let raw_date = self.field(&self.pub_date, body)?;
                let published_at = match DateTime::parse_from_rfc2822(&raw_date) {
                    Ok(dt) => dt.with_timezone(&Utc),
                    Err(e) => {
                        debug!("Skipping item '{}' with bad date '{}': {}", title, raw_date, e);
                        return None;
                    }
                };
                let description = self
                    .field(&self.description, body)
                    .map(|d| self.strip_html(&d))
                    .unwrap_or_default();

                Some(RssItem {
                    title,
                    link,
                    description,
                    published_at,
                })
            })
            .collect()
    }

    /// Visible text of an HTML document, starting at the article body when marked.
    pub fn strip_html(&self, html: &str) -> String {
        let body = match html.find("id=\"article\"") {
            Some(start) => {
                let rest = &html[start..];
                rest.find('>').map_or(rest, |end| &rest[end + 1..])
            }
            None => html,
        };
        let without_scripts = self.script.replace_all(body, " ");
        let without_tags = self.tag.replace_all(&without_scripts, " ");
        let text = decode_entities(&without_tags);
        let text = self.space.replace_all(&text, " ");
        text.trim().to_string()
    }

    fn field(&self, pattern: &Regex, body: &str) -> Option<String> {
        let raw = pattern.captures(body)?.get(1)?.as_str();
        let raw = match self.cdata.captures(raw).and_then(|c| c.get(1)) {
            Some(inner) => inner.as_str().to_string(),
            None => decode_entities(raw),
        };
        let value = raw.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Speaker from titles shaped `Powell, Opening Remarks`; institutional otherwise.
pub fn speaker_from_title(title: &str) -> String {
    match title.split_once(',') {
        Some((prefix, _)) if !prefix.trim().is_empty() && prefix.split_whitespace().count() <= 3 => {
            prefix.trim().to_string()
        }
        _ => DEFAULT_SPEAKER.to_string(),
    }
}

/// Recent items as communications, first occurrence of each URL wins.
pub fn recent_communications(
    items: Vec<RssItem>,
    feed: &str,
    now: DateTime<Utc>,
    recency_days: i64,
    seen: &mut HashSet<String>,
) -> Vec<FedCommunication> {
    let cutoff = now - Duration::days(recency_days);

    items
        .into_iter()
        .filter(|item| item.published_at >= cutoff)
        .filter(|item| seen.insert(item.link.clone()))
        .map(|item| FedCommunication {
            speaker: speaker_from_title(&item.title),
            kind: CommunicationType::classify(&item.title, feed),
            published_at: item.published_at,
            source: feed.to_string(),
            full_text: (!item.description.is_empty()).then_some(item.description),
            url: item.link,
            title: item.title,
        })
        .collect()
}

pub struct FedSpeechCollector {
    client: Client,
    feeds: Vec<FedFeed>,
    recency_days: i64,
    parser: RssParser,
    /// Full text by URL for items still inside the recency window.
    text_cache: Arc<RwLock<HashMap<String, String>>>,
}

impl FedSpeechCollector {
    pub fn new(client: Client, feeds: Vec<FedFeed>, recency_days: i64) -> Result<Self, CollectorError> {
        Ok(Self {
            client,
            feeds,
            recency_days,
            parser: RssParser::new()?,
            text_cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, CollectorError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    async fn full_text(&self, url: &str) -> Option<String> {
        if let Some(text) = self.text_cache.read().await.get(url) {
            return Some(text.clone());
        }

        match self.fetch(url).await {
            Ok(html) => {
                let text = self.parser.strip_html(&html);
                if text.is_empty() {
                    return None;
                }
                self.text_cache.write().await.insert(url.to_string(), text.clone());
                Some(text)
            }
            Err(e) => {
                warn!("Error fetching full text {}: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl Collector for FedSpeechCollector {
    type Output = Vec<FedCommunication>;

    fn name(&self) -> &str {
        "fed_speeches"
    }

    async fn collect(&self) -> Result<Self::Output, CollectorError> {
        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut communications = Vec::new();
        let mut failures = 0;

        for feed in &self.feeds {
            match self.fetch(&feed.url).await {
                Ok(xml) => {
                    let items = self.parser.parse_items(&xml);
                    debug!("{}: {} items", feed.name, items.len());
                    communications.extend(recent_communications(
                        items,
                        &feed.name,
                        now,
                        self.recency_days,
                        &mut seen,
                    ));
                }
                Err(e) => {
                    failures += 1;
                    warn!("Error collecting from {}: {}", feed.name, e);
                }
            }
        }

        if failures > 0 && failures == self.feeds.len() {
            return Err(CollectorError::NetworkError("all Fed feeds failed".to_string()));
        }

        for communication in &mut communications {
            if let Some(text) = self.full_text(&communication.url).await {
                communication.full_text = Some(text);
            }
        }

        self.text_cache.write().await.retain(|url, _| seen.contains(url));
        communications.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        info!("Collected {} Fed communications", communications.len());
        Ok(communications)
    }

    fn validate(&self, data: &Self::Output) -> bool {
        data.iter()
            .all(|c| !c.title.is_empty() && !c.url.is_empty() && !c.speaker.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0"><channel>
  <title>FRB: Speeches</title>
  <link>https://www.federalreserve.gov/newsevents/speeches.htm</link>
  <item>
    <title><![CDATA[Waller, Economic Outlook]]></title>
    <link>https://www.federalreserve.gov/newsevents/speech/waller20250108a.htm</link>
    <description><![CDATA[<p>Governor Christopher J. Waller &amp; the outlook</p>]]></description>
    <pubDate>Wed, 08 Jan 2025 14:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Federal Reserve issues FOMC statement</title>
    <link>https://www.federalreserve.gov/newsevents/pressreleases/monetary20241218a.htm</link>
    <description>Recent indicators suggest that economic activity has continued to expand</description>
    <pubDate>Wed, 18 Dec 2024 19:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Broken item</title>
    <link>https://www.federalreserve.gov/x.htm</link>
    <pubDate>not a date</pubDate>
  </item>
</channel></rss>"#;

    #[test]
    fn test_parse_items() {
        let parser = RssParser::new().unwrap();
        let items = parser.parse_items(FEED);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Waller, Economic Outlook");
        assert_eq!(items[0].description, "Governor Christopher J. Waller & the outlook");
        assert_eq!(
            items[0].published_at,
            Utc.with_ymd_and_hms(2025, 1, 8, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_recency_and_dedup() {
        let parser = RssParser::new().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let mut seen = HashSet::new();

        let recent = recent_communications(parser.parse_items(FEED), "speeches", now, 7, &mut seen);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].speaker, "Waller");
        assert_eq!(recent[0].kind, CommunicationType::Speech);

        // Same URL from another feed is dropped.
        let again = recent_communications(parser.parse_items(FEED), "testimony", now, 7, &mut seen);
        assert!(again.is_empty());

        let wide = recent_communications(parser.parse_items(FEED), "press_monetary", now, 60, &mut HashSet::new());
        assert_eq!(wide.len(), 2);
        assert_eq!(wide[1].kind, CommunicationType::FomcStatement);
        assert_eq!(wide[1].speaker, DEFAULT_SPEAKER);
    }

    #[test]
    fn test_strip_html_article() {
        let parser = RssParser::new().unwrap();
        let html = r#"<html><head><style>p { color: red }</style></head><body>
            <nav>Menu</nav><div id="article"><h3>Opening Remarks</h3>
            <script>var x = 1;</script><p>Inflation remains&nbsp;elevated.</p></div></body></html>"#;
        assert_eq!(parser.strip_html(html), "Opening Remarks Inflation remains elevated.");
    }

    #[test]
    fn test_speaker_from_title() {
        assert_eq!(speaker_from_title("Powell, Opening Remarks"), "Powell");
        assert_eq!(speaker_from_title("Minutes of the Federal Open Market Committee"), DEFAULT_SPEAKER);
        assert_eq!(
            speaker_from_title("Federal Reserve Board announces results of stress tests, June 2024"),
            DEFAULT_SPEAKER
        );
    }
}
