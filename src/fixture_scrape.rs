use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::http_client::http_client;

/// A fixture as scraped from the listing site, before any stats enrichment.
#[derive(Debug, Clone)]
pub struct RawFixture {
    pub home: String,
    pub away: String,
    pub kickoff: String,
}

/// Where raw fixtures come from. Implemented by [`FixtureScraper`] over HTTP
/// and by canned fakes in tests.
pub trait FixtureSource {
    fn upcoming(&self, country: &str, league_name: &str) -> Result<Vec<RawFixture>>;
}

/// Fetches one page of HTML. The scraper only ever GETs and reads text.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    client: &'static Client,
}

impl HttpPageFetcher {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
        })
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|source| PipelineError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }
        resp.text().map_err(|source| PipelineError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

/// Scrapes the mobile fixture listing: one league block on the root page, then
/// one detail page per linked match.
pub struct FixtureScraper<P> {
    fetcher: P,
    base_url: String,
}

impl<P: PageFetcher> FixtureScraper<P> {
    pub fn new(fetcher: P, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

impl<P: PageFetcher> FixtureSource for FixtureScraper<P> {
    fn upcoming(&self, country: &str, league_name: &str) -> Result<Vec<RawFixture>> {
        let listing = self.fetcher.fetch(&format!("{}/?d=0", self.base_url))?;
        let hrefs = parse_fixture_links(&listing, country, league_name)?;
        debug!(count = hrefs.len(), country, league_name, "fixture links");

        let mut fixtures = Vec::with_capacity(hrefs.len());
        for href in hrefs {
            let page = self.fetcher.fetch(&format!("{}{}", self.base_url, href))?;
            fixtures.push(parse_match_page(&page)?);
        }
        Ok(fixtures)
    }
}

/// Extract the match hrefs of one league's block from the listing page.
///
/// The block starts at the last `h4` header containing
/// `"{COUNTRY}: {League Name}"` (country uppercased, league title-cased) and
/// runs to the next `h4`. A listing without that header is a day with no
/// fixtures for the league, not an error.
pub fn parse_fixture_links(html: &str, country: &str, league_name: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let score_data = Selector::parse(".soccer > #score-data")?;
    let container = document
        .select(&score_data)
        .next()
        .ok_or_else(|| PipelineError::PageFormat {
            context: "score data section missing from listing".to_string(),
        })?;

    let headers = Selector::parse("h4")?;
    let needle = format!("{}: {}", country.to_uppercase(), title_case(league_name));
    let mut league_header = None;
    for header in container.select(&headers) {
        if element_text(header).contains(&needle) {
            league_header = Some(header);
        }
    }
    let Some(header) = league_header else {
        return Ok(Vec::new());
    };

    let mut hrefs = Vec::new();
    for sibling in header.next_siblings() {
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        match element.value().name() {
            "h4" => break,
            "a" => {
                if let Some(href) = element.value().attr("href") {
                    hrefs.push(href.to_string());
                }
            }
            _ => {}
        }
    }
    Ok(hrefs)
}

/// Extract team names and kickoff from a match detail page.
///
/// The heading is a single `"Home - Away"` string; anything but exactly two
/// parts means the page layout changed. Finished matches carry extra detail
/// elements (score, status) before the kickoff, so the last one is taken.
/// Finished matches themselves are not filtered out here.
pub fn parse_match_page(html: &str) -> Result<RawFixture> {
    let document = Html::parse_document(html);

    let heading_sel = Selector::parse(".soccer > h3")?;
    let heading = document
        .select(&heading_sel)
        .next()
        .map(element_text)
        .ok_or_else(|| PipelineError::PageFormat {
            context: "match heading missing".to_string(),
        })?;
    let teams: Vec<&str> = heading.split(" - ").collect();
    let &[home, away] = teams.as_slice() else {
        return Err(PipelineError::PageFormat {
            context: format!("expected 'Home - Away' heading, got {heading:?}"),
        });
    };

    let detail_sel = Selector::parse(".soccer > .detail")?;
    let kickoff = document
        .select(&detail_sel)
        .last()
        .map(element_text)
        .ok_or_else(|| PipelineError::PageFormat {
            context: "match detail line missing".to_string(),
        })?;

    Ok(RawFixture {
        home: home.to_string(),
        away: away.to_string(),
        kickoff,
    })
}

/// First letter of every space-separated word uppercased, the rest lowered,
/// matching how the listing site capitalizes league names.
pub fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
