use chrono::NaiveDate;
use log::{info, warn};

use crate::{CandidateUrlBuilder, MenuError, requests::Fetch};

/// A menu document that was successfully downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub url: String,
    pub bytes: Vec<u8>,
    /// True when the document came from the cached URL rather than a probe.
    pub from_cache: bool,
}

pub struct DocumentLocator<F> {
    fetcher: F,
    builder: CandidateUrlBuilder,
}

impl<F: Fetch> DocumentLocator<F> {
    pub fn new(fetcher: F, builder: CandidateUrlBuilder) -> Self {
        Self { fetcher, builder }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Finds this week's document, trying `cached_url` first.
    ///
    /// Candidates are fetched one at a time and in order; the first success
    /// wins. Each candidate gets exactly one attempt.
    pub async fn locate(
        &self,
        today: NaiveDate,
        cached_url: Option<&str>,
    ) -> Result<ResolvedDocument, MenuError> {
        if let Some(url) = cached_url {
            match self.fetcher.fetch(url).await {
                Ok(bytes) => {
                    info!("using cached menu url {url}");
                    return Ok(ResolvedDocument {
                        url: url.to_string(),
                        bytes,
                        from_cache: true,
                    });
                }
                Err(e) => warn!("cached menu url stopped working, probing again: {e}"),
            }
        }

        let mut last_url = None;
        for candidate in self.builder.build_candidates(today) {
            match self.fetcher.fetch(&candidate.url).await {
                Ok(bytes) => {
                    info!("found menu for week of {} at {}", candidate.reference_date, candidate.url);
                    return Ok(ResolvedDocument {
                        url: candidate.url,
                        bytes,
                        from_cache: false,
                    });
                }
                Err(e) => {
                    warn!("{e}");
                    last_url = Some(candidate.url);
                }
            }
        }

        Err(MenuError::AllCandidatesExhausted { last_url })
    }

    /// Fetches exactly `url`, bypassing cache and candidate search.
    pub async fn locate_url(&self, url: &str) -> Result<ResolvedDocument, MenuError> {
        match self.fetcher.fetch(url).await {
            Ok(bytes) => Ok(ResolvedDocument {
                url: url.to_string(),
                bytes,
                from_cache: false,
            }),
            Err(e) => {
                warn!("{e}");
                Err(MenuError::AllCandidatesExhausted {
                    last_url: Some(url.to_string()),
                })
            }
        }
    }
}
