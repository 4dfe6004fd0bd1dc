//! Landing-page edition discovery
//!
//! The service's home page embeds a script-level JSON literal assigning the
//! latest editions' metadata to a named variable. Parsing it yields the
//! newest regular (non-supplement) edition id in a single request, a faster
//! but less load-bearing alternative to the binary boundary search. Any
//! failure here falls back to the search path in the orchestrator.

use crate::error::{Error, Result};
use crate::types::EditionId;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

/// Script variable the landing page assigns the edition list to
const EDITION_LIST_VAR: &str = "ultimasEdicoes";

/// One edition entry from the landing-page metadata
#[derive(Clone, Debug, Deserialize)]
pub struct LandingEdition {
    /// Edition identifier
    pub id: u32,
    /// Supplement flag; 0 = regular edition, anything else is a supplement
    #[serde(default)]
    pub suplemento: i64,
    /// Publication date, when the service includes one
    #[serde(default)]
    pub data: Option<NaiveDate>,
}

impl LandingEdition {
    /// Regular editions are preferred over supplements when selecting "the latest"
    pub fn is_regular(&self) -> bool {
        self.suplemento == 0
    }
}

#[derive(Debug, Deserialize)]
struct LandingPayload {
    #[serde(default)]
    itens: Vec<LandingEdition>,
}

/// Fetch the home page and extract the newest regular edition id
pub async fn latest_from_landing(client: &reqwest::Client, base_url: &str) -> Result<EditionId> {
    let url = format!("{}/", base_url.trim_end_matches('/'));
    let resp = client.get(&url).send().await?;
    if resp.status() != reqwest::StatusCode::OK {
        return Err(Error::LandingPage(format!(
            "landing page returned status {}",
            resp.status().as_u16()
        )));
    }
    let body = resp.text().await?;
    let latest = parse_latest(&body)?;
    tracing::info!(edition = latest.0, "Newest edition taken from landing page");
    Ok(latest)
}

/// Extract the newest regular edition id from landing-page HTML
pub fn parse_latest(html: &str) -> Result<EditionId> {
    let editions = parse_editions(html)?;
    editions
        .iter()
        .filter(|e| e.is_regular())
        .map(|e| e.id)
        .max()
        .map(EditionId)
        .ok_or_else(|| Error::LandingPage("no regular edition in landing metadata".to_string()))
}

/// Extract the full edition list from landing-page HTML
pub fn parse_editions(html: &str) -> Result<Vec<LandingEdition>> {
    let pattern = format!(r"(?s){EDITION_LIST_VAR}\s*=\s*(\{{.*?\}})\s*;");
    let re = Regex::new(&pattern)
        .map_err(|e| Error::LandingPage(format!("invalid extraction pattern: {e}")))?;
    let literal = re
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| {
            Error::LandingPage(format!("variable {EDITION_LIST_VAR} not found in landing page"))
        })?
        .as_str();

    let payload: LandingPayload = serde_json::from_str(literal)
        .map_err(|e| Error::LandingPage(format!("edition metadata is not valid JSON: {e}")))?;
    Ok(payload.itens)
}
