//! Passthrough to Graphite's render API

use std::time::Duration;

use reqwest::Url;

use super::error::ApiResult;
use crate::settings::GraphiteSettings;

/// Parameters of `/api/stats` worth forwarding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsQuery {
    pub targets: Vec<String>,
    pub from: Option<String>,
    pub until: Option<String>,
}

impl StatsQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "target" => query.targets.push(value),
                "from" => query.from = Some(value),
                "until" => query.until = Some(value),
                _ => {}
            }
        }
        query
    }
}

#[derive(Debug, Clone)]
pub struct GraphiteClient {
    http: reqwest::Client,
    render_url: Url,
}

impl GraphiteClient {
    pub fn new(settings: &GraphiteSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            render_url: Url::parse(&settings.render_url())?,
        })
    }

    /// Render URL for `query`, always asking for JSON with a cache-busting salt
    pub fn url_for(&self, query: &StatsQuery) -> Url {
        let mut url = self.render_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for target in &query.targets {
                pairs.append_pair("target", target);
            }
            pairs.append_pair("format", "json");
            pairs.append_pair("_salt", &rand::random::<u32>().to_string());
            if let Some(from) = &query.from {
                pairs.append_pair("from", from);
            }
            if let Some(until) = &query.until {
                pairs.append_pair("until", until);
            }
        }
        url
    }

    /// Fetch the rendered series, returning Graphite's body untouched
    pub async fn render(&self, query: &StatsQuery) -> ApiResult<String> {
        let url = self.url_for(query);
        tracing::debug!(%url, "forwarding stats query");
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}
