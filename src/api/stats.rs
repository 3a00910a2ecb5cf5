use chrono::NaiveDate;
use reqwest::Method;

use super::client::{ApiClient, FetchOptions};
use super::types::TimeStats;
use crate::error::Result;
use crate::validation;

#[derive(Clone)]
pub struct StatsApi {
  client: ApiClient,
}

impl StatsApi {
  pub(crate) fn new(client: ApiClient) -> Self {
    Self { client }
  }

  /// Statistics for an inclusive date range.
  pub async fn custom(&self, start: NaiveDate, end: NaiveDate, force_refresh: bool) -> Result<TimeStats> {
    validation::date_range(start, end)?;
    let endpoint = format!(
      "/api/stats/custom?start_date={}&end_date={}",
      start.format("%Y-%m-%d"),
      end.format("%Y-%m-%d")
    );
    let options = FetchOptions::cached(self.client.ttl().statistics()).refresh(force_refresh);
    self.client.fetch(Method::GET, &endpoint, None, options).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::signed_in_client;
  use serde_json::json;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_custom_range_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/stats/custom"))
      .and(query_param("start_date", "2024-03-01"))
      .and(query_param("end_date", "2024-03-31"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "total_duration": 7200,
        "daily_stats": {"2024-03-01": 3600, "2024-03-02": 3600},
        "entries": []
      })))
      .expect(1)
      .mount(&server)
      .await;

    let api = signed_in_client(&server).stats();
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

    let stats = api.custom(start, end, false).await.unwrap();
    assert_eq!(stats.total_duration, 7200);
    assert_eq!(stats.daily_stats.len(), 2);

    // Same range again is served from the cache
    api.custom(start, end, false).await.unwrap();
  }
}
