use crate::error::{FleetError, Result};
use crate::utils::console;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

/// The `{ success, errors, result }` wrapper around every v4 response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub ttl: u32,
}

/// Desired state of one DNS record.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DnsRecordRequest {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    /// 1 means automatic.
    pub ttl: u32,
    pub proxied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(DnsRecord),
    Updated(DnsRecord),
    Unchanged(DnsRecord),
    /// Dry run: what would have happened.
    Planned { existing: Option<DnsRecord> },
}

/// Blocking client for the zone and DNS record endpoints.
pub struct CloudflareClient {
    client: Client,
    api_base: String,
    token: String,
}

impl CloudflareClient {
    pub fn new(api_base: &str, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(FleetError::Config(format!(
                "Cloudflare API token is empty; set {TOKEN_ENV} or [cloudflare].api_token"
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("wpfleet/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn send<T: DeserializeOwned>(&self, what: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| FleetError::Http(format!("{what}: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| FleetError::Http(format!("{what}: {e}")))?;
        console::verbose(format!("{what}: HTTP {}", status.as_u16()));
        parse_envelope(&body).map_err(|e| match e {
            FleetError::Cloudflare(msg) => FleetError::Cloudflare(format!("{what}: {msg}")),
            other => other,
        })
    }

    pub fn find_zone(&self, zone_name: &str) -> Result<Zone> {
        let request = self
            .client
            .get(self.url("zones"))
            .query(&[("name", zone_name)]);
        let zones: Vec<Zone> = self.send("zone lookup", request)?;
        zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(zone_name))
            .ok_or_else(|| FleetError::Cloudflare(format!("zone '{zone_name}' not found")))
    }

    pub fn find_record(
        &self,
        zone_id: &str,
        record_type: &str,
        name: &str,
    ) -> Result<Option<DnsRecord>> {
        let request = self
            .client
            .get(self.url(&format!("zones/{zone_id}/dns_records")))
            .query(&[("type", record_type), ("name", name)]);
        let records: Vec<DnsRecord> = self.send("record lookup", request)?;
        Ok(records.into_iter().next())
    }

    pub fn create_record(&self, zone_id: &str, record: &DnsRecordRequest) -> Result<DnsRecord> {
        let request = self
            .client
            .post(self.url(&format!("zones/{zone_id}/dns_records")))
            .json(record);
        self.send("record create", request)
    }

    pub fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecordRequest,
    ) -> Result<DnsRecord> {
        let request = self
            .client
            .put(self.url(&format!("zones/{zone_id}/dns_records/{record_id}")))
            .json(record);
        self.send("record update", request)
    }

    /// Looks up the zone and record, then PUTs or POSTs. Lookups still run in dry-run.
    pub fn upsert(&self, zone_name: &str, record: &DnsRecordRequest, dry_run: bool) -> Result<UpsertOutcome> {
        let zone = self.find_zone(zone_name)?;
        console::verbose(format!("zone {} has id {}", zone.name, zone.id));
        let existing = self.find_record(&zone.id, &record.record_type, &record.name)?;

        if dry_run {
            return Ok(UpsertOutcome::Planned { existing });
        }

        match existing {
            Some(current)
                if current.content == record.content
                    && current.proxied == record.proxied
                    && current.ttl == record.ttl =>
            {
                Ok(UpsertOutcome::Unchanged(current))
            }
            Some(current) => Ok(UpsertOutcome::Updated(self.update_record(
                &zone.id,
                &current.id,
                record,
            )?)),
            None => Ok(UpsertOutcome::Created(self.create_record(&zone.id, record)?)),
        }
    }
}

/// Unwraps a v4 envelope, turning `success: false` into an error that
/// carries the API's messages.
pub fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| FleetError::Cloudflare(format!("unexpected response: {e}")))?;

    if !envelope.success {
        let messages: Vec<String> = envelope
            .errors
            .iter()
            .map(|m| format!("{} ({})", m.message, m.code))
            .collect();
        let detail = if messages.is_empty() {
            "request was not successful".to_string()
        } else {
            messages.join("; ")
        };
        return Err(FleetError::Cloudflare(detail));
    }

    envelope
        .result
        .ok_or_else(|| FleetError::Cloudflare("response has no result".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn request() -> DnsRecordRequest {
        DnsRecordRequest {
            record_type: "A".into(),
            name: "blog.example.com".into(),
            content: "203.0.113.7".into(),
            ttl: 1,
            proxied: true,
        }
    }

    const ZONES: &str = r#"{"success":true,"errors":[],"result":[{"id":"z1","name":"example.com"}]}"#;

    #[test]
    fn envelope_errors_are_surfaced() {
        let err = parse_envelope::<Vec<Zone>>(
            r#"{"success":false,"errors":[{"code":9109,"message":"Invalid access token"}],"result":null}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid access token (9109)"));

        let zones: Vec<Zone> = parse_envelope(ZONES).unwrap();
        assert_eq!(zones[0].id, "z1");
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            CloudflareClient::new("http://localhost", " ").err(),
            Some(FleetError::Config(_))
        ));
    }

    #[test]
    fn upsert_updates_existing_record() {
        let mut server = Server::new();
        let zones = server
            .mock("GET", "/zones")
            .match_query(Matcher::UrlEncoded("name".into(), "example.com".into()))
            .match_header("authorization", "Bearer secret")
            .with_body(ZONES)
            .create();
        let lookup = server
            .mock("GET", "/zones/z1/dns_records")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "A".into()),
                Matcher::UrlEncoded("name".into(), "blog.example.com".into()),
            ]))
            .with_body(
                r#"{"success":true,"result":[{"id":"r1","type":"A","name":"blog.example.com","content":"198.51.100.1","proxied":true,"ttl":1}]}"#,
            )
            .create();
        let put = server
            .mock("PUT", "/zones/z1/dns_records/r1")
            .match_body(Matcher::PartialJsonString(r#"{"content":"203.0.113.7"}"#.into()))
            .with_body(
                r#"{"success":true,"result":{"id":"r1","type":"A","name":"blog.example.com","content":"203.0.113.7","proxied":true,"ttl":1}}"#,
            )
            .create();

        let client = CloudflareClient::new(&server.url(), "secret").unwrap();
        let outcome = client.upsert("example.com", &request(), false).unwrap();

        assert!(matches!(outcome, UpsertOutcome::Updated(ref r) if r.content == "203.0.113.7"));
        zones.assert();
        lookup.assert();
        put.assert();
    }

    const CURRENT: &str = r#"{"success":true,"result":[{"id":"r1","type":"A","name":"blog.example.com","content":"203.0.113.7","proxied":true,"ttl":1}]}"#;

    #[test]
    fn matching_record_is_left_alone() {
        let mut server = Server::new();
        server.mock("GET", "/zones").match_query(Matcher::Any).with_body(ZONES).create();
        server
            .mock("GET", "/zones/z1/dns_records")
            .match_query(Matcher::Any)
            .with_body(CURRENT)
            .create();
        let put = server.mock("PUT", Matcher::Any).expect(0).create();

        let client = CloudflareClient::new(&server.url(), "secret").unwrap();
        let outcome = client.upsert("example.com", &request(), false).unwrap();
        assert!(matches!(outcome, UpsertOutcome::Unchanged(_)));
        put.assert();
    }

    #[test]
    fn ttl_change_alone_updates_the_record() {
        let mut server = Server::new();
        server.mock("GET", "/zones").match_query(Matcher::Any).with_body(ZONES).create();
        server
            .mock("GET", "/zones/z1/dns_records")
            .match_query(Matcher::Any)
            .with_body(CURRENT)
            .create();
        let put = server
            .mock("PUT", "/zones/z1/dns_records/r1")
            .match_body(Matcher::PartialJsonString(r#"{"ttl":300}"#.into()))
            .with_body(
                r#"{"success":true,"result":{"id":"r1","type":"A","name":"blog.example.com","content":"203.0.113.7","proxied":true,"ttl":300}}"#,
            )
            .create();

        let client = CloudflareClient::new(&server.url(), "secret").unwrap();
        let record = DnsRecordRequest {
            ttl: 300,
            ..request()
        };
        let outcome = client.upsert("example.com", &record, false).unwrap();
        assert!(matches!(outcome, UpsertOutcome::Updated(ref r) if r.ttl == 300));
        put.assert();
    }

    #[test]
    fn upsert_creates_missing_record() {
        let mut server = Server::new();
        server.mock("GET", "/zones").match_query(Matcher::Any).with_body(ZONES).create();
        server
            .mock("GET", "/zones/z1/dns_records")
            .match_query(Matcher::Any)
            .with_body(r#"{"success":true,"result":[]}"#)
            .create();
        let post = server
            .mock("POST", "/zones/z1/dns_records")
            .with_body(
                r#"{"success":true,"result":{"id":"r9","type":"A","name":"blog.example.com","content":"203.0.113.7"}}"#,
            )
            .create();

        let client = CloudflareClient::new(&server.url(), "secret").unwrap();
        let outcome = client.upsert("example.com", &request(), false).unwrap();
        assert!(matches!(outcome, UpsertOutcome::Created(ref r) if r.id == "r9"));
        post.assert();
    }

    #[test]
    fn dry_run_looks_up_but_never_writes() {
        let mut server = Server::new();
        server.mock("GET", "/zones").match_query(Matcher::Any).with_body(ZONES).create();
        server
            .mock("GET", "/zones/z1/dns_records")
            .match_query(Matcher::Any)
            .with_body(r#"{"success":true,"result":[]}"#)
            .create();
        let post = server.mock("POST", Matcher::Any).expect(0).create();
        let put = server.mock("PUT", Matcher::Any).expect(0).create();

        let client = CloudflareClient::new(&server.url(), "secret").unwrap();
        let outcome = client.upsert("example.com", &request(), true).unwrap();
        assert_eq!(outcome, UpsertOutcome::Planned { existing: None });
        post.assert();
        put.assert();
    }
}
