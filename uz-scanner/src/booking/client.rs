//! UZ booking site HTTP client.
//!
//! The site speaks form-encoded POST everywhere and authenticates with
//! three headers recovered from the landing page: a rotating browser
//! fingerprint, a `GV-Referer`, and the short-lived `GV-Token`. Every
//! remote call funnels through one choke point that attaches those
//! headers, applies the timeout, logs the exchange at debug level, and
//! classifies failures into the [`ClientError`] taxonomy.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::domain::{Coach, CoachType, DATE_FMT, Station, Train};

use super::BookingApi;
use super::error::{ClientError, ResponseInfo};
use super::token::{TOKEN_MAX_AGE, TokenCell, extract_token, random_user_agent};
use super::types::{CoachesDto, SeatsDto, StationDto, TrainDto, ValueResponse};

/// Default base URL of the booking site (English locale).
const DEFAULT_BASE_URL: &str = "https://booking.uz.gov.ua/en";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Session cookie the site issues; its value is the booking session id.
const SESSION_COOKIE: &str = "_gv_sessid";

/// Configuration for the UZ client.
#[derive(Debug, Clone)]
pub struct UzConfig {
    /// Base URL of the site, without a trailing slash.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl UzConfig {
    /// Create a config with production defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for UzConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// One browser identity: HTTP client, cookie jar, fingerprint.
///
/// Rebuilt wholesale on every token refresh so cookies and fingerprint
/// never outlive the token they were issued with.
#[derive(Clone)]
struct HttpSession {
    http: reqwest::Client,
    jar: Arc<Jar>,
    user_agent: &'static str,
}

impl HttpSession {
    fn new(config: &UzConfig) -> Result<Self, ClientError> {
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            jar,
            user_agent: random_user_agent(),
        })
    }

    /// Current cookie header for the given URL, for debug logging and
    /// session-id extraction.
    fn cookie_header(&self, url: &Url) -> Option<String> {
        let header = self.jar.cookies(url)?;
        header.to_str().ok().map(str::to_string)
    }
}

/// Client for the UZ booking site.
///
/// Owns one network session and the token recovered for it. Create a
/// separate client (see [`BookingApi::fresh_session`]) for any
/// self-contained multi-step flow, so cookie and token state never leaks
/// across unrelated flows.
pub struct UzClient {
    config: UzConfig,
    base: Url,
    referer: HeaderValue,
    session: tokio::sync::RwLock<HttpSession>,
    token: TokenCell,
}

impl UzClient {
    /// Create a new client with the given configuration.
    pub fn new(config: UzConfig) -> Result<Self, ClientError> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            ClientError::Transport(ResponseInfo {
                status: 0,
                request: None,
                body: format!("invalid base URL {}: {}", config.base_url, e),
                json: None,
            })
        })?;
        let referer = HeaderValue::from_str(&config.base_url).map_err(|_| {
            ClientError::Transport(ResponseInfo {
                status: 0,
                request: None,
                body: format!("base URL not usable as referer: {}", config.base_url),
                json: None,
            })
        })?;
        let session = HttpSession::new(&config)?;

        Ok(Self {
            config,
            base,
            referer,
            session: tokio::sync::RwLock::new(session),
            token: TokenCell::new(TOKEN_MAX_AGE),
        })
    }

    /// Return a valid token, refreshing it if stale.
    pub async fn token(&self) -> Result<String, ClientError> {
        self.token.get_or_refresh(|| self.refresh_token()).await
    }

    /// Fetch the landing page under a brand-new identity and extract the
    /// embedded token.
    async fn refresh_token(&self) -> Result<String, ClientError> {
        let user_agent = {
            let mut session = self.session.write().await;
            *session = HttpSession::new(&self.config)?;
            session.user_agent
        };

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));

        let (_, page) = Box::pin(self.request("", None, Some(headers))).await?;
        extract_token(&page).ok_or(ClientError::TokenUnavailable)
    }

    /// Headers required on authenticated calls.
    async fn auth_headers(&self) -> Result<HeaderMap, ClientError> {
        let token = self.token().await?;
        let token = HeaderValue::from_str(&token).map_err(|_| ClientError::TokenUnavailable)?;
        let user_agent = self.session.read().await.user_agent;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
        headers.insert(HeaderName::from_static("gv-ajax"), HeaderValue::from_static("1"));
        headers.insert(HeaderName::from_static("gv-referer"), self.referer.clone());
        headers.insert(HeaderName::from_static("gv-token"), token);
        Ok(headers)
    }

    /// The single choke point for all remote calls.
    ///
    /// Attaches the authenticated headers unless `headers` overrides
    /// them, and classifies the transport outcome: 400 → `BadRequest`,
    /// other non-2xx → `Transport`. Returns the status and raw body.
    async fn request(
        &self,
        endpoint: &str,
        form: Option<&[(&str, String)]>,
        headers: Option<HeaderMap>,
    ) -> Result<(u16, String), ClientError> {
        let headers = match headers {
            Some(headers) => headers,
            None => self.auth_headers().await?,
        };

        let session = self.session.read().await.clone();
        let url = format!("{}/{}", self.config.base_url, endpoint);

        tracing::debug!(
            target: "uz_scanner::client",
            %url,
            ?headers,
            cookies = session.cookie_header(&self.base).as_deref().unwrap_or("-"),
            "calling endpoint"
        );

        let mut request = session.http.post(&url).headers(headers);
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let info = ResponseInfo {
                status: status.as_u16(),
                request: form.map(encode_form),
                json: serde_json::from_str(&body).ok(),
                body,
            };
            return Err(if status == reqwest::StatusCode::BAD_REQUEST {
                ClientError::BadRequest(info)
            } else {
                ClientError::Transport(info)
            });
        }

        Ok((status.as_u16(), body))
    }

    /// Call an endpoint and return the raw body.
    pub async fn call_raw(
        &self,
        endpoint: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<String, ClientError> {
        let (_, body) = self.request(endpoint, form, None).await?;
        Ok(body)
    }

    /// Call an endpoint, parse the body as JSON and fail with
    /// `Business` when the site sets its body-level error flag.
    async fn call_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<T, ClientError> {
        let (status, body) = self.request(endpoint, form, None).await?;

        let json: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ClientError::Json {
                message: e.to_string(),
                body: Some(truncate(&body)),
            })?;

        if error_flag_set(&json) {
            return Err(ClientError::Business(ResponseInfo {
                status,
                request: form.map(encode_form),
                json: Some(json),
                body,
            }));
        }

        serde_json::from_value(json).map_err(|e| ClientError::Json {
            message: e.to_string(),
            body: Some(truncate(&body)),
        })
    }

    /// Stations whose title matches `name`.
    pub async fn search_stations(&self, name: &str) -> Result<Vec<Station>, ClientError> {
        let endpoint = format!("purchase/station/{name}/");
        let response: ValueResponse<Vec<StationDto>> = self.call_json(&endpoint, None).await?;
        Ok(response.value.into_iter().map(Station::from).collect())
    }

    /// First station matching `name`, if any.
    pub async fn fetch_first_station(&self, name: &str) -> Result<Option<Station>, ClientError> {
        Ok(self.search_stations(name).await?.into_iter().next())
    }

    /// Trains running between two stations on a date.
    pub async fn list_trains(
        &self,
        date: NaiveDate,
        source: &Station,
        destination: &Station,
    ) -> Result<Vec<Train>, ClientError> {
        let form = [
            ("station_id_from", source.id.to_string()),
            ("station_id_till", destination.id.to_string()),
            ("date_dep", date.format(DATE_FMT).to_string()),
            ("time_dep", "00:00".to_string()),
            ("time_dep_till", String::new()),
            ("another_ec", "0".to_string()),
            ("search", String::new()),
        ];
        let response: ValueResponse<Vec<TrainDto>> =
            self.call_json("purchase/search/", Some(&form)).await?;
        Ok(response.value.into_iter().map(Train::from).collect())
    }

    /// The train with the given number on that date and route, if it runs.
    pub async fn fetch_train(
        &self,
        date: NaiveDate,
        source: &Station,
        destination: &Station,
        number: &str,
    ) -> Result<Option<Train>, ClientError> {
        let trains = self.list_trains(date, source, destination).await?;
        Ok(trains.into_iter().find(|train| train.number == number))
    }

    /// Coaches of one class on a train.
    pub async fn list_coaches(
        &self,
        train: &Train,
        coach_type: &CoachType,
    ) -> Result<Vec<Coach>, ClientError> {
        let form = [
            ("station_id_from", train.source_station.id.to_string()),
            ("station_id_till", train.destination_station.id.to_string()),
            ("train", train.number.clone()),
            ("model", train.model.to_string()),
            ("date_dep", train.departure.epoch.to_string()),
            ("round_trip", "0".to_string()),
            ("another_ec", "0".to_string()),
            ("coach_type", coach_type.letter.clone()),
        ];
        let response: ValueResponse<CoachesDto> =
            self.call_json("purchase/coaches/", Some(&form)).await?;
        Ok(response.value.coaches.into_iter().map(Coach::from).collect())
    }

    /// Free seat labels in a coach.
    ///
    /// The site groups labels by fare class and repeats labels across
    /// groups; the result is the distinct set.
    pub async fn list_seats(
        &self,
        train: &Train,
        coach: &Coach,
    ) -> Result<BTreeSet<String>, ClientError> {
        let form = [
            ("station_id_from", train.source_station.id.to_string()),
            ("station_id_till", train.destination_station.id.to_string()),
            ("train", train.number.clone()),
            ("coach_num", coach.number.to_string()),
            ("coach_class", coach.class.clone()),
            ("coach_type_id", coach.type_id.to_string()),
            ("date_dep", train.departure.epoch.to_string()),
        ];
        let response: ValueResponse<SeatsDto> =
            self.call_json("purchase/coach/", Some(&form)).await?;
        Ok(collect_seats(response.value.places))
    }

    /// Put one seat into the cart for the given passenger.
    ///
    /// On success the site binds the reservation to the session cookie;
    /// its value is returned as the booking session id.
    pub async fn book_seat(
        &self,
        train: &Train,
        coach: &Coach,
        seat: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<String, ClientError> {
        let form = [
            ("code_station_from", train.source_station.id.to_string()),
            ("code_station_to", train.destination_station.id.to_string()),
            ("train", train.number.clone()),
            ("date", train.departure.epoch.to_string()),
            ("round_trip", "0".to_string()),
            ("places[0][ord]", "0".to_string()),
            ("places[0][coach_num]", coach.number.to_string()),
            ("places[0][coach_class]", coach.class.clone()),
            ("places[0][coach_type_id]", coach.type_id.to_string()),
            ("places[0][place_num]", seat.to_string()),
            ("places[0][firstname]", first_name.to_string()),
            ("places[0][lastname]", last_name.to_string()),
            ("places[0][bedding]", "0".to_string()),
            ("places[0][child]", String::new()),
            ("places[0][stud]", String::new()),
            ("places[0][transp]", "0".to_string()),
            ("places[0][reserve]", "0".to_string()),
        ];

        let _: serde_json::Value = self.call_json("cart/add/", Some(&form)).await?;

        self.session_id().await.ok_or_else(|| ClientError::Json {
            message: format!("no {SESSION_COOKIE} cookie after booking"),
            body: None,
        })
    }

    /// The provider session id from the cookie jar, if one was issued.
    pub async fn session_id(&self) -> Option<String> {
        let session = self.session.read().await;
        let header = session.cookie_header(&self.base)?;
        parse_session_cookie(&header).map(str::to_string)
    }
}

#[async_trait]
impl BookingApi for UzClient {
    async fn search_stations(&self, name: &str) -> Result<Vec<Station>, ClientError> {
        UzClient::search_stations(self, name).await
    }

    async fn list_trains(
        &self,
        date: NaiveDate,
        source: &Station,
        destination: &Station,
    ) -> Result<Vec<Train>, ClientError> {
        UzClient::list_trains(self, date, source, destination).await
    }

    async fn list_coaches(
        &self,
        train: &Train,
        coach_type: &CoachType,
    ) -> Result<Vec<Coach>, ClientError> {
        UzClient::list_coaches(self, train, coach_type).await
    }

    async fn list_seats(
        &self,
        train: &Train,
        coach: &Coach,
    ) -> Result<BTreeSet<String>, ClientError> {
        UzClient::list_seats(self, train, coach).await
    }

    async fn book_seat(
        &self,
        train: &Train,
        coach: &Coach,
        seat: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<String, ClientError> {
        UzClient::book_seat(self, train, coach, seat, first_name, last_name).await
    }

    fn fresh_session(&self) -> Result<Box<dyn BookingApi>, ClientError> {
        Ok(Box::new(UzClient::new(self.config.clone())?))
    }
}

/// Whether the body-level error flag is set. Anything other than an
/// absent, `null` or `false` flag signals a business failure.
fn error_flag_set(json: &serde_json::Value) -> bool {
    match json.get("error") {
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => false,
        Some(_) => true,
    }
}

/// Flatten the per-fare-class seat groups into a distinct label set.
fn collect_seats(places: BTreeMap<String, Vec<String>>) -> BTreeSet<String> {
    places.into_values().flatten().collect()
}

/// Render a form payload for diagnostics.
fn encode_form(form: &[(&str, String)]) -> String {
    form.iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn truncate(body: &str) -> String {
    body.chars().take(500).collect()
}

/// Find the session cookie value in a `Cookie` header string.
fn parse_session_cookie(header: &str) -> Option<&str> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_defaults() {
        let config = UzConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn config_builder() {
        let config = UzConfig::new()
            .with_base_url("http://localhost:8080")
            .with_timeout(3);
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn client_creation() {
        assert!(UzClient::new(UzConfig::default()).is_ok());
        assert!(UzClient::new(UzConfig::new().with_base_url("not a url")).is_err());
    }

    #[test]
    fn error_flag_detection() {
        assert!(!error_flag_set(&json!({"value": []})));
        assert!(!error_flag_set(&json!({"error": false})));
        assert!(!error_flag_set(&json!({"error": null})));
        assert!(error_flag_set(&json!({"error": true})));
        assert!(error_flag_set(&json!({"error": "captcha"})));
        assert!(error_flag_set(&json!({"error": 1})));
    }

    #[test]
    fn seats_collapse_across_fare_classes() {
        let places = BTreeMap::from([
            (
                "А".to_string(),
                vec!["6".to_string(), "9".to_string(), "10".to_string()],
            ),
            ("Б".to_string(), vec!["6".to_string(), "14".to_string()]),
        ]);
        let seats = collect_seats(places);
        assert_eq!(seats.len(), 4);
        assert!(seats.contains("6"));
        assert!(seats.contains("14"));
    }

    #[test]
    fn session_cookie_parsing() {
        assert_eq!(
            parse_session_cookie("lang=en; _gv_sessid=abc123; other=1"),
            Some("abc123")
        );
        assert_eq!(parse_session_cookie("_gv_sessid=xyz"), Some("xyz"));
        assert_eq!(parse_session_cookie("lang=en"), None);
    }

    #[test]
    fn form_encoding_for_diagnostics() {
        let form = [
            ("train", "741К".to_string()),
            ("another_ec", "0".to_string()),
        ];
        assert_eq!(encode_form(&form), "train=741К&another_ec=0");
    }
}
