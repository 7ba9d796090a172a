//! Report entity model: typed ids, enumerations, and ingest normalization.
//!
//! Everything that arrives from the backend or the local cache passes through
//! this module before any other layer sees it. Raw wire records are loose on
//! purpose (every field optional, camelCase and snake_case accepted); the typed
//! entities are only produced by [`normalize`], [`User::from_raw`] and
//! [`Notification::from_raw`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

pub const ANONYMOUS_REPORTER: &str = "Anonymous";

/// Placeholder address the reporting form submits when no address was given.
pub const UNSPECIFIED_ADDRESS: &str = "Location not specified";

pub const HIGH_SEVERITY_KEYWORDS: &[&str] =
    &["urgent", "emergency", "severe", "critical", "life-threatening"];
pub const MEDIUM_SEVERITY_KEYWORDS: &[&str] = &["important", "significant", "moderate"];

// --- Typed IDs ---

macro_rules! numeric_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(ReportId);
numeric_id!(UserId);
numeric_id!(NotificationId);

/// An id as the backend may send it: a JSON number or a numeric string.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<u64> for WireId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

// --- Enumerations ---

fn canonical_token(s: &str) -> String {
    s.trim().to_uppercase().replace(['-', ' '], "_")
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Fire,
    Flood,
    Medical,
    Crime,
    Accident,
    NaturalDisaster,
    Other,
}

impl Category {
    pub const ALL: [Self; 7] = [
        Self::Fire,
        Self::Flood,
        Self::Medical,
        Self::Crime,
        Self::Accident,
        Self::NaturalDisaster,
        Self::Other,
    ];

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match canonical_token(s).as_str() {
            "FIRE" => Some(Self::Fire),
            "FLOOD" => Some(Self::Flood),
            "MEDICAL" => Some(Self::Medical),
            "CRIME" => Some(Self::Crime),
            "ACCIDENT" => Some(Self::Accident),
            "NATURAL_DISASTER" | "NATURALDISASTER" => Some(Self::NaturalDisaster),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fire => "FIRE",
            Self::Flood => "FLOOD",
            Self::Medical => "MEDICAL",
            Self::Crime => "CRIME",
            Self::Accident => "ACCIDENT",
            Self::NaturalDisaster => "NATURAL_DISASTER",
            Self::Other => "OTHER",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Flood => "Flood",
            Self::Medical => "Medical",
            Self::Crime => "Crime",
            Self::Accident => "Accident",
            Self::NaturalDisaster => "Natural Disaster",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Canonical report status. `ACTIVE` and `UNRESOLVED` are legacy spellings of
/// `PENDING` and never survive ingestion.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    #[default]
    #[serde(alias = "ACTIVE", alias = "UNRESOLVED")]
    Pending,
    Assigned,
    InProgress,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Assigned, Self::InProgress, Self::Resolved];

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match canonical_token(s).as_str() {
            "PENDING" | "ACTIVE" | "UNRESOLVED" | "OPEN" | "NEW" => Some(Self::Pending),
            "ASSIGNED" => Some(Self::Assigned),
            "IN_PROGRESS" | "INPROGRESS" => Some(Self::InProgress),
            "RESOLVED" => Some(Self::Resolved),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Assigned => "Assigned",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Whether a report in this status may carry a responder.
    #[must_use]
    pub const fn allows_responder(self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress | Self::Resolved)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match canonical_token(s).as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword classes are checked high first, so any high keyword wins.
#[must_use]
pub fn derive_severity(description: &str) -> Severity {
    let text = description.to_lowercase();
    if HIGH_SEVERITY_KEYWORDS.iter().any(|k| text.contains(k)) {
        Severity::High
    } else if MEDIUM_SEVERITY_KEYWORDS.iter().any(|k| text.contains(k)) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Citizen,
    Responder,
    Admin,
}

impl Role {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let token = canonical_token(s);
        match token.strip_prefix("ROLE_").unwrap_or(&token) {
            "CITIZEN" | "USER" => Some(Self::Citizen),
            "RESPONDER" => Some(Self::Responder),
            "ADMIN" | "ADMINISTRATOR" => Some(Self::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Citizen => "CITIZEN",
            Self::Responder => "RESPONDER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    #[default]
    Email,
    Sms,
    InApp,
}

impl NotificationChannel {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match canonical_token(s).as_str() {
            "EMAIL" => Some(Self::Email),
            "SMS" => Some(Self::Sms),
            "IN_APP" | "INAPP" | "PUSH" => Some(Self::InApp),
            _ => None,
        }
    }
}

// --- Location ---

/// Validated lat/lon
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    lat: f64,
    lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite()
            || !lon.is_finite()
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lon)
        {
            return Err(ValidationError::InvalidCoordinate { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    /// Re-checks a value that may have bypassed [`LatLon::new`] via deserialization.
    pub fn revalidate(self) -> Result<Self, ValidationError> {
        Self::new(self.lat, self.lon)
    }
}

/// The authoritative location of a report. An address, when present, wins for
/// display; coordinates stored alongside it stay available to the map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Location<'a> {
    Address {
        address: &'a str,
        coordinates: Option<LatLon>,
    },
    Coordinates(LatLon),
}

impl Location<'_> {
    #[must_use]
    pub fn coordinates(&self) -> Option<LatLon> {
        match self {
            Self::Address { coordinates, .. } => *coordinates,
            Self::Coordinates(c) => Some(*c),
        }
    }

    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Address { address, .. } => (*address).to_string(),
            Self::Coordinates(c) => format!("{:.5}, {:.5}", c.lat(), c.lon()),
        }
    }
}

/// Location as entered on the reporting form: exactly one authoritative form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationInput {
    Coordinates(LatLon),
    Address {
        address: String,
        coordinates: Option<LatLon>,
    },
}

// --- Crisis report ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrisisReport {
    pub id: ReportId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: ReportStatus,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub reporter_id: Option<UserId>,
    pub reporter_name: String,
    #[serde(default)]
    pub responder_id: Option<UserId>,
    #[serde(default)]
    pub responders: u32,
    #[serde(default)]
    pub report_time: Option<DateTime<Utc>>,
}

impl CrisisReport {
    /// `None` only for records that bypassed [`normalize`].
    #[must_use]
    pub fn location(&self) -> Option<Location<'_>> {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => LatLon::new(lat, lon).ok(),
            _ => None,
        };
        match (self.address.as_deref(), coordinates) {
            (Some(address), coordinates) => Some(Location::Address {
                address,
                coordinates,
            }),
            (None, Some(c)) => Some(Location::Coordinates(c)),
            (None, None) => None,
        }
    }

    #[must_use]
    pub fn display_location(&self) -> String {
        self.location()
            .map_or_else(|| UNSPECIFIED_ADDRESS.to_string(), |l| l.display())
    }

    #[must_use]
    pub fn is_assigned_to(&self, user_id: UserId) -> bool {
        self.responder_id == Some(user_id)
    }

    #[must_use]
    pub fn is_reported_by(&self, user_id: UserId) -> bool {
        self.reporter_id == Some(user_id)
    }

    #[must_use]
    pub fn description_preview(&self, max_len: usize) -> String {
        if self.description.chars().count() <= max_len {
            return self.description.clone();
        }
        let mut preview: String = self
            .description
            .chars()
            .take(max_len.saturating_sub(3))
            .collect();
        preview.push_str("...");
        preview
    }
}

/// Report exactly as the backend (or an older cache) serialized it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    pub id: Option<WireId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    #[serde(alias = "reporter_id")]
    pub reporter_id: Option<WireId>,
    #[serde(alias = "reporter_name")]
    pub reporter_name: Option<String>,
    #[serde(alias = "responder_id")]
    pub responder_id: Option<WireId>,
    pub responders: Option<i64>,
    #[serde(alias = "report_time")]
    pub report_time: Option<String>,
}

impl From<&CrisisReport> for RawReport {
    fn from(report: &CrisisReport) -> Self {
        Self {
            id: Some(WireId::Number(report.id.get())),
            title: Some(report.title.clone()),
            description: Some(report.description.clone()),
            category: Some(report.category.as_str().to_string()),
            status: Some(report.status.as_str().to_string()),
            severity: Some(report.severity.as_str().to_string()),
            latitude: report.latitude,
            longitude: report.longitude,
            address: report.address.clone(),
            reporter_id: report.reporter_id.map(|id| WireId::Number(id.get())),
            reporter_name: Some(report.reporter_name.clone()),
            responder_id: report.responder_id.map(|id| WireId::Number(id.get())),
            responders: Some(i64::from(report.responders)),
            report_time: report.report_time.map(|t| t.to_rfc3339()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        None => Err(ValidationError::MissingField(field)),
        Some(v) if v.trim().is_empty() => Err(ValidationError::EmptyField(field)),
        Some(v) => Ok(v.trim().to_string()),
    }
}

fn optional_id(value: Option<&WireId>, field: &'static str) -> Result<Option<u64>, ValidationError> {
    match value {
        None => Ok(None),
        Some(WireId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(id) => id
            .as_u64()
            .map(Some)
            .ok_or(ValidationError::InvalidId(field)),
    }
}

fn required_id(value: Option<&WireId>, field: &'static str) -> Result<u64, ValidationError> {
    optional_id(value, field)?.ok_or(ValidationError::MissingField(field))
}

/// Accepts RFC 3339 or a zone-less ISO-8601 timestamp (taken as UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| ValidationError::InvalidTimestamp(value.to_string()))
}

fn optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>, ValidationError> {
    non_blank(value).map(|v| parse_timestamp(&v)).transpose()
}

/// Validates a raw record and produces the canonical report.
pub fn normalize(raw: RawReport) -> Result<CrisisReport, ValidationError> {
    let id = ReportId(required_id(raw.id.as_ref(), "id")?);
    let title = required_text(raw.title, "title")?;
    let description = required_text(raw.description, "description")?;

    let category = match non_blank(raw.category) {
        None => return Err(ValidationError::MissingField("category")),
        Some(c) => Category::parse(&c).ok_or(ValidationError::UnknownCategory(c))?,
    };

    let status = match non_blank(raw.status) {
        None => ReportStatus::Pending,
        Some(s) => ReportStatus::parse(&s).ok_or(ValidationError::UnknownStatus(s))?,
    };

    let severity = match non_blank(raw.severity) {
        None => derive_severity(&description),
        Some(s) => Severity::parse(&s).ok_or(ValidationError::UnknownSeverity(s))?,
    };

    let address = non_blank(raw.address).filter(|a| !a.eq_ignore_ascii_case(UNSPECIFIED_ADDRESS));
    let coordinates = match (raw.latitude, raw.longitude) {
        (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)?),
        (None, None) => None,
        _ => return Err(ValidationError::IncompleteCoordinates),
    };
    if address.is_none() && coordinates.is_none() {
        return Err(ValidationError::MissingLocation);
    }

    let responders = match raw.responders {
        None => 0,
        Some(n) if n < 0 => return Err(ValidationError::NegativeResponders(n)),
        Some(n) => u32::try_from(n).map_err(|_| ValidationError::ResponderCountOverflow(n))?,
    };

    let responder_id = optional_id(raw.responder_id.as_ref(), "responderId")?.map(UserId);
    if responder_id.is_some() && !status.allows_responder() {
        return Err(ValidationError::ResponderOnUnassignedReport { status });
    }

    Ok(CrisisReport {
        id,
        title,
        description,
        category,
        status,
        severity,
        latitude: coordinates.map(LatLon::lat),
        longitude: coordinates.map(LatLon::lon),
        address,
        reporter_id: optional_id(raw.reporter_id.as_ref(), "reporterId")?.map(UserId),
        reporter_name: non_blank(raw.reporter_name)
            .unwrap_or_else(|| ANONYMOUS_REPORTER.to_string()),
        responder_id,
        responders,
        report_time: optional_timestamp(raw.report_time)?,
    })
}

// --- Report creation ---

/// A report as drafted by the reporting form, before the backend assigns an id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: LocationInput,
}

/// Body of `POST /crisis-reports`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportPayload {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: ReportStatus,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub reporter_id: Option<UserId>,
    pub reporter_name: String,
    pub responders: u32,
}

impl NewReport {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyField("description"));
        }
        match &self.location {
            LocationInput::Coordinates(c) => {
                c.revalidate()?;
            }
            LocationInput::Address {
                address,
                coordinates,
            } => {
                if address.trim().is_empty() {
                    return Err(ValidationError::MissingLocation);
                }
                if let Some(c) = coordinates {
                    c.revalidate()?;
                }
            }
        }
        Ok(())
    }

    /// Severity is derived here and nowhere else; the reporter cannot set it.
    pub fn into_payload(self, reporter: Option<&Actor>) -> Result<CreateReportPayload, ValidationError> {
        self.validate()?;
        let severity = derive_severity(&self.description);
        let (latitude, longitude, address) = match self.location {
            LocationInput::Coordinates(c) => (Some(c.lat()), Some(c.lon()), None),
            LocationInput::Address {
                address,
                coordinates,
            } => (
                coordinates.map(LatLon::lat),
                coordinates.map(LatLon::lon),
                Some(address.trim().to_string()),
            ),
        };
        Ok(CreateReportPayload {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
            status: ReportStatus::Pending,
            severity,
            latitude,
            longitude,
            address,
            reporter_id: reporter.map(|a| a.id),
            reporter_name: reporter
                .map_or_else(|| ANONYMOUS_REPORTER.to_string(), |a| a.name.clone()),
            responders: 0,
        })
    }
}

// --- Users ---

/// The signed-in user on whose behalf the core acts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    pub id: Option<WireId>,
    pub name: Option<String>,
    #[serde(alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(alias = "last_name")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
    #[serde(alias = "created_at")]
    pub created_at: Option<String>,
}

impl User {
    pub fn from_raw(raw: RawUser) -> Result<Self, ValidationError> {
        let id = UserId(required_id(raw.id.as_ref(), "id")?);
        let email = required_text(raw.email, "email")?;
        let role = match non_blank(raw.role) {
            None => return Err(ValidationError::MissingField("role")),
            Some(r) => Role::parse(&r).ok_or(ValidationError::UnknownRole(r))?,
        };
        let name = non_blank(raw.name).unwrap_or_else(|| {
            [non_blank(raw.first_name), non_blank(raw.last_name)]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });
        Ok(Self {
            id,
            name,
            email,
            role,
            active: raw.active.unwrap_or(true),
            created_at: optional_timestamp(raw.created_at)?,
        })
    }
}

// --- Notifications ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub channel: NotificationChannel,
    pub is_read: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    pub id: Option<WireId>,
    #[serde(alias = "user_id")]
    pub user_id: Option<WireId>,
    pub message: Option<String>,
    pub channel: Option<String>,
    #[serde(alias = "read", alias = "is_read")]
    pub is_read: Option<bool>,
    #[serde(alias = "sent_at")]
    pub sent_at: Option<String>,
}

impl Notification {
    pub fn from_raw(raw: RawNotification) -> Result<Self, ValidationError> {
        let channel = match non_blank(raw.channel) {
            None => NotificationChannel::default(),
            Some(c) => NotificationChannel::parse(&c).ok_or(ValidationError::UnknownChannel(c))?,
        };
        Ok(Self {
            id: NotificationId(required_id(raw.id.as_ref(), "id")?),
            user_id: UserId(required_id(raw.user_id.as_ref(), "userId")?),
            message: required_text(raw.message, "message")?,
            channel,
            is_read: raw.is_read.unwrap_or(false),
            sent_at: optional_timestamp(raw.sent_at)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn raw_report(id: u64) -> RawReport {
        RawReport {
            id: Some(WireId::Number(id)),
            title: Some(format!("Report {id}")),
            description: Some("Smoke visible from the road".into()),
            category: Some("FIRE".into()),
            status: Some("PENDING".into()),
            severity: None,
            latitude: Some(-25.87),
            longitude: Some(29.23),
            address: Some("Main St".into()),
            reporter_id: Some(WireId::Number(100)),
            reporter_name: Some("Thandi".into()),
            responder_id: None,
            responders: Some(0),
            report_time: Some("2024-05-01T10:15:30".into()),
        }
    }

    pub fn report(id: u64) -> CrisisReport {
        normalize(raw_report(id)).expect("fixture must normalize")
    }

    pub fn assigned_report(id: u64, responder: u64) -> CrisisReport {
        let mut r = report(id);
        r.status = ReportStatus::Assigned;
        r.responder_id = Some(UserId(responder));
        r
    }

    pub fn citizen() -> Actor {
        Actor::new(100, "Thandi", Role::Citizen)
    }

    pub fn responder(id: u64) -> Actor {
        Actor::new(id, format!("Responder {id}"), Role::Responder)
    }

    pub fn admin() -> Actor {
        Actor::new(1, "Admin", Role::Admin)
    }
}
