//! Configuration module
//!
//! Configuration is read once at startup from the environment (and a `.env`
//! file when present), then overridden by command-line flags. The resulting
//! structs are immutable and handed to components by reference.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use crate::auth::AuthToken;
use crate::models::{LocationInfo, LocationType};

pub const DEFAULT_SHOCK_URL: &str = "http://shock.mg-rast.org";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Which transport the client should use for uploads, downloads and auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportPreference {
    /// Use the external helper when it is installed, HTTP otherwise
    #[default]
    Auto,
    Http,
    External,
}

impl FromStr for TransportPreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(TransportPreference::Auto),
            "http" => Ok(TransportPreference::Http),
            "external" | "shock-client" => Ok(TransportPreference::External),
            _ => Err(anyhow::anyhow!("Invalid transport: {}", s)),
        }
    }
}

impl Display for TransportPreference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TransportPreference::Auto => write!(f, "auto"),
            TransportPreference::Http => write!(f, "http"),
            TransportPreference::External => write!(f, "external"),
        }
    }
}

/// Connection settings for the Shock service.
#[derive(Clone, Debug)]
pub struct ShockConfig {
    pub base_url: String,
    pub auth: Option<AuthToken>,
    pub timeout: Duration,
    pub transport: TransportPreference,
}

impl ShockConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            transport: TransportPreference::Auto,
        }
    }

    /// Read SHOCK_URL (or SHOCK_HOST/SHOCK_PORT), SHOCK_TOKEN, SHOCK_TIMEOUT_SECS
    /// and SHOCK_TRANSPORT.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let base_url = env::var("SHOCK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                env::var("SHOCK_HOST").ok().map(|host| {
                    let host = if host.contains("://") {
                        host
                    } else {
                        format!("http://{}", host)
                    };
                    match env::var("SHOCK_PORT") {
                        Ok(port) if !port.trim().is_empty() => format!("{}:{}", host, port.trim()),
                        _ => host,
                    }
                })
            })
            .unwrap_or_else(|| DEFAULT_SHOCK_URL.to_string());

        let timeout_secs = env::var("SHOCK_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let transport = match env::var("SHOCK_TRANSPORT") {
            Ok(value) => value.parse()?,
            Err(_) => TransportPreference::Auto,
        };

        let mut config = Self::new(base_url);
        config.auth = env::var("SHOCK_TOKEN")
            .ok()
            .and_then(|t| AuthToken::parse(&t));
        config.timeout = Duration::from_secs(timeout_secs);
        config.transport = transport;
        Ok(config)
    }

    /// Replace the base URL when a flag supplied one.
    pub fn with_base_url(mut self, base_url: Option<&str>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self
    }

    /// Replace the token when a flag supplied one.
    pub fn with_token(mut self, token: Option<&str>) -> Self {
        if let Some(auth) = token.and_then(AuthToken::parse) {
            self.auth = Some(auth);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_transport(mut self, transport: TransportPreference) -> Self {
        self.transport = transport;
        self
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "Missing http:// prefix for Shock URL: {}",
                self.base_url
            ));
        }

        if self.timeout.is_zero() {
            return Err(anyhow::anyhow!("SHOCK_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }
}

/// Credentials and target of an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3Config {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
}

impl S3Config {
    /// Read S3_ACCESS_KEY, S3_SECRET_ACCESS_KEY, S3_ENDPOINT_URL, S3_BUCKET_NAME
    /// and S3_REGION.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            access_key_id: non_empty("S3_ACCESS_KEY"),
            secret_access_key: non_empty("S3_SECRET_ACCESS_KEY"),
            endpoint_url: non_empty("S3_ENDPOINT_URL"),
            bucket: non_empty("S3_BUCKET_NAME"),
            region: non_empty("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
        }
    }

    /// Take endpoint, bucket and region from an S3 location definition.
    pub fn apply_location(mut self, info: &LocationInfo) -> Result<Self, anyhow::Error> {
        if info.location_type != LocationType::S3 {
            return Err(anyhow::anyhow!(
                "Unsupported location type: {}",
                info.location_type
            ));
        }
        if !info.url.is_empty() {
            self.endpoint_url = Some(info.url.clone());
        }
        if !info.bucket.is_empty() {
            self.bucket = Some(info.bucket.clone());
        }
        if !info.region.is_empty() {
            self.region = info.region.clone();
        }
        Ok(self)
    }

    /// Apply command-line overrides; `None` keeps the current value.
    pub fn with_overrides(
        mut self,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        endpoint_url: Option<String>,
        bucket: Option<String>,
        region: Option<String>,
    ) -> Self {
        if access_key_id.is_some() {
            self.access_key_id = access_key_id;
        }
        if secret_access_key.is_some() {
            self.secret_access_key = secret_access_key;
        }
        if endpoint_url.is_some() {
            self.endpoint_url = endpoint_url;
        }
        if bucket.is_some() {
            self.bucket = bucket;
        }
        if let Some(region) = region {
            self.region = region;
        }
        self
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.bucket.is_none() {
            return Err(anyhow::anyhow!("S3 bucket not configured (S3_BUCKET_NAME)"));
        }
        if self.access_key_id.is_none() || self.secret_access_key.is_none() {
            return Err(anyhow::anyhow!(
                "S3 credentials not configured (S3_ACCESS_KEY, S3_SECRET_ACCESS_KEY)"
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("S3Config")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint_url", &self.endpoint_url)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}
