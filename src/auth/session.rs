//! AWS session construction for authenticated requests.
//!
//! The session built here is the sole source of AWS credentials for any
//! S3/STS call made on behalf of the user. Strategy, in order:
//!
//! 1. Embedded credentials from the token.
//! 2. `AssumeRole` on the token's `aws_role_arn` (10s deadline, 3600s
//!    duration, session name `mcp-server-<unix_ts>`).
//! 3. The ambient default provider chain.

use crate::{Error, Result, current_timestamp};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use std::time::Duration;

/// Region applied when neither the token nor the environment names one.
const FALLBACK_REGION: &str = "us-east-1";

/// Credentials embedded in a token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredentialSpec {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
    /// Region override.
    pub region: Option<String>,
}

/// An AWS session scoped to one authenticated identity.
///
/// Cheap to clone; SDK clients are constructed on demand from the shared
/// config.
#[derive(Debug, Clone)]
pub struct AwsSession {
    sdk_config: SdkConfig,
}

impl AwsSession {
    /// Builds a session from embedded credentials.
    pub async fn from_credentials(spec: &AwsCredentialSpec, default_region: Option<&str>) -> Self {
        let region = spec
            .region
            .as_deref()
            .or(default_region)
            .unwrap_or(FALLBACK_REGION)
            .to_string();
        let credentials = Credentials::new(
            spec.access_key_id.clone(),
            spec.secret_access_key.clone(),
            spec.session_token.clone(),
            None,
            "quilt-mcp-static",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(credentials)
            .load()
            .await;
        Self { sdk_config }
    }

    /// Builds a session by assuming a role with the ambient identity.
    ///
    /// # Errors
    ///
    /// Returns `Error::Aws` when `AssumeRole` fails and `Error::Timeout`
    /// when it exceeds its deadline.
    pub async fn assume_role(role_arn: &str, default_region: Option<&str>) -> Result<Self> {
        let ambient = Self::ambient(default_region).await;
        let sts = ambient.sts_client();
        let session_name = format!("mcp-server-{}", current_timestamp());

        let response = tokio::time::timeout(
            Duration::from_secs(10),
            sts.assume_role()
                .role_arn(role_arn)
                .role_session_name(session_name)
                .duration_seconds(3600)
                .send(),
        )
        .await
        .map_err(|_| Error::Timeout("AssumeRole"))?
        .map_err(|e| Error::Aws {
            operation: "AssumeRole",
            message: e.to_string(),
        })?;

        let credentials = response.credentials().ok_or_else(|| Error::Aws {
            operation: "AssumeRole",
            message: format!("AssumeRole for {role_arn} returned no credentials"),
        })?;

        let spec = AwsCredentialSpec {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: Some(credentials.session_token().to_string()),
            region: default_region.map(ToString::to_string),
        };
        Ok(Self::from_credentials(&spec, default_region).await)
    }

    /// Builds a session from the ambient default provider chain.
    pub async fn ambient(default_region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = default_region {
            loader = loader.region(Region::new(region.to_string()));
        }
        Self {
            sdk_config: loader.load().await,
        }
    }

    /// Builds the session for an authenticated request.
    ///
    /// # Errors
    ///
    /// Propagates `AssumeRole` failures; the embedded-credential and
    /// ambient paths cannot fail here.
    pub async fn for_auth(auth: &super::AuthResult, default_region: Option<&str>) -> Result<Self> {
        if let Some(spec) = &auth.aws_credentials {
            return Ok(Self::from_credentials(spec, default_region).await);
        }
        if let Some(role_arn) = &auth.aws_role_arn {
            return Self::assume_role(role_arn, default_region).await;
        }
        Ok(Self::ambient(default_region).await)
    }

    /// Returns an S3 client over this session.
    #[must_use]
    pub fn s3_client(&self) -> aws_sdk_s3::Client {
        aws_sdk_s3::Client::new(&self.sdk_config)
    }

    /// Returns an STS client over this session.
    #[must_use]
    pub fn sts_client(&self) -> aws_sdk_sts::Client {
        aws_sdk_sts::Client::new(&self.sdk_config)
    }

    /// Returns the configured region, if any.
    #[must_use]
    pub fn region(&self) -> Option<String> {
        self.sdk_config.region().map(ToString::to_string)
    }
}
