use crate::error::{ArmError, ArmResult};
use secrecy::{ExposeSecret, SecretString};

/// Credential types supported by the ARM SDK.
///
/// Resource Manager authenticates every request with an
/// `Authorization: Bearer <token>` header. The token is an Entra ID access
/// token scoped to the management endpoint; acquiring one (device code,
/// client secret, managed identity, ...) is outside the scope of this crate.
#[derive(Clone)]
pub enum ArmCredential {
    /// A pre-acquired bearer token.
    BearerToken(SecretString),
}

impl ArmCredential {
    /// Create a credential from the `AZURE_ARM_ACCESS_TOKEN` environment
    /// variable.
    pub fn from_env() -> ArmResult<Self> {
        match std::env::var("AZURE_ARM_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => Ok(Self::BearerToken(SecretString::from(token))),
            _ => Err(ArmError::Auth(
                "no credential configured. Set AZURE_ARM_ACCESS_TOKEN or pass a credential to the builder.".into(),
            )),
        }
    }

    /// Create a credential from a pre-acquired bearer token.
    pub fn bearer_token(token: impl Into<String>) -> Self {
        Self::BearerToken(SecretString::from(token.into()))
    }

    /// Resolve the credential to an authorization header value.
    pub async fn resolve(&self) -> ArmResult<String> {
        match self {
            Self::BearerToken(token) => Ok(format!("Bearer {}", token.expose_secret())),
        }
    }
}

impl std::fmt::Debug for ArmCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BearerToken(_) => write!(f, "ArmCredential::BearerToken(****)"),
        }
    }
}
