use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Header set by the front-door authentication layer
pub const CLIENT_PRINCIPAL_HEADER: &str = "x-ms-client-principal";

/// Claim type carrying the caller's tenant id
pub const TENANT_CLAIM: &str = "tid";

// Front-door producers differ on padding; accept both.
const PRINCIPAL_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrincipalError {
    #[error("client principal header is missing")]
    Missing,

    #[error("client principal could not be decoded: {0}")]
    Malformed(String),

    #[error("userId not found in client principal")]
    MissingUserId,

    #[error("tenant id not found in client principal claims")]
    MissingTenantId,
}

/// One claim of the identity assertion.
///
/// Producers spell the type as `typ` or `type`; both are kept so a claim
/// matches when either one names the wanted type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    #[serde(rename = "typ", skip_serializing_if = "Option::is_none")]
    pub short_type: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub long_type: Option<String>,
    #[serde(rename = "val")]
    pub value: String,
}

impl Claim {
    fn from_wire(item: &Value) -> Option<Self> {
        let object = item.as_object()?;
        Some(Self {
            short_type: string_field(object, "typ"),
            long_type: string_field(object, "type"),
            // `val` wins over `value` unless it is empty
            value: string_field(object, "val")
                .filter(|v| !v.is_empty())
                .or_else(|| string_field(object, "value"))
                .unwrap_or_default(),
        })
    }

    pub fn is(&self, claim_type: &str) -> bool {
        self.short_type.as_deref() == Some(claim_type) || self.long_type.as_deref() == Some(claim_type)
    }
}

// Fields other than `userId` and `claims` only feed diagnostics, so a value
// of the wrong shape is read as absent instead of failing the request.
fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Decoded identity assertion of the current caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPrincipal {
    pub user_id: Option<String>,
    pub identity_provider: Option<String>,
    pub user_details: Option<String>,
    pub user_roles: Vec<String>,
    pub claims: Vec<Claim>,
}

/// The two identifiers the admin-status pipeline needs from a principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalIdentity {
    pub user_id: String,
    pub tenant_id: String,
}

impl ClientPrincipal {
    /// Decode a base64 JSON assertion as sent in the principal header
    pub fn decode(header: &str) -> Result<Self, PrincipalError> {
        let bytes = PRINCIPAL_ENGINE
            .decode(header.trim())
            .map_err(|e| PrincipalError::Malformed(format!("invalid base64: {}", e)))?;

        let text = String::from_utf8(bytes)
            .map_err(|e| PrincipalError::Malformed(format!("invalid utf-8: {}", e)))?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PrincipalError::Malformed(format!("invalid json: {}", e)))?;

        let Value::Object(object) = value else {
            return Err(PrincipalError::Malformed("principal is not a JSON object".to_string()));
        };

        let user_roles = object
            .get("userRoles")
            .and_then(Value::as_array)
            .map(|roles| roles.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        // A non-array `claims` is treated as no claims at all
        let claims = object
            .get("claims")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Claim::from_wire).collect())
            .unwrap_or_default();

        Ok(Self {
            user_id: string_field(&object, "userId"),
            identity_provider: string_field(&object, "identityProvider"),
            user_details: string_field(&object, "userDetails"),
            user_roles,
            claims,
        })
    }

    /// Value of the first claim of the given type
    pub fn claim(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|claim| claim.is(claim_type))
            .map(|claim| claim.value.as_str())
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.claim(TENANT_CLAIM).filter(|tid| !tid.is_empty())
    }

    pub fn identity(&self) -> Result<PrincipalIdentity, PrincipalError> {
        let user_id = self
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(PrincipalError::MissingUserId)?;

        let tenant_id = self.tenant_id().ok_or(PrincipalError::MissingTenantId)?;

        Ok(PrincipalIdentity {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
        })
    }
}

/// Extract `(userId, tenantId)` from the raw principal header value.
pub fn extract_identity(header: Option<&str>) -> Result<PrincipalIdentity, PrincipalError> {
    let header = header
        .filter(|h| !h.trim().is_empty())
        .ok_or(PrincipalError::Missing)?;

    let principal = ClientPrincipal::decode(header)?;
    tracing::debug!(
        "Client principal decoded: provider={:?} details={:?} roles={:?} claims={}",
        principal.identity_provider,
        principal.user_details,
        principal.user_roles,
        principal.claims.len()
    );

    let identity = principal.identity()?;
    tracing::debug!(
        "Identity extracted: user {} in tenant {}",
        identity.user_id,
        identity.tenant_id
    );

    Ok(identity)
}

/// Which claim field names to emit when building an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimSpelling {
    /// `typ` / `val`
    Short,
    /// `type` / `value`
    Long,
}

/// Build a base64 assertion for `user_id` carrying a `tid` claim.
/// Used by the CLI and tests to fabricate front-door headers.
pub fn encode_assertion(user_id: &str, tenant_id: &str, spelling: ClaimSpelling) -> String {
    let claim = match spelling {
        ClaimSpelling::Short => serde_json::json!({ "typ": TENANT_CLAIM, "val": tenant_id }),
        ClaimSpelling::Long => serde_json::json!({ "type": TENANT_CLAIM, "value": tenant_id }),
    };

    let principal = serde_json::json!({
        "identityProvider": "aad",
        "userId": user_id,
        "claims": [claim],
    });

    PRINCIPAL_ENGINE.encode(principal.to_string())
}
