//! Signed payload field set.

use crate::models::timestamp::{TemporalError, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed request parameters
///
/// Keys are kept in byte order, which is also the canonical signing order.
pub type Params = BTreeMap<String, String>;

pub const APP_DATA_FIELD: &str = "appData";
pub const ISSUED_AT_FIELD: &str = "issuedAt";
pub const LOCALE_FIELD: &str = "locale";
pub const NETWORK_EID_FIELD: &str = "networkEID";
pub const USER_EID_FIELD: &str = "userEID";
pub const ROLE_FIELD: &str = "role";
pub const SIGNATURE_FIELD: &str = "signature";

/// Keys that must be present (possibly empty) in every signed request
pub const REQUIRED_FIELDS: [&str; 7] = [
    APP_DATA_FIELD,
    ISSUED_AT_FIELD,
    LOCALE_FIELD,
    NETWORK_EID_FIELD,
    USER_EID_FIELD,
    ROLE_FIELD,
    SIGNATURE_FIELD,
];

/// Typed view of the parameters the host platform signs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    pub app_data: String,
    pub issued_at: String,
    pub locale: String,
    #[serde(rename = "networkEID")]
    pub network_eid: String,
    #[serde(rename = "userEID")]
    pub user_eid: String,
    pub role: String,
    pub signature: String,
}

impl SignedPayload {
    /// Required keys absent from `params`, in declaration order
    pub fn missing_fields(params: &Params) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !params.contains_key(*field))
            .collect()
    }

    /// Extract the payload fields; `None` when any required key is absent
    pub fn from_params(params: &Params) -> Option<Self> {
        let field = |name: &str| params.get(name).cloned();
        Some(Self {
            app_data: field(APP_DATA_FIELD)?,
            issued_at: field(ISSUED_AT_FIELD)?,
            locale: field(LOCALE_FIELD)?,
            network_eid: field(NETWORK_EID_FIELD)?,
            user_eid: field(USER_EID_FIELD)?,
            role: field(ROLE_FIELD)?,
            signature: field(SIGNATURE_FIELD)?,
        })
    }

    pub fn into_params(self) -> Params {
        Params::from([
            (APP_DATA_FIELD.to_string(), self.app_data),
            (ISSUED_AT_FIELD.to_string(), self.issued_at),
            (LOCALE_FIELD.to_string(), self.locale),
            (NETWORK_EID_FIELD.to_string(), self.network_eid),
            (USER_EID_FIELD.to_string(), self.user_eid),
            (ROLE_FIELD.to_string(), self.role),
            (SIGNATURE_FIELD.to_string(), self.signature),
        ])
    }

    pub fn issued_at(&self) -> Result<Timestamp, TemporalError> {
        Timestamp::parse(&self.issued_at)
    }
}
