use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::StoreError;

/// The untyped field mapping of a stored record. The store-assigned id is
/// never kept inside the mapping itself.
pub type Fields = serde_json::Map<String, Value>;

/// A record as returned by collection-wide fetches: the stored field mapping
/// merged with the store-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Fields,
}

/// The shaped output of equality-filter queries. Callers resolving a user
/// profile expect these four keys to exist on every element, even when the
/// underlying record lacks them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub email: Option<Value>,
    pub fullname: Option<Value>,
    pub phone: Option<Value>,
    pub password: Option<Value>,
    #[serde(flatten)]
    pub extra: Fields,
}

impl ProfileRecord {
    /// Shapes a stored record into the profile form, pulling the known keys
    /// out of the mapping so each serializes exactly once.
    pub fn from_fields(id: Uuid, mut fields: Fields) -> Self {
        let email = fields.remove("email");
        let fullname = fields.remove("fullname");
        let phone = fields.remove("phone");
        let password = fields.remove("password");

        Self {
            id,
            email,
            fullname,
            phone,
            password,
            extra: fields,
        }
    }
}

/// Legacy status shape for write operations: a bare boolean with no failure
/// detail. Kept for callers that still consume the `{ "status": bool }` form;
/// new callers should inspect the `Result` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteStatus {
    pub status: bool,
}

impl From<&Result<(), StoreError>> for WriteStatus {
    fn from(result: &Result<(), StoreError>) -> Self {
        Self {
            status: result.is_ok(),
        }
    }
}
