use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::auth::repo_types::Role;
use crate::portatore::repo_types::PortatoreProfile;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub portatore_id: Uuid,
    /// Overwrite an existing assignment instead of failing with 409.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub is_admin: Option<bool>,
    pub school_code: Option<String>,
    #[serde(default)]
    pub clear_school: bool,
    pub has_subscription: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertPortatoreRequest {
    pub bio: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct PortatoreList {
    pub portatori: Vec<PortatoreProfile>,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<PublicUser>,
}
