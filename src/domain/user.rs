//! Site users

use serde::{Deserialize, Serialize};

/// A site user, as far as profile data and group ownership need one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub user_login: String,
    pub display_name: String,
    pub user_email: String,
}
