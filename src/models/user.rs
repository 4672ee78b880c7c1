use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A stored user account.
///
/// Optional text attributes are stored as empty strings when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Identifier assigned by the provisioning client
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// `sha256$<hex>` digest, or empty when no password is set
    #[serde(skip_serializing)]
    pub password: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Writable attributes of this user.
    pub fn fields(&self) -> UserFields {
        UserFields {
            username: self.username.clone(),
            external_id: self.external_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            is_active: self.is_active,
        }
    }

    /// Overwrite the writable attributes, keeping id and join date.
    pub fn apply(&mut self, fields: UserFields) {
        self.username = fields.username;
        self.external_id = fields.external_id;
        self.first_name = fields.first_name;
        self.last_name = fields.last_name;
        self.email = fields.email;
        self.password = fields.password;
        self.is_active = fields.is_active;
    }

    /// `"first last"` when both names are set, otherwise the username.
    pub fn display_name(&self) -> String {
        if !self.first_name.is_empty() && !self.last_name.is_empty() {
            format!("{} {}", self.first_name, self.last_name)
        } else {
            self.username.clone()
        }
    }

    /// `"first last"`, trimmed when either part is missing.
    pub fn formatted_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Attributes written on create and full replace.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct UserFields {
    #[validate(length(min = 1, max = 150, message = "userName must be 1 to 150 characters"))]
    pub username: String,
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Already hashed
    pub password: String,
    pub is_active: bool,
}

impl Default for UserFields {
    fn default() -> Self {
        Self {
            username: String::new(),
            external_id: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: String::new(),
            is_active: true,
        }
    }
}
