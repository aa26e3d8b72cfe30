use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    pub email_id: String,
    #[serde(default)]
    pub user_type_id: Option<i64>,
    #[serde(default)]
    pub is_deleted: i64,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserType {
    pub id: i64,
    pub user_type: String,
}

/// Signup form payload
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub mobile_number: String,
    pub email_id: String,
    pub password: String,
    pub user_type_id: i64,
}

/// Editable profile fields; unset fields are left out of the request
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.address.is_none()
            && self.mobile_number.is_none()
    }
}
