use serde::{Deserialize, Serialize};
use std::fmt;

/// `/me` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileResult {
    pub username: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub username: String,
    pub name: String,
    pub login_name: String,
    pub bio: Option<String>,
}

impl From<ProfileResult> for Profile {
    fn from(result: ProfileResult) -> Self {
        let last_name = result.last_name.unwrap_or_default();
        let name = format!("{} {}", result.first_name, last_name)
            .trim()
            .to_string();
        Profile {
            login_name: format!("@{}", result.username),
            username: result.username,
            name,
            bio: result.bio,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSummary<'a> {
    username: &'a str,
    name: &'a str,
    login_name: &'a str,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = ProfileSummary {
            username: &self.username,
            name: &self.name,
            login_name: &self.login_name,
        };
        let s = serde_json::to_string(&summary).map_err(|_| fmt::Error)?;
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileImage {
    pub small: String,
}

/// `/users/{username}` response, reduced to the avatar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResult {
    pub profile_image: ProfileImage,
}
