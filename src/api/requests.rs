//! Request bodies and query strings accepted by the HTTP layer.
//!
//! Each raw type deserializes leniently and is turned into a domain input by
//! its `validate` method, which reports every failing field at once. Nothing
//! reaches the services without passing through one of these.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::database::models::{
    NewPermission, NewRole, PermissionChanges, PermissionFilter, RoleChanges, RoleFilter,
    UserChanges, UserFilter,
};
use crate::error::{ApiError, FieldErrors};
use crate::services::CreateUser;
use crate::types::PageRequest;

const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;

fn is_email(value: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Collects per-field messages.
#[derive(Default)]
struct Checks {
    errors: FieldErrors,
}

impl Checks {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    fn required(&mut self, field: &str, value: Option<String>) -> String {
        match value {
            Some(v) => v,
            None => {
                self.fail(field, format!("{field} is required"));
                String::new()
            }
        }
    }

    fn name(&mut self, field: &str, value: &str, label: &str) {
        if value.trim().chars().count() < MIN_NAME_LEN {
            self.fail(field, format!("{label} must be at least {MIN_NAME_LEN} characters"));
        }
    }

    fn email(&mut self, field: &str, value: &str) {
        if !is_email(value) {
            self.fail(field, "Invalid email format");
        }
    }

    fn password(&mut self, field: &str, value: &str, label: &str) {
        if value.chars().count() < MIN_PASSWORD_LEN {
            self.fail(field, format!("{label} must be at least {MIN_PASSWORD_LEN} characters"));
        }
    }

    fn non_empty(&mut self, field: &str, value: &str, message: &str) {
        if value.is_empty() {
            self.fail(field, message);
        }
    }

    fn pattern(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.fail(field, "Regex pattern is required");
        } else if let Err(e) = Regex::new(value) {
            self.fail(field, format!("Invalid regex pattern: {e}"));
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ApiError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::validation_error("Validation failed", Some(self.errors)))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct Login {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Only presence is checked for the password so that a wrong password
    /// always takes the invalid-credentials path.
    pub fn validate(self) -> Result<Login, ApiError> {
        let mut checks = Checks::default();
        let email = checks.required("email", self.email);
        let password = checks.required("password", self.password);
        checks.email("email", &email);
        checks.non_empty("password", &password, "Password is required");
        checks.finish(Login { email, password })
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, ApiError> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name);
        let email = checks.required("email", self.email);
        let password = checks.required("password", self.password);
        checks.name("name", &name, "Name");
        checks.email("email", &email);
        checks.password("password", &password, "Password");
        checks.finish(Registration {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(self) -> Result<PasswordChange, ApiError> {
        let mut checks = Checks::default();
        let current_password = checks.required("currentPassword", self.current_password);
        let new_password = checks.required("newPassword", self.new_password);
        checks.non_empty("currentPassword", &current_password, "Current password is required");
        checks.password("newPassword", &new_password, "New password");
        checks.finish(PasswordChange {
            current_password,
            new_password,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

impl RefreshRequest {
    pub fn validate(self) -> Result<String, ApiError> {
        let mut checks = Checks::default();
        let token = checks.required("refresh_token", self.refresh_token);
        checks.non_empty("refresh_token", &token, "refresh_token is required");
        checks.finish(token)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePermissionRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub regex: Option<String>,
}

impl CreatePermissionRequest {
    pub fn validate(self) -> Result<NewPermission, ApiError> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name);
        let url = checks.required("url", self.url);
        let regex = checks.required("regex", self.regex);
        checks.name("name", &name, "Permission name");
        checks.non_empty("url", &url, "URL is required");
        checks.pattern("regex", &regex);
        checks.finish(NewPermission { name, url, regex })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePermissionRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub regex: Option<String>,
}

impl UpdatePermissionRequest {
    pub fn validate(self) -> Result<PermissionChanges, ApiError> {
        let mut checks = Checks::default();
        if let Some(name) = &self.name {
            checks.name("name", name, "Permission name");
        }
        if let Some(url) = &self.url {
            checks.non_empty("url", url, "URL is required");
        }
        if let Some(regex) = &self.regex {
            checks.pattern("regex", regex);
        }
        checks.finish(PermissionChanges {
            name: self.name,
            url: self.url,
            regex: self.regex,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<i32>>,
}

impl CreateRoleRequest {
    pub fn validate(self) -> Result<NewRole, ApiError> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name);
        checks.name("name", &name, "Role name");
        checks.finish(NewRole {
            name,
            permission_ids: self.permission_ids.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<i32>>,
}

impl UpdateRoleRequest {
    pub fn validate(self) -> Result<RoleChanges, ApiError> {
        let mut checks = Checks::default();
        if let Some(name) = &self.name {
            checks.name("name", name, "Role name");
        }
        checks.finish(RoleChanges {
            name: self.name,
            permission_ids: self.permission_ids,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role_ids: Option<Vec<i32>>,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<CreateUser, ApiError> {
        let mut checks = Checks::default();
        let name = checks.required("name", self.name);
        let email = checks.required("email", self.email);
        let password = checks.required("password", self.password);
        checks.name("name", &name, "Name");
        checks.email("email", &email);
        checks.password("password", &password, "Password");
        checks.finish(CreateUser {
            name,
            email,
            password,
            role_ids: self.role_ids.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_ids: Option<Vec<i32>>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UserChanges, ApiError> {
        let mut checks = Checks::default();
        if let Some(name) = &self.name {
            checks.name("name", name, "Name");
        }
        if let Some(email) = &self.email {
            checks.email("email", email);
        }
        checks.finish(UserChanges {
            name: self.name,
            email: self.email,
            role_ids: self.role_ids,
        })
    }
}

/// `?page=&limit=` plus the per-resource filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub role_id: Option<i32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ListQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn permission_filter(self) -> PermissionFilter {
        PermissionFilter {
            name: non_blank(self.name),
            url: non_blank(self.url),
        }
    }

    pub fn role_filter(self) -> RoleFilter {
        RoleFilter {
            name: non_blank(self.name),
        }
    }

    pub fn user_filter(self) -> UserFilter {
        UserFilter {
            name: non_blank(self.name),
            email: non_blank(self.email),
            role_id: self.role_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub permanent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_errors(err: ApiError) -> FieldErrors {
        match err {
            ApiError::ValidationError {
                field_errors: Some(fields),
                ..
            } => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn register_reports_every_bad_field() {
        let err = RegisterRequest {
            name: Some("A".into()),
            email: Some("not-an-email".into()),
            password: Some("123".into()),
        }
        .validate()
        .err()
        .unwrap();

        let fields = field_errors(err);
        assert_eq!(fields["name"], "Name must be at least 2 characters");
        assert_eq!(fields["email"], "Invalid email format");
        assert_eq!(fields["password"], "Password must be at least 6 characters");
    }

    #[test]
    fn missing_fields_are_required() {
        let err = CreateUserRequest {
            name: None,
            email: Some("a@b.co".into()),
            password: Some("secret1".into()),
            role_ids: None,
        }
        .validate()
        .err()
        .unwrap();
        assert_eq!(field_errors(err)["name"], "name is required");
    }

    #[test]
    fn login_accepts_short_passwords() {
        let login = LoginRequest {
            email: Some("admin@example.com".into()),
            password: Some("x".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(login.password, "x");
    }

    #[test]
    fn permission_regex_must_compile() {
        let err = CreatePermissionRequest {
            name: Some("broken".into()),
            url: Some("/broken".into()),
            regex: Some("(".into()),
        }
        .validate()
        .err()
        .unwrap();
        assert!(field_errors(err)["regex"].starts_with("Invalid regex pattern"));
    }

    #[test]
    fn role_ids_keep_explicit_empty_list() {
        let body: UpdateUserRequest = serde_json::from_str(r#"{"roleIds": []}"#).unwrap();
        assert_eq!(body.validate().unwrap().role_ids, Some(vec![]));

        let body: UpdateUserRequest = serde_json::from_str(r#"{"name": "Bob"}"#).unwrap();
        assert_eq!(body.validate().unwrap().role_ids, None);
    }

    #[test]
    fn change_password_uses_camel_case() {
        let body: ChangePasswordRequest =
            serde_json::from_str(r#"{"currentPassword": "old", "newPassword": "newpass"}"#)
                .unwrap();
        let change = body.validate().unwrap();
        assert_eq!(change.current_password, "old");
        assert_eq!(change.new_password, "newpass");
    }
}
