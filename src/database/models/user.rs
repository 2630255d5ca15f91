use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{set, set_opt, ValidationErrors, Validator};
use crate::database::schema::Document;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("invalid email pattern")
});

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "publisher" => Some(Role::Publisher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Reads the role of a stored user document. Anything unrecognised is the least privileged role.
    pub fn of(doc: &Document) -> Self {
        doc.get("role").and_then(Value::as_str).and_then(Role::parse).unwrap_or(Role::User)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User fields accepted from a request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// A validated user that still needs its password hashed.
#[derive(Debug)]
pub struct NewUser {
    pub document: Document,
    pub password: String,
}

impl NewUser {
    pub fn with_password_hash(mut self, hash: String) -> Document {
        set(&mut self.document, "password", hash);
        self.document
    }
}

fn check_email(v: &mut Validator, email: Option<&str>) {
    if let Some(email) = email {
        v.check(EMAIL_PATTERN.is_match(email), "Please add a valid email");
    }
}

fn check_role(v: &mut Validator, role: Option<&str>, allow_admin: bool) -> Option<Role> {
    let role = role?;
    match Role::parse(role) {
        Some(Role::Admin) if !allow_admin => {
            v.check(false, format!("`{}` is not a valid role", role));
            None
        }
        Some(parsed) => Some(parsed),
        None => {
            v.check(false, format!("`{}` is not a valid role", role));
            None
        }
    }
}

pub fn check_password(v: &mut Validator, password: Option<&str>) {
    if let Some(password) = password {
        v.check(
            password.chars().count() >= MIN_PASSWORD_LEN,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
}

impl UserInput {
    /// Validates a new user. `admin` is only assignable when `allow_admin` is set.
    pub fn into_new(self, allow_admin: bool) -> Result<NewUser, ValidationErrors> {
        let mut v = Validator::new();
        let name = v.required(&self.name, "Please add a name").map(str::to_string);
        let email = v.required(&self.email, "Please add an email").map(str::to_string);
        check_email(&mut v, email.as_deref());

        let password = match self.password.as_deref() {
            Some(p) if !p.is_empty() => Some(p.to_string()),
            _ => {
                v.check(false, "Please add a password");
                None
            }
        };
        check_password(&mut v, password.as_deref());
        let role = check_role(&mut v, self.role.as_deref().map(str::trim), allow_admin);

        let mut doc = Document::new();
        set_opt(&mut doc, "name", name);
        set_opt(&mut doc, "email", email);
        set(&mut doc, "role", role.unwrap_or(Role::User).as_str());

        let document = v.finish(doc)?;
        Ok(NewUser { document, password: password.unwrap_or_default() })
    }

    /// Validates a partial update. Passwords are changed through their own endpoint and never here;
    /// `role` is only honoured when `allow_role` is set.
    pub fn into_changes(self, allow_role: bool) -> Result<Document, ValidationErrors> {
        let mut v = Validator::new();
        let mut doc = Document::new();

        if self.name.is_some() {
            let name = v.required(&self.name, "Please add a name");
            set_opt(&mut doc, "name", name);
        }
        if self.email.is_some() {
            let email = v.required(&self.email, "Please add an email");
            check_email(&mut v, email);
            set_opt(&mut doc, "email", email);
        }
        if allow_role {
            let role = check_role(&mut v, self.role.as_deref().map(str::trim), true);
            set_opt(&mut doc, "role", role.map(|r| r.as_str()));
        }

        v.finish(doc)
    }
}
