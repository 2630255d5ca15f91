use serde::Deserialize;
use uuid::Uuid;

use super::{set, set_opt, ValidationErrors, Validator};
use crate::database::schema::Document;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";
const MAX_NAME: usize = 50;
const MAX_DESCRIPTION: usize = 500;

/// Bootcamp fields a client may write. Owner and averages are never taken from the body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
    pub photo: Option<String>,
}

impl BootcampInput {
    fn check_text(&self, v: &mut Validator) {
        v.max_len(self.name.as_deref().map(str::trim), MAX_NAME, "Name can not be more than 50 characters");
        v.max_len(
            self.description.as_deref(),
            MAX_DESCRIPTION,
            "Description can not be more than 500 characters",
        );
    }

    fn write_optional(self, doc: &mut Document) {
        set_opt(doc, "website", self.website);
        set_opt(doc, "phone", self.phone);
        set_opt(doc, "email", self.email);
        set_opt(doc, "address", self.address);
        set_opt(doc, "careers", self.careers);
        set_opt(doc, "photo", self.photo);
    }

    pub fn into_new(self, owner: Uuid) -> Result<Document, ValidationErrors> {
        let mut v = Validator::new();
        let name = v.required(&self.name, "Please add a name").map(str::to_string);
        let description = v.required(&self.description, "Please add a description").map(str::to_string);
        self.check_text(&mut v);

        let mut doc = Document::new();
        set_opt(&mut doc, "name", name);
        set_opt(&mut doc, "description", description);
        set(&mut doc, "housing", self.housing.unwrap_or(false));
        set(&mut doc, "jobAssistance", self.job_assistance.unwrap_or(false));
        set(&mut doc, "jobGuarantee", self.job_guarantee.unwrap_or(false));
        set(&mut doc, "acceptGi", self.accept_gi.unwrap_or(false));
        set(&mut doc, "photo", DEFAULT_PHOTO);
        set(&mut doc, "user", owner.to_string());
        self.write_optional(&mut doc);

        v.finish(doc)
    }

    pub fn into_changes(self) -> Result<Document, ValidationErrors> {
        let mut v = Validator::new();
        let mut doc = Document::new();
        if self.name.is_some() {
            let name = v.required(&self.name, "Please add a name");
            set_opt(&mut doc, "name", name);
        }
        if self.description.is_some() {
            let description = v.required(&self.description, "Please add a description");
            set_opt(&mut doc, "description", description);
        }
        self.check_text(&mut v);

        set_opt(&mut doc, "housing", self.housing);
        set_opt(&mut doc, "jobAssistance", self.job_assistance);
        set_opt(&mut doc, "jobGuarantee", self.job_guarantee);
        set_opt(&mut doc, "acceptGi", self.accept_gi);
        self.write_optional(&mut doc);

        v.finish(doc)
    }
}
