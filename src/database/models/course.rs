use serde::Deserialize;
use uuid::Uuid;

use super::{set, set_opt, ValidationErrors, Validator};
use crate::database::schema::Document;

pub const SKILL_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<String>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
}

fn check_skill(v: &mut Validator, skill: Option<&str>) {
    if let Some(skill) = skill {
        v.check(
            SKILL_LEVELS.contains(&skill),
            format!("`{}` is not a valid minimum skill", skill),
        );
    }
}

impl CourseInput {
    /// A new course under `bootcamp`, owned by `owner`.
    pub fn into_new(self, bootcamp: Uuid, owner: Uuid) -> Result<Document, ValidationErrors> {
        let mut v = Validator::new();
        let title = v.required(&self.title, "Please add course title").map(str::to_string);
        let description = v.required(&self.description, "Please add a description").map(str::to_string);
        let weeks = v.required(&self.weeks, "Please add number of weeks").map(str::to_string);
        v.check(self.tuition.is_some(), "Please add a tuition cost");
        let skill = v.required(&self.minimum_skill, "Please add a minimum skill").map(str::to_string);
        check_skill(&mut v, skill.as_deref());

        let mut doc = Document::new();
        set_opt(&mut doc, "title", title);
        set_opt(&mut doc, "description", description);
        set_opt(&mut doc, "weeks", weeks);
        set_opt(&mut doc, "tuition", self.tuition);
        set_opt(&mut doc, "minimumSkill", skill);
        set(&mut doc, "scholarshipAvailable", self.scholarship_available.unwrap_or(false));
        set(&mut doc, "bootcamp", bootcamp.to_string());
        set(&mut doc, "user", owner.to_string());

        v.finish(doc)
    }

    pub fn into_changes(self) -> Result<Document, ValidationErrors> {
        let mut v = Validator::new();
        let mut doc = Document::new();

        for (key, value, message) in [
            ("title", &self.title, "Please add course title"),
            ("description", &self.description, "Please add a description"),
            ("weeks", &self.weeks, "Please add number of weeks"),
        ] {
            if value.is_some() {
                let text = v.required(value, message);
                set_opt(&mut doc, key, text);
            }
        }
        if self.minimum_skill.is_some() {
            let skill = v.required(&self.minimum_skill, "Please add a minimum skill");
            check_skill(&mut v, skill);
            set_opt(&mut doc, "minimumSkill", skill);
        }
        set_opt(&mut doc, "tuition", self.tuition);
        set_opt(&mut doc, "scholarshipAvailable", self.scholarship_available);

        v.finish(doc)
    }
}
