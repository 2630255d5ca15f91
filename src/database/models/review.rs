use serde::Deserialize;
use uuid::Uuid;

use super::{set, set_opt, ValidationErrors, Validator};
use crate::database::schema::Document;

const MAX_TITLE: usize = 100;
const RATING_RANGE: std::ops::RangeInclusive<f64> = 1.0..=10.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<f64>,
}

fn check_rating(v: &mut Validator, rating: Option<f64>) {
    if let Some(rating) = rating {
        v.check(RATING_RANGE.contains(&rating), "Please add rating between 1 and 10");
    }
}

impl ReviewInput {
    pub fn into_new(self, bootcamp: Uuid, owner: Uuid) -> Result<Document, ValidationErrors> {
        let mut v = Validator::new();
        let title = v.required(&self.title, "Please add review title").map(str::to_string);
        v.max_len(title.as_deref(), MAX_TITLE, "Title can not be more than 100 characters");
        let text = v.required(&self.text, "Please add a text").map(str::to_string);
        v.check(self.rating.is_some(), "Please add rating between 1 and 10");
        check_rating(&mut v, self.rating);

        let mut doc = Document::new();
        set_opt(&mut doc, "title", title);
        set_opt(&mut doc, "text", text);
        set_opt(&mut doc, "rating", self.rating);
        set(&mut doc, "bootcamp", bootcamp.to_string());
        set(&mut doc, "user", owner.to_string());

        v.finish(doc)
    }

    pub fn into_changes(self) -> Result<Document, ValidationErrors> {
        let mut v = Validator::new();
        let mut doc = Document::new();
        if self.title.is_some() {
            let title = v.required(&self.title, "Please add review title");
            v.max_len(title, MAX_TITLE, "Title can not be more than 100 characters");
            set_opt(&mut doc, "title", title);
        }
        if self.text.is_some() {
            let text = v.required(&self.text, "Please add a text");
            set_opt(&mut doc, "text", text);
        }
        check_rating(&mut v, self.rating);
        set_opt(&mut doc, "rating", self.rating);

        v.finish(doc)
    }
}
