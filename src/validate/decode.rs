//! Lenient decoding of untyped wire input into a `JourneyDocument`.

use serde_json::{Map, Value};

use crate::model::{
    Action, ActionKind, CompassTag, JourneyDocument, PerformanceIndicator, Stage, Touchpoint,
};

use super::{ErrorKind, FieldError, coerce_score, field, item};

pub(super) fn decode(value: &Value) -> Result<JourneyDocument, Vec<FieldError>> {
    let mut d = Decoder::default();
    let document = d.journey(value);
    if d.errors.is_empty() {
        Ok(document)
    } else {
        Err(d.errors)
    }
}

/// Coerces a JSON value the way a score field does.
///
/// Fractional numbers truncate toward zero, matching integer parsing of the same text.
#[allow(clippy::cast_possible_truncation)]
fn score(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .unwrap_or_else(|| n.as_f64().filter(|f| f.is_finite()).map_or(0, |f| f as i64)),
        Some(Value::String(s)) => coerce_score(s),
        _ => 0,
    }
}

#[derive(Default)]
struct Decoder {
    errors: Vec<FieldError>,
}

impl Decoder {
    fn type_error(&mut self, path: String, message: impl Into<String>) {
        self.errors.push(FieldError {
            path,
            kind: ErrorKind::Type,
            message: message.into(),
        });
    }

    fn object<'a>(&mut self, path: &str, value: &'a Value) -> Option<&'a Map<String, Value>> {
        let obj = value.as_object();
        if obj.is_none() {
            self.type_error(path.to_string(), "Expected an object");
        }
        obj
    }

    fn string(&mut self, obj: &Map<String, Value>, base: &str, key: &str) -> String {
        match obj.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
            Some(_) => {
                self.type_error(field(base, key), "Expected text");
                String::new()
            }
        }
    }

    fn optional_string(
        &mut self,
        obj: &Map<String, Value>,
        base: &str,
        key: &str,
    ) -> Option<String> {
        Some(self.string(obj, base, key)).filter(|s| !s.is_empty())
    }

    fn array<'a>(&mut self, obj: &'a Map<String, Value>, base: &str, key: &str) -> &'a [Value] {
        match obj.get(key) {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.type_error(field(base, key), "Expected a list");
                &[]
            }
        }
    }

    fn journey(&mut self, value: &Value) -> JourneyDocument {
        let Some(obj) = self.object("", value) else {
            return empty_document();
        };

        let title = self.string(obj, "", "title");
        let nps_score = score(obj.get("npsScore"));
        let customer_sentiment = score(obj.get("customerSentiment"));
        let key_insight = self.string(obj, "", "keyInsight");

        let indicators = "performanceIndicators";
        let performance_indicators = self
            .array(obj, "", indicators)
            .iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let base = item(indicators, i);
                let obj = self.object(&base, v)?;
                Some(PerformanceIndicator {
                    name: self.string(obj, &base, "name"),
                    value: score(obj.get("value")),
                })
            })
            .collect();

        let stages = self
            .array(obj, "", "stages")
            .iter()
            .enumerate()
            .filter_map(|(i, v)| self.stage(&item("stages", i), v))
            .collect();

        JourneyDocument {
            title,
            nps_score,
            customer_sentiment,
            key_insight,
            performance_indicators,
            stages,
        }
    }

    fn stage(&mut self, base: &str, value: &Value) -> Option<Stage> {
        let obj = self.object(base, value)?;
        let name = self.string(obj, base, "name");
        let description = self.string(obj, base, "description");
        let touchpoints_path = field(base, "touchpoints");
        let touchpoints = self
            .array(obj, base, "touchpoints")
            .iter()
            .enumerate()
            .filter_map(|(i, v)| self.touchpoint(&item(&touchpoints_path, i), v))
            .collect();
        Some(Stage {
            name,
            description,
            touchpoints,
        })
    }

    fn touchpoint(&mut self, base: &str, value: &Value) -> Option<Touchpoint> {
        let obj = self.object(base, value)?;
        let title = self.string(obj, base, "title");
        let kind = self.string(obj, base, "type");
        let duration = self.string(obj, base, "duration");
        let comment = self.optional_string(obj, base, "comment");

        let tags_path = field(base, "compassTags");
        let mut compass_tags = Vec::new();
        for (i, v) in self.array(obj, base, "compassTags").iter().enumerate() {
            match v.as_str().map(str::parse::<CompassTag>) {
                Some(Ok(tag)) => compass_tags.push(tag),
                Some(Err(e)) => self.type_error(item(&tags_path, i), capitalize(&e)),
                None => self.type_error(item(&tags_path, i), "Expected a compass tag name"),
            }
        }

        let actions_path = field(base, "actions");
        let actions = self
            .array(obj, base, "actions")
            .iter()
            .enumerate()
            .filter_map(|(i, v)| self.action(&item(&actions_path, i), v))
            .collect();

        Some(Touchpoint {
            title,
            kind,
            duration,
            comment,
            compass_tags,
            actions,
        })
    }

    fn action(&mut self, base: &str, value: &Value) -> Option<Action> {
        let obj = self.object(base, value)?;
        let title = self.string(obj, base, "title");
        let description = self.string(obj, base, "description");
        let image_url = self.optional_string(obj, base, "imageUrl");
        let kind = match obj.get("type") {
            None | Some(Value::Null) => ActionKind::default(),
            Some(Value::String(s)) => s.parse::<ActionKind>().unwrap_or_else(|e: String| {
                self.type_error(field(base, "type"), capitalize(&e));
                ActionKind::default()
            }),
            Some(_) => {
                self.type_error(field(base, "type"), "Expected an action type");
                ActionKind::default()
            }
        };
        Some(Action {
            title,
            description,
            image_url,
            kind,
        })
    }
}

fn empty_document() -> JourneyDocument {
    JourneyDocument {
        title: String::new(),
        nps_score: 0,
        customer_sentiment: 0,
        key_insight: String::new(),
        performance_indicators: Vec::new(),
        stages: Vec::new(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
