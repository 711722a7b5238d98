//! Typed view of event tag arrays.
//!
//! Every tag array parses into one [`Tag`] variant. Known tag names must have
//! the expected arity and value shapes; anything else is kept as
//! [`Tag::Unknown`] so newer producers do not break older readers.

use crate::{Error, Result, SetType};

/// Reference to an exercise definition: `<kind>:<pubkey>:<id>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExerciseRef {
    pub kind: u16,
    pub pubkey: String,
    pub id: String,
}

impl ExerciseRef {
    pub fn new(kind: u16, pubkey: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            pubkey: pubkey.into(),
            id: id.into(),
        }
    }

    /// Parse an addressable reference. A value without a numeric kind prefix,
    /// or a lone number, is taken as a bare identifier.
    pub fn parse(value: &str, default_kind: u16) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::Validation("empty exercise reference".into()));
        }
        let mut parts = value.splitn(3, ':');
        let head = parts.next().unwrap_or_default();
        match (head.parse::<u16>(), parts.next(), parts.next()) {
            (Ok(kind), Some(pubkey), Some(id)) if !id.is_empty() => {
                Ok(Self::new(kind, pubkey, id))
            }
            (Ok(_), None, _) => Ok(Self::new(default_kind, "", value)),
            (Ok(_), _, _) => Err(Error::Validation(format!(
                "malformed exercise reference '{}'",
                value
            ))),
            _ => Ok(Self::new(default_kind, "", value)),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.kind, self.pubkey, self.id)
    }
}

/// `["exercise", ref, weight, reps, rpe, set_type, completed?]`
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseTag {
    pub reference: ExerciseRef,
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub rpe: Option<f32>,
    pub set_type: SetType,
    pub completed: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    D(String),
    Title(String),
    Type(String),
    Category(String),
    Equipment(String),
    Format(Vec<String>),
    FormatUnits(Vec<String>),
    Instruction(String),
    Hashtag(String),
    Exercise(ExerciseTag),
    Start(i64),
    End(i64),
    Completed(bool),
    Template(String),
    Unknown(Vec<String>),
}

impl Tag {
    pub fn parse(raw: &[String], exercise_kind: u16) -> Result<Self> {
        let Some(name) = raw.first() else {
            return Err(Error::Validation("empty tag".into()));
        };

        let tag = match name.as_str() {
            "d" => Tag::D(required_value(raw)?),
            "title" => Tag::Title(required_value(raw)?),
            "type" => Tag::Type(required_value(raw)?),
            "category" => Tag::Category(required_value(raw)?),
            "equipment" => Tag::Equipment(required_value(raw)?),
            "instruction" => Tag::Instruction(required_value(raw)?),
            "t" => Tag::Hashtag(required_value(raw)?),
            "template" => Tag::Template(required_value(raw)?),
            "format" => Tag::Format(list_values(raw)?),
            "format_units" => Tag::FormatUnits(list_values(raw)?),
            "start" => Tag::Start(parse_number(raw, 1)?),
            "end" => Tag::End(parse_number(raw, 1)?),
            "completed" => Tag::Completed(parse_bool(&required_value(raw)?)?),
            "exercise" => Tag::Exercise(parse_exercise(raw, exercise_kind)?),
            _ => Tag::Unknown(raw.to_vec()),
        };
        Ok(tag)
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::D(_) => "d",
            Tag::Title(_) => "title",
            Tag::Type(_) => "type",
            Tag::Category(_) => "category",
            Tag::Equipment(_) => "equipment",
            Tag::Format(_) => "format",
            Tag::FormatUnits(_) => "format_units",
            Tag::Instruction(_) => "instruction",
            Tag::Hashtag(_) => "t",
            Tag::Exercise(_) => "exercise",
            Tag::Start(_) => "start",
            Tag::End(_) => "end",
            Tag::Completed(_) => "completed",
            Tag::Template(_) => "template",
            Tag::Unknown(raw) => raw.first().map(String::as_str).unwrap_or_default(),
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        let single = |value: &str| vec![self.name().to_string(), value.to_string()];
        match self {
            Tag::D(v)
            | Tag::Title(v)
            | Tag::Type(v)
            | Tag::Category(v)
            | Tag::Equipment(v)
            | Tag::Instruction(v)
            | Tag::Hashtag(v)
            | Tag::Template(v) => single(v),
            Tag::Format(values) | Tag::FormatUnits(values) => {
                let mut out = vec![self.name().to_string()];
                out.extend(values.iter().cloned());
                out
            }
            Tag::Start(ts) | Tag::End(ts) => single(&ts.to_string()),
            Tag::Completed(done) => single(if *done { "true" } else { "false" }),
            Tag::Exercise(ex) => {
                let mut out = vec![
                    "exercise".to_string(),
                    ex.reference.encode(),
                    ex.weight.map(|w| w.to_string()).unwrap_or_default(),
                    ex.reps.map(|r| r.to_string()).unwrap_or_default(),
                    ex.rpe.map(|r| r.to_string()).unwrap_or_default(),
                    ex.set_type.as_str().to_string(),
                ];
                if let Some(done) = ex.completed {
                    out.push(if done { "true" } else { "false" }.to_string());
                }
                out
            }
            Tag::Unknown(raw) => raw.clone(),
        }
    }
}

fn required_value(raw: &[String]) -> Result<String> {
    match raw.get(1) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(Error::Validation(format!("tag '{}' has no value", raw[0]))),
    }
}

fn list_values(raw: &[String]) -> Result<Vec<String>> {
    if raw.len() < 2 {
        return Err(Error::Validation(format!("tag '{}' has no values", raw[0])));
    }
    Ok(raw[1..].to_vec())
}

fn parse_number<T: std::str::FromStr>(raw: &[String], index: usize) -> Result<T> {
    let value = raw
        .get(index)
        .ok_or_else(|| Error::Validation(format!("tag '{}' is missing a value", raw[0])))?;
    value.parse::<T>().map_err(|_| {
        Error::Validation(format!("tag '{}' has non-numeric value '{}'", raw[0], value))
    })
}

fn parse_optional<T: std::str::FromStr>(raw: &[String], index: usize) -> Result<Option<T>> {
    match raw.get(index).map(String::as_str) {
        None | Some("") => Ok(None),
        Some(_) => parse_number(raw, index).map(Some),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::Validation(format!("'{}' is not a boolean", other))),
    }
}

fn parse_exercise(raw: &[String], exercise_kind: u16) -> Result<ExerciseTag> {
    let reference = ExerciseRef::parse(&required_value(raw)?, exercise_kind)?;
    let set_type = match raw.get(5).map(String::as_str) {
        None | Some("") => SetType::Normal,
        Some(value) => value.parse()?,
    };
    let completed = match raw.get(6).map(String::as_str) {
        None | Some("") => None,
        Some(value) => Some(parse_bool(value)?),
    };
    let weight: Option<f64> = parse_optional(raw, 2)?;
    if let Some(weight) = weight.filter(|w| !w.is_finite() || *w < 0.0) {
        return Err(Error::Validation(format!(
            "exercise tag has invalid weight {}",
            weight
        )));
    }
    let rpe: Option<f32> = parse_optional(raw, 4)?;
    if let Some(rpe) = rpe.filter(|r| !(0.0..=10.0).contains(r)) {
        return Err(Error::Validation(format!(
            "exercise tag has RPE {} outside 0-10",
            rpe
        )));
    }
    Ok(ExerciseTag {
        reference,
        weight,
        reps: parse_optional(raw, 3)?,
        rpe,
        set_type,
        completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_exercise_tag() {
        let tag = Tag::parse(
            &raw(&["exercise", "33401:abc:squat", "100", "5", "8", "normal"]),
            33401,
        )
        .unwrap();
        match tag {
            Tag::Exercise(ex) => {
                assert_eq!(ex.reference.id, "squat");
                assert_eq!(ex.reference.pubkey, "abc");
                assert_eq!(ex.weight, Some(100.0));
                assert_eq!(ex.reps, Some(5));
                assert_eq!(ex.rpe, Some(8.0));
                assert_eq!(ex.set_type, SetType::Normal);
                assert_eq!(ex.completed, None);
            }
            other => panic!("expected exercise tag, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_keeps_colons_in_id() {
        let reference = ExerciseRef::parse("33401::local:abc-123", 33401).unwrap();
        assert_eq!(reference.id, "local:abc-123");
        assert_eq!(reference.encode(), "33401::local:abc-123");
    }

    #[test]
    fn test_bare_reference() {
        let reference = ExerciseRef::parse("local:abc-123", 33401).unwrap();
        assert_eq!(reference.id, "local:abc-123");
        assert_eq!(reference.kind, 33401);
    }

    #[test]
    fn test_numeric_bare_reference() {
        let reference = ExerciseRef::parse("42", 33401).unwrap();
        assert_eq!(reference.id, "42");
        assert_eq!(reference.kind, 33401);
        assert!(ExerciseRef::parse("33401:abc", 33401).is_err());
        assert!(ExerciseRef::parse("33401:abc:", 33401).is_err());
    }

    #[test]
    fn test_out_of_range_set_values_rejected() {
        for weight in ["NaN", "inf", "-100"] {
            let values = raw(&["exercise", "squat", weight, "5", "", "normal"]);
            assert!(
                matches!(Tag::parse(&values, 33401), Err(Error::Validation(_))),
                "weight {} accepted",
                weight
            );
        }
        for rpe in ["42", "-1", "NaN"] {
            let values = raw(&["exercise", "squat", "100", "5", rpe, "normal"]);
            assert!(
                matches!(Tag::parse(&values, 33401), Err(Error::Validation(_))),
                "rpe {} accepted",
                rpe
            );
        }
        assert!(Tag::parse(&raw(&["exercise", "squat", "0", "5", "10", "normal"]), 33401).is_ok());
    }

    #[test]
    fn test_empty_optional_values() {
        let tag = Tag::parse(&raw(&["exercise", "squat", "", "5", "", ""]), 33401).unwrap();
        let Tag::Exercise(ex) = &tag else {
            panic!("expected exercise tag");
        };
        assert_eq!(ex.weight, None);
        assert_eq!(ex.rpe, None);
        assert_eq!(tag.to_vec(), raw(&["exercise", "33401::squat", "", "5", "", "normal"]));
    }

    #[test]
    fn test_malformed_known_tags_rejected() {
        assert!(Tag::parse(&raw(&["start", "yesterday"]), 33401).is_err());
        assert!(Tag::parse(&raw(&["d"]), 33401).is_err());
        assert!(Tag::parse(&raw(&["exercise", "squat", "heavy"]), 33401).is_err());
        assert!(Tag::parse(&raw(&["exercise", "squat", "1", "1", "", "giant"]), 33401).is_err());
        assert!(Tag::parse(&[], 33401).is_err());
    }

    #[test]
    fn test_unknown_tags_preserved() {
        let values = raw(&["client", "powr", "extra"]);
        let tag = Tag::parse(&values, 33401).unwrap();
        assert_eq!(tag, Tag::Unknown(values.clone()));
        assert_eq!(tag.to_vec(), values);
    }
}
