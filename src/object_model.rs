//! Object model: globals, classes, enums, and library references supplied
//! externally and merged with a bundled standard model.
//!
//! Grounded in `original_source/src/config.py`'s `Config.load_model` /
//! `get_global` / `get_class`: all keys normalized to lowercase on load,
//! class member maps unioned with incoming data overwriting on collision,
//! references deduped by name, and a missing standard model downgraded to
//! a warning rather than treated as fatal.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct GlobalDescriptor {
    pub type_name: String,
    pub min_args: Option<usize>,
    pub max_args: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassDescriptor {
    pub members: HashMap<String, MemberDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDescriptor {
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceDescriptor {
    pub name: String,
    pub guid: Option<String>,
    pub major: Option<i64>,
    pub minor: Option<i64>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectModel {
    pub globals: HashMap<String, GlobalDescriptor>,
    pub classes: HashMap<String, ClassDescriptor>,
    /// Preserves load order rather than a `HashMap` so first-match lookup in
    /// [`ObjectModel::resolve_enum_member`] is deterministic — spec.md's
    /// Open Question on enum-conflict ordering only requires determinism,
    /// not a specific order.
    pub enums: Vec<(String, HashMap<String, i64>)>,
    pub references: Vec<ReferenceDescriptor>,
}

impl ObjectModel {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read object model {}", path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse object model {}", path.display()))?;
        Self::from_json(&value)
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .context("object model root must be a JSON object")?;

        let has_section = ["globals", "classes", "enums", "references"]
            .iter()
            .any(|k| obj.contains_key(*k));
        if !has_section {
            bail!("object model has no recognized top-level section (globals/classes/enums/references)");
        }

        let mut model = ObjectModel::empty();

        if let Some(Value::Object(globals)) = obj.get("globals") {
            for (name, desc) in globals {
                let type_name = desc
                    .get("returns")
                    .or_else(|| desc.get("type"))
                    .and_then(Value::as_str)
                    .unwrap_or("Variant")
                    .to_string();
                let min_args = desc.get("min_args").and_then(Value::as_u64).map(|n| n as usize);
                let max_args = desc.get("max_args").and_then(Value::as_u64).map(|n| n as usize);
                model.globals.insert(
                    name.to_ascii_lowercase(),
                    GlobalDescriptor { type_name, min_args, max_args },
                );
            }
        }

        if let Some(Value::Object(classes)) = obj.get("classes") {
            for (name, desc) in classes {
                let mut members = HashMap::new();
                if let Some(Value::Object(member_map)) = desc.get("members") {
                    for (mname, mdesc) in member_map {
                        let type_name = mdesc
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or("Variant")
                            .to_string();
                        members.insert(mname.to_ascii_lowercase(), MemberDescriptor { type_name });
                    }
                }
                model
                    .classes
                    .insert(name.to_ascii_lowercase(), ClassDescriptor { members });
            }
        }

        if let Some(Value::Object(enums)) = obj.get("enums") {
            for (name, members) in enums {
                let mut member_map = HashMap::new();
                if let Some(member_obj) = members.as_object() {
                    for (mname, mval) in member_obj {
                        if let Some(n) = mval.as_i64() {
                            member_map.insert(mname.to_ascii_lowercase(), n);
                        }
                    }
                }
                model.enums.push((name.to_ascii_lowercase(), member_map));
            }
        }

        if let Some(Value::Array(refs)) = obj.get("references") {
            for r in refs {
                if let Some(name) = r.get("name").and_then(Value::as_str) {
                    model.references.push(ReferenceDescriptor {
                        name: name.to_string(),
                        guid: r.get("guid").and_then(Value::as_str).map(String::from),
                        major: r.get("major").and_then(Value::as_i64),
                        minor: r.get("minor").and_then(Value::as_i64),
                        path: r.get("path").and_then(Value::as_str).map(String::from),
                    });
                }
            }
        }

        Ok(model)
    }

    /// Merge `other` into `self`; `other`'s data wins on every collision
    /// except class member maps, which union (incoming overwrites per key).
    pub fn merge(&mut self, other: ObjectModel) {
        for (name, desc) in other.globals {
            self.globals.insert(name, desc);
        }

        for (name, class) in other.classes {
            match self.classes.get_mut(&name) {
                Some(existing) => {
                    for (mname, mdesc) in class.members {
                        existing.members.insert(mname, mdesc);
                    }
                }
                None => {
                    self.classes.insert(name, class);
                }
            }
        }

        for (name, members) in other.enums {
            match self.enums.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = members,
                None => self.enums.push((name, members)),
            }
        }

        for reference in other.references {
            match self
                .references
                .iter_mut()
                .find(|r| r.name.eq_ignore_ascii_case(&reference.name))
            {
                Some(existing) => *existing = reference,
                None => self.references.push(reference),
            }
        }
    }

    pub fn get_global(&self, name: &str) -> Option<&GlobalDescriptor> {
        self.globals.get(&name.to_ascii_lowercase())
    }

    pub fn get_class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(&name.to_ascii_lowercase())
    }

    /// First enum (by load order) containing `member`, case-insensitive.
    pub fn resolve_enum_member(&self, member: &str) -> Option<i64> {
        let key = member.to_ascii_lowercase();
        self.enums
            .iter()
            .find_map(|(_, members)| members.get(&key).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_from(json: &str) -> ObjectModel {
        let value: Value = serde_json::from_str(json).unwrap();
        ObjectModel::from_json(&value).unwrap()
    }

    #[test]
    fn test_global_prefers_returns_over_type() {
        let model = model_from(r#"{"globals": {"MsgBox": {"type": "Variant", "returns": "Integer", "min_args": 1, "max_args": 3}}}"#);
        let g = model.get_global("msgbox").unwrap();
        assert_eq!(g.type_name, "Integer");
        assert_eq!(g.min_args, Some(1));
        assert_eq!(g.max_args, Some(3));
    }

    #[test]
    fn test_keys_lowercased_on_load() {
        let model = model_from(r#"{"classes": {"Foo": {"members": {"Bar": {"type": "Integer"}}}}}"#);
        let class = model.get_class("FOO").unwrap();
        assert!(class.members.contains_key("bar"));
    }

    #[test]
    fn test_merge_unions_class_members_incoming_wins() {
        let mut base = model_from(r#"{"classes": {"Foo": {"members": {"Bar": {"type": "Integer"}}}}}"#);
        let incoming = model_from(r#"{"classes": {"Foo": {"members": {"Bar": {"type": "String"}, "Baz": {"type": "Long"}}}}}"#);
        base.merge(incoming);
        let class = base.get_class("foo").unwrap();
        assert_eq!(class.members.get("bar").unwrap().type_name, "String");
        assert_eq!(class.members.get("baz").unwrap().type_name, "Long");
    }

    #[test]
    fn test_merge_dedupes_references_by_name() {
        let mut base = model_from(r#"{"references": [{"name": "Scripting", "major": 1}]}"#);
        let incoming = model_from(r#"{"references": [{"name": "scripting", "major": 2}]}"#);
        base.merge(incoming);
        assert_eq!(base.references.len(), 1);
        assert_eq!(base.references[0].major, Some(2));
    }

    #[test]
    fn test_resolve_enum_member_first_match() {
        let model = model_from(r#"{"enums": {"A": {"Red": 1}, "B": {"Red": 2}}}"#);
        assert_eq!(model.resolve_enum_member("red"), Some(1));
    }

    #[test]
    fn test_missing_section_is_error() {
        let value: Value = serde_json::from_str("{}").unwrap();
        assert!(ObjectModel::from_json(&value).is_err());
    }
}
