//! Run configuration: `--define` parsing and object-model assembly.
//! Grounded in `original_source/src/config.py`'s `Config.from_args`, which
//! layers the bundled standard model, an optional implicit
//! `vba_model.json`, and an optional explicit `--model` file, each best
//! effort except the explicit path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::object_model::ObjectModel;
use crate::preprocessor::{parse_defines, DefineValue};

const STD_MODEL_JSON: &str = include_str!("std_model.json");
const IMPLICIT_MODEL_FILENAME: &str = "vba_model.json";

/// Parses `--define K=V,...` into the map the preprocessor expects, or an
/// empty map when no flag was given.
pub fn build_defines(spec: Option<&str>) -> HashMap<String, DefineValue> {
    match spec {
        Some(s) => parse_defines(s),
        None => HashMap::new(),
    }
}

/// Builds the effective object model: bundled standard model, then the
/// implicit `vba_model.json` (if present, best effort), then an explicit
/// `--model` path (if given, fatal on failure).
pub fn build_object_model(explicit_model: Option<&Path>) -> Result<ObjectModel> {
    let mut model = ObjectModel::empty();

    match serde_json::from_str(STD_MODEL_JSON).map_err(anyhow::Error::from).and_then(|v| ObjectModel::from_json(&v)) {
        Ok(std_model) => model.merge(std_model),
        Err(e) => eprintln!("warning: bundled standard model failed to load: {e}"),
    }

    let implicit_path = PathBuf::from(IMPLICIT_MODEL_FILENAME);
    if implicit_path.is_file() {
        match ObjectModel::load(&implicit_path) {
            Ok(implicit) => model.merge(implicit),
            Err(e) => eprintln!("warning: {IMPLICIT_MODEL_FILENAME} failed to load: {e}"),
        }
    }

    if let Some(path) = explicit_model {
        let explicit =
            ObjectModel::load(path).with_context(|| format!("failed to load object model {}", path.display()))?;
        model.merge(explicit);
    }

    Ok(model)
}
