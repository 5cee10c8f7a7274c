//! Alias-based column mapping.
//!
//! Resolves arbitrary input headers onto the canonical schema: headers are
//! normalized and de-duplicated, then each canonical field (required fields
//! first, in declared order) scans its alias list in priority order and binds
//! the first column no other field has claimed. Missing required fields are
//! reported, never raised; the caller decides whether the run can continue.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    data::Frame,
    schema::CanonicalSchema,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingResult {
    /// `(canonical_field, source_column)` pairs in binding order. Source names
    /// are the normalized, de-duplicated header spellings.
    pub bindings: Vec<(String, String)>,
    /// Required canonical fields with no matching source column, in declared
    /// order.
    pub missing_required: Vec<String>,
}

impl MappingResult {
    pub fn source_for(&self, canonical: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(field, _)| field == canonical)
            .map(|(_, source)| source.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }

    pub fn table_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for (field, source) in &self.bindings {
            let status = if field == source {
                "found directly".to_string()
            } else {
                format!("mapped from '{source}'")
            };
            rows.push(vec![field.clone(), source.clone(), status]);
        }
        for field in &self.missing_required {
            rows.push(vec![
                field.clone(),
                String::new(),
                "not found (required)".to_string(),
            ]);
        }
        rows
    }
}

/// Normalizes a header: trim, lowercase, spaces to underscores.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Makes normalized headers unique by suffixing `_1`, `_2`, ... onto later
/// occurrences, preserving order.
pub fn dedup_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(headers.len());
    for header in headers {
        if seen.insert(header.clone()) {
            result.push(header.clone());
            continue;
        }
        let mut suffix = 1usize;
        loop {
            let candidate = format!("{header}_{suffix}");
            if seen.insert(candidate.clone()) {
                result.push(candidate);
                break;
            }
            suffix += 1;
        }
    }
    result
}

/// Resolves canonical fields against a set of raw column names. `raw_columns`
/// may be in any case and contain duplicates; the returned bindings refer to
/// the normalized, de-duplicated spellings.
pub fn map_columns(raw_columns: &[String], schema: &CanonicalSchema) -> MappingResult {
    let normalized: Vec<String> = raw_columns.iter().map(|c| normalize_header(c)).collect();
    let columns = dedup_headers(&normalized);

    let mut bindings = Vec::new();
    let mut bound: HashSet<&str> = HashSet::new();
    for field in schema.fields() {
        for alias in &field.aliases {
            let alias = normalize_header(alias);
            let matched = columns
                .iter()
                .find(|column| **column == alias && !bound.contains(column.as_str()));
            if let Some(column) = matched {
                bound.insert(column.as_str());
                bindings.push((field.name.clone(), column.clone()));
                break;
            }
        }
    }

    let missing_required = schema
        .required_names()
        .into_iter()
        .filter(|name| !bindings.iter().any(|(field, _)| field == name))
        .map(|name| name.to_string())
        .collect();

    MappingResult {
        bindings,
        missing_required,
    }
}

/// Maps a raw frame: headers are normalized and de-duplicated in place, bound
/// columns are renamed to their canonical names, and everything else passes
/// through untouched.
pub fn apply(mut frame: Frame, schema: &CanonicalSchema) -> (Frame, MappingResult) {
    let mapping = map_columns(&frame.columns, schema);

    let normalized: Vec<String> = frame.columns.iter().map(|c| normalize_header(c)).collect();
    let mut columns = dedup_headers(&normalized);
    for (field, source) in &mapping.bindings {
        if let Some(slot) = columns.iter_mut().find(|c| *c == source) {
            *slot = field.clone();
        }
    }
    frame.columns = columns;
    (frame, mapping)
}
