//! `$VAR` / `${VAR}` expansion over spec strings.
//!
//! Lookup goes to the environment's `[variables]` table first, then to the
//! process environment. Unknown variables expand to the empty string.

use crate::model::EnvBox;
use std::collections::BTreeMap;

pub fn expand_str(input: &str, variables: &BTreeMap<String, String>) -> String {
    shellexpand::env_with_context_no_errors(input, |name: &str| {
        Some(
            variables
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
                .unwrap_or_default(),
        )
    })
    .into_owned()
}

/// Expand every user-facing field of each box in place.
pub fn expand_box_variables(boxes: &mut [EnvBox], variables: &BTreeMap<String, String>) {
    for b in boxes {
        b.name = expand_str(&b.name, variables);
        b.namespace = expand_str(&b.namespace, variables);
        b.box_type = expand_str(&b.box_type, variables);
        b.chart = expand_str(&b.chart, variables);
        b.values = expand_str(&b.values, variables);
        for app in &mut b.applications {
            app.name = expand_str(&app.name, variables);
            app.chart = expand_str(&app.chart, variables);
        }
    }
}
