//! Route table for the router.
//!
//! The router only needs the flattened path template, the verb and the opaque handler
//! reference of every operation; patterns are kept in the template because they
//! constrain matching.

use crate::error::Result;
use crate::model::Definition;
use crate::path_template;
use crate::writer::sorted_verbs;
use log::debug;

/// One (path, verb) registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Full template including any patterns
    pub path: String,
    pub method: String,
    pub handler: Option<String>,
    /// Path parameter names in template order
    pub params: Vec<String>,
}

/// Flattens the path tree into routes, ordered by path and verb.
pub fn routes(def: &Definition) -> Result<Vec<Route>> {
    let mut flat = def.flatten();
    flat.sort_by(|a, b| a.template.cmp(&b.template));

    let mut out = Vec::new();
    for path in &flat {
        let params = path_template::extract(&path.template)?;
        for (verb, method) in sorted_verbs(path.methods) {
            if method.handler.is_none() {
                debug!("No handler for {} {}", verb, path.template);
            }
            out.push(Route {
                path: path.template.clone(),
                method: verb.to_string(),
                handler: method.handler.clone(),
                params: params.clone(),
            });
        }
    }

    debug!("Flattened {} routes", out.len());
    Ok(out)
}
