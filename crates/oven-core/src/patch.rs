//! Config patching for the generated application
//!
//! Two independent text rewrites, whole-file read/transform/write: the
//! datasource credential fields in `config/app.php` and the plugin-loader
//! line appended to `config/bootstrap.php`.

use crate::error::Result;
use regex::{Captures, Regex};
use std::path::Path;
use tokio::fs;

/// Opening of the datasources table in the generated app config.
const DATASOURCES_OPEN: &str = "'Datasources' => [";

/// Start of the test datasource entry; the rewrite must never reach it.
const TEST_BLOCK: &str = "'test' =>";

/// Replace the named field's quoted value inside the default-datasource
/// block, leaving everything else byte-identical. The rewrite region is
/// bounded above the test datasource entry, so applying this with any value
/// can never touch the test block. Idempotent by construction.
pub fn patch_datasource_field(config: &str, field: &str, value: &str) -> String {
    let Some(start) = config.find(DATASOURCES_OPEN) else {
        return config.to_string();
    };

    let end = config[start..]
        .find(TEST_BLOCK)
        .map(|offset| start + offset)
        .unwrap_or(config.len());

    let field_re = match Regex::new(&format!(
        r"('{}'\s*=>\s*')[^']*(',)",
        regex::escape(field)
    )) {
        Ok(re) => re,
        Err(_) => return config.to_string(),
    };

    // Only the first occurrence inside the bounded region is the default
    // datasource's field.
    let region = &config[start..end];
    let patched = field_re.replace(region, |caps: &Captures<'_>| {
        format!("{}{}{}", &caps[1], value, &caps[2])
    });

    format!("{}{}{}", &config[..start], patched, &config[end..])
}

/// Rewrite one datasource field in place when the supplied value is
/// non-empty.
pub async fn update_datasource_config(path: &Path, field: &str, value: &str) -> Result<()> {
    let config = fs::read_to_string(path).await?;
    let patched = patch_datasource_field(&config, field, value);
    fs::write(path, patched).await?;

    Ok(())
}

/// The one-line plugin-load statement, optionally wrapped in a debug-mode
/// conditional.
pub fn plugin_load_line(plugin: &str, bootstrap: bool, routes: bool, debug_only: bool) -> String {
    let line = format!(
        "Plugin::load('{plugin}', ['bootstrap' => {bootstrap}, 'routes' => {routes}]);"
    );

    if debug_only {
        format!("if (Configure::read('debug')) {{\n    {line}\n}}")
    } else {
        line
    }
}

/// Append a plugin registration to the end of the bootstrap file, separated
/// by a blank line.
pub async fn enable_plugin(
    path: &Path,
    plugin: &str,
    bootstrap: bool,
    routes: bool,
    debug_only: bool,
) -> Result<()> {
    let mut config = fs::read_to_string(path).await?;
    config.push_str("\n\n");
    config.push_str(&plugin_load_line(plugin, bootstrap, routes, debug_only));
    fs::write(path, config).await?;

    Ok(())
}
