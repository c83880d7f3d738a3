//! Step descriptors returned to the browser client
//!
//! The server holds no step state; `createProject` answers with an ordered
//! list of these and the client replays them one request at a time.

use serde::Serialize;

/// One unit of client-driven work: a display title plus the form payload
/// the client POSTs back verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub title: String,
    pub data: StepData,
}

/// The opaque action payload for a step. Field names match the form fields
/// the endpoint decodes.
#[derive(Debug, Clone, Serialize)]
pub struct StepData {
    pub action: String,
    pub package: String,
    pub version: String,
    pub dev: u8,
    pub dir: String,
    #[serde(rename = "composerPath")]
    pub composer_path: String,
}

impl Step {
    /// Descriptor for one `installPackage` request.
    pub fn install_package(
        package: String,
        version: String,
        dev: bool,
        dir: String,
        composer_path: String,
    ) -> Self {
        // Platform entries are requirements, not installs; title accordingly.
        let title = if package == "php" {
            format!("Requiring platform {package}:{version}...")
        } else {
            format!("Installing {package}:{version}...")
        };

        Self {
            title,
            data: StepData {
                action: "installPackage".to_string(),
                package,
                version,
                dev: u8::from(dev),
                dir,
                composer_path,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serializes_with_client_field_names() {
        let step = Step::install_package(
            "cakephp/cakephp".to_string(),
            "~3.5.0".to_string(),
            false,
            "app".to_string(),
            String::new(),
        );

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["title"], "Installing cakephp/cakephp:~3.5.0...");
        assert_eq!(json["data"]["action"], "installPackage");
        assert_eq!(json["data"]["dev"], 0);
        assert_eq!(json["data"]["composerPath"], "");
    }
}
