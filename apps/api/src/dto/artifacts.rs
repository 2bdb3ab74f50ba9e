use serde::Deserialize;

/// Query parameters of the demo config file endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct DemoFileParams {
    pub path: Option<String>,
}
