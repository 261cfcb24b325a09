//! Introspection records for operators.

use serde::Serialize;

/// Where the webserver listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub webserver_host: String,
    pub webserver_port: Option<u16>,
}

/// Display labels for [`ServiceInfo`] fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceLabels {
    pub webserver_host: &'static str,
    pub webserver_port: &'static str,
}

impl Default for ServiceLabels {
    fn default() -> Self {
        Self {
            webserver_host: "Host",
            webserver_port: "Port",
        }
    }
}

/// A `record` describing the webserver for help output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHelp {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'static str,
    pub label: ServiceLabels,
    pub data: ServiceInfo,
}

impl ServiceHelp {
    pub fn new(data: ServiceInfo) -> Self {
        Self {
            kind: "record",
            title: "Webserver plugin trigger",
            label: ServiceLabels::default(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn help_serializes_as_a_record() {
        let help = ServiceHelp::new(ServiceInfo {
            webserver_host: "0.0.0.0".into(),
            webserver_port: Some(7979),
        });
        assert_eq!(
            serde_json::to_value(&help).unwrap(),
            json!({
                "type": "record",
                "title": "Webserver plugin trigger",
                "label": { "webserver_host": "Host", "webserver_port": "Port" },
                "data": { "webserver_host": "0.0.0.0", "webserver_port": 7979 }
            })
        );
    }
}
