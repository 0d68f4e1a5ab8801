use serde::Serialize;

/// Traffic rates for one network interface over the last sampling window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceTraffic {
    pub interface: String,
    pub inbound_bps: f64,
    pub outbound_bps: f64,
}

/// One complete set of resource metrics produced by a collection cycle.
///
/// Published snapshots are value types: the store hands out copies, so a
/// snapshot a reader holds can never change underneath it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    pub cpu_usage_rate: f64,
    pub mem_usage_rate: f64,
    pub disk_usage_rate: f64,
    pub network_traffic: Vec<InterfaceTraffic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_fields() {
        let snapshot = ResourceSnapshot {
            cpu_usage_rate: 12.5,
            mem_usage_rate: 40.0,
            disk_usage_rate: 75.0,
            network_traffic: vec![InterfaceTraffic {
                interface: "eth0".to_string(),
                inbound_bps: 8000.0,
                outbound_bps: 4000.0,
            }],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["cpuUsageRate"], 12.5);
        assert_eq!(json["networkTraffic"][0]["interface"], "eth0");
        assert_eq!(json["networkTraffic"][0]["inboundBps"], 8000.0);
    }
}
