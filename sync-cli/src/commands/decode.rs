//! Decode newline-delimited packet frames and report what a link would do.

use anyhow::{Context, Result};
use devsync_types::{attr, BatteryReport, Packet, PacketType};
use std::io::BufRead;
use std::path::Path;

/// Findings for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// 1-based line number.
    pub line: usize,
    /// Packet type, if the frame decoded.
    pub packet_type: Option<String>,
    /// Human-readable notes.
    pub findings: Vec<String>,
}

impl Inspection {
    /// Whether a link would act on this packet.
    pub fn is_actionable(&self) -> bool {
        self.packet_type.is_some() && self.findings.iter().all(|f| !f.starts_with("ignored"))
    }
}

/// Run the decode command over a file, or stdin when `path` is None.
pub fn run(path: Option<&Path>) -> Result<Vec<Inspection>> {
    let inspections = match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            inspect_all(std::io::BufReader::new(file))?
        }
        None => inspect_all(std::io::stdin().lock())?,
    };

    for inspection in &inspections {
        let packet_type = inspection.packet_type.as_deref().unwrap_or("<undecodable>");
        println!("#{} {}", inspection.line, packet_type);
        for finding in &inspection.findings {
            println!("    {}", finding);
        }
    }

    Ok(inspections)
}

/// Inspect every non-blank line from `reader`.
pub fn inspect_all(reader: impl BufRead) -> Result<Vec<Inspection>> {
    let mut inspections = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        inspections.push(inspect(index + 1, &line));
    }
    Ok(inspections)
}

/// Inspect a single frame.
pub fn inspect(line: usize, frame: &str) -> Inspection {
    let packet = match Packet::from_bytes(frame.as_bytes()) {
        Ok(packet) => packet,
        Err(e) => {
            return Inspection {
                line,
                packet_type: None,
                findings: vec![format!("ignored: {}", e)],
            }
        }
    };

    let mut findings = Vec::new();
    for (key, value) in packet.body() {
        findings.push(format!("{} = {}", key, value));
    }

    match packet.packet_type() {
        PacketType::BatteryStatus => match packet.body_as::<BatteryReport>() {
            Ok(report) => findings.push(format!(
                "battery: {}%{}, threshold {:?}",
                report.current_charge,
                if report.is_charging { " charging" } else { "" },
                report.threshold_event.unwrap_or_default()
            )),
            Err(e) => findings.push(format!("ignored: malformed battery status: {}", e)),
        },
        PacketType::BatteryRequest => findings.push("answers with local battery status".into()),
        PacketType::LockStatus | PacketType::LockRequest => inspect_lock(&packet, &mut findings),
        PacketType::Other(_) => findings.push("ignored: unknown packet type".into()),
    }

    Inspection {
        line,
        packet_type: Some(packet.packet_type().to_string()),
        findings,
    }
}

fn inspect_lock(packet: &Packet, findings: &mut Vec<String>) {
    let mut intents = 0;

    if packet.has(attr::IS_LOCKED) {
        match packet.get::<bool>(attr::IS_LOCKED) {
            Ok(locked) => {
                intents += 1;
                findings.push(format!("peer reports locked={}", locked));
            }
            Err(e) => findings.push(format!("ignored attribute: {}", e)),
        }
    }
    if packet.has(attr::REQUEST_LOCKED) {
        intents += 1;
        findings.push("requests our lock state".into());
    }
    if packet.has(attr::SET_LOCKED) {
        match packet.get::<bool>(attr::SET_LOCKED) {
            Ok(locked) => {
                intents += 1;
                findings.push(format!("commands locked={}", locked));
            }
            Err(e) => findings.push(format!("ignored attribute: {}", e)),
        }
    }

    if intents == 0 {
        findings.push("ignored: no lock attributes".into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_status_is_summarised() {
        let inspection = inspect(
            1,
            r#"{"id":1,"type":"kdeconnect.battery","body":{"currentCharge":9,"isCharging":false,"thresholdEvent":1}}"#,
        );
        assert_eq!(inspection.packet_type.as_deref(), Some("kdeconnect.battery"));
        assert!(inspection
            .findings
            .iter()
            .any(|f| f == "battery: 9%, threshold Low"));
        assert!(inspection.is_actionable());
    }

    #[test]
    fn malformed_battery_status_is_flagged() {
        let inspection = inspect(
            1,
            r#"{"id":1,"type":"kdeconnect.battery","body":{"isCharging":false}}"#,
        );
        assert!(!inspection.is_actionable());
    }

    #[test]
    fn combined_lock_request_lists_both_intents() {
        let inspection = inspect(
            3,
            r#"{"id":1,"type":"kdeconnect.lock.request","body":{"requestLocked":null,"setLocked":true}}"#,
        );
        assert!(inspection
            .findings
            .contains(&"requests our lock state".to_string()));
        assert!(inspection.findings.contains(&"commands locked=true".to_string()));
        assert!(inspection.is_actionable());
    }

    #[test]
    fn unknown_type_is_ignored() {
        let inspection = inspect(1, r#"{"id":1,"type":"kdeconnect.ping","body":{}}"#);
        assert_eq!(inspection.packet_type.as_deref(), Some("kdeconnect.ping"));
        assert!(!inspection.is_actionable());
    }

    #[test]
    fn garbage_is_reported_not_fatal() {
        let input = "not json\n\n{\"id\":2,\"type\":\"kdeconnect.battery.request\"}\n";
        let inspections = inspect_all(input.as_bytes()).unwrap();

        assert_eq!(inspections.len(), 2);
        assert_eq!(inspections[0].line, 1);
        assert!(inspections[0].packet_type.is_none());
        assert_eq!(inspections[1].line, 3);
        assert!(inspections[1].is_actionable());
    }

    #[test]
    fn decode_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.jsonl");
        std::fs::write(
            &path,
            "{\"id\":1,\"type\":\"kdeconnect.lock\",\"body\":{\"isLocked\":true}}\n",
        )
        .unwrap();

        let inspections = run(Some(&path)).unwrap();
        assert_eq!(inspections.len(), 1);
        assert!(inspections[0]
            .findings
            .contains(&"peer reports locked=true".to_string()));
    }
}
