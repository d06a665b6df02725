//! `hermes status`: query a running instance's health endpoint.

use anyhow::Result;
use hermes_gateway::HealthReport;

pub async fn run(port: u16) -> Result<()> {
    let url = format!("http://127.0.0.1:{port}/health");
    let client = reqwest::Client::new();
    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let report: HealthReport = resp.json().await?;
            println!("{}", render(&report));
        }
        Ok(resp) => println!("Hermes answered on port {port} with HTTP {}", resp.status()),
        Err(_) => println!("Hermes is not running on port {port}"),
    }
    Ok(())
}

fn render(report: &HealthReport) -> String {
    format!(
        "Hermes {} is {}\n  uptime: {}s\n  active sessions: {}\n  checked at: {}",
        report.version,
        report.status,
        report.uptime_seconds,
        report.active_sessions,
        report.timestamp.to_rfc3339(),
    )
}
