use anyhow::Result;
use valuation::{monitoring, AppConfig};

pub fn run(cfg: &AppConfig, json: bool) -> Result<()> {
    let report = monitoring::report(&cfg.access_log_path, &cfg.metrics_file)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Total API calls:       {}", report.usage.total_calls);
    println!("Average response time: {:.4}s", report.usage.average_duration);
    println!("Errors:                {}", report.usage.error_count);
    println!();
    if report.model_history.is_empty() {
        println!("No trained models recorded in {}", cfg.metrics_file.display());
        return Ok(());
    }
    println!("{:<32} {:>12} {:>8} {:>12}  trained", "artifact", "RMSE", "MAPE", "MAE");
    for h in &report.model_history {
        println!(
            "{:<32} {:>12.2} {:>8.4} {:>12.2}  {}",
            h.artifact, h.metrics.rmse, h.metrics.mape, h.metrics.mae, h.metrics.timestamp
        );
    }
    Ok(())
}
