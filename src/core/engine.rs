use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct PayrollEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> PayrollEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting payroll run");

        tracing::info!("Reading salary sheet...");
        let rows = self.pipeline.extract().await?;
        tracing::info!("Read {} month(s)", rows.len());

        tracing::info!("Computing withholding schedule...");
        let report = self.pipeline.transform(rows).await?;
        tracing::info!(
            "Year-to-date tax {:.2}, take-home {:.2}",
            report.schedule.summary.tax,
            report.schedule.summary.take_home
        );

        tracing::info!("Writing reports...");
        let output_path = self.pipeline.load(report).await?;
        tracing::info!("Output saved to: {} ({:?})", output_path, started.elapsed());

        Ok(output_path)
    }
}
