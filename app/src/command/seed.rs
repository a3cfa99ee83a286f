use inspecta_engine::seed;

use super::Runtime;

/// Creates missing tables, then loads the demo rule library and sample
/// records. Existing rules and non-empty tables are left alone.
#[derive(Debug, Clone, Copy)]
pub struct SeedStrategy;

impl super::CommandStrategy for SeedStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let runtime = Runtime::open().await?;

        let records = seed::seed_records(&runtime.db).await?;
        let rules = seed::seed_rules(&runtime.rules).await?;

        println!("Inserted {records} sample records and {rules} demo rules");
        println!(
            "Rule snapshot v{} with {} active rules",
            runtime.rules.snapshot().version,
            runtime.rules.snapshot().len()
        );
        Ok(())
    }
}
