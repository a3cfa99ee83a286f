use std::path::{Path, PathBuf};

use inspecta_core::IntentRule;
use tracing::{info, warn};

use super::Runtime;

#[derive(Debug, Clone)]
pub enum RulesInput {
    List,
    /// JSON array of rules; rules are matched to stored ones by name.
    Import(PathBuf),
}

/// Administrative access to the rule catalog.
#[derive(Debug, Clone, Copy)]
pub struct RulesStrategy;

impl super::CommandStrategy for RulesStrategy {
    type Input = RulesInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = Runtime::open().await?;
        match input {
            RulesInput::List => list(&runtime).await,
            RulesInput::Import(path) => import(&runtime, &path).await,
        }
    }
}

async fn list(runtime: &Runtime) -> anyhow::Result<()> {
    let rules = runtime.rules.list_rules().await?;
    if rules.is_empty() {
        println!("No rules stored. Run 'inspecta seed-demo' or 'inspecta rules import <file>'.");
        return Ok(());
    }

    let snapshot = runtime.rules.snapshot();
    println!("id\tstatus\tcategory\tpriority\tname\ttriggers");
    for rule in &rules {
        // Active rules missing from the snapshot failed validation.
        let status = if rule.is_active() && snapshot.get(rule.id).is_none() {
            "invalid".to_string()
        } else {
            rule.status.to_string()
        };
        println!(
            "{}\t{status}\t{}\t{}\t{}\t{}",
            rule.id,
            rule.category,
            rule.priority,
            rule.name,
            rule.trigger_words.join(",")
        );
    }
    println!(
        "\n{} stored, {} in snapshot v{}",
        rules.len(),
        snapshot.len(),
        snapshot.version
    );
    Ok(())
}

fn read_rules(path: &Path) -> anyhow::Result<Vec<IntentRule>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

async fn import(runtime: &Runtime, path: &Path) -> anyhow::Result<()> {
    let incoming = read_rules(path)?;
    let existing = runtime.rules.list_rules().await?;
    info!("Importing {} rules from {}", incoming.len(), path.display());

    let mut failed = 0;
    for mut rule in incoming {
        rule.id = existing
            .iter()
            .find(|r| r.name == rule.name)
            .map_or(0, |r| r.id);

        match runtime.rules.save_rule(&rule).await {
            Ok((id, version)) => println!("saved #{id} {} (snapshot v{version})", rule.name),
            Err(e) => {
                warn!("Skipping rule {}: {e:#}", rule.name);
                println!("failed {}: {e:#}", rule.name);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} rules failed to import");
    }
    Ok(())
}
