use inspecta_config::Config;
use inspecta_engine::{DatabaseRuleRepository, RuleStore};
use std::sync::Arc;
use tracing::info;

/// Prints the configuration with secrets masked, database status and the
/// current rule snapshot.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load_or_default()?;

        println!("=== inspecta Configuration ===\n");

        println!("API Key:");
        println!("  Zhipu: {}", mask_secret(&config.providers.zhipu.api_key));
        println!();

        println!("Database:");
        let db_url = &config.database.url;
        println!("  URL: {}", mask_database_url(db_url));

        info!("Testing database connection");
        match inspecta_engine::connect(db_url).await {
            Ok(db) => {
                println!("  Status: Connected");
                let repo = Arc::new(DatabaseRuleRepository::new(db));
                match RuleStore::load(repo).await {
                    Ok(rules) => {
                        let snapshot = rules.snapshot();
                        println!(
                            "  Rules: {} active (snapshot v{})",
                            snapshot.len(),
                            snapshot.version
                        );
                    }
                    Err(e) => println!("  Rules: failed to load ({e})"),
                }
            }
            Err(e) => {
                println!("  Status: Connection failed");
                println!("  Error: {e}");
            }
        }
        println!();

        println!("Escalation:");
        let model = if config.escalation.model.is_empty() {
            "(provider default)"
        } else {
            config.escalation.model.as_str()
        };
        println!("  Model: {model}");
        println!("  Temperature: {}", config.escalation.temperature);
        println!(
            "  Enabled: {}",
            if config.providers.zhipu.is_configured() {
                "yes"
            } else {
                "no (set providers.zhipu.api_key)"
            }
        );
        println!();

        let dispatch = config.dispatch_config();
        println!("Dispatch:");
        println!("  Min Confidence: {}", dispatch.min_confidence);
        println!("  Top K: {}", dispatch.top_k);
        println!("  Row Cap: {}", dispatch.effective_row_cap());
        println!("  Display Cap: {}", dispatch.display_cap);
        println!("  Execution Timeout: {}ms", dispatch.execution_timeout_ms);
        println!("  Escalation Timeout: {}ms", dispatch.escalation_timeout_ms);
        println!("  Context History: {}", dispatch.context_history);
        if !dispatch.category_keywords.is_empty() {
            println!("  Category Keyword Overrides:");
            for (category, keywords) in &dispatch.category_keywords {
                println!("    {category}: {}", keywords.join(", "));
            }
        }

        Ok(())
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        "(not set)".to_string()
    } else if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

fn mask_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    let Some((credentials, after_at)) = rest.split_once('@') else {
        return url.to_string();
    };

    let Some((username, _password)) = credentials.split_once(':') else {
        return url.to_string();
    };

    format!("{scheme}://{username}:***@{after_at}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_password_is_masked() {
        assert_eq!(
            mask_database_url("postgresql://qa:secret@db:5432/inspecta"),
            "postgresql://qa:***@db:5432/inspecta"
        );
        assert_eq!(
            mask_database_url("sqlite://inspecta.db?mode=rwc"),
            "sqlite://inspecta.db?mode=rwc"
        );
    }

    #[test]
    fn short_and_empty_secrets_are_hidden() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("abcd.123456.wxyz"), "abcd...wxyz");
    }
}
