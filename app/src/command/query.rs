use std::fmt::Write as _;
use std::io::Write as _;

use inspecta_core::dispatch::field_text;
use inspecta_core::{DispatchResult, RuleAnswer};
use inspecta_engine::Dispatcher;
use tracing::info;
use uuid::Uuid;

use super::Runtime;

#[derive(Debug, Clone)]
pub struct QueryInput {
    /// Single query (interactive mode when absent)
    pub query: Option<String>,
    /// Session to continue; interactive mode creates one when absent
    pub session: Option<String>,
    /// Print the result as JSON
    pub json: bool,
}

/// Answers free-text questions through the dispatcher, once or in a loop.
#[derive(Debug, Clone, Copy)]
pub struct QueryStrategy;

impl super::CommandStrategy for QueryStrategy {
    type Input = QueryInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let runtime = Runtime::open().await?;
        let dispatcher = runtime.dispatcher();

        if let Some(text) = input.query {
            let result = dispatcher.query(&text, input.session.as_deref()).await;
            println!("{}", output(&result, input.json)?);
            return Ok(());
        }

        let session = input
            .session
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        run_interactive(&dispatcher, &session, input.json).await
    }
}

async fn run_interactive(dispatcher: &Dispatcher, session: &str, json: bool) -> anyhow::Result<()> {
    info!("Interactive session {session}");
    println!("inspecta ready. Type 'exit' to quit.\n");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if line == "exit" {
            break;
        }

        if line.is_empty() {
            continue;
        }

        let result = dispatcher.query(line, Some(session)).await;
        println!("\n{}\n", output(&result, json)?);
    }

    Ok(())
}

fn output(result: &DispatchResult, json: bool) -> anyhow::Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(&result.to_json())?)
    } else {
        Ok(render(result))
    }
}

fn render(result: &DispatchResult) -> String {
    match result {
        DispatchResult::Answered(answer) => render_answer(answer),
        DispatchResult::Escalated(answer) => format!("[escalated] {}", answer.answer),
        DispatchResult::Failed(err) => format!("Error: {err}"),
    }
}

fn render_answer(answer: &RuleAnswer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", answer.narrative);
    let _ = writeln!(
        out,
        "rule #{} {} [{}] score {}",
        answer.rule_id, answer.rule_name, answer.category, answer.score
    );
    if !answer.parameters.is_empty() {
        let bound: Vec<String> = answer
            .parameters
            .iter()
            .map(|p| format!("{}={}", p.name, p.value))
            .collect();
        let _ = writeln!(out, "parameters: {}", bound.join(", "));
    }

    let table = &answer.table;
    if !table.rows.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", table.fields.join("\t"));
        for row in &table.rows {
            let cells: Vec<String> = table
                .fields
                .iter()
                .map(|f| field_text(row, f).unwrap_or_default())
                .collect();
            let _ = writeln!(out, "{}", cells.join("\t"));
        }
        if table.truncated {
            let _ = writeln!(
                out,
                "... {} more rows",
                table.total_rows.saturating_sub(table.rows.len())
            );
        }
    }

    for card in &answer.cards {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", card.title);
        for entry in &card.entries {
            let _ = writeln!(out, "  {} {}", entry.label, entry.count);
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use inspecta_core::{
        BoundParameter, BoundValue, Category, DispatchError, EscalatedAnswer, TablePayload,
    };
    use serde_json::{Map, Value, json};

    use super::*;

    fn row(batch: &str, supplier: &str) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("batch_no".to_string(), json!(batch));
        row.insert("supplier".to_string(), json!(supplier));
        row
    }

    #[test]
    fn answer_renders_table_rows_in_field_order() {
        let answer = RuleAnswer {
            rule_id: 1,
            rule_name: "供应商库存".to_string(),
            category: Category::Inventory,
            score: 85,
            matched_keywords: vec!["供应商".to_string()],
            parameters: vec![BoundParameter {
                name: "supplier".to_string(),
                value: BoundValue::Text("聚龙".to_string()),
            }],
            table: TablePayload {
                fields: vec!["supplier".to_string(), "batch_no".to_string()],
                rows: vec![row("B001", "聚龙"), row("B002", "聚龙")],
                total_rows: 3,
                truncated: true,
            },
            cards: Vec::new(),
            narrative: "「供应商库存」共找到 3 条记录。".to_string(),
        };

        let text = render(&DispatchResult::Answered(answer));
        assert!(text.starts_with("「供应商库存」"));
        assert!(text.contains("supplier\tbatch_no"));
        assert!(text.contains("聚龙\tB001"));
        assert!(text.contains("... 1 more rows"));
    }

    #[test]
    fn escalated_and_failed_results_are_labelled() {
        let escalated = DispatchResult::Escalated(EscalatedAnswer::new("暂无数据".to_string()));
        assert_eq!(render(&escalated), "[escalated] 暂无数据");

        let failed = DispatchResult::Failed(DispatchError::NoCandidateMatch);
        assert!(render(&failed).starts_with("Error: "));
    }
}
