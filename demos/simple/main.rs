use std::time::Duration;

use async_trait::async_trait;
use cardflow::{
    ChannelEvent, ChannelOptions, EngineBuilder, ResultProvider, RunOutcome,
    catalog::{TemplateCatalog, WorkflowTemplate},
    events::{GraphEvent, NodeEvent},
    workflow::{
        edge::Edge,
        node::{AnalysisResult, Node},
    },
};
use serde_json::json;

/// Scores every card from the symbol's length, and has no data for "XYZ".
struct DemoProvider;

#[async_trait]
impl ResultProvider for DemoProvider {
    async fn resolve(
        &self,
        card_type: &str,
        symbol: &str,
    ) -> cardflow::Result<AnalysisResult> {
        if symbol == "XYZ" {
            return Err(cardflow::CardflowError::Provider(format!("no filings for {}", symbol)));
        }
        Ok(json!({
            "card": card_type,
            "symbol": symbol,
            "score": symbol.len() * 10 + card_type.len(),
        }))
    }
}

struct DemoTemplates;

impl TemplateCatalog for DemoTemplates {
    fn template(
        &self,
        name: &str,
    ) -> Option<WorkflowTemplate> {
        (name == "quality-screen").then(|| WorkflowTemplate {
            name: name.to_string(),
            description: "Valuation, then ratios and cash flow".to_string(),
            nodes: vec![Node::card("valuation", "valuation-summary"), Node::card("ratios", "financial-ratios"), Node::card("cash", "cash-flow")],
            edges: vec![Edge::new("e1", "valuation", "ratios"), Edge::new("e2", "valuation", "cash")],
        })
    }
}

#[tokio::main]
async fn main() {
    let engine = EngineBuilder::new().step_delay(Duration::from_millis(50)).build().unwrap();

    engine.load_template(&DemoTemplates, "quality-screen").unwrap();
    engine.set_symbols(vec!["TCS".to_string(), "XYZ".to_string()]).unwrap();
    println!("{}", engine.schema());

    let events = ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap();
    events.on_event(|e| {
        if let GraphEvent::Node(NodeEvent::Running {
            symbol,
            progress,
        }) = &e.event
        {
            println!("[{:>3}%] {} on {}", progress, e.nid, symbol);
        }
    });
    events.on_complete(|rid| {
        println!("Run completed, rid: {}", rid);
    });
    events.on_error(|e| {
        println!("Run finished with errors: {:?}", e.event);
    });

    let outcome = match engine.request_run(&DemoProvider, false).await.unwrap() {
        RunOutcome::NeedsConfirmation(validation) => {
            for issue in validation.issues.iter() {
                println!("confirming past: {}", issue.message);
            }
            engine.request_run(&DemoProvider, true).await.unwrap()
        }
        outcome => outcome,
    };

    match outcome {
        RunOutcome::Ran(report) => {
            let summary = report.summary();
            println!("status: {:?}, succeeded: {}, failed: {}", report.status, summary.succeeded, summary.failed);
            println!("results: {:#?}", report.results);
            println!("errors: {:#?}", report.errors);
        }
        RunOutcome::Blocked(validation) => println!("run blocked: {:#?}", validation.issues),
        RunOutcome::NeedsConfirmation(_) => unreachable!("confirmed runs are never gated again"),
    }
}
