use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sec_gemini::models::tool::ToolCall;
use sec_gemini::security_system::{ANALYZE_SECURITY, AUDIT_CONTRACT, QUERY_SECURITY};
use sec_gemini::{AnalysisClient, AnalysisError, SecuritySystem};

use super::cancel_signal;
use crate::render;

pub fn system(client: AnalysisClient) -> SecuritySystem {
    SecuritySystem::new(Arc::new(client))
}

pub fn analyze_call(
    file: &Path,
    language: Option<String>,
    focus_areas: Vec<String>,
    context: Option<String>,
) -> Result<ToolCall> {
    let code = read_source(file)?;
    Ok(ToolCall::new(
        ANALYZE_SECURITY,
        json!({
            "code": code,
            "language": language,
            "focus_areas": focus_areas,
            "context": context,
        }),
    ))
}

pub fn query_call(question: String, domain: Option<String>) -> ToolCall {
    ToolCall::new(QUERY_SECURITY, json!({ "query": question, "domain": domain }))
}

pub fn audit_call(
    file: &Path,
    contract_type: Option<String>,
    blockchain: Option<String>,
) -> Result<ToolCall> {
    let contract_code = read_source(file)?;
    Ok(ToolCall::new(
        AUDIT_CONTRACT,
        json!({
            "contract_code": contract_code,
            "contract_type": contract_type,
            "blockchain": blockchain,
        }),
    ))
}

pub async fn execute(
    system: &SecuritySystem,
    call: ToolCall,
    title: &str,
    deadline: Option<Duration>,
) -> Result<()> {
    let text = tokio::select! {
        biased;
        _ = cancel_signal(deadline) => return Err(AnalysisError::Cancelled.into()),
        result = system.call(call) => result?,
    };

    render::results(title, Some(text.as_str()).filter(|text| !text.is_empty()))
}

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}
