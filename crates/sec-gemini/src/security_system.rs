use indoc::indoc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::client::Analyzer;
use crate::errors::{ToolError, ToolResult};
use crate::models::message::GenerateRequest;
use crate::models::tool::{Tool, ToolCall};
use crate::prompt_template::{AnalyzeSecurity, AuditContract, QuerySecurity};

pub const ANALYZE_SECURITY: &str = "analyze_security";
pub const QUERY_SECURITY: &str = "query_security";
pub const AUDIT_CONTRACT: &str = "audit_contract";

/// The security analysis tools, each answered by one round trip to an
/// [`Analyzer`].
#[derive(Clone)]
pub struct SecuritySystem {
    analyzer: Arc<dyn Analyzer>,
    tools: Vec<Tool>,
}

impl SecuritySystem {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            tools: Self::tool_definitions(),
        }
    }

    pub fn name(&self) -> &str {
        "sec-gemini"
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Tool definitions, available without a credential
    pub fn tool_definitions() -> Vec<Tool> {
        vec![
            Tool::new(
                ANALYZE_SECURITY,
                indoc!(
                    "Analyze code, smart contracts, or security configurations for vulnerabilities.

                    Specializes in:
                    - Smart contract security (Solidity, Rust/Solana)
                    - Web3 security (DeFi, NFT, cross-chain)
                    - General cybersecurity analysis
                    - Vulnerability detection and remediation"
                ),
                json!({
                    "type": "object",
                    "properties": {
                        "code": {
                            "type": "string",
                            "description": "The code or configuration to analyze"
                        },
                        "language": {
                            "type": "string",
                            "description": "Programming language (solidity, rust, python, javascript, etc.)"
                        },
                        "focus_areas": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Specific security concerns to focus on (e.g., reentrancy, access_control, oracle_manipulation)"
                        },
                        "context": {
                            "type": "string",
                            "description": "Additional context about the code or system"
                        }
                    },
                    "required": ["code"]
                }),
            ),
            Tool::new(
                QUERY_SECURITY,
                indoc!(
                    "Ask security-related questions or get guidance on cybersecurity topics.

                    Useful for:
                    - Security best practices
                    - Threat modeling
                    - Vulnerability explanations
                    - Security architecture guidance
                    - Web3 security patterns"
                ),
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The security question or topic to explore"
                        },
                        "domain": {
                            "type": "string",
                            "description": "Security domain (web3, defi, nft, infrastructure, application, etc.)"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            Tool::new(
                AUDIT_CONTRACT,
                indoc!(
                    "Perform comprehensive security audit of smart contracts.

                    Covers:
                    - Common vulnerabilities (reentrancy, overflow, access control)
                    - Gas optimization
                    - Best practice compliance
                    - Standard compliance (ERC-20, ERC-721, etc.)"
                ),
                json!({
                    "type": "object",
                    "properties": {
                        "contract_code": {
                            "type": "string",
                            "description": "Smart contract source code"
                        },
                        "contract_type": {
                            "type": "string",
                            "description": "Type of contract (token, nft, defi, dao, etc.)"
                        },
                        "blockchain": {
                            "type": "string",
                            "description": "Target blockchain (ethereum, solana, polygon, etc.)",
                            "default": "ethereum"
                        }
                    },
                    "required": ["contract_code"]
                }),
            ),
        ]
    }

    /// Run a tool and return the analysis text
    pub async fn call(&self, tool_call: ToolCall) -> ToolResult<String> {
        tracing::debug!(tool = %tool_call.name, "running security tool");
        let params = &tool_call.arguments;
        let prompt = match tool_call.name.as_str() {
            ANALYZE_SECURITY => {
                let focus_areas = string_list(params, "focus_areas")?;
                AnalyzeSecurity {
                    code: required_str(params, "code")?,
                    language: optional_str(params, "language")?.unwrap_or("unknown"),
                    context: optional_str(params, "context")?.unwrap_or(""),
                    focus_areas: &focus_areas,
                }
                .render()?
            }
            QUERY_SECURITY => QuerySecurity {
                query: required_str(params, "query")?,
                domain: optional_str(params, "domain")?.unwrap_or("general"),
            }
            .render()?,
            AUDIT_CONTRACT => AuditContract {
                contract_code: required_str(params, "contract_code")?,
                contract_type: optional_str(params, "contract_type")?.unwrap_or("unknown"),
                blockchain: optional_str(params, "blockchain")?.unwrap_or("ethereum"),
            }
            .render()?,
            _ => return Err(ToolError::ToolNotFound(tool_call.name)),
        };

        let response = self
            .analyzer
            .generate(&GenerateRequest::single(prompt))
            .await?;

        Ok(response.text().trim().to_string())
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> ToolResult<&'a str> {
    optional_str(params, key)?
        .ok_or_else(|| ToolError::InvalidParameters(format!("{} parameter required", key)))
}

fn optional_str<'a>(params: &'a Value, key: &str) -> ToolResult<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(ToolError::InvalidParameters(format!(
            "{} must be a string",
            key
        ))),
    }
}

fn string_list(params: &Value, key: &str) -> ToolResult<Vec<String>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(String::from).ok_or_else(|| {
                    ToolError::InvalidParameters(format!("{} must contain only strings", key))
                })
            })
            .collect(),
        Some(_) => Err(ToolError::InvalidParameters(format!(
            "{} must be an array of strings",
            key
        ))),
    }
}
