use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

pub const WEB3_AUDIT: &str = include_str!("prompts/web3_audit.md");
pub const ANALYZE_SECURITY: &str = include_str!("prompts/analyze_security.md");
pub const QUERY_SECURITY: &str = include_str!("prompts/query_security.md");
pub const AUDIT_CONTRACT: &str = include_str!("prompts/audit_contract.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// The audit prompt used by the web3 example
#[derive(Debug, Serialize)]
pub struct Web3Audit<'a> {
    pub contract: &'a str,
}

impl Web3Audit<'_> {
    pub fn render(&self) -> Result<String, TeraError> {
        load_prompt(WEB3_AUDIT, self)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeSecurity<'a> {
    pub code: &'a str,
    pub language: &'a str,
    pub context: &'a str,
    pub focus_areas: &'a [String],
}

impl AnalyzeSecurity<'_> {
    pub fn render(&self) -> Result<String, TeraError> {
        load_prompt(ANALYZE_SECURITY, self)
    }
}

#[derive(Debug, Serialize)]
pub struct QuerySecurity<'a> {
    pub query: &'a str,
    pub domain: &'a str,
}

impl QuerySecurity<'_> {
    pub fn render(&self) -> Result<String, TeraError> {
        load_prompt(QUERY_SECURITY, self)
    }
}

#[derive(Debug, Serialize)]
pub struct AuditContract<'a> {
    pub contract_code: &'a str,
    pub contract_type: &'a str,
    pub blockchain: &'a str,
}

impl AuditContract<'_> {
    pub fn render(&self) -> Result<String, TeraError> {
        load_prompt(AUDIT_CONTRACT, self)
    }
}
