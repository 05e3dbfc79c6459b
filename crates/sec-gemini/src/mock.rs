use async_trait::async_trait;
use std::sync::Mutex;

use crate::client::Analyzer;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::message::{GenerateRequest, GenerateResponse};

/// An analyzer that replays pre-configured replies and records every request
pub struct MockAnalyzer {
    replies: Mutex<Vec<AnalysisResult<GenerateResponse>>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl MockAnalyzer {
    pub fn new(replies: Vec<AnalysisResult<GenerateResponse>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn generate(&self, request: &GenerateRequest) -> AnalysisResult<GenerateResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Err(AnalysisError::InvalidRequest("no scripted reply left".to_string()))
        } else {
            replies.remove(0)
        }
    }
}
