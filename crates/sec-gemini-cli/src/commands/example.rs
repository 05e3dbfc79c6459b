use anyhow::Result;
use std::time::Duration;

use sec_gemini::prompt_template::Web3Audit;
use sec_gemini::{AnalysisClient, GenerateRequest};

use super::cancel_signal;
use crate::render;

pub const VULNERABLE_CONTRACT: &str = r#"
pragma solidity ^0.8.0;

contract VulnerableBank {
    mapping(address => uint256) public balances;

    function deposit() public payable {
        balances[msg.sender] += msg.value;
    }

    function withdraw(uint256 amount) public {
        require(balances[msg.sender] >= amount, "Insufficient balance");

        // Vulnerability: Reentrancy attack
        (bool success, ) = msg.sender.call{value: amount}("");
        require(success, "Transfer failed");

        balances[msg.sender] -= amount;
    }

    function getBalance() public view returns (uint256) {
        return balances[msg.sender];
    }
}
"#;

pub async fn execute(client: &AnalysisClient, deadline: Option<Duration>) -> Result<()> {
    render::banner("Sec-Gemini Web3 Security Analysis Example");

    let prompt = Web3Audit {
        contract: VULNERABLE_CONTRACT,
    }
    .render()?;
    let request = GenerateRequest::single(prompt);

    let response = client
        .generate_with_cancel(&request, cancel_signal(deadline))
        .await?;

    render::results("Security Analysis Results:", response.texts())
}
