use anyhow::{anyhow, Result};
use bat::PrettyPrinter;
use console::{style, Term};

const RULE_WIDTH: usize = 80;

pub fn banner(title: &str) {
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("{}", style(title).bold());
    println!("{}", "=".repeat(RULE_WIDTH));
}

/// Print each text on its own line, in order. On a terminal the texts are
/// rendered as markdown.
pub fn results<'a>(title: &str, texts: impl IntoIterator<Item = &'a str>) -> Result<()> {
    println!("\n{}", style(title).bold());
    println!("{}", "-".repeat(RULE_WIDTH));

    let attended = Term::stdout().features().is_attended();
    for text in texts {
        if attended {
            markdown(text)?;
            println!();
        } else {
            println!("{}", text);
        }
    }
    Ok(())
}

fn markdown(content: &str) -> Result<()> {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .map_err(|e| anyhow!("Failed to render output: {}", e))?;
    Ok(())
}
