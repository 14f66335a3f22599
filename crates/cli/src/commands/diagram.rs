use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use veritas_core::{extract_entities, render_diagram};

use crate::commands::{read_text, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct DiagramArgs {
    #[arg(long, value_name = "PATH", help = "Schema text to visualize (defaults to stdin)")]
    pub file: Option<PathBuf>,
}

pub fn run(args: &DiagramArgs) -> CommandResult {
    let text = match read_text(None, args.file.as_deref()) {
        Ok(Some(text)) => text,
        Ok(None) => {
            let mut buffer = String::new();
            if let Err(error) = io::stdin().read_to_string(&mut buffer) {
                return CommandResult::invalid_input("diagram", format!("could not read stdin: {error}"));
            }
            buffer
        }
        Err(error) => return CommandResult::invalid_input("diagram", format!("{error:#}")),
    };

    run_with_text(&text)
}

pub fn run_with_text(schema_text: &str) -> CommandResult {
    let graph = extract_entities(schema_text);
    CommandResult::success_with_data(
        "diagram",
        format!("{} entities extracted", graph.len()),
        json!({
            "entities": graph.entities(),
            "diagram": render_diagram(&graph),
        }),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::run_with_text;

    #[test]
    fn text_without_markers_gives_bare_header() {
        let result = run_with_text("no schema here\n- stray attribute");
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(payload["data"]["diagram"], "erDiagram\n");
        assert_eq!(payload["data"]["entities"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn entities_are_listed_with_attributes() {
        let result = run_with_text("Entity: Customer\n- customer_id\n- name");
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(payload["message"], "1 entities extracted");
        assert_eq!(payload["data"]["entities"][0]["name"], "Customer");
        assert_eq!(payload["data"]["entities"][0]["attributes"][1], "name");
    }
}
