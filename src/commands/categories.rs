use anyhow::Result;
use colored::Colorize;
use teardown::ResourceCategory;
use teardown::registry::{self, Scope};

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Teardown order");

    for (index, kind) in registry::teardown_sequence().into_iter().enumerate() {
        let category = kind.category();
        let indent = if kind.parent().is_some() { "    " } else { "  " };
        println!(
            "{indent}{} {:<12} {}",
            format!("{:>2}.", index + 1).dimmed(),
            category.key.bold(),
            category.label
        );
        if !ctx.quiet {
            for note in notes(category) {
                println!("{indent}    {}", note.dimmed());
            }
        }
    }

    println!();
    ui::dim("Use --only with these keys to restrict a sweep.");
    Ok(())
}

fn notes(category: &ResourceCategory) -> Vec<String> {
    let mut notes = Vec::new();
    match category.scope {
        Scope::Parent(parent) => notes.push(format!("deleted before its {}", parent.key())),
        Scope::Environment => notes.push("listed per environment".to_string()),
        Scope::Organization => {}
    }
    if category.is_deployable() {
        notes.push("undeployed before delete".to_string());
    }
    if !category.exclusions.is_empty() {
        notes.push(format!("never touched: {}", category.exclusions.join(", ")));
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use teardown::CategoryKind;

    #[test]
    fn test_notes() {
        assert_eq!(
            notes(CategoryKind::App.category()),
            vec!["deleted before its developers"]
        );
        assert_eq!(
            notes(CategoryKind::Extension.category()),
            vec!["listed per environment", "undeployed before delete"]
        );
        let proxy_notes = notes(CategoryKind::ApiProxy.category());
        assert_eq!(
            proxy_notes.last().map(String::as_str),
            Some("never touched: oauth, helloworld, apigee-test_bundle")
        );
        assert!(notes(CategoryKind::ApiProduct.category()).is_empty());
    }
}
