//! `calcgrid check` — Show how an expression is compiled and split into tasks.

use std::fmt::Write;
use std::time::Duration;

use calcgrid_core::compiler;
use calcgrid_core::{Error, ExpressionId, Operand, OperationLimits, graph};

pub fn run(expression: &str) -> Result<(), Box<dyn std::error::Error>> {
    let report = render(expression)?;
    print!("{report}");
    Ok(())
}

fn render(expression: &str) -> Result<String, Box<dyn std::error::Error>> {
    let tokens = compiler::tokenize(expression);
    let postfix = compiler::to_postfix(&tokens).map_err(Error::from)?;
    if postfix.is_empty() {
        return Err(Error::EmptyExpression.into());
    }
    let plan = graph::build(
        ExpressionId(0),
        &postfix,
        &OperationLimits::uniform(Duration::ZERO),
    )?;

    let mut out = String::new();
    writeln!(out, "🔍 {expression}")?;
    writeln!(out, "   Tokens:  {}", join(&tokens))?;
    writeln!(out, "   Postfix: {}", join(&postfix))?;

    if plan.is_empty() {
        writeln!(out, "   Tasks:   none")?;
    } else {
        writeln!(out, "   Tasks:")?;
        for task in plan.tasks() {
            writeln!(
                out,
                "     t{}  {} {} {}",
                task.index,
                operand(task.left),
                task.operator,
                operand(task.right)
            )?;
        }
    }

    match compiler::evaluate_postfix(&postfix) {
        Some(value) => writeln!(out, "   Value:   {value}")?,
        None => writeln!(out, "   Value:   undefined")?,
    }
    Ok(out)
}

/// Awaiting operands are shown by the index of the task they wait for.
fn operand(slot: Operand) -> String {
    match slot {
        Operand::Value(v) => v.to_string(),
        Operand::Awaiting(id) => format!("t{}", id.split().1),
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_tasks_and_value() {
        let report = render("2+2*4").unwrap();
        assert!(report.contains("Postfix: 2 2 4 * +"));
        assert!(report.contains("t0  2 * 4"));
        assert!(report.contains("t1  2 + t0"));
        assert!(report.contains("Value:   10"));
    }

    #[test]
    fn number_only_has_no_tasks() {
        let report = render("42").unwrap();
        assert!(report.contains("Tasks:   none"));
        assert!(report.contains("Value:   42"));
    }

    #[test]
    fn malformed_and_empty_are_errors() {
        let err = render("4*(2+3").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Compile(_))));
        let err = render(" ").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyExpression)));
    }
}
