//! Expression evaluation port
//!
//! Property providers carry `(expression, syntax, type)` triples; turning
//! them into values is the job of an [`ExpressionEvaluator`]. Full expression
//! engines live outside this crate; [`LiteralEvaluator`] covers the built-in
//! syntaxes so workflows without scripting still run.

use async_trait::async_trait;
use serde_json::Value;

use crate::activity::ActivityExecutionContext;
use crate::execution::WorkflowExecutionContext;

/// Built-in expression syntax names
pub mod syntaxes {
    /// The expression text is the value
    pub const LITERAL: &str = "Literal";

    /// The expression text is a JSON document
    pub const JSON: &str = "Json";

    /// The expression text names a workflow variable
    pub const VARIABLE: &str = "Variable";
}

/// Errors from expression evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// The evaluator does not handle this syntax
    #[error("unsupported expression syntax: {0}")]
    UnsupportedSyntax(String),

    /// The expression itself failed to evaluate
    #[error("expression evaluation failed: {0}")]
    Evaluation(String),
}

/// Evaluates property expressions against the current dispatch
#[async_trait]
pub trait ExpressionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        expression: &str,
        syntax: &str,
        type_name: Option<&str>,
        workflow: &WorkflowExecutionContext,
        activity: &ActivityExecutionContext,
    ) -> Result<Value, EvaluationError>;
}

/// Evaluator for the built-in syntaxes
///
/// `Literal` yields the expression text as a string, `Json` parses it, and
/// `Variable` reads the named workflow variable (null when unset).
#[derive(Debug, Clone, Default)]
pub struct LiteralEvaluator;

#[async_trait]
impl ExpressionEvaluator for LiteralEvaluator {
    async fn evaluate(
        &self,
        expression: &str,
        syntax: &str,
        _type_name: Option<&str>,
        workflow: &WorkflowExecutionContext,
        _activity: &ActivityExecutionContext,
    ) -> Result<Value, EvaluationError> {
        match syntax {
            syntaxes::LITERAL => Ok(Value::String(expression.to_string())),

            syntaxes::JSON => serde_json::from_str(expression)
                .map_err(|e| EvaluationError::Evaluation(e.to_string())),

            syntaxes::VARIABLE => Ok(workflow
                .instance
                .variables
                .get(expression)
                .cloned()
                .unwrap_or(Value::Null)),

            other => Err(EvaluationError::UnsupportedSyntax(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::materialize;
    use crate::definition::{ActivityDefinition, WorkflowDefinition};
    use crate::instance::{DefaultWorkflowFactory, WorkflowFactory};
    use crate::scope::{ServiceProvider, StaticServiceProvider};
    use serde_json::json;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn harness() -> (WorkflowExecutionContext, ActivityExecutionContext) {
        let definition = WorkflowDefinition::new("wf", 1)
            .with_activity(ActivityDefinition::new("a", "noop"));
        let blueprint = Arc::new(materialize(&definition).unwrap());

        let mut instance = DefaultWorkflowFactory.instantiate(&blueprint, None, None);
        instance.variables.set("count", json!(7));

        let workflow =
            WorkflowExecutionContext::new(blueprint.clone(), instance, CancellationToken::new());
        let activity = ActivityExecutionContext::new(
            blueprint.activity("a").unwrap().clone(),
            None,
            StaticServiceProvider::new().create_scope(),
        );

        (workflow, activity)
    }

    #[tokio::test]
    async fn test_literal_syntax() {
        let (workflow, activity) = harness();

        let value = LiteralEvaluator
            .evaluate("hello", syntaxes::LITERAL, None, &workflow, &activity)
            .await
            .unwrap();

        assert_eq!(value, json!("hello"));
    }

    #[tokio::test]
    async fn test_json_syntax() {
        let (workflow, activity) = harness();

        let value = LiteralEvaluator
            .evaluate(r#"{"n": 1}"#, syntaxes::JSON, None, &workflow, &activity)
            .await
            .unwrap();

        assert_eq!(value, json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_variable_syntax() {
        let (workflow, activity) = harness();

        let value = LiteralEvaluator
            .evaluate("count", syntaxes::VARIABLE, None, &workflow, &activity)
            .await
            .unwrap();
        assert_eq!(value, json!(7));

        let missing = LiteralEvaluator
            .evaluate("unset", syntaxes::VARIABLE, None, &workflow, &activity)
            .await
            .unwrap();
        assert_eq!(missing, Value::Null);
    }

    #[tokio::test]
    async fn test_unsupported_syntax() {
        let (workflow, activity) = harness();

        let result = LiteralEvaluator
            .evaluate("x => x", "JavaScript", None, &workflow, &activity)
            .await;

        assert_eq!(
            result,
            Err(EvaluationError::UnsupportedSyntax("JavaScript".to_string()))
        );
    }
}
