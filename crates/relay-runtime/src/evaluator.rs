//! Free-form evaluation against the component and the registry.

use std::sync::Arc;

use relay_engine::{Interpreter, Namespace, Value};

use crate::error::{BridgeError, BridgeResult};
use crate::registry::ObjectRegistry;

/// Evaluates caller-supplied code.
///
/// Reads resolve registry identifiers first, then the component namespace,
/// then the prelude. Top-level bindings made by the code land in the
/// registry's identifier space and persist until the registry is cleared.
#[derive(Debug, Default)]
pub struct ExpressionEvaluator {
    evaluations: u64,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snippets evaluated so far, failed ones included.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn evaluate(
        &mut self,
        interp: &mut Interpreter,
        code: &str,
        globals: &Arc<Namespace>,
        registry: &ObjectRegistry,
    ) -> BridgeResult<Value> {
        self.evaluations += 1;
        let result = interp
            .eval_in(code, globals, registry.scope())
            .map_err(|e| BridgeError::Eval(e.to_string()));
        if let Err(err) = &result {
            tracing::debug!(evaluation = self.evaluations, error = %err, "evaluation failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_engine::SourceFile;

    #[test]
    fn test_bindings_persist_in_registry() {
        let mut interp = Interpreter::new();
        let module = interp
            .load_module(&SourceFile::inline("m", "let base = 2;"))
            .unwrap();
        let registry = ObjectRegistry::new();
        let mut evaluator = ExpressionEvaluator::new();

        evaluator
            .evaluate(&mut interp, "x = base * 21", &module.namespace, &registry)
            .unwrap();
        assert_eq!(registry.get("x"), Some(Value::Int(42)));
        assert_eq!(
            evaluator.evaluate(&mut interp, "x", &module.namespace, &registry).unwrap(),
            Value::Int(42)
        );

        let err = evaluator
            .evaluate(&mut interp, "y +", &module.namespace, &registry)
            .unwrap_err();
        assert_eq!(err.kind(), "EvalError");
        assert_eq!(evaluator.evaluations(), 3);
    }
}
