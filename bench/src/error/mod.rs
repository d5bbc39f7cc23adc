pub mod types;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Tuple;
    use crate::services::openfga::OpenFgaError;

    #[test]
    fn test_error_display_messages() {
        let err = BenchError::Config("batch_size out of range".to_string());
        assert_eq!(err.to_string(), "Configuration error: batch_size out of range");

        let err = BenchError::InvalidArgument("depth must be >= 1".to_string());
        assert_eq!(err.to_string(), "Invalid argument: depth must be >= 1");

        let err = BenchError::PoolExhausted {
            pool: "lookup".to_string(),
            knob: "workloads.hierarchy_count".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Workload pool 'lookup' is exhausted; increase `workloads.hierarchy_count`"
        );
    }

    #[test]
    fn test_assertion_message_names_the_tuple() {
        let err = BenchError::Assertion {
            tuple: Tuple::new("user:a", "reader", "report:b"),
            expected: true,
            actual: false,
        };
        let message = err.to_string();
        assert!(message.contains("user:a reader report:b"));
        assert!(message.contains("expected allowed=true"));
    }

    #[test]
    fn test_error_kinds_and_exit_codes() {
        let config = BenchError::InvalidArgument("x".to_string());
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert_eq!(config.exit_code(), 2);

        let service = BenchError::from(OpenFgaError::Transport("refused".to_string()));
        assert_eq!(service.kind(), ErrorKind::Service);
        assert_eq!(service.exit_code(), 3);

        let assertion = BenchError::Assertion {
            tuple: Tuple::new("user:a", "reader", "report:b"),
            expected: false,
            actual: true,
        };
        assert_eq!(assertion.kind(), ErrorKind::Assertion);
        assert_eq!(assertion.exit_code(), 4);

        let internal = BenchError::from(anyhow::anyhow!("worker panicked"));
        assert_eq!(internal.kind(), ErrorKind::Internal);
        assert_eq!(internal.exit_code(), 1);
    }

    #[test]
    fn test_missing_tuple_delete_detection() {
        let benign = BenchError::from(OpenFgaError::Validation {
            code: "write_failed_due_to_invalid_input".to_string(),
            message: "cannot delete a tuple which does not exist: user: 'group:a'".to_string(),
        });
        assert!(benign.is_missing_tuple_delete());

        let fatal = BenchError::from(OpenFgaError::Validation {
            code: "validation_error".to_string(),
            message: "invalid relation".to_string(),
        });
        assert!(!fatal.is_missing_tuple_delete());
        assert!(!BenchError::Config("x".to_string()).is_missing_tuple_delete());
    }
}
