use crate::detection::domain::face_detector::Delegate;

/// ONNX execution providers for the requested delegate.
///
/// An empty list means ort's built-in CPU provider. Providers that fail
/// to register at session build time fall back to CPU as well.
pub fn execution_providers_for(
    delegate: Delegate,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    match delegate {
        Delegate::Cpu => vec![],
        Delegate::Gpu => gpu_execution_providers(),
    }
}

fn gpu_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        log::debug!("No GPU execution provider bundled for this platform; using CPU");
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_delegate_uses_default_provider() {
        assert!(execution_providers_for(Delegate::Cpu).is_empty());
    }
}
