use crate::bundler::{
    patch::{PatchAction, PatchModule},
    registry::{Registry, RegistryError},
};

/// Observes `ai.response.text` as it is recorded on a span.
const SET_ATTRIBUTE_BEFORE: &str = r#"		const key = args[0];
		const value = args[1];
		if (key === 'ai.response.text') {
			const spanId = this.spanContext().spanId;
			const traceId = this.spanContext().traceId;
			console.debug('[agentuity] captured ai.response.text', { spanId, traceId, length: String(value ?? '').length });
		}"#;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_patch(
        "@opentelemetry/sdk-trace-base",
        PatchModule::new("@opentelemetry/sdk-trace-base").method(
            "Span",
            "setAttribute",
            PatchAction::before(SET_ATTRIBUTE_BEFORE),
        ),
    )
}
