//! Provider SDKs whose API key and base URL are redirected to the gateway
//! before the module's top-level code runs.

use crate::bundler::{
    patch::{
        PatchAction, PatchModule,
        snippets::{env_guard, gateway_env_guard},
    },
    registry::{Registry, RegistryError},
};

struct Provider {
    key: &'static str,
    module: &'static str,
    filename: &'static str,
    api_key: &'static str,
    api_key_value: &'static str,
    api_base: &'static str,
    gateway: &'static str,
}

const PROVIDERS: &[Provider] = &[
    Provider {
        key: "openai",
        module: "openai",
        filename: "index",
        api_key: "OPENAI_API_KEY",
        api_key_value: "process.env.AGENTUITY_API_KEY || process.env.AGENTUITY_SDK_KEY",
        api_base: "OPENAI_BASE_URL",
        gateway: "openai",
    },
    Provider {
        key: "anthropic",
        module: "@anthropic-ai/sdk",
        filename: "index",
        api_key: "ANTHROPIC_API_KEY",
        api_key_value: "process.env.AGENTUITY_API_KEY",
        api_base: "ANTHROPIC_BASE_URL",
        gateway: "anthropic",
    },
    Provider {
        key: "groq-sdk",
        module: "groq-sdk",
        filename: "index",
        api_key: "GROQ_API_KEY",
        api_key_value: "process.env.AGENTUITY_SDK_KEY",
        api_base: "GROQ_BASE_URL",
        gateway: "groq",
    },
];

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    for p in PROVIDERS {
        let guard = env_guard(
            p.api_key,
            &gateway_env_guard(p.api_key, p.api_key_value, p.api_base, p.gateway),
        );
        registry.register_patch(
            p.key,
            PatchModule::new(p.module)
                .filename(p.filename)
                .body(PatchAction::before(guard)),
        )?;
    }
    Ok(())
}
