//! Vercel AI SDK: telemetry is forced on for the core generation calls and
//! every supported `@ai-sdk/*` provider factory is pointed at the gateway.

use crate::bundler::{
    patch::{
        PatchAction, PatchModule,
        snippets::{args_patch, env_guard, provider_options_patch},
    },
    registry::{Registry, RegistryError},
};

const TELEMETRY_FUNCTIONS: &[&str] = &[
    "generateText",
    "streamText",
    "generateObject",
    "streamObject",
    "embed",
    "embedMany",
];

/// `(catalog key, package, factory, api key variable, gateway provider)`.
const PROVIDERS: &[(&str, &str, &str, &str, &str)] = &[
    ("@vercel/openai", "@ai-sdk/openai", "createOpenAI", "OPENAI_API_KEY", "openai"),
    ("@vercel/anthropic", "@ai-sdk/anthropic", "createAnthropic", "ANTHROPIC_API_KEY", "anthropic"),
    ("@vercel/cohere", "@ai-sdk/cohere", "createCohere", "COHERE_API_KEY", "cohere"),
    ("@vercel/deepseek", "@ai-sdk/deepseek", "createDeepSeek", "DEEPSEEK_API_KEY", "deepseek"),
    (
        "@vercel/google",
        "@ai-sdk/google",
        "createGoogleGenerativeAI",
        "GOOGLE_GENERATIVE_AI_API_KEY",
        "google-ai-studio",
    ),
    ("@vercel/xai", "@ai-sdk/xai", "createXai", "XAI_API_KEY", "grok"),
    ("@vercel/groq", "@ai-sdk/groq", "createGroq", "GROQ_API_KEY", "groq"),
    ("@vercel/mistral", "@ai-sdk/mistral", "createMistral", "MISTRAL_API_KEY", "mistral"),
    (
        "@vercel/perplexity",
        "@ai-sdk/perplexity",
        "createPerplexity",
        "PERPLEXITY_API_KEY",
        "perplexity-ai",
    ),
];

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    let telemetry = args_patch(0, "experimental_telemetry: { isEnabled: true }");
    let core = TELEMETRY_FUNCTIONS
        .iter()
        .fold(PatchModule::new("ai"), |module, name| {
            module.function(*name, PatchAction::before(telemetry.clone()))
        });
    registry.register_patch("@vercel/ai", core)?;

    for (key, package, factory, env_key, provider) in PROVIDERS {
        registry.register_patch(
            *key,
            PatchModule::new(*package).function(
                *factory,
                PatchAction::before(env_guard(env_key, &provider_options_patch(provider))),
            ),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::bundler::{patch::transform, registry::Registry};
    use std::path::Path;

    #[test]
    fn generate_text_gets_telemetry_enabled() {
        let registry = Registry::builtin().unwrap();
        let src = "async function generateText({ model, prompt }) {\n  return model.doGenerate(prompt);\n}\nexport { generateText };\n";
        let patched = transform(&registry, Path::new("/app/node_modules/ai/dist/index.mjs"), src).unwrap();
        assert!(patched.contents.contains("experimental_telemetry: { isEnabled: true }"));
        assert!(patched.contents.contains("async function generateText(...args)"));
        assert_eq!(patched.report.applied, ["@vercel/ai:generateText"]);
        assert_eq!(patched.report.skipped.len(), 5);
    }

    #[test]
    fn provider_factory_uses_gateway() {
        let registry = Registry::builtin().unwrap();
        let src = "function createOpenAI(options = {}) {\n  return options;\n}\n";
        let patched = transform(
            &registry,
            Path::new("/app/node_modules/@ai-sdk/openai/dist/index.js"),
            src,
        )
        .unwrap();
        assert!(patched.contents.contains("'/sdk/gateway/openai'"));
        assert!(patched.contents.contains("function __agentuity_createOpenAI(options = {})"));
    }
}
