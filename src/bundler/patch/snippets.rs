//! JavaScript fragment generators shared by the built-in patch catalog.
//!
//! Every generated fragment is a balanced statement sequence; the registry
//! re-checks that when the catalog is registered.

/// Prints a hint about the missing variable and exits the process.
pub fn env_warning(env_key: &str) -> String {
    format!(
        r#"if (process.env.AGENTUITY_ENVIRONMENT === 'development') {{
	  console.warn('\nYou have not set the environment variable {env_key} in your project .env file.\n');
	 }} else {{
	  console.warn('\nYou have not set the environment variable {env_key} in your project. Use "agentuity env set {env_key}" to set it and redeploy your project.\n');
	 }}
	 process.exit(1);"#
    )
}

/// Merges `inject` into the argument at `index`, replacing `_args` with a copy.
pub fn args_patch(index: usize, inject: &str) -> String {
    format!(
        "const _newargs = [...(_args ?? [])];\n\
         _newargs[{index}] = {{..._newargs[{index}], {inject}}};\n\
         _args = _newargs;"
    )
}

/// Runs `inject` only when `name` is unset or still holds the SDK key.
pub fn env_guard(name: &str, inject: &str) -> String {
    format!(
        "if (!process.env.{name} || process.env.{name} === process.env.AGENTUITY_SDK_KEY) {{\n\
         {inject}\n\
         }}"
    )
}

/// Points a provider SDK at the gateway when the transport URL and SDK key exist.
pub fn gateway_env_guard(api_key: &str, api_key_value: &str, api_base: &str, provider: &str) -> String {
    let warning = env_warning(api_key);
    format!(
        r#"{{
	const apikey = process.env.AGENTUITY_SDK_KEY;
	const url = process.env.AGENTUITY_TRANSPORT_URL;
	if (url && apikey) {{
		process.env.{api_key} = {api_key_value};
		process.env.{api_base} = url + '/gateway/{provider}';
		console.debug('Enabled Agentuity AI Gateway for {provider}');
	}} else {{
	 {warning}
	}}
}}
"#
    )
}

/// Rewrites the options argument of an AI SDK provider factory to use the gateway.
pub fn provider_options_patch(provider: &str) -> String {
    let copy = args_patch(0, "");
    format!(
        r#"{copy}
const opts = {{...(_args[0] ?? {{}}) }};
if (!opts.baseURL) {{
	const apikey = process.env.AGENTUITY_API_KEY;
	const url = process.env.AGENTUITY_URL;
	if (url && apikey) {{
		opts.apiKey = 'x';
		opts.baseURL = url + '/sdk/gateway/{provider}';
		opts.headers = {{
			...(opts.headers ?? {{}}),
			Authorization: 'Bearer ' + apikey,
		}};
		_args[0] = opts;
	}}
}}"#
    )
}
