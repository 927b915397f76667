//! `node-fetch` rejects abort signals from other realms; the wrapper accepts
//! any object so the SDK's own signals pass its check.

use crate::bundler::{
    patch::{PatchAction, PatchModule},
    registry::{Registry, RegistryError},
};

const IS_ABORT_SIGNAL_AFTER: &str = "if (result) { return true; }
if (typeof _args[0] === 'object') {
	return true;
}";

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_patch(
        "node-fetch",
        PatchModule::new("node-fetch")
            .filename("lib/index")
            .function("isAbortSignal", PatchAction::after(IS_ABORT_SIGNAL_AFTER)),
    )
}
